//! Jigsaw cutting and interactive assembly.
//!
//! [`cutter`] turns an image into seeded, interlocking piece bitmaps;
//! [`engine::Engine`] runs the live session on top of them: gestures,
//! camera, grouping, snapping, remote merge and persistence hooks.

pub mod camera;
pub mod config;
pub mod cutter;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod input;
pub mod model;
pub mod reference;
pub mod remote;
pub mod renderer;
pub mod renderer_stub;
pub mod shape;
pub mod snap;
pub mod source;

pub use camera::{Camera, PinchAnchor};
pub use config::EngineConfig;
pub use cutter::{cut, cut_with_settings, CutPuzzle};
pub use engine::{Engine, EngineHooks};
pub use error::{ConfigError, CutError, GroupingError};
pub use grouping::Grouping;
pub use input::{DragTarget, GestureState, InputEvent, InputEventKind, InputModifiers, PointerKind};
pub use model::{Piece, PieceBitmap};
pub use renderer::{compose_frame, DrawItem, FrameScene, PixmapSurface, Surface};
pub use renderer_stub::{DrawOp, RecordingSurface};
pub use shape::ShapeSettings;
