use std::fmt;
use std::sync::Arc;

use pieceworks_core::game::PieceId;
use pieceworks_core::PieceRecord;
use tiny_skia::Pixmap;

use crate::shape::{build_piece_path, PiecePath, SideDescriptor};

/// Minimum alpha for a pixel to count as part of the piece.
pub const HIT_ALPHA_MIN: u8 = 16;

/// A piece's rendered image. Produced once by the cutter and never written
/// to again; clones share the same pixels.
#[derive(Clone)]
pub struct PieceBitmap {
    pixmap: Arc<Pixmap>,
}

impl PieceBitmap {
    pub fn new(pixmap: Pixmap) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn alpha_at(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 {
            return 0;
        }
        self.pixmap
            .pixel(x as u32, y as u32)
            .map(|pixel| pixel.alpha())
            .unwrap_or(0)
    }

    pub fn opaque_pixel_count(&self) -> usize {
        self.pixmap
            .pixels()
            .iter()
            .filter(|pixel| pixel.alpha() >= HIT_ALPHA_MIN)
            .count()
    }

    pub fn shares_pixels_with(&self, other: &PieceBitmap) -> bool {
        Arc::ptr_eq(&self.pixmap, &other.pixmap)
    }
}

impl fmt::Debug for PieceBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PieceBitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Positions are the cell's top-left corner in world space. The bitmap
/// covers the cell plus `padding` on every side.
#[derive(Clone, Debug)]
pub struct Piece {
    pub id: PieceId,
    pub row: u32,
    pub col: u32,
    pub correct: (f32, f32),
    pub current: (f32, f32),
    pub cell_width: f32,
    pub cell_height: f32,
    pub padding: f32,
    pub tab_size: f32,
    pub sides: [SideDescriptor; 4],
    pub bitmap: PieceBitmap,
    pub is_placed: bool,
    pub is_locked: bool,
    pub is_selected: bool,
    pub z_index: u32,
}

impl Piece {
    pub fn width(&self) -> f32 {
        self.cell_width + self.padding * 2.0
    }

    pub fn height(&self) -> f32 {
        self.cell_height + self.padding * 2.0
    }

    /// World position of the bitmap's top-left pixel.
    pub fn bitmap_origin(&self) -> (f32, f32) {
        (self.current.0 - self.padding, self.current.1 - self.padding)
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.current.0 + self.cell_width * 0.5,
            self.current.1 + self.cell_height * 0.5,
        )
    }

    pub fn alpha_at(&self, world: (f32, f32)) -> u8 {
        let (ox, oy) = self.bitmap_origin();
        let x = (world.0 - ox).floor() as i64;
        let y = (world.1 - oy).floor() as i64;
        self.bitmap.alpha_at(x, y)
    }

    /// Pixel-accurate hit test. Locked pieces never hit.
    pub fn hit(&self, world: (f32, f32)) -> bool {
        !self.is_locked && self.alpha_at(world) >= HIT_ALPHA_MIN
    }

    /// Outline in cell-local coordinates, rebuilt from the side descriptors.
    pub fn outline(&self) -> PiecePath {
        build_piece_path(self.cell_width, self.cell_height, &self.sides, self.tab_size)
    }

    pub fn world_outline(&self) -> PiecePath {
        self.outline().translated(self.current.0, self.current.1)
    }

    pub fn distance_to_correct(&self) -> f32 {
        pieceworks_core::game::distance(self.current, self.correct)
    }

    pub fn record(&self, group_id: usize) -> PieceRecord {
        PieceRecord {
            id: self.id as u32,
            x: self.current.0,
            y: self.current.1,
            is_placed: self.is_placed,
            is_locked: self.is_locked,
            z_index: self.z_index,
            group_id: group_id as u32,
        }
    }
}
