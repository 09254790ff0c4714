pub mod codec;
pub mod game;
pub mod grid;
pub mod protocol;
pub mod snapshot;

pub use codec::{decode, encode, from_json, to_json, CodecError};
pub use game::{GroupId, PieceId};
pub use grid::{grid_for_count, GridChoice};
pub use protocol::{EngineEvent, RemoteUpdate};
pub use snapshot::{
    CameraRecord, GroupRecord, PieceRecord, ReferenceRecord, SavedPuzzle, SelectionRecord,
};
