use serde::{Deserialize, Serialize};

pub const SAVED_PUZZLE_VERSION: u32 = 1;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct PieceRecord {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub is_placed: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub z_index: u32,
    pub group_id: u32,
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct GroupRecord {
    pub id: u32,
    pub members: Vec<u32>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct CameraRecord {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for CameraRecord {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

/// What one remote participant currently holds.
///
/// `positions` carries live drag positions for a subset of `piece_ids`;
/// ids without a position are held but not moving.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct SelectionRecord {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_selection_color")]
    pub color: [u8; 4],
    #[serde(default)]
    pub piece_ids: Vec<u32>,
    #[serde(default)]
    pub positions: Vec<(u32, f32, f32)>,
    #[serde(default)]
    pub reference_selected: bool,
    #[serde(default)]
    pub reference_pos: Option<(f32, f32)>,
}

fn default_selection_color() -> [u8; 4] {
    [0xE0, 0x4F, 0x5F, 0xFF]
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct ReferenceRecord {
    pub x: f32,
    pub y: f32,
    pub visible: bool,
}

/// Per-piece state overlaid on a re-cut with `shape_seed`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct SavedPuzzle {
    #[serde(default = "default_version")]
    pub version: u32,
    pub piece_count: u32,
    pub shape_seed: u32,
    #[serde(default)]
    pub pieces: Vec<PieceRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub camera: Option<CameraRecord>,
    #[serde(default)]
    pub selections: Vec<SelectionRecord>,
    #[serde(default)]
    pub reference: Option<ReferenceRecord>,
}

fn default_version() -> u32 {
    SAVED_PUZZLE_VERSION
}

impl SavedPuzzle {
    pub fn new(piece_count: u32, shape_seed: u32) -> Self {
        Self {
            version: SAVED_PUZZLE_VERSION,
            piece_count,
            shape_seed,
            pieces: Vec::new(),
            groups: Vec::new(),
            camera: None,
            selections: Vec::new(),
            reference: None,
        }
    }
}
