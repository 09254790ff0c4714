use serde::{Deserialize, Serialize};

use crate::snapshot::{PieceRecord, SelectionRecord};

/// Inbound push from the persistence layer.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct RemoteUpdate {
    #[serde(default)]
    pub pieces: Vec<PieceRecord>,
    #[serde(default)]
    pub selections: Vec<SelectionRecord>,
}

/// Outbound notifications. The engine fires these and never waits.
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
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// `reference_pos` is set when the reference overlay moved too.
    PieceMoveEnd {
        pieces: Vec<PieceRecord>,
        #[serde(default)]
        reference_pos: Option<(f32, f32)>,
    },
    SelectionChange {
        selected: Vec<u32>,
        reference_selected: bool,
    },
    DragMove {
        pieces: Vec<PieceRecord>,
        #[serde(default)]
        reference_pos: Option<(f32, f32)>,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::PieceMoveEnd { .. } => "piece_move_end",
            EngineEvent::SelectionChange { .. } => "selection_change",
            EngineEvent::DragMove { .. } => "drag_move",
        }
    }
}
