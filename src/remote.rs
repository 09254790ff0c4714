use std::collections::BTreeMap;

use pieceworks_core::game::PieceId;
use pieceworks_core::SelectionRecord;
use tracing::debug;

/// What another participant currently holds. Read-only on this side and
/// dropped once it has not been refreshed for the configured timeout.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteSelection {
    pub user_id: String,
    pub name: String,
    pub color: [u8; 4],
    pub piece_ids: Vec<PieceId>,
    pub positions: Vec<(PieceId, (f32, f32))>,
    pub reference_selected: bool,
    pub reference_pos: Option<(f32, f32)>,
    pub last_seen_ms: f64,
}

impl RemoteSelection {
    fn from_record(record: &SelectionRecord, piece_count: usize, now_ms: f64) -> Self {
        let valid = |id: u32| (id as usize) < piece_count;
        Self {
            user_id: record.user_id.clone(),
            name: record.name.clone(),
            color: record.color,
            piece_ids: record
                .piece_ids
                .iter()
                .copied()
                .filter(|id| valid(*id))
                .map(|id| id as PieceId)
                .collect(),
            positions: record
                .positions
                .iter()
                .filter(|(id, x, y)| valid(*id) && x.is_finite() && y.is_finite())
                .map(|(id, x, y)| (*id as PieceId, (*x, *y)))
                .collect(),
            reference_selected: record.reference_selected,
            reference_pos: record
                .reference_pos
                .filter(|(x, y)| x.is_finite() && y.is_finite()),
            last_seen_ms: now_ms,
        }
    }

    pub fn holds(&self, piece: PieceId) -> bool {
        self.piece_ids.contains(&piece)
    }

    pub fn is_empty(&self) -> bool {
        self.piece_ids.is_empty() && !self.reference_selected
    }
}

#[derive(Clone, Debug)]
pub struct RemoteSelections {
    entries: BTreeMap<String, RemoteSelection>,
    timeout_ms: f64,
}

impl RemoteSelections {
    pub fn new(timeout_ms: f64) -> Self {
        Self {
            entries: BTreeMap::new(),
            timeout_ms,
        }
    }

    /// Replaces the entry for the record's user. An empty selection
    /// removes the user.
    pub fn upsert(&mut self, record: &SelectionRecord, piece_count: usize, now_ms: f64) {
        let selection = RemoteSelection::from_record(record, piece_count, now_ms);
        if selection.is_empty() {
            self.entries.remove(&record.user_id);
            return;
        }
        self.entries.insert(record.user_id.clone(), selection);
    }

    pub fn expire(&mut self, now_ms: f64) -> usize {
        let timeout = self.timeout_ms;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now_ms - entry.last_seen_ms <= timeout);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "expired remote selections");
        }
        removed
    }

    pub fn get(&self, user_id: &str) -> Option<&RemoteSelection> {
        self.entries.get(user_id)
    }

    pub fn holder_of(&self, piece: PieceId) -> Option<&RemoteSelection> {
        self.entries.values().find(|entry| entry.holds(piece))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteSelection> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
