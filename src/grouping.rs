use std::collections::BTreeMap;

use pieceworks_core::game::{GroupId, PieceId};
use pieceworks_core::GroupRecord;
use tracing::{debug, warn};

use crate::error::GroupingError;
use crate::model::Piece;

/// Partition of piece ids into rigid groups.
///
/// Keeps the forward map (group to members) and the back-reference
/// (piece to group) together so they cannot drift apart. Groups only ever
/// merge; ids are handed out from a counter and never reused.
#[derive(Clone, Debug, Default)]
pub struct Grouping {
    members: BTreeMap<GroupId, Vec<PieceId>>,
    group_of: Vec<GroupId>,
    next_id: GroupId,
}

impl Grouping {
    pub fn singletons(count: usize) -> Self {
        Self {
            members: (0..count).map(|id| (id, vec![id])).collect(),
            group_of: (0..count).collect(),
            next_id: count,
        }
    }

    /// Rebuilds from saved groups, keeping what is consistent: unknown or
    /// repeated piece ids are dropped and pieces nobody claims become
    /// singletons with fresh ids.
    pub fn restore(count: usize, records: &[GroupRecord]) -> Self {
        let mut members: BTreeMap<GroupId, Vec<PieceId>> = BTreeMap::new();
        let mut group_of: Vec<Option<GroupId>> = vec![None; count];
        let mut next_id = 0;
        for record in records {
            let group = record.id as GroupId;
            if members.contains_key(&group) {
                warn!(group, "duplicate group in saved state");
                continue;
            }
            let mut list = Vec::new();
            for member in &record.members {
                let piece = *member as PieceId;
                match group_of.get_mut(piece) {
                    Some(slot) => {
                        if slot.is_none() {
                            *slot = Some(group);
                            list.push(piece);
                        } else {
                            warn!(piece, group, "piece claimed by two groups");
                        }
                    }
                    None => warn!(piece, group, "unknown piece in saved group"),
                }
            }
            next_id = next_id.max(group + 1);
            if !list.is_empty() {
                members.insert(group, list);
            }
        }
        let group_of = group_of
            .into_iter()
            .enumerate()
            .map(|(piece, group)| {
                group.unwrap_or_else(|| {
                    let id = next_id;
                    next_id += 1;
                    members.insert(id, vec![piece]);
                    id
                })
            })
            .collect();
        Self {
            members,
            group_of,
            next_id,
        }
    }

    pub fn piece_count(&self) -> usize {
        self.group_of.len()
    }

    pub fn group_count(&self) -> usize {
        self.members.len()
    }

    pub fn group_of(&self, piece: PieceId) -> Option<GroupId> {
        self.group_of.get(piece).copied()
    }

    pub fn members(&self, group: GroupId) -> &[PieceId] {
        self.members
            .get(&group)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Members of the group `piece` belongs to.
    pub fn members_of_piece(&self, piece: PieceId) -> &[PieceId] {
        self.group_of(piece)
            .map(|group| self.members(group))
            .unwrap_or(&[])
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &[PieceId])> + '_ {
        self.members
            .iter()
            .map(|(group, members)| (*group, members.as_slice()))
    }

    pub fn next_id(&self) -> GroupId {
        self.next_id
    }

    /// Absorbs `b` into `a`. Returns false when either is missing or they
    /// are the same group.
    pub fn merge(&mut self, a: GroupId, b: GroupId) -> bool {
        if a == b || !self.members.contains_key(&a) {
            return false;
        }
        let Some(absorbed) = self.members.remove(&b) else {
            return false;
        };
        for piece in &absorbed {
            self.group_of[*piece] = a;
        }
        if let Some(list) = self.members.get_mut(&a) {
            list.extend(absorbed);
        }
        debug!(into = a, from = b, "merged groups");
        true
    }

    /// Moves `piece` out of a shared group into a fresh singleton. Returns
    /// the new group id, or None when the piece is unknown or already alone.
    pub fn detach(&mut self, piece: PieceId) -> Option<GroupId> {
        let group = self.group_of(piece)?;
        let list = self.members.get_mut(&group)?;
        if list.len() < 2 {
            return None;
        }
        list.retain(|member| *member != piece);
        let id = self.next_id;
        self.next_id += 1;
        self.members.insert(id, vec![piece]);
        self.group_of[piece] = id;
        debug!(piece, from = group, into = id, "detached piece");
        Some(id)
    }

    pub fn records(&self) -> Vec<GroupRecord> {
        self.members
            .iter()
            .map(|(group, members)| GroupRecord {
                id: *group as u32,
                members: members.iter().map(|piece| *piece as u32).collect(),
            })
            .collect()
    }

    pub fn check_invariants(&self) -> Result<(), GroupingError> {
        let mut seen = vec![0usize; self.group_of.len()];
        for (group, members) in &self.members {
            if members.is_empty() {
                return Err(GroupingError::EmptyGroup(*group));
            }
            for piece in members {
                let Some(count) = seen.get_mut(*piece) else {
                    return Err(GroupingError::UnknownPiece {
                        group: *group,
                        piece: *piece,
                    });
                };
                *count += 1;
                if self.group_of[*piece] != *group {
                    return Err(GroupingError::BackReference {
                        piece: *piece,
                        group: self.group_of[*piece],
                    });
                }
            }
        }
        for (piece, count) in seen.into_iter().enumerate() {
            if count != 1 {
                return Err(GroupingError::Membership { piece, count });
            }
        }
        Ok(())
    }
}

/// Translates every unlocked member of `group` by the same vector.
pub fn move_group(grouping: &Grouping, pieces: &mut [Piece], group: GroupId, dx: f32, dy: f32) {
    for piece in grouping.members(group) {
        if let Some(piece) = pieces.get_mut(*piece).filter(|piece| !piece.is_locked) {
            piece.current.0 += dx;
            piece.current.1 += dy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_both_sides_in_sync() {
        let mut grouping = Grouping::singletons(4);
        assert!(grouping.merge(0, 1));
        assert!(grouping.merge(2, 3));
        assert!(grouping.merge(2, 0));
        assert_eq!(grouping.group_count(), 1);
        for piece in 0..4 {
            assert_eq!(grouping.group_of(piece), Some(2));
        }
        grouping.check_invariants().expect("invariants");
    }

    #[test]
    fn bad_merges_are_noops() {
        let mut grouping = Grouping::singletons(2);
        assert!(!grouping.merge(0, 0));
        assert!(!grouping.merge(0, 9));
        assert!(!grouping.merge(9, 0));
        grouping.check_invariants().expect("invariants");
    }

    #[test]
    fn restore_repairs_inconsistent_records() {
        let records = vec![
            GroupRecord {
                id: 7,
                members: vec![0, 1, 99],
            },
            GroupRecord {
                id: 3,
                members: vec![1, 2],
            },
        ];
        let grouping = Grouping::restore(4, &records);
        grouping.check_invariants().expect("invariants");
        assert_eq!(grouping.group_of(0), Some(7));
        assert_eq!(grouping.group_of(1), Some(7));
        assert_eq!(grouping.group_of(2), Some(3));
        let fresh = grouping.group_of(3).expect("group");
        assert!(fresh >= 8);
        assert!(grouping.next_id() > fresh);
    }

    #[test]
    fn restore_keeps_first_claim_on_shared_piece() {
        let records = vec![
            GroupRecord {
                id: 0,
                members: vec![0, 1],
            },
            GroupRecord {
                id: 1,
                members: vec![1],
            },
        ];
        let grouping = Grouping::restore(2, &records);
        grouping.check_invariants().expect("invariants");
        assert_eq!(grouping.members(0), &[0, 1]);
        assert!(grouping.members(1).is_empty());
    }

    #[test]
    fn detach_splits_off_a_fresh_singleton() {
        let mut grouping = Grouping::singletons(3);
        assert!(grouping.merge(0, 1));
        assert_eq!(grouping.detach(2), None);
        let id = grouping.detach(1).expect("detached");
        assert!(id >= 3);
        assert_eq!(grouping.members(0), &[0]);
        assert_eq!(grouping.members(id), &[1]);
        assert_eq!(grouping.detach(1), None);
        assert_eq!(grouping.detach(9), None);
        grouping.check_invariants().expect("invariants");
    }

    #[test]
    fn move_group_leaves_locked_members_in_place() {
        let image = image::RgbaImage::from_pixel(400, 400, image::Rgba([10, 20, 30, 255]));
        let mut pieces = crate::cutter::cut(&image, 4, Some(3)).expect("cut").pieces;
        pieces[0].is_locked = true;
        let locked_at = pieces[0].current;
        let free_at = pieces[1].current;
        let mut grouping = Grouping::singletons(pieces.len());
        assert!(grouping.merge(0, 1));
        move_group(&grouping, &mut pieces, 0, 25.0, -10.0);
        assert_eq!(pieces[0].current, locked_at);
        assert_eq!(pieces[1].current, (free_at.0 + 25.0, free_at.1 - 10.0));
    }
}
