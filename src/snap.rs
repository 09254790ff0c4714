use pieceworks_core::game::{distance, neighbor_id, GroupId, PieceId, DIRECTIONS};
use tracing::debug;

use crate::grouping::{move_group, Grouping};
use crate::model::Piece;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapOutcome {
    /// Group locked onto its solved position, if any.
    pub locked: Option<GroupId>,
    /// Pieces that became `is_placed` in this pass.
    pub newly_placed: usize,
    /// `(kept, absorbed)` group ids in merge order.
    pub merges: Vec<(GroupId, GroupId)>,
    /// Every piece whose position changed.
    pub moved: Vec<PieceId>,
}

impl SnapOutcome {
    pub fn is_empty(&self) -> bool {
        self.locked.is_none() && self.merges.is_empty()
    }
}

/// Mutable view of the state snapping works on.
pub struct SnapContext<'a> {
    pub pieces: &'a mut [Piece],
    pub grouping: &'a mut Grouping,
    pub selection: &'a mut Vec<PieceId>,
    pub cols: usize,
    pub rows: usize,
    pub threshold: f32,
}

/// Runs once per release: final-position lock first, adjacency merges
/// only if nothing locked.
pub fn snap_selection(ctx: &mut SnapContext<'_>) -> SnapOutcome {
    let outcome = snap_to_final(ctx);
    if outcome.locked.is_some() {
        return outcome;
    }
    snap_to_neighbors(ctx)
}

pub fn snap_to_final(ctx: &mut SnapContext<'_>) -> SnapOutcome {
    let mut outcome = SnapOutcome::default();
    let trigger = ctx.selection.iter().copied().find(|id| {
        ctx.pieces
            .get(*id)
            .is_some_and(|piece| !piece.is_locked && piece.distance_to_correct() <= ctx.threshold)
    });
    let Some(trigger) = trigger else {
        return outcome;
    };
    let Some(group) = ctx.grouping.group_of(trigger) else {
        return outcome;
    };
    let members = ctx.grouping.members(group).to_vec();
    for id in &members {
        let Some(piece) = ctx.pieces.get_mut(*id) else {
            continue;
        };
        // Members are cell-aligned, so the shared translation lands each
        // one on its own solved cell.
        piece.current = piece.correct;
        if !piece.is_placed {
            piece.is_placed = true;
            outcome.newly_placed += 1;
        }
        piece.is_locked = true;
        piece.is_selected = false;
        outcome.moved.push(*id);
    }
    ctx.selection.retain(|id| !members.contains(id));
    outcome.locked = Some(group);
    debug!(group, trigger, pieces = members.len(), "group locked");
    outcome
}

pub fn snap_to_neighbors(ctx: &mut SnapContext<'_>) -> SnapOutcome {
    let mut outcome = SnapOutcome::default();
    let candidates = ctx.selection.clone();
    for id in candidates {
        for dir in DIRECTIONS {
            let Some(neighbor) = neighbor_id(id, ctx.cols, ctx.rows, dir) else {
                continue;
            };
            let (Some(own_group), Some(neighbor_group)) =
                (ctx.grouping.group_of(id), ctx.grouping.group_of(neighbor))
            else {
                continue;
            };
            if own_group == neighbor_group {
                continue;
            }
            let (Some(piece), Some(other)) = (ctx.pieces.get(id), ctx.pieces.get(neighbor)) else {
                continue;
            };
            if piece.is_locked || other.is_locked {
                continue;
            }
            let expected = (
                other.current.0 + (piece.col as f32 - other.col as f32) * piece.cell_width,
                other.current.1 + (piece.row as f32 - other.row as f32) * piece.cell_height,
            );
            if distance(piece.current, expected) > ctx.threshold {
                continue;
            }
            let dx = expected.0 - piece.current.0;
            let dy = expected.1 - piece.current.1;
            move_group(ctx.grouping, ctx.pieces, own_group, dx, dy);
            outcome.moved.extend_from_slice(ctx.grouping.members(own_group));
            let absorbed = ctx.grouping.members(neighbor_group).to_vec();
            if ctx.grouping.merge(own_group, neighbor_group) {
                for member in absorbed {
                    if let Some(piece) = ctx.pieces.get_mut(member) {
                        piece.is_selected = true;
                    }
                    if !ctx.selection.contains(&member) {
                        ctx.selection.push(member);
                    }
                }
                outcome.merges.push((own_group, neighbor_group));
                debug!(kept = own_group, absorbed = neighbor_group, "snapped to neighbour");
            }
        }
    }
    outcome.moved.sort_unstable();
    outcome.moved.dedup();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn pieces() -> Vec<Piece> {
        let image = RgbaImage::from_pixel(400, 400, Rgba([120, 80, 40, 255]));
        crate::cutter::cut(&image, 4, Some(5)).expect("cut").pieces
    }

    #[test]
    fn final_lock_counts_each_piece_once() {
        let mut pieces = pieces();
        pieces[0].current = (pieces[0].correct.0 + 6.0, pieces[0].correct.1 - 4.0);
        pieces[0].is_selected = true;
        let mut grouping = Grouping::singletons(pieces.len());
        let mut selection = vec![0];
        let mut ctx = SnapContext {
            pieces: &mut pieces,
            grouping: &mut grouping,
            selection: &mut selection,
            cols: 2,
            rows: 2,
            threshold: 40.0,
        };

        let first = snap_to_final(&mut ctx);
        assert_eq!(first.locked, Some(0));
        assert_eq!(first.newly_placed, 1);
        assert!(ctx.selection.is_empty());

        ctx.selection.push(0);
        let second = snap_to_final(&mut ctx);
        assert!(second.is_empty());
        assert_eq!(second.newly_placed, 0);

        let placed = pieces.iter().filter(|piece| piece.is_placed).count();
        assert_eq!(placed, 1);
        assert_eq!(pieces[0].current, pieces[0].correct);
        assert!(pieces[0].is_locked && !pieces[0].is_selected);
    }

    #[test]
    fn near_neighbour_pulls_the_group_into_line() {
        let mut pieces = pieces();
        let cell = pieces[0].cell_width;
        pieces[0].current = (1000.0, 1000.0);
        pieces[1].current = (1000.0 + cell + 10.0, 1003.0);
        pieces[2].current = (3000.0, 3000.0);
        pieces[3].current = (3600.0, 3000.0);
        let mut grouping = Grouping::singletons(pieces.len());
        let mut selection = vec![1];
        let mut ctx = SnapContext {
            pieces: &mut pieces,
            grouping: &mut grouping,
            selection: &mut selection,
            cols: 2,
            rows: 2,
            threshold: 40.0,
        };

        let outcome = snap_selection(&mut ctx);
        assert_eq!(outcome.locked, None);
        assert_eq!(outcome.merges, vec![(1, 0)]);
        assert_eq!(ctx.selection.as_slice(), &[1, 0]);
        assert_eq!(ctx.pieces[1].current, (1000.0 + cell, 1000.0));
        assert_eq!(grouping.group_of(0), Some(1));
        grouping.check_invariants().expect("invariants");
    }
}
