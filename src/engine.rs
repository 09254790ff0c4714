use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use image::RgbaImage;
use pieceworks_core::game::{GroupId, PieceId};
use pieceworks_core::{EngineEvent, GroupRecord, PieceRecord, RemoteUpdate, SavedPuzzle};
use tracing::{debug, info, warn};

use crate::camera::{Camera, PinchAnchor};
use crate::config::EngineConfig;
use crate::cutter::{cut_with_settings, CutPuzzle};
use crate::debounce::{Debouncer, Throttle};
use crate::error::CutError;
use crate::grouping::{self, Grouping};
use crate::input::{
    edge_pan_velocity, wheel_zoom_factor, ClickGesture, DragSlopGate, DragTarget,
    GestureState, InputEvent, InputEventKind, PointerId, PointerKind, PointerTracker,
};
use crate::model::Piece;
use crate::reference::ReferenceImage;
use crate::remote::RemoteSelections;
use crate::renderer::{compose_frame, FrameScene, Surface};
use crate::snap::{snap_selection, SnapContext, SnapOutcome};

/// Outbound callbacks. The engine calls them synchronously and never
/// waits on what the collaborator does with them.
///
/// The move callbacks carry the reference overlay position whenever the
/// overlay moved along with (or instead of) pieces.
#[derive(Clone)]
pub struct EngineHooks {
    pub on_piece_move_end: Rc<dyn Fn(&[PieceRecord], Option<(f32, f32)>)>,
    pub on_selection_change: Rc<dyn Fn(&[u32], bool)>,
    pub on_drag_move: Rc<dyn Fn(&[PieceRecord], Option<(f32, f32)>)>,
}

impl EngineHooks {
    pub fn empty() -> Self {
        Self {
            on_piece_move_end: Rc::new(|_, _| {}),
            on_selection_change: Rc::new(|_, _| {}),
            on_drag_move: Rc::new(|_, _| {}),
        }
    }

    /// Routes every callback into a single event sink.
    pub fn from_events(sink: Rc<dyn Fn(EngineEvent)>) -> Self {
        let move_end = Rc::clone(&sink);
        let selection = Rc::clone(&sink);
        let drag = sink;
        Self {
            on_piece_move_end: Rc::new(move |pieces, reference_pos| {
                move_end(EngineEvent::PieceMoveEnd {
                    pieces: pieces.to_vec(),
                    reference_pos,
                })
            }),
            on_selection_change: Rc::new(move |selected, reference_selected| {
                selection(EngineEvent::SelectionChange {
                    selected: selected.to_vec(),
                    reference_selected,
                })
            }),
            on_drag_move: Rc::new(move |pieces, reference_pos| {
                drag(EngineEvent::DragMove {
                    pieces: pieces.to_vec(),
                    reference_pos,
                })
            }),
        }
    }
}

/// Live puzzle session: pieces, groups, camera, gestures and the remote
/// merge. Owned by its host, which feeds it input, frames and remote
/// updates.
pub struct Engine {
    config: EngineConfig,
    hooks: EngineHooks,
    viewport: (f32, f32),
    camera: Camera,
    pieces: Vec<Piece>,
    grouping: Grouping,
    selection: Vec<PieceId>,
    reference: Option<ReferenceImage>,
    cols: usize,
    rows: usize,
    cell_size: (f32, f32),
    image_size: (u32, u32),
    target_count: u32,
    shape_seed: u32,
    next_z: u32,
    gesture: GestureState,
    pointers: PointerTracker,
    remote: RemoteSelections,
    local_user_id: Option<String>,
    save_debounce: Debouncer,
    drag_throttle: Throttle,
    pending_moves: BTreeSet<PieceId>,
    reference_moved: bool,
    edge_pan: (f32, f32),
    now_ms: f64,
}

impl Engine {
    pub fn new(config: EngineConfig, viewport: (f32, f32), hooks: EngineHooks) -> Self {
        let config = config.sanitized();
        Self {
            hooks,
            viewport,
            camera: Camera::default(),
            pieces: Vec::new(),
            grouping: Grouping::default(),
            selection: Vec::new(),
            reference: None,
            cols: 0,
            rows: 0,
            cell_size: (0.0, 0.0),
            image_size: (0, 0),
            target_count: 0,
            shape_seed: 0,
            next_z: 0,
            gesture: GestureState::Idle,
            pointers: PointerTracker::new(),
            remote: RemoteSelections::new(config.remote_selection_timeout_ms),
            local_user_id: None,
            save_debounce: Debouncer::new(config.save_debounce_ms),
            drag_throttle: Throttle::new(config.broadcast_interval_ms),
            pending_moves: BTreeSet::new(),
            reference_moved: false,
            edge_pan: (0.0, 0.0),
            now_ms: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_local_user(&mut self, user_id: impl Into<String>) {
        self.local_user_id = Some(user_id.into());
    }

    /// Replaces the whole session with a fresh cut.
    pub fn load_cut(&mut self, puzzle: CutPuzzle) {
        let count = puzzle.pieces.len();
        let opacity = self.config.reference_opacity;
        let reference_pos = (
            puzzle.image_width as f32 + puzzle.cell_width,
            0.0,
        );
        self.cols = puzzle.cols();
        self.rows = puzzle.rows();
        self.cell_size = (puzzle.cell_width, puzzle.cell_height);
        self.image_size = (puzzle.image_width, puzzle.image_height);
        self.target_count = puzzle.grid.target_count;
        self.shape_seed = puzzle.seed;
        self.next_z = count as u32;
        self.pieces = puzzle.pieces;
        self.grouping = Grouping::singletons(count);
        self.selection.clear();
        self.reference = Some(ReferenceImage::new(puzzle.reference, reference_pos, opacity));
        self.gesture = GestureState::Idle;
        self.pointers.clear();
        self.remote.clear();
        self.pending_moves.clear();
        self.reference_moved = false;
        self.save_debounce.cancel();
        self.drag_throttle.reset();
        self.edge_pan = (0.0, 0.0);
        self.reset_view_to_fit();
        info!(pieces = count, seed = self.shape_seed, "puzzle loaded");
    }

    pub fn cut_and_load(
        &mut self,
        image: &RgbaImage,
        target: u32,
        seed: Option<u32>,
    ) -> Result<(), CutError> {
        let puzzle = cut_with_settings(image, target, seed, &self.config.shape)?;
        self.load_cut(puzzle);
        Ok(())
    }

    /// Re-cuts with the saved seed, then overlays the saved state.
    pub fn load_saved(&mut self, image: &RgbaImage, saved: &SavedPuzzle) -> Result<(), CutError> {
        let puzzle = cut_with_settings(
            image,
            saved.piece_count,
            Some(saved.shape_seed),
            &self.config.shape,
        )?;
        self.load_cut(puzzle);
        self.apply_saved(saved);
        Ok(())
    }

    /// Overlays saved per-piece state on the current cut. Anything that
    /// does not fit the cut is skipped rather than failing the load.
    pub fn apply_saved(&mut self, saved: &SavedPuzzle) {
        let count = self.pieces.len();
        let mut skipped = 0usize;
        for record in &saved.pieces {
            let Some(piece) = self.pieces.get_mut(record.id as usize) else {
                skipped += 1;
                continue;
            };
            if record.x.is_finite() && record.y.is_finite() {
                piece.current = (record.x, record.y);
            }
            piece.is_placed = record.is_placed || record.is_locked;
            piece.is_locked = record.is_locked;
            if piece.is_locked {
                piece.current = piece.correct;
            }
            piece.z_index = record.z_index;
            piece.is_selected = false;
        }
        if skipped > 0 {
            warn!(skipped, "saved pieces without a matching cut piece");
        }

        let groups = if saved.groups.is_empty() {
            groups_from_piece_records(&saved.pieces)
        } else {
            saved.groups.clone()
        };
        self.grouping = Grouping::restore(count, &groups);
        if let Err(err) = self.grouping.check_invariants() {
            warn!(%err, "restored groups inconsistent; starting from singletons");
            self.grouping = Grouping::singletons(count);
        }
        self.separate_locked();
        self.next_z = self
            .pieces
            .iter()
            .map(|piece| piece.z_index.saturating_add(1))
            .max()
            .unwrap_or(0);
        self.selection.clear();

        self.camera = match &saved.camera {
            Some(record) => {
                Camera::from_record(record, self.config.scale_min, self.config.scale_max)
            }
            None => self.fit_camera(),
        };
        if let (Some(reference), Some(record)) = (self.reference.as_mut(), &saved.reference) {
            reference.apply_record(record);
        }
        for selection in &saved.selections {
            if self.local_user_id.as_deref() == Some(selection.user_id.as_str()) {
                continue;
            }
            self.remote.upsert(selection, count, self.now_ms);
        }
        info!(
            pieces = count,
            groups = self.grouping.group_count(),
            placed = self.placed_count(),
            "saved state restored"
        );
    }

    pub fn save_state(&self) -> SavedPuzzle {
        let mut saved = SavedPuzzle::new(self.target_count, self.shape_seed);
        saved.pieces = self.piece_records(0..self.pieces.len());
        saved.groups = self.grouping.records();
        saved.camera = Some(self.camera.record());
        saved.reference = self.reference.as_ref().map(ReferenceImage::record);
        saved
    }

    fn piece_records(&self, ids: impl IntoIterator<Item = PieceId>) -> Vec<PieceRecord> {
        ids.into_iter()
            .filter_map(|id| {
                let piece = self.pieces.get(id)?;
                let group = self.grouping.group_of(id)?;
                Some(piece.record(group))
            })
            .collect()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id)
    }

    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    pub fn group_of(&self, piece: PieceId) -> Option<GroupId> {
        self.grouping.group_of(piece)
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Camera::sanitized(
            camera.x,
            camera.y,
            camera.scale,
            self.config.scale_min,
            self.config.scale_max,
        );
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    pub fn selection(&self) -> &[PieceId] {
        &self.selection
    }

    pub fn reference(&self) -> Option<&ReferenceImage> {
        self.reference.as_ref()
    }

    pub fn remote_selections(&self) -> &RemoteSelections {
        &self.remote
    }

    pub fn grid_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn placed_count(&self) -> usize {
        self.pieces.iter().filter(|piece| piece.is_placed).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.pieces.is_empty() && self.pieces.iter().all(|piece| piece.is_locked)
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width.max(1.0), height.max(1.0));
    }

    fn fit_camera(&self) -> Camera {
        Camera::fit(
            self.viewport,
            (0.0, 0.0, self.image_size.0 as f32, self.image_size.1 as f32),
            self.config.scale_min,
            self.config.scale_max,
        )
    }

    pub fn reset_view_to_fit(&mut self) {
        self.camera = self.fit_camera();
    }

    pub fn toggle_reference(&mut self) -> bool {
        let Some(reference) = self.reference.as_mut() else {
            return false;
        };
        reference.visible = !reference.visible;
        if !reference.visible && reference.is_selected {
            reference.is_selected = false;
            self.emit_selection();
        }
        self.reference.as_ref().is_some_and(|r| r.visible)
    }

    /// Absorbs group `b` into `a`. No-op for unknown or equal ids, and for
    /// a locked group meeting an unlocked one.
    pub fn merge_groups(&mut self, a: GroupId, b: GroupId) -> bool {
        if self.group_locked(a) != self.group_locked(b) {
            debug!(a, b, "refusing to merge locked with unlocked group");
            return false;
        }
        let a_selected = self
            .grouping
            .members(a)
            .iter()
            .any(|id| self.pieces[*id].is_selected);
        let b_selected = self
            .grouping
            .members(b)
            .iter()
            .any(|id| self.pieces[*id].is_selected);
        if !self.grouping.merge(a, b) {
            return false;
        }
        if a_selected != b_selected {
            let mut selection = self.selection.clone();
            selection.extend_from_slice(self.grouping.members(a));
            let reference = self.reference_selected();
            self.set_selection(selection, reference);
        }
        true
    }

    /// Translates every member of `group`; unknown ids are ignored.
    pub fn move_group(&mut self, group: GroupId, dx: f32, dy: f32) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        grouping::move_group(&self.grouping, &mut self.pieces, group, dx, dy);
        let members = self.grouping.members(group).to_vec();
        if !members.is_empty() {
            self.pending_moves.extend(members);
            self.save_debounce.schedule(self.now_ms);
        }
    }

    fn group_locked(&self, group: GroupId) -> bool {
        self.grouping
            .members(group)
            .iter()
            .any(|id| self.pieces[*id].is_locked)
    }

    /// Splits locked pieces out of groups that still hold unlocked ones, so
    /// every group is either wholly locked or wholly free.
    fn separate_locked(&mut self) {
        for id in 0..self.pieces.len() {
            if !self.pieces[id].is_locked {
                continue;
            }
            let mixed = self
                .grouping
                .members_of_piece(id)
                .iter()
                .any(|member| !self.pieces[*member].is_locked);
            if mixed {
                if let Some(group) = self.grouping.detach(id) {
                    warn!(piece = id, group, "locked piece split from a free group");
                }
            }
        }
    }

    fn reference_selected(&self) -> bool {
        self.reference.as_ref().is_some_and(|r| r.is_selected)
    }

    fn emit_selection(&self) {
        let ids: Vec<u32> = self.selection.iter().map(|id| *id as u32).collect();
        (self.hooks.on_selection_change)(&ids, self.reference_selected());
    }

    /// Replaces the selection; locked pieces are dropped. Fires the
    /// selection callback only on change.
    fn set_selection(&mut self, mut pieces: Vec<PieceId>, reference: bool) {
        pieces.retain(|id| self.pieces.get(*id).is_some_and(|piece| !piece.is_locked));
        pieces.sort_unstable();
        pieces.dedup();
        let reference = reference && self.reference.as_ref().is_some_and(|r| r.visible);
        if pieces == self.selection && reference == self.reference_selected() {
            return;
        }
        for piece in &mut self.pieces {
            piece.is_selected = false;
        }
        for id in &pieces {
            self.pieces[*id].is_selected = true;
        }
        self.selection = pieces;
        if let Some(r) = self.reference.as_mut() {
            r.is_selected = reference;
        }
        self.emit_selection();
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Vec::new(), false);
    }

    /// Selects the whole group of `piece`.
    pub fn select_group_of(&mut self, piece: PieceId) {
        let members = self.grouping.members_of_piece(piece).to_vec();
        self.set_selection(members, false);
    }

    /// Raises the selection above everything, keeping relative order.
    fn bring_selection_to_front(&mut self) {
        if u32::MAX - self.next_z < self.selection.len() as u32 {
            self.compact_z();
        }
        let mut members = self.selection.clone();
        members.sort_by_key(|id| self.pieces[*id].z_index);
        for id in members {
            self.pieces[id].z_index = self.next_z;
            self.next_z = self.next_z.saturating_add(1);
        }
    }

    /// Renumbers z densely from 0 in current paint order.
    fn compact_z(&mut self) {
        let mut order: Vec<PieceId> = (0..self.pieces.len()).collect();
        order.sort_by_key(|id| (self.pieces[*id].z_index, *id));
        for (z, id) in order.into_iter().enumerate() {
            self.pieces[id].z_index = z as u32;
        }
        self.next_z = self.pieces.len() as u32;
        debug!(pieces = self.pieces.len(), "z order compacted");
    }

    /// Topmost interactive thing under a screen point.
    pub fn hit_test(&self, screen: (f32, f32)) -> Option<DragTarget> {
        let world = self.camera.screen_to_world(screen);
        let top = self
            .pieces
            .iter()
            .filter(|piece| piece.hit(world))
            .max_by_key(|piece| (piece.z_index, piece.id));
        if let Some(piece) = top {
            return Some(DragTarget::Piece(piece.id));
        }
        self.reference
            .as_ref()
            .filter(|reference| reference.hit(world))
            .map(|_| DragTarget::Reference)
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        self.now_ms = self.now_ms.max(event.time_ms);
        match event.kind {
            InputEventKind::Down => self.pointer_down(&event),
            InputEventKind::Move => self.pointer_move(&event),
            InputEventKind::Up => self.pointer_up(&event, false),
            InputEventKind::Cancel => self.pointer_up(&event, true),
            InputEventKind::Wheel { delta_y } => {
                let factor = wheel_zoom_factor(delta_y, self.config.wheel_zoom_step);
                self.camera.zoom_at(
                    event.screen,
                    factor,
                    self.config.scale_min,
                    self.config.scale_max,
                );
            }
        }
    }

    fn transition(&mut self, next: GestureState) {
        if self.gesture.name() != next.name() {
            debug!(from = self.gesture.name(), to = next.name(), "gesture");
        }
        self.gesture = next;
    }

    fn pointer_down(&mut self, event: &InputEvent) {
        self.pointers
            .insert(event.pointer, event.pointer_kind, event.screen);
        if event.pointer_kind == PointerKind::Touch && self.pointers.touch_points().len() >= 2 {
            if self.gesture.is_dragging() {
                self.end_drag(true);
            }
            if let Some((centroid, distance)) = self.pointers.pinch_geometry() {
                match PinchAnchor::capture(self.camera, centroid, distance) {
                    Some(anchor) => self.transition(GestureState::Pinching { anchor }),
                    None => self.transition(GestureState::Idle),
                }
            }
            return;
        }
        if !self.gesture.is_idle() {
            return;
        }
        let target = self.hit_test(event.screen);
        let next = match target {
            Some(target) => GestureState::PendingHold {
                pointer: event.pointer,
                target,
                start_screen: event.screen,
                start_ms: event.time_ms,
                gate: DragSlopGate::new(event.screen, self.config.tap_slop_px),
            },
            None if event.modifiers.shift => {
                let world = self.camera.screen_to_world(event.screen);
                GestureState::Lassoing {
                    pointer: event.pointer,
                    start_world: world,
                    current_world: world,
                }
            }
            None => {
                let mut click = ClickGesture::new_with_slop(self.config.tap_slop_px);
                click.arm(event.screen, event.time_ms);
                GestureState::Panning {
                    pointer: event.pointer,
                    last_screen: event.screen,
                    click,
                }
            }
        };
        self.transition(next);
    }

    fn pointer_move(&mut self, event: &InputEvent) {
        self.pointers.update(event.pointer, event.screen);
        match self.gesture {
            GestureState::Idle => {}
            GestureState::Pinching { anchor } => {
                if let Some((centroid, distance)) = self.pointers.pinch_geometry() {
                    self.camera = anchor.apply(
                        centroid,
                        distance,
                        self.config.scale_min,
                        self.config.scale_max,
                    );
                }
            }
            GestureState::PendingHold {
                pointer,
                target,
                start_screen,
                start_ms,
                mut gate,
            } if pointer == event.pointer => {
                if event.time_ms - start_ms >= self.config.hold_delay_ms {
                    self.begin_drag(pointer, target, start_screen);
                    self.drag_to(event.screen);
                } else if gate.update(event.screen) {
                    let mut click = ClickGesture::new_with_slop(self.config.tap_slop_px);
                    click.arm(start_screen, start_ms);
                    click.update(event.screen);
                    self.transition(GestureState::Panning {
                        pointer,
                        last_screen: event.screen,
                        click,
                    });
                    self.camera.pan_by(
                        event.screen.0 - start_screen.0,
                        event.screen.1 - start_screen.1,
                    );
                } else {
                    self.gesture = GestureState::PendingHold {
                        pointer,
                        target,
                        start_screen,
                        start_ms,
                        gate,
                    };
                }
            }
            GestureState::Panning {
                pointer,
                last_screen,
                mut click,
            } if pointer == event.pointer => {
                self.camera.pan_by(
                    event.screen.0 - last_screen.0,
                    event.screen.1 - last_screen.1,
                );
                click.update(event.screen);
                self.gesture = GestureState::Panning {
                    pointer,
                    last_screen: event.screen,
                    click,
                };
            }
            GestureState::Lassoing {
                pointer,
                start_world,
                ..
            } if pointer == event.pointer => {
                self.gesture = GestureState::Lassoing {
                    pointer,
                    start_world,
                    current_world: self.camera.screen_to_world(event.screen),
                };
            }
            GestureState::Dragging { pointer, .. } if pointer == event.pointer => {
                self.drag_to(event.screen);
            }
            _ => {}
        }
    }

    fn pointer_up(&mut self, event: &InputEvent, cancelled: bool) {
        self.pointers.remove(event.pointer);
        match self.gesture {
            GestureState::Pinching { .. } => {
                if self.pointers.touch_points().len() < 2 {
                    self.transition(GestureState::Idle);
                }
            }
            GestureState::PendingHold {
                pointer,
                target,
                start_screen,
                start_ms,
                ..
            } if pointer == event.pointer => {
                self.transition(GestureState::Idle);
                if cancelled {
                    return;
                }
                if event.time_ms - start_ms >= self.config.hold_delay_ms {
                    self.begin_drag(pointer, target, start_screen);
                    self.end_drag(true);
                } else {
                    match target {
                        DragTarget::Piece(id) => self.select_group_of(id),
                        DragTarget::Reference => self.set_selection(Vec::new(), true),
                    }
                }
            }
            GestureState::Panning { pointer, click, .. } if pointer == event.pointer => {
                self.transition(GestureState::Idle);
                if !cancelled && click.is_click(event.time_ms) {
                    self.clear_selection();
                }
            }
            GestureState::Lassoing {
                pointer,
                start_world,
                current_world,
            } if pointer == event.pointer => {
                self.transition(GestureState::Idle);
                if !cancelled {
                    self.select_in_rect(start_world, current_world);
                }
            }
            GestureState::Dragging { pointer, .. } if pointer == event.pointer => {
                self.end_drag(!cancelled);
            }
            _ => {}
        }
    }

    fn begin_drag(&mut self, pointer: PointerId, target: DragTarget, screen: (f32, f32)) {
        match target {
            DragTarget::Piece(id) => {
                let already = self.pieces.get(id).is_some_and(|piece| piece.is_selected);
                if !already {
                    self.select_group_of(id);
                }
                self.bring_selection_to_front();
            }
            DragTarget::Reference => {
                if !self.reference_selected() {
                    self.set_selection(Vec::new(), true);
                }
            }
        }
        self.drag_throttle.reset();
        self.transition(GestureState::Dragging {
            pointer,
            target,
            last_world: self.camera.screen_to_world(screen),
            last_screen: screen,
        });
    }

    /// Moves everything selected so it follows the pointer.
    fn drag_to(&mut self, screen: (f32, f32)) {
        let GestureState::Dragging {
            pointer,
            target,
            last_world,
            ..
        } = self.gesture
        else {
            return;
        };
        let world = self.camera.screen_to_world(screen);
        let dx = world.0 - last_world.0;
        let dy = world.1 - last_world.1;
        self.move_selection(dx, dy);
        self.edge_pan = edge_pan_velocity(
            screen,
            self.viewport,
            self.config.edge_pan_band_px,
            self.config.edge_pan_speed_px,
        );
        self.gesture = GestureState::Dragging {
            pointer,
            target,
            last_world: world,
            last_screen: screen,
        };
        if self.drag_throttle.request(self.now_ms) {
            self.emit_drag_move();
        }
    }

    fn move_selection(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let groups: BTreeSet<GroupId> = self
            .selection
            .iter()
            .filter_map(|id| self.grouping.group_of(*id))
            .collect();
        for group in groups {
            grouping::move_group(&self.grouping, &mut self.pieces, group, dx, dy);
        }
        if let Some(reference) = self.reference.as_mut().filter(|r| r.is_selected) {
            reference.move_by(dx, dy);
            self.reference_moved = true;
        }
    }

    fn selected_reference_pos(&self) -> Option<(f32, f32)> {
        self.reference
            .as_ref()
            .filter(|r| r.is_selected)
            .map(|r| r.position)
    }

    fn emit_drag_move(&self) {
        let records = self.piece_records(self.selection.iter().copied());
        let reference_pos = self.selected_reference_pos();
        if !records.is_empty() || reference_pos.is_some() {
            (self.hooks.on_drag_move)(&records, reference_pos);
        }
    }

    fn end_drag(&mut self, run_snap: bool) {
        self.edge_pan = (0.0, 0.0);
        self.drag_throttle.reset();
        self.transition(GestureState::Idle);
        let before = self.selection.clone();
        let mut outcome = SnapOutcome::default();
        if run_snap && !self.selection.is_empty() {
            let mut ctx = SnapContext {
                pieces: &mut self.pieces,
                grouping: &mut self.grouping,
                selection: &mut self.selection,
                cols: self.cols,
                rows: self.rows,
                threshold: self.config.snap_distance,
            };
            outcome = snap_selection(&mut ctx);
            self.selection.sort_unstable();
        }
        if !outcome.merges.is_empty() {
            self.bring_selection_to_front();
        }
        self.pending_moves.extend(before.iter().copied());
        self.pending_moves.extend(outcome.moved.iter().copied());
        if !self.pending_moves.is_empty() || self.reference_moved {
            self.save_debounce.schedule(self.now_ms);
        }
        if self.selection != before {
            self.emit_selection();
        }
        if outcome.locked.is_some() && self.is_complete() {
            info!(pieces = self.pieces.len(), "puzzle complete");
        }
    }

    fn select_in_rect(&mut self, a: (f32, f32), b: (f32, f32)) {
        let (min_x, max_x) = (a.0.min(b.0), a.0.max(b.0));
        let (min_y, max_y) = (a.1.min(b.1), a.1.max(b.1));
        let mut selection = Vec::new();
        for piece in &self.pieces {
            if piece.is_locked {
                continue;
            }
            let (cx, cy) = piece.center();
            if cx >= min_x && cx <= max_x && cy >= min_y && cy <= max_y {
                selection.extend_from_slice(self.grouping.members_of_piece(piece.id));
            }
        }
        self.set_selection(selection, false);
    }

    fn flush_moves(&mut self) {
        if self.pending_moves.is_empty() && !self.reference_moved {
            return;
        }
        let ids = std::mem::take(&mut self.pending_moves);
        let records = self.piece_records(ids);
        let reference_pos = if std::mem::take(&mut self.reference_moved) {
            self.reference.as_ref().map(|r| r.position)
        } else {
            None
        };
        (self.hooks.on_piece_move_end)(&records, reference_pos);
    }

    /// Advances timers: hold-to-drag, save debounce, drag broadcast and
    /// remote expiry.
    pub fn tick(&mut self, now_ms: f64) {
        self.now_ms = self.now_ms.max(now_ms);
        if let GestureState::PendingHold {
            pointer,
            target,
            start_screen,
            start_ms,
            ..
        } = self.gesture
        {
            if self.now_ms - start_ms >= self.config.hold_delay_ms {
                self.begin_drag(pointer, target, start_screen);
            }
        }
        if self.save_debounce.poll(self.now_ms) {
            self.flush_moves();
        }
        if self.drag_throttle.poll(self.now_ms) && self.gesture.is_dragging() {
            self.emit_drag_move();
        }
        self.remote.expire(self.now_ms);
    }

    /// Forces any debounced save out now.
    pub fn flush(&mut self) {
        self.save_debounce.cancel();
        self.flush_moves();
    }

    fn apply_edge_pan(&mut self) {
        if self.edge_pan == (0.0, 0.0) {
            return;
        }
        let GestureState::Dragging { last_screen, .. } = self.gesture else {
            self.edge_pan = (0.0, 0.0);
            return;
        };
        self.camera.pan_by(self.edge_pan.0, self.edge_pan.1);
        self.drag_to(last_screen);
    }

    /// One display frame: timers, edge panning, then composition.
    pub fn frame(&mut self, now_ms: f64, surface: &mut dyn Surface) {
        self.tick(now_ms);
        self.apply_edge_pan();
        self.render(surface);
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        let lasso = match self.gesture {
            GestureState::Lassoing {
                start_world,
                current_world,
                ..
            } => Some((start_world, current_world)),
            _ => None,
        };
        let (touches, debug_text) = if self.config.show_debug {
            (
                self.pointers
                    .touch_points()
                    .into_iter()
                    .map(|(_, sample)| sample.screen)
                    .collect(),
                Some(format!(
                    "{} | scale {:.2} | placed {}/{}",
                    self.gesture.name(),
                    self.camera.scale,
                    self.placed_count(),
                    self.pieces.len()
                )),
            )
        } else {
            (Vec::new(), None)
        };
        let scene = FrameScene {
            pieces: &self.pieces,
            camera: self.camera,
            reference: self.reference.as_ref(),
            lasso,
            remote: &self.remote,
            touches,
            debug_text,
        };
        compose_frame(surface, &scene);
    }

    /// Merges pushed state. Pieces and the reference the local user
    /// currently holds are never overwritten.
    pub fn apply_remote_update(&mut self, update: &RemoteUpdate, now_ms: f64) {
        self.now_ms = self.now_ms.max(now_ms);
        let count = self.pieces.len();
        let mut remote_groups: BTreeMap<u32, GroupId> = BTreeMap::new();
        let mut skipped = 0usize;
        for record in &update.pieces {
            let id = record.id as usize;
            let Some(piece) = self.pieces.get_mut(id) else {
                continue;
            };
            if piece.is_selected {
                skipped += 1;
                continue;
            }
            if record.x.is_finite() && record.y.is_finite() && !piece.is_locked {
                piece.current = (record.x, record.y);
            }
            piece.is_placed |= record.is_placed || record.is_locked;
            if record.is_locked && !piece.is_locked {
                piece.is_locked = true;
                piece.current = piece.correct;
            }
            piece.z_index = record.z_index;
            self.next_z = self.next_z.max(record.z_index.saturating_add(1));

            let Some(local) = self.grouping.group_of(id) else {
                continue;
            };
            match remote_groups.get(&record.group_id).copied() {
                None => {
                    remote_groups.insert(record.group_id, local);
                }
                Some(kept) if kept != local => {
                    let held = self
                        .grouping
                        .members(kept)
                        .iter()
                        .chain(self.grouping.members(local))
                        .any(|member| self.pieces[*member].is_selected);
                    if !held && self.group_locked(kept) == self.group_locked(local) {
                        self.grouping.merge(kept, local);
                    }
                }
                Some(_) => {}
            }
        }
        if skipped > 0 {
            debug!(skipped, "remote update skipped locally held pieces");
        }
        self.separate_locked();

        for selection in &update.selections {
            if self.local_user_id.as_deref() == Some(selection.user_id.as_str()) {
                continue;
            }
            self.remote.upsert(selection, count, self.now_ms);
            for (id, x, y) in &selection.positions {
                let Some(piece) = self.pieces.get_mut(*id as usize) else {
                    continue;
                };
                if piece.is_selected || piece.is_locked || !x.is_finite() || !y.is_finite() {
                    continue;
                }
                piece.current = (*x, *y);
            }
            if let (Some(reference), Some(pos)) = (self.reference.as_mut(), selection.reference_pos)
            {
                if !reference.is_selected && pos.0.is_finite() && pos.1.is_finite() {
                    reference.position = pos;
                }
            }
        }
    }
}

fn groups_from_piece_records(records: &[PieceRecord]) -> Vec<GroupRecord> {
    let mut groups: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for record in records {
        groups.entry(record.group_id).or_default().push(record.id);
    }
    groups
        .into_iter()
        .map(|(id, members)| GroupRecord { id, members })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEventKind;
    use crate::renderer_stub::RecordingSurface;
    use std::cell::RefCell;

    #[test]
    fn empty_engine_ignores_everything() {
        let mut engine = Engine::new(EngineConfig::default(), (800.0, 600.0), EngineHooks::empty());
        engine.handle_input(InputEvent::mouse(InputEventKind::Down, 10.0, 10.0, 0.0));
        engine.handle_input(InputEvent::mouse(InputEventKind::Up, 10.0, 10.0, 20.0));
        engine.move_group(3, 5.0, 5.0);
        assert!(!engine.merge_groups(0, 1));
        engine.apply_remote_update(&RemoteUpdate::default(), 30.0);
        let mut surface = RecordingSurface::new(800, 600);
        engine.frame(40.0, &mut surface);
        assert!(engine.gesture().is_idle());
        assert!(!engine.is_complete());
        assert_eq!(engine.placed_count(), 0);
        assert_eq!(engine.save_state().pieces.len(), 0);
    }

    #[test]
    fn event_sink_receives_tagged_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let hooks = EngineHooks::from_events(Rc::new(move |event: EngineEvent| {
            sink.borrow_mut().push(event.name());
        }));
        (hooks.on_selection_change)(&[1, 2], false);
        (hooks.on_drag_move)(&[], None);
        (hooks.on_piece_move_end)(&[], Some((1.0, 2.0)));
        assert_eq!(
            *seen.borrow(),
            vec!["selection_change", "drag_move", "piece_move_end"]
        );
    }
}
