use std::collections::HashMap;

use pieceworks_core::game::PieceId;

use crate::camera::PinchAnchor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
    Unknown,
}

impl PointerKind {
    pub fn from_pointer_type(value: &str) -> Self {
        match value {
            "mouse" => PointerKind::Mouse,
            "touch" => PointerKind::Touch,
            "pen" => PointerKind::Pen,
            _ => PointerKind::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub i32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEventKind {
    Down,
    Move,
    Up,
    Cancel,
    /// Positive `delta_y` scrolls away from the user (zoom out).
    Wheel { delta_y: f32 },
}

/// Device-independent pointer event in screen pixels. Mouse, touch and
/// synthetic test input all arrive through this one type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    pub kind: InputEventKind,
    pub pointer: PointerId,
    pub pointer_kind: PointerKind,
    pub screen: (f32, f32),
    pub modifiers: InputModifiers,
    pub time_ms: f64,
}

impl InputEvent {
    pub fn new(
        kind: InputEventKind,
        pointer: i32,
        pointer_kind: PointerKind,
        screen: (f32, f32),
        time_ms: f64,
    ) -> Self {
        Self {
            kind,
            pointer: PointerId(pointer),
            pointer_kind,
            screen,
            modifiers: InputModifiers::default(),
            time_ms,
        }
    }

    pub fn mouse(kind: InputEventKind, x: f32, y: f32, time_ms: f64) -> Self {
        Self::new(kind, 1, PointerKind::Mouse, (x, y), time_ms)
    }

    pub fn touch(kind: InputEventKind, id: i32, x: f32, y: f32, time_ms: f64) -> Self {
        Self::new(kind, id, PointerKind::Touch, (x, y), time_ms)
    }

    pub fn wheel(x: f32, y: f32, delta_y: f32, time_ms: f64) -> Self {
        Self::new(
            InputEventKind::Wheel { delta_y },
            1,
            PointerKind::Mouse,
            (x, y),
            time_ms,
        )
    }

    pub fn with_modifiers(mut self, modifiers: InputModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub screen: (f32, f32),
    pub kind: PointerKind,
}

/// Pointers currently pressed.
#[derive(Clone, Debug, Default)]
pub struct PointerTracker {
    active: HashMap<PointerId, PointerSample>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PointerId, kind: PointerKind, screen: (f32, f32)) {
        self.active.insert(id, PointerSample { screen, kind });
    }

    pub fn update(&mut self, id: PointerId, screen: (f32, f32)) {
        if let Some(sample) = self.active.get_mut(&id) {
            sample.screen = screen;
        }
    }

    pub fn remove(&mut self, id: PointerId) {
        self.active.remove(&id);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn contains(&self, id: PointerId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn touch_points(&self) -> Vec<(PointerId, PointerSample)> {
        let mut points: Vec<_> = self
            .active
            .iter()
            .filter(|(_, sample)| sample.kind == PointerKind::Touch)
            .map(|(id, sample)| (*id, *sample))
            .collect();
        points.sort_by_key(|(id, _)| *id);
        points
    }

    /// Centroid and spread of the first two touches.
    pub fn pinch_geometry(&self) -> Option<((f32, f32), f32)> {
        let points = self.touch_points();
        let (a, b) = match points.as_slice() {
            [first, second, ..] => (first.1.screen, second.1.screen),
            _ => return None,
        };
        let centroid = ((a.0 + b.0) * 0.5, (a.1 + b.1) * 0.5);
        let distance = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
        Some((centroid, distance))
    }
}

pub const CLICK_MAX_DURATION_MS: f64 = 240.0;
pub const CLICK_DEFAULT_SLOP_PX: f32 = 4.0;

/// Tracks whether a press/release pair stays a tap.
#[derive(Clone, Copy, Debug)]
pub struct ClickGesture {
    start: (f32, f32),
    start_ms: f64,
    max_slop: f32,
    moved: bool,
    active: bool,
}

impl Default for ClickGesture {
    fn default() -> Self {
        Self::new_with_slop(CLICK_DEFAULT_SLOP_PX)
    }
}

impl ClickGesture {
    pub fn new_with_slop(max_slop: f32) -> Self {
        Self {
            start: (0.0, 0.0),
            start_ms: 0.0,
            max_slop,
            moved: false,
            active: false,
        }
    }

    pub fn arm(&mut self, screen: (f32, f32), now_ms: f64) {
        self.start = screen;
        self.start_ms = now_ms;
        self.moved = false;
        self.active = true;
    }

    pub fn update(&mut self, screen: (f32, f32)) {
        if !self.active || self.moved {
            return;
        }
        let dx = screen.0 - self.start.0;
        let dy = screen.1 - self.start.1;
        if dx * dx + dy * dy > self.max_slop * self.max_slop {
            self.moved = true;
        }
    }

    pub fn moved(&self) -> bool {
        self.moved
    }

    pub fn is_click(&self, now_ms: f64) -> bool {
        if !self.active || self.moved {
            return false;
        }
        (now_ms - self.start_ms).max(0.0) <= CLICK_MAX_DURATION_MS
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.moved = false;
    }
}

/// Latches once the pointer leaves a radius around its start.
#[derive(Clone, Copy, Debug)]
pub struct DragSlopGate {
    start: (f32, f32),
    slop: f32,
    moved: bool,
}

impl DragSlopGate {
    pub fn new(start: (f32, f32), slop: f32) -> Self {
        Self {
            start,
            slop,
            moved: false,
        }
    }

    pub fn update(&mut self, screen: (f32, f32)) -> bool {
        if self.moved {
            return true;
        }
        let dx = screen.0 - self.start.0;
        let dy = screen.1 - self.start.1;
        if dx * dx + dy * dy > self.slop * self.slop {
            self.moved = true;
        }
        self.moved
    }

    pub fn moved(&self) -> bool {
        self.moved
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragTarget {
    Piece(PieceId),
    Reference,
}

/// Gesture recognizer states. Each variant carries what its exit actions
/// need, so leaving a state drops its captured anchors with it.
#[derive(Clone, Copy, Debug)]
pub enum GestureState {
    Idle,
    /// Pressed on a draggable target; becomes `Dragging` once the hold
    /// delay passes, or `Panning` if the pointer moves first.
    PendingHold {
        pointer: PointerId,
        target: DragTarget,
        start_screen: (f32, f32),
        start_ms: f64,
        gate: DragSlopGate,
    },
    Panning {
        pointer: PointerId,
        last_screen: (f32, f32),
        click: ClickGesture,
    },
    Lassoing {
        pointer: PointerId,
        start_world: (f32, f32),
        current_world: (f32, f32),
    },
    Dragging {
        pointer: PointerId,
        target: DragTarget,
        last_world: (f32, f32),
        last_screen: (f32, f32),
    },
    Pinching {
        anchor: PinchAnchor,
    },
}

impl GestureState {
    pub fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::PendingHold { .. } => "pending_hold",
            GestureState::Panning { .. } => "panning",
            GestureState::Lassoing { .. } => "lassoing",
            GestureState::Dragging { .. } => "dragging",
            GestureState::Pinching { .. } => "pinching",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, GestureState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, GestureState::Dragging { .. })
    }

    pub fn pointer(&self) -> Option<PointerId> {
        match self {
            GestureState::PendingHold { pointer, .. }
            | GestureState::Panning { pointer, .. }
            | GestureState::Lassoing { pointer, .. }
            | GestureState::Dragging { pointer, .. } => Some(*pointer),
            GestureState::Idle | GestureState::Pinching { .. } => None,
        }
    }
}

/// Screen-space camera velocity while dragging inside the edge band.
/// Zero when the pointer is in the interior.
pub fn edge_pan_velocity(
    screen: (f32, f32),
    viewport: (f32, f32),
    band: f32,
    speed: f32,
) -> (f32, f32) {
    if band <= 0.0 || speed <= 0.0 {
        return (0.0, 0.0);
    }
    let axis = |value: f32, extent: f32| {
        if value < band {
            speed
        } else if value > extent - band {
            -speed
        } else {
            0.0
        }
    };
    (axis(screen.0, viewport.0), axis(screen.1, viewport.1))
}

/// Zoom factor for one wheel notch.
pub fn wheel_zoom_factor(delta_y: f32, step: f32) -> f32 {
    let step = step.max(1.0);
    if delta_y < 0.0 {
        step
    } else if delta_y > 0.0 {
        1.0 / step
    } else {
        1.0
    }
}
