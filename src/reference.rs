use pieceworks_core::ReferenceRecord;

use crate::model::PieceBitmap;

/// Translucent preview of the solved image. Selectable and movable like a
/// piece but never grouped or snapped.
#[derive(Clone, Debug)]
pub struct ReferenceImage {
    pub bitmap: PieceBitmap,
    pub position: (f32, f32),
    pub visible: bool,
    pub opacity: f32,
    pub is_selected: bool,
}

impl ReferenceImage {
    pub fn new(bitmap: PieceBitmap, position: (f32, f32), opacity: f32) -> Self {
        Self {
            bitmap,
            position,
            visible: false,
            opacity: opacity.clamp(0.0, 1.0),
            is_selected: false,
        }
    }

    pub fn size(&self) -> (f32, f32) {
        (self.bitmap.width() as f32, self.bitmap.height() as f32)
    }

    pub fn hit(&self, world: (f32, f32)) -> bool {
        if !self.visible {
            return false;
        }
        let (w, h) = self.size();
        world.0 >= self.position.0
            && world.1 >= self.position.1
            && world.0 < self.position.0 + w
            && world.1 < self.position.1 + h
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.position.0 += dx;
        self.position.1 += dy;
    }

    pub fn record(&self) -> ReferenceRecord {
        ReferenceRecord {
            x: self.position.0,
            y: self.position.1,
            visible: self.visible,
        }
    }

    pub fn apply_record(&mut self, record: &ReferenceRecord) {
        if record.x.is_finite() && record.y.is_finite() {
            self.position = (record.x, record.y);
        }
        self.visible = record.visible;
    }
}
