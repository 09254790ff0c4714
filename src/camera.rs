use pieceworks_core::CameraRecord;

pub const SCALE_MIN_DEFAULT: f32 = 0.1;
pub const SCALE_MAX_DEFAULT: f32 = 5.0;
/// Offsets beyond this are treated as corrupt and pulled back.
pub const OFFSET_LIMIT: f32 = 1.0e6;
pub const FIT_PADDING_RATIO: f32 = 0.1;
const PINCH_DISTANCE_MIN: f32 = 1.0;

/// Viewport transform: `screen = world * scale + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Camera {
    pub fn screen_to_world(&self, screen: (f32, f32)) -> (f32, f32) {
        (
            (screen.0 - self.x) / self.scale,
            (screen.1 - self.y) / self.scale,
        )
    }

    pub fn world_to_screen(&self, world: (f32, f32)) -> (f32, f32) {
        (world.0 * self.scale + self.x, world.1 * self.scale + self.y)
    }

    /// Pans by a screen-space delta; only the offset moves.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.x = (self.x + dx).clamp(-OFFSET_LIMIT, OFFSET_LIMIT);
        self.y = (self.y + dy).clamp(-OFFSET_LIMIT, OFFSET_LIMIT);
    }

    /// Scales by `factor` keeping the world point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: (f32, f32), factor: f32, min: f32, max: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let world = self.screen_to_world(anchor);
        let scale = (self.scale * factor).clamp(min, max);
        if (scale - self.scale).abs() <= f32::EPSILON {
            return;
        }
        self.scale = scale;
        self.x = anchor.0 - world.0 * scale;
        self.y = anchor.1 - world.1 * scale;
    }

    /// Fits a world rectangle into the viewport with a margin, centred.
    pub fn fit(
        viewport: (f32, f32),
        content: (f32, f32, f32, f32),
        min: f32,
        max: f32,
    ) -> Self {
        let (cx, cy, cw, ch) = content;
        let target_w = cw.max(1.0) * (1.0 + FIT_PADDING_RATIO);
        let target_h = ch.max(1.0) * (1.0 + FIT_PADDING_RATIO);
        let scale = (viewport.0.max(1.0) / target_w)
            .min(viewport.1.max(1.0) / target_h)
            .clamp(min, max);
        Self {
            x: viewport.0 * 0.5 - (cx + cw * 0.5) * scale,
            y: viewport.1 * 0.5 - (cy + ch * 0.5) * scale,
            scale,
        }
    }

    /// Builds a camera from untrusted values.
    pub fn sanitized(x: f32, y: f32, scale: f32, min: f32, max: f32) -> Self {
        let defaults = Self::default();
        let pick = |value: f32, fallback: f32| {
            if value.is_finite() {
                value.clamp(-OFFSET_LIMIT, OFFSET_LIMIT)
            } else {
                fallback
            }
        };
        let scale = if scale.is_finite() && scale > 0.0 {
            scale.clamp(min, max)
        } else {
            defaults.scale.clamp(min, max)
        };
        Self {
            x: pick(x, defaults.x),
            y: pick(y, defaults.y),
            scale,
        }
    }

    pub fn from_record(record: &CameraRecord, min: f32, max: f32) -> Self {
        Self::sanitized(record.x, record.y, record.scale, min, max)
    }

    pub fn record(&self) -> CameraRecord {
        CameraRecord {
            x: self.x,
            y: self.y,
            scale: self.scale,
        }
    }

    pub fn to_transform(&self) -> tiny_skia::Transform {
        tiny_skia::Transform::from_row(self.scale, 0.0, 0.0, self.scale, self.x, self.y)
    }
}

/// State captured when a two-finger gesture starts. Every update is
/// computed from this snapshot, never from the previous frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchAnchor {
    pub start: Camera,
    pub start_distance: f32,
    pub world_anchor: (f32, f32),
}

impl PinchAnchor {
    pub fn capture(camera: Camera, centroid: (f32, f32), distance: f32) -> Option<Self> {
        if !(distance.is_finite() && distance >= PINCH_DISTANCE_MIN) {
            return None;
        }
        Some(Self {
            start: camera,
            start_distance: distance,
            world_anchor: camera.screen_to_world(centroid),
        })
    }

    pub fn apply(&self, centroid: (f32, f32), distance: f32, min: f32, max: f32) -> Camera {
        let ratio = distance.max(PINCH_DISTANCE_MIN) / self.start_distance;
        let scale = (self.start.scale * ratio).clamp(min, max);
        Camera {
            x: centroid.0 - self.world_anchor.0 * scale,
            y: centroid.1 - self.world_anchor.1 * scale,
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut camera = Camera {
            x: 30.0,
            y: -12.0,
            scale: 1.3,
        };
        let anchor = (250.0, 180.0);
        let before = camera.screen_to_world(anchor);
        camera.zoom_at(anchor, 1.7, SCALE_MIN_DEFAULT, SCALE_MAX_DEFAULT);
        let after = camera.screen_to_world(anchor);
        assert!(approx(before.0, after.0) && approx(before.1, after.1));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.zoom_at((0.0, 0.0), 100.0, SCALE_MIN_DEFAULT, SCALE_MAX_DEFAULT);
        assert_eq!(camera.scale, SCALE_MAX_DEFAULT);
        camera.zoom_at((0.0, 0.0), 1.0e-6, SCALE_MIN_DEFAULT, SCALE_MAX_DEFAULT);
        assert_eq!(camera.scale, SCALE_MIN_DEFAULT);
    }

    #[test]
    fn corrupt_values_are_sanitized() {
        let camera = Camera::sanitized(f32::NAN, 1.0e12, -3.0, 0.1, 5.0);
        assert_eq!(camera.x, 0.0);
        assert_eq!(camera.y, OFFSET_LIMIT);
        assert_eq!(camera.scale, 1.0);
        let camera = Camera::sanitized(0.0, 0.0, 80.0, 0.1, 5.0);
        assert_eq!(camera.scale, 5.0);
    }

    #[test]
    fn screen_world_round_trip() {
        let cameras = [
            Camera::default(),
            Camera {
                x: -420.0,
                y: 75.5,
                scale: 0.1,
            },
            Camera {
                x: 1300.0,
                y: -860.0,
                scale: 5.0,
            },
            Camera {
                x: 12.25,
                y: 3.5,
                scale: 1.37,
            },
        ];
        let points = [(0.0, 0.0), (799.0, 599.0), (-40.0, 1250.0), (333.3, 17.9)];
        for camera in cameras {
            for point in points {
                let back = camera.world_to_screen(camera.screen_to_world(point));
                assert!(
                    (back.0 - point.0).abs() < 1e-2 && (back.1 - point.1).abs() < 1e-2,
                    "{camera:?} mapped {point:?} back to {back:?}"
                );
            }
        }
    }

    #[test]
    fn fit_centres_content() {
        let camera = Camera::fit((800.0, 600.0), (0.0, 0.0, 1200.0, 800.0), 0.1, 5.0);
        let centre = camera.world_to_screen((600.0, 400.0));
        assert!(approx(centre.0, 400.0) && approx(centre.1, 300.0));
    }
}
