use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::{SCALE_MAX_DEFAULT, SCALE_MIN_DEFAULT};
use crate::error::ConfigError;
pub use crate::shape::ShapeSettings;
use crate::source::IMAGE_MAX_DIMENSION_DEFAULT;

pub const SNAP_DISTANCE_DEFAULT: f32 = 40.0;
pub const HOLD_DELAY_MS_DEFAULT: f64 = 100.0;
pub const TAP_SLOP_PX_DEFAULT: f32 = 6.0;
pub const EDGE_PAN_BAND_PX_DEFAULT: f32 = 40.0;
pub const EDGE_PAN_SPEED_PX_DEFAULT: f32 = 10.0;
pub const SAVE_DEBOUNCE_MS_DEFAULT: f64 = 300.0;
pub const BROADCAST_INTERVAL_MS_DEFAULT: f64 = 100.0;
pub const REMOTE_SELECTION_TIMEOUT_MS_DEFAULT: f64 = 10_000.0;
pub const WHEEL_ZOOM_STEP_DEFAULT: f32 = 1.1;
pub const REFERENCE_OPACITY_DEFAULT: f32 = 0.5;

fn default_snap_distance() -> f32 {
    SNAP_DISTANCE_DEFAULT
}

fn default_hold_delay_ms() -> f64 {
    HOLD_DELAY_MS_DEFAULT
}

fn default_tap_slop_px() -> f32 {
    TAP_SLOP_PX_DEFAULT
}

fn default_edge_pan_band_px() -> f32 {
    EDGE_PAN_BAND_PX_DEFAULT
}

fn default_edge_pan_speed_px() -> f32 {
    EDGE_PAN_SPEED_PX_DEFAULT
}

fn default_save_debounce_ms() -> f64 {
    SAVE_DEBOUNCE_MS_DEFAULT
}

fn default_broadcast_interval_ms() -> f64 {
    BROADCAST_INTERVAL_MS_DEFAULT
}

fn default_remote_selection_timeout_ms() -> f64 {
    REMOTE_SELECTION_TIMEOUT_MS_DEFAULT
}

fn default_scale_min() -> f32 {
    SCALE_MIN_DEFAULT
}

fn default_scale_max() -> f32 {
    SCALE_MAX_DEFAULT
}

fn default_wheel_zoom_step() -> f32 {
    WHEEL_ZOOM_STEP_DEFAULT
}

fn default_reference_opacity() -> f32 {
    REFERENCE_OPACITY_DEFAULT
}

fn default_image_max_dim() -> u32 {
    IMAGE_MAX_DIMENSION_DEFAULT
}

/// Engine tunables. Every field has a default so partial files load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// World-space distance, independent of zoom.
    #[serde(default = "default_snap_distance")]
    pub snap_distance: f32,
    #[serde(default = "default_hold_delay_ms")]
    pub hold_delay_ms: f64,
    #[serde(default = "default_tap_slop_px")]
    pub tap_slop_px: f32,
    #[serde(default = "default_edge_pan_band_px")]
    pub edge_pan_band_px: f32,
    /// Screen pixels per frame.
    #[serde(default = "default_edge_pan_speed_px")]
    pub edge_pan_speed_px: f32,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: f64,
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: f64,
    #[serde(default = "default_remote_selection_timeout_ms")]
    pub remote_selection_timeout_ms: f64,
    #[serde(default = "default_scale_min")]
    pub scale_min: f32,
    #[serde(default = "default_scale_max")]
    pub scale_max: f32,
    #[serde(default = "default_wheel_zoom_step")]
    pub wheel_zoom_step: f32,
    #[serde(default = "default_reference_opacity")]
    pub reference_opacity: f32,
    #[serde(default = "default_image_max_dim")]
    pub image_max_dimension: u32,
    #[serde(default)]
    pub show_debug: bool,
    #[serde(default)]
    pub shape: ShapeSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snap_distance: SNAP_DISTANCE_DEFAULT,
            hold_delay_ms: HOLD_DELAY_MS_DEFAULT,
            tap_slop_px: TAP_SLOP_PX_DEFAULT,
            edge_pan_band_px: EDGE_PAN_BAND_PX_DEFAULT,
            edge_pan_speed_px: EDGE_PAN_SPEED_PX_DEFAULT,
            save_debounce_ms: SAVE_DEBOUNCE_MS_DEFAULT,
            broadcast_interval_ms: BROADCAST_INTERVAL_MS_DEFAULT,
            remote_selection_timeout_ms: REMOTE_SELECTION_TIMEOUT_MS_DEFAULT,
            scale_min: SCALE_MIN_DEFAULT,
            scale_max: SCALE_MAX_DEFAULT,
            wheel_zoom_step: WHEEL_ZOOM_STEP_DEFAULT,
            reference_opacity: REFERENCE_OPACITY_DEFAULT,
            image_max_dimension: IMAGE_MAX_DIMENSION_DEFAULT,
            show_debug: false,
            shape: ShapeSettings::default(),
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn finite_or_f64(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        Ok(config.sanitized())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let scale_min = finite_or(self.scale_min, d.scale_min).clamp(0.01, 1.0);
        let scale_max = finite_or(self.scale_max, d.scale_max).clamp(1.0, 50.0);
        Self {
            snap_distance: finite_or(self.snap_distance, d.snap_distance).clamp(1.0, 500.0),
            hold_delay_ms: finite_or_f64(self.hold_delay_ms, d.hold_delay_ms).clamp(0.0, 2000.0),
            tap_slop_px: finite_or(self.tap_slop_px, d.tap_slop_px).clamp(0.0, 100.0),
            edge_pan_band_px: finite_or(self.edge_pan_band_px, d.edge_pan_band_px)
                .clamp(0.0, 400.0),
            edge_pan_speed_px: finite_or(self.edge_pan_speed_px, d.edge_pan_speed_px)
                .clamp(0.0, 200.0),
            save_debounce_ms: finite_or_f64(self.save_debounce_ms, d.save_debounce_ms)
                .clamp(0.0, 60_000.0),
            broadcast_interval_ms: finite_or_f64(
                self.broadcast_interval_ms,
                d.broadcast_interval_ms,
            )
            .clamp(0.0, 10_000.0),
            remote_selection_timeout_ms: finite_or_f64(
                self.remote_selection_timeout_ms,
                d.remote_selection_timeout_ms,
            )
            .clamp(100.0, 3_600_000.0),
            scale_min,
            scale_max,
            wheel_zoom_step: finite_or(self.wheel_zoom_step, d.wheel_zoom_step).clamp(1.0, 4.0),
            reference_opacity: finite_or(self.reference_opacity, d.reference_opacity)
                .clamp(0.0, 1.0),
            image_max_dimension: self.image_max_dimension,
            show_debug: self.show_debug,
            shape: self.shape.sanitized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("snap_distance = 20.0\nhold_delay_ms = 300.0\n")
            .expect("config");
        assert_eq!(config.snap_distance, 20.0);
        assert_eq!(config.hold_delay_ms, 300.0);
        assert_eq!(config.save_debounce_ms, SAVE_DEBOUNCE_MS_DEFAULT);
        assert_eq!(config.shape, ShapeSettings::default());
    }

    #[test]
    fn nested_shape_table_parses() {
        let config = EngineConfig::from_toml_str("[shape]\ntab_size_ratio = 0.15\n").expect("config");
        assert_eq!(config.shape.tab_size_ratio, 0.15);
        assert_eq!(config.shape.neck_width, ShapeSettings::default().neck_width);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = EngineConfig::from_toml_str("scale_max = 900.0\nreference_opacity = 3.0\n")
            .expect("config");
        assert_eq!(config.scale_max, 50.0);
        assert_eq!(config.reference_opacity, 1.0);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("snap_distance = \"far\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
