//! Camera state, configuration and fly-to targets

use itinera_core::{Easing, GeoPoint};
use serde::{Deserialize, Serialize};

/// What the base map is showing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub center: GeoPoint,
    pub zoom: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Inset in pixels kept clear on every side when fitting bounds
    pub padding: f64,
}

impl CameraState {
    /// Viewport size minus padding on both sides, never below one pixel
    pub fn usable_size(&self) -> (f64, f64) {
        (
            (self.viewport_width - 2.0 * self.padding).max(1.0),
            (self.viewport_height - 2.0 * self.padding).max(1.0),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub tile_size: f64,
    /// Extra margin added around an entity's bounding box
    pub bbox_buffer_ratio: f64,
    pub fly_duration_ms: f64,
    pub fly_easing: Easing,
    /// Fly to each route as it starts during autoplay
    pub follow_routes: bool,
    pub follow_padding_ratio: f64,
    /// Zoom levels per wheel notch
    pub wheel_zoom_step: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub padding: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 10.0,
            tile_size: 256.0,
            bbox_buffer_ratio: 0.2,
            fly_duration_ms: 1200.0,
            fly_easing: Easing::EaseInOutCubic,
            follow_routes: true,
            follow_padding_ratio: 0.5,
            wheel_zoom_step: 0.5,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            padding: 32.0,
        }
    }
}

impl CameraConfig {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        let (lo, hi) = if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        };
        if zoom.is_nan() {
            return lo;
        }
        zoom.clamp(lo, hi)
    }
}

/// A camera transition for the base map to perform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlyTo {
    pub center: GeoPoint,
    pub zoom: f64,
    pub duration_ms: f64,
    pub easing: Easing,
}

impl FlyTo {
    /// Center and zoom `elapsed_ms` into the transition from `from`
    pub fn sample(&self, from: &CameraState, elapsed_ms: f64) -> (GeoPoint, f64) {
        let t = if self.duration_ms > 0.0 {
            (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eased = self.easing.apply(t as f32) as f64;
        let lerp = |a: f64, b: f64| a + (b - a) * eased;
        (
            GeoPoint::new(
                lerp(from.center.lon, self.center.lon),
                lerp(from.center.lat, self.center.lat),
            ),
            lerp(from.zoom, self.zoom),
        )
    }
}

/// Delivered to camera subscribers whenever the state changes
#[derive(Clone, Debug, PartialEq)]
pub struct CameraUpdate {
    pub state: CameraState,
    /// Present when the change came from a fly-to rather than a manual delta
    pub fly_to: Option<FlyTo>,
}
