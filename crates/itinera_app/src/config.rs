//! Engine configuration
//!
//! A single TOML file with one section per subsystem. Every field has a
//! default, so an empty file (or no file) is a valid configuration.
//!
//! ```toml
//! [timeline]
//! base_duration_ms = 2000.0
//! ripple_delay_ms = 300.0
//!
//! [playback]
//! initial_speed = 1.0
//! loop_playback = false
//!
//! [camera]
//! follow_routes = true
//!
//! [overlay]
//! background = "#f4f1ea"
//! min_contrast_ratio = 4.5
//! ```

use crate::error::{EngineError, Result};
use itinera_animation::{MarkerConfig, PlaybackConfig, TimelineConfig};
use itinera_camera::CameraConfig;
use itinera_core::{Color, WCAG_AA_CONTRAST};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// =============================================================================
// Sections
// =============================================================================

/// Comparison-mode presentation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Map background the blended colors are checked against
    pub background: Color,
    pub min_contrast_ratio: f32,
    /// Theme color for a primary entity that has none
    pub primary_color: Color,
    /// Theme color for a secondary entity that has none
    pub secondary_color: Color,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0xf4f1ea),
            min_contrast_ratio: WCAG_AA_CONTRAST,
            primary_color: Color::from_hex(0x1f3a93),
            secondary_color: Color::from_hex(0x8e1b2c),
        }
    }
}

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeline: TimelineConfig,
    pub playback: PlaybackConfig,
    pub camera: CameraConfig,
    pub markers: MarkerConfig,
    pub overlay: OverlayConfig,
}

// =============================================================================
// Loading
// =============================================================================

impl EngineConfig {
    /// Read and parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Parse and validate a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reject values no clamp can make sense of
    pub fn validate(&self) -> Result<()> {
        let t = &self.timeline;
        if !(t.base_duration_ms.is_finite() && t.base_duration_ms > 0.0) {
            return Err(invalid("timeline.base_duration_ms must be positive"));
        }
        if !(t.ripple_delay_ms >= 0.0 && t.route_gap_ms >= 0.0) {
            return Err(invalid("timeline delays must not be negative"));
        }
        if !(t.undated_factor > 0.0) {
            return Err(invalid("timeline.undated_factor must be positive"));
        }
        if !(t.min_distance_factor > 0.0 && t.min_distance_factor <= t.max_distance_factor) {
            return Err(invalid(
                "timeline distance factors must satisfy 0 < min_distance_factor <= max_distance_factor",
            ));
        }

        let p = &self.playback;
        if !(p.min_speed > 0.0 && p.min_speed <= p.max_speed) {
            return Err(invalid(
                "playback speeds must satisfy 0 < min_speed <= max_speed",
            ));
        }

        let c = &self.camera;
        if !(c.min_zoom <= c.max_zoom) {
            return Err(invalid("camera.min_zoom must not exceed camera.max_zoom"));
        }
        if !(c.tile_size > 0.0) {
            return Err(invalid("camera.tile_size must be positive"));
        }
        if !(c.viewport_width > 0.0 && c.viewport_height > 0.0) {
            return Err(invalid("camera viewport must have a positive size"));
        }

        if !(self.markers.ripple_duration_ms >= 0.0) {
            return Err(invalid("markers.ripple_duration_ms must not be negative"));
        }
        if !(self.overlay.min_contrast_ratio >= 1.0) {
            return Err(invalid("overlay.min_contrast_ratio must be at least 1.0"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> EngineError {
    EngineError::Config(message.to_string())
}
