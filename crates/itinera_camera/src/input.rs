//! Manual camera input

use crate::projection::ScreenPoint;

/// Pointer deltas for one frame of manual navigation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraInput {
    /// Drag movement in pixels
    pub drag_delta: (f64, f64),
    /// Wheel notches (positive = zoom in)
    pub scroll_delta: f64,
    /// Pointer position the wheel zooms around
    pub anchor: Option<ScreenPoint>,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(dx: f64, dy: f64) -> Self {
        Self {
            drag_delta: (dx, dy),
            ..Self::default()
        }
    }

    pub fn scroll(delta: f64, anchor: ScreenPoint) -> Self {
        Self {
            scroll_delta: delta,
            anchor: Some(anchor),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.drag_delta == (0.0, 0.0) && self.scroll_delta == 0.0
    }
}
