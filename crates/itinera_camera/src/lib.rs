//! Itinera Camera
//!
//! Camera framing for the base map:
//!
//! - [`CameraController`] - bounding-box fitting, smart fly-to, manual pan/zoom
//! - [`projection`] - Web Mercator conversions between coordinates and pixels
//! - [`CameraInput`] - per-frame manual drag and wheel deltas
//!
//! The controller never renders. It emits [`CameraUpdate`]s that the base
//! map applies with its own pan/zoom primitive.

mod controller;
mod input;
pub mod projection;
mod state;

pub use controller::CameraController;
pub use input::CameraInput;
pub use projection::{ScreenPoint, MAX_MERCATOR_LAT};
pub use state::{CameraConfig, CameraState, CameraUpdate, FlyTo};
