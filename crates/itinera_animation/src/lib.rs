//! Itinera Animation
//!
//! Timeline construction and playback for narrative route animations.
//!
//! # Features
//!
//! - **Timeline Builder**: routes to a sorted, immutable event list with computed timings
//! - **Playback Scheduler**: play/pause/stop/seek/speed state machine driven by an injected frame clock
//! - **Path Growth**: progress to partially revealed great-circle polylines
//! - **Arrival Markers**: per-node ripple/breathing state machines with artifact previews
//! - **Interpolation**: linear and spherical interpolation
//!
//! # Example
//!
//! ```rust
//! use itinera_animation::{PlaybackConfig, PlaybackScheduler, PlaybackState, TimelineConfig};
//! use itinera_core::{Color, ManualClock, Route, Waypoint};
//! use std::rc::Rc;
//!
//! let clock = ManualClock::new();
//! let mut scheduler = PlaybackScheduler::new(
//!     Rc::new(clock.clone()),
//!     TimelineConfig::default(),
//!     PlaybackConfig::default(),
//! );
//! let routes = vec![Route::new(
//!     "london-paris",
//!     Waypoint::new("London", -0.1276, 51.5072),
//!     Waypoint::new("Paris", 2.3522, 48.8566),
//! )];
//! scheduler.load(&routes, Color::BLUE).unwrap();
//! scheduler.play().unwrap();
//!
//! clock.advance(500.0);
//! scheduler.tick();
//! assert_eq!(scheduler.state(), PlaybackState::Playing);
//! assert_eq!(scheduler.cursor_ms(), 500.0);
//! ```

pub mod error;
pub mod event;
pub mod marker;
pub mod path;
pub mod scheduler;
pub mod timeline;
pub mod values;

pub use itinera_core::Easing;
pub use error::{Result, SchedulerError};
pub use event::{EventKind, PlaybackState, ScheduledEvent};
pub use marker::{ArrivalMarker, ArtifactPreview, MarkerBoard, MarkerConfig, NodeVisualState};
pub use path::{GrowthUpdate, PathGrowth, PathGrowthLayer, SAMPLES_PER_SEGMENT, VISUALLY_COMPLETE};
pub use scheduler::{
    ActiveLineProgress, PlaybackConfig, PlaybackScheduler, SchedulerNotification, Transport,
};
pub use timeline::{build, RouteSpan, Timeline, TimelineConfig, TimelineNode};
pub use values::{Interpolate, SphericalInterpolate};
