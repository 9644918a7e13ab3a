//! Itinera Core
//!
//! Foundational types for the narrative timeline engine:
//!
//! - **Data Model**: entities, works, routes and waypoints handed over by the data layer
//! - **Geo Math**: coordinates, bounding boxes, haversine and great-circle helpers
//! - **Colors**: sRGB colors with Oklab mixing and WCAG contrast checks
//! - **Easing**: easing curves shared by playback and camera transitions
//! - **Subscriptions**: single-threaded observer registry with unsubscribe handles
//! - **Frame Clocks**: injectable per-frame tick sources, including a manual clock for tests
//! - **Interaction Lock**: shared auto/manual mode for autoplay versus user input
//!
//! # Example
//!
//! ```rust
//! use itinera_core::{Route, Waypoint};
//!
//! let route = Route::new(
//!     "london-paris",
//!     Waypoint::new("London", -0.1276, 51.5072),
//!     Waypoint::new("Paris", 2.3522, 48.8566),
//! )
//! .with_year(1921);
//!
//! assert!(route.validate().is_ok());
//! assert_eq!(route.effective_year(), Some(1921));
//! ```

pub mod clock;
pub mod color;
pub mod easing;
pub mod error;
pub mod geo;
pub mod interaction;
pub mod model;
pub mod subscription;

pub use clock::{FrameClock, ManualClock, SystemClock};
pub use color::{Color, WCAG_AA_CONTRAST};
pub use easing::Easing;
pub use error::{Endpoint, Result, TimelineError};
pub use geo::{central_angle, haversine_km, GeoBounds, GeoPoint, EARTH_RADIUS_KM};
pub use interaction::{InteractionLock, InteractionMode};
pub use model::{Artifact, Entity, NodeId, Route, RouteId, Waypoint, Work, PLAUSIBLE_YEARS};
pub use subscription::{SubscriberId, SubscriptionHandle, Subscribers};
