//! Itinera App
//!
//! Composition layer of the narrative timeline engine.
//!
//! # Features
//!
//! - **Narrative Engine**: one entity's scheduler, markers, path growth and camera behind a per-frame call
//! - **Overlay Comparison**: two entities merged on one map, linked or independent playback, blended colors
//! - **Interaction Sync**: autoplay and manual pan/zoom kept mutually exclusive through a shared lock
//! - **Configuration**: TOML engine configuration with defaults for every field
//!
//! # Example
//!
//! ```rust
//! use itinera_app::{EngineConfig, NarrativeEngine};
//! use itinera_core::{Entity, ManualClock, Route, Waypoint, Work};
//! use std::rc::Rc;
//!
//! let entity = Entity {
//!     id: "woolf".to_string(),
//!     name: "Virginia Woolf".to_string(),
//!     color: None,
//!     works: vec![Work {
//!         id: "orlando".to_string(),
//!         title: "Orlando".to_string(),
//!         year: Some(1928),
//!         routes: vec![Route::new(
//!             "london-cassis",
//!             Waypoint::new("London", -0.1276, 51.5072),
//!             Waypoint::new("Cassis", 5.5380, 43.2140),
//!         )],
//!     }],
//! };
//!
//! let clock = ManualClock::new();
//! let mut engine = NarrativeEngine::new(Rc::new(clock.clone()), EngineConfig::default());
//! engine.load_entity(&entity).unwrap();
//! engine.play().unwrap();
//!
//! clock.advance(16.0);
//! let report = engine.frame();
//! assert_eq!(report.cursor_ms, 16.0);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod overlay;

pub use config::{EngineConfig, OverlayConfig};
pub use engine::{FrameReport, NarrativeEngine};
pub use error::{EngineError, Result};
pub use interaction::{InteractionHandler, InteractionOutcome, PointerInput};
pub use overlay::{
    blend_colors, merge, trajectory_similarity, EntityRole, MergedNode, OverlayController,
    OverlayMerge, OverlayMode, OverlayState, PresentationColor, TaggedRoute,
};
