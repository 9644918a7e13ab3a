//! Construction errors for route input

use thiserror::Error;

/// Which end of a route an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    From,
    To,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::From => f.write_str("origin"),
            Endpoint::To => f.write_str("destination"),
        }
    }
}

/// Errors raised while validating routes or building a timeline
///
/// These are fatal: a caller receiving one must not start playback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// No routes were supplied
    #[error("cannot build a timeline from an empty route list")]
    EmptyRoutes,

    /// A route is missing one of its endpoints
    #[error("route `{route}` has no {endpoint}")]
    MissingEndpoint { route: String, endpoint: Endpoint },

    /// An endpoint coordinate is not a finite lon/lat pair
    #[error("route `{route}` has an invalid {endpoint} coordinate ({lon}, {lat})")]
    InvalidCoordinate {
        route: String,
        endpoint: Endpoint,
        lon: f64,
        lat: f64,
    },

    /// A year outside the plausible historical range
    #[error("route `{route}` has year {year}, outside the supported range")]
    YearOutOfRange { route: String, year: i32 },

    /// Two routes share an id
    #[error("duplicate route id `{0}`")]
    DuplicateRoute(String),

    /// A color string could not be parsed
    #[error("invalid color `{0}`")]
    InvalidColor(String),
}

/// Result type for itinera_core operations
pub type Result<T> = std::result::Result<T, TimelineError>;
