//! Route data model
//!
//! The shapes handed over by the data-loading layer: an [`Entity`] owns
//! [`Work`]s, each work owns [`Route`]s, and each route connects two named
//! [`Waypoint`]s. Everything here is read-only input to the engine.
//!
//! Endpoints are `Option` at this boundary so malformed input (a `null`
//! endpoint) survives deserialization and is rejected by validation with a
//! descriptive [`TimelineError`] instead of a generic parse failure.

use crate::color::Color;
use crate::error::{Endpoint, Result, TimelineError};
use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Years accepted on routes and waypoints
pub const PLAUSIBLE_YEARS: RangeInclusive<i32> = -3000..=2100;

/// Identity of a geographic node (the waypoint name)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a route
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub String);

impl RouteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something produced at a place (a letter, a manuscript, a photograph)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A named geographic point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub artifact: Option<Artifact>,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            name: name.into(),
            lon,
            lat,
            year: None,
            artifact: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn coord(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::new(self.name.clone())
    }
}

/// One directed segment between two waypoints
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    #[serde(default)]
    pub from: Option<Waypoint>,
    #[serde(default)]
    pub to: Option<Waypoint>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl Route {
    pub fn new(id: impl Into<String>, from: Waypoint, to: Waypoint) -> Self {
        Self {
            id: RouteId::new(id),
            from: Some(from),
            to: Some(to),
            year: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// The year used for ordering: the route's own, else the destination's, else the origin's
    pub fn effective_year(&self) -> Option<i32> {
        self.year
            .or_else(|| self.to.as_ref().and_then(|w| w.year))
            .or_else(|| self.from.as_ref().and_then(|w| w.year))
    }

    /// Both endpoints, validated
    pub fn endpoints(&self) -> Result<(&Waypoint, &Waypoint)> {
        let from = self.endpoint(Endpoint::From)?;
        let to = self.endpoint(Endpoint::To)?;
        Ok((from, to))
    }

    fn endpoint(&self, which: Endpoint) -> Result<&Waypoint> {
        let waypoint = match which {
            Endpoint::From => self.from.as_ref(),
            Endpoint::To => self.to.as_ref(),
        }
        .ok_or_else(|| TimelineError::MissingEndpoint {
            route: self.id.0.clone(),
            endpoint: which,
        })?;

        if !waypoint.coord().is_valid() {
            return Err(TimelineError::InvalidCoordinate {
                route: self.id.0.clone(),
                endpoint: which,
                lon: waypoint.lon,
                lat: waypoint.lat,
            });
        }
        if let Some(year) = waypoint.year {
            check_year(&self.id, year)?;
        }
        Ok(waypoint)
    }

    /// Check every invariant a route must satisfy before it can be scheduled
    pub fn validate(&self) -> Result<()> {
        self.endpoints()?;
        if let Some(year) = self.year {
            check_year(&self.id, year)?;
        }
        Ok(())
    }
}

fn check_year(route: &RouteId, year: i32) -> Result<()> {
    if PLAUSIBLE_YEARS.contains(&year) {
        Ok(())
    } else {
        Err(TimelineError::YearOutOfRange {
            route: route.0.clone(),
            year,
        })
    }
}

/// A work (book, journey, correspondence) grouping routes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Work {
    /// Routes with the work's year filled in wherever no other year is known
    pub fn routes_with_inherited_year(&self) -> impl Iterator<Item = Route> + '_ {
        self.routes.iter().map(move |route| {
            let mut route = route.clone();
            if route.effective_year().is_none() {
                route.year = self.year;
            }
            route
        })
    }
}

/// The tracked subject whose works drive a timeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub works: Vec<Work>,
}

impl Entity {
    /// Every route across every work, in declaration order, with work years inherited
    pub fn routes(&self) -> Vec<Route> {
        self.works
            .iter()
            .flat_map(|work| work.routes_with_inherited_year())
            .collect()
    }

    pub fn route_count(&self) -> usize {
        self.works.iter().map(|w| w.routes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> Waypoint {
        Waypoint::new("London", -0.1276, 51.5072)
    }

    fn paris() -> Waypoint {
        Waypoint::new("Paris", 2.3522, 48.8566)
    }

    #[test]
    fn test_effective_year_fallbacks() {
        let route = Route::new("r", london(), paris().with_year(1922));
        assert_eq!(route.effective_year(), Some(1922));

        let route = Route::new("r", london().with_year(1910), paris());
        assert_eq!(route.effective_year(), Some(1910));

        let route = Route::new("r", london().with_year(1910), paris()).with_year(1930);
        assert_eq!(route.effective_year(), Some(1930));
    }

    #[test]
    fn test_missing_endpoint_is_rejected() {
        let mut route = Route::new("r1", london(), paris());
        route.to = None;
        assert_eq!(
            route.validate(),
            Err(TimelineError::MissingEndpoint {
                route: "r1".into(),
                endpoint: Endpoint::To,
            })
        );
    }

    #[test]
    fn test_year_range_enforced() {
        let route = Route::new("r", london(), paris()).with_year(9999);
        assert!(matches!(
            route.validate(),
            Err(TimelineError::YearOutOfRange { year: 9999, .. })
        ));
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let route = Route::new("r", Waypoint::new("Nowhere", 200.0, 0.0), paris());
        assert!(matches!(
            route.validate(),
            Err(TimelineError::InvalidCoordinate {
                endpoint: Endpoint::From,
                ..
            })
        ));
    }

    #[test]
    fn test_work_year_inherited_only_when_missing() {
        let work = Work {
            id: "w".into(),
            title: "Letters".into(),
            year: Some(1900),
            routes: vec![
                Route::new("dated", london(), paris()).with_year(1950),
                Route::new("undated", london(), paris()),
            ],
        };
        let years: Vec<_> = work
            .routes_with_inherited_year()
            .map(|r| r.effective_year())
            .collect();
        assert_eq!(years, vec![Some(1950), Some(1900)]);
    }

    #[test]
    fn test_entity_deserializes_with_null_endpoint() {
        let json = r##"{
            "id": "e1",
            "name": "Traveller",
            "color": "#336699",
            "works": [{
                "id": "w1",
                "year": 1920,
                "routes": [{ "id": "r1", "from": null, "to": { "name": "Paris", "lon": 2.35, "lat": 48.85 } }]
            }]
        }"##;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.route_count(), 1);
        let routes = entity.routes();
        assert!(matches!(
            routes[0].validate(),
            Err(TimelineError::MissingEndpoint {
                endpoint: Endpoint::From,
                ..
            })
        ));
        assert_eq!(routes[0].effective_year(), Some(1920));
    }
}
