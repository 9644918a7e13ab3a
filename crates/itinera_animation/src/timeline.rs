//! Timeline Builder
//!
//! Turns a list of routes into an immutable, time-ordered event list.
//!
//! Each route gets a duration of
//! `base_duration * distance_factor(km) * year_factor(year)` and a slot on
//! the timeline. Routes are ordered by effective year ascending; undated
//! routes play after every dated route and ties keep declaration order.
//! Per route the builder emits a `LineStart`, a `LineComplete` and, for the
//! first arrival at each destination node, a `NodeTrigger` `ripple_delay`
//! after completion.
//!
//! # Example
//!
//! ```
//! use itinera_animation::{Timeline, TimelineConfig};
//! use itinera_core::{Color, Route, Waypoint};
//!
//! let routes = vec![Route::new(
//!     "london-paris",
//!     Waypoint::new("London", -0.1276, 51.5072),
//!     Waypoint::new("Paris", 2.3522, 48.8566),
//! )];
//! let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
//! assert_eq!(timeline.events().len(), 3);
//! ```

use crate::event::{EventKind, ScheduledEvent};
use indexmap::IndexMap;
use itinera_core::{
    Artifact, Color, GeoPoint, NodeId, Result, Route, RouteId, TimelineError, Waypoint,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Timing tunables for the builder
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Duration of a route before distance and year scaling
    pub base_duration_ms: f64,
    /// Delay between a route completing and its destination node triggering
    pub ripple_delay_ms: f64,
    /// Pause between consecutive route slots
    pub route_gap_ms: f64,
    /// Duration multiplier for routes with no year anywhere
    pub undated_factor: f64,
    pub min_distance_factor: f64,
    pub max_distance_factor: f64,
    /// Consecutive routes sharing a year share one slot
    pub parallel_same_year: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            base_duration_ms: 2000.0,
            ripple_delay_ms: 300.0,
            route_gap_ms: 250.0,
            undated_factor: 0.75,
            min_distance_factor: 0.6,
            max_distance_factor: 2.5,
            parallel_same_year: false,
        }
    }
}

impl TimelineConfig {
    /// Duration multiplier for a route of `km` kilometres
    ///
    /// Non-decreasing in distance and clamped to the configured bounds.
    pub fn distance_factor(&self, km: f64) -> f64 {
        let km = if km.is_finite() { km.max(0.0) } else { 0.0 };
        let (lo, hi) = ordered(self.min_distance_factor, self.max_distance_factor);
        (0.6 + (km / 1000.0).sqrt() * 0.5).clamp(lo, hi)
    }

    pub fn year_factor(&self, year: Option<i32>) -> f64 {
        match year {
            Some(_) => 1.0,
            None => self.undated_factor,
        }
    }

    /// Duration of a single route, never shorter than one millisecond
    pub fn route_duration_ms(&self, km: f64, year: Option<i32>) -> f64 {
        (self.base_duration_ms * self.distance_factor(km) * self.year_factor(year)).max(1.0)
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// One route's slot on the timeline
#[derive(Clone, Debug, PartialEq)]
pub struct RouteSpan {
    pub route: RouteId,
    /// Position in the input slice
    pub declared: usize,
    pub year: Option<i32>,
    pub from: Waypoint,
    pub to: Waypoint,
    pub distance_km: f64,
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl RouteSpan {
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }

    /// Growth progress at `cursor_ms`, clamped to `0..=1`
    pub fn progress_at(&self, cursor_ms: f64) -> f64 {
        ((cursor_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    pub fn contains(&self, cursor_ms: f64) -> bool {
        self.start_ms <= cursor_ms && cursor_ms <= self.end_ms()
    }

    pub fn coordinates(&self) -> [GeoPoint; 2] {
        [self.from.coord(), self.to.coord()]
    }
}

/// A geographic node touched by the timeline
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineNode {
    pub id: NodeId,
    pub coord: GeoPoint,
    pub artifact: Option<Artifact>,
    /// Time of the node's `NodeTrigger`; `None` for origin-only nodes
    pub trigger_ms: Option<f64>,
}

/// Immutable result of building routes into events
#[derive(Clone, Debug)]
pub struct Timeline {
    events: Vec<ScheduledEvent>,
    spans: Vec<RouteSpan>,
    span_index: FxHashMap<RouteId, usize>,
    nodes: IndexMap<NodeId, TimelineNode>,
    color: Color,
    total_duration_ms: f64,
}

impl Timeline {
    /// Build a timeline
    ///
    /// Fails if `routes` is empty, any route is malformed, or two routes
    /// share an id.
    pub fn build(routes: &[Route], base_color: Color, config: &TimelineConfig) -> Result<Self> {
        if routes.is_empty() {
            return Err(TimelineError::EmptyRoutes);
        }

        let mut seen = FxHashSet::default();
        for route in routes {
            route.validate()?;
            if !seen.insert(&route.id) {
                return Err(TimelineError::DuplicateRoute(route.id.0.clone()));
            }
        }

        // Dated routes ascending, undated last; the sort is stable so ties
        // keep declaration order
        let mut order: Vec<usize> = (0..routes.len()).collect();
        order.sort_by_key(|&i| match routes[i].effective_year() {
            Some(year) => (0, year),
            None => (1, 0),
        });

        let spans = assign_slots(routes, &order, config)?;
        let span_index = spans
            .iter()
            .enumerate()
            .map(|(i, span)| (span.route.clone(), i))
            .collect();
        let nodes = collect_nodes(&spans, config);

        let mut events = Vec::with_capacity(spans.len() * 3);
        for span in &spans {
            events.push(ScheduledEvent::LineStart {
                route: span.route.clone(),
                time_ms: span.start_ms,
                duration_ms: span.duration_ms,
                color: base_color,
            });
            events.push(ScheduledEvent::LineComplete {
                route: span.route.clone(),
                time_ms: span.end_ms(),
                duration_ms: span.duration_ms,
            });
        }
        for node in nodes.values() {
            let Some(time_ms) = node.trigger_ms else {
                continue;
            };
            let arrival = first_arrival(&spans, &node.id);
            if let Some(span) = arrival {
                events.push(ScheduledEvent::NodeTrigger {
                    node: node.id.clone(),
                    route: span.route.clone(),
                    time_ms,
                    has_artifact: node.artifact.is_some(),
                });
            }
        }

        let declared: FxHashMap<&RouteId, usize> =
            spans.iter().map(|s| (&s.route, s.declared)).collect();
        let sort_key = |event: &ScheduledEvent| {
            let decl = event
                .route()
                .and_then(|r| declared.get(r).copied())
                .unwrap_or(usize::MAX);
            (decl, kind_rank(event.kind()))
        };
        events.sort_by(|a, b| {
            a.time_ms()
                .total_cmp(&b.time_ms())
                .then_with(|| sort_key(a).cmp(&sort_key(b)))
        });

        let total_duration_ms = events
            .iter()
            .map(ScheduledEvent::time_ms)
            .fold(0.0, f64::max);

        tracing::debug!(
            routes = spans.len(),
            events = events.len(),
            nodes = nodes.len(),
            total_duration_ms,
            "built timeline"
        );

        Ok(Self {
            events,
            spans,
            span_index,
            nodes,
            color: base_color,
            total_duration_ms,
        })
    }

    /// Events sorted by `(time, declaration order, kind)`
    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.total_duration_ms
    }

    /// Route slots in playback order
    pub fn spans(&self) -> &[RouteSpan] {
        &self.spans
    }

    pub fn span(&self, route: &RouteId) -> Option<&RouteSpan> {
        self.span_index.get(route).map(|&i| &self.spans[i])
    }

    /// Every node touched by a route, in playback order of first appearance
    pub fn nodes(&self) -> &IndexMap<NodeId, TimelineNode> {
        &self.nodes
    }

    /// Nodes that receive a `NodeTrigger`, with their trigger time
    pub fn node_triggers(&self) -> impl Iterator<Item = (&NodeId, f64)> + '_ {
        self.nodes
            .values()
            .filter_map(|node| node.trigger_ms.map(|t| (&node.id, t)))
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Number of events whose time is `<= time_ms`
    ///
    /// Events are sorted, so the first `events_until(t)` events are exactly
    /// the ones at or before `t`.
    pub fn events_until(&self, time_ms: f64) -> usize {
        self.events.partition_point(|e| e.time_ms() <= time_ms)
    }
}

/// Build a timeline and return its events and total duration
pub fn build(
    routes: &[Route],
    base_color: Color,
    config: &TimelineConfig,
) -> Result<(Vec<ScheduledEvent>, f64)> {
    let timeline = Timeline::build(routes, base_color, config)?;
    let total = timeline.total_duration_ms;
    Ok((timeline.events, total))
}

fn kind_rank(kind: EventKind) -> u8 {
    match kind {
        EventKind::LineStart => 0,
        EventKind::LineProgress => 1,
        EventKind::LineComplete => 2,
        EventKind::NodeTrigger => 3,
        EventKind::PlaybackStateChange => 4,
    }
}

fn assign_slots(
    routes: &[Route],
    order: &[usize],
    config: &TimelineConfig,
) -> Result<Vec<RouteSpan>> {
    let gap = config.route_gap_ms.max(0.0);
    let mut spans: Vec<RouteSpan> = Vec::with_capacity(order.len());
    let mut slot_start = 0.0;
    let mut slot_end = 0.0;

    for (position, &declared) in order.iter().enumerate() {
        let route = &routes[declared];
        let (from, to) = route.endpoints()?;
        let year = route.effective_year();
        let distance_km = from.coord().haversine_km(&to.coord());
        let duration_ms = config.route_duration_ms(distance_km, year);

        let shares_slot = config.parallel_same_year
            && year.is_some()
            && spans.last().is_some_and(|prev| prev.year == year);

        if position > 0 && !shares_slot {
            slot_start = slot_end + gap;
        }
        let end = slot_start + duration_ms;
        slot_end = if shares_slot { f64::max(slot_end, end) } else { end };

        spans.push(RouteSpan {
            route: route.id.clone(),
            declared,
            year,
            from: from.clone(),
            to: to.clone(),
            distance_km,
            start_ms: slot_start,
            duration_ms,
        });
    }
    Ok(spans)
}

fn collect_nodes(spans: &[RouteSpan], config: &TimelineConfig) -> IndexMap<NodeId, TimelineNode> {
    let delay = config.ripple_delay_ms.max(0.0);
    let mut nodes: IndexMap<NodeId, TimelineNode> = IndexMap::new();

    for span in spans {
        for (waypoint, arrival) in [(&span.from, None), (&span.to, Some(span.end_ms() + delay))] {
            let entry = nodes
                .entry(waypoint.node_id())
                .or_insert_with(|| TimelineNode {
                    id: waypoint.node_id(),
                    coord: waypoint.coord(),
                    artifact: None,
                    trigger_ms: None,
                });
            if entry.artifact.is_none() {
                entry.artifact = waypoint.artifact.clone();
            }
            if let Some(t) = arrival {
                entry.trigger_ms = Some(entry.trigger_ms.map_or(t, |prev| prev.min(t)));
            }
        }
    }
    nodes
}

/// The earliest-completing route into `node`, declaration order breaking ties
fn first_arrival<'a>(spans: &'a [RouteSpan], node: &NodeId) -> Option<&'a RouteSpan> {
    spans
        .iter()
        .filter(|span| span.to.name == node.0)
        .min_by(|a, b| match a.end_ms().total_cmp(&b.end_ms()) {
            Ordering::Equal => a.declared.cmp(&b.declared),
            other => other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use itinera_core::Endpoint;

    fn wp(name: &str, lon: f64, lat: f64) -> Waypoint {
        Waypoint::new(name, lon, lat)
    }

    fn london() -> Waypoint {
        wp("London", -0.1276, 51.5072)
    }

    fn paris() -> Waypoint {
        wp("Paris", 2.3522, 48.8566)
    }

    fn rome() -> Waypoint {
        wp("Rome", 12.4964, 41.9028)
    }

    fn start_times(timeline: &Timeline) -> Vec<(String, f64)> {
        timeline
            .events()
            .iter()
            .filter_map(|e| match e {
                ScheduledEvent::LineStart { route, time_ms, .. } => {
                    Some((route.0.clone(), *time_ms))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_routes_rejected() {
        let err = Timeline::build(&[], Color::BLUE, &TimelineConfig::default()).unwrap_err();
        assert_eq!(err, TimelineError::EmptyRoutes);
    }

    #[test]
    fn test_null_endpoint_rejected() {
        let mut route = Route::new("broken", london(), paris());
        route.from = None;
        let err =
            Timeline::build(&[route], Color::BLUE, &TimelineConfig::default()).unwrap_err();
        assert_eq!(
            err,
            TimelineError::MissingEndpoint {
                route: "broken".into(),
                endpoint: Endpoint::From,
            }
        );
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let routes = vec![
            Route::new("r", london(), paris()),
            Route::new("r", paris(), rome()),
        ];
        let err = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap_err();
        assert_eq!(err, TimelineError::DuplicateRoute("r".into()));
    }

    #[test]
    fn test_routes_sorted_by_year() {
        let routes = vec![
            Route::new("a", london(), paris()).with_year(1920),
            Route::new("b", paris(), rome()).with_year(1921),
            Route::new("c", rome(), london()).with_year(1919),
        ];
        let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
        let starts = start_times(&timeline);
        let ids: Vec<_> = starts.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(starts.windows(2).all(|w| w[0].1 < w[1].1));
    }

    #[test]
    fn test_undated_routes_play_last_in_declaration_order() {
        let routes = vec![
            Route::new("u1", london(), paris()),
            Route::new("d", paris(), rome()).with_year(1930),
            Route::new("u2", rome(), london()),
        ];
        let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
        let ids: Vec<_> = timeline.spans().iter().map(|s| s.route.0.clone()).collect();
        assert_eq!(ids, vec!["d", "u1", "u2"]);
    }

    #[test]
    fn test_event_time_ordering_per_route() {
        let routes = vec![
            Route::new("a", london(), paris()).with_year(1920),
            Route::new("b", paris(), rome()),
            Route::new("c", rome(), wp("Athens", 23.7275, 37.9838)).with_year(1890),
        ];
        let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
        for span in timeline.spans() {
            assert!(span.start_ms < span.end_ms());
        }
        for event in timeline.events() {
            if let ScheduledEvent::NodeTrigger { route, time_ms, .. } = event {
                let span = timeline.span(route).unwrap();
                assert!(*time_ms >= span.end_ms());
            }
        }
        assert!(timeline
            .events()
            .windows(2)
            .all(|w| w[0].time_ms() <= w[1].time_ms()));
    }

    #[test]
    fn test_shared_destination_triggers_once_at_first_arrival() {
        // Both routes share a slot starting at 0. The distance clamp pins
        // London -> Paris to 5000 ms and the longer Rome -> Paris to 5200 ms.
        let config = TimelineConfig {
            base_duration_ms: 5000.0,
            min_distance_factor: 1.0,
            max_distance_factor: 1.04,
            parallel_same_year: true,
            ..TimelineConfig::default()
        };
        let routes = vec![
            Route::new("from-rome", rome(), paris()).with_year(1920),
            Route::new("from-london", london(), paris()).with_year(1920),
        ];
        let timeline = Timeline::build(&routes, Color::BLUE, &config).unwrap();
        let rome_span = timeline.span(&RouteId::new("from-rome")).unwrap();
        let london_span = timeline.span(&RouteId::new("from-london")).unwrap();
        assert_eq!(london_span.end_ms(), 5000.0);
        assert!((rome_span.end_ms() - 5200.0).abs() < 1e-6);

        let triggers: Vec<_> = timeline
            .events()
            .iter()
            .filter(|e| matches!(e, ScheduledEvent::NodeTrigger { node, .. } if node.as_str() == "Paris"))
            .collect();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].time_ms(), 5000.0 + config.ripple_delay_ms);
        assert_eq!(
            triggers[0].route().map(RouteId::as_str),
            Some("from-london")
        );
    }

    #[test]
    fn test_sequential_arrivals_trigger_once() {
        let routes = vec![
            Route::new("one", london(), paris()).with_year(1900),
            Route::new("two", rome(), paris()).with_year(1901),
        ];
        let config = TimelineConfig::default();
        let timeline = Timeline::build(&routes, Color::BLUE, &config).unwrap();
        let paris_triggers = timeline
            .events()
            .iter()
            .filter(|e| e.kind() == EventKind::NodeTrigger)
            .filter(|e| matches!(e, ScheduledEvent::NodeTrigger { node, .. } if node.as_str() == "Paris"))
            .count();
        assert_eq!(paris_triggers, 1);
        let first = &timeline.spans()[0];
        assert_eq!(
            timeline.nodes()[&NodeId::new("Paris")].trigger_ms,
            Some(first.end_ms() + config.ripple_delay_ms)
        );
    }

    #[test]
    fn test_parallel_same_year_shares_slot() {
        let config = TimelineConfig {
            parallel_same_year: true,
            ..TimelineConfig::default()
        };
        let routes = vec![
            Route::new("a", london(), paris()).with_year(1920),
            Route::new("b", london(), rome()).with_year(1920),
            Route::new("c", rome(), paris()).with_year(1921),
        ];
        let timeline = Timeline::build(&routes, Color::BLUE, &config).unwrap();
        let spans = timeline.spans();
        assert_eq!(spans[0].start_ms, spans[1].start_ms);
        let slot_end = spans[0].end_ms().max(spans[1].end_ms());
        assert!((spans[2].start_ms - (slot_end + config.route_gap_ms)).abs() < 1e-9);

        // Simultaneous starts dispatch in declaration order
        let starts = start_times(&timeline);
        assert_eq!(starts[0].0, "a");
        assert_eq!(starts[1].0, "b");
    }

    #[test]
    fn test_distance_factor_is_monotonic_and_clamped() {
        let config = TimelineConfig::default();
        let mut prev = 0.0;
        for km in [0.0, 10.0, 100.0, 1000.0, 5000.0, 20000.0] {
            let f = config.distance_factor(km);
            assert!(f >= prev);
            assert!((0.6..=2.5).contains(&f));
            prev = f;
        }
        assert_eq!(config.distance_factor(f64::NAN), 0.6);
    }

    #[test]
    fn test_undated_routes_are_shorter() {
        let config = TimelineConfig::default();
        let dated = config.route_duration_ms(500.0, Some(1900));
        let undated = config.route_duration_ms(500.0, None);
        assert!((undated - dated * 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_total_duration_is_last_event() {
        let routes = vec![
            Route::new("a", london(), paris()),
            Route::new("b", paris(), rome()),
        ];
        let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
        let last = timeline.events().last().unwrap();
        assert_eq!(timeline.total_duration_ms(), last.time_ms());
        assert_eq!(last.kind(), EventKind::NodeTrigger);
    }

    #[test]
    fn test_events_until_partitions() {
        let routes = vec![Route::new("a", london(), paris())];
        let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
        assert_eq!(timeline.events_until(-1.0), 0);
        assert_eq!(timeline.events_until(0.0), 1);
        assert_eq!(
            timeline.events_until(timeline.total_duration_ms()),
            timeline.events().len()
        );
    }

    #[test]
    fn test_origin_only_node_never_triggers() {
        let routes = vec![Route::new("a", london(), paris())];
        let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
        assert_eq!(timeline.nodes()[&NodeId::new("London")].trigger_ms, None);
        assert_eq!(timeline.node_triggers().count(), 1);
    }

    #[test]
    fn test_build_fn_matches_timeline() {
        let routes = vec![Route::new("a", london(), paris()).with_year(1920)];
        let config = TimelineConfig::default();
        let (events, total) = build(&routes, Color::RED, &config).unwrap();
        let timeline = Timeline::build(&routes, Color::RED, &config).unwrap();
        assert_eq!(events, timeline.events());
        assert_eq!(total, timeline.total_duration_ms());
    }
}
