//! Path growth
//!
//! Maps a route's `0..=1` progress onto a partially revealed great-circle
//! polyline. The layer knows nothing about time: it only reacts to the
//! progress values the scheduler reports.

use crate::event::ScheduledEvent;
use crate::scheduler::SchedulerNotification;
use crate::timeline::Timeline;
use crate::values::SphericalInterpolate;
use indexmap::IndexMap;
use itinera_core::{GeoPoint, RouteId};
use rustc_hash::FxHashMap;

/// Samples per great-circle segment
pub const SAMPLES_PER_SEGMENT: usize = 48;

/// Progress at which a path counts as visually complete
pub const VISUALLY_COMPLETE: f64 = 0.99;

/// One route's growing stroke
#[derive(Clone, Debug)]
pub struct PathGrowth {
    route: RouteId,
    samples: Vec<GeoPoint>,
    /// Cumulative arc length (radians) at each sample
    lengths: Vec<f64>,
    progress: f64,
    completion_signalled: bool,
}

impl PathGrowth {
    /// Sample the great circle through `coordinates`
    pub fn new(route: RouteId, coordinates: &[GeoPoint]) -> Self {
        let mut samples = Vec::with_capacity(
            coordinates.len().saturating_sub(1) * SAMPLES_PER_SEGMENT + 1,
        );
        if let Some(first) = coordinates.first() {
            samples.push(*first);
        }
        for pair in coordinates.windows(2) {
            for step in 1..=SAMPLES_PER_SEGMENT {
                let t = step as f64 / SAMPLES_PER_SEGMENT as f64;
                samples.push(pair[0].slerp(&pair[1], t));
            }
        }

        let mut lengths = Vec::with_capacity(samples.len());
        let mut total = 0.0;
        for (i, p) in samples.iter().enumerate() {
            if i > 0 {
                total += itinera_core::central_angle(samples[i - 1], *p);
            }
            lengths.push(total);
        }

        Self {
            route,
            samples,
            lengths,
            progress: 0.0,
            completion_signalled: false,
        }
    }

    pub fn route(&self) -> &RouteId {
        &self.route
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Total arc length in radians
    pub fn arc_length(&self) -> f64 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Record new progress. Returns true the first time progress reaches
    /// [`VISUALLY_COMPLETE`] since creation or the last [`PathGrowth::rewind`].
    pub fn set_progress(&mut self, progress: f64) -> bool {
        self.progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if self.progress >= VISUALLY_COMPLETE && !self.completion_signalled {
            self.completion_signalled = true;
            return true;
        }
        false
    }

    /// Re-arm the completion signal
    pub fn rewind(&mut self, progress: f64) {
        self.completion_signalled = false;
        self.progress = progress.clamp(0.0, 1.0);
    }

    /// The visible part of the path at the current progress
    pub fn revealed(&self) -> Vec<GeoPoint> {
        self.revealed_at(self.progress)
    }

    /// The visible part of the path at `progress`
    ///
    /// Deterministic: equal progress always yields the same polyline.
    pub fn revealed_at(&self, progress: f64) -> Vec<GeoPoint> {
        let Some(&first) = self.samples.first() else {
            return Vec::new();
        };
        let progress = progress.clamp(0.0, 1.0);
        if progress >= 1.0 {
            return self.samples.clone();
        }

        let target = self.arc_length() * progress;
        let whole = self.lengths.partition_point(|&len| len <= target);
        let mut points: Vec<GeoPoint> = self.samples[..whole.max(1)].to_vec();

        if whole > 0 && whole < self.samples.len() {
            let (a, b) = (self.samples[whole - 1], self.samples[whole]);
            let seg = self.lengths[whole] - self.lengths[whole - 1];
            if seg > 0.0 {
                let t = (target - self.lengths[whole - 1]) / seg;
                if t > 0.0 {
                    points.push(a.slerp(&b, t));
                }
            }
        } else if points.is_empty() {
            points.push(first);
        }
        points
    }
}

/// Output of the growth layer for one route
#[derive(Clone, Debug, PartialEq)]
pub struct GrowthUpdate {
    pub route: RouteId,
    pub progress: f64,
    /// Revealed polyline; empty when the route was rewound away
    pub revealed: Vec<GeoPoint>,
    /// True exactly once per play-through
    pub visually_complete: bool,
}

/// All growing routes of a loaded timeline
#[derive(Debug, Default)]
pub struct PathGrowthLayer {
    coordinates: FxHashMap<RouteId, [GeoPoint; 2]>,
    paths: IndexMap<RouteId, PathGrowth>,
}

impl PathGrowthLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known routes with those of `timeline`
    pub fn load(&mut self, timeline: &Timeline) {
        self.paths.clear();
        self.coordinates = timeline
            .spans()
            .iter()
            .map(|span| (span.route.clone(), span.coordinates()))
            .collect();
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.coordinates.clear();
    }

    /// React to one scheduler notification
    pub fn handle(&mut self, notification: &SchedulerNotification) -> Option<GrowthUpdate> {
        match notification {
            SchedulerNotification::Event(event) => match event {
                ScheduledEvent::LineStart { route, .. } => self.update(route, 0.0),
                ScheduledEvent::LineProgress {
                    route, progress, ..
                } => self.update(route, *progress),
                ScheduledEvent::LineComplete { route, .. } => self.update(route, 1.0),
                _ => None,
            },
            SchedulerNotification::Rewound(event) => match event {
                ScheduledEvent::LineStart { route, .. } => {
                    self.paths.shift_remove(route)?;
                    Some(GrowthUpdate {
                        route: route.clone(),
                        progress: 0.0,
                        revealed: Vec::new(),
                        visually_complete: false,
                    })
                }
                ScheduledEvent::LineComplete { route, .. } => {
                    let path = self.paths.get_mut(route)?;
                    let progress = path.progress().min(VISUALLY_COMPLETE - f64::EPSILON);
                    path.rewind(progress);
                    None
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn update(&mut self, route: &RouteId, progress: f64) -> Option<GrowthUpdate> {
        if !self.paths.contains_key(route) {
            let coords = self.coordinates.get(route)?;
            self.paths
                .insert(route.clone(), PathGrowth::new(route.clone(), coords));
        }
        let path = self.paths.get_mut(route)?;
        let visually_complete = path.set_progress(progress);
        Some(GrowthUpdate {
            route: route.clone(),
            progress: path.progress(),
            revealed: path.revealed(),
            visually_complete,
        })
    }

    pub fn get(&self, route: &RouteId) -> Option<&PathGrowth> {
        self.paths.get(route)
    }

    /// Started routes in start order
    pub fn paths(&self) -> impl Iterator<Item = &PathGrowth> {
        self.paths.values()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
