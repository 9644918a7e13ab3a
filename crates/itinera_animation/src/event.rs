//! Scheduled events and playback states

use itinera_core::{Color, NodeId, RouteId};
use std::fmt;

/// Playback state owned by the scheduler
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Nothing loaded
    #[default]
    Idle,
    /// Timeline loaded, cursor at the start
    Ready,
    Playing,
    Paused,
    /// Transient state while a seek recomputes fired events
    Seeking,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Seeking => "seeking",
        };
        f.write_str(name)
    }
}

/// Discriminant of a [`ScheduledEvent`], ordered by dispatch rank for
/// events sharing a timestamp and route
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    LineStart,
    LineProgress,
    LineComplete,
    NodeTrigger,
    PlaybackStateChange,
}

/// A time-stamped occurrence on the timeline
///
/// All times are milliseconds from timeline zero.
#[derive(Clone, Debug, PartialEq)]
pub enum ScheduledEvent {
    /// A route begins growing
    LineStart {
        route: RouteId,
        time_ms: f64,
        duration_ms: f64,
        color: Color,
    },
    /// A growing route advanced; emitted per tick, never stored in the timeline
    LineProgress {
        route: RouteId,
        time_ms: f64,
        duration_ms: f64,
        progress: f64,
    },
    /// A route finished growing
    LineComplete {
        route: RouteId,
        time_ms: f64,
        duration_ms: f64,
    },
    /// First arrival at a node
    NodeTrigger {
        node: NodeId,
        /// The route whose arrival triggered the node
        route: RouteId,
        time_ms: f64,
        has_artifact: bool,
    },
    PlaybackStateChange {
        time_ms: f64,
        from: PlaybackState,
        to: PlaybackState,
    },
}

impl ScheduledEvent {
    pub fn time_ms(&self) -> f64 {
        match self {
            ScheduledEvent::LineStart { time_ms, .. }
            | ScheduledEvent::LineProgress { time_ms, .. }
            | ScheduledEvent::LineComplete { time_ms, .. }
            | ScheduledEvent::NodeTrigger { time_ms, .. }
            | ScheduledEvent::PlaybackStateChange { time_ms, .. } => *time_ms,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ScheduledEvent::LineStart { .. } => EventKind::LineStart,
            ScheduledEvent::LineProgress { .. } => EventKind::LineProgress,
            ScheduledEvent::LineComplete { .. } => EventKind::LineComplete,
            ScheduledEvent::NodeTrigger { .. } => EventKind::NodeTrigger,
            ScheduledEvent::PlaybackStateChange { .. } => EventKind::PlaybackStateChange,
        }
    }

    /// The route this event belongs to, if any
    pub fn route(&self) -> Option<&RouteId> {
        match self {
            ScheduledEvent::LineStart { route, .. }
            | ScheduledEvent::LineProgress { route, .. }
            | ScheduledEvent::LineComplete { route, .. }
            | ScheduledEvent::NodeTrigger { route, .. } => Some(route),
            ScheduledEvent::PlaybackStateChange { .. } => None,
        }
    }

    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            ScheduledEvent::LineStart { duration_ms, .. }
            | ScheduledEvent::LineProgress { duration_ms, .. }
            | ScheduledEvent::LineComplete { duration_ms, .. } => Some(*duration_ms),
            _ => None,
        }
    }
}

impl fmt::Display for ScheduledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledEvent::LineStart {
                route,
                time_ms,
                duration_ms,
                ..
            } => write!(f, "{time_ms:>9.1} ms  line-start     {route} ({duration_ms:.0} ms)"),
            ScheduledEvent::LineProgress {
                route,
                time_ms,
                progress,
                ..
            } => write!(f, "{time_ms:>9.1} ms  line-progress  {route} {:.0}%", progress * 100.0),
            ScheduledEvent::LineComplete { route, time_ms, .. } => {
                write!(f, "{time_ms:>9.1} ms  line-complete  {route}")
            }
            ScheduledEvent::NodeTrigger {
                node,
                time_ms,
                has_artifact,
                ..
            } => {
                let marker = if *has_artifact { " *" } else { "" };
                write!(f, "{time_ms:>9.1} ms  node-trigger   {node}{marker}")
            }
            ScheduledEvent::PlaybackStateChange { time_ms, from, to } => {
                write!(f, "{time_ms:>9.1} ms  state          {from} -> {to}")
            }
        }
    }
}
