//! Arrival markers
//!
//! One small state machine per geographic node:
//!
//! ```text
//! Hidden --NodeTrigger--> Rippling --ripple elapsed--> Static     (no artifact)
//!                                                  \-> Breathing  (artifact, loops)
//! any --reset--> Hidden
//! ```
//!
//! Ripples advance in frame time, not timeline time, so a ripple started
//! just before a pause still settles.

use itinera_core::Easing;
use crate::event::ScheduledEvent;
use crate::scheduler::SchedulerNotification;
use crate::timeline::Timeline;
use indexmap::IndexMap;
use itinera_core::{Artifact, GeoPoint, NodeId};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeVisualState {
    #[default]
    Hidden,
    Rippling,
    Static,
    Breathing,
}

impl NodeVisualState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, NodeVisualState::Hidden)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub ripple_duration_ms: f64,
    pub breath_period_ms: f64,
    /// Peak scale gain of the breathing pulse
    pub breath_amplitude: f32,
    pub ripple_easing: Easing,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            ripple_duration_ms: 600.0,
            breath_period_ms: 2400.0,
            breath_amplitude: 0.12,
            ripple_easing: Easing::EaseOutCubic,
        }
    }
}

/// Artifact metadata surfaced on hover or focus
#[derive(Clone, Debug, PartialEq)]
pub struct ArtifactPreview {
    pub node: NodeId,
    pub coord: GeoPoint,
    pub title: String,
    pub date: Option<String>,
    pub location: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ArrivalMarker {
    node: NodeId,
    coord: GeoPoint,
    artifact: Option<Artifact>,
    state: NodeVisualState,
    ripple_elapsed_ms: f64,
    breath_elapsed_ms: f64,
}

impl ArrivalMarker {
    pub fn new(node: NodeId, coord: GeoPoint, artifact: Option<Artifact>) -> Self {
        Self {
            node,
            coord,
            artifact,
            state: NodeVisualState::Hidden,
            ripple_elapsed_ms: 0.0,
            breath_elapsed_ms: 0.0,
        }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn coord(&self) -> GeoPoint {
        self.coord
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn state(&self) -> NodeVisualState {
        self.state
    }

    /// Start the ripple `age_ms` after it should have begun
    ///
    /// Returns false if the marker was already visible.
    pub fn trigger(&mut self, age_ms: f64, config: &MarkerConfig) -> bool {
        if self.state != NodeVisualState::Hidden {
            return false;
        }
        self.state = NodeVisualState::Rippling;
        self.ripple_elapsed_ms = 0.0;
        self.breath_elapsed_ms = 0.0;
        self.advance(age_ms.max(0.0), config);
        true
    }

    pub fn advance(&mut self, dt_ms: f64, config: &MarkerConfig) {
        if dt_ms.is_nan() || dt_ms <= 0.0 {
            return;
        }
        match self.state {
            NodeVisualState::Hidden | NodeVisualState::Static => {}
            NodeVisualState::Rippling => {
                self.ripple_elapsed_ms += dt_ms;
                let overflow = self.ripple_elapsed_ms - config.ripple_duration_ms;
                if overflow >= 0.0 {
                    self.ripple_elapsed_ms = config.ripple_duration_ms;
                    if self.artifact.is_some() {
                        self.state = NodeVisualState::Breathing;
                        self.breath_elapsed_ms = 0.0;
                        self.advance_breath(overflow, config);
                    } else {
                        self.state = NodeVisualState::Static;
                    }
                }
            }
            NodeVisualState::Breathing => self.advance_breath(dt_ms, config),
        }
    }

    fn advance_breath(&mut self, dt_ms: f64, config: &MarkerConfig) {
        let period = config.breath_period_ms;
        self.breath_elapsed_ms = if period > 0.0 {
            (self.breath_elapsed_ms + dt_ms) % period
        } else {
            0.0
        };
    }

    pub fn reset(&mut self) {
        self.state = NodeVisualState::Hidden;
        self.ripple_elapsed_ms = 0.0;
        self.breath_elapsed_ms = 0.0;
    }

    /// Eased ripple expansion, `0` while hidden and `1` once settled
    pub fn ripple_progress(&self, config: &MarkerConfig) -> f32 {
        match self.state {
            NodeVisualState::Hidden => 0.0,
            NodeVisualState::Rippling if config.ripple_duration_ms > 0.0 => {
                let t = (self.ripple_elapsed_ms / config.ripple_duration_ms) as f32;
                config.ripple_easing.apply(t)
            }
            _ => 1.0,
        }
    }

    /// Marker scale; pulses between `1` and `1 + amplitude` while breathing
    pub fn breath_scale(&self, config: &MarkerConfig) -> f32 {
        if self.state != NodeVisualState::Breathing || config.breath_period_ms <= 0.0 {
            return 1.0;
        }
        let phase = self.breath_elapsed_ms / config.breath_period_ms;
        let wave = 0.5 - 0.5 * (phase * TAU).cos();
        1.0 + config.breath_amplitude * wave as f32
    }

    fn preview(&self) -> Option<ArtifactPreview> {
        if !self.state.is_visible() {
            return None;
        }
        let artifact = self.artifact.as_ref()?;
        Some(ArtifactPreview {
            node: self.node.clone(),
            coord: self.coord,
            title: artifact.title.clone(),
            date: artifact.date.clone(),
            location: artifact.location.clone(),
        })
    }
}

/// Markers for every node of the loaded timeline
#[derive(Debug, Default)]
pub struct MarkerBoard {
    config: MarkerConfig,
    markers: IndexMap<NodeId, ArrivalMarker>,
    focused: Option<NodeId>,
}

impl MarkerBoard {
    pub fn new(config: MarkerConfig) -> Self {
        Self {
            config,
            markers: IndexMap::new(),
            focused: None,
        }
    }

    /// Replace every marker with a hidden one per node of `timeline`
    pub fn load(&mut self, timeline: &Timeline) {
        self.focused = None;
        self.markers = timeline
            .nodes()
            .values()
            .map(|node| {
                let marker =
                    ArrivalMarker::new(node.id.clone(), node.coord, node.artifact.clone());
                (node.id.clone(), marker)
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.focused = None;
    }

    pub fn config(&self) -> &MarkerConfig {
        &self.config
    }

    /// Start a node's ripple. Returns true if the node became visible.
    pub fn on_trigger(&mut self, node: &NodeId, age_ms: f64) -> bool {
        let config = &self.config;
        match self.markers.get_mut(node) {
            Some(marker) => {
                let started = marker.trigger(age_ms, config);
                if started {
                    tracing::trace!(%node, age_ms, "node triggered");
                }
                started
            }
            None => false,
        }
    }

    /// Route a scheduler notification; `cursor_ms` ages catch-up triggers
    pub fn handle(&mut self, notification: &SchedulerNotification, cursor_ms: f64) {
        match notification {
            SchedulerNotification::Event(ScheduledEvent::NodeTrigger { node, time_ms, .. }) => {
                self.on_trigger(node, cursor_ms - time_ms);
            }
            SchedulerNotification::Rewound(ScheduledEvent::NodeTrigger { node, .. }) => {
                self.reset_node(node);
            }
            _ => {}
        }
    }

    /// Drive ripple and breathing animations by `dt_ms` of frame time
    pub fn advance(&mut self, dt_ms: f64) {
        let config = &self.config;
        for marker in self.markers.values_mut() {
            marker.advance(dt_ms, config);
        }
    }

    pub fn reset_node(&mut self, node: &NodeId) {
        if let Some(marker) = self.markers.get_mut(node) {
            marker.reset();
        }
        if self.focused.as_ref() == Some(node) {
            self.focused = None;
        }
    }

    /// Return every node to `Hidden`
    pub fn reset(&mut self) {
        for marker in self.markers.values_mut() {
            marker.reset();
        }
        self.focused = None;
    }

    pub fn state(&self, node: &NodeId) -> Option<NodeVisualState> {
        self.markers.get(node).map(ArrivalMarker::state)
    }

    pub fn marker(&self, node: &NodeId) -> Option<&ArrivalMarker> {
        self.markers.get(node)
    }

    pub fn markers(&self) -> impl Iterator<Item = &ArrivalMarker> {
        self.markers.values()
    }

    /// Snapshot of every node's state, in node order
    pub fn states(&self) -> Vec<(NodeId, NodeVisualState)> {
        self.markers
            .values()
            .map(|m| (m.node.clone(), m.state))
            .collect()
    }

    pub fn visible_count(&self) -> usize {
        self.markers
            .values()
            .filter(|m| m.state.is_visible())
            .count()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Artifact preview for a visible node; never changes state
    pub fn hover(&self, node: &NodeId) -> Option<ArtifactPreview> {
        self.markers.get(node)?.preview()
    }

    /// Move keyboard focus to a visible node, returning its preview
    pub fn focus(&mut self, node: &NodeId) -> Option<ArtifactPreview> {
        let marker = self.markers.get(node)?;
        if !marker.state.is_visible() {
            return None;
        }
        self.focused = Some(node.clone());
        marker.preview()
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<&NodeId> {
        self.focused.as_ref()
    }
}
