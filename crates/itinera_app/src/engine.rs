//! Single-entity narrative engine
//!
//! Wires one [`PlaybackScheduler`] to its consumers: scheduler
//! notifications are queued in an inbox and, once per call, routed to the
//! arrival markers, the path growth layer and (while autoplay owns the
//! view) the camera. The engine never owns a timer; a host calls
//! [`NarrativeEngine::frame`] once per display frame.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::interaction::{InteractionHandler, InteractionOutcome, PointerInput};
use itinera_animation::{
    ArtifactPreview, GrowthUpdate, MarkerBoard, NodeVisualState, PathGrowthLayer, PlaybackScheduler,
    PlaybackState, ScheduledEvent, SchedulerNotification,
};
use itinera_camera::{CameraController, FlyTo};
use itinera_core::{Entity, FrameClock, InteractionLock, InteractionMode, NodeId};
use std::cell::RefCell;
use std::rc::Rc;

/// What changed since the previous frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub state: PlaybackState,
    pub cursor_ms: f64,
    /// Cursor over total duration, `0..=1`
    pub progress: f64,
    /// Growth updates in dispatch order
    pub growth: Vec<GrowthUpdate>,
    /// Most recent camera move, if any
    pub camera: Option<FlyTo>,
    /// The timeline reached its end during this frame
    pub finished: bool,
}

#[derive(Debug, Default)]
struct Pending {
    growth: Vec<GrowthUpdate>,
    camera: Option<FlyTo>,
    finished: bool,
}

pub struct NarrativeEngine {
    config: EngineConfig,
    clock: Rc<dyn FrameClock>,
    scheduler: PlaybackScheduler,
    markers: MarkerBoard,
    paths: PathGrowthLayer,
    camera: CameraController,
    interaction: InteractionHandler,
    inbox: Rc<RefCell<Vec<SchedulerNotification>>>,
    pending: Pending,
    last_frame_ms: Option<f64>,
    entity_id: Option<String>,
}

impl NarrativeEngine {
    pub fn new(clock: Rc<dyn FrameClock>, config: EngineConfig) -> Self {
        let lock = InteractionLock::new(InteractionMode::Auto);
        let scheduler = PlaybackScheduler::new(
            clock.clone(),
            config.timeline.clone(),
            config.playback.clone(),
        )
        .with_interaction_lock(lock.clone());

        Self {
            markers: MarkerBoard::new(config.markers.clone()),
            paths: PathGrowthLayer::new(),
            camera: CameraController::new(config.camera.clone()),
            interaction: InteractionHandler::new(lock),
            inbox: Rc::new(RefCell::new(Vec::new())),
            pending: Pending::default(),
            last_frame_ms: None,
            entity_id: None,
            scheduler,
            clock,
            config,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Replace the tracked entity
    ///
    /// Disposes the previous timeline first, so no callback from it
    /// survives the switch.
    pub fn load_entity(&mut self, entity: &Entity) -> Result<()> {
        self.dispose();

        let inbox = self.inbox.clone();
        let _ = self
            .scheduler
            .subscribe(move |n| inbox.borrow_mut().push(n.clone()));

        let color = entity.color.unwrap_or(self.config.overlay.primary_color);
        self.scheduler.load(&entity.routes(), color)?;
        if let Some(timeline) = self.scheduler.timeline() {
            self.markers.load(timeline);
            self.paths.load(timeline);
        }
        self.pending.camera = self.camera.fly_to_entity(entity);
        self.entity_id = Some(entity.id.clone());
        self.drain();

        tracing::info!(
            entity = %entity.id,
            routes = entity.route_count(),
            total_ms = self.scheduler.total_duration_ms(),
            "entity loaded"
        );
        Ok(())
    }

    /// Tear everything down; safe to call repeatedly
    pub fn dispose(&mut self) {
        self.scheduler.dispose();
        self.markers.clear();
        self.paths.clear();
        self.inbox.borrow_mut().clear();
        self.pending = Pending::default();
        self.last_frame_ms = None;
        self.entity_id = None;
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub fn play(&mut self) -> Result<()> {
        self.scheduler.play()?;
        self.drain();
        Ok(())
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
        self.drain();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
        self.drain();
    }

    pub fn seek(&mut self, time_ms: f64) {
        self.scheduler.seek(time_ms);
        self.drain();
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.scheduler.set_speed(speed);
        self.drain();
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.scheduler.set_looping(looping);
    }

    pub fn skip_by(&mut self, delta_ms: f64) {
        self.scheduler.skip_by(delta_ms);
        self.drain();
    }

    pub fn skip_to_next_route(&mut self) {
        self.scheduler.skip_to_next_route();
        self.drain();
    }

    pub fn skip_to_previous_route(&mut self) {
        self.scheduler.skip_to_previous_route();
        self.drain();
    }

    // ========================================================================
    // Frame driving
    // ========================================================================

    /// One cooperative tick
    ///
    /// Marker animations advance first so ripples started in this frame
    /// begin at their catch-up age rather than one frame later.
    pub fn frame(&mut self) -> FrameReport {
        let now = self.clock.now_ms();
        let dt = self.last_frame_ms.map_or(0.0, |last| (now - last).max(0.0));
        self.last_frame_ms = Some(now);

        self.markers.advance(dt);
        self.scheduler.tick();
        self.drain();

        let pending = std::mem::take(&mut self.pending);
        FrameReport {
            state: self.scheduler.state(),
            cursor_ms: self.scheduler.cursor_ms(),
            progress: self.scheduler.progress(),
            growth: pending.growth,
            camera: pending.camera,
            finished: pending.finished,
        }
    }

    /// Feed one pointer input through the interaction lock
    pub fn pointer(&mut self, input: PointerInput) -> InteractionOutcome {
        let outcome = self
            .interaction
            .handle(input, &mut self.camera, &mut self.scheduler);
        self.drain();
        outcome
    }

    pub fn lock_interaction(&self) {
        self.interaction.lock_interaction();
    }

    pub fn unlock_interaction(&self) {
        self.interaction.unlock_interaction();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.camera.resize(width, height);
    }

    fn drain(&mut self) {
        let notifications = std::mem::take(&mut *self.inbox.borrow_mut());
        if notifications.is_empty() {
            return;
        }
        let cursor = self.scheduler.cursor_ms();
        let follow =
            self.config.camera.follow_routes && self.interaction.mode() == InteractionMode::Auto;

        for notification in &notifications {
            self.markers.handle(notification, cursor);
            if let Some(update) = self.paths.handle(notification) {
                self.pending.growth.push(update);
            }
            match notification {
                SchedulerNotification::Event(ScheduledEvent::LineStart { route, .. }) if follow => {
                    let endpoints = self
                        .scheduler
                        .timeline()
                        .and_then(|t| t.span(route))
                        .map(|span| (span.from.coord(), span.to.coord()));
                    if let Some((from, to)) = endpoints {
                        self.pending.camera = Some(self.camera.fly_to_route(from, to));
                    }
                }
                SchedulerNotification::Finished { time_ms } => {
                    tracing::debug!(time_ms, "playback finished");
                    self.pending.finished = true;
                }
                _ => {}
            }
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    pub fn cursor_ms(&self) -> f64 {
        self.scheduler.cursor_ms()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn markers(&self) -> &MarkerBoard {
        &self.markers
    }

    pub fn node_states(&self) -> Vec<(NodeId, NodeVisualState)> {
        self.markers.states()
    }

    pub fn paths(&self) -> &PathGrowthLayer {
        &self.paths
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn interaction_mode(&self) -> InteractionMode {
        self.interaction.mode()
    }

    pub fn hover(&self, node: &NodeId) -> Option<ArtifactPreview> {
        self.markers.hover(node)
    }

    pub fn focus(&mut self, node: &NodeId) -> Option<ArtifactPreview> {
        self.markers.focus(node)
    }

    pub fn blur(&mut self) {
        self.markers.blur();
    }
}
