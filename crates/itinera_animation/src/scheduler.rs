//! Playback scheduler
//!
//! Owns a built [`Timeline`], the time cursor and the play/pause/seek/speed
//! state machine:
//!
//! ```text
//! Idle --load--> Ready --play--> Playing <--pause/play--> Paused
//! Playing/Paused --stop--> Ready
//! Playing/Paused --seek--> Seeking --> (previous state)
//! ```
//!
//! The scheduler never owns a timer. A host calls [`PlaybackScheduler::tick`]
//! once per frame; the injected [`FrameClock`] supplies elapsed real time,
//! which advances the cursor by `elapsed * speed`. A shared tick source (the
//! linked overlay) calls [`PlaybackScheduler::advance`] with an explicit
//! elapsed time instead.
//!
//! Fired events always form a prefix of the sorted event list, so "which
//! events already fired" is a single index. Forward seeks fire every skipped
//! `LineComplete` and `NodeTrigger`; a skipped `LineStart` is delivered only
//! if its route is still growing at the new cursor. Backward seeks un-fire
//! everything after the new cursor and report each as
//! [`SchedulerNotification::Rewound`].

use crate::error::{Result, SchedulerError};
use crate::event::{PlaybackState, ScheduledEvent};
use crate::timeline::{RouteSpan, Timeline, TimelineConfig};
use indexmap::IndexMap;
use itinera_core::{
    Color, FrameClock, InteractionLock, Route, RouteId, SubscriptionHandle, Subscribers,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::rc::Rc;

/// Current growth progress per started route, in playback order
pub type ActiveLineProgress = IndexMap<RouteId, f64>;

/// Speed and looping tunables
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub initial_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub loop_playback: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            initial_speed: 1.0,
            min_speed: 0.25,
            max_speed: 3.0,
            loop_playback: false,
        }
    }
}

impl PlaybackConfig {
    /// Clamp a requested speed to the configured bounds
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        let (lo, hi) = if self.min_speed <= self.max_speed {
            (self.min_speed, self.max_speed)
        } else {
            (self.max_speed, self.min_speed)
        };
        speed.clamp(lo, hi)
    }
}

/// What subscribers hear from the scheduler
#[derive(Clone, Debug, PartialEq)]
pub enum SchedulerNotification {
    /// A timeline was loaded
    Ready {
        event_count: usize,
        total_duration_ms: f64,
    },
    /// An event was dispatched
    Event(ScheduledEvent),
    /// A previously dispatched event was un-fired by a rewind
    Rewound(ScheduledEvent),
    SpeedChanged { speed: f64 },
    /// The cursor reached the end of a non-looping timeline
    Finished { time_ms: f64 },
}

/// Transport command surface shared by schedulers and linked overlays
pub trait Transport {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, time_ms: f64);
    fn set_speed(&mut self, speed: f64);
}

/// Frame-driven playback engine for one timeline
pub struct PlaybackScheduler {
    clock: Rc<dyn FrameClock>,
    timeline_config: TimelineConfig,
    config: PlaybackConfig,
    timeline: Option<Timeline>,
    state: PlaybackState,
    cursor_ms: f64,
    speed: f64,
    looping: bool,
    ticking: bool,
    last_frame_ms: Option<f64>,
    /// Events `[0, next_event)` have fired
    next_event: usize,
    /// Index of each span's `LineStart` in the event list
    span_starts: Vec<usize>,
    active: ActiveLineProgress,
    subscribers: Subscribers<SchedulerNotification>,
    lock: Option<InteractionLock>,
}

impl PlaybackScheduler {
    pub fn new(
        clock: Rc<dyn FrameClock>,
        timeline_config: TimelineConfig,
        config: PlaybackConfig,
    ) -> Self {
        let speed = config.clamp_speed(config.initial_speed);
        let looping = config.loop_playback;
        Self {
            clock,
            timeline_config,
            config,
            timeline: None,
            state: PlaybackState::Idle,
            cursor_ms: 0.0,
            speed,
            looping,
            ticking: false,
            last_frame_ms: None,
            next_event: 0,
            span_starts: Vec::new(),
            active: ActiveLineProgress::default(),
            subscribers: Subscribers::new(),
            lock: None,
        }
    }

    /// Lock handed to the manual interaction handler; `play` forces it to `Auto`
    pub fn with_interaction_lock(mut self, lock: InteractionLock) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn set_interaction_lock(&mut self, lock: Option<InteractionLock>) {
        self.lock = lock;
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: FnMut(&SchedulerNotification) + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Build a timeline from `routes` and move to `Ready`
    pub fn load(&mut self, routes: &[Route], base_color: Color) -> Result<()> {
        if self.state != PlaybackState::Idle {
            return Err(SchedulerError::AlreadyLoaded);
        }
        let timeline = Timeline::build(routes, base_color, &self.timeline_config)?;
        self.load_timeline(timeline)
    }

    /// Adopt an already built timeline and move to `Ready`
    pub fn load_timeline(&mut self, timeline: Timeline) -> Result<()> {
        if self.state != PlaybackState::Idle {
            return Err(SchedulerError::AlreadyLoaded);
        }

        self.span_starts = {
            let starts: IndexMap<&RouteId, usize> = timeline
                .events()
                .iter()
                .enumerate()
                .filter_map(|(i, e)| match e {
                    ScheduledEvent::LineStart { route, .. } => Some((route, i)),
                    _ => None,
                })
                .collect();
            timeline
                .spans()
                .iter()
                .map(|span| starts.get(&span.route).copied().unwrap_or(usize::MAX))
                .collect()
        };

        let event_count = timeline.events().len();
        let total_duration_ms = timeline.total_duration_ms();
        self.timeline = Some(timeline);
        self.cursor_ms = 0.0;
        self.next_event = 0;
        self.active.clear();
        self.set_state(PlaybackState::Ready);

        tracing::debug!(event_count, total_duration_ms, "scheduler ready");
        self.subscribers.notify(&SchedulerNotification::Ready {
            event_count,
            total_duration_ms,
        });
        Ok(())
    }

    /// Tear down playback and release every subscription
    ///
    /// Safe to call repeatedly. Afterwards the scheduler is `Idle` and a
    /// fresh `load` is accepted.
    pub fn dispose(&mut self) {
        if self.state == PlaybackState::Idle && self.timeline.is_none() {
            self.subscribers.clear();
            return;
        }
        self.ticking = false;
        self.last_frame_ms = None;
        self.set_state(PlaybackState::Idle);
        self.timeline = None;
        self.cursor_ms = 0.0;
        self.next_event = 0;
        self.span_starts.clear();
        self.active.clear();
        self.subscribers.clear();
        tracing::debug!("scheduler disposed");
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub fn play(&mut self) -> Result<()> {
        let total = self.loaded_total().ok_or(SchedulerError::NotLoaded)?;
        if let Some(lock) = &self.lock {
            lock.lock();
        }
        if self.state == PlaybackState::Playing {
            return Ok(());
        }
        if self.cursor_ms >= total {
            self.rewind_to(f64::NEG_INFINITY);
            self.cursor_ms = 0.0;
            self.active.clear();
        }
        self.ticking = true;
        self.last_frame_ms = Some(self.clock.now_ms());
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.ticking = false;
        self.last_frame_ms = None;
        self.set_state(PlaybackState::Paused);
    }

    /// Return to the start, un-firing every event
    pub fn stop(&mut self) {
        if self.timeline.is_none() {
            return;
        }
        self.ticking = false;
        self.last_frame_ms = None;
        self.rewind_to(f64::NEG_INFINITY);
        self.cursor_ms = 0.0;
        self.active.clear();
        self.set_state(PlaybackState::Ready);
    }

    /// Move the cursor to `time_ms`, clamped to the timeline
    pub fn seek(&mut self, time_ms: f64) {
        let Some(total) = self.loaded_total() else {
            tracing::debug!(time_ms, "seek ignored: nothing loaded");
            return;
        };
        if time_ms.is_nan() {
            return;
        }
        let target = time_ms.clamp(0.0, total);
        if target != time_ms {
            tracing::debug!(requested = time_ms, clamped = target, "seek clamped");
        }

        let previous = self.state;
        self.set_state(PlaybackState::Seeking);

        let from = self.cursor_ms;
        if target < from {
            self.rewind_to(target);
        }
        self.cursor_ms = target;
        self.fire_through(target, true);
        self.recompute_progress();
        self.emit_progress(|span| span.contains(target));

        let resume = match previous {
            PlaybackState::Ready if target > 0.0 => PlaybackState::Paused,
            other => other,
        };
        if resume == PlaybackState::Playing {
            self.last_frame_ms = Some(self.clock.now_ms());
        }
        self.set_state(resume);
    }

    /// Change the speed multiplier; out-of-range values are clamped
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            return;
        }
        let clamped = self.config.clamp_speed(speed);
        if clamped != speed {
            tracing::debug!(requested = speed, clamped, "speed clamped");
        }
        if (clamped - self.speed).abs() > f64::EPSILON {
            self.speed = clamped;
            self.subscribers
                .notify(&SchedulerNotification::SpeedChanged { speed: clamped });
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Seek relative to the cursor
    pub fn skip_by(&mut self, delta_ms: f64) {
        self.seek(self.cursor_ms + delta_ms);
    }

    /// Seek to the next route's start, or the end if none remains
    pub fn skip_to_next_route(&mut self) {
        let Some(timeline) = &self.timeline else {
            return;
        };
        let cursor = self.cursor_ms;
        let target = timeline
            .spans()
            .iter()
            .map(|s| s.start_ms)
            .find(|&start| start > cursor + SKIP_EPSILON_MS)
            .unwrap_or(timeline.total_duration_ms());
        self.seek(target);
    }

    /// Seek to the previous route's start, or the beginning if none precedes
    pub fn skip_to_previous_route(&mut self) {
        let Some(timeline) = &self.timeline else {
            return;
        };
        let cursor = self.cursor_ms;
        let target = timeline
            .spans()
            .iter()
            .rev()
            .map(|s| s.start_ms)
            .find(|&start| start < cursor - SKIP_EPSILON_MS)
            .unwrap_or(0.0);
        self.seek(target);
    }

    // ========================================================================
    // Frame driving
    // ========================================================================

    /// Advance by the real time elapsed since the previous frame
    pub fn tick(&mut self) {
        if !self.ticking {
            return;
        }
        let now = self.clock.now_ms();
        let elapsed = self.last_frame_ms.map_or(0.0, |last| (now - last).max(0.0));
        self.last_frame_ms = Some(now);
        self.advance(elapsed);
    }

    /// Advance by an explicit amount of real time
    ///
    /// Dispatches every event up to the new cursor in time order, then one
    /// `LineProgress` per route growing during the frame.
    pub fn advance(&mut self, elapsed_ms: f64) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(total) = self.loaded_total() else {
            return;
        };
        let elapsed = if elapsed_ms.is_finite() {
            elapsed_ms.max(0.0)
        } else {
            0.0
        };

        let from = self.cursor_ms;
        let reached = from + elapsed * self.speed;
        let to = reached.min(total);
        self.cursor_ms = to;
        self.fire_through(to, false);
        self.recompute_progress();
        self.emit_progress(|span| span.start_ms <= to && span.end_ms() > from);

        if to >= total {
            if self.looping {
                tracing::debug!(total, "looping to start");
                self.rewind_to(f64::NEG_INFINITY);
                self.cursor_ms = 0.0;
                self.active.clear();

                // Time past the end carries into the next lap
                let carry = if total > 0.0 { (reached - total) % total } else { 0.0 };
                if carry > 0.0 {
                    self.cursor_ms = carry;
                    self.fire_through(carry, false);
                    self.recompute_progress();
                    self.emit_progress(|span| span.start_ms <= carry);
                }
            } else {
                self.ticking = false;
                self.last_frame_ms = None;
                self.set_state(PlaybackState::Paused);
                self.subscribers
                    .notify(&SchedulerNotification::Finished { time_ms: to });
            }
        }
    }

    /// Forget the previous frame time so the next tick measures from now
    pub fn resync_clock(&mut self) {
        if self.ticking {
            self.last_frame_ms = Some(self.clock.now_ms());
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor_ms(&self) -> f64 {
        self.cursor_ms
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.loaded_total().unwrap_or(0.0)
    }

    /// Cursor as a fraction of the total duration
    pub fn progress(&self) -> f64 {
        match self.loaded_total() {
            Some(total) if total > 0.0 => (self.cursor_ms / total).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether the per-frame tick loop is running
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn event_count(&self) -> usize {
        self.timeline.as_ref().map_or(0, |t| t.events().len())
    }

    pub fn fired_count(&self) -> usize {
        self.next_event
    }

    pub fn is_fired(&self, index: usize) -> bool {
        index < self.next_event
    }

    pub fn active_progress(&self) -> &ActiveLineProgress {
        &self.active
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn loaded_total(&self) -> Option<f64> {
        self.timeline.as_ref().map(Timeline::total_duration_ms)
    }

    fn set_state(&mut self, to: PlaybackState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        tracing::debug!(%from, %to, cursor_ms = self.cursor_ms, "playback state changed");
        self.subscribers
            .notify(&SchedulerNotification::Event(ScheduledEvent::PlaybackStateChange {
                time_ms: self.cursor_ms,
                from,
                to,
            }));
    }

    /// Fire every pending event at or before `to`
    ///
    /// With `catch_up`, a `LineStart` whose route already completed by `to`
    /// is marked fired without being delivered.
    fn fire_through(&mut self, to: f64, catch_up: bool) {
        let Some(timeline) = &self.timeline else {
            return;
        };
        let events = timeline.events();
        while self.next_event < events.len() && events[self.next_event].time_ms() <= to {
            let event = &events[self.next_event];
            self.next_event += 1;

            if catch_up {
                if let ScheduledEvent::LineStart { route, .. } = event {
                    let finished = timeline.span(route).is_some_and(|s| s.end_ms() <= to);
                    if finished {
                        continue;
                    }
                }
            }
            self.subscribers
                .notify(&SchedulerNotification::Event(event.clone()));
        }
    }

    /// Un-fire every event after `to`, latest first
    fn rewind_to(&mut self, to: f64) {
        let Some(timeline) = &self.timeline else {
            return;
        };
        let events = timeline.events();
        while self.next_event > 0 && events[self.next_event - 1].time_ms() > to {
            self.next_event -= 1;
            self.subscribers
                .notify(&SchedulerNotification::Rewound(events[self.next_event].clone()));
        }
    }

    fn recompute_progress(&mut self) {
        self.active.clear();
        let Some(timeline) = &self.timeline else {
            return;
        };
        for (span, &start_event) in timeline.spans().iter().zip(&self.span_starts) {
            if start_event < self.next_event {
                self.active
                    .insert(span.route.clone(), span.progress_at(self.cursor_ms));
            }
        }
    }

    fn emit_progress(&self, in_window: impl Fn(&RouteSpan) -> bool) {
        let Some(timeline) = &self.timeline else {
            return;
        };
        let mut batch: SmallVec<[SchedulerNotification; 4]> = SmallVec::new();
        for span in timeline.spans() {
            let Some(&progress) = self.active.get(&span.route) else {
                continue;
            };
            if in_window(span) {
                batch.push(SchedulerNotification::Event(ScheduledEvent::LineProgress {
                    route: span.route.clone(),
                    time_ms: self.cursor_ms,
                    duration_ms: span.duration_ms,
                    progress,
                }));
            }
        }
        for notification in &batch {
            self.subscribers.notify(notification);
        }
    }
}

/// Route starts closer than this to the cursor count as "current"
const SKIP_EPSILON_MS: f64 = 1.0;

impl Transport for PlaybackScheduler {
    fn play(&mut self) -> Result<()> {
        PlaybackScheduler::play(self)
    }

    fn pause(&mut self) {
        PlaybackScheduler::pause(self)
    }

    fn stop(&mut self) {
        PlaybackScheduler::stop(self)
    }

    fn seek(&mut self, time_ms: f64) {
        PlaybackScheduler::seek(self, time_ms)
    }

    fn set_speed(&mut self, speed: f64) {
        PlaybackScheduler::set_speed(self, speed)
    }
}
