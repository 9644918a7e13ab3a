//! Overlay / comparison mode
//!
//! Shows two entities' timelines on one map. The [`OverlayController`]
//! exclusively owns both schedulers; neither scheduler knows about the
//! overlay. In `Linked` mode one transport command and one clock read drive
//! both cursors, in `Independent` mode each scheduler keeps its own
//! transport and tick.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use indexmap::IndexMap;
use itinera_animation::{PlaybackScheduler, PlaybackState, RouteSpan, Timeline, Transport};
use itinera_core::{Color, Entity, FrameClock, GeoPoint, InteractionLock, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

// =============================================================================
// Modes and roles
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// No comparison
    #[default]
    Single,
    /// Both schedulers share one transport and one tick
    Linked,
    /// Each scheduler has its own transport and tick
    Independent,
}

impl fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverlayMode::Single => "single",
            OverlayMode::Linked => "linked",
            OverlayMode::Independent => "independent",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityRole {
    Primary,
    Secondary,
}

// =============================================================================
// Merge
// =============================================================================

/// A route in the merged set, tagged with the entity it belongs to
#[derive(Clone, Debug, PartialEq)]
pub struct TaggedRoute {
    pub role: EntityRole,
    pub span: RouteSpan,
}

/// A node in the merged set
#[derive(Clone, Debug, PartialEq)]
pub struct MergedNode {
    pub id: NodeId,
    pub coord: GeoPoint,
    pub primary: bool,
    pub secondary: bool,
    /// Visited by both entities; drawn with a distinct highlight
    pub shared: bool,
}

/// Union of two timelines' routes and nodes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayMerge {
    pub routes: Vec<TaggedRoute>,
    pub nodes: IndexMap<NodeId, MergedNode>,
}

impl OverlayMerge {
    /// Shared node ids in first-seen order
    pub fn shared_node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.shared)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Fraction of shared nodes over the union of both entities' nodes
    pub fn trajectory_similarity(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let shared = self.nodes.values().filter(|n| n.shared).count();
        shared as f64 / self.nodes.len() as f64
    }

    pub fn routes_for(&self, role: EntityRole) -> impl Iterator<Item = &TaggedRoute> {
        self.routes.iter().filter(move |r| r.role == role)
    }
}

/// Merge two timelines into one presentation set
pub fn merge(primary: &Timeline, secondary: &Timeline) -> OverlayMerge {
    let routes = primary
        .spans()
        .iter()
        .map(|span| TaggedRoute {
            role: EntityRole::Primary,
            span: span.clone(),
        })
        .chain(secondary.spans().iter().map(|span| TaggedRoute {
            role: EntityRole::Secondary,
            span: span.clone(),
        }))
        .collect();

    let mut nodes: IndexMap<NodeId, MergedNode> = primary
        .nodes()
        .values()
        .map(|node| {
            let merged = MergedNode {
                id: node.id.clone(),
                coord: node.coord,
                primary: true,
                secondary: false,
                shared: false,
            };
            (node.id.clone(), merged)
        })
        .collect();
    for node in secondary.nodes().values() {
        let merged = nodes.entry(node.id.clone()).or_insert_with(|| MergedNode {
            id: node.id.clone(),
            coord: node.coord,
            primary: false,
            secondary: false,
            shared: false,
        });
        merged.secondary = true;
        merged.shared = merged.primary;
    }

    OverlayMerge { routes, nodes }
}

/// Similarity of two timelines' node sets, in `0..=1`
pub fn trajectory_similarity(primary: &Timeline, secondary: &Timeline) -> f64 {
    merge(primary, secondary).trajectory_similarity()
}

// =============================================================================
// Color blending
// =============================================================================

/// How a shared element is painted
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresentationColor {
    pub fill: Color,
    /// Set when the blend was unreadable and the original color needs an outline
    pub outline: Option<Color>,
    /// True when `fill` is the Oklab blend
    pub blended: bool,
}

/// Blend two theme colors, falling back to `a` plus an outline when the
/// blend does not reach `min_contrast` against `background`
pub fn blend_colors(a: Color, b: Color, background: Color, min_contrast: f32) -> PresentationColor {
    let mixed = Color::mix_oklab(&a, &b);
    let ratio = mixed.contrast_ratio(&background);
    if ratio >= min_contrast {
        return PresentationColor {
            fill: mixed,
            outline: None,
            blended: true,
        };
    }

    let outline = background.contrasting_outline();
    tracing::warn!(
        primary = %a.to_hex(),
        secondary = %b.to_hex(),
        mixed = %mixed.to_hex(),
        ratio,
        min_contrast,
        "blended color unreadable on background; using original color with outline"
    );
    PresentationColor {
        fill: a,
        outline: Some(outline),
        blended: false,
    }
}

// =============================================================================
// State
// =============================================================================

/// Comparison state; exists only while comparison mode is active
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayState {
    pub mode: OverlayMode,
    pub primary_entity_id: String,
    pub secondary_entity_id: String,
    /// Raw Oklab blend of both theme colors
    pub mixed_color: Color,
    /// What shared elements are actually painted with
    pub presentation: PresentationColor,
    pub shared_node_ids: Vec<NodeId>,
    pub similarity: f64,
}

struct Loaded {
    entity_id: String,
    color: Color,
    scheduler: PlaybackScheduler,
    lock: InteractionLock,
}

// =============================================================================
// Controller
// =============================================================================

/// Owner of the primary and (while comparing) the secondary scheduler
pub struct OverlayController {
    clock: Rc<dyn FrameClock>,
    config: EngineConfig,
    primary: Loaded,
    secondary: Option<Loaded>,
    state: Option<OverlayState>,
    merge: Option<OverlayMerge>,
    /// Last shared tick time while `Linked`
    linked_last_frame_ms: Option<f64>,
}

impl OverlayController {
    pub fn new(clock: Rc<dyn FrameClock>, config: EngineConfig) -> Self {
        let primary = Self::empty_slot(&clock, &config, config.overlay.primary_color);
        Self {
            clock,
            config,
            primary,
            secondary: None,
            state: None,
            merge: None,
            linked_last_frame_ms: None,
        }
    }

    fn empty_slot(clock: &Rc<dyn FrameClock>, config: &EngineConfig, color: Color) -> Loaded {
        let lock = InteractionLock::default();
        let scheduler = PlaybackScheduler::new(
            clock.clone(),
            config.timeline.clone(),
            config.playback.clone(),
        )
        .with_interaction_lock(lock.clone());
        Loaded {
            entity_id: String::new(),
            color,
            scheduler,
            lock,
        }
    }

    /// Load (or replace) the primary entity
    pub fn load_primary(&mut self, entity: &Entity) -> Result<()> {
        let color = entity.color.unwrap_or(self.config.overlay.primary_color);
        self.primary.scheduler.dispose();
        self.primary.scheduler.load(&entity.routes(), color)?;
        self.primary.entity_id = entity.id.clone();
        self.primary.color = color;
        tracing::debug!(entity = %entity.id, "primary entity loaded");

        if let Some(mode) = self.state.as_ref().map(|s| s.mode) {
            self.refresh_state(mode);
            if mode == OverlayMode::Linked {
                self.sync_secondary()?;
            }
        }
        Ok(())
    }

    /// Enter comparison mode against `entity`
    ///
    /// Replaces any secondary entity already being compared.
    pub fn enter(&mut self, entity: &Entity, mode: OverlayMode) -> Result<()> {
        if mode == OverlayMode::Single {
            return Err(EngineError::Overlay(
                "comparison needs linked or independent mode".to_string(),
            ));
        }
        if self.primary.scheduler.timeline().is_none() {
            return Err(EngineError::Overlay(
                "load a primary entity before comparing".to_string(),
            ));
        }
        self.exit();

        let color = entity.color.unwrap_or(self.config.overlay.secondary_color);
        let mut slot = Self::empty_slot(&self.clock, &self.config, color);
        slot.scheduler.load(&entity.routes(), color)?;
        slot.entity_id = entity.id.clone();
        self.secondary = Some(slot);

        self.refresh_state(mode);
        tracing::debug!(entity = %entity.id, %mode, "comparison started");
        if mode == OverlayMode::Linked {
            self.sync_secondary()?;
        }
        Ok(())
    }

    /// Switch between `Linked` and `Independent`
    ///
    /// Linking snaps the secondary to the primary's cursor, speed and play
    /// state.
    pub fn set_mode(&mut self, mode: OverlayMode) -> Result<()> {
        let Some(current) = self.state.as_ref().map(|s| s.mode) else {
            return Err(EngineError::Overlay("not in comparison mode".to_string()));
        };
        if mode == OverlayMode::Single {
            return Err(EngineError::Overlay(
                "use exit() to leave comparison mode".to_string(),
            ));
        }
        if mode == current {
            return Ok(());
        }
        if let Some(state) = &mut self.state {
            state.mode = mode;
        }
        tracing::debug!(from = %current, to = %mode, "overlay mode changed");

        match mode {
            OverlayMode::Linked => self.sync_secondary()?,
            _ => {
                self.linked_last_frame_ms = None;
                self.primary.scheduler.resync_clock();
                if let Some(secondary) = &mut self.secondary {
                    secondary.scheduler.resync_clock();
                }
            }
        }
        Ok(())
    }

    /// Leave comparison mode, disposing the secondary scheduler
    pub fn exit(&mut self) {
        if let Some(mut secondary) = self.secondary.take() {
            secondary.scheduler.dispose();
            tracing::debug!(entity = %secondary.entity_id, "comparison ended");
        }
        if self.state.take().is_some() && self.primary.scheduler.is_ticking() {
            self.primary.scheduler.resync_clock();
        }
        self.merge = None;
        self.linked_last_frame_ms = None;
    }

    /// Transport for one entity outside linked mode
    pub fn transport(&mut self, role: EntityRole) -> Result<&mut dyn Transport> {
        if self.mode() == OverlayMode::Linked {
            return Err(EngineError::Overlay(
                "linked entities share the overlay transport".to_string(),
            ));
        }
        match role {
            EntityRole::Primary => Ok(&mut self.primary.scheduler as &mut dyn Transport),
            EntityRole::Secondary => self
                .secondary
                .as_mut()
                .map(|s| &mut s.scheduler as &mut dyn Transport)
                .ok_or_else(|| EngineError::Overlay("no secondary entity loaded".to_string())),
        }
    }

    /// One cooperative frame for every scheduler
    pub fn frame(&mut self) {
        if self.mode() != OverlayMode::Linked {
            self.primary.scheduler.tick();
            if let Some(secondary) = &mut self.secondary {
                secondary.scheduler.tick();
            }
            return;
        }

        let now = self.clock.now_ms();
        let elapsed = self
            .linked_last_frame_ms
            .map_or(0.0, |last| (now - last).max(0.0));
        self.linked_last_frame_ms = Some(now);

        self.primary.scheduler.advance(elapsed);
        let mut ticking = self.primary.scheduler.is_ticking();
        if let Some(secondary) = &mut self.secondary {
            secondary.scheduler.advance(elapsed);
            ticking |= secondary.scheduler.is_ticking();
        }
        if !ticking {
            self.linked_last_frame_ms = None;
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn mode(&self) -> OverlayMode {
        self.state.as_ref().map_or(OverlayMode::Single, |s| s.mode)
    }

    pub fn state(&self) -> Option<&OverlayState> {
        self.state.as_ref()
    }

    pub fn merged(&self) -> Option<&OverlayMerge> {
        self.merge.as_ref()
    }

    pub fn scheduler(&self, role: EntityRole) -> Option<&PlaybackScheduler> {
        match role {
            EntityRole::Primary => Some(&self.primary.scheduler),
            EntityRole::Secondary => self.secondary.as_ref().map(|s| &s.scheduler),
        }
    }

    pub fn scheduler_mut(&mut self, role: EntityRole) -> Option<&mut PlaybackScheduler> {
        match role {
            EntityRole::Primary => Some(&mut self.primary.scheduler),
            EntityRole::Secondary => self.secondary.as_mut().map(|s| &mut s.scheduler),
        }
    }

    /// Each entity's own interaction lock
    pub fn interaction_lock(&self, role: EntityRole) -> Option<&InteractionLock> {
        match role {
            EntityRole::Primary => Some(&self.primary.lock),
            EntityRole::Secondary => self.secondary.as_ref().map(|s| &s.lock),
        }
    }

    pub fn color(&self, role: EntityRole) -> Option<Color> {
        match role {
            EntityRole::Primary => Some(self.primary.color),
            EntityRole::Secondary => self.secondary.as_ref().map(|s| s.color),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn refresh_state(&mut self, mode: OverlayMode) {
        let Some(secondary) = &self.secondary else {
            return;
        };
        let (Some(a), Some(b)) = (
            self.primary.scheduler.timeline(),
            secondary.scheduler.timeline(),
        ) else {
            return;
        };

        let merged = merge(a, b);
        let overlay = &self.config.overlay;
        let presentation = blend_colors(
            self.primary.color,
            secondary.color,
            overlay.background,
            overlay.min_contrast_ratio,
        );
        self.state = Some(OverlayState {
            mode,
            primary_entity_id: self.primary.entity_id.clone(),
            secondary_entity_id: secondary.entity_id.clone(),
            mixed_color: Color::mix_oklab(&self.primary.color, &secondary.color),
            presentation,
            shared_node_ids: merged.shared_node_ids(),
            similarity: merged.trajectory_similarity(),
        });
        self.merge = Some(merged);
    }

    /// Snap the secondary to the primary's cursor, speed and play state
    fn sync_secondary(&mut self) -> Result<()> {
        let primary = &self.primary.scheduler;
        let (cursor, speed, state) = (primary.cursor_ms(), primary.speed(), primary.state());
        let Some(secondary) = &mut self.secondary else {
            return Ok(());
        };
        let scheduler = &mut secondary.scheduler;

        scheduler.set_speed(speed);
        if state == PlaybackState::Ready {
            scheduler.stop();
        } else {
            scheduler.seek(cursor);
        }
        match state {
            PlaybackState::Playing => {
                if scheduler.cursor_ms() < scheduler.total_duration_ms() {
                    scheduler.play()?;
                }
                self.linked_last_frame_ms = Some(self.clock.now_ms());
            }
            _ => {
                scheduler.pause();
                self.linked_last_frame_ms = None;
            }
        }
        tracing::debug!(cursor, speed, %state, "secondary synced to primary");
        Ok(())
    }
}

impl Transport for OverlayController {
    /// Plays the primary, and in `Linked` mode the secondary too
    fn play(&mut self) -> itinera_animation::Result<()> {
        let restart =
            self.primary.scheduler.cursor_ms() >= self.primary.scheduler.total_duration_ms();
        self.primary.scheduler.play()?;
        if self.mode() == OverlayMode::Linked {
            if let Some(secondary) = &mut self.secondary {
                let scheduler = &mut secondary.scheduler;
                if restart {
                    scheduler.stop();
                }
                if scheduler.cursor_ms() < scheduler.total_duration_ms() {
                    scheduler.play()?;
                }
            }
            self.linked_last_frame_ms = Some(self.clock.now_ms());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.primary.scheduler.pause();
        if self.mode() == OverlayMode::Linked {
            if let Some(secondary) = &mut self.secondary {
                secondary.scheduler.pause();
            }
            self.linked_last_frame_ms = None;
        }
    }

    fn stop(&mut self) {
        self.primary.scheduler.stop();
        if self.mode() == OverlayMode::Linked {
            if let Some(secondary) = &mut self.secondary {
                secondary.scheduler.stop();
            }
            self.linked_last_frame_ms = None;
        }
    }

    /// In `Linked` mode the secondary follows both the cursor and the play state,
    /// so a finished secondary resumes when the primary seeks back into it
    fn seek(&mut self, time_ms: f64) {
        self.primary.scheduler.seek(time_ms);
        if self.mode() == OverlayMode::Linked {
            if let Err(err) = self.sync_secondary() {
                tracing::warn!(%err, "secondary could not follow seek");
            }
        }
    }

    fn set_speed(&mut self, speed: f64) {
        self.primary.scheduler.set_speed(speed);
        if self.mode() == OverlayMode::Linked {
            if let Some(secondary) = &mut self.secondary {
                secondary.scheduler.set_speed(speed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itinera_core::{ManualClock, Route, Waypoint, Work, WCAG_AA_CONTRAST as WCAG_AA};

    const FRAME_MS: f64 = 16.0;

    fn waypoint(name: &str) -> Waypoint {
        let (lon, lat) = match name {
            "London" => (-0.1276, 51.5072),
            "Paris" => (2.3522, 48.8566),
            "Rome" => (12.4964, 41.9028),
            "Berlin" => (13.4050, 52.5200),
            "Vienna" => (16.3738, 48.2082),
            "Madrid" => (-3.7038, 40.4168),
            "Lisbon" => (-9.1393, 38.7223),
            _ => (0.0, 0.0),
        };
        Waypoint::new(name, lon, lat)
    }

    fn entity(id: &str, legs: &[(&str, &str)], color: Option<Color>) -> Entity {
        let routes = legs
            .iter()
            .enumerate()
            .map(|(i, (from, to))| {
                Route::new(format!("{id}-{i}"), waypoint(from), waypoint(to))
                    .with_year(1900 + i as i32)
            })
            .collect();
        Entity {
            id: id.to_string(),
            name: id.to_uppercase(),
            color,
            works: vec![Work {
                id: format!("{id}-work"),
                title: String::new(),
                year: None,
                routes,
            }],
        }
    }

    fn author_a() -> Entity {
        entity(
            "a",
            &[
                ("London", "Paris"),
                ("Paris", "Rome"),
                ("Rome", "Vienna"),
                ("Vienna", "Berlin"),
                ("Berlin", "London"),
            ],
            Some(Color::from_hex(0x000080)),
        )
    }

    fn author_b() -> Entity {
        entity(
            "b",
            &[("Madrid", "Paris"), ("Paris", "Lisbon"), ("Lisbon", "Madrid")],
            Some(Color::from_hex(0x800000)),
        )
    }

    fn controller(clock: &ManualClock) -> OverlayController {
        let mut overlay = OverlayController::new(Rc::new(clock.clone()), EngineConfig::default());
        overlay.load_primary(&author_a()).unwrap();
        overlay
    }

    #[test]
    fn test_linked_pause_stops_both_schedulers() {
        let clock = ManualClock::new();
        let mut overlay = controller(&clock);
        overlay.enter(&author_b(), OverlayMode::Linked).unwrap();
        assert_eq!(overlay.scheduler(EntityRole::Primary).unwrap().event_count(), 15);
        assert_eq!(overlay.scheduler(EntityRole::Secondary).unwrap().event_count(), 9);

        overlay.play().unwrap();
        for _ in 0..10 {
            clock.advance(FRAME_MS);
            overlay.frame();
        }
        let a = overlay.scheduler(EntityRole::Primary).unwrap();
        let b = overlay.scheduler(EntityRole::Secondary).unwrap();
        assert!(a.is_ticking() && b.is_ticking());
        assert_eq!(a.cursor_ms(), 160.0);
        assert_eq!(b.cursor_ms(), 160.0);

        overlay.pause();
        for role in [EntityRole::Primary, EntityRole::Secondary] {
            let scheduler = overlay.scheduler(role).unwrap();
            assert!(!scheduler.is_ticking());
            assert_eq!(scheduler.state(), PlaybackState::Paused);
        }

        clock.advance(1000.0);
        overlay.frame();
        assert_eq!(overlay.scheduler(EntityRole::Primary).unwrap().cursor_ms(), 160.0);
        assert_eq!(overlay.scheduler(EntityRole::Secondary).unwrap().cursor_ms(), 160.0);
    }

    #[test]
    fn test_linked_seek_and_speed_apply_to_both() {
        let clock = ManualClock::new();
        let mut overlay = controller(&clock);
        overlay.enter(&author_b(), OverlayMode::Linked).unwrap();
        overlay.seek(1500.0);
        overlay.set_speed(2.0);
        for role in [EntityRole::Primary, EntityRole::Secondary] {
            let scheduler = overlay.scheduler(role).unwrap();
            assert_eq!(scheduler.cursor_ms(), 1500.0);
            assert_eq!(scheduler.speed(), 2.0);
        }
        assert!(overlay.transport(EntityRole::Secondary).is_err());
    }

    #[test]
    fn test_linked_seek_back_resumes_finished_secondary() {
        let clock = ManualClock::new();
        let mut overlay = controller(&clock);
        let short = entity("c", &[("London", "Paris")], Some(Color::from_hex(0x800000)));
        overlay.enter(&short, OverlayMode::Linked).unwrap();
        overlay.play().unwrap();

        let mut frames = 0;
        while overlay.scheduler(EntityRole::Secondary).unwrap().is_ticking() {
            clock.advance(FRAME_MS);
            overlay.frame();
            frames += 1;
            assert!(frames < 10_000);
        }
        assert!(overlay.scheduler(EntityRole::Primary).unwrap().is_ticking());

        overlay.seek(0.0);
        for _ in 0..20 {
            clock.advance(FRAME_MS);
            overlay.frame();
        }
        let a = overlay.scheduler(EntityRole::Primary).unwrap();
        let b = overlay.scheduler(EntityRole::Secondary).unwrap();
        assert_eq!(b.state(), PlaybackState::Playing);
        assert_eq!(a.cursor_ms(), 320.0);
        assert_eq!(b.cursor_ms(), 320.0);
    }

    #[test]
    fn test_independent_transports_are_separate() {
        let clock = ManualClock::new();
        let mut overlay = controller(&clock);
        overlay.enter(&author_b(), OverlayMode::Independent).unwrap();

        overlay.transport(EntityRole::Primary).unwrap().play().unwrap();
        overlay.transport(EntityRole::Secondary).unwrap().play().unwrap();
        clock.advance(100.0);
        overlay.frame();
        overlay.transport(EntityRole::Secondary).unwrap().pause();
        clock.advance(100.0);
        overlay.frame();

        assert_eq!(overlay.scheduler(EntityRole::Primary).unwrap().cursor_ms(), 200.0);
        assert_eq!(overlay.scheduler(EntityRole::Secondary).unwrap().cursor_ms(), 100.0);
    }

    #[test]
    fn test_linking_syncs_secondary_to_primary() {
        let clock = ManualClock::new();
        let mut overlay = controller(&clock);
        overlay.enter(&author_b(), OverlayMode::Independent).unwrap();
        overlay.transport(EntityRole::Primary).unwrap().play().unwrap();
        clock.advance(400.0);
        overlay.frame();

        overlay.set_mode(OverlayMode::Linked).unwrap();
        let b = overlay.scheduler(EntityRole::Secondary).unwrap();
        assert_eq!(b.cursor_ms(), 400.0);
        assert_eq!(b.state(), PlaybackState::Playing);

        clock.advance(100.0);
        overlay.frame();
        assert_eq!(overlay.scheduler(EntityRole::Primary).unwrap().cursor_ms(), 500.0);
        assert_eq!(overlay.scheduler(EntityRole::Secondary).unwrap().cursor_ms(), 500.0);
    }

    #[test]
    fn test_enter_requires_comparison_mode_and_primary() {
        let clock = ManualClock::new();
        let mut empty = OverlayController::new(Rc::new(clock.clone()), EngineConfig::default());
        assert!(matches!(
            empty.enter(&author_b(), OverlayMode::Linked),
            Err(EngineError::Overlay(_))
        ));

        let mut overlay = controller(&clock);
        assert!(matches!(
            overlay.enter(&author_b(), OverlayMode::Single),
            Err(EngineError::Overlay(_))
        ));
        assert!(overlay.set_mode(OverlayMode::Linked).is_err());
    }

    #[test]
    fn test_exit_disposes_secondary_and_state() {
        let clock = ManualClock::new();
        let mut overlay = controller(&clock);
        overlay.enter(&author_b(), OverlayMode::Linked).unwrap();
        assert!(overlay.state().is_some());

        overlay.exit();
        assert_eq!(overlay.mode(), OverlayMode::Single);
        assert!(overlay.state().is_none());
        assert!(overlay.merged().is_none());
        assert!(overlay.scheduler(EntityRole::Secondary).is_none());
        assert!(overlay.transport(EntityRole::Secondary).is_err());
        overlay.exit();
    }

    #[test]
    fn test_merge_marks_shared_nodes() {
        let clock = ManualClock::new();
        let mut overlay = controller(&clock);
        overlay.enter(&author_b(), OverlayMode::Independent).unwrap();
        let state = overlay.state().unwrap();
        assert_eq!(state.shared_node_ids, vec![NodeId::new("Paris")]);
        assert_eq!(state.primary_entity_id, "a");
        assert_eq!(state.secondary_entity_id, "b");

        // a: London Paris Rome Vienna Berlin, b: Madrid Paris Lisbon
        let merged = overlay.merged().unwrap();
        assert_eq!(merged.nodes.len(), 7);
        assert!((state.similarity - 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(merged.routes_for(EntityRole::Primary).count(), 5);
        assert_eq!(merged.routes_for(EntityRole::Secondary).count(), 3);
    }

    #[test]
    fn test_blend_passes_contrast() {
        let navy = Color::from_hex(0x000080);
        let maroon = Color::from_hex(0x800000);
        let color = blend_colors(navy, maroon, Color::WHITE, WCAG_AA);
        assert!(color.blended);
        assert!(color.outline.is_none());
        assert!(color.fill.contrast_ratio(&Color::WHITE) >= WCAG_AA);
        assert_eq!(color.fill, blend_colors(maroon, navy, Color::WHITE, WCAG_AA).fill);
    }

    #[test]
    fn test_blend_falls_back_to_outline() {
        let color = blend_colors(Color::YELLOW, Color::WHITE, Color::WHITE, WCAG_AA);
        assert!(!color.blended);
        assert_eq!(color.fill, Color::YELLOW);
        assert_eq!(color.outline, Some(Color::BLACK));
    }
}
