//! End-to-end playback properties across builder, scheduler, markers,
//! camera, interaction and overlay.

use itinera_animation::{
    PlaybackState, ScheduledEvent, SchedulerNotification, Timeline, TimelineConfig, Transport,
};
use itinera_app::{
    blend_colors, EngineConfig, EntityRole, InteractionOutcome, NarrativeEngine,
    OverlayController, OverlayMode, PointerInput,
};
use itinera_core::{
    Artifact, Color, Entity, InteractionMode, ManualClock, NodeId, Route, RouteId, Waypoint, Work,
    WCAG_AA_CONTRAST,
};
use rustc_hash::FxHashMap;
use std::cell::Cell;
use std::rc::Rc;

const FRAME_MS: f64 = 16.0;

const CITIES: &[(&str, f64, f64)] = &[
    ("London", -0.1276, 51.5072),
    ("Paris", 2.3522, 48.8566),
    ("Rome", 12.4964, 41.9028),
    ("Berlin", 13.4050, 52.5200),
    ("Vienna", 16.3738, 48.2082),
    ("Trieste", 13.7768, 45.6495),
    ("Zurich", 8.5417, 47.3769),
    ("Dublin", -6.2603, 53.3498),
    ("New York", -73.9857, 40.7484),
    ("Buenos Aires", -58.3816, -34.6037),
];

fn city(index: usize) -> Waypoint {
    let (name, lon, lat) = CITIES[index % CITIES.len()];
    let waypoint = Waypoint::new(name, lon, lat);
    if index % 3 == 0 {
        waypoint.with_artifact(Artifact {
            title: format!("Notebook from {name}"),
            date: None,
            location: Some(name.to_string()),
        })
    } else {
        waypoint
    }
}

/// Small deterministic generator so property cases are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn random_routes(seed: u64, count: usize) -> Vec<Route> {
    let mut rng = Lcg(seed);
    (0..count)
        .map(|i| {
            let from = rng.below(CITIES.len());
            let to = (from + 1 + rng.below(CITIES.len() - 1)) % CITIES.len();
            let route = Route::new(format!("r{i}"), city(from), city(to));
            match rng.below(4) {
                0 => route,
                _ => route.with_year(1900 + rng.below(30) as i32),
            }
        })
        .collect()
}

fn entity(id: &str, routes: Vec<Route>) -> Entity {
    Entity {
        id: id.to_string(),
        name: id.to_string(),
        color: None,
        works: vec![Work {
            id: format!("{id}-work"),
            title: String::new(),
            year: None,
            routes,
        }],
    }
}

fn itinerary() -> Entity {
    entity(
        "joyce",
        vec![
            Route::new("dublin-london", city(7), city(0)).with_year(1904),
            Route::new("london-paris", city(0), city(1)).with_year(1904),
            Route::new("paris-trieste", city(1), city(5)).with_year(1905),
            Route::new("trieste-rome", city(5), city(2)).with_year(1906),
            Route::new("rome-trieste", city(2), city(5)).with_year(1907),
            Route::new("trieste-zurich", city(5), city(6)).with_year(1915),
        ],
    )
}

fn engine(clock: &ManualClock, entity: &Entity) -> NarrativeEngine {
    let mut engine = NarrativeEngine::new(Rc::new(clock.clone()), EngineConfig::default());
    engine.load_entity(entity).unwrap();
    engine
}

fn play_to_end(engine: &mut NarrativeEngine, clock: &ManualClock) {
    engine.play().unwrap();
    for _ in 0..100_000 {
        clock.advance(FRAME_MS);
        if engine.frame().finished {
            return;
        }
    }
    panic!("playback never finished");
}

/// Let every ripple run out
fn settle(engine: &mut NarrativeEngine, clock: &ManualClock) {
    let frames = (engine.config().markers.ripple_duration_ms / FRAME_MS).ceil() as usize + 2;
    for _ in 0..frames {
        clock.advance(FRAME_MS);
        engine.frame();
    }
}

fn fired_flags(engine: &NarrativeEngine) -> Vec<bool> {
    let scheduler = engine.scheduler();
    (0..scheduler.event_count())
        .map(|i| scheduler.is_fired(i))
        .collect()
}

#[test]
fn test_built_events_are_causally_ordered() {
    for seed in 1..=25u64 {
        let routes = random_routes(seed, 3 + (seed as usize % 12));
        let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();

        let mut starts: FxHashMap<RouteId, f64> = FxHashMap::default();
        let mut completes: FxHashMap<RouteId, f64> = FxHashMap::default();
        let mut triggers: FxHashMap<NodeId, (RouteId, f64)> = FxHashMap::default();
        for event in timeline.events() {
            match event {
                ScheduledEvent::LineStart { route, time_ms, .. } => {
                    starts.insert(route.clone(), *time_ms);
                }
                ScheduledEvent::LineComplete { route, time_ms, .. } => {
                    completes.insert(route.clone(), *time_ms);
                }
                ScheduledEvent::NodeTrigger {
                    node, route, time_ms, ..
                } => {
                    let previous = triggers.insert(node.clone(), (route.clone(), *time_ms));
                    assert!(previous.is_none(), "seed {seed}: {node} triggered twice");
                }
                _ => {}
            }
        }

        for route in &routes {
            let start = starts[&route.id];
            let complete = completes[&route.id];
            assert!(start < complete, "seed {seed}: {} starts after it ends", route.id);

            let destination = route.to.as_ref().unwrap().node_id();
            let trigger = triggers[&destination].1;
            let first_arrival = routes
                .iter()
                .filter(|r| r.to.as_ref().unwrap().node_id() == destination)
                .map(|r| completes[&r.id])
                .fold(f64::INFINITY, f64::min);
            assert!(trigger >= first_arrival);
        }
        for (node, (route, trigger)) in &triggers {
            assert!(*trigger >= completes[route], "seed {seed}: {node} fires early");
        }

        let last = timeline
            .events()
            .iter()
            .map(|e| e.time_ms())
            .fold(0.0, f64::max);
        assert_eq!(timeline.total_duration_ms(), last);
    }
}

#[test]
fn test_unsorted_years_play_in_chronological_order() {
    let routes = vec![
        Route::new("a", city(0), city(1)).with_year(1920),
        Route::new("b", city(1), city(2)).with_year(1921),
        Route::new("c", city(2), city(3)).with_year(1919),
    ];
    let timeline = Timeline::build(&routes, Color::BLUE, &TimelineConfig::default()).unwrap();
    let starts: Vec<(RouteId, f64)> = timeline
        .events()
        .iter()
        .filter_map(|e| match e {
            ScheduledEvent::LineStart { route, time_ms, .. } => Some((route.clone(), *time_ms)),
            _ => None,
        })
        .collect();

    let order: Vec<&str> = starts.iter().map(|(r, _)| r.as_str()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
    assert!(starts.windows(2).all(|w| w[0].1 < w[1].1));
}

#[test]
fn test_node_reached_twice_triggers_once_at_first_arrival() {
    let mut config = EngineConfig::default();
    config.timeline.base_duration_ms = 5000.0;
    config.timeline.min_distance_factor = 1.0;
    config.timeline.max_distance_factor = 1.04;
    config.timeline.parallel_same_year = true;
    let ripple = config.timeline.ripple_delay_ms;

    // London-Paris is short enough for the 1.0 floor, Rome-Paris long enough for the 1.04 cap
    let routes = vec![
        Route::new("from-london", city(0), city(1)).with_year(1920),
        Route::new("from-rome", city(2), city(1)).with_year(1920),
    ];
    let timeline = Timeline::build(&routes, Color::BLUE, &config.timeline).unwrap();
    let paris: Vec<(&RouteId, f64)> = timeline
        .events()
        .iter()
        .filter_map(|e| match e {
            ScheduledEvent::NodeTrigger {
                node, route, time_ms, ..
            } if node.as_str() == "Paris" => Some((route, *time_ms)),
            _ => None,
        })
        .collect();

    assert_eq!(paris.len(), 1);
    assert_eq!(paris[0].0.as_str(), "from-london");
    assert!((paris[0].1 - (5000.0 + ripple)).abs() < 1e-6);
    let rome_arrival = timeline.span(&RouteId::new("from-rome")).unwrap().end_ms();
    assert!((rome_arrival - 5200.0).abs() < 1e-6);
}

#[test]
fn test_repeated_seek_is_idempotent() {
    let clock = ManualClock::new();
    let mut engine = engine(&clock, &itinerary());
    let total = engine.scheduler().total_duration_ms();

    for fraction in [0.0, 0.1, 0.33, 0.5, 0.77, 1.0, 0.2] {
        let t = total * fraction;
        engine.seek(t);
        let progress = engine.scheduler().active_progress().clone();
        let fired = fired_flags(&engine);
        let nodes = engine.node_states();

        engine.seek(t);
        assert_eq!(engine.scheduler().active_progress(), &progress);
        assert_eq!(fired_flags(&engine), fired);
        assert_eq!(engine.node_states(), nodes);
        assert_eq!(engine.cursor_ms(), t);
    }
}

#[test]
fn test_seek_round_trip_matches_continuous_playback() {
    let entity = itinerary();

    let clock = ManualClock::new();
    let mut continuous = engine(&clock, &entity);
    play_to_end(&mut continuous, &clock);
    settle(&mut continuous, &clock);

    let clock = ManualClock::new();
    let mut scrubbed = engine(&clock, &entity);
    let total = scrubbed.scheduler().total_duration_ms();
    scrubbed.seek(total);
    scrubbed.seek(0.0);
    assert_eq!(scrubbed.markers().visible_count(), 0);
    play_to_end(&mut scrubbed, &clock);
    settle(&mut scrubbed, &clock);

    assert_eq!(scrubbed.node_states(), continuous.node_states());
    assert_eq!(scrubbed.cursor_ms(), continuous.cursor_ms());
    assert_eq!(
        fired_flags(&scrubbed),
        vec![true; scrubbed.scheduler().event_count()]
    );
}

#[test]
fn test_double_speed_halves_wall_clock_time() {
    fn frames_to_reach(speed: f64, target_ms: f64) -> usize {
        let clock = ManualClock::new();
        let mut engine = engine(&clock, &itinerary());
        engine.set_speed(speed);
        engine.play().unwrap();
        let mut frames = 0;
        while engine.cursor_ms() < target_ms {
            clock.advance(FRAME_MS);
            engine.frame();
            frames += 1;
        }
        frames
    }

    let target = 3200.0;
    let normal = frames_to_reach(1.0, target);
    let double = frames_to_reach(2.0, target);
    let ratio = normal as f64 / double as f64;
    assert!((ratio - 2.0).abs() < 0.05, "ratio {ratio}");

    let clamped = frames_to_reach(10.0, target);
    assert_eq!(clamped, frames_to_reach(3.0, target));
}

#[test]
fn test_color_blend_is_commutative() {
    let palette = [
        Color::from_hex(0x1f3a93),
        Color::from_hex(0x8e1b2c),
        Color::from_hex(0x2e7d32),
        Color::from_hex(0xf9a825),
        Color::WHITE,
        Color::BLACK,
    ];
    for a in palette {
        for b in palette {
            assert_eq!(Color::mix_oklab(&a, &b), Color::mix_oklab(&b, &a));
            let ab = blend_colors(a, b, Color::WHITE, WCAG_AA_CONTRAST);
            let ba = blend_colors(b, a, Color::WHITE, WCAG_AA_CONTRAST);
            assert_eq!(ab.blended, ba.blended);
            if ab.blended {
                assert_eq!(ab.fill, ba.fill);
            }
        }
    }
}

#[test]
fn test_drag_is_ignored_until_click_unlocks() {
    let clock = ManualClock::new();
    let mut engine = engine(&clock, &itinerary());
    engine.play().unwrap();
    clock.advance(FRAME_MS);
    engine.frame();

    let pauses = Rc::new(Cell::new(0));
    let counter = pauses.clone();
    let _ = engine.scheduler().subscribe(move |n| {
        if let SchedulerNotification::Event(ScheduledEvent::PlaybackStateChange {
            to: PlaybackState::Paused,
            ..
        }) = n
        {
            counter.set(counter.get() + 1);
        }
    });

    let before = *engine.camera().state();
    let drag = PointerInput::Drag { dx: 80.0, dy: -30.0 };
    assert_eq!(engine.pointer(drag), InteractionOutcome::Swallowed);
    assert_eq!(*engine.camera().state(), before);
    assert_eq!(engine.state(), PlaybackState::Playing);

    assert_eq!(
        engine.pointer(PointerInput::Click { x: 10.0, y: 10.0 }),
        InteractionOutcome::Unlocked
    );
    assert_eq!(engine.interaction_mode(), InteractionMode::Manual);
    assert_eq!(engine.pointer(drag), InteractionOutcome::Applied);
    assert_ne!(*engine.camera().state(), before);
    assert_eq!(pauses.get(), 1);
    assert_eq!(engine.state(), PlaybackState::Paused);
}

#[test]
fn test_linked_overlay_pause_stops_both_tick_loops() {
    let clock = ManualClock::new();
    let a = entity("a", random_routes(7, 5));
    let b = entity("b", random_routes(11, 3));

    let mut overlay = OverlayController::new(Rc::new(clock.clone()), EngineConfig::default());
    overlay.load_primary(&a).unwrap();
    overlay.enter(&b, OverlayMode::Linked).unwrap();
    overlay.play().unwrap();
    for _ in 0..20 {
        clock.advance(FRAME_MS);
        overlay.frame();
    }
    for role in [EntityRole::Primary, EntityRole::Secondary] {
        assert!(overlay.scheduler(role).unwrap().is_ticking());
    }

    overlay.pause();
    for role in [EntityRole::Primary, EntityRole::Secondary] {
        let scheduler = overlay.scheduler(role).unwrap();
        assert!(!scheduler.is_ticking());
        assert_eq!(scheduler.state(), PlaybackState::Paused);
        assert_eq!(scheduler.cursor_ms(), 20.0 * FRAME_MS);
    }
}
