//! Itinera CLI
//!
//! Inspect and play narrative timelines headlessly, without a map surface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use itinera_animation::{
    NodeVisualState, PlaybackState, ScheduledEvent, SchedulerNotification, Timeline, Transport,
};
use itinera_app::{EngineConfig, EntityRole, NarrativeEngine, OverlayController, OverlayMode};
use itinera_core::{Entity, ManualClock, NodeId};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod input;

/// Playback gives up after this many simulated frames
const MAX_FRAMES: usize = 1_000_000;

#[derive(Parser)]
#[command(name = "itinera")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Narrative timeline engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ordered event list of an entity
    Inspect {
        /// Entity JSON file
        entity: PathBuf,
    },

    /// Play an entity's timeline to completion
    Play {
        /// Entity JSON file
        entity: PathBuf,

        /// Speed multiplier (clamped to the configured bounds)
        #[arg(short, long, default_value = "1.0")]
        speed: f64,

        /// Simulated frames per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Start from this cursor position in milliseconds
        #[arg(long)]
        seek: Option<f64>,
    },

    /// Compare two entities on one timeline
    Compare {
        /// Primary entity JSON file
        primary: PathBuf,

        /// Secondary entity JSON file
        secondary: PathBuf,

        /// Shared or separate transport
        #[arg(short, long, value_enum, default_value = "linked")]
        mode: CompareMode,

        /// Simulated frames per second
        #[arg(long, default_value = "60")]
        fps: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompareMode {
    Linked,
    Independent,
}

impl From<CompareMode> for OverlayMode {
    fn from(mode: CompareMode) -> Self {
        match mode {
            CompareMode::Linked => OverlayMode::Linked,
            CompareMode::Independent => OverlayMode::Independent,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = input::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { entity } => cmd_inspect(&entity, &config),

        Commands::Play {
            entity,
            speed,
            fps,
            seek,
        } => cmd_play(&entity, config, speed, fps, seek),

        Commands::Compare {
            primary,
            secondary,
            mode,
            fps,
        } => cmd_compare(&primary, &secondary, config, mode.into(), fps),
    }
}

fn frame_ms(fps: u32) -> Result<f64> {
    if fps == 0 {
        anyhow::bail!("--fps must be at least 1");
    }
    Ok(1000.0 / f64::from(fps))
}

fn entity_color(entity: &Entity, config: &EngineConfig) -> itinera_core::Color {
    entity.color.unwrap_or(config.overlay.primary_color)
}

fn cmd_inspect(path: &Path, config: &EngineConfig) -> Result<()> {
    let entity = input::load_entity(path)?;
    let timeline = Timeline::build(&entity.routes(), entity_color(&entity, config), &config.timeline)
        .with_context(|| format!("Cannot build a timeline for '{}'", entity.id))?;

    println!("{} ({})", entity.name, entity.id);
    println!("==================");
    println!();
    for event in timeline.events() {
        println!("{event}");
    }
    println!();
    println!("Routes:   {}", timeline.spans().len());
    println!("Events:   {}", timeline.events().len());
    println!("Nodes:    {}", timeline.nodes().len());
    println!("Duration: {:.1} ms", timeline.total_duration_ms());
    println!("Color:    {}", timeline.color().to_hex());
    Ok(())
}

fn cmd_play(
    path: &Path,
    config: EngineConfig,
    speed: f64,
    fps: u32,
    seek: Option<f64>,
) -> Result<()> {
    let step = frame_ms(fps)?;
    let entity = input::load_entity(path)?;

    let clock = ManualClock::new();
    let mut engine = NarrativeEngine::new(Rc::new(clock.clone()), config);
    engine
        .load_entity(&entity)
        .with_context(|| format!("Cannot load '{}'", entity.id))?;
    let _ = engine.scheduler().subscribe(log_notification);

    engine.set_speed(speed);
    if let Some(ms) = seek {
        engine.seek(ms);
    }
    engine.play()?;
    info!(
        "Playing {} at {}x ({} fps)",
        entity.name,
        engine.scheduler().speed(),
        fps
    );

    let mut frames = 0;
    while frames < MAX_FRAMES {
        clock.advance(step);
        let report = engine.frame();
        frames += 1;
        for update in report.growth.iter().filter(|u| u.visually_complete) {
            debug!(route = %update.route, points = update.revealed.len(), "path drawn");
        }
        if report.finished {
            break;
        }
    }
    if engine.state() == PlaybackState::Playing {
        warn!("Stopped after {} frames without finishing", frames);
    }

    // Let arrival ripples settle
    let settle = (engine.config().markers.ripple_duration_ms / step).ceil() as usize + 1;
    for _ in 0..settle {
        clock.advance(step);
        engine.frame();
    }

    info!(
        "Finished at {:.1} ms after {} frames",
        engine.cursor_ms(),
        frames
    );
    print_node_states(&engine.node_states());
    Ok(())
}

fn cmd_compare(
    primary: &Path,
    secondary: &Path,
    config: EngineConfig,
    mode: OverlayMode,
    fps: u32,
) -> Result<()> {
    let step = frame_ms(fps)?;
    let a = input::load_entity(primary)?;
    let b = input::load_entity(secondary)?;

    let clock = ManualClock::new();
    let mut overlay = OverlayController::new(Rc::new(clock.clone()), config);
    overlay
        .load_primary(&a)
        .with_context(|| format!("Cannot load '{}'", a.id))?;
    overlay
        .enter(&b, mode)
        .with_context(|| format!("Cannot compare against '{}'", b.id))?;

    if let Some(state) = overlay.state() {
        println!("{} vs {} ({})", a.name, b.name, state.mode);
        println!("==================");
        println!();
        let shared: Vec<&str> = state.shared_node_ids.iter().map(NodeId::as_str).collect();
        println!("Shared nodes: {}", shared.join(", "));
        println!("Similarity:   {:.1}%", state.similarity * 100.0);
        println!("Mixed color:  {}", state.mixed_color.to_hex());
        match state.presentation.outline {
            Some(outline) => println!(
                "Presentation: {} with {} outline (blend below contrast minimum)",
                state.presentation.fill.to_hex(),
                outline.to_hex()
            ),
            None => println!("Presentation: {}", state.presentation.fill.to_hex()),
        }
        println!();
    }

    match mode {
        OverlayMode::Linked => overlay.play()?,
        _ => {
            overlay.transport(EntityRole::Primary)?.play()?;
            overlay.transport(EntityRole::Secondary)?.play()?;
        }
    }

    let ticking = |overlay: &OverlayController| {
        [EntityRole::Primary, EntityRole::Secondary]
            .into_iter()
            .filter_map(|role| overlay.scheduler(role))
            .any(|s| s.is_ticking())
    };
    let mut frames = 0;
    while frames < MAX_FRAMES && ticking(&overlay) {
        clock.advance(step);
        overlay.frame();
        frames += 1;
    }

    for (role, entity) in [(EntityRole::Primary, &a), (EntityRole::Secondary, &b)] {
        if let Some(scheduler) = overlay.scheduler(role) {
            info!(
                "{}: {:.1} / {:.1} ms ({})",
                entity.name,
                scheduler.cursor_ms(),
                scheduler.total_duration_ms(),
                scheduler.state()
            );
        }
    }
    overlay.exit();
    Ok(())
}

fn log_notification(notification: &SchedulerNotification) {
    match notification {
        SchedulerNotification::Event(event @ ScheduledEvent::LineProgress { .. }) => {
            tracing::trace!("{event}")
        }
        SchedulerNotification::Event(event) => info!("{event}"),
        SchedulerNotification::Rewound(event) => debug!("rewound {event}"),
        SchedulerNotification::Ready {
            event_count,
            total_duration_ms,
        } => debug!(event_count, total_duration_ms, "ready"),
        SchedulerNotification::SpeedChanged { speed } => info!("speed {speed}x"),
        SchedulerNotification::Finished { time_ms } => info!("finished at {time_ms:.1} ms"),
    }
}

fn print_node_states(states: &[(NodeId, NodeVisualState)]) {
    println!();
    println!("Nodes:");
    for (node, state) in states {
        let state = match state {
            NodeVisualState::Hidden => "hidden",
            NodeVisualState::Rippling => "rippling",
            NodeVisualState::Static => "static",
            NodeVisualState::Breathing => "breathing",
        };
        println!("  {node:<24} {state}");
    }
}
