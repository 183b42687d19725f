//! Cavern Simulation Driver
//!
//! Runs the navigation engine headless against a JSON scene: navigations,
//! display groups and portals, a box terrain for ground following and a
//! script of raw device samples per frame range.
//!
//! # Usage
//!
//! ```bash
//! # Validate a scene
//! cavern check scene.json
//!
//! # Simulate ten seconds at 60 Hz
//! cavern run scene.json --frames 600 --hz 60
//!
//! # Same with per-frame engine logging
//! cavern --log-level debug run scene.json
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cavern_core::math::{mat4_from_columns, rotation_of, translation_of, YawExtractor};
use cavern_core::{BoxTerrain, FrameTime, RawSample};
use cavern_nav::{FrameInput, NavigationEngine, NavigationEvent, SceneConfig};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Cavern navigation simulator
#[derive(Parser, Debug)]
#[command(name = "cavern")]
#[command(author, version, about = "Headless multi-user VR navigation simulator", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate a scene and log the final platform transforms
    Run {
        /// Scene description (JSON)
        scene: PathBuf,

        /// Number of frames to simulate
        #[arg(short, long, default_value = "600")]
        frames: u64,

        /// Frame rate in Hz
        #[arg(long, default_value = "60")]
        hz: f64,
    },

    /// Load and validate a scene without simulating
    Check {
        /// Scene description (JSON)
        scene: PathBuf,
    },
}

/// Scene file: engine scene plus simulation inputs.
#[derive(Debug, Default, Deserialize)]
struct SimulationScene {
    #[serde(flatten)]
    scene: SceneConfig,

    /// Surfaces for ground following
    #[serde(default)]
    terrain: BoxTerrain,

    /// Fixed tracking matrices (column-major) by target name
    #[serde(default)]
    tracking: HashMap<String, [f64; 16]>,

    /// Scripted device input
    #[serde(default)]
    script: Vec<ScriptedSample>,
}

/// Raw device values held over a frame range.
#[derive(Debug, Clone, Deserialize)]
struct ScriptedSample {
    device_name: String,
    from_frame: u64,
    to_frame: u64,
    #[serde(default)]
    axes: Vec<f64>,
    #[serde(default)]
    buttons: Vec<bool>,
}

impl ScriptedSample {
    fn is_active(&self, frame: u64) -> bool {
        (self.from_frame..self.to_frame).contains(&frame)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Cavern v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run { scene, frames, hz } => run(&scene, frames, hz),
        Commands::Check { scene } => check(&scene),
    }
}

fn load_scene(path: &Path) -> anyhow::Result<SimulationScene> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading scene {}", path.display()))?;
    let scene: SimulationScene =
        serde_json::from_str(&text).with_context(|| format!("parsing scene {}", path.display()))?;
    Ok(scene)
}

/// Validate a scene
fn check(path: &Path) -> anyhow::Result<()> {
    let scene = load_scene(path)?;
    let engine = NavigationEngine::from_scene(&scene.scene).context("invalid scene")?;

    for nav in engine.navigations().iter() {
        info!(
            "{}: {} '{}', mode {}, scale {}",
            nav.name(),
            nav.device().kind(),
            nav.device().name(),
            nav.mode().name(),
            nav.scale()
        );
    }
    for group in engine.display_groups() {
        info!(
            "display group {}: {} navigations, {} portals",
            group.name(),
            group.navigations().len(),
            group.portals().len()
        );
    }

    let known: Vec<&str> = engine.navigations().iter().map(|n| n.device().name()).collect();
    for entry in &scene.script {
        if !known.contains(&entry.device_name.as_str()) {
            warn!("Script drives unknown device '{}'", entry.device_name);
        }
    }

    info!("Scene OK");
    Ok(())
}

/// Simulate a scene
fn run(path: &Path, frames: u64, hz: f64) -> anyhow::Result<()> {
    if !(hz.is_finite() && hz > 0.0) {
        anyhow::bail!("frame rate must be positive, got {hz}");
    }

    let scene = load_scene(path)?;
    let mut engine = NavigationEngine::from_scene(&scene.scene).context("invalid scene")?;
    let tracking: HashMap<String, _> = scene
        .tracking
        .iter()
        .map(|(target, columns)| (target.clone(), mat4_from_columns(columns)))
        .collect();

    info!("Simulating {} frames at {} Hz", frames, hz);

    let mut time = FrameTime::first(hz);
    for _ in 0..frames {
        let mut input = FrameInput {
            samples: HashMap::new(),
            tracking: tracking.clone(),
        };
        for entry in scene.script.iter().filter(|e| e.is_active(time.frame_number)) {
            input = input.with_sample(
                entry.device_name.clone(),
                RawSample::new(entry.axes.clone(), entry.buttons.clone()),
            );
        }

        let report = engine.tick(&time, &input, &scene.terrain);
        for event in &report.events {
            log_event(&engine, report.frame, event);
        }
        time = time.next();
    }

    for nav in engine.navigations().iter() {
        let position = translation_of(nav.matrix());
        let heading = YawExtractor::new().extract(&rotation_of(nav.matrix())).to_degrees();
        info!(
            "{}: position ({:.3}, {:.3}, {:.3}), heading {:.1} deg, scale {:.4}, mode {}, trail {} points",
            nav.name(),
            position.x,
            position.y,
            position.z,
            heading,
            nav.scale(),
            nav.mode().name(),
            nav.trace().len()
        );
        debug!("{} matrix: {}", nav.name(), nav.matrix());
    }

    Ok(())
}

fn nav_name(engine: &NavigationEngine, id: cavern_core::NavId) -> String {
    engine
        .navigation(id)
        .map_or_else(|_| id.to_string(), |n| n.name().to_string())
}

fn log_event(engine: &NavigationEngine, frame: u64, event: &NavigationEvent) {
    match event {
        NavigationEvent::CouplingChanged { members, coupled } => {
            let names: Vec<String> = members.iter().map(|id| nav_name(engine, *id)).collect();
            let verb = if *coupled { "coupled" } else { "decoupled" };
            info!("[{frame}] {verb}: {}", names.join(", "));
        }
        NavigationEvent::CouplingUnavailable { navigation } => {
            info!("[{frame}] {}: nobody in coupling range", nav_name(engine, *navigation));
        }
        NavigationEvent::DofModeChanged { navigation, mode } => {
            info!("[{frame}] {} switched to {}", nav_name(engine, *navigation), mode.name());
        }
        NavigationEvent::Transited(record) => {
            let portal = engine
                .portal(record.portal)
                .map_or_else(|_| record.portal.to_string(), |p| p.name().to_string());
            info!("[{frame}] {} went through {}", nav_name(engine, record.navigation), portal);
        }
        NavigationEvent::ActiveNavigationChanged {
            display_group,
            navigation,
        } => {
            let group = engine
                .display_group(*display_group)
                .map_or_else(|_| display_group.to_string(), |g| g.name().to_string());
            info!("[{frame}] {} now drives {}", nav_name(engine, *navigation), group);
        }
        NavigationEvent::Reset { navigation } => {
            info!("[{frame}] {} reset", nav_name(engine, *navigation));
        }
    }
}
