//! Arcade Collision sandbox runner
//!
//! Builds one of the canned scenes, steps it at the fixed timestep and
//! logs every contact outcome.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use arcade_collision::consts::SIM_DT;
use arcade_collision::debug::DebugLines;
use arcade_collision::sandbox::{Scenario, Scene};
use arcade_collision::sim::{ContactOutcome, tick};
use arcade_collision::{BroadPhaseStrategy, ContactSolveBias, PhysicsConfig};

#[derive(Parser)]
#[command(name = "arcade-collision", about = "Step a collision sandbox scene and report contacts")]
struct Cli {
    /// Scene to build.
    #[arg(long, value_enum, default_value_t = Scenario::SeamStrip)]
    scenario: Scenario,

    /// Number of fixed ticks to run.
    #[arg(long, default_value_t = 120)]
    steps: u32,

    /// JSON physics configuration; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Contact solve bias (`none`, `vertical-first`, `horizontal-first`).
    #[arg(long)]
    bias: Option<String>,

    /// Broad phase (`naive`, `dynamic-tree` or `sparse-hash-grid`).
    #[arg(long = "broad-phase")]
    broad_phase: Option<String>,

    /// Vertical gravity in units per second squared.
    #[arg(long, default_value_t = 800.0)]
    gravity: f32,

    /// Seed for the scatter scene.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Print the debug line count after the last tick.
    #[arg(long)]
    debug_draw: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PhysicsConfig::load(path)?,
        None => PhysicsConfig::default(),
    };
    if cli.config.is_none() {
        config.gravity.y = cli.gravity;
    }
    if let Some(bias) = &cli.bias {
        config.arcade.contact_solve_bias = ContactSolveBias::parse(bias);
    }
    if let Some(name) = &cli.broad_phase {
        config.broad_phase =
            BroadPhaseStrategy::parse(name).ok_or_else(|| format!("unknown broad phase {name:?}"))?;
    }

    let Scene { mut world, player } = Scene::build(cli.scenario, config, cli.seed)?;
    log::info!(
        "{} bodies, broad phase {}, bias {}",
        world.bodies().len(),
        world.config().broad_phase.as_str(),
        world.config().arcade.contact_solve_bias
    );

    let mut last_contacts = Vec::new();
    for step in 0..cli.steps {
        let report = tick(&mut world, SIM_DT);
        for outcome in &report.outcomes {
            match outcome {
                ContactOutcome::Started { a, b, side, mtv } => {
                    log::info!("[{step}] start {a} {b} side={side:?} mtv={mtv}");
                }
                ContactOutcome::Continuing { a, b, side, .. } => {
                    log::debug!("[{step}] touch {a} {b} side={side:?}");
                }
                ContactOutcome::Ended { a, b } => log::info!("[{step}] end {a} {b}"),
            }
        }
        log::trace!("[{step}] moved={} pairs={}", report.moved, report.pairs);
        last_contacts = report.contacts;
    }

    if let Some(body) = world.body(player) {
        println!(
            "player {player}: pos=({:.3}, {:.3}) vel=({:.3}, {:.3})",
            body.pos().x,
            body.pos().y,
            body.vel().x,
            body.vel().y
        );
    }
    if world.solver().diagnostics().emitted() > 0 {
        println!("{} distinct warnings", world.solver().diagnostics().emitted());
    }
    if cli.debug_draw {
        let mut lines = DebugLines::new();
        world.debug_draw(&last_contacts, &mut lines);
        println!("debug draw: {} segments", lines.segment_count());
    }
    Ok(())
}
