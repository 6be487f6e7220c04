// ==============================================================================
// main.rs — HEADLESS DRIFT SIMULATOR
// ------------------------------------------------------------------------------
// Runs one car on the rapier test track at a fixed 60 Hz:
//   script -> InputTracker -> VehicleSim.update -> fixed_update(RapierProbe)
//   -> apply BodyCommands -> step -> contacts -> on_collision
// Events and periodic telemetry snapshots go to stdout as JSON lines; logs go
// through tracing (RUST_LOG).
// ==============================================================================

use clap::Parser;
use rapier3d::prelude::point;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use drift_core::config::TuningProfile;
use drift_core::input::InputTracker;
use drift_core::physics::{PhysicsWorld, TrackLayout};
use drift_core::script::InputScript;
use drift_core::telemetry::Snapshot;
use drift_core::vehicle::VehicleSim;

const TICK_HZ: u32 = 60;

#[derive(Parser, Debug)]
#[command(name = "drift-sim", about = "Headless drift vehicle simulation")]
struct Args {
    /// Tuning profile (TOML). Built-in defaults when omitted.
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Input script (JSON). Built-in demo run when omitted.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Simulated seconds. Defaults to the script's duration.
    #[arg(long)]
    seconds: Option<f32>,

    /// Emit a telemetry snapshot every N ticks (0 disables).
    #[arg(long, default_value_t = 30)]
    telemetry_every: u64,

    /// Pace ticks against the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let tuning = match &args.tuning {
        Some(path) => TuningProfile::load(path)?,
        None => TuningProfile::default(),
    };
    let tuning = Arc::new(tuning);

    let script = match &args.script {
        Some(path) => serde_json::from_str::<InputScript>(&fs::read_to_string(path)?)?,
        None => InputScript::demo(),
    };
    let seconds = args.seconds.unwrap_or_else(|| script.duration());

    let mut world = PhysicsWorld::new(&TrackLayout::default());
    world.spawn_chassis(point![0.0, 0.6, 0.0], &tuning.chassis);
    let mut vehicle = VehicleSim::new(Arc::clone(&tuning))?;
    let mut tracker = InputTracker::default();

    let dt = 1.0 / TICK_HZ as f32;
    let ticks = (seconds * TICK_HZ as f32).ceil() as u64;
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(seconds, ticks, realtime = args.realtime, "session start");
    vehicle.start_track_timer();

    for tick in 0..ticks {
        if args.realtime {
            ticker.tick().await;
        }
        let time = tick as f32 * dt;

        let Some(kin) = world.kinematics() else {
            warn!(tick, "chassis missing, stopping");
            break;
        };

        let frame = tracker.frame(script.sample(time));
        vehicle.update(frame, &kin, dt);
        vehicle.fixed_update(&kin, &world.probe(), dt);

        for contact in world.new_contacts() {
            vehicle.on_collision(&contact, &kin);
        }

        let commands = vehicle.drain_commands();
        world.apply(&commands, dt);
        world.step(dt);

        for event in vehicle.drain_events() {
            println!("{}", serde_json::to_string(&event)?);
        }

        if args.telemetry_every > 0 && tick % args.telemetry_every == 0 {
            if let Some(kin) = world.kinematics() {
                println!("{}", serde_json::to_string(&Snapshot::capture(tick, time, &vehicle, &kin))?);
            }
        }
    }

    let score = vehicle.score();
    info!(
        points = score.points(),
        buffer = score.buffer(),
        track_time = score.track_time(),
        "session end"
    );
    Ok(())
}
