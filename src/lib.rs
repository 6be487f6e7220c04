// ==============================================================================
// lib.rs — DRIFT CORE
// ------------------------------------------------------------------------------
// Arcade vehicle dynamics + drift scoring for a single rigid-body car.
//
// The core (vehicle and everything under it) is engine-agnostic: it reads
// ChassisKinematics, queries a TerrainProbe and emits BodyCommands + CoreEvents.
// physics.rs is the rapier host used by the headless simulator.
// ==============================================================================

pub mod body;
pub mod collision;
pub mod config;
pub mod debug;
pub mod drift;
pub mod drive;
pub mod events;
pub mod input;
pub mod math;
pub mod physics;
pub mod score;
pub mod script;
pub mod suspension;
pub mod telemetry;
pub mod terrain;
pub mod transmission;
pub mod vehicle;

pub use body::{BodyCommand, ChassisKinematics};
pub use config::TuningProfile;
pub use events::CoreEvent;
pub use input::{ControlFrame, InputTracker, RawInput};
pub use vehicle::{VehicleSim, VehicleState};
