// ==============================================================================
// telemetry.rs — SERIALIZABLE SNAPSHOTS (CORE -> COLLABORATORS)
// ------------------------------------------------------------------------------
// Flat, JSON-friendly view of VehicleState + score, one per published tick.
// Math types are flattened to arrays so consumers need no nalgebra.
// ==============================================================================

use serde::Serialize;

use crate::body::{ChassisKinematics, arr3, parr3};
use crate::score::PendingPoints;
use crate::suspension::SuspensionSample;
use crate::transmission::{TransmissionMode, wheel_rpm};
use crate::vehicle::VehicleSim;

#[derive(Debug, Clone, Serialize)]
pub struct GearTelemetry {
    pub index: usize,
    pub name: String,
    pub rpm: f32,
    pub display_rpm: f32,
    pub wheel_rpm: f32,
    pub mode: TransmissionMode,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DriftTelemetry {
    pub drifting: bool,
    pub direction: f32,
    pub force: f32,
    pub visual_yaw_deg: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CornerTelemetry {
    pub id: &'static str,
    pub compression: f32,
    pub point: [f32; 3],
    pub normal: [f32; 3],
    pub on_road: bool,
}

impl From<&SuspensionSample> for CornerTelemetry {
    fn from(s: &SuspensionSample) -> Self {
        Self {
            id: s.corner.as_str(),
            compression: s.compression_ratio,
            point: parr3(&s.impact_point),
            normal: arr3(&s.impact_normal),
            on_road: s.on_road,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreTelemetry {
    pub points: i64,
    pub buffer: i64,
    pub pending: PendingPoints,
    pub multiplier: f32,
    pub track_time: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time: f32,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub kmh: f32,
    pub grounded: bool,
    pub braking: bool,
    pub gear: GearTelemetry,
    pub drift: DriftTelemetry,
    pub suspension: Vec<CornerTelemetry>,
    pub all_wheels_on_road: bool,
    pub score: ScoreTelemetry,
}

impl Snapshot {
    pub fn capture(tick: u64, time: f32, vehicle: &VehicleSim, kin: &ChassisKinematics) -> Self {
        let state = vehicle.state(kin);
        let tuning = vehicle.tuning();
        let score = vehicle.score();

        Self {
            tick,
            time,
            position: parr3(&kin.position),
            velocity: arr3(&kin.linvel),
            kmh: state.kmh,
            grounded: state.grounded,
            braking: state.braking,
            gear: GearTelemetry {
                index: state.gear,
                name: tuning.transmission.gears.get(state.gear).name.clone(),
                rpm: state.rpm,
                display_rpm: state.display_rpm,
                wheel_rpm: wheel_rpm(state.kmh, tuning.motor.wheel_radius),
                mode: state.mode,
            },
            drift: DriftTelemetry {
                drifting: state.drifting,
                direction: state.drift_direction,
                force: state.drift_force,
                visual_yaw_deg: state.visual_yaw_deg,
            },
            suspension: state.suspension.iter().map(CornerTelemetry::from).collect(),
            all_wheels_on_road: state.all_wheels_on_road,
            score: ScoreTelemetry {
                points: score.points(),
                buffer: score.buffer(),
                pending: score.pending(),
                multiplier: score.multiplier(),
                track_time: score.track_time(),
            },
        }
    }
}
