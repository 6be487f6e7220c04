// ==============================================================================
// debug.rs — DEBUG OVERLAY PRIMITIVES
// ------------------------------------------------------------------------------
// Serializable debug primitives for a viewer:
// - DebugRay: suspension probes (origin -> impact point) and the centre ground
//   probe
// - DebugCorner: per-corner compression label + road flag
// - DebugChassis: pose + box extents
//
// Pure visualisation scaffolding, built from published state. No side effects.
// ==============================================================================

use serde::Serialize;

use crate::body::{ChassisKinematics, arr3, parr3, v3};
use crate::vehicle::VehicleSim;

const COLOR_HIT: [f32; 3] = [0.1, 0.9, 0.2];
const COLOR_ROAD: [f32; 3] = [0.2, 0.5, 1.0];
const COLOR_MISS: [f32; 3] = [0.9, 0.2, 0.1];
const COLOR_GROUND: [f32; 3] = [1.0, 1.0, 0.2];

#[derive(Clone, Debug, Serialize)]
pub struct DebugRay {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub length: f32,
    pub hit: Option<[f32; 3]>,
    pub color: [f32; 3],
}

#[derive(Clone, Debug, Serialize)]
pub struct DebugCorner {
    pub id: &'static str, // "FL", "FR", "RL", "RR"
    pub label: String,    // compression, 2 decimals
    pub compression: f32,
    pub on_road: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DebugChassis {
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion i, j, k, w
    pub half_extents: [f32; 3],
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DebugOverlay {
    pub chassis: Option<DebugChassis>,
    pub suspension_rays: Vec<DebugRay>,
    pub corners: Vec<DebugCorner>,
    pub ground_ray: Option<DebugRay>,
    pub all_wheels_on_road: bool,
}

impl DebugOverlay {
    pub fn clear(&mut self) {
        self.chassis = None;
        self.suspension_rays.clear();
        self.corners.clear();
        self.ground_ray = None;
        self.all_wheels_on_road = false;
    }

    pub fn build(vehicle: &VehicleSim, kin: &ChassisKinematics) -> Self {
        let mut overlay = DebugOverlay::default();
        overlay.rebuild(vehicle, kin);
        overlay
    }

    pub fn rebuild(&mut self, vehicle: &VehicleSim, kin: &ChassisKinematics) {
        self.clear();
        let tuning = vehicle.tuning();
        let q = kin.rotation.quaternion();

        self.chassis = Some(DebugChassis {
            position: parr3(&kin.position),
            rotation: [q.i, q.j, q.k, q.w],
            half_extents: arr3(&(v3(tuning.chassis.box_size) * 0.5)),
        });

        let down = -kin.up();
        for sample in vehicle.suspension().samples() {
            let color = match (sample.hit, sample.on_road) {
                (true, true) => COLOR_ROAD,
                (true, false) => COLOR_HIT,
                _ => COLOR_MISS,
            };
            self.suspension_rays.push(DebugRay {
                origin: parr3(&sample.origin),
                direction: arr3(&down),
                length: tuning.suspension.max_distance,
                hit: sample.hit.then(|| parr3(&sample.impact_point)),
                color,
            });
            self.corners.push(DebugCorner {
                id: sample.corner.as_str(),
                label: format!("{:.2}", sample.compression_ratio),
                compression: sample.compression_ratio,
                on_road: sample.on_road,
            });
        }

        // proximity query only: a grounded probe is drawn to its full length
        let grounded = vehicle.drive().grounded();
        let length = tuning.drive.ground_probe_distance;
        self.ground_ray = Some(DebugRay {
            origin: parr3(&kin.position),
            direction: arr3(&down),
            length,
            hit: grounded.then(|| parr3(&(kin.position + down * length))),
            color: if grounded { COLOR_GROUND } else { COLOR_MISS },
        });
        self.all_wheels_on_road = vehicle.suspension().all_wheels_on_road();
    }
}
