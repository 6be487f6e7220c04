// ==============================================================================
// collision.rs — CRASH FACE CLASSIFIER
// ------------------------------------------------------------------------------
// Maps an impact normal (world space, pointing from the obstacle toward the
// car) onto the nearest chassis face:
//
//   angle(forward, normal) >= 135°  -> Front   (normal points back at the nose)
//   angle(forward, normal) <=  45°  -> Rear
//   otherwise side: cross(forward, normal).y > 0 -> Left, else Right
//
// The angle is measured in the chassis frame, so pitch/roll of the body does
// not leak into the classification.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;
use std::fmt;

use crate::terrain::SurfaceTag;

const FRONT_MIN_DEG: f32 = 135.0;
const REAR_MAX_DEG: f32 = 45.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashFace {
    Front,
    Right,
    Rear,
    Left,
}

impl fmt::Display for CrashFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CrashFace::Front => "front",
            CrashFace::Right => "right",
            CrashFace::Rear => "rear",
            CrashFace::Left => "left",
        };
        f.write_str(s)
    }
}

/// Contact reported by the host for the chassis this tick.
#[derive(Clone, Copy, Debug)]
pub struct ImpactContact {
    pub normal: Vector3<f32>, // world, obstacle -> car
    pub surface: SurfaceTag,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrashReport {
    pub face: CrashFace,
    pub kmh: f32, // sampled before the impact
}

/// Face for a normal already expressed in the chassis frame.
/// `None` for a degenerate (zero / non-finite) normal.
pub fn classify_local(normal: &Vector3<f32>) -> Option<CrashFace> {
    let forward = Vector3::z();
    let len = normal.magnitude();
    if !len.is_finite() || len < 1e-6 {
        return None;
    }

    let cos = (forward.dot(normal) / len).clamp(-1.0, 1.0);
    let angle = cos.acos().to_degrees();

    let face = if angle >= FRONT_MIN_DEG {
        CrashFace::Front
    } else if angle <= REAR_MAX_DEG {
        CrashFace::Rear
    } else if forward.cross(normal).y > 0.0 {
        // normal toward +X: the obstacle sits on the car's right (-X)
        CrashFace::Right
    } else {
        CrashFace::Left
    };
    Some(face)
}

pub fn classify_impact(rotation: &UnitQuaternion<f32>, normal: &Vector3<f32>, kmh_before: f32) -> Option<CrashReport> {
    let local = rotation.inverse_transform_vector(normal);
    classify_local(&local).map(|face| CrashReport { face, kmh: kmh_before })
}
