// ==============================================================================
// suspension.rs — PER-CORNER RAYCAST SUSPENSION SAMPLER
// ------------------------------------------------------------------------------
// Runs once per fixed tick. For each of the 4 bottom corners of the chassis box
// it casts a probe along the chassis down axis and produces a SuspensionSample:
// - compression_ratio = |hit_distance / max_distance - 1|  (closer => higher)
// - impact point / normal of the hit
// - on_road: the hit surface carries the road tag
//
// Every hit pushes an upward force (chassis up * upward_force * ratio) at the
// corner. A miss synthesises a sample at full extension instead of failing.
//
// all_wheels_on_road is true iff every corner hit AND is road-tagged.
// ==============================================================================

use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::fmt;

use crate::body::{BodyCommand, ChassisKinematics, v3};
use crate::config::{ChassisConfig, SuspensionConfig};
use crate::terrain::{SurfaceTag, TerrainProbe};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum CornerId { FL, FR, RL, RR }

impl CornerId {
    pub const ALL: [CornerId; 4] = [CornerId::FL, CornerId::FR, CornerId::RL, CornerId::RR];

    pub fn index(&self) -> usize {
        match self {
            CornerId::FL => 0,
            CornerId::FR => 1,
            CornerId::RL => 2,
            CornerId::RR => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CornerId::FL => "FL",
            CornerId::FR => "FR",
            CornerId::RL => "RL",
            CornerId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, CornerId::FL | CornerId::FR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, CornerId::FL | CornerId::RL)
    }
}

impl fmt::Display for CornerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SuspensionSample {
    pub corner: CornerId,
    pub hit: bool,
    pub compression_ratio: f32,       // 0..1
    pub origin: Point3<f32>,          // probe start (world)
    pub impact_point: Point3<f32>,    // world
    pub impact_normal: Vector3<f32>,  // world
    pub on_road: bool,
}

impl SuspensionSample {
    fn idle(corner: CornerId) -> Self {
        Self {
            corner,
            hit: false,
            compression_ratio: 0.0,
            origin: Point3::origin(),
            impact_point: Point3::origin(),
            impact_normal: Vector3::y(),
            on_road: false,
        }
    }
}

/// Normalised compression for a hit at `distance` along a probe of `max_distance`.
pub fn compression_ratio(distance: f32, max_distance: f32) -> f32 {
    if max_distance <= 0.0 {
        return 0.0;
    }
    ((distance / max_distance) - 1.0).abs().clamp(0.0, 1.0)
}

pub struct SuspensionSampler {
    anchors: [Vector3<f32>; 4], // chassis local
    samples: [SuspensionSample; 4],
    all_on_road: bool,
}

impl SuspensionSampler {
    /// Corner anchors sit on the bottom face of the chassis box, lifted by
    /// `corner_lift` so a box resting on the ground still sees contact.
    pub fn new(chassis: &ChassisConfig, suspension: &SuspensionConfig) -> Self {
        let center = v3(chassis.box_center);
        let [sx, sy, sz] = chassis.box_size;
        let lift = suspension.corner_lift;

        let anchor = |corner: CornerId| {
            let x = if corner.is_left() { sx } else { -sx }; // right is -X
            let z = if corner.is_front() { sz } else { -sz };
            center + Vector3::new(x, -sy + lift, z) * 0.5
        };

        Self {
            anchors: CornerId::ALL.map(anchor),
            samples: CornerId::ALL.map(SuspensionSample::idle),
            all_on_road: false,
        }
    }

    pub fn anchor(&self, corner: CornerId) -> Vector3<f32> {
        self.anchors[corner.index()]
    }

    pub fn samples(&self) -> &[SuspensionSample; 4] {
        &self.samples
    }

    pub fn all_wheels_on_road(&self) -> bool {
        self.all_on_road
    }

    /// Any corner currently touching something.
    pub fn grounded_on_wheel(&self) -> bool {
        self.samples.iter().any(|s| s.compression_ratio != 0.0)
    }

    pub fn sample(
        &mut self,
        kin: &ChassisKinematics,
        probe: &dyn TerrainProbe,
        config: &SuspensionConfig,
        road: SurfaceTag,
        out: &mut Vec<BodyCommand>,
    ) {
        let up = kin.up();
        let down = -up;
        let max_dist = config.max_distance;
        let mut all_on_road = true;

        for corner in CornerId::ALL {
            let origin = kin.to_world(&self.anchors[corner.index()]);

            let sample = match probe.cast_ray(origin, down, max_dist) {
                Some(hit) => {
                    let ratio = compression_ratio(hit.distance, max_dist);
                    let on_road = hit.surface == road;
                    if !on_road {
                        all_on_road = false;
                    }

                    out.push(BodyCommand::ForceAtPoint {
                        force: up * (config.upward_force * ratio),
                        point: origin,
                    });

                    SuspensionSample {
                        corner,
                        hit: true,
                        compression_ratio: ratio,
                        origin,
                        impact_point: hit.point,
                        impact_normal: hit.normal,
                        on_road,
                    }
                }
                None => {
                    all_on_road = false;
                    SuspensionSample {
                        corner,
                        hit: false,
                        compression_ratio: 0.0,
                        origin,
                        impact_point: origin + down * max_dist,
                        impact_normal: up,
                        on_road: false,
                    }
                }
            };

            self.samples[corner.index()] = sample;
        }

        self.all_on_road = all_on_road;
    }
}
