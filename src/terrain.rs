// ==============================================================================
// terrain.rs — TERRAIN PROBE INTERFACE
// ------------------------------------------------------------------------------
// Narrow ray-query capability supplied by the surrounding simulation layer.
// The suspension sampler and the drive model's ground checks only go through
// TerrainProbe, so the vehicle core carries no physics-engine dependency.
//
// Implementations:
// - physics::RapierProbe  — query pipeline of the rapier track world
// - FlatGround            — analytic plane with a road strip (headless / tests)
// - NoTerrain             — every probe misses
// ==============================================================================

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Surface classification carried by whatever the probe hits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceTag(pub u32);

impl SurfaceTag {
    pub const GROUND: SurfaceTag = SurfaceTag(0);
    pub const WALL: SurfaceTag = SurfaceTag(12);
    pub const ROAD: SurfaceTag = SurfaceTag(15);
}

#[derive(Clone, Copy, Debug)]
pub struct ProbeHit {
    pub distance: f32,          // along the ray
    pub point: Point3<f32>,     // world
    pub normal: Vector3<f32>,   // world, unit
    pub surface: SurfaceTag,
}

pub trait TerrainProbe {
    /// Cast from `origin` along unit `dir`, up to `max_distance`.
    fn cast_ray(&self, origin: Point3<f32>, dir: Vector3<f32>, max_distance: f32) -> Option<ProbeHit>;

    /// Ground-proximity query.
    fn ground_within(&self, origin: Point3<f32>, dir: Vector3<f32>, distance: f32) -> bool {
        self.cast_ray(origin, dir, distance).is_some()
    }
}

/// Probe that never hits anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTerrain;

impl TerrainProbe for NoTerrain {
    fn cast_ray(&self, _origin: Point3<f32>, _dir: Vector3<f32>, _max_distance: f32) -> Option<ProbeHit> {
        None
    }
}

/// Horizontal plane at `height`; the strip |x| <= road_half_width is road.
#[derive(Clone, Copy, Debug)]
pub struct FlatGround {
    pub height: f32,
    pub road_half_width: f32,
    pub road: SurfaceTag,
    pub verge: SurfaceTag,
}

impl Default for FlatGround {
    fn default() -> Self {
        Self {
            height: 0.0,
            road_half_width: 6.0,
            road: SurfaceTag::ROAD,
            verge: SurfaceTag::GROUND,
        }
    }
}

impl FlatGround {
    pub fn all_road(height: f32) -> Self {
        Self {
            height,
            road_half_width: f32::INFINITY,
            ..Self::default()
        }
    }
}

impl TerrainProbe for FlatGround {
    fn cast_ray(&self, origin: Point3<f32>, dir: Vector3<f32>, max_distance: f32) -> Option<ProbeHit> {
        // only downward rays from above the plane can hit it
        if dir.y >= -1e-6 || origin.y < self.height {
            return None;
        }
        let distance = (origin.y - self.height) / -dir.y;
        if distance > max_distance {
            return None;
        }
        let point = origin + dir * distance;
        let surface = if point.x.abs() <= self.road_half_width { self.road } else { self.verge };

        Some(ProbeHit {
            distance,
            point,
            normal: Vector3::y(),
            surface,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_ground_hits_below_within_range() {
        let ground = FlatGround::default();
        let hit = ground
            .cast_ray(Point3::new(1.0, 0.4, 3.0), -Vector3::y(), 0.6)
            .expect("hit");
        assert!((hit.distance - 0.4).abs() < 1e-6);
        assert_eq!(hit.surface, SurfaceTag::ROAD);
        assert!(hit.point.y.abs() < 1e-6);
    }

    #[test]
    fn flat_ground_misses_out_of_range_and_upward() {
        let ground = FlatGround::default();
        assert!(ground.cast_ray(Point3::new(0.0, 1.0, 0.0), -Vector3::y(), 0.6).is_none());
        assert!(ground.cast_ray(Point3::new(0.0, 0.2, 0.0), Vector3::y(), 5.0).is_none());
        assert!(!NoTerrain.ground_within(Point3::origin(), -Vector3::y(), 10.0));
    }

    #[test]
    fn verge_is_not_road() {
        let ground = FlatGround::default();
        let hit = ground
            .cast_ray(Point3::new(8.0, 0.3, 0.0), -Vector3::y(), 1.0)
            .expect("hit");
        assert_eq!(hit.surface, SurfaceTag::GROUND);
    }
}
