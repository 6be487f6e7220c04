// ==============================================================================
// physics.rs — RAPIER TRACK WORLD (HOST SIDE OF THE CORE)
// ------------------------------------------------------------------------------
// Owns the rapier pipeline and a straight test track:
// - ground slab   tagged GROUND, top at y = 0
// - road strip    tagged ROAD, 1 cm proud of the ground
// - side walls + end wall, tagged WALL
//
// Surface tags ride on collider.user_data. RapierProbe exposes the query
// pipeline as a TerrainProbe (chassis excluded). BodyCommands from the core are
// integrated as impulses over the fixed dt. New chassis contacts are reported
// once, on the tick they begin.
// ==============================================================================

use rapier3d::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::body::{BodyCommand, ChassisKinematics, v3};
use crate::collision::ImpactContact;
use crate::config::ChassisConfig;
use crate::terrain::{ProbeHit, SurfaceTag, TerrainProbe};

const GROUP_WORLD: Group = Group::GROUP_1;
const GROUP_CHASSIS: Group = Group::GROUP_2;

const RESET_LIMIT: f32 = 5_000.0; // m from origin

/// Straight track dimensions, metres.
#[derive(Clone, Copy, Debug)]
pub struct TrackLayout {
    pub road_half_width: f32,
    pub wall_offset: f32, // |x| of the side walls' inner faces
    pub length: f32,      // road runs z = -20 .. length
    pub wall_height: f32,
}

impl Default for TrackLayout {
    fn default() -> Self {
        Self {
            road_half_width: 6.0,
            wall_offset: 14.0,
            length: 400.0,
            wall_height: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Chassis {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    mass: f32,
    spawn: Point<Real>,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,
    chassis: Option<Chassis>,
    touching: HashSet<ColliderHandle>, // colliders in contact with the chassis last tick
}

fn tag(surface: SurfaceTag) -> u128 {
    surface.0 as u128
}

fn world_groups() -> InteractionGroups {
    InteractionGroups::new(GROUP_WORLD, GROUP_CHASSIS)
}

impl PhysicsWorld {
    pub fn new(layout: &TrackLayout) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let track = bodies.insert(RigidBodyBuilder::fixed().build());
        let half_len = (layout.length + 20.0) * 0.5;
        let mid_z = layout.length * 0.5 - 10.0;

        // ground slab, top face at y = 0
        let ground = ColliderBuilder::cuboid(layout.wall_offset + 50.0, 0.5, half_len + 50.0)
            .translation(vector![0.0, -0.5, mid_z])
            .collision_groups(world_groups())
            .user_data(tag(SurfaceTag::GROUND))
            .friction(0.6)
            .build();
        colliders.insert_with_parent(ground, track, &mut bodies);

        // road strip, top face at y = 0.01
        let road = ColliderBuilder::cuboid(layout.road_half_width, 0.05, half_len)
            .translation(vector![0.0, -0.04, mid_z])
            .collision_groups(world_groups())
            .user_data(tag(SurfaceTag::ROAD))
            .friction(0.6)
            .build();
        colliders.insert_with_parent(road, track, &mut bodies);

        let wall_hy = layout.wall_height * 0.5;
        for side in [-1.0_f32, 1.0] {
            let wall = ColliderBuilder::cuboid(0.5, wall_hy, half_len)
                .translation(vector![side * (layout.wall_offset + 0.5), wall_hy, mid_z])
                .collision_groups(world_groups())
                .user_data(tag(SurfaceTag::WALL))
                .friction(0.2)
                .restitution(0.1)
                .build();
            colliders.insert_with_parent(wall, track, &mut bodies);
        }
        let end_wall = ColliderBuilder::cuboid(layout.wall_offset + 1.0, wall_hy, 0.5)
            .translation(vector![0.0, wall_hy, layout.length + 0.5])
            .collision_groups(world_groups())
            .user_data(tag(SurfaceTag::WALL))
            .friction(0.2)
            .restitution(0.1)
            .build();
        colliders.insert_with_parent(end_wall, track, &mut bodies);

        let mut query_pipeline = QueryPipeline::new();
        query_pipeline.update(&colliders);

        info!(
            bodies = bodies.len(),
            colliders = colliders.len(),
            length = layout.length,
            "track world built"
        );

        Self {
            gravity: vector![0.0, -9.81, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline,
            chassis: None,
            touching: HashSet::new(),
        }
    }

    /// Dynamic box chassis. Mass and centre of mass come from the tuning
    /// profile; friction is zero so lateral grip is the core's traction force.
    pub fn spawn_chassis(&mut self, position: Point<Real>, config: &ChassisConfig) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(position.coords)
            .linear_damping(config.drag)
            .angular_damping(config.angular_drag)
            .ccd_enabled(true)
            .build();

        let [sx, sy, sz] = config.box_size;
        let (hx, hy, hz) = (sx * 0.5, sy * 0.5, sz * 0.5);
        let m = config.mass;
        let inertia = vector![
            m / 3.0 * (hy * hy + hz * hz),
            m / 3.0 * (hx * hx + hz * hz),
            m / 3.0 * (hx * hx + hy * hy)
        ];
        let com = Point::from(v3(config.center_of_mass) - v3(config.box_center));

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(v3(config.box_center))
            .mass_properties(MassProperties::new(com, m, inertia))
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_WORLD))
            .friction(0.0)
            .restitution(0.0)
            .build();

        let body = self.bodies.insert(rb);
        let collider = self.colliders.insert_with_parent(collider, body, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);

        self.chassis = Some(Chassis {
            body,
            collider,
            mass: m,
            spawn: position,
        });
        info!(?position, mass = m, "chassis spawned");
        body
    }

    pub fn kinematics(&self) -> Option<ChassisKinematics> {
        let chassis = self.chassis?;
        let body = self.bodies.get(chassis.body)?;
        Some(ChassisKinematics {
            position: Point::from(*body.translation()),
            rotation: *body.rotation(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
        })
    }

    pub fn probe(&self) -> RapierProbe<'_> {
        RapierProbe {
            bodies: &self.bodies,
            colliders: &self.colliders,
            query_pipeline: &self.query_pipeline,
            exclude: self.chassis.map(|c| c.body),
        }
    }

    /// Integrate the core's commands over `dt` on the chassis body.
    pub fn apply(&mut self, commands: &[BodyCommand], dt: Real) {
        let Some(chassis) = self.chassis else { return };
        let Some(body) = self.bodies.get_mut(chassis.body) else { return };

        for command in commands {
            match *command {
                BodyCommand::Force { force } => body.apply_impulse(force * dt, true),
                BodyCommand::ForceAtPoint { force, point } => body.apply_impulse_at_point(force * dt, point, true),
                BodyCommand::Torque { torque } => body.apply_torque_impulse(torque * dt, true),
                BodyCommand::Profile(profile) => {
                    body.set_additional_mass((profile.mass - chassis.mass).max(0.0), true);
                    body.set_linear_damping(profile.drag);
                    body.set_angular_damping(profile.angular_drag);
                }
                BodyCommand::StopHorizontal => {
                    let v = *body.linvel();
                    body.set_linvel(vector![0.0, v.y, 0.0], true);
                }
                BodyCommand::Realign { rotation } => body.set_rotation(rotation, true),
            }
        }
    }

    pub fn step(&mut self, dt: Real) {
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // a body that left the world or went non-finite goes back to spawn
        let Some(chassis) = self.chassis else { return };
        let Some(body) = self.bodies.get_mut(chassis.body) else { return };
        let pos = *body.translation();
        let bad = !pos.iter().all(|c| c.is_finite())
            || pos.iter().any(|c| c.abs() > RESET_LIMIT)
            || !body.linvel().iter().all(|c| c.is_finite());
        if bad {
            body.set_translation(chassis.spawn.coords, true);
            body.set_rotation(Rotation::identity(), true);
            body.set_linvel(Vector::zeros(), true);
            body.set_angvel(Vector::zeros(), true);
            warn!(?pos, spawn = ?chassis.spawn, "chassis state non-finite or out of bounds, reset");
        }
    }

    /// Contacts the chassis started this tick, normals pointing obstacle -> car.
    pub fn new_contacts(&mut self) -> Vec<ImpactContact> {
        let Some(chassis) = self.chassis else { return Vec::new() };
        let mut now = HashSet::new();
        let mut fresh = Vec::new();

        for pair in self.narrow_phase.contact_pairs_with(chassis.collider) {
            if !pair.has_any_active_contact {
                continue;
            }
            // manifold normals point from collider1 toward collider2
            let (other, flip) = if pair.collider1 == chassis.collider {
                (pair.collider2, -1.0_f32)
            } else {
                (pair.collider1, 1.0)
            };
            now.insert(other);
            if self.touching.contains(&other) {
                continue;
            }
            let Some(manifold) = pair.manifolds.iter().find(|m| !m.points.is_empty()) else {
                continue;
            };
            let surface = self
                .colliders
                .get(other)
                .map(|c| SurfaceTag(c.user_data as u32))
                .unwrap_or(SurfaceTag::GROUND);
            fresh.push(ImpactContact {
                normal: manifold.data.normal * flip,
                surface,
            });
        }

        self.touching = now;
        fresh
    }
}

/// Query-pipeline view implementing the core's TerrainProbe.
pub struct RapierProbe<'a> {
    bodies: &'a RigidBodySet,
    colliders: &'a ColliderSet,
    query_pipeline: &'a QueryPipeline,
    exclude: Option<RigidBodyHandle>,
}

impl TerrainProbe for RapierProbe<'_> {
    fn cast_ray(&self, origin: Point<Real>, dir: Vector<Real>, max_distance: Real) -> Option<ProbeHit> {
        let dir = dir.try_normalize(1e-6)?;
        let ray = Ray::new(origin, dir);
        let mut filter = QueryFilter::default().groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_WORLD));
        if let Some(body) = self.exclude {
            filter = filter.exclude_rigid_body(body);
        }

        let (handle, hit) =
            self.query_pipeline
                .cast_ray_and_get_normal(self.bodies, self.colliders, &ray, max_distance, true, filter)?;
        let surface = self
            .colliders
            .get(handle)
            .map(|c| SurfaceTag(c.user_data as u32))
            .unwrap_or(SurfaceTag::GROUND);

        Some(ProbeHit {
            distance: hit.time_of_impact,
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            surface,
        })
    }
}
