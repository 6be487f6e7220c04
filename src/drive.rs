// ==============================================================================
// drive.rs — DRIVE / TRACTION MODEL
// ------------------------------------------------------------------------------
// Render tick (render):
//   target drive force   gear top_speed on throttle, -brake_speed on reverse
//                        input, 0 when coasting (stop dead at 0 km/h)
//   current_speed        SmoothStep toward target at speed_increase*eff*dt
//   steering request     curve(km/h) * steering * dir * amount
//                        amount = |h|, drift force while drifting, or the
//                        residual drift force while it is still > 1
//   current_rotate       lerp toward the request at steer_follow_rate*dt
//
// Fixed tick (fixed):
//   grounded             centre probe along chassis down (1.5 m)
//   body profile         mass on `grounded`, drags on `grounded_on_wheel`
//   ground frame         up lerps toward the surface normal under the car
//   grounded             yaw torque about ground up + drive force at force_point
//   always               lateral slip damping, -v_x * traction (chassis frame)
//   airborne             extra downward force
// ==============================================================================

use nalgebra::Vector3;

use crate::body::{BodyCommand, BodyProfile, ChassisKinematics, v3};
use crate::config::{DriveConfig, FIRST, NEUTRAL, TuningProfile};
use crate::input::ControlFrame;
use crate::math::{lerp, sign, smooth_step};
use crate::terrain::TerrainProbe;

/// Residual drift force above this keeps steering the car after an exit.
const POST_DRIFT_ASSIST_FORCE: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct DriveModel {
    current_speed: f32,   // drive force magnitude, smoothed
    rotate_request: f32,  // steering torque asked for this tick
    current_rotate: f32,  // steering torque applied, smoothed
    ground_up: Vector3<f32>,
    grounded: bool,
    braking: bool,
    kmh_previous: f32,
}

impl Default for DriveModel {
    fn default() -> Self {
        Self {
            current_speed: 0.0,
            rotate_request: 0.0,
            current_rotate: 0.0,
            ground_up: Vector3::y(),
            grounded: false,
            braking: false,
            kmh_previous: 0.0,
        }
    }
}

/// Read-only view of the systems the render tick depends on.
#[derive(Clone, Copy, Debug)]
pub struct DriveInputs {
    pub gear: usize,
    pub gear_efficiency: f32,
    pub drifting: bool,
    pub drift_force: f32,
}

impl DriveModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn current_rotate(&self) -> f32 {
        self.current_rotate
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn braking(&self) -> bool {
        self.braking
    }

    pub fn ground_up(&self) -> Vector3<f32> {
        self.ground_up
    }

    /// km/h sampled at the last fixed tick, i.e. before any contact resolved
    /// in the step that follows it.
    pub fn kmh_previous(&self) -> f32 {
        self.kmh_previous
    }

    /// Queue a steering request; consumed by the next render tick.
    pub fn steer(&mut self, direction: f32, amount: f32, kmh: f32, config: &DriveConfig) {
        self.rotate_request = config.steer_curve.evaluate(kmh) * config.steering * direction * amount;
    }

    pub fn render(
        &mut self,
        frame: &ControlFrame,
        kin: &ChassisKinematics,
        inputs: DriveInputs,
        tuning: &TuningProfile,
        dt: f32,
        out: &mut Vec<BodyCommand>,
    ) {
        let kmh = kin.kmh();
        let local = kin.local_velocity();
        let reversing = local.z < 0.0;
        let gear = tuning.transmission.gears.get(inputs.gear);
        let in_neutral = inputs.gear == NEUTRAL;

        let target = if frame.vertical > 0.0 && !in_neutral {
            gear.top_speed
        } else if frame.vertical < 0.0 && !in_neutral {
            -tuning.drive.brake_speed
        } else {
            if kmh == 0.0 {
                out.push(BodyCommand::StopHorizontal);
            }
            0.0
        };

        if frame.horizontal != 0.0 {
            let mut direction = sign(frame.horizontal);
            if reversing {
                direction = -direction;
            }
            let amount = if inputs.drifting || inputs.drift_force > POST_DRIFT_ASSIST_FORCE {
                inputs.drift_force
            } else {
                frame.horizontal.abs()
            };
            if !reversing || frame.vertical < 0.0 {
                self.steer(direction, amount, kmh, &tuning.drive);
            }
        }

        let efficiency = if in_neutral { 1.0 } else { inputs.gear_efficiency };
        self.current_speed = smooth_step(self.current_speed, target, gear.speed_increase * efficiency * dt);
        self.current_rotate = lerp(self.current_rotate, self.rotate_request, dt * tuning.drive.steer_follow_rate);
        self.rotate_request = 0.0;

        let moving = kin.speed() > 0.0;
        self.braking = (frame.vertical < 0.0 && moving && local.z > 0.0)
            || (frame.vertical > 0.0 && moving && local.z < 0.0);
        if frame.vertical < 0.0 && inputs.gear == FIRST && kmh == 0.0 {
            self.braking = false;
        }
    }

    /// Fixed tick. `grounded_on_wheel` comes from the previous suspension pass.
    pub fn fixed(
        &mut self,
        kin: &ChassisKinematics,
        probe: &dyn TerrainProbe,
        grounded_on_wheel: bool,
        tuning: &TuningProfile,
        dt: f32,
        out: &mut Vec<BodyCommand>,
    ) {
        let drive = &tuning.drive;
        let chassis = &tuning.chassis;

        self.grounded = probe.ground_within(kin.position, -kin.up(), drive.ground_probe_distance);

        out.push(BodyCommand::Profile(BodyProfile {
            mass: if self.grounded { chassis.mass } else { drive.in_air_mass },
            drag: if grounded_on_wheel { chassis.drag } else { drive.in_air_drag },
            angular_drag: if grounded_on_wheel { chassis.angular_drag } else { drive.in_air_angular_drag },
        }));

        self.kmh_previous = kin.kmh();

        let surface_up = probe
            .cast_ray(kin.position, -Vector3::y(), drive.surface_probe_distance)
            .map(|hit| hit.normal)
            .unwrap_or_else(Vector3::y);
        let t = (dt * drive.normal_follow_rate).clamp(0.0, 1.0);
        self.ground_up = self.ground_up.lerp(&surface_up, t).try_normalize(1e-6).unwrap_or_else(Vector3::y);

        if self.grounded {
            out.push(BodyCommand::Torque {
                // positive request steers right: negative rotation about up
                torque: -self.ground_up * self.current_rotate,
            });
            out.push(BodyCommand::ForceAtPoint {
                force: self.ground_forward(kin) * self.current_speed,
                point: kin.to_world(&v3(chassis.force_point)),
            });
        }

        let lateral = kin.local_velocity().x;
        out.push(BodyCommand::Force {
            force: kin.rotation * Vector3::new(-lateral * drive.traction, 0.0, 0.0),
        });

        if !self.grounded {
            out.push(BodyCommand::Force {
                force: Vector3::new(0.0, -drive.in_air_gravity_force, 0.0),
            });
        }
    }

    /// Chassis forward flattened onto the ground plane.
    fn ground_forward(&self, kin: &ChassisKinematics) -> Vector3<f32> {
        let forward = kin.forward();
        let up = self.ground_up;
        (forward - up * forward.dot(&up)).try_normalize(1e-6).unwrap_or(forward)
    }
}
