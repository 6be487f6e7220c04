// ==============================================================================
// body.rs — CHASSIS KINEMATICS + BODY COMMANDS (CORE <-> HOST BOUNDARY)
// ------------------------------------------------------------------------------
// The core never touches a physics engine. The host reads the chassis pose and
// velocities into ChassisKinematics, and after each fixed tick applies the
// BodyCommands the core queued (forces, torques, profile swaps, realignment).
//
// Local frame (right-handed, same as rapier): +Y up, +Z forward, so the car's
// right is -X. A yaw to the right is a negative rotation about +Y.
// ==============================================================================

use nalgebra::{Point3, UnitQuaternion, Vector3};

#[inline]
pub fn v3(a: [f32; 3]) -> Vector3<f32> {
    Vector3::new(a[0], a[1], a[2])
}

#[inline]
pub fn arr3(v: &Vector3<f32>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

#[inline]
pub fn parr3(p: &Point3<f32>) -> [f32; 3] {
    [p.x, p.y, p.z]
}

/// Simulated speed unit: |v| in m/s -> whole km/h.
#[inline]
pub fn kmh_from_speed(speed: f32) -> f32 {
    (speed * 3.6).round()
}

#[derive(Clone, Copy, Debug)]
pub struct ChassisKinematics {
    pub position: Point3<f32>,        // world
    pub rotation: UnitQuaternion<f32>, // world
    pub linvel: Vector3<f32>,         // m/s, world
    pub angvel: Vector3<f32>,         // rad/s, world
}

impl ChassisKinematics {
    pub fn at_rest(position: Point3<f32>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
            linvel: Vector3::zeros(),
            angvel: Vector3::zeros(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * Vector3::z()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.rotation * -Vector3::x()
    }

    /// Velocity expressed in the chassis frame (z = forward component).
    pub fn local_velocity(&self) -> Vector3<f32> {
        self.rotation.inverse_transform_vector(&self.linvel)
    }

    pub fn speed(&self) -> f32 {
        self.linvel.magnitude()
    }

    pub fn kmh(&self) -> f32 {
        kmh_from_speed(self.speed())
    }

    pub fn to_world(&self, local: &Vector3<f32>) -> Point3<f32> {
        self.position + self.rotation * local
    }
}

/// Mass / drag set the host should give the chassis body this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyProfile {
    pub mass: f32,
    pub drag: f32,
    pub angular_drag: f32,
}

/// One instruction for the host's rigid body. Forces are per-second
/// quantities; the host integrates them over its fixed dt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyCommand {
    Force { force: Vector3<f32> },
    ForceAtPoint { force: Vector3<f32>, point: Point3<f32> },
    Torque { torque: Vector3<f32> },
    Profile(BodyProfile),
    /// Zero the horizontal velocity, keep the vertical component.
    StopHorizontal,
    /// Snap the body rotation (used after a hard drift collision).
    Realign { rotation: UnitQuaternion<f32> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kmh_rounds_to_whole_units() {
        assert_eq!(kmh_from_speed(0.0), 0.0);
        assert_eq!(kmh_from_speed(0.1), 0.0); // 0.36 km/h
        assert_eq!(kmh_from_speed(11.12), 40.0);
    }

    #[test]
    fn local_velocity_follows_yaw() {
        let mut kin = ChassisKinematics::at_rest(Point3::origin());
        kin.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2);
        // nose now points along world +X
        assert!((kin.forward() - Vector3::x()).magnitude() < 1e-5);
        kin.linvel = Vector3::new(5.0, 0.0, 0.0);
        let local = kin.local_velocity();
        assert!((local.z - 5.0).abs() < 1e-4);
        assert!(local.x.abs() < 1e-4);
    }

    #[test]
    fn right_is_forward_cross_up() {
        let mut kin = ChassisKinematics::at_rest(Point3::origin());
        assert!((kin.right() + Vector3::x()).magnitude() < 1e-6);
        kin.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7);
        let expected = kin.forward().cross(&kin.up());
        assert!((kin.right() - expected).magnitude() < 1e-5);
    }
}
