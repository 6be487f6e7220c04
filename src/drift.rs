// ==============================================================================
// drift.rs — DRIFT STATE MACHINE
// ------------------------------------------------------------------------------
// Idle <-> Drifting. Entry needs all of:
//   not drifting, drift button edge-down, horizontal != 0,
//   local forward velocity > 0, km/h >= min_kmh
//
// While drifting (per render tick):
// - counter-steer (input opposing direction) burns counter_steer_allowed;
//   reaching 0 forces an exit
// - matching / zero input fills counter_steer_unused; past 0.5 s the allowed
//   budget refills (stops tap-tap-tap from dodging the timeout forever)
// - force: +/- change_force*dt by input, +0.5*change_force*dt bias, clamped
// - visual yaw follows map(force, min..max -> 0..45°) * direction
// - exit on button release or km/h < min_kmh
//
// Outside a drift the force bleeds linearly toward 0 and the yaw relaxes.
// A hard collision exits from outside (force_exit) and hands back a yaw to
// fold into the body rotation so the chassis does not visibly snap.
// ==============================================================================

use serde::Serialize;
use tracing::info;

use crate::config::DriftConfig;
use crate::events::CoreEvent;
use crate::input::ControlFrame;
use crate::math::{map_range, sign, smooth_damp};

const UNUSED_COUNTER_STEER_RESET: f32 = 0.5; // s
const DRIFT_FORCE_BIAS: f32 = 0.5;           // * change_force
const YAW_SMOOTH_DRIFTING: f32 = 5.0;        // * dt
const YAW_SMOOTH_RELAXING: f32 = 30.0;       // * dt

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftExit {
    Released,
    TooSlow,
    CounterSteerTimeout,
    HardCollision,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveDrift {
    pub direction: f32,             // +1 right, -1 left
    pub counter_steer_allowed: f32, // s left before forced exit
    pub counter_steer_unused: f32,  // s of non-opposing input
}

#[derive(Clone, Debug, Default)]
pub struct DriftMachine {
    active: Option<ActiveDrift>,
    force: f32,
    visual_yaw: f32, // degrees about chassis up
    yaw_velocity: f32,
    last_exit: Option<DriftExit>,
    last_direction: f32,
}

impl DriftMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drifting(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&ActiveDrift> {
        self.active.as_ref()
    }

    /// Direction of the current drift, 0 when idle.
    pub fn direction(&self) -> f32 {
        self.active.map(|a| a.direction).unwrap_or(0.0)
    }

    /// Current drift force. Residual (decaying) force after an exit.
    pub fn force(&self) -> f32 {
        self.force
    }

    pub fn visual_yaw_deg(&self) -> f32 {
        self.visual_yaw
    }

    pub fn last_exit(&self) -> Option<DriftExit> {
        self.last_exit
    }

    /// Last finished drift did not end against a wall.
    pub fn last_successful(&self) -> bool {
        matches!(self.last_exit, Some(reason) if reason != DriftExit::HardCollision)
    }

    /// Whether a drift may start this tick.
    pub fn can_enter(&self, frame: &ControlFrame, forward_speed: f32, kmh: f32, config: &DriftConfig) -> bool {
        self.active.is_none()
            && frame.drift_pressed
            && frame.horizontal != 0.0
            && forward_speed > 0.0
            && kmh >= config.min_kmh
    }

    /// Render tick. `forward_speed` is the local forward (z) velocity.
    pub fn update(
        &mut self,
        frame: &ControlFrame,
        forward_speed: f32,
        kmh: f32,
        dt: f32,
        config: &DriftConfig,
        events: &mut Vec<CoreEvent>,
    ) {
        if self.can_enter(frame, forward_speed, kmh, config) {
            self.enter(frame.horizontal, config, events);
            return;
        }

        let Some(mut drift) = self.active else {
            self.relax(dt, config);
            return;
        };

        let h = frame.horizontal;
        let opposing = h != 0.0 && sign(h) != drift.direction;

        if opposing {
            drift.counter_steer_allowed -= dt;
            drift.counter_steer_unused = 0.0;
            if drift.counter_steer_allowed <= 0.0 {
                self.active = Some(drift);
                self.exit(DriftExit::CounterSteerTimeout, events);
                return;
            }
        } else {
            drift.counter_steer_unused += dt;
            if drift.counter_steer_unused > UNUSED_COUNTER_STEER_RESET {
                drift.counter_steer_allowed = config.counter_steer_too_long;
                drift.counter_steer_unused = 0.0;
            }
        }
        self.active = Some(drift);

        let step = config.change_force * dt;
        if h != 0.0 {
            self.force += if opposing { -step } else { step };
        }
        self.force += step * DRIFT_FORCE_BIAS;
        self.force = self.force.clamp(config.min_force, config.max_force);

        let target = map_range(self.force, config.min_force, config.max_force, 0.0, config.max_visual_yaw_deg);
        self.visual_yaw = smooth_damp(
            self.visual_yaw,
            target * drift.direction,
            &mut self.yaw_velocity,
            YAW_SMOOTH_DRIFTING * dt,
            dt,
        );

        if !frame.drift_held {
            self.exit(DriftExit::Released, events);
        } else if kmh < config.min_kmh {
            self.exit(DriftExit::TooSlow, events);
        }
    }

    /// Hard collision while drifting. Returns the visual yaw (degrees) the
    /// host should fold into the body rotation, or `None` if idle.
    pub fn force_exit(&mut self, events: &mut Vec<CoreEvent>) -> Option<f32> {
        self.active?;
        let yaw = self.visual_yaw;
        self.exit(DriftExit::HardCollision, events);
        self.visual_yaw = 0.0;
        self.yaw_velocity = 0.0;
        Some(yaw)
    }

    fn enter(&mut self, horizontal: f32, config: &DriftConfig, events: &mut Vec<CoreEvent>) {
        let direction = sign(horizontal);
        self.active = Some(ActiveDrift {
            direction,
            counter_steer_allowed: config.counter_steer_too_long,
            counter_steer_unused: 0.0,
        });
        self.force = 0.0;
        self.last_exit = None;
        self.last_direction = direction;
        info!(direction, "drift entered");
        events.push(CoreEvent::DriftStarted { direction });
    }

    fn exit(&mut self, reason: DriftExit, events: &mut Vec<CoreEvent>) {
        if self.active.take().is_none() {
            return;
        }
        self.last_exit = Some(reason);
        let successful = reason != DriftExit::HardCollision;
        info!(?reason, successful, force = self.force, direction = self.last_direction, "drift exited");
        events.push(CoreEvent::DriftEnded { reason, successful });
    }

    fn relax(&mut self, dt: f32, config: &DriftConfig) {
        if self.force > 0.0 {
            self.force = (self.force - config.exit_reducer * dt).max(0.0);
        }
        self.visual_yaw = smooth_damp(self.visual_yaw, 0.0, &mut self.yaw_velocity, YAW_SMOOTH_RELAXING * dt, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.25;

    fn cfg() -> DriftConfig {
        DriftConfig::default()
    }

    fn press(h: f32) -> ControlFrame {
        ControlFrame {
            horizontal: h,
            drift_pressed: true,
            drift_held: true,
            ..ControlFrame::default()
        }
    }

    fn hold(h: f32) -> ControlFrame {
        ControlFrame {
            horizontal: h,
            drift_held: true,
            ..ControlFrame::default()
        }
    }

    fn entered() -> (DriftMachine, Vec<CoreEvent>) {
        let mut d = DriftMachine::new();
        let mut events = Vec::new();
        d.update(&press(1.0), 10.0, 40.0, DT, &cfg(), &mut events);
        assert!(d.is_drifting());
        (d, events)
    }

    #[test]
    fn entry_sets_direction_and_zero_force() {
        let (d, events) = entered();
        assert_eq!(d.direction(), 1.0);
        assert_eq!(d.force(), 0.0);
        let a = d.active().expect("active");
        assert_eq!(a.counter_steer_allowed, cfg().counter_steer_too_long);
        assert_eq!(a.counter_steer_unused, 0.0);
        assert!(matches!(events.as_slice(), [CoreEvent::DriftStarted { direction }] if *direction == 1.0));
    }

    #[test]
    fn entry_blocked_by_each_condition() {
        let config = cfg();
        let base = press(-1.0);
        let d = DriftMachine::new();
        assert!(d.can_enter(&base, 5.0, 40.0, &config));

        // already drifting
        let (active, _) = entered();
        assert!(!active.can_enter(&base, 5.0, 40.0, &config));
        // no edge this tick
        assert!(!d.can_enter(&hold(-1.0), 5.0, 40.0, &config));
        // no steering
        assert!(!d.can_enter(&press(0.0), 5.0, 40.0, &config));
        // rolling backwards / standing
        assert!(!d.can_enter(&base, -1.0, 40.0, &config));
        assert!(!d.can_enter(&base, 0.0, 40.0, &config));
        // too slow
        assert!(!d.can_enter(&base, 5.0, config.min_kmh - 1.0, &config));
        assert!(d.can_enter(&base, 5.0, config.min_kmh, &config));
    }

    #[test]
    fn force_accumulates_with_bias_and_clamps() {
        let (mut d, mut events) = entered();
        let config = cfg();
        // first tick: 0 + 0.5 + 0.25 = 0.75
        d.update(&hold(1.0), 10.0, 40.0, DT, &config, &mut events);
        assert!((d.force() - 0.75).abs() < 1e-6);
        for _ in 0..20 {
            d.update(&hold(1.0), 10.0, 40.0, DT, &config, &mut events);
            assert!(d.force() >= config.min_force && d.force() <= config.max_force);
        }
        assert_eq!(d.force(), config.max_force);
    }

    #[test]
    fn zero_input_still_drifts_with_bias() {
        let (mut d, mut events) = entered();
        d.update(&hold(0.0), 10.0, 40.0, DT, &cfg(), &mut events);
        // 0 + 0.25 clamps up to min_force
        assert_eq!(d.force(), cfg().min_force);
        assert!(d.is_drifting());
    }

    #[test]
    fn sustained_counter_steer_forces_exit() {
        let (mut d, mut events) = entered();
        let config = cfg();
        let ticks = (config.counter_steer_too_long / DT).ceil() as usize;
        for _ in 0..ticks - 1 {
            d.update(&hold(-1.0), 10.0, 40.0, DT, &config, &mut events);
            assert!(d.is_drifting());
        }
        d.update(&hold(-1.0), 10.0, 40.0, DT, &config, &mut events);
        assert!(!d.is_drifting());
        assert_eq!(d.last_exit(), Some(DriftExit::CounterSteerTimeout));
        assert!(d.last_successful());
    }

    #[test]
    fn non_opposing_input_refills_counter_steer_budget() {
        let (mut d, mut events) = entered();
        let config = cfg();
        for _ in 0..4 {
            d.update(&hold(-1.0), 10.0, 40.0, DT, &config, &mut events);
        }
        let burnt = d.active().expect("active").counter_steer_allowed;
        assert!((burnt - 0.5).abs() < 1e-6);

        // 3 * 0.25 = 0.75 s > 0.5 s of matching input
        for _ in 0..3 {
            d.update(&hold(1.0), 10.0, 40.0, DT, &config, &mut events);
        }
        let a = d.active().expect("active");
        assert_eq!(a.counter_steer_allowed, config.counter_steer_too_long);
        assert_eq!(a.counter_steer_unused, 0.0);
    }

    #[test]
    fn release_and_slowdown_exit() {
        let (mut d, mut events) = entered();
        d.update(&ControlFrame { horizontal: 1.0, ..ControlFrame::default() }, 10.0, 40.0, DT, &cfg(), &mut events);
        assert_eq!(d.last_exit(), Some(DriftExit::Released));

        let (mut d, mut events) = entered();
        d.update(&hold(1.0), 2.0, cfg().min_kmh - 1.0, DT, &cfg(), &mut events);
        assert_eq!(d.last_exit(), Some(DriftExit::TooSlow));
        assert!(events.iter().any(|e| matches!(e, CoreEvent::DriftEnded { reason: DriftExit::TooSlow, successful: true })));
    }

    #[test]
    fn residual_force_decays_to_zero_not_below() {
        let (mut d, mut events) = entered();
        let config = cfg();
        for _ in 0..8 {
            d.update(&hold(1.0), 10.0, 40.0, DT, &config, &mut events);
        }
        d.update(&ControlFrame::default(), 10.0, 40.0, DT, &config, &mut events);
        assert!(!d.is_drifting());
        let mut last = d.force();
        for _ in 0..40 {
            d.update(&ControlFrame::default(), 10.0, 40.0, DT, &config, &mut events);
            assert!(d.force() >= 0.0);
            assert!(d.force() <= last);
            last = d.force();
        }
        assert_eq!(d.force(), 0.0);
    }

    #[test]
    fn visual_yaw_leans_into_drift_direction() {
        let mut d = DriftMachine::new();
        let mut events = Vec::new();
        let config = cfg();
        d.update(&press(-1.0), 10.0, 40.0, 1.0 / 60.0, &config, &mut events);
        for _ in 0..120 {
            d.update(&hold(-1.0), 10.0, 40.0, 1.0 / 60.0, &config, &mut events);
        }
        assert!(d.visual_yaw_deg() < -1.0);
        assert!(d.visual_yaw_deg() >= -config.max_visual_yaw_deg - 1e-3);
    }

    #[test]
    fn hard_collision_returns_realign_yaw() {
        let mut d = DriftMachine::new();
        let mut events = Vec::new();
        assert_eq!(d.force_exit(&mut events), None);

        let config = cfg();
        d.update(&press(1.0), 10.0, 40.0, 1.0 / 60.0, &config, &mut events);
        for _ in 0..30 {
            d.update(&hold(1.0), 10.0, 40.0, 1.0 / 60.0, &config, &mut events);
        }
        let yaw_before = d.visual_yaw_deg();
        let yaw = d.force_exit(&mut events).expect("was drifting");
        assert_eq!(yaw, yaw_before);
        assert_eq!(d.visual_yaw_deg(), 0.0);
        assert!(!d.is_drifting());
        assert!(!d.last_successful());
    }
}
