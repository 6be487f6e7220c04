// ==============================================================================
// transmission.rs — GEAR STATE MACHINE + MOTOR RPM
// ------------------------------------------------------------------------------
// Gear indices: 0 = Reverse, 1 = Neutral, 2.. = forward gears (see GearTable).
//
// Modes:
// - Automatic     shifts on RPM + km/h thresholds
// - DriftLimited  same rules, top reachable gear capped at drift_max_gear
// - Manual        explicit shift_up / shift_down edges, bounded by the table
//
// One transition function serves both automatic modes; the mode only supplies
// the gear ceiling. Every shift up scales stored RPM by 0.8, every shift down
// by 1.2. Direct jumps (Reverse<->Neutral<->1st at standstill) leave RPM alone.
//
// This struct is the mutable runtime sub-state of the car (gear, RPM, mode).
// The tuning profile it reads is never written.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::{FIRST, MotorConfig, NEUTRAL, REVERSE, TransmissionConfig, TuningProfile};
use crate::events::CoreEvent;
use crate::input::ControlFrame;
use crate::math::map_range;

const SHIFT_UP_RPM_SCALE: f32 = 0.8;
const SHIFT_DOWN_RPM_SCALE: f32 = 1.2;
const MIN_EFFICIENCY: f32 = 0.01;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmissionMode {
    Automatic,
    DriftLimited,
    Manual,
}

impl TransmissionMode {
    /// Automatic -> DriftLimited -> Manual -> Automatic.
    pub fn next(self) -> Self {
        match self {
            TransmissionMode::Automatic => TransmissionMode::DriftLimited,
            TransmissionMode::DriftLimited => TransmissionMode::Manual,
            TransmissionMode::Manual => TransmissionMode::Automatic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransmissionMode::Automatic => "automatic",
            TransmissionMode::DriftLimited => "drift_limited",
            TransmissionMode::Manual => "manual",
        }
    }
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shift {
    Up,
    Down,
}

#[derive(Clone, Debug)]
pub struct Transmission {
    gear: usize,
    rpm: f32,
    mode: TransmissionMode,
    efficiency: f32, // 0.01..1
}

impl Transmission {
    pub fn new(config: &TransmissionConfig, motor: &MotorConfig) -> Self {
        Self {
            gear: NEUTRAL,
            rpm: motor.rpm_idle.clamp(motor.rpm_min, motor.rpm_max),
            mode: config.default_mode,
            efficiency: 1.0,
        }
    }

    pub fn gear(&self) -> usize {
        self.gear
    }

    pub fn rpm(&self) -> f32 {
        self.rpm
    }

    pub fn mode(&self) -> TransmissionMode {
        self.mode
    }

    pub fn efficiency(&self) -> f32 {
        self.efficiency
    }

    pub fn in_neutral(&self) -> bool {
        self.gear == NEUTRAL
    }

    pub fn set_mode(&mut self, mode: TransmissionMode, events: &mut Vec<CoreEvent>) {
        if mode == self.mode {
            return;
        }
        info!(from = %self.mode, to = %mode, "transmission mode changed");
        self.mode = mode;
        events.push(CoreEvent::TransmissionModeChanged { mode });
    }

    /// Render-tick gear selection. Runs before the drive model.
    pub fn update_gears(&mut self, frame: &ControlFrame, kmh: f32, tuning: &TuningProfile, events: &mut Vec<CoreEvent>) {
        if frame.cycle_transmission {
            self.set_mode(self.mode.next(), events);
        }

        let before = self.gear;
        let config = &tuning.transmission;
        let motor = &tuning.motor;

        match self.mode {
            TransmissionMode::Automatic => self.automatic(frame.vertical, kmh, config.gears.top(), config, motor),
            TransmissionMode::DriftLimited => {
                let ceiling = config.drift_max_gear.min(config.gears.top());
                self.automatic(frame.vertical, kmh, ceiling, config, motor)
            }
            TransmissionMode::Manual => self.manual(frame, config, motor),
        }

        self.efficiency = self.gear_efficiency(kmh, config);

        if self.gear != before {
            let name = config.gears.get(self.gear).name.clone();
            debug!(from = before, to = self.gear, gear = %name, rpm = self.rpm, kmh, "gear changed");
            events.push(CoreEvent::GearChanged {
                from: before,
                to: self.gear,
                name,
            });
        }
    }

    /// Shared automatic rules; `ceiling` is the highest gear a shift up may reach.
    fn automatic(&mut self, vertical: f32, kmh: f32, ceiling: usize, config: &TransmissionConfig, motor: &MotorConfig) {
        let gear = config.gears.get(self.gear);

        if vertical > 0.0 {
            if self.rpm >= motor.shift_up_rpm
                && kmh >= gear.engage_kmh - config.shift_up_margin_kmh
                && self.gear < ceiling
            {
                self.shift(Shift::Up, motor);
            }
            if self.gear == REVERSE && kmh == 0.0 {
                self.gear = NEUTRAL;
            }
            if self.gear == NEUTRAL && kmh == 0.0 {
                self.gear = FIRST;
            }
        } else if vertical < 0.0 {
            if (kmh <= gear.disengage_kmh && self.gear != REVERSE) || (self.gear == NEUTRAL && kmh == 0.0) {
                self.shift(Shift::Down, motor);
            }
            if self.gear == NEUTRAL {
                self.gear = REVERSE;
            }
            if self.gear == FIRST && kmh == 0.0 {
                self.gear = NEUTRAL;
            }
        } else {
            if kmh <= gear.disengage_kmh && self.gear != NEUTRAL && self.gear > REVERSE {
                self.shift(Shift::Down, motor);
            }
            if kmh == 0.0 {
                self.gear = NEUTRAL;
            }
        }
    }

    fn manual(&mut self, frame: &ControlFrame, config: &TransmissionConfig, motor: &MotorConfig) {
        if frame.shift_up && self.gear < config.gears.top() {
            self.shift(Shift::Up, motor);
        } else if frame.shift_down && self.gear > REVERSE {
            self.shift(Shift::Down, motor);
        }
    }

    fn shift(&mut self, shift: Shift, motor: &MotorConfig) {
        match shift {
            Shift::Up => {
                self.gear += 1;
                self.rpm *= SHIFT_UP_RPM_SCALE;
            }
            Shift::Down => {
                self.gear = self.gear.saturating_sub(1);
                self.rpm *= SHIFT_DOWN_RPM_SCALE;
            }
        }
        self.rpm = self.rpm.clamp(motor.rpm_min, motor.rpm_max);
    }

    fn gear_efficiency(&self, kmh: f32, config: &TransmissionConfig) -> f32 {
        let threshold = config.gears.get(self.gear).disengage_kmh;
        if kmh == 0.0 || threshold == 0.0 {
            return 1.0;
        }
        (kmh / threshold).clamp(MIN_EFFICIENCY, 1.0)
    }

    /// Motor RPM follows the throttle: up while vertical > 0, otherwise down
    /// toward the minimum. Always ends inside [rpm_min, rpm_max].
    pub fn integrate_rpm(&mut self, vertical: f32, dt: f32, motor: &MotorConfig) {
        if vertical > 0.0 {
            self.rpm += motor.rpm_increase * dt;
        } else if self.rpm > motor.rpm_min {
            self.rpm -= motor.rpm_decrease * dt;
        }
        self.rpm = self.rpm.clamp(motor.rpm_min, motor.rpm_max);
    }

    /// RPM shown to the player / audio. In gear it tracks km/h across the
    /// gear's band instead of the stored motor RPM.
    pub fn display_rpm(&self, kmh: f32, tuning: &TuningProfile) -> f32 {
        if self.gear == NEUTRAL {
            return self.rpm;
        }
        let engage = tuning.transmission.gears.get(self.gear).engage_kmh;
        map_range(kmh, 0.0, engage, tuning.motor.rpm_min, tuning.motor.rpm_max)
    }
}

/// Wheel revolutions per minute at `kmh` for a wheel of `radius` metres.
pub fn wheel_rpm(kmh: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    25.0 / (3.0 * std::f32::consts::PI * radius) * kmh
}
