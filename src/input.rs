use serde::{Deserialize, Serialize};

/// Normalized player intent for one render tick. Button fields ending in
/// `_pressed` are edges (true only on the tick the button went down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub vertical: f32,   // -1..1, + = throttle
    pub horizontal: f32, // -1..1, + = right
    pub drift_pressed: bool,
    pub drift_held: bool,
    pub shift_up: bool,
    pub shift_down: bool,
    pub cycle_transmission: bool,
}

impl ControlFrame {
    /// Clamp the axes and zero anything non-finite.
    pub fn sanitized(mut self) -> Self {
        self.vertical = clean_axis(self.vertical);
        self.horizontal = clean_axis(self.horizontal);
        self.drift_pressed &= self.drift_held;
        self
    }
}

fn clean_axis(v: f32) -> f32 {
    if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Level-state input as a device reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    pub vertical: f32,
    pub horizontal: f32,
    pub drift: bool,
    pub shift_up: bool,
    pub shift_down: bool,
    pub cycle_transmission: bool,
}

/// Turns level-state buttons into per-tick edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputTracker {
    drift: bool,
    shift_up: bool,
    shift_down: bool,
    cycle: bool,
}

impl InputTracker {
    pub fn frame(&mut self, raw: RawInput) -> ControlFrame {
        let frame = ControlFrame {
            vertical: raw.vertical,
            horizontal: raw.horizontal,
            drift_pressed: raw.drift && !self.drift,
            drift_held: raw.drift,
            shift_up: raw.shift_up && !self.shift_up,
            shift_down: raw.shift_down && !self.shift_down,
            cycle_transmission: raw.cycle_transmission && !self.cycle,
        };
        self.drift = raw.drift;
        self.shift_up = raw.shift_up;
        self.shift_down = raw.shift_down;
        self.cycle = raw.cycle_transmission;
        frame.sanitized()
    }
}
