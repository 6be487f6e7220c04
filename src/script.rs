//! Timed input scripts for headless sessions.
//!
//! A script is a list of segments, each holding a level-state [`RawInput`]
//! until its end time. The demo binary samples it once per render tick and
//! runs the result through an [`InputTracker`](crate::input::InputTracker)
//! for edge detection.

use serde::{Deserialize, Serialize};

use crate::input::RawInput;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub until: f32, // s, exclusive
    pub input: RawInput,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputScript {
    pub segments: Vec<Segment>,
}

impl InputScript {
    /// Input held at `time`. Past the last segment the controls are released.
    pub fn sample(&self, time: f32) -> RawInput {
        self.segments
            .iter()
            .find(|s| time < s.until)
            .map(|s| s.input)
            .unwrap_or_default()
    }

    pub fn duration(&self) -> f32 {
        self.segments.last().map(|s| s.until).unwrap_or(0.0)
    }

    /// Accelerate down the straight, hold a right-hand drift, release, coast
    /// and brake to a stop.
    pub fn demo() -> Self {
        let throttle = RawInput {
            vertical: 1.0,
            ..RawInput::default()
        };
        let drift_right = RawInput {
            vertical: 1.0,
            horizontal: 1.0,
            drift: true,
            ..RawInput::default()
        };
        let hold_line = RawInput {
            vertical: 1.0,
            horizontal: 0.4,
            drift: true,
            ..RawInput::default()
        };
        let brake = RawInput {
            vertical: -1.0,
            ..RawInput::default()
        };

        Self {
            segments: vec![
                Segment { until: 4.0, input: throttle },
                Segment { until: 6.5, input: drift_right },
                Segment { until: 8.0, input: hold_line },
                Segment { until: 9.0, input: throttle },
                Segment { until: 11.0, input: RawInput::default() },
                Segment { until: 14.0, input: brake },
            ],
        }
    }
}
