// ==============================================================================
// events.rs — ONE-SHOT NOTIFICATIONS FOR COLLABORATORS
// ------------------------------------------------------------------------------
// Effects, camera, audio and UI never get called from inside the core. Each
// subsystem pushes CoreEvents onto the vehicle's queue and the host drains it
// once per tick (VehicleSim::drain_events).
// ==============================================================================

use serde::Serialize;

use crate::collision::CrashFace;
use crate::drift::DriftExit;
use crate::score::ScoreCategory;
use crate::transmission::TransmissionMode;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoreEvent {
    Crash {
        face: CrashFace,
        kmh: f32, // pre-impact
    },
    DriftStarted {
        direction: f32,
    },
    DriftEnded {
        reason: DriftExit,
        successful: bool,
    },
    GearChanged {
        from: usize,
        to: usize,
        name: String,
    },
    TransmissionModeChanged {
        mode: TransmissionMode,
    },
    ScoreAwarded {
        category: ScoreCategory,
        points: i64,
        label: String,
    },
    ScoreFlushed {
        points: i64,
        multiplier: i64,
    },
}

impl CoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CoreEvent::Crash { .. } => "crash",
            CoreEvent::DriftStarted { .. } => "drift_started",
            CoreEvent::DriftEnded { .. } => "drift_ended",
            CoreEvent::GearChanged { .. } => "gear_changed",
            CoreEvent::TransmissionModeChanged { .. } => "transmission_mode_changed",
            CoreEvent::ScoreAwarded { .. } => "score_awarded",
            CoreEvent::ScoreFlushed { .. } => "score_flushed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let event = CoreEvent::Crash {
            face: CrashFace::Left,
            kmh: 42.0,
        };
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["event"], "crash");
        assert_eq!(json["face"], "left");
        assert_eq!(json["kmh"], 42.0);
        assert_eq!(event.name(), "crash");
    }

    #[test]
    fn score_event_carries_category_id() {
        let event = CoreEvent::ScoreAwarded {
            category: ScoreCategory::OnRoad,
            points: 40,
            label: "on road".into(),
        };
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["category"], 2);
        assert_eq!(json["points"], 40);
    }
}
