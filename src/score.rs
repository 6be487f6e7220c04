// ==============================================================================
// score.rs — DRIFT-AWARE SCORING ENGINE
// ------------------------------------------------------------------------------
// Dual buffer:
//   award -> (not drifting) buffer                      tagged category -1
//         -> (drifting)     pending[category]           held back
//   drift end -> buffer += sum(pending) * floor(multiplier); pending = 0
//   buffer -> points, one tiered step every drain_interval (1000/100/10/1)
//
// multiplier = seconds spent in the current drift.
// On-road bonus: once per elapsed whole second while drifting with all four
// corners on road-tagged ground.
// ==============================================================================

use serde::{Serialize, Serializer};
use std::fmt;
use tracing::{debug, warn};

use crate::config::ScoreConfig;
use crate::events::CoreEvent;

/// Category ids as collaborators know them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScoreCategory {
    Instant,
    Drift,
    Debris,
    OnRoad,
}

impl ScoreCategory {
    pub fn id(&self) -> i32 {
        match self {
            ScoreCategory::Instant => -1,
            ScoreCategory::Drift => 0,
            ScoreCategory::Debris => 1,
            ScoreCategory::OnRoad => 2,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            -1 => Some(ScoreCategory::Instant),
            0 => Some(ScoreCategory::Drift),
            1 => Some(ScoreCategory::Debris),
            2 => Some(ScoreCategory::OnRoad),
            _ => None,
        }
    }
}

impl Serialize for ScoreCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.id())
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreCategory::Instant => "instant",
            ScoreCategory::Drift => "drift",
            ScoreCategory::Debris => "debris",
            ScoreCategory::OnRoad => "on_road",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PendingPoints {
    pub drift: i64,
    pub debris: i64,
    pub on_road: i64,
}

impl PendingPoints {
    pub fn total(&self) -> i64 {
        self.drift + self.debris + self.on_road
    }
}

#[derive(Clone, Debug)]
pub struct ScoreEngine {
    config: ScoreConfig,
    points: i64,           // visible, never decreases outside reset()
    buffer: i64,           // waiting to drain into points
    drain_timer: f32,      // s until next drain step
    pending: PendingPoints, // held while drifting
    multiplier: f32,       // s drifting
    drifting: bool,
    second_timer: f32,
    track_time: Option<f32>,
}

impl ScoreEngine {
    pub fn new(config: &ScoreConfig) -> Self {
        Self {
            config: config.clone(),
            points: 0,
            buffer: 0,
            drain_timer: 0.0,
            pending: PendingPoints::default(),
            multiplier: 0.0,
            drifting: false,
            second_timer: 0.0,
            track_time: None,
        }
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    pub fn buffer(&self) -> i64 {
        self.buffer
    }

    pub fn pending(&self) -> PendingPoints {
        self.pending
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Seconds since start_track_timer, `None` before it.
    pub fn track_time(&self) -> Option<f32> {
        self.track_time
    }

    pub fn start_track_timer(&mut self) {
        if self.track_time.is_none() {
            self.track_time = Some(0.0);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(&self.config);
    }

    /// Award by raw category id. Unknown ids are logged and dropped.
    pub fn award_by_id(&mut self, id: i32, points: i64, label: &str, events: &mut Vec<CoreEvent>) {
        match ScoreCategory::from_id(id) {
            Some(category) => self.award(category, points, label, events),
            None => warn!(id, points, label, "unrecognised score category, award dropped"),
        }
    }

    pub fn award(&mut self, category: ScoreCategory, points: i64, label: &str, events: &mut Vec<CoreEvent>) {
        if points < 0 {
            warn!(%category, points, label, "negative award dropped");
            return;
        }

        let filed_as = if !self.drifting {
            self.buffer += points;
            ScoreCategory::Instant
        } else {
            match category {
                ScoreCategory::Drift => self.pending.drift += points,
                ScoreCategory::Debris => self.pending.debris += points,
                ScoreCategory::OnRoad => self.pending.on_road += points,
                ScoreCategory::Instant => {
                    warn!(points, label, "instant award while drifting dropped");
                    return;
                }
            }
            category
        };

        debug!(category = %filed_as, points, label, "score awarded");
        events.push(CoreEvent::ScoreAwarded {
            category: filed_as,
            points,
            label: label.to_string(),
        });
    }

    /// Render tick, after the drift machine.
    pub fn update(&mut self, dt: f32, drifting: bool, all_on_road: bool, events: &mut Vec<CoreEvent>) {
        self.second_timer += dt;
        if let Some(t) = self.track_time.as_mut() {
            *t += dt;
        }

        if drifting {
            if !self.drifting {
                self.drifting = true;
                // on-road seconds count from entry
                self.second_timer = 0.0;
                self.award(ScoreCategory::Drift, self.config.drift_entry_points, "Drifting", events);
            }
            self.multiplier += dt;
        } else {
            self.end_drift(events);
        }

        if self.drifting && all_on_road && self.second_timer >= 1.0 {
            self.award(ScoreCategory::OnRoad, self.config.on_road_points, "Driving On Road", events);
        }

        self.drain(dt);

        if self.second_timer >= 1.0 {
            self.second_timer = 0.0;
        }
    }

    /// Close the current drift now and flush its pending points. Used for
    /// exits that happen outside the render tick (hard collisions), so a
    /// re-entry on the next tick starts a fresh drift. No-op when idle.
    pub fn end_drift(&mut self, events: &mut Vec<CoreEvent>) {
        if self.drifting {
            self.drifting = false;
            self.flush(events);
        }
    }

    fn flush(&mut self, events: &mut Vec<CoreEvent>) {
        let multiplier = self.multiplier.floor() as i64;
        let points = self.pending.total() * multiplier;
        self.buffer += points;

        debug!(points, multiplier, pending = self.pending.total(), "score flushed");
        events.push(CoreEvent::ScoreFlushed { points, multiplier });

        self.pending = PendingPoints::default();
        self.multiplier = 0.0;
    }

    fn drain(&mut self, dt: f32) {
        if self.drain_timer <= 0.0 {
            self.drain_timer = self.config.drain_interval;
            let step = drain_step(self.buffer);
            self.points += step;
            self.buffer -= step;
        }
        self.drain_timer -= dt;
    }
}

/// Points moved from `buffer` to the visible score in one drain tick.
pub fn drain_step(buffer: i64) -> i64 {
    let rate = if buffer > 1000 {
        1000
    } else if buffer > 100 {
        100
    } else if buffer > 10 {
        10
    } else {
        1
    };
    rate.min(buffer).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (ScoreEngine, Vec<CoreEvent>) {
        (ScoreEngine::new(&ScoreConfig::default()), Vec::new())
    }

    #[test]
    fn drain_tiers() {
        assert_eq!(drain_step(1500), 1000);
        assert_eq!(drain_step(500), 100);
        assert_eq!(drain_step(1000), 100);
        assert_eq!(drain_step(50), 10);
        assert_eq!(drain_step(10), 1);
        assert_eq!(drain_step(0), 0);
    }

    #[test]
    fn buffer_drains_on_half_second_cadence() {
        let (mut s, mut events) = engine();
        s.award(ScoreCategory::Debris, 1500, "sign", &mut events);
        assert_eq!(s.buffer(), 1500);

        s.update(0.25, false, false, &mut events);
        assert_eq!((s.points(), s.buffer()), (1000, 500));
        s.update(0.25, false, false, &mut events);
        assert_eq!((s.points(), s.buffer()), (1000, 500));
        s.update(0.25, false, false, &mut events);
        assert_eq!((s.points(), s.buffer()), (1100, 400));
        s.update(0.25, false, false, &mut events);
        s.update(0.25, false, false, &mut events);
        assert_eq!((s.points(), s.buffer()), (1200, 300));
    }

    #[test]
    fn awards_outside_drift_are_instant() {
        let (mut s, mut events) = engine();
        s.award(ScoreCategory::Debris, 25, "sign", &mut events);
        assert_eq!(s.pending(), PendingPoints::default());
        assert_eq!(s.buffer(), 25);
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::ScoreAwarded { category: ScoreCategory::Instant, points: 25, .. }]
        ));
    }

    #[test]
    fn unknown_category_is_dropped() {
        let (mut s, mut events) = engine();
        s.award_by_id(7, 100, "mystery", &mut events);
        assert_eq!(s.buffer(), 0);
        assert!(events.is_empty());

        s.award_by_id(1, 5, "sign", &mut events);
        assert_eq!(s.buffer(), 5);
    }

    #[test]
    fn drift_session_flushes_with_floored_multiplier() {
        let (mut s, mut events) = engine();
        // 10 ticks of 0.25 s drifting on road
        for _ in 0..10 {
            s.update(0.25, true, true, &mut events);
        }
        assert_eq!(s.pending(), PendingPoints { drift: 10, debris: 0, on_road: 80 });
        assert_eq!(s.buffer(), 0);
        assert_eq!(s.points(), 0);
        assert!((s.multiplier() - 2.5).abs() < 1e-6);

        s.update(0.25, false, true, &mut events);
        assert_eq!(s.pending(), PendingPoints::default());
        assert_eq!(s.multiplier(), 0.0);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::ScoreFlushed { points: 180, multiplier: 2 })));
        // flush lands in the buffer; the drain tick on this update moved 100 of it
        assert_eq!(s.points() + s.buffer(), 180);
    }

    #[test]
    fn on_road_bonus_counts_from_drift_entry() {
        let (mut s, mut events) = engine();
        // plain driving first leaves the one-second clock at 0.75
        for _ in 0..3 {
            s.update(0.25, false, true, &mut events);
        }
        for _ in 0..10 {
            s.update(0.25, true, true, &mut events);
        }
        assert_eq!(s.pending(), PendingPoints { drift: 10, debris: 0, on_road: 80 });

        s.update(0.25, false, true, &mut events);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::ScoreFlushed { points: 180, multiplier: 2 })));
    }

    #[test]
    fn ended_drift_is_flushed_before_reentry() {
        let (mut s, mut events) = engine();
        for _ in 0..4 {
            s.update(0.5, true, false, &mut events);
        }
        s.end_drift(&mut events);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::ScoreFlushed { points: 20, multiplier: 2 })));
        assert_eq!(s.pending().total(), 0);

        events.clear();
        s.update(0.5, true, false, &mut events);
        assert_eq!(s.pending().drift, 10);
        assert!((s.multiplier() - 0.5).abs() < 1e-6);
        assert!(matches!(
            events.as_slice(),
            [CoreEvent::ScoreAwarded { category: ScoreCategory::Drift, points: 10, .. }]
        ));

        // idle engine: nothing to close
        let (mut idle, mut idle_events) = engine();
        idle.end_drift(&mut idle_events);
        assert!(idle_events.is_empty());
    }

    #[test]
    fn off_road_drift_earns_no_on_road_bonus() {
        let (mut s, mut events) = engine();
        for _ in 0..8 {
            s.update(0.25, true, false, &mut events);
        }
        assert_eq!(s.pending().on_road, 0);
        assert_eq!(s.pending().drift, 10);
    }

    #[test]
    fn short_drift_flushes_nothing() {
        let (mut s, mut events) = engine();
        for _ in 0..3 {
            s.update(0.25, true, true, &mut events);
        }
        s.update(0.25, false, true, &mut events);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::ScoreFlushed { points: 0, multiplier: 0 })));
        assert_eq!(s.pending().total(), 0);
    }

    #[test]
    fn debris_during_drift_is_multiplied() {
        let (mut s, mut events) = engine();
        for _ in 0..4 {
            s.update(0.5, true, false, &mut events);
        }
        s.award(ScoreCategory::Debris, 20, "sign", &mut events);
        assert_eq!(s.pending().debris, 20);
        s.update(0.5, false, false, &mut events);
        // (10 + 20) * floor(2.0)
        assert!(events.iter().any(|e| matches!(e, CoreEvent::ScoreFlushed { points: 60, multiplier: 2 })));
    }

    #[test]
    fn points_never_decrease() {
        let (mut s, mut events) = engine();
        let mut last = 0;
        for i in 0..200 {
            let drifting = (i / 20) % 2 == 0;
            if i % 7 == 0 {
                s.award(ScoreCategory::Debris, 33, "sign", &mut events);
            }
            s.update(0.1, drifting, true, &mut events);
            assert!(s.points() >= last);
            assert!(s.buffer() >= 0);
            last = s.points();
        }
    }

    #[test]
    fn track_timer_runs_once_started() {
        let (mut s, mut events) = engine();
        s.update(0.5, false, false, &mut events);
        assert_eq!(s.track_time(), None);
        s.start_track_timer();
        s.update(0.5, false, false, &mut events);
        s.update(0.25, false, false, &mut events);
        assert_eq!(s.track_time(), Some(0.75));

        s.reset();
        assert_eq!(s.track_time(), None);
        assert_eq!(s.points(), 0);
    }

    #[test]
    fn category_ids_round_trip() {
        for c in [ScoreCategory::Instant, ScoreCategory::Drift, ScoreCategory::Debris, ScoreCategory::OnRoad] {
            assert_eq!(ScoreCategory::from_id(c.id()), Some(c));
        }
        assert_eq!(ScoreCategory::from_id(3), None);
    }
}
