use std::sync::Arc;

use drift_core::body::ChassisKinematics;
use drift_core::config::{NEUTRAL, TuningProfile};
use drift_core::drift::DriftExit;
use drift_core::events::CoreEvent;
use drift_core::input::{InputTracker, RawInput};
use drift_core::physics::{PhysicsWorld, TrackLayout};
use drift_core::score::ScoreCategory;
use drift_core::terrain::FlatGround;
use drift_core::vehicle::VehicleSim;
use nalgebra::{Point3, Vector3};
use rapier3d::prelude::point;

fn cruising_40() -> ChassisKinematics {
    let mut kin = ChassisKinematics::at_rest(Point3::new(0.0, 0.45, 0.0));
    kin.linvel = Vector3::new(0.0, 0.0, 40.0 / 3.6);
    kin
}

#[test]
fn drift_on_road_flushes_with_multiplier_and_drains() {
    let dt = 0.25;
    let mut vehicle = VehicleSim::new(Arc::new(TuningProfile::default())).expect("default tuning");
    let mut tracker = InputTracker::default();
    let kin = cruising_40();
    vehicle.fixed_update(&kin, &FlatGround::default(), dt);
    assert!(vehicle.suspension().all_wheels_on_road());

    let hold = RawInput {
        vertical: 1.0,
        horizontal: 1.0,
        drift: true,
        ..RawInput::default()
    };
    let mut events = Vec::new();

    // ticks 1..=10 drifting, 2.5 s of multiplier
    for _ in 0..10 {
        vehicle.update(tracker.frame(hold), &kin, dt);
        events.extend(vehicle.drain_events());
    }
    assert!(vehicle.drift().is_drifting());
    let pending = vehicle.score().pending();
    assert_eq!(pending.drift, 10);
    assert_eq!(pending.on_road, 80);
    assert_eq!(vehicle.score().buffer(), 0);

    let awards: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::ScoreAwarded { category, points, .. } => Some((*category, *points)),
            _ => None,
        })
        .collect();
    assert_eq!(
        awards,
        vec![
            (ScoreCategory::Drift, 10),
            (ScoreCategory::OnRoad, 40),
            (ScoreCategory::OnRoad, 40)
        ]
    );

    // tick 11: release
    let release = RawInput {
        vertical: 1.0,
        ..RawInput::default()
    };
    vehicle.update(tracker.frame(release), &kin, dt);
    let tail = vehicle.drain_events();
    assert!(tail.contains(&CoreEvent::DriftEnded {
        reason: DriftExit::Released,
        successful: true
    }));
    assert!(tail.contains(&CoreEvent::ScoreFlushed {
        points: 180,
        multiplier: 2
    }));
    let flushed = tail
        .iter()
        .find(|e| e.name() == "score_flushed")
        .map(|e| serde_json::to_value(e).expect("json"));
    assert_eq!(flushed, Some(serde_json::json!({"event": "score_flushed", "points": 180, "multiplier": 2})));

    // the flush tick is a drain tick
    assert_eq!(vehicle.score().points(), 100);
    assert_eq!(vehicle.score().buffer(), 80);
    assert_eq!(vehicle.score().pending().total(), 0);
    assert_eq!(vehicle.score().multiplier(), 0.0);

    // drains land every other 0.25 s tick
    vehicle.update(tracker.frame(release), &kin, dt);
    assert_eq!(vehicle.score().points(), 100);
    vehicle.update(tracker.frame(release), &kin, dt);
    assert_eq!(vehicle.score().points(), 110);
    assert_eq!(vehicle.score().buffer(), 70);
}

#[test]
fn drift_after_plain_driving_earns_the_same_on_road_bonus() {
    let dt = 0.25;
    let mut vehicle = VehicleSim::new(Arc::new(TuningProfile::default())).expect("default tuning");
    let mut tracker = InputTracker::default();
    let kin = cruising_40();
    vehicle.fixed_update(&kin, &FlatGround::default(), dt);

    let throttle = RawInput {
        vertical: 1.0,
        ..RawInput::default()
    };
    let hold = RawInput {
        horizontal: 1.0,
        drift: true,
        ..throttle
    };

    for _ in 0..3 {
        vehicle.update(tracker.frame(throttle), &kin, dt);
    }
    for _ in 0..10 {
        vehicle.update(tracker.frame(hold), &kin, dt);
    }
    let pending = vehicle.score().pending();
    assert_eq!((pending.drift, pending.on_road), (10, 80));

    vehicle.drain_events();
    vehicle.update(tracker.frame(throttle), &kin, dt);
    assert!(vehicle.drain_events().contains(&CoreEvent::ScoreFlushed {
        points: 180,
        multiplier: 2
    }));
}

fn run_ticks(world: &mut PhysicsWorld, vehicle: &mut VehicleSim, tracker: &mut InputTracker, input: RawInput, ticks: usize) {
    let dt = 1.0 / 60.0;
    for _ in 0..ticks {
        let kin = world.kinematics().expect("chassis");
        vehicle.update(tracker.frame(input), &kin, dt);
        vehicle.fixed_update(&kin, &world.probe(), dt);
        for contact in world.new_contacts() {
            vehicle.on_collision(&contact, &kin);
        }
        let commands = vehicle.drain_commands();
        world.apply(&commands, dt);
        world.step(dt);
    }
}

#[test]
fn right_input_turns_toward_chassis_right_on_rapier_track() {
    let tuning = Arc::new(TuningProfile::default());
    let mut world = PhysicsWorld::new(&TrackLayout::default());
    world.spawn_chassis(point![0.0, 0.6, 0.0], &tuning.chassis);
    let mut vehicle = VehicleSim::new(Arc::clone(&tuning)).expect("default tuning");
    let mut tracker = InputTracker::default();
    let throttle = RawInput {
        vertical: 1.0,
        ..RawInput::default()
    };

    run_ticks(&mut world, &mut vehicle, &mut tracker, throttle, 120);
    let start = world.kinematics().expect("chassis");
    let right = start.right();

    let steer_right = RawInput {
        horizontal: 1.0,
        ..throttle
    };
    run_ticks(&mut world, &mut vehicle, &mut tracker, steer_right, 60);

    let heading = world.kinematics().expect("chassis").forward();
    let flat = Vector3::new(heading.x, 0.0, heading.z);
    assert!(flat.dot(&right) > 0.05, "heading {heading:?} did not swing toward {right:?}");
}

#[test]
fn debris_outside_drift_goes_straight_to_buffer() {
    let mut vehicle = VehicleSim::new(Arc::new(TuningProfile::default())).expect("default tuning");
    let kin = cruising_40();
    vehicle.award_points(ScoreCategory::Debris.id(), 25, "Cone");
    assert_eq!(vehicle.score().buffer(), 25);

    // first update drains immediately: 25 > 10 moves 10
    vehicle.update(Default::default(), &kin, 0.1);
    assert_eq!(vehicle.score().points(), 10);
    assert_eq!(vehicle.score().buffer(), 15);
}

#[test]
fn throttle_on_rapier_track_moves_the_car_forward() {
    let tuning = Arc::new(TuningProfile::default());
    let mut world = PhysicsWorld::new(&TrackLayout::default());
    world.spawn_chassis(point![0.0, 0.6, 0.0], &tuning.chassis);
    let mut vehicle = VehicleSim::new(Arc::clone(&tuning)).expect("default tuning");
    let mut tracker = InputTracker::default();
    let throttle = RawInput {
        vertical: 1.0,
        ..RawInput::default()
    };

    run_ticks(&mut world, &mut vehicle, &mut tracker, throttle, 120);

    let kin = world.kinematics().expect("chassis");
    assert!(kin.position.iter().all(|c| c.is_finite()));
    assert!(kin.position.z > 0.0);
    assert_ne!(vehicle.transmission().gear(), NEUTRAL);
    assert!(!vehicle.drain_events().iter().any(|e| matches!(e, CoreEvent::Crash { .. })));
}
