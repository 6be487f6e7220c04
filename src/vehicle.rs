// ==============================================================================
// vehicle.rs — PER-VEHICLE PIPELINE (VehicleSim)
// ------------------------------------------------------------------------------
// Owns every subsystem of one car and steps them in a fixed order:
//
//   update       (render tick)  transmission -> drive -> drift -> score
//   fixed_update (fixed tick)   drive forces -> suspension
//   on_collision (host contact) classify -> crash event -> drift hard exit
//
// Nothing here talks to a physics engine. Forces leave as BodyCommands and
// notifications as CoreEvents; the host drains both once per tick.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};
use std::sync::Arc;
use tracing::debug;

use crate::body::{BodyCommand, ChassisKinematics};
use crate::collision::{CrashReport, ImpactContact, classify_impact};
use crate::config::{ConfigError, TuningProfile};
use crate::drift::DriftMachine;
use crate::drive::{DriveInputs, DriveModel};
use crate::events::CoreEvent;
use crate::input::ControlFrame;
use crate::score::{ScoreCategory, ScoreEngine};
use crate::suspension::{SuspensionSample, SuspensionSampler};
use crate::terrain::TerrainProbe;
use crate::transmission::{Transmission, TransmissionMode};

/// Published per-vehicle state. Collaborators read this, never the internals.
#[derive(Clone, Copy, Debug)]
pub struct VehicleState {
    pub gear: usize,
    pub rpm: f32,
    pub display_rpm: f32,
    pub mode: TransmissionMode,
    pub speed: f32, // m/s
    pub kmh: f32,
    pub grounded: bool,
    pub braking: bool,
    pub drifting: bool,
    pub drift_direction: f32,
    pub drift_force: f32,
    pub visual_yaw_deg: f32,
    pub suspension: [SuspensionSample; 4],
    pub all_wheels_on_road: bool,
}

pub struct VehicleSim {
    tuning: Arc<TuningProfile>,
    transmission: Transmission,
    drive: DriveModel,
    drift: DriftMachine,
    suspension: SuspensionSampler,
    score: ScoreEngine,
    commands: Vec<BodyCommand>,
    events: Vec<CoreEvent>,
    allowed_to_drive: bool,
}

impl VehicleSim {
    /// Rejects a profile that fails validation; every subsystem indexes the
    /// gear table and clamps against the motor range.
    pub fn new(tuning: Arc<TuningProfile>) -> Result<Self, ConfigError> {
        tuning.validate()?;
        Ok(Self {
            transmission: Transmission::new(&tuning.transmission, &tuning.motor),
            drive: DriveModel::new(),
            drift: DriftMachine::new(),
            suspension: SuspensionSampler::new(&tuning.chassis, &tuning.suspension),
            score: ScoreEngine::new(&tuning.score),
            commands: Vec::new(),
            events: Vec::new(),
            allowed_to_drive: true,
            tuning,
        })
    }

    pub fn tuning(&self) -> &TuningProfile {
        &self.tuning
    }

    pub fn transmission(&self) -> &Transmission {
        &self.transmission
    }

    pub fn drive(&self) -> &DriveModel {
        &self.drive
    }

    pub fn drift(&self) -> &DriftMachine {
        &self.drift
    }

    pub fn suspension(&self) -> &SuspensionSampler {
        &self.suspension
    }

    pub fn score(&self) -> &ScoreEngine {
        &self.score
    }

    pub fn allowed_to_drive(&self) -> bool {
        self.allowed_to_drive
    }

    /// While false the drive model and RPM are frozen (countdown, menus).
    pub fn set_allowed_to_drive(&mut self, allowed: bool) {
        self.allowed_to_drive = allowed;
    }

    pub fn set_transmission_mode(&mut self, mode: TransmissionMode) {
        self.transmission.set_mode(mode, &mut self.events);
    }

    // --------------------------------------------------------------------------
    // Render tick
    // --------------------------------------------------------------------------
    pub fn update(&mut self, frame: ControlFrame, kin: &ChassisKinematics, dt: f32) {
        let frame = frame.sanitized();
        let tuning = Arc::clone(&self.tuning);
        let kmh = kin.kmh();

        self.transmission.update_gears(&frame, kmh, &tuning, &mut self.events);

        if self.allowed_to_drive {
            let inputs = DriveInputs {
                gear: self.transmission.gear(),
                gear_efficiency: self.transmission.efficiency(),
                drifting: self.drift.is_drifting(),
                drift_force: self.drift.force(),
            };
            self.drive.render(&frame, kin, inputs, &tuning, dt, &mut self.commands);
            self.transmission.integrate_rpm(frame.vertical, dt, &tuning.motor);
        }

        let forward_speed = kin.local_velocity().z;
        self.drift.update(&frame, forward_speed, kmh, dt, &tuning.drift, &mut self.events);

        // drift steering overrides whatever the drive model asked for
        if let Some(active) = self.drift.active() {
            self.drive.steer(active.direction, self.drift.force(), kmh, &tuning.drive);
        }

        self.score.update(
            dt,
            self.drift.is_drifting(),
            self.suspension.all_wheels_on_road(),
            &mut self.events,
        );
    }

    // --------------------------------------------------------------------------
    // Fixed tick
    // --------------------------------------------------------------------------
    pub fn fixed_update(&mut self, kin: &ChassisKinematics, probe: &dyn TerrainProbe, dt: f32) {
        let tuning = Arc::clone(&self.tuning);

        self.drive.fixed(
            kin,
            probe,
            self.suspension.grounded_on_wheel(),
            &tuning,
            dt,
            &mut self.commands,
        );
        self.suspension.sample(
            kin,
            probe,
            &tuning.suspension,
            tuning.surfaces.road,
            &mut self.commands,
        );
    }

    /// Contact reported by the host when the chassis starts touching something.
    /// Only wall-tagged surfaces count as crashes.
    pub fn on_collision(&mut self, contact: &ImpactContact, kin: &ChassisKinematics) -> Option<CrashReport> {
        if contact.surface != self.tuning.surfaces.wall {
            return None;
        }
        let report = classify_impact(&kin.rotation, &contact.normal, self.drive.kmh_previous())?;
        debug!(face = %report.face, kmh = report.kmh, "crash");
        self.events.push(CoreEvent::Crash {
            face: report.face,
            kmh: report.kmh,
        });

        if let Some(yaw_deg) = self.drift.force_exit(&mut self.events) {
            self.score.end_drift(&mut self.events);
            // visual yaw is positive to the right, a negative turn about +Y
            let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -yaw_deg.to_radians());
            self.commands.push(BodyCommand::Realign {
                rotation: kin.rotation * yaw,
            });
        }
        Some(report)
    }

    // --------------------------------------------------------------------------
    // Score access for collaborators (debris, track timer)
    // --------------------------------------------------------------------------
    pub fn award_points(&mut self, category_id: i32, points: i64, label: &str) {
        self.score.award_by_id(category_id, points, label, &mut self.events);
    }

    pub fn award(&mut self, category: ScoreCategory, points: i64, label: &str) {
        self.score.award(category, points, label, &mut self.events);
    }

    pub fn start_track_timer(&mut self) {
        self.score.start_track_timer();
    }

    pub fn reset_score(&mut self) {
        self.score.reset();
    }

    pub fn drain_commands(&mut self) -> Vec<BodyCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self, kin: &ChassisKinematics) -> VehicleState {
        let kmh = kin.kmh();
        VehicleState {
            gear: self.transmission.gear(),
            rpm: self.transmission.rpm(),
            display_rpm: self.transmission.display_rpm(kmh, &self.tuning),
            mode: self.transmission.mode(),
            speed: kin.speed(),
            kmh,
            grounded: self.drive.grounded(),
            braking: self.drive.braking(),
            drifting: self.drift.is_drifting(),
            drift_direction: self.drift.direction(),
            drift_force: self.drift.force(),
            visual_yaw_deg: self.drift.visual_yaw_deg(),
            suspension: *self.suspension.samples(),
            all_wheels_on_road: self.suspension.all_wheels_on_road(),
        }
    }
}
