// ==============================================================================
// config.rs — TUNING PROFILE (IMMUTABLE SNAPSHOT)
// ------------------------------------------------------------------------------
// Read-mostly parameter table for one car: chassis box, drive, motor,
// suspension, drift thresholds, gear table, surfaces, score awards.
//
// Loaded once from TOML and shared as Arc<TuningProfile>. The mutable bits the
// simulation needs per vehicle (current RPM, transmission mode) live in
// transmission::Transmission, never here.
// ==============================================================================

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use crate::terrain::SurfaceTag;
use crate::transmission::TransmissionMode;

pub const REVERSE: usize = 0;
pub const NEUTRAL: usize = 1;
pub const FIRST: usize = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TuningProfile {
    pub name: String,
    pub chassis: ChassisConfig,
    pub drive: DriveConfig,
    pub motor: MotorConfig,
    pub suspension: SuspensionConfig,
    pub drift: DriftConfig,
    pub transmission: TransmissionConfig,
    pub surfaces: SurfaceConfig,
    pub score: ScoreConfig,
}

impl Default for TuningProfile {
    fn default() -> Self {
        Self {
            name: "mustang".to_string(),
            chassis: ChassisConfig::default(),
            drive: DriveConfig::default(),
            motor: MotorConfig::default(),
            suspension: SuspensionConfig::default(),
            drift: DriftConfig::default(),
            transmission: TransmissionConfig::default(),
            surfaces: SurfaceConfig::default(),
            score: ScoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChassisConfig {
    pub box_center: [f32; 3],     // local
    pub box_size: [f32; 3],       // full extents, m
    pub mass: f32,                // grounded mass
    pub drag: f32,                // grounded linear drag
    pub angular_drag: f32,        // grounded angular drag
    pub center_of_mass: [f32; 3], // local
    pub force_point: [f32; 3],    // local; where drive/brake force is applied
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            box_center: [0.0, 0.105, 0.0],
            box_size: [1.5, 0.79, 3.85],
            mass: 1.0,
            drag: 2.0,
            angular_drag: 2.0,
            center_of_mass: [0.0, -0.34, 0.0],
            force_point: [0.0, -0.38, 0.549],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub traction: f32,               // lateral slip damping coefficient
    pub brake_speed: f32,            // reverse / braking force target
    pub steering: f32,               // base steering torque
    pub steer_curve: ResponseCurve,  // km/h -> steering authority
    pub steer_follow_rate: f32,      // 1/s, applied rotation lerp
    pub in_air_mass: f32,
    pub in_air_drag: f32,
    pub in_air_angular_drag: f32,
    pub in_air_gravity_force: f32,   // extra downward force while airborne
    pub ground_probe_distance: f32,  // m, centre probe
    pub surface_probe_distance: f32, // m, surface-normal probe
    pub normal_follow_rate: f32,     // 1/s
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            traction: 40.0,
            brake_speed: 30.0,
            steering: 5.0,
            steer_curve: ResponseCurve::default(),
            steer_follow_rate: 4.0,
            in_air_mass: 100.0,
            in_air_drag: 0.0,
            in_air_angular_drag: 0.01,
            in_air_gravity_force: 9.0,
            ground_probe_distance: 1.5,
            surface_probe_distance: 2.0,
            normal_follow_rate: 8.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub rpm_idle: f32,
    pub rpm_min: f32,
    pub rpm_max: f32,
    pub rpm_increase: f32, // rpm/s while throttling
    pub rpm_decrease: f32, // rpm/s otherwise
    pub shift_up_rpm: f32,
    pub wheel_radius: f32, // m
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            rpm_idle: 1000.0,
            rpm_min: 1000.0,
            rpm_max: 8000.0,
            rpm_increase: 2000.0,
            rpm_decrease: 3000.0,
            shift_up_rpm: 2500.0,
            wheel_radius: 0.57,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    pub max_distance: f32,   // m, probe length
    pub upward_force: f32,   // force at full compression
    pub corner_lift: f32,    // keeps probes starting just above the box floor
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            max_distance: 0.6,
            upward_force: 5.0,
            corner_lift: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub min_kmh: f32,
    pub change_force: f32,
    pub min_force: f32,
    pub max_force: f32,
    pub exit_reducer: f32,           // force/s bled off after exit
    pub counter_steer_too_long: f32, // s
    pub max_visual_yaw_deg: f32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            min_kmh: 15.0,
            change_force: 2.0,
            min_force: 0.5,
            max_force: 2.0,
            exit_reducer: 0.5,
            counter_steer_too_long: 1.5,
            max_visual_yaw_deg: 45.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransmissionConfig {
    pub default_mode: TransmissionMode,
    pub drift_max_gear: usize,
    pub shift_up_margin_kmh: f32,
    pub gears: GearTable,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            default_mode: TransmissionMode::DriftLimited,
            drift_max_gear: 4,
            shift_up_margin_kmh: 5.0,
            gears: GearTable::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub road: SurfaceTag,
    pub wall: SurfaceTag,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            road: SurfaceTag::ROAD,
            wall: SurfaceTag::WALL,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub drift_entry_points: i64,
    pub on_road_points: i64,
    pub drain_interval: f32, // s
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            drift_entry_points: 10,
            on_road_points: 40,
            drain_interval: 0.5,
        }
    }
}

// ============================================
// Gear table
// ============================================

/// One gear. Once speed reaches `engage_kmh` (less the shift-up margin) with
/// enough RPM, the automatic modes engage the next gear; at or below
/// `disengage_kmh` they shift down. `engage_kmh` also bounds the display-RPM
/// mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct GearSpec {
    pub name: String,
    pub speed_increase: f32, // how fast the drive force converges in this gear
    pub top_speed: f32,      // forward drive force target
    pub engage_kmh: f32,
    pub disengage_kmh: f32,
}

impl GearSpec {
    pub fn new(name: &str, speed_increase: f32, top_speed: f32, engage_kmh: f32, disengage_kmh: f32) -> Self {
        Self {
            name: name.to_string(),
            speed_increase,
            top_speed,
            engage_kmh,
            disengage_kmh,
        }
    }
}

/// Index 0 = reverse, 1 = neutral, 2.. = forward gears.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct GearTable(pub Vec<GearSpec>);

impl Default for GearTable {
    fn default() -> Self {
        GearTable(vec![
            GearSpec::new("Reverse", 6.0, 11.5, 20.0, 0.0),
            GearSpec::new("Neutral", 0.0, 0.0, 0.0, 0.0),
            GearSpec::new("1st", 12.0, 11.5, 20.0, 0.0),
            GearSpec::new("2nd", 10.0, 17.5, 30.0, 20.0),
            GearSpec::new("3rd", 8.0, 29.0, 50.0, 30.0),
            GearSpec::new("4th", 6.0, 46.5, 80.0, 50.0),
            GearSpec::new("5th", 4.0, 64.0, 110.0, 80.0),
            GearSpec::new("6th", 2.0, 90.0, 156.0, 110.0),
        ])
    }
}

impl GearTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn top(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Out-of-range indices resolve to the nearest valid gear.
    pub fn get(&self, index: usize) -> &GearSpec {
        &self.0[index.min(self.top())]
    }
}

// ============================================
// Steering response curve
// ============================================

/// Piecewise-linear curve over km/h, keys as `[x, y]` sorted by x.
/// Clamped at both ends.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ResponseCurve(pub Vec<[f32; 2]>);

impl Default for ResponseCurve {
    fn default() -> Self {
        ResponseCurve(vec![[0.0, 0.0], [15.0, 0.5], [40.0, 1.0], [200.0, 1.0]])
    }
}

impl ResponseCurve {
    pub fn evaluate(&self, x: f32) -> f32 {
        let keys = &self.0;
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return 1.0;
        };
        if x <= first[0] {
            return first[1];
        }
        if x >= last[0] {
            return last[1];
        }
        for pair in keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x <= b[0] {
                let span = b[0] - a[0];
                if span <= f32::EPSILON {
                    return b[1];
                }
                return a[1] + (b[1] - a[1]) * (x - a[0]) / span;
            }
        }
        last[1]
    }
}

// ============================================
// Loading + validation
// ============================================

impl TuningProfile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// `origin` is only used for error messages.
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let profile: TuningProfile = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source: Box::new(source),
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gears = &self.transmission.gears;
        if gears.len() <= FIRST {
            return Err(ConfigError::Validation(format!(
                "`{}`: gear table needs reverse, neutral and at least one forward gear (got {})",
                self.name,
                gears.len()
            )));
        }
        if self.transmission.drift_max_gear < FIRST || self.transmission.drift_max_gear > gears.top() {
            return Err(ConfigError::Validation(format!(
                "`{}`: drift_max_gear {} is outside forward gears {}..={}",
                self.name,
                self.transmission.drift_max_gear,
                FIRST,
                gears.top()
            )));
        }
        if self.motor.rpm_min > self.motor.rpm_max {
            return Err(ConfigError::Validation(format!(
                "`{}`: rpm_min {} exceeds rpm_max {}",
                self.name, self.motor.rpm_min, self.motor.rpm_max
            )));
        }
        if self.drift.min_force > self.drift.max_force {
            return Err(ConfigError::Validation(format!(
                "`{}`: drift min_force {} exceeds max_force {}",
                self.name, self.drift.min_force, self.drift.max_force
            )));
        }
        if self.suspension.max_distance <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "`{}`: suspension max_distance must be positive (got {})",
                self.name, self.suspension.max_distance
            )));
        }
        let curve = &self.drive.steer_curve.0;
        if curve.is_empty() {
            return Err(ConfigError::Validation(format!(
                "`{}`: steer_curve needs at least one key",
                self.name
            )));
        }
        if curve.windows(2).any(|pair| pair[1][0] < pair[0][0]) {
            return Err(ConfigError::Validation(format!(
                "`{}`: steer_curve keys must be sorted by km/h",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        let profile = TuningProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.transmission.gears.len(), 8);
        assert_eq!(profile.transmission.gears.get(NEUTRAL).name, "Neutral");
    }

    #[test]
    fn shipped_tuning_file_parses() {
        let raw = include_str!("../config/tuning.toml");
        let profile = TuningProfile::from_toml_str(raw, Path::new("config/tuning.toml")).expect("valid");
        assert_eq!(profile.name, "mustang");
        assert_eq!(profile.transmission.gears.len(), 8);
        assert_eq!(profile.transmission.default_mode, TransmissionMode::DriftLimited);
        assert_eq!(profile.surfaces.road, SurfaceTag(15));
        assert!((profile.transmission.gears.get(3).engage_kmh - 30.0).abs() < 1e-6);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let raw = "name = \"light\"\n[drift]\nmin_kmh = 25.0\n";
        let profile = TuningProfile::from_toml_str(raw, Path::new("inline")).expect("valid");
        assert_eq!(profile.name, "light");
        assert_eq!(profile.drift.min_kmh, 25.0);
        assert_eq!(profile.drift.max_force, 2.0);
        assert_eq!(profile.motor.rpm_max, 8000.0);
    }

    #[test]
    fn validation_rejects_inverted_drift_force() {
        let mut profile = TuningProfile::default();
        profile.drift.min_force = 3.0;
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("min_force"));
    }

    #[test]
    fn validation_rejects_short_gear_table() {
        let mut profile = TuningProfile::default();
        profile.transmission.gears.0.truncate(2);
        assert!(matches!(profile.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn parse_error_names_the_file() {
        let err = TuningProfile::from_toml_str("drift = 3", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn response_curve_interpolates_and_clamps() {
        let curve = ResponseCurve(vec![[0.0, 0.0], [10.0, 1.0], [20.0, 0.5]]);
        assert_eq!(curve.evaluate(-5.0), 0.0);
        assert!((curve.evaluate(5.0) - 0.5).abs() < 1e-6);
        assert!((curve.evaluate(15.0) - 0.75).abs() < 1e-6);
        assert_eq!(curve.evaluate(99.0), 0.5);
        assert_eq!(ResponseCurve(Vec::new()).evaluate(3.0), 1.0);
    }
}
