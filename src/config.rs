use crate::global_variables::*;
use crate::simulation_api::{Rgb, SpeedMode};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("Invalid value for {profile}.{field}: {value}")]
    InvalidProfile {
        profile: &'static str,
        field: &'static str,
        value: f64,
    },

    #[error("follow_gap ({follow_gap}) exceeds leader_lookahead ({leader_lookahead})")]
    GapExceedsLookahead { follow_gap: f64, leader_lookahead: f64 },
}

/// Car-following parameters written to a vehicle as a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivingProfile {
    /// Desired time headway in seconds.
    pub tau: f64,
    /// Multiplier on the lane speed limit.
    pub speed_factor: f64,
    /// Standstill gap to the leader in meters.
    pub min_gap: f64,
    /// Driver imperfection (sigma), 0 is a perfect driver.
    pub imperfection: f64,
}

impl DrivingProfile {
    /// Tight following used while a vehicle is platooned.
    pub fn platoon() -> Self {
        Self {
            tau: PLATOON_TAU,
            speed_factor: PLATOON_SPEED_FACTOR,
            min_gap: PLATOON_MIN_GAP,
            imperfection: PLATOON_IMPERFECTION,
        }
    }

    /// Ordinary traffic behaviour restored once a vehicle leaves a platoon.
    pub fn released() -> Self {
        Self {
            tau: RELEASED_TAU,
            speed_factor: RELEASED_SPEED_FACTOR,
            min_gap: RELEASED_MIN_GAP,
            imperfection: RELEASED_IMPERFECTION,
        }
    }

    fn validate(&self, profile: &'static str) -> Result<(), ConfigError> {
        let fields = [
            ("tau", self.tau),
            ("speed_factor", self.speed_factor),
            ("min_gap", self.min_gap),
            ("imperfection", self.imperfection),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidProfile { profile, field, value });
            }
        }
        if self.imperfection > 1.0 {
            return Err(ConfigError::InvalidProfile {
                profile,
                field: "imperfection",
                value: self.imperfection,
            });
        }
        Ok(())
    }
}

impl Default for DrivingProfile {
    fn default() -> Self {
        Self::platoon()
    }
}

/// A profile as written in a config file, any field may be left out.
#[derive(Deserialize)]
struct PartialProfile {
    tau: Option<f64>,
    speed_factor: Option<f64>,
    min_gap: Option<f64>,
    imperfection: Option<f64>,
}

impl PartialProfile {
    fn over(self, base: DrivingProfile) -> DrivingProfile {
        DrivingProfile {
            tau: self.tau.unwrap_or(base.tau),
            speed_factor: self.speed_factor.unwrap_or(base.speed_factor),
            min_gap: self.min_gap.unwrap_or(base.min_gap),
            imperfection: self.imperfection.unwrap_or(base.imperfection),
        }
    }
}

fn platoon_profile<'de, D>(deserializer: D) -> Result<DrivingProfile, D::Error>
where
    D: Deserializer<'de>,
{
    PartialProfile::deserialize(deserializer).map(|p| p.over(DrivingProfile::platoon()))
}

fn released_profile<'de, D>(deserializer: D) -> Result<DrivingProfile, D::Error>
where
    D: Deserializer<'de>,
{
    PartialProfile::deserialize(deserializer).map(|p| p.over(DrivingProfile::released()))
}

/// Speed modes per junction-approach phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedModes {
    /// Within `approach_distance` of the stop line: hold speed, skip braking checks.
    pub near_junction: SpeedMode,
    /// Further out: allow the reservation speed to be reached freely.
    pub far_junction: SpeedMode,
    /// Not intersection-managed (or disbanded): full default caution.
    pub released: SpeedMode,
}

impl Default for SpeedModes {
    fn default() -> Self {
        Self {
            near_junction: SpeedMode(SPEED_MODE_NEAR_JUNCTION),
            far_junction: SpeedMode(SPEED_MODE_FAR_JUNCTION),
            released: SpeedMode(SPEED_MODE_RELEASED),
        }
    }
}

/// When a follower is allowed to take the platoon speed instead of catching up
/// on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatchUpPolicy {
    /// Follow whenever a leader is within `follow_gap`.
    #[default]
    LeaderGapOnly,
    /// Additionally require the platoon lead to be moving.
    MovingLeadRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Missing fields fall back to `DrivingProfile::platoon()`.
    #[serde(deserialize_with = "platoon_profile")]
    pub platoon_profile: DrivingProfile,
    /// Missing fields fall back to `DrivingProfile::released()`.
    #[serde(deserialize_with = "released_profile")]
    pub released_profile: DrivingProfile,
    pub released_color: Rgb,
    pub speed_modes: SpeedModes,
    /// How far ahead a follower looks for its leader (m).
    pub leader_lookahead: f64,
    /// Maximum leader gap at which a follower takes the platoon speed (m).
    pub follow_gap: f64,
    /// Distance to the stop line below which a platoon holds its speed (m).
    pub approach_distance: f64,
    pub catch_up: CatchUpPolicy,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            platoon_profile: DrivingProfile::platoon(),
            released_profile: DrivingProfile::released(),
            released_color: RELEASED_COLOR.into(),
            speed_modes: SpeedModes::default(),
            leader_lookahead: LEADER_LOOKAHEAD,
            follow_gap: FOLLOW_GAP,
            approach_distance: APPROACH_DISTANCE,
            catch_up: CatchUpPolicy::default(),
        }
    }
}

impl ControlConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ControlConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let distances = [
            ("leader_lookahead", self.leader_lookahead),
            ("follow_gap", self.follow_gap),
            ("approach_distance", self.approach_distance),
        ];
        for (field, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }
        self.platoon_profile.validate("platoon_profile")?;
        self.released_profile.validate("released_profile")?;
        if self.follow_gap > self.leader_lookahead {
            return Err(ConfigError::GapExceedsLookahead {
                follow_gap: self.follow_gap,
                leader_lookahead: self.leader_lookahead,
            });
        }
        Ok(())
    }
}
