//! Bot strategy profiles and difficulty tiers loaded from TOML
//!
//! Variants are data, not subclasses: one concrete bot consults whichever
//! profile the caller hands it through the decision context.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{EngineError, Result};

/// Difficulty tier selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Recruit,
    Veteran,
    Elite,
}

impl Difficulty {
    /// Extra mistake probability folded into posture decisions.
    pub fn mistake_bonus(&self) -> f64 {
        match self {
            Difficulty::Recruit => 0.20,
            Difficulty::Veteran => 0.05,
            Difficulty::Elite => 0.0,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Veteran
    }
}

/// Behavioral weights driving posture and formation decisions (0.0 to 1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    /// Profile name (set from filename when loaded from disk)
    #[serde(default)]
    pub name: String,
    /// Tendency to push vs hold (0.0 = static defense, 1.0 = constant offensives)
    #[serde(default = "default_half")]
    pub aggression: f64,
    /// Strength-ratio margin demanded before committing to a push
    #[serde(default = "default_half")]
    pub caution: f64,
    /// Tendency to probe contested edges instead of holding them
    #[serde(default = "default_probe")]
    pub probe_bias: f64,
    /// Base probability of an outright wrong posture call
    #[serde(default = "default_mistake")]
    pub mistake_chance: f64,
}

fn default_half() -> f64 {
    0.5
}

fn default_probe() -> f64 {
    0.3
}

fn default_mistake() -> f64 {
    0.05
}

impl Default for StrategyProfile {
    fn default() -> Self {
        Self {
            name: String::from("balanced"),
            aggression: 0.5,
            caution: 0.5,
            probe_bias: 0.3,
            mistake_chance: 0.05,
        }
    }
}

impl StrategyProfile {
    /// Wears the enemy down on every active edge.
    pub fn attritional() -> Self {
        Self {
            name: String::from("attritional"),
            aggression: 0.75,
            caution: 0.25,
            probe_bias: 0.15,
            mistake_chance: 0.05,
        }
    }

    /// Probes for weak sectors, commits only with a clear margin.
    pub fn maneuver() -> Self {
        Self {
            name: String::from("maneuver"),
            aggression: 0.45,
            caution: 0.70,
            probe_bias: 0.55,
            mistake_chance: 0.05,
        }
    }

    /// Loads a profile from a TOML file; the profile name is taken from the
    /// file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut profile: StrategyProfile = toml::from_str(&contents)
            .map_err(|e| EngineError::ProfileError(format!("{}: {e}", path.display())))?;
        if profile.name.is_empty() {
            profile.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let profile: StrategyProfile = toml::from_str("aggression = 0.9").unwrap();
        assert_eq!(profile.aggression, 0.9);
        assert_eq!(profile.caution, 0.5);
        assert_eq!(profile.probe_bias, 0.3);
    }

    #[test]
    fn test_named_presets_differ() {
        assert!(StrategyProfile::attritional().aggression > StrategyProfile::maneuver().aggression);
        assert!(StrategyProfile::maneuver().probe_bias > StrategyProfile::attritional().probe_bias);
    }

    #[test]
    fn test_difficulty_mistake_ordering() {
        assert!(Difficulty::Recruit.mistake_bonus() > Difficulty::Veteran.mistake_bonus());
        assert_eq!(Difficulty::Elite.mistake_bonus(), 0.0);
    }
}
