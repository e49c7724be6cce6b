//! WorldState - the root aggregate the turn pipeline operates on
//!
//! The pipeline owns the state exclusively for the duration of a turn: it
//! clones the caller's value, mutates the clone phase by phase, and returns
//! the clone. Every collection that is ever iterated is a `BTreeMap` or
//! `BTreeSet` so that visitation order never depends on insertion order.

pub mod canonical;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{
    EdgeId, FactionId, FormationId, MunicipalityCode, Posture, SettlementId, Turn,
};

/// Current snapshot schema version
pub const SCHEMA_VERSION: u32 = 3;

/// Versions with a known migration path to [`SCHEMA_VERSION`]
pub const MIGRATABLE_VERSIONS: &[u32] = &[2, 3];

/// Turn metadata carried inside the state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Turn counter, incremented by exactly one per executed turn
    pub turn: Turn,
    /// Seed the last executed turn was driven by (empty before the first turn)
    #[serde(default)]
    pub seed: String,
    /// Phase tag set while a phase is running, cleared at turn end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Game-over marker written by a directive with an outcome effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// Military capability profile, stepped by the war calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CapabilityProfile {
    pub equipment_access: f64,
    pub equipment_operational: f64,
}

/// External supply restriction profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmbargoProfile {
    pub heavy_equipment_access: f64,
    pub smuggling_efficiency: f64,
    pub maintenance_capacity: f64,
}

/// Per-faction continuous state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionState {
    pub id: FactionId,
    pub authority: f64,
    pub legitimacy: f64,
    pub control: f64,
    pub logistics: f64,
    pub exhaustion: f64,
    pub capability: CapabilityProfile,
    pub embargo: EmbargoProfile,
    /// Municipalities this faction holds area-of-responsibility over
    pub areas_of_responsibility: BTreeSet<MunicipalityCode>,
    /// Settlements serving as supply sources for this faction
    pub supply_sources: BTreeSet<SettlementId>,
}

impl FactionState {
    pub fn new(id: FactionId) -> Self {
        Self {
            id,
            authority: 0.5,
            legitimacy: 0.5,
            control: 0.5,
            logistics: 0.5,
            exhaustion: 0.0,
            capability: CapabilityProfile::default(),
            embargo: EmbargoProfile::default(),
            areas_of_responsibility: BTreeSet::new(),
            supply_sources: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationKind {
    Brigade,
    Irregular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationStatus {
    Active,
    Inactive,
    Fragmented,
}

/// A tracked military formation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationState {
    pub faction: FactionId,
    pub kind: FormationKind,
    pub status: FormationStatus,
    pub readiness: f64,
    pub cohesion: f64,
    /// Municipality the formation was raised in; fragmented manpower flows
    /// back into this municipality's militia pool.
    pub home_municipality: MunicipalityCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<SettlementId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// A tracked contested adjacency edge.
///
/// `max_active_streak >= active_streak` always; streaks only advance while
/// the segment is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontSegment {
    pub edge: EdgeId,
    pub active: bool,
    pub created_turn: Turn,
    pub last_active_turn: Turn,
    pub active_streak: u32,
    pub max_active_streak: u32,
    pub friction: f64,
}

impl FrontSegment {
    pub const FRICTION_MAX: f64 = 1.0;

    pub fn new(edge: EdgeId, turn: Turn) -> Self {
        Self {
            edge,
            active: true,
            created_turn: turn,
            last_active_turn: turn,
            active_streak: 0,
            max_active_streak: 0,
            friction: 0.0,
        }
    }

    pub fn mark_active(&mut self, turn: Turn, friction_step: f64) {
        self.active = true;
        self.last_active_turn = turn;
        self.active_streak += 1;
        self.max_active_streak = self.max_active_streak.max(self.active_streak);
        self.friction = (self.friction + friction_step).min(Self::FRICTION_MAX);
    }

    pub fn mark_inactive(&mut self) {
        self.active = false;
        self.active_streak = 0;
    }
}

/// Negotiated per-settlement side assignment, created by treaty resolution
/// outside the core and consulted every turn. The core never writes these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlOverride {
    /// Side string; an empty or whitespace value is treated as absent
    pub side: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treaty: Option<String>,
}

impl ControlOverride {
    pub fn valid_side(&self) -> Option<FactionId> {
        let side = self.side.trim();
        if side.is_empty() {
            None
        } else {
            Some(FactionId::new(side))
        }
    }
}

/// Composite militia pool key: `"<municipality>:<faction>"`.
pub fn militia_key(municipality: &MunicipalityCode, faction: &FactionId) -> String {
    format!("{}:{}", municipality.0, faction.0)
}

/// Parses a militia pool key back into its parts. A key that does not split
/// into two non-empty parts is a fatal invariant violation, not a skip.
pub fn parse_militia_key(key: &str) -> Result<(MunicipalityCode, FactionId)> {
    match key.split_once(':') {
        Some((muni, faction)) if !muni.is_empty() && !faction.is_empty() => Ok((
            MunicipalityCode::new(muni),
            FactionId::new(faction),
        )),
        _ => Err(EngineError::MilitiaKey(key.to_string())),
    }
}

/// The root aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub schema_version: u32,
    pub meta: Meta,
    pub factions: BTreeMap<FactionId, FactionState>,
    pub formations: BTreeMap<FormationId, FormationState>,
    pub front_segments: BTreeMap<EdgeId, FrontSegment>,
    pub front_postures: BTreeMap<EdgeId, Posture>,
    pub front_pressure: BTreeMap<EdgeId, f64>,
    /// Irregular manpower reserves keyed by `"<municipality>:<faction>"`
    pub militia_pools: BTreeMap<String, f64>,
    /// Combat-derived settlement ownership (area of responsibility)
    pub aor: BTreeMap<SettlementId, FactionId>,
    /// Treaty-derived overrides, consulted by effective-control queries only
    pub control_overrides: BTreeMap<SettlementId, ControlOverride>,
    /// Ids of event definitions that already fired (at-most-once guard)
    pub fired_events: BTreeSet<String>,
}

impl WorldState {
    /// Empty baseline state at turn 0, used by scenario setup and tests.
    pub fn baseline(seed: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            meta: Meta {
                turn: 0,
                seed: seed.into(),
                phase: None,
                outcome: None,
            },
            factions: BTreeMap::new(),
            formations: BTreeMap::new(),
            front_segments: BTreeMap::new(),
            front_postures: BTreeMap::new(),
            front_pressure: BTreeMap::new(),
            militia_pools: BTreeMap::new(),
            aor: BTreeMap::new(),
            control_overrides: BTreeMap::new(),
            fired_events: BTreeSet::new(),
        }
    }

    /// Rejects snapshots whose schema version has no known migration path.
    pub fn validate_schema(&self) -> Result<()> {
        if MIGRATABLE_VERSIONS.contains(&self.schema_version) {
            Ok(())
        } else {
            Err(EngineError::SchemaVersion {
                found: self.schema_version,
                known: MIGRATABLE_VERSIONS,
            })
        }
    }

    pub fn faction(&self, id: &FactionId) -> Option<&FactionState> {
        self.factions.get(id)
    }

    /// Validates every militia pool key; run by the persistence phase.
    pub fn validate_militia_keys(&self) -> Result<()> {
        for key in self.militia_pools.keys() {
            parse_militia_key(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_validation() {
        let mut state = WorldState::baseline("s");
        assert!(state.validate_schema().is_ok());
        state.schema_version = 2;
        assert!(state.validate_schema().is_ok());
        state.schema_version = 99;
        assert!(matches!(
            state.validate_schema(),
            Err(EngineError::SchemaVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_militia_key_round_trip() {
        let key = militia_key(&MunicipalityCode::new("prijedor"), &FactionId::new("RS"));
        assert_eq!(key, "prijedor:RS");
        let (muni, faction) = parse_militia_key(&key).unwrap();
        assert_eq!(muni.as_str(), "prijedor");
        assert_eq!(faction.as_str(), "RS");
    }

    #[test]
    fn test_militia_key_rejects_malformed() {
        assert!(parse_militia_key("no-separator").is_err());
        assert!(parse_militia_key(":RS").is_err());
        assert!(parse_militia_key("prijedor:").is_err());
    }

    #[test]
    fn test_front_segment_streak_monotonicity() {
        let edge = EdgeId(String::from("a|b"));
        let mut seg = FrontSegment::new(edge, 1);
        seg.mark_active(2, 0.1);
        seg.mark_active(3, 0.1);
        assert_eq!(seg.active_streak, 2);
        assert_eq!(seg.max_active_streak, 2);
        seg.mark_inactive();
        assert_eq!(seg.active_streak, 0);
        assert_eq!(seg.max_active_streak, 2);
        seg.mark_active(5, 0.1);
        assert!(seg.max_active_streak >= seg.active_streak);
    }

    #[test]
    fn test_override_side_validation() {
        let blank = ControlOverride {
            side: String::from("   "),
            treaty: None,
        };
        assert!(blank.valid_side().is_none());
        let rs = ControlOverride {
            side: String::from("RS"),
            treaty: Some(String::from("cessation-line")),
        };
        assert_eq!(rs.valid_side(), Some(FactionId::new("RS")));
    }
}
