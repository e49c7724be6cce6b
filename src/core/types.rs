//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Turn counter (one turn = one simulated week)
pub type Turn = u64;

/// Stable settlement identifier, assigned by the external map-build tooling
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display(fmt = "{}", _0)]
pub struct SettlementId(pub String);

impl SettlementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Faction identifier ("RBiH", "RS", "HRHB" in the reference scenario)
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display(fmt = "{}", _0)]
pub struct FactionId(pub String);

impl FactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Formation identifier (brigades and irregular units)
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display(fmt = "{}", _0)]
pub struct FormationId(pub String);

impl FormationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Municipality code from the 1991 census tables
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display(fmt = "{}", _0)]
pub struct MunicipalityCode(pub String);

impl MunicipalityCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier for a contested adjacency edge between two settlements.
///
/// Canonical form is `"<a>|<b>"` with the endpoint ids in lexicographic
/// order, so the same pair always produces the same edge id.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display(fmt = "{}", _0)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn between(a: &SettlementId, b: &SettlementId) -> Self {
        if a.0 <= b.0 {
            Self(format!("{}|{}", a.0, b.0))
        } else {
            Self(format!("{}|{}", b.0, a.0))
        }
    }

    /// Splits the id back into its two settlement endpoints.
    pub fn endpoints(&self) -> Option<(SettlementId, SettlementId)> {
        let (a, b) = self.0.split_once('|')?;
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some((SettlementId::new(a), SettlementId::new(b)))
    }
}

/// Census ethnicity categories from the 1991 baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ethnicity {
    Bosniak,
    Serb,
    Croat,
    Other,
}

/// Front posture a bot can assign to a contested edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Push,
    Hold,
    Probe,
}

impl Default for Posture {
    fn default() -> Self {
        Posture::Hold
    }
}
