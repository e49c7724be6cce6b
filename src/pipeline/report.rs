//! Turn audit trail
//!
//! Every executed turn returns a [`TurnReport`] alongside the new state:
//! which phases ran, what control changed hands, who was displaced, which
//! events fired. Report consumers are read-only; nothing here feeds back
//! into the simulation.

use serde::Serialize;

use crate::core::types::{EdgeId, FactionId, SettlementId, Turn};
use crate::displacement::DisplacementEvent;

/// One executed (or gated-off) phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseRecord {
    pub phase: &'static str,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// A settlement changing hands during military interaction
#[derive(Debug, Clone, Serialize)]
pub struct ControlChange {
    pub settlement: SettlementId,
    pub edge: EdgeId,
    pub from: FactionId,
    pub to: FactionId,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub turn: Turn,
    pub seed: String,
    pub phases: Vec<PhaseRecord>,
    pub control_changes: Vec<ControlChange>,
    pub displacements: Vec<DisplacementEvent>,
    pub events_fired: Vec<String>,
    pub killed_total: u64,
    /// Canonical snapshot recorded by the persistence phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl TurnReport {
    pub fn new(turn: Turn, seed: String) -> Self {
        Self {
            turn,
            seed,
            phases: Vec::new(),
            control_changes: Vec::new(),
            displacements: Vec::new(),
            events_fired: Vec::new(),
            killed_total: 0,
            snapshot: None,
        }
    }

    pub fn phase_executed(&mut self, phase: &'static str, notes: Vec<String>) {
        self.phases.push(PhaseRecord {
            phase,
            skipped: false,
            notes,
        });
    }

    pub fn phase_skipped(&mut self, phase: &'static str) {
        self.phases.push(PhaseRecord {
            phase,
            skipped: true,
            notes: Vec::new(),
        });
    }

    /// Phase names in execution order, skipped phases excluded.
    pub fn executed_phases(&self) -> Vec<&'static str> {
        self.phases
            .iter()
            .filter(|p| !p.skipped)
            .map(|p| p.phase)
            .collect()
    }
}
