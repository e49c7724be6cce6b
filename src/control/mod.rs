//! Effective settlement control resolution
//!
//! Any consumer that needs "who controls this settlement right now" for
//! treaty preconditions or reporting goes through [`effective_side`].
//! Combat evaluation in the military-interaction phase deliberately bypasses
//! this and reads the AoR map directly: negotiated overrides belong to the
//! displayed/treaty view, never to current-state combat.

use serde::{Deserialize, Serialize};

use crate::core::types::{FactionId, SettlementId};
use crate::state::WorldState;

/// Resolved controller of a settlement. Tagged explicitly so callers never
/// lean on falsy/nullish fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlStatus {
    Known { side: FactionId },
    Unknown,
}

impl ControlStatus {
    pub fn side(&self) -> Option<&FactionId> {
        match self {
            ControlStatus::Known { side } => Some(side),
            ControlStatus::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ControlStatus::Known { .. })
    }
}

/// Precedence, checked in this exact order:
/// 1. a negotiated override with a valid side string,
/// 2. AoR-derived control,
/// 3. unknown.
///
/// Pure read; no side effects.
pub fn effective_side(state: &WorldState, settlement: &SettlementId) -> ControlStatus {
    if let Some(overlay) = state.control_overrides.get(settlement) {
        if let Some(side) = overlay.valid_side() {
            return ControlStatus::Known { side };
        }
    }
    match state.aor.get(settlement) {
        Some(side) => ControlStatus::Known { side: side.clone() },
        None => ControlStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ControlOverride;

    fn contested_state() -> (WorldState, SettlementId) {
        let mut state = WorldState::baseline("control");
        let settlement = SettlementId::new("S-100");
        state
            .aor
            .insert(settlement.clone(), FactionId::new("RBiH"));
        (state, settlement)
    }

    #[test]
    fn test_override_takes_precedence_over_aor() {
        let (mut state, settlement) = contested_state();
        state.control_overrides.insert(
            settlement.clone(),
            ControlOverride {
                side: String::from("RS"),
                treaty: Some(String::from("cessation-line")),
            },
        );
        assert_eq!(
            effective_side(&state, &settlement),
            ControlStatus::Known {
                side: FactionId::new("RS")
            }
        );
        // Removing the override falls back to the AoR-derived side.
        state.control_overrides.remove(&settlement);
        assert_eq!(
            effective_side(&state, &settlement).side(),
            Some(&FactionId::new("RBiH"))
        );
    }

    #[test]
    fn test_blank_override_side_is_ignored() {
        let (mut state, settlement) = contested_state();
        state.control_overrides.insert(
            settlement.clone(),
            ControlOverride {
                side: String::from("  "),
                treaty: None,
            },
        );
        assert_eq!(
            effective_side(&state, &settlement).side(),
            Some(&FactionId::new("RBiH"))
        );
    }

    #[test]
    fn test_unknown_when_nothing_recorded() {
        let state = WorldState::baseline("control");
        let status = effective_side(&state, &SettlementId::new("nowhere"));
        assert_eq!(status, ControlStatus::Unknown);
        assert!(!status.is_known());
    }
}
