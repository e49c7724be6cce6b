//! Capability and embargo progression curves
//!
//! Every curve here is a pure function of (faction id, turn counter); no
//! randomness and no path dependence beyond the counter itself. Capability
//! steps are keyed to war-calendar milestones, embargo smuggling follows a
//! smooth saturation curve toward a per-faction cap.

use crate::core::types::{FactionId, Turn};
use crate::state::{CapabilityProfile, EmbargoProfile, FactionState};

/// One capability plateau: values applying from `from_turn` onward.
struct CapabilityStep {
    from_turn: Turn,
    equipment_access: f64,
    equipment_operational: f64,
}

/// Smuggling saturation cap and baseline heavy-equipment access.
struct EmbargoCurve {
    heavy_equipment_access: f64,
    smuggling_cap: f64,
}

/// Time constant of the smuggling saturation curve, in turns.
///
/// With cap 0.35 the embargoed faction sits at exactly 0.0 on turn 0 and at
/// 0.35 * (1 - e^-2) ~= 0.3026 on turn 200.
const SMUGGLING_TAU: f64 = 100.0;

/// Turn 104: April 1994 (Washington agreement window).
const TURN_WASHINGTON: Turn = 104;
/// Turn 188: late November 1995 (post-accord step).
const TURN_POST_ACCORD: Turn = 188;

/// Serb-aligned forces start with JNA stocks and draw down after the accord.
const RS_STEPS: &[CapabilityStep] = &[
    CapabilityStep {
        from_turn: 0,
        equipment_access: 0.80,
        equipment_operational: 0.70,
    },
    CapabilityStep {
        from_turn: TURN_POST_ACCORD,
        equipment_access: 0.70,
        equipment_operational: 0.60,
    },
];

/// Croat-aligned forces step up at Washington and again post-accord.
const HRHB_STEPS: &[CapabilityStep] = &[
    CapabilityStep {
        from_turn: 0,
        equipment_access: 0.45,
        equipment_operational: 0.50,
    },
    CapabilityStep {
        from_turn: TURN_WASHINGTON,
        equipment_access: 0.70,
        equipment_operational: 0.65,
    },
    CapabilityStep {
        from_turn: TURN_POST_ACCORD,
        equipment_access: 0.75,
        equipment_operational: 0.70,
    },
];

/// Government forces start starved and improve at the same milestones.
const RBIH_STEPS: &[CapabilityStep] = &[
    CapabilityStep {
        from_turn: 0,
        equipment_access: 0.30,
        equipment_operational: 0.40,
    },
    CapabilityStep {
        from_turn: TURN_WASHINGTON,
        equipment_access: 0.45,
        equipment_operational: 0.50,
    },
    CapabilityStep {
        from_turn: TURN_POST_ACCORD,
        equipment_access: 0.60,
        equipment_operational: 0.55,
    },
];

/// Flat curve for factions outside the reference scenario.
const DEFAULT_STEPS: &[CapabilityStep] = &[CapabilityStep {
    from_turn: 0,
    equipment_access: 0.50,
    equipment_operational: 0.50,
}];

fn capability_steps(faction: &FactionId) -> &'static [CapabilityStep] {
    match faction.as_str() {
        "RS" => RS_STEPS,
        "HRHB" => HRHB_STEPS,
        "RBiH" => RBIH_STEPS,
        _ => DEFAULT_STEPS,
    }
}

fn embargo_curve(faction: &FactionId) -> EmbargoCurve {
    match faction.as_str() {
        // The embargoed faction of the reference scenario: poor external
        // access, the highest smuggling ceiling.
        "RBiH" => EmbargoCurve {
            heavy_equipment_access: 0.15,
            smuggling_cap: 0.35,
        },
        "RS" => EmbargoCurve {
            heavy_equipment_access: 0.85,
            smuggling_cap: 0.05,
        },
        "HRHB" => EmbargoCurve {
            heavy_equipment_access: 0.55,
            smuggling_cap: 0.15,
        },
        _ => EmbargoCurve {
            heavy_equipment_access: 0.50,
            smuggling_cap: 0.10,
        },
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Capability profile at a given turn: the last step at or before the turn.
pub fn capability_at(faction: &FactionId, turn: Turn) -> CapabilityProfile {
    let steps = capability_steps(faction);
    let step = steps
        .iter()
        .rev()
        .find(|s| turn >= s.from_turn)
        .unwrap_or(&steps[0]);
    CapabilityProfile {
        equipment_access: step.equipment_access,
        equipment_operational: step.equipment_operational,
    }
}

/// Embargo profile at a given turn. Smuggling efficiency rises smoothly and
/// monotonically from exactly 0.0 toward the faction cap; maintenance
/// capacity is a fixed linear blend of the profile, clamped to [0, 1].
pub fn embargo_at(faction: &FactionId, turn: Turn) -> EmbargoProfile {
    let curve = embargo_curve(faction);
    let smuggling_efficiency = if turn == 0 {
        0.0
    } else {
        curve.smuggling_cap * (1.0 - (-(turn as f64) / SMUGGLING_TAU).exp())
    };
    let maintenance_capacity = clamp01(
        0.20 + 0.55 * curve.heavy_equipment_access + 0.45 * smuggling_efficiency,
    );
    EmbargoProfile {
        heavy_equipment_access: curve.heavy_equipment_access,
        smuggling_efficiency,
        maintenance_capacity,
    }
}

/// Applies both progressions to a faction. Called once per faction per turn
/// by the supply-resolution phase.
pub fn update_faction_progression(faction: &mut FactionState, turn: Turn) {
    faction.capability = capability_at(&faction.id, turn);
    faction.embargo = embargo_at(&faction.id, turn);
}
