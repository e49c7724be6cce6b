//! Bot decision layer
//!
//! A bot is identified by id + faction and exposes one operation, called
//! exactly once per turn before the military-interaction phase consumes its
//! output. All bot randomness comes from the RNG supplied in the decision
//! context; a bot that consults any other source breaks whole-run
//! determinism and is a defect.

pub mod profile;

use std::collections::BTreeMap;

use crate::core::calendar::WarDate;
use crate::core::rng::TurnRng;
use crate::core::types::{EdgeId, FactionId, FormationId, Posture, SettlementId};
use crate::state::{FormationKind, FormationStatus, WorldState};

pub use profile::{Difficulty, StrategyProfile};

/// Per-turn context handed to each bot
pub struct DecisionContext<'a> {
    pub rng: &'a mut TurnRng,
    pub difficulty: Difficulty,
    pub profile: StrategyProfile,
    pub date: Option<WarDate>,
}

/// Output of one bot invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotDecisions {
    pub posture_assignments: BTreeMap<EdgeId, Posture>,
    pub formation_assignments: BTreeMap<FormationId, SettlementId>,
}

pub trait Bot {
    fn id(&self) -> &str;
    fn faction(&self) -> &FactionId;
    fn make_decisions(
        &self,
        state: &WorldState,
        front_edges: &[EdgeId],
        ctx: &mut DecisionContext<'_>,
    ) -> BotDecisions;
}

/// The single concrete bot: behavior entirely driven by the strategy profile
/// and difficulty tier in the context.
pub struct ProfileBot {
    id: String,
    faction: FactionId,
}

impl ProfileBot {
    pub fn new(id: impl Into<String>, faction: FactionId) -> Self {
        Self {
            id: id.into(),
            faction,
        }
    }
}

/// Composite strength scalar used for posture calls. Deliberately reads the
/// same fields the military-interaction phase weighs, so bot intent and
/// combat outcomes stay correlated.
fn faction_strength(state: &WorldState, faction: &FactionId) -> f64 {
    state
        .factions
        .get(faction)
        .map(|f| {
            f.capability.equipment_operational * 0.4
                + f.logistics * 0.3
                + (1.0 - f.exhaustion) * 0.3
        })
        .unwrap_or(0.0)
}

const POSTURES: [Posture; 3] = [Posture::Push, Posture::Hold, Posture::Probe];

impl Bot for ProfileBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn faction(&self) -> &FactionId {
        &self.faction
    }

    fn make_decisions(
        &self,
        state: &WorldState,
        front_edges: &[EdgeId],
        ctx: &mut DecisionContext<'_>,
    ) -> BotDecisions {
        let mut decisions = BotDecisions::default();
        let own_strength = faction_strength(state, &self.faction);
        let mistake_chance = ctx.profile.mistake_chance + ctx.difficulty.mistake_bonus();

        // Enemy-held endpoints of edges this faction fights on, collected in
        // edge order for deterministic formation targeting.
        let mut enemy_endpoints: Vec<SettlementId> = Vec::new();

        for edge in front_edges {
            let Some((a, b)) = edge.endpoints() else {
                continue;
            };
            let side_a = state.aor.get(&a);
            let side_b = state.aor.get(&b);
            let (enemy, enemy_settlement) = match (side_a, side_b) {
                (Some(fa), Some(fb)) if *fa == self.faction && *fb != self.faction => (fb, b),
                (Some(fa), Some(fb)) if *fb == self.faction && *fa != self.faction => (fa, a),
                _ => continue,
            };
            enemy_endpoints.push(enemy_settlement);

            // Fixed two-draw sequence per edge: mistake check, then one
            // posture or decision draw.
            let mistaken = ctx.rng.chance(mistake_chance);
            let posture = if mistaken {
                ctx.rng.pick(&POSTURES).copied().unwrap_or_default()
            } else {
                let roll = ctx.rng.next_f64();
                let enemy_strength = faction_strength(state, enemy);
                let margin = 1.0 + ctx.profile.caution * 0.5;
                let favorable = enemy_strength <= 0.0
                    || own_strength / enemy_strength.max(1e-9) >= margin;
                if favorable && roll < ctx.profile.aggression {
                    Posture::Push
                } else if roll < ctx.profile.probe_bias {
                    Posture::Probe
                } else {
                    Posture::Hold
                }
            };
            decisions.posture_assignments.insert(edge.clone(), posture);
        }

        // Idle active brigades cycle through enemy-held endpoints, in sorted
        // formation-id order.
        if !enemy_endpoints.is_empty() {
            let mut cursor = 0usize;
            for (fid, formation) in &state.formations {
                if formation.faction != self.faction
                    || formation.kind != FormationKind::Brigade
                    || formation.status != FormationStatus::Active
                    || formation.target.is_some()
                {
                    continue;
                }
                let target = enemy_endpoints[cursor % enemy_endpoints.len()].clone();
                cursor += 1;
                decisions.formation_assignments.insert(fid.clone(), target);
            }
        }

        decisions
    }
}
