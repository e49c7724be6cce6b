//! The eight turn phases
//!
//! Each phase reads and writes the single working state, drawing from the
//! one turn RNG threaded through by the orchestrator. Phases never reseed
//! and never touch anything outside the working state, the turn context and
//! the report.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::error::{EngineError, Result};
use crate::core::rng::TurnRng;
use crate::core::types::{EdgeId, FactionId, Posture, SettlementId};
use crate::displacement;
use crate::events;
use crate::pipeline::report::{ControlChange, TurnReport};
use crate::pipeline::TurnContext;
use crate::state::canonical;
use crate::state::{FormationKind, FormationStatus, FrontSegment, WorldState};

/// Net pressure magnitude at which the pressured settlement changes hands.
const FLIP_THRESHOLD: f64 = 0.5;
/// Carry-over factor for accumulated front pressure between turns.
const PRESSURE_CARRY: f64 = 0.8;
/// Friction gained by a front segment per active turn.
const FRICTION_STEP: f64 = 0.05;
/// Brigades below this cohesion fragment.
const COHESION_FLOOR: f64 = 0.25;
/// Manpower a fragmenting brigade sheds into its home militia pool.
const FRAGMENT_MANPOWER: f64 = 250.0;

/// Supply-pressure progression rate. Semantics unresolved upstream; the
/// modifier stays compiled but gated off until they are pinned down.
const SUPPLY_PRESSURE_RATE: f64 = 0.02;
const SUPPLY_PRESSURE_ENABLED: bool = false;

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Phase i: evaluate scheduled directives and narrative events.
pub fn directives(
    working: &mut WorldState,
    ctx: &TurnContext<'_>,
    rng: &mut TurnRng,
    report: &mut TurnReport,
) -> Result<()> {
    for def in ctx.events {
        if let Some(effect) = events::evaluate_event(def, working, rng) {
            report.events_fired.push(def.id.clone());
            if let events::EventEffect::Outcome { outcome, .. } = effect {
                working.meta.outcome = Some(outcome.clone());
            }
        }
    }
    Ok(())
}

/// Fires definitions pinned to the phase about to run. Untagged definitions
/// belong to the directives phase and are never reconsidered here, so their
/// draw accounting stays with that phase.
pub fn pinned_events(
    working: &mut WorldState,
    ctx: &TurnContext<'_>,
    rng: &mut TurnRng,
    report: &mut TurnReport,
) -> Result<()> {
    for def in ctx.events {
        if def.phase.is_none() {
            continue;
        }
        if let Some(effect) = events::evaluate_event(def, working, rng) {
            report.events_fired.push(def.id.clone());
            if let events::EventEffect::Outcome { outcome, .. } = effect {
                working.meta.outcome = Some(outcome.clone());
            }
        }
    }
    Ok(())
}

/// Phase ii: run every registered bot once and merge its output.
///
/// Bots run in sorted bot-id order so the shared posture map resolves
/// multi-bot writes the same way on every run.
pub fn deployments(
    working: &mut WorldState,
    ctx: &TurnContext<'_>,
    rng: &mut TurnRng,
    _report: &mut TurnReport,
) -> Result<()> {
    let front_edges: Vec<EdgeId> = working
        .front_segments
        .iter()
        .filter(|(_, seg)| seg.active)
        .map(|(edge, _)| edge.clone())
        .collect();

    let mut order: Vec<usize> = (0..ctx.bots.len()).collect();
    order.sort_by(|&i, &j| ctx.bots[i].bot.id().cmp(ctx.bots[j].bot.id()));

    for idx in order {
        let setup = &ctx.bots[idx];
        let mut decision_ctx = crate::bot::DecisionContext {
            rng: &mut *rng,
            difficulty: setup.difficulty,
            profile: setup.profile.clone(),
            date: Some(ctx.calendar.date_for_turn(working.meta.turn)),
        };
        let decisions = setup
            .bot
            .make_decisions(working, &front_edges, &mut decision_ctx);
        for (edge, posture) in decisions.posture_assignments {
            working.front_postures.insert(edge, posture);
        }
        for (fid, target) in decisions.formation_assignments {
            if let Some(formation) = working.formations.get_mut(&fid) {
                if formation.faction == *setup.bot.faction() {
                    formation.target = Some(target);
                }
            }
        }
    }
    Ok(())
}

/// Average readiness of a faction's active formations targeting one of the
/// edge endpoints; 0.5 when none are committed there.
fn formation_support(working: &WorldState, faction: &FactionId, a: &SettlementId, b: &SettlementId) -> f64 {
    let mut total = 0.0;
    let mut count = 0u32;
    for formation in working.formations.values() {
        if formation.faction != *faction || formation.status != FormationStatus::Active {
            continue;
        }
        if let Some(target) = &formation.target {
            if target == a || target == b {
                total += formation.readiness;
                count += 1;
            }
        }
    }
    if count == 0 {
        0.5
    } else {
        total / f64::from(count)
    }
}

fn combat_strength(working: &WorldState, faction: &FactionId, a: &SettlementId, b: &SettlementId) -> f64 {
    let base = working
        .factions
        .get(faction)
        .map(|f| {
            f.capability.equipment_operational * 0.4
                + f.logistics * 0.3
                + (1.0 - f.exhaustion) * 0.3
        })
        .unwrap_or(0.0);
    base * (0.5 + 0.5 * formation_support(working, faction, a, b))
}

/// Moves a settlement to the winner's AoR and reconciles the municipality
/// sets; routing for the displaced group runs against the post-flip state.
fn transfer_settlement(
    working: &mut WorldState,
    ctx: &TurnContext<'_>,
    edge: &EdgeId,
    settlement: &SettlementId,
    winner: &FactionId,
    loser: &FactionId,
    report: &mut TurnReport,
) {
    working.aor.insert(settlement.clone(), winner.clone());

    if let Some(muni) = ctx.index.municipality_of(settlement) {
        if let Some(faction) = working.factions.get_mut(winner) {
            faction.areas_of_responsibility.insert(muni.clone());
        }
        let loser_still_present = working
            .aor
            .iter()
            .filter(|(_, side)| *side == loser)
            .any(|(s, _)| ctx.index.municipality_of(s) == Some(muni));
        if !loser_still_present {
            if let Some(faction) = working.factions.get_mut(loser) {
                faction.areas_of_responsibility.remove(muni);
            }
        }
    }

    report.control_changes.push(ControlChange {
        settlement: settlement.clone(),
        edge: edge.clone(),
        from: loser.clone(),
        to: winner.clone(),
    });

    if let Some(event) =
        displacement::resolve_displacement(working, ctx.graph, ctx.index, settlement, loser)
    {
        report.killed_total += u64::from(event.killed);
        report.displacements.push(event);
    }
}

/// Promotes every cross-faction edge of the active adjacency into a tracked
/// front segment. Settlements are walked in sorted order; segments already
/// tracked are left alone. A flip during resolution creates new contested
/// edges, which this pass picks up at the start of the next turn.
fn detect_fronts(working: &mut WorldState, ctx: &TurnContext<'_>) {
    let turn = working.meta.turn;
    let mut promoted: Vec<EdgeId> = Vec::new();
    for settlement in ctx.graph.settlements() {
        if !ctx.graph.is_active(ctx.index, settlement) {
            continue;
        }
        let Some(side) = working.aor.get(settlement) else {
            continue;
        };
        for neighbor in ctx.graph.active_neighbors(ctx.index, settlement) {
            if *settlement >= neighbor {
                continue;
            }
            if let Some(other) = working.aor.get(&neighbor) {
                if other != side {
                    let edge = EdgeId::between(settlement, &neighbor);
                    if !working.front_segments.contains_key(&edge) {
                        promoted.push(edge);
                    }
                }
            }
        }
    }
    for edge in promoted {
        tracing::debug!(edge = %edge, turn, "contested edge promoted to front");
        working
            .front_segments
            .insert(edge.clone(), FrontSegment::new(edge, turn));
    }
}

/// Phase iii: detect newly contested adjacencies, then resolve pressure on
/// every front segment in sorted edge order.
///
/// Pressure is signed toward the controller of the lexicographically smaller
/// endpoint; crossing the threshold flips the opposing settlement. Combat
/// reads the AoR map directly, never the negotiated overlay.
pub fn military_interaction(
    working: &mut WorldState,
    ctx: &TurnContext<'_>,
    rng: &mut TurnRng,
    report: &mut TurnReport,
) -> Result<()> {
    detect_fronts(working, ctx);

    let turn = working.meta.turn;
    let edges: Vec<EdgeId> = working.front_segments.keys().cloned().collect();

    for edge in edges {
        let (a, b) = edge.endpoints().ok_or_else(|| {
            EngineError::InvariantViolation(format!("front segment with malformed edge id: {edge}"))
        })?;

        let side_a = working.aor.get(&a).cloned();
        let side_b = working.aor.get(&b).cloned();
        let (side_a, side_b) = match (side_a, side_b) {
            (Some(fa), Some(fb)) if fa != fb => (fa, fb),
            _ => {
                // Edge no longer contested; the segment goes quiet.
                if let Some(segment) = working.front_segments.get_mut(&edge) {
                    segment.mark_inactive();
                }
                working.front_postures.remove(&edge);
                working.front_pressure.remove(&edge);
                continue;
            }
        };

        let posture = working.front_postures.get(&edge).copied().unwrap_or_default();
        let weight = match posture {
            Posture::Push => 1.0,
            Posture::Probe => 0.45,
            Posture::Hold => 0.15,
        };

        let strength_a = combat_strength(working, &side_a, &a, &b);
        let strength_b = combat_strength(working, &side_b, &a, &b);
        let friction = working
            .front_segments
            .get(&edge)
            .map(|s| s.friction)
            .unwrap_or(0.0);
        let jitter = (rng.next_f64() - 0.5) * 0.1;
        let delta = weight * (strength_a - strength_b) * (1.0 - friction * 0.5) + jitter;
        let accumulated = working.front_pressure.get(&edge).copied().unwrap_or(0.0)
            * PRESSURE_CARRY
            + delta;

        if accumulated >= FLIP_THRESHOLD {
            transfer_settlement(working, ctx, &edge, &b, &side_a, &side_b, report);
            working.front_pressure.insert(edge.clone(), 0.0);
        } else if accumulated <= -FLIP_THRESHOLD {
            transfer_settlement(working, ctx, &edge, &a, &side_b, &side_a, report);
            working.front_pressure.insert(edge.clone(), 0.0);
        } else {
            working.front_pressure.insert(edge.clone(), accumulated);
        }

        if let Some(segment) = working.front_segments.get_mut(&edge) {
            segment.mark_active(turn, FRICTION_STEP);
        }
    }
    Ok(())
}

/// Phase iv: brigades below the cohesion floor fragment; their manpower
/// flows into the home municipality's militia pool.
pub fn fragmentation_resolution(
    working: &mut WorldState,
    _ctx: &TurnContext<'_>,
    _rng: &mut TurnRng,
    report: &mut TurnReport,
) -> Result<()> {
    let WorldState {
        formations,
        militia_pools,
        ..
    } = working;
    for (fid, formation) in formations.iter_mut() {
        if formation.kind != FormationKind::Brigade
            || formation.status != FormationStatus::Active
            || formation.cohesion >= COHESION_FLOOR
        {
            continue;
        }
        formation.status = FormationStatus::Fragmented;
        formation.target = None;
        let key = crate::state::militia_key(&formation.home_municipality, &formation.faction);
        *militia_pools.entry(key).or_insert(0.0) += FRAGMENT_MANPOWER * formation.readiness;
        if let Some(record) = report.phases.last_mut() {
            record.notes.push(format!("{fid} fragmented"));
        }
    }
    Ok(())
}

/// Largest connected component of a faction's held active settlements,
/// walked over active adjacency. Size ties go to the component holding the
/// smallest settlement id, since held settlements are visited in sorted
/// order and only a strictly larger component displaces the best one.
fn main_body(
    ctx: &TurnContext<'_>,
    aor: &BTreeMap<SettlementId, FactionId>,
    fid: &FactionId,
) -> BTreeSet<SettlementId> {
    let mut held: BTreeSet<SettlementId> = BTreeSet::new();
    for (settlement, side) in aor {
        if side == fid && ctx.graph.is_active(ctx.index, settlement) {
            held.insert(settlement.clone());
        }
    }

    let mut best: BTreeSet<SettlementId> = BTreeSet::new();
    let mut seen: BTreeSet<SettlementId> = BTreeSet::new();
    for start in &held {
        if !seen.insert(start.clone()) {
            continue;
        }
        let mut component: BTreeSet<SettlementId> = BTreeSet::new();
        component.insert(start.clone());
        let mut frontier: VecDeque<SettlementId> = VecDeque::from([start.clone()]);
        while let Some(current) = frontier.pop_front() {
            for neighbor in ctx.graph.active_neighbors(ctx.index, &current) {
                if held.contains(&neighbor) && component.insert(neighbor.clone()) {
                    seen.insert(neighbor.clone());
                    frontier.push_back(neighbor);
                }
            }
        }
        if component.len() > best.len() {
            best = component;
        }
    }
    best
}

/// Phase v: recompute logistics from reachable supply sources, then apply
/// capability and embargo progression.
///
/// A source is reachable when it sits in the faction's main body, the
/// largest component of its held settlements over active adjacency. Sources
/// in cut-off pockets do not feed the logistics fraction.
pub fn supply_resolution(
    working: &mut WorldState,
    ctx: &TurnContext<'_>,
    _rng: &mut TurnRng,
    _report: &mut TurnReport,
) -> Result<()> {
    let turn = working.meta.turn;
    let WorldState { factions, aor, .. } = working;
    for (fid, faction) in factions.iter_mut() {
        let total = faction.supply_sources.len();
        if total == 0 {
            faction.logistics *= 0.9;
        } else {
            let body = main_body(ctx, aor, fid);
            let reachable = faction
                .supply_sources
                .iter()
                .filter(|s| body.contains(*s))
                .count();
            faction.logistics = clamp01(0.3 + 0.7 * reachable as f64 / total as f64);
        }

        crate::progression::update_faction_progression(faction, turn);

        if SUPPLY_PRESSURE_ENABLED {
            faction.logistics = clamp01(faction.logistics - SUPPLY_PRESSURE_RATE);
        }
    }
    Ok(())
}

/// Phase vi: political fallout from the turn's control ledger.
pub fn political_effects(
    working: &mut WorldState,
    _ctx: &TurnContext<'_>,
    _rng: &mut TurnRng,
    report: &mut TurnReport,
) -> Result<()> {
    for change in &report.control_changes {
        if let Some(loser) = working.factions.get_mut(&change.from) {
            loser.legitimacy = clamp01(loser.legitimacy - 0.02);
            loser.authority = clamp01(loser.authority - 0.01);
            loser.control = clamp01(loser.control - 0.01);
        }
        if let Some(winner) = working.factions.get_mut(&change.to) {
            winner.control = clamp01(winner.control + 0.01);
            winner.authority = clamp01(winner.authority + 0.005);
        }
    }
    Ok(())
}

/// Phase vii: exhaustion from active fronts and casualties; formation
/// readiness drift.
pub fn exhaustion_update(
    working: &mut WorldState,
    _ctx: &TurnContext<'_>,
    _rng: &mut TurnRng,
    report: &mut TurnReport,
) -> Result<()> {
    // Active fronts per faction, from segment endpoints and the AoR map.
    let mut fronts: BTreeMap<FactionId, u32> = BTreeMap::new();
    for (edge, segment) in &working.front_segments {
        if !segment.active {
            continue;
        }
        if let Some((a, b)) = edge.endpoints() {
            for settlement in [a, b] {
                if let Some(side) = working.aor.get(&settlement) {
                    *fronts.entry(side.clone()).or_insert(0) += 1;
                }
            }
        }
    }
    // Killed totals count against the faction whose group was displaced.
    let mut killed: BTreeMap<FactionId, u64> = BTreeMap::new();
    for event in &report.displacements {
        *killed.entry(event.faction.clone()).or_insert(0) += u64::from(event.killed);
    }

    for (fid, faction) in working.factions.iter_mut() {
        let front_load = f64::from(fronts.get(fid).copied().unwrap_or(0)) * 0.002;
        let casualty_load = killed.get(fid).copied().unwrap_or(0) as f64 / 200_000.0;
        faction.exhaustion = clamp01(faction.exhaustion + front_load + casualty_load);
    }

    for formation in working.formations.values_mut() {
        match formation.status {
            FormationStatus::Active if formation.target.is_some() => {
                formation.readiness = (formation.readiness - 0.03).max(0.1);
                formation.cohesion = (formation.cohesion - 0.02).max(0.0);
            }
            FormationStatus::Active => {
                formation.readiness = (formation.readiness + 0.05).min(1.0);
                formation.cohesion = (formation.cohesion + 0.03).min(1.0);
            }
            FormationStatus::Fragmented => {
                // Cadres reform slowly; at half cohesion the formation is
                // again available for reactivation.
                formation.cohesion = (formation.cohesion + 0.04).min(1.0);
                if formation.cohesion >= 0.5 {
                    formation.status = FormationStatus::Inactive;
                }
            }
            FormationStatus::Inactive => {}
        }
    }
    Ok(())
}

/// Phase viii: invariant checks and the canonical audit snapshot. Never
/// mutates simulation substance.
pub fn persistence(
    working: &mut WorldState,
    _ctx: &TurnContext<'_>,
    _rng: &mut TurnRng,
    report: &mut TurnReport,
) -> Result<()> {
    if working.meta.turn != report.turn {
        return Err(EngineError::InvariantViolation(format!(
            "turn counter drifted during the turn: state {} vs report {}",
            working.meta.turn, report.turn
        )));
    }
    working.validate_militia_keys()?;
    // Snapshot without the transient phase tag, as persisted between turns.
    let phase_tag = working.meta.phase.take();
    let snapshot = canonical::canonical_json(working);
    working.meta.phase = phase_tag;
    report.snapshot = Some(snapshot?);
    Ok(())
}
