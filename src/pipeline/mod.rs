//! Turn pipeline orchestrator
//!
//! One call to [`execute_turn`] advances the world by exactly one turn: the
//! input state is cloned (never mutated), a single RNG is derived from the
//! effective seed, and the eight phases run in their fixed total order
//! against one mutable working copy. A fatal error from any phase discards
//! the working copy; partial turns are never observable.

pub mod phases;
pub mod report;

use crate::bot::{Bot, Difficulty, StrategyProfile};
use crate::core::calendar::WarCalendar;
use crate::core::error::Result;
use crate::core::rng::TurnRng;
use crate::events::EventDefinition;
use crate::graph::{SettlementGraph, SettlementIndex};
use crate::state::WorldState;

pub use report::TurnReport;

/// Seed used when neither the options nor the state carry one.
pub const DEFAULT_SEED: &str = "drina-1992";

/// The eight phases, in their fixed total order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Directives,
    Deployments,
    MilitaryInteraction,
    FragmentationResolution,
    SupplyResolution,
    PoliticalEffects,
    ExhaustionUpdate,
    Persistence,
}

impl Phase {
    pub const ORDER: [Phase; 8] = [
        Phase::Directives,
        Phase::Deployments,
        Phase::MilitaryInteraction,
        Phase::FragmentationResolution,
        Phase::SupplyResolution,
        Phase::PoliticalEffects,
        Phase::ExhaustionUpdate,
        Phase::Persistence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Directives => "directives",
            Phase::Deployments => "deployments",
            Phase::MilitaryInteraction => "military_interaction",
            Phase::FragmentationResolution => "fragmentation_resolution",
            Phase::SupplyResolution => "supply_resolution",
            Phase::PoliticalEffects => "political_effects",
            Phase::ExhaustionUpdate => "exhaustion_update",
            Phase::Persistence => "persistence",
        }
    }
}

/// Per-phase gating. All gates default open; closing one skips the phase
/// without disturbing the order of the rest.
#[derive(Debug, Clone)]
pub struct PhaseGate {
    pub directives: bool,
    pub deployments: bool,
    pub military_interaction: bool,
    pub fragmentation_resolution: bool,
    pub supply_resolution: bool,
    pub political_effects: bool,
    pub exhaustion_update: bool,
    pub persistence: bool,
}

impl Default for PhaseGate {
    fn default() -> Self {
        Self {
            directives: true,
            deployments: true,
            military_interaction: true,
            fragmentation_resolution: true,
            supply_resolution: true,
            political_effects: true,
            exhaustion_update: true,
            persistence: true,
        }
    }
}

impl PhaseGate {
    pub fn is_open(&self, phase: Phase) -> bool {
        match phase {
            Phase::Directives => self.directives,
            Phase::Deployments => self.deployments,
            Phase::MilitaryInteraction => self.military_interaction,
            Phase::FragmentationResolution => self.fragmentation_resolution,
            Phase::SupplyResolution => self.supply_resolution,
            Phase::PoliticalEffects => self.political_effects,
            Phase::ExhaustionUpdate => self.exhaustion_update,
            Phase::Persistence => self.persistence,
        }
    }
}

/// A registered bot plus the data-driven variant it plays
pub struct BotSetup {
    pub bot: Box<dyn Bot>,
    pub difficulty: Difficulty,
    pub profile: StrategyProfile,
}

/// External collaborators a turn consults. All read-only facts: the graph
/// and index come from map-build tooling, events and bots from scenario
/// loading.
pub struct TurnContext<'a> {
    pub graph: &'a SettlementGraph,
    pub index: &'a SettlementIndex,
    pub events: &'a [EventDefinition],
    pub bots: &'a [BotSetup],
    pub calendar: WarCalendar,
}

impl<'a> TurnContext<'a> {
    pub fn new(graph: &'a SettlementGraph, index: &'a SettlementIndex) -> Self {
        Self {
            graph,
            index,
            events: &[],
            bots: &[],
            calendar: WarCalendar::reference(),
        }
    }
}

/// Per-call options
#[derive(Default)]
pub struct TurnOptions {
    /// Explicit seed; takes precedence over the seed stored in the state
    pub seed: Option<String>,
    /// Phase list override; defaults to [`Phase::ORDER`]
    pub steps: Option<Vec<Phase>>,
    pub gate: PhaseGate,
}

/// New state plus the audit trail of the turn that produced it
pub struct TurnOutcome {
    pub state: WorldState,
    pub report: TurnReport,
}

fn effective_seed(state: &WorldState, opts: &TurnOptions) -> String {
    if let Some(seed) = &opts.seed {
        if !seed.is_empty() {
            return seed.clone();
        }
    }
    if !state.meta.seed.is_empty() {
        return state.meta.seed.clone();
    }
    DEFAULT_SEED.to_string()
}

/// Advances the world by exactly one turn.
pub fn execute_turn(
    state: &WorldState,
    ctx: &TurnContext<'_>,
    opts: &TurnOptions,
) -> Result<TurnOutcome> {
    state.validate_schema()?;

    let mut working = state.clone();
    let seed = effective_seed(state, opts);
    working.meta.seed = seed.clone();
    working.meta.turn += 1;

    let mut rng = TurnRng::from_seed_str(&seed);
    let mut report = TurnReport::new(working.meta.turn, seed);

    let steps = opts.steps.clone().unwrap_or_else(|| Phase::ORDER.to_vec());
    for phase in steps {
        if !opts.gate.is_open(phase) {
            tracing::debug!(phase = phase.name(), "phase gated off");
            report.phase_skipped(phase.name());
            continue;
        }
        working.meta.phase = Some(phase.name().to_string());
        report.phase_executed(phase.name(), Vec::new());
        tracing::debug!(turn = working.meta.turn, phase = phase.name(), "executing phase");
        if phase != Phase::Directives {
            // Definitions pinned to this phase fire at its boundary; the
            // directives phase evaluates its own.
            phases::pinned_events(&mut working, ctx, &mut rng, &mut report)?;
        }
        match phase {
            Phase::Directives => phases::directives(&mut working, ctx, &mut rng, &mut report)?,
            Phase::Deployments => phases::deployments(&mut working, ctx, &mut rng, &mut report)?,
            Phase::MilitaryInteraction => {
                phases::military_interaction(&mut working, ctx, &mut rng, &mut report)?
            }
            Phase::FragmentationResolution => {
                phases::fragmentation_resolution(&mut working, ctx, &mut rng, &mut report)?
            }
            Phase::SupplyResolution => {
                phases::supply_resolution(&mut working, ctx, &mut rng, &mut report)?
            }
            Phase::PoliticalEffects => {
                phases::political_effects(&mut working, ctx, &mut rng, &mut report)?
            }
            Phase::ExhaustionUpdate => {
                phases::exhaustion_update(&mut working, ctx, &mut rng, &mut report)?
            }
            Phase::Persistence => phases::persistence(&mut working, ctx, &mut rng, &mut report)?,
        }
    }
    working.meta.phase = None;

    Ok(TurnOutcome {
        state: working,
        report,
    })
}

/// Folds [`execute_turn`] up to `turns` times, stopping after the turn that
/// sets a game-over outcome marker.
pub fn run_campaign(
    state: &WorldState,
    ctx: &TurnContext<'_>,
    opts: &TurnOptions,
    turns: u64,
) -> Result<(WorldState, Vec<TurnReport>)> {
    let mut current = state.clone();
    let mut reports = Vec::new();
    for _ in 0..turns {
        let outcome = execute_turn(&current, ctx, opts)?;
        current = outcome.state;
        reports.push(outcome.report);
        if current.meta.outcome.is_some() {
            break;
        }
    }
    Ok((current, reports))
}
