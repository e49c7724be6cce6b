//! Population displacement and routing
//!
//! Runs whenever a settlement changes hands. The displaced group is the
//! outgoing faction's aligned ethnic population at the settlement; the loss
//! fractions and every destination preference list are static configuration.
//! The engineering load is the fixed precedence order among overlapping
//! special-case rules, not the arithmetic.

use serde::{Deserialize, Serialize};

use crate::core::types::{Ethnicity, FactionId, MunicipalityCode, SettlementId};
use crate::graph::{SettlementGraph, SettlementIndex};
use crate::state::WorldState;

/// Fraction of the displaced group recorded as killed, applied uniformly
/// regardless of which faction is displaced.
pub const KILLED_FRACTION: f64 = 0.10;

/// Sarajevo-area source municipalities for the Serb eastern-bias rule.
const SARAJEVO_AREA: &[&str] = &["novo-sarajevo", "ilidza", "vogosca", "novi-grad", "hadzici"];

/// Bosanska Krajina source municipalities for the Croat cross-region rule.
const KRAJINA_AREA: &[&str] = &["banja-luka", "prijedor", "kljuc", "sanski-most", "jajce"];

/// Serb-aligned eastern-bias destinations for Sarajevo-area sources.
const RS_EASTERN_BIAS: &[&str] = &["pale", "sokolac", "han-pijesak"];

/// Croat-aligned Herzegovina override for Krajina-area sources.
const HRHB_HERZEGOVINA: &[&str] = &["livno", "tomislavgrad", "posusje"];

const RS_MOTHERLAND: &[&str] = &["banja-luka", "bijeljina", "zvornik"];
const HRHB_MOTHERLAND: &[&str] = &["mostar", "siroki-brijeg", "capljina"];
const RBIH_MOTHERLAND: &[&str] = &["zenica", "tuzla", "sarajevo-centar"];

/// Ethnic group aligned with a faction (who gets displaced when the faction
/// loses a settlement).
pub fn aligned_ethnicity(faction: &FactionId) -> Ethnicity {
    match faction.as_str() {
        "RS" => Ethnicity::Serb,
        "HRHB" => Ethnicity::Croat,
        "RBiH" => Ethnicity::Bosniak,
        _ => Ethnicity::Other,
    }
}

/// Fraction of the displaced group fleeing out of the simulated territory.
/// The Bosniak-aligned faction has no abroad destination: exactly zero.
pub fn abroad_fraction(faction: &FactionId) -> f64 {
    match faction.as_str() {
        "RS" => 0.25,
        "HRHB" => 0.30,
        "RBiH" => 0.0,
        _ => 0.0,
    }
}

fn motherland_list(faction: &FactionId) -> &'static [&'static str] {
    match faction.as_str() {
        "RS" => RS_MOTHERLAND,
        "HRHB" => HRHB_MOTHERLAND,
        "RBiH" => RBIH_MOTHERLAND,
        _ => &[],
    }
}

/// One routed displacement, surfaced through the turn report.
///
/// Invariant: killed + fled_abroad + relocated_domestic never exceeds the
/// pre-displacement population of the affected group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplacementEvent {
    pub source: SettlementId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<MunicipalityCode>,
    pub faction: FactionId,
    pub ethnicity: Ethnicity,
    pub killed: u32,
    pub fled_abroad: u32,
    pub relocated_domestic: u32,
}

fn faction_holds(state: &WorldState, faction: &FactionId, municipality: &str) -> bool {
    state
        .factions
        .get(faction)
        .map(|f| {
            f.areas_of_responsibility
                .contains(&MunicipalityCode::new(municipality))
        })
        .unwrap_or(false)
}

/// First list entry whose municipality the faction currently holds.
fn first_held(
    state: &WorldState,
    faction: &FactionId,
    list: &[&str],
) -> Option<MunicipalityCode> {
    list.iter()
        .find(|m| faction_holds(state, faction, m))
        .map(|m| MunicipalityCode::new(*m))
}

/// Resolves the domestic destination municipality for a displaced group.
///
/// Precedence, checked in this exact order:
/// 1. Serb-aligned sources in the Sarajevo area take the eastern-bias list;
/// 2. Croat-aligned sources in the Krajina area take the Herzegovina
///    cross-region override;
/// 3. the faction's motherland-preference list;
/// 4. fallback: BFS over active adjacency to the nearest settlement whose
///    municipality the faction holds.
///
/// Every stage only accepts municipalities currently held by the displaced
/// group's faction.
pub fn route_destination(
    state: &WorldState,
    graph: &SettlementGraph,
    index: &SettlementIndex,
    source: &SettlementId,
    faction: &FactionId,
) -> Option<MunicipalityCode> {
    let source_muni = index.municipality_of(source)?;

    if faction.as_str() == "RS" && SARAJEVO_AREA.contains(&source_muni.as_str()) {
        if let Some(dest) = first_held(state, faction, RS_EASTERN_BIAS) {
            tracing::debug!(source = %source, dest = %dest, "eastern-bias routing");
            return Some(dest);
        }
    }

    if faction.as_str() == "HRHB" && KRAJINA_AREA.contains(&source_muni.as_str()) {
        if let Some(dest) = first_held(state, faction, HRHB_HERZEGOVINA) {
            tracing::debug!(source = %source, dest = %dest, "cross-region routing");
            return Some(dest);
        }
    }

    if let Some(dest) = first_held(state, faction, motherland_list(faction)) {
        return Some(dest);
    }

    let nearest = graph.nearest_active(index, source, |candidate| {
        index
            .municipality_of(candidate)
            .map(|m| faction_holds(state, faction, m.as_str()))
            .unwrap_or(false)
    })?;
    index.municipality_of(&nearest).cloned()
}

/// Computes the displacement triggered by a control change at a settlement.
///
/// Returns None when the settlement is unknown or the affected group has no
/// population there. All fractions are deterministic constants; floors keep
/// the conservation invariant exact in integers.
pub fn resolve_displacement(
    state: &WorldState,
    graph: &SettlementGraph,
    index: &SettlementIndex,
    settlement: &SettlementId,
    losing_faction: &FactionId,
) -> Option<DisplacementEvent> {
    let info = index.get(settlement)?;
    let ethnicity = aligned_ethnicity(losing_faction);
    let population = info.population_of(ethnicity);
    if population == 0 {
        return None;
    }

    let killed = (f64::from(population) * KILLED_FRACTION).floor() as u32;
    let fled_abroad = (f64::from(population) * abroad_fraction(losing_faction)).floor() as u32;
    let relocated_domestic = population - killed - fled_abroad;

    let destination = if relocated_domestic > 0 {
        route_destination(state, graph, index, settlement, losing_faction)
    } else {
        None
    };
    if destination.is_none() && relocated_domestic > 0 {
        tracing::warn!(
            settlement = %settlement,
            faction = %losing_faction,
            "no aligned destination municipality reachable, group remains unrouted"
        );
    }

    Some(DisplacementEvent {
        source: settlement.clone(),
        destination,
        faction: losing_faction.clone(),
        ethnicity,
        killed,
        fled_abroad,
        relocated_domestic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeRecord, SettlementInfo};
    use crate::state::FactionState;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn settlement(id: &str, muni: &str, serbs: u32, bosniaks: u32) -> SettlementInfo {
        let mut population_1991 = BTreeMap::new();
        population_1991.insert(Ethnicity::Serb, serbs);
        population_1991.insert(Ethnicity::Bosniak, bosniaks);
        SettlementInfo {
            id: SettlementId::new(id),
            municipality: MunicipalityCode::new(muni),
            population_1991,
            orphan: false,
            fallback_geometry: false,
        }
    }

    fn state_with_faction(id: &str, held: &[&str]) -> WorldState {
        let mut state = WorldState::baseline("displacement");
        let fid = FactionId::new(id);
        let mut faction = FactionState::new(fid.clone());
        faction.areas_of_responsibility = held
            .iter()
            .map(|m| MunicipalityCode::new(*m))
            .collect();
        state.factions.insert(fid, faction);
        state
    }

    #[test]
    fn test_conservation_and_fractions() {
        let index = SettlementIndex::from_records(vec![settlement("s1", "ilidza", 8000, 2000)]);
        let graph = SettlementGraph::from_edges(&[EdgeRecord::new("s1", "s1")]);
        let state = state_with_faction("RS", &["pale"]);
        let event = resolve_displacement(
            &state,
            &graph,
            &index,
            &SettlementId::new("s1"),
            &FactionId::new("RS"),
        )
        .unwrap();
        assert_eq!(event.killed, 800);
        assert_eq!(event.fled_abroad, 2000);
        assert_eq!(event.relocated_domestic, 5200);
        assert!(event.killed + event.fled_abroad + event.relocated_domestic <= 8000);
    }

    #[test]
    fn test_bosniak_aligned_group_never_flees_abroad() {
        let index = SettlementIndex::from_records(vec![settlement("s1", "foca", 0, 12000)]);
        let graph = SettlementGraph::from_edges(&[]);
        let state = state_with_faction("RBiH", &["zenica"]);
        let event = resolve_displacement(
            &state,
            &graph,
            &index,
            &SettlementId::new("s1"),
            &FactionId::new("RBiH"),
        )
        .unwrap();
        assert_eq!(event.fled_abroad, 0);
        assert_eq!(event.killed + event.relocated_domestic, 12000);
    }

    #[test]
    fn test_eastern_bias_precedes_motherland() {
        // Serb source in the Sarajevo area; RS holds both Pale and Banja Luka,
        // and the eastern-bias list must win over the motherland list.
        let index = SettlementIndex::from_records(vec![settlement("s1", "ilidza", 5000, 0)]);
        let graph = SettlementGraph::from_edges(&[]);
        let state = state_with_faction("RS", &["pale", "banja-luka"]);
        let dest = route_destination(
            &state,
            &graph,
            &index,
            &SettlementId::new("s1"),
            &FactionId::new("RS"),
        );
        assert_eq!(dest, Some(MunicipalityCode::new("pale")));
    }

    #[test]
    fn test_eastern_bias_skips_unheld_entries() {
        let index = SettlementIndex::from_records(vec![settlement("s1", "ilidza", 5000, 0)]);
        let graph = SettlementGraph::from_edges(&[]);
        let state = state_with_faction("RS", &["sokolac", "banja-luka"]);
        let dest = route_destination(
            &state,
            &graph,
            &index,
            &SettlementId::new("s1"),
            &FactionId::new("RS"),
        );
        assert_eq!(dest, Some(MunicipalityCode::new("sokolac")));
    }

    #[test]
    fn test_croat_krajina_cross_region_override() {
        let mut records = vec![settlement("s1", "jajce", 0, 0)];
        records[0]
            .population_1991
            .insert(Ethnicity::Croat, 4000);
        let index = SettlementIndex::from_records(records);
        let graph = SettlementGraph::from_edges(&[]);
        let state = state_with_faction("HRHB", &["tomislavgrad", "mostar"]);
        let dest = route_destination(
            &state,
            &graph,
            &index,
            &SettlementId::new("s1"),
            &FactionId::new("HRHB"),
        );
        // Herzegovina override beats the motherland list (Mostar).
        assert_eq!(dest, Some(MunicipalityCode::new("tomislavgrad")));
    }

    #[test]
    fn test_fallback_routes_to_nearest_held_municipality() {
        // Source outside every special-case area, faction holds none of the
        // motherland list; BFS finds the nearest held municipality.
        let index = SettlementIndex::from_records(vec![
            settlement("s1", "gorazde", 0, 3000),
            settlement("s2", "gorazde", 0, 100),
            settlement("s3", "visegrad", 0, 100),
        ]);
        let graph = SettlementGraph::from_edges(&[
            EdgeRecord::new("s1", "s2"),
            EdgeRecord::new("s2", "s3"),
        ]);
        let state = state_with_faction("RBiH", &["visegrad"]);
        let dest = route_destination(
            &state,
            &graph,
            &index,
            &SettlementId::new("s1"),
            &FactionId::new("RBiH"),
        );
        assert_eq!(dest, Some(MunicipalityCode::new("visegrad")));
    }

    #[test]
    fn test_empty_population_yields_no_event() {
        let index = SettlementIndex::from_records(vec![settlement("s1", "ilidza", 0, 500)]);
        let graph = SettlementGraph::from_edges(&[]);
        let state = state_with_faction("RS", &["pale"]);
        assert!(resolve_displacement(
            &state,
            &graph,
            &index,
            &SettlementId::new("s1"),
            &FactionId::new("RS"),
        )
        .is_none());
    }

    proptest! {
        #[test]
        fn prop_displacement_conserves_population(population in 1u32..2_000_000) {
            let index = SettlementIndex::from_records(vec![settlement(
                "s1",
                "ilidza",
                population,
                0,
            )]);
            let graph = SettlementGraph::from_edges(&[]);
            let state = state_with_faction("RS", &["pale"]);
            let event = resolve_displacement(
                &state,
                &graph,
                &index,
                &SettlementId::new("s1"),
                &FactionId::new("RS"),
            )
            .unwrap();
            prop_assert!(event.killed + event.fled_abroad + event.relocated_domestic <= population);
            prop_assert_eq!(
                event.killed + event.fled_abroad + event.relocated_domestic,
                population
            );
        }
    }
}
