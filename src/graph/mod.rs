//! Settlement adjacency graph
//!
//! Static undirected adjacency built from the edge list produced by the
//! external map-build tooling. Both the key set and every neighbor set are
//! sorted, so neighbor-visitation order is reproducible everywhere the graph
//! is consumed. Quarantined settlements (degree-zero orphans and fallback
//! geometry carriers) are filtered out of gameplay-facing adjacency but stay
//! in the raw graph for audit.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{Ethnicity, MunicipalityCode, SettlementId};

/// One record of the external edge list. Endpoints are optional so records
/// with a missing field deserialize instead of failing the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub b: Option<String>,
}

impl EdgeRecord {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: Some(a.into()),
            b: Some(b.into()),
        }
    }

    fn endpoints(&self) -> Option<(SettlementId, SettlementId)> {
        let a = self.a.as_deref()?.trim();
        let b = self.b.as_deref()?.trim();
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some((SettlementId::new(a), SettlementId::new(b)))
    }
}

/// Read-only settlement facts from the map build and the 1991 census
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementInfo {
    pub id: SettlementId,
    pub municipality: MunicipalityCode,
    /// 1991 baseline population per census ethnicity
    pub population_1991: BTreeMap<Ethnicity, u32>,
    /// Orphan nodes never got wired into the survey geometry
    #[serde(default)]
    pub orphan: bool,
    /// Settlements still carrying provisional fallback geometry
    #[serde(default)]
    pub fallback_geometry: bool,
}

impl SettlementInfo {
    pub fn population_of(&self, ethnicity: Ethnicity) -> u32 {
        self.population_1991.get(&ethnicity).copied().unwrap_or(0)
    }
}

/// Lookup-only settlement metadata index. Never iterated, so a hash map is
/// fine here; everything order-sensitive goes through the graph.
#[derive(Debug, Clone, Default)]
pub struct SettlementIndex {
    by_id: AHashMap<SettlementId, SettlementInfo>,
}

impl SettlementIndex {
    pub fn from_records(records: Vec<SettlementInfo>) -> Self {
        let by_id = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self { by_id }
    }

    pub fn get(&self, id: &SettlementId) -> Option<&SettlementInfo> {
        self.by_id.get(id)
    }

    pub fn municipality_of(&self, id: &SettlementId) -> Option<&MunicipalityCode> {
        self.by_id.get(id).map(|s| &s.municipality)
    }
}

/// Symmetric, sorted settlement adjacency
#[derive(Debug, Clone, Default)]
pub struct SettlementGraph {
    adjacency: BTreeMap<SettlementId, BTreeSet<SettlementId>>,
    skipped_records: usize,
}

impl SettlementGraph {
    /// Builds the adjacency map from an edge list. Malformed records are
    /// skipped with a warning; the build itself never fails.
    pub fn from_edges(edges: &[EdgeRecord]) -> Self {
        let mut adjacency: BTreeMap<SettlementId, BTreeSet<SettlementId>> = BTreeMap::new();
        let mut skipped_records = 0;
        for (i, record) in edges.iter().enumerate() {
            let Some((a, b)) = record.endpoints() else {
                tracing::warn!(record = i, "skipping malformed edge record");
                skipped_records += 1;
                continue;
            };
            adjacency.entry(a.clone()).or_default().insert(b.clone());
            adjacency.entry(b).or_default().insert(a);
        }
        Self {
            adjacency,
            skipped_records,
        }
    }

    pub fn contains(&self, id: &SettlementId) -> bool {
        self.adjacency.contains_key(id)
    }

    pub fn neighbors(&self, id: &SettlementId) -> impl Iterator<Item = &SettlementId> {
        self.adjacency.get(id).into_iter().flatten()
    }

    pub fn degree(&self, id: &SettlementId) -> usize {
        self.adjacency.get(id).map_or(0, |n| n.len())
    }

    pub fn settlements(&self) -> impl Iterator<Item = &SettlementId> {
        self.adjacency.keys()
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// A settlement participates in gameplay only when it is wired into the
    /// graph and not quarantined by the map build.
    pub fn is_active(&self, index: &SettlementIndex, id: &SettlementId) -> bool {
        if self.degree(id) == 0 {
            return false;
        }
        match index.get(id) {
            Some(info) => !info.orphan && !info.fallback_geometry,
            None => false,
        }
    }

    /// Gameplay-facing neighbors: quarantined settlements filtered out,
    /// order preserved from the sorted neighbor set.
    pub fn active_neighbors(
        &self,
        index: &SettlementIndex,
        id: &SettlementId,
    ) -> Vec<SettlementId> {
        self.neighbors(id)
            .filter(|n| self.is_active(index, n))
            .cloned()
            .collect()
    }

    /// Breadth-first search over active adjacency for the nearest settlement
    /// satisfying the predicate. Within a BFS layer, candidates are visited
    /// in lexicographic order, so ties always break the same way.
    pub fn nearest_active<F>(
        &self,
        index: &SettlementIndex,
        from: &SettlementId,
        predicate: F,
    ) -> Option<SettlementId>
    where
        F: Fn(&SettlementId) -> bool,
    {
        let mut visited: BTreeSet<SettlementId> = BTreeSet::new();
        let mut frontier: VecDeque<SettlementId> = VecDeque::new();
        visited.insert(from.clone());
        frontier.push_back(from.clone());
        while !frontier.is_empty() {
            let mut next_layer: BTreeSet<SettlementId> = BTreeSet::new();
            while let Some(current) = frontier.pop_front() {
                for neighbor in self.active_neighbors(index, &current) {
                    if visited.insert(neighbor.clone()) {
                        next_layer.insert(neighbor);
                    }
                }
            }
            // The layer set is sorted; scan it in order for the first match.
            for candidate in &next_layer {
                if predicate(candidate) {
                    return Some(candidate.clone());
                }
            }
            frontier.extend(next_layer);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn info(id: &str, muni: &str) -> SettlementInfo {
        SettlementInfo {
            id: SettlementId::new(id),
            municipality: MunicipalityCode::new(muni),
            population_1991: BTreeMap::new(),
            orphan: false,
            fallback_geometry: false,
        }
    }

    fn line_graph() -> (SettlementGraph, SettlementIndex) {
        let edges = vec![
            EdgeRecord::new("a", "b"),
            EdgeRecord::new("b", "c"),
            EdgeRecord::new("c", "d"),
        ];
        let graph = SettlementGraph::from_edges(&edges);
        let index = SettlementIndex::from_records(vec![
            info("a", "m1"),
            info("b", "m1"),
            info("c", "m2"),
            info("d", "m2"),
        ]);
        (graph, index)
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let (graph, _) = line_graph();
        let a = SettlementId::new("a");
        let b = SettlementId::new("b");
        assert!(graph.neighbors(&a).any(|n| *n == b));
        assert!(graph.neighbors(&b).any(|n| *n == a));
    }

    #[test]
    fn test_malformed_records_skipped_not_fatal() {
        let edges = vec![
            EdgeRecord::new("a", "b"),
            EdgeRecord {
                a: None,
                b: Some(String::from("c")),
            },
            EdgeRecord::new("", "d"),
            EdgeRecord::new("b", "c"),
        ];
        let graph = SettlementGraph::from_edges(&edges);
        assert_eq!(graph.skipped_records(), 2);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_neighbors_sorted() {
        let edges = vec![
            EdgeRecord::new("hub", "z"),
            EdgeRecord::new("hub", "a"),
            EdgeRecord::new("hub", "m"),
        ];
        let graph = SettlementGraph::from_edges(&edges);
        let order: Vec<&str> = graph
            .neighbors(&SettlementId::new("hub"))
            .map(|s| s.as_str())
            .collect();
        assert_eq!(order, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_quarantined_settlements_filtered() {
        let edges = vec![EdgeRecord::new("a", "b"), EdgeRecord::new("b", "c")];
        let graph = SettlementGraph::from_edges(&edges);
        let mut fallback = info("c", "m2");
        fallback.fallback_geometry = true;
        let index =
            SettlementIndex::from_records(vec![info("a", "m1"), info("b", "m1"), fallback]);
        let active = graph.active_neighbors(&index, &SettlementId::new("b"));
        assert_eq!(active, vec![SettlementId::new("a")]);
        // The raw graph still knows about the quarantined node.
        assert!(graph.contains(&SettlementId::new("c")));
    }

    #[test]
    fn test_nearest_active_breaks_ties_lexicographically() {
        // Both "p" and "q" are one hop from "hub"; "p" must win every time.
        let edges = vec![EdgeRecord::new("hub", "q"), EdgeRecord::new("hub", "p")];
        let graph = SettlementGraph::from_edges(&edges);
        let index = SettlementIndex::from_records(vec![
            info("hub", "m0"),
            info("p", "m1"),
            info("q", "m1"),
        ]);
        let found = graph.nearest_active(&index, &SettlementId::new("hub"), |_| true);
        assert_eq!(found, Some(SettlementId::new("p")));
    }

    #[test]
    fn test_nearest_active_walks_layers() {
        let (graph, index) = line_graph();
        let found = graph.nearest_active(&index, &SettlementId::new("a"), |s| s.as_str() == "d");
        assert_eq!(found, Some(SettlementId::new("d")));
    }

    proptest! {
        #[test]
        fn prop_every_edge_is_symmetric(pairs in proptest::collection::vec(("[a-f]{1,2}", "[a-f]{1,2}"), 0..40)) {
            let edges: Vec<EdgeRecord> = pairs
                .iter()
                .map(|(a, b)| EdgeRecord::new(a.clone(), b.clone()))
                .collect();
            let graph = SettlementGraph::from_edges(&edges);
            for node in graph.settlements() {
                for neighbor in graph.neighbors(node) {
                    prop_assert!(graph.neighbors(neighbor).any(|n| n == node));
                }
            }
        }

        #[test]
        fn prop_neighbor_lists_sorted(pairs in proptest::collection::vec(("[a-f]{1,2}", "[a-f]{1,2}"), 0..40)) {
            let edges: Vec<EdgeRecord> = pairs
                .iter()
                .map(|(a, b)| EdgeRecord::new(a.clone(), b.clone()))
                .collect();
            let graph = SettlementGraph::from_edges(&edges);
            for node in graph.settlements() {
                let list: Vec<&SettlementId> = graph.neighbors(node).collect();
                let mut sorted = list.clone();
                sorted.sort();
                prop_assert_eq!(list, sorted);
            }
        }
    }
}
