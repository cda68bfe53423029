//! Louvain community detection
//!
//! Multi-level modularity optimisation on the weighted graph:
//!
//! 1. **Local moving**: visit nodes in shuffled order, move each into the
//!    neighbouring community with the best modularity gain, repeat while the
//!    level's modularity improves by at least `min_improvement`
//! 2. **Aggregation**: collapse communities into super-nodes (intra-community
//!    weight becomes a self loop) and run the next level
//! 3. Stop when a level no longer improves modularity; the last level's
//!    partition, projected back onto addresses, is the result
//!
//! Modularity with resolution γ:
//!
//! Q = Σc [ γ·in(c)/m − (tot(c)/2m)² ]
//!
//! where in(c) is the internal weight of c, tot(c) the summed weighted
//! degree of its members and m the total edge weight.

use super::{FeatureComputer, FeatureError};
use crate::config::CommunityParams;
use crate::graph_core::AddressGraph;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityAssignment {
    pub address: String,
    pub community: u32,
}

/// One level of the Louvain hierarchy
#[derive(Debug, Clone)]
struct LevelGraph {
    /// Neighbours without self loops
    adj: Vec<Vec<(usize, f64)>>,
    loops: Vec<f64>,
}

impl LevelGraph {
    fn from_address_graph(graph: &AddressGraph) -> Self {
        Self {
            adj: graph.adjacency(),
            loops: vec![0.0; graph.node_count()],
        }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    fn total_weight(&self) -> f64 {
        let mut total = 0.0;
        for (i, row) in self.adj.iter().enumerate() {
            for &(j, w) in row {
                if j > i {
                    total += w;
                }
            }
        }
        total + self.loops.iter().sum::<f64>()
    }

    /// Weighted degree, self loop counted twice
    fn degree(&self, node: usize) -> f64 {
        self.adj[node].iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * self.loops[node]
    }

    /// Collapse `partition` (dense ids `0..k`) into a new level
    fn induced(&self, partition: &[usize], communities: usize) -> Self {
        let mut loops = vec![0.0; communities];
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for (i, row) in self.adj.iter().enumerate() {
            let ci = partition[i];
            loops[ci] += self.loops[i];
            for &(j, w) in row {
                if j <= i {
                    continue;
                }
                let cj = partition[j];
                if ci == cj {
                    loops[ci] += w;
                } else {
                    *between.entry((ci.min(cj), ci.max(cj))).or_insert(0.0) += w;
                }
            }
        }

        let mut adj = vec![Vec::new(); communities];
        for ((a, b), w) in between {
            adj[a].push((b, w));
            adj[b].push((a, w));
        }

        Self { adj, loops }
    }
}

/// Mutable bookkeeping for one level
struct Status {
    node2com: Vec<usize>,
    total_weight: f64,
    internals: Vec<f64>,
    degrees: Vec<f64>,
    gdegrees: Vec<f64>,
    loops: Vec<f64>,
}

impl Status {
    fn new(graph: &LevelGraph) -> Self {
        let n = graph.len();
        let gdegrees: Vec<f64> = (0..n).map(|i| graph.degree(i)).collect();
        Self {
            node2com: (0..n).collect(),
            total_weight: graph.total_weight(),
            internals: graph.loops.clone(),
            degrees: gdegrees.clone(),
            gdegrees,
            loops: graph.loops.clone(),
        }
    }

    fn modularity(&self, resolution: f64) -> f64 {
        let links = self.total_weight;
        if links <= 0.0 {
            return 0.0;
        }
        let mut seen = vec![false; self.degrees.len()];
        let mut q = 0.0;
        for &com in &self.node2com {
            if seen[com] {
                continue;
            }
            seen[com] = true;
            q += self.internals[com] * resolution / links
                - (self.degrees[com] / (2.0 * links)).powi(2);
        }
        q
    }

    fn remove(&mut self, node: usize, com: usize, weight: f64) {
        self.degrees[com] -= self.gdegrees[node];
        self.internals[com] -= weight + self.loops[node];
    }

    fn insert(&mut self, node: usize, com: usize, weight: f64) {
        self.node2com[node] = com;
        self.degrees[com] += self.gdegrees[node];
        self.internals[com] += weight + self.loops[node];
    }
}

/// Weight from `node` to each neighbouring community, in first-seen order
fn neighbour_communities(graph: &LevelGraph, status: &Status, node: usize) -> Vec<(usize, f64)> {
    let mut order: Vec<(usize, f64)> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();
    for &(j, w) in &graph.adj[node] {
        let com = status.node2com[j];
        match slot.get(&com) {
            Some(&k) => order[k].1 += w,
            None => {
                slot.insert(com, order.len());
                order.push((com, w));
            }
        }
    }
    order
}

/// Local moving until the level stops improving
fn one_level(
    graph: &LevelGraph,
    status: &mut Status,
    resolution: f64,
    min_improvement: f64,
    rng: &mut StdRng,
) {
    if status.total_weight <= 0.0 {
        return;
    }

    let mut order: Vec<usize> = (0..graph.len()).collect();
    let mut current = status.modularity(resolution);

    loop {
        let mut modified = false;
        order.shuffle(rng);

        for &node in &order {
            let com_node = status.node2com[node];
            let degc_totw = status.gdegrees[node] / (status.total_weight * 2.0);
            let mut neigh = neighbour_communities(graph, status, node);
            let own_weight = neigh
                .iter()
                .find(|(c, _)| *c == com_node)
                .map(|&(_, w)| w)
                .unwrap_or(0.0);

            let remove_cost = -own_weight
                + resolution * (status.degrees[com_node] - status.gdegrees[node]) * degc_totw;
            status.remove(node, com_node, own_weight);

            let mut best_com = com_node;
            let mut best_increase = 0.0;
            neigh.shuffle(rng);
            for &(com, dnc) in &neigh {
                let increase = remove_cost + dnc - resolution * status.degrees[com] * degc_totw;
                if increase > best_increase {
                    best_increase = increase;
                    best_com = com;
                }
            }

            let best_weight = neigh
                .iter()
                .find(|(c, _)| *c == best_com)
                .map(|&(_, w)| w)
                .unwrap_or(0.0);
            status.insert(node, best_com, best_weight);

            if best_com != com_node {
                modified = true;
            }
        }

        let next = status.modularity(resolution);
        if !modified || next - current < min_improvement {
            break;
        }
        current = next;
    }
}

/// Relabel to dense ids by first appearance; returns (partition, count)
fn renumber(node2com: &[usize]) -> (Vec<usize>, usize) {
    let mut map: HashMap<usize, usize> = HashMap::new();
    let partition = node2com
        .iter()
        .map(|&c| {
            let next = map.len();
            *map.entry(c).or_insert(next)
        })
        .collect();
    (partition, map.len())
}

/// Modularity of `partition` (indexed by node order) on `graph`
pub fn modularity(graph: &AddressGraph, partition: &[u32], resolution: f64) -> f64 {
    let level = LevelGraph::from_address_graph(graph);
    let m = level.total_weight();
    if m <= 0.0 || partition.len() != level.len() {
        return 0.0;
    }

    let mut internal: HashMap<u32, f64> = HashMap::new();
    let mut degree: HashMap<u32, f64> = HashMap::new();
    for (i, row) in level.adj.iter().enumerate() {
        let ci = partition[i];
        *degree.entry(ci).or_insert(0.0) += level.degree(i);
        for &(j, w) in row {
            if j > i && partition[j] == ci {
                *internal.entry(ci).or_insert(0.0) += w;
            }
        }
    }

    degree
        .iter()
        .map(|(c, d)| {
            internal.get(c).copied().unwrap_or(0.0) * resolution / m - (d / (2.0 * m)).powi(2)
        })
        .sum()
}

pub struct CommunityDetector {
    params: CommunityParams,
}

impl CommunityDetector {
    pub fn new(params: CommunityParams) -> Self {
        Self { params }
    }

    /// Best partition, one community id per node in node order
    pub fn partition(&self, graph: &AddressGraph) -> Vec<u32> {
        let n = graph.node_count();
        if n == 0 {
            return Vec::new();
        }
        if graph.edge_count() == 0 {
            return (0..n as u32).collect();
        }

        let resolution = self.params.resolution;
        let min_improvement = self.params.min_improvement;
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        // membership[i] = community of original node i at the current level
        let mut membership: Vec<usize> = (0..n).collect();
        let mut level = LevelGraph::from_address_graph(graph);
        let mut status = Status::new(&level);

        one_level(&level, &mut status, resolution, min_improvement, &mut rng);
        let mut best = status.modularity(resolution);
        let (partition, count) = renumber(&status.node2com);
        for m in membership.iter_mut() {
            *m = partition[*m];
        }
        level = level.induced(&partition, count);
        let mut levels = 1usize;

        loop {
            let mut status = Status::new(&level);
            one_level(&level, &mut status, resolution, min_improvement, &mut rng);
            let q = status.modularity(resolution);
            if q - best < min_improvement {
                break;
            }
            best = q;
            let (partition, count) = renumber(&status.node2com);
            for m in membership.iter_mut() {
                *m = partition[*m];
            }
            level = level.induced(&partition, count);
            levels += 1;
        }

        log::debug!("Louvain: {} levels, modularity {:.4}", levels, best);

        let (dense, _) = renumber(&membership);
        dense.into_iter().map(|c| c as u32).collect()
    }
}

impl FeatureComputer for CommunityDetector {
    type Output = Vec<CommunityAssignment>;

    fn name(&self) -> &'static str {
        "community"
    }

    fn compute(&self, graph: &AddressGraph) -> Result<Self::Output, FeatureError> {
        let partition = self.partition(graph);
        let communities = partition.iter().copied().max().map(|c| c + 1).unwrap_or(0);

        log::info!(
            "Detected {} communities (modularity {:.4})",
            communities,
            modularity(graph, &partition, self.params.resolution)
        );

        Ok(graph
            .addresses()
            .into_iter()
            .zip(partition)
            .map(|(address, community)| CommunityAssignment {
                address: address.to_string(),
                community,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_core::{EdgeMerge, WeightedEdge};

    fn graph(edges: &[(&str, &str, u64)]) -> AddressGraph {
        let edges: Vec<WeightedEdge> = edges
            .iter()
            .map(|&(from, to, events)| WeightedEdge {
                from: from.to_string(),
                to: to.to_string(),
                events,
            })
            .collect();
        AddressGraph::from_edges(&edges, EdgeMerge::Sum)
    }

    fn two_cliques() -> AddressGraph {
        graph(&[
            ("a", "b", 5),
            ("b", "c", 5),
            ("a", "c", 5),
            ("x", "y", 5),
            ("y", "z", 5),
            ("x", "z", 5),
            ("c", "x", 1),
        ])
    }

    #[test]
    fn test_two_cliques_split() {
        let g = two_cliques();
        let detector = CommunityDetector::new(CommunityParams::default());
        let rows = detector.compute(&g).unwrap();
        let com = |addr: &str| rows.iter().find(|r| r.address == addr).unwrap().community;

        assert_eq!(rows.len(), 6);
        assert_eq!(com("a"), com("b"));
        assert_eq!(com("b"), com("c"));
        assert_eq!(com("x"), com("y"));
        assert_eq!(com("y"), com("z"));
        assert_ne!(com("a"), com("x"));
    }

    #[test]
    fn test_isolated_nodes_get_own_community() {
        let mut g = graph(&[("a", "b", 5), ("b", "c", 5), ("c", "d", 1)]);
        g.prune(3);

        let partition = CommunityDetector::new(CommunityParams::default()).partition(&g);
        assert_eq!(partition.len(), 4);
        let d = g.index_of("d").unwrap().index();
        let others = partition.iter().enumerate().filter(|&(i, &c)| i != d && c == partition[d]);
        assert_eq!(others.count(), 0);
    }

    #[test]
    fn test_edgeless_and_empty() {
        let detector = CommunityDetector::new(CommunityParams::default());
        assert!(detector.partition(&AddressGraph::new()).is_empty());

        let mut g = graph(&[("a", "b", 1), ("c", "d", 1)]);
        g.prune(3);
        assert_eq!(detector.partition(&g), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_ids_are_dense_and_deterministic() {
        let g = two_cliques();
        let detector = CommunityDetector::new(CommunityParams::default());
        let first = detector.partition(&g);
        let second = detector.partition(&g);
        assert_eq!(first, second);

        let max = *first.iter().max().unwrap();
        for c in 0..=max {
            assert!(first.contains(&c));
        }
    }

    #[test]
    fn test_modularity_values() {
        let g = two_cliques();
        // all in one community: in = m, tot = 2m → Q = 1 - 1 = 0
        assert!(modularity(&g, &[0; 6], 1.0).abs() < 1e-12);

        let split = [0, 0, 0, 1, 1, 1];
        let q = modularity(&g, &split, 1.0);
        assert!(q > 0.4, "two-clique split should have high modularity, got {}", q);

        let detected = CommunityDetector::new(CommunityParams::default()).partition(&g);
        assert!(modularity(&g, &detected, 1.0) >= q - 1e-9);
    }

    #[test]
    fn test_higher_resolution_splits_further() {
        let g = two_cliques();
        let coarse = CommunityDetector::new(CommunityParams::default()).partition(&g);
        assert_eq!(coarse.iter().max(), Some(&1));

        // at γ = 4 every join costs more than the 5-weight edge it captures
        let fine = CommunityDetector::new(CommunityParams {
            resolution: 4.0,
            ..CommunityParams::default()
        })
        .partition(&g);
        assert_eq!(fine, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_large_min_improvement_stops_after_first_level() {
        let g = two_cliques();
        let detector = CommunityDetector::new(CommunityParams {
            min_improvement: 10.0,
            ..CommunityParams::default()
        });
        // the first local-moving sweep still runs, so nodes leave singletons
        let partition = detector.partition(&g);
        assert!(partition.iter().max().copied().unwrap_or(0) < 5);
    }

    #[test]
    fn test_induced_graph_keeps_internal_weight() {
        let g = two_cliques();
        let level = LevelGraph::from_address_graph(&g);
        let induced = level.induced(&[0, 0, 0, 1, 1, 1], 2);

        assert_eq!(induced.loops, vec![15.0, 15.0]);
        assert_eq!(induced.adj[0], vec![(1, 1.0)]);
        assert!((induced.total_weight() - level.total_weight()).abs() < 1e-12);
    }
}
