//! Weighted undirected address graph
//!
//! Wraps a petgraph `UnGraph` keyed by address. Node indices are dense
//! (`0..node_count`) and follow first appearance in the edge list, which the
//! feature passes rely on for stable row order.

use super::aggregator::WeightedEdge;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::str::FromStr;

/// How the two directed counts of one undirected pair combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMerge {
    Sum,
    Max,
    /// Later pair in the (sorted) edge list overwrites the earlier one.
    /// A pair seen 2 times each way keeps weight 2, not 4.
    #[default]
    Last,
}

impl FromStr for EdgeMerge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(EdgeMerge::Sum),
            "max" => Ok(EdgeMerge::Max),
            "last" => Ok(EdgeMerge::Last),
            _ => Err(format!("EDGE_MERGE must be sum, max or last, got '{}'", s)),
        }
    }
}

impl EdgeMerge {
    fn merge(&self, existing: u64, incoming: u64) -> u64 {
        match self {
            EdgeMerge::Sum => existing + incoming,
            EdgeMerge::Max => existing.max(incoming),
            EdgeMerge::Last => incoming,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddressGraph {
    graph: UnGraph<String, u64>,
    index: HashMap<String, NodeIndex>,
}

impl AddressGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from directed pair counts. Self loops are skipped.
    pub fn from_edges(edges: &[WeightedEdge], merge: EdgeMerge) -> Self {
        let mut graph = Self::new();
        let mut self_loops = 0usize;

        for edge in edges {
            if edge.from == edge.to {
                self_loops += 1;
                continue;
            }
            graph.add_edge(&edge.from, &edge.to, edge.events, merge);
        }

        if self_loops > 0 {
            log::debug!("Skipped {} self-loop pairs", self_loops);
        }
        graph
    }

    fn node(&mut self, address: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(address) {
            return idx;
        }
        let idx = self.graph.add_node(address.to_string());
        self.index.insert(address.to_string(), idx);
        idx
    }

    pub fn add_edge(&mut self, from: &str, to: &str, weight: u64, merge: EdgeMerge) {
        if from == to {
            return;
        }
        let a = self.node(from);
        let b = self.node(to);

        match self.graph.find_edge(a, b) {
            Some(e) => {
                let w = &mut self.graph[e];
                *w = merge.merge(*w, weight);
            }
            None => {
                self.graph.add_edge(a, b, weight);
            }
        }
    }

    /// Drop edges lighter than `min_weight`. Nodes are kept even when they
    /// end up isolated. Returns the number of removed edges.
    pub fn prune(&mut self, min_weight: u64) -> usize {
        let before = self.graph.edge_count();
        self.graph.retain_edges(|g, e| g[e] >= min_weight);
        before - self.graph.edge_count()
    }

    /// Drop degree-0 nodes, preserving the relative order of the rest.
    /// Returns the number of removed nodes.
    pub fn remove_isolates(&mut self) -> usize {
        let connected: Vec<bool> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors(n).next().is_some())
            .collect();

        let before = self.graph.node_count();
        self.graph = self.graph.filter_map(
            |n, address| connected[n.index()].then(|| address.clone()),
            |_, &w| Some(w),
        );
        self.index = self
            .graph
            .node_indices()
            .map(|n| (self.graph[n].clone(), n))
            .collect();

        before - self.graph.node_count()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Addresses in node index order
    pub fn addresses(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub fn address(&self, node: NodeIndex) -> &str {
        &self.graph[node]
    }

    pub fn index_of(&self, address: &str) -> Option<NodeIndex> {
        self.index.get(address).copied()
    }

    pub fn neighbors(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(node)
    }

    pub fn weight_between(&self, a: &str, b: &str) -> Option<u64> {
        let (a, b) = (self.index_of(a)?, self.index_of(b)?);
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.neighbors(node).count()
    }

    pub fn weighted_degree(&self, node: NodeIndex) -> u64 {
        self.graph.edges(node).map(|e| *e.weight()).sum()
    }

    pub fn total_weight(&self) -> u64 {
        self.graph.edge_weights().sum()
    }

    /// Dense adjacency lists `(neighbor index, weight)`, neighbors sorted
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        self.graph
            .node_indices()
            .map(|n| {
                let mut row: Vec<(usize, f64)> = self
                    .graph
                    .edges(n)
                    .map(|e| {
                        let other = if e.source() == n { e.target() } else { e.source() };
                        (other.index(), *e.weight() as f64)
                    })
                    .collect();
                row.sort_by_key(|&(j, _)| j);
                row
            })
            .collect()
    }

    pub fn inner(&self) -> &UnGraph<String, u64> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, events: u64) -> WeightedEdge {
        WeightedEdge {
            from: from.to_string(),
            to: to.to_string(),
            events,
        }
    }

    #[test]
    fn test_skips_self_loops() {
        let graph = AddressGraph::from_edges(&[edge("a", "a", 10), edge("a", "b", 3)], EdgeMerge::Sum);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_merge_policies() {
        let edges = [edge("a", "b", 2), edge("b", "a", 5)];

        let sum = AddressGraph::from_edges(&edges, EdgeMerge::Sum);
        assert_eq!(sum.weight_between("a", "b"), Some(7));
        assert_eq!(sum.edge_count(), 1);

        let max = AddressGraph::from_edges(&edges, EdgeMerge::Max);
        assert_eq!(max.weight_between("b", "a"), Some(5));

        let last = AddressGraph::from_edges(&[edge("a", "b", 5), edge("b", "a", 2)], EdgeMerge::Last);
        assert_eq!(last.weight_between("a", "b"), Some(2));
    }

    #[test]
    fn test_prune_keeps_nodes() {
        let mut graph = AddressGraph::from_edges(
            &[edge("a", "b", 5), edge("b", "c", 1), edge("c", "d", 3)],
            EdgeMerge::Sum,
        );

        let removed = graph.prune(3);
        assert_eq!(removed, 1);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_count(), 4);
        assert!(graph.weight_between("b", "c").is_none());
    }

    #[test]
    fn test_remove_isolates_preserves_order() {
        let mut graph = AddressGraph::from_edges(
            &[edge("a", "b", 1), edge("c", "d", 4), edge("e", "f", 4)],
            EdgeMerge::Sum,
        );
        graph.prune(3);

        let removed = graph.remove_isolates();
        assert_eq!(removed, 2);
        assert_eq!(graph.addresses(), vec!["c", "d", "e", "f"]);
        assert_eq!(graph.index_of("e").map(|n| n.index()), Some(2));
        assert!(graph.index_of("a").is_none());
        assert_eq!(graph.weight_between("e", "f"), Some(4));
    }

    #[test]
    fn test_degrees_and_adjacency() {
        let graph = AddressGraph::from_edges(
            &[edge("a", "b", 2), edge("a", "c", 3), edge("b", "c", 1)],
            EdgeMerge::Sum,
        );
        let a = graph.index_of("a").unwrap();
        assert_eq!(graph.degree(a), 2);
        assert_eq!(graph.weighted_degree(a), 5);
        assert_eq!(graph.total_weight(), 6);

        let adj = graph.adjacency();
        assert_eq!(adj[0], vec![(1, 2.0), (2, 3.0)]);
        assert_eq!(adj[2], vec![(0, 3.0), (1, 1.0)]);
    }

    #[test]
    fn test_default_merge_prunes_split_pair() {
        // 2 events each way: Last keeps 2, below the threshold of 3
        let edges = [edge("a", "b", 2), edge("b", "a", 2)];
        let mut graph = AddressGraph::from_edges(&edges, EdgeMerge::default());
        assert_eq!(graph.weight_between("a", "b"), Some(2));
        assert_eq!(graph.prune(3), 1);
        assert_eq!(graph.edge_count(), 0);

        let mut summed = AddressGraph::from_edges(&edges, EdgeMerge::Sum);
        assert_eq!(summed.prune(3), 0);
    }

    #[test]
    fn test_edge_merge_parse() {
        assert_eq!("SUM".parse::<EdgeMerge>(), Ok(EdgeMerge::Sum));
        assert_eq!(" last ".parse::<EdgeMerge>(), Ok(EdgeMerge::Last));
        assert!("mean".parse::<EdgeMerge>().unwrap_err().contains("'mean'"));
        assert_eq!(EdgeMerge::default(), EdgeMerge::Last);
    }
}
