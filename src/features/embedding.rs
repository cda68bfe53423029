//! Node2Vec embedding pass
//!
//! Isolated addresses carry no walk context, so they are dropped before the
//! walks run and have no row in the output.

use super::node2vec::{Node2VecWalker, WalkParams};
use super::word2vec::{SkipGram, SkipGramConfig};
use super::{FeatureComputer, FeatureError};
use crate::config::EmbeddingParams;
use crate::graph_core::AddressGraph;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Instant;

/// One address and its learned vector. Serializes flat as
/// `{"address": .., "n2v_0": .., "n2v_1": .., ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEmbedding {
    pub address: String,
    pub vector: Vec<f32>,
}

impl NodeEmbedding {
    pub fn column_name(i: usize) -> String {
        format!("n2v_{}", i)
    }
}

impl Serialize for NodeEmbedding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.vector.len() + 1))?;
        map.serialize_entry("address", &self.address)?;
        for (i, v) in self.vector.iter().enumerate() {
            map.serialize_entry(&Self::column_name(i), v)?;
        }
        map.end()
    }
}

pub struct Node2VecEmbedder {
    params: EmbeddingParams,
}

impl Node2VecEmbedder {
    pub fn new(params: EmbeddingParams) -> Self {
        Self { params }
    }

    fn validate(&self) -> Result<(), FeatureError> {
        let p = &self.params;
        if p.dimensions == 0 {
            return Err(FeatureError::InvalidParameter("dimensions must be > 0".into()));
        }
        if p.walk_length < 2 {
            return Err(FeatureError::InvalidParameter("walk_length must be >= 2".into()));
        }
        if p.num_walks == 0 {
            return Err(FeatureError::InvalidParameter("num_walks must be > 0".into()));
        }
        if !(p.p > 0.0 && p.q > 0.0) {
            return Err(FeatureError::InvalidParameter(format!(
                "p and q must be positive (p={}, q={})",
                p.p, p.q
            )));
        }
        Ok(())
    }
}

impl FeatureComputer for Node2VecEmbedder {
    type Output = Vec<NodeEmbedding>;

    fn name(&self) -> &'static str {
        "embeddings"
    }

    fn compute(&self, graph: &AddressGraph) -> Result<Self::Output, FeatureError> {
        self.validate()?;

        let mut graph = graph.clone();
        let isolates = graph.remove_isolates();
        if isolates > 0 {
            log::info!("🧹 Removed {} isolated addresses before Node2Vec", isolates);
        }
        if graph.is_empty() {
            return Err(FeatureError::EmptyGraph);
        }

        let adj = graph.adjacency();
        let walker = Node2VecWalker::new(
            &adj,
            WalkParams {
                walk_length: self.params.walk_length,
                num_walks: self.params.num_walks,
                p: self.params.p,
                q: self.params.q,
                workers: self.params.workers,
                seed: self.params.seed,
            },
        );

        let started = Instant::now();
        let walks = walker.simulate_walks()?;
        log::info!(
            "🚶 Generated {} walks over {} nodes in {:.2?}",
            walks.len(),
            graph.node_count(),
            started.elapsed()
        );

        let started = Instant::now();
        let trainer = SkipGram::new(SkipGramConfig {
            dimensions: self.params.dimensions,
            window: self.params.window,
            negative: self.params.negative,
            epochs: self.params.epochs,
            seed: self.params.seed,
            ..SkipGramConfig::default()
        });
        let vectors = trainer.train(&walks, graph.node_count()).into_rows();
        log::info!(
            "🧠 Trained {}-dim embeddings in {:.2?}",
            self.params.dimensions,
            started.elapsed()
        );

        Ok(graph
            .addresses()
            .into_iter()
            .zip(vectors)
            .map(|(address, vector)| NodeEmbedding {
                address: address.to_string(),
                vector,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_core::EdgeMerge;

    fn small_params() -> EmbeddingParams {
        EmbeddingParams {
            dimensions: 8,
            walk_length: 10,
            num_walks: 4,
            workers: 2,
            epochs: 2,
            ..EmbeddingParams::default()
        }
    }

    fn graph() -> AddressGraph {
        let mut graph = AddressGraph::new();
        graph.add_edge("a", "b", 5, EdgeMerge::Sum);
        graph.add_edge("b", "c", 4, EdgeMerge::Sum);
        graph.add_edge("c", "a", 3, EdgeMerge::Sum);
        graph.add_edge("lonely", "d", 1, EdgeMerge::Sum);
        graph.prune(3);
        graph
    }

    #[test]
    fn test_isolates_have_no_embedding() {
        let rows = Node2VecEmbedder::new(small_params()).compute(&graph()).unwrap();
        let addresses: Vec<&str> = rows.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["a", "b", "c"]);
        assert!(rows.iter().all(|r| r.vector.len() == 8));
    }

    #[test]
    fn test_edgeless_graph_is_empty() {
        let mut graph = AddressGraph::new();
        graph.add_edge("a", "b", 1, EdgeMerge::Sum);
        graph.prune(3);

        let result = Node2VecEmbedder::new(small_params()).compute(&graph);
        assert!(matches!(result, Err(FeatureError::EmptyGraph)));
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let params = EmbeddingParams {
            dimensions: 0,
            ..small_params()
        };
        let result = Node2VecEmbedder::new(params).compute(&graph());
        assert!(matches!(result, Err(FeatureError::InvalidParameter(_))));
    }

    #[test]
    fn test_serializes_flat_columns() {
        let row = NodeEmbedding {
            address: "0xabc".to_string(),
            vector: vec![0.5, -1.0],
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["address"], "0xabc");
        assert_eq!(value["n2v_0"], 0.5);
        assert_eq!(value["n2v_1"], -1.0);
        assert!(value.get("vector").is_none());
    }

    #[test]
    fn test_deterministic_with_seed() {
        let a = Node2VecEmbedder::new(small_params()).compute(&graph()).unwrap();
        let b = Node2VecEmbedder::new(small_params()).compute(&graph()).unwrap();
        assert_eq!(a, b);
    }
}
