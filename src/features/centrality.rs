//! Classical centrality suite
//!
//! Cheap per-node metrics over the pruned graph: degree, normalised degree,
//! weighted PageRank, eigenvector centrality, local clustering and k-core
//! shell index. Iterative metrics that fail to converge fall back to 0.0 for
//! every node instead of failing the pass.

use super::{FeatureComputer, FeatureError};
use crate::config::CentralityParams;
use crate::graph_core::AddressGraph;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub address: String,
    pub degree: u32,
    pub degree_centrality: f64,
    pub pagerank: f64,
    pub eigenvector_centrality: f64,
    pub clustering_coefficient: f64,
    pub core_number: u32,
}

type Adjacency = [Vec<(usize, f64)>];

/// Normalised degree; every node scores 1.0 on graphs with at most one node
pub fn degree_centrality(adj: &Adjacency) -> Vec<f64> {
    let n = adj.len();
    if n <= 1 {
        return vec![1.0; n];
    }
    let others = (n - 1) as f64;
    adj.iter().map(|row| row.len() as f64 / others).collect()
}

/// Weighted PageRank by power iteration with uniform teleport.
/// Mass of dangling (degree-0) nodes is spread uniformly.
pub fn pagerank(adj: &Adjacency, alpha: f64, max_iter: usize, tol: f64) -> Result<Vec<f64>, FeatureError> {
    let n = adj.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let uniform = 1.0 / n as f64;
    let out_weight: Vec<f64> = adj.iter().map(|row| row.iter().map(|&(_, w)| w).sum()).collect();
    let dangling: Vec<usize> = (0..n).filter(|&i| out_weight[i] == 0.0).collect();

    let mut x = vec![uniform; n];
    for _ in 0..max_iter {
        let danglesum: f64 = alpha * dangling.iter().map(|&i| x[i]).sum::<f64>();
        let base = danglesum * uniform + (1.0 - alpha) * uniform;
        let mut next = vec![base; n];

        for (i, row) in adj.iter().enumerate() {
            if out_weight[i] == 0.0 {
                continue;
            }
            let share = alpha * x[i] / out_weight[i];
            for &(j, w) in row {
                next[j] += share * w;
            }
        }

        let err: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        if err < n as f64 * tol {
            return Ok(x);
        }
    }

    Err(FeatureError::NotConverged {
        metric: "pagerank",
        iterations: max_iter,
    })
}

/// Unweighted eigenvector centrality, power iteration on (A + I)
pub fn eigenvector_centrality(adj: &Adjacency, max_iter: usize, tol: f64) -> Result<Vec<f64>, FeatureError> {
    let n = adj.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..max_iter {
        let mut next = x.clone();
        for (i, row) in adj.iter().enumerate() {
            for &(j, _) in row {
                next[j] += x[i];
            }
        }

        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for v in next.iter_mut() {
            *v /= norm;
        }

        let err: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
        x = next;
        if err < n as f64 * tol {
            return Ok(x);
        }
    }

    Err(FeatureError::NotConverged {
        metric: "eigenvector_centrality",
        iterations: max_iter,
    })
}

/// Unweighted local clustering coefficient
pub fn clustering(adj: &Adjacency) -> Vec<f64> {
    let n = adj.len();
    let mut mark = vec![usize::MAX; n];

    (0..n)
        .map(|v| {
            let d = adj[v].len();
            if d < 2 {
                return 0.0;
            }
            for &(u, _) in &adj[v] {
                mark[u] = v;
            }
            // each triangle edge seen from both endpoints
            let mut links = 0usize;
            for &(u, _) in &adj[v] {
                links += adj[u].iter().filter(|&&(w, _)| mark[w] == v).count();
            }
            links as f64 / (d * (d - 1)) as f64
        })
        .collect()
}

/// k-core shell index (Batagelj–Zaversnik bucket algorithm)
pub fn core_number(adj: &Adjacency) -> Vec<u32> {
    let n = adj.len();
    if n == 0 {
        return Vec::new();
    }

    let mut deg: Vec<usize> = adj.iter().map(|row| row.len()).collect();
    let max_deg = deg.iter().copied().max().unwrap_or(0);

    let mut bin = vec![0usize; max_deg + 1];
    for &d in &deg {
        bin[d] += 1;
    }
    let mut start = 0;
    for b in bin.iter_mut() {
        let count = *b;
        *b = start;
        start += count;
    }

    let mut pos = vec![0usize; n];
    let mut vert = vec![0usize; n];
    for v in 0..n {
        pos[v] = bin[deg[v]];
        vert[pos[v]] = v;
        bin[deg[v]] += 1;
    }
    for d in (1..=max_deg).rev() {
        bin[d] = bin[d - 1];
    }
    bin[0] = 0;

    for i in 0..n {
        let v = vert[i];
        for &(u, _) in &adj[v] {
            if deg[u] > deg[v] {
                let du = deg[u];
                let pu = pos[u];
                let pw = bin[du];
                let w = vert[pw];
                if u != w {
                    pos[u] = pw;
                    vert[pu] = w;
                    pos[w] = pu;
                    vert[pw] = u;
                }
                bin[du] += 1;
                deg[u] -= 1;
            }
        }
    }

    deg.into_iter().map(|d| d as u32).collect()
}

pub struct CentralitySuite {
    params: CentralityParams,
}

impl CentralitySuite {
    pub fn new(params: CentralityParams) -> Self {
        Self { params }
    }

    fn or_zeros(result: Result<Vec<f64>, FeatureError>, n: usize) -> Vec<f64> {
        match result {
            Ok(values) => values,
            Err(e) => {
                log::warn!("{}. Filling column with 0.0", e);
                vec![0.0; n]
            }
        }
    }
}

impl FeatureComputer for CentralitySuite {
    type Output = Vec<NodeMetrics>;

    fn name(&self) -> &'static str {
        "metrics"
    }

    fn compute(&self, graph: &AddressGraph) -> Result<Self::Output, FeatureError> {
        let adj = graph.adjacency();
        let n = adj.len();
        let p = &self.params;

        let start = Instant::now();
        let degree_c = degree_centrality(&adj);
        log::info!("Degree centrality computed in {:.2}s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        let pr = Self::or_zeros(pagerank(&adj, p.alpha, p.max_iter, p.tolerance), n);
        log::info!("PageRank computed in {:.2}s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        let eig = Self::or_zeros(eigenvector_centrality(&adj, p.max_iter, p.tolerance), n);
        log::info!("Eigenvector centrality computed in {:.2}s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        let cc = clustering(&adj);
        log::info!("Clustering coefficient computed in {:.2}s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        let cores = core_number(&adj);
        log::info!("Core number computed in {:.2}s", start.elapsed().as_secs_f64());

        Ok(graph
            .addresses()
            .into_iter()
            .enumerate()
            .map(|(i, address)| NodeMetrics {
                address: address.to_string(),
                degree: adj[i].len() as u32,
                degree_centrality: degree_c[i],
                pagerank: pr[i],
                eigenvector_centrality: eig[i],
                clustering_coefficient: cc[i],
                core_number: cores[i],
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

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_star_graph() {
        // hub h with leaves l1..l3
        let g = graph(&[("h", "l1", 3), ("h", "l2", 3), ("h", "l3", 3)]);
        let adj = g.adjacency();

        assert_eq!(degree_centrality(&adj), vec![1.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(clustering(&adj), vec![0.0; 4]);
        assert_eq!(core_number(&adj), vec![1; 4]);

        let pr = pagerank(&adj, 0.85, 100, 1e-6).unwrap();
        assert!(approx(pr.iter().sum::<f64>(), 1.0));
        assert!(pr[0] > pr[1]);
        assert!(approx(pr[1], pr[2]));

        let eig = eigenvector_centrality(&adj, 100, 1e-6).unwrap();
        // principal eigenvector of the star: hub = 1/√2, leaves = 1/√6
        assert!(approx(eig[0], 1.0 / 2f64.sqrt()));
        assert!(approx(eig[1], 1.0 / 6f64.sqrt()));
    }

    #[test]
    fn test_pagerank_uses_weights() {
        let g = graph(&[("a", "b", 10), ("a", "c", 1)]);
        let pr = pagerank(&g.adjacency(), 0.85, 100, 1e-6).unwrap();
        assert!(pr[1] > pr[2], "heavier edge should attract more rank");
    }

    #[test]
    fn test_pagerank_dangling_nodes() {
        let mut g = graph(&[("a", "b", 5), ("c", "d", 1)]);
        g.prune(3);
        let pr = pagerank(&g.adjacency(), 0.85, 100, 1e-6).unwrap();

        assert!(approx(pr.iter().sum::<f64>(), 1.0));
        assert!(approx(pr[2], pr[3]));
        assert!(pr[0] > pr[2]);
    }

    #[test]
    fn test_pagerank_not_converged() {
        let g = graph(&[("a", "b", 5), ("b", "c", 1)]);
        let result = pagerank(&g.adjacency(), 0.85, 1, 1e-12);
        assert!(matches!(result, Err(FeatureError::NotConverged { metric: "pagerank", .. })));
    }

    #[test]
    fn test_triangle_with_tail() {
        let g = graph(&[("a", "b", 3), ("b", "c", 3), ("a", "c", 3), ("c", "d", 3)]);
        let adj = g.adjacency();

        let cc = clustering(&adj);
        assert!(approx(cc[0], 1.0));
        assert!(approx(cc[2], 1.0 / 3.0));
        assert_eq!(cc[3], 0.0);

        assert_eq!(core_number(&adj), vec![2, 2, 2, 1]);
    }

    #[test]
    fn test_core_number_isolated() {
        let mut g = graph(&[("a", "b", 3), ("c", "d", 1)]);
        g.prune(3);
        assert_eq!(core_number(&g.adjacency()), vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_single_node_degree_centrality() {
        assert_eq!(degree_centrality(&[Vec::new()]), vec![1.0]);
        assert!(degree_centrality(&[]).is_empty());
    }

    #[test]
    fn test_suite_rows() {
        let g = graph(&[("a", "b", 3), ("b", "c", 3), ("a", "c", 3)]);
        let rows = CentralitySuite::new(CentralityParams::default()).compute(&g).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].address, "a");
        for row in &rows {
            assert_eq!(row.degree, 2);
            assert!(approx(row.degree_centrality, 1.0));
            assert!(approx(row.pagerank, 1.0 / 3.0));
            assert!(approx(row.clustering_coefficient, 1.0));
            assert_eq!(row.core_number, 2);
        }
    }

    #[test]
    fn test_suite_fills_zeros_on_non_convergence() {
        let g = graph(&[("a", "b", 5), ("b", "c", 1)]);
        let params = CentralityParams {
            max_iter: 1,
            tolerance: 1e-15,
            ..Default::default()
        };
        let rows = CentralitySuite::new(params).compute(&g).unwrap();
        assert!(rows.iter().all(|r| r.pagerank == 0.0));
        assert!(rows.iter().all(|r| r.eigenvector_centrality == 0.0));
        assert_eq!(rows[1].degree, 2);
    }
}
