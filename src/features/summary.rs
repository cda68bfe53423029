//! Summary statistics for logging finished passes

use super::centrality::NodeMetrics;
use super::community::CommunityAssignment;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl std::fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<24} min={:.6} mean={:.6} median={:.6} max={:.6}",
            self.column, self.min, self.mean, self.median, self.max
        )
    }
}

/// None for an empty column
pub fn summarize(column: &'static str, values: &[f64]) -> Option<ColumnSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    Some(ColumnSummary {
        column,
        min: sorted[0],
        mean: sorted.iter().sum::<f64>() / n as f64,
        median,
        max: sorted[n - 1],
    })
}

/// One summary per metric column, in output column order
pub fn summarize_metrics(rows: &[NodeMetrics]) -> Vec<ColumnSummary> {
    let columns: [(&'static str, fn(&NodeMetrics) -> f64); 6] = [
        ("degree", |m| m.degree as f64),
        ("degree_centrality", |m| m.degree_centrality),
        ("pagerank", |m| m.pagerank),
        ("eigenvector_centrality", |m| m.eigenvector_centrality),
        ("clustering_coefficient", |m| m.clustering_coefficient),
        ("core_number", |m| m.core_number as f64),
    ];

    columns
        .iter()
        .filter_map(|&(name, get)| {
            let values: Vec<f64> = rows.iter().map(|m| get(m)).collect();
            summarize(name, &values)
        })
        .collect()
}

/// `(community, size)` largest first, ties by community id, at most `top`
pub fn community_sizes(assignments: &[CommunityAssignment], top: usize) -> Vec<(u32, usize)> {
    let mut sizes: HashMap<u32, usize> = HashMap::new();
    for a in assignments {
        *sizes.entry(a.community).or_insert(0) += 1;
    }

    let mut sizes: Vec<(u32, usize)> = sizes.into_iter().collect();
    sizes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    sizes.truncate(top);
    sizes
}
