//! Feature run configuration from environment variables
//!
//! Loaded from `.env` (if present) and the process environment with defaults
//! that reproduce the reference feature set.

use crate::graph_core::EdgeMerge;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Jsonl,
    Sqlite,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Louvain parameters
#[derive(Debug, Clone)]
pub struct CommunityParams {
    pub resolution: f64,
    /// Smallest modularity gain that counts as progress
    pub min_improvement: f64,
    pub seed: u64,
}

impl Default for CommunityParams {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            min_improvement: 1e-7,
            seed: 42,
        }
    }
}

/// PageRank / eigenvector iteration parameters
#[derive(Debug, Clone)]
pub struct CentralityParams {
    pub alpha: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for CentralityParams {
    fn default() -> Self {
        Self {
            alpha: 0.85,
            max_iter: 100,
            tolerance: 1e-6,
        }
    }
}

/// Node2Vec walk + skip-gram parameters
#[derive(Debug, Clone)]
pub struct EmbeddingParams {
    pub dimensions: usize,
    pub walk_length: usize,
    pub num_walks: usize,
    pub workers: usize,
    pub p: f64,
    pub q: f64,
    pub window: usize,
    pub negative: usize,
    pub epochs: usize,
    pub seed: u64,
}

impl Default for EmbeddingParams {
    fn default() -> Self {
        Self {
            dimensions: 64,
            walk_length: 30,
            num_walks: 10,
            workers: 4,
            p: 1.0,
            q: 1.0,
            window: 10,
            negative: 5,
            epochs: 3,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub input: InputSource,
    pub transactions_path: PathBuf,
    pub dex_swaps_path: PathBuf,
    pub token_transfers_path: PathBuf,
    pub events_db_path: PathBuf,
    /// JSONL output directory or SQLite database file, depending on backend
    pub output_path: PathBuf,
    /// Empty = union of all networks
    pub networks: Vec<String>,
    pub min_edge_weight: u64,
    pub edge_merge: EdgeMerge,
    pub community: CommunityParams,
    pub centrality: CentralityParams,
    pub embedding: EmbeddingParams,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            input: InputSource::Jsonl,
            transactions_path: PathBuf::from("data/raw/transactions.jsonl"),
            dex_swaps_path: PathBuf::from("data/raw/dex_swaps.jsonl"),
            token_transfers_path: PathBuf::from("data/raw/token_transfers.jsonl"),
            events_db_path: PathBuf::from("data/raw/events.db"),
            output_path: PathBuf::from("data/processed"),
            networks: Vec::new(),
            min_edge_weight: 3,
            edge_merge: EdgeMerge::Last,
            community: CommunityParams::default(),
            centrality: CentralityParams::default(),
            embedding: EmbeddingParams::default(),
        }
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn path_or(key: &str, default: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(default)
}

impl GraphConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `WALLETGRAPH_INPUT` (jsonl | sqlite, default: jsonl)
    /// - `TRANSACTIONS_PATH`, `DEX_SWAPS_PATH`, `TOKEN_TRANSFERS_PATH`
    /// - `EVENTS_DB_PATH` (default: data/raw/events.db)
    /// - `FEATURES_OUTPUT_PATH` (default: data/processed)
    /// - `NETWORKS` (comma-separated, default: all)
    /// - `MIN_EDGE_WEIGHT` (default: 3)
    /// - `EDGE_MERGE` (sum | max | last, default: last)
    /// - `LOUVAIN_RESOLUTION`, `LOUVAIN_MIN_IMPROVEMENT`, `LOUVAIN_SEED`
    /// - `PAGERANK_ALPHA`, `CENTRALITY_MAX_ITER`
    /// - `N2V_DIMENSIONS`, `N2V_WALK_LENGTH`, `N2V_NUM_WALKS`, `N2V_WORKERS`,
    ///   `N2V_P`, `N2V_Q`, `N2V_WINDOW`, `N2V_NEGATIVE`, `N2V_EPOCHS`, `N2V_SEED`
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let input = match env::var("WALLETGRAPH_INPUT")
            .unwrap_or_else(|_| "jsonl".to_string())
            .to_lowercase()
            .as_str()
        {
            "jsonl" => InputSource::Jsonl,
            "sqlite" => InputSource::Sqlite,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "WALLETGRAPH_INPUT must be jsonl or sqlite, got '{}'",
                    other
                )))
            }
        };

        let edge_merge = match env::var("EDGE_MERGE") {
            Ok(s) => s.parse::<EdgeMerge>().map_err(ConfigError::InvalidValue)?,
            Err(_) => defaults.edge_merge,
        };

        let networks = env::var("NETWORKS")
            .map(|s| {
                s.split(',')
                    .map(|n| n.trim().to_lowercase())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let d = &defaults.embedding;
        let embedding = EmbeddingParams {
            dimensions: parsed_or("N2V_DIMENSIONS", d.dimensions),
            walk_length: parsed_or("N2V_WALK_LENGTH", d.walk_length),
            num_walks: parsed_or("N2V_NUM_WALKS", d.num_walks),
            workers: parsed_or("N2V_WORKERS", d.workers),
            p: parsed_or("N2V_P", d.p),
            q: parsed_or("N2V_Q", d.q),
            window: parsed_or("N2V_WINDOW", d.window),
            negative: parsed_or("N2V_NEGATIVE", d.negative),
            epochs: parsed_or("N2V_EPOCHS", d.epochs),
            seed: parsed_or("N2V_SEED", d.seed),
        };

        let config = Self {
            input,
            transactions_path: path_or("TRANSACTIONS_PATH", defaults.transactions_path.clone()),
            dex_swaps_path: path_or("DEX_SWAPS_PATH", defaults.dex_swaps_path.clone()),
            token_transfers_path: path_or(
                "TOKEN_TRANSFERS_PATH",
                defaults.token_transfers_path.clone(),
            ),
            events_db_path: path_or("EVENTS_DB_PATH", defaults.events_db_path.clone()),
            output_path: path_or("FEATURES_OUTPUT_PATH", defaults.output_path.clone()),
            networks,
            min_edge_weight: parsed_or("MIN_EDGE_WEIGHT", defaults.min_edge_weight),
            edge_merge,
            community: CommunityParams {
                resolution: parsed_or("LOUVAIN_RESOLUTION", defaults.community.resolution),
                min_improvement: parsed_or(
                    "LOUVAIN_MIN_IMPROVEMENT",
                    defaults.community.min_improvement,
                ),
                seed: parsed_or("LOUVAIN_SEED", defaults.community.seed),
            },
            centrality: CentralityParams {
                alpha: parsed_or("PAGERANK_ALPHA", defaults.centrality.alpha),
                max_iter: parsed_or("CENTRALITY_MAX_ITER", defaults.centrality.max_iter),
                tolerance: defaults.centrality.tolerance,
            },
            embedding,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.embedding;
        if e.dimensions == 0 || e.walk_length == 0 || e.num_walks == 0 || e.window == 0 {
            return Err(ConfigError::InvalidValue(
                "N2V_DIMENSIONS, N2V_WALK_LENGTH, N2V_NUM_WALKS and N2V_WINDOW must be positive"
                    .to_string(),
            ));
        }
        if e.p <= 0.0 || e.q <= 0.0 {
            return Err(ConfigError::InvalidValue("N2V_P and N2V_Q must be > 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.centrality.alpha) {
            return Err(ConfigError::InvalidValue(
                "PAGERANK_ALPHA must be in [0, 1)".to_string(),
            ));
        }
        if self.community.resolution <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "LOUVAIN_RESOLUTION must be > 0".to_string(),
            ));
        }
        if self.community.min_improvement < 0.0 {
            return Err(ConfigError::InvalidValue(
                "LOUVAIN_MIN_IMPROVEMENT must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}
