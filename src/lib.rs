//! walletgraph - address interaction graph features for wallet labeling
//!
//! ```text
//! JSONL / SQLite events → EventAggregator → AddressGraph (prune)
//!     ↓
//! CommunityDetector | CentralitySuite | Node2VecEmbedder
//!     ↓
//! FeatureWriter → JSONL or SQLite backend
//! ```

pub mod config;
pub mod engine;
pub mod features;
pub mod graph_core;
pub mod ingest_core;
pub mod output_core;
pub mod sqlite_pragma;

pub use config::{ConfigError, GraphConfig, InputSource};
pub use engine::{EngineError, FeatureEngine, FeaturePass, RunReport};
