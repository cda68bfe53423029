//! Graph Core - event aggregation and graph construction
//!
//! ```text
//! EventTables → EventAggregator (group by directed pair)
//!     ↓
//! AddressGraph::from_edges (undirected, self loops dropped)
//!     ↓
//! prune(min_weight)
//! ```

pub mod aggregator;
pub mod builder;

pub use aggregator::{AggregationStats, Event, EventAggregator, EventKind, WeightedEdge};
pub use builder::{AddressGraph, EdgeMerge};
