//! Output Core - persistence of feature tables
//!
//! ```text
//! FeatureWriter (enum, routed by BackendType)
//!     ├── JsonlFeatureWriter  → <dir>/addresses_community.jsonl, ...
//!     └── SqliteFeatureWriter → address_communities, network_metrics, ...
//! ```

pub mod jsonl_writer;
pub mod sqlite_writer;
pub mod writer;
pub mod writer_backend;

pub use jsonl_writer::JsonlFeatureWriter;
pub use sqlite_writer::SqliteFeatureWriter;
pub use writer::{BackendType, FeatureWriter};
pub use writer_backend::{FeatureTable, FeatureWriterBackend, FeatureWriterError};
