//! search-sync
//!
//! Keeps Meilisearch indexes in sync with PostgreSQL through the change
//! events a CDC publisher writes to Kafka.
//!
//! # Overview
//!
//! - Streaming inserts and updates upsert one document; deletes remove it
//!   by primary key.
//! - Full-table copies (`full_begin`, rows, `full_end`) are buffered per
//!   relation and flushed as chunked batch upserts.
//! - Relations with privacy rules are indexed from an anonymized view in
//!   PostgreSQL instead of the raw row.
//! - Relations without a replica are ignored.
//!
//! # Crates
//!
//! - `cdc_types` - the replication envelope and field values
//! - `search_sink` - the `IndexWriter` trait
//! - `meilisearch_sink` - `IndexWriter` over the Meilisearch HTTP API
//! - `search_sync_kafka_source` - consumer group with redelivery
//!
//! # CLI Usage
//!
//! ```bash
//! # Validate a config file and list its replicas
//! search-sync check-config --config config.yaml
//!
//! # Run until Ctrl+C
//! RUST_LOG=info search-sync run --config config.yaml
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod keys;
pub mod privacy;
pub mod registry;
pub mod router;
pub mod testing;
pub mod tracker;
pub mod transport;

pub use batch::{BatchAccumulator, BatchState, RelationBatch, RowDisposition};
pub use config::{AppConfig, ConfigError, ConfigOpts};
pub use error::{Result, SyncError};
pub use keys::resolve_key;
pub use privacy::{build_query, AnonymizedSource, NoDatabase, PrivacyProjector};
pub use registry::{Privacy, Replica, ReplicaRegistry};
pub use router::{HandleOutcome, Router, DEFAULT_CHUNK_SIZE};
pub use tracker::{await_all, TaskSummary};
pub use transport::{run_consumers, CountingHandler};
