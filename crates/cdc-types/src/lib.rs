//! Core types for search-sync.
//!
//! This crate provides the wire model shared by the transport and the
//! synchronization engine:
//!
//! - [`ReplicationMessage`] - the envelope published by the CDC producer
//! - [`ChangeRow`] - one row with fully qualified field names
//! - [`FieldValue`] - the scalar carried by every field
//! - [`Document`] and [`flatten`] - the flat shape sent to the search index
//!
//! # Example
//!
//! ```rust
//! use cdc_types::{flatten, ReplicationMessage, ReplicationFlag};
//!
//! let payload = br#"{
//!     "replicationFlag": "streaming",
//!     "command": {
//!         "cmdType": "insert",
//!         "data": {
//!             "namespace": "public",
//!             "relName": "orders",
//!             "fields": { "public.orders.id": { "content": 7 } }
//!         }
//!     }
//! }"#;
//!
//! let message = ReplicationMessage::from_slice(payload).unwrap();
//! assert_eq!(message.replication_flag, ReplicationFlag::Streaming);
//!
//! let doc = flatten(&message.command.unwrap().data);
//! assert!(doc.contains_key("id"));
//! ```

pub mod document;
pub mod message;
pub mod values;

// Re-exports for convenience
pub use document::{flatten, unqualified_name, Document};
pub use message::{
    qualified_name, ChangeRow, CommandType, DecodeError, DmlCommand, ReplicationFlag,
    ReplicationMessage,
};
pub use values::{canonical_number, Field, FieldValue};
