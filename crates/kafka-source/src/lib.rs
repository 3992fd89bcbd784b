//! Kafka transport for search-sync.
//!
//! Delivers the raw payload of every record on the replication topic to a
//! [`MessageHandler`] and owns redelivery: the engine never retries on its
//! own, it only tells the transport whether a failure is worth another try.
//!
//! Features:
//!
//! - Consumer Groups: Spawn multiple consumers in the same consumer group
//! - Manual Offsets: A record is committed only once its delivery settled
//! - Bounded Redelivery: Requeued messages are retried with a linear backoff

/// High-level API for spawning consumer tasks
///
/// Takes the consumer config and a handler, to create one or more consumers
/// in the same consumer group, each running in its own async task.
pub mod client;

/// Low-level consumer with manual offsets
pub mod consumer;
pub mod error;
pub mod handler;

pub use client::{deliver, Client, Delivery};
pub use consumer::{Consumer, ConsumerConfig, Message};
pub use error::{Error, Result};
pub use handler::{HandlerError, MessageHandler};
