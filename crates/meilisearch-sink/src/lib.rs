//! Meilisearch implementation of [`search_sink::IndexWriter`].
//!
//! Talks to the Meilisearch REST API with `reqwest`:
//!
//! - `POST /indexes/{index}/documents?primaryKey={pk}` to add or replace
//! - `DELETE /indexes/{index}/documents/{id}` to remove
//! - `GET /tasks/{uid}` to follow an enqueued task
//! - `GET /version` as a reachability check

mod client;
mod sink_impl;

pub use client::{MeilisearchConfig, MeilisearchSink, VersionInfo, DEFAULT_POLL_INTERVAL};
