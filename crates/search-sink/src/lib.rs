//! Search index writer abstraction.
//!
//! This crate defines the `IndexWriter` trait that the synchronization
//! engine writes through. `meilisearch-sink` implements it over HTTP; tests
//! implement it in memory.
//!
//! Every mutation is asynchronous on the search engine side: the call
//! returns as soon as the operation is enqueued, with a [`TaskHandle`] that
//! is later resolved through [`IndexWriter::wait_for_task`].

mod task;
mod traits;

pub use task::{TaskError, TaskHandle, TaskInfo, TaskStatus};
pub use traits::{chunk_documents, IndexWriter};
