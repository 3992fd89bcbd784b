//! IndexWriter trait definition.

use anyhow::Result;
use cdc_types::Document;

use crate::task::{TaskHandle, TaskInfo};

/// Trait for writing documents to a search index.
///
/// Mutations are enqueued and return a [`TaskHandle`]; they are not
/// complete until [`IndexWriter::wait_for_task`] reports a terminal status.
///
/// # Usage Pattern
///
/// The engine is generic over the writer for static dispatch:
///
/// ```ignore
/// pub struct Router<W: IndexWriter> { writer: Arc<W>, .. }
///
/// let handle = writer.upsert("orders", &[doc], "id").await?;
/// let task = writer.wait_for_task(handle).await?;
/// ```
#[async_trait::async_trait]
pub trait IndexWriter: Send + Sync {
    /// Create or replace documents, identified by their `primary_key` field.
    async fn upsert(
        &self,
        index: &str,
        documents: &[Document],
        primary_key: &str,
    ) -> Result<TaskHandle>;

    /// Remove a document by id. Removing an absent document succeeds.
    async fn delete(&self, index: &str, document_id: &str) -> Result<TaskHandle>;

    /// Block until the task reaches a terminal status.
    async fn wait_for_task(&self, handle: TaskHandle) -> Result<TaskInfo>;

    /// Upsert `documents` in chunks of at most `chunk_size`, one task per
    /// chunk, issued in order.
    ///
    /// Chunks complete independently; the returned handles are in issue
    /// order, not completion order.
    async fn upsert_batch(
        &self,
        index: &str,
        documents: &[Document],
        chunk_size: usize,
        primary_key: &str,
    ) -> Result<Vec<TaskHandle>> {
        let mut handles = Vec::new();
        for chunk in chunk_documents(documents, chunk_size) {
            handles.push(self.upsert(index, chunk, primary_key).await?);
        }
        Ok(handles)
    }
}

/// Split documents into chunks of at most `chunk_size` (zero is treated as
/// one).
pub fn chunk_documents(
    documents: &[Document],
    chunk_size: usize,
) -> std::slice::Chunks<'_, Document> {
    documents.chunks(chunk_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use cdc_types::FieldValue;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingWriter {
        upserts: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl IndexWriter for CountingWriter {
        async fn upsert(
            &self,
            _index: &str,
            documents: &[Document],
            _primary_key: &str,
        ) -> Result<TaskHandle> {
            let mut upserts = self.upserts.lock().unwrap();
            upserts.push(documents.len());
            Ok(TaskHandle(upserts.len() as u64))
        }

        async fn delete(&self, _index: &str, _document_id: &str) -> Result<TaskHandle> {
            anyhow::bail!("not used")
        }

        async fn wait_for_task(&self, handle: TaskHandle) -> Result<TaskInfo> {
            Ok(TaskInfo {
                uid: handle,
                status: TaskStatus::Succeeded,
                kind: None,
                index_uid: None,
                error: None,
            })
        }
    }

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::from([("id".to_string(), FieldValue::from(i as i64))]))
            .collect()
    }

    #[tokio::test]
    async fn test_upsert_batch_chunks_in_order() {
        let writer = CountingWriter::default();
        let handles = writer.upsert_batch("idx", &docs(5), 2, "id").await.unwrap();

        assert_eq!(handles, vec![TaskHandle(1), TaskHandle(2), TaskHandle(3)]);
        assert_eq!(*writer.upserts.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_upsert_batch_empty_issues_nothing() {
        let writer = CountingWriter::default();
        let handles = writer.upsert_batch("idx", &[], 10, "id").await.unwrap();
        assert!(handles.is_empty());
        assert!(writer.upserts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_chunk_size_zero_is_one() {
        assert_eq!(chunk_documents(&docs(3), 0).count(), 3);
    }
}
