//! In-memory collaborators for exercising the engine without Meilisearch
//! or PostgreSQL.
//!
//! Used by the unit tests and by the integration tests under `tests/`.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use cdc_types::Document;
use search_sink::{IndexWriter, TaskError, TaskHandle, TaskInfo, TaskStatus};

use crate::privacy::AnonymizedSource;

/// One call observed by [`RecordingWriter`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriterCall {
    Upsert {
        index: String,
        documents: Vec<Document>,
        primary_key: String,
    },
    /// One whole `upsert_batch`, before chunking
    UpsertBatch {
        index: String,
        documents: Vec<Document>,
        chunk_size: usize,
        primary_key: String,
    },
    Delete {
        index: String,
        document_id: String,
    },
}

#[derive(Debug, Default)]
struct WriterState {
    calls: Vec<WriterCall>,
    next_uid: u64,
    failing_tasks: HashSet<TaskHandle>,
    fail_submit: bool,
    fail_wait: bool,
}

/// Index writer that records every call and resolves tasks immediately.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    state: Mutex<WriterState>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert, batch and delete in call order. The chunk upserts
    /// issued by a batch are not listed separately.
    pub fn calls(&self) -> Vec<WriterCall> {
        self.lock().calls.clone()
    }

    /// Make `handle` resolve as a failed task.
    pub fn fail_task(&self, handle: TaskHandle) {
        self.lock().failing_tasks.insert(handle);
    }

    /// Make every later submission fail.
    pub fn fail_submits(&self) {
        self.lock().fail_submit = true;
    }

    /// Make every later wait fail.
    pub fn fail_waits(&self) {
        self.lock().fail_wait = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn submit(&self, call: Option<WriterCall>) -> Result<TaskHandle> {
        let mut state = self.lock();
        if state.fail_submit {
            bail!("index writer rejected the request");
        }
        if let Some(call) = call {
            state.calls.push(call);
        }
        let handle = TaskHandle(state.next_uid);
        state.next_uid += 1;
        Ok(handle)
    }
}

#[async_trait]
impl IndexWriter for RecordingWriter {
    async fn upsert(
        &self,
        index: &str,
        documents: &[Document],
        primary_key: &str,
    ) -> Result<TaskHandle> {
        self.submit(Some(WriterCall::Upsert {
            index: index.to_string(),
            documents: documents.to_vec(),
            primary_key: primary_key.to_string(),
        }))
    }

    async fn delete(&self, index: &str, document_id: &str) -> Result<TaskHandle> {
        self.submit(Some(WriterCall::Delete {
            index: index.to_string(),
            document_id: document_id.to_string(),
        }))
    }

    async fn wait_for_task(&self, handle: TaskHandle) -> Result<TaskInfo> {
        let state = self.lock();
        if state.fail_wait {
            bail!("task status unavailable");
        }
        let failed = state.failing_tasks.contains(&handle);
        Ok(TaskInfo {
            uid: handle,
            status: if failed {
                TaskStatus::Failed
            } else {
                TaskStatus::Succeeded
            },
            kind: Some("documentAdditionOrUpdate".to_string()),
            index_uid: None,
            error: failed.then(|| TaskError {
                message: "simulated failure".to_string(),
                code: "internal".to_string(),
                error_type: "internal".to_string(),
                link: None,
            }),
        })
    }

    async fn upsert_batch(
        &self,
        index: &str,
        documents: &[Document],
        chunk_size: usize,
        primary_key: &str,
    ) -> Result<Vec<TaskHandle>> {
        {
            let mut state = self.lock();
            if state.fail_submit {
                bail!("index writer rejected the request");
            }
            state.calls.push(WriterCall::UpsertBatch {
                index: index.to_string(),
                documents: documents.to_vec(),
                chunk_size,
                primary_key: primary_key.to_string(),
            });
        }
        search_sink::chunk_documents(documents, chunk_size)
            .map(|_| self.submit(None))
            .collect()
    }
}

/// Anonymized view source returning a fixed result and recording the SQL
/// it was asked to run.
#[derive(Debug, Default)]
pub struct StaticAnonymizedSource {
    rows: Vec<Document>,
    queries: Mutex<Vec<String>>,
}

impl StaticAnonymizedSource {
    pub fn new(rows: Vec<Document>) -> Self {
        Self {
            rows,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AnonymizedSource for StaticAnonymizedSource {
    async fn query_documents(&self, sql: &str) -> Result<Vec<Document>> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql.to_string());
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_is_recorded_once() {
        let writer = RecordingWriter::new();
        let docs = vec![Document::new(); 5];

        let handles = writer.upsert_batch("orders", &docs, 2, "id").await.unwrap();

        assert_eq!(handles, vec![TaskHandle(0), TaskHandle(1), TaskHandle(2)]);
        assert_eq!(writer.calls().len(), 1);
    }
}
