//! Implementation of IndexWriter for Meilisearch.

use anyhow::{Context, Result};
use cdc_types::Document;
use reqwest::Method;
use search_sink::{IndexWriter, TaskHandle, TaskInfo};
use tokio::time::sleep;

use crate::client::MeilisearchSink;

#[async_trait::async_trait]
impl IndexWriter for MeilisearchSink {
    async fn upsert(
        &self,
        index: &str,
        documents: &[Document],
        primary_key: &str,
    ) -> Result<TaskHandle> {
        let request = self
            .request(Method::POST, &["indexes", index, "documents"])?
            .query(&[("primaryKey", primary_key)])
            .json(documents);

        let handle = self.enqueue(request).await?;
        tracing::debug!(
            "Enqueued upsert of {} documents into {index} as task {handle}",
            documents.len()
        );
        Ok(handle)
    }

    async fn delete(&self, index: &str, document_id: &str) -> Result<TaskHandle> {
        let request = self.request(
            Method::DELETE,
            &["indexes", index, "documents", document_id],
        )?;

        let handle = self.enqueue(request).await?;
        tracing::debug!("Enqueued delete of {document_id} from {index} as task {handle}");
        Ok(handle)
    }

    async fn wait_for_task(&self, handle: TaskHandle) -> Result<TaskInfo> {
        let uid = handle.to_string();
        loop {
            let response = self.send(self.request(Method::GET, &["tasks", &uid])?).await?;
            let task: TaskInfo = response
                .json()
                .await
                .with_context(|| format!("Failed to decode status of task {handle}"))?;

            if task.status.is_terminal() {
                return Ok(task);
            }

            tracing::trace!("Task {handle} is {}, polling again", task.status);
            sleep(self.poll_interval).await;
        }
    }
}
