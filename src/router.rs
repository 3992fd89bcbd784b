//! Entry point of the engine: one replication message in, index mutations
//! out.

use std::sync::Arc;

use cdc_types::{ChangeRow, CommandType, ReplicationFlag, ReplicationMessage};
use search_sink::IndexWriter;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::batch::{BatchAccumulator, RelationBatch};
use crate::error::{Result, SyncError};
use crate::keys::resolve_key;
use crate::privacy::{AnonymizedSource, PrivacyProjector};
use crate::registry::{Replica, ReplicaRegistry};
use crate::tracker::{await_all, TaskSummary};

/// Documents per upsert when flushing a full-table batch.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// What handling a message amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Index tasks were issued and awaited
    Applied(TaskSummary),
    /// The message only changed the full-table buffer
    Buffered,
    /// Nothing to do: empty payload, unreplicated relation or empty flush
    Ignored,
}

/// Routes decoded messages to the index writer.
///
/// Generic over the writer and the anonymized view source so tests can run
/// against in-memory implementations.
pub struct Router<W: IndexWriter, A: AnonymizedSource> {
    registry: Arc<ReplicaRegistry>,
    writer: Arc<W>,
    projector: PrivacyProjector<A>,
    accumulator: Mutex<BatchAccumulator>,
    chunk_size: usize,
}

impl<W: IndexWriter, A: AnonymizedSource> Router<W, A> {
    pub fn new(registry: Arc<ReplicaRegistry>, writer: Arc<W>, source: A) -> Self {
        Self {
            registry,
            writer,
            projector: PrivacyProjector::new(source),
            accumulator: Mutex::new(BatchAccumulator::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn registry(&self) -> &ReplicaRegistry {
        &self.registry
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Decode and handle a raw payload. An empty payload is a no-op.
    pub async fn handle_message(&self, payload: &[u8]) -> Result<HandleOutcome> {
        if payload.is_empty() {
            debug!("Ignoring empty message");
            return Ok(HandleOutcome::Ignored);
        }
        let message = ReplicationMessage::from_slice(payload)?;
        self.handle(message).await
    }

    pub async fn handle(&self, message: ReplicationMessage) -> Result<HandleOutcome> {
        let flag = message.replication_flag;
        match (flag, message.command) {
            (ReplicationFlag::FullBegin, _) => {
                debug!("Full replication begins");
                self.accumulator.lock().await.begin();
                Ok(HandleOutcome::Buffered)
            }
            (ReplicationFlag::FullRow, Some(command)) => {
                let mut accumulator = self.accumulator.lock().await;
                accumulator.push(command.data, &self.registry);
                Ok(HandleOutcome::Buffered)
            }
            (ReplicationFlag::FullEnd, _) => {
                // Held across the flush so a new frame cannot start mid-write
                let mut accumulator = self.accumulator.lock().await;
                let batches = accumulator.finish();
                self.flush(batches).await
            }
            (ReplicationFlag::Streaming, Some(command)) => {
                self.handle_streaming(command.cmd_type, command.data).await
            }
            (flag, None) => Err(cdc_types::DecodeError::MissingCommand(flag).into()),
        }
    }

    /// Write every buffered batch. The buffer has already been taken, so
    /// a failure loses the unwritten rows and is reported as
    /// [`SyncError::BatchDropped`] instead of asking for a redelivery.
    async fn flush(&self, batches: Vec<RelationBatch>) -> Result<HandleOutcome> {
        if batches.is_empty() {
            info!("Full replication ended with nothing to flush");
            return Ok(HandleOutcome::Ignored);
        }

        let mut pending: usize = batches.iter().map(|b| b.rows.len()).sum();
        let mut summary = TaskSummary::default();
        for batch in &batches {
            match self.flush_batch(batch).await {
                Ok(written) => {
                    summary += written;
                    pending -= batch.rows.len();
                }
                Err(e) => {
                    error!(
                        "Full replication flush of {} failed, dropping {pending} buffered rows: {e}",
                        batch.relation
                    );
                    return Err(SyncError::BatchDropped {
                        rows: pending,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(HandleOutcome::Applied(summary))
    }

    async fn flush_batch(&self, batch: &RelationBatch) -> Result<TaskSummary> {
        let Some(replica) = self.registry.lookup(&batch.relation) else {
            return Ok(TaskSummary::default());
        };

        let mut documents = Vec::with_capacity(batch.rows.len());
        for row in &batch.rows {
            documents.extend(self.projector.documents_for(replica, row).await?);
        }
        if documents.is_empty() {
            debug!("No documents to index for {}", replica.relation);
            return Ok(TaskSummary::default());
        }

        info!(
            "Flushing {} documents of {} into index {}",
            documents.len(),
            replica.relation,
            replica.index
        );
        let handles = self
            .writer
            .upsert_batch(
                &replica.index,
                &documents,
                self.chunk_size,
                &replica.primary_key,
            )
            .await
            .map_err(SyncError::Write)?;

        await_all(self.writer.as_ref(), &handles).await
    }

    async fn handle_streaming(&self, cmd_type: CommandType, row: ChangeRow) -> Result<HandleOutcome> {
        let Some(replica) = self.registry.lookup(&row.rel_name) else {
            debug!("Ignoring {cmd_type} on unreplicated relation {}", row.rel_name);
            return Ok(HandleOutcome::Ignored);
        };
        if row.namespace != replica.namespace {
            debug!(
                "Row of {} comes from namespace {}, replica is configured for {}",
                row.rel_name, row.namespace, replica.namespace
            );
        }
        debug!("Applying {cmd_type} on {} to index {}", row.rel_name, replica.index);

        match cmd_type {
            CommandType::Insert | CommandType::Update => self.upsert(replica, &row).await,
            CommandType::Delete => self.delete(replica, &row).await,
        }
    }

    async fn upsert(&self, replica: &Replica, row: &ChangeRow) -> Result<HandleOutcome> {
        let documents = self.projector.documents_for(replica, row).await?;
        if documents.is_empty() {
            debug!("No anonymized rows for {} yet", replica.relation);
            return Ok(HandleOutcome::Ignored);
        }

        let handle = self
            .writer
            .upsert(&replica.index, &documents, &replica.primary_key)
            .await
            .map_err(SyncError::Write)?;
        Ok(HandleOutcome::Applied(
            await_all(self.writer.as_ref(), &[handle]).await?,
        ))
    }

    async fn delete(&self, replica: &Replica, row: &ChangeRow) -> Result<HandleOutcome> {
        let id = resolve_key(row, replica)?;
        let handle = self
            .writer
            .delete(&replica.index, &id)
            .await
            .map_err(SyncError::Write)?;
        Ok(HandleOutcome::Applied(
            await_all(self.writer.as_ref(), &[handle]).await?,
        ))
    }
}
