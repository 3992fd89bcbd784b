//! Glue between the Kafka consumer group and the router.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use search_sink::IndexWriter;
use search_sync_kafka_source::{Client, HandlerError, MessageHandler};
use tracing::{debug, error, info};

use crate::privacy::AnonymizedSource;
use crate::router::{HandleOutcome, Router};

#[async_trait::async_trait]
impl<W, A> MessageHandler for Router<W, A>
where
    W: IndexWriter + 'static,
    A: AnonymizedSource + 'static,
{
    async fn handle_message(&self, payload: &[u8]) -> Result<(), HandlerError> {
        match Router::handle_message(self, payload).await {
            Ok(HandleOutcome::Applied(summary)) => {
                debug!(
                    "Message applied: {} tasks succeeded, {} failed",
                    summary.succeeded, summary.failed
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) if e.requeue() => Err(HandlerError::Requeue(e.into())),
            Err(e) => Err(HandlerError::Discard(e.into())),
        }
    }
}

/// Counts messages on their way into the router.
pub struct CountingHandler<H> {
    inner: H,
    processed: AtomicU64,
}

impl<H: MessageHandler> CountingHandler<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            processed: AtomicU64::new(0),
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl<H: MessageHandler> MessageHandler for CountingHandler<H> {
    async fn handle_message(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let result = self.inner.handle_message(payload).await;
        let count = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        if count % 100 == 0 {
            info!("Processed {count} messages total");
        }
        result
    }
}

/// Run `num_consumers` consumers feeding `handler` until `shutdown`
/// resolves or every consumer has stopped.
pub async fn run_consumers<H, F>(
    client: &Client,
    num_consumers: usize,
    handler: Arc<H>,
    shutdown: F,
) -> Result<()>
where
    H: MessageHandler + 'static,
    F: Future<Output = ()>,
{
    info!(
        "Spawning {num_consumers} consumers on topic {} in group {}",
        client.config().topic,
        client.config().group_id
    );
    let handles = client.spawn_consumer_group(num_consumers, handler)?;
    let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

    info!("Consumers running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = shutdown => {
            info!("Received shutdown signal, stopping consumers");
        }
        (result, i, _) = futures::future::select_all(handles) => {
            match result {
                Ok(Ok(())) => info!("Consumer {i} finished"),
                Ok(Err(e)) => error!("Consumer {i} error: {e:#}"),
                Err(e) => error!("Consumer {i} task error: {e}"),
            }
        }
    }

    for abort in aborts {
        abort.abort();
    }
    Ok(())
}
