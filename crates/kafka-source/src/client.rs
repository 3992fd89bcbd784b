use crate::consumer::{Consumer, ConsumerConfig};
use crate::error::Result;
use crate::handler::{HandlerError, MessageHandler};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Final fate of one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The handler accepted the message
    Handled { attempts: u32 },
    /// The handler rejected the message as permanently unprocessable
    Discarded { attempts: u32 },
    /// Every attempt asked for a requeue
    GaveUp { attempts: u32 },
}

/// Hand a payload to the handler, redelivering it while the handler asks
/// for a requeue and attempts remain.
pub async fn deliver<H>(handler: &H, payload: &[u8], config: &ConsumerConfig) -> Delivery
where
    H: MessageHandler + ?Sized,
{
    let mut attempt = 1;
    loop {
        match handler.handle_message(payload).await {
            Ok(()) => return Delivery::Handled { attempts: attempt },
            Err(HandlerError::Discard(e)) => {
                error!("Discarding unprocessable message: {e:#}");
                return Delivery::Discarded { attempts: attempt };
            }
            Err(HandlerError::Requeue(e)) if attempt >= config.max_attempts => {
                error!("Giving up on message after {attempt} attempts: {e:#}");
                return Delivery::GaveUp { attempts: attempt };
            }
            Err(HandlerError::Requeue(e)) => {
                let delay = config.backoff(attempt);
                warn!("Attempt {attempt} failed, requeueing in {delay:?}: {e:#}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Kafka client for managing multiple consumers
pub struct Client {
    config: ConsumerConfig,
}

impl Client {
    pub fn new(config: ConsumerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a single consumer
    pub fn create_consumer(&self) -> Result<Consumer> {
        Consumer::new(&self.config)
    }

    /// Spawn a consumer task that hands each message to `handler` and
    /// commits it once its delivery is settled.
    pub fn spawn_consumer_task<H>(&self, handler: Arc<H>) -> Result<JoinHandle<anyhow::Result<()>>>
    where
        H: MessageHandler + 'static,
    {
        let consumer = self.create_consumer()?;
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            loop {
                let message = consumer.recv().await?;
                debug!(
                    "Received message at {}/{}@{}",
                    message.topic, message.partition, message.offset
                );

                let outcome = deliver(handler.as_ref(), &message.payload, &config).await;
                debug!("Message {} settled: {outcome:?}", message.offset);

                consumer.commit(&message).await?;
            }
        });

        Ok(handle)
    }

    /// Spawn multiple consumer tasks in the same consumer group
    ///
    /// When spawning multiple consumers:
    /// - All consumers join the same consumer group (same `group_id`)
    /// - Kafka assigns different partitions of the topic to each consumer
    /// - Each partition is processed by exactly one consumer, in order
    pub fn spawn_consumer_group<H>(
        &self,
        num_consumers: usize,
        handler: Arc<H>,
    ) -> Result<Vec<JoinHandle<anyhow::Result<()>>>>
    where
        H: MessageHandler + 'static,
    {
        let mut handles = Vec::new();

        for _ in 0..num_consumers {
            let handle = self.spawn_consumer_task(Arc::clone(&handler))?;
            handles.push(handle);
        }

        Ok(handles)
    }

    /// Get the config
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails with the given error kind until `succeed_on` attempts were made.
    struct FlakyHandler {
        calls: AtomicU32,
        succeed_on: u32,
        discard: bool,
    }

    impl FlakyHandler {
        fn new(succeed_on: u32, discard: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_on,
                discard,
            }
        }
    }

    #[async_trait::async_trait]
    impl MessageHandler for FlakyHandler {
        async fn handle_message(&self, _payload: &[u8]) -> std::result::Result<(), HandlerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on {
                return Ok(());
            }
            let e = anyhow::anyhow!("attempt {call} failed");
            if self.discard {
                Err(HandlerError::Discard(e))
            } else {
                Err(HandlerError::Requeue(e))
            }
        }
    }

    fn config(max_attempts: u32) -> ConsumerConfig {
        ConsumerConfig {
            max_attempts,
            requeue_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn test_deliver_first_try() {
        let handler = FlakyHandler::new(1, false);
        let outcome = tokio_test::block_on(deliver(&handler, b"{}", &config(5)));
        assert_eq!(outcome, Delivery::Handled { attempts: 1 });
    }

    #[test]
    fn test_deliver_retries_requeued_messages() {
        let handler = FlakyHandler::new(3, false);
        let outcome = tokio_test::block_on(deliver(&handler, b"{}", &config(5)));
        assert_eq!(outcome, Delivery::Handled { attempts: 3 });
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deliver_gives_up_after_max_attempts() {
        let handler = FlakyHandler::new(u32::MAX, false);
        let outcome = tokio_test::block_on(deliver(&handler, b"{}", &config(2)));
        assert_eq!(outcome, Delivery::GaveUp { attempts: 2 });
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_deliver_does_not_retry_discarded_messages() {
        let handler = FlakyHandler::new(u32::MAX, true);
        let outcome = tokio_test::block_on(deliver(&handler, b"{}", &config(5)));
        assert_eq!(outcome, Delivery::Discarded { attempts: 1 });
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }
}
