use crate::error::{Error, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer};
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;

/// Configuration for Kafka consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Topic carrying replication messages
    ///
    /// Full-table replication frames (begin/rows/end) for one relation must
    /// land on a single partition, otherwise two consumers in the group can
    /// each see half a frame.
    pub topic: String,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// "earliest" is preferred for CDC use cases to avoid missing updates.
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// How many times a message is handed to the handler before it is
    /// given up on
    pub max_attempts: u32,
    /// Base delay between two attempts, multiplied by the attempt number
    pub requeue_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "searchsyncer".to_string(),
            topic: "replication".to_string(),
            auto_offset_reset: "earliest".to_string(),
            session_timeout_ms: "6000".to_string(),
            max_attempts: 5,
            requeue_delay: Duration::from_millis(500),
        }
    }
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            return Err(Error::InvalidConfig("topic must not be empty".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay before the given (1-based) retry attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.requeue_delay.saturating_mul(attempt)
    }
}

/// A delivered Kafka message
#[derive(Debug, Clone)]
pub struct Message {
    /// Raw payload; empty when the record had no value
    pub payload: Vec<u8>,
    /// Kafka topic
    pub topic: String,
    /// Kafka partition
    pub partition: i32,
    /// Kafka offset
    pub offset: i64,
}

/// Kafka consumer with manual offset management
pub struct Consumer {
    consumer: RdkafkaStreamConsumer,
}

impl Consumer {
    /// Create a new Kafka consumer subscribed to the configured topic
    pub fn new(config: &ConsumerConfig) -> Result<Self> {
        let consumer: RdkafkaStreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("session.timeout.ms", &config.session_timeout_ms)
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| Error::Consumer(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| Error::Consumer(format!("Failed to subscribe to topic: {e}")))?;

        Ok(Self { consumer })
    }

    /// Receive the next message (blocks until one is available)
    pub async fn recv(&self) -> Result<Message> {
        let msg = self
            .consumer
            .recv()
            .await
            .map_err(|e| Error::Consumer(format!("Error receiving message: {e}")))?;
        Ok(Self::to_message(&msg))
    }

    /// Commit a message's offset
    pub async fn commit(&self, message: &Message) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )
        .map_err(|e| Error::Consumer(format!("Failed to add partition offset: {e}")))?;

        self.consumer
            .commit(&tpl, rdkafka::consumer::CommitMode::Sync)
            .map_err(|e| Error::Consumer(format!("Failed to commit offset: {e}")))?;

        Ok(())
    }

    fn to_message(msg: &RdkafkaBorrowedMessage) -> Message {
        Message {
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
        }
    }
}
