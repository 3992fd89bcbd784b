use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use search_sync_kafka_source::{Client, ConsumerConfig, HandlerError, MessageHandler};

/// Example running several consumers in one consumer group
///
/// Every payload is printed; anything that is not UTF-8 is discarded
/// instead of being redelivered.
///
/// To run this example:
/// 1. Start Kafka with Docker
///   docker run -d --name kafka -p 9092:9092 apache/kafka:latest
/// 2. Run examples
///   cargo run --example multi_consumer

struct PrintHandler {
    processed: AtomicU64,
}

#[async_trait::async_trait]
impl MessageHandler for PrintHandler {
    async fn handle_message(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| HandlerError::Discard(anyhow::anyhow!("payload is not UTF-8: {e}")))?;
        println!("Payload: {text}");

        let count = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        if count % 100 == 0 {
            println!("Processed {count} messages total");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    match run_main().await {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<()> {
    let config = ConsumerConfig {
        group_id: "multi-consumer-example".to_string(),
        topic: "replication".to_string(),
        ..Default::default()
    };

    let client = Client::new(config)?;
    let handler = Arc::new(PrintHandler {
        processed: AtomicU64::new(0),
    });

    // Each consumer is assigned different partitions
    println!("Spawning 3 consumers in the same consumer group...");
    let handles = client.spawn_consumer_group(3, handler)?;

    println!("Consumers running. Press Ctrl+C to stop.");

    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(())) => println!("Consumer {i} finished successfully"),
            Ok(Err(e)) => eprintln!("Consumer {i} error: {e:#}"),
            Err(e) => eprintln!("Consumer {i} task error: {e}"),
        }
    }

    Ok(())
}
