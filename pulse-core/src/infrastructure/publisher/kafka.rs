//! Kafka-protocol publisher

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::ClientBuilder;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{EventPublisher, PublishError, PublishReceipt};
use crate::config::EventLogConfig;
use crate::domain::PublishedEnvelope;
use crate::infrastructure::resilience::{RetryConfig, retry_with_backoff};

/// Publishes envelopes to one topic, spreading records round-robin across
/// its partitions. Produce requests wait for every in-sync replica.
pub struct KafkaEventPublisher {
    topic: String,
    partitions: Vec<(i32, Arc<PartitionClient>)>,
    next_partition: AtomicUsize,
    send_timeout: Duration,
    retry: RetryConfig,
}

impl KafkaEventPublisher {
    /// Connect to the bootstrap brokers and open a client per partition.
    pub async fn connect(config: &EventLogConfig) -> Result<Self, PublishError> {
        let send_timeout = Duration::from_millis(config.send_timeout_ms);

        let client = tokio::time::timeout(
            send_timeout,
            ClientBuilder::new(config.brokers.clone()).build(),
        )
        .await
        .map_err(|_| PublishError::Timeout {
            after_ms: config.send_timeout_ms,
        })?
        .map_err(|e| PublishError::Connection(e.to_string()))?;

        let mut partitions = Vec::with_capacity(config.partitions.max(1) as usize);
        for partition in 0..config.partitions.max(1) {
            let partition_client = client
                .partition_client(config.topic.clone(), partition, UnknownTopicHandling::Retry)
                .await
                .map_err(|e| {
                    PublishError::Connection(format!(
                        "Failed to open partition {} of topic {}: {}",
                        partition, config.topic, e
                    ))
                })?;
            partitions.push((partition, Arc::new(partition_client)));
        }

        info!(
            topic = %config.topic,
            partitions = partitions.len(),
            brokers = ?config.brokers,
            "Connected to event log"
        );

        Ok(Self {
            topic: config.topic.clone(),
            partitions,
            next_partition: AtomicUsize::new(0),
            send_timeout,
            retry: config.retry.to_retry_config(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn pick_partition(&self) -> &(i32, Arc<PartitionClient>) {
        let index = self.next_partition.fetch_add(1, Ordering::Relaxed) % self.partitions.len();
        &self.partitions[index]
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, envelope: &PublishedEnvelope) -> Result<PublishReceipt, PublishError> {
        let payload = envelope
            .to_bytes()
            .map_err(|e| PublishError::Serialization(e.to_string()))?;
        let (partition, partition_client) = self.pick_partition();
        let partition = *partition;
        let send_timeout = self.send_timeout;

        let offset = retry_with_backoff(&self.retry, PublishError::is_retryable, || {
            let partition_client = Arc::clone(partition_client);
            let record = Record {
                key: None,
                value: Some(payload.clone()),
                headers: BTreeMap::new(),
                timestamp: Utc::now(),
            };

            async move {
                match tokio::time::timeout(
                    send_timeout,
                    partition_client.produce(vec![record], Compression::NoCompression),
                )
                .await
                {
                    Ok(Ok(offsets)) => offsets.first().copied().ok_or_else(|| {
                        PublishError::Broker("produce returned no offset".to_string())
                    }),
                    Ok(Err(e)) => Err(PublishError::Broker(e.to_string())),
                    Err(_) => Err(PublishError::Timeout {
                        after_ms: send_timeout.as_millis() as u64,
                    }),
                }
            }
        })
        .await
        .inspect_err(|e| {
            warn!(
                topic = %self.topic,
                partition = partition,
                request_id = %envelope.request_id,
                error = %e,
                "Publish failed after retries"
            );
        })?;

        debug!(
            topic = %self.topic,
            partition = partition,
            offset = offset,
            request_id = %envelope.request_id,
            "Event published"
        );

        Ok(PublishReceipt { partition, offset })
    }
}
