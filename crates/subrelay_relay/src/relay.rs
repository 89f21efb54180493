//! Relay loop
//!
//! Every message received from the source subscription is published to the
//! destination topic. The source message is acknowledged only once the
//! publish succeeded; otherwise it is negative-acknowledged so the broker
//! redelivers it later. Nothing is retried locally, which gives
//! at-least-once delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::message::ReceivedMessage;
use crate::subscriber::Subscriber;
use crate::topic::Topic;

/// Counters of settled deliveries.
#[derive(Debug, Default)]
pub struct RelayStats {
    relayed: AtomicU64,
    failed: AtomicU64,
    ack_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCounts {
    /// Published and acked.
    pub relayed: u64,
    /// Publish failed, nacked.
    pub failed: u64,
    /// Published, but the source ack was rejected. The broker redelivers
    /// these, so they reach the destination again.
    pub ack_failed: u64,
}

impl RelayStats {
    pub fn snapshot(&self) -> RelayCounts {
        RelayCounts {
            relayed: self.relayed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            ack_failed: self.ack_failed.load(Ordering::Relaxed),
        }
    }
}

pub struct Relay {
    subscriber: Subscriber,
    topic: Arc<Topic>,
    stats: Arc<RelayStats>,
}

impl Relay {
    pub fn new(subscriber: Subscriber, topic: Topic) -> Self {
        Self {
            subscriber,
            topic: Arc::new(topic),
            stats: Arc::new(RelayStats::default()),
        }
    }

    pub fn stats(&self) -> RelayCounts {
        self.stats.snapshot()
    }

    /// Relays until `shutdown` turns true (`Ok`) or the subscription fails
    /// (`Err`). Publish failures never end the loop.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), RelayError> {
        info!(
            subscription = %self.subscriber.name(),
            topic = %self.topic.name(),
            "relay started"
        );

        let topic = self.topic.clone();
        let stats = self.stats.clone();
        let outcome = self
            .subscriber
            .receive(shutdown, move |received| {
                let topic = topic.clone();
                let stats = stats.clone();
                async move { deliver(&topic, &stats, received).await }
            })
            .await;

        let counts = self.stats.snapshot();
        info!(
            relayed = counts.relayed,
            failed = counts.failed,
            ack_failed = counts.ack_failed,
            "relay stopped"
        );

        outcome.map_err(RelayError::from)
    }
}

/// Relays messages from `subscriber` to `topic` until shutdown or a
/// subscription failure.
pub async fn relay(
    shutdown: watch::Receiver<bool>,
    subscriber: Subscriber,
    topic: Topic,
) -> Result<(), RelayError> {
    Relay::new(subscriber, topic).run(shutdown).await
}

async fn deliver(topic: &Topic, stats: &RelayStats, received: ReceivedMessage) {
    let source_id = received.message().message_id.clone().unwrap_or_default();

    match topic.publish(received.message()).await {
        Ok(published_id) => {
            debug!(%source_id, destination_id = %published_id, "message relayed");
            match received.ack().await {
                Ok(()) => {
                    stats.relayed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!(%source_id, "message published but ack failed: {e}");
                    stats.ack_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Err(e) => {
            error!(
                %source_id,
                "err when relaying message to {}: {e}",
                topic.name()
            );
            if let Err(e) = received.nack().await {
                warn!(%source_id, "failed to nack message: {e}");
            }
            stats.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
