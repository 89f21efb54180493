//! Source subscriber
//!
//! Drives a pull-based [`MessageSource`] and hands every received message to
//! a handler running in its own task. The number of handler invocations in
//! flight never exceeds `max_outstanding_messages`: a semaphore permit is
//! taken before a message is pulled and released only when its handler
//! returns. This is the only backpressure in the relay.
//!
//! Transient pull errors are retried with exponential backoff. A non
//! transient error, or too many consecutive transient ones, ends `receive`
//! with that error. A shutdown signal stops pulling; handlers already in
//! flight are allowed to finish. A pull that is under way when shutdown
//! arrives still completes, and whatever it leased is nacked.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::SubscriptionError;
use crate::message::ReceivedMessage;

/// Capability of a pull subscription: lease up to `max_messages` messages.
///
/// An empty result is not an error; it means nothing is available right now.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn pull(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, SubscriptionError>;
}

#[derive(Debug, Clone)]
pub struct ReceiveSettings {
    pub max_outstanding_messages: usize,
    /// Consecutive transient pull failures tolerated before giving up.
    pub max_pull_retries: u32,
    pub initial_retry_backoff: Duration,
    pub max_retry_backoff: Duration,
    /// Pause after a pull that returned nothing.
    pub empty_pull_backoff: Duration,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            max_outstanding_messages: 10,
            max_pull_retries: 5,
            initial_retry_backoff: Duration::from_millis(100),
            max_retry_backoff: Duration::from_secs(10),
            empty_pull_backoff: Duration::from_millis(200),
        }
    }
}

impl ReceiveSettings {
    pub fn with_max_outstanding_messages(mut self, max: usize) -> Self {
        self.max_outstanding_messages = max.max(1);
        self
    }
}

pub struct Subscriber {
    name: String,
    source: Arc<dyn MessageSource>,
    settings: ReceiveSettings,
}

impl Subscriber {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn MessageSource>,
        settings: ReceiveSettings,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls `handler` for every received message until `shutdown` turns
    /// true (returns `Ok`) or the subscription fails (returns the error).
    /// In both cases in-flight handlers are awaited before returning.
    pub async fn receive<F, Fut>(
        &self,
        mut shutdown: watch::Receiver<bool>,
        handler: F,
    ) -> Result<(), SubscriptionError>
    where
        F: Fn(ReceivedMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let permits = Arc::new(Semaphore::new(self.settings.max_outstanding_messages.max(1)));
        let mut in_flight = JoinSet::new();
        let mut failures = 0u32;
        let mut backoff = self.settings.initial_retry_backoff;

        info!(
            subscription = %self.name,
            max_outstanding_messages = self.settings.max_outstanding_messages,
            "receiving messages"
        );

        let outcome = loop {
            reap(&mut in_flight);

            let first = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break Ok(()),
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break Ok(()),
                },
            };
            let mut batch: Vec<OwnedSemaphorePermit> = vec![first];
            while let Ok(permit) = permits.clone().try_acquire_owned() {
                batch.push(permit);
            }

            let pull = self.source.pull(batch.len());
            tokio::pin!(pull);
            let pulled = tokio::select! {
                biased;
                pulled = &mut pull => pulled,
                _ = stopped(&mut shutdown) => {
                    if let Ok(leased) = pull.await {
                        self.release(leased).await;
                    }
                    break Ok(());
                }
            };

            match pulled {
                Ok(mut messages) => {
                    failures = 0;
                    backoff = self.settings.initial_retry_backoff;

                    if messages.is_empty() {
                        drop(batch);
                        if pause(&mut shutdown, self.settings.empty_pull_backoff).await {
                            break Ok(());
                        }
                        continue;
                    }

                    if messages.len() > batch.len() {
                        warn!(
                            subscription = %self.name,
                            "source returned {} messages for {} free slots, extra ones are nacked",
                            messages.len(),
                            batch.len()
                        );
                        let surplus = messages.split_off(batch.len());
                        self.release(surplus).await;
                    }

                    debug!(subscription = %self.name, count = messages.len(), "pulled messages");

                    for (message, permit) in messages.into_iter().zip(batch) {
                        let handler = handler.clone();
                        in_flight.spawn(async move {
                            handler(message).await;
                            drop(permit);
                        });
                    }
                }
                Err(e) if e.is_transient() && failures < self.settings.max_pull_retries => {
                    drop(batch);
                    failures += 1;
                    warn!(
                        subscription = %self.name,
                        attempt = failures,
                        "pull failed, retrying in {:?}: {e}",
                        backoff
                    );
                    if pause(&mut shutdown, backoff).await {
                        break Ok(());
                    }
                    backoff = std::cmp::min(backoff * 2, self.settings.max_retry_backoff);
                }
                Err(e) => {
                    error!(subscription = %self.name, "pull failed: {e}");
                    break Err(e);
                }
            }
        };

        if !in_flight.is_empty() {
            info!(
                subscription = %self.name,
                in_flight = in_flight.len(),
                "waiting for in-flight messages"
            );
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(subscription = %self.name, "message handler failed: {e}");
            }
        }

        outcome
    }
}

impl Subscriber {
    /// Nacks messages that will not be handed to the handler.
    async fn release(&self, messages: Vec<ReceivedMessage>) {
        for message in messages {
            let ack_id = message.ack_id().to_string();
            if let Err(e) = message.nack().await {
                warn!(subscription = %self.name, %ack_id, "failed to nack message: {e}");
            }
        }
    }
}

fn reap(in_flight: &mut JoinSet<()>) {
    while let Some(joined) = in_flight.try_join_next() {
        if let Err(e) = joined {
            error!("message handler failed: {e}");
        }
    }
}

/// Resolves once shutdown is requested. A dropped sender never resolves.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sleeps for `duration`; returns true if shutdown was requested meanwhile.
async fn pause(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = stopped(shutdown) => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
