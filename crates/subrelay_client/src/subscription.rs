use std::sync::Arc;

use async_trait::async_trait;
use gcloud_gax::grpc::Code;
use gcloud_pubsub::subscriber::ReceivedMessage as Lease;
use gcloud_pubsub::subscription::Subscription;
use tracing::debug;

use subrelay_relay::{Acknowledger, MessageSource, ReceivedMessage, SubscriptionError};

use crate::client::subscription_error;
use crate::convert;

/// A pull subscription. Each leased message settles itself through the
/// lease the broker handed out; a nack sets its ack deadline to zero.
#[derive(Clone)]
pub struct RemoteSubscription {
    subscription: Subscription,
}

impl RemoteSubscription {
    pub(crate) fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Fully qualified name, `projects/<p>/subscriptions/<s>`.
    pub fn name(&self) -> &str {
        self.subscription.fully_qualified_name()
    }
}

#[async_trait]
impl MessageSource for RemoteSubscription {
    async fn pull(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, SubscriptionError> {
        let max_messages = i32::try_from(max_messages).unwrap_or(i32::MAX);

        let leased = match self.subscription.pull(max_messages, None).await {
            Ok(leased) => leased,
            // an idle long-poll pull can outlive its deadline
            Err(status) if status.code() == Code::DeadlineExceeded => {
                debug!(subscription = %self.name(), "pull timed out without messages");
                return Ok(Vec::new());
            }
            Err(status) => return Err(subscription_error(status)),
        };

        Ok(leased.into_iter().map(into_received).collect())
    }
}

fn into_received(mut lease: Lease) -> ReceivedMessage {
    let message = convert::from_pubsub(std::mem::take(&mut lease.message));
    let ack_id = lease.ack_id().to_string();
    let delivery_attempt = lease
        .delivery_attempt()
        .and_then(|attempt| u32::try_from(attempt).ok());

    ReceivedMessage::new(message, ack_id, delivery_attempt, Arc::new(LeaseAcker(lease)))
}

/// Settles one leased message.
struct LeaseAcker(Lease);

#[async_trait]
impl Acknowledger for LeaseAcker {
    async fn ack(&self, _ack_id: &str) -> Result<(), SubscriptionError> {
        self.0.ack().await.map_err(subscription_error)
    }

    async fn nack(&self, _ack_id: &str) -> Result<(), SubscriptionError> {
        self.0.nack().await.map_err(subscription_error)
    }
}
