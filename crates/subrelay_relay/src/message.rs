//! Message definitions for the relay
//!
//! `Message` is the broker-neutral representation of a pub/sub message. It
//! is relayed untouched: payload bytes, attributes and ordering key go to the
//! destination exactly as they were received.
//!
//! `ReceivedMessage` wraps a `Message` together with its delivery handle.
//! Settling a delivery (`ack` or `nack`) consumes the value, so one delivery
//! can only be settled once. A delivery dropped without being settled is
//! negative-acknowledged.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::SubscriptionError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
    /// Broker-assigned id; set on received messages only.
    pub message_id: Option<String>,
    /// Broker-assigned publish time; set on received messages only.
    pub publish_time: Option<DateTime<Utc>>,
    pub ordering_key: Option<String>,
}

impl Message {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Settles deliveries with the broker that handed them out.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// The message is durably handled; the broker must not redeliver it.
    async fn ack(&self, ack_id: &str) -> Result<(), SubscriptionError>;

    /// The message was not handled; the broker should redeliver it.
    async fn nack(&self, ack_id: &str) -> Result<(), SubscriptionError>;
}

/// A message on loan from the source subscription for one delivery attempt.
pub struct ReceivedMessage {
    message: Message,
    ack_id: String,
    delivery_attempt: Option<u32>,
    acker: Arc<dyn Acknowledger>,
    settled: bool,
}

impl ReceivedMessage {
    pub fn new(
        message: Message,
        ack_id: impl Into<String>,
        delivery_attempt: Option<u32>,
        acker: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            message,
            ack_id: ack_id.into(),
            delivery_attempt,
            acker,
            settled: false,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn ack_id(&self) -> &str {
        &self.ack_id
    }

    pub fn delivery_attempt(&self) -> Option<u32> {
        self.delivery_attempt
    }

    /// Tells the broker the message was handled.
    pub async fn ack(mut self) -> Result<(), SubscriptionError> {
        self.settled = true;
        self.acker.ack(&self.ack_id).await
    }

    /// Hands the message back to the broker for redelivery.
    pub async fn nack(mut self) -> Result<(), SubscriptionError> {
        self.settled = true;
        self.acker.nack(&self.ack_id).await
    }
}

impl Drop for ReceivedMessage {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Outside a runtime there is nothing to drive the nack; the broker
        // redelivers once the ack deadline expires.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let acker = self.acker.clone();
            let ack_id = std::mem::take(&mut self.ack_id);
            handle.spawn(async move {
                if let Err(e) = acker.nack(&ack_id).await {
                    warn!(ack_id = %ack_id, "failed to nack dropped message: {e}");
                }
            });
        }
    }
}

impl fmt::Debug for ReceivedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivedMessage")
            .field("message", &self.message)
            .field("ack_id", &self.ack_id)
            .field("delivery_attempt", &self.delivery_attempt)
            .field("settled", &self.settled)
            .finish()
    }
}
