//! Destination publisher
//!
//! `Topic` wraps a [`MessageSink`] and publishes one message at a time,
//! returning only once the broker has accepted or rejected it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PublishError;
use crate::message::Message;

/// Capability of a destination topic. Returns the broker-assigned id of the
/// published message.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn publish(&self, message: &Message) -> Result<String, PublishError>;
}

pub struct Topic {
    name: String,
    sink: Arc<dyn MessageSink>,
}

impl Topic {
    pub fn new(name: impl Into<String>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn publish(&self, message: &Message) -> Result<String, PublishError> {
        self.sink.publish(message).await
    }
}
