use thiserror::Error;

/// Failure to publish one message to the destination topic. Recovered
/// locally by negative-acknowledging the source message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PublishError(pub String);

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure of the source subscription itself (pull, ack or nack).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Worth retrying: the broker or the network is temporarily unavailable.
    #[error("subscription unavailable: {0}")]
    Unavailable(String),
    #[error("subscription failed: {0}")]
    Fatal(String),
}

impl SubscriptionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SubscriptionError::Unavailable(_))
    }
}

/// Why the relay loop stopped.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("receive terminated: {0}")]
    Subscription(#[from] SubscriptionError),
}
