//! subrelay_relay
//!
//! The relay core: pulls messages from a source subscription with bounded
//! concurrency, republishes each one to a destination topic, then acks the
//! source message on success or nacks it on failure.
//!
//! Brokers are reached through three small capability traits so the loop
//! can run against real clients or in-memory fakes:
//! - [`MessageSource`]: lease messages from a subscription
//! - [`Acknowledger`]: ack / nack a leased message
//! - [`MessageSink`]: publish to a topic and await the result
//!
//! Public types:
//! - [`Subscriber`]: flow-controlled receive loop over a `MessageSource`
//! - [`Topic`]: publish wrapper over a `MessageSink`
//! - [`Relay`]: glues the two together

pub mod error;
pub mod message;
pub mod relay;
pub mod subscriber;
pub mod topic;

pub use error::{PublishError, RelayError, SubscriptionError};
pub use message::{Acknowledger, Message, ReceivedMessage};
pub use relay::{Relay, RelayCounts, RelayStats, relay};
pub use subscriber::{MessageSource, ReceiveSettings, Subscriber};
pub use topic::{MessageSink, Topic};
