//! subrelay_client
//!
//! Google Cloud Pub/Sub through `gcloud-pubsub`, exposed through the relay's
//! capability traits:
//! - [`RemoteSubscription`] implements `MessageSource` (pull); each leased
//!   message acks or nacks itself
//! - [`RemoteTopic`] implements `MessageSink` (publish)
//!
//! [`Credentials::from_json`] is the credential resolver: it turns a
//! credential JSON blob into credentials for one [`Client`]. Source and
//! destination each get their own client so they may live in different
//! projects under different accounts.

pub mod client;
pub mod convert;
pub mod credentials;
pub mod subscription;
pub mod topic;

pub use client::{Client, ClientError, EMULATOR_HOST_ENV, emulator_host, is_transient};
pub use credentials::{AuthError, CredentialKind, Credentials};
pub use subscription::RemoteSubscription;
pub use topic::RemoteTopic;

#[cfg(test)]
mod tests;
