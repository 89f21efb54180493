//! Pub/Sub client
//!
//! One `Client` per project and credential set, backed by the gRPC client of
//! `gcloud-pubsub`. Subscription and topic handles share its connection pool
//! and token source.

use gcloud_pubsub::client::Error as ConnectionError;
use gcloud_gax::grpc::{Code, Status};
use gcloud_pubsub::client::{Client as PubSubClient, ClientConfig};
use thiserror::Error;
use tracing::info;

use subrelay_relay::{PublishError, SubscriptionError};

use crate::credentials::{AuthError, Credentials};
use crate::subscription::RemoteSubscription;
use crate::topic::RemoteTopic;

/// When set (`host:port`), clients talk to a local emulator and send no
/// credentials.
pub const EMULATOR_HOST_ENV: &str = "PUBSUB_EMULATOR_HOST";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("could not connect: {0}")]
    Connect(#[from] ConnectionError),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

#[derive(Clone)]
pub struct Client {
    inner: PubSubClient,
}

impl Client {
    /// Creates a client for `project`. With `PUBSUB_EMULATOR_HOST` set the
    /// credentials are parsed but not used.
    pub async fn new(project: &str, credentials: Credentials) -> Result<Self, ClientError> {
        if project.trim().is_empty() {
            return Err(ClientError::Config("project must not be empty".to_string()));
        }

        let config = ClientConfig {
            project_id: Some(project.to_string()),
            ..Default::default()
        };

        let config = match emulator_host() {
            Some(host) => {
                info!(project, emulator = %host, "using pub/sub emulator");
                config
            }
            None => config
                .with_credentials(credentials.into_file())
                .await
                .map_err(AuthError::TokenSource)?,
        };

        let inner = PubSubClient::new(config).await?;
        Ok(Self { inner })
    }

    /// `name` is either a short subscription id in this client's project or
    /// a fully qualified `projects/<p>/subscriptions/<s>`.
    pub fn subscription(&self, name: &str) -> RemoteSubscription {
        RemoteSubscription::new(self.inner.subscription(name))
    }

    /// `name` is either a short topic id in this client's project or a fully
    /// qualified `projects/<p>/topics/<t>`.
    pub fn topic(&self, name: &str) -> RemoteTopic {
        RemoteTopic::new(self.inner.topic(name))
    }
}

/// Host of the local emulator, if one is configured.
pub fn emulator_host() -> Option<String> {
    std::env::var(EMULATOR_HOST_ENV)
        .ok()
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
}

/// Whether retrying the same call later may succeed.
pub fn is_transient(status: &Status) -> bool {
    matches!(
        status.code(),
        Code::Unavailable
            | Code::DeadlineExceeded
            | Code::ResourceExhausted
            | Code::Aborted
            | Code::Internal
            | Code::Unknown
    )
}

pub(crate) fn subscription_error(status: Status) -> SubscriptionError {
    let reason = format!("{:?}: {}", status.code(), status.message());
    if is_transient(&status) {
        SubscriptionError::Unavailable(reason)
    } else {
        SubscriptionError::Fatal(reason)
    }
}

pub(crate) fn publish_error(status: Status) -> PublishError {
    PublishError::new(format!("{:?}: {}", status.code(), status.message()))
}
