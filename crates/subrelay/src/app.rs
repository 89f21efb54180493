//! Startup wiring: resolves both credential sets, then builds one client per
//! side and assembles the relay. Then runs it until a signal or a fatal
//! subscription error.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use subrelay_client::{AuthError, Client, ClientError, Credentials};
use subrelay_config::{EndpointSettings, Settings};
use subrelay_relay::{ReceiveSettings, Relay, RelayError, Subscriber, Topic};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Could not find {side} credentials: {source}")]
    Credentials {
        side: &'static str,
        #[source]
        source: AuthError,
    },
    #[error("Could not create {side} pubsub client: {source}")]
    Client {
        side: &'static str,
        #[source]
        source: ClientError,
    },
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// No client is created unless both credential blobs resolve.
pub async fn build_relay(settings: &Settings) -> Result<Relay, AppError> {
    let source_credentials = resolve("source", &settings.source).await?;
    let destination_credentials = resolve("destination", &settings.destination).await?;

    let source = connect("source", &settings.source, source_credentials).await?;
    let destination = connect("destination", &settings.destination, destination_credentials).await?;

    let subscription = source.subscription(&settings.relay.subscription);
    let topic = destination.topic(&settings.relay.topic);

    let receive = ReceiveSettings::default()
        .with_max_outstanding_messages(settings.relay.max_outstanding_messages);

    Ok(Relay::new(
        Subscriber::new(subscription.name().to_string(), Arc::new(subscription), receive),
        Topic::new(topic.name().to_string(), Arc::new(topic)),
    ))
}

async fn resolve(side: &'static str, endpoint: &EndpointSettings) -> Result<Credentials, AppError> {
    let credentials = Credentials::from_json(endpoint.credentials_json.as_bytes())
        .await
        .map_err(|source| AppError::Credentials { side, source })?;

    info!(
        side,
        project = %endpoint.project,
        kind = credentials.kind().as_str(),
        principal = %credentials.principal(),
        "credentials resolved"
    );
    Ok(credentials)
}

async fn connect(
    side: &'static str,
    endpoint: &EndpointSettings,
    credentials: Credentials,
) -> Result<Client, AppError> {
    Client::new(&endpoint.project, credentials)
        .await
        .map_err(|source| AppError::Client { side, source })
}

/// Runs until SIGINT/SIGTERM (`Ok`) or until the subscription fails.
pub async fn run(relay: Relay) -> Result<(), AppError> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received. Waiting for in-flight messages.");
        let _ = tx.send(true);
    });

    relay.run(rx).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
