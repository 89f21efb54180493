//! CLI for subrelay
//!
//! Relays every message of a Pub/Sub subscription to a destination topic,
//! possibly in another project under other credentials. A source message is
//! acknowledged only after the destination accepted it.
//!
//! Every flag can also be given in a config file (`--config`) or through the
//! environment (`FROM_GOOGLE_CLOUD_PROJECT`, ...). Flags win over the
//! environment, which wins over the file. A `.env` file is loaded first.

mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use subrelay_config::{Overrides, load_config};
use subrelay_utils::logging;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "subrelay", version)]
#[command(about = "Relay messages from a Pub/Sub subscription to a topic")]
struct Args {
    /// Config file. All flags given in command line will override the values from this file.
    #[arg(long, env = "CONFIG")]
    config: Option<PathBuf>,

    /// Log format (json or text)
    #[arg(long)]
    log_format: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Google Cloud project where the subscription is defined
    #[arg(long)]
    from_google_cloud_project: Option<String>,

    /// Google Cloud project where the destination topic is defined
    #[arg(long)]
    to_google_cloud_project: Option<String>,

    /// Credentials JSON used for subscription access
    #[arg(long)]
    from_google_application_credentials_json: Option<String>,

    /// Credentials JSON used for publication access
    #[arg(long)]
    to_google_application_credentials_json: Option<String>,

    /// Source subscription
    #[arg(long)]
    pubsub_subscription: Option<String>,

    /// Destination topic
    #[arg(long)]
    pubsub_destination_topic: Option<String>,

    /// Maximum number of received messages not yet acked or nacked
    #[arg(long)]
    max_outstanding_messages: Option<usize>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            log_format: self.log_format.clone(),
            log_level: self.log_level.clone(),
            from_google_cloud_project: self.from_google_cloud_project.clone(),
            to_google_cloud_project: self.to_google_cloud_project.clone(),
            from_google_application_credentials_json: self
                .from_google_application_credentials_json
                .clone(),
            to_google_application_credentials_json: self
                .to_google_application_credentials_json
                .clone(),
            pubsub_subscription: self.pubsub_subscription.clone(),
            pubsub_destination_topic: self.pubsub_destination_topic.clone(),
            max_outstanding_messages: self.max_outstanding_messages,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Reported on stderr: logging is configured from these very settings.
    let settings = match load_config(&args.overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&settings.log.level, settings.log.format);

    if let Some(path) = &args.config {
        info!("Using config file: {}", path.display());
    }
    debug!(?settings, "Configuration");

    let relay = match app::build_relay(&settings).await {
        Ok(relay) => relay,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match app::run(relay).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn flags_map_to_overrides() {
        let args = Args::try_parse_from([
            "subrelay",
            "--log-format",
            "text",
            "--from-google-cloud-project",
            "src",
            "--pubsub-destination-topic",
            "out",
            "--max-outstanding-messages",
            "4",
        ])
        .expect("valid flags");

        let overrides = args.overrides();
        assert_eq!(overrides.log_format.as_deref(), Some("text"));
        assert_eq!(overrides.from_google_cloud_project.as_deref(), Some("src"));
        assert_eq!(overrides.pubsub_destination_topic.as_deref(), Some("out"));
        assert_eq!(overrides.max_outstanding_messages, Some(4));
        assert_eq!(overrides.to_google_cloud_project, None);
    }

    #[test]
    fn rejects_non_numeric_outstanding_messages() {
        assert!(Args::try_parse_from(["subrelay", "--max-outstanding-messages", "many"]).is_err());
    }
}
