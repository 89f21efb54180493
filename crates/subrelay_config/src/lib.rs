//! subrelay_config
//!
//! Loads the relay configuration from, in increasing order of precedence:
//! built-in defaults, an optional config file, the process environment and
//! explicit overrides (command-line flags). The result is validated once;
//! a missing required value is reported by the name of its environment
//! variable so operators know what to set.

pub mod settings;


use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, Value};
use thiserror::Error;

use settings::{PartialSettings, keys};
use subrelay_utils::LogFormat;

pub use settings::{EndpointSettings, LogSettings, RelaySettings, Settings};

#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required value is empty. Holds the environment variable name.
    #[error("{0} variable must be set.")]
    Missing(&'static str),
    #[error("MAX_OUTSTANDING_MESSAGES must be greater than zero.")]
    InvalidMaxOutstanding,
    #[error("could not load configuration: {0}")]
    Load(#[from] ConfigError),
}

/// Values given explicitly on the command line. `None` leaves the lower
/// layers untouched.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub log_format: Option<String>,
    pub log_level: Option<String>,
    pub from_google_cloud_project: Option<String>,
    pub to_google_cloud_project: Option<String>,
    pub from_google_application_credentials_json: Option<String>,
    pub to_google_application_credentials_json: Option<String>,
    pub pubsub_subscription: Option<String>,
    pub pubsub_destination_topic: Option<String>,
    pub max_outstanding_messages: Option<usize>,
}

/// Loads and validates the configuration.
pub fn load_config(overrides: &Overrides) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder();

    if let Some(path) = &overrides.config_file {
        builder = file_layer(builder, path)?;
    }

    // Set but empty variables do not count as set.
    let builder = builder
        .add_source(Environment::default().ignore_empty(true))
        .set_override_option(keys::LOG_FORMAT, overrides.log_format.clone())?
        .set_override_option(keys::LOG_LEVEL, overrides.log_level.clone())?
        .set_override_option(
            keys::FROM_GOOGLE_CLOUD_PROJECT,
            overrides.from_google_cloud_project.clone(),
        )?
        .set_override_option(
            keys::TO_GOOGLE_CLOUD_PROJECT,
            overrides.to_google_cloud_project.clone(),
        )?
        .set_override_option(
            keys::FROM_GOOGLE_APPLICATION_CREDENTIALS_JSON,
            overrides.from_google_application_credentials_json.clone(),
        )?
        .set_override_option(
            keys::TO_GOOGLE_APPLICATION_CREDENTIALS_JSON,
            overrides.to_google_application_credentials_json.clone(),
        )?
        .set_override_option(
            keys::PUBSUB_SUBSCRIPTION,
            overrides.pubsub_subscription.clone(),
        )?
        .set_override_option(
            keys::PUBSUB_DESTINATION_TOPIC,
            overrides.pubsub_destination_topic.clone(),
        )?
        .set_override_option(
            keys::MAX_OUTSTANDING_MESSAGES,
            overrides.max_outstanding_messages.map(|n| n as u64),
        )?;

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    merge_and_validate(partial)
}

/// Loads `path` as the lowest layer. Keys may be written as the flag names
/// (`from-google-cloud-project`) or in snake_case.
fn file_layer(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, SettingsError> {
    let file: HashMap<String, Value> = Config::builder()
        .add_source(File::from(path).required(true))
        .build()?
        .try_deserialize()?;

    let builder = file.into_iter().try_fold(builder, |builder, (key, value)| {
        builder.set_default(key.replace('-', "_"), value)
    })?;
    Ok(builder)
}

/// Fills gaps in `partial` with defaults and checks required values.
pub fn merge_and_validate(partial: PartialSettings) -> Result<Settings, SettingsError> {
    let default = Settings::default();

    let settings = Settings {
        log: LogSettings {
            format: partial
                .log_format
                .as_deref()
                .map(LogFormat::from_name)
                .unwrap_or(default.log.format),
            level: partial.log_level.unwrap_or(default.log.level),
        },
        source: EndpointSettings {
            project: partial.from_google_cloud_project.unwrap_or_default(),
            credentials_json: partial
                .from_google_application_credentials_json
                .unwrap_or_default(),
        },
        destination: EndpointSettings {
            project: partial.to_google_cloud_project.unwrap_or_default(),
            credentials_json: partial
                .to_google_application_credentials_json
                .unwrap_or_default(),
        },
        relay: RelaySettings {
            subscription: partial.pubsub_subscription.unwrap_or_default(),
            topic: partial.pubsub_destination_topic.unwrap_or_default(),
            max_outstanding_messages: partial
                .max_outstanding_messages
                .unwrap_or(default.relay.max_outstanding_messages),
        },
    };

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), SettingsError> {
    let required = [
        (&settings.source.project, "FROM_GOOGLE_CLOUD_PROJECT"),
        (&settings.destination.project, "TO_GOOGLE_CLOUD_PROJECT"),
        (&settings.relay.subscription, "PUBSUB_SUBSCRIPTION"),
        (&settings.relay.topic, "PUBSUB_DESTINATION_TOPIC"),
        (
            &settings.source.credentials_json,
            "FROM_GOOGLE_APPLICATION_CREDENTIALS_JSON",
        ),
        (
            &settings.destination.credentials_json,
            "TO_GOOGLE_APPLICATION_CREDENTIALS_JSON",
        ),
    ];

    for (value, var) in required {
        if value.trim().is_empty() {
            return Err(SettingsError::Missing(var));
        }
    }

    if settings.relay.max_outstanding_messages == 0 {
        return Err(SettingsError::InvalidMaxOutstanding);
    }

    Ok(())
}
