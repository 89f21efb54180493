use serde::Deserialize;
use subrelay_utils::LogFormat;

/// Configuration keys. Environment variables are the upper-case form of
/// these (`FROM_GOOGLE_CLOUD_PROJECT`, ...). Config files use them verbatim
/// or in their dashed flag form (`from-google-cloud-project`).
pub mod keys {
    pub const LOG_FORMAT: &str = "log_format";
    pub const LOG_LEVEL: &str = "log_level";
    pub const FROM_GOOGLE_CLOUD_PROJECT: &str = "from_google_cloud_project";
    pub const TO_GOOGLE_CLOUD_PROJECT: &str = "to_google_cloud_project";
    pub const FROM_GOOGLE_APPLICATION_CREDENTIALS_JSON: &str =
        "from_google_application_credentials_json";
    pub const TO_GOOGLE_APPLICATION_CREDENTIALS_JSON: &str =
        "to_google_application_credentials_json";
    pub const PUBSUB_SUBSCRIPTION: &str = "pubsub_subscription";
    pub const PUBSUB_DESTINATION_TOPIC: &str = "pubsub_destination_topic";
    pub const MAX_OUTSTANDING_MESSAGES: &str = "max_outstanding_messages";
}

/// Top-level configuration of the relay.
///
/// Built once at startup by [`crate::load_config`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log: LogSettings,
    pub source: EndpointSettings,
    pub destination: EndpointSettings,
    pub relay: RelaySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub format: LogFormat,
    pub level: String,
}

/// One side of the relay: the cloud project and the credential blob used
/// to reach it.
#[derive(Clone, PartialEq)]
pub struct EndpointSettings {
    pub project: String,
    pub credentials_json: String,
}

// Credentials stay out of Debug output.
impl std::fmt::Debug for EndpointSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSettings")
            .field("project", &self.project)
            .field(
                "credentials_json",
                &subrelay_utils::logging::redact(&self.credentials_json),
            )
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    /// Subscription pulled on the source side.
    pub subscription: String,
    /// Topic published to on the destination side.
    pub topic: String,
    /// Upper bound of delivered but not yet settled messages.
    pub max_outstanding_messages: usize,
}

/// Flat view of the configuration as found in files and the environment.
/// Every field is optional; missing values are filled from [`Settings::default`].
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
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

impl Default for Settings {
    fn default() -> Self {
        Self {
            log: LogSettings {
                format: LogFormat::Json,
                level: "debug".to_string(),
            },
            source: EndpointSettings {
                project: String::new(),
                credentials_json: String::new(),
            },
            destination: EndpointSettings {
                project: String::new(),
                credentials_json: String::new(),
            },
            relay: RelaySettings {
                subscription: String::new(),
                topic: String::new(),
                max_outstanding_messages: 10,
            },
        }
    }
}
