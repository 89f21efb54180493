//! Credential resolver
//!
//! Turns a credential JSON blob (as downloaded from the cloud console) into
//! [`Credentials`] for one [`crate::Client`]. Two kinds are understood:
//! `service_account` keys and `authorized_user` refresh tokens. Minting and
//! refreshing access tokens is left to the Google auth library, which asks
//! for the Pub/Sub scopes.

use std::fmt;

use gcloud_pubsub::client::google_cloud_auth::credentials::CredentialsFile;
use gcloud_pubsub::client::google_cloud_auth::error::Error as AuthLibError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials JSON: {0}")]
    Parse(#[source] AuthLibError),
    #[error("unsupported credential type {0:?}")]
    UnsupportedType(String),
    #[error("{kind} credentials lack {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("could not set up token source: {0}")]
    TokenSource(#[source] AuthLibError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    ServiceAccount,
    AuthorizedUser,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::ServiceAccount => "service_account",
            CredentialKind::AuthorizedUser => "authorized_user",
        }
    }
}

/// Parsed credential material for one side of the relay.
pub struct Credentials {
    kind: CredentialKind,
    file: CredentialsFile,
}

impl Credentials {
    /// Parses a credential blob. Fails on invalid JSON, on an unknown
    /// `type` and when a field needed to obtain tokens is missing.
    pub async fn from_json(bytes: &[u8]) -> Result<Self, AuthError> {
        let text = String::from_utf8_lossy(bytes);
        let file = CredentialsFile::new_from_str(&text)
            .await
            .map_err(AuthError::Parse)?;

        let kind = match file.tp.as_str() {
            "service_account" => {
                require(CredentialKind::ServiceAccount, "client_email", &file.client_email)?;
                require(CredentialKind::ServiceAccount, "private_key", &file.private_key)?;
                CredentialKind::ServiceAccount
            }
            "authorized_user" => {
                require(CredentialKind::AuthorizedUser, "client_id", &file.client_id)?;
                require(CredentialKind::AuthorizedUser, "client_secret", &file.client_secret)?;
                require(CredentialKind::AuthorizedUser, "refresh_token", &file.refresh_token)?;
                CredentialKind::AuthorizedUser
            }
            other => return Err(AuthError::UnsupportedType(other.to_string())),
        };

        Ok(Self { kind, file })
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Project the service account belongs to, if the key file names one.
    pub fn project_id(&self) -> Option<&str> {
        self.file.project_id.as_deref()
    }

    /// Who these credentials act as; safe to log.
    pub fn principal(&self) -> &str {
        let principal = match self.kind {
            CredentialKind::ServiceAccount => &self.file.client_email,
            CredentialKind::AuthorizedUser => &self.file.client_id,
        };
        principal.as_deref().unwrap_or_default()
    }

    pub(crate) fn into_file(self) -> CredentialsFile {
        self.file
    }
}

fn require(
    kind: CredentialKind,
    field: &'static str,
    value: &Option<String>,
) -> Result<(), AuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(AuthError::MissingField {
            kind: kind.as_str(),
            field,
        }),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("kind", &self.kind.as_str())
            .field("principal", &self.principal())
            .field("project_id", &self.project_id())
            .finish()
    }
}
