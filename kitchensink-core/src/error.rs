use std::collections::BTreeMap;
use std::fmt::Display;

/// Errors that can occur while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No credentials were present; the session was torn down.
    #[error("Authentication required.")]
    AuthenticationRequired,
    /// The refresh token was missing or rejected; the session was torn down.
    #[error("Session expired. Please log in again.")]
    SessionExpired,
    /// A non-2xx response or a network-level failure.
    #[error("{message}")]
    RequestFailed {
        /// HTTP status, absent for network-level failures.
        status: Option<u16>,
        /// Human-readable message.
        message: String,
    },
    /// The backend rejected a registration.
    #[error("Registration failed: {0}")]
    Registration(#[from] RegistrationError),
    /// The session could not be read from or written to storage.
    #[error("Session storage error: {0}")]
    Session(String),
    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// A failed request with a known HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status: Some(status),
            message: message.into(),
        }
    }

    /// A failure that happened before any response was received.
    pub fn network(err: impl Display) -> Self {
        Self::RequestFailed {
            status: None,
            message: err.to_string(),
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => *status,
            Self::Registration(RegistrationError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure tore the session down.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationRequired | Self::SessionExpired)
    }
}

/// Why the backend refused to register an account.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Per-field validation messages, keyed by field name.
    #[error("{}", summarize(.0))]
    Validation(BTreeMap<String, String>),
    /// Any other refusal.
    #[error("{message}")]
    Rejected {
        /// HTTP status of the response.
        status: u16,
        /// Human-readable message.
        message: String,
    },
}

fn summarize(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}
