//! Error types for the hub API client.
//!
//! Every fallible operation in this crate returns [`Error`]. Lower layers
//! never print or exit; the variants carry enough context for the calling
//! CLI to render a message and pick an exit status.

use thiserror::Error;

use crate::client::ErrorInfo;

/// A specialized `Result` type for hub operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all hub API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response (DNS, connect, TLS, timeout)
    /// while performing the named action.
    #[error("error {action}: {source}")]
    Transport {
        /// What the caller was doing, e.g. "fetching pull requests"
        action: String,
        /// Underlying transport failure
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client failure outside of a named action (building the client,
    /// reading a body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an unexpected status code.
    #[error("{0}")]
    Api(Box<ApiError>),

    /// The API answered with an unexpected status and a body that matched
    /// neither error shape.
    #[error("error {action}: {source} (HTTP {status})")]
    UnparsableError {
        /// What the caller was doing
        action: String,
        /// HTTP status code
        status: u16,
        /// Why the body could not be decoded
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server requires a one-time two-factor code before it will issue
    /// a token. Consumed by the credential provisioner.
    #[error("two-factor authentication code required")]
    TwoFactorRequired,

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Host configuration file could not be read or written
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Hostname rejected before any request was made
    #[error("invalid hostname: {0:?}")]
    InvalidHost(String),

    /// Invalid input provided to a function
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Interactive prompt failed
    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// An unexpected-status error together with its rendered message.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// What the caller was doing
    pub action: String,
    /// Parsed error body and response metadata
    pub info: ErrorInfo,
    /// Message produced by the error translator
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error {
    /// Returns `true` if the request failed before any response arrived.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Http(_))
    }

    /// Returns `true` if the server answered with an unexpected status.
    pub fn is_status_error(&self) -> bool {
        matches!(self, Error::Api(_) | Error::UnparsableError { .. })
    }

    /// Returns `true` if this error indicates a client-side issue
    /// (invalid input, bad request, etc.).
    pub fn is_client_error(&self) -> bool {
        match self.status() {
            Some(status) => (400..500).contains(&status),
            None => matches!(
                self,
                Error::InvalidInput(_) | Error::InvalidHost(_) | Error::Config(_)
            ),
        }
    }

    /// Returns `true` if this error indicates a server-side issue.
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }

    /// The HTTP status code, for status errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.info.status),
            Error::UnparsableError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(action: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Transport {
            action: action.into(),
            source,
        }
    }

    /// Tag a bare transport failure with the action that was in progress.
    pub(crate) fn in_action(self, action: &str) -> Self {
        match self {
            Error::Http(source) => Error::transport(action, source),
            other => other,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api(Box::new(err))
    }
}
