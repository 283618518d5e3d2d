//! Error types for the runtime client.
//!
//! Errors fall into three groups:
//!
//! - [`ConfigError`]: the runtime cannot be set up at all. Never retried.
//! - [`ProtocolError`]: the control plane answered, but the answer is unusable.
//! - [`RuntimeError`]: everything the invocation loop can observe, including
//!   the two above, HTTP status failures and transport failures.

use thiserror::Error;

/// A specialised Result type for runtime client operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors raised while resolving the runtime configuration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `AWS_LAMBDA_RUNTIME_API` is not set.
    #[error("AWS_LAMBDA_RUNTIME_API is not set")]
    MissingRuntimeApi,

    /// The runtime API address does not form a valid `http://` URL.
    #[error("invalid runtime API address: {0:?}")]
    InvalidRuntimeApi(String),

    /// Layered configuration could not be extracted.
    #[error("failed to load configuration")]
    Load(#[source] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

/// A next-invocation response that cannot be turned into an invocation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A required header is absent.
    #[error("missing required header {0}")]
    MissingHeader(&'static str),

    /// A required header is present but its value is unusable.
    #[error("invalid value for header {header}: {value:?}")]
    InvalidHeader {
        /// Name of the offending header.
        header: &'static str,
        /// The raw value, lossily decoded.
        value: String,
    },
}

impl ProtocolError {
    /// Returns the name of the header that caused the failure.
    pub fn header(&self) -> &'static str {
        match self {
            ProtocolError::MissingHeader(header) => header,
            ProtocolError::InvalidHeader { header, .. } => header,
        }
    }
}

/// Errors observed by the invocation loop.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The control plane sent a malformed next-invocation response.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The control plane answered with a status outside the success range.
    #[error("runtime API returned status {status}")]
    Api {
        /// HTTP status code of the reply.
        status: u16,
    },

    /// No response could be obtained from the control plane.
    #[error("runtime API request failed")]
    Transport(#[from] reqwest::Error),

    /// An error envelope could not be serialised.
    #[error("failed to encode error envelope")]
    Encode(#[from] serde_json::Error),

    /// The retry budget is spent.
    #[error("giving up after {attempts} failed attempts")]
    RetriesExhausted {
        /// Number of failures that consumed the budget.
        attempts: u32,
        /// The failure that exhausted the budget.
        #[source]
        last: Box<RuntimeError>,
    },
}

impl RuntimeError {
    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            RuntimeError::Api { status } => Some(*status),
            _ => None,
        }
    }
}
