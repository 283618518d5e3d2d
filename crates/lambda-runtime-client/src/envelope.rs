//! The JSON error envelope posted for failed invocations and init errors.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A structured error in the shape the Runtime API expects.
///
/// Serialises as `{"errorType":…,"errorMessage":…,"stackTrace":[…]}`, in
/// that field order. `stackTrace` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Classification of the error, e.g. `invalidPayload`.
    pub error_type: String,

    /// Human readable description.
    pub error_message: String,

    /// Stack frames, outermost first. May be empty.
    #[serde(default)]
    pub stack_trace: Vec<String>,
}

impl ErrorEnvelope {
    /// Creates an envelope with an empty stack trace.
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
            stack_trace: Vec::new(),
        }
    }

    /// Replaces the stack trace.
    #[must_use]
    pub fn with_stack_trace<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stack_trace = frames.into_iter().map(Into::into).collect();
        self
    }

    /// Builds an envelope from any error value.
    ///
    /// The error type is the Rust type name, the message is its `Display`
    /// output and the stack trace lists the `source()` chain.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error,
    {
        let mut frames = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            frames.push(cause.to_string());
            source = cause.source();
        }

        Self::new(std::any::type_name::<E>(), error.to_string()).with_stack_trace(frames)
    }

    /// Encodes the envelope as compact JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialisation failures from `serde_json`.
    pub fn to_json(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
