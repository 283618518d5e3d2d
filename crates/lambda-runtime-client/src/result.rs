//! Handler outcomes and their wire encoding.

use crate::envelope::ErrorEnvelope;
use bytes::Bytes;
use serde::Serialize;

/// Content type used for error envelopes and JSON payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// The outcome of one handler call.
///
/// The body and content type that go on the wire are derived from the
/// variant by [`body`](Self::body) and [`content_type`](Self::content_type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    /// The handler produced a payload.
    Success {
        /// Response body, possibly empty.
        payload: Bytes,
        /// MIME type of `payload`.
        content_type: String,
    },
    /// The handler failed.
    Failure(ErrorEnvelope),
}

impl InvocationResult {
    /// A success with an explicit content type.
    pub fn success(payload: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        InvocationResult::Success {
            payload: payload.into(),
            content_type: content_type.into(),
        }
    }

    /// A success carrying `value` encoded as JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialisation failures from `serde_json`.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(value)?;
        Ok(Self::success(payload, JSON_CONTENT_TYPE))
    }

    /// A failure with an empty stack trace.
    pub fn failure(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        InvocationResult::Failure(ErrorEnvelope::new(error_type, error_message))
    }

    /// Returns `true` for the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success { .. })
    }

    /// The `content-type` header value for this result.
    pub fn content_type(&self) -> &str {
        match self {
            InvocationResult::Success { content_type, .. } => content_type,
            InvocationResult::Failure(_) => JSON_CONTENT_TYPE,
        }
    }

    /// The exact bytes to post.
    ///
    /// # Errors
    ///
    /// Fails only if a failure envelope cannot be serialised.
    pub fn body(&self) -> Result<Bytes, serde_json::Error> {
        match self {
            InvocationResult::Success { payload, .. } => Ok(payload.clone()),
            InvocationResult::Failure(envelope) => envelope.to_json(),
        }
    }
}

impl From<ErrorEnvelope> for InvocationResult {
    fn from(envelope: ErrorEnvelope) -> Self {
        InvocationResult::Failure(envelope)
    }
}
