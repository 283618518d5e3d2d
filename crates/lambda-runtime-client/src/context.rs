//! Per-invocation context assembled from a next-invocation response.
//!
//! Four headers are required. Presence of all four is checked first, in a
//! fixed order, so a missing header is reported even when an earlier one
//! holds an unusable value. Values are then decoded as UTF-8.
//!
//! The client context and Cognito identity headers are convenience data and
//! degrade to `None` when they are missing or do not hold valid JSON.

use crate::config::FunctionConfig;
use crate::error::ProtocolError;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use http::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::sync::Arc;

/// Header carrying the invocation request id.
pub const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
/// Header carrying the invoked function ARN.
pub const FUNCTION_ARN_HEADER: &str = "Lambda-Runtime-Invoked-Function-Arn";
/// Header carrying the X-Ray trace id.
pub const TRACE_ID_HEADER: &str = "Lambda-Runtime-Trace-Id";
/// Header carrying the deadline in epoch milliseconds.
pub const DEADLINE_MS_HEADER: &str = "Lambda-Runtime-Deadline-Ms";
/// Optional header carrying the mobile SDK client context.
pub const CLIENT_CONTEXT_HEADER: &str = "Lambda-Runtime-Client-Context";
/// Optional header carrying the Cognito identity.
pub const COGNITO_IDENTITY_HEADER: &str = "Lambda-Runtime-Cognito-Identity";

/// One fetched event and its metadata.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Raw event body. Empty when the control plane sent no body.
    pub payload: Bytes,
    /// Unique id of this invocation.
    pub request_id: String,
    /// ARN of the function being invoked.
    pub invoked_function_arn: String,
    /// Opaque tracing token.
    pub trace_id: String,
    /// Absolute time by which the result must be posted.
    pub deadline: DateTime<Utc>,
    /// Client context passed by the mobile SDK, if any.
    pub client_context: Option<Value>,
    /// Cognito identity of the caller, if any.
    pub identity: Option<Value>,
    /// Static function settings shared by every invocation.
    pub env_config: Arc<FunctionConfig>,
}

impl InvocationContext {
    /// Builds a context from the headers and body of a next-invocation
    /// response.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingHeader`] naming the first absent
    /// required header, or [`ProtocolError::InvalidHeader`] when a required
    /// header is not UTF-8, the request id is empty or a dot segment, or the
    /// deadline is not a millisecond count.
    pub fn from_parts(
        headers: &HeaderMap,
        payload: Bytes,
        env_config: Arc<FunctionConfig>,
    ) -> Result<Self, ProtocolError> {
        let [request_id, arn, trace_id, deadline_ms] = required_headers(headers)?;

        let request_id = decode_value(REQUEST_ID_HEADER, request_id)?;
        if matches!(request_id.as_str(), "" | "." | "..") {
            return Err(ProtocolError::InvalidHeader {
                header: REQUEST_ID_HEADER,
                value: request_id,
            });
        }
        let invoked_function_arn = decode_value(FUNCTION_ARN_HEADER, arn)?;
        let trace_id = decode_value(TRACE_ID_HEADER, trace_id)?;
        let deadline = parse_deadline(&decode_value(DEADLINE_MS_HEADER, deadline_ms)?)?;

        Ok(Self {
            payload,
            request_id,
            invoked_function_arn,
            trace_id,
            deadline,
            client_context: optional_json(headers, CLIENT_CONTEXT_HEADER),
            identity: optional_json(headers, COGNITO_IDENTITY_HEADER),
            env_config,
        })
    }

    /// Time left until the deadline. Negative once the deadline has passed.
    pub fn remaining_time(&self) -> TimeDelta {
        self.remaining_time_at(Utc::now())
    }

    /// Time left until the deadline as seen from `now`.
    pub fn remaining_time_at(&self, now: DateTime<Utc>) -> TimeDelta {
        self.deadline - now
    }
}

fn required_headers(headers: &HeaderMap) -> Result<[&HeaderValue; 4], ProtocolError> {
    let present = |name: &'static str| headers.get(name).ok_or(ProtocolError::MissingHeader(name));

    Ok([
        present(REQUEST_ID_HEADER)?,
        present(FUNCTION_ARN_HEADER)?,
        present(TRACE_ID_HEADER)?,
        present(DEADLINE_MS_HEADER)?,
    ])
}

fn decode_value(name: &'static str, value: &HeaderValue) -> Result<String, ProtocolError> {
    std::str::from_utf8(value.as_bytes())
        .map(str::to_string)
        .map_err(|_| ProtocolError::InvalidHeader {
            header: name,
            value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        })
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, ProtocolError> {
    let invalid = || ProtocolError::InvalidHeader {
        header: DEADLINE_MS_HEADER,
        value: raw.to_string(),
    };

    let millis: u64 = raw.trim().parse().map_err(|_| invalid())?;
    let millis = i64::try_from(millis).map_err(|_| invalid())?;
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(invalid)
}

fn optional_json(headers: &HeaderMap, name: &'static str) -> Option<Value> {
    let value = headers.get(name)?;

    match serde_json::from_slice(value.as_bytes()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::debug!(header = name, error = %err, "Ignoring unparsable optional header");
            None
        }
    }
}
