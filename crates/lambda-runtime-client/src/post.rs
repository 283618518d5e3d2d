//! Posting invocation results and init errors.
//!
//! Bodies are always sent as a single fixed-length buffer with an explicit
//! `content-length`, so neither `Transfer-Encoding` nor `Expect` ever go on
//! the wire.

use crate::client::RuntimeApiClient;
use crate::envelope::ErrorEnvelope;
use crate::error::{Result, RuntimeError};
use crate::result::{InvocationResult, JSON_CONTENT_TYPE};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

/// Optional header classifying a reported error.
pub const FUNCTION_ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// Error type reported when a successful result declares a content type that
/// cannot be sent as a header value.
pub const INVALID_CONTENT_TYPE_ERROR: &str = "Runtime.InvalidContentType";

impl RuntimeApiClient {
    /// Posts a handler outcome for `request_id`.
    ///
    /// Successes go to the response URL, failures to the error URL. A
    /// success whose content type is not a valid header value is reported
    /// as a [`INVALID_CONTENT_TYPE_ERROR`] failure instead.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Api`] if the status is outside the configured
    ///   success range.
    /// - [`RuntimeError::Transport`] if no response could be obtained.
    pub fn post_result(&self, result: &InvocationResult, request_id: &str) -> Result<()> {
        let Ok(content_type) = HeaderValue::from_str(result.content_type()) else {
            tracing::warn!(
                request_id,
                content_type = ?result.content_type(),
                "Handler declared an invalid content type"
            );
            let envelope = ErrorEnvelope::new(
                INVALID_CONTENT_TYPE_ERROR,
                format!("invalid content type: {:?}", result.content_type()),
            );
            return self.post_result(&InvocationResult::Failure(envelope), request_id);
        };

        let (url, error_type) = match result {
            InvocationResult::Success { .. } => (self.endpoint.response(request_id), None),
            InvocationResult::Failure(envelope) => (
                self.endpoint.error(request_id),
                Some(envelope.error_type.as_str()),
            ),
        };

        let body = result.body()?;
        let headers = result_headers(content_type, body.len(), error_type);

        tracing::debug!(
            %url,
            request_id,
            success = result.is_success(),
            content_length = body.len(),
            "Posting invocation result"
        );

        self.send(&url, headers, body)
    }

    /// Reports a failed runtime initialisation.
    ///
    /// # Errors
    ///
    /// Same as [`post_result`](Self::post_result).
    pub fn post_init_error(&self, envelope: &ErrorEnvelope) -> Result<()> {
        let url = self.endpoint.init_error();
        let body = envelope.to_json()?;
        let headers = result_headers(
            HeaderValue::from_static(JSON_CONTENT_TYPE),
            body.len(),
            Some(&envelope.error_type),
        );

        tracing::debug!(%url, error_type = %envelope.error_type, "Posting init error");

        self.send(&url, headers, body)
    }

    fn send(&self, url: &str, headers: HeaderMap, body: Bytes) -> Result<()> {
        let response = self.http.post(url).headers(headers).body(body).send()?;

        let status = response.status().as_u16();
        if !self.success_status.contains(status) {
            return Err(RuntimeError::Api { status });
        }

        Ok(())
    }
}

fn result_headers(content_type: HeaderValue, len: usize, error_type: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));

    if let Some(error_type) = error_type {
        match HeaderValue::from_str(error_type) {
            Ok(value) => {
                headers.insert(
                    HeaderName::from_static("lambda-runtime-function-error-type"),
                    value,
                );
            }
            Err(_) => {
                tracing::debug!(error_type, "Error type is not a valid header value; omitting");
            }
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{EXPECT, TRANSFER_ENCODING};

    #[test]
    fn test_headers_for_success() {
        let headers = result_headers(HeaderValue::from_static("application/json"), 23, None);

        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[CONTENT_LENGTH], "23");
        assert!(headers.get(FUNCTION_ERROR_TYPE_HEADER).is_none());
        assert!(headers.get(EXPECT).is_none());
        assert!(headers.get(TRANSFER_ENCODING).is_none());
    }

    #[test]
    fn test_headers_for_failure_carry_error_type() {
        let headers = result_headers(
            HeaderValue::from_static(JSON_CONTENT_TYPE),
            80,
            Some("invalidPayload"),
        );

        assert_eq!(headers[FUNCTION_ERROR_TYPE_HEADER], "invalidPayload");
    }

    #[test]
    fn test_unrepresentable_error_type_is_omitted() {
        let headers =
            result_headers(HeaderValue::from_static(JSON_CONTENT_TYPE), 2, Some("bad\ntype"));
        assert!(headers.get(FUNCTION_ERROR_TYPE_HEADER).is_none());
    }
}
