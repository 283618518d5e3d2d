//! Example function for the Lambda runtime client.
//!
//! Decodes `{"firstName": "..."}` and answers with a greeting. Anything else
//! is reported back to Lambda as an `invalidPayload` error.
//!
//! The salutation defaults to `Hello` and can be changed through
//! `GREETING_SALUTATION`. A blank salutation fails initialisation.
//!
//! ```no_run
//! lambda_runtime_client::run_with_init(|_| lambda_runtime_example::Greeter::from_env())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use lambda_runtime_client::{ErrorEnvelope, Handler, InvocationContext, InvocationResult};
use serde::{Deserialize, Serialize};
use std::env::{self, VarError};

/// Error type reported for undecodable events.
pub const INVALID_PAYLOAD: &str = "invalidPayload";

/// Error type reported when the configured salutation is unusable.
pub const INVALID_SALUTATION: &str = "invalidSalutation";

/// Environment variable overriding the salutation.
pub const SALUTATION_VAR: &str = "GREETING_SALUTATION";

/// Salutation used when none is configured.
pub const DEFAULT_SALUTATION: &str = "Hello";

/// Incoming event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreetingRequest {
    /// Who to greet.
    pub first_name: String,
}

/// Outgoing response.
#[derive(Debug, Serialize)]
pub struct GreetingResponse {
    /// The greeting.
    pub message: String,
}

/// Greeting handler with a configurable salutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeter {
    salutation: String,
}

impl Greeter {
    /// Creates a greeter.
    ///
    /// # Errors
    ///
    /// Returns an [`INVALID_SALUTATION`] envelope if `salutation` is blank.
    pub fn new(salutation: impl Into<String>) -> Result<Self, ErrorEnvelope> {
        let salutation = salutation.into();
        if salutation.trim().is_empty() {
            return Err(ErrorEnvelope::new(
                INVALID_SALUTATION,
                format!("{SALUTATION_VAR} must not be blank"),
            ));
        }
        Ok(Self { salutation })
    }

    /// Reads the salutation from [`SALUTATION_VAR`], falling back to
    /// [`DEFAULT_SALUTATION`].
    ///
    /// # Errors
    ///
    /// Returns an [`INVALID_SALUTATION`] envelope if the variable is set but
    /// blank or not unicode.
    pub fn from_env() -> Result<Self, ErrorEnvelope> {
        match env::var(SALUTATION_VAR) {
            Ok(salutation) => Self::new(salutation),
            Err(VarError::NotPresent) => Self::new(DEFAULT_SALUTATION),
            Err(VarError::NotUnicode(_)) => Err(ErrorEnvelope::new(
                INVALID_SALUTATION,
                format!("{SALUTATION_VAR} is not valid unicode"),
            )),
        }
    }

    /// Builds the result for a raw event body.
    pub fn reply(&self, payload: &[u8]) -> InvocationResult {
        let request: GreetingRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting event");
                return InvocationResult::failure(INVALID_PAYLOAD, "Payload is invalid");
            }
        };

        let response = GreetingResponse {
            message: format!("{} {}", self.salutation, request.first_name),
        };

        InvocationResult::json(&response)
            .unwrap_or_else(|e| InvocationResult::failure("encodeFailed", e.to_string()))
    }
}

impl Default for Greeter {
    fn default() -> Self {
        Self {
            salutation: DEFAULT_SALUTATION.to_string(),
        }
    }
}

impl Handler for Greeter {
    fn call(&mut self, context: &InvocationContext) -> InvocationResult {
        tracing::info!(
            request_id = %context.request_id,
            remaining_ms = context.remaining_time().num_milliseconds(),
            "Handling greeting"
        );

        self.reply(&context.payload)
    }
}

/// Handler entry point using the default salutation.
pub fn greet(context: &InvocationContext) -> InvocationResult {
    Greeter::default().call(context)
}

/// Builds the result for a raw event body using the default salutation.
pub fn greeting(payload: &[u8]) -> InvocationResult {
    Greeter::default().reply(payload)
}
