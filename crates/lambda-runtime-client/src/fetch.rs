//! Long-poll fetch of the next invocation.

use crate::client::RuntimeApiClient;
use crate::context::InvocationContext;
use crate::error::{Result, RuntimeError};
use std::sync::Arc;

impl RuntimeApiClient {
    /// Blocks until the control plane hands out the next event.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Transport`] if no response could be obtained.
    /// - [`RuntimeError::Api`] if the control plane answered with a
    ///   non-success status.
    /// - [`RuntimeError::Protocol`] if a required header is missing or
    ///   unusable.
    pub fn next_invocation(&self) -> Result<InvocationContext> {
        let url = self.endpoint.next_invocation();
        tracing::debug!(%url, "Polling for next invocation");

        let response = self.http.get(&url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Api {
                status: status.as_u16(),
            });
        }

        let headers = response.headers().clone();
        let body = response.bytes()?;

        let context = InvocationContext::from_parts(&headers, body, Arc::clone(&self.env_config))?;

        tracing::debug!(
            request_id = %context.request_id,
            deadline = %context.deadline,
            payload_bytes = context.payload.len(),
            "Received invocation"
        );

        Ok(context)
    }
}
