//! Blocking custom runtime client for the AWS Lambda Runtime API.
//!
//! The client long-polls the control plane for the next event, runs a
//! [`Handler`] against it and posts the outcome back, one invocation at a
//! time. See [`run`] for the usual entry point.
//!
//! ```no_run
//! use lambda_runtime_client::{InvocationContext, InvocationResult};
//!
//! fn main() {
//!     lambda_runtime_client::run(|ctx: &InvocationContext| {
//!         InvocationResult::success(ctx.payload.clone(), "application/json")
//!     })
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod envelope;
pub mod error;
mod fetch;
mod post;
pub mod result;
pub mod runtime;

pub use client::RuntimeApiClient;
pub use config::{
    Config, ConfigBuilder, FunctionConfig, HttpConfig, RetryConfig, RetryScope, SuccessStatusRange,
};
pub use context::{
    CLIENT_CONTEXT_HEADER, COGNITO_IDENTITY_HEADER, DEADLINE_MS_HEADER, FUNCTION_ARN_HEADER,
    InvocationContext, REQUEST_ID_HEADER, TRACE_ID_HEADER,
};
pub use endpoint::{API_VERSION, Endpoint};
pub use envelope::ErrorEnvelope;
pub use error::{ConfigError, ProtocolError, Result, RuntimeError};
pub use post::{FUNCTION_ERROR_TYPE_HEADER, INVALID_CONTENT_TYPE_ERROR};
pub use result::{InvocationResult, JSON_CONTENT_TYPE};
pub use runtime::{
    Handler, RetryEvent, RetryObserver, Runtime, TracingObserver, run, run_with_init,
};
