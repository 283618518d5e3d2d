//! # Lambda Runtime API Simulator
//!
//! An in-process stand-in for the Lambda Runtime API control plane, used to
//! test runtime clients without deploying to AWS.
//!
//! ## Features
//!
//! - Long-poll `GET /2018-06-01/runtime/invocation/next`
//! - Response, error and init-error endpoints, with or without a trailing slash
//! - Scripted faults per invocation: omitted or overridden headers, and
//!   non-success statuses for the fetch or the post
//! - Every post recorded byte-for-byte, headers included
//!
//! ## Quick Start
//!
//! ```no_run
//! use lambda_simulator::{InvocationBuilder, Simulator};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let simulator = Simulator::builder()
//!         .function_name("my-test-function")
//!         .build()
//!         .await?;
//!
//!     // Point the runtime under test at this address.
//!     println!("AWS_LAMBDA_RUNTIME_API={}", simulator.runtime_api_host());
//!
//!     let request_id = simulator
//!         .enqueue(InvocationBuilder::new().payload(r#"{"firstName":"Ada"}"#).build())
//!         .await;
//!
//!     let state = simulator
//!         .wait_for_invocation_complete(&request_id, Duration::from_secs(5))
//!         .await?;
//!     println!("{:?}", state.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a blocking client
//!
//! The server runs on tokio worker threads, so a blocking client can be
//! exercised from a plain test thread: build the simulator with
//! `Runtime::block_on` on a multi-threaded runtime and call the client
//! outside of it.

pub mod error;
pub mod invocation;
pub(crate) mod runtime_api;
pub mod simulator;
pub mod state;

pub use error::{SimulatorError, SimulatorResult};
pub use invocation::{
    DEFAULT_FUNCTION_ARN, Faults, Invocation, InvocationBuilder, InvocationStatus, PostKind,
    RecordedPost,
};
pub use simulator::{Simulator, SimulatorBuilder, SimulatorConfig};
pub use state::InvocationState;
