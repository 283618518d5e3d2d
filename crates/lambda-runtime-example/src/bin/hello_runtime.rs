//! Greeting function served through the Lambda Runtime API.
//!
//! Reads its settings from the standard Lambda environment, in particular
//! `AWS_LAMBDA_RUNTIME_API`, plus `GREETING_SALUTATION`. Log verbosity
//! follows `RUST_LOG`.
//!
//! Exits with status 1 when the environment is unusable, the salutation is
//! blank (after reporting an init error), or the control plane keeps failing.

use anyhow::{Context, Result};
use lambda_runtime_example::Greeter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    init_tracing().context("failed to initialise tracing subscriber")?;

    lambda_runtime_client::run_with_init(|_| Greeter::from_env())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lambda_runtime_client=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).without_time())
        .with(filter)
        .try_init()
        .context("failed to initialise tracing registry")?;

    Ok(())
}
