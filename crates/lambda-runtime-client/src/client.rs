//! Blocking HTTP client for the Runtime API.
//!
//! The fetch and post exchanges live in [`crate::fetch`] and [`crate::post`]
//! as further `impl` blocks on [`RuntimeApiClient`].

use crate::config::{Config, FunctionConfig, SuccessStatusRange};
use crate::endpoint::Endpoint;
use crate::error::Result;
use reqwest::blocking::Client;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client for one control plane.
///
/// Holds only read-only state, so one instance serves every invocation of
/// the process.
#[derive(Debug, Clone)]
pub struct RuntimeApiClient {
    pub(crate) http: Client,
    pub(crate) endpoint: Endpoint,
    pub(crate) success_status: SuccessStatusRange,
    pub(crate) env_config: Arc<FunctionConfig>,
}

impl RuntimeApiClient {
    /// Creates a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the runtime API address is missing
    /// or malformed, and a transport error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let http = build_http_client(config.http.connect_timeout)?;

        Ok(Self {
            http,
            endpoint,
            success_status: config.http.success_status,
            env_config: Arc::new(config.function.clone()),
        })
    }

    /// Creates a client for `endpoint` with default HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn with_endpoint(endpoint: Endpoint) -> Result<Self> {
        let config = Config::default();
        let http = build_http_client(config.http.connect_timeout)?;

        Ok(Self {
            http,
            endpoint,
            success_status: config.http.success_status,
            env_config: Arc::new(config.function),
        })
    }

    /// The control plane this client talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The status range accepted when posting results.
    pub fn success_status(&self) -> SuccessStatusRange {
        self.success_status
    }

    /// Function settings attached to every fetched context.
    pub fn env_config(&self) -> &Arc<FunctionConfig> {
        &self.env_config
    }
}

fn build_http_client(connect_timeout: Duration) -> Result<Client> {
    // The next-invocation GET is a long poll, so reads must never time out.
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .timeout(None::<Duration>)
        .build()?;
    Ok(client)
}
