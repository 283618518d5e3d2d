//! Runtime API URL construction.
//!
//! The control plane address arrives as a bare `host:port` string. Every URL
//! the client talks to lives under `http://{host}/{API_VERSION}/runtime/`.
//!
//! Request ids are placed into a single percent-encoded path segment, so an
//! id containing `/`, `?` or `#` cannot address a different route. Ids must
//! be non-empty and must not be `.` or `..`; the invocation decoder rejects
//! those before they reach here.

use crate::error::ConfigError;
use reqwest::Url;

/// Runtime API version all paths are rooted at.
pub const API_VERSION: &str = "2018-06-01";

/// The four control-plane URLs, derived once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    runtime: Url,
}

impl Endpoint {
    /// Builds an endpoint from a `host:port` runtime API address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRuntimeApi`] if `http://{host}` is not a
    /// valid URL consisting of a host and optional port only.
    ///
    /// # Examples
    ///
    /// ```
    /// use lambda_runtime_client::Endpoint;
    ///
    /// let endpoint = Endpoint::new("127.0.0.1:9001").unwrap();
    /// assert_eq!(
    ///     endpoint.next_invocation(),
    ///     "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next"
    /// );
    /// ```
    pub fn new(host: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRuntimeApi(host.to_string());

        let url = Url::parse(&format!("http://{host}")).map_err(|_| invalid())?;
        let has_host = url.host_str().is_some_and(|h| !h.is_empty());
        if !has_host || url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid());
        }

        let runtime = url.join(&format!("/{API_VERSION}/runtime")).map_err(|_| invalid())?;

        Ok(Self {
            host: host.to_string(),
            runtime,
        })
    }

    /// The runtime API address this endpoint was built from.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `POST` target for initialisation failures.
    pub fn init_error(&self) -> String {
        self.under(["init", "error"])
    }

    /// Long-poll `GET` target for the next event.
    pub fn next_invocation(&self) -> String {
        self.under(["invocation", "next"])
    }

    /// `POST` target for a successful result.
    pub fn response(&self, request_id: &str) -> String {
        self.under(["invocation", request_id, "response", ""])
    }

    /// `POST` target for a failed result.
    pub fn error(&self, request_id: &str) -> String {
        self.under(["invocation", request_id, "error", ""])
    }

    fn under<const N: usize>(&self, segments: [&str; N]) -> String {
        let mut url = self.runtime.clone();
        // An http URL always has a path, so this never falls through.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url.into()
    }
}
