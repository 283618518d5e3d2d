//! The running control plane and its builder.

use crate::error::{SimulatorError, SimulatorResult};
use crate::invocation::{Invocation, InvocationStatus, PostKind, RecordedPost};
use crate::runtime_api::{RuntimeApiState, create_runtime_api_router};
use crate::state::{InvocationState, RuntimeState};
use bytes::Bytes;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const DEFAULT_FUNCTION_NAME: &str = "simulated-function";

/// Function settings advertised to the runtime under test.
///
/// `timeout` only feeds `Lambda-Runtime-Deadline-Ms`. A runtime that overruns
/// its deadline is left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Deadline offset for invocations enqueued by payload.
    pub timeout: Duration,
    /// `AWS_LAMBDA_FUNCTION_NAME`.
    pub function_name: String,
    /// `AWS_LAMBDA_FUNCTION_VERSION`.
    pub function_version: String,
    /// `AWS_LAMBDA_FUNCTION_MEMORY_SIZE`.
    pub memory_size_mb: u32,
    /// `AWS_LAMBDA_LOG_GROUP_NAME`.
    pub log_group_name: String,
    /// `AWS_LAMBDA_LOG_STREAM_NAME`.
    pub log_stream_name: String,
}

impl SimulatorConfig {
    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
            function_version: "$LATEST".to_string(),
            memory_size_mb: 128,
            log_group_name: format!("/aws/lambda/{DEFAULT_FUNCTION_NAME}"),
            log_stream_name: "2026/01/01/[$LATEST]00000000000000000000000000000000".to_string(),
        }
    }
}

/// Configures and starts a [`Simulator`].
///
/// ```no_run
/// use lambda_simulator::Simulator;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let simulator = Simulator::builder()
///     .function_name("greeter")
///     .invocation_timeout(Duration::from_secs(30))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing unless .build() is called"]
pub struct SimulatorBuilder {
    config: SimulatorConfig,
    port: u16,
}

impl SimulatorBuilder {
    /// Starts from the default settings on an ephemeral port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline offset for payload-only invocations.
    pub fn invocation_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the function name. The log group follows it.
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.config.log_group_name = format!("/aws/lambda/{name}");
        self.config.function_name = name;
        self
    }

    /// Sets the advertised function version.
    pub fn function_version(mut self, version: impl Into<String>) -> Self {
        self.config.function_version = version.into();
        self
    }

    /// Sets the advertised memory size.
    pub fn memory_size_mb(mut self, memory: u32) -> Self {
        self.config.memory_size_mb = memory;
        self
    }

    /// Binds a fixed loopback port instead of an ephemeral one.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Binds the listener and spawns the server on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::BindError`] if the port is taken,
    /// [`SimulatorError::ServerStart`] if the bound address cannot be read.
    pub async fn build(self) -> SimulatorResult<Simulator> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, self.port)))
            .await
            .map_err(|e| SimulatorError::BindError(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| SimulatorError::ServerStart(e.to_string()))?;

        let runtime_state = Arc::new(RuntimeState::default());
        let router = create_runtime_api_router(RuntimeApiState {
            runtime: Arc::clone(&runtime_state),
        });
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .map_err(|e| SimulatorError::ServerStart(e.to_string()))
        });

        tracing::debug!(
            %addr,
            function = %self.config.function_name,
            "Runtime API simulator listening"
        );

        Ok(Simulator {
            runtime_state,
            config: Arc::new(self.config),
            addr,
            server_handle,
        })
    }
}

/// A Runtime API control plane served on a loopback port.
///
/// Dropping it leaves the server task running until its tokio runtime shuts
/// down; call [`shutdown`](Self::shutdown) to stop it earlier.
pub struct Simulator {
    runtime_state: Arc<RuntimeState>,
    config: Arc<SimulatorConfig>,
    addr: SocketAddr,
    server_handle: JoinHandle<SimulatorResult<()>>,
}

impl Simulator {
    /// Shorthand for [`SimulatorBuilder::new`].
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::new()
    }

    /// Base URL, e.g. `http://127.0.0.1:9001`.
    pub fn runtime_api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `host:port`, the form `AWS_LAMBDA_RUNTIME_API` takes.
    pub fn runtime_api_host(&self) -> String {
        self.addr.to_string()
    }

    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Advertised function settings.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Queues an invocation for the next fetch and returns its request id.
    ///
    /// ```no_run
    /// use lambda_simulator::{InvocationBuilder, Simulator};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let simulator = Simulator::builder().build().await?;
    ///
    /// let request_id = simulator
    ///     .enqueue(
    ///         InvocationBuilder::new()
    ///             .payload(r#"{"firstName":"Ada"}"#)
    ///             .omit_header("Lambda-Runtime-Deadline-Ms")
    ///             .build(),
    ///     )
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue(&self, invocation: Invocation) -> String {
        let request_id = invocation.request_id.clone();
        tracing::debug!(
            %request_id,
            faulted = !invocation.faults.is_empty(),
            "Enqueued invocation"
        );
        self.runtime_state.enqueue_invocation(invocation).await;
        request_id
    }

    /// Queues a well-formed invocation whose deadline is the configured
    /// timeout from now.
    pub async fn enqueue_payload(&self, payload: impl Into<Bytes>) -> String {
        self.enqueue(Invocation::new(payload, self.config.timeout_ms()))
            .await
    }

    /// Lifecycle of one invocation, if it was ever enqueued.
    pub async fn get_invocation_state(&self, request_id: &str) -> Option<InvocationState> {
        self.runtime_state.get_invocation_state(request_id).await
    }

    /// Every post received so far, in arrival order, rejected ones included.
    pub async fn posts(&self) -> Vec<RecordedPost> {
        self.runtime_state.posts().await
    }

    /// Posts received on the init-error endpoint.
    pub async fn init_errors(&self) -> Vec<RecordedPost> {
        let mut posts = self.posts().await;
        posts.retain(|post| post.kind == PostKind::InitError);
        posts
    }

    /// Fetches received, counting one that may still be long-polling.
    pub fn next_request_count(&self) -> usize {
        self.runtime_state.next_request_count()
    }

    /// Stops the server and waits for its task to end.
    pub async fn shutdown(self) {
        self.server_handle.abort();
        let _ = self.server_handle.await;
    }

    /// Waits until the invocation has an accepted response or error post.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::InvocationNotFound`] for an unknown request id,
    /// [`SimulatorError::Timeout`] if nothing was accepted in time.
    pub async fn wait_for_invocation_complete(
        &self,
        request_id: &str,
        timeout: Duration,
    ) -> SimulatorResult<InvocationState> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let changed = self.runtime_state.state_changed();

            let Some(state) = self.runtime_state.get_invocation_state(request_id).await else {
                return Err(SimulatorError::InvocationNotFound(request_id.to_string()));
            };
            if matches!(
                state.status,
                InvocationStatus::Success | InvocationStatus::Error
            ) {
                return Ok(state);
            }

            tokio::select! {
                _ = changed => {},
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(SimulatorError::Timeout(format!(
                        "invocation {request_id} still {:?} after {timeout:?}",
                        state.status
                    )));
                }
            }
        }
    }

    /// Waits until at least `count` posts have arrived.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::Timeout`] if fewer arrive in time.
    pub async fn wait_for_posts(
        &self,
        count: usize,
        timeout: Duration,
    ) -> SimulatorResult<Vec<RecordedPost>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let changed = self.runtime_state.state_changed();

            let posts = self.posts().await;
            if posts.len() >= count {
                return Ok(posts);
            }

            tokio::select! {
                _ = changed => {},
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(SimulatorError::Timeout(format!(
                        "{} of {count} posts after {timeout:?}",
                        posts.len()
                    )));
                }
            }
        }
    }

    /// The environment a runtime process sees inside Lambda, pointed at this
    /// simulator.
    #[must_use]
    pub fn lambda_env_vars(&self) -> HashMap<String, String> {
        let config = &self.config;

        [
            ("AWS_LAMBDA_RUNTIME_API", self.runtime_api_host()),
            ("AWS_LAMBDA_FUNCTION_NAME", config.function_name.clone()),
            ("AWS_LAMBDA_FUNCTION_VERSION", config.function_version.clone()),
            (
                "AWS_LAMBDA_FUNCTION_MEMORY_SIZE",
                config.memory_size_mb.to_string(),
            ),
            ("AWS_LAMBDA_LOG_GROUP_NAME", config.log_group_name.clone()),
            ("AWS_LAMBDA_LOG_STREAM_NAME", config.log_stream_name.clone()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }
}
