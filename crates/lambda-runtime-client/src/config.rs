//! Configuration loading and management.
//!
//! Configuration is layered with figment. Later sources override earlier ones:
//!
//! 1. Default values (compiled in)
//! 2. Standard Lambda environment variables
//! 3. Client-specific environment variables (`LAMBDA_RUNTIME_CLIENT_*`)
//!
//! No configuration file is read.
//!
//! # Standard Environment Variables
//!
//! | Variable | Config Path |
//! |----------|-------------|
//! | `AWS_LAMBDA_RUNTIME_API` | `runtime_api` |
//! | `AWS_LAMBDA_FUNCTION_NAME` | `function.name` |
//! | `AWS_LAMBDA_FUNCTION_VERSION` | `function.version` |
//! | `AWS_LAMBDA_FUNCTION_MEMORY_SIZE` | `function.memory_size_mb` |
//! | `AWS_LAMBDA_LOG_GROUP_NAME` | `function.log_group_name` |
//! | `AWS_LAMBDA_LOG_STREAM_NAME` | `function.log_stream_name` |
//!
//! Client-specific variables use `__` to separate nesting levels, for example
//! `LAMBDA_RUNTIME_CLIENT_RETRY__MAX_ATTEMPTS=5` or
//! `LAMBDA_RUNTIME_CLIENT_HTTP__SUCCESS_STATUS=legacy`.

use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_PREFIX: &str = "LAMBDA_RUNTIME_CLIENT_";

/// Environment variable holding the control plane `host:port`.
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Retry budget applied by the invocation loop.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How long the retry budget lives.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryScope {
    /// The budget is restored after every successful fetch, invoke and post,
    /// so only consecutive failures terminate the process.
    #[default]
    Invocation,
    /// The budget is spent cumulatively over the life of the process.
    Process,
}

/// HTTP status codes a result post accepts as success.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuccessStatusRange {
    /// `200..=299`.
    #[default]
    Conventional,
    /// `200..=300`, for deployments that depend on 300 being accepted.
    Legacy,
}

impl SuccessStatusRange {
    /// Returns whether `status` counts as success.
    pub fn contains(self, status: u16) -> bool {
        match self {
            SuccessStatusRange::Conventional => (200..=299).contains(&status),
            SuccessStatusRange::Legacy => (200..=300).contains(&status),
        }
    }
}

/// Main configuration struct for the runtime client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control plane address (`host:port`).
    pub runtime_api: Option<String>,
    /// Static function settings exposed to handlers.
    pub function: FunctionConfig,
    /// Retry behaviour of the invocation loop.
    pub retry: RetryConfig,
    /// HTTP client behaviour.
    pub http: HttpConfig,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value of the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(standard_lambda_env())
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(figment.extract()?)
    }

    /// Creates a new config builder for testing.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Resolves the control plane endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRuntimeApi`] when no address is set and
    /// [`ConfigError::InvalidRuntimeApi`] when it is malformed.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let host = self
            .runtime_api
            .as_deref()
            .ok_or(ConfigError::MissingRuntimeApi)?;
        Endpoint::new(host)
    }
}

/// Function settings Lambda exposes through the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    /// Function name.
    pub name: Option<String>,
    /// Function version, e.g. `$LATEST`.
    pub version: Option<String>,
    /// Configured memory in MB.
    pub memory_size_mb: Option<u32>,
    /// CloudWatch log group.
    pub log_group_name: Option<String>,
    /// CloudWatch log stream.
    pub log_stream_name: Option<String>,
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Failures tolerated before the process terminates.
    pub max_attempts: u32,
    /// Lifetime of the retry budget.
    pub scope: RetryScope,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scope: RetryScope::default(),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Status codes accepted when posting results.
    pub success_status: SuccessStatusRange,
    /// TCP connect timeout in milliseconds. Reads are never timed out
    /// because the next-invocation call is a long poll.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            success_status: SuccessStatusRange::default(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for constructing configuration programmatically.
#[must_use = "builders do nothing unless .build() is called"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new config builder with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the control plane address.
    pub fn runtime_api(mut self, host: impl Into<String>) -> Self {
        self.config.runtime_api = Some(host.into());
        self
    }

    /// Sets the function name.
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.config.function.name = Some(name.into());
        self
    }

    /// Sets the retry budget.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Sets the retry budget scope.
    pub fn retry_scope(mut self, scope: RetryScope) -> Self {
        self.config.retry.scope = scope;
        self
    }

    /// Sets the accepted status range for result posts.
    pub fn success_status(mut self, range: SuccessStatusRange) -> Self {
        self.config.http.success_status = range;
        self
    }

    /// Sets the TCP connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.connect_timeout = timeout;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial function config for standard Lambda env var overrides.
#[derive(Debug, Default, Serialize)]
struct PartialFunctionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_size_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_stream_name: Option<String>,
}

/// Partial config for standard Lambda env var overrides.
#[derive(Debug, Default, Serialize)]
struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime_api: Option<String>,
    function: PartialFunctionConfig,
}

fn standard_lambda_env() -> Serialized<PartialConfig> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    let config = PartialConfig {
        runtime_api: var(RUNTIME_API_ENV),
        function: PartialFunctionConfig {
            name: var("AWS_LAMBDA_FUNCTION_NAME"),
            version: var("AWS_LAMBDA_FUNCTION_VERSION"),
            memory_size_mb: var("AWS_LAMBDA_FUNCTION_MEMORY_SIZE").and_then(|v| v.parse().ok()),
            log_group_name: var("AWS_LAMBDA_LOG_GROUP_NAME"),
            log_stream_name: var("AWS_LAMBDA_LOG_STREAM_NAME"),
        },
    };

    Serialized::defaults(config)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const LAMBDA_VARS: [&str; 6] = [
        "AWS_LAMBDA_RUNTIME_API",
        "AWS_LAMBDA_FUNCTION_NAME",
        "AWS_LAMBDA_FUNCTION_VERSION",
        "AWS_LAMBDA_FUNCTION_MEMORY_SIZE",
        "AWS_LAMBDA_LOG_GROUP_NAME",
        "AWS_LAMBDA_LOG_STREAM_NAME",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        LAMBDA_VARS.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.runtime_api.is_none());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.scope, RetryScope::Invocation);
        assert_eq!(config.http.success_status, SuccessStatusRange::Conventional);
        assert_eq!(config.http.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.function, FunctionConfig::default());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .runtime_api("127.0.0.1:9001")
            .function_name("greeter")
            .max_attempts(5)
            .retry_scope(RetryScope::Process)
            .success_status(SuccessStatusRange::Legacy)
            .connect_timeout(Duration::from_millis(250))
            .build();

        assert_eq!(config.runtime_api.as_deref(), Some("127.0.0.1:9001"));
        assert_eq!(config.function.name.as_deref(), Some("greeter"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.scope, RetryScope::Process);
        assert_eq!(config.http.success_status, SuccessStatusRange::Legacy);
        assert_eq!(config.http.connect_timeout, Duration::from_millis(250));
    }

    #[test]
    #[serial]
    fn test_load_reads_standard_lambda_variables() {
        let vars = [
            ("AWS_LAMBDA_RUNTIME_API", Some("127.0.0.1:9001")),
            ("AWS_LAMBDA_FUNCTION_NAME", Some("greeter")),
            ("AWS_LAMBDA_FUNCTION_VERSION", Some("$LATEST")),
            ("AWS_LAMBDA_FUNCTION_MEMORY_SIZE", Some("256")),
            ("AWS_LAMBDA_LOG_GROUP_NAME", Some("/aws/lambda/greeter")),
            ("AWS_LAMBDA_LOG_STREAM_NAME", Some("2024/01/01/[$LATEST]abc")),
        ];

        temp_env::with_vars(vars, || {
            let config = Config::load().unwrap();

            assert_eq!(config.runtime_api.as_deref(), Some("127.0.0.1:9001"));
            assert_eq!(config.function.name.as_deref(), Some("greeter"));
            assert_eq!(config.function.version.as_deref(), Some("$LATEST"));
            assert_eq!(config.function.memory_size_mb, Some(256));
            assert_eq!(
                config.function.log_group_name.as_deref(),
                Some("/aws/lambda/greeter")
            );
            assert_eq!(
                config.endpoint().unwrap().next_invocation(),
                "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next"
            );
        });
    }

    #[test]
    #[serial]
    fn test_load_applies_prefixed_overrides() {
        let mut vars = cleared();
        vars.extend([
            ("AWS_LAMBDA_RUNTIME_API", Some("127.0.0.1:9001")),
            ("LAMBDA_RUNTIME_CLIENT_RETRY__MAX_ATTEMPTS", Some("7")),
            ("LAMBDA_RUNTIME_CLIENT_RETRY__SCOPE", Some("process")),
            ("LAMBDA_RUNTIME_CLIENT_HTTP__SUCCESS_STATUS", Some("legacy")),
            ("LAMBDA_RUNTIME_CLIENT_HTTP__CONNECT_TIMEOUT", Some("1500")),
        ]);

        temp_env::with_vars(vars, || {
            let config = Config::load().unwrap();

            assert_eq!(config.retry.max_attempts, 7);
            assert_eq!(config.retry.scope, RetryScope::Process);
            assert_eq!(config.http.success_status, SuccessStatusRange::Legacy);
            assert_eq!(config.http.connect_timeout, Duration::from_millis(1500));
        });
    }

    #[test]
    #[serial]
    fn test_missing_runtime_api_is_config_error() {
        temp_env::with_vars(cleared(), || {
            let config = Config::load().unwrap();

            assert!(config.runtime_api.is_none());
            assert!(matches!(
                config.endpoint(),
                Err(ConfigError::MissingRuntimeApi)
            ));
        });
    }

    #[test]
    #[serial]
    fn test_unparsable_memory_size_is_ignored() {
        let mut vars = cleared();
        vars.push(("AWS_LAMBDA_FUNCTION_MEMORY_SIZE", Some("lots")));

        temp_env::with_vars(vars, || {
            let config = Config::load().unwrap();
            assert!(config.function.memory_size_mb.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_wrongly_typed_override_fails_to_load() {
        temp_env::with_vars(
            [("LAMBDA_RUNTIME_CLIENT_RETRY__MAX_ATTEMPTS", Some("many"))],
            || {
                let err = Config::load().unwrap_err();
                assert!(matches!(err, ConfigError::Load(_)));
            },
        );
    }

    #[test]
    fn test_success_status_ranges() {
        let conventional = SuccessStatusRange::Conventional;
        assert!(conventional.contains(200));
        assert!(conventional.contains(202));
        assert!(conventional.contains(299));
        assert!(!conventional.contains(300));
        assert!(!conventional.contains(199));
        assert!(!conventional.contains(500));

        // Legacy wire compatibility keeps 300 as a success.
        let legacy = SuccessStatusRange::Legacy;
        assert!(legacy.contains(300));
        assert!(!legacy.contains(301));
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&RetryScope::Process).unwrap(),
            "\"process\""
        );
        assert_eq!(
            serde_json::to_string(&SuccessStatusRange::Legacy).unwrap(),
            "\"legacy\""
        );
    }
}
