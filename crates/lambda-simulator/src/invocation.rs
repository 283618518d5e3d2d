//! Scripted invocations, fault injection and recorded posts.

use axum::http::HeaderMap;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Default ARN handed out when none is scripted.
pub const DEFAULT_FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:test-function";

/// Deviations from a well-formed exchange, applied by the simulator when
/// serving or acknowledging this invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// Headers left out of the next-invocation response.
    pub omit_headers: Vec<String>,
    /// Headers whose value is replaced verbatim (inserted when absent).
    pub header_overrides: Vec<(String, String)>,
    /// Status served instead of 200 for the next-invocation response.
    /// When set, no invocation headers are sent.
    pub next_status: Option<u16>,
    /// Status returned instead of 202 when the result is posted.
    pub post_status: Option<u16>,
}

impl Faults {
    /// Whether any fault is scripted.
    pub fn is_empty(&self) -> bool {
        *self == Faults::default()
    }
}

/// One scripted event.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Unique identifier for this invocation.
    pub request_id: String,

    /// Raw event body.
    pub payload: Bytes,

    /// Timestamp when the invocation was created.
    pub created_at: DateTime<Utc>,

    /// Deadline by which the invocation must complete.
    pub deadline: DateTime<Utc>,

    /// ARN of the function being invoked.
    pub invoked_function_arn: String,

    /// AWS X-Ray trace ID.
    pub trace_id: String,

    /// Raw client context header value.
    pub client_context: Option<String>,

    /// Raw Cognito identity header value.
    pub cognito_identity: Option<String>,

    /// Scripted protocol faults.
    pub faults: Faults,
}

impl Invocation {
    /// Creates a well-formed invocation with generated ids.
    ///
    /// # Examples
    ///
    /// ```
    /// use lambda_simulator::invocation::Invocation;
    ///
    /// let invocation = Invocation::new(r#"{"key":"value"}"#, 3000);
    /// assert!(!invocation.request_id.is_empty());
    /// ```
    pub fn new(payload: impl Into<Bytes>, timeout_ms: u64) -> Self {
        let created_at = Utc::now();
        let deadline = i64::try_from(timeout_ms)
            .ok()
            .and_then(chrono::TimeDelta::try_milliseconds)
            .and_then(|timeout| created_at.checked_add_signed(timeout))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            request_id: Uuid::new_v4().to_string(),
            payload: payload.into(),
            created_at,
            deadline,
            invoked_function_arn: DEFAULT_FUNCTION_ARN.to_string(),
            trace_id: Self::generate_trace_id(created_at),
            client_context: None,
            cognito_identity: None,
            faults: Faults::default(),
        }
    }

    /// Generates an AWS X-Ray trace ID in the correct format.
    ///
    /// Format: Root=1-{8-hex-time}-{24-hex-random}
    fn generate_trace_id(timestamp: DateTime<Utc>) -> String {
        let epoch_time = timestamp.timestamp() as u32;
        let random_hex = format!("{:032x}", Uuid::new_v4().as_u128());

        format!("Root=1-{:08x}-{}", epoch_time, &random_hex[..24])
    }

    /// Returns the deadline as milliseconds since Unix epoch.
    ///
    /// This is used for the `Lambda-Runtime-Deadline-Ms` header.
    pub fn deadline_ms(&self) -> i64 {
        self.deadline.timestamp_millis()
    }

    /// Headers of the next-invocation response, after faults are applied.
    pub fn response_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Lambda-Runtime-Aws-Request-Id".to_string(), self.request_id.clone()),
            ("Lambda-Runtime-Deadline-Ms".to_string(), self.deadline_ms().to_string()),
            (
                "Lambda-Runtime-Invoked-Function-Arn".to_string(),
                self.invoked_function_arn.clone(),
            ),
            ("Lambda-Runtime-Trace-Id".to_string(), self.trace_id.clone()),
        ];

        if let Some(context) = &self.client_context {
            headers.push(("Lambda-Runtime-Client-Context".to_string(), context.clone()));
        }
        if let Some(identity) = &self.cognito_identity {
            headers.push(("Lambda-Runtime-Cognito-Identity".to_string(), identity.clone()));
        }

        for (name, value) in &self.faults.header_overrides {
            match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some(entry) => entry.1 = value.clone(),
                None => headers.push((name.clone(), value.clone())),
            }
        }

        headers.retain(|(name, _)| {
            !self
                .faults
                .omit_headers
                .iter()
                .any(|omitted| omitted.eq_ignore_ascii_case(name))
        });

        headers
    }
}

/// Builder for creating invocations with custom properties.
#[derive(Debug, Default)]
#[must_use = "builders do nothing unless .build() is called"]
pub struct InvocationBuilder {
    payload: Option<Bytes>,
    request_id: Option<String>,
    timeout_ms: Option<u64>,
    deadline_ms: Option<i64>,
    function_arn: Option<String>,
    trace_id: Option<String>,
    client_context: Option<String>,
    cognito_identity: Option<String>,
    faults: Faults,
}

impl InvocationBuilder {
    /// Creates a new invocation builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use lambda_simulator::invocation::InvocationBuilder;
    ///
    /// let invocation = InvocationBuilder::new()
    ///     .payload(r#"{"firstName":"Ada"}"#)
    ///     .request_id("abc123")
    ///     .build();
    /// assert_eq!(invocation.request_id, "abc123");
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the raw payload. Defaults to an empty body.
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Sets the payload to `value` encoded as JSON.
    pub fn json_payload(mut self, value: &Value) -> Self {
        self.payload = Some(Bytes::from(value.to_string()));
        self
    }

    /// Fixes the request id instead of generating one.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Fixes the absolute deadline, in epoch milliseconds.
    pub fn deadline_ms(mut self, deadline_ms: i64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    /// Sets the function ARN.
    pub fn function_arn(mut self, arn: impl Into<String>) -> Self {
        self.function_arn = Some(arn.into());
        self
    }

    /// Sets the trace id.
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the raw client context header.
    pub fn client_context(mut self, context: impl Into<String>) -> Self {
        self.client_context = Some(context.into());
        self
    }

    /// Sets the raw Cognito identity header.
    pub fn cognito_identity(mut self, identity: impl Into<String>) -> Self {
        self.cognito_identity = Some(identity.into());
        self
    }

    /// Leaves `name` out of the next-invocation response.
    pub fn omit_header(mut self, name: impl Into<String>) -> Self {
        self.faults.omit_headers.push(name.into());
        self
    }

    /// Serves `value` for header `name`, replacing the generated value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.faults.header_overrides.push((name.into(), value.into()));
        self
    }

    /// Answers the next-invocation request with `status` and no headers.
    pub fn next_status(mut self, status: u16) -> Self {
        self.faults.next_status = Some(status);
        self
    }

    /// Answers the result post with `status`.
    pub fn post_status(mut self, status: u16) -> Self {
        self.faults.post_status = Some(status);
        self
    }

    /// Builds the invocation.
    pub fn build(self) -> Invocation {
        let mut invocation = Invocation::new(
            self.payload.unwrap_or_default(),
            self.timeout_ms.unwrap_or(3000),
        );

        if let Some(request_id) = self.request_id {
            invocation.request_id = request_id;
        }
        if let Some(deadline) = self.deadline_ms.and_then(DateTime::<Utc>::from_timestamp_millis) {
            invocation.deadline = deadline;
        }
        if let Some(arn) = self.function_arn {
            invocation.invoked_function_arn = arn;
        }
        if let Some(trace_id) = self.trace_id {
            invocation.trace_id = trace_id;
        }
        invocation.client_context = self.client_context;
        invocation.cognito_identity = self.cognito_identity;
        invocation.faults = self.faults;

        invocation
    }
}

/// The status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    /// Invocation is queued and waiting to be processed.
    Pending,

    /// Invocation has been sent to the runtime.
    InProgress,

    /// A response was accepted.
    Success,

    /// An error was accepted.
    Error,
}

/// Which endpoint a post arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    /// `/invocation/{id}/response`.
    Response,
    /// `/invocation/{id}/error`.
    Error,
    /// `/init/error`.
    InitError,
}

/// A post exactly as it arrived.
#[derive(Debug, Clone)]
pub struct RecordedPost {
    /// Target endpoint.
    pub kind: PostKind,

    /// Request id from the path, absent for init errors.
    pub request_id: Option<String>,

    /// Request path, including any trailing slash.
    pub path: String,

    /// All request headers.
    pub headers: HeaderMap,

    /// Raw request body.
    pub body: Bytes,

    /// Status the simulator answered with.
    pub status: u16,

    /// Timestamp when the post was received.
    pub received_at: DateTime<Utc>,
}

impl RecordedPost {
    /// Value of header `name`, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `content-type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// The `content-length` header, parsed.
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    /// The body decoded as JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}
