//! The invocation loop.
//!
//! Each cycle is one fetch, one handler call and one post, strictly in that
//! order. Every failed fetch or post consumes one unit of the retry budget
//! and the loop starts again from the fetch; a result is never re-posted.
//! Once the budget is spent the loop gives up and the process exits so the
//! host can recycle the execution environment.

use crate::client::RuntimeApiClient;
use crate::config::{Config, RetryConfig, RetryScope};
use crate::context::InvocationContext;
use crate::envelope::ErrorEnvelope;
use crate::error::{Result, RuntimeError};
use crate::result::InvocationResult;

/// User logic run once per invocation.
///
/// Failures must be reported as [`InvocationResult::Failure`]; the loop does
/// not catch panics.
pub trait Handler {
    /// Handles one event.
    fn call(&mut self, context: &InvocationContext) -> InvocationResult;
}

impl<F> Handler for F
where
    F: FnMut(&InvocationContext) -> InvocationResult,
{
    fn call(&mut self, context: &InvocationContext) -> InvocationResult {
        self(context)
    }
}

/// A consumed unit of retry budget.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// Failures counted against the budget so far, including this one.
    pub attempt: u32,
    /// Size of the budget.
    pub max_attempts: u32,
    /// What went wrong.
    pub error: &'a RuntimeError,
}

impl RetryEvent<'_> {
    /// Whether this failure spent the last unit of budget.
    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Hook notified about failures. Never alters control flow.
pub trait RetryObserver {
    /// Called for every failed fetch or post.
    fn on_retry(&mut self, event: &RetryEvent<'_>);

    /// Called once before the process terminates.
    fn on_fatal(&mut self, error: &RuntimeError) {
        let _ = error;
    }
}

/// Reports failures as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_retry(&mut self, event: &RetryEvent<'_>) {
        tracing::warn!(
            attempt = event.attempt,
            max_attempts = event.max_attempts,
            error = %event.error,
            source = ?std::error::Error::source(event.error).map(|cause| cause.to_string()),
            "Invocation cycle failed"
        );
    }

    fn on_fatal(&mut self, error: &RuntimeError) {
        match error {
            RuntimeError::RetriesExhausted { attempts, last } => {
                tracing::error!(attempts, last = %last, "Retry budget exhausted, terminating");
            }
            other => tracing::error!(error = %other, "Runtime failed, terminating"),
        }
    }
}

#[derive(Debug, Clone)]
struct RetryBudget {
    max_attempts: u32,
    scope: RetryScope,
    failures: u32,
}

impl RetryBudget {
    fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            scope: config.scope,
            failures: 0,
        }
    }

    /// Counts a failure and returns the updated total.
    fn consume(&mut self) -> u32 {
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    fn exhausted(&self) -> bool {
        self.failures >= self.max_attempts
    }

    fn record_success(&mut self) {
        if self.scope == RetryScope::Invocation {
            self.failures = 0;
        }
    }
}

/// Drives a handler against the Runtime API.
pub struct Runtime<H, O = TracingObserver> {
    client: RuntimeApiClient,
    handler: H,
    budget: RetryBudget,
    observer: O,
}

impl<H: Handler> Runtime<H> {
    /// Creates a runtime with the default retry policy and observer.
    pub fn new(client: RuntimeApiClient, handler: H) -> Self {
        Self {
            client,
            handler,
            budget: RetryBudget::new(&RetryConfig::default()),
            observer: TracingObserver,
        }
    }
}

impl<H: Handler, O: RetryObserver> Runtime<H, O> {
    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: &RetryConfig) -> Self {
        self.budget = RetryBudget::new(retry);
        self
    }

    /// Replaces the failure observer.
    pub fn with_observer<P: RetryObserver>(self, observer: P) -> Runtime<H, P> {
        Runtime {
            client: self.client,
            handler: self.handler,
            budget: self.budget,
            observer,
        }
    }

    /// The failure observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Failures currently counted against the budget.
    pub fn failures(&self) -> u32 {
        self.budget.failures
    }

    /// Runs exactly one fetch, invoke and post cycle.
    ///
    /// Does not touch the retry budget.
    ///
    /// # Errors
    ///
    /// Returns the fetch or post failure. The fetched context and the
    /// handler's result are dropped either way.
    pub fn run_once(&mut self) -> Result<()> {
        let context = self.client.next_invocation()?;
        let result = self.handler.call(&context);
        self.client.post_result(&result, &context.request_id)?;

        tracing::debug!(
            request_id = %context.request_id,
            success = result.is_success(),
            "Invocation complete"
        );
        Ok(())
    }

    /// Runs cycles until the retry budget is spent and returns the error
    /// that ended the loop.
    pub fn run_until_fatal(&mut self) -> RuntimeError {
        loop {
            let error = match self.run_once() {
                Ok(()) => {
                    self.budget.record_success();
                    continue;
                }
                Err(error) => error,
            };

            let attempt = self.budget.consume();
            self.observer.on_retry(&RetryEvent {
                attempt,
                max_attempts: self.budget.max_attempts,
                error: &error,
            });

            if self.budget.exhausted() {
                return RuntimeError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                };
            }
        }
    }

    /// Runs until the retry budget is spent, then terminates the process
    /// with a non-zero exit status.
    pub fn run(mut self) -> ! {
        let error = self.run_until_fatal();
        self.observer.on_fatal(&error);
        std::process::exit(1)
    }
}

/// Runs `handler` against the control plane named in the environment.
///
/// Never returns. Exits the process with status 1 when configuration is
/// invalid or the retry budget is spent.
pub fn run<H: Handler>(handler: H) -> ! {
    run_with_init(|_| Ok::<_, ErrorEnvelope>(handler))
}

/// Like [`run`], but builds the handler with `init` first.
///
/// If `init` fails, its envelope is posted to the init-error endpoint and the
/// process exits.
pub fn run_with_init<H, F>(init: F) -> !
where
    H: Handler,
    F: FnOnce(&Config) -> std::result::Result<H, ErrorEnvelope>,
{
    let (config, client) = match bootstrap() {
        Ok(parts) => parts,
        Err(error) => {
            TracingObserver.on_fatal(&error);
            std::process::exit(1)
        }
    };

    let handler = match init(&config) {
        Ok(handler) => handler,
        Err(envelope) => {
            tracing::error!(
                error_type = %envelope.error_type,
                error_message = %envelope.error_message,
                "Handler initialisation failed"
            );
            if let Err(error) = client.post_init_error(&envelope) {
                tracing::warn!(error = %error, "Failed to report init error");
            }
            std::process::exit(1)
        }
    };

    Runtime::new(client, handler).with_retry(&config.retry).run()
}

fn bootstrap() -> Result<(Config, RuntimeApiClient)> {
    let config = Config::load()?;
    tracing::debug!(?config, "Configuration loaded");

    let client = RuntimeApiClient::new(&config)?;
    Ok((config, client))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max_attempts: u32, scope: RetryScope) -> RetryBudget {
        RetryBudget::new(&RetryConfig {
            max_attempts,
            scope,
        })
    }

    #[test]
    fn test_budget_exhausts_after_max_attempts() {
        let mut budget = budget(3, RetryScope::Process);

        assert_eq!(budget.consume(), 1);
        assert!(!budget.exhausted());
        assert_eq!(budget.consume(), 2);
        assert!(!budget.exhausted());
        assert_eq!(budget.consume(), 3);
        assert!(budget.exhausted());
    }

    #[test]
    fn test_invocation_scope_resets_on_success() {
        let mut budget = budget(3, RetryScope::Invocation);

        budget.consume();
        budget.consume();
        budget.record_success();
        assert_eq!(budget.failures, 0);

        budget.consume();
        assert!(!budget.exhausted());
    }

    #[test]
    fn test_process_scope_is_cumulative() {
        let mut budget = budget(3, RetryScope::Process);

        budget.consume();
        budget.record_success();
        budget.consume();
        budget.record_success();
        budget.consume();

        assert!(budget.exhausted());
    }

    #[test]
    fn test_zero_budget_gives_up_on_first_failure() {
        let mut budget = budget(0, RetryScope::Invocation);
        budget.consume();
        assert!(budget.exhausted());
    }

    #[test]
    fn test_retry_event_last() {
        let error = RuntimeError::Api { status: 500 };
        let event = RetryEvent {
            attempt: 3,
            max_attempts: 3,
            error: &error,
        };
        assert!(event.is_last());

        let event = RetryEvent {
            attempt: 1,
            ..event
        };
        assert!(!event.is_last());
    }

    #[test]
    fn test_closures_are_handlers() {
        let mut calls = 0;
        let mut handler = |_: &InvocationContext| {
            calls += 1;
            InvocationResult::failure("x", "y")
        };

        let ctx = InvocationContext {
            payload: bytes::Bytes::new(),
            request_id: "id".to_string(),
            invoked_function_arn: "arn".to_string(),
            trace_id: "trace".to_string(),
            deadline: chrono::Utc::now(),
            client_context: None,
            identity: None,
            env_config: Default::default(),
        };

        assert!(!Handler::call(&mut handler, &ctx).is_success());
        assert!(!Handler::call(&mut handler, &ctx).is_success());
        assert_eq!(calls, 2);
    }
}
