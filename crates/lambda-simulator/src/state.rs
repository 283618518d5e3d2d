//! Shared state for the Runtime API simulator.

use crate::invocation::{Invocation, InvocationStatus, PostKind, RecordedPost};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};

/// Tracks the state of a single invocation.
#[derive(Debug, Clone)]
pub struct InvocationState {
    /// The invocation data.
    pub invocation: Invocation,

    /// Current status of the invocation.
    pub status: InvocationStatus,

    /// When the runtime fetched this invocation.
    pub started_at: Option<DateTime<Utc>>,

    /// The post that completed this invocation.
    pub completion: Option<RecordedPost>,
}

/// Outcome of routing a result post to its invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PostOutcome {
    /// The post was accepted with the given status.
    Accepted(u16),
    /// The post was answered with a scripted status and did not complete
    /// the invocation.
    Faulted(u16),
    /// No invocation with this request id exists.
    Unknown,
    /// The invocation was already completed.
    Duplicate,
}

/// Queue and per-invocation bookkeeping, kept under one lock so a fetch
/// dequeues and marks an invocation atomically.
#[derive(Debug, Default)]
struct Ledger {
    queue: VecDeque<String>,
    states: HashMap<String, InvocationState>,
}

/// Shared state behind the HTTP handlers and the test-facing API.
#[derive(Debug, Default)]
pub(crate) struct RuntimeState {
    ledger: Mutex<Ledger>,
    posts: Mutex<Vec<RecordedPost>>,
    next_requests: AtomicUsize,
    enqueued: Notify,
    state_changed: Notify,
}

impl RuntimeState {
    pub(crate) async fn enqueue_invocation(&self, invocation: Invocation) {
        let mut ledger = self.ledger.lock().await;
        ledger.queue.push_back(invocation.request_id.clone());
        ledger.states.insert(
            invocation.request_id.clone(),
            InvocationState {
                invocation,
                status: InvocationStatus::Pending,
                started_at: None,
                completion: None,
            },
        );
        drop(ledger);

        self.enqueued.notify_one();
    }

    /// Long-polls for the oldest queued invocation and marks it in progress.
    pub(crate) async fn next_invocation(&self) -> Invocation {
        self.next_requests.fetch_add(1, Ordering::SeqCst);

        loop {
            let enqueued = self.enqueued.notified();

            let mut ledger = self.ledger.lock().await;
            while let Some(request_id) = ledger.queue.pop_front() {
                if let Some(state) = ledger.states.get_mut(&request_id) {
                    state.status = InvocationStatus::InProgress;
                    state.started_at = Some(Utc::now());
                    return state.invocation.clone();
                }
            }
            drop(ledger);

            enqueued.await;
        }
    }

    /// Records a result post and decides the status to answer with.
    ///
    /// The first accepted post completes the invocation; later ones are
    /// rejected. Posts carrying a scripted status are recorded but leave the
    /// invocation in progress.
    pub(crate) async fn record_result(&self, mut post: RecordedPost) -> PostOutcome {
        let outcome = {
            let mut ledger = self.ledger.lock().await;
            let request_id = post.request_id.as_deref().unwrap_or_default();

            match ledger.states.get_mut(request_id) {
                None => PostOutcome::Unknown,
                Some(state) if state.status != InvocationStatus::InProgress => {
                    PostOutcome::Duplicate
                }
                Some(state) => match state.invocation.faults.post_status {
                    Some(status) => PostOutcome::Faulted(status),
                    None => {
                        state.status = match post.kind {
                            PostKind::Error => InvocationStatus::Error,
                            _ => InvocationStatus::Success,
                        };
                        post.status = 202;
                        state.completion = Some(post.clone());
                        PostOutcome::Accepted(202)
                    }
                },
            }
        };

        post.status = match outcome {
            PostOutcome::Accepted(status) | PostOutcome::Faulted(status) => status,
            PostOutcome::Unknown => 404,
            PostOutcome::Duplicate => 400,
        };
        self.record_post(post).await;

        outcome
    }

    pub(crate) async fn record_post(&self, post: RecordedPost) {
        tracing::debug!(
            kind = ?post.kind,
            path = %post.path,
            status = post.status,
            body_bytes = post.body.len(),
            "Recorded post"
        );
        self.posts.lock().await.push(post);
        self.state_changed.notify_waiters();
    }

    pub(crate) async fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().await.clone()
    }

    pub(crate) fn next_request_count(&self) -> usize {
        self.next_requests.load(Ordering::SeqCst)
    }

    /// Resolves on the next post. Wakeups count from the moment this is
    /// called, so create it before checking the condition being waited on.
    pub(crate) fn state_changed(&self) -> Notified<'_> {
        self.state_changed.notified()
    }

    pub(crate) async fn get_invocation_state(&self, request_id: &str) -> Option<InvocationState> {
        self.ledger.lock().await.states.get(request_id).cloned()
    }
}
