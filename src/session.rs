//! Core chat session management.
//!
//! [`ChatSession`] owns the transcript.  Submissions append the user's message right away
//! and hand the prompt to a [`Completer`] on a background task; the task reports back over
//! a channel that only the session drains, so every transcript mutation happens wherever
//! the session lives (typically the UI loop) and never on the completion task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::completer::Completer;
use crate::error::{Error, Result, SubmitError};
use crate::observability::{
    SESSION_EMPTY_REPLIES, SESSION_FAILURES, SESSION_REJECTED_EMPTY, SESSION_REJECTED_IN_FLIGHT,
    SESSION_REPLIES, SESSION_ROUND_TRIP, SESSION_STALE_RESULTS, SESSION_SUBMISSIONS,
    SESSION_UNKNOWN_RESULTS,
};
use crate::types::{Message, RequestId, Sender};

/// Whether a new submission may start while another is outstanding.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SubmissionPolicy {
    /// At most one request in flight; further submissions fail with
    /// [`SubmitError::RequestInFlight`].
    #[default]
    SingleFlight,

    /// Any number of requests in flight.  Replies are appended in the order they arrive,
    /// which need not match the order the prompts were sent.
    Concurrent,
}

/// What a failed completion leaves in the transcript.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Append a [`Sender::Error`] message describing the failure.
    #[default]
    Surface,

    /// Leave the transcript untouched.
    Discard,
}

/// Whether the session is waiting on the completion service.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing outstanding.
    Idle,
    /// At least one request has not been reconciled yet.
    AwaitingResponse,
}

/// Bookkeeping for one in-flight completion.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    id: RequestId,
    prompt_text: String,
    issued_at: Instant,
}

impl PendingRequest {
    /// The request's id.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The exact trimmed text that was sent.
    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    /// When the request was dispatched.
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Time spent waiting so far.
    pub fn elapsed(&self) -> Duration {
        self.issued_at.elapsed()
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Number of transcript entries.
    pub message_count: usize,
    /// Accepted submissions.
    pub submissions: u64,
    /// Bot messages appended.
    pub replies: u64,
    /// Successful completions dropped for being empty.
    pub empty_replies: u64,
    /// Failed completions, surfaced or not.
    pub failures: u64,
    /// Results that arrived after a newer request had been issued.
    pub stale_results: u64,
    /// Results ignored because their request was unknown or already reconciled.
    pub ignored_results: u64,
    /// Requests still outstanding.
    pub pending: usize,
}

struct Delivery {
    id: RequestId,
    result: Result<String>,
}

/// A chat session that owns the transcript and mediates between user input and a
/// [`Completer`].
pub struct ChatSession {
    completer: Arc<dyn Completer>,
    submission_policy: SubmissionPolicy,
    failure_policy: FailurePolicy,
    transcript: Vec<Message>,
    pending: Vec<PendingRequest>,
    next_id: RequestId,
    deliveries_tx: UnboundedSender<Delivery>,
    deliveries_rx: UnboundedReceiver<Delivery>,
    stats: SessionStats,
}

impl ChatSession {
    /// Creates an empty session that sends prompts to `completer`.
    pub fn new(completer: impl Completer + 'static) -> Self {
        Self::with_shared_completer(Arc::new(completer))
    }

    /// Creates an empty session around an already shared completer.
    pub fn with_shared_completer(completer: Arc<dyn Completer>) -> Self {
        let (deliveries_tx, deliveries_rx) = mpsc::unbounded_channel();
        Self {
            completer,
            submission_policy: SubmissionPolicy::default(),
            failure_policy: FailurePolicy::default(),
            transcript: Vec::new(),
            pending: Vec::new(),
            next_id: RequestId::FIRST,
            deliveries_tx,
            deliveries_rx,
            stats: SessionStats::default(),
        }
    }

    /// Sets the submission policy.
    pub fn with_submission_policy(mut self, policy: SubmissionPolicy) -> Self {
        self.submission_policy = policy;
        self
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Submits raw user input.
    ///
    /// On success the user's message is already in the transcript and the completion is
    /// running in the background; call [`poll_completions`](Self::poll_completions) or
    /// [`next_completion`](Self::next_completion) to fold its result in.
    ///
    /// # Errors
    ///
    /// [`SubmitError::EmptyInput`] when the input is blank, and
    /// [`SubmitError::RequestInFlight`] when the policy is
    /// [`SubmissionPolicy::SingleFlight`] and a request is outstanding.  Neither touches
    /// the transcript.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&mut self, raw_input: &str) -> std::result::Result<RequestId, SubmitError> {
        let prompt = raw_input.trim();
        if prompt.is_empty() {
            SESSION_REJECTED_EMPTY.click();
            return Err(SubmitError::EmptyInput);
        }
        if self.submission_policy == SubmissionPolicy::SingleFlight && !self.pending.is_empty() {
            SESSION_REJECTED_IN_FLIGHT.click();
            return Err(SubmitError::RequestInFlight);
        }

        let id = self.next_id;
        self.next_id = id.next();
        self.transcript.push(Message::user(prompt));
        self.pending.push(PendingRequest {
            id,
            prompt_text: prompt.to_string(),
            issued_at: Instant::now(),
        });
        self.stats.submissions += 1;
        SESSION_SUBMISSIONS.click();
        tracing::debug!(request_id = id.get(), pending = self.pending.len(), "submitted");

        self.dispatch(id, prompt.to_string());
        Ok(id)
    }

    fn dispatch(&self, id: RequestId, prompt: String) {
        let completer = Arc::clone(&self.completer);
        let deliveries = self.deliveries_tx.clone();
        tokio::spawn(async move {
            // Every dispatched request yields exactly one delivery, even if the completer panics.
            let result = AssertUnwindSafe(completer.complete(&prompt))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Error::task(panic_message(panic.as_ref()))));
            // A dropped session takes its pending results with it.
            let _ = deliveries.send(Delivery { id, result });
        });
    }

    /// Folds the result of request `id` into the transcript.
    ///
    /// Returns the appended message, if any.  A request is reconciled at most once: results
    /// for unknown or already-reconciled ids are ignored.  Empty replies are dropped.
    /// Failures are appended as [`Sender::Error`] messages or dropped, per the
    /// [`FailurePolicy`].
    pub fn on_completion_result(
        &mut self,
        id: RequestId,
        result: Result<String>,
    ) -> Option<&Message> {
        let Some(index) = self.pending.iter().position(|p| p.id == id) else {
            self.stats.ignored_results += 1;
            SESSION_UNKNOWN_RESULTS.click();
            tracing::warn!(request_id = id.get(), "ignoring result for unknown request");
            return None;
        };
        let request = self.pending.remove(index);
        SESSION_ROUND_TRIP.add(request.elapsed().as_secs_f64());
        if id.next() < self.next_id {
            self.stats.stale_results += 1;
            SESSION_STALE_RESULTS.click();
            tracing::debug!(
                request_id = id.get(),
                newest = self.next_id.get() - 1,
                "applying stale result"
            );
        }

        let message = match result {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    self.stats.empty_replies += 1;
                    SESSION_EMPTY_REPLIES.click();
                    tracing::debug!(request_id = id.get(), "dropping empty reply");
                    return None;
                }
                self.stats.replies += 1;
                SESSION_REPLIES.click();
                Message::bot(id, text)
            }
            Err(err) => {
                self.stats.failures += 1;
                SESSION_FAILURES.click();
                tracing::warn!(request_id = id.get(), error = %err, "completion failed");
                match self.failure_policy {
                    FailurePolicy::Surface => Message::error(id, err.to_string()),
                    FailurePolicy::Discard => return None,
                }
            }
        };
        self.transcript.push(message);
        self.transcript.last()
    }

    /// Reconciles every result that has already arrived, without waiting.
    ///
    /// Returns the number of messages appended.
    pub fn poll_completions(&mut self) -> usize {
        let mut appended = 0;
        while let Ok(delivery) = self.deliveries_rx.try_recv() {
            if self
                .on_completion_result(delivery.id, delivery.result)
                .is_some()
            {
                appended += 1;
            }
        }
        appended
    }

    /// Waits for the next outstanding request to finish and reconciles it.
    ///
    /// Returns `None` immediately when nothing is pending.  Cancel safe: dropping the
    /// future loses no results.
    pub async fn next_completion(&mut self) -> Option<RequestId> {
        while !self.pending.is_empty() {
            let delivery = self.deliveries_rx.recv().await?;
            let id = delivery.id;
            let known = self.pending.iter().any(|p| p.id == id);
            self.on_completion_result(id, delivery.result);
            if known {
                return Some(id);
            }
        }
        None
    }

    /// Waits until every outstanding request has been reconciled.
    pub async fn settle(&mut self) {
        while self.next_completion().await.is_some() {}
    }

    /// The transcript in display order.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Messages from one sender, in display order.
    pub fn messages_from(&self, sender: Sender) -> impl Iterator<Item = &Message> {
        self.transcript.iter().filter(move |m| m.sender() == sender)
    }

    /// Returns the number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.transcript.len()
    }

    /// Whether a reply is outstanding.
    pub fn state(&self) -> SessionState {
        if self.pending.is_empty() {
            SessionState::Idle
        } else {
            SessionState::AwaitingResponse
        }
    }

    /// Outstanding requests, oldest first.
    pub fn pending(&self) -> &[PendingRequest] {
        &self.pending
    }

    /// Returns the active submission policy.
    pub fn submission_policy(&self) -> SubmissionPolicy {
        self.submission_policy
    }

    /// Returns the active failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            message_count: self.transcript.len(),
            pending: self.pending.len(),
            ..self.stats.clone()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
