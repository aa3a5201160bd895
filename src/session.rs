//! Query session lifecycle.
//!
//! [`QuerySessionController`] drives one question at a time through
//! `idle -> pending -> answered | failed`. A successful answer appends a
//! [`HistoryEntry`]; a failure leaves history untouched. Feedback is a
//! sub-state of `answered` only, enforced by the embedded
//! [`FeedbackRecorder`].

use std::sync::Arc;
use tracing::warn;

use crate::client::RemoteService;
use crate::error::ApiError;
use crate::feedback::FeedbackRecorder;
use crate::history::HistoryStore;
use crate::models::{FeedbackState, HistoryEntry, QueryRecord};

/// Lifecycle state of the current query session.
#[derive(Debug)]
pub enum SessionState {
    Idle,
    Pending,
    Answered(QueryRecord),
    Failed(ApiError),
}

impl SessionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Pending)
    }
}

/// Owns the live query state, the feedback sub-state, and the persisted
/// history. Constructed per session; no global state.
pub struct QuerySessionController {
    service: Arc<dyn RemoteService>,
    history: HistoryStore,
    state: SessionState,
    feedback: FeedbackRecorder,
}

impl QuerySessionController {
    pub fn new(service: Arc<dyn RemoteService>, history: HistoryStore) -> Self {
        Self {
            service,
            history,
            state: SessionState::Idle,
            feedback: FeedbackRecorder::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn feedback(&self) -> FeedbackState {
        self.feedback.state()
    }

    /// Submit a question. Empty or whitespace-only input is a no-op, not
    /// an error. Replaces any prior answer and clears prior feedback.
    pub async fn submit(&mut self, question: &str) -> &SessionState {
        let question = question.trim();
        if question.is_empty() {
            return &self.state;
        }

        self.state = SessionState::Pending;
        self.feedback.reset();

        match self.service.submit_query(question).await {
            Ok(record) => {
                let entry = HistoryEntry {
                    question: record.question.clone(),
                    answer: record.answer.clone(),
                    submitted_at: chrono::Utc::now(),
                };
                // The answer stands even if the history write fails.
                if let Err(e) = self.history.append(entry) {
                    warn!("failed to persist history entry: {e:#}");
                }
                self.state = SessionState::Answered(record);
            }
            Err(e) => {
                self.state = SessionState::Failed(e);
            }
        }

        &self.state
    }

    /// Record feedback on the current answer. No-op unless the session is
    /// `answered` with a query identifier and no feedback recorded yet.
    pub async fn record_feedback(&mut self, is_positive: bool) -> FeedbackState {
        let query_id = match &self.state {
            SessionState::Answered(record) => record.query_id,
            _ => None,
        };
        self.feedback
            .record(self.service.as_ref(), query_id, is_positive)
            .await
    }

    /// Restore a past question/answer pair for display. History entries do
    /// not retain citations or an answer identifier, so the restored
    /// record cannot receive feedback.
    pub fn select_from_history(&mut self, entry: &HistoryEntry) {
        self.feedback.reset();
        self.state = SessionState::Answered(QueryRecord {
            question: entry.question.clone(),
            answer: entry.answer.clone(),
            query_id: None,
            confidence: None,
            citations: Vec::new(),
        });
    }

    /// Return to `idle`, discarding the live answer and feedback but not
    /// the history.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.feedback.reset();
    }

    /// The persisted history log, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.load()
    }

    pub fn clear_history(&self) -> anyhow::Result<()> {
        self.history.clear()
    }
}
