//! Single-shot helpful/not-helpful feedback.
//!
//! Feedback is best-effort: the local state commits before the network
//! call, the first value recorded wins, and a failed send is logged at
//! warn level without rollback. The caller never sees a feedback error.

use tracing::warn;

use crate::client::RemoteService;
use crate::models::FeedbackState;

/// Write-once feedback state for the current answer.
pub struct FeedbackRecorder {
    state: FeedbackState,
}

impl FeedbackRecorder {
    pub fn new() -> Self {
        Self {
            state: FeedbackState::Unset,
        }
    }

    pub fn state(&self) -> FeedbackState {
        self.state
    }

    /// Discard the recorded state; called when a new answer replaces the
    /// old one.
    pub fn reset(&mut self) {
        self.state = FeedbackState::Unset;
    }

    /// Record a signal for `query_id`. No-op when feedback was already
    /// recorded or the answer carries no identifier. Returns the state
    /// after the call.
    pub async fn record(
        &mut self,
        service: &dyn RemoteService,
        query_id: Option<i64>,
        is_positive: bool,
    ) -> FeedbackState {
        if self.state != FeedbackState::Unset {
            return self.state;
        }
        let Some(id) = query_id else {
            return self.state;
        };

        // Commit locally first; a failed send is not rolled back.
        self.state = if is_positive {
            FeedbackState::Positive
        } else {
            FeedbackState::Negative
        };

        if let Err(e) = service.submit_feedback(id, is_positive).await {
            warn!(query_id = id, "feedback failed to send: {e}");
        }

        self.state
    }
}

impl Default for FeedbackRecorder {
    fn default() -> Self {
        Self::new()
    }
}
