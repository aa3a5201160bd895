//! Two-phase arm/commit protocol for destructive actions.
//!
//! A deletion must be armed before it can be committed, so a single click
//! can never destroy data. At most one target is armed at a time; arming a
//! new target disarms the previous one, and a commit must name the armed
//! target exactly. A service-side `NotFound` counts as success: the target
//! is already gone and local cleanup should proceed.

use std::future::Future;
use thiserror::Error;

use crate::error::ApiError;

/// Failure modes of [`ConfirmedDelete::commit`].
#[derive(Debug, Error)]
pub enum CommitError {
    /// The commit named a target that is not currently armed.
    #[error("target is not armed for deletion")]
    NotArmed,
    /// The deletion request itself failed; the entity must stay visible.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Tracks the single armed deletion target for one list.
pub struct ConfirmedDelete<K: Clone + PartialEq> {
    armed: Option<K>,
}

impl<K: Clone + PartialEq> ConfirmedDelete<K> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Arm `id` for deletion, replacing any previously armed target.
    pub fn arm(&mut self, id: K) {
        self.armed = Some(id);
    }

    /// Clear the armed target without side effects.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn armed(&self) -> Option<&K> {
        self.armed.as_ref()
    }

    /// Commit the armed deletion by running `delete`.
    ///
    /// Precondition: `id` equals the armed target, otherwise
    /// [`CommitError::NotArmed`] is returned and the armed state is left
    /// alone. After the precondition passes the armed state clears whether
    /// the request succeeds or fails; a failing request surfaces as
    /// [`CommitError::Api`] so the caller keeps the entity in its list.
    pub async fn commit<F, Fut>(&mut self, id: &K, delete: F) -> Result<(), CommitError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        if self.armed.as_ref() != Some(id) {
            return Err(CommitError::NotArmed);
        }
        self.armed = None;

        match delete().await {
            Ok(()) => Ok(()),
            // Already deleted server-side: treat as success.
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl<K: Clone + PartialEq> Default for ConfirmedDelete<K> {
    fn default() -> Self {
        Self::new()
    }
}
