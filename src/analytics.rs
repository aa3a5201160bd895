//! Analytics snapshot loading and destructive analytics actions.
//!
//! [`AnalyticsSnapshotLoader`] fans out the three analytics reads
//! concurrently and replaces its snapshot only when all three succeed, so
//! a partial view is never displayed. It also owns the two armed-deletion
//! controllers for the top-sources and knowledge-gap lists: deletions
//! apply optimistically to the in-memory lists on success and leave them
//! untouched on failure.

use std::sync::Arc;
use tracing::debug;

use crate::client::RemoteService;
use crate::confirm::{CommitError, ConfirmedDelete};
use crate::error::ApiError;
use crate::models::AnalyticsSnapshot;

pub struct AnalyticsSnapshotLoader {
    service: Arc<dyn RemoteService>,
    snapshot: AnalyticsSnapshot,
    source_delete: ConfirmedDelete<String>,
    gap_delete: ConfirmedDelete<i64>,
}

impl AnalyticsSnapshotLoader {
    pub fn new(service: Arc<dyn RemoteService>) -> Self {
        Self {
            service,
            snapshot: AnalyticsSnapshot::default(),
            source_delete: ConfirmedDelete::new(),
            gap_delete: ConfirmedDelete::new(),
        }
    }

    /// The current snapshot: empty defaults before the first successful
    /// refresh, otherwise the last fully consistent read.
    pub fn snapshot(&self) -> &AnalyticsSnapshot {
        &self.snapshot
    }

    /// Re-read stats, top sources, and low-confidence queries as one
    /// consistent snapshot. The three reads run concurrently; if any one
    /// fails, the previous snapshot stays in place and the error is
    /// returned.
    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let (stats, sources, gaps) = tokio::join!(
            self.service.fetch_stats(),
            self.service.fetch_top_sources(),
            self.service.fetch_low_confidence(),
        );

        self.snapshot = AnalyticsSnapshot {
            stats: stats?,
            top_sources: sources?,
            knowledge_gaps: gaps?,
        };
        Ok(())
    }

    /// Re-read only the aggregate stats, leaving the lists alone. Used
    /// after a deletion, when the lists were already updated optimistically.
    pub async fn refresh_stats_only(&mut self) -> Result<(), ApiError> {
        self.snapshot.stats = self.service.fetch_stats().await?;
        Ok(())
    }

    // ============ Source-group deletion ============

    pub fn arm_source_delete(&mut self, source_name: &str) {
        self.source_delete.arm(source_name.to_string());
    }

    pub fn cancel_source_delete(&mut self) {
        self.source_delete.cancel();
    }

    pub fn armed_source(&self) -> Option<&String> {
        self.source_delete.armed()
    }

    /// Commit the armed source deletion. On success the source leaves the
    /// top-sources list immediately and the stats are re-read best-effort;
    /// on failure the list is untouched and the error is returned for
    /// user-visible reporting.
    pub async fn commit_source_delete(&mut self, source_name: &str) -> Result<(), CommitError> {
        let id = source_name.to_string();
        let target = id.clone();
        let service = Arc::clone(&self.service);
        self.source_delete
            .commit(&id, || async move { service.delete_source(&target).await })
            .await?;

        self.snapshot.top_sources.retain(|s| s.source != source_name);

        // Totals changed; the lists did not.
        if let Err(e) = self.refresh_stats_only().await {
            debug!("stats refresh after deletion failed: {e}");
        }
        Ok(())
    }

    // ============ Knowledge-gap deletion ============

    pub fn arm_gap_delete(&mut self, gap_id: i64) {
        self.gap_delete.arm(gap_id);
    }

    pub fn cancel_gap_delete(&mut self) {
        self.gap_delete.cancel();
    }

    pub fn armed_gap(&self) -> Option<&i64> {
        self.gap_delete.armed()
    }

    /// Commit the armed knowledge-gap deletion, removing the record from
    /// the list on success.
    pub async fn commit_gap_delete(&mut self, gap_id: i64) -> Result<(), CommitError> {
        let service = Arc::clone(&self.service);
        self.gap_delete
            .commit(&gap_id, || async move { service.delete_query_log(gap_id).await })
            .await?;

        self.snapshot.knowledge_gaps.retain(|g| g.id != gap_id);
        Ok(())
    }
}
