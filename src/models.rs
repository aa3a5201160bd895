//! Core data models used throughout askdesk.
//!
//! These types represent the answers, citations, history entries, upload
//! reports, and analytics figures that flow between the remote service
//! and the session controllers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A retrieved passage backing an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Source document name (e.g. `"policy.pdf"`).
    pub source: String,
    /// Excerpt text from the matching chunk.
    #[serde(default)]
    pub text: String,
    /// Relevance score in percent, when the service provides one.
    #[serde(default)]
    pub similarity: Option<f64>,
}

/// The answer produced by one successful query submission.
///
/// Transient: replaced wholesale on every new submission. The `query_id`
/// ties feedback to this specific answer; answers restored from history
/// carry no identifier and no citations.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub question: String,
    pub answer: String,
    pub query_id: Option<i64>,
    pub confidence: Option<f64>,
    pub citations: Vec<Citation>,
}

/// A durable record of a past question and its answer.
///
/// Immutable once created. Owned exclusively by the history store;
/// citation detail is deliberately not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub submitted_at: DateTime<Utc>,
}

/// Helpful / not-helpful signal attached to an answered query.
///
/// Write-once: the first recorded value wins for the lifetime of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    Unset,
    Positive,
    Negative,
}

/// A file selected for ingestion, before intake filtering.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl UploadCandidate {
    pub fn byte_size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Per-file result of a batch upload. Order matches submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub file_name: String,
    pub succeeded: bool,
    pub chunk_count: Option<i64>,
    pub error: Option<String>,
}

/// Aggregate knowledge-base statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub total_documents: i64,
    #[serde(default)]
    pub total_chunks: i64,
    #[serde(default)]
    pub total_queries: i64,
    #[serde(default)]
    pub average_confidence: f64,
    #[serde(default)]
    pub helpful_rate: f64,
    #[serde(default)]
    pub feedback_count: i64,
}

/// A source document ranked by how often it backed an answer.
#[derive(Debug, Clone, Deserialize)]
pub struct TopSource {
    pub source: String,
    pub usage_count: i64,
}

/// A recorded query whose confidence fell below the review threshold.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeGap {
    pub id: i64,
    pub query: String,
    pub confidence: f64,
    pub created_at: String,
}

/// Point-in-time analytics view. Replaced wholesale on refresh; never
/// assembled from partially successful reads.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSnapshot {
    pub stats: Stats,
    pub top_sources: Vec<TopSource>,
    pub knowledge_gaps: Vec<KnowledgeGap>,
}

/// An indexed document as reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub original_name: String,
    pub file_type: String,
    pub file_size: i64,
    #[serde(default)]
    pub chunk_count: i64,
    pub uploaded_at: String,
    #[serde(default)]
    pub status: String,
}

/// A recently logged query with its outcome metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentQuery {
    pub id: i64,
    pub query_text: String,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub response_time_ms: Option<i64>,
    #[serde(default)]
    pub was_helpful: Option<bool>,
    pub created_at: String,
}
