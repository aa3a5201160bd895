//! Multi-file upload orchestration.
//!
//! Candidates pass an intake filter (extension allow-list and size limit),
//! then upload strictly sequentially, one request per file. A failed file
//! becomes a failed [`UploadOutcome`] and never aborts its siblings; the
//! report preserves submission order. Sequential processing is deliberate:
//! it bounds load on the service and keeps outcome order deterministic.

use std::sync::Arc;
use tracing::debug;

use crate::client::RemoteService;
use crate::models::{UploadCandidate, UploadOutcome};

/// Document extensions the service accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "markdown", "docx"];

/// Returns true when the file name carries an allow-listed extension
/// (case-insensitive).
pub fn is_allowed_file(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Collects candidates and runs the one-shot batch upload.
pub struct UploadBatchOrchestrator {
    service: Arc<dyn RemoteService>,
    candidates: Vec<UploadCandidate>,
    max_file_bytes: u64,
}

impl UploadBatchOrchestrator {
    pub fn new(service: Arc<dyn RemoteService>, max_file_bytes: u64) -> Self {
        Self {
            service,
            candidates: Vec::new(),
            max_file_bytes,
        }
    }

    /// Add candidates, silently dropping files that fail the intake
    /// filter (disallowed extension or oversize).
    pub fn add_candidates(&mut self, files: impl IntoIterator<Item = UploadCandidate>) {
        for file in files {
            if !is_allowed_file(&file.file_name) {
                debug!(file = %file.file_name, "dropped at intake: extension not allowed");
                continue;
            }
            if file.byte_size() > self.max_file_bytes {
                debug!(file = %file.file_name, "dropped at intake: file too large");
                continue;
            }
            self.candidates.push(file);
        }
    }

    pub fn candidates(&self) -> &[UploadCandidate] {
        &self.candidates
    }

    /// Upload every candidate in input order, one request at a time, and
    /// return one outcome per candidate in the same order. The candidate
    /// list is cleared afterwards: files are one-shot, and a retry must be
    /// re-selected by the user.
    pub async fn upload_all(&mut self) -> Vec<UploadOutcome> {
        let batch = std::mem::take(&mut self.candidates);
        let mut outcomes = Vec::with_capacity(batch.len());

        for candidate in batch {
            let outcome = match self
                .service
                .upload_document(&candidate.file_name, candidate.content)
                .await
            {
                Ok(chunks) => UploadOutcome {
                    file_name: candidate.file_name,
                    succeeded: true,
                    chunk_count: Some(chunks),
                    error: None,
                },
                Err(e) => UploadOutcome {
                    file_name: candidate.file_name,
                    succeeded: false,
                    chunk_count: None,
                    error: Some(e.to_string()),
                },
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
