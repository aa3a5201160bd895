//! Remote-service boundary.
//!
//! Defines the [`RemoteService`] trait — the full set of operations the
//! controllers consume — and [`HttpRemoteService`], the reqwest-backed
//! implementation speaking the answer service's REST API. Every method
//! returns `Result<T, ApiError>`; raw transport errors never escape this
//! module unclassified.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{
    Citation, DocumentInfo, KnowledgeGap, QueryRecord, RecentQuery, Stats, TopSource,
};

/// Operations the orchestration layer consumes from the answer service.
///
/// Authentication issuance is out of scope: implementations attach
/// whatever credentials they hold, and requests without valid credentials
/// fail with [`ApiError::Auth`].
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Submit a question; returns the answer with citations and an
    /// identifier for later feedback.
    async fn submit_query(&self, question: &str) -> Result<QueryRecord, ApiError>;

    /// Record a helpful/not-helpful signal for an answered query.
    async fn submit_feedback(&self, query_id: i64, was_helpful: bool) -> Result<(), ApiError>;

    /// Upload one document; returns the number of chunks created.
    async fn upload_document(&self, file_name: &str, content: Vec<u8>) -> Result<i64, ApiError>;

    /// List all indexed documents.
    async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ApiError>;

    /// Delete every chunk belonging to a source document.
    async fn delete_source(&self, source_name: &str) -> Result<(), ApiError>;

    /// Delete a recorded query log entry.
    async fn delete_query_log(&self, query_id: i64) -> Result<(), ApiError>;

    /// Read aggregate knowledge-base statistics.
    async fn fetch_stats(&self) -> Result<Stats, ApiError>;

    /// Read the most frequently used sources, ordered by usage.
    async fn fetch_top_sources(&self) -> Result<Vec<TopSource>, ApiError>;

    /// Read queries whose confidence fell below the review threshold.
    async fn fetch_low_confidence(&self) -> Result<Vec<KnowledgeGap>, ApiError>;

    /// Read the most recent query log entries.
    async fn recent_queries(&self) -> Result<Vec<RecentQuery>, ApiError>;
}

// ============ Wire shapes ============

#[derive(serde::Deserialize)]
struct QueryResponse {
    query: String,
    answer: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    sources: Vec<Citation>,
    #[serde(default)]
    query_id: Option<i64>,
}

#[derive(serde::Deserialize)]
struct UploadResponse {
    chunks_created: i64,
}

#[derive(serde::Deserialize)]
struct DocumentListResponse {
    #[serde(default)]
    documents: Vec<DocumentInfo>,
}

#[derive(serde::Deserialize)]
struct TopSourcesResponse {
    #[serde(default)]
    top_sources: Vec<TopSource>,
}

#[derive(serde::Deserialize)]
struct LowConfidenceResponse {
    #[serde(default)]
    knowledge_gaps: Vec<KnowledgeGap>,
}

#[derive(serde::Deserialize)]
struct RecentQueriesResponse {
    #[serde(default)]
    queries: Vec<RecentQuery>,
}

// ============ HTTP implementation ============

/// Reqwest-backed [`RemoteService`] implementation.
pub struct HttpRemoteService {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteService {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Unknown(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.resolved_token(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request and classify any non-2xx response.
    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = self.with_auth(req).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "remote call failed");
        Err(ApiError::from_response(status, &body))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.client.get(self.url(path))).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Unknown(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn submit_query(&self, question: &str) -> Result<QueryRecord, ApiError> {
        debug!(question, "submitting query");
        let response = self
            .execute(
                self.client
                    .post(self.url("/query"))
                    .json(&serde_json::json!({ "query": question })),
            )
            .await?;

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Unknown(format!("invalid response body: {}", e)))?;

        Ok(QueryRecord {
            question: body.query,
            answer: body.answer,
            query_id: body.query_id,
            confidence: body.confidence,
            citations: body.sources,
        })
    }

    async fn submit_feedback(&self, query_id: i64, was_helpful: bool) -> Result<(), ApiError> {
        self.execute(self.client.post(self.url("/feedback")).json(&serde_json::json!({
            "query_id": query_id,
            "was_helpful": was_helpful,
        })))
        .await?;
        Ok(())
    }

    async fn upload_document(&self, file_name: &str, content: Vec<u8>) -> Result<i64, ApiError> {
        debug!(file_name, bytes = content.len(), "uploading document");
        let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .execute(self.client.post(self.url("/documents/upload")).multipart(form))
            .await?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Unknown(format!("invalid response body: {}", e)))?;
        Ok(body.chunks_created)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentInfo>, ApiError> {
        let body: DocumentListResponse = self.get_json("/documents/").await?;
        Ok(body.documents)
    }

    async fn delete_source(&self, source_name: &str) -> Result<(), ApiError> {
        let encoded = urlencoding::encode(source_name);
        self.execute(
            self.client
                .delete(self.url(&format!("/documents/by-source/{}", encoded))),
        )
        .await?;
        Ok(())
    }

    async fn delete_query_log(&self, query_id: i64) -> Result<(), ApiError> {
        self.execute(
            self.client
                .delete(self.url(&format!("/analytics/query/{}", query_id))),
        )
        .await?;
        Ok(())
    }

    async fn fetch_stats(&self) -> Result<Stats, ApiError> {
        self.get_json("/analytics/stats").await
    }

    async fn fetch_top_sources(&self) -> Result<Vec<TopSource>, ApiError> {
        let body: TopSourcesResponse = self.get_json("/analytics/top-sources").await?;
        Ok(body.top_sources)
    }

    async fn fetch_low_confidence(&self) -> Result<Vec<KnowledgeGap>, ApiError> {
        let body: LowConfidenceResponse = self.get_json("/analytics/low-confidence").await?;
        Ok(body.knowledge_gaps)
    }

    async fn recent_queries(&self) -> Result<Vec<RecentQuery>, ApiError> {
        let body: RecentQueriesResponse = self.get_json("/analytics/recent-queries").await?;
        Ok(body.queries)
    }
}
