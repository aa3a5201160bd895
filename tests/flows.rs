//! End-to-end controller flows over a mock remote service: query sessions
//! with history, one-shot feedback, sequential upload batches, and
//! confirmed deletions against the analytics snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use askdesk::analytics::AnalyticsSnapshotLoader;
use askdesk::client::{HttpRemoteService, RemoteService};
use askdesk::config::ApiConfig;
use askdesk::confirm::CommitError;
use askdesk::history::HistoryStore;
use askdesk::models::{FeedbackState, UploadCandidate};
use askdesk::session::{QuerySessionController, SessionState};
use askdesk::upload::UploadBatchOrchestrator;

fn service_for(server: &MockServer) -> Arc<dyn RemoteService> {
    let cfg = ApiConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        auth_token: None,
    };
    Arc::new(HttpRemoteService::new(&cfg).unwrap())
}

fn history_in(dir: &tempfile::TempDir) -> (HistoryStore, PathBuf) {
    let path = dir.path().join("history.json");
    (HistoryStore::open(path.clone()), path)
}

fn mock_answer(query: &str, answer: &str, query_id: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "query": query,
        "answer": answer,
        "confidence": 88.0,
        "sources": [{ "source": "handbook.pdf", "text": "...", "similarity": 88.0 }],
        "query_id": query_id
    }))
}

#[tokio::test]
async fn test_successful_query_is_answered_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(mock_answer("refund policy?", "Within 30 days.", 42))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (history, _) = history_in(&dir);
    let mut session = QuerySessionController::new(service_for(&server), history);

    session.submit("refund policy?").await;

    match session.state() {
        SessionState::Answered(record) => {
            assert_eq!(record.answer, "Within 30 days.");
            assert_eq!(record.query_id, Some(42));
        }
        other => panic!("expected answered, got {other:?}"),
    }

    let entries = session.history();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].question, "refund policy?");
    assert_eq!(entries[0].answer, "Within 30 days.");
}

#[tokio::test]
async fn test_failed_query_leaves_history_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "llm down" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (history, _) = history_in(&dir);
    let mut session = QuerySessionController::new(service_for(&server), history);

    session.submit("anything?").await;

    assert!(matches!(session.state(), SessionState::Failed(_)));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_whitespace_query_is_a_no_op() {
    let server = MockServer::start().await;
    // No /query mock mounted: any request would 404 and fail the state check.

    let dir = tempfile::tempdir().unwrap();
    let (history, _) = history_in(&dir);
    let mut session = QuerySessionController::new(service_for(&server), history);

    session.submit("   \n\t").await;
    assert!(matches!(session.state(), SessionState::Idle));
}

#[tokio::test]
async fn test_new_submit_replaces_previous_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({ "query": "first" })))
        .respond_with(mock_answer("first", "answer one", 1))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({ "query": "second" })))
        .respond_with(mock_answer("second", "answer two", 2))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/feedback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (history, _) = history_in(&dir);
    let mut session = QuerySessionController::new(service_for(&server), history);

    session.submit("first").await;
    session.record_feedback(true).await;
    assert_eq!(session.feedback(), FeedbackState::Positive);

    session.submit("second").await;
    // Feedback belongs to the answer, not the session.
    assert_eq!(session.feedback(), FeedbackState::Unset);
    match session.state() {
        SessionState::Answered(record) => assert_eq!(record.answer, "answer two"),
        other => panic!("expected answered, got {other:?}"),
    }
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn test_feedback_is_write_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(mock_answer("q", "a", 42))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/feedback"))
        .and(body_json(json!({ "query_id": 42, "was_helpful": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (history, _) = history_in(&dir);
    let mut session = QuerySessionController::new(service_for(&server), history);

    session.submit("q").await;
    assert_eq!(session.record_feedback(true).await, FeedbackState::Positive);
    // Second signal is ignored; the first value wins and no request is sent.
    assert_eq!(session.record_feedback(false).await, FeedbackState::Positive);
}

#[tokio::test]
async fn test_feedback_send_failure_keeps_local_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(mock_answer("q", "a", 7))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/feedback"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "db down" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (history, _) = history_in(&dir);
    let mut session = QuerySessionController::new(service_for(&server), history);

    session.submit("q").await;
    assert_eq!(session.record_feedback(false).await, FeedbackState::Negative);
    // Best-effort: the failure is logged, never surfaced or rolled back.
    assert_eq!(session.feedback(), FeedbackState::Negative);
}

#[tokio::test]
async fn test_history_restore_cannot_receive_feedback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(mock_answer("q", "a", 42))
        .mount(&server)
        .await;
    // No /feedback mock: a request would 404 and flip the returned state.

    let dir = tempfile::tempdir().unwrap();
    let (history, _) = history_in(&dir);
    let mut session = QuerySessionController::new(service_for(&server), history);

    session.submit("q").await;
    let entry = session.history().remove(0);
    session.select_from_history(&entry);

    assert_eq!(session.record_feedback(true).await, FeedbackState::Unset);
}

#[tokio::test]
async fn test_upload_batch_preserves_order_and_survives_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "chunks_created": 3 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/documents/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "ingest failed" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/documents/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "chunks_created": 5 })))
        .mount(&server)
        .await;

    let mut orchestrator = UploadBatchOrchestrator::new(service_for(&server), 1024);
    orchestrator.add_candidates(vec![
        UploadCandidate {
            file_name: "a.pdf".to_string(),
            content: b"aaa".to_vec(),
        },
        UploadCandidate {
            file_name: "b.txt".to_string(),
            content: b"bbb".to_vec(),
        },
        UploadCandidate {
            file_name: "c.md".to_string(),
            content: b"ccc".to_vec(),
        },
    ]);

    let outcomes = orchestrator.upload_all().await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].file_name, "a.pdf");
    assert!(outcomes[0].succeeded);
    assert_eq!(outcomes[0].chunk_count, Some(3));

    assert_eq!(outcomes[1].file_name, "b.txt");
    assert!(!outcomes[1].succeeded);
    assert!(outcomes[1].error.is_some());

    // The failure above never aborts the rest of the batch.
    assert_eq!(outcomes[2].file_name, "c.md");
    assert!(outcomes[2].succeeded);
    assert_eq!(outcomes[2].chunk_count, Some(5));
}

#[tokio::test]
async fn test_intake_drops_unsupported_and_oversized_files() {
    let server = MockServer::start().await;
    let mut orchestrator = UploadBatchOrchestrator::new(service_for(&server), 10);
    orchestrator.add_candidates(vec![
        UploadCandidate {
            file_name: "a.pdf".to_string(),
            content: b"ok".to_vec(),
        },
        UploadCandidate {
            file_name: "b.exe".to_string(),
            content: b"nope".to_vec(),
        },
        UploadCandidate {
            file_name: "big.txt".to_string(),
            content: vec![0u8; 11],
        },
        UploadCandidate {
            file_name: "C.TXT".to_string(),
            content: b"ok".to_vec(),
        },
    ]);

    let names: Vec<&str> = orchestrator
        .candidates()
        .iter()
        .map(|c| c.file_name.as_str())
        .collect();
    assert_eq!(names, vec!["a.pdf", "C.TXT"]);
}

async fn mount_analytics(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/analytics/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_documents": 4,
            "total_chunks": 120,
            "total_queries": 57,
            "average_confidence": 74.2,
            "helpful_rate": 81.0,
            "feedback_count": 21
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analytics/top-sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "top_sources": [
                { "source": "handbook.pdf", "usage_count": 31 },
                { "source": "old-manual.pdf", "usage_count": 4 }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analytics/low-confidence"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "knowledge_gaps": [
                { "id": 7, "query": "vpn on linux", "confidence": 22.5,
                  "created_at": "2025-06-01T10:00:00" }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_refresh_populates_full_snapshot() {
    let server = MockServer::start().await;
    mount_analytics(&server).await;

    let mut loader = AnalyticsSnapshotLoader::new(service_for(&server));
    loader.refresh().await.unwrap();

    let snapshot = loader.snapshot();
    assert_eq!(snapshot.stats.total_documents, 4);
    assert_eq!(snapshot.top_sources.len(), 2);
    assert_eq!(snapshot.knowledge_gaps.len(), 1);
}

#[tokio::test]
async fn test_refresh_is_all_or_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_documents": 4, "total_chunks": 120, "total_queries": 57,
            "average_confidence": 74.2, "helpful_rate": 81.0, "feedback_count": 21
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analytics/top-sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "top_sources": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analytics/low-confidence"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "boom" })))
        .mount(&server)
        .await;

    let mut loader = AnalyticsSnapshotLoader::new(service_for(&server));
    assert!(loader.refresh().await.is_err());

    // No partial snapshot: everything stays at its previous (empty) value.
    let snapshot = loader.snapshot();
    assert_eq!(snapshot.stats.total_documents, 0);
    assert!(snapshot.top_sources.is_empty());
    assert!(snapshot.knowledge_gaps.is_empty());
}

#[tokio::test]
async fn test_commit_source_delete_prunes_snapshot() {
    let server = MockServer::start().await;
    mount_analytics(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/documents/by-source/old-manual.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted_chunks": 9 })))
        .expect(1)
        .mount(&server)
        .await;

    let mut loader = AnalyticsSnapshotLoader::new(service_for(&server));
    loader.refresh().await.unwrap();

    loader.arm_source_delete("old-manual.pdf");
    loader.commit_source_delete("old-manual.pdf").await.unwrap();

    assert!(loader.armed_source().is_none());
    let sources: Vec<&str> = loader
        .snapshot()
        .top_sources
        .iter()
        .map(|s| s.source.as_str())
        .collect();
    assert_eq!(sources, vec!["handbook.pdf"]);
}

#[tokio::test]
async fn test_commit_requires_matching_armed_target() {
    let server = MockServer::start().await;
    mount_analytics(&server).await;

    let mut loader = AnalyticsSnapshotLoader::new(service_for(&server));
    loader.refresh().await.unwrap();

    // Nothing armed at all.
    let err = loader.commit_gap_delete(7).await.unwrap_err();
    assert!(matches!(err, CommitError::NotArmed));

    // Armed for a different target; the armed state survives the mismatch.
    loader.arm_source_delete("handbook.pdf");
    let err = loader.commit_source_delete("old-manual.pdf").await.unwrap_err();
    assert!(matches!(err, CommitError::NotArmed));
    assert_eq!(loader.armed_source().map(String::as_str), Some("handbook.pdf"));

    // The snapshot is untouched throughout.
    assert_eq!(loader.snapshot().top_sources.len(), 2);
}

#[tokio::test]
async fn test_commit_gap_delete_tolerates_missing_target() {
    let server = MockServer::start().await;
    mount_analytics(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/analytics/query/7"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Query log not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut loader = AnalyticsSnapshotLoader::new(service_for(&server));
    loader.refresh().await.unwrap();

    loader.arm_gap_delete(7);
    // Already gone server-side counts as done; the row still leaves the list.
    loader.commit_gap_delete(7).await.unwrap();
    assert!(loader.snapshot().knowledge_gaps.is_empty());
}

#[tokio::test]
async fn test_commit_failure_keeps_snapshot_entry() {
    let server = MockServer::start().await;
    mount_analytics(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/documents/by-source/handbook.pdf"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "locked" })))
        .mount(&server)
        .await;

    let mut loader = AnalyticsSnapshotLoader::new(service_for(&server));
    loader.refresh().await.unwrap();

    loader.arm_source_delete("handbook.pdf");
    let err = loader.commit_source_delete("handbook.pdf").await.unwrap_err();
    assert!(matches!(err, CommitError::Api(_)));

    // The failed delete leaves the snapshot as it was.
    assert_eq!(loader.snapshot().top_sources.len(), 2);
}
