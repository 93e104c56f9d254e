//! Session lifecycle tests against a mock analysis service.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deepfake_analysis::{
    AnalysisRequest, CancellationToken, ClientConfig, DeepfakeError, SessionClient, SessionStatus,
    NO_FACES_MESSAGE,
};

// ─────────────────────── helpers ───────────────────────

fn client_for(server: &MockServer, max_attempts: u32) -> SessionClient {
    let config = ClientConfig::new(server.uri())
        .with_poll_interval(Duration::from_millis(5))
        .with_max_poll_attempts(max_attempts);
    SessionClient::new(Arc::new(config)).unwrap()
}

fn png_request() -> AnalysisRequest {
    AnalysisRequest::from_bytes(vec![0x89, b'P', b'N', b'G'], "portrait.png")
}

fn status_body(status: &str) -> Value {
    json!({ "status": status })
}

fn sample_result(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "sha256": "deadbeef",
        "status": "done",
        "faces": [
            { "ansamble": 0.93, "is_real_model_1": 0.9, "is_real_model_2": 0.96, "face_path": "media/ai./abc/0.jpg" },
            { "ansamble": 0.07, "is_real_model_1": 0.1 }
        ],
        "total_faces": 2
    })
}

async fn mount_upload(server: &MockServer, uuid: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "uuid": uuid })))
        .expect(1)
        .mount(server)
        .await;
}

async fn status_calls(server: &MockServer, uuid: &str) -> usize {
    let target = format!("/api/{uuid}/status");
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == target)
        .count()
}

// ═══════════════════════════════════════════════════════
// submit
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_submit_uses_embedded_result() {
    let server = MockServer::start().await;
    mount_upload(&server, "abc").await;

    Mock::given(method("GET"))
        .and(path("/api/abc/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/abc/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "done", "result": sample_result("abc") })),
        )
        .mount(&server)
        .await;
    // The embedded result makes the explicit fetch unnecessary.
    Mock::given(method("GET"))
        .and(path("/api/abc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    let token = CancellationToken::new();
    let result = client.submit(png_request(), &token).await.unwrap();

    assert_eq!(result.session_id, "abc");
    assert_eq!(result.status, SessionStatus::Done);
    assert_eq!(result.faces.len(), 2);
    assert_eq!(result.faces[0].real_probability, Some(0.93));
    assert_eq!(result.faces[0].model_scores.len(), 2);

    // Initial check plus exactly two poll attempts.
    assert_eq!(status_calls(&server, "abc").await, 3);
}

#[tokio::test]
async fn test_submit_poll_attempt_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/abc/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/abc/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "done", "result": sample_result("abc") })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    let outcome = client.poll("abc", &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.status, SessionStatus::Done);
    assert!(outcome.embedded.is_some());
}

#[tokio::test]
async fn test_submit_fetches_result_when_not_embedded() {
    let server = MockServer::start().await;
    mount_upload(&server, "xyz").await;

    Mock::given(method("GET"))
        .and(path("/api/xyz/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_result("xyz")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let result = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.session_id, "xyz");
    assert_eq!(result.sha256.as_deref(), Some("deadbeef"));
    assert_eq!(result.faces.len(), 2);
}

#[tokio::test]
async fn test_submit_no_faces_synthesized() {
    let server = MockServer::start().await;
    mount_upload(&server, "nf").await;

    Mock::given(method("GET"))
        .and(path("/api/nf/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("no_faces_found")))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let result = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, SessionStatus::NoFacesFound);
    assert!(result.faces.is_empty());
    assert_eq!(result.message.as_deref(), Some(NO_FACES_MESSAGE));
    assert_eq!(NO_FACES_MESSAGE, "No faces detected in the image.");
}

#[tokio::test]
async fn test_submit_poll_timeout() {
    let server = MockServer::start().await;
    mount_upload(&server, "slow").await;

    Mock::given(method("GET"))
        .and(path("/api/slow/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("pending")))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let err = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DeepfakeError::PollTimeout {
            session_id,
            attempts,
        } => {
            assert_eq!(session_id, "slow");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected poll timeout, got {other}"),
    }
    assert_eq!(status_calls(&server, "slow").await, 4);
}

#[tokio::test]
async fn test_unknown_status_keeps_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/odd/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("warming_up")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/odd/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("no_faces")))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let outcome = client.poll("odd", &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.status, SessionStatus::NoFacesFound);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_submit_error_status_is_incomplete() {
    let server = MockServer::start().await;
    mount_upload(&server, "bad").await;

    Mock::given(method("GET"))
        .and(path("/api/bad/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "error", "message": "model crashed" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DeepfakeError::AnalysisIncomplete {
            session_id,
            status,
            message,
        } => {
            assert_eq!(session_id, "bad");
            assert_eq!(status, "error");
            assert_eq!(message.as_deref(), Some("model crashed"));
        }
        other => panic!("expected incomplete analysis, got {other}"),
    }
}

async fn mount_partial_then(server: &MockServer, uuid: &str, terminal: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/{uuid}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing",
            "result": { "faces": [{ "ansamble": 0.5 }] }
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/{uuid}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(terminal))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_partial_result_dropped_when_session_errors() {
    let server = MockServer::start().await;
    mount_upload(&server, "crash").await;
    mount_partial_then(
        &server,
        "crash",
        json!({ "status": "error", "message": "model crashed" }),
    )
    .await;

    let client = client_for(&server, 5);
    let err = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DeepfakeError::AnalysisIncomplete { status, message, .. } => {
            assert_eq!(status, "error");
            assert_eq!(message.as_deref(), Some("model crashed"));
        }
        other => panic!("expected incomplete analysis, got {other}"),
    }
    assert_eq!(status_calls(&server, "crash").await, 2);
}

#[tokio::test]
async fn test_partial_result_carries_terminal_status() {
    let server = MockServer::start().await;
    mount_upload(&server, "late").await;
    mount_partial_then(&server, "late", status_body("done")).await;
    Mock::given(method("GET"))
        .and(path("/api/late"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let result = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, SessionStatus::Done);
    assert_eq!(result.faces.len(), 1);
    assert_eq!(result.faces[0].real_probability, Some(0.5));
}

#[tokio::test]
async fn test_upload_without_uuid_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeepfakeError::Upload(_)), "got {err}");
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
}

#[tokio::test]
async fn test_upload_http_error_preserves_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(413).set_body_json(json!({ "detail": "File too large" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client
        .submit(png_request(), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        DeepfakeError::Upload(message) => assert!(message.contains("File too large"), "{message}"),
        other => panic!("expected upload error, got {other}"),
    }
}

#[tokio::test]
async fn test_empty_image_fails_without_network() {
    let server = MockServer::start().await;
    let client = client_for(&server, 5);

    let err = client
        .submit(
            AnalysisRequest::from_bytes(Vec::new(), "empty.png"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DeepfakeError::Validation(_)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_api_key_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/k/status"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("done")))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).with_api_key(Some("secret-key".to_string()));
    let client = SessionClient::new(Arc::new(config)).unwrap();
    let snapshot = client.fetch_status("k").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Done);
}

// ═══════════════════════════════════════════════════════
// URL sources
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_submit_by_url_downloads_then_uploads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/selfie"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_upload(&server, "url1").await;
    Mock::given(method("GET"))
        .and(path("/api/url1/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "done", "result": sample_result("url1") })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let token = CancellationToken::new();

    let payload = client
        .resolve(
            AnalysisRequest::from_url(format!("{}/images/selfie", server.uri())),
            &token,
        )
        .await
        .unwrap();
    assert_eq!(payload.filename, "selfie.jpg");
    assert_eq!(payload.content_type, "image/jpeg");

    let uploaded = client.upload(payload, &token).await.unwrap();
    assert_eq!(uploaded.id, "url1");

    let outcome = client.poll(&uploaded.id, &token).await.unwrap();
    assert!(outcome.embedded.is_some());
}

#[tokio::test]
async fn test_url_download_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client
        .submit(
            AnalysisRequest::from_url(format!("{}/missing.png", server.uri())),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DeepfakeError::Transport(_)), "got {err}");
}

#[tokio::test]
async fn test_invalid_url_is_validation_error() {
    let server = MockServer::start().await;
    let client = client_for(&server, 5);
    let err = client
        .submit(
            AnalysisRequest::from_url("file:///etc/passwd"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DeepfakeError::Validation(_)));
}

// ═══════════════════════════════════════════════════════
// status and face detail
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_fetch_status_unknown_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ghost/status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found" })))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client.fetch_status("ghost").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn test_fetch_status_transport_error_keeps_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/s1/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let err = client.fetch_status("s1").await.unwrap_err();
    match err {
        DeepfakeError::Transport(message) => assert!(message.contains("maintenance window")),
        other => panic!("expected transport error, got {other}"),
    }
}

#[tokio::test]
async fn test_fetch_status_does_not_loop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/s2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let snapshot = client.fetch_status("s2").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Processing);
    assert!(snapshot.result.is_none());
}

#[tokio::test]
async fn test_fetch_face_detail_in_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_result("abc")))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let full = client.fetch_result("abc").await.unwrap();
    let face = client.fetch_face_detail("abc", 1).await.unwrap();
    assert_eq!(face, full.faces[1]);
}

#[tokio::test]
async fn test_fetch_face_detail_out_of_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_result("abc")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "uuid": "empty", "status": "done" })))
        .mount(&server)
        .await;

    let client = client_for(&server, 5);

    match client.fetch_face_detail("abc", 2).await.unwrap_err() {
        DeepfakeError::FaceNotFound {
            index, available, ..
        } => {
            assert_eq!(index, 2);
            assert_eq!(available, 2);
        }
        other => panic!("expected face not found, got {other}"),
    }

    let err = client.fetch_face_detail("empty", 0).await.unwrap_err();
    assert!(err.is_not_found());
}

// ═══════════════════════════════════════════════════════
// cancellation
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_cancel_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/long/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing")))
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .with_poll_interval(Duration::from_secs(30))
        .with_max_poll_attempts(100);
    let client = SessionClient::new(Arc::new(config)).unwrap();
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5), client.poll("long", &token))
        .await
        .expect("poll should stop promptly after cancellation")
        .unwrap_err();
    assert!(matches!(err, DeepfakeError::Cancelled));

    let calls_at_cancel = status_calls(&server, "long").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(status_calls(&server, "long").await, calls_at_cancel);
    assert_eq!(calls_at_cancel, 1);
}

#[tokio::test]
async fn test_cancelled_before_upload_makes_no_calls() {
    let server = MockServer::start().await;
    let client = client_for(&server, 5);
    let token = CancellationToken::new();
    token.cancel();

    let err = client.submit(png_request(), &token).await.unwrap_err();
    assert!(matches!(err, DeepfakeError::Cancelled));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
