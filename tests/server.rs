//! HTTP tests: remote fetch against a local origin, and the loader's own
//! server driven over real sockets.

mod support;

use axum::http::header::CONTENT_DISPOSITION;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use office_loader::models::AcquisitionResult;
use office_loader::server::{router, AppState};
use office_loader::ui::PanelView;
use serde_json::{json, Value};
use support::{chunk, Harness};

/// Serve `app` on an ephemeral port and return its base URL.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A document origin with a few canned responses.
async fn spawn_origin() -> String {
    let app = Router::new()
        .route(
            "/download",
            get(|| async {
                (
                    [(CONTENT_DISPOSITION, "attachment; filename=\"report.xlsx\"")],
                    b"xlsx bytes".to_vec(),
                )
            }),
        )
        .route("/y/doc.pptx", get(|| async { b"pptx bytes".to_vec() }))
        .route(
            "/missing.docx",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        );
    spawn(app).await
}

// ─── Remote fetch ───────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_uses_content_disposition_name() {
    let origin = spawn_origin().await;
    let h = Harness::new();

    let result = h
        .orchestrator
        .open_url(&format!("{}/download?token=abc", origin), None)
        .await
        .unwrap();

    match result {
        AcquisitionResult::Success { file_name, binary } => {
            assert_eq!(file_name, "report.xlsx");
            assert_eq!(binary.unwrap().as_ref(), b"xlsx bytes");
        }
        other => panic!("expected success, got {:?}", other),
    }
    let record = h.orchestrator.session().get();
    assert!(record.source_url.as_deref().unwrap().ends_with("/download?token=abc"));
    assert_eq!(h.orchestrator.loading().active(), 0);
    assert_eq!(h.panel.view(), PanelView::FloatingButton);
}

#[tokio::test]
async fn test_fetch_falls_back_to_url_segment_and_honours_explicit_name() {
    let origin = spawn_origin().await;
    let h = Harness::new();

    h.orchestrator
        .open_url(&format!("{}/y/doc.pptx?v=2", origin), None)
        .await
        .unwrap();
    h.orchestrator
        .open_url(&format!("{}/y/doc.pptx?v=2", origin), Some("deck.pptx"))
        .await
        .unwrap();

    assert_eq!(
        h.gateway.opened_names(),
        vec!["doc.pptx".to_string(), "deck.pptx".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_non_success_status_fails_and_restores_panel() {
    let origin = spawn_origin().await;
    let h = Harness::new();

    let result = h
        .orchestrator
        .open_url(&format!("{}/missing.docx", origin), None)
        .await
        .unwrap();

    match result {
        AcquisitionResult::Failed { reason } => assert!(reason.contains("404"), "{}", reason),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(h.panel.view(), PanelView::ControlPanel);
    assert!(h.panel.last_alert().unwrap().contains("404"));
    assert_eq!(h.orchestrator.loading().shown(), 1);
    assert_eq!(h.orchestrator.loading().released(), 1);
    assert_eq!(h.gateway.open_count(), 0);
}

#[tokio::test]
async fn test_fetch_transport_error_fails() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let h = Harness::new();
    let result = h
        .orchestrator
        .open_url(&format!("http://127.0.0.1:{}/a.docx", port), None)
        .await
        .unwrap();

    assert!(matches!(result, AcquisitionResult::Failed { .. }));
    assert_eq!(h.panel.view(), PanelView::ControlPanel);
    assert!(h.panel.last_alert().is_some());
    assert!(!h.orchestrator.loading().is_visible());
}

// ─── Loader server ──────────────────────────────────────────────────

async fn spawn_loader(h: &Harness) -> String {
    let state = AppState::new(h.orchestrator.clone(), h.panel.clone());
    spawn(router(state)).await
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let base = spawn_loader(&h).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_messages_stream_a_document() {
    let h = Harness::new();
    let base = spawn_loader(&h).await;
    let client = reqwest::Client::new();

    let send = |msg: Value| {
        let client = client.clone();
        let url = format!("{}/messages", base);
        async move {
            client
                .post(url)
                .json(&msg)
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    };

    let first = send(json!({ "type": "RENDER_OFFICE", "data": chunk(0, 2, "AAA", 6) })).await;
    assert_eq!(first["status"], "buffered");
    assert_eq!(first["received"], 1);

    let second = send(json!({ "type": "RENDER_OFFICE", "data": chunk(1, 2, "BBB", 6) })).await;
    assert_eq!(second["status"], "opened");
    assert_eq!(second["file_name"], "report.docx");

    let current: Value = client
        .get(format!("{}/documents/current", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["loaded"], true);
    assert_eq!(current["kind"], "word");
    assert_eq!(current["size"], 6);
    assert_eq!(current["sha256"].as_str().unwrap().len(), 64);

    let closed = send(json!({ "type": "CLOSE_EDITOR" })).await;
    assert_eq!(closed["status"], "closed");
}

#[tokio::test]
async fn test_protocol_violation_is_reported_not_raised() {
    let h = Harness::new();
    let base = spawn_loader(&h).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/messages", base))
        .json(&json!({ "type": "RENDER_OFFICE", "data": chunk(0, 3, "AAA", 9) }))
        .send()
        .await
        .unwrap();
    let resp = client
        .post(format!("{}/messages", base))
        .json(&json!({ "type": "RENDER_OFFICE", "data": chunk(1, 4, "BBB", 9) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["code"], "protocol_violation");

    let ui: Value = client
        .get(format!("{}/ui", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ui["panel"], "control_panel");
    assert_eq!(ui["pending_chunks"], 0);
    assert_eq!(ui["loading"], false);
}

#[tokio::test]
async fn test_new_document_and_guide_dismissal() {
    let h = Harness::new();
    let base = spawn_loader(&h).await;
    let client = reqwest::Client::new();

    let resp: Value = client
        .post(format!("{}/documents/new", base))
        .json(&json!({ "kind": "cell" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], "opened");
    assert_eq!(resp["file_name"], "New_Document.xlsx");

    let bad = client
        .post(format!("{}/documents/new", base))
        .json(&json!({ "kind": "pdf" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);
    let body: Value = bad.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let dismissed = client
        .post(format!("{}/ui/guide/dismiss", base))
        .send()
        .await
        .unwrap();
    assert_eq!(dismissed.status(), 204);

    let ui: Value = client
        .get(format!("{}/ui", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ui["guide_dismissed"], true);
    assert_eq!(ui["panel"], "floating_button");
}

#[tokio::test]
async fn test_open_url_engine_failure_maps_to_500() {
    let origin = spawn_origin().await;
    let h = Harness::new();
    h.gateway
        .fail_open
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let base = spawn_loader(&h).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/documents/url", base))
        .json(&json!({ "url": format!("{}/y/doc.pptx", origin) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "engine_failure");
    assert_eq!(h.panel.view(), PanelView::ControlPanel);
}
