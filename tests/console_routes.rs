mod common;

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{Scripted, ScriptedBackend};
use fabric_console::ConsoleState;
use fabric_console::client::ChatReply;
use fabric_console::config::UiConfig;
use fabric_console::server::router;
use fabric_console::ui::ToastKind;
use serde_json::json;

fn setup() -> (TestServer, ConsoleState, std::sync::Arc<ScriptedBackend>) {
    let backend = ScriptedBackend::new();
    let state = ConsoleState::new(backend.clone(), &UiConfig::default());
    let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
    let server =
        TestServer::new(router(state.clone(), static_dir, Duration::from_secs(30))).unwrap();
    (server, state, backend)
}

#[tokio::test]
async fn test_index_renders_every_mount() {
    let (server, _state, _backend) = setup();

    let response = server.get("/").await;
    response.assert_status_ok();
    let page = response.text();
    for id in [
        "chat-messages",
        "workflow-panel",
        "notifications",
        "file-upload-preview",
        "file-upload-list",
        "file-upload-button",
        "backend-status",
        "loading-overlay",
        "typing-indicator",
    ] {
        assert!(page.contains(&format!(r#"id="{id}""#)), "missing mount {id}");
    }
    assert!(page.contains(r#"<label id="file-upload-button" class="file-upload-button" for="file-input">"#));
    assert!(page.contains(r#"id="file-input""#));
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let (server, _state, _backend) = setup();

    let page = server.get("/").await.text();
    assert!(page.contains(r#"href="/static/app.css""#));

    let response = server.get("/static/app.css").await;
    response.assert_status_ok();
    assert!(
        response
            .header("content-type")
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );
    assert!(response.text().contains(".loading-overlay"));

    server
        .get("/static/missing.js")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_form_returns_updated_list() {
    let (server, state, backend) = setup();
    backend.push_reply(ChatReply::text("Hello from the fabric"));

    let response = server
        .post("/ui/chat")
        .form(&[("message", "Hi <there>")])
        .await;

    response.assert_status_ok();
    let html = response.text();
    assert!(html.starts_with(r#"<div id="chat-messages""#));
    assert!(html.contains("Hi &lt;there&gt;"));
    assert!(html.contains("Hello from the fabric"));
    assert!(html.contains(r#"hx-swap-oob="true""#));
    assert_eq!(state.chat.messages().len(), 2);
}

#[tokio::test]
async fn test_clear_requires_confirmation() {
    let (server, state, backend) = setup();
    state.chat.send_message("Hello").await;

    server
        .post("/ui/chat/clear")
        .form(&[("confirmed", "false")])
        .await
        .assert_status_ok();
    assert_eq!(backend.clear_calls(), 0);
    assert_eq!(state.chat.messages().len(), 2);

    server
        .post("/ui/chat/clear")
        .form(&[("confirmed", "true")])
        .await
        .assert_status_ok();
    assert_eq!(backend.clear_calls(), 1);
    assert!(state.chat.messages().is_empty());
}

#[tokio::test]
async fn test_mount_fragment() {
    let (server, _state, _backend) = setup();

    let response = server.get("/ui/mounts/backend-status").await;
    response.assert_status_ok();
    assert!(response.text().contains("text-gray-500"));

    server
        .get("/ui/mounts/nope")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dismiss_notification() {
    let (server, state, _backend) = setup();
    let id = state
        .notifications
        .notify_for("Saved", ToastKind::Success, Duration::ZERO);
    assert!(state.notifications.is_visible(id));

    server
        .post(&format!("/ui/notifications/{}/dismiss", id.key()))
        .await
        .assert_status_ok();
    assert!(!state.notifications.is_visible(id));

    server
        .post("/ui/notifications/bogus/dismiss")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_selection_routes() {
    let (server, state, _backend) = setup();

    let response = server
        .post("/ui/files")
        .json(&json!([{"name": "data.csv", "size_bytes": 1536}]))
        .await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("1 file(s) selected"));
    assert!(html.contains("1.5 KB"));
    assert_eq!(state.files.files().len(), 1);

    let response = server.post("/ui/files/reset").await;
    response.assert_status_ok();
    assert!(response.text().contains("Attach files"));
    assert!(state.files.is_empty());
}

#[tokio::test]
async fn test_workflow_close_and_status_check() {
    let (server, state, backend) = setup();
    backend.push(Scripted::Reply(
        serde_json::from_value(json!({
            "status": "processing",
            "workflow": {"type": "sequential", "steps": ["extract", "load"]}
        }))
        .unwrap(),
    ));
    state.chat.send_message("Run it").await;
    assert!(
        !state
            .document
            .get("workflow-panel")
            .unwrap()
            .has_class("hidden")
    );

    let response = server.post("/ui/workflow/close").await;
    response.assert_status_ok();
    assert!(response.text().contains("hidden"));

    backend.set_health(Some("healthy"));
    let response = server.post("/ui/status/check").await;
    response.assert_status_ok();
    assert!(response.text().contains("Connected"));
    assert!(state.status.status().connected);
}
