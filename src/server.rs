use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::Deserialize;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::ConsoleState;
use crate::client::HttpBackend;
use crate::config::AppConfig;
use crate::model::FileDescriptor;
use crate::ui::{Answered, ToastId};
use crate::view::{Document, ids};

/// Upper bound for one UI request. Chat requests wait on the backend, so
/// this sits above the backend timeout.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

const HTMX_CDN: &str = "https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "backend.config.loaded",
        base_url = %config.backend.base_url,
        timeout_secs = config.backend.request_timeout_secs,
        "Fabric backend configured"
    );

    let backend = Arc::new(HttpBackend::with_timeout(
        &config.backend.base_url,
        config.backend.request_timeout(),
    )?);
    let state = ConsoleState::new(backend, &config.ui);

    let poller = state.status.spawn();
    info!(
        name: "status.poller.started",
        interval_secs = state.status.interval().as_secs(),
        "Status poller started"
    );

    if !FsPath::new(&config.server.static_dir).is_dir() {
        tracing::warn!(
            static_dir = %config.server.static_dir,
            "Static directory not found; /static requests will 404"
        );
    }

    let app = router(
        state,
        &config.server.static_dir,
        config.backend.request_timeout() + REQUEST_TIMEOUT_SLACK,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    let served = axum::serve(listener, app.into_make_service()).await;
    poller.abort();
    served?;
    Ok(())
}

/// Build the console router. Assets under `static_dir` are served at
/// `/static`.
pub fn router(
    state: ConsoleState,
    static_dir: impl AsRef<FsPath>,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ui/chat", post(chat_handler))
        .route("/ui/chat/clear", post(clear_handler))
        .route("/ui/mounts/{id}", get(mount_handler))
        .route("/ui/notifications/{id}/dismiss", post(dismiss_handler))
        .route("/ui/files", post(select_files_handler))
        .route("/ui/files/reset", post(reset_files_handler))
        .route("/ui/workflow/close", post(close_workflow_handler))
        .route("/ui/status/check", post(status_check_handler))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(request_timeout, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Outer HTML of a mount, or nothing when the document lacks it.
fn mount_html(document: &Document, id: &str) -> String {
    document.render(id).unwrap_or_default()
}

/// Out-of-band copies of the mounts a chat exchange touches.
fn chat_side_effects(document: &Document) -> String {
    [
        ids::WORKFLOW_PANEL,
        ids::NOTIFICATIONS,
        ids::LOADING_OVERLAY,
        ids::TYPING_INDICATOR,
        ids::FILE_PREVIEW,
        ids::FILE_BUTTON,
    ]
    .iter()
    .filter_map(|id| document.get(id))
    .map(|mount| mount.render_oob())
    .collect()
}

/// Generate the HTML shell for the application.
fn html_shell(title: &str, status: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en" class="dark">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Agent fabric console">
    <title>{title} - Fabric Console</title>

    <!-- HTMX (local, CDN when the vendored copy is absent) -->
    <script src="/static/vendor/htmx-2.0.8.min.js"
        onerror="var s=document.createElement('script');s.src='{HTMX_CDN}';document.head.appendChild(s)"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body class="min-h-screen bg-background text-textPrimary antialiased">
    <div id="app-shell" class="flex flex-col h-screen overflow-hidden">
        <header class="sticky top-0 z-50 w-full bg-surfaceContainer backdrop-blur shadow-sm shrink-0">
            <div class="container mx-auto flex h-14 md:h-16 items-center justify-between px-4 md:px-6 max-w-5xl">
                <a href="/" class="flex items-center gap-2 md:gap-3 font-semibold hover:opacity-80 transition-opacity">
                    <span class="text-base md:text-lg">Fabric Console</span>
                </a>
                {status}
            </div>
        </header>

        <main id="app" class="flex-1 overflow-y-auto container mx-auto px-4 md:px-6 py-4 md:py-8 max-w-5xl">
            {content}
        </main>
    </div>
</body>
</html>"#)
}

/// Header status indicator with its manual check button.
fn status_bar(document: &Document) -> String {
    format!(
        r##"<div class="flex items-center gap-2 text-sm" hx-get="/ui/mounts/backend-status" hx-trigger="every 30s" hx-target="#backend-status" hx-swap="outerHTML">
                    <span class="text-textMuted">Backend:</span>
                    {indicator}
                    <button type="button" class="px-2 py-1 rounded-lg text-xs hover:bg-surface"
                        hx-post="/ui/status/check" hx-target="#backend-status" hx-swap="outerHTML">Check</button>
                </div>"##,
        indicator = mount_html(document, ids::BACKEND_STATUS),
    )
}

/// Chat page content.
fn chat_content(document: &Document) -> String {
    format!(
        r##"
    <div class="chat-shell flex flex-col h-full bg-surface md:rounded-3xl overflow-hidden md:shadow-lg">
        <header class="flex items-center justify-between px-4 md:px-6 py-3 md:py-4 bg-surfaceContainer shrink-0">
            <h2 class="font-semibold text-base md:text-lg">Agent Fabric</h2>
            <form hx-post="/ui/chat/clear" hx-target="#chat-messages" hx-swap="outerHTML"
                  hx-confirm="Clear the conversation history?">
                <input type="hidden" name="confirmed" value="true">
                <button type="submit" class="px-3 py-2 rounded-xl text-sm text-textSecondary hover:bg-surface">Clear</button>
            </form>
        </header>

        {workflow}

        <div class="flex-1 overflow-y-auto overflow-x-hidden p-4">
            {messages}
            {typing}
        </div>

        <div class="p-3 md:p-5 bg-surfaceContainer shrink-0">
            {preview}
            <form class="flex gap-2 md:gap-3"
                  hx-post="/ui/chat"
                  hx-target="#chat-messages"
                  hx-swap="outerHTML"
                  hx-on--after-request="this.reset()">
                {button}
                <input type="file" multiple class="hidden" id="{file_input}"
                       hx-on:change="fetch('/ui/files', {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: JSON.stringify([...this.files].map(f => ({{name: f.name, size_bytes: f.size}})))}}).then(r => r.text()).then(html => htmx.swap('#file-upload-button', html, {{swapStyle: 'outerHTML'}}))">
                <textarea name="message" rows="1" required
                    placeholder="Ask the fabric..."
                    class="flex-1 min-h-[44px] max-h-[200px] px-4 py-3 rounded-2xl bg-surface text-textPrimary placeholder:text-textMuted resize-none focus:outline-none focus:ring-2 focus:ring-primary"></textarea>
                <button type="submit" class="shrink-0 h-11 px-4 rounded-2xl bg-primary text-white hover:bg-primaryMuted active:scale-95 transition-all">Send</button>
            </form>
        </div>
    </div>
    {overlay}
    {notifications}
    "##,
        workflow = mount_html(document, ids::WORKFLOW_PANEL),
        messages = mount_html(document, ids::CHAT_MESSAGES),
        typing = mount_html(document, ids::TYPING_INDICATOR),
        preview = mount_html(document, ids::FILE_PREVIEW),
        button = mount_html(document, ids::FILE_BUTTON),
        file_input = ids::FILE_INPUT,
        overlay = mount_html(document, ids::LOADING_OVERLAY),
        notifications = mount_html(document, ids::NOTIFICATIONS),
    )
}

/// Index page handler.
async fn index_handler(State(state): State<ConsoleState>) -> impl IntoResponse {
    let document = &state.document;
    Html(html_shell(
        "Chat",
        &status_bar(document),
        &chat_content(document),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Fragment Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Form body for `POST /ui/chat`.
#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

/// POST /ui/chat - Send a message and return the refreshed chat list.
async fn chat_handler(
    State(state): State<ConsoleState>,
    Form(form): Form<ChatForm>,
) -> impl IntoResponse {
    let outcome = state.chat.send_message(&form.message).await;
    tracing::debug!(outcome = ?outcome, "Chat form handled");

    Html(format!(
        "{}{}",
        mount_html(&state.document, ids::CHAT_MESSAGES),
        chat_side_effects(&state.document)
    ))
}

/// Form body for `POST /ui/chat/clear`.
#[derive(Debug, Deserialize)]
struct ClearForm {
    #[serde(default)]
    confirmed: Option<String>,
}

/// POST /ui/chat/clear - Clear the conversation.
async fn clear_handler(
    State(state): State<ConsoleState>,
    Form(form): Form<ClearForm>,
) -> impl IntoResponse {
    let confirmed = form
        .confirmed
        .as_deref()
        .is_some_and(|value| matches!(value, "true" | "on" | "yes" | "1"));
    let outcome = state.chat.clear_history(&Answered(confirmed)).await;
    tracing::debug!(outcome = ?outcome, "Clear form handled");

    Html(format!(
        "{}{}",
        mount_html(&state.document, ids::CHAT_MESSAGES),
        chat_side_effects(&state.document)
    ))
}

/// GET /ui/mounts/:id - Outer HTML of one mount.
async fn mount_handler(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    state.document.render(&id).map(Html).ok_or(StatusCode::NOT_FOUND)
}

/// POST /ui/notifications/:id/dismiss - Remove a toast early.
async fn dismiss_handler(
    State(state): State<ConsoleState>,
    Path(id): Path<String>,
) -> StatusCode {
    match ToastId::parse(&id) {
        Some(toast) => {
            state.notifications.dismiss(toast);
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// POST /ui/files - Replace the file selection.
async fn select_files_handler(
    State(state): State<ConsoleState>,
    Json(files): Json<Vec<FileDescriptor>>,
) -> impl IntoResponse {
    state.files.select(files);
    files_fragment(&state.document)
}

/// POST /ui/files/reset - Clear the file selection.
async fn reset_files_handler(State(state): State<ConsoleState>) -> impl IntoResponse {
    state.files.reset();
    files_fragment(&state.document)
}

fn files_fragment(document: &Document) -> Html<String> {
    Html(format!(
        "{}{}",
        mount_html(document, ids::FILE_BUTTON),
        document
            .get(ids::FILE_PREVIEW)
            .map(|preview| preview.render_oob())
            .unwrap_or_default()
    ))
}

/// POST /ui/workflow/close - Hide the workflow panel.
async fn close_workflow_handler(State(state): State<ConsoleState>) -> impl IntoResponse {
    state.workflow.hide();
    Html(mount_html(&state.document, ids::WORKFLOW_PANEL))
}

/// POST /ui/status/check - Poll the backend now.
async fn status_check_handler(State(state): State<ConsoleState>) -> impl IntoResponse {
    state.status.poll().await;
    Html(mount_html(&state.document, ids::BACKEND_STATUS))
}
