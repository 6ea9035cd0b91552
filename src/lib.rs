//! Fabric Console
//!
//! Browser console for an agent-orchestration backend ("the fabric"). Users
//! chat with the fabric, watch the workflow it builds for each request and
//! see backend health at a glance.
//!
//! # Architecture
//!
//! - **Client**: [`client::FabricBackend`] over the fabric's HTTP API
//! - **View**: [`view::Document`] mount points the UI components render into
//! - **UI**: chat, workflow panel, toasts, status polling and file selection
//! - **Server**: Axum host serving the page and HTMX fragments
//!
//! # Modules
//!
//! - [`client`]: backend trait and its reqwest implementation
//! - [`model`]: messages, pipeline metadata and status records
//! - [`ui`]: interactive components
//! - [`view`]: mount registry

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod client;
pub mod config;
pub mod error;
pub mod html;
pub mod model;
pub mod server;
pub mod telemetry;
pub mod ui;
pub mod view;

use std::sync::Arc;

use crate::client::FabricBackend;
use crate::config::UiConfig;
use crate::ui::{
    ChatController, ChatMounts, FileMounts, FileSelectionManager, NotificationCenter,
    StatusMonitor, WorkflowPanel,
};
use crate::view::{Document, ids};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct ConsoleState {
    /// Mount points of the rendered page.
    pub document: Document,
    /// Send/clear orchestration.
    pub chat: ChatController,
    /// Active workflow panel.
    pub workflow: WorkflowPanel,
    /// Toasts.
    pub notifications: NotificationCenter,
    /// Files selected for the next send.
    pub files: FileSelectionManager,
    /// Backend health polling.
    pub status: StatusMonitor,
}

impl ConsoleState {
    /// Wire every component to the standard page layout.
    pub fn new(backend: Arc<dyn FabricBackend>, ui: &UiConfig) -> Self {
        Self::with_document(backend, Document::standard(), ui)
    }

    /// Wire components to an existing document. Mounts missing from the
    /// document leave the matching component headless.
    pub fn with_document(backend: Arc<dyn FabricBackend>, document: Document, ui: &UiConfig) -> Self {
        let workflow = WorkflowPanel::new(document.get(ids::WORKFLOW_PANEL));
        let notifications = NotificationCenter::with_default_duration(
            document.get(ids::NOTIFICATIONS),
            ui.toast_duration(),
        );
        let files = FileSelectionManager::new(FileMounts {
            preview: document.get(ids::FILE_PREVIEW),
            list: document.get(ids::FILE_LIST),
            button: document.get(ids::FILE_BUTTON),
        });
        let status = StatusMonitor::new(Arc::clone(&backend), document.get(ids::BACKEND_STATUS))
            .with_interval(ui.status_poll_interval());
        let chat = ChatController::new(
            backend,
            workflow.clone(),
            notifications.clone(),
            files.clone(),
            ChatMounts {
                messages: document.get(ids::CHAT_MESSAGES),
                loading_overlay: document.get(ids::LOADING_OVERLAY),
                typing_indicator: document.get(ids::TYPING_INDICATOR),
            },
        )
        .with_auto_create(ui.auto_create);

        Self {
            document,
            chat,
            workflow,
            notifications,
            files,
            status,
        }
    }
}
