//! View-binding layer.
//!
//! Components never look elements up by themselves. They receive [`Mount`]
//! handles at construction time, so whether an element exists is decided once
//! by whoever builds the [`Document`]. A component given `None` simply skips
//! its visual updates.
//!
//! # Example
//!
//! ```rust
//! use fabric_console::view::{Document, ids};
//!
//! let document = Document::standard();
//! let list = document.get(ids::CHAT_MESSAGES).unwrap();
//! list.append("m1", "<p>Hello</p>");
//! assert_eq!(list.len(), 1);
//! assert!(document.render(ids::CHAT_MESSAGES).unwrap().contains("Hello"));
//! ```

mod mount;

pub use mount::Mount;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Well-known mount point identifiers.
pub mod ids {
    pub const CHAT_MESSAGES: &str = "chat-messages";
    pub const WORKFLOW_PANEL: &str = "workflow-panel";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const FILE_PREVIEW: &str = "file-upload-preview";
    pub const FILE_LIST: &str = "file-upload-list";
    pub const FILE_BUTTON: &str = "file-upload-button";
    pub const BACKEND_STATUS: &str = "backend-status";
    pub const LOADING_OVERLAY: &str = "loading-overlay";
    pub const TYPING_INDICATOR: &str = "typing-indicator";
    /// The hidden `<input type="file">` the upload button opens. Rendered
    /// by the page, not a mount.
    pub const FILE_INPUT: &str = "file-input";
}

/// Registry of mount points for one rendered page.
#[derive(Debug, Clone, Default)]
pub struct Document {
    mounts: Arc<RwLock<HashMap<String, Mount>>>,
}

impl Document {
    /// Create an empty document with no mount points.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document carrying every mount point the console uses.
    #[must_use]
    pub fn standard() -> Self {
        let document = Self::new();
        document.register(ids::CHAT_MESSAGES, "div", &["chat-messages", "space-y-4"]);
        document.register(ids::WORKFLOW_PANEL, "section", &["workflow-panel", "hidden"]);
        document.register(
            ids::NOTIFICATIONS,
            "div",
            &["fixed", "top-20", "right-4", "z-50", "space-y-2"],
        );
        document.register(ids::FILE_PREVIEW, "div", &["file-preview", "hidden"]);
        document.register(ids::FILE_LIST, "ul", &["file-list"]);
        document
            .register(ids::FILE_BUTTON, "label", &["file-upload-button"])
            .set_attr("for", ids::FILE_INPUT);
        document.register(ids::BACKEND_STATUS, "span", &["text-gray-500"]);
        document.register(ids::LOADING_OVERLAY, "div", &["loading-overlay", "hidden"]);
        document.register(ids::TYPING_INDICATOR, "div", &["typing-indicator", "hidden"]);
        document
    }

    /// Register (or replace) a mount point and return its handle.
    pub fn register(&self, id: &str, tag: &str, classes: &[&str]) -> Mount {
        let mount = Mount::new(id, tag, classes);
        self.mounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), mount.clone());
        mount
    }

    /// Remove a mount point. Components holding its handle keep working on a
    /// detached element.
    pub fn detach(&self, id: &str) -> Option<Mount> {
        self.mounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Look up a mount point.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Mount> {
        self.mounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Outer HTML of a mount point, if it exists.
    #[must_use]
    pub fn render(&self, id: &str) -> Option<String> {
        self.get(id).map(|mount| mount.render())
    }
}
