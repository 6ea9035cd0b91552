//! Toast notifications.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::html;
use crate::view::Mount;

/// Default toast lifetime.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Error,
    Warning,
}

impl ToastKind {
    /// Parse a kind name; anything unrecognised is `Info`.
    #[must_use]
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Info,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Identifier of a displayed toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(u64);

impl ToastId {
    /// DOM key of the toast element.
    #[must_use]
    pub fn key(self) -> String {
        format!("toast-{}", self.0)
    }

    /// Parse a DOM key or a bare number.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        raw.strip_prefix("toast-")
            .unwrap_or(raw)
            .parse()
            .ok()
            .map(Self)
    }
}

/// Inserts, times and dismisses toasts.
///
/// Each toast owns its own timer task, so toasts never interfere with each
/// other. Without a mount the center still hands out ids but shows nothing.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    inner: Arc<NotificationInner>,
}

#[derive(Debug)]
struct NotificationInner {
    mount: Option<Mount>,
    next_id: AtomicU64,
    default_duration: Duration,
    timers: Mutex<HashMap<ToastId, AbortHandle>>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new(mount: Option<Mount>) -> Self {
        Self::with_default_duration(mount, DEFAULT_TOAST_DURATION)
    }

    #[must_use]
    pub fn with_default_duration(mount: Option<Mount>, default_duration: Duration) -> Self {
        Self {
            inner: Arc::new(NotificationInner {
                mount,
                next_id: AtomicU64::new(1),
                default_duration,
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Show a toast for the default duration.
    pub fn notify(&self, message: &str, kind: ToastKind) -> ToastId {
        self.notify_for(message, kind, self.inner.default_duration)
    }

    /// Show a toast for `duration`; a zero duration keeps it until dismissed.
    ///
    /// Must be called from within a tokio runtime when `duration` is non-zero.
    pub fn notify_for(&self, message: &str, kind: ToastKind, duration: Duration) -> ToastId {
        let id = ToastId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            name: "toast.shown",
            toast = id.0,
            kind = kind.as_str(),
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "Toast shown"
        );

        let Some(mount) = &self.inner.mount else {
            return id;
        };
        mount.append(id.key(), toast_html(id, message, kind));

        if !duration.is_zero() {
            // Held until the handle is stored so the task cannot remove its
            // entry first.
            let mut timers = self
                .inner
                .timers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mount = mount.clone();
            let center = Arc::clone(&self.inner);
            let task = tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                mount.remove(&id.key());
                center
                    .timers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
            });
            timers.insert(id, task.abort_handle());
        }

        id
    }

    /// Remove a toast now. Returns whether it was still displayed.
    pub fn dismiss(&self, id: ToastId) -> bool {
        if let Some(timer) = self
            .inner
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
        {
            timer.abort();
        }
        self.inner
            .mount
            .as_ref()
            .is_some_and(|mount| mount.remove(&id.key()))
    }

    /// Whether a toast is currently displayed.
    #[must_use]
    pub fn is_visible(&self, id: ToastId) -> bool {
        self.inner
            .mount
            .as_ref()
            .is_some_and(|mount| mount.contains(&id.key()))
    }

    /// Number of toasts currently displayed.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.inner.mount.as_ref().map_or(0, Mount::len)
    }
}

fn toast_html(id: ToastId, message: &str, kind: ToastKind) -> String {
    let key = id.key();
    format!(
        r##"<div id="{key}" class="alert alert-{kind} animate-slide-up" role="status">
    <div class="flex items-center justify-between">
        <span>{message}</span>
        <button class="ml-4 text-white hover:text-gray-200" aria-label="Dismiss"
                hx-post="/ui/notifications/{key}/dismiss" hx-target="#{key}" hx-swap="delete">
            <svg class="w-4 h-4" fill="none" stroke="currentColor" viewBox="0 0 24 24">
                <path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M6 18L18 6M6 6l12 12"></path>
            </svg>
        </button>
    </div>
</div>"##,
        kind = kind.as_str(),
        message = html::escape(message),
    )
}
