//! A single mounted element.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::html;

/// Handle to a mounted element.
///
/// Cloning is cheap; all clones observe the same element. The element has an
/// optional block of inner HTML followed by an ordered list of keyed children,
/// which is how lists (messages, toasts, files) are kept.
#[derive(Debug, Clone)]
pub struct Mount {
    inner: Arc<MountInner>,
}

#[derive(Debug)]
struct MountInner {
    id: String,
    tag: String,
    state: RwLock<MountState>,
}

#[derive(Debug, Default)]
struct MountState {
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    html: String,
    children: Vec<(String, String)>,
}

impl Mount {
    pub(crate) fn new(id: &str, tag: &str, classes: &[&str]) -> Self {
        Self {
            inner: Arc::new(MountInner {
                id: id.to_string(),
                tag: tag.to_string(),
                state: RwLock::new(MountState {
                    classes: classes.iter().map(ToString::to_string).collect(),
                    ..MountState::default()
                }),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MountState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MountState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Element identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Append a keyed child. An existing child with the same key is replaced
    /// in place.
    pub fn append(&self, key: impl Into<String>, html: impl Into<String>) {
        let key = key.into();
        let html = html.into();
        let mut state = self.write();
        if let Some(slot) = state.children.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = html;
        } else {
            state.children.push((key, html));
        }
    }

    /// Remove a keyed child. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.write();
        let before = state.children.len();
        state.children.retain(|(k, _)| k != key);
        state.children.len() != before
    }

    /// Whether a keyed child is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.read().children.iter().any(|(k, _)| k == key)
    }

    /// Keys of all children, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.read().children.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Number of keyed children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().children.len()
    }

    /// Whether the element has no keyed children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the inner HTML and every child.
    pub fn clear(&self) {
        let mut state = self.write();
        state.html.clear();
        state.children.clear();
    }

    /// Replace the inner HTML block. Children are kept.
    pub fn set_html(&self, html: impl Into<String>) {
        self.write().html = html.into();
    }

    /// Replace the inner HTML with escaped text.
    pub fn set_text(&self, text: &str) {
        self.set_html(html::escape(text));
    }

    pub fn add_class(&self, class: &str) {
        let mut state = self.write();
        if !state.classes.iter().any(|c| c == class) {
            state.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.write().classes.retain(|c| c != class);
    }

    /// Replace the whole class list.
    pub fn set_classes(&self, classes: &[&str]) {
        self.write().classes = classes.iter().map(ToString::to_string).collect();
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.read().classes.iter().any(|c| c == class)
    }

    /// Set an attribute on the element. `id` and `class` are managed by the
    /// mount and are ignored here.
    pub fn set_attr(&self, name: &str, value: &str) {
        if matches!(name, "id" | "class") {
            return;
        }
        let mut state = self.write();
        if let Some(slot) = state.attrs.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.to_string();
        } else {
            state.attrs.push((name.to_string(), value.to_string()));
        }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.read()
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Inner HTML: the HTML block followed by every child.
    #[must_use]
    pub fn inner_html(&self) -> String {
        let state = self.read();
        let mut out = state.html.clone();
        for (_, child) in &state.children {
            out.push_str(child);
        }
        out
    }

    /// Outer HTML of the element.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_with("")
    }

    /// Outer HTML marked for an HTMX out-of-band swap, so one response can
    /// refresh several mounts.
    #[must_use]
    pub fn render_oob(&self) -> String {
        self.render_with(r#" hx-swap-oob="true""#)
    }

    fn render_with(&self, extra: &str) -> String {
        let (classes, attrs) = {
            let state = self.read();
            let attrs: String = state
                .attrs
                .iter()
                .map(|(name, value)| format!(r#" {name}="{}""#, html::escape(value)))
                .collect();
            (state.classes.join(" "), attrs)
        };
        format!(
            r#"<{tag} id="{id}" class="{classes}"{attrs}{extra}>{inner}</{tag}>"#,
            tag = self.inner.tag,
            id = html::escape(&self.inner.id),
            classes = html::escape(&classes),
            inner = self.inner_html(),
        )
    }
}
