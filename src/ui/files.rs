//! Files selected for upload.

use std::sync::{Arc, PoisonError, RwLock};

use crate::html;
use crate::model::FileDescriptor;
use crate::view::Mount;

/// Format a byte count with binary units: `1536` → `"1.5 KB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Mounts used by the file picker.
#[derive(Debug, Clone, Default)]
pub struct FileMounts {
    /// Wrapper shown only while files are selected.
    pub preview: Option<Mount>,
    /// List of selected files inside the preview.
    pub list: Option<Mount>,
    /// The upload control.
    pub button: Option<Mount>,
}

/// Owns the [`FileDescriptor`]s selected for the next send.
#[derive(Debug, Clone)]
pub struct FileSelectionManager {
    files: Arc<RwLock<Vec<FileDescriptor>>>,
    mounts: FileMounts,
}

impl FileSelectionManager {
    /// Create an empty selection and render the initial preview and button.
    #[must_use]
    pub fn new(mounts: FileMounts) -> Self {
        let manager = Self {
            files: Arc::new(RwLock::new(Vec::new())),
            mounts,
        };
        manager.refresh();
        manager
    }

    /// Replace the selection and refresh the preview.
    pub fn select(&self, files: Vec<FileDescriptor>) {
        tracing::debug!(count = files.len(), "File selection replaced");
        *self.files.write().unwrap_or_else(PoisonError::into_inner) = files;
        self.refresh();
    }

    /// Clear the selection and restore the upload control.
    pub fn reset(&self) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.refresh();
    }

    /// Snapshot of the current selection.
    #[must_use]
    pub fn files(&self) -> Vec<FileDescriptor> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn refresh(&self) {
        let files = self.files();

        if let Some(list) = &self.mounts.list {
            list.clear();
            for (index, file) in files.iter().enumerate() {
                list.append(
                    format!("file-{index}"),
                    format!(
                        r#"<li class="flex justify-between text-sm"><span>{}</span><span class="text-textMuted">{}</span></li>"#,
                        html::escape(&file.name),
                        format_file_size(file.size_bytes)
                    ),
                );
            }
        }

        if let Some(preview) = &self.mounts.preview {
            if let Some(list) = &self.mounts.list {
                preview.set_html(list.render());
            }
            if files.is_empty() {
                preview.add_class("hidden");
            } else {
                preview.remove_class("hidden");
            }
        }

        if let Some(button) = &self.mounts.button {
            if files.is_empty() {
                button.set_classes(&["file-upload-button"]);
                button.set_text("Attach files");
            } else {
                button.set_classes(&["file-upload-button", "has-files"]);
                button.set_text(&format!("{} file(s) selected", files.len()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Document, ids};

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    fn manager() -> (FileSelectionManager, Document) {
        let document = Document::standard();
        let manager = FileSelectionManager::new(FileMounts {
            preview: document.get(ids::FILE_PREVIEW),
            list: document.get(ids::FILE_LIST),
            button: document.get(ids::FILE_BUTTON),
        });
        (manager, document)
    }

    #[test]
    fn test_new_renders_empty_list_inside_preview() {
        let (_manager, document) = manager();

        let preview = document.render(ids::FILE_PREVIEW).unwrap();
        assert!(preview.contains(r#"id="file-upload-list""#));
        assert!(preview.contains("hidden"));
        assert_eq!(
            document.get(ids::FILE_BUTTON).unwrap().inner_html(),
            "Attach files"
        );
    }

    #[test]
    fn test_select_replaces_and_previews() {
        let (manager, document) = manager();
        manager.select(vec![FileDescriptor::new("a.csv", 10)]);
        manager.select(vec![
            FileDescriptor::new("report.pdf", 1536),
            FileDescriptor::new("<b>.txt", 0),
        ]);

        assert_eq!(manager.files().len(), 2);
        let list = document.render(ids::FILE_LIST).unwrap();
        assert!(list.contains("report.pdf"));
        assert!(list.contains("1.5 KB"));
        assert!(list.contains("&lt;b&gt;.txt"));
        assert!(!list.contains("a.csv"));

        let preview = document.get(ids::FILE_PREVIEW).unwrap();
        assert!(!preview.has_class("hidden"));
        assert!(preview.render().contains("report.pdf"));
        assert!(document.get(ids::FILE_BUTTON).unwrap().has_class("has-files"));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let (manager, document) = manager();
        manager.select(vec![FileDescriptor::new("a.csv", 10)]);
        manager.reset();

        assert!(manager.is_empty());
        assert!(document.get(ids::FILE_LIST).unwrap().is_empty());
        assert!(document.get(ids::FILE_PREVIEW).unwrap().has_class("hidden"));
        let button = document.get(ids::FILE_BUTTON).unwrap();
        assert!(!button.has_class("has-files"));
        assert_eq!(button.inner_html(), "Attach files");
    }

    #[test]
    fn test_without_mounts() {
        let manager = FileSelectionManager::new(FileMounts::default());
        manager.select(vec![FileDescriptor::new("a.csv", 10)]);
        assert_eq!(manager.files().len(), 1);
        manager.reset();
        assert!(manager.is_empty());
    }
}
