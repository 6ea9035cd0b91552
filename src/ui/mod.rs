//! Interactive console components.
//!
//! Each component owns one concern and writes into the [`Mount`]s it was
//! given. None of them require their mounts: a component built without
//! one keeps its state and skips rendering.
//!
//! - [`chat`]: send/clear orchestration
//! - [`renderer`]: message bubbles and the markdown subset
//! - [`workflow`]: pipeline progress panel
//! - [`notifications`]: toasts
//! - [`status`]: backend health polling
//! - [`files`]: upload selection
//!
//! [`Mount`]: crate::view::Mount

pub mod chat;
pub mod files;
pub mod notifications;
pub mod renderer;
pub mod status;
pub mod workflow;

pub use chat::{Answered, ChatController, ChatMounts, ClearOutcome, Confirm, SendOutcome};
pub use files::{FileMounts, FileSelectionManager, format_file_size};
pub use notifications::{NotificationCenter, ToastId, ToastKind};
pub use renderer::{MessageRenderer, Rendered, format_response};
pub use status::{StatusHandle, StatusMonitor};
pub use workflow::{PanelState, StepState, WorkflowPanel};
