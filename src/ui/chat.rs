//! Chat send/receive orchestration.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::{ChatReply, ChatRequest, FabricBackend};
use crate::error::ConsoleError;
use crate::model::{ChatMessage, MessageStatus};
use crate::ui::files::FileSelectionManager;
use crate::ui::notifications::{NotificationCenter, ToastKind};
use crate::ui::renderer::MessageRenderer;
use crate::ui::workflow::WorkflowPanel;
use crate::view::Mount;

const CLEAR_PROMPT: &str = "Clear the conversation history?";

/// Asks the user to confirm a destructive action.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// A confirmation answered ahead of time, e.g. by an `hx-confirm` dialog.
#[derive(Debug, Clone, Copy)]
pub struct Answered(pub bool);

impl Confirm for Answered {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// What happened to a `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing rendered, nothing sent.
    Ignored,
    /// Another send is still in flight.
    Busy,
    /// Assistant reply rendered.
    Delivered,
    /// Error message rendered and notified.
    Failed,
    /// The conversation was cleared while waiting; the reply was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cancelled,
    Cleared,
    Failed,
}

/// Mounts owned by the chat controller.
#[derive(Debug, Clone, Default)]
pub struct ChatMounts {
    pub messages: Option<Mount>,
    pub loading_overlay: Option<Mount>,
    pub typing_indicator: Option<Mount>,
}

#[derive(Debug, Default)]
struct ChatState {
    messages: Vec<ChatMessage>,
    processing: bool,
    /// Bumped on every clear; replies from an older epoch are stale.
    epoch: u64,
}

/// Drives one conversation: renders the user's message, calls the backend
/// and renders the reply or the failure.
#[derive(Clone)]
pub struct ChatController {
    backend: Arc<dyn FabricBackend>,
    renderer: MessageRenderer,
    workflow: WorkflowPanel,
    notifications: NotificationCenter,
    files: FileSelectionManager,
    mounts: ChatMounts,
    auto_create: bool,
    state: Arc<Mutex<ChatState>>,
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("mounts", &self.mounts)
            .field("auto_create", &self.auto_create)
            .field("state", &self.state)
            .finish()
    }
}

impl ChatController {
    #[must_use]
    pub fn new(
        backend: Arc<dyn FabricBackend>,
        workflow: WorkflowPanel,
        notifications: NotificationCenter,
        files: FileSelectionManager,
        mounts: ChatMounts,
    ) -> Self {
        Self {
            backend,
            renderer: MessageRenderer::new(),
            workflow,
            notifications,
            files,
            mounts,
            auto_create: true,
            state: Arc::new(Mutex::new(ChatState::default())),
        }
    }

    /// Whether the backend may create missing agents and tools.
    #[must_use]
    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Messages currently displayed, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    /// Send the user's text and render the exchange.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        let user = ChatMessage::user(text);
        let epoch = {
            let mut state = self.lock();
            if state.processing {
                drop(state);
                self.notifications
                    .notify("Please wait for the current request to finish", ToastKind::Warning);
                return SendOutcome::Busy;
            }
            self.append(&mut state, user);
            state.processing = true;
            state.epoch
        };
        self.set_busy(true);
        let mut in_flight = InFlight {
            chat: self,
            epoch,
            settled: false,
        };

        let request = ChatRequest {
            message: text.to_string(),
            auto_create: self.auto_create,
            files: self.files.files(),
        };

        tracing::info!(
            name: "chat.sent",
            message_length = text.len(),
            files = request.files.len(),
            "Sending chat message"
        );

        let result = self.backend.chat(&request).await.and_then(|reply| {
            match reply.application_error() {
                Some(message) => Err(ConsoleError::Api {
                    status: 200,
                    message,
                }),
                None => Ok(reply),
            }
        });

        let mut state = self.lock();
        in_flight.settled = true;
        if state.epoch != epoch {
            tracing::info!(name: "chat.discarded", "Dropping reply for a cleared conversation");
            return SendOutcome::Discarded;
        }
        state.processing = false;

        match result {
            Ok(reply) => {
                self.append(&mut state, assistant_message(&reply));
                drop(state);
                self.set_busy(false);

                if let Some(data) = reply.workflow_data() {
                    if let Err(err) = self.workflow.show(&data) {
                        tracing::warn!(error = %err, "Workflow data not displayed");
                    }
                }
                self.files.reset();

                tracing::info!(name: "chat.reply", "Assistant reply rendered");
                SendOutcome::Delivered
            }
            Err(err) => {
                let reason = err.user_message();
                self.append(
                    &mut state,
                    ChatMessage::assistant(format!("Sorry, I encountered an error: {reason}"))
                        .with_status(MessageStatus::Error),
                );
                drop(state);
                self.set_busy(false);

                tracing::warn!(name: "chat.failed", error = %err, "Chat request failed");
                self.notifications.notify(&reason, ToastKind::Error);
                SendOutcome::Failed
            }
        }
    }

    /// Clear the conversation here and on the backend.
    pub async fn clear_history(&self, confirm: &dyn Confirm) -> ClearOutcome {
        if !confirm.confirm(CLEAR_PROMPT) {
            return ClearOutcome::Cancelled;
        }

        if let Err(err) = self.backend.clear_chat().await {
            tracing::warn!(name: "chat.clear.failed", error = %err, "Clearing chat failed");
            self.notifications.notify(
                &format!("Failed to clear chat: {}", err.user_message()),
                ToastKind::Error,
            );
            return ClearOutcome::Failed;
        }

        {
            let mut state = self.lock();
            state.messages.clear();
            state.processing = false;
            state.epoch += 1;
            if let Some(list) = &self.mounts.messages {
                list.clear();
            }
        }
        self.set_busy(false);
        self.workflow.hide();

        tracing::info!(name: "chat.cleared", "Chat history cleared");
        self.notifications
            .notify("Chat history cleared", ToastKind::Success);
        ClearOutcome::Cleared
    }

    /// Record and render a message. The caller holds the state lock so a
    /// concurrent clear cannot interleave.
    fn append(&self, state: &mut ChatState, message: ChatMessage) {
        if let Some(list) = &self.mounts.messages {
            let rendered = self.renderer.render(&message);
            list.append(rendered.key, rendered.html);
        }
        state.messages.push(message);
    }

    fn set_busy(&self, busy: bool) {
        if let Some(overlay) = &self.mounts.loading_overlay {
            if busy {
                overlay.remove_class("hidden");
                overlay.add_class("flex");
            } else {
                overlay.add_class("hidden");
                overlay.remove_class("flex");
            }
        }
        if let Some(typing) = &self.mounts.typing_indicator {
            if busy {
                typing.remove_class("hidden");
                typing.set_html(
                    r#"<span class="dot"></span><span class="dot"></span><span class="dot"></span>"#,
                );
            } else {
                typing.add_class("hidden");
                typing.clear();
            }
        }
    }
}

/// Releases the busy gate when a send is dropped before the backend answers,
/// e.g. on a request timeout or a client disconnect.
struct InFlight<'a> {
    chat: &'a ChatController,
    epoch: u64,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.chat.lock();
        if state.epoch != self.epoch || !state.processing {
            return;
        }
        state.processing = false;
        drop(state);
        self.chat.set_busy(false);
        tracing::warn!(name: "chat.abandoned", "Chat request dropped before the backend answered");
    }
}

fn assistant_message(reply: &ChatReply) -> ChatMessage {
    let mut message = ChatMessage::assistant(reply.content());
    message.status = match reply.status.as_deref() {
        Some("success" | "completed") => Some(MessageStatus::Success),
        Some("processing") => Some(MessageStatus::Processing),
        Some("error") => Some(MessageStatus::Error),
        _ => None,
    };
    message.pipeline_info = reply.pipeline_info.clone();
    message.step_results = reply.step_results.clone();
    message
}
