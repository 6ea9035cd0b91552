//! In-process fabric backend driven by a script.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fabric_console::client::{ChatReply, ChatRequest, FabricBackend, HealthReport};
use fabric_console::error::{ConsoleError, Result};
use tokio::sync::Notify;

/// One scripted answer to `POST /api/chat`.
pub enum Scripted {
    Reply(ChatReply),
    Error { status: u16, message: String },
    /// Reply only after the gate is opened.
    Gated(Arc<Notify>, ChatReply),
}

#[derive(Default)]
pub struct ScriptedBackend {
    health: Mutex<Option<HealthReport>>,
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
    health_calls: AtomicUsize,
    clear_calls: AtomicUsize,
    fail_clear: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer health checks with `status`; `None` makes them fail.
    pub fn set_health(&self, status: Option<&str>) {
        *self.health.lock().unwrap() = status.map(HealthReport::new);
    }

    pub fn push(&self, scripted: Scripted) {
        self.replies.lock().unwrap().push_back(scripted);
    }

    pub fn push_reply(&self, reply: ChatReply) {
        self.push(Scripted::Reply(reply));
    }

    /// Queue a reply held back until the returned gate is notified.
    pub fn push_gated(&self, reply: ChatReply) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(Scripted::Gated(Arc::clone(&gate), reply));
        gate
    }

    pub fn fail_clear(&self) {
        self.fail_clear.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FabricBackend for ScriptedBackend {
    async fn health(&self) -> Result<HealthReport> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.health
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ConsoleError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Error { status, message }) => Err(ConsoleError::Api { status, message }),
            Some(Scripted::Gated(gate, reply)) => {
                gate.notified().await;
                Ok(reply)
            }
            None => Ok(ChatReply::text("ok")),
        }
    }

    async fn clear_chat(&self) -> Result<()> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(ConsoleError::Api {
                status: 500,
                message: "Clear failed".to_string(),
            });
        }
        Ok(())
    }
}
