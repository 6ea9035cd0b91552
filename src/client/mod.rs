//! Fabric backend access.
//!
//! Components talk to the backend only through [`FabricBackend`], so the
//! controller and status monitor can be driven by the real HTTP client
//! ([`HttpBackend`]) or by an in-process implementation in tests.

mod http;

pub use http::HttpBackend;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{FileDescriptor, PipelineInfo, StepResult, WorkflowData, WorkflowPlan};

/// Operations the console needs from the fabric backend.
#[async_trait]
pub trait FabricBackend: Send + Sync {
    /// `GET /api/health`
    async fn health(&self) -> Result<HealthReport>;

    /// `POST /api/chat`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `POST /api/chat/clear`
    async fn clear_chat(&self) -> Result<()>;
}

/// Body of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<HashMap<String, bool>>,
}

impl HealthReport {
    #[must_use]
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            services: None,
        }
    }
}

/// Body sent to the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub auto_create: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileDescriptor>,
}

/// The assistant text inside a chat reply.
///
/// Some backends send a bare string, others a message record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReplyBody {
    Text(String),
    Record {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Body returned by the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub response: Option<ReplyBody>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow: Option<WorkflowPlan>,
    #[serde(default)]
    pub pipeline_info: Option<PipelineInfo>,
    #[serde(default)]
    pub step_results: BTreeMap<String, StepResult>,
    #[serde(default)]
    pub generated_files: Vec<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatReply {
    /// A successful reply carrying only text.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            status: Some("success".to_string()),
            response: Some(ReplyBody::Text(content.into())),
            ..Self::default()
        }
    }

    /// Assistant text, falling back to a neutral acknowledgement.
    #[must_use]
    pub fn content(&self) -> String {
        let text = match &self.response {
            Some(ReplyBody::Text(text)) => Some(text.clone()),
            Some(ReplyBody::Record { content, message }) => content.clone().or(message.clone()),
            None => None,
        };
        text.filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Request processed".to_string())
    }

    /// Error reported inside a 2xx body (`status: "error"`).
    #[must_use]
    pub fn application_error(&self) -> Option<String> {
        if self.status.as_deref() != Some("error") {
            return None;
        }
        Some(
            self.message
                .clone()
                .or_else(|| self.error.clone())
                .unwrap_or_else(|| crate::error::GENERIC_FAILURE.to_string()),
        )
    }

    /// Workflow description for the panel, when the reply carries steps.
    #[must_use]
    pub fn workflow_data(&self) -> Option<WorkflowData> {
        let plan = self
            .workflow
            .clone()
            .filter(|plan| !plan.steps.is_empty())
            .or_else(|| {
                self.pipeline_info.as_ref().map(|info| WorkflowPlan {
                    kind: Some(info.kind.as_str().to_string()),
                    steps: info.steps.clone(),
                    execution_strategy: Some(info.execution_strategy.clone()),
                })
            })?;

        Some(WorkflowData {
            workflow_id: self.workflow_id.clone(),
            status: self.status.clone(),
            steps_completed: self
                .pipeline_info
                .as_ref()
                .map_or(0, |info| info.steps_completed),
            execution_time_seconds: self
                .pipeline_info
                .as_ref()
                .map(|info| info.execution_time_seconds),
            workflow: plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_content_shapes() {
        let reply: ChatReply =
            serde_json::from_value(json!({"response": {"content": "Done"}})).unwrap();
        assert_eq!(reply.content(), "Done");

        let reply: ChatReply =
            serde_json::from_value(json!({"response": {"message": "Legacy"}})).unwrap();
        assert_eq!(reply.content(), "Legacy");

        let reply: ChatReply = serde_json::from_value(json!({"response": "Plain"})).unwrap();
        assert_eq!(reply.content(), "Plain");

        assert_eq!(ChatReply::default().content(), "Request processed");
    }

    #[test]
    fn test_application_error() {
        let reply: ChatReply = serde_json::from_value(json!({
            "status": "error",
            "error": "Backend orchestrator not available"
        }))
        .unwrap();
        assert_eq!(
            reply.application_error().as_deref(),
            Some("Backend orchestrator not available")
        );
        assert!(ChatReply::text("ok").application_error().is_none());
    }

    #[test]
    fn test_workflow_data_from_pipeline_info() {
        let reply: ChatReply = serde_json::from_value(json!({
            "status": "processing",
            "workflow_id": "wf_1",
            "pipeline_info": {
                "type": "pipeline",
                "steps": ["extract", "transform", "load"],
                "steps_completed": 2,
                "total_steps": 3
            }
        }))
        .unwrap();

        let data = reply.workflow_data().unwrap();
        assert_eq!(data.workflow_id.as_deref(), Some("wf_1"));
        assert_eq!(data.workflow.steps.len(), 3);
        assert_eq!(data.steps_completed, 2);
    }

    #[test]
    fn test_chat_request_omits_empty_files() {
        let request = ChatRequest {
            message: "hi".to_string(),
            auto_create: true,
            files: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"message": "hi", "auto_create": true})
        );
    }
}
