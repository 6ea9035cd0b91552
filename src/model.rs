//! Data model rendered by the console.
//!
//! Wire names follow the fabric backend (snake_case). Enumerations that the
//! backend may extend degrade to a fallback variant instead of failing the
//! whole payload.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::RenderError;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Outcome attached to a rendered message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Success,
    Error,
    Processing,
}

impl MessageStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Processing => "processing",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_info: Option<PipelineInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub step_results: BTreeMap<String, StepResult>,
}

impl ChatMessage {
    /// A user message stamped with the local clock.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An assistant message stamped with the local clock.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        let prefix = match role {
            Role::User => "msg",
            Role::Assistant => "sys",
        };
        Self {
            id: format!("{prefix}_{}", &Uuid::new_v4().simple().to_string()[..8]),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            status: None,
            pipeline_info: None,
            step_results: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_pipeline(mut self, info: PipelineInfo) -> Self {
        self.pipeline_info = Some(info);
        self
    }

    #[must_use]
    pub fn with_step_results(mut self, results: BTreeMap<String, StepResult>) -> Self {
        self.step_results = results;
        self
    }
}

/// Shape of the backend processing for one request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineType {
    Pipeline,
    Complex,
    #[default]
    #[serde(other)]
    Simple,
}

impl PipelineType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Pipeline => "pipeline",
            Self::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceGrade {
    Excellent,
    Good,
    Acceptable,
    NeedsImprovement,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PerformanceGrade {
    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Acceptable => "Acceptable",
            Self::NeedsImprovement => "Needs improvement",
            Self::Unknown => "Unknown",
        }
    }
}

/// Pipeline metadata returned alongside an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PipelineInfo {
    #[serde(rename = "type", default)]
    pub kind: PipelineType,
    #[serde(default, deserialize_with = "step_names")]
    pub steps: Vec<String>,
    #[serde(default)]
    pub steps_completed: u32,
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub execution_strategy: String,
    #[serde(default, alias = "execution_time")]
    pub execution_time_seconds: f64,
    #[serde(default)]
    pub components_created: u32,
    #[serde(default, deserialize_with = "count_or_list")]
    pub adaptations: u32,
    #[serde(default)]
    pub performance_grade: PerformanceGrade,
}

impl PipelineInfo {
    /// Check `steps_completed <= total_steps == steps.len()`.
    pub fn validate(&self) -> Result<(), RenderError> {
        let listed = self.steps.len();
        if self.steps_completed > self.total_steps
            || usize::try_from(self.total_steps).ok() != Some(listed)
        {
            return Err(RenderError::InconsistentPipeline {
                completed: self.steps_completed,
                total: self.total_steps,
                listed,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StepResult {
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Connectivity snapshot owned by the status monitor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub connected: bool,
    pub message: String,
    pub last_checked: Option<DateTime<Utc>>,
    pub services: HashMap<String, bool>,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            connected: false,
            message: "Checking...".to_string(),
            last_checked: None,
            services: ["orchestrator", "registry", "workflow"]
                .into_iter()
                .map(|name| (name.to_string(), false))
                .collect(),
        }
    }
}

/// A file chosen by the user, pending upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    #[serde(alias = "size")]
    pub size_bytes: u64,
}

impl FileDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
        }
    }
}

/// Workflow description handed to the workflow panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkflowData {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub workflow: WorkflowPlan,
    #[serde(default)]
    pub steps_completed: u32,
    #[serde(default, alias = "execution_time")]
    pub execution_time_seconds: Option<f64>,
}

/// The planned steps of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkflowPlan {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "step_names")]
    pub steps: Vec<String>,
    #[serde(default)]
    pub execution_strategy: Option<String>,
}

/// Steps arrive either as plain names or as objects carrying a name.
fn step_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .enumerate()
        .map(|(i, step)| match step {
            serde_json::Value::String(name) => name.clone(),
            serde_json::Value::Object(fields) => ["name", "agent", "agent_name"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(serde_json::Value::as_str))
                .map_or_else(|| format!("step_{i}"), ToString::to_string),
            other => other.to_string(),
        })
        .collect())
}

/// Older backends send the adaptation list instead of its length.
fn count_or_list<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or_default(),
        Some(serde_json::Value::Array(items)) => u32::try_from(items.len()).unwrap_or(u32::MAX),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pipeline_info_from_backend() {
        let info: PipelineInfo = serde_json::from_value(json!({
            "type": "pipeline",
            "steps": ["extract", {"name": "transform"}, {"agent": "load"}],
            "steps_completed": 2,
            "total_steps": 3,
            "execution_strategy": "sequential",
            "execution_time": 1.25,
            "components_created": 1,
            "adaptations": ["retry"],
            "performance_grade": "needs_improvement"
        }))
        .unwrap();

        assert_eq!(info.kind, PipelineType::Pipeline);
        assert_eq!(info.steps, vec!["extract", "transform", "load"]);
        assert!((info.execution_time_seconds - 1.25).abs() < f64::EPSILON);
        assert_eq!(info.adaptations, 1);
        assert_eq!(info.performance_grade, PerformanceGrade::NeedsImprovement);
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_unknown_enum_values_degrade() {
        let info: PipelineInfo = serde_json::from_value(json!({
            "type": "exotic",
            "performance_grade": "poor"
        }))
        .unwrap();
        assert_eq!(info.kind, PipelineType::Simple);
        assert_eq!(info.performance_grade, PerformanceGrade::Unknown);

        let kinds: Vec<PipelineType> =
            serde_json::from_value(json!(["pipeline", "complex", "simple"])).unwrap();
        assert_eq!(
            kinds,
            vec![PipelineType::Pipeline, PipelineType::Complex, PipelineType::Simple]
        );
        assert_eq!(serde_json::to_value(PipelineType::Complex).unwrap(), json!("complex"));

        let step: StepResult = serde_json::from_value(json!({"status": "skipped"})).unwrap();
        assert_eq!(step.status, StepStatus::Unknown);
    }

    #[test]
    fn test_pipeline_validation() {
        let info = PipelineInfo {
            steps: vec!["a".into(), "b".into()],
            steps_completed: 3,
            total_steps: 2,
            ..PipelineInfo::default()
        };
        assert_eq!(
            info.validate(),
            Err(RenderError::InconsistentPipeline {
                completed: 3,
                total: 2,
                listed: 2
            })
        );

        let mismatched = PipelineInfo {
            steps: vec!["a".into()],
            steps_completed: 0,
            total_steps: 2,
            ..PipelineInfo::default()
        };
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn test_message_ids_carry_role_prefix() {
        assert!(ChatMessage::user("hi").id.starts_with("msg_"));
        assert!(ChatMessage::assistant("hi").id.starts_with("sys_"));
    }
}
