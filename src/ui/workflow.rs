//! Workflow progress panel.
//!
//! The panel shows at most one workflow. It is either hidden or visible with
//! the steps of the active workflow, and goes back to hidden on close or when
//! the chat is cleared.

use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::error::RenderError;
use crate::html;
use crate::model::{PipelineInfo, PipelineType, WorkflowData};
use crate::view::Mount;

/// Visual state of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Completed,
    Active,
    Pending,
}

impl StepState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Active => "active",
            Self::Pending => "pending",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Self::Completed => "✓",
            Self::Active => "⟳",
            Self::Pending => "○",
        }
    }
}

/// Per-step states: completed below `completed`, the next one active while
/// processing, everything else pending.
#[must_use]
pub fn step_states(total: usize, completed: usize, processing: bool) -> Vec<StepState> {
    (0..total)
        .map(|index| {
            if index < completed {
                StepState::Completed
            } else if index == completed && processing {
                StepState::Active
            } else {
                StepState::Pending
            }
        })
        .collect()
}

/// Completion percentage, rounded down.
#[must_use]
pub fn progress_percent(completed: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    completed.min(total) * 100 / total
}

/// The workflow currently on display.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveWorkflow {
    pub workflow_id: String,
    pub steps: Vec<String>,
    pub steps_completed: usize,
    pub status: String,
    pub execution_strategy: Option<String>,
    pub execution_time_seconds: Option<f64>,
    pub shown_at: DateTime<Utc>,
}

impl ActiveWorkflow {
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.status.eq_ignore_ascii_case("processing")
    }

    #[must_use]
    pub fn step_states(&self) -> Vec<StepState> {
        step_states(self.steps.len(), self.steps_completed, self.is_processing())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PanelState {
    #[default]
    Hidden,
    Visible(ActiveWorkflow),
}

/// Renders the active workflow into its mount.
#[derive(Debug, Clone)]
pub struct WorkflowPanel {
    mount: Option<Mount>,
    state: Arc<RwLock<PanelState>>,
}

impl WorkflowPanel {
    #[must_use]
    pub fn new(mount: Option<Mount>) -> Self {
        Self {
            mount,
            state: Arc::new(RwLock::new(PanelState::Hidden)),
        }
    }

    /// Current panel state.
    #[must_use]
    pub fn state(&self) -> PanelState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Display a workflow. Rejects a workflow without steps and leaves the
    /// panel untouched in that case.
    pub fn show(&self, data: &WorkflowData) -> Result<(), RenderError> {
        let steps = &data.workflow.steps;
        if steps.is_empty() {
            return Err(RenderError::EmptyWorkflow);
        }

        let active = ActiveWorkflow {
            workflow_id: data
                .workflow_id
                .clone()
                .unwrap_or_else(|| "current".to_string()),
            steps: steps.clone(),
            steps_completed: usize::try_from(data.steps_completed)
                .unwrap_or(usize::MAX)
                .min(steps.len()),
            status: data
                .status
                .clone()
                .unwrap_or_else(|| "processing".to_string()),
            execution_strategy: data.workflow.execution_strategy.clone(),
            execution_time_seconds: data.execution_time_seconds,
            shown_at: Utc::now(),
        };

        tracing::debug!(
            name: "workflow.shown",
            workflow_id = %active.workflow_id,
            steps = active.steps.len(),
            completed = active.steps_completed,
            status = %active.status,
            "Workflow panel updated"
        );

        if let Some(mount) = &self.mount {
            mount.set_html(panel_html(&active));
            mount.remove_class("hidden");
        }
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = PanelState::Visible(active);
        Ok(())
    }

    /// Clear the panel and forget the workflow.
    pub fn hide(&self) {
        if let Some(mount) = &self.mount {
            mount.clear();
            mount.add_class("hidden");
        }
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = PanelState::Hidden;
    }

    /// Pipeline block appended under an assistant message.
    #[must_use]
    pub fn pipeline_summary(info: &PipelineInfo) -> String {
        if let Err(err) = info.validate() {
            tracing::warn!(error = %err, "Inconsistent pipeline info");
            return r#"<div class="pipeline-info pipeline-info-unavailable text-sm text-textMuted">Pipeline details unavailable</div>"#.to_string();
        }

        let total = info.steps.len();
        let completed = usize::try_from(info.steps_completed).unwrap_or(total);
        let mut steps = String::new();
        for (name, state) in info
            .steps
            .iter()
            .zip(step_states(total, completed, false))
        {
            let _ = write!(
                steps,
                r#"<li class="step step-{state}">{icon} {name}</li>"#,
                state = state.as_str(),
                icon = state.icon(),
                name = html::escape(name),
            );
        }

        format!(
            r#"<div class="pipeline-info mt-3 rounded-xl bg-surfaceVariant p-3 text-sm">
    <div class="flex flex-wrap gap-3">
        <span class="pipeline-type">{kind}</span>
        <span>Strategy: {strategy}</span>
        <span>Steps: {completed}/{total}</span>
        <span>Time: {time:.2}s</span>
        <span>Components created: {components}</span>
        <span>Adaptations: {adaptations}</span>
        <span class="grade grade-{grade_class}">Performance: {grade}</span>
    </div>
    <ol class="pipeline-steps">{steps}</ol>
</div>"#,
            kind = capitalize(info.kind.as_str()),
            strategy = html::escape(if info.execution_strategy.is_empty() {
                "sequential"
            } else {
                info.execution_strategy.as_str()
            }),
            time = info.execution_time_seconds,
            components = info.components_created,
            adaptations = info.adaptations,
            grade = info.performance_grade.label(),
            grade_class = info.performance_grade.label().to_lowercase().replace(' ', "-"),
        )
    }

    /// Whether a pipeline block should be attached for this metadata.
    #[must_use]
    pub fn wants_summary(info: &PipelineInfo) -> bool {
        info.kind != PipelineType::Simple
    }
}

/// Mermaid flowchart of the steps, styled by state.
#[must_use]
pub fn mermaid_diagram(steps: &[String], states: &[StepState]) -> String {
    let mut diagram = String::from("graph TD\n    Start([User Request])\n");
    for (index, step) in steps.iter().enumerate() {
        let node = format!("A{}", index + 1);
        let label = step_label(step);
        match states.get(index) {
            Some(state) => {
                let _ = writeln!(diagram, "    {node}[{label}]:::{}", state.as_str());
            }
            None => {
                let _ = writeln!(diagram, "    {node}[{label}]");
            }
        }
        if index == 0 {
            let _ = writeln!(diagram, "    Start --> {node}");
        } else {
            let _ = writeln!(diagram, "    A{index} --> {node}");
        }
    }
    let _ = writeln!(diagram, "    A{} --> End([Response])", steps.len());
    diagram.push('\n');
    diagram.push_str("    classDef completed fill:#d4edda,stroke:#c3e6cb,color:#155724\n");
    diagram.push_str("    classDef active fill:#fff3cd,stroke:#ffeaa7,color:#856404\n");
    diagram.push_str("    classDef pending fill:#f8f9fa,stroke:#dee2e6,color:#495057\n");
    diagram
}

/// `data_extractor` → `Data Extractor`, without Mermaid control characters.
fn step_label(step: &str) -> String {
    step.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')' | '{' | '}' | '|' | '"'))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn panel_html(active: &ActiveWorkflow) -> String {
    let states = active.step_states();
    let mut agents = String::new();
    for (name, state) in active.steps.iter().zip(&states) {
        let _ = write!(
            agents,
            r#"<li class="workflow-step step-{state}"><span class="step-icon">{icon}</span> {name}</li>"#,
            state = state.as_str(),
            icon = state.icon(),
            name = html::escape(name),
        );
    }

    let elapsed = active.execution_time_seconds.map_or_else(
        || format!("Started {}", active.shown_at.format("%H:%M:%S")),
        |secs| format!("{secs:.2}s"),
    );
    let percent = progress_percent(active.steps_completed, active.steps.len());

    format!(
        r##"<header class="flex items-center justify-between">
    <h3 class="font-semibold">Workflow</h3>
    <button class="text-textMuted" aria-label="Close" hx-post="/ui/workflow/close" hx-target="#workflow-panel" hx-swap="outerHTML">×</button>
</header>
<dl class="workflow-meta grid grid-cols-3 gap-2 text-sm">
    <div><dt>ID</dt><dd id="workflow-id">{id}</dd></div>
    <div><dt>Status</dt><dd id="workflow-status" class="status-{status_class}">{status}</dd></div>
    <div><dt>Time</dt><dd id="workflow-time">{elapsed}</dd></div>
</dl>
<div class="workflow-progress" role="progressbar" aria-valuenow="{percent}" aria-valuemin="0" aria-valuemax="100">
    <div class="workflow-progress-bar" style="width: {percent}%"></div>
</div>
<ol id="workflow-agents" class="workflow-steps">{agents}</ol>
<pre id="workflow-diagram" class="mermaid">{diagram}</pre>"##,
        id = html::escape(&active.workflow_id),
        status = html::escape(&active.status),
        status_class = html::escape(&active.status.to_lowercase()),
        diagram = html::escape(&mermaid_diagram(&active.steps, &states)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PerformanceGrade, WorkflowPlan};
    use crate::view::{Document, ids};

    fn workflow(steps: &[&str], completed: u32, status: &str) -> WorkflowData {
        WorkflowData {
            workflow_id: Some("wf_1234".to_string()),
            status: Some(status.to_string()),
            workflow: WorkflowPlan {
                kind: Some("pipeline".to_string()),
                steps: steps.iter().map(ToString::to_string).collect(),
                execution_strategy: Some("sequential".to_string()),
            },
            steps_completed: completed,
            execution_time_seconds: None,
        }
    }

    #[test]
    fn test_step_states_processing() {
        assert_eq!(
            step_states(3, 2, true),
            vec![StepState::Completed, StepState::Completed, StepState::Active]
        );
        assert_eq!(
            step_states(4, 1, true),
            vec![
                StepState::Completed,
                StepState::Active,
                StepState::Pending,
                StepState::Pending
            ]
        );
    }

    #[test]
    fn test_step_states_not_processing() {
        assert_eq!(
            step_states(3, 1, false),
            vec![StepState::Completed, StepState::Pending, StepState::Pending]
        );
        assert_eq!(step_states(2, 2, true), vec![StepState::Completed; 2]);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(5, 3), 100);
    }

    #[test]
    fn test_show_and_hide() {
        let document = Document::standard();
        let panel = WorkflowPanel::new(document.get(ids::WORKFLOW_PANEL));

        panel
            .show(&workflow(&["extract", "transform", "load"], 2, "processing"))
            .unwrap();

        let mount = document.get(ids::WORKFLOW_PANEL).unwrap();
        assert!(!mount.has_class("hidden"));
        let html = mount.inner_html();
        assert!(html.contains("wf_1234"));
        assert_eq!(html.matches("step-completed").count(), 2);
        assert_eq!(html.matches("step-active").count(), 1);
        assert!(!html.contains("step-pending"));
        assert!(html.contains("A3[Load]:::active"));

        match panel.state() {
            PanelState::Visible(active) => assert_eq!(active.steps_completed, 2),
            PanelState::Hidden => panic!("panel should be visible"),
        }

        panel.hide();
        assert_eq!(panel.state(), PanelState::Hidden);
        assert!(mount.has_class("hidden"));
        assert_eq!(mount.inner_html(), "");
    }

    #[test]
    fn test_show_rejects_empty_workflow() {
        let panel = WorkflowPanel::new(None);
        assert_eq!(
            panel.show(&workflow(&[], 0, "processing")),
            Err(RenderError::EmptyWorkflow)
        );
        assert_eq!(panel.state(), PanelState::Hidden);
    }

    #[test]
    fn test_completed_count_clamped() {
        let panel = WorkflowPanel::new(None);
        panel.show(&workflow(&["a"], 9, "success")).unwrap();
        let PanelState::Visible(active) = panel.state() else {
            panic!("panel should be visible");
        };
        assert_eq!(active.steps_completed, 1);
    }

    #[test]
    fn test_missing_mount_is_tolerated() {
        let panel = WorkflowPanel::new(None);
        assert!(panel.show(&workflow(&["a", "b"], 0, "processing")).is_ok());
        panel.hide();
        assert_eq!(panel.state(), PanelState::Hidden);
    }

    #[test]
    fn test_mermaid_diagram() {
        let steps = vec!["data_extractor".to_string(), "word_counter".to_string()];
        let diagram = mermaid_diagram(&steps, &step_states(2, 1, true));
        assert!(diagram.starts_with("graph TD\n"));
        assert!(diagram.contains("A1[Data Extractor]:::completed"));
        assert!(diagram.contains("A2[Word Counter]:::active"));
        assert!(diagram.contains("Start --> A1"));
        assert!(diagram.contains("A1 --> A2"));
        assert!(diagram.contains("A2 --> End([Response])"));
    }

    #[test]
    fn test_pipeline_summary() {
        let info = PipelineInfo {
            kind: PipelineType::Complex,
            steps: vec!["extract".into(), "load".into()],
            steps_completed: 1,
            total_steps: 2,
            execution_strategy: "adaptive".into(),
            execution_time_seconds: 2.5,
            components_created: 3,
            adaptations: 1,
            performance_grade: PerformanceGrade::Good,
        };
        let html = WorkflowPanel::pipeline_summary(&info);
        assert!(html.contains("Complex"));
        assert!(html.contains("Steps: 1/2"));
        assert!(html.contains("Time: 2.50s"));
        assert!(html.contains("Performance: Good"));
        assert!(html.contains("step-completed"));
        assert!(WorkflowPanel::wants_summary(&info));
    }

    #[test]
    fn test_pipeline_summary_fallback() {
        let info = PipelineInfo {
            kind: PipelineType::Pipeline,
            steps: vec!["a".into()],
            steps_completed: 2,
            total_steps: 1,
            ..PipelineInfo::default()
        };
        assert!(WorkflowPanel::pipeline_summary(&info).contains("Pipeline details unavailable"));
    }
}
