use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// How an element is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickMode {
    /// Regular click; fails when the element is hidden, disabled or covered.
    Normal,
    /// Script-dispatched click that skips actionability checks.
    Forced,
}

/// States of the automation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    LoggingIn,
    AwaitingDashboard,
    NavigatingToProfile,
    OpeningEditModal,
    ResolvingEditControl,
    ActivatingEditControl,
    AwaitingSaveReady,
    ActivatingSaveControl,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Init => "launching the browser",
            RunPhase::LoggingIn => "logging in",
            RunPhase::AwaitingDashboard => "waiting for the dashboard",
            RunPhase::NavigatingToProfile => "navigating to the profile",
            RunPhase::OpeningEditModal => "opening the edit modal",
            RunPhase::ResolvingEditControl => "resolving the edit control",
            RunPhase::ActivatingEditControl => "activating the edit control",
            RunPhase::AwaitingSaveReady => "waiting for the save control",
            RunPhase::ActivatingSaveControl => "activating the save control",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Succeeded,
    SucceededWithFallback,
    /// Logged and skipped; the pipeline carried on.
    FailedRecoverable,
    FailedFatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub phase: RunPhase,
    pub result: StepResult,
    pub note: Option<String>,
}

/// What a completed run did, step by step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
    pub edit_strategy: Option<String>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            edit_strategy: None,
        }
    }

    pub fn record(&mut self, phase: RunPhase, result: StepResult, note: Option<String>) {
        self.steps.push(StepRecord {
            phase,
            result,
            note,
        });
    }

    pub fn finish(&mut self) {
        self.record(RunPhase::Done, StepResult::Succeeded, None);
        self.finished_at = Some(Utc::now());
    }

    pub fn result_of(&self, phase: RunPhase) -> Option<StepResult> {
        self.steps
            .iter()
            .rev()
            .find(|step| step.phase == phase)
            .map(|step| step.result)
    }

    pub fn reached_done(&self) -> bool {
        self.result_of(RunPhase::Done).is_some()
    }

    pub fn recoverable_failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.result == StepResult::FailedRecoverable)
            .count()
    }
}
