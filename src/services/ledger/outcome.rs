use serde::{Deserialize, Serialize};
use std::fmt;

/// One write the ledger performs against a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStep {
    DeviceCreate,
    DeviceUpdate,
    DeviceDelete,
    LogCreate,
    LogUpdate,
    LogDelete,
}

impl LedgerStep {
    fn subject(self) -> &'static str {
        match self {
            Self::DeviceCreate | Self::DeviceUpdate | Self::DeviceDelete => "Device",
            Self::LogCreate | Self::LogUpdate | Self::LogDelete => "Device log",
        }
    }

    fn verb(self) -> (&'static str, &'static str) {
        match self {
            Self::DeviceCreate | Self::LogCreate => ("created", "creating"),
            Self::DeviceUpdate | Self::LogUpdate => ("updated", "updating"),
            Self::DeviceDelete | Self::LogDelete => ("deleted", "deleting"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Not attempted because an earlier step failed.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: LedgerStep,
    pub status: StepStatus,
}

impl StepReport {
    pub fn message(&self) -> String {
        let subject = self.step.subject();
        let (past, progressive) = self.step.verb();
        match self.status {
            StepStatus::Succeeded => format!("{} {} successfully", subject, past),
            StepStatus::Failed => format!("Error {} {}", progressive, subject.to_lowercase()),
            StepStatus::Skipped => format!("Skipped {} {}", progressive, subject.to_lowercase()),
        }
    }
}

/// Ordered report of every step of one ledger operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOutcome {
    steps: Vec<StepReport>,
}

impl LedgerOutcome {
    pub fn succeeded(self, step: LedgerStep) -> Self {
        self.with(step, StepStatus::Succeeded)
    }

    pub fn failed(self, step: LedgerStep) -> Self {
        self.with(step, StepStatus::Failed)
    }

    pub fn skipped(self, step: LedgerStep) -> Self {
        self.with(step, StepStatus::Skipped)
    }

    fn with(mut self, step: LedgerStep, status: StepStatus) -> Self {
        self.steps.push(StepReport { step, status });
        self
    }

    pub fn steps(&self) -> &[StepReport] {
        &self.steps
    }

    pub fn status_of(&self, step: LedgerStep) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|report| report.step == step)
            .map(|report| report.status)
    }

    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .all(|report| report.status == StepStatus::Succeeded)
    }

    /// "Device updated successfully", "Error creating device log", ...
    pub fn messages(&self) -> Vec<String> {
        self.steps.iter().map(StepReport::message).collect()
    }

    pub fn summary(&self) -> String {
        self.messages().join("; ")
    }
}

impl fmt::Display for LedgerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
