//! Rule evaluation results.

use serde::{Deserialize, Serialize};

use crate::status::Severity;

/// How much of the in-flight batch to throw away when a command is
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// Discard every queued and approved command, then restore the scene.
    #[default]
    ClearAll,
    /// Discard the rejected command; commands the rules issued while
    /// evaluating it replace it. The scene is restored.
    ClearCurrent,
    /// As [`FailureAction::ClearCurrent`], without restoring the scene.
    ClearCurrentNoReset,
    /// Discard the rejected command together with everything the rules
    /// issued for it. The scene is restored.
    ClearNewlyIssued,
}

impl FailureAction {
    /// Whether reset-to-start commands are issued for this action.
    pub fn resets_scene(self) -> bool {
        self != FailureAction::ClearCurrentNoReset
    }
}

/// Verdict threaded through the rules of one engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleResult {
    /// Whether the command may proceed.
    pub approved: bool,
    /// Worst severity seen so far.
    pub severity: Severity,
    /// What to discard if the command ends up rejected.
    pub failure_action: FailureAction,
    /// Messages attached by rules, in evaluation order.
    pub notes: Vec<String>,
}

impl RuleResult {
    /// A fresh, approved result.
    pub fn approved() -> Self {
        Self {
            approved: true,
            ..Self::default()
        }
    }

    /// Veto the command.
    pub fn reject(mut self, action: FailureAction, note: impl Into<String>) -> Self {
        self.approved = false;
        self.failure_action = action;
        self.severity = self.severity.escalate(Severity::Error);
        self.notes.push(note.into());
        self
    }

    /// Raise the severity without changing the verdict.
    pub fn escalate(mut self, severity: Severity, note: impl Into<String>) -> Self {
        self.severity = self.severity.escalate(severity);
        self.notes.push(note.into());
        self
    }
}
