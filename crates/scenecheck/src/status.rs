//! Severity levels and the status reporting seam.

use serde::{Deserialize, Serialize};

/// How bad the outcome of a rule evaluation is.
///
/// Ordered: `Ok < Warning < Error`. Aggregation across rules and across a
/// validation pass only ever raises the level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Nothing to report.
    #[default]
    Ok,
    /// The edit is allowed but questionable.
    Warning,
    /// The edit breaks a rule.
    Error,
}

impl Severity {
    /// Raise to `other` if it is more severe.
    pub fn escalate(self, other: Severity) -> Severity {
        self.max(other)
    }

    /// Indicator color for the status bar, as RGB.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Severity::Ok => [0, 160, 0],
            Severity::Warning => [255, 200, 0],
            Severity::Error => [220, 0, 0],
        }
    }
}

/// Receives the outcome severity of each validation pass.
///
/// Implemented by the host UI; the engine only produces the value.
pub trait StatusReporter {
    /// Drop any transient status shown for the previous command.
    fn clear_transient(&mut self) {}

    /// Show the worst severity of a finished pass.
    fn report(&mut self, severity: Severity, rgb: [u8; 3]);
}

/// Reporter that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&mut self, severity: Severity, rgb: [u8; 3]) {
        match severity {
            Severity::Ok => tracing::debug!("validation status ok {:?}", rgb),
            Severity::Warning => tracing::info!("validation status warning {:?}", rgb),
            Severity::Error => tracing::warn!("validation status error {:?}", rgb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::Error.escalate(Severity::Ok), Severity::Error);
        assert_eq!(Severity::Ok.escalate(Severity::Warning), Severity::Warning);
    }

    #[test]
    fn test_colors_are_distinct() {
        assert_ne!(Severity::Ok.rgb(), Severity::Warning.rgb());
        assert_ne!(Severity::Warning.rgb(), Severity::Error.rgb());
    }
}
