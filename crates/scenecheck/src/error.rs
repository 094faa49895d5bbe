//! Error types for command validation.

use scenecheck_ir::EntityId;
use thiserror::Error;

/// Errors raised while validating commands or building the rule set.
///
/// During a validation pass these never escape to the caller: the
/// interpreter turns them into a rejection with a full rollback and records
/// the error on the outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// An entity referenced by a command or a parent link does not exist.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Following parent links from this entity loops back on itself.
    #[error("entity {0} is part of a parent cycle")]
    CyclicHierarchy(EntityId),

    /// An entity's world placement has non-finite components.
    #[error("entity {0} has a degenerate world transform")]
    DegenerateTransform(EntityId),

    /// A rule could not evaluate the command.
    #[error("rule '{rule}' failed: {reason}")]
    Rule {
        /// Rule name.
        rule: String,
        /// What went wrong.
        reason: String,
    },

    /// The rule configuration names a rule that does not exist.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// The rule configuration names a command kind that does not exist.
    #[error("unknown command kind: {0}")]
    UnknownCommandKind(String),

    /// The configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {reason}")]
    ConfigIo {
        /// File path.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },
}
