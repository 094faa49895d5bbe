//! Ordered rule chains.

use scenecheck_ir::Command;

use crate::error::ValidationError;
use crate::result::RuleResult;
use crate::rule::{Rule, RuleContext};

/// Rules run in registration order against one command.
///
/// Every rule runs; a rejection does not stop the chain, so a later rule
/// can still veto or re-approve. The verdict is whatever the last rule
/// returns, except that severity never drops below what an earlier rule
/// reported.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. A rule with the same name is replaced in place.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        match self.rules.iter_mut().find(|r| r.name() == rule.name()) {
            Some(slot) => *slot = rule,
            None => self.rules.push(rule),
        }
    }

    /// Builder form of [`RuleEngine::add_rule`].
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.add_rule(Box::new(rule));
        self
    }

    /// Drop a rule by name.
    pub fn remove_rule(&mut self, name: &str) -> Option<Box<dyn Rule>> {
        let index = self.rules.iter().position(|r| r.name() == name)?;
        Some(self.rules.remove(index))
    }

    /// Registered rule names in order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `command`, starting from an approved result.
    ///
    /// A rule error stops the chain and is returned as is.
    pub fn evaluate(
        &self,
        ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
    ) -> Result<RuleResult, ValidationError> {
        let mut result = RuleResult::approved();
        for rule in &self.rules {
            let floor = result.severity;
            result = rule.process(ctx, command, result)?;
            result.severity = result.severity.escalate(floor);
            tracing::trace!(
                "rule {} on command {}: approved={} severity={:?}",
                rule.name(),
                command.id,
                result.approved,
                result.severity
            );
        }
        Ok(result)
    }
}
