//! Numeric property limits.

use scenecheck_ir::{Command, CommandAction};

use crate::config::PropertyRange;
use crate::error::ValidationError;
use crate::result::{FailureAction, RuleResult};
use crate::rule::{Rule, RuleContext};

/// Rejects property changes outside the configured range.
///
/// Values that do not read as a number are rejected explicitly. Properties
/// without a configured range pass.
#[derive(Debug, Clone, Default)]
pub struct PropertyRangeRule {
    ranges: Vec<PropertyRange>,
}

impl PropertyRangeRule {
    /// Registered name.
    pub const NAME: &'static str = "property_range";

    /// Check against `ranges`.
    pub fn new(ranges: Vec<PropertyRange>) -> Self {
        Self { ranges }
    }
}

impl Rule for PropertyRangeRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(
        &self,
        _ctx: &mut RuleContext<'_, '_>,
        command: &mut Command,
        result: RuleResult,
    ) -> Result<RuleResult, ValidationError> {
        let CommandAction::ChangeProperty { key, end_value, .. } = &command.action else {
            return Ok(result);
        };
        let Some(range) = self.ranges.iter().find(|r| r.matches(key)) else {
            return Ok(result);
        };
        match end_value.as_f64().filter(|v| !v.is_nan()) {
            None => Ok(result.reject(
                FailureAction::ClearCurrent,
                format!("{}.{} is not numeric", key.sheet, key.name),
            )),
            Some(v) if !(range.min..=range.max).contains(&v) => Ok(result.reject(
                FailureAction::ClearCurrent,
                format!(
                    "{}.{} = {} outside [{}, {}]",
                    key.sheet, key.name, v, range.min, range.max
                ),
            )),
            Some(_) => Ok(result),
        }
    }
}
