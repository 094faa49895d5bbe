//! Validation configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration that enables the built-in rule set.

use serde::{Deserialize, Serialize};
use std::path::Path;

use scenecheck_ir::PropertyKey;

use crate::collision::CollisionOptions;
use crate::error::ValidationError;
use crate::result::FailureAction;

/// Top-level configuration for a validating interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Master switch; when off every command passes unchecked.
    pub rule_checking: bool,
    /// Collision query settings.
    pub collision: CollisionConfig,
    /// Parameters of the built-in rules.
    pub rules: RuleParams,
    /// Rule bindings. Empty means the built-in default set.
    #[serde(rename = "binding")]
    pub bindings: Vec<BindingConfig>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            rule_checking: true,
            collision: CollisionConfig::default(),
            rules: RuleParams::default(),
            bindings: Vec::new(),
        }
    }
}

impl ValidationConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ValidationError> {
        toml::from_str(text).map_err(|e| ValidationError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ValidationError::ConfigIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, ValidationError> {
        toml::to_string(self).map_err(|e| ValidationError::Config(e.to_string()))
    }
}

/// Collision query settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Overlap tolerance. Zero gives the strict test where touching boxes
    /// do not collide.
    pub epsilon: f64,
    /// Evaluate against the speculative state of the current pass.
    pub use_surrogates: bool,
    /// Test with the edited entity's minimum-extent box.
    pub use_entity_extended_bounds: bool,
    /// Test against the other entities' minimum-extent boxes.
    pub use_targets_extended_bounds: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.0,
            use_surrogates: true,
            use_entity_extended_bounds: false,
            use_targets_extended_bounds: false,
        }
    }
}

impl CollisionConfig {
    /// Query options for these settings.
    pub fn options(&self) -> CollisionOptions {
        CollisionOptions {
            use_surrogates: self.use_surrogates,
            use_entity_extended_bounds: self.use_entity_extended_bounds,
            use_targets_extended_bounds: self.use_targets_extended_bounds,
            margin: 0.0,
        }
    }
}

/// Parameters of the built-in rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleParams {
    /// Grid spacing for `grid_snap`; zero disables snapping.
    pub grid_step: f64,
    /// Smallest scale component `scale_range` accepts.
    pub min_scale: f64,
    /// Largest scale component `scale_range` accepts.
    pub max_scale: f64,
    /// Distance within which `proximity_warning` warns.
    pub proximity_margin: f64,
    /// Rollback applied when `collision` rejects a command.
    pub collision_failure_action: FailureAction,
    /// Reject transient commands that collide instead of only flagging
    /// them.
    pub reject_transient_collisions: bool,
    /// Limits checked by `property_range`.
    #[serde(rename = "property_range")]
    pub property_ranges: Vec<PropertyRange>,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            grid_step: 0.0,
            min_scale: 0.01,
            max_scale: 100.0,
            proximity_margin: 0.05,
            collision_failure_action: FailureAction::ClearCurrent,
            reject_transient_collisions: false,
            property_ranges: Vec::new(),
        }
    }
}

/// Allowed numeric interval for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRange {
    /// Sheet the property lives on.
    pub sheet: String,
    /// Property name.
    pub name: String,
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl PropertyRange {
    /// Whether this range applies to `key`.
    pub fn matches(&self, key: &PropertyKey) -> bool {
        self.sheet == key.sheet && self.name == key.name
    }
}

/// One directory binding as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Command kind names, e.g. `move_entity`.
    pub commands: Vec<String>,
    /// Property this binding is limited to, for property changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyKey>,
    /// Rule names, run in this order.
    pub rules: Vec<String>,
}
