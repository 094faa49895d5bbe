//! Builds the command directory from configuration.

use std::collections::BTreeMap;
use std::fmt;

use scenecheck_ir::CommandKind;

use crate::config::{BindingConfig, RuleParams, ValidationConfig};
use crate::directory::CommandDirectory;
use crate::engine::RuleEngine;
use crate::error::ValidationError;
use crate::rule::Rule;
use crate::rules::{
    CascadeRemoveRule, CollisionRule, DieCheckRule, GridSnapRule, PropertyRangeRule,
    ProximityWarningRule, ScaleRangeRule, ZoneBoundsRule,
};

type RuleConstructor = Box<dyn Fn(&RuleParams) -> Box<dyn Rule>>;

/// Registry of rule constructors keyed by rule name.
pub struct RuleFactory {
    constructors: BTreeMap<String, RuleConstructor>,
}

impl RuleFactory {
    /// A factory with no rules registered.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A factory knowing every built-in rule.
    pub fn with_builtins() -> Self {
        let mut factory = Self::empty();
        factory.register(DieCheckRule::NAME, |_| Box::new(DieCheckRule::new()));
        factory.register(CollisionRule::NAME, |p| {
            Box::new(
                CollisionRule::new(p.collision_failure_action)
                    .rejecting_transient(p.reject_transient_collisions),
            )
        });
        factory.register(ProximityWarningRule::NAME, |p| {
            Box::new(ProximityWarningRule::new(p.proximity_margin))
        });
        factory.register(ScaleRangeRule::NAME, |p| {
            Box::new(ScaleRangeRule::new(p.min_scale, p.max_scale))
        });
        factory.register(ZoneBoundsRule::NAME, |_| Box::new(ZoneBoundsRule::new()));
        factory.register(GridSnapRule::NAME, |p| Box::new(GridSnapRule::new(p.grid_step)));
        factory.register(PropertyRangeRule::NAME, |p| {
            Box::new(PropertyRangeRule::new(p.property_ranges.clone()))
        });
        factory.register(CascadeRemoveRule::NAME, |_| Box::new(CascadeRemoveRule::new()));
        factory
    }

    /// Add or replace a constructor.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&RuleParams) -> Box<dyn Rule> + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Registered rule names, sorted.
    pub fn rule_names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Instantiate one rule.
    pub fn build_rule(&self, name: &str, params: &RuleParams) -> Result<Box<dyn Rule>, ValidationError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ValidationError::UnknownRule(name.to_string()))?;
        Ok(constructor(params))
    }

    /// Instantiate an engine running `names` in order.
    pub fn build_engine(
        &self,
        names: &[String],
        params: &RuleParams,
    ) -> Result<RuleEngine, ValidationError> {
        let mut engine = RuleEngine::new();
        for name in names {
            engine.add_rule(self.build_rule(name, params)?);
        }
        Ok(engine)
    }

    /// Build a directory from the configured bindings, or from
    /// [`default_bindings`] when none are configured.
    pub fn build_directory(
        &self,
        config: &ValidationConfig,
    ) -> Result<CommandDirectory, ValidationError> {
        let defaults;
        let bindings = if config.bindings.is_empty() {
            defaults = default_bindings();
            &defaults
        } else {
            &config.bindings
        };

        let mut directory = CommandDirectory::new();
        for binding in bindings {
            let kinds = binding
                .commands
                .iter()
                .map(|name| {
                    CommandKind::from_name(name)
                        .ok_or_else(|| ValidationError::UnknownCommandKind(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if kinds.is_empty() {
                return Err(ValidationError::Config(format!(
                    "binding for rules {:?} lists no commands",
                    binding.rules
                )));
            }
            let engine = self.build_engine(&binding.rules, &config.rules)?;
            directory.add_binding(kinds, binding.property.clone(), engine);
        }
        tracing::debug!("built command directory with {} bindings", directory.len());
        Ok(directory)
    }
}

impl Default for RuleFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for RuleFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleFactory")
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// The rule set used when the configuration lists no bindings.
pub fn default_bindings() -> Vec<BindingConfig> {
    fn binding(commands: &[&str], rules: &[&str]) -> BindingConfig {
        BindingConfig {
            commands: commands.iter().map(|s| s.to_string()).collect(),
            property: None,
            rules: rules.iter().map(|s| s.to_string()).collect(),
        }
    }
    vec![
        binding(
            &["add_entity", "add_segment", "add_vertex"],
            &["die_check", "grid_snap", "zone_bounds", "collision", "proximity_warning"],
        ),
        binding(
            &["move_entity"],
            &["die_check", "grid_snap", "zone_bounds", "collision", "proximity_warning"],
        ),
        binding(&["rotate_entity", "reparent_entity"], &["die_check", "collision"]),
        binding(&["scale_entity"], &["die_check", "scale_range", "collision"]),
        binding(
            &["remove_entity", "remove_segment", "remove_vertex"],
            &["die_check", "cascade_remove"],
        ),
        binding(&["change_property"], &["die_check", "property_range"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenecheck_ir::{Command, PropertyKey};

    #[test]
    fn test_builtins_registered() {
        let factory = RuleFactory::with_builtins();
        assert_eq!(
            factory.rule_names(),
            vec![
                "cascade_remove",
                "collision",
                "die_check",
                "grid_snap",
                "property_range",
                "proximity_warning",
                "scale_range",
                "zone_bounds",
            ]
        );
    }

    #[test]
    fn test_default_directory_routes_every_kind() {
        let directory = RuleFactory::default()
            .build_directory(&ValidationConfig::default())
            .unwrap();
        let engine = directory
            .match_command(&Command::move_entity(1, [0.0; 3], [1.0; 3]))
            .unwrap();
        assert_eq!(
            engine.rule_names(),
            vec!["die_check", "grid_snap", "zone_bounds", "collision", "proximity_warning"]
        );
        assert!(directory.match_command(&Command::remove_entity(1)).is_some());
        // composites are expanded before lookup and never bound
        assert!(directory
            .match_command(&Command::composite("c", vec![]))
            .is_none());
    }

    #[test]
    fn test_configured_bindings_replace_defaults() {
        let mut config = ValidationConfig::default();
        config.bindings.push(BindingConfig {
            commands: vec!["change_property".into()],
            property: Some(PropertyKey::new("dimensions", "height")),
            rules: vec!["property_range".into()],
        });
        let directory = RuleFactory::default().build_directory(&config).unwrap();
        assert_eq!(directory.len(), 1);
        assert!(directory
            .match_command(&Command::move_entity(1, [0.0; 3], [1.0; 3]))
            .is_none());
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let factory = RuleFactory::default();
        let mut config = ValidationConfig::default();
        config.bindings.push(BindingConfig {
            commands: vec!["move_entity".into()],
            property: None,
            rules: vec!["levitate".into()],
        });
        assert_eq!(
            factory.build_directory(&config).unwrap_err(),
            ValidationError::UnknownRule("levitate".into())
        );

        config.bindings[0] = BindingConfig {
            commands: vec!["teleport_entity".into()],
            property: None,
            rules: vec!["collision".into()],
        };
        assert_eq!(
            factory.build_directory(&config).unwrap_err(),
            ValidationError::UnknownCommandKind("teleport_entity".into())
        );
    }

    #[test]
    fn test_custom_rule_registration() {
        let mut factory = RuleFactory::empty();
        factory.register("snap_coarse", |_| Box::new(GridSnapRule::new(1.0)));
        let engine = factory
            .build_engine(&["snap_coarse".to_string()], &RuleParams::default())
            .unwrap();
        // the rule keeps its own registered name
        assert_eq!(engine.rule_names(), vec!["grid_snap"]);
    }
}
