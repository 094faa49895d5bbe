#![warn(missing_docs)]

//! Rule-based validation of scene edits.
//!
//! Every user edit arrives as a [`scenecheck_ir::Command`]. A
//! [`ValidatingInterpreter`] expands it into member commands, routes each
//! one through the [`RuleEngine`] its [`CommandDirectory`] binds to the
//! command kind, and returns the commands that should actually run as one
//! forced composite. Rules see the edits approved earlier in the same pass
//! through lightweight [`EntitySurrogate`]s held by the
//! [`CollisionChecker`], so a batch is checked as if its earlier members
//! had already been applied.
//!
//! # Example
//!
//! ```
//! use scenecheck::{CommandInterpreter, ValidatingInterpreter, ValidationConfig, ValidationSession};
//! use scenecheck_ir::{Command, Entity, EntityKind, Scene};
//!
//! let mut scene = Scene::new();
//! scene.insert(Entity::new(1, EntityKind::Zone, [20.0, 0.1, 20.0])).unwrap();
//! for (id, x) in [(2, 0.0), (3, 3.0)] {
//!     scene
//!         .insert(Entity::new(id, EntityKind::Model, [1.0; 3]).with_parent(1).at([x, 0.5, 0.0]))
//!         .unwrap();
//! }
//! scene.active_zone = Some(1);
//!
//! let mut interpreter = ValidatingInterpreter::from_config(ValidationConfig::default()).unwrap();
//! let mut session = ValidationSession::new();
//!
//! // dropping crate 2 onto crate 3 is rejected and undone
//! let edit = Command::move_entity(2, [0.0, 0.5, 0.0], [3.0, 0.5, 0.0]);
//! let outcome = interpreter.validate(&mut session, &scene, &edit);
//! assert!(!outcome.approved);
//! scene.apply(&outcome.command).unwrap();
//! assert_eq!(scene.get(2).unwrap().position, [0.0, 0.5, 0.0]);
//! ```

mod collision;
mod config;
mod directory;
mod engine;
mod error;
mod factory;
mod interpreter;
mod reset;
mod result;
mod rule;
pub mod rules;
mod scene;
mod sequencer;
mod status;
mod surrogate;

pub use collision::{CollisionChecker, CollisionOptions, SurrogateTransaction};
pub use config::{BindingConfig, CollisionConfig, PropertyRange, RuleParams, ValidationConfig};
pub use directory::{Binding, CommandDirectory};
pub use engine::RuleEngine;
pub use error::ValidationError;
pub use factory::{default_bindings, RuleFactory};
pub use interpreter::{
    CommandInterpreter, PassThroughInterpreter, ValidatingInterpreter, ValidationOutcome,
    ValidationSession,
};
pub use reset::reset_to_start_commands;
pub use result::{FailureAction, RuleResult};
pub use rule::{Rule, RuleContext};
pub use scene::SceneAccess;
pub use sequencer::CommandSequencer;
pub use status::{LogReporter, Severity, StatusReporter};
pub use surrogate::{EntitySurrogate, Mesh};
