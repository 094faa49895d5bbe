//! Built-in rules.
//!
//! Each rule is registered under a fixed name that the configuration and
//! the factory refer to.

mod collision;
mod lifecycle;
mod placement;
mod property;

pub use collision::{CollisionRule, ProximityWarningRule};
pub use lifecycle::{CascadeRemoveRule, DieCheckRule};
pub use placement::{GridSnapRule, ScaleRangeRule, ZoneBoundsRule};
pub use property::PropertyRangeRule;
