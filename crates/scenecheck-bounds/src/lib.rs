#![warn(missing_docs)]

//! Bounding volumes for scene collision checks.
//!
//! [`Aabb`] is the cheap world-aligned box used as a broadphase reject, and
//! [`Obb`] layers a separating-axis test on top of it. Both are described
//! in local space by a min/max pair, a scale and an optional border, and
//! placed in the world with [`Aabb::transform`] / [`Obb::transform`].
//!
//! # Example
//!
//! ```
//! use scenecheck_bounds::Obb;
//! use scenecheck_math::{Point3, Transform, Vec3};
//!
//! let mut a = Obb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0), Vec3::repeat(1.0));
//! let mut b = a.clone();
//! b.transform(&Transform::translation(1.5, 0.0, 0.0));
//! assert!(a.intersects(&b, 0.0));
//!
//! a.transform(&Transform::translation(-5.0, 0.0, 0.0));
//! assert!(!a.intersects(&b, 0.0));
//! ```

mod aabb;
mod obb;
mod triangle;

pub use aabb::Aabb;
pub use obb::Obb;
pub use triangle::{point_in_mesh, triangle_box_overlap};
