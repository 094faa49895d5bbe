#![warn(missing_docs)]

//! Math types for the scenecheck validation engine.
//!
//! Thin wrappers around nalgebra: points, vectors, affine transforms built
//! from scene-style position / axis-angle rotation pairs, and the tolerance
//! constants used by the bounding-volume tests.

use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// Axis-angle rotation as stored on scene entities: `[x, y, z, angle]`,
/// angle in radians.
pub type AxisAngle = [f64; 4];

/// Build a point from a `[x, y, z]` triple.
pub fn point(v: [f64; 3]) -> Point3 {
    Point3::new(v[0], v[1], v[2])
}

/// Build a vector from a `[x, y, z]` triple.
pub fn vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Rotation from an `[x, y, z, angle]` tuple.
    ///
    /// A zero-length axis or a zero angle yields the identity.
    pub fn from_axis_angle(rotation: &AxisAngle) -> Self {
        let axis = Vec3::new(rotation[0], rotation[1], rotation[2]);
        if rotation[3] == 0.0 || axis.norm() < Tolerance::DEFAULT.linear {
            return Self::identity();
        }
        Self::rotation_about_axis(&Dir3::new_normalize(axis), rotation[3])
    }

    /// Rigid placement: rotate about the local origin, then translate.
    pub fn from_position_rotation(position: &[f64; 3], rotation: &AxisAngle) -> Self {
        Self::translation(position[0], position[1], position[2])
            .then(&Self::from_axis_angle(rotation))
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation, applies rotation/scale).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in scene units.
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance (1e-6 linear).
    pub const DEFAULT: Self = Self { linear: 1e-6 };

    /// Above this absolute cosine two unit axes count as parallel.
    ///
    /// Cross products of such pairs are too short to be trusted as
    /// separating axes.
    pub const PARALLEL_CUTOFF: f64 = 0.999999;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result - p).norm() < 1e-12);
    }

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let result = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert!((result.x - 11.0).abs() < 1e-12);
        assert!((result.y - 22.0).abs() < 1e-12);
        assert!((result.z - 33.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(PI / 2.0);
        let result = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_axis_angle_matches_rotation_z() {
        let a = Transform::from_axis_angle(&[0.0, 0.0, 2.0, PI / 2.0]);
        let b = Transform::rotation_z(PI / 2.0);
        assert!((a.matrix - b.matrix).norm() < 1e-12);
    }

    #[test]
    fn test_axis_angle_degenerate_is_identity() {
        assert_eq!(Transform::from_axis_angle(&[0.0, 0.0, 0.0, 1.0]), Transform::identity());
        assert_eq!(Transform::from_axis_angle(&[0.0, 1.0, 0.0, 0.0]), Transform::identity());
    }

    #[test]
    fn test_position_rotation_rotates_before_translating() {
        let t = Transform::from_position_rotation(&[5.0, 0.0, 0.0], &[0.0, 0.0, 1.0, PI / 2.0]);
        let result = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((result.x - 5.0).abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose() {
        // t2.then(&t1) applies t1 first: (0,0,0) -> (1,0,0) -> (2,0,0)
        let t1 = Transform::translation(1.0, 0.0, 0.0);
        let t2 = Transform::scale(2.0, 2.0, 2.0);
        let result = t2.then(&t1).apply_point(&Point3::origin());
        assert!((result.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse() {
        let t = Transform::from_position_rotation(&[1.0, 2.0, 3.0], &[1.0, 1.0, 0.0, 0.7]);
        let inv = t.inverse().unwrap();
        let p = Point3::new(5.0, 6.0, 7.0);
        let result = t.then(&inv).apply_point(&p);
        assert!((result - p).norm() < 1e-12);
    }

    #[test]
    fn test_apply_vec_ignores_translation() {
        let t = Transform::translation(4.0, 4.0, 4.0);
        let v = t.apply_vec(&Vec3::x());
        assert!((v - Vec3::x()).norm() < 1e-12);
    }
}
