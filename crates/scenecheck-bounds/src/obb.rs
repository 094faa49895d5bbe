//! Oriented bounding box with a separating-axis intersection test.

use scenecheck_math::{Point3, Tolerance, Transform, Vec3};

use crate::aabb::Aabb;
use crate::triangle::triangle_box_overlap;

/// A box with arbitrary orientation.
///
/// The world-aligned [`Aabb`] enclosing the placed box is kept alongside the
/// oriented frame and serves as the broadphase reject in
/// [`Obb::intersects`].
#[derive(Debug, Clone, PartialEq)]
pub struct Obb {
    bounds: Aabb,
    placement: Transform,

    local_center: Point3,
    local_half_extents: Vec3,

    center: Point3,
    axes: [Vec3; 3],
    half_extents: Vec3,
}

impl Obb {
    /// Create a box from local min/max corners and a per-axis scale.
    pub fn new(min: Point3, max: Point3, scale: Vec3) -> Self {
        Self::from_aabb(Aabb::new(min, max, scale))
    }

    /// Wrap an unplaced [`Aabb`] as an oriented box.
    pub fn from_aabb(bounds: Aabb) -> Self {
        let mut obb = Self {
            bounds,
            placement: Transform::identity(),
            local_center: Point3::origin(),
            local_half_extents: Vec3::zeros(),
            center: Point3::origin(),
            axes: [Vec3::x(), Vec3::y(), Vec3::z()],
            half_extents: Vec3::zeros(),
        };
        obb.update();
        obb
    }

    /// Inflate the box by `border` on every face.
    pub fn with_border(mut self, border: Vec3) -> Self {
        self.bounds = self.bounds.with_border(border);
        self.update();
        self
    }

    /// Recompute the local frame from the local description and re-apply
    /// the current placement.
    pub fn update(&mut self) {
        self.bounds.update();
        self.local_center = self.bounds.center();
        self.local_half_extents = self.bounds.half_extents();
        let placement = self.placement.clone();
        self.transform(&placement);
    }

    /// Place the box with `transform`.
    ///
    /// The enclosing AABB is re-derived from the eight transformed corners;
    /// the three box axes are the unit X/Y/Z axes pushed through the matrix
    /// and normalized, with any scale in the matrix folded into the half
    /// extents.
    pub fn transform(&mut self, transform: &Transform) {
        self.bounds.transform(transform);
        self.center = transform.apply_point(&self.local_center);

        let units = [Vec3::x(), Vec3::y(), Vec3::z()];
        for (i, unit) in units.iter().enumerate() {
            let axis = transform.apply_vec(unit);
            let len = axis.norm();
            if len > Tolerance::DEFAULT.linear {
                self.axes[i] = axis / len;
                self.half_extents[i] = self.local_half_extents[i] * len;
            } else {
                // collapsed axis: keep a valid frame, the box is flat here
                self.axes[i] = *unit;
                self.half_extents[i] = 0.0;
            }
        }
        self.placement = transform.clone();
    }

    /// World center of the placed box.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Unit axes of the placed box.
    pub fn axes(&self) -> &[Vec3; 3] {
        &self.axes
    }

    /// Half extents along each box axis.
    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    /// Enclosing world-aligned box.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Current placement transform.
    pub fn placement(&self) -> &Transform {
        &self.placement
    }

    /// Full extent (twice the half extent) along each box axis.
    pub fn size(&self) -> Vec3 {
        self.half_extents * 2.0
    }

    /// Test for overlap with `other`.
    ///
    /// The enclosing AABBs are tested first. Then the separating-axis test
    /// runs over the three axes of each box and, unless the boxes share a
    /// parallel axis, the nine pairwise cross products. `epsilon` relaxes
    /// every comparison so that touching boxes count as intersecting.
    pub fn intersects(&self, other: &Obb, epsilon: f64) -> bool {
        if !self.bounds.intersects_with_epsilon(&other.bounds, epsilon) {
            return false;
        }

        let frame = SatFrame::new(self, other);
        if frame.separated_on_face_axes(epsilon) {
            return false;
        }
        if frame.has_parallel_axes() {
            return true;
        }
        !frame.separated_on_cross_axes(epsilon)
    }

    /// Whether a world-space point lies inside or on the box.
    pub fn contains_point(&self, p: &Point3) -> bool {
        let d = p - self.center;
        let tol = Tolerance::DEFAULT.linear;
        (0..3).all(|i| d.dot(&self.axes[i]).abs() <= self.half_extents[i] + tol)
    }

    /// Test a world-space triangle against the box.
    ///
    /// The triangle is brought into the local frame with the inverse
    /// placement and tested against the unplaced box. A singular placement
    /// falls back to the enclosing AABB.
    pub fn intersects_triangle(&self, triangle: &[Point3; 3]) -> bool {
        let Some(inverse) = self.placement.inverse() else {
            return triangle_box_overlap(
                &self.bounds.center(),
                &self.bounds.half_extents(),
                triangle,
            );
        };
        let local = [
            inverse.apply_point(&triangle[0]),
            inverse.apply_point(&triangle[1]),
            inverse.apply_point(&triangle[2]),
        ];
        triangle_box_overlap(&self.local_center, &self.local_half_extents, &local)
    }
}

/// Box B expressed in the frame of box A, as in Gottschalk's OBBTree test.
struct SatFrame {
    a: Vec3,
    b: Vec3,
    r: [[f64; 3]; 3],
    abs_r: [[f64; 3]; 3],
    t: [f64; 3],
}

impl SatFrame {
    fn new(a: &Obb, b: &Obb) -> Self {
        let mut r = [[0.0; 3]; 3];
        let mut abs_r = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = a.axes[i].dot(&b.axes[j]);
                abs_r[i][j] = r[i][j].abs();
            }
        }
        let d = b.center - a.center;
        let t = [d.dot(&a.axes[0]), d.dot(&a.axes[1]), d.dot(&a.axes[2])];
        Self {
            a: a.half_extents,
            b: b.half_extents,
            r,
            abs_r,
            t,
        }
    }

    fn has_parallel_axes(&self) -> bool {
        self.abs_r
            .iter()
            .flatten()
            .any(|&c| c > Tolerance::PARALLEL_CUTOFF)
    }

    fn separated_on_face_axes(&self, epsilon: f64) -> bool {
        let (a, b, r, ar, t) = (&self.a, &self.b, &self.r, &self.abs_r, &self.t);
        for i in 0..3 {
            let ra = a[i];
            let rb = b[0] * ar[i][0] + b[1] * ar[i][1] + b[2] * ar[i][2];
            if t[i].abs() >= ra + rb + epsilon {
                return true;
            }
        }
        for j in 0..3 {
            let ra = a[0] * ar[0][j] + a[1] * ar[1][j] + a[2] * ar[2][j];
            let rb = b[j];
            let proj = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if proj.abs() >= ra + rb + epsilon {
                return true;
            }
        }
        false
    }

    /// Nine `A_i x B_j` axes. Meaningless when an axis pair is parallel:
    /// the cross product degenerates and every projection collapses to zero.
    fn separated_on_cross_axes(&self, epsilon: f64) -> bool {
        let (a, b, r, ar, t) = (&self.a, &self.b, &self.r, &self.abs_r, &self.t);
        let tests = [
            // A0 x B0..B2
            (
                a[1] * ar[2][0] + a[2] * ar[1][0],
                b[1] * ar[0][2] + b[2] * ar[0][1],
                t[2] * r[1][0] - t[1] * r[2][0],
            ),
            (
                a[1] * ar[2][1] + a[2] * ar[1][1],
                b[0] * ar[0][2] + b[2] * ar[0][0],
                t[2] * r[1][1] - t[1] * r[2][1],
            ),
            (
                a[1] * ar[2][2] + a[2] * ar[1][2],
                b[0] * ar[0][1] + b[1] * ar[0][0],
                t[2] * r[1][2] - t[1] * r[2][2],
            ),
            // A1 x B0..B2
            (
                a[0] * ar[2][0] + a[2] * ar[0][0],
                b[1] * ar[1][2] + b[2] * ar[1][1],
                t[0] * r[2][0] - t[2] * r[0][0],
            ),
            (
                a[0] * ar[2][1] + a[2] * ar[0][1],
                b[0] * ar[1][2] + b[2] * ar[1][0],
                t[0] * r[2][1] - t[2] * r[0][1],
            ),
            (
                a[0] * ar[2][2] + a[2] * ar[0][2],
                b[0] * ar[1][1] + b[1] * ar[1][0],
                t[0] * r[2][2] - t[2] * r[0][2],
            ),
            // A2 x B0..B2
            (
                a[0] * ar[1][0] + a[1] * ar[0][0],
                b[1] * ar[2][2] + b[2] * ar[2][1],
                t[1] * r[0][0] - t[0] * r[1][0],
            ),
            (
                a[0] * ar[1][1] + a[1] * ar[0][1],
                b[0] * ar[2][2] + b[2] * ar[2][0],
                t[1] * r[0][1] - t[0] * r[1][1],
            ),
            (
                a[0] * ar[1][2] + a[1] * ar[0][2],
                b[0] * ar[2][1] + b[1] * ar[2][0],
                t[1] * r[0][2] - t[0] * r[1][2],
            ),
        ];
        tests
            .iter()
            .any(|&(ra, rb, proj)| proj.abs() >= ra + rb + epsilon)
    }
}
