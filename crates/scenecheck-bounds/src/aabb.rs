//! Axis-aligned bounding box.
//!
//! Used as the fast-reject stage before the oriented separating-axis test.

use scenecheck_math::{Point3, Transform, Vec3};

/// Axis-aligned bounding box in 3D.
///
/// The local description (`local_min`, `local_max`, `scale`, `border`) is
/// kept separately from the derived world extents so the box can be placed
/// repeatedly without accumulating error.
#[derive(Debug, Clone, PartialEq)]
pub struct Aabb {
    local_min: Point3,
    local_max: Point3,
    scale: Vec3,
    border: Vec3,

    min: Point3,
    max: Point3,
    center: Point3,
    half_extents: Vec3,
    corners: [Point3; 8],
}

impl Aabb {
    /// Create a box from local min/max corners and a per-axis scale.
    pub fn new(min: Point3, max: Point3, scale: Vec3) -> Self {
        let mut aabb = Self {
            local_min: min,
            local_max: max,
            scale,
            border: Vec3::zeros(),
            min,
            max,
            center: Point3::origin(),
            half_extents: Vec3::zeros(),
            corners: [Point3::origin(); 8],
        };
        aabb.update();
        aabb
    }

    /// Inflate the box by `border` on every face.
    pub fn with_border(mut self, border: Vec3) -> Self {
        self.border = border;
        self.update();
        self
    }

    /// Inflate the box by the same amount on every face.
    pub fn with_uniform_border(self, border: f64) -> Self {
        self.with_border(Vec3::repeat(border))
    }

    /// Recompute extents, center, half extents and corners from the local
    /// description. Discards any placement applied by [`Aabb::transform`].
    pub fn update(&mut self) {
        let a = self.local_min.coords.component_mul(&self.scale);
        let b = self.local_max.coords.component_mul(&self.scale);
        // a negative scale mirrors the box, so min/max are re-sorted
        let lo = a.inf(&b) - self.border;
        let hi = a.sup(&b) + self.border;
        self.set_extents(Point3::from(lo), Point3::from(hi));
    }

    /// Place the box with `transform`: the local corners are transformed and
    /// the axis-aligned extents re-derived from them.
    pub fn transform(&mut self, transform: &Transform) {
        self.update();
        let corners = self.corners;
        let mut lo = Vec3::repeat(f64::INFINITY);
        let mut hi = Vec3::repeat(f64::NEG_INFINITY);
        for corner in &corners {
            let p = transform.apply_point(corner);
            lo = lo.inf(&p.coords);
            hi = hi.sup(&p.coords);
        }
        self.set_extents(Point3::from(lo), Point3::from(hi));
    }

    fn set_extents(&mut self, min: Point3, max: Point3) {
        self.min = min;
        self.max = max;
        self.center = midpoint(&min, &max);
        self.half_extents = (max - min) * 0.5;
        self.corners = corners_of(&min, &max);
    }

    /// Minimum world corner.
    pub fn min(&self) -> Point3 {
        self.min
    }

    /// Maximum world corner.
    pub fn max(&self) -> Point3 {
        self.max
    }

    /// World center.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Half of the world extent along each axis.
    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    /// The eight world corners.
    pub fn corners(&self) -> &[Point3; 8] {
        &self.corners
    }

    /// Local minimum corner, before scale and border.
    pub fn local_min(&self) -> Point3 {
        self.local_min
    }

    /// Local maximum corner, before scale and border.
    pub fn local_max(&self) -> Point3 {
        self.local_max
    }

    /// Per-axis scale.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Per-axis border inflation.
    pub fn border(&self) -> Vec3 {
        self.border
    }

    /// Strict overlap test. Boxes that only share a face do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.intersects_with_epsilon(other, 0.0)
    }

    /// Overlap test with every comparison relaxed by `epsilon`.
    ///
    /// With `epsilon > 0`, boxes that touch exactly are reported as
    /// intersecting.
    pub fn intersects_with_epsilon(&self, other: &Aabb, epsilon: f64) -> bool {
        self.min.x < other.max.x + epsilon
            && other.min.x < self.max.x + epsilon
            && self.min.y < other.max.y + epsilon
            && other.min.y < self.max.y + epsilon
            && self.min.z < other.max.z + epsilon
            && other.min.z < self.max.z + epsilon
    }

    /// Whether `p` lies inside or on the box.
    pub fn contains_point(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

fn midpoint(min: &Point3, max: &Point3) -> Point3 {
    Point3::from((min.coords + max.coords) * 0.5)
}

fn corners_of(min: &Point3, max: &Point3) -> [Point3; 8] {
    [
        Point3::new(min.x, min.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, max.y, max.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(max.x, max.y, max.z),
    ]
}
