//! Triangle / axis-aligned box overlap and point-in-mesh parity.
//!
//! The overlap test is Tomas Akenine-Möller's separating-axis formulation
//! over box face normals, box-axis x triangle-edge cross products and the
//! triangle's own plane.

use scenecheck_math::{Point3, Vec3};

/// Test a triangle against the axis-aligned box `center ± half_extents`.
///
/// Touching counts as overlap.
pub fn triangle_box_overlap(center: &Point3, half_extents: &Vec3, triangle: &[Point3; 3]) -> bool {
    // move everything so the box is centered at the origin
    let v0 = triangle[0] - center;
    let v1 = triangle[1] - center;
    let v2 = triangle[2] - center;
    let h = half_extents;

    let edges = [v1 - v0, v2 - v1, v0 - v2];
    let units = [Vec3::x(), Vec3::y(), Vec3::z()];

    // 9 tests: box axis x triangle edge
    for edge in &edges {
        for unit in &units {
            let axis = unit.cross(edge);
            let p0 = v0.dot(&axis);
            let p1 = v1.dot(&axis);
            let p2 = v2.dot(&axis);
            let r = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
            let lo = p0.min(p1).min(p2);
            let hi = p0.max(p1).max(p2);
            if lo > r || hi < -r {
                return false;
            }
        }
    }

    // 3 tests: the box face normals, i.e. the triangle's own AABB
    for i in 0..3 {
        let lo = v0[i].min(v1[i]).min(v2[i]);
        let hi = v0[i].max(v1[i]).max(v2[i]);
        if lo > h[i] || hi < -h[i] {
            return false;
        }
    }

    // 1 test: the triangle plane
    let normal = edges[0].cross(&edges[1]);
    plane_box_overlap(&normal, &v0, h)
}

/// Whether `point` lies inside the volume enclosed by `triangles`.
///
/// Counts crossings of a fixed ray; an odd count means inside. Only
/// meaningful for closed meshes, open ones usually read as outside.
pub fn point_in_mesh(point: &Point3, triangles: &[[Point3; 3]]) -> bool {
    // skewed so it does not run along the edges or diagonals of
    // axis-aligned faces
    let dir = Vec3::new(0.8716, 0.4139, 0.2626);
    let crossings = triangles
        .iter()
        .filter(|tri| ray_hits_triangle(point, &dir, tri))
        .count();
    crossings % 2 == 1
}

// Möller-Trumbore, hits at t > 0 only.
fn ray_hits_triangle(origin: &Point3, dir: &Vec3, triangle: &[Point3; 3]) -> bool {
    let e1 = triangle[1] - triangle[0];
    let e2 = triangle[2] - triangle[0];
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < 1e-12 {
        return false;
    }
    let inv = 1.0 / det;
    let s = origin - triangle[0];
    let u = s.dot(&p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    e2.dot(&q) * inv > 0.0
}

fn plane_box_overlap(normal: &Vec3, vertex: &Vec3, half_extents: &Vec3) -> bool {
    let mut vmin = Vec3::zeros();
    let mut vmax = Vec3::zeros();
    for i in 0..3 {
        let v = vertex[i];
        if normal[i] > 0.0 {
            vmin[i] = -half_extents[i] - v;
            vmax[i] = half_extents[i] - v;
        } else {
            vmin[i] = half_extents[i] - v;
            vmax[i] = -half_extents[i] - v;
        }
    }
    if normal.dot(&vmin) > 0.0 {
        return false;
    }
    normal.dot(&vmax) >= 0.0
}
