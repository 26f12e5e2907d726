//! Mass-property helpers shared by the kernels.

use history_types::{cross, dot, length};

use crate::types::Mesh;

/// Planar polygon properties computed with Newell's method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonProps {
    pub area: f64,
    /// Unit normal following the right-hand rule over the point order.
    pub normal: [f64; 3],
    pub centroid: [f64; 3],
}

/// Area, normal and centroid of a closed polygon. `None` for degenerate input.
pub fn polygon_props(points: &[[f64; 3]]) -> Option<PolygonProps> {
    if points.len() < 3 {
        return None;
    }
    let mut n = [0.0; 3];
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        n[0] += (p[1] - q[1]) * (p[2] + q[2]);
        n[1] += (p[2] - q[2]) * (p[0] + q[0]);
        n[2] += (p[0] - q[0]) * (p[1] + q[1]);
    }
    let twice_area = length(n);
    if twice_area < 1e-12 {
        return None;
    }
    let normal = [n[0] / twice_area, n[1] / twice_area, n[2] / twice_area];

    // Area-weighted centroid from a fan around the first vertex.
    let origin = points[0];
    let mut weighted = [0.0; 3];
    let mut total = 0.0;
    for i in 1..points.len() - 1 {
        let a = points[i];
        let b = points[i + 1];
        let e1 = sub(a, origin);
        let e2 = sub(b, origin);
        let signed = dot(cross(e1, e2), normal) / 2.0;
        for k in 0..3 {
            weighted[k] += signed * (origin[k] + a[k] + b[k]) / 3.0;
        }
        total += signed;
    }
    let centroid = if total.abs() > 1e-12 {
        [weighted[0] / total, weighted[1] / total, weighted[2] / total]
    } else {
        origin
    };

    Some(PolygonProps {
        area: twice_area / 2.0,
        normal,
        centroid,
    })
}

/// Total length of a polyline.
pub fn polyline_length(points: &[[f64; 3]]) -> f64 {
    points.windows(2).map(|w| length(sub(w[1], w[0]))).sum()
}

/// Enclosed volume of a closed, consistently oriented triangle mesh.
pub fn mesh_volume(mesh: &Mesh) -> f64 {
    let mut six_v = 0.0;
    for tri in mesh.indices.chunks_exact(3) {
        let a = vertex(mesh, tri[0]);
        let b = vertex(mesh, tri[1]);
        let c = vertex(mesh, tri[2]);
        six_v += dot(a, cross(b, c));
    }
    (six_v / 6.0).abs()
}

/// Total surface area of a triangle mesh.
pub fn mesh_area(mesh: &Mesh) -> f64 {
    mesh.indices
        .chunks_exact(3)
        .map(|tri| {
            let a = vertex(mesh, tri[0]);
            let b = vertex(mesh, tri[1]);
            let c = vertex(mesh, tri[2]);
            length(cross(sub(b, a), sub(c, a))) / 2.0
        })
        .sum()
}

fn vertex(mesh: &Mesh, index: u32) -> [f64; 3] {
    let i = index as usize * 3;
    [
        f64::from(mesh.positions[i]),
        f64::from(mesh.positions[i + 1]),
        f64::from(mesh.positions[i + 2]),
    ]
}

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub(crate) fn mul(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = [f64; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Aabb {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: [f64; 3]) {
        for k in 0..3 {
            self.min[k] = self.min[k].min(p[k]);
            self.max[k] = self.max[k].max(p[k]);
        }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for k in 0..3 {
            min[k] = self.min[k].max(other.min[k]);
            max[k] = self.max[k].min(other.max[k]);
            if max[k] - min[k] <= 1e-12 {
                return None;
            }
        }
        Some(Aabb { min, max })
    }

    pub fn extent(&self) -> [f64; 3] {
        sub(self.max, self.min)
    }

    pub fn volume(&self) -> f64 {
        let e = self.extent();
        e[0] * e[1] * e[2]
    }

    pub fn corners(&self) -> [[f64; 3]; 8] {
        let (a, b) = (self.min, self.max);
        [
            [a[0], a[1], a[2]],
            [b[0], a[1], a[2]],
            [b[0], b[1], a[2]],
            [a[0], b[1], a[2]],
            [a[0], a[1], b[2]],
            [b[0], a[1], b[2]],
            [b[0], b[1], b[2]],
            [a[0], b[1], b[2]],
        ]
    }
}
