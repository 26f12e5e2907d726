use serde::{Deserialize, Serialize};

use crate::ids::PlaneId;

/// A point or vector in sketch-plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A construction plane sketches are drawn on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub id: PlaneId,
    pub name: String,
    pub origin: [f64; 3],
    /// Unit normal.
    pub normal: [f64; 3],
    /// Unit in-plane X direction, orthogonal to `normal`.
    pub x_axis: [f64; 3],
}

impl Plane {
    pub fn new(name: impl Into<String>, origin: [f64; 3], normal: [f64; 3], x_axis: [f64; 3]) -> Self {
        Self {
            id: PlaneId::new(),
            name: name.into(),
            origin,
            normal: normalize(normal),
            x_axis: normalize(x_axis),
        }
    }

    pub fn xy() -> Self {
        Self::new("XY", [0.0; 3], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0])
    }

    pub fn xz() -> Self {
        Self::new("XZ", [0.0; 3], [0.0, -1.0, 0.0], [1.0, 0.0, 0.0])
    }

    pub fn yz() -> Self {
        Self::new("YZ", [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0])
    }

    /// In-plane Y direction (`normal × x_axis`).
    pub fn y_axis(&self) -> [f64; 3] {
        normalize(cross(self.normal, self.x_axis))
    }

    /// Map a sketch-plane point into world space.
    pub fn to_world(&self, p: Vec2) -> [f64; 3] {
        let y = self.y_axis();
        [
            self.origin[0] + self.x_axis[0] * p.x + y[0] * p.y,
            self.origin[1] + self.x_axis[1] * p.x + y[1] * p.y,
            self.origin[2] + self.x_axis[2] * p.x + y[2] * p.y,
        ]
    }
}

pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn length(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

/// Normalize `v`; zero-length input is returned unchanged.
pub fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = length(v);
    if len < 1e-12 {
        return v;
    }
    [v[0] / len, v[1] / len, v[2] / len]
}
