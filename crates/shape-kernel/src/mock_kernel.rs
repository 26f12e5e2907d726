//! MockKernel: deterministic analytic test double implementing `Kernel`.
//!
//! Shapes carry closed-form mass properties instead of real B-rep topology:
//! prisms, primitives and revolutions are exact, booleans are exact for
//! axis-aligned boxes and bounding-box approximations otherwise. Every call is
//! counted and any operation can be made to fail on demand.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

use history_types::{cross, dot, length, normalize};
use slotmap::SlotMap;

use crate::measure::{add, mul, polygon_props, polyline_length, sub, Aabb};
use crate::traits::Kernel;
use crate::types::*;

#[derive(Debug, Clone)]
struct MockShape {
    kind: ShapeKind,
    /// Polyline for wires, boundary loop for faces, base profile for prisms.
    outline: Vec<[f64; 3]>,
    closed: bool,
    volume: f64,
    bounds: Aabb,
    faces: Vec<FaceInfo>,
    edges: Vec<EdgeInfo>,
}

impl MockShape {
    fn wire(points: &[[f64; 3]], closed: bool) -> Option<Self> {
        let bounds = Aabb::from_points(points.iter().copied())?;
        let mut edges = Vec::new();
        let n = points.len();
        let segments = if closed { n } else { n - 1 };
        for i in 0..segments {
            let a = points[i];
            let b = points[(i + 1) % n];
            edges.push(EdgeInfo {
                index: i,
                midpoint: mul(add(a, b), 0.5),
                length: length(sub(b, a)),
            });
        }
        Some(Self {
            kind: ShapeKind::Wire,
            outline: points.to_vec(),
            closed,
            volume: 0.0,
            bounds,
            faces: Vec::new(),
            edges,
        })
    }

    /// Extrude a planar loop along `vector`. `None` if the loop is degenerate.
    fn prism(outline: &[[f64; 3]], vector: [f64; 3]) -> Option<Self> {
        let props = polygon_props(outline)?;
        let height = dot(vector, props.normal);
        if height.abs() < 1e-12 {
            return None;
        }
        let n = outline.len();
        let top: Vec<[f64; 3]> = outline.iter().map(|p| add(*p, vector)).collect();

        let mut faces = vec![
            FaceInfo {
                index: 0,
                center: props.centroid,
                normal: mul(props.normal, -height.signum()),
                area: props.area,
            },
            FaceInfo {
                index: 1,
                center: add(props.centroid, vector),
                normal: mul(props.normal, height.signum()),
                area: props.area,
            },
        ];
        let mut edges = Vec::with_capacity(3 * n);
        for i in 0..n {
            let a = outline[i];
            let b = outline[(i + 1) % n];
            let side = sub(b, a);
            let side_normal = normalize(mul(cross(side, props.normal), height.signum()));
            faces.push(FaceInfo {
                index: faces.len(),
                center: add(mul(add(a, b), 0.5), mul(vector, 0.5)),
                normal: side_normal,
                area: length(cross(side, vector)),
            });
            edges.push(EdgeInfo {
                index: edges.len(),
                midpoint: mul(add(a, b), 0.5),
                length: length(side),
            });
            edges.push(EdgeInfo {
                index: edges.len(),
                midpoint: add(mul(add(a, b), 0.5), vector),
                length: length(side),
            });
            edges.push(EdgeInfo {
                index: edges.len(),
                midpoint: add(a, mul(vector, 0.5)),
                length: length(vector),
            });
        }

        let bounds = Aabb::from_points(outline.iter().chain(top.iter()).copied())?;
        Some(Self {
            kind: ShapeKind::Solid,
            outline: outline.to_vec(),
            closed: true,
            volume: props.area * height.abs(),
            bounds,
            faces,
            edges,
        })
    }

    /// Solid known only by its bounds and volume: faces and edges follow the box.
    fn boxed(bounds: Aabb, volume: f64) -> Self {
        let [a, b] = [bounds.min, bounds.max];
        let outline = vec![
            [a[0], a[1], a[2]],
            [b[0], a[1], a[2]],
            [b[0], b[1], a[2]],
            [a[0], b[1], a[2]],
        ];
        let vector = [0.0, 0.0, b[2] - a[2]];
        match Self::prism(&outline, vector) {
            Some(mut shape) => {
                shape.volume = volume;
                shape
            }
            None => Self {
                kind: ShapeKind::Solid,
                outline,
                closed: true,
                volume,
                bounds,
                faces: Vec::new(),
                edges: Vec::new(),
            },
        }
    }

    fn renumber(&mut self) {
        for (i, f) in self.faces.iter_mut().enumerate() {
            f.index = i;
        }
        for (i, e) in self.edges.iter_mut().enumerate() {
            e.index = i;
        }
    }

    /// Apply an affine map. `scale` is the uniform linear scale factor.
    fn mapped(&self, point: impl Fn([f64; 3]) -> [f64; 3], dir: impl Fn([f64; 3]) -> [f64; 3], scale: f64) -> Self {
        let outline: Vec<[f64; 3]> = self.outline.iter().map(|p| point(*p)).collect();
        let corners = self.bounds.corners().map(&point);
        Self {
            kind: self.kind,
            outline,
            closed: self.closed,
            volume: self.volume * scale.powi(3),
            bounds: Aabb::from_points(corners).unwrap_or(self.bounds),
            faces: self
                .faces
                .iter()
                .map(|f| FaceInfo {
                    index: f.index,
                    center: point(f.center),
                    normal: normalize(dir(f.normal)),
                    area: f.area * scale * scale,
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| EdgeInfo {
                    index: e.index,
                    midpoint: point(e.midpoint),
                    length: e.length * scale,
                })
                .collect(),
        }
    }
}

/// Deterministic test double for the geometry kernel.
#[derive(Debug, Default)]
pub struct MockKernel {
    shapes: SlotMap<ShapeKey, MockShape>,
    stats: KernelStats,
    call_counts: BTreeMap<&'static str, u64>,
    failures: HashMap<&'static str, String>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call to `operation` fail with `message`.
    pub fn inject_failure(&mut self, operation: &'static str, message: impl Into<String>) {
        self.failures.insert(operation, message.into());
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Number of calls made to one operation, e.g. `"extrude"`.
    pub fn calls_to(&self, operation: &str) -> u64 {
        self.call_counts.get(operation).copied().unwrap_or(0)
    }

    fn begin(&mut self, operation: &'static str) -> Result<(), KernelError> {
        self.stats.calls += 1;
        *self.call_counts.entry(operation).or_default() += 1;
        match self.failures.get(operation) {
            Some(message) => Err(KernelError::failed(operation, message.clone())),
            None => Ok(()),
        }
    }

    fn store(&mut self, shape: MockShape) -> ShapeHandle {
        self.stats.produced += 1;
        ShapeHandle::from_key(self.shapes.insert(shape))
    }

    fn get(&self, handle: ShapeHandle) -> Result<&MockShape, KernelError> {
        self.shapes
            .get(handle.key())
            .ok_or(KernelError::InvalidHandle { handle })
    }

    fn get_kind(
        &self,
        handle: ShapeHandle,
        operation: &'static str,
        expected: ShapeKind,
    ) -> Result<&MockShape, KernelError> {
        let shape = self.get(handle)?;
        if shape.kind != expected {
            return Err(KernelError::WrongKind {
                operation,
                expected,
                actual: shape.kind,
            });
        }
        Ok(shape)
    }

    fn store_mapped(
        &mut self,
        handle: ShapeHandle,
        point: impl Fn([f64; 3]) -> [f64; 3],
        dir: impl Fn([f64; 3]) -> [f64; 3],
        scale: f64,
    ) -> Result<ShapeHandle, KernelError> {
        let mapped = self.get(handle)?.mapped(point, dir, scale);
        Ok(self.store(mapped))
    }

    fn solid_pair(
        &self,
        a: ShapeHandle,
        b: ShapeHandle,
        operation: &'static str,
    ) -> Result<(MockShape, MockShape), KernelError> {
        let a = self.get_kind(a, operation, ShapeKind::Solid)?.clone();
        let b = self.get_kind(b, operation, ShapeKind::Solid)?.clone();
        Ok((a, b))
    }

    /// Validate edge indices and the blend size shared by fillet and chamfer.
    fn blend_target(
        &self,
        shape: ShapeHandle,
        edges: &[usize],
        size: f64,
        operation: &'static str,
    ) -> Result<MockShape, KernelError> {
        let solid = self.get_kind(shape, operation, ShapeKind::Solid)?.clone();
        if edges.is_empty() {
            return Err(KernelError::invalid(operation, "no edges selected"));
        }
        if let Some(bad) = edges.iter().find(|&&e| e >= solid.edges.len()) {
            return Err(KernelError::invalid(
                operation,
                format!("edge index {} out of range ({} edges)", bad, solid.edges.len()),
            ));
        }
        if !(size > 0.0) {
            return Err(KernelError::invalid(operation, "size must be positive"));
        }
        let min_extent = solid.bounds.extent().into_iter().fold(f64::INFINITY, f64::min);
        if size * 2.0 >= min_extent {
            return Err(KernelError::failed(
                operation,
                format!("size {} too large for a body {} thick", size, min_extent),
            ));
        }
        Ok(solid)
    }

    /// Replace the selected edges by one blend face each.
    fn blended(mut solid: MockShape, edges: &[usize], removed_per_length: f64) -> MockShape {
        let mut selected: Vec<usize> = edges.to_vec();
        selected.sort_unstable();
        selected.dedup();
        for &e in &selected {
            let edge = solid.edges[e].clone();
            solid.volume -= removed_per_length * edge.length;
            solid.faces.push(FaceInfo {
                index: 0,
                center: edge.midpoint,
                normal: normalize(sub(edge.midpoint, mul(add(solid.bounds.min, solid.bounds.max), 0.5))),
                area: edge.length * removed_per_length.sqrt(),
            });
        }
        for &e in selected.iter().rev() {
            let edge = solid.edges.remove(e);
            for _ in 0..2 {
                solid.edges.push(edge.clone());
            }
        }
        solid.renumber();
        solid
    }

    fn revolved_bounds(outline: &[[f64; 3]], origin: [f64; 3], axis: [f64; 3], angle: f64) -> Option<Aabb> {
        let steps = 16;
        let points = (0..=steps).flat_map(|i| {
            let t = angle * f64::from(i) / f64::from(steps);
            outline.iter().map(move |p| rotate_point(*p, origin, axis, t))
        });
        Aabb::from_points(points)
    }
}

/// Rodrigues rotation of `p` about the axis through `origin`.
fn rotate_point(p: [f64; 3], origin: [f64; 3], axis: [f64; 3], angle: f64) -> [f64; 3] {
    add(origin, rotate_vector(sub(p, origin), axis, angle))
}

fn rotate_vector(v: [f64; 3], axis: [f64; 3], angle: f64) -> [f64; 3] {
    let k = normalize(axis);
    let (s, c) = angle.sin_cos();
    let kxv = cross(k, v);
    let kdv = dot(k, v);
    [
        v[0] * c + kxv[0] * s + k[0] * kdv * (1.0 - c),
        v[1] * c + kxv[1] * s + k[1] * kdv * (1.0 - c),
        v[2] * c + kxv[2] * s + k[2] * kdv * (1.0 - c),
    ]
}

fn reflect_vector(v: [f64; 3], normal: [f64; 3]) -> [f64; 3] {
    sub(v, mul(normal, 2.0 * dot(v, normal)))
}

fn check_positive(operation: &'static str, name: &str, value: f64) -> Result<(), KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KernelError::invalid(operation, format!("{} must be positive, got {}", name, value)))
    }
}

/// Twelve triangles over the box faces, outward normals, four vertices per face.
fn box_mesh(bounds: &Aabb) -> Mesh {
    let c = bounds.corners();
    let quads: [([usize; 4], [f64; 3]); 6] = [
        ([0, 3, 2, 1], [0.0, 0.0, -1.0]),
        ([4, 5, 6, 7], [0.0, 0.0, 1.0]),
        ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
        ([2, 3, 7, 6], [0.0, 1.0, 0.0]),
        ([0, 4, 7, 3], [-1.0, 0.0, 0.0]),
        ([1, 2, 6, 5], [1.0, 0.0, 0.0]),
    ];
    let mut mesh = Mesh::default();
    for (quad, n) in quads {
        let base = mesh.vertex_count() as u32;
        for i in quad {
            mesh.positions.extend(c[i].map(|v| v as f32));
            mesh.normals.extend(n.map(|v| v as f32));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

fn fan_mesh(outline: &[[f64; 3]], normal: [f64; 3]) -> Mesh {
    let mut mesh = Mesh::default();
    for p in outline {
        mesh.positions.extend(p.map(|v| v as f32));
        mesh.normals.extend(normal.map(|v| v as f32));
    }
    for i in 1..outline.len().saturating_sub(1) as u32 {
        mesh.indices.extend_from_slice(&[0, i, i + 1]);
    }
    mesh
}

impl Kernel for MockKernel {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn make_polygon(&mut self, points: &[[f64; 3]], closed: bool) -> Result<ShapeHandle, KernelError> {
        self.begin("make_polygon")?;
        let needed = if closed { 3 } else { 2 };
        if points.len() < needed {
            return Err(KernelError::invalid(
                "make_polygon",
                format!("{} points given, at least {} required", points.len(), needed),
            ));
        }
        if points.iter().flatten().any(|v| !v.is_finite()) {
            return Err(KernelError::invalid("make_polygon", "non-finite coordinate"));
        }
        let wire = MockShape::wire(points, closed)
            .ok_or_else(|| KernelError::invalid("make_polygon", "empty point list"))?;
        Ok(self.store(wire))
    }

    fn make_face(&mut self, wire: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.begin("make_face")?;
        let wire = self.get_kind(wire, "make_face", ShapeKind::Wire)?.clone();
        if !wire.closed {
            return Err(KernelError::invalid("make_face", "wire is not closed"));
        }
        let props = polygon_props(&wire.outline)
            .ok_or_else(|| KernelError::failed("make_face", "wire encloses no area"))?;
        let face = MockShape {
            kind: ShapeKind::Face,
            faces: vec![FaceInfo {
                index: 0,
                center: props.centroid,
                normal: props.normal,
                area: props.area,
            }],
            ..wire
        };
        Ok(self.store(face))
    }

    fn make_box(&mut self, origin: [f64; 3], size: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        self.begin("make_box")?;
        for (name, v) in ["dx", "dy", "dz"].into_iter().zip(size) {
            check_positive("make_box", name, v)?;
        }
        let outline = vec![
            origin,
            add(origin, [size[0], 0.0, 0.0]),
            add(origin, [size[0], size[1], 0.0]),
            add(origin, [0.0, size[1], 0.0]),
        ];
        let solid = MockShape::prism(&outline, [0.0, 0.0, size[2]])
            .ok_or_else(|| KernelError::failed("make_box", "degenerate box"))?;
        Ok(self.store(solid))
    }

    fn make_cylinder(
        &mut self,
        origin: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.make_cone_like("make_cylinder", origin, radius, radius, height)
    }

    fn make_sphere(&mut self, center: [f64; 3], radius: f64) -> Result<ShapeHandle, KernelError> {
        self.begin("make_sphere")?;
        check_positive("make_sphere", "radius", radius)?;
        let bounds = Aabb {
            min: sub(center, [radius; 3]),
            max: add(center, [radius; 3]),
        };
        let sphere = MockShape {
            kind: ShapeKind::Solid,
            outline: Vec::new(),
            closed: true,
            volume: 4.0 / 3.0 * PI * radius.powi(3),
            bounds,
            faces: vec![FaceInfo {
                index: 0,
                center,
                normal: [0.0, 0.0, 1.0],
                area: 4.0 * PI * radius * radius,
            }],
            edges: vec![EdgeInfo {
                index: 0,
                midpoint: add(center, [radius, 0.0, 0.0]),
                length: PI * radius,
            }],
        };
        Ok(self.store(sphere))
    }

    fn make_cone(
        &mut self,
        origin: [f64; 3],
        bottom_radius: f64,
        top_radius: f64,
        height: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.make_cone_like("make_cone", origin, bottom_radius, top_radius, height)
    }

    fn translate(&mut self, shape: ShapeHandle, offset: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        self.begin("translate")?;
        self.store_mapped(shape, |p| add(p, offset), |v| v, 1.0)
    }

    fn rotate(
        &mut self,
        shape: ShapeHandle,
        origin: [f64; 3],
        axis: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.begin("rotate")?;
        if length(axis) < 1e-12 {
            return Err(KernelError::invalid("rotate", "axis has zero length"));
        }
        self.store_mapped(
            shape,
            |p| rotate_point(p, origin, axis, angle),
            |v| rotate_vector(v, axis, angle),
            1.0,
        )
    }

    fn scale(&mut self, shape: ShapeHandle, origin: [f64; 3], factor: f64) -> Result<ShapeHandle, KernelError> {
        self.begin("scale")?;
        check_positive("scale", "factor", factor)?;
        self.store_mapped(shape, |p| add(origin, mul(sub(p, origin), factor)), |v| v, factor)
    }

    fn mirror(
        &mut self,
        shape: ShapeHandle,
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        self.begin("mirror")?;
        if length(plane_normal) < 1e-12 {
            return Err(KernelError::invalid("mirror", "plane normal has zero length"));
        }
        let n = normalize(plane_normal);
        self.store_mapped(
            shape,
            |p| add(plane_origin, reflect_vector(sub(p, plane_origin), n)),
            |v| reflect_vector(v, n),
            1.0,
        )
    }

    fn extrude(&mut self, face: ShapeHandle, vector: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        self.begin("extrude")?;
        let face = self.get_kind(face, "extrude", ShapeKind::Face)?;
        let solid = MockShape::prism(&face.outline, vector)
            .ok_or_else(|| KernelError::failed("extrude", "extrusion vector lies in the face plane"))?;
        Ok(self.store(solid))
    }

    fn revolve(
        &mut self,
        face: ShapeHandle,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.begin("revolve")?;
        if length(axis_direction) < 1e-12 {
            return Err(KernelError::invalid("revolve", "axis has zero length"));
        }
        if !(angle.abs() > 1e-9 && angle.abs() <= 2.0 * PI + 1e-9) {
            return Err(KernelError::invalid("revolve", format!("angle {} out of range", angle)));
        }
        let face = self.get_kind(face, "revolve", ShapeKind::Face)?.clone();
        let props = polygon_props(&face.outline)
            .ok_or_else(|| KernelError::failed("revolve", "degenerate profile"))?;
        // Pappus: area times the path length of the centroid.
        let axis = normalize(axis_direction);
        let rel = sub(props.centroid, axis_origin);
        let radius = length(sub(rel, mul(axis, dot(rel, axis))));
        if radius < 1e-9 {
            return Err(KernelError::failed("revolve", "profile centroid lies on the axis"));
        }
        let bounds = Self::revolved_bounds(&face.outline, axis_origin, axis, angle)
            .ok_or_else(|| KernelError::failed("revolve", "degenerate profile"))?;
        let mut solid = MockShape::boxed(bounds, props.area * radius * angle.abs());
        solid.outline = face.outline;
        Ok(self.store(solid))
    }

    fn sweep(&mut self, face: ShapeHandle, path: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.begin("sweep")?;
        let face = self.get_kind(face, "sweep", ShapeKind::Face)?.clone();
        let path = self.get_kind(path, "sweep", ShapeKind::Wire)?.clone();
        if path.closed {
            return Err(KernelError::invalid("sweep", "path must be an open wire"));
        }
        let props = polygon_props(&face.outline)
            .ok_or_else(|| KernelError::failed("sweep", "degenerate profile"))?;
        let path_len = polyline_length(&path.outline);
        let start = path.outline[0];
        let bounds = Aabb::from_points(
            path.outline
                .iter()
                .flat_map(|q| face.outline.iter().map(move |p| add(*p, sub(*q, start)))),
        )
        .ok_or_else(|| KernelError::failed("sweep", "empty path"))?;
        let mut solid = MockShape::boxed(bounds, props.area * path_len);
        solid.outline = face.outline;
        Ok(self.store(solid))
    }

    fn loft(&mut self, sections: &[ShapeHandle]) -> Result<ShapeHandle, KernelError> {
        self.begin("loft")?;
        if sections.len() < 2 {
            return Err(KernelError::invalid("loft", "at least two sections required"));
        }
        let mut props = Vec::with_capacity(sections.len());
        let mut bounds: Option<Aabb> = None;
        for &section in sections {
            let shape = self.get(section)?;
            if shape.kind == ShapeKind::Solid || !shape.closed {
                return Err(KernelError::invalid("loft", "sections must be closed wires or faces"));
            }
            let p = polygon_props(&shape.outline)
                .ok_or_else(|| KernelError::failed("loft", "degenerate section"))?;
            props.push(p);
            bounds = Some(match bounds {
                Some(b) => b.union(&shape.bounds),
                None => shape.bounds,
            });
        }
        let volume: f64 = props
            .windows(2)
            .map(|w| (w[0].area + w[1].area) / 2.0 * length(sub(w[1].centroid, w[0].centroid)))
            .sum();
        if volume < 1e-12 {
            return Err(KernelError::failed("loft", "sections are coplanar"));
        }
        let bounds = bounds.ok_or_else(|| KernelError::failed("loft", "no sections"))?;
        Ok(self.store(MockShape::boxed(bounds, volume)))
    }

    fn fuse(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.begin("fuse")?;
        let (mut a, b) = self.solid_pair(a, b, "fuse")?;
        let overlap = a.bounds.intersection(&b.bounds).map_or(0.0, |o| o.volume());
        a.volume = a.volume + b.volume - overlap.min(a.volume).min(b.volume);
        a.bounds = a.bounds.union(&b.bounds);
        a.faces.extend(b.faces);
        a.edges.extend(b.edges);
        a.renumber();
        Ok(self.store(a))
    }

    fn cut(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.begin("cut")?;
        let (mut a, b) = self.solid_pair(a, b, "cut")?;
        if let Some(overlap) = a.bounds.intersection(&b.bounds) {
            a.volume -= overlap.volume().min(b.volume);
            if a.volume <= 1e-9 {
                return Err(KernelError::failed("cut", "tool removes the entire target"));
            }
            a.faces.extend(b.faces);
            a.edges.extend(b.edges);
            a.renumber();
        }
        Ok(self.store(a))
    }

    fn intersect(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.begin("intersect")?;
        let (a, b) = self.solid_pair(a, b, "intersect")?;
        let overlap = a
            .bounds
            .intersection(&b.bounds)
            .ok_or_else(|| KernelError::failed("intersect", "solids do not overlap"))?;
        let volume = overlap.volume().min(a.volume).min(b.volume);
        Ok(self.store(MockShape::boxed(overlap, volume)))
    }

    fn fillet(&mut self, shape: ShapeHandle, edges: &[usize], radius: f64) -> Result<ShapeHandle, KernelError> {
        self.begin("fillet")?;
        let solid = self.blend_target(shape, edges, radius, "fillet")?;
        let result = Self::blended(solid, edges, (1.0 - PI / 4.0) * radius * radius);
        Ok(self.store(result))
    }

    fn chamfer(&mut self, shape: ShapeHandle, edges: &[usize], distance: f64) -> Result<ShapeHandle, KernelError> {
        self.begin("chamfer")?;
        let solid = self.blend_target(shape, edges, distance, "chamfer")?;
        let result = Self::blended(solid, edges, 0.5 * distance * distance);
        Ok(self.store(result))
    }

    fn shell(&mut self, shape: ShapeHandle, faces: &[usize], thickness: f64) -> Result<ShapeHandle, KernelError> {
        self.begin("shell")?;
        check_positive("shell", "thickness", thickness)?;
        let mut solid = self.get_kind(shape, "shell", ShapeKind::Solid)?.clone();
        if let Some(bad) = faces.iter().find(|&&f| f >= solid.faces.len()) {
            return Err(KernelError::invalid(
                "shell",
                format!("face index {} out of range ({} faces)", bad, solid.faces.len()),
            ));
        }
        let extent = solid.bounds.extent();
        if extent.iter().any(|&e| e <= 2.0 * thickness) {
            return Err(KernelError::failed("shell", "thickness exceeds half the body size"));
        }
        let inner_ratio: f64 = extent.iter().map(|&e| (e - 2.0 * thickness) / e).product();
        solid.volume *= 1.0 - inner_ratio;
        let mut opened: Vec<usize> = faces.to_vec();
        opened.sort_unstable();
        opened.dedup();
        for &f in opened.iter().rev() {
            solid.faces.remove(f);
        }
        let inner: Vec<FaceInfo> = solid
            .faces
            .iter()
            .map(|f| FaceInfo {
                index: 0,
                center: f.center,
                normal: mul(f.normal, -1.0),
                area: f.area * inner_ratio.cbrt().powi(2),
            })
            .collect();
        solid.faces.extend(inner);
        solid.renumber();
        Ok(self.store(solid))
    }

    fn faces(&self, shape: ShapeHandle) -> Result<Vec<FaceInfo>, KernelError> {
        Ok(self.get(shape)?.faces.clone())
    }

    fn edges(&self, shape: ShapeHandle) -> Result<Vec<EdgeInfo>, KernelError> {
        Ok(self.get(shape)?.edges.clone())
    }

    fn volume(&self, shape: ShapeHandle) -> Result<f64, KernelError> {
        Ok(self.get(shape)?.volume)
    }

    fn mesh(&mut self, shape: ShapeHandle, deflection: f64) -> Result<Mesh, KernelError> {
        check_positive("mesh", "deflection", deflection)?;
        let shape = self.get(shape)?;
        match shape.kind {
            ShapeKind::Solid => Ok(box_mesh(&shape.bounds)),
            ShapeKind::Face => Ok(fan_mesh(&shape.outline, shape.faces[0].normal)),
            ShapeKind::Wire => Err(KernelError::WrongKind {
                operation: "mesh",
                expected: ShapeKind::Solid,
                actual: ShapeKind::Wire,
            }),
        }
    }

    fn free_shape(&mut self, handle: ShapeHandle) -> bool {
        if self.shapes.remove(handle.key()).is_some() {
            self.stats.freed += 1;
            true
        } else {
            self.stats.redundant_frees += 1;
            false
        }
    }

    fn live_shape_count(&self) -> usize {
        self.shapes.len()
    }

    fn stats(&self) -> KernelStats {
        self.stats
    }
}

impl MockKernel {
    fn make_cone_like(
        &mut self,
        operation: &'static str,
        origin: [f64; 3],
        bottom_radius: f64,
        top_radius: f64,
        height: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.begin(operation)?;
        check_positive(operation, "height", height)?;
        check_positive(operation, "bottom radius", bottom_radius)?;
        if !(top_radius >= 0.0) {
            return Err(KernelError::invalid(operation, "top radius must not be negative"));
        }
        let (r1, r2, h) = (bottom_radius, top_radius, height);
        let r = r1.max(r2);
        let bounds = Aabb {
            min: add(origin, [-r, -r, 0.0]),
            max: add(origin, [r, r, h]),
        };
        let slant = ((r1 - r2).powi(2) + h * h).sqrt();
        let mut faces = vec![
            FaceInfo {
                index: 0,
                center: origin,
                normal: [0.0, 0.0, -1.0],
                area: PI * r1 * r1,
            },
            FaceInfo {
                index: 1,
                center: add(origin, [(r1 + r2) / 2.0, 0.0, h / 2.0]),
                normal: normalize([h, 0.0, r1 - r2]),
                area: PI * (r1 + r2) * slant,
            },
        ];
        let mut edges = vec![
            EdgeInfo {
                index: 0,
                midpoint: add(origin, [-r1, 0.0, 0.0]),
                length: 2.0 * PI * r1,
            },
            EdgeInfo {
                index: 1,
                midpoint: add(origin, [(r1 + r2) / 2.0, 0.0, h / 2.0]),
                length: slant,
            },
        ];
        if r2 > 0.0 {
            faces.push(FaceInfo {
                index: 2,
                center: add(origin, [0.0, 0.0, h]),
                normal: [0.0, 0.0, 1.0],
                area: PI * r2 * r2,
            });
            edges.push(EdgeInfo {
                index: 2,
                midpoint: add(origin, [-r2, 0.0, h]),
                length: 2.0 * PI * r2,
            });
        }
        let solid = MockShape {
            kind: ShapeKind::Solid,
            outline: Vec::new(),
            closed: true,
            volume: PI * h / 3.0 * (r1 * r1 + r1 * r2 + r2 * r2),
            bounds,
            faces,
            edges,
        };
        Ok(self.store(solid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(kernel: &mut MockKernel, size: f64) -> ShapeHandle {
        let wire = kernel
            .make_polygon(
                &[[0.0, 0.0, 0.0], [size, 0.0, 0.0], [size, size, 0.0], [0.0, size, 0.0]],
                true,
            )
            .unwrap();
        let face = kernel.make_face(wire).unwrap();
        kernel.free_shape(wire);
        face
    }

    #[test]
    fn extruded_square_has_prism_topology_and_volume() {
        let mut kernel = MockKernel::new();
        let face = square(&mut kernel, 10.0);
        let solid = kernel.extrude(face, [0.0, 0.0, 5.0]).unwrap();
        assert_relative_eq!(kernel.volume(solid).unwrap(), 500.0, epsilon = 1e-9);
        assert_eq!(kernel.faces(solid).unwrap().len(), 6);
        assert_eq!(kernel.edges(solid).unwrap().len(), 12);
    }

    #[test]
    fn extrude_requires_a_face() {
        let mut kernel = MockKernel::new();
        let wire = kernel
            .make_polygon(&[[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]], true)
            .unwrap();
        let err = kernel.extrude(wire, [0.0, 0.0, 1.0]).unwrap_err();
        assert!(matches!(err, KernelError::WrongKind { .. }));
    }

    #[test]
    fn primitive_volumes_are_exact() {
        let mut kernel = MockKernel::new();
        let b = kernel.make_box([0.0; 3], [2.0, 3.0, 4.0]).unwrap();
        let c = kernel.make_cylinder([0.0; 3], 1.0, 2.0).unwrap();
        let s = kernel.make_sphere([0.0; 3], 1.0).unwrap();
        let k = kernel.make_cone([0.0; 3], 1.0, 0.0, 3.0).unwrap();
        assert_relative_eq!(kernel.volume(b).unwrap(), 24.0);
        assert_relative_eq!(kernel.volume(c).unwrap(), 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(kernel.volume(s).unwrap(), 4.0 / 3.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(kernel.volume(k).unwrap(), PI, epsilon = 1e-12);
    }

    #[test]
    fn box_booleans_are_exact() {
        let mut kernel = MockKernel::new();
        let a = kernel.make_box([0.0; 3], [2.0, 2.0, 2.0]).unwrap();
        let b = kernel.make_box([1.0, 0.0, 0.0], [2.0, 2.0, 2.0]).unwrap();
        let fused = kernel.fuse(a, b).unwrap();
        let cut = kernel.cut(a, b).unwrap();
        let common = kernel.intersect(a, b).unwrap();
        assert_relative_eq!(kernel.volume(fused).unwrap(), 12.0);
        assert_relative_eq!(kernel.volume(cut).unwrap(), 4.0);
        assert_relative_eq!(kernel.volume(common).unwrap(), 4.0);
    }

    #[test]
    fn revolve_follows_pappus() {
        let mut kernel = MockKernel::new();
        let wire = kernel
            .make_polygon(
                &[[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 0.0, 1.0], [1.0, 0.0, 1.0]],
                true,
            )
            .unwrap();
        let face = kernel.make_face(wire).unwrap();
        let solid = kernel
            .revolve(face, [0.0; 3], [0.0, 0.0, 1.0], 2.0 * PI)
            .unwrap();
        // Annulus r 1..2, height 1.
        assert_relative_eq!(kernel.volume(solid).unwrap(), 3.0 * PI, epsilon = 1e-9);
    }

    #[test]
    fn free_is_idempotent_and_counted() {
        let mut kernel = MockKernel::new();
        let b = kernel.make_box([0.0; 3], [1.0, 1.0, 1.0]).unwrap();
        assert!(kernel.free_shape(b));
        assert!(!kernel.free_shape(b));
        let stats = kernel.stats();
        assert_eq!(stats.produced, 1);
        assert_eq!(stats.freed, 1);
        assert_eq!(stats.redundant_frees, 1);
        assert_eq!(kernel.live_shape_count(), 0);
        assert!(matches!(kernel.volume(b), Err(KernelError::InvalidHandle { .. })));
    }

    #[test]
    fn injected_failures_surface_as_operation_failed() {
        let mut kernel = MockKernel::new();
        kernel.inject_failure("make_box", "simulated");
        let err = kernel.make_box([0.0; 3], [1.0, 1.0, 1.0]).unwrap_err();
        assert!(err.to_string().contains("simulated"));
        assert_eq!(kernel.calls_to("make_box"), 1);
        assert_eq!(kernel.stats().produced, 0);
        kernel.clear_failures();
        assert!(kernel.make_box([0.0; 3], [1.0, 1.0, 1.0]).is_ok());
    }

    #[test]
    fn fillet_rejects_oversized_radius() {
        let mut kernel = MockKernel::new();
        let b = kernel.make_box([0.0; 3], [1.0, 1.0, 1.0]).unwrap();
        assert!(kernel.fillet(b, &[0], 0.6).is_err());
        let rounded = kernel.fillet(b, &[0, 1], 0.1).unwrap();
        assert!(kernel.volume(rounded).unwrap() < 1.0);
        assert_eq!(kernel.faces(rounded).unwrap().len(), 8);
        assert_eq!(kernel.edges(rounded).unwrap().len(), 14);
    }

    #[test]
    fn translated_mesh_moves_with_shape() {
        let mut kernel = MockKernel::new();
        let b = kernel.make_box([0.0; 3], [1.0, 1.0, 1.0]).unwrap();
        let moved = kernel.translate(b, [5.0, 0.0, 0.0]).unwrap();
        let mesh = kernel.mesh(moved, 0.1).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        let min_x = mesh.positions.iter().step_by(3).cloned().fold(f32::MAX, f32::min);
        assert_relative_eq!(min_x, 5.0);
        assert_relative_eq!(crate::measure::mesh_volume(&mesh), 1.0, epsilon = 1e-5);
    }
}
