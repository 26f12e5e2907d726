//! TruckKernel: real geometry kernel wrapping truck's API.

use slotmap::SlotMap;

use truck_modeling::builder;
use truck_modeling::topology::{Edge, Face, Solid, Wire};
use truck_modeling::{InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::primitives;
use crate::tessellation;
use crate::traits::Kernel;
use crate::types::*;

/// Boolean tolerance passed to truck-shapeops.
const BOOLEAN_TOLERANCE: f64 = 0.05;
/// Tessellation tolerance used for measurements.
const MEASURE_TOLERANCE: f64 = 0.01;

#[derive(Clone)]
enum TruckShape {
    Wire { wire: Wire, closed: bool },
    Face(Face),
    Solid(Solid),
}

impl TruckShape {
    fn kind(&self) -> ShapeKind {
        match self {
            TruckShape::Wire { .. } => ShapeKind::Wire,
            TruckShape::Face(_) => ShapeKind::Face,
            TruckShape::Solid(_) => ShapeKind::Solid,
        }
    }
}

fn vec3(v: [f64; 3]) -> Vector3 {
    Vector3::new(v[0], v[1], v[2])
}

fn point3(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

fn unit_axis(operation: &'static str, axis: [f64; 3]) -> Result<Vector3, KernelError> {
    let v = vec3(axis);
    if v.magnitude() < 1e-12 {
        return Err(KernelError::invalid(operation, "axis has zero length"));
    }
    Ok(v.normalize())
}

/// Real geometry kernel backed by the truck BREP library.
#[derive(Default)]
pub struct TruckKernel {
    shapes: SlotMap<ShapeKey, TruckShape>,
    stats: KernelStats,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&mut self, shape: TruckShape) -> ShapeHandle {
        self.stats.produced += 1;
        ShapeHandle::from_key(self.shapes.insert(shape))
    }

    fn get(&self, handle: ShapeHandle) -> Result<&TruckShape, KernelError> {
        self.shapes
            .get(handle.key())
            .ok_or(KernelError::InvalidHandle { handle })
    }

    fn solid(&self, handle: ShapeHandle, operation: &'static str) -> Result<&Solid, KernelError> {
        match self.get(handle)? {
            TruckShape::Solid(s) => Ok(s),
            other => Err(KernelError::WrongKind {
                operation,
                expected: ShapeKind::Solid,
                actual: other.kind(),
            }),
        }
    }

    fn face(&self, handle: ShapeHandle, operation: &'static str) -> Result<&Face, KernelError> {
        match self.get(handle)? {
            TruckShape::Face(f) => Ok(f),
            other => Err(KernelError::WrongKind {
                operation,
                expected: ShapeKind::Face,
                actual: other.kind(),
            }),
        }
    }

    /// Apply a rigid or similarity map to any stored shape.
    fn mapped(&mut self, handle: ShapeHandle, matrix: Matrix4, flips: bool) -> Result<ShapeHandle, KernelError> {
        let mapped = match self.get(handle)? {
            TruckShape::Wire { wire, closed } => TruckShape::Wire {
                wire: builder::transformed(wire, matrix),
                closed: *closed,
            },
            TruckShape::Face(f) => {
                let mut face = builder::transformed(f, matrix);
                if flips {
                    face.invert();
                }
                TruckShape::Face(face)
            }
            TruckShape::Solid(s) => {
                let mut solid = builder::transformed(s, matrix);
                if flips {
                    solid.not();
                }
                TruckShape::Solid(solid)
            }
        };
        Ok(self.store(mapped))
    }

    fn boolean(
        &mut self,
        operation: &'static str,
        a: ShapeHandle,
        b: ShapeHandle,
    ) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        let solid_a = self.solid(a, operation)?.clone();
        let mut solid_b = self.solid(b, operation)?.clone();
        let result = match operation {
            "fuse" => truck_shapeops::or(&solid_a, &solid_b, BOOLEAN_TOLERANCE),
            "cut" => {
                // Subtraction = A ∩ ¬B. not() mutates in place.
                solid_b.not();
                truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE)
            }
            _ => truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE),
        };
        let Some(result) = result else {
            tracing::debug!(operation, "truck shapeops returned no solid");
            return Err(KernelError::failed(operation, "truck shapeops returned None"));
        };
        Ok(self.store(TruckShape::Solid(result)))
    }
}

impl Kernel for TruckKernel {
    fn name(&self) -> &'static str {
        "truck"
    }

    fn make_polygon(&mut self, points: &[[f64; 3]], closed: bool) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        let needed = if closed { 3 } else { 2 };
        if points.len() < needed {
            return Err(KernelError::invalid(
                "make_polygon",
                format!("{} points given, at least {} required", points.len(), needed),
            ));
        }
        // Create all vertices first so edges share endpoints.
        let pts: Vec<Point3> = points.iter().map(|&p| point3(p)).collect();
        let vertices: Vec<_> = pts.iter().map(|&p| builder::vertex(p)).collect();
        let n = pts.len();
        let segments = if closed { n } else { n - 1 };
        let edges: Vec<Edge> = (0..segments)
            .map(|i| {
                let j = (i + 1) % n;
                Edge::new(
                    &vertices[i],
                    &vertices[j],
                    truck_modeling::geometry::Curve::Line(truck_modeling::geometry::Line(pts[i], pts[j])),
                )
            })
            .collect();
        let wire = Wire::from_iter(edges);
        Ok(self.store(TruckShape::Wire { wire, closed }))
    }

    fn make_face(&mut self, wire: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        let wire = match self.get(wire)? {
            TruckShape::Wire { wire, closed: true } => wire.clone(),
            TruckShape::Wire { .. } => return Err(KernelError::invalid("make_face", "wire is not closed")),
            other => {
                return Err(KernelError::WrongKind {
                    operation: "make_face",
                    expected: ShapeKind::Wire,
                    actual: other.kind(),
                })
            }
        };
        let face = builder::try_attach_plane(&[wire])
            .map_err(|e| KernelError::failed("make_face", format!("planar face: {}", e)))?;
        Ok(self.store(TruckShape::Face(face)))
    }

    fn make_box(&mut self, origin: [f64; 3], size: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        if size.iter().any(|&s| !(s > 0.0)) {
            return Err(KernelError::invalid("make_box", "dimensions must be positive"));
        }
        let solid = primitives::make_box(origin, size);
        Ok(self.store(TruckShape::Solid(solid)))
    }

    fn make_cylinder(&mut self, origin: [f64; 3], radius: f64, height: f64) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        if !(radius > 0.0 && height > 0.0) {
            return Err(KernelError::invalid("make_cylinder", "radius and height must be positive"));
        }
        let solid = primitives::make_cylinder(origin, radius, height)?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    fn make_sphere(&mut self, center: [f64; 3], radius: f64) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        if !(radius > 0.0) {
            return Err(KernelError::invalid("make_sphere", "radius must be positive"));
        }
        let solid = primitives::make_sphere(center, radius)?;
        Ok(self.store(TruckShape::Solid(solid)))
    }

    fn make_cone(&mut self, _: [f64; 3], _: f64, _: f64, _: f64) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        Err(KernelError::NotSupported { operation: "make_cone" })
    }

    fn translate(&mut self, shape: ShapeHandle, offset: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        self.mapped(shape, Matrix4::from_translation(vec3(offset)), false)
    }

    fn rotate(
        &mut self,
        shape: ShapeHandle,
        origin: [f64; 3],
        axis: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        let axis = unit_axis("rotate", axis)?;
        let o = vec3(origin);
        let matrix = Matrix4::from_translation(o)
            * Matrix4::from_axis_angle(axis, Rad(angle))
            * Matrix4::from_translation(-o);
        self.mapped(shape, matrix, false)
    }

    fn scale(&mut self, shape: ShapeHandle, origin: [f64; 3], factor: f64) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        if !(factor > 0.0) {
            return Err(KernelError::invalid("scale", "factor must be positive"));
        }
        let o = vec3(origin);
        let matrix = Matrix4::from_translation(o) * Matrix4::from_scale(factor) * Matrix4::from_translation(-o);
        self.mapped(shape, matrix, false)
    }

    fn mirror(
        &mut self,
        shape: ShapeHandle,
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
    ) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        let n = unit_axis("mirror", plane_normal)?;
        let o = vec3(plane_origin);
        // Householder reflection I - 2nnᵀ about the plane through the origin.
        #[rustfmt::skip]
        let reflect = Matrix4::new(
            1.0 - 2.0 * n.x * n.x, -2.0 * n.x * n.y, -2.0 * n.x * n.z, 0.0,
            -2.0 * n.y * n.x, 1.0 - 2.0 * n.y * n.y, -2.0 * n.y * n.z, 0.0,
            -2.0 * n.z * n.x, -2.0 * n.z * n.y, 1.0 - 2.0 * n.z * n.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let matrix = Matrix4::from_translation(o) * reflect * Matrix4::from_translation(-o);
        self.mapped(shape, matrix, true)
    }

    fn extrude(&mut self, face: ShapeHandle, vector: [f64; 3]) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        let v = vec3(vector);
        if v.magnitude() < 1e-12 {
            return Err(KernelError::invalid("extrude", "extrusion vector has zero length"));
        }
        let solid = builder::tsweep(self.face(face, "extrude")?, v);
        Ok(self.store(TruckShape::Solid(solid)))
    }

    fn revolve(
        &mut self,
        face: ShapeHandle,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        let axis = unit_axis("revolve", axis_direction)?;
        let solid = builder::rsweep(self.face(face, "revolve")?, point3(axis_origin), axis, Rad(angle));
        Ok(self.store(TruckShape::Solid(solid)))
    }

    fn sweep(&mut self, _: ShapeHandle, _: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        Err(KernelError::NotSupported { operation: "sweep" })
    }

    fn loft(&mut self, _: &[ShapeHandle]) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        Err(KernelError::NotSupported { operation: "loft" })
    }

    fn fuse(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.boolean("fuse", a, b)
    }

    fn cut(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.boolean("cut", a, b)
    }

    fn intersect(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError> {
        self.boolean("intersect", a, b)
    }

    fn fillet(&mut self, _: ShapeHandle, _: &[usize], _: f64) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        Err(KernelError::NotSupported { operation: "fillet" })
    }

    fn chamfer(&mut self, _: ShapeHandle, _: &[usize], _: f64) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        Err(KernelError::NotSupported { operation: "chamfer" })
    }

    fn shell(&mut self, _: ShapeHandle, _: &[usize], _: f64) -> Result<ShapeHandle, KernelError> {
        self.stats.calls += 1;
        Err(KernelError::NotSupported { operation: "shell" })
    }

    fn faces(&self, shape: ShapeHandle) -> Result<Vec<FaceInfo>, KernelError> {
        Ok(tessellation::face_infos(self.solid(shape, "faces")?, MEASURE_TOLERANCE))
    }

    fn edges(&self, shape: ShapeHandle) -> Result<Vec<EdgeInfo>, KernelError> {
        Ok(tessellation::edge_infos(self.solid(shape, "edges")?, MEASURE_TOLERANCE))
    }

    fn volume(&self, shape: ShapeHandle) -> Result<f64, KernelError> {
        match self.get(shape)? {
            TruckShape::Solid(s) => {
                let mesh = tessellation::tessellate_solid(s, MEASURE_TOLERANCE)?;
                Ok(crate::measure::mesh_volume(&mesh))
            }
            _ => Ok(0.0),
        }
    }

    fn mesh(&mut self, shape: ShapeHandle, deflection: f64) -> Result<Mesh, KernelError> {
        if !(deflection > 0.0) {
            return Err(KernelError::invalid("mesh", "deflection must be positive"));
        }
        tessellation::tessellate_solid(self.solid(shape, "mesh")?, deflection)
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
