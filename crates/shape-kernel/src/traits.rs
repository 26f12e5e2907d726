use crate::types::*;

/// The geometry kernel consumed by the rebuild engine.
///
/// Every shape-producing call returns a fresh handle and leaves its inputs
/// untouched; the caller pairs every handle it no longer needs with exactly
/// one `free_shape`. Angles are in radians.
pub trait Kernel {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Build a polyline wire through `points`, closing it when `closed`.
    fn make_polygon(&mut self, points: &[[f64; 3]], closed: bool) -> Result<ShapeHandle, KernelError>;

    /// Fill a closed planar wire.
    fn make_face(&mut self, wire: ShapeHandle) -> Result<ShapeHandle, KernelError>;

    fn make_box(&mut self, origin: [f64; 3], size: [f64; 3]) -> Result<ShapeHandle, KernelError>;

    /// Cylinder with its base centered at `origin`, extending along +Z.
    fn make_cylinder(
        &mut self,
        origin: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<ShapeHandle, KernelError>;

    fn make_sphere(&mut self, center: [f64; 3], radius: f64) -> Result<ShapeHandle, KernelError>;

    /// Truncated cone with its base centered at `origin`, extending along +Z.
    fn make_cone(
        &mut self,
        origin: [f64; 3],
        bottom_radius: f64,
        top_radius: f64,
        height: f64,
    ) -> Result<ShapeHandle, KernelError>;

    fn translate(&mut self, shape: ShapeHandle, offset: [f64; 3]) -> Result<ShapeHandle, KernelError>;

    fn rotate(
        &mut self,
        shape: ShapeHandle,
        origin: [f64; 3],
        axis: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Uniform scale about `origin`.
    fn scale(&mut self, shape: ShapeHandle, origin: [f64; 3], factor: f64) -> Result<ShapeHandle, KernelError>;

    /// Reflect across the plane through `plane_origin` with normal `plane_normal`.
    fn mirror(
        &mut self,
        shape: ShapeHandle,
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
    ) -> Result<ShapeHandle, KernelError>;

    /// Sweep a face along a straight vector into a solid.
    fn extrude(&mut self, face: ShapeHandle, vector: [f64; 3]) -> Result<ShapeHandle, KernelError>;

    fn revolve(
        &mut self,
        face: ShapeHandle,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<ShapeHandle, KernelError>;

    /// Sweep a face along an open path wire.
    fn sweep(&mut self, face: ShapeHandle, path: ShapeHandle) -> Result<ShapeHandle, KernelError>;

    /// Loft through two or more closed section wires or faces.
    fn loft(&mut self, sections: &[ShapeHandle]) -> Result<ShapeHandle, KernelError>;

    fn fuse(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError>;

    /// `a` minus `b`.
    fn cut(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError>;

    fn intersect(&mut self, a: ShapeHandle, b: ShapeHandle) -> Result<ShapeHandle, KernelError>;

    /// Round the edges at the given enumeration indices.
    fn fillet(&mut self, shape: ShapeHandle, edges: &[usize], radius: f64) -> Result<ShapeHandle, KernelError>;

    fn chamfer(&mut self, shape: ShapeHandle, edges: &[usize], distance: f64) -> Result<ShapeHandle, KernelError>;

    /// Hollow a solid, opening the faces at the given enumeration indices.
    fn shell(&mut self, shape: ShapeHandle, faces: &[usize], thickness: f64) -> Result<ShapeHandle, KernelError>;

    fn faces(&self, shape: ShapeHandle) -> Result<Vec<FaceInfo>, KernelError>;

    fn edges(&self, shape: ShapeHandle) -> Result<Vec<EdgeInfo>, KernelError>;

    fn volume(&self, shape: ShapeHandle) -> Result<f64, KernelError>;

    fn mesh(&mut self, shape: ShapeHandle, deflection: f64) -> Result<Mesh, KernelError>;

    /// Release a handle. Idempotent: unknown or already freed handles return `false`.
    fn free_shape(&mut self, handle: ShapeHandle) -> bool;

    fn live_shape_count(&self) -> usize;

    fn stats(&self) -> KernelStats;
}
