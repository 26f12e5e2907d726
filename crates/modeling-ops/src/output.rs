use shape_kernel::{Kernel, Mesh, ShapeHandle};

use crate::types::OpError;

/// A built shape with the mesh tessellated from that same handle.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub shape: ShapeHandle,
    pub mesh: Mesh,
}

/// Tessellate a freshly built shape. The handle is freed if meshing fails.
pub fn finish_build(kernel: &mut dyn Kernel, shape: ShapeHandle, deflection: f64) -> Result<BuildOutput, OpError> {
    match kernel.mesh(shape, deflection) {
        Ok(mesh) => Ok(BuildOutput { shape, mesh }),
        Err(e) => {
            kernel.free_shape(shape);
            Err(e.into())
        }
    }
}
