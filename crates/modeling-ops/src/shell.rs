use shape_kernel::{Kernel, ShapeHandle};

use crate::types::{require_positive, OpError};

/// Hollow out a solid, opening the faces at the given indices.
pub fn execute_shell(
    kernel: &mut dyn Kernel,
    target: ShapeHandle,
    faces: &[usize],
    thickness: f64,
) -> Result<ShapeHandle, OpError> {
    let thickness = require_positive("shell thickness", thickness)?;
    let count = kernel.faces(target)?.len();
    if let Some(bad) = faces.iter().find(|&&f| f >= count) {
        return Err(OpError::invalid(format!(
            "face index {} out of range, target has {} faces",
            bad, count
        )));
    }
    Ok(kernel.shell(target, faces, thickness)?)
}
