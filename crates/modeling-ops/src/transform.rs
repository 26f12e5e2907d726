use history_types::length;
use shape_kernel::{Kernel, ShapeHandle};

use crate::scratch::Scratch;
use crate::types::{require_positive, OpError, TransformParams};

/// Scale about the world origin, rotate about the world origin, then translate.
/// Always returns a new handle, even for the identity.
pub fn execute_transform(
    kernel: &mut dyn Kernel,
    target: ShapeHandle,
    params: &TransformParams,
) -> Result<ShapeHandle, OpError> {
    let scale = require_positive("scale", params.scale)?;
    if !params.rotation_deg.is_finite() {
        return Err(OpError::invalid("rotation angle is not finite"));
    }
    let rotates = params.rotation_deg.abs() > 1e-12;
    if rotates && length(params.rotation_axis) < 1e-12 {
        return Err(OpError::invalid("rotation axis has zero length"));
    }
    if params.translation.iter().any(|c| !c.is_finite()) {
        return Err(OpError::invalid("translation is not finite"));
    }

    let mut s = Scratch::new(kernel);
    let mut current = target;
    if (scale - 1.0).abs() > 1e-12 {
        current = s.run(|k| k.scale(current, [0.0; 3], scale))?;
    }
    if rotates {
        let angle = params.rotation_deg.to_radians();
        current = s.run(|k| k.rotate(current, [0.0; 3], params.rotation_axis, angle))?;
    }
    let moved = s.run(|k| k.translate(current, params.translation))?;
    Ok(s.keep(moved))
}
