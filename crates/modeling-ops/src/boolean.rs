use shape_kernel::{Kernel, ShapeHandle};

use crate::types::{BooleanKind, OpError};

/// Combine two solids. Neither input is consumed.
pub fn execute_boolean(
    kernel: &mut dyn Kernel,
    kind: BooleanKind,
    target: ShapeHandle,
    tool: ShapeHandle,
) -> Result<ShapeHandle, OpError> {
    let handle = match kind {
        BooleanKind::Fuse => kernel.fuse(target, tool)?,
        BooleanKind::Cut => kernel.cut(target, tool)?,
        BooleanKind::Intersect => kernel.intersect(target, tool)?,
    };
    Ok(handle)
}
