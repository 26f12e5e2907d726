use shape_kernel::{Kernel, ShapeHandle};

use crate::fillet::resolve_edges;
use crate::types::{require_positive, EdgeSelection, OpError};

/// Execute an equal-distance chamfer on the selected edges of a solid.
pub fn execute_chamfer(
    kernel: &mut dyn Kernel,
    target: ShapeHandle,
    edges: &EdgeSelection,
    distance: f64,
) -> Result<ShapeHandle, OpError> {
    let distance = require_positive("chamfer distance", distance)?;
    let edges = resolve_edges(kernel, target, edges)?;
    Ok(kernel.chamfer(target, &edges, distance)?)
}
