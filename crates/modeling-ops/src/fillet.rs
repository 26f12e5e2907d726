use shape_kernel::{Kernel, ShapeHandle};

use crate::types::{require_positive, EdgeSelection, OpError};

/// Resolve a selection against the current edge enumeration of `target`.
pub(crate) fn resolve_edges(
    kernel: &dyn Kernel,
    target: ShapeHandle,
    selection: &EdgeSelection,
) -> Result<Vec<usize>, OpError> {
    let count = kernel.edges(target)?.len();
    let edges = match selection {
        EdgeSelection::All => (0..count).collect(),
        EdgeSelection::Indices(indices) => indices.clone(),
    };
    if edges.is_empty() {
        return Err(OpError::invalid("no edges selected"));
    }
    if let Some(bad) = edges.iter().find(|&&e| e >= count) {
        return Err(OpError::invalid(format!(
            "edge index {} out of range, target has {} edges",
            bad, count
        )));
    }
    Ok(edges)
}

/// Execute a fillet operation on the selected edges of a solid.
pub fn execute_fillet(
    kernel: &mut dyn Kernel,
    target: ShapeHandle,
    edges: &EdgeSelection,
    radius: f64,
) -> Result<ShapeHandle, OpError> {
    let radius = require_positive("fillet radius", radius)?;
    let edges = resolve_edges(kernel, target, edges)?;
    Ok(kernel.fillet(target, &edges, radius)?)
}
