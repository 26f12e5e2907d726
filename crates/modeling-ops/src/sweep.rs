use shape_kernel::{Kernel, ShapeHandle};

use crate::profile::{path_wire, region_faces, section_wire, sweep_regions};
use crate::scratch::Scratch;
use crate::types::{OpError, PlacedSketch};

/// Sweep the regions of `profile` along the open path drawn in `path`.
pub fn execute_sweep(
    kernel: &mut dyn Kernel,
    profile: PlacedSketch,
    path: PlacedSketch,
) -> Result<ShapeHandle, OpError> {
    let mut s = Scratch::new(kernel);
    let path = path_wire(&mut s, path)?;
    let regions = region_faces(&mut s, profile)?;
    let solid = sweep_regions(&mut s, &regions, |s, face| s.run(|k| k.sweep(face, path)))?;
    Ok(s.keep(solid))
}

/// Loft through two or more single-loop section sketches, in order.
pub fn execute_loft(kernel: &mut dyn Kernel, sections: &[PlacedSketch]) -> Result<ShapeHandle, OpError> {
    if sections.len() < 2 {
        return Err(OpError::invalid(format!(
            "loft needs at least two sections, got {}",
            sections.len()
        )));
    }
    let mut s = Scratch::new(kernel);
    let mut wires = Vec::with_capacity(sections.len());
    for section in sections {
        wires.push(section_wire(&mut s, *section)?);
    }
    let solid = s.run(|k| k.loft(&wires))?;
    Ok(s.keep(solid))
}
