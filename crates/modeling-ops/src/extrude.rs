use history_types::{length, normalize};
use shape_kernel::{Kernel, ShapeHandle};

use crate::profile::{region_faces, sweep_regions};
use crate::scratch::Scratch;
use crate::types::{ExtrudeParams, OpError, PlacedSketch};

/// Extrude every region of a sketch along a straight vector.
///
/// Negative depths extrude against the direction; symmetric extrusions
/// start `depth / 2` behind the sketch plane.
pub fn execute_extrude(
    kernel: &mut dyn Kernel,
    placed: PlacedSketch,
    params: &ExtrudeParams,
) -> Result<ShapeHandle, OpError> {
    if !params.depth.is_finite() || params.depth.abs() < 1e-12 {
        return Err(OpError::invalid(format!("extrude depth must be non-zero, got {}", params.depth)));
    }
    let direction = params.direction.unwrap_or(placed.plane.normal);
    if length(direction) < 1e-12 {
        return Err(OpError::invalid("extrude direction has zero length"));
    }
    let d = normalize(direction);
    let vector = d.map(|c| c * params.depth);
    let offset = vector.map(|c| -c / 2.0);

    let mut s = Scratch::new(kernel);
    let regions = region_faces(&mut s, placed)?;
    let solid = sweep_regions(&mut s, &regions, |s, face| {
        let start = if params.symmetric {
            s.run(|k| k.translate(face, offset))?
        } else {
            face
        };
        s.run(|k| k.extrude(start, vector))
    })?;
    Ok(s.keep(solid))
}
