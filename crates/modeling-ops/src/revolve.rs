use history_types::length;
use shape_kernel::{Kernel, ShapeHandle};

use crate::profile::{region_faces, sweep_regions};
use crate::scratch::Scratch;
use crate::types::{OpError, PlacedSketch};

/// Revolve every region of a sketch about an axis.
pub fn execute_revolve(
    kernel: &mut dyn Kernel,
    placed: PlacedSketch,
    axis_origin: [f64; 3],
    axis_direction: [f64; 3],
    angle_deg: f64,
) -> Result<ShapeHandle, OpError> {
    if !angle_deg.is_finite() || angle_deg.abs() < 1e-9 || angle_deg.abs() > 360.0 {
        return Err(OpError::invalid(format!(
            "revolve angle must be in (0, 360] degrees, got {}",
            angle_deg
        )));
    }
    if length(axis_direction) < 1e-12 {
        return Err(OpError::invalid("revolve axis has zero length"));
    }
    let angle = angle_deg.to_radians();

    let mut s = Scratch::new(kernel);
    let regions = region_faces(&mut s, placed)?;
    let solid = sweep_regions(&mut s, &regions, |s, face| {
        s.run(|k| k.revolve(face, axis_origin, axis_direction, angle))
    })?;
    Ok(s.keep(solid))
}
