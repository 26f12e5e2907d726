use history_types::{length, normalize};
use shape_kernel::{Kernel, ShapeHandle};

use crate::scratch::Scratch;
use crate::types::{Layout, OpError};

/// Fuse `count` copies of a solid laid out linearly or about an axis.
/// The first instance sits at the original position.
pub fn execute_pattern(
    kernel: &mut dyn Kernel,
    target: ShapeHandle,
    layout: &Layout,
    max_count: u32,
) -> Result<ShapeHandle, OpError> {
    let count = match *layout {
        Layout::Linear { count, .. } | Layout::Circular { count, .. } => count,
    };
    if count == 0 || count > max_count {
        return Err(OpError::invalid(format!(
            "pattern count must be in 1..={}, got {}",
            max_count, count
        )));
    }

    let mut s = Scratch::new(kernel);
    let mut acc = target;
    match *layout {
        Layout::Linear { direction, spacing, .. } => {
            if length(direction) < 1e-12 || !spacing.is_finite() {
                return Err(OpError::invalid("linear pattern needs a direction and a finite spacing"));
            }
            let d = normalize(direction);
            for i in 1..count {
                let offset = d.map(|c| c * spacing * f64::from(i));
                let copy = s.run(|k| k.translate(target, offset))?;
                acc = s.run(|k| k.fuse(acc, copy))?;
            }
        }
        Layout::Circular {
            axis_origin,
            axis_direction,
            total_angle_deg,
            ..
        } => {
            if length(axis_direction) < 1e-12 || !total_angle_deg.is_finite() || total_angle_deg.abs() < 1e-9 {
                return Err(OpError::invalid("circular pattern needs an axis and a non-zero angle"));
            }
            // A full turn spaces instances evenly without doubling the first.
            let step = if total_angle_deg.abs() >= 360.0 - 1e-9 {
                total_angle_deg / f64::from(count)
            } else {
                total_angle_deg / f64::from(count.max(2) - 1)
            };
            for i in 1..count {
                let angle = (step * f64::from(i)).to_radians();
                let copy = s.run(|k| k.rotate(target, axis_origin, axis_direction, angle))?;
                acc = s.run(|k| k.fuse(acc, copy))?;
            }
        }
    }
    if acc == target {
        acc = s.run(|k| k.translate(target, [0.0; 3]))?;
    }
    tracing::debug!(count, "pattern built");
    Ok(s.keep(acc))
}

/// Reflect a solid across a plane, optionally fused with the original.
pub fn execute_mirror(
    kernel: &mut dyn Kernel,
    target: ShapeHandle,
    plane_origin: [f64; 3],
    plane_normal: [f64; 3],
    keep_original: bool,
) -> Result<ShapeHandle, OpError> {
    if length(plane_normal) < 1e-12 {
        return Err(OpError::invalid("mirror plane normal has zero length"));
    }
    let mut s = Scratch::new(kernel);
    let image = s.run(|k| k.mirror(target, plane_origin, plane_normal))?;
    let result = if keep_original {
        s.run(|k| k.fuse(target, image))?
    } else {
        image
    };
    Ok(s.keep(result))
}
