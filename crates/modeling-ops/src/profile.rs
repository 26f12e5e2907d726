//! Turning solved sketches into kernel wires and faces.

use history_types::{Plane, Vec2};
use shape_kernel::{KernelError, ShapeHandle};
use sketch_solver::{extract_path, extract_regions, ProfileError};

use crate::scratch::Scratch;
use crate::types::{OpError, PlacedSketch};

/// Faces for one sketch region. Holes wind the same way as the outer face
/// so that sweeping them produces tools aligned with the body.
#[derive(Debug, Clone)]
pub struct RegionFaces {
    pub outer: ShapeHandle,
    pub holes: Vec<ShapeHandle>,
}

fn to_world(plane: &Plane, points: &[Vec2]) -> Vec<[f64; 3]> {
    points.iter().map(|p| plane.to_world(*p)).collect()
}

fn face_from_loop(s: &mut Scratch, plane: &Plane, points: &[Vec2]) -> Result<ShapeHandle, KernelError> {
    let world = to_world(plane, points);
    let wire = s.run(|k| k.make_polygon(&world, true))?;
    s.run(|k| k.make_face(wire))
}

/// One face per region of the sketch, holes as separate faces.
pub fn region_faces(s: &mut Scratch, placed: PlacedSketch) -> Result<Vec<RegionFaces>, OpError> {
    let mut out = Vec::new();
    for region in extract_regions(placed.sketch)? {
        let outer = face_from_loop(s, placed.plane, &region.outer)?;
        let mut holes = Vec::with_capacity(region.holes.len());
        for hole in &region.holes {
            let mut ccw = hole.clone();
            ccw.reverse();
            holes.push(face_from_loop(s, placed.plane, &ccw)?);
        }
        out.push(RegionFaces { outer, holes });
    }
    Ok(out)
}

/// Open wire along the sketch's single path.
pub fn path_wire(s: &mut Scratch, placed: PlacedSketch) -> Result<ShapeHandle, OpError> {
    let world = to_world(placed.plane, &extract_path(placed.sketch)?);
    Ok(s.run(|k| k.make_polygon(&world, false))?)
}

/// Closed wire for a loft section; the sketch must hold exactly one loop.
pub fn section_wire(s: &mut Scratch, placed: PlacedSketch) -> Result<ShapeHandle, OpError> {
    let regions = extract_regions(placed.sketch)?;
    let [region] = regions.as_slice() else {
        return Err(OpError::invalid(format!(
            "loft section '{}' must contain exactly one loop, found {}",
            placed.sketch.name,
            regions.len()
        )));
    };
    if !region.holes.is_empty() {
        return Err(OpError::invalid(format!(
            "loft section '{}' must not contain holes",
            placed.sketch.name
        )));
    }
    let world = to_world(placed.plane, &region.outer);
    Ok(s.run(|k| k.make_polygon(&world, true))?)
}

/// Sweep every region into a solid, cut its holes, and fuse the regions.
pub fn sweep_regions(
    s: &mut Scratch,
    regions: &[RegionFaces],
    mut sweep: impl FnMut(&mut Scratch, ShapeHandle) -> Result<ShapeHandle, KernelError>,
) -> Result<ShapeHandle, OpError> {
    let mut result: Option<ShapeHandle> = None;
    for region in regions {
        let mut solid = sweep(s, region.outer)?;
        for &hole in &region.holes {
            let tool = sweep(s, hole)?;
            solid = s.run(|k| k.cut(solid, tool))?;
        }
        result = Some(match result {
            None => solid,
            Some(acc) => s.run(|k| k.fuse(acc, solid))?,
        });
    }
    Ok(result.ok_or(ProfileError::NoClosedLoop)?)
}
