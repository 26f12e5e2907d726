//! Primitive solids built from truck's sweep API.
//!
//! truck has no built-in box/cylinder/sphere; everything is successive sweeps.

use std::f64::consts::PI;
use truck_modeling::builder;
use truck_modeling::topology::{Edge, Solid, Wire};
use truck_modeling::{Point3, Rad, Vector3};

use crate::types::KernelError;

fn point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

/// Box solid from `origin` extending by `size` along +X, +Y, +Z.
pub fn make_box(origin: [f64; 3], size: [f64; 3]) -> Solid {
    let v = builder::vertex(point(origin));
    let edge = builder::tsweep(&v, Vector3::new(size[0], 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, size[1], 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, size[2]))
}

/// Cylinder: circle wire → face → translational sweep along +Z.
pub fn make_cylinder(origin: [f64; 3], radius: f64, height: f64) -> Result<Solid, KernelError> {
    let center = point(origin);
    let v = builder::vertex(Point3::new(origin[0] + radius, origin[1], origin[2]));
    let wire = builder::rsweep(&v, center, Vector3::unit_z(), Rad(2.0 * PI));
    let face = builder::try_attach_plane(&[wire])
        .map_err(|e| KernelError::failed("make_cylinder", format!("circular face: {}", e)))?;
    Ok(builder::tsweep(&face, Vector3::new(0.0, 0.0, height)))
}

/// Sphere: half-disc face in the XZ plane revolved a full turn about Z.
pub fn make_sphere(center: [f64; 3], radius: f64) -> Result<Solid, KernelError> {
    let c = point(center);
    let v_right = builder::vertex(Point3::new(center[0] + radius, center[1], center[2]));
    let arc_wire = builder::rsweep(&v_right, c, Vector3::unit_y(), Rad(PI));

    let v_left = builder::vertex(Point3::new(center[0] - radius, center[1], center[2]));
    let line_edge: Edge = builder::tsweep(&v_left, Vector3::new(2.0 * radius, 0.0, 0.0));

    let mut edges: Vec<Edge> = arc_wire.edge_iter().cloned().collect();
    edges.push(line_edge);
    let closed_wire = Wire::from_iter(edges);

    let face = builder::try_attach_plane(&[closed_wire])
        .map_err(|e| KernelError::failed("make_sphere", format!("half-disc face: {}", e)))?;
    Ok(builder::rsweep(&face, c, Vector3::unit_z(), Rad(2.0 * PI)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn box_topology_satisfies_euler() {
        let solid = make_box([0.0; 3], [1.0, 2.0, 3.0]);
        let boundaries = solid.boundaries();
        assert_eq!(boundaries.len(), 1);

        let shell = &boundaries[0];
        let faces = shell.face_iter().count();
        let edges: HashSet<_> = shell.edge_iter().map(|e| e.id()).collect();
        let verts: HashSet<_> = shell.vertex_iter().map(|v| v.id()).collect();

        assert_eq!(faces, 6);
        assert_eq!(edges.len(), 12);
        assert_eq!(verts.len(), 8);
        assert_eq!(verts.len() as i64 - edges.len() as i64 + faces as i64, 2);
    }

    #[test]
    fn box_respects_origin() {
        let solid = make_box([1.0, 1.0, 1.0], [2.0, 3.0, 4.0]);
        let mut min = [f64::MAX; 3];
        let mut max = [f64::MIN; 3];
        for v in solid.boundaries()[0].vertex_iter() {
            let p = v.point();
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        assert!((min[0] - 1.0).abs() < 1e-10);
        assert!((max[2] - 5.0).abs() < 1e-10);
    }

    #[test]
    fn cylinder_has_caps_and_side() {
        let solid = make_cylinder([0.0; 3], 1.0, 2.0).unwrap();
        assert!(solid.boundaries()[0].face_iter().count() >= 3);
    }
}
