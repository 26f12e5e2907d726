//! Tessellation and topology sampling for truck solids.

use std::collections::HashSet;

use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};
use truck_modeling::{BoundedCurve, ParameterDivision1D};

use crate::measure;
use crate::types::*;

type TruckSolid = truck_modeling::Solid;

fn push_mesh(out: &mut Mesh, face_mesh: &PolygonMesh) {
    let base_vertex = out.vertex_count() as u32;
    let positions = face_mesh.positions();
    let normals = face_mesh.normals();

    for pos in positions {
        out.positions.extend([pos[0] as f32, pos[1] as f32, pos[2] as f32]);
    }
    if normals.len() == positions.len() {
        for n in normals {
            out.normals.extend([n[0] as f32, n[1] as f32, n[2] as f32]);
        }
    } else {
        for _ in positions {
            out.normals.extend([0.0, 0.0, 1.0]);
        }
    }
    for tri in face_mesh.tri_faces() {
        for v in tri.iter() {
            out.indices.push(v.pos as u32 + base_vertex);
        }
    }
}

/// One mesh per face, in the solid's face enumeration order.
pub fn face_meshes(solid: &TruckSolid, tolerance: f64) -> Vec<Mesh> {
    let meshed = solid.triangulation(tolerance);
    let mut out = Vec::new();
    for shell in meshed.boundaries().iter() {
        for face in shell.face_iter() {
            let mut mesh = Mesh::default();
            if let Some(mut face_mesh) = face.surface() {
                if !face.orientation() {
                    face_mesh.invert();
                }
                push_mesh(&mut mesh, &face_mesh);
            }
            out.push(mesh);
        }
    }
    out
}

/// Tessellate a solid into one merged mesh.
pub fn tessellate_solid(solid: &TruckSolid, tolerance: f64) -> Result<Mesh, KernelError> {
    let mut mesh = Mesh::default();
    for face_mesh in face_meshes(solid, tolerance) {
        let base = mesh.vertex_count() as u32;
        mesh.positions.extend(face_mesh.positions);
        mesh.normals.extend(face_mesh.normals);
        mesh.indices.extend(face_mesh.indices.iter().map(|i| i + base));
    }
    if mesh.is_empty() {
        // Some faces come back without a surface mesh; fall back to the merged polygon.
        let merged = solid.triangulation(tolerance).to_polygon();
        push_mesh(&mut mesh, &merged);
    }
    if mesh.is_empty() {
        return Err(KernelError::failed("mesh", "tessellation produced no triangles"));
    }
    Ok(mesh)
}

/// Area, area-weighted center and average normal of each face.
pub fn face_infos(solid: &TruckSolid, tolerance: f64) -> Vec<FaceInfo> {
    face_meshes(solid, tolerance)
        .iter()
        .enumerate()
        .map(|(index, mesh)| {
            let mut center = [0.0; 3];
            let mut normal = [0.0; 3];
            let mut area = 0.0;
            for tri in mesh.indices.chunks_exact(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| vertex(mesh, i));
                let n = history_types::cross(measure::sub(b, a), measure::sub(c, a));
                let tri_area = history_types::length(n) / 2.0;
                for k in 0..3 {
                    center[k] += tri_area * (a[k] + b[k] + c[k]) / 3.0;
                    normal[k] += n[k];
                }
                area += tri_area;
            }
            if area > 0.0 {
                center = measure::mul(center, 1.0 / area);
            }
            FaceInfo {
                index,
                center,
                normal: history_types::normalize(normal),
                area,
            }
        })
        .collect()
}

/// Unique edges with their sampled length and midpoint.
pub fn edge_infos(solid: &TruckSolid, tolerance: f64) -> Vec<EdgeInfo> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for shell in solid.boundaries().iter() {
        for edge in shell.edge_iter() {
            if !seen.insert(edge.id()) {
                continue;
            }
            let curve = edge.oriented_curve();
            let range = curve.range_tuple();
            let (_params, points) = curve.parameter_division(range, tolerance);
            let pts: Vec<[f64; 3]> = points.iter().map(|p| [p[0], p[1], p[2]]).collect();
            let midpoint = match pts.as_slice() {
                [] => [0.0; 3],
                [a, b] => [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0],
                all => all[all.len() / 2],
            };
            out.push(EdgeInfo {
                index: out.len(),
                midpoint,
                length: measure::polyline_length(&pts),
            });
        }
    }
    out
}

fn vertex(mesh: &Mesh, index: u32) -> [f64; 3] {
    let i = index as usize * 3;
    [
        f64::from(mesh.positions[i]),
        f64::from(mesh.positions[i + 1]),
        f64::from(mesh.positions[i + 2]),
    ]
}
