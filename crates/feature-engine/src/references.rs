use crate::types::{EntityRef, OpKind};

/// Every sketch or op an operation reads from, in field order, without duplicates.
///
/// This is the only adjacency function in the engine: forward-reference
/// checks, fingerprints and failure propagation all go through it.
pub fn referenced_entities(kind: &OpKind) -> Vec<EntityRef> {
    let mut refs = match kind {
        OpKind::Sketch { .. }
        | OpKind::Box { .. }
        | OpKind::Cylinder { .. }
        | OpKind::Sphere { .. }
        | OpKind::Cone { .. } => Vec::new(),
        OpKind::Extrude { sketch, .. } | OpKind::Revolve { sketch, .. } => vec![EntityRef::Sketch(*sketch)],
        OpKind::Sweep { profile, path } => vec![EntityRef::Sketch(*profile), EntityRef::Sketch(*path)],
        OpKind::Loft { sections } => sections.iter().map(|s| EntityRef::Sketch(*s)).collect(),
        OpKind::Boolean { target, tool, .. } => vec![EntityRef::Op(*target), EntityRef::Op(*tool)],
        OpKind::Fillet { target, .. }
        | OpKind::Chamfer { target, .. }
        | OpKind::Shell { target, .. }
        | OpKind::Pattern { target, .. }
        | OpKind::Mirror { target, .. }
        | OpKind::Transform { target, .. } => vec![EntityRef::Op(*target)],
    };
    let mut seen = Vec::with_capacity(refs.len());
    refs.retain(|r| {
        if seen.contains(r) {
            false
        } else {
            seen.push(*r);
            true
        }
    });
    refs
}
