//! Mutations of the op history. Every mutation either succeeds or leaves the
//! studio untouched.

use std::collections::{BTreeMap, HashSet};

use history_types::{OpId, SketchId};

use crate::references::referenced_entities;
use crate::studio::{entity_position_in, PartStudio};
use crate::types::{EngineError, EntityRef, Op, OpKind, OpNode, OpPatch};

impl PartStudio {
    /// Check that `kind`, sitting at `position` in `order`, only references
    /// existing entities placed strictly before it.
    fn check_references(
        &self,
        op: OpId,
        kind: &OpKind,
        position: usize,
        order: &[OpId],
    ) -> Result<(), EngineError> {
        for entity in referenced_entities(kind) {
            let reference_position = match entity_position_in(self, order, entity) {
                Some(p) => p,
                None => {
                    return Err(match entity {
                        EntityRef::Sketch(id) => EngineError::SketchNotFound { id },
                        EntityRef::Op(id) => EngineError::OpNotFound { id },
                    })
                }
            };
            if reference_position >= position as i64 {
                return Err(EngineError::ForwardReferenceViolation {
                    op,
                    reference: entity,
                    position: position as i64,
                    reference_position,
                });
            }
        }
        Ok(())
    }

    /// Placing `sketch` at `position` must not land it at or after an op that uses it.
    fn check_placement(&self, op: OpId, sketch: SketchId, position: usize, order: &[OpId]) -> Result<(), EngineError> {
        if !self.sketches.contains_key(&sketch) {
            return Err(EngineError::SketchNotFound { id: sketch });
        }
        if let Some(by) = self.sketch_op(sketch).filter(|by| *by != op) {
            return Err(EngineError::SketchAlreadyPlaced { sketch, by });
        }
        for (p, user) in order.iter().enumerate() {
            let Some(node) = self.op_graph.get(user) else {
                continue;
            };
            if *user != op && p <= position && referenced_entities(&node.op.kind).contains(&EntityRef::Sketch(sketch)) {
                return Err(EngineError::ForwardReferenceViolation {
                    op: *user,
                    reference: EntityRef::Sketch(sketch),
                    position: p as i64,
                    reference_position: position as i64,
                });
            }
        }
        Ok(())
    }

    /// Insert `op` at `at_index` (clamped to the end of the history).
    pub fn insert_op(&mut self, op: Op, at_index: usize) -> Result<OpId, EngineError> {
        if self.op_graph.contains_key(&op.id) {
            return Err(EngineError::DuplicateOp { id: op.id });
        }
        let at = at_index.min(self.op_order.len());
        let mut order = self.op_order.clone();
        order.insert(at, op.id);
        self.check_references(op.id, &op.kind, at, &order)?;
        if let Some(sketch) = op.kind.defined_sketch() {
            self.check_placement(op.id, sketch, at, &order)?;
        }

        tracing::debug!(op = %op.id, kind = op.kind.tag(), at, "insert op");
        let id = op.id;
        self.op_order = order;
        self.op_graph.insert(id, OpNode::new(op));
        Ok(id)
    }

    /// Remove an op. Removing a `Sketch` op also removes its sketch. Ops that
    /// referenced the removed entity fail on the next rebuild until edited.
    pub fn delete_op(&mut self, id: OpId) -> Result<Op, EngineError> {
        let node = self.op_graph.remove(&id).ok_or(EngineError::OpNotFound { id })?;
        self.op_order.retain(|o| *o != id);
        if let Some(sketch) = node.op.kind.defined_sketch() {
            self.sketches.remove(&sketch);
        }
        tracing::debug!(op = %id, kind = node.op.kind.tag(), "delete op");
        Ok(node.op)
    }

    /// Rename an op and/or replace its kind. A new kind is checked for
    /// forward references at the op's current position.
    pub fn update_op(&mut self, id: OpId, patch: OpPatch) -> Result<(), EngineError> {
        let position = self.position(id).ok_or(EngineError::OpNotFound { id })?;
        if let Some(kind) = &patch.kind {
            self.check_references(id, kind, position, &self.op_order)?;
            if let Some(sketch) = kind.defined_sketch() {
                self.check_placement(id, sketch, position, &self.op_order)?;
            }
        }
        let node = self.op_graph.get_mut(&id).ok_or(EngineError::OpNotFound { id })?;
        if let Some(name) = patch.name {
            node.op.name = name;
        }
        if let Some(kind) = patch.kind {
            node.op.kind = kind;
        }
        Ok(())
    }

    /// Move an op to `to_index` (clamped). Rejected if the op would land at
    /// or before one of its dependencies or at or after one of its dependents.
    pub fn move_op(&mut self, id: OpId, to_index: usize) -> Result<(), EngineError> {
        let from = self.position(id).ok_or(EngineError::OpNotFound { id })?;
        let to = to_index.min(self.op_order.len() - 1);
        if from == to {
            return Ok(());
        }
        let mut order = self.op_order.clone();
        order.remove(from);
        order.insert(to, id);

        for (p, op_id) in order.iter().enumerate() {
            let Some(node) = self.op_graph.get(op_id) else {
                continue;
            };
            for entity in referenced_entities(&node.op.kind) {
                // Dangling references are reported by rebuild, not here.
                let Some(reference_position) = entity_position_in(self, &order, entity) else {
                    continue;
                };
                if reference_position >= p as i64 {
                    return Err(EngineError::ForwardReferenceViolation {
                        op: *op_id,
                        reference: entity,
                        position: p as i64,
                        reference_position,
                    });
                }
            }
        }

        let old: BTreeMap<OpId, usize> = self.op_order.iter().enumerate().map(|(p, o)| (*o, p)).collect();
        self.op_order = order;
        let mut stale: Vec<OpId> = Vec::new();
        for (p, op_id) in self.op_order.iter().enumerate() {
            if old.get(op_id) == Some(&p) {
                continue;
            }
            if !self.dependencies(*op_id).is_empty() {
                stale.push(*op_id);
            }
        }
        let mut marked: HashSet<OpId> = HashSet::new();
        for op_id in stale {
            marked.insert(op_id);
            marked.extend(self.descendants(op_id));
        }
        for op_id in &marked {
            if let Some(node) = self.op_graph.get_mut(op_id) {
                node.stale = true;
            }
        }
        tracing::debug!(op = %id, from, to, stale = marked.len(), "move op");
        Ok(())
    }

    pub fn set_suppressed(&mut self, id: OpId, suppressed: bool) -> Result<(), EngineError> {
        let node = self.op_graph.get_mut(&id).ok_or(EngineError::OpNotFound { id })?;
        node.op.suppressed = suppressed;
        Ok(())
    }

    /// Ops `id` reads from directly, including the ops placing its sketches.
    pub fn dependencies(&self, id: OpId) -> Vec<OpId> {
        let Some(op) = self.op(id) else {
            return Vec::new();
        };
        referenced_entities(&op.kind)
            .into_iter()
            .filter_map(|entity| match entity {
                EntityRef::Op(r) => self.op_graph.contains_key(&r).then_some(r),
                EntityRef::Sketch(s) => self.sketch_op(s),
            })
            .collect()
    }

    /// Ops that read from `id` directly, in timeline order.
    pub fn dependents(&self, id: OpId) -> Vec<OpId> {
        self.op_order
            .iter()
            .copied()
            .filter(|o| self.dependencies(*o).contains(&id))
            .collect()
    }

    /// Every op downstream of `id`, in timeline order.
    pub fn descendants(&self, id: OpId) -> Vec<OpId> {
        let Some(start) = self.position(id) else {
            return Vec::new();
        };
        let mut reached: HashSet<OpId> = HashSet::from([id]);
        let mut out = Vec::new();
        for o in &self.op_order[start + 1..] {
            if self.dependencies(*o).iter().any(|d| reached.contains(d)) {
                reached.insert(*o);
                out.push(*o);
            }
        }
        out
    }

    /// Check the structural invariants of a studio, e.g. after loading.
    /// Dangling references are allowed; forward references are not.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.op_order.len() != self.op_graph.len() {
            return Err(EngineError::InvalidDocument(format!(
                "op order lists {} ops but the graph holds {}",
                self.op_order.len(),
                self.op_graph.len()
            )));
        }
        let mut seen = HashSet::new();
        for id in &self.op_order {
            if !seen.insert(*id) {
                return Err(EngineError::InvalidDocument(format!("{} appears twice in op order", id)));
            }
            if !self.op_graph.contains_key(id) {
                return Err(EngineError::InvalidDocument(format!("{} is ordered but not in the graph", id)));
            }
        }
        for (key, node) in &self.op_graph {
            if *key != node.op.id {
                return Err(EngineError::InvalidDocument(format!(
                    "op stored under {} carries id {}",
                    key, node.op.id
                )));
            }
        }
        for (key, sketch) in &self.sketches {
            if *key != sketch.id {
                return Err(EngineError::InvalidDocument(format!(
                    "sketch stored under {} carries id {}",
                    key, sketch.id
                )));
            }
            if !self.planes.contains_key(&sketch.plane_id) {
                return Err(EngineError::PlaneNotFound { id: sketch.plane_id });
            }
        }
        let mut placed = HashSet::new();
        for (p, id) in self.op_order.iter().enumerate() {
            let node = &self.op_graph[id];
            if let Some(sketch) = node.op.kind.defined_sketch() {
                if !placed.insert(sketch) {
                    return Err(EngineError::InvalidDocument(format!("{} is placed twice", sketch)));
                }
            }
            for entity in referenced_entities(&node.op.kind) {
                if let Some(reference_position) = self.entity_position(entity) {
                    if reference_position >= p as i64 {
                        return Err(EngineError::ForwardReferenceViolation {
                            op: *id,
                            reference: entity,
                            position: p as i64,
                            reference_position,
                        });
                    }
                }
            }
        }
        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use history_types::{Scalar, Sketch};
    use modeling_ops::BooleanKind;

    fn box_op() -> Op {
        Op::new(
            "box",
            OpKind::Box {
                origin: [0.0; 3],
                dx: 1.0.into(),
                dy: 1.0.into(),
                dz: 1.0.into(),
            },
        )
    }

    fn fillet_of(target: OpId) -> Op {
        Op::new(
            "fillet",
            OpKind::Fillet {
                target,
                edges: modeling_ops::EdgeSelection::All,
                radius: Scalar::Value(0.1),
            },
        )
    }

    #[test]
    fn insert_before_dependency_is_rejected() {
        let mut studio = PartStudio::new("p");
        let a = studio.insert_op(box_op(), 0).unwrap();
        let before = studio.clone();
        let err = studio.insert_op(fillet_of(a), 0).unwrap_err();
        assert!(matches!(err, EngineError::ForwardReferenceViolation { .. }));
        assert_eq!(studio, before);
    }

    #[test]
    fn insert_index_is_clamped() {
        let mut studio = PartStudio::new("p");
        let a = studio.insert_op(box_op(), 99).unwrap();
        let f = studio.insert_op(fillet_of(a), 99).unwrap();
        assert_eq!(studio.op_order(), &[a, f]);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let mut studio = PartStudio::new("p");
        assert!(matches!(
            studio.insert_op(fillet_of(OpId::new()), 0),
            Err(EngineError::OpNotFound { .. })
        ));
        let extrude = Op::new(
            "e",
            OpKind::Extrude {
                sketch: SketchId::new(),
                depth: 1.0.into(),
                direction: None,
                symmetric: false,
            },
        );
        assert!(matches!(studio.insert_op(extrude, 0), Err(EngineError::SketchNotFound { .. })));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut studio = PartStudio::new("p");
        let op = box_op();
        studio.insert_op(op.clone(), 0).unwrap();
        assert!(matches!(studio.insert_op(op, 1), Err(EngineError::DuplicateOp { .. })));
    }

    #[test]
    fn sketch_cannot_be_placed_after_its_user() {
        let mut studio = PartStudio::new("p");
        let xy = studio.plane_by_name("XY").unwrap().id;
        let s = studio.add_sketch(Sketch::new("s", xy)).unwrap();
        let extrude = Op::new(
            "e",
            OpKind::Extrude {
                sketch: s,
                depth: 1.0.into(),
                direction: None,
                symmetric: false,
            },
        );
        studio.insert_op(extrude, 0).unwrap();
        let place = Op::new("s", OpKind::Sketch { sketch: s });
        assert!(matches!(
            studio.insert_op(place.clone(), 1),
            Err(EngineError::ForwardReferenceViolation { .. })
        ));
        studio.insert_op(place, 0).unwrap();
        assert_eq!(studio.entity_position(EntityRef::Sketch(s)), Some(0));
        let again = Op::new("s2", OpKind::Sketch { sketch: s });
        assert!(matches!(studio.insert_op(again, 0), Err(EngineError::SketchAlreadyPlaced { .. })));
    }

    #[test]
    fn move_respects_dependencies_and_marks_stale() {
        let mut studio = PartStudio::new("p");
        let a = studio.insert_op(box_op(), 0).unwrap();
        let b = studio.insert_op(box_op(), 1).unwrap();
        let f = studio.insert_op(fillet_of(a), 2).unwrap();

        assert!(matches!(studio.move_op(f, 0), Err(EngineError::ForwardReferenceViolation { .. })));
        assert!(matches!(studio.move_op(a, 2), Err(EngineError::ForwardReferenceViolation { .. })));

        studio.move_op(f, 1).unwrap();
        assert_eq!(studio.op_order(), &[a, f, b]);
        assert!(studio.node(f).unwrap().stale);
        assert!(!studio.node(a).unwrap().stale);
    }

    #[test]
    fn moving_an_independent_op_keeps_it_fresh() {
        let mut studio = PartStudio::new("p");
        let a = studio.insert_op(box_op(), 0).unwrap();
        let b = studio.insert_op(box_op(), 1).unwrap();
        studio.move_op(b, 0).unwrap();
        assert_eq!(studio.op_order(), &[b, a]);
        assert!(!studio.node(a).unwrap().stale);
        assert!(!studio.node(b).unwrap().stale);
    }

    #[test]
    fn descendants_are_transitive() {
        let mut studio = PartStudio::new("p");
        let a = studio.insert_op(box_op(), 0).unwrap();
        let b = studio.insert_op(box_op(), 1).unwrap();
        let f = studio.insert_op(fillet_of(a), 2).unwrap();
        let cut = studio
            .insert_op(
                Op::new(
                    "cut",
                    OpKind::Boolean {
                        kind: BooleanKind::Cut,
                        target: f,
                        tool: b,
                    },
                ),
                3,
            )
            .unwrap();
        assert_eq!(studio.descendants(a), vec![f, cut]);
        assert_eq!(studio.dependents(b), vec![cut]);
        assert_eq!(studio.dependencies(cut), vec![f, b]);
    }

    #[test]
    fn deleting_a_sketch_op_removes_the_sketch() {
        let mut studio = PartStudio::new("p");
        let xy = studio.plane_by_name("XY").unwrap().id;
        let s = studio.add_sketch(Sketch::new("s", xy)).unwrap();
        let place = studio.insert_op(Op::new("s", OpKind::Sketch { sketch: s }), 0).unwrap();
        studio.delete_op(place).unwrap();
        assert!(studio.sketch(s).is_none());
        assert!(studio.validate().is_ok());
    }

    #[test]
    fn rejected_update_leaves_op_unchanged() {
        let mut studio = PartStudio::new("p");
        let a = studio.insert_op(box_op(), 0).unwrap();
        let f = studio.insert_op(fillet_of(a), 1).unwrap();
        let before = studio.op(a).unwrap().clone();
        let patch = OpPatch {
            name: Some("renamed".into()),
            kind: Some(fillet_of(f).kind),
        };
        assert!(studio.update_op(a, patch).is_err());
        assert_eq!(studio.op(a), Some(&before));
    }
}
