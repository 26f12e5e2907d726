use std::collections::BTreeMap;

use history_types::{OpId, Plane, PlaneId, Sketch, SketchId, StudioId};
use serde::{Deserialize, Serialize};

use crate::params::{ParamEnv, Unit};
use crate::types::{EngineError, EntityRef, NodeState, Op, OpNode};

/// Free-form document metadata carried with the studio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioMeta {
    pub description: String,
    /// Unit new length parameters default to.
    pub length_unit: Unit,
}

/// A part studio: planes, sketches, parameters and the ordered op history.
///
/// `op_graph` and `op_order` are only changed through the graph operations so
/// that every op references strictly earlier entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartStudio {
    pub id: StudioId,
    pub name: String,
    #[serde(with = "history_types::pairs")]
    pub planes: BTreeMap<PlaneId, Plane>,
    #[serde(with = "history_types::pairs")]
    pub sketches: BTreeMap<SketchId, Sketch>,
    #[serde(with = "history_types::pairs")]
    pub(crate) op_graph: BTreeMap<OpId, OpNode>,
    pub(crate) op_order: Vec<OpId>,
    pub params: ParamEnv,
    #[serde(default)]
    pub meta: StudioMeta,
}

impl PartStudio {
    /// An empty studio with the XY, XZ and YZ datum planes.
    pub fn new(name: impl Into<String>) -> Self {
        let planes = [Plane::xy(), Plane::xz(), Plane::yz()]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Self {
            id: StudioId::new(),
            name: name.into(),
            planes,
            sketches: BTreeMap::new(),
            op_graph: BTreeMap::new(),
            op_order: Vec::new(),
            params: ParamEnv::new(),
            meta: StudioMeta::default(),
        }
    }

    pub fn plane_by_name(&self, name: &str) -> Option<&Plane> {
        self.planes.values().find(|p| p.name == name)
    }

    pub fn add_plane(&mut self, plane: Plane) -> PlaneId {
        let id = plane.id;
        self.planes.insert(id, plane);
        id
    }

    /// Register a sketch. It is usable by ops right away; placing it in the
    /// timeline with a `Sketch` op is optional.
    pub fn add_sketch(&mut self, sketch: Sketch) -> Result<SketchId, EngineError> {
        if !self.planes.contains_key(&sketch.plane_id) {
            return Err(EngineError::PlaneNotFound { id: sketch.plane_id });
        }
        let id = sketch.id;
        self.sketches.insert(id, sketch);
        Ok(id)
    }

    pub fn sketch(&self, id: SketchId) -> Option<&Sketch> {
        self.sketches.get(&id)
    }

    /// Edits through this reference are picked up by the next rebuild.
    pub fn sketch_mut(&mut self, id: SketchId) -> Option<&mut Sketch> {
        self.sketches.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.op_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.op_order.is_empty()
    }

    pub fn op_order(&self) -> &[OpId] {
        &self.op_order
    }

    pub fn node(&self, id: OpId) -> Option<&OpNode> {
        self.op_graph.get(&id)
    }

    pub fn op(&self, id: OpId) -> Option<&Op> {
        self.op_graph.get(&id).map(|n| &n.op)
    }

    pub fn state(&self, id: OpId) -> Option<&NodeState> {
        self.op_graph.get(&id).map(|n| &n.state)
    }

    /// Ops in timeline order.
    pub fn ops(&self) -> impl Iterator<Item = &Op> {
        self.op_order.iter().filter_map(|id| self.op(*id))
    }

    pub fn position(&self, id: OpId) -> Option<usize> {
        self.op_order.iter().position(|o| *o == id)
    }

    /// The op that places `sketch` in the timeline.
    pub fn sketch_op(&self, sketch: SketchId) -> Option<OpId> {
        self.ops()
            .find(|op| op.kind.defined_sketch() == Some(sketch))
            .map(|op| op.id)
    }

    /// Timeline position of an entity: an op's index, a placed sketch's
    /// `Sketch` op index, or -1 for an unplaced sketch. `None` if missing.
    pub fn entity_position(&self, entity: EntityRef) -> Option<i64> {
        entity_position_in(self, &self.op_order, entity)
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Sketch(id) => self.sketches.contains_key(&id),
            EntityRef::Op(id) => self.op_graph.contains_key(&id),
        }
    }
}

/// Like [`PartStudio::entity_position`] but against a candidate order.
pub(crate) fn entity_position_in(studio: &PartStudio, order: &[OpId], entity: EntityRef) -> Option<i64> {
    match entity {
        EntityRef::Op(id) => order.iter().position(|o| *o == id).map(|p| p as i64),
        EntityRef::Sketch(id) => {
            if !studio.sketches.contains_key(&id) {
                return None;
            }
            let placed = order.iter().position(|o| {
                studio
                    .op_graph
                    .get(o)
                    .is_some_and(|n| n.op.kind.defined_sketch() == Some(id))
            });
            Some(placed.map_or(-1, |p| p as i64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_studio_has_datum_planes() {
        let studio = PartStudio::new("part");
        assert_eq!(studio.planes.len(), 3);
        assert!(studio.plane_by_name("XY").is_some());
        assert!(studio.is_empty());
    }

    #[test]
    fn sketch_on_unknown_plane_is_rejected() {
        let mut studio = PartStudio::new("part");
        let sketch = Sketch::new("s", PlaneId::new());
        assert!(matches!(studio.add_sketch(sketch), Err(EngineError::PlaneNotFound { .. })));
    }

    #[test]
    fn unplaced_sketch_sits_before_everything() {
        let mut studio = PartStudio::new("part");
        let xy = studio.plane_by_name("XY").unwrap().id;
        let s = studio.add_sketch(Sketch::new("s", xy)).unwrap();
        assert_eq!(studio.entity_position(EntityRef::Sketch(s)), Some(-1));
        assert_eq!(studio.entity_position(EntityRef::Sketch(SketchId::new())), None);
    }
}
