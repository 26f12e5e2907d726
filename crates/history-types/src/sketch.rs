use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::geom::Vec2;
use crate::ids::{ElementId, PlaneId, SketchId};

/// A 2D sketch on a plane. Solved positions are written back by the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    pub id: SketchId,
    pub name: String,
    pub plane_id: PlaneId,
    #[serde(with = "crate::pairs")]
    pub primitives: BTreeMap<ElementId, Primitive>,
    #[serde(with = "crate::pairs")]
    pub constraints: BTreeMap<ElementId, Constraint>,
    /// Solved point positions keyed by point id. `None` until solved.
    #[serde(default, with = "crate::pairs::option")]
    pub solved_positions: Option<BTreeMap<ElementId, Vec2>>,
    /// Solved circle radii keyed by circle id.
    #[serde(default, with = "crate::pairs")]
    pub solved_radii: BTreeMap<ElementId, f64>,
    pub solve_status: SolveStatus,
    /// Remaining degrees of freedom reported by the last solve.
    pub dof: u32,
    #[serde(default)]
    next_element: ElementId,
}

impl Sketch {
    pub fn new(name: impl Into<String>, plane_id: PlaneId) -> Self {
        Self {
            id: SketchId::new(),
            name: name.into(),
            plane_id,
            primitives: BTreeMap::new(),
            constraints: BTreeMap::new(),
            solved_positions: None,
            solved_radii: BTreeMap::new(),
            solve_status: SolveStatus::Unsolved,
            dof: 0,
            next_element: 1,
        }
    }

    fn alloc_element(&mut self) -> ElementId {
        let taken = self
            .primitives
            .keys()
            .chain(self.constraints.keys())
            .max()
            .map_or(1, |m| m + 1);
        let id = self.next_element.max(taken);
        self.next_element = id + 1;
        id
    }

    pub fn add_point(&mut self, x: f64, y: f64) -> ElementId {
        let id = self.alloc_element();
        self.primitives.insert(id, Primitive::Point { x, y });
        self.mark_unsolved();
        id
    }

    pub fn add_line(&mut self, start: ElementId, end: ElementId) -> ElementId {
        let id = self.alloc_element();
        self.primitives.insert(id, Primitive::Line { start, end });
        self.mark_unsolved();
        id
    }

    pub fn add_circle(&mut self, center: ElementId, radius: f64) -> ElementId {
        let id = self.alloc_element();
        self.primitives.insert(id, Primitive::Circle { center, radius });
        self.mark_unsolved();
        id
    }

    pub fn add_arc(&mut self, center: ElementId, start: ElementId, end: ElementId) -> ElementId {
        let id = self.alloc_element();
        self.primitives.insert(id, Primitive::Arc { center, start, end });
        self.mark_unsolved();
        id
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> ElementId {
        let id = self.alloc_element();
        self.constraints.insert(id, constraint);
        self.mark_unsolved();
        id
    }

    /// Drop solver output after an edit; the sketch must be re-solved.
    pub fn mark_unsolved(&mut self) {
        self.solved_positions = None;
        self.solved_radii.clear();
        self.solve_status = SolveStatus::Unsolved;
        self.dof = 0;
    }

    /// Whether profile-based operations may consume this sketch.
    pub fn is_usable_profile(&self) -> bool {
        self.solved_positions.is_some() && self.solve_status.is_usable()
    }

    /// Solved position of a point, if solved.
    pub fn solved(&self, point: ElementId) -> Option<Vec2> {
        self.solved_positions.as_ref()?.get(&point).copied()
    }

    /// Solved radius of a circle, falling back to its drawn radius.
    pub fn radius(&self, circle: ElementId) -> Option<f64> {
        if let Some(r) = self.solved_radii.get(&circle) {
            return Some(*r);
        }
        match self.primitives.get(&circle)? {
            Primitive::Circle { radius, .. } => Some(*radius),
            _ => None,
        }
    }

    /// Fingerprint of the solver input (primitives and constraints).
    pub fn input_fingerprint(&self) -> Fingerprint {
        let mut fp = FingerprintBuilder::new("sketch-input");
        for (id, primitive) in &self.primitives {
            fp.u64(1, u64::from(*id));
            primitive.hash_into(&mut fp);
        }
        for (id, constraint) in &self.constraints {
            fp.u64(2, u64::from(*id));
            constraint.hash_into(&mut fp);
        }
        fp.finish()
    }

    /// Fingerprint of the solved positions, or `None` when unsolved.
    pub fn positions_fingerprint(&self) -> Option<Fingerprint> {
        let positions = self.solved_positions.as_ref()?;
        let mut fp = FingerprintBuilder::new("sketch-positions");
        for (id, p) in positions {
            fp.u64(1, u64::from(*id)).f64(2, p.x).f64(3, p.y);
        }
        for (id, r) in &self.solved_radii {
            fp.u64(4, u64::from(*id)).f64(5, *r);
        }
        Some(fp.finish())
    }

    /// Fingerprint of which primitives exist and how they connect, ignoring
    /// coordinates. Solved positions alone miss a removed line.
    pub fn topology_fingerprint(&self) -> Fingerprint {
        let mut fp = FingerprintBuilder::new("sketch-topology");
        for (id, primitive) in &self.primitives {
            fp.u64(1, u64::from(*id)).u64(2, primitive.kind_tag());
            for point in primitive.points() {
                fp.u64(3, u64::from(point));
            }
        }
        fp.finish()
    }
}

/// A geometric primitive in a sketch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Primitive {
    Point { x: f64, y: f64 },
    Line { start: ElementId, end: ElementId },
    Circle { center: ElementId, radius: f64 },
    Arc { center: ElementId, start: ElementId, end: ElementId },
}

impl Primitive {
    /// Point ids this primitive is built from.
    pub fn points(&self) -> Vec<ElementId> {
        match self {
            Primitive::Point { .. } => Vec::new(),
            Primitive::Line { start, end } => vec![*start, *end],
            Primitive::Circle { center, .. } => vec![*center],
            Primitive::Arc { center, start, end } => vec![*center, *start, *end],
        }
    }

    fn kind_tag(&self) -> u64 {
        match self {
            Primitive::Point { .. } => 0,
            Primitive::Line { .. } => 1,
            Primitive::Circle { .. } => 2,
            Primitive::Arc { .. } => 3,
        }
    }

    fn hash_into(&self, fp: &mut FingerprintBuilder) {
        match self {
            Primitive::Point { x, y } => {
                fp.u64(10, 0).f64(11, *x).f64(12, *y);
            }
            Primitive::Line { start, end } => {
                fp.u64(10, 1).u64(11, u64::from(*start)).u64(12, u64::from(*end));
            }
            Primitive::Circle { center, radius } => {
                fp.u64(10, 2).u64(11, u64::from(*center)).f64(12, *radius);
            }
            Primitive::Arc { center, start, end } => {
                fp.u64(10, 3)
                    .u64(11, u64::from(*center))
                    .u64(12, u64::from(*start))
                    .u64(13, u64::from(*end));
            }
        }
    }
}

/// A constraint between sketch primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Constraint {
    Fixed { point: ElementId, x: f64, y: f64 },
    Coincident { a: ElementId, b: ElementId },
    Horizontal { line: ElementId },
    Vertical { line: ElementId },
    Distance { a: ElementId, b: ElementId, value: f64 },
    Radius { circle: ElementId, value: f64 },
    Parallel { a: ElementId, b: ElementId },
    Perpendicular { a: ElementId, b: ElementId },
    Equal { a: ElementId, b: ElementId },
}

impl Constraint {
    /// Number of scalar equations this constraint removes.
    pub fn equations(&self) -> u32 {
        match self {
            Constraint::Fixed { .. } | Constraint::Coincident { .. } => 2,
            _ => 1,
        }
    }

    fn hash_into(&self, fp: &mut FingerprintBuilder) {
        // serde_json output of a plain enum is deterministic.
        let text = serde_json::to_string(self).unwrap_or_default();
        fp.str(20, &text);
    }
}

/// Result classification reported by the sketch solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Not solved since the last edit.
    Unsolved,
    FullyConstrained,
    UnderConstrained,
    OverConstrained,
    Inconsistent,
}

impl SolveStatus {
    /// Over-constrained and inconsistent sketches cannot feed a profile.
    pub fn is_usable(self) -> bool {
        matches!(
            self,
            SolveStatus::FullyConstrained | SolveStatus::UnderConstrained
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Sketch {
        let mut sketch = Sketch::new("tri", PlaneId::new());
        let a = sketch.add_point(0.0, 0.0);
        let b = sketch.add_point(1.0, 0.0);
        let c = sketch.add_point(0.0, 1.0);
        sketch.add_line(a, b);
        sketch.add_line(b, c);
        sketch.add_line(c, a);
        sketch
    }

    #[test]
    fn element_ids_are_shared_and_increasing() {
        let mut sketch = triangle();
        let k = sketch.add_constraint(Constraint::Horizontal { line: 4 });
        assert_eq!(k, 7);
        assert_eq!(sketch.primitives.len(), 6);
    }

    #[test]
    fn unsolved_sketch_is_not_a_profile() {
        let mut sketch = triangle();
        assert!(!sketch.is_usable_profile());
        sketch.solved_positions = Some(BTreeMap::new());
        sketch.solve_status = SolveStatus::Inconsistent;
        assert!(!sketch.is_usable_profile());
        sketch.solve_status = SolveStatus::UnderConstrained;
        assert!(sketch.is_usable_profile());
    }

    #[test]
    fn input_fingerprint_tracks_edits() {
        let mut sketch = triangle();
        let before = sketch.input_fingerprint();
        assert_eq!(before, sketch.clone().input_fingerprint());
        sketch.add_constraint(Constraint::Horizontal { line: 4 });
        assert_ne!(before, sketch.input_fingerprint());
    }

    #[test]
    fn topology_fingerprint_ignores_coordinates_but_not_edges() {
        let mut sketch = triangle();
        let before = sketch.topology_fingerprint();
        if let Some(Primitive::Point { x, .. }) = sketch.primitives.get_mut(&1) {
            *x = 5.0;
        }
        assert_eq!(before, sketch.topology_fingerprint());
        sketch.primitives.remove(&6);
        assert_ne!(before, sketch.topology_fingerprint());
    }

    #[test]
    fn sketch_round_trips_through_json() {
        let mut sketch = triangle();
        let mut positions = BTreeMap::new();
        positions.insert(1, Vec2::new(0.0, 0.0));
        sketch.solved_positions = Some(positions);
        let json = serde_json::to_string(&sketch).unwrap();
        let back: Sketch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sketch);
    }
}
