//! Sketch result cache: solves a sketch only when its solver input changed.

use std::collections::HashMap;

use history_types::{Fingerprint, Sketch, SketchId, SolveStatus};

use crate::relaxation::RelaxationSolver;
use crate::traits::SketchSolver;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub solves: u64,
    pub hits: u64,
}

/// Memoizes solves by the sketch's input fingerprint and writes results back
/// into the sketch.
#[derive(Debug)]
pub struct SketchCache<S: SketchSolver = RelaxationSolver> {
    solver: S,
    inputs: HashMap<SketchId, Fingerprint>,
    stats: CacheStats,
}

impl Default for SketchCache<RelaxationSolver> {
    fn default() -> Self {
        Self::new(RelaxationSolver::default())
    }
}

impl<S: SketchSolver> SketchCache<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            inputs: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Bring `sketch`'s solved data up to date. Returns true when it changed.
    ///
    /// A sketch loaded with solved positions and no cache entry is trusted
    /// as-is.
    pub fn ensure_solved(&mut self, sketch: &mut Sketch) -> bool {
        let input = sketch.input_fingerprint();
        let solved = sketch.solve_status != SolveStatus::Unsolved;
        match self.inputs.get(&sketch.id) {
            Some(fp) if *fp == input && solved => {
                self.stats.hits += 1;
                return false;
            }
            None if solved => {
                self.inputs.insert(sketch.id, input);
                self.stats.hits += 1;
                return false;
            }
            _ => {}
        }

        self.stats.solves += 1;
        let before = sketch.positions_fingerprint();
        match self.solver.solve(sketch) {
            Ok(out) => {
                sketch.solved_positions = Some(out.positions);
                sketch.solved_radii = out.radii;
                sketch.solve_status = out.status;
                sketch.dof = out.dof;
            }
            Err(e) => {
                tracing::warn!(sketch = %sketch.id, error = %e, "sketch cannot be solved");
                sketch.solved_positions = None;
                sketch.solved_radii.clear();
                sketch.solve_status = SolveStatus::Inconsistent;
                sketch.dof = 0;
            }
        }
        self.inputs.insert(sketch.id, input);
        before != sketch.positions_fingerprint()
    }

    pub fn contains(&self, sketch: SketchId) -> bool {
        self.inputs.contains_key(&sketch)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Drop entries for sketches `keep` rejects. Returns how many went.
    pub fn retain(&mut self, keep: impl Fn(SketchId) -> bool) -> usize {
        let before = self.inputs.len();
        self.inputs.retain(|id, _| keep(*id));
        before - self.inputs.len()
    }
}
