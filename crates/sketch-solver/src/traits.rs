use history_types::Sketch;

use crate::types::{SolveError, SolveOutput};

/// The 2D constraint solver consumed by the engine.
///
/// Solvers are pure functions of the sketch's primitives and constraints; the
/// initial primitive coordinates serve as the starting guess.
pub trait SketchSolver: Send {
    fn solve(&mut self, sketch: &Sketch) -> Result<SolveOutput, SolveError>;
}
