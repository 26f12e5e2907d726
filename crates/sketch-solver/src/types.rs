use std::collections::BTreeMap;

use history_types::{ElementId, SolveStatus, Vec2};
use serde::{Deserialize, Serialize};

/// Output of one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveOutput {
    /// Solved position of every point primitive.
    pub positions: BTreeMap<ElementId, Vec2>,
    /// Solved radius of every circle primitive.
    pub radii: BTreeMap<ElementId, f64>,
    pub status: SolveStatus,
    /// Remaining degrees of freedom.
    pub dof: u32,
}

/// Malformed solver input. Numerical failure is not an error: it is reported
/// through `SolveStatus::Inconsistent`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("element {element} referenced by {owner} does not exist")]
    MissingElement { owner: ElementId, element: ElementId },

    #[error("element {element} referenced by {owner} is not a {expected}")]
    WrongPrimitive {
        owner: ElementId,
        element: ElementId,
        expected: &'static str,
    },
}

/// Failure to derive geometry from a solved sketch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("sketch is not solved or is not usable as a profile")]
    NotSolved,

    #[error("sketch contains no closed loop")]
    NoClosedLoop,

    #[error("sketch does not form a single open path")]
    NoPath,

    #[error("solved position missing for point {point}")]
    MissingPosition { point: ElementId },
}
