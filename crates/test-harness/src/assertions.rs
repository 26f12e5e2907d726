//! Assertion helpers with diagnostic output.
//!
//! Every failure says what was expected, what was found, and the caller's
//! context string.

use feature_engine::{NodeState, OpError, RebuildReport, StudioSession};
use history_types::OpId;
use shape_kernel::Mesh;

use crate::helpers::HarnessError;

/// Assert the mesh bounding box matches expected values within tolerance.
pub fn assert_bounding_box(
    mesh: &Mesh,
    expected_min: [f32; 3],
    expected_max: [f32; 3],
    tol: f32,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (actual_min, actual_max) = crate::helpers::mesh_bounding_box(mesh);

    for i in 0..3 {
        if (actual_min[i] - expected_min[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box min[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_min[i], actual_min[i], tol,
                ),
            });
        }
        if (actual_max[i] - expected_max[i]).abs() > tol {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{}] bounding box max[{}]: expected {:.3}, got {:.3} (tol={})",
                    ctx, i, expected_max[i], actual_max[i], tol,
                ),
            });
        }
    }
    Ok(())
}

/// Assert every handle the kernel produced was freed or is owned by an op.
pub fn assert_handles_balanced(session: &StudioSession, ctx: &str) -> Result<(), HarnessError> {
    let stats = session.kernel().stats();
    let live = session.kernel().live_shape_count() as u64;
    let owned = session.registry().len() as u64;
    if stats.produced - stats.freed != live || live != owned || stats.redundant_frees != 0 {
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{}] produced={} freed={} redundant={} live={} owned={}",
                ctx, stats.produced, stats.freed, stats.redundant_frees, live, owned,
            ),
        });
    }
    Ok(())
}

/// Assert an op failed and its error satisfies `check`.
pub fn assert_failed_with(
    state: &NodeState,
    check: impl Fn(&OpError) -> bool,
    ctx: &str,
) -> Result<(), HarnessError> {
    match state {
        NodeState::Failed(e) if check(e) => Ok(()),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{}] unexpected state {:?}", ctx, other),
        }),
    }
}

/// Assert exactly `expected` ran through the kernel in `report`, in any order.
pub fn assert_executed(report: &RebuildReport, expected: usize, ctx: &str) -> Result<(), HarnessError> {
    if report.executed == expected {
        return Ok(());
    }
    let states: Vec<(OpId, &'static str)> = report
        .results
        .iter()
        .map(|(id, s)| {
            let label = match s {
                NodeState::Built(_) => "built",
                NodeState::Failed(_) => "failed",
                NodeState::Unbuilt => "unbuilt",
            };
            (*id, label)
        })
        .collect();
    Err(HarnessError::AssertionFailed {
        detail: format!(
            "[{}] expected {} executed, got {} (reused {}, failed {}): {:?}",
            ctx, expected, report.executed, report.reused, report.failed, states,
        ),
    })
}
