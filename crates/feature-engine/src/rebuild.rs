//! The rebuild pass: walks the history in order and brings every node's state
//! up to date, reusing results whose fingerprint did not change.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use history_types::{OpId, Scalar, SketchId};
use modeling_ops::{
    execute_boolean, execute_box, execute_chamfer, execute_cone, execute_cylinder, execute_extrude,
    execute_fillet, execute_loft, execute_mirror, execute_pattern, execute_revolve, execute_shell,
    execute_sphere, execute_sweep, execute_transform, finish_build, ExtrudeParams, Layout, PlacedSketch,
    TransformParams,
};
use shape_kernel::{Kernel, ShapeHandle};

use crate::config::EngineConfig;
use crate::fingerprint::op_fingerprint;
use crate::references::referenced_entities;
use crate::session::StudioSession;
use crate::studio::PartStudio;
use crate::timeline::TimelinePosition;
use crate::types::{EntityRef, NodeState, Op, OpError, OpKind, OpResult, PatternLayout};

/// Outcome of one rebuild pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildReport {
    /// State of every op in the studio after the pass.
    pub results: BTreeMap<OpId, NodeState>,
    pub executed: usize,
    pub reused: usize,
    pub failed: usize,
    pub generation: u64,
    /// The pass stopped early; its results are incomplete.
    pub cancelled: bool,
}

impl RebuildReport {
    pub fn state(&self, id: OpId) -> Option<&NodeState> {
        self.results.get(&id)
    }
}

enum Outcome {
    Skipped,
    Reused,
    Executed,
    Failed,
}

/// Rebuild every op up to `position`. Never fails: errors end up on the nodes.
pub fn rebuild(studio: &mut PartStudio, session: &mut StudioSession, position: TimelinePosition) -> RebuildReport {
    rebuild_with(studio, session, position, &|| false)
}

/// Like [`rebuild`], checking `cancel` before each op.
pub fn rebuild_with(
    studio: &mut PartStudio,
    session: &mut StudioSession,
    position: TimelinePosition,
    cancel: &dyn Fn() -> bool,
) -> RebuildReport {
    let started = Instant::now();
    let mut report = RebuildReport {
        generation: session.generation(),
        ..RebuildReport::default()
    };

    studio.params.evaluate_all();
    for sketch in studio.sketches.values_mut() {
        session.sketches.ensure_solved(sketch);
    }
    let forgotten = session.sketches.retain(|id| studio.sketches.contains_key(&id));
    if forgotten > 0 {
        tracing::debug!(forgotten, "dropped cached solves of deleted sketches");
    }

    let live: HashSet<OpId> = studio.op_order.iter().copied().collect();
    let dropped = session.registry.retain(&mut *session.kernel, &live);
    if dropped > 0 {
        tracing::debug!(dropped, "released handles of deleted ops");
    }

    let limit = position.resolve(studio.len());
    let order = studio.op_order.clone();
    for (i, id) in order.iter().enumerate() {
        if cancel() {
            report.cancelled = true;
            tracing::debug!(generation = report.generation, at = i, "rebuild cancelled");
            break;
        }
        let Some(node) = studio.op_graph.get(id) else {
            continue;
        };
        let op = node.op.clone();
        let (state, outcome) = if i as i64 > limit || op.suppressed {
            session.registry.release(&mut *session.kernel, *id);
            (NodeState::Unbuilt, Outcome::Skipped)
        } else {
            build_node(studio, session, &op)
        };
        match outcome {
            Outcome::Skipped => {}
            Outcome::Reused => report.reused += 1,
            Outcome::Executed => report.executed += 1,
            Outcome::Failed => report.failed += 1,
        }
        if let Some(node) = studio.op_graph.get_mut(id) {
            node.state = state;
            node.stale = false;
        }
    }

    report.results = studio
        .op_order
        .iter()
        .filter_map(|id| studio.op_graph.get(id).map(|n| (*id, n.state.clone())))
        .collect();
    tracing::info!(
        studio = %studio.id,
        executed = report.executed,
        reused = report.reused,
        failed = report.failed,
        generation = report.generation,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "rebuild finished"
    );
    report
}

fn fail(session: &mut StudioSession, op: &Op, error: OpError) -> (NodeState, Outcome) {
    session.registry.release(&mut *session.kernel, op.id);
    match &error {
        OpError::UpstreamFailure { .. } => {
            tracing::debug!(op = %op.id, name = %op.name, error = %error, "op skipped")
        }
        _ => tracing::warn!(op = %op.id, name = %op.name, error = %error, "op failed"),
    }
    (NodeState::Failed(error), Outcome::Failed)
}

fn build_node(studio: &PartStudio, session: &mut StudioSession, op: &Op) -> (NodeState, Outcome) {
    let mut entities = referenced_entities(&op.kind);
    if let Some(sketch) = op.kind.defined_sketch() {
        entities.push(EntityRef::Sketch(sketch));
    }

    if let Some(missing) = entities.iter().find(|e| !studio.contains(**e)) {
        return fail(session, op, OpError::DanglingReference { missing: *missing });
    }

    let resolved = match op.kind.resolve_scalars(&mut |s: &Scalar| {
        s.resolve(|text| studio.params.evaluate_inline(text))
    }) {
        Ok(kind) => kind,
        Err(e) => {
            return fail(
                session,
                op,
                OpError::InvalidParameter {
                    reason: e.to_string(),
                },
            )
        }
    };

    // The op's own sketch only needs to exist; dependents check usability.
    for entity in referenced_entities(&op.kind) {
        let ok = match entity {
            EntityRef::Op(r) => studio.state(r).is_some_and(NodeState::is_built),
            EntityRef::Sketch(s) => {
                studio.sketch(s).is_some_and(|sk| sk.is_usable_profile())
                    && studio
                        .sketch_op(s)
                        .map_or(true, |placer| studio.state(placer).is_some_and(NodeState::is_built))
            }
        };
        if !ok {
            return fail(session, op, OpError::UpstreamFailure { upstream: entity });
        }
    }

    let fingerprint = match op_fingerprint(studio, &resolved, &entities) {
        Ok(fp) => fp,
        Err(e) => return fail(session, op, e),
    };

    if let Some(node) = studio.node(op.id) {
        if let NodeState::Built(previous) = &node.state {
            if previous.fingerprint == fingerprint && !node.stale && session.registry.handle(op.id) == previous.shape {
                if session.config.log_reuse {
                    tracing::debug!(op = %op.id, name = %op.name, fingerprint = %fingerprint.short(), "op reused");
                }
                return (node.state.clone(), Outcome::Reused);
            }
        }
    }

    if let OpKind::Sketch { .. } = resolved {
        session.registry.release(&mut *session.kernel, op.id);
        tracing::debug!(op = %op.id, name = %op.name, "sketch placed");
        return (
            NodeState::Built(OpResult {
                shape: None,
                mesh: None,
                fingerprint,
            }),
            Outcome::Executed,
        );
    }

    let built = execute(studio, &mut *session.kernel, &session.config, &resolved).and_then(|shape| {
        finish_build(&mut *session.kernel, shape, session.config.mesh_deflection).map_err(OpError::from)
    });
    match built {
        Ok(output) => {
            session.registry.adopt(&mut *session.kernel, op.id, output.shape);
            tracing::debug!(
                op = %op.id,
                name = %op.name,
                kind = resolved.tag(),
                fingerprint = %fingerprint.short(),
                "op executed"
            );
            (
                NodeState::Built(OpResult {
                    shape: Some(output.shape),
                    mesh: Some(Arc::new(output.mesh)),
                    fingerprint,
                }),
                Outcome::Executed,
            )
        }
        Err(e) => fail(session, op, e),
    }
}

fn literal(scalar: &Scalar) -> Result<f64, OpError> {
    match scalar {
        Scalar::Value(v) => Ok(*v),
        Scalar::Expr(text) => Err(OpError::InvalidParameter {
            reason: format!("unresolved expression '{}'", text),
        }),
    }
}

fn shape_of(studio: &PartStudio, id: OpId) -> Result<ShapeHandle, OpError> {
    studio
        .state(id)
        .and_then(NodeState::result)
        .and_then(|r| r.shape)
        .ok_or(OpError::UpstreamFailure {
            upstream: EntityRef::Op(id),
        })
}

fn placed_sketch(studio: &PartStudio, id: SketchId) -> Result<PlacedSketch<'_>, OpError> {
    let sketch = studio.sketch(id).ok_or(OpError::DanglingReference {
        missing: EntityRef::Sketch(id),
    })?;
    let plane = studio
        .planes
        .get(&sketch.plane_id)
        .ok_or_else(|| OpError::InvalidParameter {
            reason: format!("plane {} of {} not found", sketch.plane_id, id),
        })?;
    Ok(PlacedSketch { sketch, plane })
}

/// Run one resolved op through the modeling layer.
fn execute(
    studio: &PartStudio,
    kernel: &mut dyn Kernel,
    config: &EngineConfig,
    kind: &OpKind,
) -> Result<ShapeHandle, OpError> {
    let shape = match kind {
        OpKind::Sketch { .. } => {
            return Err(OpError::InvalidParameter {
                reason: "sketch ops do not produce a solid".into(),
            })
        }
        OpKind::Extrude {
            sketch,
            depth,
            direction,
            symmetric,
        } => {
            let params = ExtrudeParams {
                depth: literal(depth)?,
                direction: *direction,
                symmetric: *symmetric,
            };
            execute_extrude(kernel, placed_sketch(studio, *sketch)?, &params)?
        }
        OpKind::Revolve {
            sketch,
            axis_origin,
            axis_direction,
            angle_deg,
        } => execute_revolve(kernel, placed_sketch(studio, *sketch)?, *axis_origin, *axis_direction, literal(angle_deg)?)?,
        OpKind::Sweep { profile, path } => execute_sweep(kernel, placed_sketch(studio, *profile)?, placed_sketch(studio, *path)?)?,
        OpKind::Loft { sections } => {
            let sections = sections.iter().map(|s| placed_sketch(studio, *s)).collect::<Result<Vec<_>, _>>()?;
            execute_loft(kernel, &sections)?
        }
        OpKind::Boolean { kind, target, tool } => execute_boolean(kernel, *kind, shape_of(studio, *target)?, shape_of(studio, *tool)?)?,
        OpKind::Fillet { target, edges, radius } => execute_fillet(kernel, shape_of(studio, *target)?, edges, literal(radius)?)?,
        OpKind::Chamfer {
            target,
            edges,
            distance,
        } => execute_chamfer(kernel, shape_of(studio, *target)?, edges, literal(distance)?)?,
        OpKind::Shell {
            target,
            faces,
            thickness,
        } => execute_shell(kernel, shape_of(studio, *target)?, faces, literal(thickness)?)?,
        OpKind::Pattern { target, layout } => {
            let layout = match layout {
                PatternLayout::Linear {
                    direction,
                    spacing,
                    count,
                } => Layout::Linear {
                    direction: *direction,
                    spacing: literal(spacing)?,
                    count: *count,
                },
                PatternLayout::Circular {
                    axis_origin,
                    axis_direction,
                    count,
                    total_angle_deg,
                } => Layout::Circular {
                    axis_origin: *axis_origin,
                    axis_direction: *axis_direction,
                    count: *count,
                    total_angle_deg: literal(total_angle_deg)?,
                },
            };
            execute_pattern(kernel, shape_of(studio, *target)?, &layout, config.max_pattern_count)?
        }
        OpKind::Mirror {
            target,
            plane_origin,
            plane_normal,
            keep_original,
        } => execute_mirror(kernel, shape_of(studio, *target)?, *plane_origin, *plane_normal, *keep_original)?,
        OpKind::Box { origin, dx, dy, dz } => execute_box(kernel, *origin, literal(dx)?, literal(dy)?, literal(dz)?)?,
        OpKind::Cylinder { origin, radius, height } => {
            execute_cylinder(kernel, *origin, literal(radius)?, literal(height)?)?
        }
        OpKind::Sphere { center, radius } => execute_sphere(kernel, *center, literal(radius)?)?,
        OpKind::Cone {
            origin,
            bottom_radius,
            top_radius,
            height,
        } => execute_cone(
            kernel,
            *origin,
            literal(bottom_radius)?,
            literal(top_radius)?,
            literal(height)?,
        )?,
        OpKind::Transform {
            target,
            translation,
            rotation_axis,
            rotation_deg,
            scale,
        } => {
            let params = TransformParams {
                translation: *translation,
                rotation_axis: *rotation_axis,
                rotation_deg: literal(rotation_deg)?,
                scale: literal(scale)?,
            };
            execute_transform(kernel, shape_of(studio, *target)?, &params)?
        }
    };
    Ok(shape)
}
