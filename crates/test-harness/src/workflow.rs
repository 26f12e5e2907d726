//! StudioBuilder: fluent API for scripting part-studio workflows in tests.
//!
//! Every edit goes through the timeline cursor and triggers a rebuild, the
//! same path an editor takes. All methods accept op and sketch names instead
//! of ids for readability.

use std::sync::Arc;

use feature_engine::*;
use history_types::{OpId, ParamId, PlaneId, Scalar, Sketch, SketchId};
use shape_kernel::{Mesh, MockKernel, ShapeHandle, TruckKernel};

use crate::helpers::*;

/// A fluent builder for constructing and checking part studios in tests.
pub struct StudioBuilder {
    studio: PartStudio,
    session: StudioSession,
    timeline: Timeline,
    report: RebuildReport,
    auto_check: bool,
}

impl StudioBuilder {
    /// Create a builder on the deterministic MockKernel.
    pub fn mock() -> Self {
        Self::with_session(StudioSession::new(MockKernel::new(), EngineConfig::default()))
    }

    /// Create a builder on TruckKernel (real geometry).
    pub fn truck() -> Self {
        Self::with_session(StudioSession::new(TruckKernel::new(), EngineConfig::default()))
    }

    pub fn with_session(session: StudioSession) -> Self {
        init_tracing();
        Self {
            studio: PartStudio::new("test"),
            session,
            timeline: Timeline::new(),
            report: RebuildReport::default(),
            auto_check: false,
        }
    }

    /// Enable auto-checking: after every edit, fail on any op error.
    pub fn with_auto_check(mut self) -> Self {
        self.auto_check = true;
        self
    }

    // ── Sketches ────────────────────────────────────────────────────────

    pub fn plane(&self, name: &str) -> Result<PlaneId, HarnessError> {
        self.studio
            .plane_by_name(name)
            .map(|p| p.id)
            .ok_or_else(|| HarnessError::PlaneNotFound { name: name.into() })
    }

    /// Register `sketch` and place it at the cursor with a `Sketch` op of the same name.
    pub fn sketch(&mut self, sketch: Sketch) -> Result<SketchId, HarnessError> {
        let name = sketch.name.clone();
        self.check_name_available(&name)?;
        if self.studio.sketches.values().any(|s| s.name == name) {
            return Err(HarnessError::DuplicateName { name });
        }
        let id = self.studio.add_sketch(sketch)?;
        self.insert(&name, OpKind::Sketch { sketch: id })?;
        Ok(id)
    }

    pub fn rect_sketch(
        &mut self,
        name: &str,
        plane: &str,
        corner: [f64; 2],
        w: f64,
        h: f64,
    ) -> Result<SketchId, HarnessError> {
        let plane = self.plane(plane)?;
        self.sketch(rect_sketch(name, plane, corner[0], corner[1], w, h))
    }

    pub fn circle_sketch(
        &mut self,
        name: &str,
        plane: &str,
        center: [f64; 2],
        r: f64,
    ) -> Result<SketchId, HarnessError> {
        let plane = self.plane(plane)?;
        self.sketch(circle_sketch(name, plane, center[0], center[1], r))
    }

    /// Edit a sketch in place and rebuild.
    pub fn edit_sketch(&mut self, name: &str, edit: impl FnOnce(&mut Sketch)) -> Result<&mut Self, HarnessError> {
        let id = self.sketch_id(name)?;
        if let Some(sketch) = self.studio.sketch_mut(id) {
            edit(sketch);
            sketch.mark_unsolved();
        }
        self.rebuild()?;
        Ok(self)
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Insert any op at the cursor.
    pub fn insert(&mut self, name: &str, kind: OpKind) -> Result<OpId, HarnessError> {
        if !matches!(kind, OpKind::Sketch { .. }) {
            self.check_name_available(name)?;
        }
        let (id, report) = self
            .timeline
            .insert_at_cursor(&mut self.studio, &mut self.session, Op::new(name, kind))?;
        self.report = report;
        tracing::debug!(name, op = %id, position = ?self.timeline.position(), "op inserted");
        self.after_edit()?;
        Ok(id)
    }

    pub fn extrude(&mut self, name: &str, sketch: &str, depth: impl Into<Scalar>) -> Result<OpId, HarnessError> {
        let sketch = self.sketch_id(sketch)?;
        self.insert(
            name,
            OpKind::Extrude {
                sketch,
                depth: depth.into(),
                direction: None,
                symmetric: false,
            },
        )
    }

    pub fn revolve(
        &mut self,
        name: &str,
        sketch: &str,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle_deg: impl Into<Scalar>,
    ) -> Result<OpId, HarnessError> {
        let sketch = self.sketch_id(sketch)?;
        self.insert(
            name,
            OpKind::Revolve {
                sketch,
                axis_origin,
                axis_direction,
                angle_deg: angle_deg.into(),
            },
        )
    }

    pub fn box_solid(&mut self, name: &str, origin: [f64; 3], size: [f64; 3]) -> Result<OpId, HarnessError> {
        self.insert(
            name,
            OpKind::Box {
                origin,
                dx: size[0].into(),
                dy: size[1].into(),
                dz: size[2].into(),
            },
        )
    }

    pub fn cylinder(&mut self, name: &str, origin: [f64; 3], radius: f64, height: f64) -> Result<OpId, HarnessError> {
        self.insert(
            name,
            OpKind::Cylinder {
                origin,
                radius: radius.into(),
                height: height.into(),
            },
        )
    }

    pub fn boolean_union(&mut self, name: &str, a: &str, b: &str) -> Result<OpId, HarnessError> {
        self.boolean(name, BooleanKind::Fuse, a, b)
    }

    pub fn boolean_subtract(&mut self, name: &str, a: &str, b: &str) -> Result<OpId, HarnessError> {
        self.boolean(name, BooleanKind::Cut, a, b)
    }

    pub fn boolean_intersect(&mut self, name: &str, a: &str, b: &str) -> Result<OpId, HarnessError> {
        self.boolean(name, BooleanKind::Intersect, a, b)
    }

    fn boolean(&mut self, name: &str, kind: BooleanKind, target: &str, tool: &str) -> Result<OpId, HarnessError> {
        let target = self.op_id(target)?;
        let tool = self.op_id(tool)?;
        self.insert(name, OpKind::Boolean { kind, target, tool })
    }

    /// Fillet every edge of `target`.
    pub fn fillet(&mut self, name: &str, target: &str, radius: impl Into<Scalar>) -> Result<OpId, HarnessError> {
        let target = self.op_id(target)?;
        self.insert(
            name,
            OpKind::Fillet {
                target,
                edges: EdgeSelection::All,
                radius: radius.into(),
            },
        )
    }

    pub fn chamfer(&mut self, name: &str, target: &str, edges: Vec<usize>, distance: f64) -> Result<OpId, HarnessError> {
        let target = self.op_id(target)?;
        self.insert(
            name,
            OpKind::Chamfer {
                target,
                edges: EdgeSelection::Indices(edges),
                distance: distance.into(),
            },
        )
    }

    pub fn shell(&mut self, name: &str, target: &str, faces: Vec<usize>, thickness: f64) -> Result<OpId, HarnessError> {
        let target = self.op_id(target)?;
        self.insert(
            name,
            OpKind::Shell {
                target,
                faces,
                thickness: thickness.into(),
            },
        )
    }

    pub fn linear_pattern(
        &mut self,
        name: &str,
        target: &str,
        direction: [f64; 3],
        spacing: f64,
        count: u32,
    ) -> Result<OpId, HarnessError> {
        let target = self.op_id(target)?;
        self.insert(
            name,
            OpKind::Pattern {
                target,
                layout: PatternLayout::Linear {
                    direction,
                    spacing: spacing.into(),
                    count,
                },
            },
        )
    }

    pub fn mirror(
        &mut self,
        name: &str,
        target: &str,
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
        keep_original: bool,
    ) -> Result<OpId, HarnessError> {
        let target = self.op_id(target)?;
        self.insert(
            name,
            OpKind::Mirror {
                target,
                plane_origin,
                plane_normal,
                keep_original,
            },
        )
    }

    pub fn translate(&mut self, name: &str, target: &str, offset: [f64; 3]) -> Result<OpId, HarnessError> {
        let target = self.op_id(target)?;
        self.insert(
            name,
            OpKind::Transform {
                target,
                translation: offset,
                rotation_axis: [0.0, 0.0, 1.0],
                rotation_deg: 0.0.into(),
                scale: 1.0.into(),
            },
        )
    }

    // ── Parameters ──────────────────────────────────────────────────────

    pub fn parameter(&mut self, name: &str, expression: &str) -> Result<ParamId, HarnessError> {
        let id = self
            .studio
            .params
            .add_parameter(name, ParamInput::Expr(expression.into()), Unit::Unitless)?;
        self.rebuild()?;
        Ok(id)
    }

    pub fn set_parameter(&mut self, name: &str, expression: &str) -> Result<&mut Self, HarnessError> {
        let id = self
            .studio
            .params
            .by_name(name)
            .map(|p| p.id)
            .ok_or_else(|| HarnessError::AssertionFailed {
                detail: format!("no parameter named '{}'", name),
            })?;
        self.studio.params.update_expression(id, expression)?;
        self.rebuild()?;
        Ok(self)
    }

    // ── History Edits ───────────────────────────────────────────────────

    /// Replace an op's kind and rebuild.
    pub fn edit(&mut self, name: &str, kind: OpKind) -> Result<&mut Self, HarnessError> {
        let id = self.op_id(name)?;
        self.studio.update_op(
            id,
            OpPatch {
                kind: Some(kind),
                ..OpPatch::default()
            },
        )?;
        self.rebuild()?;
        Ok(self)
    }

    pub fn suppress(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        self.set_suppressed(name, true)
    }

    pub fn unsuppress(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        self.set_suppressed(name, false)
    }

    fn set_suppressed(&mut self, name: &str, suppressed: bool) -> Result<&mut Self, HarnessError> {
        let id = self.op_id(name)?;
        self.studio.set_suppressed(id, suppressed)?;
        self.rebuild()?;
        Ok(self)
    }

    pub fn delete(&mut self, name: &str) -> Result<&mut Self, HarnessError> {
        let id = self.op_id(name)?;
        let (_, report) = self.timeline.delete_op(&mut self.studio, &mut self.session, id)?;
        self.report = report;
        Ok(self)
    }

    pub fn reorder(&mut self, name: &str, position: usize) -> Result<&mut Self, HarnessError> {
        let id = self.op_id(name)?;
        self.studio.move_op(id, position)?;
        self.rebuild()?;
        Ok(self)
    }

    /// Move the timeline cursor and rebuild.
    pub fn rollback(&mut self, position: TimelinePosition) -> &mut Self {
        self.report = self
            .timeline
            .set_position(&mut self.studio, &mut self.session, position);
        self
    }

    pub fn rebuild(&mut self) -> Result<&RebuildReport, HarnessError> {
        self.report = self.timeline.rebuild(&mut self.studio, &mut self.session);
        self.after_edit()?;
        Ok(&self.report)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn op_id(&self, name: &str) -> Result<OpId, HarnessError> {
        self.studio
            .ops()
            .find(|op| op.name == name)
            .map(|op| op.id)
            .ok_or_else(|| HarnessError::OpNotFound { name: name.into() })
    }

    pub fn sketch_id(&self, name: &str) -> Result<SketchId, HarnessError> {
        self.studio
            .sketches
            .values()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| HarnessError::SketchNotFound { name: name.into() })
    }

    pub fn op_count(&self) -> usize {
        self.studio.len()
    }

    pub fn state(&self, name: &str) -> Result<&NodeState, HarnessError> {
        let id = self.op_id(name)?;
        self.studio
            .state(id)
            .ok_or_else(|| HarnessError::OpNotFound { name: name.into() })
    }

    pub fn error(&self, name: &str) -> Result<Option<&OpError>, HarnessError> {
        Ok(self.state(name)?.error())
    }

    pub fn solid(&self, name: &str) -> Result<ShapeHandle, HarnessError> {
        self.state(name)?
            .result()
            .and_then(|r| r.shape)
            .ok_or_else(|| HarnessError::NoSolid { name: name.into() })
    }

    pub fn mesh(&self, name: &str) -> Result<Arc<Mesh>, HarnessError> {
        self.state(name)?
            .result()
            .and_then(|r| r.mesh.clone())
            .ok_or_else(|| HarnessError::NoSolid { name: name.into() })
    }

    pub fn volume(&self, name: &str) -> Result<f64, HarnessError> {
        let solid = self.solid(name)?;
        Ok(self.session.kernel().volume(solid)?)
    }

    pub fn report(&self) -> &RebuildReport {
        &self.report
    }

    pub fn studio(&self) -> &PartStudio {
        &self.studio
    }

    pub fn session(&self) -> &StudioSession {
        &self.session
    }

    pub fn position(&self) -> TimelinePosition {
        self.timeline.position()
    }

    /// Op names with their error text, in timeline order.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.studio
            .ops()
            .filter_map(|op| {
                let error = self.studio.state(op.id)?.error()?;
                Some((op.name.clone(), error.to_string()))
            })
            .collect()
    }

    // ── Save / Load ─────────────────────────────────────────────────────

    pub fn save(&self) -> Result<String, HarnessError> {
        file_format::save_studio(&self.studio, &file_format::ProjectMetadata::new("test"))
            .map_err(|e| HarnessError::File(e.to_string()))
    }

    /// Replace the studio with a loaded one and rebuild at the tip.
    pub fn load(&mut self, json: &str) -> Result<&mut Self, HarnessError> {
        let loaded = file_format::load_studio(json).map_err(|e| HarnessError::File(e.to_string()))?;
        self.studio = loaded.studio;
        self.rollback(TimelinePosition::Tip);
        self.after_edit()?;
        Ok(self)
    }

    // ── Inline Assertions ───────────────────────────────────────────────

    pub fn assert_op_count(&self, expected: usize) -> Result<&Self, HarnessError> {
        if self.op_count() == expected {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "expected {} ops, got {}: [{}]",
                    expected,
                    self.op_count(),
                    self.op_summary()
                ),
            })
        }
    }

    pub fn assert_has_solid(&self, name: &str) -> Result<&Self, HarnessError> {
        self.solid(name).map(|_| self).map_err(|_| HarnessError::AssertionFailed {
            detail: format!("'{}' has no solid: {:?}; ops: [{}]", name, self.state(name).ok(), self.op_summary()),
        })
    }

    pub fn assert_no_errors(&self) -> Result<&Self, HarnessError> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("expected no errors, got {:?}", errors),
            })
        }
    }

    pub fn assert_has_errors(&self) -> Result<&Self, HarnessError> {
        if self.errors().is_empty() {
            Err(HarnessError::AssertionFailed {
                detail: format!("expected errors, ops: [{}]", self.op_summary()),
            })
        } else {
            Ok(self)
        }
    }

    pub fn assert_volume(&self, name: &str, expected: f64, tol: f64) -> Result<&Self, HarnessError> {
        let actual = self.volume(name)?;
        if (actual - expected).abs() <= tol {
            Ok(self)
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("'{}' volume: expected {:.4}, got {:.4} (tol={})", name, expected, actual, tol),
            })
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    fn check_name_available(&self, name: &str) -> Result<(), HarnessError> {
        if self.op_id(name).is_ok() {
            return Err(HarnessError::DuplicateName { name: name.into() });
        }
        Ok(())
    }

    fn after_edit(&self) -> Result<(), HarnessError> {
        if self.auto_check {
            self.assert_no_errors()?;
        }
        Ok(())
    }

    fn op_summary(&self) -> String {
        self.studio
            .ops()
            .map(|op| {
                let state = match self.studio.state(op.id) {
                    Some(NodeState::Built(_)) => "built",
                    Some(NodeState::Failed(_)) => "failed",
                    _ => "unbuilt",
                };
                format!("{}:{}:{}", op.name, op.kind.tag(), state)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
