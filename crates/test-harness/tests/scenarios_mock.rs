//! Workflow regression tests against MockKernel.
//!
//! These scenarios drive the full edit → rebuild path through StudioBuilder
//! and check volumes, failure propagation and handle accounting at each step.

use std::f64::consts::PI;
use std::time::Duration;

use approx::assert_relative_eq;

use feature_engine::{
    EdgeSelection, EngineConfig, EntityRef, NodeState, Op, OpError, OpKind, StudioFrame, StudioSession, StudioWorker,
    TimelinePosition,
};
use shape_kernel::MockKernel;
use test_harness::assertions::{assert_bounding_box, assert_executed, assert_failed_with, assert_handles_balanced};
use test_harness::StudioBuilder;

// ── Scenario 1: Sketch + extrude ────────────────────────────────────────

#[test]
fn square_extrude_then_rollback() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("block", "sk", 5.0).unwrap();

    m.assert_op_count(2).unwrap();
    m.assert_volume("block", 500.0, 1e-6).unwrap();
    assert!(m.state("sk").unwrap().is_built());
    assert!(m.state("sk").unwrap().result().unwrap().shape.is_none());

    m.rollback(TimelinePosition::Index(0));
    assert_eq!(m.state("block").unwrap(), &NodeState::Unbuilt);
    assert!(m.state("sk").unwrap().is_built());
    assert_handles_balanced(m.session(), "after rollback").unwrap();

    m.rollback(TimelinePosition::Tip);
    m.assert_volume("block", 500.0, 1e-6).unwrap();
}

#[test]
fn block_mesh_matches_its_bounds() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [2., 3.], 10., 4.).unwrap();
    m.extrude("block", "sk", 6.0).unwrap();

    let mesh = m.mesh("block").unwrap();
    assert_bounding_box(&mesh, [2., 3., 0.], [12., 7., 6.], 1e-4, "block").unwrap();
    assert_eq!(test_harness::helpers::triangle_count(&mesh), 12);
}

// ── Scenario 2: Parameters ──────────────────────────────────────────────

#[test]
fn parameter_edit_reexecutes_only_dependents() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.parameter("depth", "4").unwrap();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("block", "sk", history_types::Scalar::expr("depth * 2")).unwrap();
    m.box_solid("other", [50., 0., 0.], [1., 1., 1.]).unwrap();
    m.assert_volume("block", 800.0, 1e-6).unwrap();

    m.set_parameter("depth", "1").unwrap();
    m.assert_volume("block", 200.0, 1e-6).unwrap();
    assert_executed(m.report(), 1, "parameter edit").unwrap();
    assert_eq!(m.report().reused, 2);
}

#[test]
fn broken_parameter_fails_its_users_only() {
    let mut m = StudioBuilder::mock();
    m.parameter("depth", "4").unwrap();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("block", "sk", history_types::Scalar::expr("depth")).unwrap();
    m.box_solid("other", [50., 0., 0.], [1., 1., 1.]).unwrap();

    m.set_parameter("depth", "1 / 0").unwrap();
    assert_failed_with(
        m.state("block").unwrap(),
        |e| matches!(e, OpError::InvalidParameter { .. }),
        "division by zero",
    )
    .unwrap();
    m.assert_has_solid("other").unwrap();
}

// ── Scenario 3: Sketch edits ────────────────────────────────────────────

#[test]
fn widening_the_sketch_grows_the_block() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("block", "sk", 5.0).unwrap();

    m.edit_sketch("sk", |sketch| {
        for constraint in sketch.constraints.values_mut() {
            if let history_types::Constraint::Distance { value, .. } = constraint {
                *value = 20.0;
            }
        }
    })
    .unwrap();
    m.assert_volume("block", 2000.0, 1e-2).unwrap();
}

#[test]
fn circle_extrude_approximates_a_cylinder() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.circle_sketch("sk", "XY", [0., 0.], 5.).unwrap();
    m.extrude("rod", "sk", 10.0).unwrap();
    assert_relative_eq!(m.volume("rod").unwrap(), PI * 25.0 * 10.0, max_relative = 0.01);
}

// ── Scenario 4: Revolve ─────────────────────────────────────────────────

#[test]
fn revolve_ring_follows_pappus() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.rect_sketch("sk", "XY", [5., 0.], 5., 5.).unwrap();
    m.revolve("ring", "sk", [0., 0., 0.], [0., 1., 0.], 360.0).unwrap();
    // area 25, centroid radius 7.5
    m.assert_volume("ring", 25.0 * 2.0 * PI * 7.5, 1e-3).unwrap();
}

// ── Scenario 5: Finishing ops ───────────────────────────────────────────

#[test]
fn fillet_chamfer_and_shell_remove_material() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.box_solid("cube", [0., 0., 0.], [10., 10., 10.]).unwrap();
    m.fillet("rounded", "cube", 0.5).unwrap();
    m.chamfer("bevel", "cube", vec![0], 1.0).unwrap();
    m.shell("hollow", "cube", vec![], 1.0).unwrap();

    let rounded = m.volume("rounded").unwrap();
    assert!(rounded < 1000.0 && rounded > 990.0, "fillet volume {}", rounded);
    m.assert_volume("bevel", 1000.0 - 0.5 * 10.0, 1e-9).unwrap();
    m.assert_volume("hollow", 1000.0 - 512.0, 1e-9).unwrap();
}

#[test]
fn oversized_fillet_fails_without_leaking() {
    let mut m = StudioBuilder::mock();
    m.box_solid("cube", [0., 0., 0.], [1., 1., 1.]).unwrap();
    m.fillet("rounded", "cube", 5.0).unwrap();
    m.translate("moved", "rounded", [3., 0., 0.]).unwrap();

    assert_failed_with(
        m.state("rounded").unwrap(),
        |e| matches!(e, OpError::KernelFailure(_) | OpError::InvalidParameter { .. }),
        "oversized fillet",
    )
    .unwrap();
    let rounded = m.op_id("rounded").unwrap();
    assert_eq!(
        m.error("moved").unwrap(),
        Some(&OpError::UpstreamFailure {
            upstream: EntityRef::Op(rounded)
        })
    );
    assert_handles_balanced(m.session(), "failed fillet").unwrap();
}

// ── Scenario 6: Booleans, patterns, mirror ──────────────────────────────

#[test]
fn booleans_of_overlapping_blocks() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.rect_sketch("sk1", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("a", "sk1", 10.0).unwrap();
    m.rect_sketch("sk2", "XY", [5., 0.], 10., 10.).unwrap();
    m.extrude("b", "sk2", 10.0).unwrap();

    m.boolean_union("union", "a", "b").unwrap();
    m.boolean_subtract("diff", "a", "b").unwrap();
    m.boolean_intersect("common", "a", "b").unwrap();

    m.assert_volume("union", 1500.0, 1e-6).unwrap();
    m.assert_volume("diff", 500.0, 1e-6).unwrap();
    m.assert_volume("common", 500.0, 1e-6).unwrap();
    assert_handles_balanced(m.session(), "booleans").unwrap();
}

#[test]
fn pattern_and_mirror_copy_the_body() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.box_solid("peg", [1., 0., 0.], [1., 1., 1.]).unwrap();
    m.linear_pattern("row", "peg", [1., 0., 0.], 3.0, 4).unwrap();
    m.mirror("pair", "peg", [0., 0., 0.], [1., 0., 0.], true).unwrap();

    m.assert_volume("row", 4.0, 1e-9).unwrap();
    m.assert_volume("pair", 2.0, 1e-9).unwrap();
}

#[test]
fn pattern_count_over_the_limit_is_rejected() {
    let mut m = StudioBuilder::mock();
    m.box_solid("peg", [0., 0., 0.], [1., 1., 1.]).unwrap();
    m.linear_pattern("row", "peg", [1., 0., 0.], 2.0, 100_000).unwrap();
    assert_failed_with(
        m.state("row").unwrap(),
        |e| matches!(e, OpError::InvalidParameter { .. }),
        "pattern count",
    )
    .unwrap();
}

// ── Scenario 7: History edits ───────────────────────────────────────────

#[test]
fn suppress_and_unsuppress_restore_the_body() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("block", "sk", 5.0).unwrap();
    m.fillet("rounded", "block", 0.5).unwrap();
    let before = m.state("rounded").unwrap().result().unwrap().fingerprint;

    m.suppress("block").unwrap();
    assert_eq!(m.state("block").unwrap(), &NodeState::Unbuilt);
    assert!(matches!(
        m.error("rounded").unwrap(),
        Some(OpError::UpstreamFailure { .. })
    ));

    m.unsuppress("block").unwrap();
    m.assert_no_errors().unwrap();
    assert_eq!(m.state("rounded").unwrap().result().unwrap().fingerprint, before);
    assert_handles_balanced(m.session(), "unsuppress").unwrap();
}

#[test]
fn deleting_a_target_leaves_dependents_dangling() {
    let mut m = StudioBuilder::mock();
    m.box_solid("cube", [0., 0., 0.], [2., 2., 2.]).unwrap();
    m.translate("moved", "cube", [5., 0., 0.]).unwrap();
    let cube = m.op_id("cube").unwrap();

    m.delete("cube").unwrap();
    m.assert_op_count(1).unwrap();
    assert_eq!(
        m.error("moved").unwrap(),
        Some(&OpError::DanglingReference {
            missing: EntityRef::Op(cube)
        })
    );
    assert_eq!(m.session().kernel().live_shape_count(), 0);
}

#[test]
fn reorder_rejects_moving_above_a_dependency() {
    let mut m = StudioBuilder::mock();
    m.box_solid("cube", [0., 0., 0.], [2., 2., 2.]).unwrap();
    m.translate("moved", "cube", [5., 0., 0.]).unwrap();
    m.box_solid("other", [9., 0., 0.], [1., 1., 1.]).unwrap();

    assert!(m.reorder("moved", 0).is_err());
    m.reorder("other", 0).unwrap();
    assert_eq!(m.studio().position(m.op_id("other").unwrap()), Some(0));
    m.assert_no_errors().unwrap();
}

#[test]
fn inserting_behind_the_cursor_builds_only_up_to_it() {
    let mut m = StudioBuilder::mock();
    m.box_solid("a", [0., 0., 0.], [1., 1., 1.]).unwrap();
    m.box_solid("c", [4., 0., 0.], [1., 1., 1.]).unwrap();
    m.rollback(TimelinePosition::Index(0));
    m.box_solid("b", [2., 0., 0.], [1., 1., 1.]).unwrap();

    assert_eq!(m.position(), TimelinePosition::Index(1));
    assert_eq!(m.studio().position(m.op_id("b").unwrap()), Some(1));
    m.assert_has_solid("b").unwrap();
    assert_eq!(m.state("c").unwrap(), &NodeState::Unbuilt);
}

// ── Scenario 8: Save / load ─────────────────────────────────────────────

#[test]
fn saved_studio_rebuilds_to_the_same_volumes() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.parameter("h", "3").unwrap();
    m.rect_sketch("sk", "XY", [0., 0.], 4., 5.).unwrap();
    m.extrude("block", "sk", history_types::Scalar::expr("h")).unwrap();
    m.translate("moved", "block", [0., 0., 10.]).unwrap();
    let json = m.save().unwrap();

    let mut restored = StudioBuilder::mock().with_auto_check();
    restored.load(&json).unwrap();
    restored.assert_op_count(3).unwrap();
    restored.assert_volume("moved", 60.0, 1e-6).unwrap();
}

// ── Scenario 9: Background worker ───────────────────────────────────────

#[test]
fn worker_frames_carry_bodies_and_errors() {
    let mut studio = feature_engine::PartStudio::new("worker");
    let cube = Op::new(
        "cube",
        OpKind::Box {
            origin: [0.0; 3],
            dx: 1.0.into(),
            dy: 1.0.into(),
            dz: 1.0.into(),
        },
    );
    let cube_id = studio.insert_op(cube, 0).unwrap();
    let session = StudioSession::new(MockKernel::new(), EngineConfig::default());
    let worker = StudioWorker::spawn(studio, session).unwrap();

    let too_round = Op::new(
        "too round",
        OpKind::Fillet {
            target: cube_id,
            edges: EdgeSelection::All,
            radius: 9.0.into(),
        },
    );
    let bad = too_round.id;
    let generation = worker.edit(move |studio| studio.insert_op(too_round, 1).map(|_| ()));

    let frame: StudioFrame = worker.wait_for(generation, Duration::from_secs(10)).unwrap();
    assert_eq!(frame.generation, generation);
    assert_eq!(frame.bodies.len(), 1);
    assert_eq!(frame.bodies[0].op, cube_id);
    assert_eq!(frame.errors.len(), 1);
    assert_eq!(frame.errors[0].0, bad);
    assert_eq!(worker.shutdown().unwrap().len(), 2);
}
