//! TruckKernel scenario tests.
//!
//! These run against real truck geometry. Volumes come from tessellated
//! meshes, so tolerances are loose. Operations truck cannot do surface as
//! kernel failures on the op instead of aborting the rebuild.

use std::f64::consts::PI;

use feature_engine::{OpError, TimelinePosition};
use test_harness::assertions::{assert_failed_with, assert_handles_balanced};
use test_harness::StudioBuilder;

#[test]
fn truck_box_extrude() {
    let mut m = StudioBuilder::truck().with_auto_check();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("box", "sk", 10.0).unwrap();

    m.assert_volume("box", 1000.0, 1.0).unwrap();
    let mesh = m.mesh("box").unwrap();
    assert!(!mesh.indices.is_empty());
    assert_eq!(mesh.positions.len(), mesh.normals.len());
}

#[test]
fn truck_revolve() {
    let mut m = StudioBuilder::truck().with_auto_check();
    m.rect_sketch("sk", "XY", [5., 0.], 5., 5.).unwrap();
    m.revolve("ring", "sk", [0., 0., 0.], [0., 1., 0.], 360.0).unwrap();

    let expected = 25.0 * 2.0 * PI * 7.5;
    let v = m.volume("ring").unwrap();
    assert!((v - expected).abs() / expected < 0.05, "ring volume {} vs {}", v, expected);
}

#[test]
fn truck_circle_extrude() {
    let mut m = StudioBuilder::truck().with_auto_check();
    m.circle_sketch("circle", "XY", [0., 0.], 5.).unwrap();
    m.extrude("cyl", "circle", 10.0).unwrap();
    assert!(!m.mesh("cyl").unwrap().indices.is_empty());
}

#[test]
fn truck_offset_union() {
    let mut m = StudioBuilder::truck().with_auto_check();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("a", "sk", 10.0).unwrap();
    m.box_solid("b", [5., 5., 5.], [10., 10., 10.]).unwrap();
    m.boolean_union("merged", "a", "b").unwrap();

    let v = m.volume("merged").unwrap();
    assert!((v - 1875.0).abs() < 20.0, "union volume {}", v);
}

#[test]
fn truck_offset_subtract() {
    let mut m = StudioBuilder::truck().with_auto_check();
    m.box_solid("a", [0., 0., 0.], [10., 10., 10.]).unwrap();
    m.box_solid("b", [2., 2., 5.], [6., 6., 10.]).unwrap();
    m.boolean_subtract("pocket", "a", "b").unwrap();

    let v = m.volume("pocket").unwrap();
    assert!((v - 820.0).abs() < 10.0, "pocket volume {}", v);
}

#[test]
fn truck_fillet_is_reported_on_the_op() {
    let mut m = StudioBuilder::truck();
    m.box_solid("cube", [0., 0., 0.], [10., 10., 10.]).unwrap();
    m.fillet("rounded", "cube", 1.0).unwrap();

    m.assert_has_solid("cube").unwrap();
    assert_failed_with(
        m.state("rounded").unwrap(),
        |e| matches!(e, OpError::KernelFailure(msg) if msg.contains("fillet")),
        "truck fillet",
    )
    .unwrap();
    assert_handles_balanced(m.session(), "truck fillet").unwrap();
}

#[test]
fn truck_save_load_roundtrip() {
    let mut m = StudioBuilder::truck().with_auto_check();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("box", "sk", 10.0).unwrap();
    let json = m.save().unwrap();

    let mut restored = StudioBuilder::truck().with_auto_check();
    restored.load(&json).unwrap();
    restored.assert_op_count(2).unwrap();
    restored.assert_has_solid("box").unwrap();
}

#[test]
fn truck_rollback_releases_shapes() {
    let mut m = StudioBuilder::truck();
    m.box_solid("a", [0., 0., 0.], [1., 1., 1.]).unwrap();
    m.translate("moved", "a", [3., 0., 0.]).unwrap();
    m.rollback(TimelinePosition::Index(-1));
    assert_eq!(m.session().kernel().live_shape_count(), 0);
    assert_handles_balanced(m.session(), "rollback").unwrap();
}
