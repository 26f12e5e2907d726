//! Tests for the StudioBuilder workflow API.

use feature_engine::{NodeState, OpKind, TimelinePosition};
use history_types::Scalar;
use test_harness::{HarnessError, StudioBuilder};

#[test]
fn rect_sketch_creates_a_sketch_op() {
    let mut m = StudioBuilder::mock();
    let id = m.rect_sketch("my_sketch", "XY", [0., 0.], 10., 10.).unwrap();
    assert_eq!(m.op_count(), 1);
    assert_eq!(m.sketch_id("my_sketch").unwrap(), id);
    let op = m.studio().op(m.op_id("my_sketch").unwrap()).unwrap();
    assert_eq!(op.kind, OpKind::Sketch { sketch: id });
}

#[test]
fn extrude_by_name() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    let ex = m.extrude("box", "sk", 10.0).unwrap();
    assert_eq!(m.op_count(), 2);
    assert_eq!(m.op_id("box").unwrap(), ex);
    m.assert_has_solid("box").unwrap();
    assert_eq!(m.mesh("box").unwrap().indices.len(), 36);
}

#[test]
fn lookups_fail_with_the_missing_name() {
    let m = StudioBuilder::mock();
    assert!(matches!(m.op_id("nope"), Err(HarnessError::OpNotFound { name }) if name == "nope"));
    assert!(matches!(m.sketch_id("nope"), Err(HarnessError::SketchNotFound { .. })));
    assert!(matches!(m.plane("Diagonal"), Err(HarnessError::PlaneNotFound { .. })));
}

#[test]
fn default_planes_are_available() {
    let m = StudioBuilder::mock();
    for name in ["XY", "XZ", "YZ"] {
        m.plane(name).unwrap();
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    assert!(matches!(
        m.rect_sketch("sk", "XY", [0., 0.], 5., 5.),
        Err(HarnessError::DuplicateName { .. })
    ));
    m.box_solid("b", [0.; 3], [1.; 3]).unwrap();
    assert!(m.box_solid("b", [0.; 3], [1.; 3]).is_err());
    assert_eq!(m.op_count(), 2);
}

#[test]
fn auto_check_surfaces_op_errors() {
    let mut m = StudioBuilder::mock().with_auto_check();
    m.box_solid("cube", [0.; 3], [1.; 3]).unwrap();
    let result = m.fillet("rounded", "cube", 5.0);
    assert!(matches!(result, Err(HarnessError::AssertionFailed { .. })));
    // The op is still in the history, just failed.
    assert!(matches!(m.state("rounded").unwrap(), NodeState::Failed(_)));
    m.assert_has_errors().unwrap();
}

#[test]
fn edit_replaces_op_parameters() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("box", "sk", 10.0).unwrap();
    let sketch = m.sketch_id("sk").unwrap();

    m.edit(
        "box",
        OpKind::Extrude {
            sketch,
            depth: Scalar::Value(2.0),
            direction: None,
            symmetric: true,
        },
    )
    .unwrap();
    m.assert_volume("box", 200.0, 1e-6).unwrap();
}

#[test]
fn errors_are_listed_by_name() {
    let mut m = StudioBuilder::mock();
    m.box_solid("cube", [0.; 3], [1.; 3]).unwrap();
    m.fillet("rounded", "cube", 5.0).unwrap();
    m.translate("moved", "rounded", [1., 0., 0.]).unwrap();

    let names: Vec<String> = m.errors().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["rounded", "moved"]);
}

#[test]
fn rollback_and_forward_again() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("box", "sk", 10.0).unwrap();

    m.rollback(TimelinePosition::Index(0));
    assert_eq!(m.position(), TimelinePosition::Index(0));
    assert!(m.solid("box").is_err());

    m.rollback(TimelinePosition::Tip);
    m.assert_has_solid("box").unwrap();
}

#[test]
fn save_load_roundtrip_keeps_names() {
    let mut m = StudioBuilder::mock();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.extrude("box", "sk", 10.0).unwrap();

    let json = m.save().unwrap();
    assert!(json.contains("part-studio"));

    let mut m2 = StudioBuilder::mock();
    m2.load(&json).unwrap();
    assert_eq!(m2.op_count(), 2);
    assert_eq!(m2.op_id("box").unwrap(), m.op_id("box").unwrap());
    m2.assert_volume("box", 1000.0, 1e-6).unwrap();
}

#[test]
fn load_rejects_garbage() {
    let mut m = StudioBuilder::mock();
    assert!(matches!(m.load("{}"), Err(HarnessError::File(_))));
}

#[test]
fn assert_op_count_works() {
    let mut m = StudioBuilder::mock();
    m.assert_op_count(0).unwrap();
    m.rect_sketch("sk", "XY", [0., 0.], 10., 10.).unwrap();
    m.assert_op_count(1).unwrap();
    assert!(m.assert_op_count(5).is_err());
}
