use history_types::{Constraint, ElementId, PlaneId, Sketch, SolveStatus, Vec2};
use proptest::prelude::*;
use sketch_solver::profiles::signed_area;
use sketch_solver::*;

// ── Helpers ─────────────────────────────────────────────────────────────────

struct Rect {
    sketch: Sketch,
    corners: [ElementId; 4],
}

/// A roughly drawn rectangle constrained to `w` × `h` with its first corner at the origin.
fn constrained_rectangle(w: f64, h: f64) -> Rect {
    let mut sketch = Sketch::new("rect", PlaneId::new());
    let p1 = sketch.add_point(0.3, -0.2);
    let p2 = sketch.add_point(w * 0.8, 0.5);
    let p3 = sketch.add_point(w * 1.1, h * 0.9);
    let p4 = sketch.add_point(-0.4, h * 1.2);
    let l1 = sketch.add_line(p1, p2);
    let l2 = sketch.add_line(p2, p3);
    let l3 = sketch.add_line(p3, p4);
    let l4 = sketch.add_line(p4, p1);
    sketch.add_constraint(Constraint::Fixed { point: p1, x: 0.0, y: 0.0 });
    sketch.add_constraint(Constraint::Horizontal { line: l1 });
    sketch.add_constraint(Constraint::Horizontal { line: l3 });
    sketch.add_constraint(Constraint::Vertical { line: l2 });
    sketch.add_constraint(Constraint::Vertical { line: l4 });
    sketch.add_constraint(Constraint::Distance { a: p1, b: p2, value: w });
    sketch.add_constraint(Constraint::Distance { a: p2, b: p3, value: h });
    Rect {
        sketch,
        corners: [p1, p2, p3, p4],
    }
}

fn assert_point_near(positions: &std::collections::BTreeMap<ElementId, Vec2>, id: ElementId, expected: (f64, f64)) {
    let p = positions
        .get(&id)
        .unwrap_or_else(|| panic!("point {} not found in positions", id));
    assert!(
        (p.x - expected.0).abs() < 1e-6 && (p.y - expected.1).abs() < 1e-6,
        "point {} = ({:.6}, {:.6}), expected ({:.4}, {:.4})",
        id,
        p.x,
        p.y,
        expected.0,
        expected.1,
    );
}

// ── Solve ───────────────────────────────────────────────────────────────────

#[test]
fn rectangle_100x50_fully_constrained() {
    let rect = constrained_rectangle(100.0, 50.0);
    let out = RelaxationSolver::default().solve(&rect.sketch).unwrap();
    assert_eq!(out.status, SolveStatus::FullyConstrained);
    assert_eq!(out.dof, 0);
    let [p1, p2, p3, p4] = rect.corners;
    assert_point_near(&out.positions, p1, (0.0, 0.0));
    assert_point_near(&out.positions, p2, (100.0, 0.0));
    assert_point_near(&out.positions, p3, (100.0, 50.0));
    assert_point_near(&out.positions, p4, (0.0, 50.0));
}

#[test]
fn free_points_report_their_freedom() {
    let mut sketch = Sketch::new("free", PlaneId::new());
    let a = sketch.add_point(0.0, 0.0);
    let b = sketch.add_point(4.0, 0.0);
    sketch.add_line(a, b);
    let out = RelaxationSolver::default().solve(&sketch).unwrap();
    assert_eq!(out.status, SolveStatus::UnderConstrained);
    assert_eq!(out.dof, 4);
    assert_point_near(&out.positions, b, (4.0, 0.0));
}

#[test]
fn perpendicular_lines_meet_at_right_angle() {
    let mut sketch = Sketch::new("perp", PlaneId::new());
    let o = sketch.add_point(0.0, 0.0);
    let a = sketch.add_point(5.0, 0.0);
    let b = sketch.add_point(1.0, 4.0);
    let la = sketch.add_line(o, a);
    let lb = sketch.add_line(o, b);
    sketch.add_constraint(Constraint::Fixed { point: o, x: 0.0, y: 0.0 });
    sketch.add_constraint(Constraint::Horizontal { line: la });
    sketch.add_constraint(Constraint::Perpendicular { a: la, b: lb });
    let out = RelaxationSolver::default().solve(&sketch).unwrap();
    assert!(out.positions[&b].x.abs() < 1e-6);
}

#[test]
fn equal_lines_share_length() {
    let mut sketch = Sketch::new("eq", PlaneId::new());
    let a = sketch.add_point(0.0, 0.0);
    let b = sketch.add_point(3.0, 0.0);
    let c = sketch.add_point(0.0, 1.0);
    let d = sketch.add_point(7.0, 1.0);
    let l1 = sketch.add_line(a, b);
    let l2 = sketch.add_line(c, d);
    sketch.add_constraint(Constraint::Equal { a: l1, b: l2 });
    let out = RelaxationSolver::default().solve(&sketch).unwrap();
    let len1 = out.positions[&a].distance(out.positions[&b]);
    let len2 = out.positions[&c].distance(out.positions[&d]);
    assert!((len1 - len2).abs() < 1e-6);
}

// ── Cache + profiles ────────────────────────────────────────────────────────

#[test]
fn cached_rectangle_yields_one_ccw_region() {
    let mut rect = constrained_rectangle(10.0, 10.0);
    let mut cache: SketchCache = SketchCache::default();
    cache.ensure_solved(&mut rect.sketch);
    assert!(rect.sketch.is_usable_profile());

    let regions = extract_regions(&rect.sketch).unwrap();
    assert_eq!(regions.len(), 1);
    assert!((signed_area(&regions[0].outer) - 100.0).abs() < 1e-6);
    assert!(regions[0].holes.is_empty());
}

#[test]
fn over_constrained_sketch_yields_no_region() {
    let mut rect = constrained_rectangle(10.0, 10.0);
    let [p1, p2, ..] = rect.corners;
    rect.sketch
        .add_constraint(Constraint::Distance { a: p1, b: p2, value: 10.0 });
    let mut cache: SketchCache = SketchCache::default();
    cache.ensure_solved(&mut rect.sketch);
    assert_eq!(rect.sketch.solve_status, SolveStatus::OverConstrained);
    assert_eq!(extract_regions(&rect.sketch), Err(ProfileError::NotSolved));
}

proptest! {
    #[test]
    fn fixed_point_is_honored(x in -1e3..1e3f64, y in -1e3..1e3f64) {
        let mut sketch = Sketch::new("fixed", PlaneId::new());
        let p = sketch.add_point(0.0, 0.0);
        sketch.add_constraint(Constraint::Fixed { point: p, x, y });
        let out = RelaxationSolver::default().solve(&sketch).unwrap();
        prop_assert_eq!(out.status, SolveStatus::FullyConstrained);
        prop_assert!((out.positions[&p].x - x).abs() < 1e-6);
        prop_assert!((out.positions[&p].y - y).abs() < 1e-6);
    }
}
