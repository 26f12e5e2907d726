//! Helper functions: error type, sketch builders, mesh math, tracing setup.

use history_types::{Constraint, PlaneId, Sketch};
use shape_kernel::Mesh;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("op not found: {name}")]
    OpNotFound { name: String },

    #[error("sketch not found: {name}")]
    SketchNotFound { name: String },

    #[error("plane not found: {name}")]
    PlaneNotFound { name: String },

    #[error("no solid for op: {name}")]
    NoSolid { name: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("engine error: {0}")]
    Engine(#[from] feature_engine::EngineError),

    #[error("kernel error: {0}")]
    Kernel(#[from] shape_kernel::KernelError),

    #[error("file error: {0}")]
    File(String),

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },
}

// ── Tracing ─────────────────────────────────────────────────────────────────

/// Install a test-friendly subscriber honoring `RUST_LOG`. Safe to call from
/// every test; only the first call wins.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feature_engine=info,modeling_ops=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

// ── Sketch Builders ─────────────────────────────────────────────────────────

/// A fully constrained `w` × `h` rectangle with its first corner at (x, y).
/// Left unsolved; the rebuild solves it.
pub fn rect_sketch(name: &str, plane: PlaneId, x: f64, y: f64, w: f64, h: f64) -> Sketch {
    let mut sketch = Sketch::new(name, plane);
    let p1 = sketch.add_point(x, y);
    let p2 = sketch.add_point(x + w, y);
    let p3 = sketch.add_point(x + w, y + h);
    let p4 = sketch.add_point(x, y + h);
    let l1 = sketch.add_line(p1, p2);
    let l2 = sketch.add_line(p2, p3);
    let l3 = sketch.add_line(p3, p4);
    let l4 = sketch.add_line(p4, p1);
    sketch.add_constraint(Constraint::Fixed { point: p1, x, y });
    sketch.add_constraint(Constraint::Horizontal { line: l1 });
    sketch.add_constraint(Constraint::Horizontal { line: l3 });
    sketch.add_constraint(Constraint::Vertical { line: l2 });
    sketch.add_constraint(Constraint::Vertical { line: l4 });
    sketch.add_constraint(Constraint::Distance { a: p1, b: p2, value: w });
    sketch.add_constraint(Constraint::Distance { a: p2, b: p3, value: h });
    sketch
}

/// A fully constrained circle of radius `r` centered at (cx, cy).
pub fn circle_sketch(name: &str, plane: PlaneId, cx: f64, cy: f64, r: f64) -> Sketch {
    let mut sketch = Sketch::new(name, plane);
    let center = sketch.add_point(cx, cy);
    let circle = sketch.add_circle(center, r);
    sketch.add_constraint(Constraint::Fixed { point: center, x: cx, y: cy });
    sketch.add_constraint(Constraint::Radius { circle, value: r });
    sketch
}

// ── Mesh Math ───────────────────────────────────────────────────────────────

/// Axis-aligned bounds of a mesh's vertices.
pub fn mesh_bounding_box(mesh: &Mesh) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];

    for chunk in mesh.positions.chunks(3) {
        if chunk.len() < 3 {
            continue;
        }
        for i in 0..3 {
            min[i] = min[i].min(chunk[i]);
            max[i] = max[i].max(chunk[i]);
        }
    }

    (min, max)
}

pub fn triangle_count(mesh: &Mesh) -> usize {
    mesh.indices.len() / 3
}
