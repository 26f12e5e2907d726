use approx::assert_relative_eq;
use shape_kernel::measure::mesh_volume;
use shape_kernel::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn rectangle_face(kernel: &mut dyn Kernel, w: f64, h: f64) -> ShapeHandle {
    let wire = kernel
        .make_polygon(&[[0.0, 0.0, 0.0], [w, 0.0, 0.0], [w, h, 0.0], [0.0, h, 0.0]], true)
        .unwrap();
    let face = kernel.make_face(wire).unwrap();
    assert!(kernel.free_shape(wire));
    face
}

// ── Mock kernel ─────────────────────────────────────────────────────────

#[test]
fn square_extrusion_volume() {
    let mut kernel = MockKernel::new();
    let face = rectangle_face(&mut kernel, 10.0, 10.0);
    let solid = kernel.extrude(face, [0.0, 0.0, 5.0]).unwrap();
    assert_relative_eq!(kernel.volume(solid).unwrap(), 500.0, epsilon = 1e-9);
}

#[test]
fn negative_extrusion_keeps_positive_volume() {
    let mut kernel = MockKernel::new();
    let face = rectangle_face(&mut kernel, 2.0, 3.0);
    let solid = kernel.extrude(face, [0.0, 0.0, -4.0]).unwrap();
    assert_relative_eq!(kernel.volume(solid).unwrap(), 24.0, epsilon = 1e-9);
}

#[test]
fn inputs_survive_derived_shapes() {
    let mut kernel = MockKernel::new();
    let a = kernel.make_box([0.0; 3], [1.0, 1.0, 1.0]).unwrap();
    let b = kernel.translate(a, [3.0, 0.0, 0.0]).unwrap();
    let fused = kernel.fuse(a, b).unwrap();
    assert_eq!(kernel.live_shape_count(), 3);
    assert_relative_eq!(kernel.volume(fused).unwrap(), 2.0, epsilon = 1e-9);
    assert_relative_eq!(kernel.volume(a).unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn produced_minus_freed_equals_live() {
    let mut kernel = MockKernel::new();
    let face = rectangle_face(&mut kernel, 1.0, 1.0);
    let solid = kernel.extrude(face, [0.0, 0.0, 1.0]).unwrap();
    let scaled = kernel.scale(solid, [0.0; 3], 2.0).unwrap();
    assert_relative_eq!(kernel.volume(scaled).unwrap(), 8.0, epsilon = 1e-9);
    kernel.free_shape(face);
    let stats = kernel.stats();
    assert_eq!(
        stats.produced - stats.freed,
        kernel.live_shape_count() as u64
    );
}

#[test]
fn mirror_preserves_volume_and_flips_position() {
    let mut kernel = MockKernel::new();
    let b = kernel.make_box([1.0, 0.0, 0.0], [1.0, 1.0, 1.0]).unwrap();
    let m = kernel.mirror(b, [0.0; 3], [1.0, 0.0, 0.0]).unwrap();
    assert_relative_eq!(kernel.volume(m).unwrap(), 1.0, epsilon = 1e-9);
    let mesh = kernel.mesh(m, 0.1).unwrap();
    let max_x = mesh.positions.iter().step_by(3).cloned().fold(f32::MIN, f32::max);
    assert_relative_eq!(max_x, -1.0);
}

#[test]
fn loft_between_equal_squares_is_a_prism() {
    let mut kernel = MockKernel::new();
    let low = kernel
        .make_polygon(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [0.0, 2.0, 0.0]], true)
        .unwrap();
    let high = kernel.translate(low, [0.0, 0.0, 3.0]).unwrap();
    let solid = kernel.loft(&[low, high]).unwrap();
    assert_relative_eq!(kernel.volume(solid).unwrap(), 12.0, epsilon = 1e-9);
}

#[test]
fn sweep_along_straight_path() {
    let mut kernel = MockKernel::new();
    let face = rectangle_face(&mut kernel, 1.0, 1.0);
    let path = kernel
        .make_polygon(&[[0.0, 0.0, 0.0], [0.0, 0.0, 2.0], [0.0, 0.0, 5.0]], false)
        .unwrap();
    let solid = kernel.sweep(face, path).unwrap();
    assert_relative_eq!(kernel.volume(solid).unwrap(), 5.0, epsilon = 1e-9);
}

#[test]
fn shell_hollows_a_box() {
    let mut kernel = MockKernel::new();
    let b = kernel.make_box([0.0; 3], [10.0, 10.0, 10.0]).unwrap();
    let shelled = kernel.shell(b, &[1], 1.0).unwrap();
    assert_relative_eq!(kernel.volume(shelled).unwrap(), 1000.0 - 512.0, epsilon = 1e-9);
    // Top face removed, five inner faces added.
    assert_eq!(kernel.faces(shelled).unwrap().len(), 10);
}

#[test]
fn stale_handle_is_rejected_everywhere() {
    let mut kernel = MockKernel::new();
    let b = kernel.make_box([0.0; 3], [1.0, 1.0, 1.0]).unwrap();
    kernel.free_shape(b);
    assert!(matches!(kernel.faces(b), Err(KernelError::InvalidHandle { .. })));
    assert!(matches!(kernel.translate(b, [1.0, 0.0, 0.0]), Err(KernelError::InvalidHandle { .. })));
}

// ── Truck kernel ────────────────────────────────────────────────────────

#[test]
fn truck_square_extrusion_volume() {
    let mut kernel = TruckKernel::new();
    let face = rectangle_face(&mut kernel, 10.0, 10.0);
    let solid = kernel.extrude(face, [0.0, 0.0, 5.0]).unwrap();
    assert!((kernel.volume(solid).unwrap() - 500.0).abs() < 0.5);
}

#[test]
fn truck_box_edges_are_sampled() {
    let mut kernel = TruckKernel::new();
    let solid = kernel.make_box([0.0; 3], [2.0, 4.0, 6.0]).unwrap();
    let edges = kernel.edges(solid).unwrap();
    assert_eq!(edges.len(), 12);
    let total: f64 = edges.iter().map(|e| e.length).sum();
    assert_relative_eq!(total, 48.0, epsilon = 1e-6);
    for edge in &edges {
        let m = edge.midpoint;
        assert!(m[0] >= -1e-9 && m[0] <= 2.0 + 1e-9, "midpoint {:?}", m);
        assert!(m[1] >= -1e-9 && m[1] <= 4.0 + 1e-9, "midpoint {:?}", m);
        assert!(m[2] >= -1e-9 && m[2] <= 6.0 + 1e-9, "midpoint {:?}", m);
    }
}
