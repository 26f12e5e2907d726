pub mod boolean;
pub mod chamfer;
pub mod extrude;
pub mod fillet;
pub mod output;
pub mod pattern;
pub mod primitive;
pub mod profile;
pub mod revolve;
pub mod scratch;
pub mod shell;
pub mod sweep;
pub mod transform;
pub mod types;

pub use boolean::execute_boolean;
pub use chamfer::execute_chamfer;
pub use extrude::execute_extrude;
pub use fillet::execute_fillet;
pub use output::{finish_build, BuildOutput};
pub use pattern::{execute_mirror, execute_pattern};
pub use primitive::{execute_box, execute_cone, execute_cylinder, execute_sphere};
pub use revolve::execute_revolve;
pub use scratch::Scratch;
pub use shell::execute_shell;
pub use sweep::{execute_loft, execute_sweep};
pub use transform::execute_transform;
pub use types::*;
