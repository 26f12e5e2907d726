pub mod cache;
pub mod profiles;
pub mod relaxation;
pub mod traits;
pub mod types;

pub use cache::SketchCache;
pub use profiles::{extract_path, extract_regions, Region};
pub use relaxation::{RelaxationSolver, SolverConfig};
pub use traits::SketchSolver;
pub use types::*;
