pub mod fingerprint;
pub mod geom;
pub mod ids;
pub mod pairs;
pub mod scalar;
pub mod sketch;

pub use fingerprint::*;
pub use geom::*;
pub use ids::*;
pub use scalar::*;
pub use sketch::*;
