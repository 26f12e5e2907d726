//! Versioned JSON persistence for part studios.

pub mod errors;
pub mod load;
pub mod metadata;
pub mod migrate;
pub mod save;

pub use errors::{LoadError, SaveError};
pub use load::{load_from_path, load_studio, LoadedStudio};
pub use metadata::ProjectMetadata;
pub use save::{save_studio, save_to_path, FORMAT_ID, FORMAT_VERSION};
