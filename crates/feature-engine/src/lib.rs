//! Parametric feature history: part studios, their op graph, parameters and
//! the incremental rebuild that turns them into solids.

pub mod config;
mod fingerprint;
pub mod graph;
pub mod params;
pub mod rebuild;
pub mod references;
pub mod resources;
pub mod session;
pub mod studio;
pub mod timeline;
pub mod types;
pub mod worker;
pub mod workspace;

pub use config::EngineConfig;
pub use params::{ParamEnv, ParamError, ParamInput, Parameter, Unit};
pub use rebuild::{rebuild, rebuild_with, RebuildReport};
pub use references::referenced_entities;
pub use session::StudioSession;
pub use studio::{PartStudio, StudioMeta};
pub use timeline::{Timeline, TimelinePosition};
pub use types::*;
pub use worker::{GenerationCounter, StudioFrame, StudioWorker};
pub use workspace::Workspace;

pub use modeling_ops::{BooleanKind, EdgeSelection};
