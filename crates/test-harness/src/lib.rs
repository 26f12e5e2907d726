//! Test harness for scripted part-studio workflows.
//!
//! # Key Components
//!
//! - [`StudioBuilder`]: Fluent API for building and checking studios by op name
//! - [`helpers`]: Sketch builders, mesh math, tracing setup
//! - [`assertions`]: Assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod workflow;

pub use helpers::{init_tracing, HarnessError};
pub use workflow::StudioBuilder;
