//! Execution context shared by a stage and its descendants.
//!
//! This module provides:
//! - Layered key/value scopes with child-over-parent shadowing
//! - The cancellation source, event sink and run id of a run

mod execution;
mod scope;
#[cfg(test)]
mod context_tests;

pub use execution::{ExecutionContext, STAGE_NAME_KEY};
pub use scope::Scope;
