//! Dependency graph over sibling stage names.
//!
//! This module provides:
//! - Named endpoints carrying their dependency names
//! - Direct and transitive dependency queries
//! - Depth-first cycle detection

mod dependency;

pub use dependency::{DependencyGraph, Endpoint};
