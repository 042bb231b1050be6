//! # Stagetree
//!
//! A hierarchical stage runner.
//!
//! A stage tree is built from named [`Stage`](stage::Stage)s. Each stage has
//! optional pre- and post-hooks and an ordered list of children; a child may
//! declare that it depends on some of its siblings. Running a stage:
//!
//! - **Validates** its children's dependency graph and rejects cycles
//! - **Runs the pre-hook**, then the children in dependency waves
//! - **Runs the post-hook** once every child succeeded
//!
//! Children run inline one after another, or concurrently on tokio tasks when
//! the parent is async. The first error stops the stage.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagetree::prelude::*;
//!
//! let tree = Stage::new("release")
//!     .set_async(true)
//!     .add_children([
//!         Stage::new("build").set_pre_hook(FnHook::new(|ctx: &ExecutionContext| {
//!             ctx.set_value("artifact", "app.tar.gz");
//!             Ok(())
//!         })),
//!         Stage::new("test").set_depends_on(["build"]),
//!         Stage::new("lint"),
//!     ]);
//!
//! tree.run(&ExecutionContext::new()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod graph;
pub mod stage;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{RunConfig, WaveFailurePolicy};
    pub use crate::context::{ExecutionContext, Scope};
    pub use crate::errors::{StageError, StageErrorKind, UnresolvedDependency};
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::graph::{DependencyGraph, Endpoint};
    pub use crate::stage::{FnHook, Hook, HookResult, Stage, StageState};
}
