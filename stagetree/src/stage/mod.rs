//! Stage trees and their scheduler.
//!
//! A [`Stage`] owns an ordered list of children, optional pre- and post-hooks
//! and the names of the siblings it must wait for. Running a stage validates
//! its children, runs the pre-hook, schedules the children wave by wave and
//! finally runs the post-hook.

mod hook;
mod scheduler;
mod state;

pub use hook::{FnHook, Hook, HookResult};
pub use state::StageState;

use crate::graph::DependencyGraph;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

/// A named node of a stage tree.
///
/// Built with a consuming builder:
///
/// ```rust,ignore
/// let tree = Stage::new("release")
///     .set_async(true)
///     .add_children([
///         Stage::new("build"),
///         Stage::new("test").set_depends_on(["build"]),
///         Stage::new("lint"),
///     ]);
/// tree.run(&ExecutionContext::new()).await?;
/// ```
pub struct Stage {
    name: String,
    children: Vec<Arc<Stage>>,
    depends_on: Vec<String>,
    async_mode: bool,
    pre_hook: Option<Arc<dyn Hook>>,
    post_hook: Option<Arc<dyn Hook>>,
}

impl Stage {
    /// Creates a leaf stage without hooks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            depends_on: Vec::new(),
            async_mode: false,
            pre_hook: None,
            post_hook: None,
        }
    }

    /// Appends children in order.
    ///
    /// A child whose name is already taken by a sibling is renamed to the
    /// first free `name_0`, `name_1`, ... so names stay unique within this
    /// stage.
    #[must_use]
    pub fn add_children(mut self, children: impl IntoIterator<Item = Stage>) -> Self {
        for mut child in children {
            child.name = self.unique_child_name(&child.name);
            self.children.push(Arc::new(child));
        }
        self
    }

    /// Appends a single child. See [`add_children`](Self::add_children).
    #[must_use]
    pub fn add_child(self, child: Stage) -> Self {
        self.add_children([child])
    }

    /// Runs ready children concurrently when `true`, inline when `false`.
    #[must_use]
    pub fn set_async(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    /// Sets the hook run before the children.
    #[must_use]
    pub fn set_pre_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.pre_hook = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run after all children succeeded.
    #[must_use]
    pub fn set_post_hook(mut self, hook: impl Hook + 'static) -> Self {
        self.post_hook = Some(Arc::new(hook));
        self
    }

    /// Replaces the names of the siblings this stage waits for.
    ///
    /// Duplicates are dropped; order is kept.
    #[must_use]
    pub fn set_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        self.depends_on = names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| seen.insert(name.clone()))
            .collect();
        self
    }

    /// Returns the stage name, after any collision renaming.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the children in declaration order.
    #[must_use]
    pub fn children(&self) -> &[Arc<Stage>] {
        &self.children
    }

    /// Returns the children's names in declaration order.
    #[must_use]
    pub fn child_names(&self) -> Vec<String> {
        self.children.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns the sibling names this stage waits for.
    #[must_use]
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    /// Returns true if children run concurrently.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.async_mode
    }

    /// Returns true if a pre-hook is set.
    #[must_use]
    pub fn has_pre_hook(&self) -> bool {
        self.pre_hook.is_some()
    }

    /// Returns true if a post-hook is set.
    #[must_use]
    pub fn has_post_hook(&self) -> bool {
        self.post_hook.is_some()
    }

    /// Builds the graph of this stage's direct children.
    #[must_use]
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for child in &self.children {
            graph.add(child.name.clone(), child.depends_on.iter().cloned());
        }
        graph
    }

    fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name == name)
    }

    fn unique_child_name(&self, name: &str) -> String {
        if !self.has_child(name) {
            return name.to_string();
        }
        let mut counter = 0usize;
        loop {
            let candidate = format!("{name}_{counter}");
            if !self.has_child(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    fn dependencies_met(&self, done: &HashSet<String>) -> bool {
        self.depends_on.iter().all(|dep| done.contains(dep))
    }
}

impl Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("async_mode", &self.async_mode)
            .field("depends_on", &self.depends_on)
            .field("children", &self.children)
            .field("pre_hook", &self.pre_hook.is_some())
            .field("post_hook", &self.post_hook.is_some())
            .finish()
    }
}
