//! Name-keyed dependency graph with DFS cycle detection.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// A named node in a [`DependencyGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    name: String,
    dependencies: Vec<String>,
}

impl Endpoint {
    /// Returns the endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared dependency names, including dangling ones.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// A directed graph from endpoint name to the names it depends on.
///
/// Dependency names that were never added are tolerated everywhere: they are
/// dropped from queries rather than reported as errors. Traversal state lives
/// in per-call sets, so the graph itself is never mutated by a query.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    endpoints: HashMap<String, Endpoint>,
    /// Insertion order, for deterministic traversal.
    order: Vec<String>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the endpoint under `name`. Last write wins.
    pub fn add<I, S>(&mut self, name: impl Into<String>, dependencies: I) -> &Endpoint
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let endpoint = Endpoint {
            name: name.clone(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        };

        match self.endpoints.entry(name) {
            Entry::Occupied(mut slot) => {
                slot.insert(endpoint);
                slot.into_mut()
            }
            Entry::Vacant(slot) => {
                self.order.push(slot.key().clone());
                slot.insert(endpoint)
            }
        }
    }

    /// Returns the endpoint under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    /// Returns true if `name` was added.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Returns the number of endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns true if the graph has no endpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Returns endpoint names in insertion order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Returns the dependencies of `name` that are present in the graph.
    #[must_use]
    pub fn direct_dependencies(&self, name: &str) -> Vec<String> {
        self.endpoints
            .get(name)
            .map(|endpoint| {
                endpoint
                    .dependencies
                    .iter()
                    .filter(|dep| self.endpoints.contains_key(dep.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns every transitive dependency of `name`, depth-first.
    ///
    /// A dependency's own ancestors come before it. Nothing is de-duplicated,
    /// so a diamond yields the shared ancestor once per path.
    #[must_use]
    pub fn ancestors(&self, name: &str) -> Vec<&Endpoint> {
        let mut result = Vec::new();
        let Some(endpoint) = self.endpoints.get(name) else {
            return result;
        };

        let mut path = HashSet::new();
        path.insert(endpoint.name.as_str());
        self.collect_ancestors(endpoint, &mut path, &mut result);
        result
    }

    fn collect_ancestors<'a>(
        &'a self,
        parent: &'a Endpoint,
        path: &mut HashSet<&'a str>,
        result: &mut Vec<&'a Endpoint>,
    ) {
        for dep in &parent.dependencies {
            let Some(endpoint) = self.endpoints.get(dep.as_str()) else {
                continue;
            };
            // Already on the expansion path: a cycle, do not loop.
            if !path.insert(endpoint.name.as_str()) {
                continue;
            }
            self.collect_ancestors(endpoint, path, result);
            path.remove(endpoint.name.as_str());
            result.push(endpoint);
        }
    }

    /// Returns true if any directed cycle exists among present endpoints.
    #[must_use]
    pub fn detect_cycles(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Returns the first cycle found, as a path whose last element repeats
    /// the first (`a -> b -> a`).
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();

        for name in &self.order {
            if visited.contains(name.as_str()) {
                continue;
            }
            if let Some(cycle) = self.visit(name, &mut visited, &mut on_stack, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        visited: &mut HashSet<&'a str>,
        on_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(name);
        on_stack.insert(name);
        path.push(name);

        if let Some(endpoint) = self.endpoints.get(name) {
            for dep in &endpoint.dependencies {
                let dep = dep.as_str();
                if !visited.contains(dep) {
                    if let Some(cycle) = self.visit(dep, visited, on_stack, path) {
                        return Some(cycle);
                    }
                } else if on_stack.contains(dep) {
                    let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| (*n).to_string()).collect();
                    cycle.push(dep.to_string());
                    return Some(cycle);
                }
            }
        }

        on_stack.remove(name);
        path.pop();
        None
    }

    /// Returns `(endpoint, dependency)` pairs whose dependency was never added.
    #[must_use]
    pub fn dangling_dependencies(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|name| self.endpoints.get(name))
            .flat_map(|endpoint| {
                endpoint
                    .dependencies
                    .iter()
                    .filter(|dep| !self.endpoints.contains_key(dep.as_str()))
                    .map(|dep| (endpoint.name.clone(), dep.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NONE: [&str; 0] = [];

    fn names(endpoints: &[&Endpoint]) -> Vec<String> {
        endpoints.iter().map(|e| e.name().to_string()).collect()
    }

    #[test]
    fn test_add_and_get() {
        let mut graph = DependencyGraph::new();
        let endpoint = graph.add("b", ["a"]);
        assert_eq!(endpoint.name(), "b");
        assert_eq!(endpoint.dependencies(), &["a".to_string()]);

        assert!(graph.get("b").is_some());
        assert!(graph.get("missing").is_none());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_add_last_write_wins() {
        let mut graph = DependencyGraph::new();
        graph.add("a", ["x"]);
        graph.add("b", NONE);
        graph.add("a", ["y", "z"]);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(graph.get("a").unwrap().dependencies().len(), 2);
    }

    #[test]
    fn test_direct_dependencies_drop_dangling() {
        let mut graph = DependencyGraph::new();
        graph.add("a", NONE);
        graph.add("b", ["a", "ghost"]);

        assert_eq!(graph.direct_dependencies("b"), vec!["a".to_string()]);
        assert!(graph.direct_dependencies("ghost").is_empty());
        assert_eq!(
            graph.dangling_dependencies(),
            vec![("b".to_string(), "ghost".to_string())]
        );
    }

    #[test]
    fn test_ancestors_depth_first_with_duplicates() {
        let mut graph = DependencyGraph::new();
        graph.add("root", NONE);
        graph.add("left", ["root"]);
        graph.add("right", ["root"]);
        graph.add("join", ["left", "right"]);

        let ancestors = graph.ancestors("join");
        assert_eq!(
            names(&ancestors),
            vec!["root", "left", "root", "right"]
        );
        assert!(graph.ancestors("root").is_empty());
        assert!(graph.ancestors("missing").is_empty());
    }

    #[test]
    fn test_ancestors_skip_dangling_names() {
        let mut graph = DependencyGraph::new();
        graph.add("a", NONE);
        graph.add("b", ["a"]);
        graph.add("c", ["ghost", "b"]);
        graph.add("d", ["c", "ghost"]);

        assert_eq!(names(&graph.ancestors("d")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ancestors_terminate_on_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add("a", ["b"]);
        graph.add("b", ["a"]);

        assert_eq!(names(&graph.ancestors("a")), vec!["b"]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add("a", NONE);
        graph.add("b", ["a"]);
        graph.add("c", ["a", "b"]);
        graph.add("d", ["c", "ghost"]);

        assert!(!graph.detect_cycles());
        assert!(graph.find_cycle().is_none());
    }

    #[test]
    fn test_shared_dangling_dependency_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add("a", ["ghost"]);
        graph.add("b", ["ghost"]);

        assert!(!graph.detect_cycles());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add("a", ["a"]);

        assert!(graph.detect_cycles());
        assert_eq!(graph.find_cycle().unwrap(), vec!["a", "a"]);
    }

    #[test]
    fn test_indirect_cycle_path() {
        let mut graph = DependencyGraph::new();
        graph.add("entry", ["a"]);
        graph.add("a", ["b"]);
        graph.add("b", ["c"]);
        graph.add("c", ["a"]);

        assert!(graph.detect_cycles());
        assert_eq!(graph.find_cycle().unwrap(), vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert!(!graph.detect_cycles());
    }
}
