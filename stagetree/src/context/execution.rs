//! The execution context handed to stages and hooks.

use super::Scope;
use crate::cancellation::CancellationToken;
use crate::events::{EventSink, NoOpEventSink};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Key under which each stage scope stores the stage's name.
pub const STAGE_NAME_KEY: &str = "stage.name";

/// Scoped values plus the cancellation source of a run.
///
/// Cloning is cheap and clones share everything: scope, token and sink.
/// Each stage derives its own layer with [`child_scope`](Self::child_scope),
/// so values a stage stores are visible to its descendants but never to its
/// parent or siblings.
#[derive(Clone)]
pub struct ExecutionContext {
    scope: Arc<Scope>,
    token: Arc<CancellationToken>,
    event_sink: Arc<dyn EventSink>,
    run_id: Uuid,
}

impl ExecutionContext {
    /// Creates a root context with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(Arc::new(CancellationToken::new()))
    }

    /// Creates a root context over an existing cancellation token.
    #[must_use]
    pub fn with_token(token: Arc<CancellationToken>) -> Self {
        Self {
            scope: Arc::new(Scope::new()),
            token,
            event_sink: Arc::new(NoOpEventSink),
            run_id: Uuid::new_v4(),
        }
    }

    /// Creates a root context whose scope is seeded with `data`.
    #[must_use]
    pub fn from_data(data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            scope: Arc::new(Scope::from_data(data)),
            ..Self::new()
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Returns a context over the same scopes with a different cancellation
    /// source.
    #[must_use]
    pub fn with_base(&self, token: Arc<CancellationToken>) -> Self {
        Self {
            token,
            ..self.clone()
        }
    }

    /// Derives the context of a stage named `stage_name`.
    #[must_use]
    pub fn child_scope(&self, stage_name: &str) -> Self {
        let scope = Scope::with_parent(Arc::clone(&self.scope));
        scope.set(STAGE_NAME_KEY, serde_json::Value::String(stage_name.to_string()));
        Self {
            scope: Arc::new(scope),
            ..self.clone()
        }
    }

    /// Looks up `key` in this scope, then in the enclosing ones.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        self.scope.get(key)
    }

    /// Stores `value` in this scope only.
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.scope.set(key, value.into());
    }

    /// Stores `value` in this scope and returns the context, for chaining.
    #[must_use]
    pub fn with_value(self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set_value(key, value);
        self
    }

    /// Returns the entries stored in this scope, excluding inherited ones.
    #[must_use]
    pub fn local_values(&self) -> HashMap<String, serde_json::Value> {
        self.scope.to_dict()
    }

    /// Copies the entries `other` stores locally into this scope.
    ///
    /// Inherited entries, the stage name and the cancellation source of
    /// `other` are not copied.
    pub fn merge_from(&self, other: &Self) {
        for (key, value) in other.scope.to_dict() {
            if key != STAGE_NAME_KEY {
                self.scope.set(key, value);
            }
        }
    }

    /// Returns the name of the innermost stage.
    #[must_use]
    pub fn stage_name(&self) -> Option<String> {
        self.value(STAGE_NAME_KEY)
            .and_then(|v| v.as_str().map(String::from))
    }

    /// Returns the stage names from the root stage down to this one.
    #[must_use]
    pub fn stage_path(&self) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(&*self.scope);
        while let Some(scope) = current {
            if let Some(name) = scope.get_local(STAGE_NAME_KEY) {
                if let Some(name) = name.as_str() {
                    path.push(name.to_string());
                }
            }
            current = scope.parent().map(|parent| &**parent);
        }
        path.reverse();
        path
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Requests cancellation of the run.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<String> {
        self.token.reason()
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event enriched with the run id, stage path and timestamp.
    pub fn emit(&self, event_type: &str, data: serde_json::Value) {
        let mut enriched = data;

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
            map.insert("path".to_string(), serde_json::json!(self.stage_path().join("/")));
            map.insert("timestamp".to_string(), serde_json::json!(Utc::now().to_rfc3339()));
        }

        self.event_sink.emit(event_type, enriched);
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("stage_path", &self.stage_path())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
