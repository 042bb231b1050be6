//! Wave scheduling of a stage's children.
//!
//! Every wave scans the pending children in declaration order. A child is
//! ready once all the siblings it depends on are done. Sync stages run ready
//! children inline; async stages spawn one task per ready child and wait for
//! the wave before scanning again.

use super::{Stage, StageState};
use crate::config::{RunConfig, WaveFailurePolicy};
use crate::context::ExecutionContext;
use crate::errors::{StageError, UnresolvedDependency};
use crate::events::{STAGE_COMPLETED, STAGE_FAILED, STAGE_STARTED, STAGE_WAVE};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

impl Stage {
    /// Runs this stage and its subtree with the default [`RunConfig`].
    ///
    /// Async stages spawn their children on the current tokio runtime.
    pub async fn run(&self, ctx: &ExecutionContext) -> Result<(), StageError> {
        self.run_with_config(ctx, &RunConfig::default()).await
    }

    /// Runs this stage and its subtree.
    ///
    /// Returns the first error encountered; nothing after it in this stage
    /// runs.
    pub fn run_with_config<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        config: &'a RunConfig,
    ) -> BoxFuture<'a, Result<(), StageError>> {
        async move {
            let start = Instant::now();
            let mut state = StageState::Constructed;
            let result = self.execute(ctx, config, &mut state).await;
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

            match &result {
                Ok(()) => {
                    info!(stage = %self.name, duration_ms, "Stage completed");
                    ctx.emit(
                        STAGE_COMPLETED,
                        serde_json::json!({
                            "stage": &self.name,
                            "state": state,
                            "duration_ms": duration_ms,
                        }),
                    );
                }
                Err(err) => {
                    warn!(stage = %self.name, state = %state, error = %err, "Stage failed");
                    ctx.emit(
                        STAGE_FAILED,
                        serde_json::json!({
                            "stage": &self.name,
                            "state": state,
                            "duration_ms": duration_ms,
                            "error": err.to_dict(),
                        }),
                    );
                }
            }

            result
        }
        .boxed()
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        config: &RunConfig,
        state: &mut StageState,
    ) -> Result<(), StageError> {
        self.advance(state, StageState::Validating);
        if let Some(path) = self.dependency_graph().find_cycle() {
            let err = StageError::CycleDetected {
                stage: self.name.clone(),
                path,
            };
            self.fail(state, &err);
            return Err(err);
        }

        let scope = ctx.child_scope(&self.name);

        self.advance(state, StageState::PreHookRunning);
        ctx.emit(
            STAGE_STARTED,
            serde_json::json!({
                "stage": &self.name,
                "children": self.child_names(),
                "async": self.async_mode,
            }),
        );
        if let Some(hook) = &self.pre_hook {
            if let Err(source) = hook.call(scope.clone()).await {
                let err = StageError::PreHook {
                    stage: self.name.clone(),
                    source,
                };
                self.fail(state, &err);
                return Err(err);
            }
        }

        self.advance(state, StageState::ChildrenRunning);
        let children = if self.async_mode {
            self.run_children_async(&scope, config).await
        } else {
            self.run_children_sync(&scope, config).await
        };
        if let Err(err) = children {
            self.fail(state, &err);
            return Err(err);
        }

        self.advance(state, StageState::PostHookRunning);
        if let Some(hook) = &self.post_hook {
            if let Err(source) = hook.call(scope.clone()).await {
                let err = StageError::PostHook {
                    stage: self.name.clone(),
                    source,
                };
                self.fail(state, &err);
                return Err(err);
            }
        }

        self.advance(state, StageState::Completed);
        Ok(())
    }

    async fn run_children_sync(
        &self,
        ctx: &ExecutionContext,
        config: &RunConfig,
    ) -> Result<(), StageError> {
        let mut done: HashSet<String> = HashSet::with_capacity(self.children.len());
        let mut pending: Vec<&Arc<Stage>> = self.children.iter().collect();
        let mut wave = 0usize;

        while !pending.is_empty() {
            self.checkpoint(ctx, config)?;
            wave += 1;

            // A child runs in the wave in which every dependency is done,
            // including siblings that run earlier in the same wave. The
            // first failure aborts, so planning as if all succeed is exact.
            let mut planned = done.clone();
            let mut wait = Vec::with_capacity(pending.len());
            let mut ready = Vec::new();
            for child in pending.iter().copied() {
                if planned.contains(&child.name) {
                    continue;
                }
                if !child.dependencies_met(&planned) {
                    wait.push(child);
                    continue;
                }
                planned.insert(child.name.clone());
                ready.push(child);
            }

            if ready.is_empty() {
                return Err(self.unresolved(&wait, &done));
            }
            let names: Vec<String> = ready.iter().map(|c| c.name.clone()).collect();
            self.record_wave(ctx, wave, &names);

            for child in ready {
                child
                    .run_with_config(ctx, config)
                    .await
                    .map_err(|err| StageError::child(child.name.clone(), err))?;
                done.insert(child.name.clone());
            }
            pending = wait;
        }

        Ok(())
    }

    async fn run_children_async(
        &self,
        ctx: &ExecutionContext,
        config: &RunConfig,
    ) -> Result<(), StageError> {
        let mut done: HashSet<String> = HashSet::with_capacity(self.children.len());
        let mut pending: Vec<&Arc<Stage>> = self.children.iter().collect();
        let mut wave = 0usize;

        while !pending.is_empty() {
            self.checkpoint(ctx, config)?;
            wave += 1;

            let mut wait = Vec::with_capacity(pending.len());
            let mut dispatched = Vec::new();
            let mut tasks = FuturesUnordered::new();
            for child in pending.iter().copied() {
                if done.contains(&child.name) {
                    continue;
                }
                if !child.dependencies_met(&done) {
                    wait.push(child);
                    continue;
                }

                let name = child.name.clone();
                dispatched.push(name.clone());

                let child = Arc::clone(child);
                let ctx = ctx.clone();
                let config = config.clone();
                let handle = tokio::spawn(async move {
                    child
                        .run_with_config(&ctx, &config)
                        .await
                        .map_err(|err| StageError::child(child.name.clone(), err))
                });
                tasks.push(handle.map(move |joined| (name, joined)));
            }

            if wait.len() == pending.len() {
                return Err(self.unresolved(&wait, &done));
            }
            // Done at dispatch, not at completion. Readiness above only sees
            // earlier waves, so a dependent never shares a wave with its
            // dependency.
            done.extend(dispatched.iter().cloned());
            self.record_wave(ctx, wave, &dispatched);

            let mut first_error = None;
            while let Some((name, joined)) = tasks.next().await {
                let outcome = joined.unwrap_or_else(|join_err| {
                    Err(StageError::child(
                        name.clone(),
                        StageError::TaskPanicked {
                            stage: name,
                            message: join_err.to_string(),
                        },
                    ))
                });
                let Err(err) = outcome else {
                    continue;
                };

                match config.wave_failure_policy {
                    WaveFailurePolicy::FirstError => {
                        if !tasks.is_empty() {
                            debug!(
                                stage = %self.name,
                                detached = tasks.len(),
                                "Returning before the rest of the wave finished"
                            );
                        }
                        // Dropping the remaining handles detaches their tasks.
                        return Err(err);
                    }
                    WaveFailurePolicy::WaitAll => {
                        if first_error.is_none() {
                            first_error = Some(err);
                        }
                    }
                }
            }
            if let Some(err) = first_error {
                return Err(err);
            }

            pending = wait;
        }

        Ok(())
    }

    fn checkpoint(&self, ctx: &ExecutionContext, config: &RunConfig) -> Result<(), StageError> {
        if config.check_cancellation && ctx.is_cancelled() {
            return Err(StageError::Cancelled {
                stage: self.name.clone(),
                reason: ctx
                    .cancel_reason()
                    .unwrap_or_else(|| "cancelled".to_string()),
            });
        }
        Ok(())
    }

    fn record_wave(&self, ctx: &ExecutionContext, wave: usize, started: &[String]) {
        debug!(stage = %self.name, wave, started = ?started, "Wave scheduled");
        ctx.emit(
            STAGE_WAVE,
            serde_json::json!({
                "stage": &self.name,
                "wave": wave,
                "started": started,
            }),
        );
    }

    fn unresolved(&self, waiting: &[&Arc<Stage>], done: &HashSet<String>) -> StageError {
        let siblings: HashSet<&str> = self.children.iter().map(|c| c.name.as_str()).collect();
        let waiting = waiting
            .iter()
            .map(|child| {
                let missing: Vec<String> = child
                    .depends_on
                    .iter()
                    .filter(|dep| !done.contains(*dep))
                    .cloned()
                    .collect();
                let unknown = missing
                    .iter()
                    .filter(|dep| !siblings.contains(dep.as_str()))
                    .cloned()
                    .collect();
                UnresolvedDependency {
                    child: child.name.clone(),
                    missing,
                    unknown,
                }
            })
            .collect();

        StageError::DependencyUnresolved {
            stage: self.name.clone(),
            waiting,
        }
    }

    fn fail(&self, state: &mut StageState, err: &StageError) {
        let next = state.failed_with(err);
        self.advance(state, next);
    }

    fn advance(&self, state: &mut StageState, next: StageState) {
        debug_assert!(
            state.can_transition_to(next),
            "illegal stage transition {state} -> {next}"
        );
        trace!(stage = %self.name, from = %state, to = %next, "Stage transition");
        *state = next;
    }
}
