//! Hooks run before and after a stage's children.

use crate::context::ExecutionContext;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;

/// The result a hook returns. Any error type converts with `?`.
pub type HookResult = anyhow::Result<()>;

/// A pre- or post-hook of a stage.
///
/// Async closures `Fn(ExecutionContext) -> impl Future<Output = HookResult>`
/// implement this trait directly; wrap plain synchronous closures in
/// [`FnHook`].
#[async_trait]
pub trait Hook: Send + Sync {
    /// Runs the hook with the owning stage's context.
    async fn call(&self, ctx: ExecutionContext) -> HookResult;
}

#[async_trait]
impl<F, Fut> Hook for F
where
    F: Fn(ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    async fn call(&self, ctx: ExecutionContext) -> HookResult {
        (self)(ctx).await
    }
}

/// A synchronous function-based hook.
pub struct FnHook<F>
where
    F: Fn(&ExecutionContext) -> HookResult + Send + Sync,
{
    func: F,
}

impl<F> FnHook<F>
where
    F: Fn(&ExecutionContext) -> HookResult + Send + Sync,
{
    /// Creates a new function-based hook.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnHook<F>
where
    F: Fn(&ExecutionContext) -> HookResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHook").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&ExecutionContext) -> HookResult + Send + Sync,
{
    async fn call(&self, ctx: ExecutionContext) -> HookResult {
        (self.func)(&ctx)
    }
}
