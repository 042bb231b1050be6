//! Hooks that record, fail or sleep.

use crate::context::ExecutionContext;
use crate::stage::{FnHook, Hook};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// An append-only log shared between hooks and the test body.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RecordingLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns a copy of all entries in append order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns the index of the first occurrence of `entry`.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    /// Returns true if `entry` was recorded.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns true if `before` was recorded and precedes `after`.
    #[must_use]
    pub fn happened_before(&self, before: &str, after: &str) -> bool {
        match (self.position(before), self.position(after)) {
            (Some(b), Some(a)) => b < a,
            _ => false,
        }
    }
}

/// A hook that appends `label` to `log`.
pub fn record_hook(log: &RecordingLog, label: &str) -> impl Hook {
    let log = log.clone();
    let label = label.to_string();
    FnHook::new(move |_ctx: &ExecutionContext| {
        log.push(label.clone());
        Ok(())
    })
}

/// A hook that always fails with `message`.
pub fn failing_hook(message: &str) -> impl Hook {
    let message = message.to_string();
    FnHook::new(move |_ctx: &ExecutionContext| Err(anyhow::anyhow!(message.clone())))
}

/// A hook that records `{label}:start`, sleeps, then records `{label}:end`.
///
/// Cancellation of the context cuts the sleep short and records
/// `{label}:cancelled` instead of the end marker.
pub fn sleep_hook(log: &RecordingLog, label: &str, duration: Duration) -> impl Hook {
    let log = log.clone();
    let label = label.to_string();
    move |ctx: ExecutionContext| {
        let log = log.clone();
        let label = label.clone();
        async move {
            log.push(format!("{label}:start"));
            let token = Arc::clone(ctx.token());
            tokio::select! {
                () = tokio::time::sleep(duration) => log.push(format!("{label}:end")),
                () = token.cancelled() => log.push(format!("{label}:cancelled")),
            }
            Ok::<_, anyhow::Error>(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_log_order() {
        let log = RecordingLog::new();
        log.push("a");
        log.push("b");

        assert_eq!(log.entries(), vec!["a", "b"]);
        assert!(log.happened_before("a", "b"));
        assert!(!log.happened_before("b", "a"));
        assert!(!log.happened_before("a", "missing"));
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_record_and_failing_hooks() {
        let log = RecordingLog::new();
        record_hook(&log, "pre").call(ExecutionContext::new()).await.unwrap();
        assert_eq!(log.entries(), vec!["pre"]);

        let err = failing_hook("boom")
            .call(ExecutionContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_hooks_outlive_borrowed_labels() {
        let log = RecordingLog::new();
        let stage = {
            let label = format!("step-{}", 7);
            crate::stage::Stage::new(label.as_str())
                .set_pre_hook(record_hook(&log, &label))
                .set_post_hook(failing_hook(&format!("{label} failed")))
        };

        let err = stage.run(&ExecutionContext::new()).await.unwrap_err();
        assert_eq!(log.entries(), vec!["step-7"]);
        assert_eq!(err.to_string(), "post-hook of stage 'step-7' failed: step-7 failed");
    }

    #[tokio::test]
    async fn test_sleep_hook_stops_on_cancel() {
        let log = RecordingLog::new();
        let ctx = ExecutionContext::new();
        ctx.cancel("stop");

        sleep_hook(&log, "slow", Duration::from_secs(5))
            .call(ctx)
            .await
            .unwrap();
        assert_eq!(log.entries(), vec!["slow:start", "slow:cancelled"]);
    }
}
