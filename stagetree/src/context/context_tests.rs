//! Tests for execution context scoping.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::context::{ExecutionContext, STAGE_NAME_KEY};
    use crate::events::CollectingEventSink;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_root_context_has_no_stage() {
        let ctx = ExecutionContext::new();
        assert!(ctx.stage_name().is_none());
        assert!(ctx.stage_path().is_empty());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_child_scope_carries_stage_name() {
        let root = ExecutionContext::new();
        let outer = root.child_scope("deploy");
        let inner = outer.child_scope("migrate");

        assert_eq!(outer.stage_name().as_deref(), Some("deploy"));
        assert_eq!(inner.stage_name().as_deref(), Some("migrate"));
        assert_eq!(inner.stage_path(), vec!["deploy", "migrate"]);
        assert_eq!(inner.run_id(), root.run_id());
    }

    #[test]
    fn test_values_visible_downward_only() {
        let root = ExecutionContext::new();
        root.set_value("region", "eu-west");

        let child = root.child_scope("child");
        child.set_value("replicas", 3);

        assert_eq!(child.value("region"), Some(json!("eu-west")));
        assert_eq!(child.value("replicas"), Some(json!(3)));
        assert!(root.value("replicas").is_none());
    }

    #[test]
    fn test_child_value_shadows_parent() {
        let root = ExecutionContext::new();
        root.set_value("mode", "fast");

        let child = root.child_scope("child");
        child.set_value("mode", "safe");

        assert_eq!(child.value("mode"), Some(json!("safe")));
        assert_eq!(root.value("mode"), Some(json!("fast")));
    }

    #[test]
    fn test_siblings_do_not_see_each_other() {
        let parent = ExecutionContext::new().child_scope("parent");
        let a = parent.child_scope("a");
        let b = parent.child_scope("b");

        a.set_value("from_a", true);
        assert!(b.value("from_a").is_none());
    }

    #[test]
    fn test_with_base_keeps_values_and_swaps_token() {
        let ctx = ExecutionContext::new();
        ctx.set_value("k", "v");

        let token = Arc::new(CancellationToken::new());
        let rebased = ctx.with_base(token.clone());
        token.cancel("new scope");

        assert_eq!(rebased.value("k"), Some(json!("v")));
        assert!(rebased.is_cancelled());
        assert!(!ctx.is_cancelled());
        assert_eq!(rebased.cancel_reason().as_deref(), Some("new scope"));
    }

    #[test]
    fn test_merge_copies_local_values_only() {
        let source_root = ExecutionContext::new();
        source_root.set_value("inherited", 1);
        let source = source_root.child_scope("source");
        source.set_value("local", 2);
        source.cancel("source cancelled");

        let target = ExecutionContext::new();
        target.merge_from(&source);

        assert_eq!(target.value("local"), Some(json!(2)));
        assert!(target.value("inherited").is_none());
        assert!(!target.is_cancelled());
    }

    #[test]
    fn test_merge_keeps_own_stage_identity() {
        let source = ExecutionContext::new().child_scope("source");
        source.set_value("artifact", "app.tar.gz");
        let target = ExecutionContext::new().child_scope("outer").child_scope("target");

        target.merge_from(&source);

        assert_eq!(target.value("artifact"), Some(json!("app.tar.gz")));
        assert_eq!(target.stage_name().as_deref(), Some("target"));
        assert_eq!(target.stage_path(), vec!["outer", "target"]);

        let root = ExecutionContext::new();
        root.merge_from(&source);
        assert!(root.value(STAGE_NAME_KEY).is_none());
        assert!(root.stage_path().is_empty());
    }

    #[test]
    fn test_with_value_leaves_parent_untouched() {
        let root = ExecutionContext::new();
        let child = root
            .child_scope("child")
            .with_value("attempt", 2)
            .with_value("dry_run", true);

        assert_eq!(child.value("attempt"), Some(json!(2)));
        assert_eq!(child.local_values().len(), 3);
        assert!(root.value("attempt").is_none());
    }

    #[test]
    fn test_from_data() {
        let mut data = HashMap::new();
        data.insert("seed".to_string(), json!(42));

        let ctx = ExecutionContext::from_data(data);
        assert_eq!(ctx.value("seed"), Some(json!(42)));
        assert_eq!(ctx.local_values().len(), 1);
    }

    #[test]
    fn test_emit_enriches_payload() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = ExecutionContext::new()
            .with_event_sink(sink.clone())
            .child_scope("root")
            .child_scope("leaf");

        ctx.emit("stage.started", json!({"stage": "leaf"}));

        let events = sink.events_of_type("stage.started");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["path"], json!("root/leaf"));
        assert_eq!(events[0]["run_id"], json!(ctx.run_id().to_string()));
        assert!(events[0].get("timestamp").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_writes() {
        let ctx = ExecutionContext::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                ctx.set_value(format!("key{i}"), i);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ctx.local_values().len(), 16);
    }
}
