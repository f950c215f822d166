//! Unit tests for ToolRegistry and ToolDescriptor
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use switchboard_core::{
    ParameterSchema, ParameterSpec, Params, ResultEnvelope, Tool, ToolError, ToolRegistry,
    ToolResult,
};

/// Tool that returns its own label
struct LabelTool {
    name: &'static str,
    label: &'static str,
}

#[async_trait]
impl Tool for LabelTool {
    fn name(&self) -> String {
        self.name.to_string()
    }

    fn description(&self) -> String {
        format!("Returns {}", self.label)
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn call(&self, _params: Params) -> ToolResult<ResultEnvelope> {
        Ok(ResultEnvelope::success().with("label", self.label))
    }
}

fn label(name: &'static str, label: &'static str) -> Arc<dyn Tool> {
    Arc::new(LabelTool { name, label })
}

#[test]
fn test_list_preserves_registration_order() {
    let registry = ToolRegistry::new();
    registry.register(label("A", "a"));
    registry.register(label("B", "b"));
    registry.register(label("C", "c"));

    let names: Vec<String> = registry.list_tools().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(registry.names(), vec!["A", "B", "C"]);
    assert!(registry.has("B"));
    assert!(!registry.has("Z"));
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_order_is_stable_for_many_tools() {
    let registry = ToolRegistry::new();
    let names: Vec<String> = (0..50).map(|i| format!("tool_{:02}", i)).collect();
    for name in &names {
        let name = name.clone();
        registry.register_fn(name, "numbered", ParameterSchema::new(), |_| async {
            Ok::<_, ToolError>(ResultEnvelope::success())
        });
    }
    assert_eq!(registry.names(), names);
}

#[tokio::test]
async fn test_overwrite_is_last_write_wins_and_keeps_position() {
    let registry = ToolRegistry::new();
    registry.register(label("A", "first"));
    registry.register(label("B", "b"));
    registry.register(label("A", "second"));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names(), vec!["A", "B"]);

    let a = registry.get("A").unwrap();
    assert_eq!(a.description, "Returns second");
    let result = a.call(Params::new()).await.unwrap();
    assert_eq!(result.get("label"), Some(&json!("second")));
}

#[test]
fn test_get_unknown_is_none() {
    let registry = ToolRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.get("missing").is_none());
}

#[tokio::test]
async fn test_register_fn_exposes_schema_and_behavior() {
    let registry = ToolRegistry::new();
    registry.register_fn(
        "echo",
        "Echo the message back",
        ParameterSchema::new()
            .param(ParameterSpec::string("message", "Text to echo").required()),
        |params: Params| async move {
            let message = params.string_or("message", "");
            Ok::<_, ToolError>(ResultEnvelope::success().with("echo", message))
        },
    );

    let echo = registry.get("echo").unwrap();
    assert_eq!(echo.description, "Echo the message back");
    assert_eq!(echo.parameters.required_names(), vec!["message"]);

    let schema = echo.parameters.to_json_schema();
    assert_eq!(schema["properties"]["message"]["type"], "string");

    let result = echo
        .call(Params::from_value(json!({"message": "hi"})))
        .await
        .unwrap();
    assert_eq!(result.get("echo"), Some(&json!("hi")));
}

#[test]
fn test_clones_share_entries() {
    let registry = ToolRegistry::new();
    let handle = registry.clone();
    handle.register(label("A", "a"));
    assert!(registry.has("A"));
}
