//! switch_ai_model: validation, composition with the listing tool, handler calls
use async_trait::async_trait;
use mockall::mock;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use switchboard_core::tools::native::{ModelSwitchSlot, ModelSwitchTool};
use switchboard_core::{
    Dispatcher, ModelSwitchHandler, ParameterSchema, Params, ResultEnvelope, Tool, ToolError,
    ToolResult,
};

mock! {
    pub Handler {}

    impl ModelSwitchHandler for Handler {
        fn switch_model(&self, model_name: &str);
    }
}

enum Listing {
    Models(Vec<&'static str>),
    Envelope(ResultEnvelope),
    Error,
}

/// Stand-in for the remote model catalog
struct FakeModelList {
    listing: Listing,
    calls: AtomicUsize,
    last_params: Mutex<Option<Params>>,
}

impl FakeModelList {
    fn new(listing: Listing) -> Arc<Self> {
        Arc::new(Self {
            listing,
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FakeModelList {
    fn name(&self) -> String {
        "fetch_ai_models".to_string()
    }

    fn description(&self) -> String {
        "Fake model list".to_string()
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn call(&self, params: Params) -> ToolResult<ResultEnvelope> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params);
        match &self.listing {
            Listing::Models(models) => Ok(ResultEnvelope::success().with("models", json!(models))),
            Listing::Envelope(env) => Ok(env.clone()),
            Listing::Error => Err(ToolError::ExecutionFailed("connection refused".to_string())),
        }
    }
}

/// Dispatcher with the fake listing and the model switch tool registered
fn setup(listing: Listing) -> (Dispatcher, Arc<FakeModelList>) {
    let dispatcher = Dispatcher::new();
    let models = FakeModelList::new(listing);
    dispatcher.register(models.clone());
    dispatcher.register(Arc::new(ModelSwitchTool::new(
        models.clone(),
        dispatcher.model_switch_slot(),
    )));
    (dispatcher, models)
}

fn handler_never_called() -> Arc<MockHandler> {
    let mut handler = MockHandler::new();
    handler.expect_switch_model().never();
    Arc::new(handler)
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_missing_model_name_fails_fast() {
    let (dispatcher, models) = setup(Listing::Models(vec!["gpt-4o"]));
    dispatcher.set_model_switch_handler(handler_never_called());

    for params in [json!({}), json!({"model_name": ""}), json!({"model_name": "   "})] {
        let result = dispatcher.execute_tool("switch_ai_model", params).await;
        assert!(!result.success);
        assert_eq!(result.error(), Some("model_name parameter is required"));
    }
    assert_eq!(models.calls(), 0);
}

#[tokio::test]
async fn test_non_string_model_name_is_treated_as_missing() {
    let (dispatcher, models) = setup(Listing::Models(vec!["gpt-4o"]));
    let result = dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": 42}))
        .await;
    assert_eq!(result.error(), Some("model_name parameter is required"));
    assert_eq!(models.calls(), 0);
}

// =============================================================================
// Composition with the listing tool
// =============================================================================

#[tokio::test]
async fn test_listing_is_forced_to_refresh() {
    let (dispatcher, models) = setup(Listing::Models(vec!["gpt-4o"]));
    dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "gpt-4o"}))
        .await;

    assert_eq!(models.calls(), 1);
    let params = models.last_params.lock().unwrap().clone().unwrap();
    assert_eq!(params.bool("force_refresh"), Some(true));
}

#[tokio::test]
async fn test_listing_error_is_reported_as_reason() {
    let (dispatcher, _models) = setup(Listing::Error);
    dispatcher.set_model_switch_handler(handler_never_called());

    let result = dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "gpt-4o"}))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error(),
        Some("Could not fetch models list to verify model exists")
    );
    let reason = result.get("reason").and_then(|v| v.as_str()).unwrap();
    assert!(reason.contains("connection refused"));
}

#[tokio::test]
async fn test_listing_failure_envelope_is_reported_as_reason() {
    let (dispatcher, _models) = setup(Listing::Envelope(ResultEnvelope::failure(
        "API key rejected",
    )));
    dispatcher.set_model_switch_handler(handler_never_called());

    let result = dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "gpt-4o"}))
        .await;

    assert_eq!(
        result.error(),
        Some("Could not fetch models list to verify model exists")
    );
    assert_eq!(result.get("reason"), Some(&json!("API key rejected")));
}

#[tokio::test]
async fn test_unknown_model_lists_available_models() {
    let (dispatcher, _models) = setup(Listing::Models(vec!["gpt-4o", "gpt-4o-mini", "llama3"]));
    dispatcher.set_model_switch_handler(handler_never_called());

    let result = dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "claude-x"}))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error(),
        Some("Model \"claude-x\" not found in available models")
    );
    assert_eq!(
        result.get("available_models"),
        Some(&json!(["gpt-4o", "gpt-4o-mini", "llama3"]))
    );
    assert!(result.get("suggestion").is_some());
}

#[tokio::test]
async fn test_membership_is_exact() {
    let (dispatcher, _models) = setup(Listing::Models(vec!["gpt-4o-mini"]));
    dispatcher.set_model_switch_handler(handler_never_called());

    let result = dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "gpt-4o"}))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.get("suggestion"),
        Some(&json!("Did you mean: gpt-4o-mini?"))
    );
}

// =============================================================================
// Successful switch
// =============================================================================

#[tokio::test]
async fn test_successful_switch_calls_handler_once() {
    let (dispatcher, _models) = setup(Listing::Models(vec!["gpt-4o", "llama3"]));

    let mut handler = MockHandler::new();
    handler
        .expect_switch_model()
        .withf(|name: &str| name == "llama3")
        .times(1)
        .return_const(());
    dispatcher.set_model_switch_handler(Arc::new(handler));

    let result = dispatcher
        .execute_tool(
            "switch_ai_model",
            json!({"model_name": "llama3", "reason": "cheaper for drafts"}),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.get("new_model"), Some(&json!("llama3")));
    assert_eq!(result.get("reason"), Some(&json!("cheaper for drafts")));
    assert_eq!(result.get("available_models"), Some(&json!(["gpt-4o", "llama3"])));
    assert_eq!(result.get("applied"), Some(&json!(true)));

    // drop verifies the times(1) expectation
    assert!(dispatcher.clear_model_switch_handler());
}

#[tokio::test]
async fn test_model_name_is_trimmed_before_matching() {
    let (dispatcher, _models) = setup(Listing::Models(vec!["gpt-4o"]));

    let mut handler = MockHandler::new();
    handler
        .expect_switch_model()
        .withf(|name: &str| name == "gpt-4o")
        .times(1)
        .return_const(());
    dispatcher.set_model_switch_handler(Arc::new(handler));

    let result = dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "  gpt-4o "}))
        .await;

    assert!(result.success);
    assert_eq!(result.get("new_model"), Some(&json!("gpt-4o")));
    assert!(dispatcher.clear_model_switch_handler());
}

#[tokio::test]
async fn test_switch_without_handler_leaves_application_to_caller() {
    let (dispatcher, _models) = setup(Listing::Models(vec!["gpt-4o"]));

    let result = dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "gpt-4o"}))
        .await;

    assert!(result.success);
    assert_eq!(result.get("new_model"), Some(&json!("gpt-4o")));
    assert_eq!(result.get("applied"), Some(&json!(false)));
    assert_eq!(
        result.get("reason"),
        Some(&json!("User requested model switch"))
    );
    assert!(result
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap()
        .contains("caller must apply"));
}

#[tokio::test]
async fn test_replaced_handler_is_not_called() {
    let (dispatcher, _models) = setup(Listing::Models(vec!["gpt-4o"]));
    dispatcher.set_model_switch_handler(handler_never_called());

    let switched = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&switched);
    dispatcher.set_model_switch_handler(Arc::new(move |name: &str| {
        sink.lock().unwrap().push(name.to_string())
    }));

    dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "gpt-4o"}))
        .await;

    assert_eq!(*switched.lock().unwrap(), vec!["gpt-4o".to_string()]);
}

#[tokio::test]
async fn test_sub_call_does_not_touch_execution_state() {
    let (dispatcher, models) = setup(Listing::Models(vec!["gpt-4o"]));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    dispatcher.subscribe(move |snap| {
        sink.lock()
            .unwrap()
            .push(snap.last_tool_used.clone().unwrap_or_default())
    });

    dispatcher
        .execute_tool("switch_ai_model", json!({"model_name": "gpt-4o"}))
        .await;

    assert_eq!(models.calls(), 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["switch_ai_model".to_string(), "switch_ai_model".to_string()]
    );
    assert_eq!(dispatcher.last_tool_used().as_deref(), Some("switch_ai_model"));
}

#[tokio::test]
async fn test_tool_can_be_used_without_dispatcher() {
    let models = FakeModelList::new(Listing::Models(vec!["gpt-4o"]));
    let slot = ModelSwitchSlot::default();
    let tool = ModelSwitchTool::new(models, slot);

    let result = tool
        .call(Params::new().with("model_name", "gpt-4o"))
        .await
        .unwrap();
    assert!(result.success);

    let schema = tool.parameters();
    assert_eq!(schema.required_names(), vec!["model_name"]);
}
