//! Name-based tool dispatch.
//!
//! The dispatcher is the trust boundary between callers and tool bodies:
//! whatever a tool does, `execute_tool` returns a [`ResultEnvelope`].

use crate::state::{ExecutionSnapshot, ExecutionState, StateChange, SubscriptionId};
use crate::tools::native::{
    ModelSwitchHandler, ModelSwitchSlot, MODEL_LIST_TOOL, MODEL_SWITCH_TOOL, SCREENSHOT_TOOL,
    WEB_SEARCH_TOOL,
};
use crate::tools::{
    Params, ParameterSchema, ResultEnvelope, Tool, ToolDescriptor, ToolRegistry, ToolResult,
};
use futures::FutureExt;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Tool definition in the shape LLM planners expect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Capability flags derived from which well-known tools are registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub screenshot: bool,
    pub model_listing: bool,
    pub model_switching: bool,
    pub web_search: bool,
}

struct DispatchMetrics {
    invocations_counter: Counter<u64>,
    errors_counter: Counter<u64>,
    not_found_counter: Counter<u64>,
    invoke_latency: Histogram<f64>,
}

impl DispatchMetrics {
    fn new() -> Self {
        let meter = global::meter("switchboard.dispatcher");

        Self {
            invocations_counter: meter
                .u64_counter("switchboard.dispatcher.invocations_total")
                .with_description("Total number of tool dispatches")
                .init(),
            errors_counter: meter
                .u64_counter("switchboard.dispatcher.errors_total")
                .with_description("Total number of dispatches that returned success=false")
                .init(),
            not_found_counter: meter
                .u64_counter("switchboard.dispatcher.not_found_total")
                .with_description("Total number of dispatches to unknown tools")
                .init(),
            invoke_latency: meter
                .f64_histogram("switchboard.dispatcher.invoke_latency_ms")
                .with_description("Tool execution latency in milliseconds")
                .init(),
        }
    }
}

/// Registry, execution state and model-switch handler behind one handle.
///
/// Cloning is cheap and every clone shares the same registry and state.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
    state: ExecutionState,
    model_switch: ModelSwitchSlot,
    metrics: Arc<DispatchMetrics>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_registry(ToolRegistry::new())
    }

    pub fn with_registry(registry: ToolRegistry) -> Self {
        Self {
            registry,
            state: ExecutionState::new(),
            model_switch: ModelSwitchSlot::default(),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.registry.register(tool);
    }

    pub fn register_fn<F, Fut>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        handler: F,
    ) where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<ResultEnvelope>> + Send + 'static,
    {
        self.registry
            .register_fn(name, description, parameters, handler);
    }

    /// Execute a tool by name.
    ///
    /// Never fails: unknown tools, tool errors and panics all come back as
    /// `success: false` envelopes. Unknown tools leave the execution state
    /// untouched and notify nobody.
    #[tracing::instrument(skip(self, params), fields(tool.name = %name))]
    pub async fn execute_tool(&self, name: &str, params: impl Into<Params>) -> ResultEnvelope {
        let Some(descriptor) = self.registry.get(name) else {
            warn!(target: "dispatcher", tool = %name, "Tool not found");
            self.metrics
                .not_found_counter
                .add(1, &[KeyValue::new("tool", name.to_string())]);
            return ResultEnvelope::failure(format!("Tool \"{}\" not found", name))
                .with("available_tools", json!(self.registry.names()));
        };

        let params = params.into();
        let start_time = Instant::now();
        self.state.mark_started(name);
        debug!(target: "dispatcher", tool = %name, "Invoking tool");

        let outcome = AssertUnwindSafe(descriptor.call(params))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(e)) => {
                warn!(target: "dispatcher", tool = %name, error = %e, "Tool execution failed");
                ResultEnvelope::failure(e.to_string()).with("tool", name)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(target: "dispatcher", tool = %name, error = %message, "Tool panicked");
                ResultEnvelope::failure(message).with("tool", name)
            }
        };

        let elapsed = start_time.elapsed();
        self.record_metrics(name, &result, elapsed.as_secs_f64() * 1000.0);
        self.state
            .mark_finished(name, &result, elapsed.as_millis() as u64);

        result
    }

    fn record_metrics(&self, name: &str, result: &ResultEnvelope, elapsed_ms: f64) {
        let tool = KeyValue::new("tool", name.to_string());
        let status = if result.success { "success" } else { "error" };

        self.metrics
            .invocations_counter
            .add(1, &[tool.clone(), KeyValue::new("status", status)]);
        self.metrics
            .invoke_latency
            .record(elapsed_ms, &[tool.clone()]);
        if !result.success {
            self.metrics.errors_counter.add(1, &[tool]);
        }
    }

    // ── Introspection ──────────────────────────────────────────────

    pub fn available_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.list_tools()
    }

    pub fn get_tool(&self, name: &str) -> Option<ToolDescriptor> {
        self.registry.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry
            .list_tools()
            .into_iter()
            .map(|d| ToolDefinition {
                input_schema: d.parameters.to_json_schema(),
                name: d.name,
                description: d.description,
            })
            .collect()
    }

    pub fn has_screenshot_capability(&self) -> bool {
        self.has_tool(SCREENSHOT_TOOL)
    }

    pub fn has_model_listing_capability(&self) -> bool {
        self.has_tool(MODEL_LIST_TOOL)
    }

    pub fn has_model_switch_capability(&self) -> bool {
        self.has_tool(MODEL_SWITCH_TOOL)
    }

    pub fn has_web_search_capability(&self) -> bool {
        self.has_tool(WEB_SEARCH_TOOL)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            screenshot: self.has_screenshot_capability(),
            model_listing: self.has_model_listing_capability(),
            model_switching: self.has_model_switch_capability(),
            web_search: self.has_web_search_capability(),
        }
    }

    // ── Observation ────────────────────────────────────────────────

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn is_executing(&self) -> bool {
        self.state.is_executing()
    }

    pub fn last_tool_used(&self) -> Option<String> {
        self.state.last_tool_used()
    }

    pub fn last_result(&self) -> Option<ResultEnvelope> {
        self.state.last_result()
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        self.state.snapshot()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ExecutionSnapshot) + Send + Sync + 'static,
    {
        self.state.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    pub fn watch(&self) -> broadcast::Receiver<StateChange> {
        self.state.watch()
    }

    // ── Model switching ────────────────────────────────────────────

    /// Install the handler that applies successful model switches.
    ///
    /// Replaces (and drops) any previously installed handler.
    pub fn set_model_switch_handler(&self, handler: Arc<dyn ModelSwitchHandler>) {
        if self.model_switch.set(handler).is_some() {
            info!(target: "dispatcher", "Replaced model switch handler");
        } else {
            info!(target: "dispatcher", "Installed model switch handler");
        }
    }

    pub fn clear_model_switch_handler(&self) -> bool {
        self.model_switch.clear().is_some()
    }

    /// Shared handler slot, handed to the model switch tool at registration
    pub fn model_switch_slot(&self) -> ModelSwitchSlot {
        self.model_switch.clone()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Tool panicked".to_string()
    }
}
