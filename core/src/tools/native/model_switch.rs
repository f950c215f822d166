//! Model switching, composed on top of the model listing tool.
//!
//! The requested model is only applied after a fresh listing confirms it
//! exists. The listing tool is called directly, not through the dispatcher,
//! so the execution state only ever shows `switch_ai_model`.

use super::{MODEL_LIST_TOOL, MODEL_SWITCH_TOOL};
use crate::tools::{ParameterSchema, ParameterSpec, Params, ResultEnvelope, Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

pub const DEFAULT_SWITCH_REASON: &str = "User requested model switch";

/// Applies a model switch once it has been validated.
///
/// Called synchronously, at most once per successful `switch_ai_model` call.
pub trait ModelSwitchHandler: Send + Sync {
    fn switch_model(&self, model_name: &str);
}

impl<F> ModelSwitchHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn switch_model(&self, model_name: &str) {
        self(model_name)
    }
}

/// Shared, replaceable holder for the active [`ModelSwitchHandler`]
#[derive(Clone, Default)]
pub struct ModelSwitchSlot(Arc<RwLock<Option<Arc<dyn ModelSwitchHandler>>>>);

impl ModelSwitchSlot {
    /// Installs `handler`, returning the one it replaced
    pub fn set(&self, handler: Arc<dyn ModelSwitchHandler>) -> Option<Arc<dyn ModelSwitchHandler>> {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handler)
    }

    pub fn clear(&self) -> Option<Arc<dyn ModelSwitchHandler>> {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn get(&self) -> Option<Arc<dyn ModelSwitchHandler>> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// `switch_ai_model`: validates a model against a fresh listing, then
/// hands it to the installed handler
pub struct ModelSwitchTool {
    models: Arc<dyn Tool>,
    handler: ModelSwitchSlot,
}

impl ModelSwitchTool {
    /// `models` must produce `{success, models: [string]}` envelopes
    pub fn new(models: Arc<dyn Tool>, handler: ModelSwitchSlot) -> Self {
        Self { models, handler }
    }

    fn suggestion(requested: &str, available: &[String]) -> String {
        let needle = requested.to_lowercase();
        let close: Vec<&str> = available
            .iter()
            .filter(|m| {
                let m = m.to_lowercase();
                m.contains(&needle) || needle.contains(&m)
            })
            .map(String::as_str)
            .collect();

        if close.is_empty() {
            format!(
                "Call {} to see the available models and pick one from available_models",
                MODEL_LIST_TOOL
            )
        } else {
            format!("Did you mean: {}?", close.join(", "))
        }
    }
}

#[async_trait]
impl Tool for ModelSwitchTool {
    fn name(&self) -> String {
        MODEL_SWITCH_TOOL.to_string()
    }

    fn description(&self) -> String {
        "Switch the active AI model. The model must be one of the models returned by \
         fetch_ai_models; the list is refreshed before switching."
            .to_string()
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .param(
                ParameterSpec::string(
                    "model_name",
                    "Exact name of the model to switch to; surrounding whitespace is ignored",
                )
                .required(),
            )
            .param(
                ParameterSpec::string("reason", "Why the model is being switched")
                    .with_default(DEFAULT_SWITCH_REASON),
            )
    }

    async fn call(&self, params: Params) -> ToolResult<ResultEnvelope> {
        let Some(model_name) = params.non_empty_str("model_name") else {
            return Ok(ResultEnvelope::failure("model_name parameter is required"));
        };
        let reason = params.string_or("reason", DEFAULT_SWITCH_REASON);

        debug!(target: "model_switch", model = %model_name, "Verifying model against fresh listing");

        let listing = self
            .models
            .call(Params::new().with("force_refresh", true))
            .await;

        let listing = match listing {
            Ok(env) if env.success => env,
            Ok(env) => {
                let cause = env.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(target: "model_switch", error = %cause, "Model listing failed");
                return Ok(
                    ResultEnvelope::failure("Could not fetch models list to verify model exists")
                        .with("reason", cause),
                );
            }
            Err(e) => {
                warn!(target: "model_switch", error = %e, "Model listing failed");
                return Ok(
                    ResultEnvelope::failure("Could not fetch models list to verify model exists")
                        .with("reason", e.to_string()),
                );
            }
        };

        let available = listing.string_list("models").unwrap_or_default();

        if !available.iter().any(|m| m == model_name) {
            info!(target: "model_switch", model = %model_name, "Requested model is not available");
            return Ok(ResultEnvelope::failure(format!(
                "Model \"{}\" not found in available models",
                model_name
            ))
            .with("suggestion", Self::suggestion(model_name, &available))
            .with("available_models", json!(available)));
        }

        let applied = match self.handler.get() {
            Some(handler) => {
                handler.switch_model(model_name);
                true
            }
            None => false,
        };

        info!(target: "model_switch", model = %model_name, applied, "Model switch validated");

        let message = if applied {
            format!("Switched to model \"{}\"", model_name)
        } else {
            format!(
                "Model \"{}\" is available; no switch handler is installed, the caller must apply the switch",
                model_name
            )
        };

        Ok(ResultEnvelope::success()
            .with("new_model", model_name)
            .with("reason", reason)
            .with("available_models", json!(available))
            .with("applied", applied)
            .with("message", message))
    }
}
