use super::MODEL_LIST_TOOL;
use crate::tools::{
    ParameterSchema, ParameterSpec, Params, ResultEnvelope, Tool, ToolError, ToolResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Configuration for the remote model catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCatalogConfig {
    /// Base URL of an OpenAI-compatible API (the catalog is `<base_url>/models`)
    pub base_url: String,
    /// Optional bearer token
    pub api_key: Option<String>,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
    /// How long a fetched list is reused; 0 disables caching
    pub cache_ttl_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ModelCatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: None,
            timeout_ms: 10_000,
            cache_ttl_secs: 300,
            user_agent: "switchboard/0.1".to_string(),
        }
    }
}

struct CachedModels {
    models: Vec<String>,
    fetched_at: Instant,
}

/// `fetch_ai_models`: lists the models served by the configured endpoint
pub struct ModelCatalogTool {
    config: ModelCatalogConfig,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedModels>>,
}

impl Default for ModelCatalogTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelCatalogTool {
    pub fn new() -> Self {
        Self::with_config(ModelCatalogConfig::default())
    }

    pub fn with_config(config: ModelCatalogConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
            cache: RwLock::new(None),
        }
    }

    async fn cached(&self) -> Option<Vec<String>> {
        let ttl = Duration::from_secs(self.config.cache_ttl_secs);
        if ttl.is_zero() {
            return None;
        }
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < ttl)
            .map(|c| c.models.clone())
    }

    async fn fetch_models(&self) -> ToolResult<Vec<String>> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        debug!(target: "model_catalog", url = %url, "Fetching model list");

        let mut req = self
            .http_client
            .get(&url)
            .header("Accept", "application/json");
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed(format!(
                "Model catalog API error: {} - {}",
                status, body
            )));
        }

        let data: Value = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse model catalog response: {}", e))
        })?;
        parse_model_list(&data)
    }
}

/// Extracts model names from the common catalog response shapes:
/// OpenAI (`data[].id`), Ollama (`models[].name`) and plain string lists.
pub fn parse_model_list(data: &Value) -> ToolResult<Vec<String>> {
    let items = data
        .get("data")
        .or_else(|| data.get("models"))
        .and_then(Value::as_array)
        .or_else(|| data.as_array())
        .ok_or_else(|| {
            ToolError::ExecutionFailed("Unexpected model catalog response shape".to_string())
        })?;

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("id")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect())
}

#[async_trait]
impl Tool for ModelCatalogTool {
    fn name(&self) -> String {
        MODEL_LIST_TOOL.to_string()
    }

    fn description(&self) -> String {
        "List the AI models available on the configured model endpoint".to_string()
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().param(
            ParameterSpec::boolean("force_refresh", "Bypass the cached model list")
                .with_default(false),
        )
    }

    async fn call(&self, params: Params) -> ToolResult<ResultEnvelope> {
        let force_refresh = params.bool_or("force_refresh", false);

        if !force_refresh {
            if let Some(models) = self.cached().await {
                debug!(target: "model_catalog", count = models.len(), "Serving cached model list");
                return Ok(envelope(models, true, &self.config.base_url));
            }
        }

        let models = self.fetch_models().await?;
        info!(target: "model_catalog", count = models.len(), force_refresh, "Fetched model list");

        *self.cache.write().await = Some(CachedModels {
            models: models.clone(),
            fetched_at: Instant::now(),
        });

        Ok(envelope(models, false, &self.config.base_url))
    }
}

fn envelope(models: Vec<String>, cached: bool, source: &str) -> ResultEnvelope {
    ResultEnvelope::success()
        .with("count", models.len())
        .with("models", json!(models))
        .with("cached", cached)
        .with("source", source)
}
