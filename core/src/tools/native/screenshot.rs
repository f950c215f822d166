use super::SCREENSHOT_TOOL;
use crate::tools::{
    ParameterSchema, ParameterSpec, Params, ResultEnvelope, Tool, ToolError, ToolResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Configuration for the screenshot preview service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Preview endpoint; receives a JSON POST and answers with the image URL
    pub api_endpoint: String,
    /// The tool is only registered when a key is configured
    pub api_key: Option<String>,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
    pub default_width: i64,
    pub default_height: i64,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.screenshotone.com/take".to_string(),
            api_key: None,
            timeout_ms: 30_000,
            user_agent: "switchboard/0.1".to_string(),
            default_width: 1280,
            default_height: 800,
        }
    }
}

impl ScreenshotConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// `screenshot`: renders a preview image of a web page
pub struct ScreenshotTool {
    config: ScreenshotConfig,
    http_client: reqwest::Client,
}

impl ScreenshotTool {
    pub fn with_config(config: ScreenshotConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    async fn capture(&self, body: &Value) -> ToolResult<String> {
        let mut req = self.http_client.post(&self.config.api_endpoint).json(body);
        if let Some(key) = self.config.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed(format!(
                "Screenshot API error: {} - {}",
                status, text
            )));
        }

        let data: Value = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse screenshot response: {}", e))
        })?;

        ["screenshot_url", "image_url", "url"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| {
                ToolError::ExecutionFailed(
                    "Screenshot response did not contain an image URL".to_string(),
                )
            })
    }
}

fn validate_target(url: &str) -> ToolResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!(
            "url must start with http:// or https://, got '{}'",
            url
        )))
    }
}

#[async_trait]
impl Tool for ScreenshotTool {
    fn name(&self) -> String {
        SCREENSHOT_TOOL.to_string()
    }

    fn description(&self) -> String {
        "Capture a preview screenshot of a web page and return the image URL".to_string()
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .param(ParameterSpec::string("url", "Address of the page to capture").required())
            .param(
                ParameterSpec::boolean("full_page", "Capture the whole scrollable page")
                    .with_default(false),
            )
            .param(
                ParameterSpec::integer("width", "Viewport width in pixels")
                    .with_default(self.config.default_width),
            )
            .param(
                ParameterSpec::integer("height", "Viewport height in pixels")
                    .with_default(self.config.default_height),
            )
    }

    async fn call(&self, mut params: Params) -> ToolResult<ResultEnvelope> {
        self.parameters().apply_defaults(&mut params);

        let url = params
            .non_empty_str("url")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url'".to_string()))?;
        validate_target(url)?;

        let full_page = params.bool_or("full_page", false);
        let width = params.i64_or("width", self.config.default_width).max(1);
        let height = params.i64_or("height", self.config.default_height).max(1);

        debug!(target: "screenshot", url = %url, full_page, width, height, "Requesting screenshot");

        let screenshot_url = self
            .capture(&json!({
                "url": url,
                "full_page": full_page,
                "width": width,
                "height": height,
            }))
            .await?;

        Ok(ResultEnvelope::success()
            .with("screenshot_url", screenshot_url)
            .with("url", url)
            .with("width", width)
            .with("height", height)
            .with("full_page", full_page))
    }
}
