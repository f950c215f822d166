use super::WEB_SEARCH_TOOL;
use crate::tools::{
    ParameterSchema, ParameterSpec, Params, ResultEnvelope, Tool, ToolError, ToolResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 20;

/// Configuration for the web search tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Brave Search subscription token; DuckDuckGo is used when unset
    pub brave_api_key: Option<String>,
    pub brave_endpoint: String,
    pub duckduckgo_endpoint: String,
    /// Timeout for API requests in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            brave_api_key: None,
            brave_endpoint: "https://api.search.brave.com/res/v1/web/search".to_string(),
            duckduckgo_endpoint: "https://api.duckduckgo.com/".to_string(),
            timeout_ms: 15_000,
            user_agent: "switchboard/0.1".to_string(),
        }
    }
}

/// Search result item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: String,
}

/// Brave Search API response structures
#[derive(Debug, Deserialize)]
struct BraveSearchResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    results: Vec<BraveWebResult>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResult {
    title: String,
    url: String,
    description: Option<String>,
}

/// DuckDuckGo Instant Answer response structure
#[derive(Debug, Deserialize)]
struct DuckDuckGoResponse {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Result {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

/// `web_search`: Brave Search when a key is configured, DuckDuckGo otherwise
pub struct WebSearchTool {
    config: WebSearchConfig,
    http_client: reqwest::Client,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self::with_config(WebSearchConfig::default())
    }

    pub fn with_config(config: WebSearchConfig) -> Self {
        let mut client_builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent);

        // Check for proxy settings (HTTPS_PROXY, HTTP_PROXY, or ALL_PROXY)
        if let Ok(proxy_url) = std::env::var("HTTPS_PROXY")
            .or_else(|_| std::env::var("HTTP_PROXY"))
            .or_else(|_| std::env::var("ALL_PROXY"))
        {
            tracing::info!(target: "web_search", proxy = %proxy_url, "Using proxy for web search");
            if let Ok(proxy) = reqwest::Proxy::all(&proxy_url) {
                client_builder = client_builder.proxy(proxy);
            }
        }

        let http_client = client_builder
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    fn backend(&self) -> &'static str {
        if self.brave_key().is_some() {
            "brave"
        } else {
            "duckduckgo"
        }
    }

    fn brave_key(&self) -> Option<&str> {
        self.config
            .brave_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    async fn search_brave(
        &self,
        api_key: &str,
        query: &str,
        count: usize,
    ) -> ToolResult<Vec<SearchResult>> {
        debug!(target: "web_search", query = %query, count = %count, "Performing Brave search");

        let url = format!(
            "{}?q={}&count={}",
            self.config.brave_endpoint,
            urlencoding::encode(query),
            count
        );

        let resp = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "web_search", error = %e, "Request failed");
                ToolError::from(e)
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed(format!(
                "Brave Search API error: {} - {}",
                status, body
            )));
        }

        let data: BraveSearchResponse = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse search response: {}", e))
        })?;

        Ok(data
            .web
            .map(|web| {
                web.results
                    .into_iter()
                    .take(count)
                    .map(|r| SearchResult {
                        title: r.title,
                        snippet: r.description.unwrap_or_default(),
                        url: r.url,
                        source: "brave".to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn search_duckduckgo(&self, query: &str, count: usize) -> ToolResult<Vec<SearchResult>> {
        debug!(target: "web_search", query = %query, count = %count, "Performing DuckDuckGo search");

        let url = format!(
            "{}?q={}&format=json&no_html=1",
            self.config.duckduckgo_endpoint,
            urlencoding::encode(query)
        );

        let resp = self.http_client.get(&url).send().await.map_err(|e| {
            warn!(target: "web_search", error = %e, "DuckDuckGo API request failed");
            ToolError::from(e)
        })?;

        if !resp.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "DuckDuckGo API error: {}",
                resp.status()
            )));
        }

        let data: DuckDuckGoResponse = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse search response: {}", e))
        })?;

        Ok(duckduckgo_results(data, count))
    }
}

fn duckduckgo_results(data: DuckDuckGoResponse, limit: usize) -> Vec<SearchResult> {
    fn collect(topics: &[RelatedTopic], results: &mut Vec<SearchResult>, limit: usize) {
        for topic in topics {
            if results.len() >= limit {
                break;
            }
            match topic {
                RelatedTopic::Result { text, first_url } => {
                    if !text.is_empty() && !first_url.is_empty() {
                        // DuckDuckGo topic text is "<title> - <snippet>"
                        let (title, snippet) = match text.split_once(" - ") {
                            Some((t, s)) => (t.to_string(), s.to_string()),
                            None => (text.clone(), String::new()),
                        };
                        results.push(SearchResult {
                            title,
                            snippet,
                            url: first_url.clone(),
                            source: "duckduckgo".to_string(),
                        });
                    }
                }
                RelatedTopic::Group { topics } => collect(topics, results, limit),
            }
        }
    }

    let mut results = Vec::new();
    if !data.abstract_text.is_empty() && limit > 0 {
        results.push(SearchResult {
            title: if data.heading.is_empty() {
                "Summary".to_string()
            } else {
                data.heading.clone()
            },
            snippet: data.abstract_text.clone(),
            url: data.abstract_url.clone(),
            source: "duckduckgo".to_string(),
        });
    }
    collect(&data.related_topics, &mut results, limit);
    results
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> String {
        WEB_SEARCH_TOOL.to_string()
    }

    fn description(&self) -> String {
        format!("Search the web for information (backend: {})", self.backend())
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .param(ParameterSpec::string("query", "Search query").required())
            .param(
                ParameterSpec::integer("limit", "Maximum number of results (max: 20)")
                    .with_default(DEFAULT_LIMIT),
            )
    }

    async fn call(&self, params: Params) -> ToolResult<ResultEnvelope> {
        let query = params
            .non_empty_str("query")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query'".to_string()))?;

        let limit = params.i64_or("limit", DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize;

        let results = match self.brave_key() {
            Some(key) => self.search_brave(key, query, limit).await?,
            None => self.search_duckduckgo(query, limit).await?,
        };

        debug!(target: "web_search", result_count = %results.len(), "Search completed");

        Ok(ResultEnvelope::success()
            .with("query", query)
            .with("count", results.len())
            .with("results", json!(results)))
    }
}
