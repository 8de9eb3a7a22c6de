//! search tool - web search via the Tavily API

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};

/// Search the web for information
pub struct SearchTool {
    api_key: Option<String>,
}

impl SearchTool {
    /// Create a search tool; `api_key` of None means unconfigured and every
    /// invocation reports the missing configuration to the model
    pub fn new(api_key: Option<String>) -> Self {
        debug!(configured = api_key.is_some(), "SearchTool::new: called");
        Self { api_key }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn description(&self) -> &'static str {
        "Search the web for information. Returns titles, URLs, and content snippets."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum results to return (default: 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(session_id = %ctx.session_id, "SearchTool::execute: called");
        let query = match input["query"].as_str() {
            Some(q) => q,
            None => return ToolResult::error("query is required"),
        };

        let max_results = input["max_results"].as_u64().unwrap_or(5) as usize;

        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                return ToolResult::error(
                    "No search API configured. Set the TAVILY_API_KEY environment variable.",
                );
            }
        };

        search_tavily(query, max_results, api_key).await
    }
}

/// Search using the Tavily API
async fn search_tavily(query: &str, max_results: usize, api_key: &str) -> ToolResult {
    debug!(%query, max_results, "search_tavily: called");
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap_or_default();

    let body = serde_json::json!({
        "api_key": api_key,
        "query": query,
        "max_results": max_results,
        "search_depth": "basic"
    });

    let response = match client.post("https://api.tavily.com/search").json(&body).send().await {
        Ok(r) => r,
        Err(e) => return ToolResult::error(format!("Search request failed: {}", e)),
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return ToolResult::error(format!("Tavily API error {}: {}", status, error_text));
    }

    let result: Value = match response.json().await {
        Ok(r) => r,
        Err(e) => return ToolResult::error(format!("Failed to parse response: {}", e)),
    };

    let results = match result["results"].as_array() {
        Some(r) if !r.is_empty() => r.clone(),
        _ => return ToolResult::success("No results found"),
    };

    let output: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let title = r["title"].as_str().unwrap_or("(no title)");
            let url = r["url"].as_str().unwrap_or("");
            let content = r["content"].as_str().unwrap_or("");
            format!("{}. {}\n   {}\n   {}\n", i + 1, title, url, truncate(content, 200))
        })
        .collect();

    ToolResult::success(output.join("\n"))
}

/// Truncate string to max length
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
