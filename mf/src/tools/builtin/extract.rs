//! extract tool - fetch a URL and pull out readable content

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};

/// Extract readable content from a URL. HTML is converted to markdown.
pub struct ExtractTool {
    http: reqwest::Client,
}

impl ExtractTool {
    pub fn new() -> Self {
        debug!("ExtractTool::new: called");
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Museflow/0.1 (extract tool)")
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl Default for ExtractTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ExtractTool {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn description(&self) -> &'static str {
        "Fetch content from a URL. Converts HTML to readable markdown."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL to fetch"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(session_id = %ctx.session_id, "ExtractTool::execute: called");
        let url = match input["url"].as_str() {
            Some(u) => u,
            None => return ToolResult::error("url is required"),
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return ToolResult::error("URL must start with http:// or https://");
        }

        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("Failed to fetch URL: {}", e)),
        };

        if !response.status().is_success() {
            return ToolResult::error(format!("HTTP error: {}", response.status()));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return ToolResult::error(format!("Failed to read response: {}", e)),
        };

        if body.len() > 1_000_000 {
            return ToolResult::error("Response too large (> 1MB)");
        }

        let content = if content_type.contains("text/html") || content_type.contains("application/xhtml") {
            debug!("ExtractTool::execute: converting HTML to markdown");
            html2md::rewrite_html(&body, false)
        } else if content_type.contains("application/json") {
            match serde_json::from_str::<Value>(&body) {
                Ok(json) => serde_json::to_string_pretty(&json).unwrap_or(body),
                Err(_) => body,
            }
        } else {
            body
        };

        ToolResult::success(truncate_content(content))
    }
}

/// Cap extracted content so one page cannot blow the model context
fn truncate_content(content: String) -> String {
    let max_chars = 50_000;
    if content.len() <= max_chars {
        return content;
    }
    let mut end = max_chars;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}...\n\n[truncated, {} chars total]",
        &content[..end],
        content.len()
    )
}
