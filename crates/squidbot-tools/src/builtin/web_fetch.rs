use async_trait::async_trait;

use crate::tool::Tool;

const MAX_RESPONSE_CHARS: usize = 8000;

/// Fetches a URL over HTTP(S) and returns the body, truncated to a bound
/// safe for LLM context.
pub struct WebFetchTool {
    client: reqwest::Client,
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch a URL and return its response body as text."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "The URL to fetch." }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, String> {
        let url = arguments
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or("missing required parameter: url")?;

        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;

        let truncated: String = body.chars().take(MAX_RESPONSE_CHARS).collect();
        if !status.is_success() {
            return Err(format!("HTTP {status}: {truncated}"));
        }
        Ok(truncated)
    }
}
