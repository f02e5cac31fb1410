//! Page fetch tool - retrieves the raw body of a web page

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::ToolError;
use crate::formatting::truncate_chars;
use crate::tool_params;
use crate::tools::{body_byte_cap, required_arg, Tool, ToolArguments, ToolOutput};

/// Tool for fetching page content
pub struct FetchPageContent {
    timeout: Duration,
    user_agent: String,
    max_chars: usize,
}

impl FetchPageContent {
    pub fn new(timeout: Duration, user_agent: impl Into<String>, max_chars: usize) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
            max_chars,
        }
    }
}

#[async_trait]
impl Tool for FetchPageContent {
    fn name(&self) -> &str {
        "fetch_page_content"
    }

    fn description(&self) -> &str {
        "Downloads the page at the URL and returns its body as text. \
         Long pages are truncated."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(url: "string" => "The http or https URL to fetch")
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let url = required_arg(arguments, "url")?;

        // Validate URL
        let parsed_url = url::Url::parse(url)
            .map_err(|e| ToolError::InvalidParams(format!("Invalid URL: {}", e)))?;

        // Only allow http/https
        if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
            return Err(ToolError::InvalidParams(
                "Only HTTP and HTTPS URLs are supported".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create client: {}", e)))?;

        let mut response = client
            .get(parsed_url.as_str())
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to fetch URL: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        // Stop reading once enough bytes for max_chars have arrived
        let cap = body_byte_cap(self.max_chars);
        let mut body = Vec::new();
        while body.len() < cap {
            match response
                .chunk()
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read response: {}", e)))?
            {
                Some(chunk) => body.extend_from_slice(&chunk),
                None => break,
            }
        }
        body.truncate(cap);

        let text = String::from_utf8_lossy(&body);
        Ok(ToolOutput::success(truncate_chars(&text, self.max_chars)))
    }
}
