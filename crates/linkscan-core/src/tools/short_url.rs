//! Short URL resolution - follows exactly one redirect hop

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::ToolError;
use crate::tool_params;
use crate::tools::{required_arg, Tool, ToolArguments, ToolOutput};

/// Tool that reveals where a shortened link points
pub struct ResolveShortUrl {
    timeout: Duration,
    user_agent: String,
}

impl ResolveShortUrl {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
        }
    }
}

/// Resolve a `Location` header against the URL that produced it
fn resolve_location(base: &url::Url, location: &str) -> Result<String, ToolError> {
    base.join(location)
        .map(|u| u.to_string())
        .map_err(|e| {
            ToolError::ExecutionFailed(format!("Invalid redirect location '{}': {}", location, e))
        })
}

#[async_trait]
impl Tool for ResolveShortUrl {
    fn name(&self) -> &str {
        "resolve_short_url"
    }

    fn description(&self) -> &str {
        "Requests the URL without following redirects and returns the redirect target, \
         or the URL itself when it does not redirect."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(url: "string" => "The possibly shortened URL")
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let raw = required_arg(arguments, "url")?;
        let parsed = url::Url::parse(raw)
            .map_err(|e| ToolError::InvalidParams(format!("Invalid URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create client: {}", e)))?;

        let response = client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to request URL: {}", e)))?;

        let status = response.status();
        debug!(url = %raw, status = status.as_u16(), "Short URL request answered");

        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    ToolError::ExecutionFailed(format!(
                        "Redirect {} without a Location header",
                        status.as_u16()
                    ))
                })?;
            return Ok(ToolOutput::success(resolve_location(&parsed, location)?));
        }

        Ok(ToolOutput::success(raw.to_string()))
    }
}
