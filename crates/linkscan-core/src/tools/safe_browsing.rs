//! Google Safe Browsing lookup

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::ToolError;
use crate::tool_params;
use crate::tools::{required_arg, Tool, ToolArguments, ToolOutput};

const API_URL: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";

const THREAT_TYPES: &[&str] = &[
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

/// Tool querying the Safe Browsing v4 threat list
pub struct CheckSafeBrowsing {
    api_key: Option<String>,
    timeout: Duration,
}

impl CheckSafeBrowsing {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
        }
    }
}

/// Request body for `threatMatches:find`
pub fn request_body(url: &str) -> Value {
    json!({
        "client": {
            "clientId": "linkscan",
            "clientVersion": env!("CARGO_PKG_VERSION"),
        },
        "threatInfo": {
            "threatTypes": THREAT_TYPES,
            "platformTypes": ["ANY_PLATFORM"],
            "threatEntryTypes": ["URL"],
            "threatEntries": [{ "url": url }],
        }
    })
}

#[async_trait]
impl Tool for CheckSafeBrowsing {
    fn name(&self) -> &str {
        "check_google_safe_browsing"
    }

    fn description(&self) -> &str {
        "Looks the URL up in Google Safe Browsing. An empty JSON object means no known threat."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(url: "string" => "The URL to look up")
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let url = required_arg(arguments, "url")?;
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolError::ExecutionFailed("Safe Browsing API key is not configured".into())
        })?;

        info!(url = %url, "Checking Safe Browsing");

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create client: {}", e)))?;

        let response = client
            .post(API_URL)
            .query(&[("key", api_key)])
            .json(&request_body(url))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Safe Browsing request failed");
                ToolError::ExecutionFailed(format!(
                    "Failed to send request to Safe Browsing API: {}",
                    e
                ))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to read Safe Browsing response: {}", e))
        })?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "Safe Browsing returned non-OK status");
            return Err(ToolError::ExecutionFailed(format!(
                "Safe Browsing API returned status: {}, body: {}",
                status.as_u16(),
                body
            )));
        }

        debug!(body = %body, "Safe Browsing response");
        Ok(ToolOutput::success(body))
    }
}
