//! Lexical analysis tool - scores a URL on its shape alone

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::IpAddr;

use crate::error::ToolError;
use crate::tool_params;
use crate::tools::{required_arg, Tool, ToolArguments, ToolOutput};

/// Words that show up in credential-harvesting URLs
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "login", "signin", "secure", "account", "update", "verify", "password", "banking", "confirm",
    "recovery", "admin",
];

const MAX_PLAIN_URL_LENGTH: usize = 75;
const MAX_HOST_DASHES: usize = 2;
const MAX_HOST_DOTS: usize = 3;
const MAX_PATH_SLASHES: usize = 4;

/// Findings of a lexical scan
///
/// Findings are neutral `key:value` observations; interpretation is left to
/// the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalReport {
    pub suspicion_score: u32,
    pub findings: Vec<String>,
}

impl LexicalReport {
    fn flag(&mut self, weight: u32, finding: String) {
        self.suspicion_score += weight;
        self.findings.push(finding);
    }
}

/// Score a raw URL
pub fn analyze(raw_url: &str) -> Result<LexicalReport, ToolError> {
    let parsed = url::Url::parse(raw_url)
        .map_err(|e| ToolError::InvalidParams(format!("Invalid URL: {}", e)))?;

    let host = parsed.host_str().unwrap_or("");
    let bare_host = host.trim_start_matches('[').trim_end_matches(']');
    let mut report = LexicalReport::default();

    if bare_host.parse::<IpAddr>().is_ok() {
        report.flag(3, "host_is_ip:true".to_string());
    }

    if raw_url.len() > MAX_PLAIN_URL_LENGTH {
        report.flag(1, format!("url_length:{}", raw_url.len()));
    }

    // Userinfo before the host ("user@host") hides the real destination
    if !parsed.username().is_empty() || parsed.password().is_some() {
        report.flag(2, "at_symbol_in_host:true".to_string());
    }

    let dashes = host.matches('-').count();
    if dashes > MAX_HOST_DASHES {
        report.flag(1, format!("dash_count:{}", dashes));
    }

    let dots = host.matches('.').count();
    if dots > MAX_HOST_DOTS {
        report.flag(1, format!("subdomain_dot_count:{}", dots));
    }

    let lowered = raw_url.to_lowercase();
    for keyword in SUSPICIOUS_KEYWORDS {
        if lowered.contains(keyword) {
            report.flag(1, format!("keyword_found:{}", keyword));
        }
    }

    let slashes = parsed.path().matches('/').count();
    if slashes > MAX_PATH_SLASHES {
        report.flag(1, format!("path_slash_count:{}", slashes));
    }

    Ok(report)
}

/// Tool wrapper around [`analyze`]
pub struct LexicalAnalysis;

impl LexicalAnalysis {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LexicalAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for LexicalAnalysis {
    fn name(&self) -> &str {
        "lexical_analysis"
    }

    fn description(&self) -> &str {
        "Scores the URL string itself (IP hosts, length, userinfo, dashes, subdomain depth, \
         credential keywords, path depth) without contacting it."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(url: "string" => "The full URL to analyse")
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let url = required_arg(arguments, "url")?;
        let report = analyze(url)?;
        let content = serde_json::to_value(&report)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to serialize report: {}", e)))?;
        Ok(ToolOutput::success(content))
    }
}
