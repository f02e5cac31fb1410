//! Backend exchange contract
//!
//! Every backend reply must be a JSON object of this shape:
//!
//! ```text
//! {
//!   "investigation_id": "...",
//!   "status": "ONGOING" | "COMPLETED" | "ERROR",
//!   "reasoning": "...",
//!   "tool_calls": [ { "tool_name": "...", "arguments": { "url": "..." } } ],
//!   "final_verdict": { "category": "SAFE", "explanation": "...", "confidence_score": 0.9 }
//! }
//! ```
//!
//! `codec` turns raw backend text into a [`ScanResult`] and tool outcomes
//! back into the text of the next user turn.

mod codec;

pub use codec::{
    decode, encode, flatten_payload, sanitize, OutcomeEntry, ToolOutcome, TOOL_RESULTS_PREFIX,
};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Investigation status reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanStatus {
    /// More evidence is needed; tool calls follow
    Ongoing,
    /// A final verdict was reached
    Completed,
    /// The input could not be analysed; a verdict still explains why
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Ongoing => "ONGOING",
            ScanStatus::Completed => "COMPLETED",
            ScanStatus::Error => "ERROR",
        }
    }

    /// COMPLETED and ERROR end the investigation loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Error)
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend-requested tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "tool_name")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub arguments: HashMap<String, String>,
}

/// `"arguments": null` means no arguments
fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Verdict category
///
/// Names outside the known set are kept verbatim in `Other` so the report
/// can still render them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerdictCategory {
    Safe,
    Phishing,
    Malware,
    Advertisement,
    Suspicious,
    Other(String),
}

impl VerdictCategory {
    pub fn as_str(&self) -> &str {
        match self {
            VerdictCategory::Safe => "SAFE",
            VerdictCategory::Phishing => "PHISHING",
            VerdictCategory::Malware => "MALWARE",
            VerdictCategory::Advertisement => "ADVERTISEMENT",
            VerdictCategory::Suspicious => "SUSPICIOUS",
            VerdictCategory::Other(name) => name,
        }
    }
}

impl From<String> for VerdictCategory {
    fn from(s: String) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SAFE" => VerdictCategory::Safe,
            "PHISHING" => VerdictCategory::Phishing,
            "MALWARE" => VerdictCategory::Malware,
            "ADVERTISEMENT" => VerdictCategory::Advertisement,
            "SUSPICIOUS" => VerdictCategory::Suspicious,
            other => VerdictCategory::Other(other.to_string()),
        }
    }
}

impl From<VerdictCategory> for String {
    fn from(c: VerdictCategory) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for VerdictCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub category: VerdictCategory,
    pub explanation: String,
    /// Confidence in [0.0, 1.0]
    pub confidence_score: f64,
}

/// One decoded backend reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub investigation_id: String,
    pub status: ScanStatus,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_verdict: Option<Verdict>,
}

impl ScanResult {
    /// Names of the requested tools, in request order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|tc| tc.name.as_str()).collect()
    }
}
