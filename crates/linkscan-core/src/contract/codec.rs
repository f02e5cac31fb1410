//! Decoding of backend replies and encoding of tool outcomes

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{ScanResult, ScanStatus, ToolCall, Verdict};
use crate::error::{Error, Result};

/// Lead-in of the user turn that carries tool results back to the backend
pub const TOOL_RESULTS_PREFIX: &str = "Here are the results of the tool calls:";

/// Fence openers the backend tends to wrap its JSON in
const FENCE_OPENERS: &[&str] = &["```json", "```JSON", "```"];
const FENCE_CLOSER: &str = "```";

/// Result of a single tool call as fed back to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeEntry {
    Success(String),
    Failure(String),
}

impl OutcomeEntry {
    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeEntry::Failure(_))
    }
}

/// Outcome of one dispatch batch, keyed by tool name
///
/// Inserting the same name twice keeps the later entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutcome {
    entries: BTreeMap<String, OutcomeEntry>,
}

impl ToolOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: OutcomeEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn success(&mut self, name: impl Into<String>, payload: impl Into<String>) {
        self.insert(name, OutcomeEntry::Success(payload.into()));
    }

    pub fn failure(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.insert(name, OutcomeEntry::Failure(message.into()));
    }

    pub fn get(&self, name: &str) -> Option<&OutcomeEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_failure()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OutcomeEntry)> {
        self.entries.iter()
    }
}

/// Reply as it arrives on the wire, before verdict validation
#[derive(Deserialize)]
struct WireResult {
    #[serde(default)]
    investigation_id: String,
    status: ScanStatus,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    final_verdict: Option<Value>,
}

/// Strip surrounding whitespace and markdown code fences
pub fn sanitize(raw: &str) -> &str {
    let mut text = raw.trim();
    for opener in FENCE_OPENERS {
        if let Some(rest) = text.strip_prefix(opener) {
            text = rest;
            break;
        }
    }
    if let Some(rest) = text.strip_suffix(FENCE_CLOSER) {
        text = rest;
    }
    text.trim()
}

/// Decode a raw backend reply into a [`ScanResult`]
///
/// Terminal statuses must carry a well-formed verdict with a confidence in
/// [0.0, 1.0]. A verdict attached to an ONGOING reply is advisory and is
/// dropped when it does not decode.
pub fn decode(raw: &str) -> Result<ScanResult> {
    let cleaned = sanitize(raw);

    let wire: WireResult = serde_json::from_str(cleaned)
        .map_err(|e| Error::contract(format!("reply is not a valid contract object: {}", e), raw))?;

    let final_verdict = match wire.final_verdict {
        None | Some(Value::Null) => None,
        Some(value) if wire.status.is_terminal() => {
            let verdict: Verdict = serde_json::from_value(value)
                .map_err(|e| Error::contract(format!("malformed final_verdict: {}", e), raw))?;
            validate_confidence(verdict.confidence_score).map_err(|msg| Error::contract(msg, raw))?;
            Some(verdict)
        }
        Some(value) => serde_json::from_value::<Verdict>(value)
            .ok()
            .filter(|v| validate_confidence(v.confidence_score).is_ok()),
    };

    if wire.status.is_terminal() && final_verdict.is_none() {
        return Err(Error::contract(
            format!("status {} requires a final_verdict", wire.status),
            raw,
        ));
    }

    Ok(ScanResult {
        investigation_id: wire.investigation_id,
        status: wire.status,
        reasoning: wire.reasoning,
        tool_calls: wire.tool_calls.unwrap_or_default(),
        final_verdict,
    })
}

fn validate_confidence(score: f64) -> std::result::Result<(), String> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(format!("confidence_score {} is outside [0.0, 1.0]", score))
    }
}

/// Render a tool payload as text; strings pass through, structured values
/// are serialized to compact JSON
pub fn flatten_payload(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encode a dispatch outcome into the text of the next user turn
pub fn encode(outcome: &ToolOutcome) -> String {
    let mut results = serde_json::Map::new();
    for (name, entry) in outcome.iter() {
        let value = match entry {
            OutcomeEntry::Success(payload) => Value::String(payload.clone()),
            OutcomeEntry::Failure(message) => json!({ "error": message }),
        };
        results.insert(name.clone(), value);
    }
    format!("{} {}", TOOL_RESULTS_PREFIX, Value::Object(results))
}
