//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use linkscan_core::error::{Error, Result, ToolError};
use linkscan_core::session::Session;
use linkscan_core::tools::{required_arg, Tool, ToolArguments, ToolOutput};
use linkscan_core::ChatBackend;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const COMPLETED_SAFE: &str = r#"{"status":"COMPLETED","reasoning":"clean","final_verdict":{"category":"SAFE","explanation":"Looks fine.","confidence_score":0.9}}"#;

pub const ONGOING_ECHO: &str =
    r#"{"status":"ONGOING","tool_calls":[{"tool_name":"echo","arguments":{"url":"http://example.com"}}]}"#;

/// What the backend saw on one send
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub investigation_id: String,
    pub history_len: usize,
    pub message: String,
}

/// Backend replaying a fixed script; the last reply repeats once the script runs out
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    requests: Mutex<Vec<SentRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(&[reply])
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, session: &Session, message: &str) -> Result<String> {
        self.requests.lock().push(SentRequest {
            investigation_id: session.id().to_string(),
            history_len: session.turns().len(),
            message: message.to_string(),
        });

        let next = self.replies.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(reply) = next {
            *last = Some(reply);
        }
        last.clone()
            .ok_or_else(|| Error::Transport("script is empty".to_string()))
    }
}

/// Backend that takes `delay` to answer and tracks overlapping sends
pub struct SlowBackend {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Most sends that were ever awaiting a reply at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    async fn send(&self, _session: &Session, _message: &str) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(COMPLETED_SAFE.to_string())
    }
}

/// Backend that is never reachable
pub struct UnreachableBackend;

#[async_trait]
impl ChatBackend for UnreachableBackend {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn send(&self, _session: &Session, _message: &str) -> Result<String> {
        Err(Error::Transport("connection refused".to_string()))
    }
}

/// Tool returning its `url` argument
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the url argument back."
    }

    fn parameters_schema(&self) -> Value {
        linkscan_core::tool_params! {
            url: "string" => "URL to echo"
        }
    }

    async fn execute(
        &self,
        arguments: &ToolArguments,
    ) -> std::result::Result<ToolOutput, ToolError> {
        let url = required_arg(arguments, "url")?;
        Ok(ToolOutput::success(json!({ "echoed": url })))
    }
}

/// Tool that always fails
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        _arguments: &ToolArguments,
    ) -> std::result::Result<ToolOutput, ToolError> {
        Err(ToolError::ExecutionFailed("upstream unavailable".to_string()))
    }
}
