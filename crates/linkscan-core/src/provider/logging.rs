//! Backend exchange journal
//!
//! Set the `LLM_LOG_FILE` environment variable to append every backend
//! exchange as one JSON line. Useful for auditing verdicts and for debugging
//! replies that break the contract.
//!
//! Example: `LLM_LOG_FILE=/tmp/linkscan-llm.log linkscan scan https://bit.ly/x`

use serde_json::json;
use std::io::Write;
use tracing::{debug, warn};

/// Environment variable naming the journal file
pub const LOG_FILE_ENV: &str = "LLM_LOG_FILE";

/// What to include in a journal entry
#[derive(Default)]
pub struct ExchangeLog<'a> {
    pub model: &'a str,
    pub investigation_id: &'a str,
    /// Turns already in the session before this exchange
    pub history_len: usize,
    pub message: &'a str,
    pub reply: Option<&'a str>,
    pub error: Option<&'a str>,
}

/// Build the JSON entry for one exchange
pub fn exchange_entry(log: &ExchangeLog<'_>) -> serde_json::Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": log.model,
        "investigation_id": log.investigation_id,
        "history_len": log.history_len,
        "request": log.message,
        "response": log.reply,
        "error": log.error,
    })
}

/// Append the exchange to the journal if `LLM_LOG_FILE` is set
pub fn log_exchange(log: ExchangeLog<'_>) {
    let log_file = match std::env::var(LOG_FILE_ENV) {
        Ok(path) if !path.is_empty() => path,
        _ => return,
    };

    let entry = exchange_entry(&log);
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", entry) {
                warn!("Failed to write to LLM log file: {}", e);
            }
        }
        Err(e) => {
            warn!("Failed to open LLM log file {}: {}", log_file, e);
        }
    }

    debug!("Logged backend exchange to {}", log_file);
}
