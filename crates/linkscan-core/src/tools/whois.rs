//! WHOIS lookup over TCP port 43

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::formatting::truncate_chars;
use crate::tool_params;
use crate::tools::{body_byte_cap, required_arg, Tool, ToolArguments, ToolOutput};

const WHOIS_PORT: u16 = 43;

/// Tool returning the registry record of a domain
pub struct GetWhoisData {
    root_server: String,
    port: u16,
    timeout: Duration,
    max_chars: usize,
}

impl GetWhoisData {
    pub fn new(root_server: impl Into<String>, timeout: Duration, max_chars: usize) -> Self {
        Self {
            root_server: root_server.into(),
            port: WHOIS_PORT,
            timeout,
            max_chars,
        }
    }

    /// Query servers on a port other than 43
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn query(&self, server: &str, domain: &str) -> Result<String, ToolError> {
        let addr = format!("{}:{}", server, self.port);
        let mut stream = timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| ToolError::ExecutionFailed(format!("Connecting to {} timed out", addr)))?
            .map_err(|e| {
                ToolError::ExecutionFailed(format!("Failed to connect to {}: {}", addr, e))
            })?;

        stream.write_all(format!("{}\r\n", domain).as_bytes()).await?;

        let cap = body_byte_cap(self.max_chars) as u64;
        let mut buf = Vec::new();
        timeout(self.timeout, (&mut stream).take(cap).read_to_end(&mut buf))
            .await
            .map_err(|_| ToolError::ExecutionFailed(format!("Reading from {} timed out", addr)))??;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Reduce a URL or host-ish argument to a bare domain
pub fn normalize_domain(input: &str) -> Result<String, ToolError> {
    let input = input.trim();
    let host = if input.contains("://") {
        url::Url::parse(input)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .ok_or_else(|| {
                ToolError::InvalidParams(format!("Cannot extract a domain from '{}'", input))
            })?
    } else {
        input.split(['/', '?', '#']).next().unwrap_or("").to_string()
    };

    let host = host.trim_end_matches('.').to_lowercase();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(ToolError::InvalidParams(format!("Invalid domain '{}'", input)));
    }
    Ok(host)
}

/// The referral server named in a root answer (`refer:` or `whois:` line)
pub fn find_referral(response: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if (key == "refer" || key == "whois") && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

#[async_trait]
impl Tool for GetWhoisData {
    fn name(&self) -> &str {
        "get_whois_data"
    }

    fn description(&self) -> &str {
        "Returns the WHOIS registration record (registrar, creation and expiry dates) of a domain."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(domain: "string" => "The domain name, e.g. example.com")
    }

    async fn execute(&self, arguments: &ToolArguments) -> Result<ToolOutput, ToolError> {
        let domain = normalize_domain(required_arg(arguments, "domain")?)?;
        info!(domain = %domain, "Getting WHOIS data");

        let root_answer = self.query(&self.root_server, &domain).await?;
        let record = match find_referral(&root_answer) {
            Some(server) if !server.eq_ignore_ascii_case(&self.root_server) => {
                debug!(domain = %domain, server = %server, "Following WHOIS referral");
                self.query(&server, &domain).await?
            }
            _ => root_answer,
        };

        Ok(ToolOutput::success(truncate_chars(&record, self.max_chars)))
    }
}
