//! linkscan CLI - investigate suspicious links from the terminal
//!
//! `scan` investigates URLs given on the command line, `watch` treats every
//! stdin line as an incoming chat message and replies on stdout.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use linkscan_core::config::{Config, ConfigManager};
use linkscan_core::orchestration::create_standard_tool_registry;
use linkscan_core::provider::{create_provider, ProviderType};
use linkscan_core::scanner::{MessageId, ScanService, Scanner, Transport};
use linkscan_core::format_report;

#[derive(Parser)]
#[command(name = "linkscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Investigate suspicious links with a generative backend and security tools",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend provider (gemini, openai, anthropic, ...) - defaults to config setting
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model to use (defaults to provider's default)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Investigate one or more URLs and print the reports
    Scan {
        /// URLs to investigate
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print the raw results as JSON instead of reports
        #[arg(long)]
        json: bool,
    },

    /// Read chat messages from stdin and reply to every URL found
    Watch {
        /// Recipient label used for replies
        #[arg(long, default_value = "stdin")]
        recipient: String,
    },

    /// Show available tools
    Tools,

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Warn by default so logs don't interleave with reports; RUST_LOG wins
    let default_filter = if cli.verbose {
        "info,linkscan_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    let mut config = config_manager.config().clone();
    apply_overrides(&mut config, cli.provider.as_deref(), cli.model.as_deref())?;

    match cli.command {
        Commands::Scan { urls, json } => run_scan(&config, &urls, json).await,
        Commands::Watch { recipient } => run_watch(&config, &recipient).await,
        Commands::Tools => {
            show_tools(&config);
            Ok(())
        }
        Commands::Config => {
            show_config(&config_manager, &config);
            Ok(())
        }
    }
}

/// Apply `--provider` and `--model` on top of the loaded config
fn apply_overrides(
    config: &mut Config,
    provider: Option<&str>,
    model: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(provider) = provider {
        let provider_type: ProviderType = provider.parse().map_err(anyhow::Error::msg)?;
        if provider_type.as_str() != config.provider.provider_type {
            // Credentials and model of another provider don't carry over
            config.provider.provider_type = provider_type.as_str().to_string();
            config.provider.api_key = None;
            config.provider.api_key_env = None;
            config.provider.model = None;
        }
    }
    if let Some(model) = model {
        config.provider.model = Some(model.to_string());
    }
    Ok(())
}

fn build_scanner(config: &Config) -> anyhow::Result<Arc<Scanner>> {
    let backend = create_provider(&config.provider)?;
    Ok(Arc::new(Scanner::from_config(config, backend)))
}

async fn run_scan(config: &Config, urls: &[String], json: bool) -> anyhow::Result<()> {
    let scanner = build_scanner(config)?;
    let progress = MultiProgress::new();
    let spinner_style = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?;

    let scans = urls.iter().map(|url| {
        let scanner = scanner.clone();
        let spinner = progress.add(ProgressBar::new_spinner());
        spinner.set_style(spinner_style.clone());
        spinner.set_message(format!("Scanning {}", url));
        spinner.enable_steady_tick(Duration::from_millis(100));
        async move {
            let result = scanner.investigate(url).await;
            spinner.finish_and_clear();
            (url, result)
        }
    });
    let results = futures::future::join_all(scans).await;

    let mut failures = 0;
    for (url, result) in results {
        match result {
            Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
            Ok(result) => {
                println!("{} {}", style("URL:").bold(), style(url).cyan());
                println!("{}", format_report(&result));
                println!();
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", style("Scan failed").red().bold(), url, e);
                if let Some(raw) = e.raw_payload() {
                    eprintln!("  {} {}", style("Backend reply:").dim(), raw);
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} scan(s) failed", failures, urls.len());
    }
    Ok(())
}

/// Transport printing every delivery to stdout
struct ConsoleTransport {
    next_id: AtomicU64,
}

impl ConsoleTransport {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, recipient: &str, text: &str) -> linkscan_core::Result<MessageId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        println!("{} {}", style(format!("[{} #{}]", recipient, id)).cyan(), text);
        Ok(id)
    }

    async fn edit(
        &self,
        recipient: &str,
        message_id: &MessageId,
        text: &str,
    ) -> linkscan_core::Result<MessageId> {
        println!(
            "{} {}",
            style(format!("[{} #{} edited]", recipient, message_id)).yellow(),
            text
        );
        Ok(message_id.clone())
    }
}

async fn run_watch(config: &Config, recipient: &str) -> anyhow::Result<()> {
    let scanner = build_scanner(config)?;
    let service = ScanService::new(
        scanner,
        Arc::new(ConsoleTransport::new()),
        config.scan.footer.as_str(),
    );

    eprintln!(
        "{}",
        style("Watching stdin for links (Ctrl-D to finish)...").dim()
    );

    let mut pending = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        pending.extend(service.handle_message(recipient, &line));
    }

    for handle in pending {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Scan task panicked");
        }
    }
    Ok(())
}

fn show_tools(config: &Config) {
    println!("{}", style("Available Tools:").bold());
    println!();

    let registry = create_standard_tool_registry(&config.tools);
    for def in registry.list() {
        println!(
            "  {} ({})",
            style(&def.name).green(),
            def.argument_names().join(", ")
        );
        println!("    {}", style(&def.description).dim());
    }

    if config.tools.safe_browsing_key().is_none() {
        println!();
        println!(
            "  {} check_google_safe_browsing needs {} or tools.safe_browsing_api_key",
            style("Note:").yellow(),
            config.tools.safe_browsing_api_key_env
        );
    }
}

fn show_config(manager: &ConfigManager, config: &Config) {
    println!("{}", style("Configuration:").bold());
    println!();
    println!("  Config file: {}", style(manager.config_path().display()).green());
    if !manager.config_path().exists() {
        println!("    {}", style("(not found, using defaults)").dim());
    }

    println!();
    println!("  {}", style("[provider]").bold());
    println!("  Provider: {}", style(&config.provider.provider_type).green());
    println!("  Model: {}", style(config.provider.model_name()).green());
    println!("  API key: {}", mask_secret(config.provider.get_api_key().as_deref()));
    println!("  Temperature: {}", config.provider.temperature);
    println!("  Max tokens: {}", config.provider.max_tokens);

    println!();
    println!("  {}", style("[scan]").bold());
    println!("  Max iterations: {}", config.scan.max_iterations);
    println!("  Max history turns: {}", config.scan.max_history_turns);
    println!("  Long URL threshold: {} chars", config.scan.long_url_threshold);
    println!("  Explanation language: {}", config.scan.explanation_language);

    println!();
    println!("  {}", style("[tools]").bold());
    println!(
        "  Safe Browsing key: {}",
        mask_secret(config.tools.safe_browsing_key().as_deref())
    );
    println!("  HTTP timeout: {}s", config.tools.http_timeout_secs);
    println!("  WHOIS server: {}", config.tools.whois_server);
    println!("  Max page chars: {}", config.tools.max_page_chars);

    if std::env::var(linkscan_core::provider::logging::LOG_FILE_ENV).is_ok() {
        println!();
        println!(
            "  {} backend exchanges are journaled to ${}",
            style("Note:").yellow(),
            linkscan_core::provider::logging::LOG_FILE_ENV
        );
    }
}

/// Show only whether a secret is set and its last four characters
fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        Some(s) if s.chars().count() > 8 => {
            let tail: String = s.chars().skip(s.chars().count() - 4).collect();
            style(format!("set (****{})", tail)).green().to_string()
        }
        Some(_) => style("set (****)").green().to_string(),
        None => style("not set").red().to_string(),
    }
}
