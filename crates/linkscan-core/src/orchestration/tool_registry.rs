//! Tool registry factory
//!
//! Centralizes registration of the investigation tools and provides a
//! builder for leaving some of them out.

use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::tools::{
    CheckSafeBrowsing, FetchPageContent, GetWhoisData, LexicalAnalysis, ResolveShortUrl,
    ToolRegistry,
};

/// Builder for creating a tool registry with customizable options
pub struct ToolRegistryBuilder {
    config: ToolsConfig,
    include_network: bool,
    include_safe_browsing: bool,
}

impl ToolRegistryBuilder {
    pub fn new(config: ToolsConfig) -> Self {
        Self {
            config,
            include_network: true,
            include_safe_browsing: true,
        }
    }

    /// Include tools that reach out to the network (short URLs, pages, WHOIS)
    pub fn with_network(mut self, include: bool) -> Self {
        self.include_network = include;
        self
    }

    /// Include the Safe Browsing lookup
    pub fn with_safe_browsing(mut self, include: bool) -> Self {
        self.include_safe_browsing = include;
        self
    }

    /// Build the registry
    pub fn build(self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        let timeout = self.config.http_timeout();

        registry.register(Arc::new(LexicalAnalysis::new()));

        if self.include_network {
            registry.register(Arc::new(ResolveShortUrl::new(
                timeout,
                self.config.user_agent.as_str(),
            )));
            registry.register(Arc::new(FetchPageContent::new(
                timeout,
                self.config.user_agent.as_str(),
                self.config.max_page_chars,
            )));
            registry.register(Arc::new(GetWhoisData::new(
                self.config.whois_server.as_str(),
                timeout,
                self.config.max_page_chars,
            )));
        }

        if self.include_safe_browsing {
            registry.register(Arc::new(CheckSafeBrowsing::new(
                self.config.safe_browsing_key(),
                timeout,
            )));
        }

        registry
    }
}

/// Create the full set of investigation tools
pub fn create_standard_tool_registry(config: &ToolsConfig) -> ToolRegistry {
    ToolRegistryBuilder::new(config.clone()).build()
}
