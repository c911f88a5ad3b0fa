//! Server configuration: one YAML/JSON config file plus any number of mappings files.

use crate::error::{McpifierError, Result};
use mcpifier_rest_tools::{MappingsFile, ToolMapping, merge_tools};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 100;

/// Root of the config file: everything lives under `mcpifier:`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub mcpifier: McpifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpifierConfig {
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: ServerInfo,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub rest: RestSection,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub tools: Vec<ToolMapping>,
}

impl Default for McpifierConfig {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            server_info: ServerInfo::default(),
            instructions: None,
            rest: RestSection::default(),
            authorization: AuthorizationConfig::default(),
            tools: Vec::new(),
        }
    }
}

fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "mcpifier".to_string(),
            version: "1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestSection {
    #[serde(default)]
    pub base_address: Option<String>,
    /// `0` disables the timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Inbound HTTP headers copied onto every outbound REST request (HTTP transport only).
    #[serde(default)]
    pub forwarded_headers: Vec<String>,
}

impl Default for RestSection {
    fn default() -> Self {
        Self {
            base_address: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            default_headers: BTreeMap::new(),
            forwarded_headers: Vec::new(),
        }
    }
}

impl RestSection {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationConfig {
    /// Reject unauthenticated HTTP requests with a `401` bearer challenge.
    #[serde(default)]
    pub require_authorization: bool,
    /// Document served at `/.well-known/oauth-protected-resource`.
    #[serde(default)]
    pub resource_metadata: Option<Value>,
}

impl McpifierConfig {
    /// Parse a config document (YAML; JSON is a valid subset).
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the config shape.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: ConfigFile = serde_yaml::from_str(content)?;
        Ok(file.mcpifier)
    }

    /// Fold a mappings file into this config.
    ///
    /// Mapped tools replace same-named tools already present and are listed first; the mappings'
    /// base address is used only when none is configured.
    pub fn merge_mappings(&mut self, mappings: MappingsFile) {
        let section = mappings.mcpifier;
        if self.rest.base_address.is_none() {
            self.rest.base_address = section.rest.and_then(|r| r.base_address);
        }
        let current = std::mem::take(&mut self.tools);
        self.tools = merge_tools(current, section.tools);
    }
}

/// Load the config file (if any) and merge every mappings file into it, in order.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed.
pub fn load(config_path: Option<&Path>, mappings: &[PathBuf]) -> Result<McpifierConfig> {
    let mut config = match config_path {
        Some(path) => {
            let content = read(path)?;
            McpifierConfig::from_yaml_str(&content).map_err(|e| {
                McpifierError::Config(format!("Failed to parse {}: {e}", path.display()))
            })?
        }
        None => McpifierConfig::default(),
    };

    for path in mappings {
        let content = read(path)?;
        let file: MappingsFile = serde_yaml::from_str(&content).map_err(|e| {
            McpifierError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        debug!(
            "Loaded {} tool mapping(s) from {}",
            file.mcpifier.tools.len(),
            path.display()
        );
        config.merge_mappings(file);
    }

    info!(
        tools = config.tools.len(),
        base_address = config.rest.base_address.as_deref().unwrap_or("<none>"),
        "Configuration loaded"
    );
    Ok(config)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| McpifierError::Config(format!("Failed to read {}: {e}", path.display())))
}
