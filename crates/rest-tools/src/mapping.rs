//! Tool mapping model and the `mappings.json` wire format.

use crate::error::{RestToolsError, Result};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The MCP-facing half of a tool mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Schema>,
}

/// The REST call template behind a tool.
///
/// `path`, `query` and `body` may contain `{argument}` placeholders; see [`crate::template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestConfiguration {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMapping {
    pub mcp: McpToolDefinition,
    pub rest: RestConfiguration,
}

impl ToolMapping {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.mcp.name
    }
}

/// Merge two tool lists by name.
///
/// Every name from either list appears once. On conflict the `overrides` entry wins. The result
/// lists the override entries first, followed by the base entries whose names the overrides do
/// not define. Within one list the first occurrence of a name wins.
#[must_use]
pub fn merge_tools(base: Vec<ToolMapping>, overrides: Vec<ToolMapping>) -> Vec<ToolMapping> {
    let mut seen: HashSet<String> = HashSet::new();
    overrides
        .into_iter()
        .chain(base)
        .filter(|t| seen.insert(t.mcp.name.clone()))
        .collect()
}

/// Immutable, name-keyed set of tool mappings.
///
/// Built once at startup; iteration order is the order the mappings were supplied in.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolMapping>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry from an already merged list.
    ///
    /// # Errors
    ///
    /// Returns an error if a tool has an empty name or a name occurs twice.
    pub fn new(tools: Vec<ToolMapping>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            if tool.mcp.name.trim().is_empty() {
                return Err(RestToolsError::Config(format!(
                    "Tool #{i} ({} {}) has an empty name",
                    tool.rest.method, tool.rest.path
                )));
            }
            if by_name.insert(tool.mcp.name.clone(), i).is_some() {
                return Err(RestToolsError::Config(format!(
                    "Duplicate tool name '{}'",
                    tool.mcp.name
                )));
            }
        }
        Ok(Self { tools, by_name })
    }

    /// Case-sensitive lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolMapping> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolMapping> {
        self.tools.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Root of a `mappings.json` file: `{"mcpifier": {"rest": {...}, "tools": [...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingsFile {
    pub mcpifier: MappingsSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<MappingsRest>,
    #[serde(default)]
    pub tools: Vec<ToolMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingsRest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_address: Option<String>,
}
