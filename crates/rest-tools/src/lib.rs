//! Tool mappings and the REST execution engine behind them.
//!
//! A [`ToolMapping`](mapping::ToolMapping) pairs the MCP-facing tool definition with the REST call
//! template that implements it. This crate owns:
//! - the mapping model and its wire format (`mappings.json`)
//! - lazily compiled JSON Schemas used to validate tool arguments
//! - path/query/body template interpolation
//! - the executor that turns a tool call into one outbound HTTP request
//!
//! It has no knowledge of JSON-RPC or of any transport.

pub mod error;
pub mod mapping;
pub mod runtime;
pub mod schema;
pub mod template;

pub use error::{RestToolsError, Result};
pub use mapping::{
    MappingsFile, MappingsRest, MappingsSection, McpToolDefinition, RestConfiguration, ToolMapping,
    ToolRegistry, merge_tools,
};
pub use runtime::{RestExecutor, RestOutcome, normalize_base_address};
pub use schema::Schema;
