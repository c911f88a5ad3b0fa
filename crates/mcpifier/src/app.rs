//! Startup wiring: validate a loaded configuration and build the dispatcher from it.

use crate::config::McpifierConfig;
use crate::dispatcher::JsonRpcDispatcher;
use crate::error::{McpifierError, Result};
use crate::handlers::McpHandlers;
use crate::http::HttpOptions;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use mcpifier_rest_tools::{RestExecutor, ToolRegistry};
use std::sync::Arc;
use tracing::info;

pub struct App {
    pub dispatcher: Arc<JsonRpcDispatcher>,
    pub http: HttpOptions,
}

impl App {
    /// Validate `config` and build everything the transports need.
    ///
    /// Every tool schema is compiled here so a broken mapping fails startup instead of the
    /// first call to that tool.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate or empty tool names, uncompilable schemas, invalid header
    /// names or values, or tools without a usable REST base address.
    pub fn from_config(config: &McpifierConfig) -> Result<Self> {
        let registry = ToolRegistry::new(config.tools.clone())?;
        for tool in registry.iter() {
            tool.mcp.input_schema.validator().map_err(|e| {
                McpifierError::Config(format!(
                    "Tool '{}' has an invalid input schema: {e}",
                    tool.name()
                ))
            })?;
            if let Some(output) = &tool.mcp.output_schema {
                output.validator().map_err(|e| {
                    McpifierError::Config(format!(
                        "Tool '{}' has an invalid output schema: {e}",
                        tool.name()
                    ))
                })?;
            }
        }

        let default_headers = default_headers(config)?;
        let forwarded_headers = config
            .rest
            .forwarded_headers
            .iter()
            .map(|name| header_name(name))
            .collect::<Result<Vec<_>>>()?;

        let executor = match config.rest.base_address.as_deref() {
            Some(base) => Some(RestExecutor::new(
                base,
                default_headers,
                config.rest.timeout(),
            )?),
            None if !registry.is_empty() => {
                return Err(McpifierError::Config(
                    "Tools are configured but rest.baseAddress is missing".to_string(),
                ));
            }
            None => None,
        };

        info!(
            tools = registry.len(),
            base_address = executor.as_ref().map(|e| e.base_url().as_str()).unwrap_or("<none>"),
            "Tool registry ready"
        );

        let handlers = McpHandlers::new(config, Arc::new(registry), executor);
        Ok(Self {
            dispatcher: Arc::new(JsonRpcDispatcher::new(handlers)),
            http: HttpOptions {
                require_authorization: config.authorization.require_authorization,
                resource_metadata: config.authorization.resource_metadata.clone(),
                forwarded_headers,
            },
        })
    }
}

fn default_headers(config: &McpifierConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.rest.default_headers {
        let value = HeaderValue::from_str(value).map_err(|e| {
            McpifierError::Config(format!("Invalid value for default header '{name}': {e}"))
        })?;
        headers.insert(header_name(name)?, value);
    }
    Ok(headers)
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| McpifierError::Config(format!("Invalid header name '{name}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> McpifierConfig {
        McpifierConfig::from_yaml_str(yaml).expect("config")
    }

    #[test]
    fn builds_without_tools_or_base_address() {
        let app = App::from_config(&McpifierConfig::default()).expect("app");
        assert!(!app.http.require_authorization);
        assert!(app.http.forwarded_headers.is_empty());
    }

    #[test]
    fn forwarded_header_names_are_case_insensitive() {
        let app = App::from_config(&config(
            "mcpifier:\n  rest:\n    forwardedHeaders: [Authorization, X-Request-Id]\n",
        ))
        .expect("app");
        assert_eq!(
            app.http.forwarded_headers,
            vec![
                HeaderName::from_static("authorization"),
                HeaderName::from_static("x-request-id")
            ]
        );
    }

    #[test]
    fn tools_require_a_base_address() {
        let err = App::from_config(&config(
            "mcpifier:\n  tools:\n    - mcp: { name: t }\n      rest: { method: GET, path: /t }\n",
        ))
        .err()
        .expect("missing base address");
        assert!(err.to_string().contains("baseAddress"), "{err}");
    }

    #[test]
    fn broken_schema_fails_startup() {
        let err = App::from_config(&config(
            r#"
mcpifier:
  rest: { baseAddress: "http://localhost:1" }
  tools:
    - mcp:
        name: t
        inputSchema: { type: 12 }
      rest: { method: GET, path: /t }
"#,
        ))
        .err()
        .expect("invalid schema");
        assert!(err.to_string().contains("Tool 't'"), "{err}");
    }

    #[test]
    fn invalid_headers_fail_startup() {
        for yaml in [
            "mcpifier:\n  rest:\n    forwardedHeaders: [\"bad header\"]\n",
            "mcpifier:\n  rest:\n    defaultHeaders:\n      X-Ok: \"line\\nbreak\"\n",
        ] {
            assert!(App::from_config(&config(yaml)).is_err(), "{yaml}");
        }
    }

    #[test]
    fn duplicate_tools_fail_startup() {
        let mut cfg = config(
            "mcpifier:\n  rest: { baseAddress: \"http://localhost:1\" }\n  tools:\n    - mcp: { name: t }\n      rest: { method: GET, path: /t }\n",
        );
        cfg.tools.push(cfg.tools[0].clone());
        assert!(App::from_config(&cfg).is_err());
    }
}
