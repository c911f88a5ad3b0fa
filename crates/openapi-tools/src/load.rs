//! Loading `OpenAPI` documents and writing `mappings.json`.

use crate::convert::{Conversion, convert};
use crate::document::Document;
use crate::error::{OpenApiToolsError, Result};
use mcpifier_rest_tools::{MappingsFile, MappingsRest, MappingsSection};
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use url::Url;

pub const DEFAULT_MAPPINGS_FILE: &str = "mappings.json";

/// Load an `OpenAPI` document from an http(s) URL or a file path. JSON and YAML are accepted.
///
/// # Errors
///
/// Returns an error if the document cannot be fetched/read, does not parse, or is neither
/// `OpenAPI` 3.x nor Swagger 2.0.
pub async fn load_spec(source: &str, client: &Client) -> Result<Document> {
    let content = if is_http_url(source) {
        tracing::info!("Fetching OpenAPI spec from {}", source);
        let resp = client
            .get(source)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| OpenApiToolsError::SpecFetch {
                url: source.to_string(),
                message: e.to_string(),
            })?;
        resp.text().await.map_err(|e| OpenApiToolsError::SpecFetch {
            url: source.to_string(),
            message: e.to_string(),
        })?
    } else {
        tracing::info!("Loading OpenAPI spec from {}", source);
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| OpenApiToolsError::SpecReadFile {
                path: source.to_string(),
                source: e,
            })?
    };

    parse_spec(&content, source)
}

/// Parse an `OpenAPI` document (JSON is a subset of YAML, so one parser covers both).
///
/// # Errors
///
/// Returns an error if `content` is not JSON/YAML or does not declare a supported version.
/// Individual operations are not validated here; see [`convert`].
pub fn parse_spec(content: &str, location: &str) -> Result<Document> {
    let root: Value = serde_yaml::from_str(content).map_err(|e| OpenApiToolsError::SpecParse {
        location: location.to_string(),
        source: e,
    })?;
    Document::from_value(root)
}

/// Wrap a conversion in the `mappings.json` document shape.
#[must_use]
pub fn to_mappings_file(conversion: Conversion) -> MappingsFile {
    MappingsFile {
        mcpifier: MappingsSection {
            rest: conversion.base_address.map(|base_address| MappingsRest {
                base_address: Some(base_address),
            }),
            tools: conversion.tools,
        },
    }
}

/// Load `source`, convert it, and write the resulting mappings to `output`.
///
/// Returns the number of tools written.
///
/// # Errors
///
/// Returns an error if loading, conversion or writing fails.
pub async fn convert_to_file(source: &str, output: &Path, client: &Client) -> Result<usize> {
    let spec = load_spec(source, client).await?;
    let conversion = convert(&spec);
    let count = conversion.tools.len();
    tracing::info!(
        "Created {} tool mappings from OpenAPI spec '{}'",
        count,
        source
    );

    let json = serde_json::to_string_pretty(&to_mappings_file(conversion))?;
    tokio::fs::write(output, json).await?;
    tracing::info!("Saved tool mappings to '{}'", output.display());
    Ok(count)
}

fn is_http_url(source: &str) -> bool {
    Url::parse(source).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::net::TcpListener;

    const SPEC_JSON: &str = r#"{
        "openapi": "3.0.0",
        "info": { "title": "t", "version": "1" },
        "servers": [ { "url": "https://api.example.com/" } ],
        "paths": {
            "/things": {
                "post": {
                    "operationId": "createThing",
                    "requestBody": {
                        "content": { "application/json": { "schema": { "type": "object" } } }
                    },
                    "responses": { "200": { "description": "ok" } }
                }
            }
        }
    }"#;

    #[test]
    fn parse_errors_name_the_location() {
        let err = parse_spec("not: [valid", "broken.yaml").unwrap_err();
        assert!(err.to_string().contains("broken.yaml"), "{err}");
    }

    #[test]
    fn swagger_1_documents_are_rejected_by_version() {
        let err = parse_spec(r#"{"swaggerVersion": "1.2", "apis": []}"#, "old.json").unwrap_err();
        assert!(err.to_string().contains("version field"), "{err}");
    }

    #[tokio::test]
    async fn converts_file_into_mappings_json() {
        let dir = tempdir().expect("tempdir");
        let spec_path = dir.path().join("spec.json");
        let out_path = dir.path().join(DEFAULT_MAPPINGS_FILE);
        std::fs::write(&spec_path, SPEC_JSON).expect("write spec");

        let count = convert_to_file(
            spec_path.to_str().expect("utf-8 path"),
            &out_path,
            &Client::new(),
        )
        .await
        .expect("convert");
        assert_eq!(count, 1);

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&out_path).expect("read")).expect("json");
        assert_eq!(
            written["mcpifier"]["rest"],
            json!({ "baseAddress": "https://api.example.com/" })
        );
        let tool = &written["mcpifier"]["tools"][0];
        assert_eq!(tool["mcp"]["name"], "create_thing");
        assert_eq!(
            tool["rest"],
            json!({ "method": "POST", "path": "/things", "body": "{requestBody}" })
        );
        assert!(tool["mcp"].get("title").is_none());
        assert!(tool["mcp"].get("outputSchema").is_none());
    }

    #[tokio::test]
    async fn loads_spec_over_http() {
        let app = Router::new().route("/openapi.json", get(|| async { SPEC_JSON }));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let server_handle = tokio::spawn(async move { server.await });

        let spec = load_spec(&format!("http://{addr}/openapi.json"), &Client::new())
            .await
            .expect("load");
        assert_eq!(spec.title(), Some("t"));

        let missing = load_spec(&format!("http://{addr}/nope.json"), &Client::new()).await;
        assert!(matches!(missing, Err(OpenApiToolsError::SpecFetch { .. })));

        let _ = shutdown_tx.send(());
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load_spec("/definitely/not/here.yaml", &Client::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OpenApiToolsError::SpecReadFile { .. }), "{err}");
    }
}
