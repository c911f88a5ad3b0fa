//! Version-tolerant view of an `OpenAPI` 3.0/3.1 or Swagger 2.0 document.
//!
//! The document is kept as JSON. Only the pieces the converter reads are deserialized, one
//! operation at a time, so a construct that does not fit the model costs that operation and
//! nothing else. Schemas stay raw JSON throughout; 3.1 forms such as `type: [..]` pass through.

use crate::error::{OpenApiToolsError, Result};
use openapiv3::{ReferenceOr, Server};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// HTTP methods that may carry an operation on a path item, in conversion order.
pub const OPERATION_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Keywords a Swagger 2.0 non-body parameter declares inline instead of under `schema`.
const INLINE_SCHEMA_KEYWORDS: [&str; 16] = [
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "multipleOf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger2,
    OpenApi3,
}

#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    version: SpecVersion,
}

impl Document {
    /// Wrap a parsed document after checking its version field.
    ///
    /// # Errors
    ///
    /// Returns an error unless the root is an object declaring `swagger: "2.0"` or
    /// `openapi: "3.x"`.
    pub fn from_value(root: Value) -> Result<Self> {
        let Some(obj) = root.as_object() else {
            return Err(OpenApiToolsError::OpenApi(
                "document root must be an object".to_string(),
            ));
        };

        let version = match (
            obj.get("openapi").and_then(Value::as_str),
            obj.get("swagger").and_then(Value::as_str),
        ) {
            (Some(v), _) if v.starts_with("3.") => SpecVersion::OpenApi3,
            (None, Some("2.0")) => SpecVersion::Swagger2,
            (Some(v), _) | (None, Some(v)) => {
                return Err(OpenApiToolsError::OpenApi(format!(
                    "unsupported document version '{v}' (expected OpenAPI 3.x or Swagger 2.0)"
                )));
            }
            (None, None) => {
                return Err(OpenApiToolsError::OpenApi(
                    "document has neither an 'openapi' nor a 'swagger' version field".to_string(),
                ));
            }
        };

        Ok(Self { root, version })
    }

    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    #[must_use]
    pub fn version(&self) -> SpecVersion {
        self.version
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.root.pointer("/info/title").and_then(Value::as_str)
    }

    /// `(path, path item)` pairs in document order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.root
            .get("paths")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|paths| paths.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// The API's base address: the first server URL (3.x) or `scheme://host basePath` (2.0).
    #[must_use]
    pub fn base_address(&self) -> Option<String> {
        match self.version {
            SpecVersion::OpenApi3 => {
                let servers: Vec<Server> =
                    serde_json::from_value(self.root.get("servers")?.clone())
                        .inspect_err(|e| tracing::warn!("Ignoring unreadable 'servers': {}", e))
                        .ok()?;
                servers.into_iter().next().map(|s| s.url)
            }
            SpecVersion::Swagger2 => {
                let host = self.root.get("host").and_then(Value::as_str)?;
                let scheme = self
                    .root
                    .get("schemes")
                    .and_then(Value::as_array)
                    .and_then(|s| s.first())
                    .and_then(Value::as_str)
                    .unwrap_or("https");
                let base_path = self
                    .root
                    .get("basePath")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                Some(format!("{scheme}://{host}{base_path}"))
            }
        }
    }
}

/// Path item fields shared by all of its operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ReferenceOr<Parameter>>,
    pub request_body: Option<ReferenceOr<RequestBody>>,
    /// Kept raw; only the success responses are ever read.
    #[serde(default)]
    pub responses: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub schema: Option<Value>,
    /// Remaining keys; Swagger 2.0 puts `type`, `format`, `items`, ... here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Parameter {
    /// Swagger 2.0 `in: body` parameters carry the request body.
    #[must_use]
    pub fn is_body(&self) -> bool {
        self.location == "body"
    }

    #[must_use]
    pub fn is_query(&self) -> bool {
        self.location == "query"
    }

    /// The parameter's schema: `schema` when present, otherwise one assembled from inline
    /// Swagger 2.0 keywords. `None` for `content`-only parameters.
    #[must_use]
    pub fn schema(&self) -> Option<Value> {
        if let Some(schema) = &self.schema {
            return Some(schema.clone());
        }
        let inline: Map<String, Value> = INLINE_SCHEMA_KEYWORDS
            .iter()
            .filter_map(|k| self.extra.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect();
        inline.contains_key("type").then_some(Value::Object(inline))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub content: HashMap<String, MediaType>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub content: HashMap<String, MediaType>,
    /// Swagger 2.0 response body schema.
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    pub schema: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_supported_versions() {
        let v30 = Document::from_value(json!({"openapi": "3.0.3"})).expect("3.0");
        assert_eq!(v30.version(), SpecVersion::OpenApi3);
        let v31 = Document::from_value(json!({"openapi": "3.1.0"})).expect("3.1");
        assert_eq!(v31.version(), SpecVersion::OpenApi3);
        let v2 = Document::from_value(json!({"swagger": "2.0"})).expect("2.0");
        assert_eq!(v2.version(), SpecVersion::Swagger2);
    }

    #[test]
    fn rejects_unknown_versions_clearly() {
        let err = Document::from_value(json!({"swagger": "1.2"})).unwrap_err();
        assert!(err.to_string().contains("'1.2'"), "{err}");
        let err = Document::from_value(json!({"info": {}})).unwrap_err();
        assert!(err.to_string().contains("version field"), "{err}");
        assert!(Document::from_value(json!([1])).is_err());
    }

    #[test]
    fn swagger_base_address_from_host_and_base_path() {
        let doc = Document::from_value(json!({
            "swagger": "2.0",
            "host": "api.example.com",
            "basePath": "/v2",
            "schemes": ["http", "https"]
        }))
        .expect("doc");
        assert_eq!(doc.base_address().as_deref(), Some("http://api.example.com/v2"));

        let no_host = Document::from_value(json!({"swagger": "2.0", "basePath": "/v2"}))
            .expect("doc");
        assert_eq!(no_host.base_address(), None);
    }

    #[test]
    fn inline_parameter_keywords_form_a_schema() {
        let param: Parameter = serde_json::from_value(json!({
            "name": "limit",
            "in": "query",
            "type": "integer",
            "format": "int32",
            "maximum": 100,
            "collectionFormat": "csv"
        }))
        .expect("parameter");
        assert_eq!(
            param.schema(),
            Some(json!({"type": "integer", "format": "int32", "maximum": 100}))
        );
    }
}
