//! `OpenAPI` document -> tool mappings.

use crate::document::{
    Document, MediaType, OPERATION_METHODS, Operation, Parameter, PathItem, Response, SpecVersion,
};
use crate::error::{OpenApiToolsError, Result};
use crate::naming::{generate_tool_name, reserve_unique_name};
use crate::resolver::{RefResolver, SchemaResolver};
use mcpifier_rest_tools::{McpToolDefinition, RestConfiguration, Schema, ToolMapping};
use openapiv3::ReferenceOr;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

const JSON_MEDIA_TYPE: &str = "application/json";
const REQUEST_BODY_PROPERTY: &str = "requestBody";
const SUCCESS_CODES: [&str; 2] = ["200", "201"];

/// Result of converting one document.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub tools: Vec<ToolMapping>,
    /// URL of the document's first server (or Swagger host + base path), if any.
    pub base_address: Option<String>,
}

/// Convert every operation of `doc` into a tool mapping.
///
/// Paths and operations are read one at a time; one that fails to deserialize or convert
/// (unresolvable references, unexpected shapes, ...) is skipped with a warning. Generated names
/// that collide get a numeric suffix.
#[must_use]
pub fn convert(doc: &Document) -> Conversion {
    let root = doc.root();
    let refs = RefResolver::new(root);
    let mut schemas = SchemaResolver::new(root);
    let mut taken: HashSet<String> = HashSet::new();
    let mut tools = Vec::new();

    for (path, raw_item) in doc.paths() {
        let path_item = match read_path_item(&refs, raw_item) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("Skipping path '{}': {}", path, e);
                continue;
            }
        };

        for method in OPERATION_METHODS {
            let Some(raw_operation) = path_item.get(method) else {
                continue;
            };
            let converted = serde_json::from_value::<Operation>(raw_operation.clone())
                .map_err(OpenApiToolsError::from)
                .and_then(|operation| {
                    let input = OperationInput {
                        path,
                        method,
                        path_item_params: &path_item.shared.parameters,
                        operation: &operation,
                        version: doc.version(),
                    };
                    convert_operation(&refs, &mut schemas, &input)
                });
            match converted {
                Ok(mut tool) => {
                    tool.mcp.name = reserve_unique_name(&mut taken, &tool.mcp.name);
                    tracing::debug!(
                        "Converted operation: {} {} -> {}",
                        method.to_uppercase(),
                        path,
                        tool.mcp.name
                    );
                    tools.push(tool);
                }
                Err(e) => {
                    tracing::warn!("Skipping {} {}: {}", method.to_uppercase(), path, e);
                }
            }
        }
    }

    Conversion {
        tools,
        base_address: doc.base_address(),
    }
}

/// A path item after following its `$ref`, with its shared fields deserialized.
struct ResolvedPathItem {
    raw: Value,
    shared: PathItem,
}

impl ResolvedPathItem {
    fn get(&self, method: &str) -> Option<&Value> {
        self.raw.get(method)
    }
}

fn read_path_item(refs: &RefResolver<'_>, raw: &Value) -> Result<ResolvedPathItem> {
    let raw = match raw.get("$ref").and_then(Value::as_str) {
        Some(reference) => refs.lookup(reference)?.clone(),
        None => raw.clone(),
    };
    let shared: PathItem = serde_json::from_value(raw.clone())?;
    Ok(ResolvedPathItem { raw, shared })
}

struct OperationInput<'a> {
    path: &'a str,
    method: &'a str,
    path_item_params: &'a [ReferenceOr<Parameter>],
    operation: &'a Operation,
    version: SpecVersion,
}

/// The JSON request body of one operation: its resolved schema and whether it is required.
struct Body {
    schema: Value,
    required: bool,
}

fn convert_operation(
    refs: &RefResolver<'_>,
    schemas: &mut SchemaResolver<'_>,
    input: &OperationInput<'_>,
) -> Result<ToolMapping> {
    let op = input.operation;
    let method = input.method.to_uppercase();

    let name = generate_tool_name(
        op.operation_id.as_deref(),
        op.summary.as_deref(),
        &method,
        input.path,
    );
    if name.is_empty() {
        return Err(OpenApiToolsError::OpenApi(
            "could not derive a tool name".to_string(),
        ));
    }

    let parameters = merge_parameters(refs, input.path_item_params, &op.parameters)?;
    let body = match input.version {
        SpecVersion::OpenApi3 => request_body(refs, schemas, op)?,
        SpecVersion::Swagger2 => body_parameter(schemas, &parameters)?,
    };
    let has_body = body.is_some();

    let input_schema = build_input_schema(schemas, body, &parameters)?;
    let output_schema = build_output_schema(refs, schemas, op)?;

    let query: Vec<String> = parameters
        .iter()
        .filter(|p| p.is_query())
        .map(|p| format!("{n}={{{n}}}", n = p.name))
        .collect();

    let description = op
        .summary
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| op.description.clone().filter(|d| !d.is_empty()))
        .unwrap_or_else(|| format!("{method} {}", input.path));

    Ok(ToolMapping {
        mcp: McpToolDefinition {
            name,
            title: None,
            description: Some(description),
            input_schema: Schema::new(input_schema),
            output_schema: output_schema.map(Schema::new),
        },
        rest: RestConfiguration {
            method,
            path: input.path.to_string(),
            query: (!query.is_empty()).then(|| query.join("&")),
            body: has_body.then(|| format!("{{{REQUEST_BODY_PROPERTY}}}")),
        },
    })
}

/// Path-level parameters overlaid with operation-level ones (same location + name wins).
fn merge_parameters(
    refs: &RefResolver<'_>,
    path_item_params: &[ReferenceOr<Parameter>],
    operation_params: &[ReferenceOr<Parameter>],
) -> Result<Vec<Parameter>> {
    let mut merged: Vec<Parameter> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for p in path_item_params.iter().chain(operation_params) {
        let p = refs.resolve(p)?;
        let key = (p.location.clone(), p.name.clone());
        if let Some(&i) = index.get(&key) {
            merged[i] = p;
        } else {
            index.insert(key, merged.len());
            merged.push(p);
        }
    }

    Ok(merged)
}

fn request_body(
    refs: &RefResolver<'_>,
    schemas: &mut SchemaResolver<'_>,
    op: &Operation,
) -> Result<Option<Body>> {
    let Some(body) = op.request_body.as_ref().map(|b| refs.resolve(b)).transpose()? else {
        return Ok(None);
    };
    Ok(json_media_schema(schemas, body.content.get(JSON_MEDIA_TYPE))?.map(|schema| Body {
        schema,
        required: body.required,
    }))
}

fn body_parameter(schemas: &mut SchemaResolver<'_>, parameters: &[Parameter]) -> Result<Option<Body>> {
    let Some(param) = parameters.iter().find(|p| p.is_body()) else {
        return Ok(None);
    };
    let Some(schema) = param.schema.as_ref() else {
        return Ok(None);
    };
    Ok(schemas.resolve(schema)?.map(|schema| Body {
        schema,
        required: param.required,
    }))
}

fn build_input_schema(
    schemas: &mut SchemaResolver<'_>,
    body: Option<Body>,
    parameters: &[Parameter],
) -> Result<Value> {
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    if let Some(body) = body {
        properties.insert(REQUEST_BODY_PROPERTY.to_string(), body.schema);
        if body.required {
            required.push(Value::String(REQUEST_BODY_PROPERTY.to_string()));
        }
    }

    for param in parameters.iter().filter(|p| !p.is_body()) {
        let Some(raw) = param.schema() else {
            continue;
        };
        let Some(mut schema) = schemas.resolve(&raw)? else {
            continue;
        };

        if let Some(desc) = param.description.as_deref().filter(|d| !d.is_empty())
            && let Some(obj) = schema.as_object_mut()
        {
            obj.insert("description".to_string(), Value::String(desc.to_string()));
        }

        properties.insert(param.name.clone(), schema);
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    if !properties.is_empty() {
        schema.insert("properties".to_string(), Value::Object(properties));
    }
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    Ok(Value::Object(schema))
}

fn build_output_schema(
    refs: &RefResolver<'_>,
    schemas: &mut SchemaResolver<'_>,
    op: &Operation,
) -> Result<Option<Value>> {
    for code in SUCCESS_CODES {
        let Some(raw) = op.responses.get(code) else {
            continue;
        };
        let response: ReferenceOr<Response> = serde_json::from_value(raw.clone())?;
        let response = refs.resolve(&response)?;
        let schema = match response.schema.as_ref() {
            Some(schema) => schemas.resolve(schema)?,
            None => json_media_schema(schemas, response.content.get(JSON_MEDIA_TYPE))?,
        };
        if schema.is_some() {
            return Ok(schema);
        }
    }
    Ok(None)
}

fn json_media_schema(
    schemas: &mut SchemaResolver<'_>,
    media_type: Option<&MediaType>,
) -> Result<Option<Value>> {
    let Some(schema) = media_type.and_then(|mt| mt.schema.as_ref()) else {
        return Ok(None);
    };
    schemas.resolve(schema)
}
