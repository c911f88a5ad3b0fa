//! `OpenAPI` `$ref` resolution.
//!
//! References are modelled as `openapiv3::ReferenceOr<T>`, which never follows them. Two resolvers
//! live here, both working on the JSON form of the root document:
//!
//! - [`RefResolver`] follows a chain of references to a parameter, request body, response or
//!   path item and deserializes the target.
//! - [`SchemaResolver`] inlines schema references recursively, producing self-contained JSON
//!   Schemas. Schema graphs may be cyclic (`Node.children: [Node]`); an edge that leads back to a
//!   schema already on the current recursion path is pruned.
//!
//! Only local references (`#/...`) are supported.

use crate::error::{OpenApiToolsError, Result};
use openapiv3::ReferenceOr;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Follows local `$ref`s within one document.
#[derive(Debug, Clone, Copy)]
pub struct RefResolver<'a> {
    root: &'a Value,
}

impl<'a> RefResolver<'a> {
    #[must_use]
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Resolve a `ReferenceOr<T>` to its item, following chained references.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference is external, dangling, cyclic, or does not deserialize
    /// into `T`.
    pub fn resolve<T>(&self, r: &ReferenceOr<T>) -> Result<T>
    where
        T: Clone + DeserializeOwned,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut cur = r.clone();

        loop {
            match cur {
                ReferenceOr::Item(item) => return Ok(item),
                ReferenceOr::Reference { reference } => {
                    if !seen.insert(reference.clone()) {
                        return Err(OpenApiToolsError::Reference {
                            reference,
                            message: "cyclic reference chain".to_string(),
                        });
                    }
                    let value = self.lookup(&reference)?;
                    cur = serde_json::from_value(value.clone()).map_err(|e| {
                        OpenApiToolsError::Reference {
                            reference: reference.clone(),
                            message: format!("target has unexpected shape: {e}"),
                        }
                    })?;
                }
            }
        }
    }

    /// The JSON value a local reference points at.
    ///
    /// # Errors
    ///
    /// Returns an error for external references and for pointers that select nothing.
    pub fn lookup(&self, reference: &str) -> Result<&'a Value> {
        let pointer = parse_local_ref(reference)?;
        self.root
            .pointer(pointer)
            .ok_or_else(|| OpenApiToolsError::Reference {
                reference: reference.to_string(),
                message: "no such location in the document".to_string(),
            })
    }
}

fn parse_local_ref(reference: &str) -> Result<&str> {
    match reference.strip_prefix('#') {
        Some("") => Ok(""),
        Some(ptr) if ptr.starts_with('/') => Ok(ptr),
        Some(_) => Err(OpenApiToolsError::Reference {
            reference: reference.to_string(),
            message: "expected a JSON pointer fragment starting with '/'".to_string(),
        }),
        None => Err(OpenApiToolsError::Reference {
            reference: reference.to_string(),
            message: "external references are not supported".to_string(),
        }),
    }
}

/// Recursive, cycle-safe schema inliner.
///
/// Referenced schemas are identified by their `$ref` target. `resolved` memoizes every fully
/// processed referenced schema for the lifetime of the resolver, so one instance should be used
/// for a whole document conversion. `ancestors` holds the referenced schemas on the current
/// recursion path only.
#[derive(Debug)]
pub struct SchemaResolver<'a> {
    refs: RefResolver<'a>,
    resolved: HashMap<String, Value>,
}

impl<'a> SchemaResolver<'a> {
    #[must_use]
    pub fn new(root: &'a Value) -> Self {
        Self {
            refs: RefResolver::new(root),
            resolved: HashMap::new(),
        }
    }

    /// Resolve a schema (inline or `{"$ref": ...}`) into a self-contained JSON Schema.
    ///
    /// Returns `Ok(None)` when the schema is absent after resolution (a reference chain that loops
    /// onto itself).
    ///
    /// # Errors
    ///
    /// Returns an error if any reachable reference cannot be followed.
    pub fn resolve(&mut self, schema: &Value) -> Result<Option<Value>> {
        let mut ancestors = HashSet::new();
        self.resolve_tree(schema, &mut ancestors)
    }

    /// Number of referenced schemas memoized so far.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    fn resolve_tree(
        &mut self,
        schema: &Value,
        ancestors: &mut HashSet<String>,
    ) -> Result<Option<Value>> {
        let Some((identity, target)) = self.unwrap_reference(schema)? else {
            return Ok(None);
        };

        let Some(id) = identity else {
            let mut node = target;
            self.resolve_children(&mut node, ancestors)?;
            return Ok(Some(node));
        };

        if ancestors.contains(&id) {
            return Ok(None);
        }
        if let Some(done) = self.resolved.get(&id) {
            return Ok(Some(done.clone()));
        }

        ancestors.insert(id.clone());
        let mut node = target;
        let children = self.resolve_children(&mut node, ancestors);
        ancestors.remove(&id);
        children?;

        self.resolved.insert(id, node.clone());
        Ok(Some(node))
    }

    /// Follow `$ref`s until a concrete schema is reached.
    ///
    /// Returns the identity of the last reference followed (if any) and a copy of the target.
    /// A chain that revisits one of its own links yields `None`.
    fn unwrap_reference(&self, schema: &Value) -> Result<Option<(Option<String>, Value)>> {
        let mut identity: Option<String> = None;
        let mut chain: HashSet<String> = HashSet::new();
        let mut cur = schema;

        while let Some(reference) = cur.get("$ref").and_then(Value::as_str) {
            if !chain.insert(reference.to_string()) {
                return Ok(None);
            }
            identity = Some(reference.to_string());
            cur = self.refs.lookup(reference)?;
        }

        Ok(Some((identity, cur.clone())))
    }

    fn resolve_children(&mut self, node: &mut Value, ancestors: &mut HashSet<String>) -> Result<()> {
        let Some(obj) = node.as_object_mut() else {
            return Ok(());
        };

        normalize_keywords(obj);

        for key in ["items", "not", "additionalProperties"] {
            let Some(child) = obj.get(key).filter(|c| c.is_object()).cloned() else {
                continue;
            };
            match self.resolve_tree(&child, ancestors)? {
                Some(resolved) => {
                    obj.insert(key.to_string(), resolved);
                }
                None => {
                    obj.remove(key);
                }
            }
        }

        if let Some(Value::Object(props)) = obj.get_mut("properties") {
            let names: Vec<String> = props.keys().cloned().collect();
            for name in names {
                let Some(child) = props.get(&name).cloned() else {
                    continue;
                };
                match self.resolve_tree(&child, ancestors)? {
                    Some(resolved) => {
                        props.insert(name, resolved);
                    }
                    None => {
                        props.remove(&name);
                    }
                }
            }
        }

        for key in ["allOf", "anyOf", "oneOf"] {
            let Some(Value::Array(members)) = obj.get(key).cloned() else {
                continue;
            };
            let mut kept = Vec::with_capacity(members.len());
            for member in &members {
                if let Some(resolved) = self.resolve_tree(member, ancestors)? {
                    kept.push(resolved);
                }
            }
            if kept.is_empty() {
                obj.remove(key);
            } else {
                obj.insert(key.to_string(), Value::Array(kept));
            }
        }

        Ok(())
    }
}

/// Rewrite `OpenAPI` 3.0 / Swagger 2.0 keywords that plain JSON Schema reads differently.
///
/// 3.1 schemas are already JSON Schema and come through unchanged.
///
/// - `nullable: true` widens `type` to include `"null"`
/// - boolean `exclusiveMinimum`/`exclusiveMaximum` become their numeric form
fn normalize_keywords(obj: &mut Map<String, Value>) {
    if let Some(nullable) = obj.remove("nullable")
        && nullable.as_bool() == Some(true)
        && let Some(Value::String(t)) = obj.get("type").cloned()
    {
        obj.insert(
            "type".to_string(),
            Value::Array(vec![Value::String(t), Value::String("null".to_string())]),
        );
    }

    for (flag, bound) in [
        ("exclusiveMinimum", "minimum"),
        ("exclusiveMaximum", "maximum"),
    ] {
        if let Some(Value::Bool(exclusive)) = obj.get(flag).cloned() {
            obj.remove(flag);
            if exclusive && let Some(limit) = obj.remove(bound) {
                obj.insert(flag.to_string(), limit);
            }
        }
    }
}
