//! Selecting what to document for one operation.
//!
//! Picks the request/response body schema handed to the projection engine
//! and gathers the parameter tables.

use apidocs_core::{component_name, strip_component_decorations, Document, SchemaNode};
use serde::Serialize;
use serde_json::{Map, Value};

/// HTTP methods recognized as operations in a path item.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "post", "put", "delete", "patch", "options", "head", "trace",
];

/// Content type shown when a request declares no body.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Preferred media types, most preferred first.
const PREFERRED_MEDIA_TYPES: [&str; 3] = [
    "application/json",
    "application/problem+json",
    "application/ld+json",
];

/// The schema selected for a request or response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodySchema {
    /// Media type the schema was taken from.
    pub content_type: String,
    /// The schema; a `$ref` stays a [`SchemaKind::Ref`](apidocs_core::SchemaKind::Ref).
    pub node: SchemaNode,
}

/// One row of a header, path or query parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamRow {
    /// Parameter name.
    pub name: String,
    /// `required: true` on the parameter.
    pub required: bool,
    /// Display type label.
    #[serde(rename = "type")]
    pub ty: String,
    /// Parameter description.
    pub description: String,
}

/// Parameters of one operation, split by location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parameters {
    /// `in: header`
    pub headers: Vec<ParamRow>,
    /// `in: path`
    pub path: Vec<ParamRow>,
    /// `in: query`
    pub query: Vec<ParamRow>,
}

impl Parameters {
    /// Whether no parameter of any location was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.path.is_empty() && self.query.is_empty()
    }
}

/// Operation keys of a path item, lowercased, sorted and deduplicated.
#[must_use]
pub fn present_methods(path_item: &Value) -> Vec<String> {
    let Some(item) = path_item.as_object() else {
        return Vec::new();
    };
    let mut methods: Vec<String> = item
        .keys()
        .map(|key| key.to_ascii_lowercase())
        .filter(|key| HTTP_METHODS.contains(&key.as_str()))
        .collect();
    methods.sort_unstable();
    methods.dedup();
    methods
}

/// The operation object for `method`, matching the key case-insensitively.
#[must_use]
pub fn operation<'a>(path_item: &'a Value, method: &str) -> Option<&'a Value> {
    path_item
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(method))
        .map(|(_, op)| op)
        .filter(|op| op.is_object())
}

/// Request body schema of `op`.
///
/// A `requestBody` given as `$ref` is looked up in `components.requestBodies`.
#[must_use]
pub fn request_schema(doc: &Document, op: &Value) -> Option<BodySchema> {
    let body = deref_component(doc, op.get("requestBody")?, "requestBodies")?;
    select_content(body.get("content")?.as_object()?)
}

/// Response body schema of `op`.
///
/// Uses the `200` response, or the lexicographically first status code when
/// there is none. A response given as `$ref` is looked up in
/// `components.responses`.
#[must_use]
pub fn response_schema(doc: &Document, op: &Value) -> Option<BodySchema> {
    let responses = op.get("responses")?.as_object()?;
    let response = responses
        .get("200")
        .or_else(|| responses.values().next())?;
    let response = deref_component(doc, response, "responses")?;
    select_content(response.get("content")?.as_object()?)
}

/// Pick a media type: the preferred JSON types first, then any other `json`
/// type, then the lexicographically first. Entries without `schema` are
/// skipped.
fn select_content(content: &Map<String, Value>) -> Option<BodySchema> {
    let with_schema = |media: &str| {
        content
            .get(media)
            .and_then(|entry| entry.get("schema"))
            .map(|schema| BodySchema {
                content_type: media.to_string(),
                node: SchemaNode::from_value(schema),
            })
    };

    PREFERRED_MEDIA_TYPES
        .iter()
        .find_map(|media| with_schema(media))
        .or_else(|| {
            content
                .keys()
                .filter(|media| media.contains("json"))
                .find_map(|media| with_schema(media))
        })
        .or_else(|| content.keys().find_map(|media| with_schema(media)))
}

/// Follow a `#/components/<section>/<name>` reference, or return `value`.
fn deref_component<'a>(doc: &'a Document, value: &'a Value, section: &str) -> Option<&'a Value> {
    let Some(reference) = value.get("$ref").and_then(Value::as_str) else {
        return Some(value);
    };
    let prefix = format!("#/components/{section}/");
    if !reference.starts_with(&prefix) {
        tracing::debug!(reference, "unsupported reference");
        return None;
    }
    doc.root()
        .get("components")?
        .get(section)?
        .get(component_name(reference))
}

/// Path-level then operation-level parameters, split by `in`.
///
/// `$ref` parameters are resolved against `components.parameters`; unresolved
/// ones and other locations (`cookie`) are skipped.
#[must_use]
pub fn collect_parameters(doc: &Document, path_item: &Value, op: &Value) -> Parameters {
    let declared = [path_item, op]
        .into_iter()
        .filter_map(|level| level.get("parameters").and_then(Value::as_array))
        .flatten();

    let mut params = Parameters::default();
    for param in declared {
        let param = match param.get("$ref").and_then(Value::as_str) {
            Some(reference) => match doc.resolve_raw(reference) {
                Some(resolved) => resolved,
                None => {
                    tracing::debug!(reference, "unresolved parameter reference");
                    continue;
                }
            },
            None => param,
        };

        let text = |key: &str| {
            param
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let row = ParamRow {
            name: text("name"),
            required: param.get("required").and_then(Value::as_bool).unwrap_or(false),
            ty: strip_component_decorations(&param_type_label(param.get("schema"))),
            description: text("description"),
        };
        match param.get("in").and_then(Value::as_str) {
            Some("header") => params.headers.push(row),
            Some("path") => params.path.push(row),
            Some("query") => params.query.push(row),
            _ => {}
        }
    }
    params
}

/// Type label of a parameter schema.
///
/// `object(Name)` for a `$ref`; for arrays `array(object(Name))`,
/// `array(<format>)`, `array(<type>)` or `array`; otherwise the declared type.
#[must_use]
pub fn param_type_label(schema: Option<&Value>) -> String {
    let Some(schema) = schema else {
        return String::new();
    };
    let str_of = |value: &Value, key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(reference) = str_of(schema, "$ref") {
        return format!("object({})", component_name(&reference));
    }
    let ty = str_of(schema, "type").unwrap_or_default();
    if ty != "array" {
        return ty;
    }
    let Some(items) = schema.get("items") else {
        return "array".to_string();
    };
    if let Some(reference) = str_of(items, "$ref") {
        return format!("array(object({}))", component_name(&reference));
    }
    str_of(items, "format")
        .or_else(|| str_of(items, "type"))
        .map_or_else(|| "array".to_string(), |inner| format!("array({inner})"))
}
