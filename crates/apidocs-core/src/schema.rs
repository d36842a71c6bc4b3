//! Normalized schema nodes.
//!
//! Raw `OpenAPI` schemas are loosely typed JSON objects. [`SchemaNode::from_value`]
//! classifies every node once, up front, so the walkers in [`crate::flatten`]
//! and [`crate::example`] match on a shape instead of probing string keys at
//! every step.
//!
//! Classification precedence:
//! 1. `$ref` → [`SchemaKind::Ref`]
//! 2. `type: array` → [`SchemaKind::Array`]
//! 3. `type: object` or a `properties` map → [`SchemaKind::Object`]
//! 4. `allOf` / `oneOf` / `anyOf` → [`SchemaKind::Composition`]
//! 5. anything else → [`SchemaKind::Scalar`]

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

/// Composition keywords, in merge order.
pub const COMPOSITION_KEYWORDS: [&str; 3] = ["allOf", "oneOf", "anyOf"];

/// A classified schema node with its display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    /// Structural shape of the node.
    pub kind: SchemaKind,
    /// `title`, `description` and `format`.
    pub meta: SchemaMeta,
}

/// Structural shape of a [`SchemaNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    /// `$ref` pointer, e.g. `#/components/schemas/User`.
    Ref(String),
    /// `type: array` with an optional `items` schema.
    Array(Option<Box<SchemaNode>>),
    /// `type: object`, or any node carrying `properties`.
    Object(ObjectSchema),
    /// Untyped node whose members come from `allOf` / `oneOf` / `anyOf`.
    Composition(ObjectSchema),
    /// Leaf type (`string`, `integer`, `number`, `boolean`, ...), if declared.
    Scalar(Option<String>),
}

/// Property-bearing part of an object or composition node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSchema {
    /// Direct `properties`, ordered by name.
    pub properties: BTreeMap<String, SchemaNode>,
    /// Names listed in this level's `required` array.
    pub required: BTreeSet<String>,
    /// `allOf` members in declaration order.
    pub all_of: Vec<SchemaNode>,
    /// `oneOf` members in declaration order.
    pub one_of: Vec<SchemaNode>,
    /// `anyOf` members in declaration order.
    pub any_of: Vec<SchemaNode>,
}

/// Display metadata shared by every schema shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMeta {
    /// `title`, if present.
    pub title: Option<String>,
    /// `description`, if present.
    pub description: Option<String>,
    /// `format`, if present.
    pub format: Option<String>,
}

impl SchemaNode {
    /// Classify a raw JSON schema.
    ///
    /// Non-object values normalize to an untyped scalar; this never fails.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self {
                kind: SchemaKind::Scalar(None),
                meta: SchemaMeta::default(),
            };
        };

        Self {
            kind: classify(map),
            meta: SchemaMeta::from_map(map),
        }
    }

    /// The `$ref` target, when this node is a reference.
    #[must_use]
    pub fn ref_target(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Ref(target) => Some(target),
            _ => None,
        }
    }

    /// Property-bearing part of object and composition nodes.
    #[must_use]
    pub fn object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(obj) | SchemaKind::Composition(obj) => Some(obj),
            _ => None,
        }
    }

    /// Whether the node describes an object (directly or by composition).
    #[must_use]
    pub fn is_object_like(&self) -> bool {
        self.object().is_some()
    }
}

impl ObjectSchema {
    /// All composition members: `allOf`, then `oneOf`, then `anyOf`.
    pub fn members(&self) -> impl Iterator<Item = &SchemaNode> {
        self.all_of
            .iter()
            .chain(self.one_of.iter())
            .chain(self.any_of.iter())
    }

    /// Whether any composition keyword carried members.
    #[must_use]
    pub fn has_members(&self) -> bool {
        !(self.all_of.is_empty() && self.one_of.is_empty() && self.any_of.is_empty())
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let properties = map
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| (name.clone(), SchemaNode::from_value(schema)))
                    .collect()
            })
            .unwrap_or_default();

        let required = map
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            properties,
            required,
            all_of: members(map, "allOf"),
            one_of: members(map, "oneOf"),
            any_of: members(map, "anyOf"),
        }
    }
}

impl SchemaMeta {
    fn from_map(map: &Map<String, Value>) -> Self {
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            title: text("title"),
            description: text("description"),
            format: text("format"),
        }
    }

    /// `title description` when both are set, otherwise whichever is set.
    ///
    /// Both parts are trimmed; returns an empty string when neither is set.
    #[must_use]
    pub fn display_description(&self) -> String {
        let title = self.title.as_deref().map_or("", str::trim);
        let description = self.description.as_deref().map_or("", str::trim);
        match (title.is_empty(), description.is_empty()) {
            (false, false) => format!("{title} {description}"),
            (false, true) => title.to_string(),
            _ => description.to_string(),
        }
    }
}

fn classify(map: &Map<String, Value>) -> SchemaKind {
    if let Some(target) = map.get("$ref").and_then(Value::as_str) {
        if !target.is_empty() {
            return SchemaKind::Ref(target.to_string());
        }
    }

    let ty = declared_type(map);
    if ty == Some("array") {
        let items = map
            .get("items")
            .filter(|items| items.is_object())
            .map(|items| Box::new(SchemaNode::from_value(items)));
        return SchemaKind::Array(items);
    }

    let has_properties = map.get("properties").is_some_and(Value::is_object);
    if ty == Some("object") || has_properties {
        return SchemaKind::Object(ObjectSchema::from_map(map));
    }

    let has_composition = COMPOSITION_KEYWORDS
        .iter()
        .any(|kw| map.get(*kw).and_then(Value::as_array).is_some_and(|m| !m.is_empty()));
    if has_composition {
        return SchemaKind::Composition(ObjectSchema::from_map(map));
    }

    SchemaKind::Scalar(ty.map(str::to_string))
}

/// Read `type`, accepting the 3.1 array form (`[string, "null"]`).
fn declared_type(map: &Map<String, Value>) -> Option<&str> {
    match map.get("type")? {
        Value::String(ty) if !ty.is_empty() => Some(ty),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null"),
        _ => None,
    }
}

fn members(map: &Map<String, Value>, keyword: &str) -> Vec<SchemaNode> {
    map.get(keyword)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(SchemaNode::from_value).collect())
        .unwrap_or_default()
}
