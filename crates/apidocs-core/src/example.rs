//! Representative example values for schemas.
//!
//! Placeholders: `"string"` for strings, `0` for integers and numbers,
//! `false` for booleans, `null` for anything else. Arrays hold exactly one
//! representative element when their items describe an object.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::{Document, Entry, RefStack};
use crate::flatten::ref_node;
use crate::merge::merge_on;
use crate::schema::{SchemaKind, SchemaNode};

/// Build an example value for an inline schema.
///
/// An unresolvable `$ref` yields `null`; re-entering a component that is
/// already being expanded yields an empty object.
#[must_use]
pub fn build_example(doc: &Document, node: &SchemaNode) -> Value {
    ExampleBuilder {
        stack: RefStack::new(doc),
    }
    .node(node)
}

/// Build an example value for a component, by `$ref` string or bare name.
#[must_use]
pub fn build_example_ref(doc: &Document, reference: &str) -> Value {
    build_example(doc, &ref_node(reference))
}

/// Render an example as JSON text indented with four spaces.
#[must_use]
pub fn example_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    if value.serialize(&mut ser).is_err() {
        // `Value` serialization into memory cannot fail; keep the output total.
        return value.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
}

struct ExampleBuilder<'a> {
    stack: RefStack<'a>,
}

impl<'a> ExampleBuilder<'a> {
    fn node(&mut self, node: &'a SchemaNode) -> Value {
        match &node.kind {
            SchemaKind::Ref(target) => match self.stack.enter(target) {
                Entry::Resolved(resolved) => {
                    let value = self.node(resolved);
                    self.stack.leave();
                    value
                }
                Entry::Cycle => Value::Object(Map::new()),
                Entry::Missing => Value::Null,
            },
            SchemaKind::Array(items) => self.array(items.as_deref()),
            SchemaKind::Object(_) | SchemaKind::Composition(_) => self.object(node),
            SchemaKind::Scalar(ty) => placeholder(ty.as_deref()),
        }
    }

    fn object(&mut self, node: &'a SchemaNode) -> Value {
        let mark = self.stack.depth();
        let merged = merge_on(&mut self.stack, node);
        let map = merged
            .properties
            .into_iter()
            .map(|(name, prop)| (name.to_string(), self.node(prop)))
            .collect();
        self.stack.unwind(mark);
        Value::Object(map)
    }

    fn array(&mut self, items: Option<&'a SchemaNode>) -> Value {
        let Some(item) = items else {
            return Value::Array(Vec::new());
        };
        let element = match &item.kind {
            SchemaKind::Object(_) | SchemaKind::Composition(_) => Some(self.object(item)),
            SchemaKind::Ref(target) => match self.stack.enter(target) {
                Entry::Resolved(resolved) => {
                    let value = self.node(resolved);
                    self.stack.leave();
                    Some(value)
                }
                Entry::Cycle => Some(Value::Object(Map::new())),
                Entry::Missing => None,
            },
            SchemaKind::Array(_) | SchemaKind::Scalar(_) => None,
        };
        Value::Array(element.into_iter().collect())
    }
}

fn placeholder(ty: Option<&str>) -> Value {
    match ty {
        Some("string") => Value::String("string".to_string()),
        Some("integer" | "number") => Value::from(0),
        Some("boolean") => Value::Bool(false),
        _ => Value::Null,
    }
}
