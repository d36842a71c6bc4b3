//! Schema flattening into path-qualified field rows.
//!
//! Paths use `.` between object levels and `[]` for array elements, e.g.
//! `data.items[].code`. Properties are visited in name order so the same
//! schema always produces the same rows.

use serde::Serialize;

use crate::document::{component_name, Document, Entry, RefStack, SCHEMA_REF_PREFIX};
use crate::merge::merge_on;
use crate::schema::{SchemaKind, SchemaNode};

/// One documented field of a request or response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// Dotted/bracketed path, e.g. `data.items[].code`.
    pub path: String,
    /// Listed in the enclosing level's `required` array.
    pub required: bool,
    /// Type label: `string`, `object`, `array(object)`, `array(string)`, ...
    #[serde(rename = "type")]
    pub ty: String,
    /// `title description`, or whichever of the two is present.
    pub description: String,
}

/// Flatten an inline schema into field rows under `prefix`.
///
/// Reference-backed rows are labelled `object` / `array(object)`; see
/// [`flatten_decorated`] for labels carrying the component name.
#[must_use]
pub fn flatten(doc: &Document, node: &SchemaNode, prefix: &str) -> Vec<FieldDescriptor> {
    let mut fields = flatten_decorated(doc, node, prefix);
    for field in &mut fields {
        field.ty = strip_component_decorations(&field.ty);
    }
    fields
}

/// Flatten a component by `$ref` string or bare component name.
///
/// An unresolvable reference yields no rows.
#[must_use]
pub fn flatten_ref(doc: &Document, reference: &str, prefix: &str) -> Vec<FieldDescriptor> {
    flatten(doc, &ref_node(reference), prefix)
}

/// Like [`flatten`], but rows backed by a `$ref` keep the component name in
/// their label (`object(User)`, `array(object(User))`).
///
/// Intended for diagnostics; pass labels through
/// [`strip_component_decorations`] before showing them to readers.
#[must_use]
pub fn flatten_decorated(doc: &Document, node: &SchemaNode, prefix: &str) -> Vec<FieldDescriptor> {
    let mut flattener = Flattener {
        stack: RefStack::new(doc),
        fields: Vec::new(),
    };
    flattener.walk_node(node, prefix);
    flattener.fields
}

/// Remove component names from type labels.
///
/// `array(object(User))` → `array(object)`, `object(User)` → `object`.
#[must_use]
pub fn strip_component_decorations(label: &str) -> String {
    let mut out = label.to_string();
    for (open, plain) in [("array(object(", "array(object"), ("object(", "object")] {
        while let Some(start) = out.find(open) {
            let name_start = start + open.len();
            let Some(close) = out[name_start..].find(')') else {
                break;
            };
            out.replace_range(start..=name_start + close, plain);
        }
    }
    out
}

/// Build a `$ref` node from either a full reference or a bare schema name.
pub(crate) fn ref_node(reference: &str) -> SchemaNode {
    let target = if reference.starts_with('#') {
        reference.to_string()
    } else {
        format!("{SCHEMA_REF_PREFIX}{reference}")
    };
    SchemaNode {
        kind: SchemaKind::Ref(target),
        meta: crate::schema::SchemaMeta::default(),
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

struct Flattener<'a> {
    stack: RefStack<'a>,
    fields: Vec<FieldDescriptor>,
}

impl<'a> Flattener<'a> {
    fn push(&mut self, path: String, required: bool, ty: String, description: String) {
        self.fields.push(FieldDescriptor {
            path,
            required,
            ty,
            description,
        });
    }

    /// Emit the rows below `node` (not a row for `node` itself).
    fn walk_node(&mut self, node: &'a SchemaNode, prefix: &str) {
        match &node.kind {
            SchemaKind::Ref(target) => self.follow(target, prefix),
            SchemaKind::Array(items) => {
                let path = format!("{prefix}[]");
                let description = node.meta.display_description();
                self.walk_array(path, items.as_deref(), false, description);
            }
            SchemaKind::Object(_) | SchemaKind::Composition(_) => {
                self.walk_properties(node, prefix);
            }
            SchemaKind::Scalar(_) => {}
        }
    }

    /// Expand a referenced component under `prefix`, unless it is missing or
    /// already being expanded.
    fn follow(&mut self, target: &'a str, prefix: &str) {
        if let Entry::Resolved(resolved) = self.stack.enter(target) {
            self.walk_node(resolved, prefix);
            self.stack.leave();
        }
    }

    fn walk_properties(&mut self, node: &'a SchemaNode, prefix: &str) {
        let mark = self.stack.depth();
        let merged = merge_on(&mut self.stack, node);
        for (name, prop) in merged.properties {
            let required = merged.required.contains(name);
            self.walk_property(prop, join_path(prefix, name), required);
        }
        self.stack.unwind(mark);
    }

    fn walk_property(&mut self, prop: &'a SchemaNode, path: String, required: bool) {
        let description = prop.meta.display_description();
        match &prop.kind {
            SchemaKind::Ref(target) => {
                let ty = format!("object({})", component_name(target));
                self.push(path.clone(), required, ty, description);
                self.follow(target, &path);
            }
            SchemaKind::Array(items) => {
                self.walk_array(format!("{path}[]"), items.as_deref(), required, description);
            }
            SchemaKind::Object(_) | SchemaKind::Composition(_) => {
                self.push(path.clone(), required, "object".to_string(), description);
                self.walk_properties(prop, &path);
            }
            SchemaKind::Scalar(ty) => {
                let ty = ty.clone().unwrap_or_else(|| "object".to_string());
                self.push(path, required, ty, description);
            }
        }
    }

    /// Emit the `path` row (already ending in `[]`) and the item rows below it.
    fn walk_array(
        &mut self,
        path: String,
        items: Option<&'a SchemaNode>,
        required: bool,
        description: String,
    ) {
        let Some(items) = items else {
            self.push(path, required, "array".to_string(), description);
            return;
        };

        match &items.kind {
            SchemaKind::Ref(target) => {
                let ty = format!("array(object({}))", component_name(target));
                self.push(path.clone(), required, ty, description);
                self.follow(target, &path);
            }
            SchemaKind::Object(_) | SchemaKind::Composition(_) => {
                self.push(path.clone(), required, "array(object)".to_string(), description);
                self.walk_properties(items, &path);
            }
            SchemaKind::Array(_) => {
                self.push(path.clone(), required, "array(array)".to_string(), description);
                self.walk_node(items, &path);
            }
            SchemaKind::Scalar(Some(ty)) => {
                self.push(path, required, format!("array({ty})"), description);
            }
            SchemaKind::Scalar(None) => {
                self.push(path, required, "array".to_string(), description);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;

    fn doc(schemas: Value) -> Document {
        Document::new(json!({ "components": { "schemas": schemas } }))
    }

    fn node(value: Value) -> SchemaNode {
        SchemaNode::from_value(&value)
    }

    /// `(path, type)` pairs for compact assertions.
    fn rows(fields: &[FieldDescriptor]) -> Vec<(&str, &str)> {
        fields
            .iter()
            .map(|f| (f.path.as_str(), f.ty.as_str()))
            .collect()
    }

    fn foo_doc() -> Document {
        doc(json!({
            "Foo": { "type": "object", "properties": { "a": { "type": "string" } } },
        }))
    }

    #[test]
    fn ref_root_flattens_target() {
        let doc = foo_doc();
        let fields = flatten(&doc, &node(json!({ "$ref": "#/components/schemas/Foo" })), "");
        assert_eq!(
            fields,
            vec![FieldDescriptor {
                path: "a".to_string(),
                required: false,
                ty: "string".to_string(),
                description: String::new(),
            }]
        );
    }

    #[test]
    fn flatten_ref_accepts_bare_name() {
        let doc = foo_doc();
        assert_eq!(rows(&flatten_ref(&doc, "Foo", "")), vec![("a", "string")]);
        assert_eq!(
            rows(&flatten_ref(&doc, "#/components/schemas/Foo", "body")),
            vec![("body.a", "string")]
        );
    }

    #[test]
    fn array_of_ref_expands_items() {
        let doc = foo_doc();
        let schema = node(json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Foo" },
        }));
        assert_eq!(
            rows(&flatten(&doc, &schema, "list")),
            vec![("list[]", "array(object)"), ("list[].a", "string")]
        );
    }

    #[test]
    fn unresolvable_ref_is_empty() {
        let doc = foo_doc();
        let schema = node(json!({ "$ref": "#/components/schemas/DoesNotExist" }));
        assert!(flatten(&doc, &schema, "").is_empty());
    }

    #[test]
    fn nested_shapes_and_required() {
        let doc = doc(json!({
            "Item": {
                "type": "object",
                "required": ["code"],
                "properties": {
                    "code": { "type": "string", "title": "Code", "description": "item code" },
                    "price": { "type": "number" },
                },
            },
            "Page": {
                "type": "object",
                "required": ["items"],
                "properties": {
                    "items": { "type": "array", "items": { "$ref": "#/components/schemas/Item" } },
                    "total": { "type": "integer" },
                },
            },
        }));
        let schema = node(json!({
            "type": "object",
            "required": ["code"],
            "properties": {
                "code": { "type": "integer" },
                "message": { "type": "string" },
                "data": { "$ref": "#/components/schemas/Page" },
            },
        }));

        let fields = flatten(&doc, &schema, "");
        assert_eq!(
            rows(&fields),
            vec![
                ("code", "integer"),
                ("data", "object"),
                ("data.items[]", "array(object)"),
                ("data.items[].code", "string"),
                ("data.items[].price", "number"),
                ("data.total", "integer"),
                ("message", "string"),
            ]
        );

        let required: Vec<&str> = fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(required, vec!["code", "data.items[]", "data.items[].code"]);

        let code = fields
            .iter()
            .find(|f| f.path == "data.items[].code")
            .expect("row");
        assert_eq!(code.description, "Code item code");
    }

    #[test]
    fn array_item_variants() {
        let doc = foo_doc();
        let schema = node(json!({
            "properties": {
                "bare": { "type": "array" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "untyped": { "type": "array", "items": {} },
                "grid": {
                    "type": "array",
                    "items": { "type": "array", "items": { "type": "integer" } },
                },
                "inline": {
                    "type": "array",
                    "items": {
                        "required": ["x"],
                        "properties": { "x": { "type": "integer" } },
                    },
                },
                "mixed": {
                    "type": "array",
                    "items": { "allOf": [{ "$ref": "#/components/schemas/Foo" }] },
                },
            },
        }));

        let fields = flatten(&doc, &schema, "");
        assert_eq!(
            rows(&fields),
            vec![
                ("bare[]", "array"),
                ("grid[]", "array(array)"),
                ("grid[][]", "array(integer)"),
                ("inline[]", "array(object)"),
                ("inline[].x", "integer"),
                ("mixed[]", "array(object)"),
                ("mixed[].a", "string"),
                ("tags[]", "array(string)"),
                ("untyped[]", "array"),
            ]
        );
        assert!(fields.iter().any(|f| f.path == "inline[].x" && f.required));
    }

    #[test]
    fn inline_object_recurses_with_own_required() {
        let doc = foo_doc();
        let schema = node(json!({
            "properties": {
                "owner": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": { "type": "string" },
                        "ref": { "$ref": "#/components/schemas/Foo" },
                    },
                },
            },
        }));
        let fields = flatten(&doc, &schema, "");
        assert_eq!(
            rows(&fields),
            vec![
                ("owner", "object"),
                ("owner.name", "string"),
                ("owner.ref", "object"),
                ("owner.ref.a", "string"),
            ]
        );
        assert!(fields[1].required);
        assert!(!fields[0].required);
    }

    #[test]
    fn root_array_uses_bracket_prefix() {
        let doc = foo_doc();
        let schema = node(json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Foo" },
        }));
        assert_eq!(
            rows(&flatten(&doc, &schema, "")),
            vec![("[]", "array(object)"), ("[].a", "string")]
        );
    }

    #[test]
    fn cyclic_refs_stop_at_reentry() {
        let doc = doc(json!({
            "Node": {
                "type": "object",
                "properties": {
                    "value": { "type": "string" },
                    "next": { "$ref": "#/components/schemas/Node" },
                    "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } },
                },
            },
        }));
        let fields = flatten_ref(&doc, "Node", "");
        assert_eq!(
            rows(&fields),
            vec![
                ("children[]", "array(object)"),
                ("next", "object"),
                ("value", "string"),
            ]
        );
    }

    #[test]
    fn cycle_through_composition_stops_at_reentry() {
        let doc = doc(json!({
            "Node": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "parent": { "allOf": [{ "$ref": "#/components/schemas/Node" }] },
                },
            },
            "Wrapped": { "allOf": [{ "$ref": "#/components/schemas/Wrapped" }, {
                "properties": {
                    "self": { "anyOf": [{ "$ref": "#/components/schemas/Wrapped" }] },
                },
            }] },
        }));
        assert_eq!(
            rows(&flatten_ref(&doc, "Node", "")),
            vec![("name", "string"), ("parent", "object")]
        );
        assert_eq!(rows(&flatten_ref(&doc, "Wrapped", "")), vec![("self", "object")]);
    }

    #[test]
    fn schema_and_parameter_with_one_name_are_distinct() {
        let doc = Document::new(json!({
            "components": {
                "schemas": {
                    "Id": {
                        "type": "object",
                        "properties": { "param": { "$ref": "#/components/parameters/Id" } },
                    },
                },
                "parameters": {
                    "Id": {
                        "name": "id",
                        "in": "path",
                        "schema": {
                            "type": "object",
                            "properties": { "value": { "type": "string" } },
                        },
                    },
                },
            },
        }));
        assert_eq!(
            rows(&flatten_ref(&doc, "Id", "")),
            vec![("param", "object"), ("param.value", "string")]
        );
    }

    #[test]
    fn sibling_revisits_are_expanded() {
        let doc = doc(json!({
            "Money": { "type": "object", "properties": { "cents": { "type": "integer" } } },
        }));
        let schema = node(json!({
            "properties": {
                "price": { "$ref": "#/components/schemas/Money" },
                "tax": { "$ref": "#/components/schemas/Money" },
            },
        }));
        assert_eq!(
            rows(&flatten(&doc, &schema, "")),
            vec![
                ("price", "object"),
                ("price.cents", "integer"),
                ("tax", "object"),
                ("tax.cents", "integer"),
            ]
        );
    }

    #[test]
    fn decorated_labels_carry_component_names() {
        let doc = foo_doc();
        let schema = node(json!({
            "properties": {
                "one": { "$ref": "#/components/schemas/Foo" },
                "many": { "type": "array", "items": { "$ref": "#/components/schemas/Foo" } },
            },
        }));
        let fields = flatten_decorated(&doc, &schema, "");
        assert_eq!(
            rows(&fields),
            vec![
                ("many[]", "array(object(Foo))"),
                ("many[].a", "string"),
                ("one", "object(Foo)"),
                ("one.a", "string"),
            ]
        );
    }

    #[test]
    fn strip_decorations() {
        assert_eq!(strip_component_decorations("object(User)"), "object");
        assert_eq!(
            strip_component_decorations("array(object(a.v1.User))"),
            "array(object)"
        );
        assert_eq!(strip_component_decorations("array(string)"), "array(string)");
        assert_eq!(strip_component_decorations("object(broken"), "object(broken");
    }

    #[test]
    fn flatten_is_deterministic() {
        let doc = foo_doc();
        let schema = node(json!({
            "properties": {
                "z": { "type": "string" },
                "m": { "$ref": "#/components/schemas/Foo" },
                "a": { "type": "array", "items": { "type": "integer" } },
            },
        }));
        let first = flatten(&doc, &schema, "");
        for _ in 0..5 {
            assert_eq!(flatten(&doc, &schema, ""), first);
        }
    }
}
