//! Effective property maps for object and composition schemas.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{Document, Entry, RefStack};
use crate::schema::{SchemaKind, SchemaNode};

/// Properties and required names contributed to one object level.
#[derive(Debug, Default)]
pub(crate) struct Merged<'a> {
    pub(crate) properties: BTreeMap<&'a str, &'a SchemaNode>,
    pub(crate) required: BTreeSet<&'a str>,
    entered: Vec<&'a str>,
}

/// Effective property map of `node`, ordered by property name.
///
/// Direct `properties` win when non-empty. Otherwise the members of `allOf`,
/// `oneOf` and `anyOf` are merged in that order; `$ref` members are resolved
/// first. On a name collision the later member overwrites the earlier one.
/// Nodes that contribute nothing yield an empty map.
#[must_use]
pub fn merged_properties<'a>(
    doc: &'a Document,
    node: &'a SchemaNode,
) -> BTreeMap<&'a str, &'a SchemaNode> {
    merge(doc, node).properties
}

/// Names required at the level described by `node`.
///
/// Union of the node's own `required` list and the `required` lists of the
/// composition members whose properties were merged.
#[must_use]
pub fn merged_required<'a>(doc: &'a Document, node: &'a SchemaNode) -> BTreeSet<&'a str> {
    merge(doc, node).required
}

pub(crate) fn merge<'a>(doc: &'a Document, node: &'a SchemaNode) -> Merged<'a> {
    merge_on(&mut RefStack::new(doc), node)
}

/// Merge `node` against a walker's own stack.
///
/// Components followed while merging stay on `stack` afterwards, so the
/// merged properties cannot expand them again. The caller takes
/// [`RefStack::depth`] first and unwinds to it once the properties are done.
pub(crate) fn merge_on<'a>(stack: &mut RefStack<'a>, node: &'a SchemaNode) -> Merged<'a> {
    let mut merged = Merged::default();
    collect(stack, node, &mut merged);
    for target in std::mem::take(&mut merged.entered) {
        stack.hold(target);
    }
    merged
}

fn collect<'a>(stack: &mut RefStack<'a>, node: &'a SchemaNode, out: &mut Merged<'a>) {
    match &node.kind {
        SchemaKind::Ref(target) => {
            if let Entry::Resolved(resolved) = stack.enter(target) {
                collect(stack, resolved, out);
                stack.leave();
                if !out.entered.contains(&target.as_str()) {
                    out.entered.push(target.as_str());
                }
            }
        }
        SchemaKind::Object(obj) | SchemaKind::Composition(obj) => {
            out.required.extend(obj.required.iter().map(String::as_str));
            if obj.properties.is_empty() {
                for member in obj.members() {
                    collect(stack, member, out);
                }
            } else {
                out.properties
                    .extend(obj.properties.iter().map(|(k, v)| (k.as_str(), v)));
            }
        }
        SchemaKind::Array(_) | SchemaKind::Scalar(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn doc() -> Document {
        Document::new(json!({
            "components": { "schemas": {
                "Base": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {
                        "id": { "type": "integer" },
                        "kind": { "type": "string", "description": "base kind" },
                    },
                },
                "Tagged": {
                    "allOf": [
                        { "$ref": "#/components/schemas/Base" },
                        { "properties": { "tag": { "type": "string" } } },
                    ],
                },
                "Loop": { "allOf": [{ "$ref": "#/components/schemas/Loop" }] },
            }},
        }))
    }

    fn names(map: &BTreeMap<&str, &SchemaNode>) -> Vec<String> {
        map.keys().map(ToString::to_string).collect()
    }

    #[test]
    fn direct_properties_win() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({
            "properties": { "own": { "type": "string" } },
            "allOf": [{ "$ref": "#/components/schemas/Base" }],
        }));
        assert_eq!(names(&merged_properties(&doc, &node)), vec!["own"]);
    }

    #[test]
    fn all_of_members_are_merged() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({ "$ref": "#/components/schemas/Tagged" }));
        assert_eq!(
            names(&merged_properties(&doc, &node)),
            vec!["id", "kind", "tag"]
        );
        assert_eq!(
            merged_required(&doc, &node).into_iter().collect::<Vec<_>>(),
            vec!["id"]
        );
    }

    #[test]
    fn later_members_overwrite_earlier() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({
            "allOf": [{ "$ref": "#/components/schemas/Base" }],
            "anyOf": [{ "properties": { "kind": { "type": "integer" } } }],
        }));
        let merged = merged_properties(&doc, &node);
        assert_eq!(
            merged["kind"].kind,
            SchemaKind::Scalar(Some("integer".to_string()))
        );
    }

    #[test]
    fn unresolved_members_contribute_nothing() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({
            "oneOf": [
                { "$ref": "#/components/schemas/Missing" },
                { "properties": { "b": { "type": "boolean" } } },
            ],
        }));
        assert_eq!(names(&merged_properties(&doc, &node)), vec!["b"]);
    }

    #[test]
    fn self_referencing_composition_terminates() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({ "$ref": "#/components/schemas/Loop" }));
        assert!(merged_properties(&doc, &node).is_empty());
    }

    #[test]
    fn merged_components_stay_on_the_stack() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({ "$ref": "#/components/schemas/Tagged" }));
        let mut stack = RefStack::new(&doc);
        let merged = merge_on(&mut stack, &node);
        assert_eq!(merged.properties.len(), 3);
        assert_eq!(stack.depth(), 2);
        assert!(matches!(
            stack.enter("#/components/schemas/Base"),
            Entry::Cycle
        ));
        stack.unwind(0);
        assert!(matches!(
            stack.enter("#/components/schemas/Base"),
            Entry::Resolved(_)
        ));
    }

    #[test]
    fn merge_refuses_components_already_on_the_stack() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({
            "allOf": [
                { "$ref": "#/components/schemas/Base" },
                { "properties": { "extra": { "type": "string" } } },
            ],
        }));
        let mut stack = RefStack::new(&doc);
        stack.hold("#/components/schemas/Base");
        let merged = merge_on(&mut stack, &node);
        assert_eq!(names(&merged.properties), vec!["extra"]);
    }

    #[test]
    fn scalars_have_no_properties() {
        let doc = doc();
        let node = SchemaNode::from_value(&json!({ "type": "string" }));
        assert!(merged_properties(&doc, &node).is_empty());
    }
}
