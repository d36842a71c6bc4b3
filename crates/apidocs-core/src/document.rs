//! Parsed `OpenAPI` document and `$ref` resolution.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::schema::SchemaNode;

/// `$ref` prefix for the schema registry.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// `$ref` prefix for the parameter registry.
pub const PARAMETER_REF_PREFIX: &str = "#/components/parameters/";

/// An immutable `OpenAPI` document with normalized component registries.
///
/// Construct once per render from the parsed JSON value. The normalized
/// `components.schemas` / `components.parameters` registries are built at
/// construction and never change afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    schemas: BTreeMap<String, SchemaNode>,
    parameters: BTreeMap<String, SchemaNode>,
}

impl Document {
    /// Wrap a parsed JSON value and normalize its component registries.
    #[must_use]
    pub fn new(root: Value) -> Self {
        let schemas = registry(&root, "schemas")
            .map(|entries| {
                entries
                    .iter()
                    .map(|(name, schema)| (name.clone(), SchemaNode::from_value(schema)))
                    .collect()
            })
            .unwrap_or_default();

        let parameters = registry(&root, "parameters")
            .map(|entries| {
                entries
                    .iter()
                    .map(|(name, param)| (name.clone(), parameter_node(param)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            root,
            schemas,
            parameters,
        }
    }

    /// The raw parsed document.
    #[must_use]
    pub const fn root(&self) -> &Value {
        &self.root
    }

    /// Dotted-path lookup, e.g. `get("info.title")`.
    ///
    /// Returns `None` for missing keys and for explicit `null` values.
    #[must_use]
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        dotted
            .split('.')
            .try_fold(&self.root, |node, key| node.as_object()?.get(key))
            .filter(|v| !v.is_null())
    }

    /// The `paths` object, if present.
    #[must_use]
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.root.get("paths").and_then(Value::as_object)
    }

    /// Normalized `components.schemas[name]`.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    /// Normalized `components.parameters[name]`.
    ///
    /// The node is the parameter's `schema`, carrying the parameter's own
    /// description when the schema has none.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&SchemaNode> {
        self.parameters.get(name)
    }

    /// Resolve a `$ref` against the schema or parameter registry.
    ///
    /// Returns `None` for unknown prefixes and missing names; callers treat
    /// that as "skip this branch".
    #[must_use]
    pub fn resolve(&self, reference: &str) -> Option<&SchemaNode> {
        match Registry::of(reference)? {
            Registry::Schemas => self.schema(component_name(reference)),
            Registry::Parameters => self.parameter(component_name(reference)),
        }
    }

    /// Resolve a `$ref` to the raw, un-normalized component value.
    ///
    /// Parameter objects (`name`, `in`, `required`, ...) are only available
    /// through this lookup.
    #[must_use]
    pub fn resolve_raw(&self, reference: &str) -> Option<&Value> {
        let kind = match Registry::of(reference)? {
            Registry::Schemas => "schemas",
            Registry::Parameters => "parameters",
        };
        registry(&self.root, kind)?.get(component_name(reference))
    }
}

impl From<Value> for Document {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

/// Component name of a `$ref`: the substring after the final `/`.
///
/// Returns an empty string when the reference has no `/`.
#[must_use]
pub fn component_name(reference: &str) -> &str {
    reference
        .rfind('/')
        .map_or("", |idx| &reference[idx + 1..])
}

#[derive(Debug, Clone, Copy)]
enum Registry {
    Schemas,
    Parameters,
}

impl Registry {
    fn of(reference: &str) -> Option<Self> {
        if reference.starts_with(SCHEMA_REF_PREFIX) {
            Some(Self::Schemas)
        } else if reference.starts_with(PARAMETER_REF_PREFIX) {
            Some(Self::Parameters)
        } else {
            None
        }
    }
}

fn registry<'a>(root: &'a Value, kind: &str) -> Option<&'a Map<String, Value>> {
    root.get("components")?.get(kind)?.as_object()
}

fn parameter_node(param: &Value) -> SchemaNode {
    let mut node = param
        .get("schema")
        .map_or_else(|| SchemaNode::from_value(param), SchemaNode::from_value);
    if node.meta.description.is_none() {
        node.meta.description = param
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    node
}

/// Result of following a `$ref` during a recursive walk.
pub(crate) enum Entry<'a> {
    /// Target found and pushed onto the active stack.
    Resolved(&'a SchemaNode),
    /// Target is already being expanded higher up the stack.
    Cycle,
    /// Target does not exist.
    Missing,
}

/// Stack of components currently being expanded by one walk.
///
/// Entries are full `$ref` strings, so a schema and a parameter sharing a
/// name are distinct. Revisiting a component through a sibling branch is
/// allowed; only re-entering a component that is still on the stack is
/// refused.
pub(crate) struct RefStack<'a> {
    doc: &'a Document,
    active: Vec<&'a str>,
}

impl<'a> RefStack<'a> {
    pub(crate) const fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            active: Vec::new(),
        }
    }

    pub(crate) const fn doc(&self) -> &'a Document {
        self.doc
    }

    /// Follow `target`. On [`Entry::Resolved`] the caller must call
    /// [`leave`](Self::leave) once the target's subtree is done.
    pub(crate) fn enter(&mut self, target: &'a str) -> Entry<'a> {
        if self.active.contains(&target) {
            tracing::debug!(reference = target, "cyclic reference, not expanding");
            return Entry::Cycle;
        }
        let Some(resolved) = self.doc.resolve(target) else {
            tracing::debug!(reference = target, "unresolved reference");
            return Entry::Missing;
        };
        self.active.push(target);
        Entry::Resolved(resolved)
    }

    pub(crate) fn leave(&mut self) {
        self.active.pop();
    }

    /// Mark `target` as being expanded without resolving it again.
    pub(crate) fn hold(&mut self, target: &'a str) {
        self.active.push(target);
    }

    /// Current stack depth, for a later [`unwind`](Self::unwind).
    pub(crate) fn depth(&self) -> usize {
        self.active.len()
    }

    /// Leave every component entered since `depth` was taken.
    pub(crate) fn unwind(&mut self, depth: usize) {
        self.active.truncate(depth);
    }
}
