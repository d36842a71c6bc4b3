//! Field table and example for one request or response body.

use serde::Serialize;
use serde_json::Value;

use crate::document::Document;
use crate::example::{build_example, example_json};
use crate::filter::{filter_example, filter_fields, AllowedPathSet, Envelope};
use crate::flatten::{flatten, FieldDescriptor};
use crate::schema::SchemaNode;

/// Filtered field rows and example value of one body schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    /// Field rows with component decorations stripped.
    pub fields: Vec<FieldDescriptor>,
    /// Example value mirroring the schema.
    pub example: Value,
}

impl Projection {
    /// The example as four-space indented JSON.
    #[must_use]
    pub fn example_json(&self) -> String {
        example_json(&self.example)
    }
}

/// Flatten and exemplify `node`, then apply `allowed` to both.
#[must_use]
pub fn project(
    doc: &Document,
    node: &SchemaNode,
    allowed: Option<&AllowedPathSet>,
    envelope: &Envelope,
) -> Projection {
    let fields = filter_fields(flatten(doc, node, ""), allowed, envelope);
    let example = filter_example(build_example(doc, node), allowed, envelope);
    Projection { fields, example }
}
