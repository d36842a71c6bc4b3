//! Schema resolution and projection engine for `OpenAPI` documentation.
//!
//! Given a parsed document and one request or response body schema, the
//! engine produces:
//!
//! - a flat table of [`FieldDescriptor`] rows (`data.items[].code`, type
//!   label, required flag, description);
//! - a representative example value with placeholder leaves;
//! - both of the above pruned by an optional per-operation allow-list.
//!
//! Every operation is a pure function over an immutable [`Document`].
//! Unresolved `$ref`s and self-referencing schemas never fail: the affected
//! branch is simply left empty.
//!
//! ```
//! use apidocs_core::{project, AllowedPathSet, Document, Envelope, SchemaNode};
//! use serde_json::json;
//!
//! let doc = Document::new(json!({
//!     "components": { "schemas": {
//!         "Item": { "type": "object", "properties": { "code": { "type": "string" } } },
//!     }},
//! }));
//! let body = SchemaNode::from_value(&json!({
//!     "type": "object",
//!     "properties": {
//!         "data": { "type": "array", "items": { "$ref": "#/components/schemas/Item" } },
//!     },
//! }));
//!
//! let allowed = AllowedPathSet::new(["code"]);
//! let projection = project(&doc, &body, Some(&allowed), &Envelope::default());
//! assert_eq!(projection.fields.len(), 1);
//! assert_eq!(projection.fields[0].path, "data[].code");
//! assert_eq!(projection.example, json!({ "data": [{ "code": "string" }] }));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod document;
pub mod example;
pub mod filter;
pub mod flatten;
pub mod merge;
pub mod order;
pub mod projection;
pub mod schema;

pub use document::{component_name, Document, PARAMETER_REF_PREFIX, SCHEMA_REF_PREFIX};
pub use example::{build_example, build_example_ref, example_json};
pub use filter::{filter_example, filter_fields, normalize_pattern, AllowedPathSet, Envelope};
pub use flatten::{
    flatten, flatten_decorated, flatten_ref, strip_component_decorations, FieldDescriptor,
};
pub use merge::{merged_properties, merged_required};
pub use order::ordered_top_level_keys;
pub use projection::{project, Projection};
pub use schema::{ObjectSchema, SchemaKind, SchemaMeta, SchemaNode};
