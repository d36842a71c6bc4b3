//! Documentation page model and its Markdown / HTML renderings.
//!
//! [`build_page`] walks the document once, in `paths` declaration order, and
//! produces an [`ApiPage`]: endpoints grouped by the first tag
//! (`group/section/subsection/...`), each carrying its parameter tables and
//! the request/response projections filtered by the customization rules for
//! its path. The Markdown renderer writes that model directly; the HTML page
//! goes through `handlebars` templates.

mod html;
mod markdown;

pub use html::{render_html, HtmlRenderer, TEMPLATE_NAMES};
pub use markdown::render_markdown;

use apidocs_core::{project, Projection};
use serde::Serialize;
use serde_json::Value;

use crate::config::{ProjectConfig, ResolvedRules};
use crate::operation::{
    collect_parameters, operation, present_methods, request_schema, response_schema, ParamRow,
    Parameters, DEFAULT_CONTENT_TYPE,
};
use crate::source::LoadedSpec;

/// Title used when neither the config nor `info.title` provides one.
pub const DEFAULT_TITLE: &str = "API Documentation";

/// Group name for operations without tags.
pub const DEFAULT_GROUP: &str = "Ungrouped";

/// Section name for tags without a `/section` part.
pub const DEFAULT_SECTION: &str = "Default";

/// The whole documentation page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiPage {
    /// Page title.
    pub title: String,
    /// Route of the Markdown export, linked from the HTML page.
    pub route_markdown: String,
    /// Top-level groups in first-seen order.
    pub groups: Vec<TagGroup>,
}

/// Endpoints sharing the first part of their first tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagGroup {
    /// Group name.
    pub name: String,
    /// Anchor id, `group-<slug>`.
    pub id: String,
    /// Sections in first-seen order.
    pub sections: Vec<TagSection>,
}

/// One level of the section tree below a group.
///
/// The tag `Sales/Orders/Refunds` puts its endpoints in the `Refunds` child
/// of the `Orders` section of group `Sales`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSection {
    /// Last path segment.
    pub name: String,
    /// Segments from the group down to this section, joined with `/`.
    pub path: String,
    /// Anchor id: the parent's id, `-`, and the slug of `name`.
    pub id: String,
    /// Endpoints tagged with exactly this section, in path declaration order.
    pub endpoints: Vec<Endpoint>,
    /// Subsections in first-seen order.
    pub children: Vec<TagSection>,
}

impl TagSection {
    fn new(name: &str, parent_id: &str, parent_path: &str) -> Self {
        let path = if parent_path.is_empty() {
            name.to_string()
        } else {
            format!("{parent_path}/{name}")
        };
        Self {
            name: name.to_string(),
            path,
            id: format!("{parent_id}-{}", slugify(name)),
            endpoints: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Own endpoints, then those of every subsection, depth first.
    pub fn all_endpoints(&self) -> Box<dyn Iterator<Item = &Endpoint> + '_> {
        Box::new(
            self.endpoints
                .iter()
                .chain(self.children.iter().flat_map(TagSection::all_endpoints)),
        )
    }

    /// This section and its descendants in page order, with their depth
    /// below the group (top-level sections are at depth 0).
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, &TagSection)> {
        let mut out = Vec::new();
        self.walk_into(0, &mut out);
        out
    }

    fn walk_into<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a TagSection)>) {
        out.push((depth, self));
        for child in &self.children {
            child.walk_into(depth + 1, out);
        }
    }
}

/// One documented operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    /// Upper-case HTTP method.
    pub method: String,
    /// URL template.
    pub path: String,
    /// `summary`, or `METHOD /path`.
    pub summary: String,
    /// `description`, if present.
    pub description: Option<String>,
    /// Anchor id from [`anchor_id`].
    pub anchor: String,
    /// Request media type, defaulting to `application/json`.
    pub content_type: String,
    /// Parameter tables, injected headers included.
    pub parameters: Parameters,
    /// Request body projection.
    pub request: Option<Projection>,
    /// Response body projection.
    pub response: Option<Projection>,
}

impl ApiPage {
    /// All endpoints in page order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.groups
            .iter()
            .flat_map(|group| &group.sections)
            .flat_map(TagSection::all_endpoints)
    }

    /// The section for `suffix` (the part of the tag after the group),
    /// creating missing levels.
    ///
    /// `suffix` is split at `/`; segments are trimmed and empty ones skipped.
    /// A suffix without segments selects [`DEFAULT_SECTION`].
    fn section_mut(&mut self, group: &str, suffix: &str) -> &mut TagSection {
        let group_idx = match self.groups.iter().position(|g| g.name == group) {
            Some(idx) => idx,
            None => {
                self.groups.push(TagGroup {
                    name: group.to_string(),
                    id: format!("group-{}", slugify(group)),
                    sections: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[group_idx];

        let segments: Vec<&str> = suffix
            .split('/')
            .map(str::trim)
            .filter(|seg| !seg.is_empty())
            .collect();
        let (leaf, parents) = match segments.split_last() {
            Some((leaf, parents)) => (*leaf, parents),
            None => (DEFAULT_SECTION, &[][..]),
        };

        let mut parent_id = group.id.clone();
        let mut parent_path = String::new();
        let mut level = &mut group.sections;
        for segment in parents {
            let idx = child_index(level, segment, &parent_id, &parent_path);
            let current = level;
            let section = &mut current[idx];
            parent_id.clone_from(&section.id);
            parent_path.clone_from(&section.path);
            level = &mut section.children;
        }
        let idx = child_index(level, leaf, &parent_id, &parent_path);
        &mut level[idx]
    }
}

/// Position of the child named `name`, appended if missing.
fn child_index(level: &mut Vec<TagSection>, name: &str, parent_id: &str, parent_path: &str) -> usize {
    if let Some(idx) = level.iter().position(|s| s.name == name) {
        return idx;
    }
    level.push(TagSection::new(name, parent_id, parent_path));
    level.len() - 1
}

/// Build the page model for a loaded document.
#[must_use]
pub fn build_page(spec: &LoadedSpec, config: &ProjectConfig) -> ApiPage {
    let doc = &spec.document;
    let title = config
        .title
        .clone()
        .or_else(|| {
            doc.get("info.title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let mut page = ApiPage {
        title,
        route_markdown: config.route_markdown.clone(),
        groups: Vec::new(),
    };
    let Some(paths) = doc.paths() else {
        return page;
    };

    let envelope = config.envelope.envelope();
    for path in spec.ordered_paths() {
        let Some(item) = paths.get(&path) else {
            continue;
        };
        let rules = config.rules_for(&path);
        for method in present_methods(item) {
            let Some(op) = operation(item, &method) else {
                continue;
            };

            let request = request_schema(doc, op);
            let content_type = request
                .as_ref()
                .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), |b| b.content_type.clone());
            let request = request.map(|body| {
                project(doc, &body.node, rules.request_allowed().as_ref(), &envelope)
            });
            let response = response_schema(doc, op).map(|body| {
                project(doc, &body.node, rules.response_allowed().as_ref(), &envelope)
            });

            let mut parameters = collect_parameters(doc, item, op);
            inject_headers(&mut parameters.headers, &rules);

            let summary = op
                .get("summary")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map_or_else(|| format!("{} {path}", method.to_uppercase()), str::to_string);
            let description = op
                .get("description")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            let tags: Vec<&str> = op
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| tags.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let (group, section) = split_tag_parts(&tags);

            let endpoint = Endpoint {
                method: method.to_uppercase(),
                anchor: anchor_id(&method, &path),
                path: path.clone(),
                summary,
                description,
                content_type,
                parameters,
                request,
                response,
            };
            page.section_mut(group, section).endpoints.push(endpoint);
        }
    }

    tracing::debug!(
        groups = page.groups.len(),
        endpoints = page.endpoints().count(),
        "documentation page built"
    );
    page
}

/// Append configured headers whose names are not declared already.
fn inject_headers(headers: &mut Vec<ParamRow>, rules: &ResolvedRules) {
    for (name, spec) in &rules.headers {
        if headers.iter().any(|h| &h.name == name) {
            continue;
        }
        headers.push(ParamRow {
            name: name.clone(),
            required: spec.required,
            ty: spec.ty.clone(),
            description: spec.description.clone(),
        });
    }
}

/// Split the first tag at its first `/` into group and section suffix.
///
/// No tags → ([`DEFAULT_GROUP`], [`DEFAULT_SECTION`]); no `/` or an empty
/// suffix → the suffix is [`DEFAULT_SECTION`]. The suffix may hold further
/// `/`-separated levels.
#[must_use]
pub fn split_tag_parts<'a>(tags: &[&'a str]) -> (&'a str, &'a str) {
    let Some(&first) = tags.first() else {
        return (DEFAULT_GROUP, DEFAULT_SECTION);
    };
    match first.split_once('/') {
        Some((group, "")) => (group, DEFAULT_SECTION),
        Some((group, section)) => (group, section),
        None => (first, DEFAULT_SECTION),
    }
}

/// Anchor id of an endpoint: `get-/v1/orders/{id}` → `get-v1-orders-id`.
#[must_use]
pub fn anchor_id(method: &str, path: &str) -> String {
    let raw: String = format!("{method}-{path}")
        .chars()
        .filter(|c| !matches!(c, '{' | '}'))
        .map(|c| match c {
            '/' | ' ' | ':' | '?' | '&' | '=' | '.' | ',' | '@' => '-',
            other => other,
        })
        .collect();
    collapse_dashes(&raw)
}

/// Anchor-friendly form of a group or section title.
///
/// Lower-cases, maps spaces, `/` and `.` to `-`, drops brackets and
/// parentheses, collapses repeated dashes and trims them from both ends.
#[must_use]
pub fn slugify(title: &str) -> String {
    let raw: String = title
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .map(|c| if matches!(c, ' ' | '/' | '.') { '-' } else { c })
        .collect();
    collapse_dashes(&raw)
}

fn collapse_dashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn spec(raw: &str) -> LoadedSpec {
        LoadedSpec::from_content(raw.to_string(), "inline").unwrap()
    }

    #[test]
    fn tag_parts() {
        assert_eq!(split_tag_parts(&[]), ("Ungrouped", "Default"));
        assert_eq!(split_tag_parts(&["Users"]), ("Users", "Default"));
        assert_eq!(split_tag_parts(&["Users/Admin", "x"]), ("Users", "Admin"));
        assert_eq!(split_tag_parts(&["Users/"]), ("Users", "Default"));
        assert_eq!(split_tag_parts(&["Users/Admin/Roles"]), ("Users", "Admin/Roles"));
    }

    #[test]
    fn anchors_and_slugs() {
        assert_eq!(anchor_id("get", "/v1/orders/{id}"), "get-v1-orders-id");
        assert_eq!(anchor_id("post", "/a.b//c?x=1"), "post-a-b-c-x-1");
        assert_eq!(slugify("  User Admin / Roles (v2) "), "user-admin-roles-v2");
        assert_eq!(slugify("用户模块"), "用户模块");
    }

    #[test]
    fn page_groups_follow_declaration_order() {
        let spec = spec(
            r#"{
                "info": { "title": "  Shop  " },
                "paths": {
                    "/orders": {
                        "post": { "tags": ["Sales/Orders"], "summary": "Create order" },
                        "get": { "tags": ["Sales/Orders"] }
                    },
                    "/health": { "get": {} },
                    "/invoices": { "get": { "tags": ["Sales/Billing"] } }
                }
            }"#,
        );
        let page = build_page(&spec, &ProjectConfig::default());
        assert_eq!(page.title, "Shop");

        let layout: Vec<(&str, Vec<&str>)> = page
            .groups
            .iter()
            .map(|g| (g.name.as_str(), g.sections.iter().map(|s| s.id.as_str()).collect()))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("Sales", vec!["group-sales-orders", "group-sales-billing"]),
                ("Ungrouped", vec!["group-ungrouped-default"]),
            ]
        );

        let summaries: Vec<&str> = page.endpoints().map(|e| e.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec!["GET /orders", "Create order", "GET /invoices", "GET /health"]
        );
    }

    #[test]
    fn nested_tags_build_a_section_tree() {
        let spec = spec(
            r#"{
                "paths": {
                    "/roles": { "get": { "tags": ["Users/Admin/Roles"] } },
                    "/admins": { "get": { "tags": ["Users/Admin"] } },
                    "/grants": { "get": { "tags": ["Users/ Admin /Roles/Grants"] } },
                    "/profile": { "get": { "tags": ["Users/Profile"] } },
                    "/blank": { "get": { "tags": ["Users//"] } }
                }
            }"#,
        );
        let page = build_page(&spec, &ProjectConfig::default());
        assert_eq!(page.groups.len(), 1);
        let users = &page.groups[0];

        let tree: Vec<(usize, &str, &str, usize)> = users
            .sections
            .iter()
            .flat_map(TagSection::walk)
            .map(|(depth, s)| (depth, s.path.as_str(), s.id.as_str(), s.endpoints.len()))
            .collect();
        assert_eq!(
            tree,
            vec![
                (0, "Admin", "group-users-admin", 1),
                (1, "Admin/Roles", "group-users-admin-roles", 1),
                (2, "Admin/Roles/Grants", "group-users-admin-roles-grants", 1),
                (0, "Profile", "group-users-profile", 1),
                (0, "Default", "group-users-default", 1),
            ]
        );

        let paths: Vec<&str> = page.endpoints().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/admins", "/roles", "/grants", "/profile", "/blank"]);
    }

    #[test]
    fn config_title_wins_and_headers_are_injected_once() {
        let spec = spec(
            r#"{
                "info": { "title": "Shop" },
                "paths": {
                    "/orders": { "get": { "parameters": [
                        { "name": "token", "in": "header", "description": "declared" }
                    ] } }
                }
            }"#,
        );
        let config: ProjectConfig = serde_yaml_ng::from_str(
            r#"
title: Shop Reference
customize:
  "/orders*":
    headers:
      token: "string#required#injected"
      tenant: "string#required#tenant id"
"#,
        )
        .unwrap();
        let page = build_page(&spec, &config);
        assert_eq!(page.title, "Shop Reference");

        let endpoint = page.endpoints().next().unwrap();
        let headers: Vec<(&str, &str, bool)> = endpoint
            .parameters
            .headers
            .iter()
            .map(|h| (h.name.as_str(), h.description.as_str(), h.required))
            .collect();
        assert_eq!(
            headers,
            vec![("token", "declared", false), ("tenant", "tenant id", true)]
        );
        assert_eq!(endpoint.content_type, "application/json");
        assert!(endpoint.request.is_none());
    }

    #[test]
    fn missing_paths_yield_empty_page() {
        let page = build_page(&spec("{}"), &ProjectConfig::default());
        assert_eq!(page.title, DEFAULT_TITLE);
        assert!(page.groups.is_empty());
    }
}
