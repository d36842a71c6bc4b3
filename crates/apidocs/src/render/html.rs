//! HTML page for an [`ApiPage`], rendered through `handlebars` templates.
//!
//! The built-in templates live in `templates/*.hbs`. A template directory
//! (`template_dir` in the project config) may replace any of them with a
//! file of the same name; the rest fall back to the built-ins.
//!
//! | Template | Context |
//! |---|---|
//! | `layout` | the page: `title`, `route_markdown`, `groups` |
//! | `style` | none, included inside `<style>` |
//! | `nav` | the page |
//! | `section` | one section: `name`, `id`, `path`, `depth`, `endpoints` |
//! | `endpoint` | one endpoint plus `param_tables` and `bodies` |
//! | `params` | one parameter table: `title`, `rows` |
//! | `body` | one body: `example_title`, `fields_title`, `projection` |
//!
//! Sections are handed to the templates as a flat, depth-first list per
//! group; `indent` and `item_indent` carry the navigation padding for each
//! depth.

use std::path::Path;

use apidocs_core::{example_json, Projection};
use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde::Serialize;

use super::{ApiPage, Endpoint, TagGroup, TagSection};
use crate::error::Result;
use crate::operation::ParamRow;

/// Names of the page templates, in registration order.
pub const TEMPLATE_NAMES: [&str; 7] = [
    "layout", "style", "nav", "section", "endpoint", "params", "body",
];

const LAYOUT: &str = "layout";

fn builtin(name: &str) -> Option<&'static str> {
    Some(match name {
        "layout" => include_str!("../../templates/layout.hbs"),
        "style" => include_str!("../../templates/style.hbs"),
        "nav" => include_str!("../../templates/nav.hbs"),
        "section" => include_str!("../../templates/section.hbs"),
        "endpoint" => include_str!("../../templates/endpoint.hbs"),
        "params" => include_str!("../../templates/params.hbs"),
        "body" => include_str!("../../templates/body.hbs"),
        _ => return None,
    })
}

/// Compiled page templates.
#[derive(Debug)]
pub struct HtmlRenderer {
    registry: Handlebars<'static>,
}

impl HtmlRenderer {
    /// Renderer using the built-in templates.
    ///
    /// # Errors
    ///
    /// [`Error::Template`](crate::Error::Template) if a built-in template
    /// fails to compile.
    pub fn new() -> Result<Self> {
        Self::with_template_dir(None)
    }

    /// Renderer preferring `<dir>/<name>.hbs` over each built-in template.
    ///
    /// # Errors
    ///
    /// [`Error::Template`](crate::Error::Template) if a template fails to
    /// compile, [`Error::Io`](crate::Error::Io) if an override exists but
    /// cannot be read.
    pub fn with_template_dir(dir: Option<&Path>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_helper("json", Box::new(json_helper));

        for name in TEMPLATE_NAMES {
            let override_path = dir
                .map(|dir| dir.join(format!("{name}.hbs")))
                .filter(|path| path.is_file());
            match override_path {
                Some(path) => {
                    tracing::debug!(template = name, path = %path.display(), "using template override");
                    let source = std::fs::read_to_string(&path)?;
                    registry.register_template_string(name, source)?;
                }
                None => {
                    if let Some(source) = builtin(name) {
                        registry.register_template_string(name, source)?;
                    }
                }
            }
        }
        Ok(Self { registry })
    }

    /// Render the page as a complete HTML document.
    ///
    /// # Errors
    ///
    /// [`Error::Render`](crate::Error::Render) if a template fails at render
    /// time (for example an override naming a missing partial).
    pub fn render(&self, page: &ApiPage) -> Result<String> {
        Ok(self.registry.render(LAYOUT, &PageView::new(page))?)
    }
}

/// Render the page with the built-in templates.
///
/// # Errors
///
/// See [`HtmlRenderer::render`].
pub fn render_html(page: &ApiPage) -> Result<String> {
    HtmlRenderer::new()?.render(page)
}

/// `{{json value}}`: the value as four-space indented, HTML-escaped JSON.
fn json_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    if let Some(param) = h.param(0) {
        out.write(&handlebars::html_escape(&example_json(param.value())))?;
    }
    Ok(())
}

#[derive(Serialize)]
struct PageView<'a> {
    title: &'a str,
    route_markdown: &'a str,
    groups: Vec<GroupView<'a>>,
}

#[derive(Serialize)]
struct GroupView<'a> {
    name: &'a str,
    id: &'a str,
    sections: Vec<SectionView<'a>>,
}

#[derive(Serialize)]
struct SectionView<'a> {
    name: &'a str,
    id: &'a str,
    path: &'a str,
    depth: usize,
    indent: usize,
    item_indent: usize,
    endpoints: Vec<EndpointView<'a>>,
}

#[derive(Serialize)]
struct EndpointView<'a> {
    #[serde(flatten)]
    endpoint: &'a Endpoint,
    param_tables: Vec<ParamTable<'a>>,
    bodies: Vec<BodyView<'a>>,
}

#[derive(Serialize)]
struct ParamTable<'a> {
    title: &'static str,
    rows: &'a [ParamRow],
}

#[derive(Serialize)]
struct BodyView<'a> {
    example_title: &'static str,
    fields_title: &'static str,
    projection: &'a Projection,
}

impl<'a> PageView<'a> {
    fn new(page: &'a ApiPage) -> Self {
        Self {
            title: &page.title,
            route_markdown: &page.route_markdown,
            groups: page.groups.iter().map(GroupView::new).collect(),
        }
    }
}

impl<'a> GroupView<'a> {
    fn new(group: &'a TagGroup) -> Self {
        let sections = group
            .sections
            .iter()
            .flat_map(TagSection::walk)
            .map(|(depth, section)| SectionView {
                name: &section.name,
                id: &section.id,
                path: &section.path,
                depth,
                indent: 14 * (depth + 1),
                item_indent: 28 + 14 * depth,
                endpoints: section.endpoints.iter().map(EndpointView::new).collect(),
            })
            .collect();
        Self {
            name: &group.name,
            id: &group.id,
            sections,
        }
    }
}

impl<'a> EndpointView<'a> {
    fn new(endpoint: &'a Endpoint) -> Self {
        let params = &endpoint.parameters;
        let param_tables = [
            ("Header Parameters", &params.headers),
            ("Path Parameters", &params.path),
            ("Query Parameters", &params.query),
        ]
        .into_iter()
        .filter(|(_, rows)| !rows.is_empty())
        .map(|(title, rows)| ParamTable { title, rows })
        .collect();

        let bodies = [
            ("Request Example", "Request Parameters", endpoint.request.as_ref()),
            ("Response Example", "Response Fields", endpoint.response.as_ref()),
        ]
        .into_iter()
        .filter_map(|(example_title, fields_title, projection)| {
            projection.map(|projection| BodyView {
                example_title,
                fields_title,
                projection,
            })
        })
        .collect();

        Self {
            endpoint,
            param_tables,
            bodies,
        }
    }
}
