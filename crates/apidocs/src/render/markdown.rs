//! Markdown export of an [`ApiPage`].

use apidocs_core::{FieldDescriptor, Projection};

use super::{ApiPage, Endpoint, TagSection};
use crate::operation::ParamRow;

const TABLE_HEADER: &str = "| Name | Required | Type | Description |\n|---|---|---|---|\n";

/// Render the page as a single Markdown document.
///
/// Headings: `#` title, `##` group, `###` section, `####` endpoint and
/// `#####` for each block of an endpoint. Nested sections keep the `###`
/// level and are titled with their full path (`Admin/Roles`); sections
/// without endpoints of their own get no heading.
#[must_use]
pub fn render_markdown(page: &ApiPage) -> String {
    let mut out = format!("# {}\n\n", page.title);
    for group in &page.groups {
        out.push_str(&format!("## {}\n\n", group.name));
        for (_, section) in group.sections.iter().flat_map(TagSection::walk) {
            if section.endpoints.is_empty() {
                continue;
            }
            out.push_str(&format!("### {}\n\n", section.path));
            for endpoint in &section.endpoints {
                push_endpoint(&mut out, endpoint);
            }
        }
    }
    out
}

fn push_endpoint(out: &mut String, endpoint: &Endpoint) {
    out.push_str(&format!("#### {}\n\n", endpoint.summary));
    if let Some(description) = &endpoint.description {
        out.push_str(&format!("{description}\n\n"));
    }
    out.push_str(&format!("##### URL\n\n`{}`\n\n", endpoint.path));
    out.push_str(&format!(
        "##### Method\n\n- {}  Content-Type: {}\n\n",
        endpoint.method, endpoint.content_type
    ));

    let params = &endpoint.parameters;
    for (heading, rows) in [
        ("Header Parameters", &params.headers),
        ("Path Parameters", &params.path),
        ("Query Parameters", &params.query),
    ] {
        if !rows.is_empty() {
            out.push_str(&format!("##### {heading}\n\n{}\n", param_table(rows)));
        }
    }

    if let Some(request) = &endpoint.request {
        push_projection(out, request, "Request Example", "Request Parameters");
    }
    if let Some(response) = &endpoint.response {
        push_projection(out, response, "Response Example", "Response Fields");
    }
}

fn push_projection(out: &mut String, projection: &Projection, example: &str, fields: &str) {
    out.push_str(&format!(
        "##### {example}\n\n```json\n{}\n```\n\n",
        projection.example_json()
    ));
    out.push_str(&format!("##### {fields}\n\n{}\n", field_table(&projection.fields)));
}

fn param_table(rows: &[ParamRow]) -> String {
    let mut table = TABLE_HEADER.to_string();
    for row in rows {
        table.push_str(&table_row(&row.name, row.required, &row.ty, &row.description));
    }
    table
}

fn field_table(fields: &[FieldDescriptor]) -> String {
    let mut table = TABLE_HEADER.to_string();
    for field in fields {
        table.push_str(&table_row(
            &field.path,
            field.required,
            &field.ty,
            &field.description,
        ));
    }
    table
}

fn table_row(name: &str, required: bool, ty: &str, description: &str) -> String {
    format!(
        "| {} | {} | {} | {} |\n",
        cell(name),
        if required { "Yes" } else { "No" },
        cell(ty),
        cell(description)
    )
}

/// Keep a value on one table line.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::operation::Parameters;
    use crate::render::TagGroup;

    fn section(name: &str, path: &str, endpoints: Vec<Endpoint>, children: Vec<TagSection>) -> TagSection {
        TagSection {
            name: name.to_string(),
            path: path.to_string(),
            id: format!("group-sales-{}", path.to_lowercase().replace('/', "-")),
            endpoints,
            children,
        }
    }

    fn page_with(sections: Vec<TagSection>) -> ApiPage {
        ApiPage {
            title: "Shop".to_string(),
            route_markdown: "/docs.md".to_string(),
            groups: vec![TagGroup {
                name: "Sales".to_string(),
                id: "group-sales".to_string(),
                sections,
            }],
        }
    }

    fn page(endpoint: Endpoint) -> ApiPage {
        page_with(vec![section("Orders", "Orders", vec![endpoint], Vec::new())])
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            method: "GET".to_string(),
            path: "/orders/{id}".to_string(),
            summary: "Get order".to_string(),
            description: None,
            anchor: "get-orders-id".to_string(),
            content_type: "application/json".to_string(),
            parameters: Parameters::default(),
            request: None,
            response: None,
        }
    }

    #[test]
    fn endpoint_without_bodies() {
        let mut endpoint = endpoint();
        endpoint.parameters.path.push(ParamRow {
            name: "id".to_string(),
            required: true,
            ty: "string".to_string(),
            description: "order id | uuid".to_string(),
        });

        assert_eq!(
            render_markdown(&page(endpoint)),
            indoc! {r"
                # Shop

                ## Sales

                ### Orders

                #### Get order

                ##### URL

                `/orders/{id}`

                ##### Method

                - GET  Content-Type: application/json

                ##### Path Parameters

                | Name | Required | Type | Description |
                |---|---|---|---|
                | id | Yes | string | order id \| uuid |

            "}
        );
    }

    #[test]
    fn response_projection_block() {
        let mut endpoint = endpoint();
        endpoint.description = Some("Line one\nline two".to_string());
        endpoint.response = Some(Projection {
            fields: vec![FieldDescriptor {
                path: "code".to_string(),
                required: false,
                ty: "integer".to_string(),
                description: "status".to_string(),
            }],
            example: json!({ "code": 0 }),
        });

        let markdown = render_markdown(&page(endpoint));
        assert!(markdown.contains("Line one\nline two\n\n##### URL"));
        assert!(markdown.ends_with(indoc! {r#"
            ##### Response Example

            ```json
            {
                "code": 0
            }
            ```

            ##### Response Fields

            | Name | Required | Type | Description |
            |---|---|---|---|
            | code | No | integer | status |

        "#}));
    }

    #[test]
    fn nested_sections_use_full_path_headings() {
        let mut refund = endpoint();
        refund.summary = "Refund order".to_string();
        let page = page_with(vec![section(
            "Orders",
            "Orders",
            Vec::new(),
            vec![section("Refunds", "Orders/Refunds", vec![refund], Vec::new())],
        )]);

        let markdown = render_markdown(&page);
        assert!(markdown.starts_with("# Shop\n\n## Sales\n\n### Orders/Refunds\n\n#### Refund order\n\n"));
        assert!(!markdown.contains("### Orders\n"));
    }
}
