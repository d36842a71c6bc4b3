//! HTTP routes serving the rendered documentation.
//!
//! Two `GET` routes, both configurable through [`ProjectConfig`]:
//!
//! | Route (default) | Body |
//! |---|---|
//! | `/docs` | HTML page |
//! | `/docs.md` | Markdown export, served as an attachment |
//!
//! The document is chosen per request:
//!
//! 1. `?src=<path or url>` renders that document.
//! 2. Otherwise, with `domain` and `path` configured, the document at
//!    `http://domain[:port]/path` is fetched; every query parameter of the
//!    request except `src` is forwarded to it.
//! 3. Otherwise the document loaded at startup is rendered.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::render::{build_page, render_markdown, HtmlRenderer};
use crate::source::{self, LoadedSpec};

/// Response header naming the `src` the page was rendered from.
pub const SOURCE_HEADER: &str = "x-openapi-source";

/// Response header carrying the number of documented paths.
pub const PATHS_COUNT_HEADER: &str = "x-paths-count";

/// Query parameter selecting the document to render.
const SRC_PARAM: &str = "src";

/// Shared state of the docs routes.
#[derive(Clone)]
pub struct AppState {
    spec: Option<Arc<LoadedSpec>>,
    config: Arc<ProjectConfig>,
    renderer: Arc<HtmlRenderer>,
    client: reqwest::Client,
}

impl AppState {
    /// State serving `spec` by default. Without one, requests need `?src=`
    /// or a configured upstream.
    ///
    /// # Errors
    ///
    /// Template errors from [`HtmlRenderer::with_template_dir`] for the
    /// configured `template_dir`.
    pub fn new(spec: Option<LoadedSpec>, config: ProjectConfig) -> Result<Self> {
        let renderer = HtmlRenderer::with_template_dir(config.template_dir.as_deref())?;
        Ok(Self {
            spec: spec.map(Arc::new),
            config: Arc::new(config),
            renderer: Arc::new(renderer),
            client: reqwest::Client::new(),
        })
    }

    /// The rendering config.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }
}

/// Build the docs router.
pub fn router(state: AppState) -> Router {
    let config = state.config();
    Router::new()
        .route(&config.route_docs, get(docs_html))
        .route(&config.route_markdown, get(docs_markdown))
        .with_state(state)
}

type DocsQuery = Query<Vec<(String, String)>>;

async fn docs_html(
    State(state): State<AppState>,
    Query(query): DocsQuery,
) -> std::result::Result<Response, DocsError> {
    let (spec, src) = resolve_spec(&state, &query).await?;
    let page = build_page(&spec, state.config());
    let html = state.renderer.render(&page)?;
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        ),
        (HeaderName::from_static(SOURCE_HEADER), header_value(&src)),
        (
            HeaderName::from_static(PATHS_COUNT_HEADER),
            HeaderValue::from(paths_count(&spec)),
        ),
    ];
    Ok((headers, html).into_response())
}

async fn docs_markdown(
    State(state): State<AppState>,
    Query(query): DocsQuery,
) -> std::result::Result<Response, DocsError> {
    let (spec, src) = resolve_spec(&state, &query).await?;
    let page = build_page(&spec, state.config());
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/markdown; charset=utf-8"),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=api-docs.md"),
        ),
        (HeaderName::from_static(SOURCE_HEADER), header_value(&src)),
        (
            HeaderName::from_static(PATHS_COUNT_HEADER),
            HeaderValue::from(paths_count(&spec)),
        ),
    ];
    Ok((headers, render_markdown(&page)).into_response())
}

/// The document to render and the source it came from.
async fn resolve_spec(
    state: &AppState,
    query: &[(String, String)],
) -> std::result::Result<(Arc<LoadedSpec>, String), DocsError> {
    let src = query
        .iter()
        .find(|(key, value)| key == SRC_PARAM && !value.trim().is_empty())
        .map(|(_, value)| value.clone());
    if let Some(src) = src {
        tracing::info!(src = %src, "rendering requested source");
        let spec = source::load_async(&state.client, &src).await?;
        return Ok((Arc::new(spec), src));
    }

    if let Some(base) = state.config.upstream_base() {
        let url = upstream_url(&base, query)?;
        tracing::info!(url = %url, "rendering upstream document");
        let spec = source::fetch(&state.client, &url).await?;
        return Ok((Arc::new(spec), url));
    }

    let spec = state.spec.clone().ok_or_else(|| DocsError {
        status: StatusCode::NOT_FOUND,
        message: "no OpenAPI document loaded; pass ?src=<path>".to_string(),
    })?;
    Ok((spec, String::new()))
}

/// `base` with every query pair except `src` appended.
fn upstream_url(base: &str, query: &[(String, String)]) -> std::result::Result<String, DocsError> {
    let forwarded = query.iter().filter(|(key, _)| key != SRC_PARAM);
    reqwest::Url::parse_with_params(base, forwarded)
        .map(String::from)
        .map_err(|err| DocsError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("invalid upstream URL {base}: {err}"),
        })
}

fn paths_count(spec: &LoadedSpec) -> usize {
    spec.document.paths().map_or(0, serde_json::Map::len)
}

fn header_value(text: &str) -> HeaderValue {
    HeaderValue::from_str(text).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// JSON error response of the docs routes.
///
/// ```json
/// { "error": { "code": 404, "message": "..." } }
/// ```
#[derive(Debug, Clone)]
pub struct DocsError {
    status: StatusCode,
    message: String,
}

impl DocsError {
    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for DocsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for DocsError {}

impl From<Error> for DocsError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            Error::RemoteSource { .. } => StatusCode::BAD_REQUEST,
            Error::Http(_) | Error::RemoteStatus { .. } => StatusCode::BAD_GATEWAY,
            Error::Json(_) | Error::EmptySource { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for DocsError {
    fn into_response(self) -> Response {
        tracing::debug!(status = self.status.as_u16(), message = %self.message, "docs request failed");
        let body = serde_json::json!({
            "error": {
                "code": self.status.as_u16(),
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}
