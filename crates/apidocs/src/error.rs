//! Typed error enum for the `apidocs` library API.
//!
//! The projection engine itself never fails; errors come from loading
//! documents, configuration and templates. The CLI (`main.rs`) converts these to
//! `anyhow::Error` at the binary boundary for richer context messages.

/// Errors produced by `apidocs` library operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// File I/O failure (reading a document or config file).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON.
    #[error("invalid OpenAPI JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Config YAML parsing failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),

    /// The source resolved to an empty document.
    #[error("empty content from {source_path}")]
    EmptySource {
        /// Normalized source path.
        source_path: String,
    },

    /// An `http(s)` URL was given to the blocking, local-only loader.
    #[error("remote sources need the async loader: {url}")]
    RemoteSource {
        /// The rejected URL.
        url: String,
    },

    /// HTTP transport failure while fetching a remote document.
    #[cfg(feature = "remote")]
    #[error("failed to fetch OpenAPI document: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote server answered with a status other than `200 OK`.
    #[error("{url} returned HTTP {status}")]
    RemoteStatus {
        /// The requested URL.
        url: String,
        /// Status code of the response.
        status: u16,
    },

    /// An HTML template failed to parse.
    #[error(transparent)]
    Template(#[from] handlebars::TemplateError),

    /// Rendering the HTML page failed.
    #[error(transparent)]
    Render(#[from] handlebars::RenderError),

    /// A component named on the command line does not exist.
    #[error("schema '{name}' not found in components.schemas")]
    SchemaNotFound {
        /// The requested component name or `$ref`.
        name: String,
    },
}

/// Convenience alias used throughout the library's public API.
pub type Result<T> = std::result::Result<T, Error>;
