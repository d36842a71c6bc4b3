//! Render `OpenAPI` JSON documents as grouped HTML and Markdown reference pages.
//!
//! The heavy lifting (resolving `$ref`s, flattening bodies into field tables,
//! building examples, allow-list filtering) lives in [`apidocs_core`], re-exported
//! here as [`engine`]. This crate adds everything around it:
//!
//! - [`source`]: loading a document (local file or `http(s)` URL) and
//!   recovering its `paths` order
//! - [`config`]: YAML config with per-path header injection and allow-lists
//! - [`operation`]: picking body schemas and parameter tables per operation
//! - [`render`]: the page model, its Markdown export and the templated HTML page
//! - `server` (feature `server`): `axum` routes serving both renderings
//!
//! ```
//! use apidocs::{build_page, render_markdown, LoadedSpec, ProjectConfig};
//!
//! let raw = r#"{
//!     "info": { "title": "Shop" },
//!     "paths": { "/health": { "get": { "summary": "Health check" } } }
//! }"#;
//! let spec = LoadedSpec::from_content(raw.to_string(), "inline")?;
//! let page = build_page(&spec, &ProjectConfig::default());
//! assert!(render_markdown(&page).contains("#### Health check"));
//! # Ok::<(), apidocs::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
mod error;
pub mod operation;
pub mod render;
#[cfg(feature = "server")]
pub mod server;
pub mod source;

pub use apidocs_core as engine;

pub use config::{CustomizeRule, HeaderSpec, ProjectConfig, ResolvedRules};
pub use error::{Error, Result};
pub use render::{build_page, render_html, render_markdown, ApiPage, HtmlRenderer};
#[cfg(feature = "remote")]
pub use source::load_async;
pub use source::{load, LoadedSpec};
