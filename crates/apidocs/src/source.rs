//! Loading `OpenAPI` JSON documents from local files and `http(s)` URLs.

use std::path::Path;

use apidocs_core::{ordered_top_level_keys, Document};

use crate::error::{Error, Result};

/// A parsed document together with the text it was parsed from.
///
/// The raw text is kept because it is the only place the declaration order of
/// `paths` survives.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    /// Parsed document.
    pub document: Document,
    /// Original JSON text.
    pub raw: String,
}

impl LoadedSpec {
    /// Parse `raw` as a JSON document. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// [`Error::EmptySource`] for blank text, [`Error::Json`] for invalid JSON.
    pub fn from_content(raw: String, origin: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::EmptySource {
                source_path: origin.to_string(),
            });
        }
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(Self {
            document: Document::new(value),
            raw,
        })
    }

    /// `paths` keys in declaration order.
    ///
    /// Keys the streaming scan missed (e.g. after a late syntax error) are
    /// appended in sorted order; if the scan found nothing the sorted parsed
    /// keys are used as they are.
    #[must_use]
    pub fn ordered_paths(&self) -> Vec<String> {
        let Some(paths) = self.document.paths() else {
            return Vec::new();
        };
        let mut ordered: Vec<String> = ordered_top_level_keys(&self.raw, "paths")
            .into_iter()
            .filter(|key| paths.contains_key(key))
            .collect();
        if ordered.is_empty() && !paths.is_empty() {
            tracing::debug!("no declaration order recovered, using sorted path keys");
        }
        for key in paths.keys() {
            if !ordered.contains(key) {
                ordered.push(key.clone());
            }
        }
        ordered
    }
}

/// Normalize a user-supplied source string into a local path or URL.
///
/// Trims whitespace, drops a leading `#` / `#/`, cuts any `#fragment` (such
/// as an editor's `#L10-20`), strips `file://` and the leading `/` of a
/// Windows drive path (`/C:/specs/api.json`).
#[must_use]
pub fn normalize_source(src: &str) -> String {
    let mut s = src.trim();
    s = s.strip_prefix('#').unwrap_or(s);
    if let Some(idx) = s.find('#') {
        s = &s[..idx];
    }
    s = strip_drive_slash(s);
    if s.get(..7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("file://")) {
        s = strip_drive_slash(&s[7..]);
    }
    s.to_string()
}

fn strip_drive_slash(s: &str) -> &str {
    if s.starts_with('/') && s.as_bytes().get(2) == Some(&b':') {
        &s[1..]
    } else {
        s
    }
}

/// Whether `src` names an `http(s)` resource.
#[must_use]
pub fn is_remote(src: &str) -> bool {
    src.get(..4).is_some_and(|scheme| scheme.eq_ignore_ascii_case("http"))
}

/// Load and parse a document from a local path.
///
/// Blocking and local only; `load_async` (feature `remote`) also
/// fetches `http(s)` URLs.
///
/// # Errors
///
/// - [`Error::RemoteSource`] for `http(s)` sources
/// - [`Error::Io`] if the file cannot be read
/// - [`Error::EmptySource`] if the file is empty
/// - [`Error::Json`] if the content is not valid JSON
pub fn load(src: &str) -> Result<LoadedSpec> {
    let normalized = normalize_source(src);
    if is_remote(&normalized) {
        return Err(Error::RemoteSource { url: normalized });
    }
    tracing::debug!(source = %normalized, "loading OpenAPI document");
    let raw = std::fs::read_to_string(Path::new(&normalized))?;
    LoadedSpec::from_content(raw, &normalized)
}

/// Load and parse a document from a local path or an `http(s)` URL.
///
/// # Errors
///
/// - [`Error::Http`] if the request fails
/// - [`Error::RemoteStatus`] if the server answers with anything but `200`
/// - [`Error::Io`] if a local file cannot be read
/// - [`Error::EmptySource`] / [`Error::Json`] for bad content
#[cfg(feature = "remote")]
pub async fn load_async(client: &reqwest::Client, src: &str) -> Result<LoadedSpec> {
    let normalized = normalize_source(src);
    if is_remote(&normalized) {
        return fetch(client, &normalized).await;
    }
    tracing::debug!(source = %normalized, "loading OpenAPI document");
    let raw = tokio::fs::read_to_string(Path::new(&normalized)).await?;
    LoadedSpec::from_content(raw, &normalized)
}

/// Fetch and parse a document over HTTP.
///
/// # Errors
///
/// [`Error::Http`] on transport failure, [`Error::RemoteStatus`] for any
/// status other than `200 OK`, then the parse errors of
/// [`LoadedSpec::from_content`].
#[cfg(feature = "remote")]
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<LoadedSpec> {
    tracing::debug!(url, "fetching OpenAPI document");
    let response = client.get(url).send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::RemoteStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let raw = response.text().await?;
    LoadedSpec::from_content(raw, url)
}
