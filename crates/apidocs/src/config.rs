//! Project-level rendering configuration loaded from YAML.
//!
//! Controls the page title, server routes, the response envelope and
//! per-path customization rules (injected headers and field allow-lists).
//!
//! # File format
//!
//! ```yaml
//! # apidocs.yaml
//! title: Orders API
//! route_docs: /docs
//! route_markdown: /docs.md
//!
//! # Wrapper keys that are never filtered out.
//! envelope:
//!   keys: [code, message, data]
//!   payload: data
//!
//! # Keyed by URL template pattern; `*` matches any run of characters.
//! # Serve a live service's document: without `?src=`, requests render
//! # http://localhost:8081/openapi.json, forwarding their query parameters.
//! domain: localhost
//! port: 8081
//! path: /openapi.json
//!
//! # Directory with `<name>.hbs` files replacing the built-in HTML templates.
//! template_dir: ./doc-templates
//!
//! customize:
//!   "/v1/orders/*":
//!     headers:
//!       accessToken: "string#required#token returned by login"
//!     response:
//!       - data.items[].id
//!       - status
//! ```
//!
//! A rule without `request` / `response` leaves that body unfiltered. An
//! empty list hides everything except the envelope keys.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use apidocs_core::{AllowedPathSet, Envelope};
use serde::Deserialize;

/// Default HTML documentation route.
pub const DEFAULT_ROUTE_DOCS: &str = "/docs";

/// Default Markdown export route.
pub const DEFAULT_ROUTE_MARKDOWN: &str = "/docs.md";

/// Project-level rendering config.
///
/// Loaded from a YAML file via [`ProjectConfig::load`]; every field has a
/// default, so `{}` is a valid config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Page title. Falls back to `info.title` of the document.
    pub title: Option<String>,

    /// Route serving the HTML page.
    pub route_docs: String,

    /// Route serving the Markdown export.
    pub route_markdown: String,

    /// Host of the service whose document is rendered when a request has
    /// no `src`. Used together with [`path`](Self::path).
    pub domain: Option<String>,

    /// Port of the upstream service.
    pub port: Option<u16>,

    /// Path of the document on the upstream service.
    pub path: Option<String>,

    /// Directory holding HTML template overrides (`layout.hbs`, ...).
    pub template_dir: Option<PathBuf>,

    /// Response envelope recognized by the allow-list filter.
    pub envelope: EnvelopeConfig,

    /// Customization rules keyed by URL template pattern.
    pub customize: BTreeMap<String, CustomizeRule>,
}

/// Envelope keys as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Top-level wrapper keys that always survive filtering.
    pub keys: Vec<String>,
    /// Key holding the payload the allow-list applies to.
    pub payload: String,
}

/// Headers to inject and allow-lists to apply for matching paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomizeRule {
    /// Header name → `type#required#description` spec.
    pub headers: BTreeMap<String, String>,
    /// Request body allow-list; `None` disables filtering.
    ///
    /// An empty list (`request: []`) hides every body field except the
    /// envelope keys. Older generators treated an empty list as "no
    /// filtering"; omit the key to get that behavior.
    pub request: Option<Vec<String>>,
    /// Response body allow-list; `None` disables filtering.
    ///
    /// An empty list (`response: []`) hides everything except the envelope
    /// keys, leaving `data` as an empty object. Older generators treated an
    /// empty list as "no filtering"; omit the key to get that behavior.
    pub response: Option<Vec<String>>,
}

/// All rules matching one path, merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRules {
    /// Injected headers; the first definition of a name wins.
    pub headers: BTreeMap<String, HeaderSpec>,
    /// Merged request allow-list, if any matching rule sets one.
    pub request: Option<Vec<String>>,
    /// Merged response allow-list, if any matching rule sets one.
    pub response: Option<Vec<String>>,
}

impl ResolvedRules {
    /// Normalized request allow-list.
    #[must_use]
    pub fn request_allowed(&self) -> Option<AllowedPathSet> {
        self.request.as_ref().map(AllowedPathSet::new)
    }

    /// Normalized response allow-list.
    #[must_use]
    pub fn response_allowed(&self) -> Option<AllowedPathSet> {
        self.response.as_ref().map(AllowedPathSet::new)
    }
}

/// Parsed `type#required#description` header spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSpec {
    /// Type label, e.g. `string`.
    pub ty: String,
    /// Whether the header is mandatory.
    pub required: bool,
    /// Free-text description.
    pub description: String,
}

impl HeaderSpec {
    /// Parse `type#required#desc`, `type#optional#desc` or `type#desc`.
    ///
    /// `required` / `必选` mark the header mandatory, `optional` / `可选`
    /// optional (case-insensitive). Anything else in the second slot is taken
    /// as the description.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let mut parts = spec.split('#');
        let ty = parts.next().unwrap_or_default().to_string();
        let second = parts.next();
        let third = parts.next();

        let Some(second) = second else {
            return Self {
                ty,
                ..Self::default()
            };
        };

        let (required, description) = match second.trim().to_lowercase().as_str() {
            "required" | "必选" => (true, third.unwrap_or_default()),
            "optional" | "可选" => (false, third.unwrap_or_default()),
            _ if second.is_empty() => (false, third.unwrap_or_default()),
            _ => (false, second),
        };

        Self {
            ty,
            required,
            description: description.to_string(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            title: None,
            route_docs: DEFAULT_ROUTE_DOCS.to_string(),
            route_markdown: DEFAULT_ROUTE_MARKDOWN.to_string(),
            domain: None,
            port: None,
            path: None,
            template_dir: None,
            envelope: EnvelopeConfig::default(),
            customize: BTreeMap::new(),
        }
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        let envelope = Envelope::default();
        Self {
            keys: envelope.keys().to_vec(),
            payload: envelope.payload().to_string(),
        }
    }
}

impl EnvelopeConfig {
    /// Build the filter envelope.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.keys.iter().cloned(), &self.payload)
    }
}

impl ProjectConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Set the page title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// `http://domain[:port]/path` of the upstream document, if both a
    /// domain and a path are configured.
    #[must_use]
    pub fn upstream_base(&self) -> Option<String> {
        let domain = self.domain.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
        let path = self.path.as_deref().map(str::trim).filter(|p| !p.is_empty())?;

        let mut base = format!("http://{domain}");
        if let Some(port) = self.port {
            base.push_str(&format!(":{port}"));
        }
        if !path.starts_with('/') {
            base.push('/');
        }
        base.push_str(path);
        Some(base)
    }

    /// Merge every rule whose pattern matches `path`.
    ///
    /// Patterns are visited in lexicographic order. Header names keep their
    /// first definition; allow-lists are concatenated without duplicates or
    /// empty entries, keeping first-seen order.
    #[must_use]
    pub fn rules_for(&self, path: &str) -> ResolvedRules {
        let mut resolved = ResolvedRules::default();
        for (pattern, rule) in &self.customize {
            if !path_like_match(pattern, path) {
                continue;
            }
            tracing::debug!(pattern, path, "customization rule applies");
            for (name, spec) in &rule.headers {
                resolved
                    .headers
                    .entry(name.clone())
                    .or_insert_with(|| HeaderSpec::parse(spec));
            }
            if let Some(list) = &rule.request {
                unique_merge(resolved.request.get_or_insert_with(Vec::new), list);
            }
            if let Some(list) = &rule.response {
                unique_merge(resolved.response.get_or_insert_with(Vec::new), list);
            }
        }
        resolved
    }
}

/// Match a URL template against a pattern with `*` wildcards.
///
/// An empty pattern never matches. Without `*` the pattern must equal the
/// path. Otherwise the literal pieces between wildcards must occur in the
/// path in order.
#[must_use]
pub fn path_like_match(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    if !pattern.contains('*') {
        return pattern == path;
    }
    let mut rest = path;
    for piece in pattern.split('*').filter(|s| !s.is_empty()) {
        let Some(idx) = rest.find(piece) else {
            return false;
        };
        rest = &rest[idx + piece.len()..];
    }
    true
}

fn unique_merge(into: &mut Vec<String>, from: &[String]) {
    for item in from {
        if !item.is_empty() && !into.contains(item) {
            into.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn deserialize_defaults() {
        let config: ProjectConfig = serde_yaml_ng::from_str("{}").unwrap();
        assert!(config.title.is_none());
        assert_eq!(config.route_docs, "/docs");
        assert_eq!(config.route_markdown, "/docs.md");
        assert_eq!(config.envelope.keys, vec!["code", "message", "data"]);
        assert_eq!(config.envelope.payload, "data");
        assert!(config.customize.is_empty());
        assert!(config.upstream_base().is_none());
        assert!(config.template_dir.is_none());
    }

    #[test]
    fn deserialize_full() {
        let yaml = r#"
title: Orders API
route_docs: /reference
envelope:
  keys: [status]
  payload: result
customize:
  "/v1/orders/*":
    headers:
      accessToken: "string#required#login token"
    response:
      - result.id
  "/v1/users":
    request: []
"#;
        let config: ProjectConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.title.as_deref(), Some("Orders API"));
        assert_eq!(config.route_docs, "/reference");
        // Unset fields keep defaults
        assert_eq!(config.route_markdown, "/docs.md");
        assert_eq!(config.envelope.keys, vec!["status"]);

        let envelope = config.envelope.envelope();
        assert!(envelope.is_envelope_key("result"));
        assert_eq!(envelope.payload(), "result");

        let orders = &config.customize["/v1/orders/*"];
        assert_eq!(orders.headers["accessToken"], "string#required#login token");
        assert!(orders.request.is_none());
        assert_eq!(orders.response, Some(vec!["result.id".to_string()]));
        assert_eq!(config.customize["/v1/users"].request, Some(Vec::new()));
    }

    #[test]
    fn glob_matching() {
        assert!(path_like_match("/v1/orders", "/v1/orders"));
        assert!(!path_like_match("/v1/orders", "/v1/orders/1"));
        assert!(path_like_match("/v1/*", "/v1/orders/{id}"));
        assert!(path_like_match("*", "/anything"));
        assert!(path_like_match("/v1/*/items/*", "/v1/orders/items/7"));
        assert!(!path_like_match("/v1/*/items", "/v1/orders/lines"));
        assert!(!path_like_match("/b*/a", "/a/b"));
        assert!(!path_like_match("", "/v1/orders"));
    }

    #[test]
    fn header_spec_parsing() {
        assert_eq!(
            HeaderSpec::parse("string#required#login token"),
            HeaderSpec {
                ty: "string".to_string(),
                required: true,
                description: "login token".to_string(),
            }
        );
        assert_eq!(
            HeaderSpec::parse("string#必选#令牌"),
            HeaderSpec {
                ty: "string".to_string(),
                required: true,
                description: "令牌".to_string(),
            }
        );
        assert_eq!(
            HeaderSpec::parse("integer#Optional#page size"),
            HeaderSpec {
                ty: "integer".to_string(),
                required: false,
                description: "page size".to_string(),
            }
        );
        assert_eq!(
            HeaderSpec::parse("string#tenant id"),
            HeaderSpec {
                ty: "string".to_string(),
                required: false,
                description: "tenant id".to_string(),
            }
        );
        assert_eq!(HeaderSpec::parse("string").ty, "string");
        assert!(!HeaderSpec::parse("string").required);
        assert_eq!(HeaderSpec::parse("string#optional").description, "");
    }

    #[test]
    fn rules_merge_in_pattern_order() {
        let yaml = r#"
customize:
  "/v1/*":
    headers:
      token: "string#required#broad"
    response: [data.a, "", data.b]
  "/v1/orders*":
    headers:
      token: "string#optional#narrow"
      tenant: "string#tenant"
    response: [data.b, data.c]
  "/v2/*":
    request: [x]
"#;
        let config: ProjectConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let rules = config.rules_for("/v1/orders/{id}");

        assert_eq!(rules.headers.len(), 2);
        assert_eq!(rules.headers["token"].description, "broad");
        assert!(rules.headers["token"].required);
        assert_eq!(rules.headers["tenant"].description, "tenant");
        assert!(rules.request.is_none());
        assert!(rules.request_allowed().is_none());
        assert_eq!(
            rules.response,
            Some(vec![
                "data.a".to_string(),
                "data.b".to_string(),
                "data.c".to_string(),
            ])
        );
    }

    #[test]
    fn unmatched_path_has_no_rules() {
        let config = ProjectConfig::default();
        assert_eq!(config.rules_for("/v1/orders"), ResolvedRules::default());
    }

    #[test]
    fn title_override() {
        let config = ProjectConfig::default().with_title("Internal API");
        assert_eq!(config.title.as_deref(), Some("Internal API"));
    }

    #[test]
    fn upstream_base_url() {
        let config: ProjectConfig = serde_yaml_ng::from_str(indoc::indoc! {"
            domain: api.internal
            port: 8081
            path: openapi.json
            template_dir: ./templates
        "})
        .unwrap();
        assert_eq!(
            config.upstream_base().as_deref(),
            Some("http://api.internal:8081/openapi.json")
        );
        assert_eq!(config.template_dir, Some(PathBuf::from("./templates")));

        let no_port = ProjectConfig {
            port: None,
            path: Some("/v3/api-docs".to_string()),
            ..config.clone()
        };
        assert_eq!(
            no_port.upstream_base().as_deref(),
            Some("http://api.internal/v3/api-docs")
        );

        let no_path = ProjectConfig {
            path: Some("  ".to_string()),
            ..config.clone()
        };
        assert!(no_path.upstream_base().is_none());

        let no_domain = ProjectConfig {
            domain: None,
            ..config
        };
        assert!(no_domain.upstream_base().is_none());
    }
}
