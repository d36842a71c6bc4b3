//! Allow-list filtering of field rows and example values.
//!
//! An allow-list holds two kinds of patterns:
//! - full paths, where `.items[]` and `[]` are equivalent
//!   (`data.departments.items[].address` ≡ `data.departments[].address`);
//! - bare leaf names (`code`), matching every scalar field of that name
//!   inside the payload subtree.
//!
//! Filtering is a pure prune. Envelope keys always survive, and an absent
//! allow-list (`None`) disables filtering entirely. An empty allow-list is
//! different: it hides everything except the envelope.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::flatten::{join_path, FieldDescriptor};

/// Default envelope keys kept by every filter.
pub const DEFAULT_ENVELOPE_KEYS: [&str; 3] = ["code", "message", "data"];

/// Default payload key whose subtree the allow-list applies to.
pub const DEFAULT_PAYLOAD_KEY: &str = "data";

/// Top-level response wrapper keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    keys: Vec<String>,
    payload: String,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(DEFAULT_ENVELOPE_KEYS, DEFAULT_PAYLOAD_KEY)
    }
}

impl Envelope {
    /// Envelope with the given wrapper keys and payload key.
    ///
    /// The payload key is always treated as an envelope key.
    #[must_use]
    pub fn new<I, S>(keys: I, payload: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if !payload.is_empty() && !keys.iter().any(|k| k == payload) {
            keys.push(payload.to_string());
        }
        Self {
            keys,
            payload: payload.to_string(),
        }
    }

    /// Whether `path` is exactly one of the envelope keys.
    #[must_use]
    pub fn is_envelope_key(&self, path: &str) -> bool {
        self.keys.iter().any(|k| k == path)
    }

    /// Wrapper keys, payload included.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The payload key (`data` by default).
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Whether `path` is the payload key or lies below it.
    fn contains(&self, path: &str) -> bool {
        if self.payload.is_empty() {
            return true;
        }
        path.strip_prefix(self.payload.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with("[]"))
    }
}

/// Normalized allow-list patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedPathSet {
    patterns: BTreeSet<String>,
}

impl AllowedPathSet {
    /// Normalize and collect patterns; empty patterns are dropped.
    ///
    /// When normalization changes a pattern, its original spelling is kept as
    /// well, so a field literally named `items` can still be addressed.
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for pattern in patterns {
            let raw = pattern.as_ref();
            if raw.is_empty() {
                continue;
            }
            let normalized = normalize_pattern(raw);
            if normalized != raw {
                set.insert(raw.to_string());
            }
            set.insert(normalized);
        }
        Self { patterns: set }
    }

    /// Whether no patterns were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `pattern` is in the set verbatim.
    #[must_use]
    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }

    /// Patterns in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    /// `path` itself, or one of its `[]` spellings, is allowed.
    fn matches_path(&self, path: &str) -> bool {
        self.contains(path)
            || self.contains(&normalize_pattern(path))
            || self.contains(&path.replace("[].", "[]"))
            || self.contains(&path.replace("[]", ""))
    }
}

impl<S: AsRef<str>> FromIterator<S> for AllowedPathSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Drop `.items` path segments and collapse repeated `[]` markers.
///
/// `data.list.items[].code` → `data.list[].code`. Only whole `items`
/// segments are removed; `data.itemsCount` is left alone.
#[must_use]
pub fn normalize_pattern(pattern: &str) -> String {
    const SEGMENT: &str = ".items";

    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(idx) = rest.find(SEGMENT) {
        let after = &rest[idx + SEGMENT.len()..];
        out.push_str(&rest[..idx]);
        let whole_segment = after.is_empty() || after.starts_with('.') || after.starts_with('[');
        if !whole_segment {
            out.push_str(SEGMENT);
        }
        rest = after;
    }
    out.push_str(rest);

    while out.contains("[][]") {
        out = out.replace("[][]", "[]");
    }
    out
}

/// Keep the field rows matching `allowed`.
///
/// `None` returns `fields` unchanged. Envelope rows are always kept. A row is
/// kept when its path equals a pattern or lies below one (`p.`, `p[]`), or
/// when a bare-name pattern equals its last segment, the row is inside the
/// payload subtree and its type is a leaf (not `object` / `array(object)`).
#[must_use]
pub fn filter_fields(
    fields: Vec<FieldDescriptor>,
    allowed: Option<&AllowedPathSet>,
    envelope: &Envelope,
) -> Vec<FieldDescriptor> {
    let Some(allowed) = allowed else {
        return fields;
    };
    fields
        .into_iter()
        .filter(|field| envelope.is_envelope_key(&field.path) || field_allowed(field, allowed, envelope))
        .collect()
}

fn field_allowed(field: &FieldDescriptor, allowed: &AllowedPathSet, envelope: &Envelope) -> bool {
    allowed.iter().any(|pattern| {
        path_within(&field.path, pattern) || leaf_name_matches(field, pattern, envelope)
    })
}

/// `path` equals `pattern` or is a descendant of it.
fn path_within(path: &str, pattern: &str) -> bool {
    path.strip_prefix(pattern)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with("[]"))
}

fn leaf_name_matches(field: &FieldDescriptor, pattern: &str, envelope: &Envelope) -> bool {
    if pattern.contains(['.', '[', ']']) || !envelope.contains(&field.path) {
        return false;
    }
    let last = field.path.rsplit('.').next().unwrap_or_default();
    last.replace("[]", "") == pattern && is_leaf_type(&field.ty)
}

fn is_leaf_type(ty: &str) -> bool {
    !(ty == "object" || ty.starts_with("object(") || ty.starts_with("array(object"))
}

/// Prune an example value with the same allow-list.
///
/// `None` returns `value` unchanged, as does a non-object root. Top-level
/// keys other than the payload are kept as they are; the payload subtree is
/// pruned with paths rooted at the payload key. Inside it a scalar survives
/// when its full path or bare key is allowed, a container survives whole when
/// its own path is allowed and otherwise only if something below it survives.
#[must_use]
pub fn filter_example(value: Value, allowed: Option<&AllowedPathSet>, envelope: &Envelope) -> Value {
    let Some(allowed) = allowed else {
        return value;
    };
    let Value::Object(map) = value else {
        return value;
    };

    let payload = envelope.payload();
    let filtered = map
        .into_iter()
        .map(|(key, value)| {
            if key == payload {
                let pruned = prune(value, allowed, &key);
                (key, pruned)
            } else {
                (key, value)
            }
        })
        .collect();
    Value::Object(filtered)
}

fn prune(value: Value, allowed: &AllowedPathSet, path: &str) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let child_path = join_path(path, &key);
                if child.is_object() || child.is_array() {
                    if allowed.matches_path(&child_path) {
                        out.insert(key, child);
                        continue;
                    }
                    let pruned = prune(child, allowed, &child_path);
                    if is_non_empty(&pruned) {
                        out.insert(key, pruned);
                    }
                } else if allowed.contains(&key) || allowed.matches_path(&child_path) {
                    out.insert(key, child);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let Some(first) = items.into_iter().next() else {
                return Value::Array(Vec::new());
            };
            let item_path = format!("{path}[]");
            let pruned = if allowed.matches_path(&item_path) {
                first
            } else {
                prune(first, allowed, &item_path)
            };
            if is_non_empty(&pruned) {
                Value::Array(vec![pruned])
            } else {
                Value::Array(Vec::new())
            }
        }
        leaf => leaf,
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Null => false,
        _ => true,
    }
}
