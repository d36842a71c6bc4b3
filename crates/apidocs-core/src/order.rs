//! Declaration order of object keys, read from the raw document text.
//!
//! `serde_json::Value` maps sort their keys, so the order in which paths were
//! written is only recoverable by streaming the source.

use std::fmt;

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, Visitor};

/// Immediate child keys of the root object's `container` member, in the
/// order they appear in `raw`.
///
/// Returns an empty list when the root is not an object, `container` is
/// missing or not an object, or the text is malformed before it is reached.
/// Keys read before a later syntax error are kept. Only the first occurrence
/// of `container` is considered.
#[must_use]
pub fn ordered_top_level_keys(raw: &str, container: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut de = serde_json::Deserializer::from_str(raw);
    let seed = RootSeed {
        container,
        keys: &mut keys,
    };
    if let Err(err) = seed.deserialize(&mut de) {
        tracing::debug!(container, error = %err, collected = keys.len(), "key order scan stopped");
    }
    keys
}

struct RootSeed<'k> {
    container: &'k str,
    keys: &'k mut Vec<String>,
}

impl<'de> DeserializeSeed<'de> for RootSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for RootSeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let mut seen = false;
        while let Some(key) = map.next_key::<String>()? {
            if !seen && key == self.container {
                seen = true;
                map.next_value_seed(KeysSeed(&mut *self.keys))?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

struct KeysSeed<'k>(&'k mut Vec<String>);

impl<'de> DeserializeSeed<'de> for KeysSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for KeysSeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            self.0.push(key);
            map.next_value::<IgnoredAny>()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn keys_follow_source_order() {
        let raw = r#"{
            "openapi": "3.0.0",
            "paths": {
                "/b": { "get": { "summary": "{ not a brace }" } },
                "/a": { "post": {} },
                "/c": { "get": { "responses": { "200": [1, 2, {"x": null}] } } }
            },
            "components": {}
        }"#;
        assert_eq!(ordered_top_level_keys(raw, "paths"), vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn nested_container_is_ignored() {
        let raw = r#"{ "info": { "paths": { "/x": {} } }, "paths": { "/y": {} } }"#;
        assert_eq!(ordered_top_level_keys(raw, "paths"), vec!["/y"]);
    }

    #[test]
    fn first_container_wins() {
        let raw = r#"{ "paths": { "/one": {} }, "paths": { "/two": {} } }"#;
        assert_eq!(ordered_top_level_keys(raw, "paths"), vec!["/one"]);
    }

    #[test]
    fn missing_or_malformed_is_empty() {
        assert!(ordered_top_level_keys(r#"{ "info": {} }"#, "paths").is_empty());
        assert!(ordered_top_level_keys(r#"{ "info": { "#, "paths").is_empty());
        assert!(ordered_top_level_keys("", "paths").is_empty());
        assert!(ordered_top_level_keys(r#"["paths"]"#, "paths").is_empty());
        assert!(ordered_top_level_keys(r#"{ "paths": [] }"#, "paths").is_empty());
    }

    #[test]
    fn keys_before_a_syntax_error_are_kept() {
        let raw = r#"{ "paths": { "/first": {}, "/second": { "get": } } }"#;
        assert_eq!(ordered_top_level_keys(raw, "paths"), vec!["/first", "/second"]);
    }

    #[test]
    fn escaped_keys_are_decoded() {
        let raw = r#"{ "paths": { "/café": {}, "/a\"b": {} } }"#;
        assert_eq!(ordered_top_level_keys(raw, "paths"), vec!["/café", "/a\"b"]);
    }
}
