//! `namespace:path` identifiers and `namespace:id[k=v,...]` block state
//! strings, shared by the resource cache, the palette registry, and the
//! model resolver.

use std::collections::BTreeMap;

pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Splits `ns:path` into `(ns, path)`, defaulting the namespace to
/// `minecraft` when no `:` is present.
pub fn split_identifier(id: &str) -> (&str, &str) {
    match id.split_once(':') {
        Some((ns, path)) => (ns, path),
        None => (DEFAULT_NAMESPACE, id),
    }
}

pub fn qualify(id: &str) -> String {
    let (ns, path) = split_identifier(id);
    format!("{ns}:{path}")
}

/// Cosmetic properties that do not affect the visual model and would
/// needlessly fragment the palette.
const COSMETIC_KEYS: &[&str] = &["waterlogged", "distance", "persistent"];

/// A parsed `namespace:id[k1=v1,k2=v2,...]` block state string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedState {
    pub namespace: String,
    pub id: String,
    pub properties: BTreeMap<String, String>,
}

impl ParsedState {
    pub fn parse(raw: &str) -> ParsedState {
        let (body, props_str) = match raw.split_once('[') {
            Some((body, rest)) => (body, rest.strip_suffix(']').unwrap_or(rest)),
            None => (raw, ""),
        };
        let (namespace, id) = split_identifier(body);

        let mut properties = BTreeMap::new();
        if !props_str.is_empty() {
            for pair in props_str.split(',') {
                if let Some((k, v)) = pair.split_once('=') {
                    properties.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }

        ParsedState {
            namespace: namespace.to_string(),
            id: id.to_string(),
            properties,
        }
    }

    /// Properties with the cosmetic keys removed, for matching against
    /// blockstate `variants`/`multipart` clauses.
    pub fn visual_properties(&self) -> BTreeMap<&str, &str> {
        self.properties
            .iter()
            .filter(|(k, _)| !COSMETIC_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// The canonical name used to deduplicate the block palette: namespace
    /// defaulted, cosmetic keys stripped, properties sorted alphabetically
    /// (guaranteed by `BTreeMap`'s iteration order), separator `=`.
    pub fn canonical_name(&self) -> String {
        let props = self.visual_properties();
        if props.is_empty() {
            format!("{}:{}", self.namespace, self.id)
        } else {
            let joined = props
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}:{}[{}]", self.namespace, self.id, joined)
        }
    }

    /// The comma-joined `k=v` key used to match blockstate `variants` keys.
    pub fn sorted_props_key(&self) -> String {
        self.visual_properties()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_namespace() {
        let p = ParsedState::parse("stone");
        assert_eq!(p.namespace, "minecraft");
        assert_eq!(p.id, "stone");
    }

    #[test]
    fn strips_cosmetic_keys_and_sorts() {
        let a = ParsedState::parse("minecraft:oak_log[axis=y,waterlogged=true]");
        let b = ParsedState::parse("oak_log[waterlogged=false,axis=y]");
        assert_eq!(a.canonical_name(), b.canonical_name());
        assert_eq!(a.canonical_name(), "minecraft:oak_log[axis=y]");
    }

    #[test]
    fn canonicalization_is_order_independent() {
        let a = ParsedState::parse("minecraft:fence[east=true,north=false,west=true]");
        let b = ParsedState::parse("minecraft:fence[west=true,east=true,north=false]");
        assert_eq!(a.canonical_name(), b.canonical_name());
    }
}
