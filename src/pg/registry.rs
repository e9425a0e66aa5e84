//! Type name to OID resolution.
//!
//! Binary array encoding needs the element type's OID. Values only know the
//! element type by name, so the caller supplies a registry to resolve it.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::types::Oid;

static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

const BUILTIN_TYPES: &[(&str, Oid)] = &[
    ("bool", Oid::BOOL),
    ("bytea", Oid::BYTEA),
    ("char", Oid::CHAR),
    ("name", Oid::NAME),
    ("int8", Oid::INT8),
    ("int2", Oid::INT2),
    ("int4", Oid::INT4),
    ("text", Oid::TEXT),
    ("json", Oid::JSON),
    ("float4", Oid::FLOAT4),
    ("float8", Oid::FLOAT8),
    ("bpchar", Oid::BPCHAR),
    ("varchar", Oid::VARCHAR),
    ("timestamptz", Oid::TIMESTAMPTZ),
    ("uuid", Oid::UUID),
    ("xid8", Oid::XID8),
    ("_json", Oid::JSON_ARRAY),
    ("_xid8", Oid::XID8_ARRAY),
    ("_bool", Oid::BOOL_ARRAY),
    ("_bytea", Oid::BYTEA_ARRAY),
    ("_int2", Oid::INT2_ARRAY),
    ("_int4", Oid::INT4_ARRAY),
    ("_text", Oid::TEXT_ARRAY),
    ("_bpchar", Oid::BPCHAR_ARRAY),
    ("_varchar", Oid::VARCHAR_ARRAY),
    ("_int8", Oid::INT8_ARRAY),
    ("_float4", Oid::FLOAT4_ARRAY),
    ("_float8", Oid::FLOAT8_ARRAY),
    ("_timestamptz", Oid::TIMESTAMPTZ_ARRAY),
    ("_uuid", Oid::UUID_ARRAY),
];

/// Bidirectional map between type names and OIDs.
///
/// Extension types (`ltree`, ...) have per-database OIDs and must be
/// registered once the connection has looked them up.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_name: HashMap<String, Oid>,
    by_oid: HashMap<Oid, String>,
}

impl TypeRegistry {
    /// Create a registry holding the built-in types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (name, oid) in BUILTIN_TYPES {
            registry.register(name, *oid);
        }
        registry
    }

    /// Create a registry with no types at all.
    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            by_oid: HashMap::new(),
        }
    }

    /// Shared registry of built-in types.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    /// Register (or re-register) a type.
    pub fn register(&mut self, name: &str, oid: Oid) {
        if let Some(previous) = self.by_name.insert(name.to_string(), oid) {
            // the old OID may have been taken over by another name since
            if self.by_oid.get(&previous).map(String::as_str) == Some(name) {
                self.by_oid.remove(&previous);
            }
        }
        self.by_oid.insert(oid, name.to_string());
    }

    #[inline]
    pub fn oid_for_name(&self, name: &str) -> Option<Oid> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn name_for_oid(&self, oid: Oid) -> Option<&str> {
        self.by_oid.get(&oid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.oid_for_name("int4"), Some(Oid::INT4));
        assert_eq!(registry.name_for_oid(Oid::TEXT_ARRAY), Some("_text"));
        assert_eq!(registry.oid_for_name("ltree"), None);
    }

    #[test]
    fn test_register_extension_type() {
        let mut registry = TypeRegistry::empty();
        assert!(registry.is_empty());

        registry.register("ltree", Oid(16_384));
        assert_eq!(registry.oid_for_name("ltree"), Some(Oid(16_384)));

        // Re-registering moves the reverse mapping
        registry.register("ltree", Oid(16_400));
        assert_eq!(registry.name_for_oid(Oid(16_384)), None);
        assert_eq!(registry.name_for_oid(Oid(16_400)), Some("ltree"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregister_keeps_other_owner() {
        let mut registry = TypeRegistry::empty();
        registry.register("a", Oid(1));
        registry.register("b", Oid(1));
        registry.register("a", Oid(2));

        assert_eq!(registry.oid_for_name("b"), Some(Oid(1)));
        assert_eq!(registry.name_for_oid(Oid(1)), Some("b"));
        assert_eq!(registry.name_for_oid(Oid(2)), Some("a"));
    }

    #[test]
    fn test_global_is_builtin() {
        assert_eq!(TypeRegistry::global().oid_for_name("uuid"), Some(Oid::UUID));
    }
}
