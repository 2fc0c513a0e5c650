//! Type registry for polymorphic decoding.
//!
//! Encoded documents carry their qualified type name under [`TYPE_TAG`]. The
//! registry maps that name back to a decode function so a document can be
//! read without the caller naming its type. Register every document type at
//! startup; lookups never fall back to guessing.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;
use serde_json::Value;

use crate::document::{AnyDocument, Document};
use crate::error::{CoreError, Result};

/// JSON field holding the qualified type name.
pub const TYPE_TAG: &str = "$type";

type DecodeFn = fn(Value) -> Result<Box<dyn AnyDocument>>;

/// Maps qualified type names to decoders.
pub struct TypeRegistry {
    decoders: RwLock<HashMap<&'static str, DecodeFn>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry consulted by [`Codec::decode_any`](crate::Codec::decode_any).
    pub fn global() -> &'static TypeRegistry {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(TypeRegistry::new)
    }

    /// Register `T` under its qualified type name. Re-registering is a no-op.
    pub fn register<T: Document>(&self) {
        self.decoders
            .write()
            .insert(T::qualified_type_name(), decode_as::<T>);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.decoders.read().contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.decoders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.read().is_empty()
    }

    /// Decode a tagged JSON object into its registered concrete type.
    pub fn decode(&self, value: Value) -> Result<Box<dyn AnyDocument>> {
        let type_name = value
            .get(TYPE_TAG)
            .and_then(Value::as_str)
            .ok_or(CoreError::MissingTypeTag)?
            .to_string();

        let decode = self
            .decoders
            .read()
            .get(type_name.as_str())
            .copied()
            .ok_or(CoreError::UnknownType(type_name))?;

        decode(value)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_as<T: Document>(mut value: Value) -> Result<Box<dyn AnyDocument>> {
    if let Value::Object(map) = &mut value {
        map.remove(TYPE_TAG);
    }
    let document: T = serde_json::from_value(value)?;
    Ok(Box::new(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMeta;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Cat {
        #[serde(flatten)]
        meta: DocumentMeta,
        lives: u8,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dog {
        #[serde(flatten)]
        meta: DocumentMeta,
        good: bool,
    }

    crate::impl_document!(Cat, meta);
    crate::impl_document!(Dog, meta);

    #[test]
    fn test_decode_by_tag() {
        let registry = TypeRegistry::new();
        registry.register::<Cat>();
        registry.register::<Dog>();
        assert_eq!(registry.len(), 2);

        let value = json!({
            "$type": Dog::qualified_type_name(),
            "_id": "rex",
            "good": true
        });

        let decoded = registry.decode(value).unwrap();
        assert_eq!(decoded.type_name(), Dog::qualified_type_name());
        let dog = decoded.downcast_ref::<Dog>().unwrap();
        assert_eq!(dog.meta.id, "rex");
        assert!(dog.good);
        assert!(decoded.downcast_ref::<Cat>().is_none());
    }

    #[test]
    fn test_missing_tag() {
        let registry = TypeRegistry::new();
        registry.register::<Cat>();
        let result = registry.decode(json!({ "_id": "tom", "lives": 9 }));
        assert!(matches!(result, Err(CoreError::MissingTypeTag)));
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::new();
        let result = registry.decode(json!({ "$type": "zoo::Yak", "_id": "y" }));
        match result {
            Err(CoreError::UnknownType(name)) => assert_eq!(name, "zoo::Yak"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_type_mismatch_is_serialization_error() {
        let registry = TypeRegistry::new();
        registry.register::<Cat>();
        let result = registry.decode(json!({
            "$type": Cat::qualified_type_name(),
            "_id": "tom",
            "lives": "many"
        }));
        assert!(matches!(result, Err(CoreError::Serialization(_))));
    }
}
