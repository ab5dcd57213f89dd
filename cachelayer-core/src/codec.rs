//! Registry of application-defined value types.
//!
//! Custom values travel as documents of the shape `{"$type": <name>, "$value": <payload>}`.
//! Registering a [`CustomType`] under that name lets equality and cloning defer to the
//! type instead of comparing the payload structurally.

use bson::{Bson, Document};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, LazyLock},
};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Behaviour of a registered custom value type.
pub trait CustomType: Send + Sync + Debug {
    /// Compares two payloads of this type.
    fn equals(&self, a: &Bson, b: &Bson) -> bool;

    /// Copies a payload of this type.
    fn clone_value(&self, value: &Bson) -> Bson {
        value.clone()
    }
}

/// Name-keyed set of custom types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<dyn CustomType>>>,
}

static GLOBAL_REGISTRY: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::default);

impl TypeRegistry {
    /// The process-wide registry consulted by equality and [`clone_value`].
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL_REGISTRY
    }

    /// Registers a type under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DuplicateType`] if the name is already taken.
    pub fn add_type(
        &self,
        name: impl Into<String>,
        custom_type: Arc<dyn CustomType>,
    ) -> DocumentStoreResult<()> {
        let name = name.into();
        let mut types = self.types.write();
        if types.contains_key(&name) {
            return Err(DocumentStoreError::DuplicateType(name));
        }
        log::debug!("registered custom type {name}");
        types.insert(name, custom_type);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomType>> {
        self.types.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }
}

/// Splits a custom value into its registered type and payload.
///
/// Returns `None` for plain documents and for documents naming an unregistered type.
pub fn custom_value(document: &Document) -> Option<(Arc<dyn CustomType>, &Bson)> {
    let Ok(name) = document.get_str("$type") else {
        return None;
    };
    let payload = document.get("$value")?;
    let custom_type = TypeRegistry::global().get(name)?;
    Some((custom_type, payload))
}

/// Wraps a payload in the custom value envelope.
pub fn wrap_custom(name: &str, payload: Bson) -> Bson {
    let mut document = Document::new();
    document.insert("$type", name);
    document.insert("$value", payload);
    Bson::Document(document)
}

/// Whether a value is a binary buffer.
pub fn is_binary(value: &Bson) -> bool {
    matches!(value, Bson::Binary(_))
}

/// Deep copy that lets registered custom types copy their own payloads.
pub fn clone_value(value: &Bson) -> Bson {
    match value {
        Bson::Array(items) => Bson::Array(items.iter().map(clone_value).collect()),
        Bson::Document(document) => match custom_value(document) {
            Some((custom_type, payload)) => {
                let mut copy = document.clone();
                copy.insert("$value", custom_type.clone_value(payload));
                Bson::Document(copy)
            }
            None => Bson::Document(
                document
                    .iter()
                    .map(|(key, value)| (key.clone(), clone_value(value)))
                    .collect(),
            ),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, spec::BinarySubtype, Binary};

    #[derive(Debug)]
    struct CaseInsensitive;

    impl CustomType for CaseInsensitive {
        fn equals(&self, a: &Bson, b: &Bson) -> bool {
            match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            }
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = TypeRegistry::default();
        registry.add_type("ci", Arc::new(CaseInsensitive)).unwrap();
        let err = registry.add_type("ci", Arc::new(CaseInsensitive)).unwrap_err();
        assert!(matches!(err, DocumentStoreError::DuplicateType(name) if name == "ci"));
    }

    #[test]
    fn custom_value_requires_registration() {
        let _ = TypeRegistry::global().add_type("codec-test-ci", Arc::new(CaseInsensitive));
        let known = doc! { "$type": "codec-test-ci", "$value": "Abc" };
        let unknown = doc! { "$type": "codec-test-missing", "$value": "Abc" };
        assert!(custom_value(&known).is_some());
        assert!(custom_value(&unknown).is_none());
        assert!(custom_value(&doc! { "a": 1 }).is_none());
    }

    #[test]
    fn binary_detection() {
        let binary = Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![1, 2, 3],
        });
        assert!(is_binary(&binary));
        assert!(!is_binary(&Bson::String("x".into())));
    }

    #[test]
    fn clone_value_is_deep() {
        let original = Bson::Document(doc! { "a": { "b": [1, 2] } });
        assert_eq!(clone_value(&original), original);
        let wrapped = wrap_custom("anything", Bson::Int32(3));
        assert_eq!(clone_value(&wrapped), wrapped);
    }
}
