//! Document identity helpers.
//!
//! Cached documents are plain [`bson::Document`]s keyed by their `_id` field. These helpers
//! read ids, derive the string keys used by stores and dirty sets, and mint new ids.

use bson::{Bson, Document};
use uuid::Uuid;

use crate::value::{present, type_of};

/// The field holding a document's identity.
pub const ID_FIELD: &str = "_id";

/// Returns the document's `_id`, treating `null` and undefined as missing.
pub fn document_id(document: &Document) -> Option<&Bson> {
    match present(document.get(ID_FIELD)) {
        None | Some(Bson::Null) => None,
        id => id,
    }
}

/// Stable string key for an id, used to index stores and dirty sets.
///
/// The key is prefixed with the id's type code, so `7` and `"7"` stay distinct.
pub fn id_key(id: &Bson) -> String {
    match id {
        Bson::String(text) => format!("{}:{text}", type_of(id)),
        other => format!("{}:{other}", type_of(other)),
    }
}

/// Generates a new unique id: 32 lowercase hexadecimal characters.
pub fn create_uid() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn uids_are_hex_and_unique() {
        let a = create_uid();
        let b = create_uid();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn null_ids_are_missing() {
        assert_eq!(document_id(&doc! { "_id": null }), None);
        assert_eq!(document_id(&doc! {}), None);
        assert_eq!(document_id(&doc! { "_id": 7 }), Some(&Bson::Int32(7)));
    }

    #[test]
    fn id_keys_distinguish_types() {
        assert_eq!(id_key(&Bson::String("7".into())), "2:7");
        assert_ne!(id_key(&Bson::Int32(7)), id_key(&Bson::String("7".into())));
    }
}
