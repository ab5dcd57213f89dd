//! Normalization of upsert arguments.

use bson::Document;

use crate::{document::document_id, error::UpsertError};

/// Either a single value or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl From<Document> for OneOrMany<Document> {
    fn from(item: Document) -> Self {
        OneOrMany::One(item)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany::Many(items)
    }
}

/// A document to upsert, paired with the base it was derived from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertItem {
    pub doc: Document,
    pub base: Option<Document>,
}

/// Normalizes one-or-many documents and optional bases into aligned items.
///
/// Bases pair with documents by position; documents past the end of `bases` get none.
///
/// # Errors
///
/// Returns [`UpsertError::MissingId`] if any document lacks a non-null `_id`.
pub fn regularize_upsert(
    docs: impl Into<OneOrMany<Document>>,
    bases: Option<OneOrMany<Document>>,
) -> Result<Vec<UpsertItem>, UpsertError> {
    let docs = docs.into().into_vec();
    let mut bases = bases.map(OneOrMany::into_vec).unwrap_or_default().into_iter();

    if docs.iter().any(|doc| document_id(doc).is_none()) {
        return Err(UpsertError::MissingId);
    }

    Ok(docs
        .into_iter()
        .map(|doc| UpsertItem {
            doc,
            base: bases.next(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn single_document_and_base() {
        let items = regularize_upsert(doc! { "_id": 1, "a": 2 }, Some(doc! { "_id": 1 }.into())).unwrap();
        assert_eq!(
            items,
            vec![UpsertItem {
                doc: doc! { "_id": 1, "a": 2 },
                base: Some(doc! { "_id": 1 }),
            }]
        );
    }

    #[test]
    fn bases_align_by_position() {
        let items = regularize_upsert(
            vec![doc! { "_id": 1 }, doc! { "_id": 2 }],
            Some(vec![doc! { "_id": 1, "v": 0 }].into()),
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].base, Some(doc! { "_id": 1, "v": 0 }));
        assert_eq!(items[1].base, None);
    }

    #[test]
    fn every_document_needs_an_id() {
        let err = regularize_upsert(vec![doc! { "_id": 1 }, doc! { "_id": null }], None).unwrap_err();
        assert_eq!(err, UpsertError::MissingId);
        assert_eq!(regularize_upsert(doc! { "a": 1 }, None).unwrap_err(), UpsertError::MissingId);
    }

    #[test]
    fn empty_batch_is_fine() {
        assert!(regularize_upsert(Vec::<Document>::new(), None).unwrap().is_empty());
    }
}
