//! Compilation of MongoDB-style selectors into reusable predicates.
//!
//! A selector document compiles into a [`DocumentSelector`]: a conjunction of clauses,
//! each either a logical combinator (`$and`, `$or`, `$nor`), a `$where` predicate, or a
//! field path paired with a [`ValueSelector`]. Compilation validates the whole tree up
//! front, so matching itself is infallible.
//!
//! # Examples
//!
//! ```ignore
//! use cachelayer_core::selector::DocumentSelector;
//! use bson::doc;
//!
//! let selector = DocumentSelector::compile(&doc! { "tags": "rust", "stars": { "$gte": 10 } })?;
//! assert!(selector.matches(&doc! { "tags": ["rust", "db"], "stars": 12 }));
//! ```

mod operator;
mod pattern;
mod value;

pub use operator::ValueOperator;
pub use pattern::Pattern;
pub use value::ValueSelector;

use bson::{Bson, Document};
use std::{fmt, sync::Arc};

use crate::{
    error::{CompileError, CompileResult},
    geo::GeoPostFilter,
    lookup::Lookup,
    value::truthy,
};

/// A host-supplied `$where` predicate.
pub type WherePredicate = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

#[derive(Clone)]
enum WhereClause {
    Callable(WherePredicate),
    Constant(bool),
}

impl fmt::Debug for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereClause::Callable(_) => f.write_str("Callable(..)"),
            WhereClause::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
        }
    }
}

#[derive(Debug, Clone)]
enum Clause {
    And(Vec<DocumentSelector>),
    Or(Vec<DocumentSelector>),
    Nor(Vec<DocumentSelector>),
    Where(WhereClause),
    Field { lookup: Lookup, selector: ValueSelector },
}

impl Clause {
    fn matches(&self, document: &Document) -> bool {
        match self {
            Clause::And(selectors) => selectors.iter().all(|s| s.matches(document)),
            Clause::Or(selectors) => selectors.iter().any(|s| s.matches(document)),
            Clause::Nor(selectors) => !selectors.iter().any(|s| s.matches(document)),
            Clause::Where(WhereClause::Callable(predicate)) => predicate(document),
            Clause::Where(WhereClause::Constant(value)) => *value,
            Clause::Field { lookup, selector } => selector.matches_any(&lookup.branches(document)),
        }
    }
}

/// A compiled selector document.
#[derive(Debug, Clone, Default)]
pub struct DocumentSelector {
    clauses: Vec<Clause>,
    geo: GeoPostFilter,
}

impl DocumentSelector {
    /// Compiles a top-level selector, including its geospatial post-filters.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] for unknown operators, malformed operands, inconsistent
    /// field selectors, or invalid geometries.
    pub fn compile(selector: &Document) -> CompileResult<Self> {
        let mut compiled = Self::compile_nested(selector)?;
        compiled.geo = GeoPostFilter::compile(selector)?;
        log::trace!(
            "compiled selector with {} clause(s) and {} geo filter(s)",
            compiled.clauses.len(),
            compiled.geo.len()
        );
        Ok(compiled)
    }

    /// Compiles a selector nested under `$and`, `$or`, `$nor` or `$elemMatch`.
    pub(crate) fn compile_nested(selector: &Document) -> CompileResult<Self> {
        let clauses = selector
            .iter()
            .map(|(key, spec)| compile_clause(key, spec))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(Self {
            clauses,
            geo: GeoPostFilter::default(),
        })
    }

    /// Attaches a `$where` predicate evaluated against whole documents.
    pub fn with_where(mut self, predicate: WherePredicate) -> Self {
        self.clauses.push(Clause::Where(WhereClause::Callable(predicate)));
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses.iter().all(|clause| clause.matches(document))
    }

    /// Matches an array element; non-document elements are seen as an empty document.
    pub fn matches_value(&self, value: &Bson) -> bool {
        match value {
            Bson::Document(document) => self.matches(document),
            _ => self.matches(&Document::new()),
        }
    }

    pub fn geo(&self) -> &GeoPostFilter {
        &self.geo
    }
}

/// Compiles a top-level selector document. Shorthand for [`DocumentSelector::compile`].
pub fn compile_document_selector(selector: &Document) -> CompileResult<DocumentSelector> {
    DocumentSelector::compile(selector)
}

fn compile_clause(key: &str, spec: &Bson) -> CompileResult<Clause> {
    if !key.starts_with('$') {
        return Ok(Clause::Field {
            lookup: Lookup::new(key),
            selector: ValueSelector::compile(Some(spec))?,
        });
    }

    match key {
        "$and" => Ok(Clause::And(compile_branches(spec)?)),
        "$or" => Ok(Clause::Or(compile_branches(spec)?)),
        "$nor" => Ok(Clause::Nor(compile_branches(spec)?)),
        "$where" => Ok(Clause::Where(WhereClause::Constant(truthy(Some(spec))))),
        other => Err(CompileError::UnrecognizedLogicalOperator(other.to_owned())),
    }
}

fn compile_branches(spec: &Bson) -> CompileResult<Vec<DocumentSelector>> {
    let Bson::Array(items) = spec else {
        return Err(CompileError::InvalidLogicalOperand);
    };
    if items.is_empty() {
        return Err(CompileError::InvalidLogicalOperand);
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(selector) => DocumentSelector::compile_nested(selector),
            _ => Err(CompileError::InvalidLogicalOperand),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn matches(selector: Document, document: Document) -> bool {
        compile_document_selector(&selector).unwrap().matches(&document)
    }

    #[test]
    fn empty_selector_matches_everything() {
        assert!(matches(doc! {}, doc! { "a": 1 }));
        assert!(matches(doc! {}, doc! {}));
    }

    #[test]
    fn field_clauses_are_conjunctive() {
        assert!(matches(doc! { "a": 1, "b": "x" }, doc! { "a": 1, "b": "x" }));
        assert!(!matches(doc! { "a": 1, "b": "x" }, doc! { "a": 1, "b": "y" }));
    }

    #[test]
    fn dotted_paths_branch_through_arrays() {
        let document = doc! { "items": [{ "sku": "a" }, { "sku": "b" }] };
        assert!(matches(doc! { "items.sku": "b" }, document.clone()));
        assert!(!matches(doc! { "items.sku": "c" }, document));
    }

    #[test]
    fn logical_operators() {
        let document = doc! { "a": 1, "b": 2 };
        assert!(matches(doc! { "$and": [{ "a": 1 }, { "b": 2 }] }, document.clone()));
        assert!(matches(doc! { "$or": [{ "a": 5 }, { "b": 2 }] }, document.clone()));
        assert!(!matches(doc! { "$nor": [{ "a": 5 }, { "b": 2 }] }, document.clone()));
        assert!(matches(doc! { "$nor": [{ "a": 5 }] }, document));
    }

    #[test]
    fn logical_operands_must_be_nonempty_arrays() {
        assert_eq!(
            DocumentSelector::compile(&doc! { "$or": [] }).unwrap_err(),
            CompileError::InvalidLogicalOperand
        );
        assert_eq!(
            DocumentSelector::compile(&doc! { "$and": { "a": 1 } }).unwrap_err(),
            CompileError::InvalidLogicalOperand
        );
    }

    #[test]
    fn unknown_logical_operator() {
        assert_eq!(
            DocumentSelector::compile(&doc! { "$xor": [{ "a": 1 }] }).unwrap_err(),
            CompileError::UnrecognizedLogicalOperator("$xor".into())
        );
    }

    #[test]
    fn where_predicates() {
        assert!(matches(doc! { "$where": true }, doc! { "a": 1 }));
        assert!(!matches(doc! { "$where": 0 }, doc! { "a": 1 }));

        let selector = DocumentSelector::compile(&doc! {})
            .unwrap()
            .with_where(Arc::new(|document: &Document| document.get_i32("a").is_ok_and(|a| a == 2)));
        assert!(selector.matches(&doc! { "a": 2 }));
        assert!(!selector.matches(&doc! { "a": 3 }));
    }

    #[test]
    fn elem_match_on_scalars_sees_empty_document() {
        let selector = doc! { "xs": { "$elemMatch": { "missing": null } } };
        assert!(matches(selector.clone(), doc! { "xs": [1] }));
        assert!(!matches(selector, doc! { "xs": [] }));
    }
}
