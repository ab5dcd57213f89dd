use bson::{Bson, Document};

use super::{
    operator::{any_if_array, any_if_array_plus, ValueOperator},
    pattern::Pattern,
};
use crate::{
    codec::custom_value,
    equality::{equals, EqualsOptions},
    error::{CompileError, CompileResult},
    value::{as_number, present},
};

/// The compiled right-hand side of a `field: <spec>` selector entry.
#[derive(Debug, Clone)]
pub enum ValueSelector {
    /// `null` matches absent and null values.
    Missing,
    /// Strict equality against a scalar, or against any element of an array value.
    Scalar(Bson),
    Pattern(Pattern),
    /// Deep equality against the whole array value or any of its elements.
    Array(Bson),
    /// Every operator must match.
    Operators(Vec<ValueOperator>),
    /// Deep equality against a document or other structured literal.
    Literal(Bson),
}

impl ValueSelector {
    /// Compiles a field specification.
    ///
    /// # Errors
    ///
    /// Fails when a document mixes operator and literal keys, names an unknown operator,
    /// or gives an operator a malformed operand.
    pub fn compile(spec: Option<&Bson>) -> CompileResult<Self> {
        let selector = match present(spec) {
            None | Some(Bson::Null) => ValueSelector::Missing,
            Some(Bson::RegularExpression(regex)) => ValueSelector::Pattern(Pattern::from_bson(regex)?),
            Some(array @ Bson::Array(_)) => ValueSelector::Array(array.clone()),
            Some(Bson::Document(document)) => {
                if custom_value(document).is_some() {
                    ValueSelector::Literal(Bson::Document(document.clone()))
                } else if is_operator_document(document)? {
                    ValueSelector::Operators(compile_operators(document)?)
                } else {
                    ValueSelector::Literal(Bson::Document(document.clone()))
                }
            }
            Some(
                literal @ (Bson::DateTime(_)
                | Bson::Binary(_)
                | Bson::ObjectId(_)
                | Bson::Timestamp(_)
                | Bson::DbPointer(_)),
            ) => ValueSelector::Literal(literal.clone()),
            Some(scalar) => ValueSelector::Scalar(scalar.clone()),
        };
        Ok(selector)
    }

    pub fn matches(&self, value: Option<&Bson>) -> bool {
        match self {
            ValueSelector::Missing => any_if_array(value, |x| matches!(x, None | Some(Bson::Null))),
            ValueSelector::Scalar(expected) => {
                any_if_array(value, |x| x.is_some_and(|x| strict_equals(x, expected)))
            }
            ValueSelector::Pattern(pattern) => any_if_array(value, |x| pattern.is_match(x)),
            ValueSelector::Array(expected) => any_if_array_plus(value, |x| {
                x.is_some_and(|x| equals(expected, x, EqualsOptions::default()))
            }),
            ValueSelector::Operators(operators) => operators.iter().all(|op| op.matches(value)),
            ValueSelector::Literal(expected) => any_if_array(value, |x| {
                x.is_some_and(|x| equals(expected, x, EqualsOptions::default()))
            }),
        }
    }

    /// Whether any of the branches produced by a lookup matches.
    pub fn matches_any(&self, branches: &[Option<&Bson>]) -> bool {
        branches.iter().any(|branch| self.matches(*branch))
    }
}

fn strict_equals(value: &Bson, expected: &Bson) -> bool {
    match (as_number(value), as_number(expected)) {
        (Some(x), Some(y)) => x == y,
        _ => value == expected,
    }
}

/// A document is an operator document when its keys start with `$`. Mixing the two
/// kinds of key is rejected.
fn is_operator_document(document: &Document) -> CompileResult<bool> {
    let mut kind = None;
    for key in document.keys() {
        let is_operator = key.starts_with('$');
        match kind {
            None => kind = Some(is_operator),
            Some(previous) if previous != is_operator => {
                return Err(CompileError::InconsistentSelector(Bson::Document(document.clone()).to_string()));
            }
            Some(_) => {}
        }
    }
    Ok(kind.unwrap_or(false))
}

fn compile_operators(document: &Document) -> CompileResult<Vec<ValueOperator>> {
    let options = document.get("$options");
    document
        .iter()
        .map(|(name, operand)| ValueOperator::compile(name, operand, options))
        .collect()
}
