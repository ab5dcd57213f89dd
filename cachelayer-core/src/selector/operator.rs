use bson::Bson;
use std::cmp::Ordering;

use super::{pattern::Pattern, value::ValueSelector, DocumentSelector};
use crate::{
    equality::{equals_optional, EqualsOptions},
    error::{CompileError, CompileResult},
    value::{as_number, compare, present, truthy, type_code_for_alias, type_of},
};

/// A single compiled `$`-operator applied to the values at one path.
#[derive(Debug, Clone)]
pub enum ValueOperator {
    In(Vec<Bson>),
    All(Vec<Bson>),
    Lt(Bson),
    Lte(Bson),
    Gt(Bson),
    Gte(Bson),
    Ne(Bson),
    Nin(Vec<Bson>),
    Exists(bool),
    Mod { divisor: f64, remainder: f64 },
    Size(f64),
    Type(i32),
    Regex(Pattern),
    /// Consumed by `$regex`; matches everything on its own.
    Options,
    ElemMatch(Box<DocumentSelector>),
    Not(Box<ValueSelector>),
    /// Always matches; proximity is applied after filtering.
    Near,
    /// Always matches; containment is applied after filtering.
    GeoIntersects,
}

impl ValueOperator {
    /// Looks up `name` in the operator table and compiles its operand.
    ///
    /// `options` is the sibling `$options` entry, if any, consulted by `$regex`.
    pub fn compile(name: &str, operand: &Bson, options: Option<&Bson>) -> CompileResult<Self> {
        let operator = match name {
            "$in" => ValueOperator::In(array_operand("$in", operand)?),
            "$all" => ValueOperator::All(array_operand("$all", operand)?),
            "$nin" => ValueOperator::Nin(array_operand("$nin", operand)?),
            "$lt" => ValueOperator::Lt(operand.clone()),
            "$lte" => ValueOperator::Lte(operand.clone()),
            "$gt" => ValueOperator::Gt(operand.clone()),
            "$gte" => ValueOperator::Gte(operand.clone()),
            "$ne" => ValueOperator::Ne(operand.clone()),
            "$exists" => ValueOperator::Exists(truthy(Some(operand))),
            "$mod" => compile_mod(operand)?,
            "$size" => ValueOperator::Size(as_number(operand).ok_or_else(|| {
                CompileError::MalformedOperand {
                    operator: "$size",
                    reason: "expected a number".into(),
                }
            })?),
            "$type" => ValueOperator::Type(compile_type(operand)?),
            "$regex" => ValueOperator::Regex(compile_regex(operand, options)?),
            "$options" => ValueOperator::Options,
            "$elemMatch" => match operand {
                Bson::Document(selector) => {
                    ValueOperator::ElemMatch(Box::new(DocumentSelector::compile_nested(selector)?))
                }
                _ => {
                    return Err(CompileError::MalformedOperand {
                        operator: "$elemMatch",
                        reason: "expected a document".into(),
                    });
                }
            },
            "$not" => ValueOperator::Not(Box::new(ValueSelector::compile(Some(operand))?)),
            "$near" => ValueOperator::Near,
            "$geoIntersects" => ValueOperator::GeoIntersects,
            other => return Err(CompileError::UnrecognizedOperator(other.to_owned())),
        };
        Ok(operator)
    }

    pub fn matches(&self, value: Option<&Bson>) -> bool {
        match self {
            ValueOperator::In(candidates) => any_if_array_plus(value, |x| contains(candidates, x)),
            ValueOperator::Nin(candidates) => {
                value.is_none() || !any_if_array_plus(value, |x| contains(candidates, x))
            }
            ValueOperator::All(required) => match value {
                Some(Bson::Array(items)) => required.iter().all(|wanted| {
                    items
                        .iter()
                        .any(|item| equals_optional(Some(wanted), Some(item), EqualsOptions::default()))
                }),
                _ => false,
            },
            ValueOperator::Lt(operand) => ordered(value, operand, |o| o == Ordering::Less),
            ValueOperator::Lte(operand) => ordered(value, operand, |o| o != Ordering::Greater),
            ValueOperator::Gt(operand) => ordered(value, operand, |o| o == Ordering::Greater),
            ValueOperator::Gte(operand) => ordered(value, operand, |o| o != Ordering::Less),
            ValueOperator::Ne(operand) => !any_if_array_plus(value, |x| {
                equals_optional(x, Some(operand), EqualsOptions::default())
            }),
            ValueOperator::Exists(expected) => value.is_some() == *expected,
            ValueOperator::Mod { divisor, remainder } => any_if_array(value, |x| {
                x.and_then(as_number)
                    .is_some_and(|n| n % divisor == *remainder)
            }),
            ValueOperator::Size(expected) => {
                matches!(value, Some(Bson::Array(items)) if items.len() as f64 == *expected)
            }
            ValueOperator::Type(code) => {
                any_if_array(value, |x| x.is_some_and(|x| type_of(x) == *code))
            }
            ValueOperator::Regex(pattern) => any_if_array(value, |x| pattern.is_match(x)),
            ValueOperator::ElemMatch(selector) => match value {
                Some(Bson::Array(items)) => items.iter().any(|item| selector.matches_value(item)),
                _ => false,
            },
            ValueOperator::Not(selector) => !selector.matches(value),
            ValueOperator::Options | ValueOperator::Near | ValueOperator::GeoIntersects => true,
        }
    }
}

/// Tests `f` against the value, or against each element when the value is an array.
pub(crate) fn any_if_array(value: Option<&Bson>, f: impl Fn(Option<&Bson>) -> bool) -> bool {
    match value {
        Some(Bson::Array(items)) => items.iter().any(|item| f(present(Some(item)))),
        other => f(other),
    }
}

/// Like [`any_if_array`], but also tests the array itself.
pub(crate) fn any_if_array_plus(value: Option<&Bson>, f: impl Fn(Option<&Bson>) -> bool) -> bool {
    if f(value) {
        return true;
    }
    match value {
        Some(Bson::Array(items)) => items.iter().any(|item| f(present(Some(item)))),
        _ => false,
    }
}

fn contains(candidates: &[Bson], value: Option<&Bson>) -> bool {
    candidates
        .iter()
        .any(|candidate| equals_optional(Some(candidate), value, EqualsOptions::default()))
}

fn ordered(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    any_if_array(value, |x| match compare(x, Some(operand)) {
        Ok(ordering) => accept(ordering),
        Err(err) => {
            log::warn!("comparison treated as non-match: {err}");
            false
        }
    })
}

fn array_operand(operator: &'static str, operand: &Bson) -> CompileResult<Vec<Bson>> {
    match operand {
        Bson::Array(items) => Ok(items.clone()),
        _ => Err(CompileError::NonArrayOperand(operator)),
    }
}

fn compile_mod(operand: &Bson) -> CompileResult<ValueOperator> {
    let malformed = |reason: &str| CompileError::MalformedOperand {
        operator: "$mod",
        reason: reason.to_owned(),
    };
    let Bson::Array(items) = operand else {
        return Err(CompileError::NonArrayOperand("$mod"));
    };
    match items.as_slice() {
        [divisor, remainder] => {
            let divisor = as_number(divisor).ok_or_else(|| malformed("divisor must be a number"))?;
            let remainder =
                as_number(remainder).ok_or_else(|| malformed("remainder must be a number"))?;
            Ok(ValueOperator::Mod { divisor, remainder })
        }
        _ => Err(malformed("expected [divisor, remainder]")),
    }
}

fn compile_type(operand: &Bson) -> CompileResult<i32> {
    if let Some(code) = as_number(operand) {
        if code.fract() != 0.0 || code < f64::from(i32::MIN) || code > f64::from(i32::MAX) {
            return Err(CompileError::MalformedOperand {
                operator: "$type",
                reason: format!("type code must be an integer, got {code}"),
            });
        }
        return Ok(code as i32);
    }
    operand
        .as_str()
        .and_then(type_code_for_alias)
        .ok_or_else(|| CompileError::MalformedOperand {
            operator: "$type",
            reason: format!("unknown type {operand}"),
        })
}

fn compile_regex(operand: &Bson, options: Option<&Bson>) -> CompileResult<Pattern> {
    let options = match present(options) {
        None => None,
        Some(Bson::String(options)) => Some(options.as_str()),
        Some(other) => return Err(CompileError::UnsupportedRegexOptions(other.to_string())),
    };
    match (operand, options) {
        (Bson::RegularExpression(regex), None) => Pattern::from_bson(regex),
        (Bson::RegularExpression(regex), Some(options)) => {
            Pattern::with_options(regex.pattern.as_str(), options)
        }
        (Bson::String(source), options) => Pattern::with_options(source, options.unwrap_or("")),
        _ => Err(CompileError::MalformedOperand {
            operator: "$regex",
            reason: "expected a string or regular expression".into(),
        }),
    }
}
