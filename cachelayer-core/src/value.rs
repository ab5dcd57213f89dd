//! Type classification and total ordering of BSON values.
//!
//! Every value gets a numeric type code (the BSON type number, with every numeric
//! width collapsed to `1`) and a cross-type rank used when two values of different
//! types are compared. An absent value is represented as `None` and sorts below
//! everything else. [`Bson::Undefined`] is treated as absent wherever it appears.

use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::error::{ComparisonError, ComparisonResult};

/// BSON type codes as reported by [`type_of`] and accepted by `$type`.
pub mod type_code {
    pub const NUMBER: i32 = 1;
    pub const STRING: i32 = 2;
    pub const OBJECT: i32 = 3;
    pub const ARRAY: i32 = 4;
    pub const BINARY: i32 = 5;
    pub const OBJECT_ID: i32 = 7;
    pub const BOOLEAN: i32 = 8;
    pub const DATE: i32 = 9;
    pub const NULL: i32 = 10;
    pub const REGEX: i32 = 11;
    pub const DB_POINTER: i32 = 12;
    pub const CODE: i32 = 13;
    pub const SYMBOL: i32 = 14;
    pub const CODE_WITH_SCOPE: i32 = 15;
    pub const TIMESTAMP: i32 = 17;
    pub const DECIMAL: i32 = 19;
    pub const MAX_KEY: i32 = 127;
    pub const MIN_KEY: i32 = 255;
}

/// Maps `Undefined` to absent so the rest of the crate only has to handle `None`.
pub fn present(value: Option<&Bson>) -> Option<&Bson> {
    match value {
        Some(Bson::Undefined) | None => None,
        other => other,
    }
}

/// Returns the type code of a value.
pub fn type_of(value: &Bson) -> i32 {
    match value {
        Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_) => type_code::NUMBER,
        Bson::String(_) => type_code::STRING,
        Bson::Document(_) => type_code::OBJECT,
        Bson::Array(_) => type_code::ARRAY,
        Bson::Binary(_) => type_code::BINARY,
        Bson::ObjectId(_) => type_code::OBJECT_ID,
        Bson::Boolean(_) => type_code::BOOLEAN,
        Bson::DateTime(_) => type_code::DATE,
        Bson::Null | Bson::Undefined => type_code::NULL,
        Bson::RegularExpression(_) => type_code::REGEX,
        Bson::DbPointer(_) => type_code::DB_POINTER,
        Bson::JavaScriptCode(_) => type_code::CODE,
        Bson::Symbol(_) => type_code::SYMBOL,
        Bson::JavaScriptCodeWithScope(_) => type_code::CODE_WITH_SCOPE,
        Bson::Timestamp(_) => type_code::TIMESTAMP,
        Bson::Decimal128(_) => type_code::DECIMAL,
        Bson::MaxKey => type_code::MAX_KEY,
        Bson::MinKey => type_code::MIN_KEY,
    }
}

/// Resolves the `$type` aliases accepted in place of a numeric code.
pub fn type_code_for_alias(alias: &str) -> Option<i32> {
    let code = match alias {
        "double" | "int" | "long" | "number" => type_code::NUMBER,
        "string" => type_code::STRING,
        "object" => type_code::OBJECT,
        "array" => type_code::ARRAY,
        "binData" => type_code::BINARY,
        "objectId" => type_code::OBJECT_ID,
        "bool" => type_code::BOOLEAN,
        "date" => type_code::DATE,
        "null" => type_code::NULL,
        "regex" => type_code::REGEX,
        "dbPointer" => type_code::DB_POINTER,
        "javascript" => type_code::CODE,
        "symbol" => type_code::SYMBOL,
        "javascriptWithScope" => type_code::CODE_WITH_SCOPE,
        "timestamp" => type_code::TIMESTAMP,
        "decimal" => type_code::DECIMAL,
        "maxKey" => type_code::MAX_KEY,
        "minKey" => type_code::MIN_KEY,
        _ => return None,
    };
    Some(code)
}

/// Cross-type rank of a type code. Values of different rank order by rank alone.
pub fn type_order(code: i32) -> i32 {
    match code {
        type_code::MIN_KEY => -1,
        type_code::NULL => 0,
        type_code::NUMBER | type_code::DECIMAL => 1,
        type_code::STRING | type_code::SYMBOL => 2,
        type_code::OBJECT | type_code::DB_POINTER => 3,
        type_code::ARRAY => 4,
        type_code::BINARY => 5,
        type_code::OBJECT_ID => 6,
        type_code::BOOLEAN => 7,
        type_code::DATE | type_code::TIMESTAMP => 8,
        type_code::REGEX => 9,
        type_code::CODE | type_code::CODE_WITH_SCOPE => 100,
        type_code::MAX_KEY => 127,
        _ => 100,
    }
}

/// Numeric view of a value, if it is one of the plain numeric variants.
pub fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(n) => Some(*n),
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        _ => None,
    }
}

/// Loose truthiness used by `$exists`, `$where` constants and geo flags.
pub fn truthy(value: Option<&Bson>) -> bool {
    match present(value) {
        None | Some(Bson::Null) => false,
        Some(Bson::Boolean(b)) => *b,
        Some(Bson::String(s)) => !s.is_empty(),
        Some(other) => match as_number(other) {
            Some(n) => n != 0.0 && !n.is_nan(),
            None => true,
        },
    }
}

/// Total order over possibly-absent values.
///
/// Absent sorts first, then values order by [`type_order`] rank. Within a rank the
/// comparison is type specific.
///
/// # Errors
///
/// Returns [`ComparisonError::MissingCoercion`] when two values share a rank but not a
/// type code, and [`ComparisonError::Unsortable`] for regular expressions, code,
/// decimals and db pointers.
pub fn compare(a: Option<&Bson>, b: Option<&Bson>) -> ComparisonResult<Ordering> {
    let (a, b) = match (present(a), present(b)) {
        (None, None) => return Ok(Ordering::Equal),
        (None, Some(_)) => return Ok(Ordering::Less),
        (Some(_), None) => return Ok(Ordering::Greater),
        (Some(a), Some(b)) => (a, b),
    };

    let (ta, tb) = (type_of(a), type_of(b));
    let (oa, ob) = (type_order(ta), type_order(tb));
    if oa != ob {
        return Ok(oa.cmp(&ob));
    }
    if ta != tb {
        return Err(ComparisonError::MissingCoercion { left: ta, right: tb });
    }

    match (a, b) {
        (Bson::Null, Bson::Null) | (Bson::MinKey, Bson::MinKey) | (Bson::MaxKey, Bson::MaxKey) => {
            Ok(Ordering::Equal)
        }
        (Bson::String(x), Bson::String(y)) | (Bson::Symbol(x), Bson::Symbol(y)) => Ok(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Ok(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            Ok(x.timestamp_millis().cmp(&y.timestamp_millis()))
        }
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            Ok((x.time, x.increment).cmp(&(y.time, y.increment)))
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Ok(x.to_hex().cmp(&y.to_hex())),
        (Bson::Binary(x), Bson::Binary(y)) => Ok(compare_binary(&x.bytes, &y.bytes)),
        (Bson::Array(x), Bson::Array(y)) => compare_sequences(x.iter(), y.iter()),
        (Bson::Document(x), Bson::Document(y)) => compare_documents(x, y),
        (Bson::RegularExpression(_), _) => Err(ComparisonError::Unsortable("regular expressions")),
        (Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_), _) => {
            Err(ComparisonError::Unsortable("code"))
        }
        (Bson::Decimal128(_), _) => Err(ComparisonError::Unsortable("decimal values")),
        (Bson::DbPointer(_), _) => Err(ComparisonError::Unsortable("db pointers")),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
            _ => Err(ComparisonError::MissingCoercion { left: ta, right: tb }),
        },
    }
}

// Shorter buffers first, then bytewise.
fn compare_binary(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_sequences<'a>(
    mut left: impl Iterator<Item = &'a Bson>,
    mut right: impl Iterator<Item = &'a Bson>,
) -> ComparisonResult<Ordering> {
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ok(Ordering::Equal),
            (None, Some(_)) => return Ok(Ordering::Less),
            (Some(_), None) => return Ok(Ordering::Greater),
            (Some(x), Some(y)) => {
                let ordering = compare(Some(x), Some(y))?;
                if ordering != Ordering::Equal {
                    return Ok(ordering);
                }
            }
        }
    }
}

// Documents compare as the flattened sequence key1, value1, key2, value2, ...
fn compare_documents(a: &Document, b: &Document) -> ComparisonResult<Ordering> {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ok(Ordering::Equal),
            (None, Some(_)) => return Ok(Ordering::Less),
            (Some(_), None) => return Ok(Ordering::Greater),
            (Some((ka, va)), Some((kb, vb))) => {
                let keys = ka.as_str().cmp(kb.as_str());
                if keys != Ordering::Equal {
                    return Ok(keys);
                }
                let values = compare(Some(va), Some(vb))?;
                if values != Ordering::Equal {
                    return Ok(values);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId, DateTime};

    #[test]
    fn numeric_widths_share_a_type_code() {
        assert_eq!(type_of(&Bson::Int32(1)), type_code::NUMBER);
        assert_eq!(type_of(&Bson::Int64(1)), type_code::NUMBER);
        assert_eq!(type_of(&Bson::Double(1.5)), type_code::NUMBER);
        assert_eq!(type_of(&Bson::Null), type_code::NULL);
        assert_eq!(type_of(&Bson::MinKey), type_code::MIN_KEY);
    }

    #[test]
    fn absent_sorts_below_everything() {
        assert_eq!(compare(None, Some(&Bson::Null)), Ok(Ordering::Less));
        assert_eq!(compare(None, Some(&Bson::MinKey)), Ok(Ordering::Less));
        assert_eq!(compare(Some(&Bson::Undefined), None), Ok(Ordering::Equal));
        assert_eq!(compare(None, None), Ok(Ordering::Equal));
    }

    #[test]
    fn cross_type_order_follows_rank() {
        let ladder = [
            Bson::MinKey,
            Bson::Null,
            Bson::Int32(5),
            Bson::String("a".into()),
            Bson::Document(doc! {}),
            Bson::Array(vec![]),
            Bson::ObjectId(ObjectId::new()),
            Bson::Boolean(false),
            Bson::DateTime(DateTime::from_millis(0)),
            Bson::MaxKey,
        ];
        for pair in ladder.windows(2) {
            assert_eq!(compare(Some(&pair[0]), Some(&pair[1])), Ok(Ordering::Less));
        }
    }

    #[test]
    fn numbers_compare_across_widths() {
        assert_eq!(
            compare(Some(&Bson::Int32(2)), Some(&Bson::Double(2.5))),
            Ok(Ordering::Less)
        );
        assert_eq!(
            compare(Some(&Bson::Int64(3)), Some(&Bson::Int32(3))),
            Ok(Ordering::Equal)
        );
    }

    #[test]
    fn documents_compare_key_then_value() {
        let a = Bson::Document(doc! { "a": 1 });
        let b = Bson::Document(doc! { "b": 0 });
        let c = Bson::Document(doc! { "a": 1, "b": 0 });
        assert_eq!(compare(Some(&a), Some(&b)), Ok(Ordering::Less));
        assert_eq!(compare(Some(&a), Some(&c)), Ok(Ordering::Less));
        assert_eq!(compare(Some(&c), Some(&c)), Ok(Ordering::Equal));
    }

    #[test]
    fn arrays_compare_elementwise_then_by_length() {
        let short = Bson::Array(vec![Bson::Int32(1)]);
        let long = Bson::Array(vec![Bson::Int32(1), Bson::Int32(0)]);
        let bigger = Bson::Array(vec![Bson::Int32(2)]);
        assert_eq!(compare(Some(&short), Some(&long)), Ok(Ordering::Less));
        assert_eq!(compare(Some(&bigger), Some(&long)), Ok(Ordering::Greater));
    }

    #[test]
    fn same_rank_different_type_is_an_error() {
        let string = Bson::String("a".into());
        let symbol = Bson::Symbol("a".into());
        assert_eq!(
            compare(Some(&string), Some(&symbol)),
            Err(ComparisonError::MissingCoercion {
                left: type_code::STRING,
                right: type_code::SYMBOL
            })
        );
    }

    #[test]
    fn binaries_order_by_length_then_bytes() {
        use bson::{spec::BinarySubtype, Binary};
        let blob = |bytes: &[u8]| {
            Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes: bytes.to_vec() })
        };
        assert_eq!(
            compare(Some(&blob(&[255, 255, 255])), Some(&blob(&[0, 0, 0, 0]))),
            Ok(Ordering::Less)
        );
        assert_eq!(
            compare(Some(&blob(&[1, 2, 4])), Some(&blob(&[1, 3, 0]))),
            Ok(Ordering::Less)
        );
        assert_eq!(compare(Some(&blob(&[7])), Some(&blob(&[7]))), Ok(Ordering::Equal));
    }

    #[test]
    fn code_is_unsortable() {
        let code = Bson::JavaScriptCode("f()".into());
        assert!(matches!(
            compare(Some(&code), Some(&code)),
            Err(ComparisonError::Unsortable(_))
        ));
    }

    #[test]
    fn truthiness_matches_loose_semantics() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&Bson::Int32(0))));
        assert!(!truthy(Some(&Bson::String(String::new()))));
        assert!(truthy(Some(&Bson::Int32(1))));
        assert!(truthy(Some(&Bson::Document(doc! {}))));
    }
}
