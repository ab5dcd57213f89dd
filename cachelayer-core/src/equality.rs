//! Deep structural equality over BSON values.

use bson::{Bson, Document};

use crate::{
    codec::custom_value,
    value::{as_number, present},
};

/// Controls how documents are compared by [`equals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualsOptions {
    /// When set, `{a: 1, b: 2}` and `{b: 2, a: 1}` are different values.
    pub key_order_sensitive: bool,
}

impl Default for EqualsOptions {
    fn default() -> Self {
        Self {
            key_order_sensitive: true,
        }
    }
}

impl EqualsOptions {
    pub fn unordered() -> Self {
        Self {
            key_order_sensitive: false,
        }
    }
}

/// Deep equality over two present values.
///
/// Numbers compare numerically across widths, so `1i32` equals `1.0f64`. Regular
/// expressions compare by pattern and flags, arrays elementwise, and documents either
/// in key order or as key sets depending on `options`. Documents naming a registered
/// custom type on both sides delegate to that type.
pub fn equals(a: &Bson, b: &Bson, options: EqualsOptions) -> bool {
    match (a, b) {
        (Bson::Undefined, Bson::Undefined) => true,
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => {
            x.pattern.as_str() == y.pattern.as_str() && x.options.as_str() == y.options.as_str()
        }
        (Bson::Binary(x), Bson::Binary(y)) => x.bytes == y.bytes,
        (Bson::Array(x), Bson::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| equals(x, y, options))
        }
        (Bson::Document(x), Bson::Document(y)) => documents_equal(x, y, options),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

/// [`equals`] lifted over absent values. Two absent values are equal.
pub fn equals_optional(a: Option<&Bson>, b: Option<&Bson>, options: EqualsOptions) -> bool {
    match (present(a), present(b)) {
        (None, None) => true,
        (Some(a), Some(b)) => equals(a, b, options),
        _ => false,
    }
}

fn documents_equal(a: &Document, b: &Document, options: EqualsOptions) -> bool {
    if let (Some((left_type, left)), Some((_, right))) = (custom_value(a), custom_value(b)) {
        if a.get("$type") == b.get("$type") {
            return left_type.equals(left, right);
        }
    }

    if a.len() != b.len() {
        return false;
    }

    if options.key_order_sensitive {
        a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && equals(va, vb, options))
    } else {
        a.iter().all(|(key, va)| match b.get(key) {
            Some(vb) => equals(va, vb, options),
            None => false,
        })
    }
}
