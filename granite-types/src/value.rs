//! The untyped cell value and its physical domains.

use std::cmp::Ordering;
use std::fmt;

/// Physical domain of a column.
///
/// Three domains cover the distinct comparison semantics the engine needs:
/// two's-complement integers, IEEE floats (ordered with `total_cmp` inside
/// dictionaries) and heap-allocated strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Int64,
    Float64,
    Utf8,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int64 => "Int64",
            DataType::Float64 => "Float64",
            DataType::Utf8 => "Utf8",
        };
        f.write_str(name)
    }
}

/// An untyped cell: either SQL NULL or a value in one of the three domains.
///
/// `Value` is the exchange currency at the engine's edges. Rows are appended
/// as `Vec<Value>`, predicate operands arrive as `Value`, and partition
/// schemas route on `Value`. Inside segments, data is stored in typed dense
/// form; `Value` never appears on per-row hot paths.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Domain of the value, or `None` for NULL (NULL belongs to every domain).
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Utf8(_) => Some(DataType::Utf8),
        }
    }

    /// Total order between two values of the same domain.
    ///
    /// Floats compare with `total_cmp` so dictionary construction and range
    /// partitioning have a well-defined order even in the presence of NaN.
    /// Returns `None` for mismatched domains or when either side is NULL;
    /// callers decide whether that is a contract violation or a non-match.
    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Float64(a), Value::Float64(b)) => Some(a.total_cmp(b)),
            (Value::Utf8(a), Value::Utf8(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Utf8(v) => write!(f, "'{v}'"),
        }
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident, $via:ty, $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(<$via>::from(v))
                }
            }
        )*
    };
}

impl_from_for_value!(Int64, i64, i8, i16, i32, i64, u8, u16, u32);
impl_from_for_value!(Float64, f64, f32, f64);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}
