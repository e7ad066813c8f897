//! The segment model: one column's physical storage within one chunk.
//!
//! [`Segment`] is a closed variant set over four encodings. The typed
//! encodings ([`ValueSegment`], [`DictionarySegment`], [`RunLengthSegment`])
//! are themselves closed enums over the three physical domains, with a
//! generic body monomorphized per domain. Scan algorithms dispatch with the
//! `with_*_segment!` macros, so the hot per-row loop never goes through a
//! trait object.

use std::cmp::Ordering;
use std::fmt;

use granite_types::{ChunkOffset, DataType, Value};

pub mod attribute_vector;
pub mod dictionary;
pub mod reference;
pub mod run_length;
pub mod value;

pub use attribute_vector::{AttributeVector, AttributeVectorIter, VectorCompression};
pub use dictionary::{DictionarySegment, TypedDictionarySegment};
pub use reference::ReferenceSegment;
pub use run_length::{RunLengthSegment, TypedRunLengthSegment};
pub use value::{TypedValueSegment, ValueSegment};

/// Position of a value inside a dictionary segment's sorted dictionary.
///
/// `dictionary.len()` is reserved as the segment's null id.
pub type ValueId = u32;

/// A physical domain a typed segment can be monomorphized over.
///
/// `total_cmp` must be a total order; for floats this is IEEE `totalOrder`,
/// which keeps dictionary construction well-defined in the presence of NaN.
pub trait SegmentValue: Clone + Default + fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Coerce an untyped cell into this domain. `None` for NULL or a
    /// mismatched domain; the caller decides which of the two it was.
    fn from_value(value: &Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

impl SegmentValue for i64 {
    const DATA_TYPE: DataType = DataType::Int64;

    #[inline]
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    #[inline]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    fn to_value(&self) -> Value {
        Value::Int64(*self)
    }
}

impl SegmentValue for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    #[inline]
    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }

    #[inline]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    fn to_value(&self) -> Value {
        Value::Float64(*self)
    }
}

impl SegmentValue for String {
    const DATA_TYPE: DataType = DataType::Utf8;

    #[inline]
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    #[inline]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Utf8(v) => Some(v.clone()),
            _ => None,
        }
    }

    #[inline]
    fn to_value(&self) -> Value {
        Value::Utf8(self.clone())
    }
}

/// Dispatch over the typed variants of a [`ValueSegment`].
#[macro_export]
macro_rules! with_value_segment {
    ($seg:expr, $inner:ident => $body:expr) => {
        match $seg {
            $crate::segment::ValueSegment::Int64($inner) => $body,
            $crate::segment::ValueSegment::Float64($inner) => $body,
            $crate::segment::ValueSegment::Utf8($inner) => $body,
        }
    };
}

/// Dispatch over the typed variants of a [`DictionarySegment`].
#[macro_export]
macro_rules! with_dictionary_segment {
    ($seg:expr, $inner:ident => $body:expr) => {
        match $seg {
            $crate::segment::DictionarySegment::Int64($inner) => $body,
            $crate::segment::DictionarySegment::Float64($inner) => $body,
            $crate::segment::DictionarySegment::Utf8($inner) => $body,
        }
    };
}

/// Dispatch over the typed variants of a [`RunLengthSegment`].
#[macro_export]
macro_rules! with_run_length_segment {
    ($seg:expr, $inner:ident => $body:expr) => {
        match $seg {
            $crate::segment::RunLengthSegment::Int64($inner) => $body,
            $crate::segment::RunLengthSegment::Float64($inner) => $body,
            $crate::segment::RunLengthSegment::Utf8($inner) => $body,
        }
    };
}

/// Physical encoding of a segment, for logging and encoder decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingKind {
    Unencoded,
    Dictionary,
    RunLength,
    Reference,
}

/// One column's data for one chunk, polymorphic over encoding.
#[derive(Debug)]
pub enum Segment {
    Value(ValueSegment),
    Dictionary(DictionarySegment),
    RunLength(RunLengthSegment),
    Reference(ReferenceSegment),
}

impl Segment {
    pub fn len(&self) -> usize {
        match self {
            Segment::Value(s) => s.len(),
            Segment::Dictionary(s) => s.len(),
            Segment::RunLength(s) => s.len(),
            Segment::Reference(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> EncodingKind {
        match self {
            Segment::Value(_) => EncodingKind::Unencoded,
            Segment::Dictionary(_) => EncodingKind::Dictionary,
            Segment::RunLength(_) => EncodingKind::RunLength,
            Segment::Reference(_) => EncodingKind::Reference,
        }
    }

    /// Logical domain of the segment. For reference segments this is the
    /// referenced column's domain, cached at construction.
    pub fn data_type(&self) -> DataType {
        match self {
            Segment::Value(s) => s.data_type(),
            Segment::Dictionary(s) => s.data_type(),
            Segment::RunLength(s) => s.data_type(),
            Segment::Reference(s) => s.data_type(),
        }
    }

    /// Random positional read, materialized as an untyped cell.
    ///
    /// Resolves reference indirection (including chained references). This is
    /// the slow generic read path used by routing, tests and materialization;
    /// scans go through the typed dispatch macros instead.
    ///
    /// Panics if `offset >= len()`; position lists that point outside a
    /// segment are corrupt by construction.
    pub fn value_at(&self, offset: ChunkOffset) -> Value {
        match self {
            Segment::Value(s) => s.value_at(offset),
            Segment::Dictionary(s) => s.value_at(offset),
            Segment::RunLength(s) => s.value_at(offset),
            Segment::Reference(s) => s.value_at(offset),
        }
    }
}
