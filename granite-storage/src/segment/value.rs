//! Unencoded segments: a dense typed array plus an optional null bitmap.

use granite_result::{Error, Result};
use granite_types::{ChunkOffset, DataType, Value};

use super::SegmentValue;

/// Dense array of typed values. The only segment variant that grows; all
/// encoded variants are produced from a finished `TypedValueSegment`.
#[derive(Debug, Clone)]
pub struct TypedValueSegment<T: SegmentValue> {
    values: Vec<T>,
    /// `Some` iff the column is nullable. `true` marks a null row.
    nulls: Option<Vec<bool>>,
}

impl<T: SegmentValue> TypedValueSegment<T> {
    pub fn new(nullable: bool) -> Self {
        TypedValueSegment {
            values: Vec::new(),
            nulls: nullable.then(Vec::new),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nulls.is_some()
    }

    /// Random positional read; `None` is a null row.
    ///
    /// Panics if `offset >= len()`.
    #[inline]
    pub fn get(&self, offset: ChunkOffset) -> Option<&T> {
        let idx = offset as usize;
        match &self.nulls {
            Some(nulls) if nulls[idx] => None,
            _ => Some(&self.values[idx]),
        }
    }

    pub fn push(&mut self, cell: Option<T>) -> Result<()> {
        match cell {
            Some(v) => {
                self.values.push(v);
                if let Some(nulls) = &mut self.nulls {
                    nulls.push(false);
                }
            }
            None => {
                let Some(nulls) = &mut self.nulls else {
                    return Err(Error::contract_violation(
                        "ValueSegment::push",
                        "NULL appended to a non-nullable segment",
                    ));
                };
                // The dense array stays aligned; the slot's content is never
                // observable behind the bitmap.
                self.values.push(T::default());
                nulls.push(true);
            }
        }
        Ok(())
    }

    /// Sequential iteration over `(row offset, value-or-null)`.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkOffset, Option<&T>)> {
        self.values.iter().enumerate().map(|(i, v)| {
            let is_null = self.nulls.as_ref().is_some_and(|n| n[i]);
            (i as ChunkOffset, (!is_null).then_some(v))
        })
    }
}

/// Unencoded segment, dispatched over the physical domains.
#[derive(Debug, Clone)]
pub enum ValueSegment {
    Int64(TypedValueSegment<i64>),
    Float64(TypedValueSegment<f64>),
    Utf8(TypedValueSegment<String>),
}

impl ValueSegment {
    /// Open an empty growable segment of the given domain.
    pub fn open(data_type: DataType, nullable: bool) -> Self {
        match data_type {
            DataType::Int64 => ValueSegment::Int64(TypedValueSegment::new(nullable)),
            DataType::Float64 => ValueSegment::Float64(TypedValueSegment::new(nullable)),
            DataType::Utf8 => ValueSegment::Utf8(TypedValueSegment::new(nullable)),
        }
    }

    pub fn len(&self) -> usize {
        crate::with_value_segment!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ValueSegment::Int64(_) => DataType::Int64,
            ValueSegment::Float64(_) => DataType::Float64,
            ValueSegment::Utf8(_) => DataType::Utf8,
        }
    }

    /// Append one untyped cell, coercing it into the segment's domain.
    pub fn push_value(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return crate::with_value_segment!(self, s => s.push(None));
        }
        match self {
            ValueSegment::Int64(s) => match i64::from_value(value) {
                Some(v) => s.push(Some(v)),
                None => Err(domain_mismatch(DataType::Int64, value)),
            },
            ValueSegment::Float64(s) => match f64::from_value(value) {
                Some(v) => s.push(Some(v)),
                None => Err(domain_mismatch(DataType::Float64, value)),
            },
            ValueSegment::Utf8(s) => match String::from_value(value) {
                Some(v) => s.push(Some(v)),
                None => Err(domain_mismatch(DataType::Utf8, value)),
            },
        }
    }

    pub fn value_at(&self, offset: ChunkOffset) -> Value {
        crate::with_value_segment!(self, s => match s.get(offset) {
            Some(v) => v.to_value(),
            None => Value::Null,
        })
    }
}

fn domain_mismatch(expected: DataType, got: &Value) -> Error {
    Error::contract_violation(
        "ValueSegment::push_value",
        format!("expected {expected} cell, got {got}"),
    )
}
