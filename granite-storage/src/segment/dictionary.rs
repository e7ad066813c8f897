//! Dictionary segments: a sorted deduplicated value domain plus a packed
//! per-row index into it.
//!
//! The dictionary order is what makes operand translation cheap for scans:
//! a literal is turned into a value-id bound once (binary search over the
//! distinct values), and the per-row comparison becomes an integer test over
//! the attribute vector.

use std::cmp::Ordering;

use granite_types::{ChunkOffset, DataType, Value};

use super::{AttributeVector, SegmentValue, ValueId, VectorCompression};

#[derive(Debug, Clone)]
pub struct TypedDictionarySegment<T: SegmentValue> {
    /// Sorted, deduplicated distinct values.
    dictionary: Vec<T>,
    /// Row offset → dictionary position; `null_value_id` marks null rows.
    attribute_vector: AttributeVector,
}

impl<T: SegmentValue> TypedDictionarySegment<T> {
    /// Encode a finished sequence of cells.
    pub fn from_typed_values<'a, I>(cells: I, compression: VectorCompression) -> Self
    where
        I: Iterator<Item = Option<&'a T>>,
        T: 'a,
    {
        let cells: Vec<Option<&T>> = cells.collect();

        let mut dictionary: Vec<T> = cells
            .iter()
            .filter_map(|cell| cell.map(T::clone))
            .collect();
        dictionary.sort_unstable_by(|a, b| a.total_cmp(b));
        dictionary.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);

        let null_value_id = dictionary.len() as ValueId;
        let ids: Vec<ValueId> = cells
            .iter()
            .map(|cell| match *cell {
                None => null_value_id,
                Some(v) => {
                    let pos = dictionary
                        .binary_search_by(|d| d.total_cmp(v))
                        .expect("dictionary misses a value it was built from");
                    pos as ValueId
                }
            })
            .collect();

        let attribute_vector = AttributeVector::from_value_ids(&ids, null_value_id, compression);
        TypedDictionarySegment {
            dictionary,
            attribute_vector,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attribute_vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dictionary(&self) -> &[T] {
        &self.dictionary
    }

    pub fn unique_values_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Reserved id denoting a null row in the attribute vector.
    #[inline]
    pub fn null_value_id(&self) -> ValueId {
        self.dictionary.len() as ValueId
    }

    #[inline]
    pub fn attribute_vector(&self) -> &AttributeVector {
        &self.attribute_vector
    }

    /// First dictionary position whose value is not less than `value`; the
    /// dictionary length when every entry is smaller. This is the insertion
    /// point an absent operand maps to.
    pub fn lower_bound(&self, value: &T) -> ValueId {
        self.dictionary
            .partition_point(|d| d.total_cmp(value) == Ordering::Less) as ValueId
    }

    /// First dictionary position whose value is greater than `value`.
    pub fn upper_bound(&self, value: &T) -> ValueId {
        self.dictionary
            .partition_point(|d| d.total_cmp(value) != Ordering::Greater) as ValueId
    }

    /// Exact dictionary position of `value`, if present.
    pub fn value_id_of(&self, value: &T) -> Option<ValueId> {
        self.dictionary
            .binary_search_by(|d| d.total_cmp(value))
            .ok()
            .map(|pos| pos as ValueId)
    }

    /// Dictionary entry behind `id`; `None` for the null id.
    pub fn value_of_id(&self, id: ValueId) -> Option<&T> {
        self.dictionary.get(id as usize)
    }

    /// Random positional read; `None` is a null row.
    ///
    /// Panics if `offset >= len()`.
    pub fn get(&self, offset: ChunkOffset) -> Option<&T> {
        let id = self.attribute_vector.get(offset);
        self.value_of_id(id)
    }

    /// Sequential iteration over `(row offset, value-or-null)`.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkOffset, Option<&T>)> {
        self.attribute_vector
            .iter()
            .enumerate()
            .map(|(i, id)| (i as ChunkOffset, self.value_of_id(id)))
    }
}

/// Dictionary-encoded segment, dispatched over the physical domains.
#[derive(Debug, Clone)]
pub enum DictionarySegment {
    Int64(TypedDictionarySegment<i64>),
    Float64(TypedDictionarySegment<f64>),
    Utf8(TypedDictionarySegment<String>),
}

impl DictionarySegment {
    pub fn len(&self) -> usize {
        crate::with_dictionary_segment!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            DictionarySegment::Int64(_) => DataType::Int64,
            DictionarySegment::Float64(_) => DataType::Float64,
            DictionarySegment::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn unique_values_count(&self) -> usize {
        crate::with_dictionary_segment!(self, s => s.unique_values_count())
    }

    pub fn null_value_id(&self) -> ValueId {
        crate::with_dictionary_segment!(self, s => s.null_value_id())
    }

    pub fn attribute_vector(&self) -> &AttributeVector {
        crate::with_dictionary_segment!(self, s => s.attribute_vector())
    }

    pub fn value_at(&self, offset: ChunkOffset) -> Value {
        crate::with_dictionary_segment!(self, s => match s.get(offset) {
            Some(v) => v.to_value(),
            None => Value::Null,
        })
    }
}
