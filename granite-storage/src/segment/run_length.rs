//! Run-length segments: consecutive equal cells collapsed into runs.

use std::cmp::Ordering;

use granite_types::{ChunkOffset, DataType, Value};

use super::SegmentValue;

#[derive(Debug, Clone)]
pub struct TypedRunLengthSegment<T: SegmentValue> {
    /// One entry per run; `None` is a null run.
    run_values: Vec<Option<T>>,
    /// Inclusive end offset per run, strictly increasing.
    end_offsets: Vec<ChunkOffset>,
}

impl<T: SegmentValue> TypedRunLengthSegment<T> {
    /// Encode a finished sequence of cells.
    pub fn from_typed_values<'a, I>(cells: I) -> Self
    where
        I: Iterator<Item = Option<&'a T>>,
        T: 'a,
    {
        let mut run_values: Vec<Option<T>> = Vec::new();
        let mut end_offsets: Vec<ChunkOffset> = Vec::new();

        for (offset, cell) in cells.enumerate() {
            let offset = offset as ChunkOffset;
            let extends = match (run_values.last(), cell) {
                (Some(None), None) => true,
                (Some(Some(last)), Some(v)) => last.total_cmp(v) == Ordering::Equal,
                _ => false,
            };
            if extends {
                *end_offsets.last_mut().expect("run exists") = offset;
            } else {
                run_values.push(cell.cloned());
                end_offsets.push(offset);
            }
        }

        TypedRunLengthSegment {
            run_values,
            end_offsets,
        }
    }

    pub fn len(&self) -> usize {
        self.end_offsets.last().map_or(0, |&e| e as usize + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.end_offsets.is_empty()
    }

    pub fn run_count(&self) -> usize {
        self.run_values.len()
    }

    /// Random positional read; binary search over run ends.
    ///
    /// Panics if `offset >= len()`.
    pub fn get(&self, offset: ChunkOffset) -> Option<&T> {
        assert!((offset as usize) < self.len(), "offset {offset} out of bounds");
        let run = self.end_offsets.partition_point(|&e| e < offset);
        self.run_values[run].as_ref()
    }

    /// Runs as `(value-or-null, inclusive end offset)`, for run-at-a-time
    /// scan loops.
    pub fn runs(&self) -> impl Iterator<Item = (Option<&T>, ChunkOffset)> {
        self.run_values
            .iter()
            .zip(self.end_offsets.iter())
            .map(|(v, &e)| (v.as_ref(), e))
    }

    /// Sequential iteration over `(row offset, value-or-null)`.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkOffset, Option<&T>)> {
        let mut start = 0;
        self.runs().flat_map(move |(v, end)| {
            let range = start..=end;
            start = end + 1;
            range.map(move |offset| (offset, v))
        })
    }
}

/// Run-length-encoded segment, dispatched over the physical domains.
#[derive(Debug, Clone)]
pub enum RunLengthSegment {
    Int64(TypedRunLengthSegment<i64>),
    Float64(TypedRunLengthSegment<f64>),
    Utf8(TypedRunLengthSegment<String>),
}

impl RunLengthSegment {
    pub fn len(&self) -> usize {
        crate::with_run_length_segment!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            RunLengthSegment::Int64(_) => DataType::Int64,
            RunLengthSegment::Float64(_) => DataType::Float64,
            RunLengthSegment::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn value_at(&self, offset: ChunkOffset) -> Value {
        crate::with_run_length_segment!(self, s => match s.get(offset) {
            Some(v) => v.to_value(),
            None => Value::Null,
        })
    }
}
