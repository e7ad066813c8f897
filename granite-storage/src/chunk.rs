//! Chunks: fixed-capacity horizontal slices of a table.
//!
//! A chunk owns one segment per column and every segment carries the same
//! row count. Chunks grow only through [`Chunk::append_row`] while all their
//! segments are still unencoded; once a chunk reaches its table's target size
//! (or is re-encoded) it is sealed and never mutated again.

use granite_result::{Error, Result};
use granite_types::{ColumnId, Value};

use crate::segment::{Segment, ValueSegment};
use crate::table::ColumnDefinition;

#[derive(Debug)]
pub struct Chunk {
    segments: Vec<Segment>,
}

impl Chunk {
    /// Open an empty chunk with one growable value segment per column.
    pub(crate) fn open(columns: &[ColumnDefinition]) -> Chunk {
        let segments = columns
            .iter()
            .map(|c| Segment::Value(ValueSegment::open(c.data_type, c.nullable)))
            .collect();
        Chunk { segments }
    }

    /// Assemble a chunk from pre-built segments (used for reference-segment
    /// outputs). All segments must agree on the row count.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Chunk> {
        let Some(first) = segments.first() else {
            return Err(Error::contract_violation(
                "Chunk::from_segments",
                "a chunk needs at least one segment",
            ));
        };
        let rows = first.len();
        if let Some(mismatch) = segments.iter().position(|s| s.len() != rows) {
            return Err(Error::contract_violation(
                "Chunk::from_segments",
                format!(
                    "segment for column {mismatch} has {} rows, expected {rows}",
                    segments[mismatch].len()
                ),
            ));
        }
        Ok(Chunk { segments })
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.segments.first().map_or(0, |s| s.len())
    }

    pub fn get_segment(&self, column_id: ColumnId) -> Result<&Segment> {
        self.segments.get(column_id as usize).ok_or_else(|| {
            Error::contract_violation(
                "Chunk::get_segment",
                format!(
                    "column id {column_id} outside schema of {} columns",
                    self.segments.len()
                ),
            )
        })
    }

    /// A chunk is mutable while every segment is still unencoded.
    pub fn is_mutable(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Value(_)))
    }

    pub(crate) fn append_row(&mut self, values: &[Value]) -> Result<()> {
        for (segment, value) in self.segments.iter_mut().zip(values) {
            match segment {
                Segment::Value(s) => s.push_value(value)?,
                _ => {
                    return Err(Error::contract_violation(
                        "Chunk::append_row",
                        "chunk is sealed (contains encoded segments)",
                    ));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn replace_segment(&mut self, column_id: ColumnId, segment: Segment) {
        self.segments[column_id as usize] = segment;
    }
}
