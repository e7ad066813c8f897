//! Chunk encoding: turning finished value segments into compressed ones.

use tracing::trace;

use crate::segment::{
    DictionarySegment, RunLengthSegment, Segment, TypedDictionarySegment, TypedRunLengthSegment,
    ValueSegment, VectorCompression,
};

/// Target encoding for a compression pass over a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentEncodingSpec {
    Dictionary(VectorCompression),
    RunLength,
}

/// Encode one finished value segment. The logical cell sequence (values and
/// nulls, in row order) is preserved exactly.
pub fn encode_value_segment(segment: &ValueSegment, spec: SegmentEncodingSpec) -> Segment {
    let encoded = match (segment, spec) {
        (ValueSegment::Int64(s), SegmentEncodingSpec::Dictionary(compression)) => {
            Segment::Dictionary(DictionarySegment::Int64(
                TypedDictionarySegment::from_typed_values(s.iter().map(|(_, v)| v), compression),
            ))
        }
        (ValueSegment::Float64(s), SegmentEncodingSpec::Dictionary(compression)) => {
            Segment::Dictionary(DictionarySegment::Float64(
                TypedDictionarySegment::from_typed_values(s.iter().map(|(_, v)| v), compression),
            ))
        }
        (ValueSegment::Utf8(s), SegmentEncodingSpec::Dictionary(compression)) => {
            Segment::Dictionary(DictionarySegment::Utf8(
                TypedDictionarySegment::from_typed_values(s.iter().map(|(_, v)| v), compression),
            ))
        }
        (ValueSegment::Int64(s), SegmentEncodingSpec::RunLength) => Segment::RunLength(
            RunLengthSegment::Int64(TypedRunLengthSegment::from_typed_values(
                s.iter().map(|(_, v)| v),
            )),
        ),
        (ValueSegment::Float64(s), SegmentEncodingSpec::RunLength) => Segment::RunLength(
            RunLengthSegment::Float64(TypedRunLengthSegment::from_typed_values(
                s.iter().map(|(_, v)| v),
            )),
        ),
        (ValueSegment::Utf8(s), SegmentEncodingSpec::RunLength) => Segment::RunLength(
            RunLengthSegment::Utf8(TypedRunLengthSegment::from_typed_values(
                s.iter().map(|(_, v)| v),
            )),
        ),
    };
    trace!(
        rows = encoded.len(),
        encoding = ?encoded.encoding(),
        "encoded segment"
    );
    encoded
}
