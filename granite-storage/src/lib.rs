//! Encoding-polymorphic columnar storage for the granite scan engine.
//!
//! A [`table::Table`] owns an append-only arena of [`chunk::Chunk`]s; each
//! chunk owns one [`segment::Segment`] per column. Segments are a closed
//! variant set over four physical encodings (unencoded, dictionary,
//! run-length, reference), so predicate-evaluation code dispatches
//! exhaustively at compile time instead of through virtual calls on hot
//! per-row loops.
//!
//! Chunk placement is governed by a [`partitioning::PartitionSchema`], which
//! also answers the pruning question ("which chunks provably cannot match
//! this predicate?") for the scan orchestrator.
//!
//! Everything here is read-only during scans. Mutation (`append`,
//! `compress_chunk`) requires `&mut Table` and therefore a single writer.

pub mod chunk;
pub mod encoding;
pub mod partitioning;
pub mod segment;
pub mod table;

pub use chunk::Chunk;
pub use encoding::SegmentEncodingSpec;
pub use partitioning::{Partition, PartitionSchema};
pub use segment::{
    AttributeVector, DictionarySegment, EncodingKind, ReferenceSegment, RunLengthSegment, Segment,
    SegmentValue, TypedDictionarySegment, TypedRunLengthSegment, TypedValueSegment, ValueId,
    ValueSegment, VectorCompression,
};
pub use table::{ColumnDefinition, Table};
