//! Identifiers and cell values shared across granite crates.
//!
//! These types live here so the storage, scan and partitioning crates can
//! exchange row identifiers and untyped cells without depending on each
//! other's internals.

pub mod ids;
pub mod value;

pub use ids::{
    ChunkId, ChunkOffset, ColumnId, INVALID_CHUNK_ID, INVALID_CHUNK_OFFSET, PartitionId, PosList,
    RowId,
};
pub use value::{DataType, Value};
