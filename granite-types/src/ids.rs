//! Identifier types for chunks, columns, partitions and rows.

use std::fmt;

/// Index of a chunk within one table instance.
pub type ChunkId = u32;

/// Offset of a row within one chunk.
pub type ChunkOffset = u32;

/// Index of a column within a table's schema.
pub type ColumnId = u16;

/// Index of a partition within a partition schema.
pub type PartitionId = u16;

/// Sentinel chunk id used by [`RowId::NULL`].
pub const INVALID_CHUNK_ID: ChunkId = ChunkId::MAX;

/// Sentinel chunk offset used by [`RowId::NULL`].
pub const INVALID_CHUNK_OFFSET: ChunkOffset = ChunkOffset::MAX;

/// Identifier of one row, relative to a specific table instance.
///
/// A `RowId` is only meaningful together with the table it was produced from.
/// It is immutable once produced; scans, reference segments and joins pass it
/// around by value. Ordering is lexicographic `(chunk_id, chunk_offset)`,
/// which is exactly the order scans emit matches in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId {
    pub chunk_id: ChunkId,
    pub chunk_offset: ChunkOffset,
}

impl RowId {
    /// Marker for a row that does not exist, e.g. the padded side of an outer
    /// join. Reference segments may carry it inside their position lists.
    pub const NULL: RowId = RowId {
        chunk_id: INVALID_CHUNK_ID,
        chunk_offset: INVALID_CHUNK_OFFSET,
    };

    #[inline]
    pub fn new(chunk_id: ChunkId, chunk_offset: ChunkOffset) -> Self {
        RowId {
            chunk_id,
            chunk_offset,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.chunk_id == INVALID_CHUNK_ID
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "RowId(NULL)")
        } else {
            write!(f, "RowId({}, {})", self.chunk_id, self.chunk_offset)
        }
    }
}

/// Ordered sequence of row identifiers.
///
/// Produced by scans and stored inside reference segments. Insertion order
/// within a chunk is preserved; a global cross-chunk order only exists where a
/// producer (such as the scan orchestrator's merge step) guarantees one.
pub type PosList = Vec<RowId>;
