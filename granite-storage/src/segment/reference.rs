//! Reference segments: indirection into another table's rows.
//!
//! A reference segment owns no values. It stores a position list into a
//! referenced table plus the referenced column id; scans resolve the
//! indirection instead of reading cells here. One indirection level is the
//! common case, but references to reference segments resolve as well.

use std::sync::Arc;

use granite_result::{Error, Result};
use granite_types::{ChunkOffset, ColumnId, DataType, PosList, Value};

use crate::table::Table;

#[derive(Debug, Clone)]
pub struct ReferenceSegment {
    referenced_table: Arc<Table>,
    referenced_column_id: ColumnId,
    pos_list: Arc<PosList>,
    /// True when every non-null row id targets the same referenced chunk;
    /// lets scans bypass the group-by-chunk step.
    single_chunk: bool,
    /// Domain of the referenced column, cached at construction.
    data_type: DataType,
}

impl ReferenceSegment {
    pub fn new(
        referenced_table: Arc<Table>,
        referenced_column_id: ColumnId,
        pos_list: Arc<PosList>,
    ) -> Result<Self> {
        let data_type = referenced_table.data_type_of(referenced_column_id)?;

        let mut single_chunk = false;
        let mut seen_chunk = None;
        for row_id in pos_list.iter() {
            if row_id.is_null() {
                continue;
            }
            let chunk = referenced_table.get_chunk(row_id.chunk_id)?;
            if (row_id.chunk_offset as usize) >= chunk.row_count() {
                return Err(Error::contract_violation(
                    "ReferenceSegment::new",
                    format!(
                        "row id {row_id:?} is outside chunk {} ({} rows)",
                        row_id.chunk_id,
                        chunk.row_count()
                    ),
                ));
            }
            match seen_chunk {
                None => {
                    seen_chunk = Some(row_id.chunk_id);
                    single_chunk = true;
                }
                Some(c) if c == row_id.chunk_id => {}
                Some(_) => single_chunk = false,
            }
        }

        Ok(ReferenceSegment {
            referenced_table,
            referenced_column_id,
            pos_list,
            single_chunk,
            data_type,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pos_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_list.is_empty()
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn referenced_table(&self) -> &Arc<Table> {
        &self.referenced_table
    }

    #[inline]
    pub fn referenced_column_id(&self) -> ColumnId {
        self.referenced_column_id
    }

    pub fn pos_list(&self) -> &Arc<PosList> {
        &self.pos_list
    }

    #[inline]
    pub fn is_single_chunk(&self) -> bool {
        self.single_chunk
    }

    /// Random positional read through the indirection. Null row ids read as
    /// NULL cells.
    ///
    /// Panics if `offset >= len()`.
    pub fn value_at(&self, offset: ChunkOffset) -> Value {
        let row_id = self.pos_list[offset as usize];
        if row_id.is_null() {
            return Value::Null;
        }
        // Bounds were validated at construction; chained references recurse.
        let chunk = self
            .referenced_table
            .get_chunk(row_id.chunk_id)
            .expect("validated chunk id");
        let segment = chunk
            .get_segment(self.referenced_column_id)
            .expect("validated column id");
        segment.value_at(row_id.chunk_offset)
    }
}
