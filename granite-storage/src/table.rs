//! Tables: the authoritative chunk arena plus schema and partitioning.

use granite_result::{Error, Result};
use granite_types::{ChunkId, ColumnId, DataType, Value};
use tracing::debug;

use crate::chunk::Chunk;
use crate::encoding::{self, SegmentEncodingSpec};
use crate::partitioning::{NullPartitionSchema, PartitionSchema};

/// Schema entry for one column.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnDefinition {
    pub fn new<N: Into<String>>(name: N, data_type: DataType, nullable: bool) -> Self {
        ColumnDefinition {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// A table instance: column definitions, the chunk arena and the partition
/// schema that places and prunes chunks.
///
/// The table is the single owner of its chunks; partitions only hold chunk
/// ids. All mutation goes through `&mut self`, so once a table is shared
/// (e.g. wrapped in `Arc` for a scan), it is read-only by construction.
#[derive(Debug)]
pub struct Table {
    columns: Vec<ColumnDefinition>,
    chunks: Vec<Chunk>,
    partition_schema: PartitionSchema,
    target_chunk_size: usize,
}

impl Table {
    pub const DEFAULT_TARGET_CHUNK_SIZE: usize = 65_535;

    pub fn new(
        columns: Vec<ColumnDefinition>,
        partition_schema: PartitionSchema,
        target_chunk_size: usize,
    ) -> Result<Table> {
        if columns.is_empty() {
            return Err(Error::contract_violation(
                "Table::new",
                "a table needs at least one column",
            ));
        }
        if target_chunk_size == 0 {
            return Err(Error::contract_violation(
                "Table::new",
                "target chunk size must be at least 1",
            ));
        }
        if let Some(column_id) = partition_schema.partition_column()
            && column_id as usize >= columns.len()
        {
            return Err(Error::contract_violation(
                "Table::new",
                format!(
                    "partition column {column_id} outside schema of {} columns",
                    columns.len()
                ),
            ));
        }
        if !partition_schema.is_unpopulated() {
            return Err(Error::contract_violation(
                "Table::new",
                "partition schema already owns chunks",
            ));
        }
        Ok(Table {
            columns,
            chunks: Vec::new(),
            partition_schema,
            target_chunk_size,
        })
    }

    /// Convenience constructor: one partition, default chunk capacity.
    pub fn new_single_partition(columns: Vec<ColumnDefinition>) -> Result<Table> {
        Table::new(
            columns,
            PartitionSchema::Null(NullPartitionSchema::new()),
            Self::DEFAULT_TARGET_CHUNK_SIZE,
        )
    }

    /// Assemble a table from pre-built chunks (reference-segment outputs).
    /// Chunks land in a single partition in the order given.
    pub fn from_chunks(columns: Vec<ColumnDefinition>, chunks: Vec<Chunk>) -> Result<Table> {
        let mut table = Table::new(
            columns,
            PartitionSchema::Null(NullPartitionSchema::new()),
            Self::DEFAULT_TARGET_CHUNK_SIZE,
        )?;
        for (chunk_id, chunk) in chunks.iter().enumerate() {
            if chunk.column_count() != table.columns.len() {
                return Err(Error::contract_violation(
                    "Table::from_chunks",
                    format!(
                        "chunk {chunk_id} has {} segments, schema has {} columns",
                        chunk.column_count(),
                        table.columns.len()
                    ),
                ));
            }
            for (column_id, column) in table.columns.iter().enumerate() {
                let segment = chunk.get_segment(column_id as ColumnId)?;
                if segment.data_type() != column.data_type {
                    return Err(Error::contract_violation(
                        "Table::from_chunks",
                        format!(
                            "chunk {chunk_id} column {column_id} is {}, schema says {}",
                            segment.data_type(),
                            column.data_type
                        ),
                    ));
                }
            }
        }
        for (chunk_id, chunk) in chunks.into_iter().enumerate() {
            table.chunks.push(chunk);
            table
                .partition_schema
                .register_chunk(0, chunk_id as ChunkId);
        }
        Ok(table)
    }

    pub fn column_definitions(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_id_by_name(&self, name: &str) -> Result<ColumnId> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .map(|i| i as ColumnId)
            .ok_or_else(|| {
                Error::contract_violation(
                    "Table::column_id_by_name",
                    format!("no column named `{name}`"),
                )
            })
    }

    pub fn data_type_of(&self, column_id: ColumnId) -> Result<DataType> {
        self.column(column_id).map(|c| c.data_type)
    }

    pub fn is_nullable(&self, column_id: ColumnId) -> Result<bool> {
        self.column(column_id).map(|c| c.nullable)
    }

    fn column(&self, column_id: ColumnId) -> Result<&ColumnDefinition> {
        self.columns.get(column_id as usize).ok_or_else(|| {
            Error::contract_violation(
                "Table::column",
                format!(
                    "column id {column_id} outside schema of {} columns",
                    self.columns.len()
                ),
            )
        })
    }

    pub fn chunk_count(&self) -> ChunkId {
        self.chunks.len() as ChunkId
    }

    pub fn get_chunk(&self, chunk_id: ChunkId) -> Result<&Chunk> {
        self.chunks.get(chunk_id as usize).ok_or_else(|| {
            Error::contract_violation(
                "Table::get_chunk",
                format!("chunk id {chunk_id} outside table with {} chunks", self.chunks.len()),
            )
        })
    }

    pub fn row_count(&self) -> u64 {
        self.chunks.iter().map(|c| c.row_count() as u64).sum()
    }

    pub fn partition_schema(&self) -> &PartitionSchema {
        &self.partition_schema
    }

    pub fn target_chunk_size(&self) -> usize {
        self.target_chunk_size
    }

    /// Append one row. The partition schema picks the partition; the row
    /// lands in that partition's open chunk, opening a fresh chunk in the
    /// arena when the current one is full or sealed.
    pub fn append(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::contract_violation(
                "Table::append",
                format!(
                    "row has {} values, schema has {} columns",
                    values.len(),
                    self.columns.len()
                ),
            ));
        }
        for (column, value) in self.columns.iter().zip(&values) {
            if value.is_null() {
                if !column.nullable {
                    return Err(Error::contract_violation(
                        "Table::append",
                        format!("NULL for non-nullable column `{}`", column.name),
                    ));
                }
            } else if value.data_type() != Some(column.data_type) {
                return Err(Error::contract_violation(
                    "Table::append",
                    format!(
                        "value {value} does not fit column `{}` ({})",
                        column.name, column.data_type
                    ),
                ));
            }
        }

        let partition_id = self.partition_schema.route(&values)?;
        let open_chunk = self
            .partition_schema
            .partition(partition_id)?
            .last_chunk_id()
            .filter(|&chunk_id| {
                let chunk = &self.chunks[chunk_id as usize];
                chunk.is_mutable() && chunk.row_count() < self.target_chunk_size
            });
        let chunk_id = match open_chunk {
            Some(chunk_id) => chunk_id,
            None => {
                let chunk_id = self.chunks.len() as ChunkId;
                self.chunks.push(Chunk::open(&self.columns));
                self.partition_schema.register_chunk(partition_id, chunk_id);
                debug!(chunk_id, partition_id, "opened chunk");
                chunk_id
            }
        };
        self.chunks[chunk_id as usize].append_row(&values)
    }

    /// Re-encode every segment of a sealed (or full) chunk. Encoding is
    /// chosen per call and never revisited at runtime.
    pub fn compress_chunk(&mut self, chunk_id: ChunkId, spec: SegmentEncodingSpec) -> Result<()> {
        self.get_chunk(chunk_id)?;
        let chunk = &self.chunks[chunk_id as usize];
        if !chunk.is_mutable() {
            return Err(Error::contract_violation(
                "Table::compress_chunk",
                format!("chunk {chunk_id} is already encoded"),
            ));
        }
        let encoded: Vec<_> = (0..self.columns.len())
            .map(|column_id| {
                let segment = chunk.get_segment(column_id as ColumnId)?;
                match segment {
                    crate::segment::Segment::Value(value_segment) => {
                        Ok(encoding::encode_value_segment(value_segment, spec))
                    }
                    _ => unreachable!("mutable chunks hold value segments only"),
                }
            })
            .collect::<Result<_>>()?;
        let chunk = &mut self.chunks[chunk_id as usize];
        for (column_id, segment) in encoded.into_iter().enumerate() {
            chunk.replace_segment(column_id as ColumnId, segment);
        }
        debug!(chunk_id, ?spec, "compressed chunk");
        Ok(())
    }
}
