//! Partition schemas: chunk placement and provably sound chunk pruning.
//!
//! A table's chunks are grouped into partitions by a schema variant. The
//! schema routes appended rows to a partition and answers the pruning
//! question for scans: which chunks cannot possibly contain a match for a
//! given predicate. Partitions only index chunks (`Vec<ChunkId>`); the table
//! arena stays the single owner.

use granite_expr::PredicateCondition;
use granite_result::{Error, Result};
use granite_types::{ChunkId, ColumnId, PartitionId, Value};
use rustc_hash::FxHashSet;

pub mod hash;
pub mod null;
pub mod range;
pub mod round_robin;

pub use hash::{HashFunction, HashPartitionSchema, fx_hash_value};
pub use null::NullPartitionSchema;
pub use range::RangePartitionSchema;
pub use round_robin::RoundRobinPartitionSchema;

/// One partition: an ordered, non-owning index list into the table's chunks.
#[derive(Debug, Default, Clone)]
pub struct Partition {
    chunk_ids: Vec<ChunkId>,
}

impl Partition {
    pub fn chunk_ids(&self) -> &[ChunkId] {
        &self.chunk_ids
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }

    /// The partition's open chunk is always the last one registered.
    pub fn last_chunk_id(&self) -> Option<ChunkId> {
        self.chunk_ids.last().copied()
    }

    pub(crate) fn add_chunk(&mut self, chunk_id: ChunkId) {
        self.chunk_ids.push(chunk_id);
    }
}

/// Closed variant set of partition schemas.
#[derive(Debug)]
pub enum PartitionSchema {
    Null(NullPartitionSchema),
    Hash(HashPartitionSchema),
    Range(RangePartitionSchema),
    RoundRobin(RoundRobinPartitionSchema),
}

impl PartitionSchema {
    pub fn name(&self) -> &'static str {
        match self {
            PartitionSchema::Null(_) => "NullPartition",
            PartitionSchema::Hash(_) => "HashPartition",
            PartitionSchema::Range(_) => "RangePartition",
            PartitionSchema::RoundRobin(_) => "RoundRobinPartition",
        }
    }

    /// Fixed at construction for every variant.
    pub fn partition_count(&self) -> PartitionId {
        self.partitions().len() as PartitionId
    }

    pub fn partitions(&self) -> &[Partition] {
        match self {
            PartitionSchema::Null(s) => s.partitions(),
            PartitionSchema::Hash(s) => s.partitions(),
            PartitionSchema::Range(s) => s.partitions(),
            PartitionSchema::RoundRobin(s) => s.partitions(),
        }
    }

    pub fn partition(&self, partition_id: PartitionId) -> Result<&Partition> {
        self.partitions().get(partition_id as usize).ok_or_else(|| {
            Error::contract_violation(
                "PartitionSchema::partition",
                format!(
                    "partition id {partition_id} outside schema with {} partitions",
                    self.partition_count()
                ),
            )
        })
    }

    /// The column routing depends on, for schemas where one exists.
    pub fn partition_column(&self) -> Option<ColumnId> {
        match self {
            PartitionSchema::Hash(s) => Some(s.column_id()),
            PartitionSchema::Range(s) => Some(s.column_id()),
            PartitionSchema::Null(_) | PartitionSchema::RoundRobin(_) => None,
        }
    }

    /// Whether chunk placement depends on row contents at all.
    pub fn is_partitioned(&self) -> bool {
        !matches!(self, PartitionSchema::Null(_))
    }

    /// Deterministic partition for a single partitioning-column value.
    ///
    /// Pure for Hash and Range; Null trivially returns partition 0.
    /// RoundRobin placement is not value-determined, so asking is a contract
    /// violation.
    pub fn get_matching_partition_for(&self, value: &Value) -> Result<PartitionId> {
        match self {
            PartitionSchema::Null(_) => Ok(0),
            PartitionSchema::Hash(s) => Ok(s.get_matching_partition_for(value)),
            PartitionSchema::Range(s) => s.get_matching_partition_for(value),
            PartitionSchema::RoundRobin(_) => Err(Error::contract_violation(
                "PartitionSchema::get_matching_partition_for",
                "round-robin placement is not a function of row values",
            )),
        }
    }

    /// Chunks that provably cannot contain a row matching
    /// `column <condition> value` on the partitioning column.
    ///
    /// Only equality prunes: the matching partition is unique, so every chunk
    /// of every other partition is excluded. All other conditions return the
    /// empty set — Hash gives no cross-partition ordering, and Range
    /// inequality pruning is deliberately left out (see DESIGN.md). Pruning
    /// is an optimization only; an empty set is always sound.
    pub fn get_chunk_ids_to_exclude(
        &self,
        condition: PredicateCondition,
        value: &Value,
    ) -> FxHashSet<ChunkId> {
        let mut excluded = FxHashSet::default();
        if condition != PredicateCondition::Equals || value.is_null() {
            return excluded;
        }
        let matching = match self {
            PartitionSchema::Hash(s) => s.get_matching_partition_for(value),
            PartitionSchema::Range(s) => match s.get_matching_partition_for(value) {
                Ok(pid) => pid,
                // Mistyped operand: stay conservative, prune nothing.
                Err(_) => return excluded,
            },
            PartitionSchema::Null(_) | PartitionSchema::RoundRobin(_) => return excluded,
        };
        for (pid, partition) in self.partitions().iter().enumerate() {
            if pid as PartitionId != matching {
                excluded.extend(partition.chunk_ids().iter().copied());
            }
        }
        tracing::trace!(
            schema = self.name(),
            matching_partition = matching,
            excluded = excluded.len(),
            "equality pruning"
        );
        excluded
    }

    /// Route one appended row to its partition. Mutates only the round-robin
    /// cursor; called from the table's single-writer append path.
    pub(crate) fn route(&mut self, values: &[Value]) -> Result<PartitionId> {
        match self {
            PartitionSchema::Null(_) => Ok(0),
            PartitionSchema::RoundRobin(s) => Ok(s.next_partition()),
            PartitionSchema::Hash(s) => Ok(s.get_matching_partition_for(&values[s.column_id() as usize])),
            PartitionSchema::Range(s) => s.get_matching_partition_for(&values[s.column_id() as usize]),
        }
    }

    pub(crate) fn register_chunk(&mut self, partition_id: PartitionId, chunk_id: ChunkId) {
        let partitions = match self {
            PartitionSchema::Null(s) => s.partitions_mut(),
            PartitionSchema::Hash(s) => s.partitions_mut(),
            PartitionSchema::Range(s) => s.partitions_mut(),
            PartitionSchema::RoundRobin(s) => s.partitions_mut(),
        };
        partitions[partition_id as usize].add_chunk(chunk_id);
    }

    /// True while no chunk has been registered; tables only accept fresh
    /// schemas.
    pub(crate) fn is_unpopulated(&self) -> bool {
        self.partitions().iter().all(|p| p.chunk_ids.is_empty())
    }
}
