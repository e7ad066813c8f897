//! Hash partitioning: `hash(values[column]) % partition_count`.

use std::hash::Hasher;

use granite_result::{Error, Result};
use granite_types::{ColumnId, PartitionId, Value};
use rustc_hash::FxHasher;

use super::Partition;

/// Hash function over a partitioning-column value. Must be deterministic;
/// routing and pruning rely on recomputing the same partition.
pub type HashFunction = fn(&Value) -> u64;

/// Default hash: FxHasher over the domain discriminant and the value's bits.
/// Floats hash their IEEE bits, so routing is exact (no epsilon folding).
pub fn fx_hash_value(value: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    match value {
        Value::Null => hasher.write_u8(0),
        Value::Int64(v) => {
            hasher.write_u8(1);
            hasher.write_i64(*v);
        }
        Value::Float64(v) => {
            hasher.write_u8(2);
            hasher.write_u64(v.to_bits());
        }
        Value::Utf8(v) => {
            hasher.write_u8(3);
            hasher.write(v.as_bytes());
        }
    }
    hasher.finish()
}

#[derive(Debug)]
pub struct HashPartitionSchema {
    column_id: ColumnId,
    hash_function: HashFunction,
    partitions: Vec<Partition>,
}

impl HashPartitionSchema {
    pub fn new(column_id: ColumnId, partition_count: PartitionId) -> Result<Self> {
        Self::with_hash_function(column_id, fx_hash_value, partition_count)
    }

    pub fn with_hash_function(
        column_id: ColumnId,
        hash_function: HashFunction,
        partition_count: PartitionId,
    ) -> Result<Self> {
        if partition_count == 0 {
            return Err(Error::contract_violation(
                "HashPartitionSchema::new",
                "partition count must be at least 1",
            ));
        }
        Ok(HashPartitionSchema {
            column_id,
            hash_function,
            partitions: vec![Partition::default(); partition_count as usize],
        })
    }

    #[inline]
    pub fn column_id(&self) -> ColumnId {
        self.column_id
    }

    /// Pure function of the partitioning-column value.
    pub fn get_matching_partition_for(&self, value: &Value) -> PartitionId {
        let hash = (self.hash_function)(value);
        (hash % self.partitions.len() as u64) as PartitionId
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub(crate) fn partitions_mut(&mut self) -> &mut [Partition] {
        &mut self.partitions
    }
}
