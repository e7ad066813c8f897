//! Round-robin partitioning: rows cycle through partitions in append order.

use granite_result::{Error, Result};
use granite_types::PartitionId;

use super::Partition;

#[derive(Debug)]
pub struct RoundRobinPartitionSchema {
    partitions: Vec<Partition>,
    cursor: PartitionId,
}

impl RoundRobinPartitionSchema {
    pub fn new(partition_count: PartitionId) -> Result<Self> {
        if partition_count == 0 {
            return Err(Error::contract_violation(
                "RoundRobinPartitionSchema::new",
                "partition count must be at least 1",
            ));
        }
        Ok(RoundRobinPartitionSchema {
            partitions: vec![Partition::default(); partition_count as usize],
            cursor: 0,
        })
    }

    /// Advance the cursor; each appended row lands one partition further.
    pub(crate) fn next_partition(&mut self) -> PartitionId {
        let current = self.cursor;
        self.cursor = (self.cursor + 1) % self.partitions.len() as PartitionId;
        current
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub(crate) fn partitions_mut(&mut self) -> &mut [Partition] {
        &mut self.partitions
    }
}
