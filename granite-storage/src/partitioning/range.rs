//! Range partitioning: strictly ascending exclusive upper bounds, one extra
//! unbounded partition at the top.

use std::cmp::Ordering;

use granite_result::{Error, Result};
use granite_types::{ColumnId, PartitionId, Value};

use super::Partition;

#[derive(Debug)]
pub struct RangePartitionSchema {
    column_id: ColumnId,
    /// Exclusive upper bound of partition `i`; partition `bounds.len()` is
    /// unbounded. All bounds share one domain and ascend strictly.
    upper_bounds: Vec<Value>,
    partitions: Vec<Partition>,
}

impl RangePartitionSchema {
    pub fn new(column_id: ColumnId, upper_bounds: Vec<Value>) -> Result<Self> {
        if upper_bounds.is_empty() {
            return Err(Error::contract_violation(
                "RangePartitionSchema::new",
                "at least one upper bound is required",
            ));
        }
        for pair in upper_bounds.windows(2) {
            match pair[0].cmp_same_type(&pair[1]) {
                Some(Ordering::Less) => {}
                Some(_) => {
                    return Err(Error::contract_violation(
                        "RangePartitionSchema::new",
                        format!("bounds must ascend strictly: {} !< {}", pair[0], pair[1]),
                    ));
                }
                None => {
                    return Err(Error::contract_violation(
                        "RangePartitionSchema::new",
                        format!("bounds mix domains: {} vs {}", pair[0], pair[1]),
                    ));
                }
            }
        }
        if upper_bounds.iter().any(Value::is_null) {
            return Err(Error::contract_violation(
                "RangePartitionSchema::new",
                "NULL is not a valid bound",
            ));
        }
        let partition_count = upper_bounds.len() + 1;
        Ok(RangePartitionSchema {
            column_id,
            upper_bounds,
            partitions: vec![Partition::default(); partition_count],
        })
    }

    #[inline]
    pub fn column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn upper_bounds(&self) -> &[Value] {
        &self.upper_bounds
    }

    /// Pure function of the partitioning-column value. NULLs route to
    /// partition 0; a value of the wrong domain is a contract violation.
    pub fn get_matching_partition_for(&self, value: &Value) -> Result<PartitionId> {
        if value.is_null() {
            return Ok(0);
        }
        let mut comparable = true;
        let idx = self.upper_bounds.partition_point(|bound| {
            match value.cmp_same_type(bound) {
                Some(Ordering::Greater | Ordering::Equal) => true,
                Some(Ordering::Less) => false,
                None => {
                    comparable = false;
                    false
                }
            }
        });
        if !comparable {
            return Err(Error::contract_violation(
                "RangePartitionSchema::get_matching_partition_for",
                format!("value {value} does not share the bounds' domain"),
            ));
        }
        Ok(idx as PartitionId)
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub(crate) fn partitions_mut(&mut self) -> &mut [Partition] {
        &mut self.partitions
    }
}
