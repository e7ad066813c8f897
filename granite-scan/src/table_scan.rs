//! The scan orchestrator: prune, fan out, merge deterministically.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::debug;

use granite_expr::ScanPredicate;
use granite_result::{Error, Result};
use granite_scheduler::{ExecutionContext, Task};
use granite_storage::segment::{ReferenceSegment, Segment};
use granite_storage::{Chunk, ColumnDefinition, Table};
use granite_types::{ChunkId, ColumnId, PosList};

use crate::chunk_scan::ChunkScan;

/// Tuning knobs from collaborators above this layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanOptions {
    /// Estimated fraction of rows matching the predicate, from the
    /// statistics collaborator. Only pre-sizes the merged result; the scan
    /// works identically without it (one task per surviving chunk).
    pub selectivity_hint: Option<f64>,
}

/// A finished scan: the matching row identifiers plus the table they are
/// relative to.
///
/// When the scanned table held reference segments, the positions are entries
/// of those segments' position lists — row ids into the *referenced* table —
/// so chained scans never stack indirection per scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    table: Arc<Table>,
    positions: Arc<PosList>,
}

impl ScanResult {
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn positions(&self) -> &Arc<PosList> {
        &self.positions
    }

    /// Materialize the operator-output shape downstream collaborators
    /// consume: a single-chunk table of reference segments, one per column,
    /// all sharing this result's position list.
    pub fn to_reference_table(&self) -> Result<Arc<Table>> {
        let columns: Vec<ColumnDefinition> = self.table.column_definitions().to_vec();
        let mut segments = Vec::with_capacity(columns.len());
        for column_id in 0..columns.len() {
            let column_id = column_id as ColumnId;
            // Point at the ultimately referenced table when the source is
            // itself a reference table; the positions already live in that
            // coordinate space.
            let (target_table, target_column) = if self.table.chunk_count() == 0 {
                (Arc::clone(&self.table), column_id)
            } else {
                match self.table.get_chunk(0)?.get_segment(column_id)? {
                    Segment::Reference(reference) => (
                        Arc::clone(reference.referenced_table()),
                        reference.referenced_column_id(),
                    ),
                    _ => (Arc::clone(&self.table), column_id),
                }
            };
            segments.push(Segment::Reference(ReferenceSegment::new(
                target_table,
                target_column,
                Arc::clone(&self.positions),
            )?));
        }
        let chunk = Chunk::from_segments(segments)?;
        Ok(Arc::new(Table::from_chunks(columns, vec![chunk])?))
    }
}

/// Scans a whole table by composing partition pruning, per-chunk dispatch
/// and the task scheduler.
pub struct TableScan {
    table: Arc<Table>,
    predicate: ScanPredicate,
    options: ScanOptions,
}

impl TableScan {
    pub fn new(table: Arc<Table>, predicate: ScanPredicate) -> TableScan {
        TableScan {
            table,
            predicate,
            options: ScanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> TableScan {
        self.options = options;
        self
    }

    /// Run the scan on the given context: inline when no worker pool is
    /// installed, concurrent per-chunk tasks otherwise. The merged position
    /// list is ordered by chunk id (never by task completion), so the output
    /// is deterministic under any scheduling.
    pub fn execute(&self, context: &ExecutionContext) -> Result<ScanResult> {
        // Fail fast on a bad predicate before spawning anything.
        ChunkScan::new(&self.table, &self.predicate)?;

        let schema = self.table.partition_schema();
        let excluded: FxHashSet<ChunkId> = match schema.partition_column() {
            Some(column_id) if column_id == self.predicate.column_id => {
                schema.get_chunk_ids_to_exclude(self.predicate.condition, &self.predicate.value)
            }
            _ => FxHashSet::default(),
        };
        // Ascending chunk ids; the merge step relies on this order.
        let chunk_ids: Vec<ChunkId> = (0..self.table.chunk_count())
            .filter(|chunk_id| !excluded.contains(chunk_id))
            .collect();
        debug!(
            chunks = self.table.chunk_count(),
            pruned = excluded.len(),
            scanned = chunk_ids.len(),
            "table scan"
        );

        let slots: Arc<Vec<Mutex<Option<Result<PosList>>>>> =
            Arc::new((0..chunk_ids.len()).map(|_| Mutex::new(None)).collect());

        let mut scan_tasks: Vec<Arc<Task>> = Vec::with_capacity(chunk_ids.len());
        for (slot_index, &chunk_id) in chunk_ids.iter().enumerate() {
            let table = Arc::clone(&self.table);
            let predicate = self.predicate.clone();
            let slots = Arc::clone(&slots);
            let task = Task::new(move || {
                let result = ChunkScan::new(&table, &predicate)
                    .and_then(|scan| scan.scan_chunk(chunk_id));
                *slots[slot_index].lock() = Some(result);
            });
            task.set_description(format!("scan chunk {chunk_id}"))?;
            scan_tasks.push(task);
        }

        let estimated_matches = self.options.selectivity_hint.map(|selectivity| {
            (self.table.row_count() as f64 * selectivity.clamp(0.0, 1.0)) as usize
        });
        let merged: Arc<Mutex<Option<Result<PosList>>>> = Arc::new(Mutex::new(None));
        let merge_task = {
            let slots = Arc::clone(&slots);
            let merged = Arc::clone(&merged);
            Task::new(move || {
                let mut out: PosList = Vec::with_capacity(estimated_matches.unwrap_or(0));
                let mut failure = None;
                for slot in slots.iter() {
                    match slot.lock().take() {
                        Some(Ok(mut positions)) => out.append(&mut positions),
                        Some(Err(err)) => {
                            failure = Some(err);
                            break;
                        }
                        None => {
                            failure = Some(Error::contract_violation(
                                "TableScan::execute",
                                "scan task finished without depositing a result",
                            ));
                            break;
                        }
                    }
                }
                *merged.lock() = Some(match failure {
                    Some(err) => Err(err),
                    None => Ok(out),
                });
            })
        };
        merge_task.set_description("merge scan results")?;

        for task in &scan_tasks {
            task.set_as_predecessor_of(&merge_task)?;
        }
        for task in &scan_tasks {
            task.schedule(context)?;
        }
        merge_task.schedule(context)?;
        merge_task.join()?;

        let positions = merged
            .lock()
            .take()
            .ok_or_else(|| {
                Error::contract_violation(
                    "TableScan::execute",
                    "merge task did not deposit a result",
                )
            })??;
        Ok(ScanResult {
            table: Arc::clone(&self.table),
            positions: Arc::new(positions),
        })
    }
}
