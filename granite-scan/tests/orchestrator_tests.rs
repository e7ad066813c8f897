use std::sync::Arc;

use granite_expr::{PredicateCondition, ScanPredicate};
use granite_scan::{ScanOptions, TableScan};
use granite_scheduler::{ExecutionContext, NodeQueueScheduler, Topology};
use granite_storage::partitioning::{HashPartitionSchema, NullPartitionSchema, PartitionSchema};
use granite_storage::{ColumnDefinition, SegmentEncodingSpec, Table, VectorCompression};
use granite_types::{DataType, PosList, Value};

fn build_table(schema: PartitionSchema, chunk_size: usize, rows: i64) -> Arc<Table> {
    let mut table = Table::new(
        vec![
            ColumnDefinition::new("k", DataType::Int64, false),
            ColumnDefinition::new("v", DataType::Int64, true),
        ],
        schema,
        chunk_size,
    )
    .unwrap();
    for i in 0..rows {
        table
            .append(vec![Value::Int64(i % 31), Value::Int64(i)])
            .unwrap();
    }
    Arc::new(table)
}

fn positions_of(table: &Arc<Table>, predicate: ScanPredicate, ctx: &ExecutionContext) -> PosList {
    TableScan::new(Arc::clone(table), predicate)
        .execute(ctx)
        .unwrap()
        .positions()
        .as_ref()
        .clone()
}

#[test]
fn worker_pool_and_inline_scans_agree() {
    let table = build_table(
        PartitionSchema::Null(NullPartitionSchema::new()),
        128,
        5_000,
    );
    let predicate = ScanPredicate::new(0, PredicateCondition::Equals, 7i64);

    let inline = positions_of(&table, predicate.clone(), &ExecutionContext::inline());

    let scheduler = NodeQueueScheduler::new(Topology::new(2, 2).unwrap());
    let ctx = ExecutionContext::with_scheduler(Arc::clone(&scheduler));
    // Concurrency must not perturb the output: run it a few times.
    for _ in 0..5 {
        let concurrent = positions_of(&table, predicate.clone(), &ctx);
        assert_eq!(concurrent, inline);
    }
    scheduler.finish();
}

#[test]
fn merged_output_is_ordered_by_chunk_id() {
    let table = build_table(
        PartitionSchema::Null(NullPartitionSchema::new()),
        64,
        2_000,
    );
    let scheduler = NodeQueueScheduler::new(Topology::single_node(4).unwrap());
    let ctx = ExecutionContext::with_scheduler(Arc::clone(&scheduler));

    let positions = positions_of(
        &table,
        ScanPredicate::new(0, PredicateCondition::LessThan, 5i64),
        &ctx,
    );
    assert!(!positions.is_empty());
    for pair in positions.windows(2) {
        assert!(
            pair[0] < pair[1],
            "output must ascend by (chunk id, offset) regardless of completion order"
        );
    }
    scheduler.finish();
}

#[test]
fn partition_pruning_shrinks_the_scan_without_changing_results() {
    let hash = build_table(
        PartitionSchema::Hash(HashPartitionSchema::new(0, 4).unwrap()),
        32,
        2_000,
    );

    // Pruning applies: equality on the partitioning column.
    let predicate = ScanPredicate::new(0, PredicateCondition::Equals, 7i64);
    let excluded = hash
        .partition_schema()
        .get_chunk_ids_to_exclude(predicate.condition, &predicate.value);
    assert!(!excluded.is_empty(), "expected pruning to kick in");

    let positions = positions_of(&hash, predicate, &ExecutionContext::inline());
    // Every row holding 7 must be found even though most chunks were pruned.
    let expected = (0..2_000i64).filter(|i| i % 31 == 7).count();
    assert_eq!(positions.len(), expected);
    for row_id in &positions {
        let chunk = hash.get_chunk(row_id.chunk_id).unwrap();
        assert_eq!(
            chunk.get_segment(0).unwrap().value_at(row_id.chunk_offset),
            Value::Int64(7)
        );
    }

    // Predicate on a non-partitioning column: no pruning, still correct.
    let on_v = positions_of(
        &hash,
        ScanPredicate::new(1, PredicateCondition::LessThan, 10i64),
        &ExecutionContext::inline(),
    );
    assert_eq!(on_v.len(), 10);
}

#[test]
fn encoded_partitioned_tables_scan_under_the_worker_pool() {
    let mut table = Table::new(
        vec![
            ColumnDefinition::new("k", DataType::Int64, false),
            ColumnDefinition::new("v", DataType::Int64, true),
        ],
        PartitionSchema::Hash(HashPartitionSchema::new(0, 3).unwrap()),
        64,
    )
    .unwrap();
    for i in 0..3_000i64 {
        table
            .append(vec![Value::Int64(i % 13), Value::Int64(i)])
            .unwrap();
    }
    for chunk_id in 0..table.chunk_count() {
        table
            .compress_chunk(
                chunk_id,
                SegmentEncodingSpec::Dictionary(VectorCompression::BitPacked),
            )
            .unwrap();
    }
    let table = Arc::new(table);

    let scheduler = NodeQueueScheduler::new(Topology::single_node(4).unwrap());
    let ctx = ExecutionContext::with_scheduler(Arc::clone(&scheduler));
    let positions = positions_of(
        &table,
        ScanPredicate::new(0, PredicateCondition::Equals, 5i64),
        &ctx,
    );
    assert_eq!(positions.len(), (0..3_000i64).filter(|i| i % 13 == 5).count());
    scheduler.finish();
}

#[test]
fn selectivity_hint_is_optional_and_harmless() {
    let table = build_table(PartitionSchema::Null(NullPartitionSchema::new()), 128, 1_000);
    let predicate = ScanPredicate::new(0, PredicateCondition::Equals, 3i64);

    let bare = positions_of(&table, predicate.clone(), &ExecutionContext::inline());
    let hinted = TableScan::new(Arc::clone(&table), predicate)
        .with_options(ScanOptions {
            selectivity_hint: Some(0.05),
        })
        .execute(&ExecutionContext::inline())
        .unwrap();
    assert_eq!(hinted.positions().as_ref(), &bare);
}

#[test]
fn empty_tables_scan_to_empty_results() {
    let table = Arc::new(
        Table::new_single_partition(vec![ColumnDefinition::new("v", DataType::Int64, true)])
            .unwrap(),
    );
    let result = TableScan::new(
        Arc::clone(&table),
        ScanPredicate::new(0, PredicateCondition::Equals, 1i64),
    )
    .execute(&ExecutionContext::inline())
    .unwrap();
    assert!(result.positions().is_empty());

    let reference = result.to_reference_table().unwrap();
    assert_eq!(reference.chunk_count(), 1);
    assert_eq!(reference.get_chunk(0).unwrap().row_count(), 0);
}

#[test]
fn scan_errors_surface_through_the_task_graph() {
    // A mistyped operand must come back as an error from execute(), not
    // disappear inside a worker.
    let table = build_table(PartitionSchema::Null(NullPartitionSchema::new()), 64, 100);
    let predicate = ScanPredicate::new(1, PredicateCondition::Equals, "wrong domain");
    let err = TableScan::new(Arc::clone(&table), predicate)
        .execute(&ExecutionContext::inline())
        .unwrap_err();
    assert!(matches!(err, granite_result::Error::Unsupported(_)));
}
