use std::sync::Arc;

use granite_expr::{PredicateCondition, ScanPredicate};
use granite_result::Error;
use granite_scan::{ChunkScan, TableScan};
use granite_scheduler::ExecutionContext;
use granite_storage::partitioning::{HashPartitionSchema, PartitionSchema};
use granite_storage::{ColumnDefinition, SegmentEncodingSpec, Table, VectorCompression};
use granite_types::{DataType, PosList, Value};

/// All encodings a chunk can be rewritten into for equivalence checks.
const ENCODINGS: [Option<SegmentEncodingSpec>; 4] = [
    None,
    Some(SegmentEncodingSpec::Dictionary(VectorCompression::FixedWidth)),
    Some(SegmentEncodingSpec::Dictionary(VectorCompression::BitPacked)),
    Some(SegmentEncodingSpec::RunLength),
];

fn int_table(cells: &[Option<i64>], chunk_size: usize, encoding: Option<SegmentEncodingSpec>) -> Arc<Table> {
    let mut table = Table::new(
        vec![ColumnDefinition::new("v", DataType::Int64, true)],
        PartitionSchema::Null(granite_storage::partitioning::NullPartitionSchema::new()),
        chunk_size,
    )
    .unwrap();
    for cell in cells {
        let value = cell.map(Value::Int64).unwrap_or(Value::Null);
        table.append(vec![value]).unwrap();
    }
    if let Some(spec) = encoding {
        for chunk_id in 0..table.chunk_count() {
            table.compress_chunk(chunk_id, spec).unwrap();
        }
    }
    Arc::new(table)
}

fn scan(table: &Arc<Table>, predicate: ScanPredicate) -> PosList {
    TableScan::new(Arc::clone(table), predicate)
        .execute(&ExecutionContext::inline())
        .unwrap()
        .positions()
        .as_ref()
        .clone()
}

fn all_conditions(operand: i64, upper: i64) -> Vec<ScanPredicate> {
    vec![
        ScanPredicate::new(0, PredicateCondition::Equals, operand),
        ScanPredicate::new(0, PredicateCondition::NotEquals, operand),
        ScanPredicate::new(0, PredicateCondition::LessThan, operand),
        ScanPredicate::new(0, PredicateCondition::LessThanOrEquals, operand),
        ScanPredicate::new(0, PredicateCondition::GreaterThan, operand),
        ScanPredicate::new(0, PredicateCondition::GreaterThanOrEquals, operand),
        ScanPredicate::between(0, operand, upper),
        ScanPredicate::is_null(0),
        ScanPredicate::is_not_null(0),
    ]
}

#[test]
fn every_encoding_produces_identical_position_lists() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let cells: Vec<Option<i64>> = (0..700)
        .map(|_| {
            if rng.gen_ratio(1, 10) {
                None
            } else {
                Some(rng.gen_range(0..60))
            }
        })
        .collect();

    // Operands both present and absent from the data.
    for operand in [7i64, 25, -3, 59, 100] {
        for predicate in all_conditions(operand, operand + 10) {
            let baseline = scan(&int_table(&cells, 128, ENCODINGS[0]), predicate.clone());
            for encoding in &ENCODINGS[1..] {
                let table = int_table(&cells, 128, *encoding);
                let positions = scan(&table, predicate.clone());
                assert_eq!(
                    positions, baseline,
                    "encoding {encoding:?} diverged for {predicate:?}"
                );
            }
        }
    }
}

#[test]
fn dictionary_scan_of_four_chunks_finds_every_37() {
    // The spec scenario: 4 chunks of 100 rows, dictionary-encoded integers
    // drawn from {1..50}, predicate `v = 37`.
    let cells: Vec<Option<i64>> = (0..400).map(|i| Some(i % 50 + 1)).collect();
    let expected_count = cells.iter().filter(|c| **c == Some(37)).count();

    let table = int_table(
        &cells,
        100,
        Some(SegmentEncodingSpec::Dictionary(VectorCompression::BitPacked)),
    );
    assert_eq!(table.chunk_count(), 4);

    let positions = scan(&table, ScanPredicate::new(0, PredicateCondition::Equals, 37i64));
    assert_eq!(positions.len(), expected_count);

    // Chunks ascend; offsets strictly increase within each chunk.
    for pair in positions.windows(2) {
        assert!(pair[0] < pair[1], "row ids must strictly increase");
    }
    for row_id in &positions {
        let chunk = table.get_chunk(row_id.chunk_id).unwrap();
        assert_eq!(
            chunk.get_segment(0).unwrap().value_at(row_id.chunk_offset),
            Value::Int64(37)
        );
    }
}

#[test]
fn absent_operand_maps_to_the_tightest_value_id_range() {
    // Dictionary {10, 20, 30, 40}; operand 25 is absent. Each condition must
    // behave as if the comparison ran over the original values.
    let cells: Vec<Option<i64>> = vec![
        Some(10),
        Some(40),
        Some(20),
        Some(30),
        Some(20),
        Some(10),
        Some(40),
        Some(30),
    ];
    let dict = int_table(
        &cells,
        100,
        Some(SegmentEncodingSpec::Dictionary(VectorCompression::FixedWidth)),
    );

    let count = |condition| {
        scan(&dict, ScanPredicate::new(0, condition, 25i64)).len()
    };
    assert_eq!(count(PredicateCondition::Equals), 0);
    assert_eq!(count(PredicateCondition::NotEquals), 8);
    assert_eq!(count(PredicateCondition::LessThan), 4); // 10, 20, 20, 10
    assert_eq!(count(PredicateCondition::LessThanOrEquals), 4);
    assert_eq!(count(PredicateCondition::GreaterThan), 4); // 40, 30, 40, 30
    assert_eq!(count(PredicateCondition::GreaterThanOrEquals), 4);
}

#[test]
fn between_is_inclusive_on_both_ends() {
    let cells: Vec<Option<i64>> = (0..50).map(|i| Some(i)).collect();
    for encoding in ENCODINGS {
        let table = int_table(&cells, 100, encoding);
        let positions = scan(&table, ScanPredicate::between(0, 10i64, 20i64));
        assert_eq!(positions.len(), 11, "encoding {encoding:?}");
    }
}

#[test]
fn nulls_never_match_ordinary_comparisons() {
    let cells: Vec<Option<i64>> = vec![Some(1), None, Some(2), None, Some(1)];
    for encoding in ENCODINGS {
        let table = int_table(&cells, 100, encoding);
        assert_eq!(
            scan(&table, ScanPredicate::new(0, PredicateCondition::NotEquals, 99i64)).len(),
            3,
            "NULL leaked through NotEquals under {encoding:?}"
        );
        assert_eq!(scan(&table, ScanPredicate::is_null(0)).len(), 2);
        assert_eq!(scan(&table, ScanPredicate::is_not_null(0)).len(), 3);
    }
}

#[test]
fn null_operand_matches_nothing() {
    let table = int_table(&[Some(1), Some(2)], 100, None);
    let predicate = ScanPredicate {
        column_id: 0,
        condition: PredicateCondition::Equals,
        value: Value::Null,
        value2: None,
    };
    assert!(scan(&table, predicate).is_empty());
}

#[test]
fn repeated_scans_are_idempotent() {
    let cells: Vec<Option<i64>> = (0..300).map(|i| Some(i % 17)).collect();
    let table = int_table(
        &cells,
        64,
        Some(SegmentEncodingSpec::Dictionary(VectorCompression::BitPacked)),
    );
    let predicate = ScanPredicate::new(0, PredicateCondition::GreaterThan, 8i64);
    let first = scan(&table, predicate.clone());
    let second = scan(&table, predicate.clone());
    let third = scan(&table, predicate);
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn string_scans_work_across_encodings() {
    let mut table = Table::new_single_partition(vec![ColumnDefinition::new(
        "s",
        DataType::Utf8,
        true,
    )])
    .unwrap();
    for cell in ["pear", "apple", "quince", "apple", "fig"] {
        table.append(vec![Value::Utf8(cell.into())]).unwrap();
    }
    table.append(vec![Value::Null]).unwrap();
    table
        .compress_chunk(0, SegmentEncodingSpec::Dictionary(VectorCompression::FixedWidth))
        .unwrap();
    let table = Arc::new(table);

    let equals = scan(&table, ScanPredicate::new(0, PredicateCondition::Equals, "apple"));
    assert_eq!(equals.len(), 2);
    // "melon" is absent; lexicographic bounds still hold.
    let below = scan(&table, ScanPredicate::new(0, PredicateCondition::LessThan, "melon"));
    assert_eq!(below.len(), 3); // apple, apple, fig
}

#[test]
fn mismatched_operand_domain_is_unsupported() {
    let table = int_table(&[Some(1)], 100, None);
    let predicate = ScanPredicate::new(0, PredicateCondition::Equals, "not a number");
    let err = TableScan::new(Arc::clone(&table), predicate)
        .execute(&ExecutionContext::inline())
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)), "got {err:?}");
}

#[test]
fn malformed_predicates_are_contract_violations() {
    let table = int_table(&[Some(1)], 100, None);

    // Between without a second operand.
    let predicate = ScanPredicate {
        column_id: 0,
        condition: PredicateCondition::Between,
        value: Value::Int64(1),
        value2: None,
    };
    assert!(matches!(
        ChunkScan::new(&table, &predicate),
        Err(Error::ContractViolation { .. })
    ));

    // Column id outside the schema.
    let predicate = ScanPredicate::new(9, PredicateCondition::Equals, 1i64);
    assert!(matches!(
        ChunkScan::new(&table, &predicate),
        Err(Error::ContractViolation { .. })
    ));
}

#[test]
fn pruned_hash_table_scan_matches_unpartitioned_scan() {
    let cells: Vec<Option<i64>> = (0..400).map(|i| Some(i % 23)).collect();

    let schema = PartitionSchema::Hash(HashPartitionSchema::new(0, 4).unwrap());
    let mut partitioned = Table::new(
        vec![ColumnDefinition::new("v", DataType::Int64, true)],
        schema,
        32,
    )
    .unwrap();
    for cell in &cells {
        partitioned.append(vec![Value::Int64(cell.unwrap())]).unwrap();
    }
    let partitioned = Arc::new(partitioned);
    let flat = int_table(&cells, 32, None);

    let predicate = ScanPredicate::new(0, PredicateCondition::Equals, 7i64);
    let from_partitioned = scan(&partitioned, predicate.clone());
    let from_flat = scan(&flat, predicate);

    // Row ids differ (different chunk placement) but the matched values and
    // match count must agree.
    assert_eq!(from_partitioned.len(), from_flat.len());
    for row_id in &from_partitioned {
        let chunk = partitioned.get_chunk(row_id.chunk_id).unwrap();
        assert_eq!(
            chunk.get_segment(0).unwrap().value_at(row_id.chunk_offset),
            Value::Int64(7)
        );
    }
}
