use std::sync::Arc;

use granite_expr::{PredicateCondition, ScanPredicate};
use granite_scan::TableScan;
use granite_scheduler::ExecutionContext;
use granite_storage::segment::{ReferenceSegment, Segment};
use granite_storage::{Chunk, ColumnDefinition, SegmentEncodingSpec, Table, VectorCompression};
use granite_types::{DataType, PosList, RowId, Value};

fn base_table(cells: &[Option<i64>], chunk_size: usize) -> Arc<Table> {
    let mut table = Table::new(
        vec![ColumnDefinition::new("v", DataType::Int64, true)],
        granite_storage::PartitionSchema::Null(
            granite_storage::partitioning::NullPartitionSchema::new(),
        ),
        chunk_size,
    )
    .unwrap();
    for cell in cells {
        table
            .append(vec![cell.map(Value::Int64).unwrap_or(Value::Null)])
            .unwrap();
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

/// Wrap a hand-picked position list into a one-column reference table.
fn reference_table(target: &Arc<Table>, positions: PosList) -> Arc<Table> {
    let segment = ReferenceSegment::new(Arc::clone(target), 0, Arc::new(positions)).unwrap();
    let chunk = Chunk::from_segments(vec![Segment::Reference(segment)]).unwrap();
    Arc::new(
        Table::from_chunks(target.column_definitions().to_vec(), vec![chunk]).unwrap(),
    )
}

#[test]
fn chained_scans_equal_a_direct_conjunction() {
    let cells: Vec<Option<i64>> = (0..500).map(|i| Some(i % 40)).collect();
    let table = base_table(&cells, 64);

    // v >= 10, then v < 20 over the survivors.
    let first = TableScan::new(
        Arc::clone(&table),
        ScanPredicate::new(0, PredicateCondition::GreaterThanOrEquals, 10i64),
    )
    .execute(&ExecutionContext::inline())
    .unwrap();
    let narrowed = scan(
        &first.to_reference_table().unwrap(),
        ScanPredicate::new(0, PredicateCondition::LessThan, 20i64),
    );

    // Direct single-pass equivalent over the base table.
    let mut expected: PosList = Vec::new();
    for chunk_id in 0..table.chunk_count() {
        let chunk = table.get_chunk(chunk_id).unwrap();
        let segment = chunk.get_segment(0).unwrap();
        for offset in 0..chunk.row_count() as u32 {
            if let Value::Int64(v) = segment.value_at(offset)
                && (10..20).contains(&v)
            {
                expected.push(RowId::new(chunk_id, offset));
            }
        }
    }
    assert_eq!(narrowed, expected);
}

#[test]
fn scanning_a_reference_table_yields_base_table_row_ids_in_position_order() {
    let table = base_table(&(0..10).map(Some).collect::<Vec<_>>(), 4);
    // Interleave chunks and scramble offsets on purpose.
    let positions = vec![
        RowId::new(2, 1), // 9
        RowId::new(0, 0), // 0
        RowId::new(1, 3), // 7
        RowId::new(0, 2), // 2
        RowId::new(2, 0), // 8
    ];
    let reference = reference_table(&table, positions.clone());

    // Everything matches: the output must be the position list itself, in
    // its original order, not regrouped by referenced chunk.
    let all = scan(
        &reference,
        ScanPredicate::new(0, PredicateCondition::GreaterThanOrEquals, 0i64),
    );
    assert_eq!(all, positions);

    // A selective predicate keeps relative order.
    let some = scan(
        &reference,
        ScanPredicate::new(0, PredicateCondition::GreaterThanOrEquals, 7i64),
    );
    assert_eq!(
        some,
        vec![RowId::new(2, 1), RowId::new(1, 3), RowId::new(2, 0)]
    );
}

#[test]
fn reference_scans_see_through_encoded_targets() {
    let cells: Vec<Option<i64>> = (0..200).map(|i| Some(i % 25)).collect();
    let plain = base_table(&cells, 50);

    let mut encoded = Table::new(
        vec![ColumnDefinition::new("v", DataType::Int64, true)],
        granite_storage::PartitionSchema::Null(
            granite_storage::partitioning::NullPartitionSchema::new(),
        ),
        50,
    )
    .unwrap();
    for cell in &cells {
        encoded.append(vec![Value::Int64(cell.unwrap())]).unwrap();
    }
    for chunk_id in 0..encoded.chunk_count() {
        encoded
            .compress_chunk(
                chunk_id,
                SegmentEncodingSpec::Dictionary(VectorCompression::BitPacked),
            )
            .unwrap();
    }
    let encoded = Arc::new(encoded);

    let positions: PosList = (0..200).map(|i| RowId::new(i / 50, i % 50)).collect();
    let predicate = ScanPredicate::new(0, PredicateCondition::Equals, 13i64);
    let via_plain = scan(&reference_table(&plain, positions.clone()), predicate.clone());
    let via_encoded = scan(&reference_table(&encoded, positions), predicate);
    assert_eq!(via_plain, via_encoded);
}

#[test]
fn two_levels_of_indirection_resolve() {
    let table = base_table(&(0..20).map(Some).collect::<Vec<_>>(), 5);

    // Level 1: every other row of the base table, reversed chunk order.
    let level1_positions: PosList = (0..20)
        .rev()
        .filter(|i| i % 2 == 0)
        .map(|i| RowId::new(i / 5, i % 5))
        .collect();
    let level1 = reference_table(&table, level1_positions.clone());

    // Level 2: rows 1, 3, 5 of the level-1 table (offsets into its pos
    // list). Level-1 row j holds base value 18 - 2j.
    let level2_positions = vec![RowId::new(0, 1), RowId::new(0, 3), RowId::new(0, 5)];
    let level2 = reference_table(&level1, level2_positions.clone());

    // Values behind level 2: 16, 12, 8. Scan > 10 keeps the first two.
    let matched = scan(
        &level2,
        ScanPredicate::new(0, PredicateCondition::GreaterThan, 10i64),
    );
    assert_eq!(matched, vec![RowId::new(0, 1), RowId::new(0, 3)]);

    // Same relative order as scanning the terminal segment restricted to
    // the referenced subset.
    let resolved: Vec<Value> = matched
        .iter()
        .map(|row_id| {
            let chunk = level1.get_chunk(row_id.chunk_id).unwrap();
            chunk.get_segment(0).unwrap().value_at(row_id.chunk_offset)
        })
        .collect();
    assert_eq!(resolved, vec![Value::Int64(16), Value::Int64(12)]);
}

#[test]
fn null_row_ids_are_skipped_except_for_null_checks() {
    let table = base_table(&[Some(1), Some(2), Some(3)], 10);
    let positions = vec![
        RowId::new(0, 0),
        RowId::NULL,
        RowId::new(0, 2),
        RowId::NULL,
    ];
    let reference = reference_table(&table, positions);

    // Ordinary comparison: null row ids silently drop out.
    let not_equals = scan(
        &reference,
        ScanPredicate::new(0, PredicateCondition::NotEquals, 0i64),
    );
    assert_eq!(not_equals, vec![RowId::new(0, 0), RowId::new(0, 2)]);

    // IS NULL must see them: a null indirection is a NULL cell.
    let is_null = scan(&reference, ScanPredicate::is_null(0));
    assert_eq!(is_null, vec![RowId::NULL, RowId::NULL]);

    // IS NOT NULL keeps only the resolved rows.
    let is_not_null = scan(&reference, ScanPredicate::is_not_null(0));
    assert_eq!(is_not_null, vec![RowId::new(0, 0), RowId::new(0, 2)]);
}

#[test]
fn single_chunk_references_take_the_fast_path_with_equal_results() {
    let table = base_table(&(0..30).map(Some).collect::<Vec<_>>(), 10);

    // All row ids inside chunk 1.
    let single: PosList = (0..10).map(|o| RowId::new(1, o)).collect();
    let multi: PosList = (0..30).map(|i| RowId::new(i / 10, i % 10)).collect();

    let single_table = reference_table(&table, single);
    let multi_table = reference_table(&table, multi);

    let single_segment = single_table.get_chunk(0).unwrap().get_segment(0).unwrap();
    let Segment::Reference(r) = single_segment else {
        panic!("expected reference segment")
    };
    assert!(r.is_single_chunk());

    let predicate = ScanPredicate::new(0, PredicateCondition::GreaterThanOrEquals, 15i64);
    let from_single = scan(&single_table, predicate.clone());
    let from_multi = scan(&multi_table, predicate);
    assert_eq!(from_single, (15..20).map(|o| RowId::new(1, o)).collect::<Vec<_>>());
    assert_eq!(from_multi.len(), 15);
}

#[test]
fn reference_output_tables_do_not_stack_indirection() {
    let table = base_table(&(0..100).map(|i| Some(i % 10)).collect::<Vec<_>>(), 25);

    let first = TableScan::new(
        Arc::clone(&table),
        ScanPredicate::new(0, PredicateCondition::LessThan, 5i64),
    )
    .execute(&ExecutionContext::inline())
    .unwrap();
    let first_out = first.to_reference_table().unwrap();

    let second = TableScan::new(
        Arc::clone(&first_out),
        ScanPredicate::new(0, PredicateCondition::GreaterThan, 2i64),
    )
    .execute(&ExecutionContext::inline())
    .unwrap();
    let second_out = second.to_reference_table().unwrap();

    // The second output still references the base table directly.
    let segment = second_out.get_chunk(0).unwrap().get_segment(0).unwrap();
    let Segment::Reference(reference) = segment else {
        panic!("expected reference segment")
    };
    assert!(Arc::ptr_eq(reference.referenced_table(), &table));

    // And its positions are base-table rows holding 3 or 4.
    for row_id in reference.pos_list().iter() {
        let value = table
            .get_chunk(row_id.chunk_id)
            .unwrap()
            .get_segment(0)
            .unwrap()
            .value_at(row_id.chunk_offset);
        assert!(matches!(value, Value::Int64(3) | Value::Int64(4)));
    }
}

#[test]
fn out_of_bounds_position_lists_are_rejected_at_construction() {
    let table = base_table(&[Some(1)], 10);
    let bogus = Arc::new(vec![RowId::new(0, 5)]);
    assert!(ReferenceSegment::new(Arc::clone(&table), 0, bogus).is_err());
    let bad_column = ReferenceSegment::new(Arc::clone(&table), 7, Arc::new(vec![]));
    assert!(bad_column.is_err());
}
