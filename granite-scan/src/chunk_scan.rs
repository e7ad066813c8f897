//! Per-chunk predicate evaluation, encoding- and indirection-aware.
//!
//! Direct segments evaluate with a monomorphized matcher per physical
//! domain. Dictionary segments translate the operand into value-id space
//! once, then run an integer test over the attribute vector — the per-row
//! comparison never touches the original domain. Reference segments are
//! never scanned directly: their position list is split by referenced chunk
//! and the referenced column is evaluated at exactly the referenced offsets.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use granite_expr::{PredicateCondition, ScanPredicate};
use granite_result::{Error, Result};
use granite_storage::segment::{
    ReferenceSegment, Segment, SegmentValue, TypedDictionarySegment, ValueId,
};
use granite_storage::{Table, with_dictionary_segment, with_run_length_segment, with_value_segment};
use granite_types::{ChunkId, ChunkOffset, PosList, RowId, Value};

/// Scans one predicate against individual chunks of a table.
pub struct ChunkScan<'a> {
    table: &'a Table,
    predicate: &'a ScanPredicate,
    /// Whether null row ids inside reference position lists are skipped.
    /// Defaults by condition: NULL-semantics predicates must see them,
    /// ordinary comparisons may not.
    skip_null_row_ids: bool,
}

impl<'a> ChunkScan<'a> {
    pub fn new(table: &'a Table, predicate: &'a ScanPredicate) -> Result<ChunkScan<'a>> {
        let data_type = table.data_type_of(predicate.column_id)?;
        if predicate.condition.takes_second_operand() && predicate.value2.is_none() {
            return Err(Error::contract_violation(
                "ChunkScan::new",
                "Between requires a second operand",
            ));
        }
        if !predicate.condition.is_null_check() {
            for operand in [Some(&predicate.value), predicate.value2.as_ref()]
                .into_iter()
                .flatten()
            {
                if !operand.is_null() && operand.data_type() != Some(data_type) {
                    return Err(Error::unsupported(format!(
                        "{:?} with operand {operand} against {data_type} column {}",
                        predicate.condition, predicate.column_id
                    )));
                }
            }
        }
        Ok(ChunkScan {
            table,
            predicate,
            skip_null_row_ids: !predicate.condition.is_null_check(),
        })
    }

    pub fn with_skip_null_row_ids(mut self, skip: bool) -> Self {
        self.skip_null_row_ids = skip;
        self
    }

    /// Evaluate the predicate against one chunk. Matches come out in the
    /// chunk's row order; evaluation never mutates any segment.
    pub fn scan_chunk(&self, chunk_id: ChunkId) -> Result<PosList> {
        let chunk = self.table.get_chunk(chunk_id)?;
        let segment = chunk.get_segment(self.predicate.column_id)?;
        match segment {
            Segment::Reference(reference) => self.scan_reference(reference),
            direct => {
                let mut matches = PosList::new();
                self.for_each_matching_offset(direct, &mut |offset| {
                    matches.push(RowId::new(chunk_id, offset));
                })?;
                Ok(matches)
            }
        }
    }

    fn for_each_matching_offset(
        &self,
        segment: &Segment,
        emit: &mut dyn FnMut(ChunkOffset),
    ) -> Result<()> {
        match segment {
            Segment::Value(segment) => with_value_segment!(segment, s => {
                let matches = typed_matcher(self.predicate)?;
                for (offset, cell) in s.iter() {
                    if matches(cell) {
                        emit(offset);
                    }
                }
                Ok(())
            }),
            Segment::RunLength(segment) => with_run_length_segment!(segment, s => {
                // One comparison per run, not per row.
                let matches = typed_matcher(self.predicate)?;
                let mut start: ChunkOffset = 0;
                for (cell, end) in s.runs() {
                    if matches(cell) {
                        for offset in start..=end {
                            emit(offset);
                        }
                    }
                    start = end + 1;
                }
                Ok(())
            }),
            Segment::Dictionary(segment) => with_dictionary_segment!(segment, s => {
                let test = value_id_test(s, self.predicate)?;
                for (offset, id) in s.attribute_vector().iter().enumerate() {
                    if test.matches(id) {
                        emit(offset as ChunkOffset);
                    }
                }
                Ok(())
            }),
            Segment::Reference(_) => {
                unreachable!("reference segments are resolved before evaluation")
            }
        }
    }

    /// Resolve one indirection level and translate matches back into the
    /// reference segment's own position-list entries. The output is restored
    /// to positional order, so in-chunk row order survives the
    /// group-by-referenced-chunk detour.
    fn scan_reference(&self, reference: &ReferenceSegment) -> Result<PosList> {
        let pos_list = reference.pos_list();
        let entries: Vec<(u32, u32)> = (0..pos_list.len() as u32).map(|j| (j, j)).collect();
        let mut matched: Vec<u32> = Vec::new();
        self.scan_reference_entries(reference, entries, &mut matched)?;
        matched.sort_unstable();
        Ok(matched
            .into_iter()
            .map(|j| pos_list[j as usize])
            .collect())
    }

    /// `entries` pairs an output index (position in the outermost position
    /// list) with an index into `reference`'s own position list; recursion
    /// through chained references preserves the output index.
    fn scan_reference_entries(
        &self,
        reference: &ReferenceSegment,
        entries: Vec<(u32, u32)>,
        matched: &mut Vec<u32>,
    ) -> Result<()> {
        let pos_list = reference.pos_list();
        let null_matches = self.predicate.condition == PredicateCondition::IsNull;

        if reference.is_single_chunk() {
            // Fast path: every non-null row id targets one chunk, skip the
            // grouping. Same semantics as below.
            let mut offsets: Vec<(u32, ChunkOffset)> = Vec::with_capacity(entries.len());
            let mut chunk_id = None;
            for (out_index, pos_index) in entries {
                let row_id = pos_list[pos_index as usize];
                if row_id.is_null() {
                    if !self.skip_null_row_ids && null_matches {
                        matched.push(out_index);
                    }
                    continue;
                }
                chunk_id = Some(row_id.chunk_id);
                offsets.push((out_index, row_id.chunk_offset));
            }
            if let Some(chunk_id) = chunk_id {
                self.scan_referenced_chunk(reference, chunk_id, &offsets, matched)?;
            }
            return Ok(());
        }

        let mut groups: FxHashMap<ChunkId, Vec<(u32, ChunkOffset)>> = FxHashMap::default();
        for (out_index, pos_index) in entries {
            let row_id = pos_list[pos_index as usize];
            if row_id.is_null() {
                if !self.skip_null_row_ids && null_matches {
                    matched.push(out_index);
                }
                continue;
            }
            groups
                .entry(row_id.chunk_id)
                .or_default()
                .push((out_index, row_id.chunk_offset));
        }
        for (chunk_id, offsets) in groups {
            self.scan_referenced_chunk(reference, chunk_id, &offsets, matched)?;
        }
        Ok(())
    }

    fn scan_referenced_chunk(
        &self,
        reference: &ReferenceSegment,
        chunk_id: ChunkId,
        offsets: &[(u32, ChunkOffset)],
        matched: &mut Vec<u32>,
    ) -> Result<()> {
        let segment = reference
            .referenced_table()
            .get_chunk(chunk_id)?
            .get_segment(reference.referenced_column_id())?;
        match segment {
            Segment::Reference(inner) => {
                // Chained indirection: our offsets index the inner position
                // list.
                let entries = offsets.iter().copied().collect();
                self.scan_reference_entries(inner, entries, matched)
            }
            direct => self.scan_segment_at_offsets(direct, offsets, matched),
        }
    }

    fn scan_segment_at_offsets(
        &self,
        segment: &Segment,
        offsets: &[(u32, ChunkOffset)],
        matched: &mut Vec<u32>,
    ) -> Result<()> {
        match segment {
            Segment::Value(segment) => with_value_segment!(segment, s => {
                let matches = typed_matcher(self.predicate)?;
                for &(out_index, offset) in offsets {
                    if matches(s.get(offset)) {
                        matched.push(out_index);
                    }
                }
                Ok(())
            }),
            Segment::RunLength(segment) => with_run_length_segment!(segment, s => {
                let matches = typed_matcher(self.predicate)?;
                for &(out_index, offset) in offsets {
                    if matches(s.get(offset)) {
                        matched.push(out_index);
                    }
                }
                Ok(())
            }),
            Segment::Dictionary(segment) => with_dictionary_segment!(segment, s => {
                let test = value_id_test(s, self.predicate)?;
                let attribute_vector = s.attribute_vector();
                for &(out_index, offset) in offsets {
                    if test.matches(attribute_vector.get(offset)) {
                        matched.push(out_index);
                    }
                }
                Ok(())
            }),
            Segment::Reference(_) => {
                unreachable!("chained references are resolved by the caller")
            }
        }
    }
}

/// Build a typed per-cell matcher for direct evaluation. Operands are
/// coerced exactly once; NULL cells never match an ordinary comparison, and
/// a NULL operand matches nothing.
fn typed_matcher<T: SegmentValue>(
    predicate: &ScanPredicate,
) -> Result<impl Fn(Option<&T>) -> bool + use<T>> {
    let condition = predicate.condition;
    let operand = coerce_operand::<T>(condition, Some(&predicate.value))?;
    let operand2 = coerce_operand::<T>(condition, predicate.value2.as_ref())?;

    Ok(move |cell: Option<&T>| -> bool {
        match condition {
            PredicateCondition::IsNull => cell.is_none(),
            PredicateCondition::IsNotNull => cell.is_some(),
            _ => {
                let Some(cell) = cell else { return false };
                let Some(operand) = operand.as_ref() else {
                    return false;
                };
                match condition {
                    PredicateCondition::Equals => cell.total_cmp(operand) == Ordering::Equal,
                    PredicateCondition::NotEquals => cell.total_cmp(operand) != Ordering::Equal,
                    PredicateCondition::LessThan => cell.total_cmp(operand) == Ordering::Less,
                    PredicateCondition::LessThanOrEquals => {
                        cell.total_cmp(operand) != Ordering::Greater
                    }
                    PredicateCondition::GreaterThan => {
                        cell.total_cmp(operand) == Ordering::Greater
                    }
                    PredicateCondition::GreaterThanOrEquals => {
                        cell.total_cmp(operand) != Ordering::Less
                    }
                    PredicateCondition::Between => {
                        let Some(upper) = operand2.as_ref() else {
                            return false;
                        };
                        cell.total_cmp(operand) != Ordering::Less
                            && cell.total_cmp(upper) != Ordering::Greater
                    }
                    PredicateCondition::IsNull | PredicateCondition::IsNotNull => unreachable!(),
                }
            }
        }
    })
}

fn coerce_operand<T: SegmentValue>(
    condition: PredicateCondition,
    value: Option<&Value>,
) -> Result<Option<T>> {
    if condition.is_null_check() {
        return Ok(None);
    }
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::from_value(value).map(Some).ok_or_else(|| {
            Error::unsupported(format!(
                "operand {value} against {} segment",
                T::DATA_TYPE
            ))
        }),
    }
}

/// Integer-space predicate over an attribute vector, derived once per
/// dictionary segment. The reserved null id never matches an ordinary
/// comparison: ranges are capped at the null id and the inequality forms
/// test it explicitly.
enum ValueIdTest {
    /// Matches nothing (absent equality operand, NULL operand).
    Nothing,
    /// Half-open `[lo, hi)`; `hi <= null_id` always.
    Range { lo: ValueId, hi: ValueId },
    NotEqual { id: ValueId, null_id: ValueId },
    AllNonNull { null_id: ValueId },
    NullOnly { null_id: ValueId },
}

impl ValueIdTest {
    #[inline]
    fn matches(&self, id: ValueId) -> bool {
        match *self {
            ValueIdTest::Nothing => false,
            ValueIdTest::Range { lo, hi } => lo <= id && id < hi,
            ValueIdTest::NotEqual { id: other, null_id } => id != other && id != null_id,
            ValueIdTest::AllNonNull { null_id } => id != null_id,
            ValueIdTest::NullOnly { null_id } => id == null_id,
        }
    }
}

/// Translate the operand into value-id space. The translation fixes the
/// absent-operand policy per condition: the lower bound (insertion point)
/// serves `<`, `>=` and equality probes; the upper bound serves `<=`, `>`
/// and the inclusive upper end of `Between`.
fn value_id_test<T: SegmentValue>(
    segment: &TypedDictionarySegment<T>,
    predicate: &ScanPredicate,
) -> Result<ValueIdTest> {
    let null_id = segment.null_value_id();
    let condition = predicate.condition;

    if condition == PredicateCondition::IsNull {
        return Ok(ValueIdTest::NullOnly { null_id });
    }
    if condition == PredicateCondition::IsNotNull {
        return Ok(ValueIdTest::AllNonNull { null_id });
    }

    let Some(operand) = coerce_operand::<T>(condition, Some(&predicate.value))? else {
        return Ok(ValueIdTest::Nothing);
    };

    Ok(match condition {
        PredicateCondition::Equals => match segment.value_id_of(&operand) {
            Some(id) => ValueIdTest::Range { lo: id, hi: id + 1 },
            None => ValueIdTest::Nothing,
        },
        PredicateCondition::NotEquals => match segment.value_id_of(&operand) {
            Some(id) => ValueIdTest::NotEqual { id, null_id },
            None => ValueIdTest::AllNonNull { null_id },
        },
        PredicateCondition::LessThan => ValueIdTest::Range {
            lo: 0,
            hi: segment.lower_bound(&operand),
        },
        PredicateCondition::LessThanOrEquals => ValueIdTest::Range {
            lo: 0,
            hi: segment.upper_bound(&operand),
        },
        PredicateCondition::GreaterThan => ValueIdTest::Range {
            lo: segment.upper_bound(&operand),
            hi: null_id,
        },
        PredicateCondition::GreaterThanOrEquals => ValueIdTest::Range {
            lo: segment.lower_bound(&operand),
            hi: null_id,
        },
        PredicateCondition::Between => {
            let Some(upper) = coerce_operand::<T>(condition, predicate.value2.as_ref())? else {
                return Ok(ValueIdTest::Nothing);
            };
            ValueIdTest::Range {
                lo: segment.lower_bound(&operand),
                hi: segment.upper_bound(&upper),
            }
        }
        PredicateCondition::IsNull | PredicateCondition::IsNotNull => unreachable!(),
    })
}
