//! Attribute vectors: the packed offset → value-id mapping of a dictionary
//! segment.
//!
//! Two packing families: fixed-width (narrowest unsigned integer that holds
//! the null id) and a block-based bit-packed layout (128-value blocks, each
//! packed at the narrowest bit width its values need). Readers go through
//! [`AttributeVector::get`] / [`AttributeVector::iter`] and never see the
//! packing.

use super::ValueId;
use granite_types::ChunkOffset;

/// Packing scheme requested when encoding a dictionary segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VectorCompression {
    #[default]
    FixedWidth,
    BitPacked,
}

/// Compressed vector of value ids, one per row offset.
#[derive(Debug, Clone)]
pub enum AttributeVector {
    FixedWidth8(Vec<u8>),
    FixedWidth16(Vec<u16>),
    FixedWidth32(Vec<u32>),
    BitPacked(BitPackedVector),
}

impl AttributeVector {
    /// Pack `ids` so that every id up to and including `max_id` round-trips.
    ///
    /// `max_id` is the dictionary's null id, which is always the largest id a
    /// dictionary segment stores.
    pub fn from_value_ids(ids: &[ValueId], max_id: ValueId, compression: VectorCompression) -> Self {
        match compression {
            VectorCompression::BitPacked => {
                AttributeVector::BitPacked(BitPackedVector::from_value_ids(ids))
            }
            VectorCompression::FixedWidth => {
                if max_id <= u8::MAX as ValueId {
                    AttributeVector::FixedWidth8(ids.iter().map(|&v| v as u8).collect())
                } else if max_id <= u16::MAX as ValueId {
                    AttributeVector::FixedWidth16(ids.iter().map(|&v| v as u16).collect())
                } else {
                    AttributeVector::FixedWidth32(ids.to_vec())
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeVector::FixedWidth8(v) => v.len(),
            AttributeVector::FixedWidth16(v) => v.len(),
            AttributeVector::FixedWidth32(v) => v.len(),
            AttributeVector::BitPacked(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the packing, for logs and encoder diagnostics.
    pub fn packing(&self) -> &'static str {
        match self {
            AttributeVector::FixedWidth8(_) => "fixed-width-8",
            AttributeVector::FixedWidth16(_) => "fixed-width-16",
            AttributeVector::FixedWidth32(_) => "fixed-width-32",
            AttributeVector::BitPacked(_) => "bit-packed-128",
        }
    }

    /// Random positional read. Panics if `offset >= len()`.
    #[inline]
    pub fn get(&self, offset: ChunkOffset) -> ValueId {
        let idx = offset as usize;
        match self {
            AttributeVector::FixedWidth8(v) => v[idx] as ValueId,
            AttributeVector::FixedWidth16(v) => v[idx] as ValueId,
            AttributeVector::FixedWidth32(v) => v[idx],
            AttributeVector::BitPacked(v) => v.get(idx),
        }
    }

    /// Sequential iteration over value ids, agnostic of the packing.
    pub fn iter(&self) -> AttributeVectorIter<'_> {
        AttributeVectorIter {
            vector: self,
            offset: 0,
            len: self.len(),
        }
    }
}

/// Packing-agnostic iterator over an attribute vector's value ids.
pub struct AttributeVectorIter<'a> {
    vector: &'a AttributeVector,
    offset: usize,
    len: usize,
}

impl Iterator for AttributeVectorIter<'_> {
    type Item = ValueId;

    #[inline]
    fn next(&mut self) -> Option<ValueId> {
        if self.offset == self.len {
            return None;
        }
        let id = self.vector.get(self.offset as ChunkOffset);
        self.offset += 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.offset;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AttributeVectorIter<'_> {}

/// Number of values per bit-packed block.
const BLOCK_LEN: usize = 128;

/// Block-based bit packing: every 128-value block stores its values at the
/// narrowest width that holds the block's maximum. A width of zero marks an
/// all-zero block with no payload words.
#[derive(Debug, Clone)]
pub struct BitPackedVector {
    len: usize,
    bit_widths: Vec<u8>,
    word_offsets: Vec<u32>,
    words: Vec<u64>,
}

impl BitPackedVector {
    pub fn from_value_ids(ids: &[ValueId]) -> Self {
        let block_count = ids.len().div_ceil(BLOCK_LEN);
        let mut bit_widths = Vec::with_capacity(block_count);
        let mut word_offsets = Vec::with_capacity(block_count);
        let mut words = Vec::new();

        for block in ids.chunks(BLOCK_LEN) {
            let max = block.iter().copied().max().unwrap_or(0);
            let width = (u32::BITS - max.leading_zeros()) as usize;
            bit_widths.push(width as u8);
            word_offsets.push(words.len() as u32);

            if width == 0 {
                continue;
            }
            let word_count = (block.len() * width).div_ceil(u64::BITS as usize);
            let base = words.len();
            words.resize(base + word_count, 0u64);
            for (j, &id) in block.iter().enumerate() {
                let bit = j * width;
                let word = base + bit / 64;
                let shift = bit % 64;
                words[word] |= (id as u64) << shift;
                if shift + width > 64 {
                    words[word + 1] |= (id as u64) >> (64 - shift);
                }
            }
        }

        BitPackedVector {
            len: ids.len(),
            bit_widths,
            word_offsets,
            words,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Random positional read. Panics if `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> ValueId {
        assert!(index < self.len, "offset {index} out of bounds");
        let block = index / BLOCK_LEN;
        let width = self.bit_widths[block] as usize;
        if width == 0 {
            return 0;
        }
        let bit = (index % BLOCK_LEN) * width;
        let word = self.word_offsets[block] as usize + bit / 64;
        let shift = bit % 64;
        let mut v = self.words[word] >> shift;
        if shift + width > 64 {
            v |= self.words[word + 1] << (64 - shift);
        }
        (v & ((1u64 << width) - 1)) as ValueId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_picks_narrowest_that_fits_the_null_id() {
        let ids = vec![0, 1, 2, 3];
        let v8 = AttributeVector::from_value_ids(&ids, 200, VectorCompression::FixedWidth);
        assert!(matches!(v8, AttributeVector::FixedWidth8(_)));
        let v16 = AttributeVector::from_value_ids(&ids, 300, VectorCompression::FixedWidth);
        assert!(matches!(v16, AttributeVector::FixedWidth16(_)));
        let v32 = AttributeVector::from_value_ids(&ids, 70_000, VectorCompression::FixedWidth);
        assert!(matches!(v32, AttributeVector::FixedWidth32(_)));
    }

    #[test]
    fn bit_packed_round_trips_across_word_boundaries() {
        // Width 5 makes values straddle 64-bit word boundaries inside a block.
        let ids: Vec<ValueId> = (0..300).map(|i| i % 29).collect();
        let packed = BitPackedVector::from_value_ids(&ids);
        assert_eq!(packed.len(), ids.len());
        for (i, &id) in ids.iter().enumerate() {
            assert_eq!(packed.get(i), id, "mismatch at index {i}");
        }
    }

    #[test]
    fn bit_packed_handles_all_zero_blocks() {
        let ids = vec![0; 200];
        let packed = BitPackedVector::from_value_ids(&ids);
        assert!(packed.words.is_empty());
        assert_eq!(packed.get(199), 0);
    }

    #[test]
    fn iter_is_packing_agnostic() {
        let ids: Vec<ValueId> = (0..150).map(|i| (i * 7) % 97).collect();
        for compression in [VectorCompression::FixedWidth, VectorCompression::BitPacked] {
            let av = AttributeVector::from_value_ids(&ids, 96, compression);
            let decoded: Vec<ValueId> = av.iter().collect();
            assert_eq!(decoded, ids);
        }
    }

    #[test]
    fn wide_ids_survive_bit_packing() {
        let ids = vec![0, u16::MAX as ValueId + 5, 1, 1 << 20, 7];
        let packed = BitPackedVector::from_value_ids(&ids);
        for (i, &id) in ids.iter().enumerate() {
            assert_eq!(packed.get(i), id);
        }
    }
}
