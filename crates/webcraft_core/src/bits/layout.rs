//! # Bit-Field Layout Compiler
//!
//! Packs named fields into buckets of at most 32 bits.
//!
//! ## Packing rule
//!
//! Fields are placed greedily in declaration order. When a field does not fit
//! in the bits left in the current bucket, the compiler moves on to the next
//! bucket and starts that field at the bucket's first position. A field wider
//! than a whole bucket is rejected with [`CoreError::InvalidLayout`].
//!
//! ```text
//! MsbFirst, 32-bit buckets, fields a:4 b:4 c:30
//!
//! bucket 0: [aaaa bbbb ........................]
//! bucket 1: [cccccccccccccccccccccccccccccc..]
//! ```
//!
//! Layouts are plain values built by a `const fn`. Compiling the same field
//! list twice yields the same table; nothing is shifted in place.

use crate::error::{CoreError, CoreResult};

/// Widest bucket a layout can address.
pub const MAX_BUCKET_BITS: u32 = u32::BITS;

/// One field request: a name and a width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, used for lookups and diagnostics.
    pub name: &'static str,
    /// Width in bits (1..=bucket width).
    pub bits: u32,
}

impl FieldSpec {
    /// Creates a field request.
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str, bits: u32) -> Self {
        Self { name, bits }
    }
}

/// Where fields start inside a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOrder {
    /// First field occupies the lowest bits.
    LsbFirst,
    /// First field occupies the highest bits.
    MsbFirst,
}

/// Compiled placement of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSlot {
    /// Bucket index relative to the record start.
    pub bucket: usize,
    /// Bit offset inside the bucket.
    pub offset: u32,
    /// Unshifted value mask (`2^bits - 1`).
    pub mask: u32,
}

impl FieldSlot {
    const EMPTY: Self = Self { bucket: 0, offset: 0, mask: 0 };

    /// Mask positioned over the field's bits inside its bucket.
    #[inline]
    #[must_use]
    pub const fn shifted_mask(self) -> u32 {
        self.mask << self.offset
    }

    /// Field width in bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.mask.count_ones()
    }
}

/// A compiled layout of `N` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitFieldLayout<const N: usize> {
    names: [&'static str; N],
    slots: [FieldSlot; N],
    bucket_bits: u32,
    buckets: usize,
    order: BitOrder,
}

impl<const N: usize> BitFieldLayout<N> {
    /// Compiles a field list into a layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLayout`] when the bucket width is outside
    /// `1..=32`, or when a field is zero bits or wider than one bucket.
    pub const fn compile(
        fields: [FieldSpec; N],
        bucket_bits: u32,
        order: BitOrder,
    ) -> CoreResult<Self> {
        if bucket_bits == 0 || bucket_bits > MAX_BUCKET_BITS {
            return Err(CoreError::InvalidLayout {
                field: "<bucket>",
                bits: bucket_bits,
                bucket_bits: MAX_BUCKET_BITS,
            });
        }

        let mut names = [""; N];
        let mut slots = [FieldSlot::EMPTY; N];
        let mut bucket = 0usize;
        let mut remaining = bucket_bits;

        let mut i = 0;
        while i < N {
            let entry = fields[i];
            if entry.bits == 0 || entry.bits > bucket_bits {
                return Err(CoreError::InvalidLayout {
                    field: entry.name,
                    bits: entry.bits,
                    bucket_bits,
                });
            }

            if remaining < entry.bits {
                bucket += 1;
                remaining = bucket_bits;
            }

            let offset = match order {
                BitOrder::LsbFirst => bucket_bits - remaining,
                BitOrder::MsbFirst => remaining - entry.bits,
            };
            remaining -= entry.bits;

            let mask = if entry.bits == u32::BITS {
                u32::MAX
            } else {
                (1u32 << entry.bits) - 1
            };

            names[i] = entry.name;
            slots[i] = FieldSlot { bucket, offset, mask };
            i += 1;
        }

        Ok(Self {
            names,
            slots,
            bucket_bits,
            buckets: if N == 0 { 0 } else { bucket + 1 },
            order,
        })
    }

    /// Number of buckets one record occupies.
    #[inline]
    #[must_use]
    pub const fn bucket_count(&self) -> usize {
        self.buckets
    }

    /// Width of one bucket in bits.
    #[inline]
    #[must_use]
    pub const fn bucket_bits(&self) -> u32 {
        self.bucket_bits
    }

    /// Bit order the layout was compiled with.
    #[inline]
    #[must_use]
    pub const fn order(&self) -> BitOrder {
        self.order
    }

    /// Number of fields.
    #[inline]
    #[must_use]
    pub const fn field_count(&self) -> usize {
        N
    }

    /// Compiled placement of field `field`.
    ///
    /// # Panics
    /// Panics if `field >= N`.
    #[inline]
    #[must_use]
    pub const fn slot(&self, field: usize) -> FieldSlot {
        self.slots[field]
    }

    /// Field names in declaration order.
    #[must_use]
    pub const fn names(&self) -> &[&'static str; N] {
        &self.names
    }

    /// Looks up a field index by name.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| *n == name)
    }

    /// Reads one field from the record starting at `buffer[offset]`.
    #[inline]
    #[must_use]
    pub fn get(&self, buffer: &[u32], offset: usize, field: usize) -> u32 {
        let slot = self.slots[field];
        (buffer[offset + slot.bucket] >> slot.offset) & slot.mask
    }

    /// Writes one field, leaving every other bit of the bucket untouched.
    ///
    /// Values wider than the field are truncated to the field width.
    #[inline]
    pub fn set(&self, buffer: &mut [u32], offset: usize, field: usize, value: u32) {
        let slot = self.slots[field];
        let word = &mut buffer[offset + slot.bucket];
        *word = (*word & !slot.shifted_mask()) | ((value & slot.mask) << slot.offset);
    }

    /// Reads a field from a single-bucket record held in a plain word.
    #[inline]
    #[must_use]
    pub const fn get_word(&self, word: u32, field: usize) -> u32 {
        let slot = self.slots[field];
        (word >> slot.offset) & slot.mask
    }

    /// Returns `word` with one field replaced (single-bucket records).
    #[inline]
    #[must_use]
    pub const fn set_word(&self, word: u32, field: usize, value: u32) -> u32 {
        let slot = self.slots[field];
        (word & !slot.shifted_mask()) | ((value & slot.mask) << slot.offset)
    }

    /// Zeroes every bucket of the record starting at `buffer[offset]`.
    #[inline]
    pub fn clear(&self, buffer: &mut [u32], offset: usize) {
        buffer[offset..offset + self.buckets].fill(0);
    }

    /// Batched writer: ORs every field into the record.
    ///
    /// The record must be cleared first (see [`Self::write_all`]); this is the
    /// hot path of the mesher and does not touch bits it is not writing.
    #[inline]
    pub fn set_all(&self, buffer: &mut [u32], offset: usize, values: &[u32; N]) {
        for (slot, &value) in self.slots.iter().zip(values) {
            buffer[offset + slot.bucket] |= (value & slot.mask) << slot.offset;
        }
    }

    /// Clears the record, then writes every field.
    #[inline]
    pub fn write_all(&self, buffer: &mut [u32], offset: usize, values: &[u32; N]) {
        self.clear(buffer, offset);
        self.set_all(buffer, offset, values);
    }

    /// Batched reader: returns every field in declaration order.
    #[inline]
    #[must_use]
    pub fn get_all(&self, buffer: &[u32], offset: usize) -> [u32; N] {
        let mut values = [0u32; N];
        for (value, slot) in values.iter_mut().zip(&self.slots) {
            *value = (buffer[offset + slot.bucket] >> slot.offset) & slot.mask;
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: [FieldSpec; 4] = [
        FieldSpec::new("a", 4),
        FieldSpec::new("b", 4),
        FieldSpec::new("c", 30),
        FieldSpec::new("d", 2),
    ];

    #[test]
    fn test_greedy_packing_msb_first() {
        let layout = BitFieldLayout::compile(FIELDS, 32, BitOrder::MsbFirst).unwrap();

        assert_eq!(layout.slot(0), FieldSlot { bucket: 0, offset: 28, mask: 0xF });
        assert_eq!(layout.slot(1), FieldSlot { bucket: 0, offset: 24, mask: 0xF });
        // 24 bits left, 30 needed: next bucket
        assert_eq!(layout.slot(2).bucket, 1);
        assert_eq!(layout.slot(2).offset, 2);
        assert_eq!(layout.slot(3), FieldSlot { bucket: 1, offset: 0, mask: 0b11 });
        assert_eq!(layout.bucket_count(), 2);
    }

    #[test]
    fn test_greedy_packing_lsb_first() {
        let layout = BitFieldLayout::compile(FIELDS, 32, BitOrder::LsbFirst).unwrap();

        assert_eq!(layout.slot(0).offset, 0);
        assert_eq!(layout.slot(1).offset, 4);
        assert_eq!(layout.slot(2), FieldSlot { bucket: 1, offset: 0, mask: (1 << 30) - 1 });
        assert_eq!(layout.slot(3), FieldSlot { bucket: 1, offset: 30, mask: 0b11 });
    }

    #[test]
    fn test_field_wider_than_bucket() {
        let err = BitFieldLayout::compile([FieldSpec::new("huge", 9)], 8, BitOrder::LsbFirst)
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidLayout { field: "huge", bits: 9, bucket_bits: 8 });
    }

    #[test]
    fn test_zero_width_field_rejected() {
        assert!(BitFieldLayout::compile([FieldSpec::new("none", 0)], 8, BitOrder::LsbFirst).is_err());
        assert!(BitFieldLayout::compile([FieldSpec::new("a", 1)], 33, BitOrder::LsbFirst).is_err());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let first = BitFieldLayout::compile(FIELDS, 32, BitOrder::MsbFirst).unwrap();
        let second = BitFieldLayout::compile(FIELDS, 32, BitOrder::MsbFirst).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_width_field() {
        let layout = BitFieldLayout::compile([FieldSpec::new("word", 32)], 32, BitOrder::MsbFirst)
            .unwrap();
        let mut buffer = [0u32; 1];
        layout.set(&mut buffer, 0, 0, u32::MAX);
        assert_eq!(layout.get(&buffer, 0, 0), u32::MAX);
    }

    #[test]
    fn test_set_does_not_disturb_neighbours() {
        let layout = BitFieldLayout::compile(FIELDS, 32, BitOrder::MsbFirst).unwrap();
        let mut buffer = [0u32; 4];

        layout.write_all(&mut buffer, 1, &[0xA, 0x5, 0x3FFF_FFFF, 0b10]);
        layout.set(&mut buffer, 1, 1, 0xF);

        assert_eq!(layout.get(&buffer, 1, 0), 0xA);
        assert_eq!(layout.get(&buffer, 1, 1), 0xF);
        assert_eq!(layout.get(&buffer, 1, 2), 0x3FFF_FFFF);
        assert_eq!(layout.get(&buffer, 1, 3), 0b10);
        // Record starts at offset 1
        assert_eq!(buffer[0], 0);
        assert_eq!(buffer[3], 0);
    }

    #[test]
    fn test_set_truncates_to_field_width() {
        let layout = BitFieldLayout::compile(FIELDS, 32, BitOrder::LsbFirst).unwrap();
        let mut buffer = [0u32; 2];

        layout.set(&mut buffer, 0, 0, 0x1F);
        assert_eq!(layout.get(&buffer, 0, 0), 0xF);
        assert_eq!(layout.get(&buffer, 0, 1), 0);
    }

    #[test]
    fn test_word_helpers_match_buffer_access() {
        let layout = BitFieldLayout::compile(
            [FieldSpec::new("x", 3), FieldSpec::new("y", 5)],
            16,
            BitOrder::LsbFirst,
        )
        .unwrap();

        let word = layout.set_word(0, 1, 21);
        let mut buffer = [0u32];
        layout.set(&mut buffer, 0, 1, 21);

        assert_eq!(word, buffer[0]);
        assert_eq!(layout.get_word(word, 1), 21);
        assert_eq!(layout.set_word(word, 1, 0), 0);
    }

    #[test]
    fn test_field_index_lookup() {
        let layout = BitFieldLayout::compile(FIELDS, 32, BitOrder::LsbFirst).unwrap();
        assert_eq!(layout.field_index("c"), Some(2));
        assert_eq!(layout.field_index("z"), None);
    }
}
