//! Packed long-array bit storage, as used for block states, biomes, and
//! heightmaps in the post-1.16 chunk format.
//!
//! Each entry occupies `bits_per_entry` bits, packed low-to-high within a
//! big-endian `i64`. Unlike the pre-1.18 format, entries never span a word
//! boundary: once an entry would overflow the remaining bits of the current
//! long, the packer starts a fresh long and leaves the unused high bits zero.

/// Unpacks `count` entries of `bits_per_entry` bits each from `longs`.
pub fn unpack(longs: &[i64], bits_per_entry: u32, count: usize) -> Vec<u32> {
    if bits_per_entry == 0 {
        return vec![0; count];
    }
    let entries_per_long = (64 / bits_per_entry) as usize;
    let mask: u64 = if bits_per_entry == 64 {
        u64::MAX
    } else {
        (1u64 << bits_per_entry) - 1
    };

    let mut out = Vec::with_capacity(count);
    'outer: for &word in longs {
        let word = word as u64;
        for slot in 0..entries_per_long {
            if out.len() == count {
                break 'outer;
            }
            let shift = (slot as u32) * bits_per_entry;
            out.push(((word >> shift) & mask) as u32);
        }
    }
    out
}

/// Packs `values` at `bits_per_entry` bits each, the inverse of [`unpack`].
/// Produces the minimum number of longs needed, matching the layout
/// `unpack` expects.
pub fn pack(values: &[u32], bits_per_entry: u32) -> Vec<i64> {
    if bits_per_entry == 0 {
        return Vec::new();
    }
    let entries_per_long = (64 / bits_per_entry) as usize;
    let mask: u64 = if bits_per_entry == 64 {
        u64::MAX
    } else {
        (1u64 << bits_per_entry) - 1
    };

    let num_longs = values.len().div_ceil(entries_per_long).max(1);
    let mut longs = vec![0i64; num_longs];

    for (i, &v) in values.iter().enumerate() {
        let long_idx = i / entries_per_long;
        let slot = i % entries_per_long;
        let shift = (slot as u32) * bits_per_entry;
        longs[long_idx] |= (((v as u64) & mask) << shift) as i64;
    }
    longs
}

/// Minimum bits needed to index `palette_len` distinct block states,
/// floored at 4 (vanilla never emits a narrower block palette).
pub fn bits_for_block_palette(palette_len: usize) -> u32 {
    bits_needed(palette_len).max(4)
}

/// Minimum bits needed to index `palette_len` distinct biomes, floored at 1.
pub fn bits_for_biome_palette(palette_len: usize) -> u32 {
    bits_needed(palette_len).max(1)
}

fn bits_needed(palette_len: usize) -> u32 {
    if palette_len <= 1 {
        return 0;
    }
    (usize::BITS - (palette_len - 1).leading_zeros()).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_for_each_bits_per_entry() {
        for bits in 1..=9u32 {
            let max = (1u32 << bits) - 1;
            let values: Vec<u32> = (0..64).map(|i| i % (max + 1)).collect();
            let longs = pack(&values, bits);
            let decoded = unpack(&longs, bits, values.len());
            assert_eq!(decoded, values, "round trip failed at {bits} bits");
        }
    }

    #[test]
    fn entries_never_span_a_word_boundary() {
        // 9 bits per entry: 64/9 = 7 entries per long, one bit left unused.
        let values: Vec<u32> = (0..8).collect();
        let longs = pack(&values, 9);
        assert_eq!(longs.len(), 2, "8th value must start a new long");
        let decoded = unpack(&longs, 9, 8);
        assert_eq!(decoded, values);
    }

    #[test]
    fn bits_for_block_palette_floors_at_four() {
        assert_eq!(bits_for_block_palette(1), 4);
        assert_eq!(bits_for_block_palette(16), 4);
        assert_eq!(bits_for_block_palette(17), 5);
        assert_eq!(bits_for_block_palette(256), 8);
        assert_eq!(bits_for_block_palette(257), 9);
    }

    #[test]
    fn bits_for_biome_palette_floors_at_one() {
        assert_eq!(bits_for_biome_palette(1), 1);
        assert_eq!(bits_for_biome_palette(2), 1);
        assert_eq!(bits_for_biome_palette(3), 2);
    }
}
