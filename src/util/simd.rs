//! Fixed-width float chunks with masked memory access.
//! Lanes outside the mask are never read from the source nor written to the
//! destination, which makes the helpers safe to use on the tail of a row.

use assert2::debug_assert;
use wide::f32x8;

use super::LaneMask;

pub type FloatChunk = f32x8;
pub const CHUNK_LANES: usize = 8;

const FLOAT_BYTES: usize = std::mem::size_of::<f32>();

/// Lane mask covering chunk lanes that fall below `count`, for a chunk starting at `first`.
pub fn tail_mask(first: usize, count: usize) -> LaneMask {
    LaneMask::first(count.saturating_sub(first).min(CHUNK_LANES))
}

/// Loads the selected lanes from a row of native endian f32 values,
/// remaining lanes are zero.
pub fn load_masked(src: &[u8], mask: LaneMask) -> FloatChunk {
    debug_assert!(mask.bits() >> CHUNK_LANES == 0);
    let mut lanes = [0f32; CHUNK_LANES];
    for lane in mask {
        let start = lane * FLOAT_BYTES;
        lanes[lane] = bytemuck::pod_read_unaligned(&src[start..start + FLOAT_BYTES]);
    }
    FloatChunk::from(lanes)
}

/// Stores the selected lanes of `value` into `dst`.
pub fn store_masked(dst: &mut [f32], mask: LaneMask, value: FloatChunk) {
    debug_assert!(mask.bits() >> CHUNK_LANES == 0);
    let lanes = value.to_array();
    for lane in mask {
        dst[lane] = lanes[lane];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    fn row_bytes(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn tail_mask_full_and_partial() {
        assert!(tail_mask(0, 20) == LaneMask::first(8));
        assert!(tail_mask(16, 20) == LaneMask::first(4));
        assert!(tail_mask(24, 20).is_empty());
    }

    #[test]
    fn masked_load_reads_only_selected_lanes() {
        // The source only holds three floats, reading a fourth would go out of bounds.
        let src = row_bytes(&[1.0, 2.0, 3.0]);
        let chunk = load_masked(&src, LaneMask::first(3));
        assert!(chunk.to_array() == [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn masked_store_leaves_other_lanes() {
        let mut dst = [-1.0f32; 5];
        store_masked(
            &mut dst[..3],
            LaneMask::first(3),
            FloatChunk::from([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
        );
        assert!(dst == [1.0, 2.0, 3.0, -1.0, -1.0]);
    }
}
