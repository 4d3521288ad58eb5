pub mod simd;

use std::ops::{BitAnd, BitOr, Not};

use wide::f32x8;

pub fn bit_iter(bits: u64) -> BitIter {
    BitIter { bits }
}

#[derive(Copy, Clone, Debug)]
pub struct BitIter {
    bits: u64,
}

impl Iterator for BitIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.bits == 0 {
            return None;
        }
        let tz = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(tz)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.bits.count_ones() as usize;
        (count, Some(count))
    }
}

/// Per-lane selection bits for packets of up to 64 lanes.
/// Bit `i` selects lane `i`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LaneMask(u64);

impl LaneMask {
    pub const NONE: LaneMask = LaneMask(0);
    pub const MAX_LANES: usize = u64::BITS as usize;

    pub const fn from_bits(bits: u64) -> LaneMask {
        LaneMask(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Mask selecting lanes `0..n`.
    pub const fn first(n: usize) -> LaneMask {
        if n >= Self::MAX_LANES {
            LaneMask(u64::MAX)
        } else {
            LaneMask((1u64 << n) - 1)
        }
    }

    /// Mask selecting the listed lanes; panics if a lane is 64 or above.
    pub fn from_lanes(lanes: impl IntoIterator<Item = usize>) -> LaneMask {
        LaneMask(lanes.into_iter().fold(0, |acc, lane| {
            assert!(lane < Self::MAX_LANES, "lane {lane} out of range");
            acc | (1 << lane)
        }))
    }

    pub fn from_bools(lanes: &[bool]) -> LaneMask {
        Self::from_lanes(
            lanes
                .iter()
                .enumerate()
                .filter(|(_, selected)| **selected)
                .map(|(lane, _)| lane),
        )
    }

    pub fn contains(self, lane: usize) -> bool {
        lane < Self::MAX_LANES && self.0 & (1 << lane) != 0
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> BitIter {
        bit_iter(self.0)
    }
}

impl BitAnd for LaneMask {
    type Output = LaneMask;

    fn bitand(self, rhs: LaneMask) -> LaneMask {
        LaneMask(self.0 & rhs.0)
    }
}

impl BitOr for LaneMask {
    type Output = LaneMask;

    fn bitor(self, rhs: LaneMask) -> LaneMask {
        LaneMask(self.0 | rhs.0)
    }
}

impl Not for LaneMask {
    type Output = LaneMask;

    fn not(self) -> LaneMask {
        LaneMask(!self.0)
    }
}

/// Converts a wide comparison result (all-ones / all-zeros lanes) into a lane mask.
impl From<f32x8> for LaneMask {
    fn from(mask: f32x8) -> LaneMask {
        LaneMask(mask.move_mask() as u32 as u64)
    }
}

impl IntoIterator for LaneMask {
    type Item = usize;
    type IntoIter = BitIter;

    fn into_iter(self) -> BitIter {
        self.iter()
    }
}
