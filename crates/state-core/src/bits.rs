//! Width-carrying bit-string value type the whole storage model is built on.
//!
//! Bit position 0 is the least significant bit. All widths are fixed at
//! construction; operations that combine two values check widths eagerly.

use core::fmt;

use bitvec::field::BitField;
use bitvec::order::Lsb0;
use bitvec::vec::BitVec;
use num_bigint::BigUint;

use crate::contract::{fail, Violation};

/// Fixed-width bit string with LSB-first bit positions.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bits {
    bits: BitVec<u8, Lsb0>,
}

impl Bits {
    /// Creates an all-zero value of the given width.
    #[must_use]
    pub fn zeros(width: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, width),
        }
    }

    /// Creates an all-one value of the given width.
    #[must_use]
    pub fn ones(width: usize) -> Self {
        Self {
            bits: BitVec::repeat(true, width),
        }
    }

    /// Creates a value of the given width from an unsigned integer.
    ///
    /// Bits of `value` above `width` are discarded; widths above 128 are
    /// zero-extended.
    #[must_use]
    pub fn from_u128(value: u128, width: usize) -> Self {
        let mut out = Self::zeros(width);
        let low = width.min(128);
        if low > 0 {
            let masked = if low == 128 {
                value
            } else {
                value & ((1_u128 << low) - 1)
            };
            out.bits[..low].store_le::<u128>(masked);
        }
        out
    }

    /// Creates a value of the given width from an arbitrary-precision integer.
    ///
    /// Bits of `value` above `width` are discarded.
    #[must_use]
    pub fn from_biguint(value: &BigUint, width: usize) -> Self {
        Self::from_le_bytes(&value.to_bytes_le(), width)
    }

    /// Creates a value of the given width from little-endian bytes.
    ///
    /// `bytes[0]` supplies bit positions 0 to 7; missing high bytes are
    /// zero-filled and excess bytes are discarded.
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8], width: usize) -> Self {
        let mut out = Self::zeros(width);
        for (index, byte) in bytes.iter().enumerate() {
            let start = index * 8;
            if start >= width {
                break;
            }
            let len = 8.min(width - start);
            let chunk = if len < 8 {
                *byte & ((1_u8 << len) - 1)
            } else {
                *byte
            };
            out.bits[start..start + len].store_le::<u8>(chunk);
        }
        out
    }

    /// Returns the width in bits.
    #[must_use]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` when every bit is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.bits.not_any()
    }

    /// Returns the low 128 bits as an unsigned integer.
    #[must_use]
    pub fn to_u128(&self) -> u128 {
        let low = self.width().min(128);
        if low == 0 {
            0
        } else {
            self.bits[..low].load_le::<u128>()
        }
    }

    /// Returns the full value as an arbitrary-precision unsigned integer.
    #[must_use]
    pub fn to_biguint(&self) -> BigUint {
        let mut bytes = Vec::with_capacity(self.width().div_ceil(8));
        for chunk in self.bits.chunks(8) {
            bytes.push(chunk.load_le::<u8>());
        }
        BigUint::from_bytes_le(&bytes)
    }

    /// Extracts the sub-range of `len` bits starting at bit `start`.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] when the range does not fit the
    /// value.
    #[must_use]
    #[track_caller]
    pub fn field(&self, start: usize, len: usize) -> Self {
        self.check_range(start, len);
        Self {
            bits: self.bits[start..start + len].to_bitvec(),
        }
    }

    /// Overwrites the sub-range starting at bit `start` with `value`.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] when the range does not fit the
    /// value.
    #[track_caller]
    pub fn assign_field(&mut self, start: usize, value: &Self) {
        self.check_range(start, value.width());
        self.bits[start..start + value.width()].copy_from_bitslice(&value.bits);
    }

    /// Sets `len` bits starting at bit `start`.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] when the range does not fit the
    /// value.
    #[track_caller]
    pub fn set_range(&mut self, start: usize, len: usize) {
        self.check_range(start, len);
        self.bits[start..start + len].fill(true);
    }

    /// Returns `true` when all of the `len` bits starting at `start` are set.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] when the range does not fit the
    /// value.
    #[must_use]
    #[track_caller]
    pub fn all_set_in(&self, start: usize, len: usize) -> bool {
        self.check_range(start, len);
        self.bits[start..start + len].all()
    }

    /// Clears every bit, keeping the width.
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Renders the value MSB-first as a string of `0`/`1` characters.
    #[must_use]
    pub fn to_bin_string(&self) -> String {
        self.bits
            .iter()
            .rev()
            .map(|bit| if *bit { '1' } else { '0' })
            .collect()
    }

    #[track_caller]
    fn check_range(&self, start: usize, len: usize) {
        if start + len > self.width() {
            fail(Violation::BoundsViolation {
                index: (start + len) as u128,
                bound: (self.width() + 1) as u128,
            });
        }
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({}'b{})", self.width(), self.to_bin_string())
    }
}
