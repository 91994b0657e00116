//! Value types and the typed data words produced by location loads.

use core::fmt;

use num_bigint::BigUint;

use crate::bits::Bits;
use crate::contract::{fail, Violation};

/// Numeric interpretation tag for a stored value.
///
/// The tag never changes the stored bits; it only records how collaborating
/// components should interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TypeId {
    /// Unsigned cardinal value.
    Card,
    /// Two's-complement signed integer value.
    Int,
    /// Boolean view of a bit string.
    Bool,
}

/// Item type of a named storage: a numeric tag plus a bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ValueType {
    id: TypeId,
    bit_size: usize,
}

impl ValueType {
    /// Creates an unsigned type of the given width.
    #[must_use]
    pub const fn card(bit_size: usize) -> Self {
        Self {
            id: TypeId::Card,
            bit_size,
        }
    }

    /// Creates a signed type of the given width.
    #[must_use]
    pub const fn int(bit_size: usize) -> Self {
        Self {
            id: TypeId::Int,
            bit_size,
        }
    }

    /// Creates the single-bit boolean type.
    #[must_use]
    pub const fn bool_type() -> Self {
        Self {
            id: TypeId::Bool,
            bit_size: 1,
        }
    }

    /// Returns the numeric tag.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns the width in bits.
    #[must_use]
    pub const fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// Returns the same tag at a different width.
    #[must_use]
    pub const fn resize(&self, bit_size: usize) -> Self {
        Self {
            id: self.id,
            bit_size,
        }
    }

    /// Returns the same width under a different tag.
    #[must_use]
    pub const fn cast_to(&self, id: TypeId) -> Self {
        Self {
            id,
            bit_size: self.bit_size,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.id {
            TypeId::Card => "card",
            TypeId::Int => "int",
            TypeId::Bool => "bool",
        };
        write!(f, "{tag}({})", self.bit_size)
    }
}

/// A typed bit-string value, as loaded from or stored to a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    ty: ValueType,
    bits: Bits,
}

impl Data {
    /// Wraps raw bits under a type.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::SizeMismatch`] when the bit width does not match
    /// the type width.
    #[must_use]
    #[track_caller]
    pub fn new(ty: ValueType, bits: Bits) -> Self {
        if bits.width() != ty.bit_size() {
            fail(Violation::SizeMismatch {
                context: "typed data construction",
                expected: ty.bit_size() as u128,
                actual: bits.width() as u128,
            });
        }
        Self { ty, bits }
    }

    /// Creates a typed value from an unsigned integer, truncating to width.
    #[must_use]
    pub fn of(ty: ValueType, value: u128) -> Self {
        Self {
            ty,
            bits: Bits::from_u128(value, ty.bit_size()),
        }
    }

    /// Returns the value type.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.ty
    }

    /// Returns the width in bits.
    #[must_use]
    pub const fn bit_size(&self) -> usize {
        self.ty.bit_size()
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(&self) -> &Bits {
        &self.bits
    }

    /// Returns the low 128 bits as an unsigned integer.
    #[must_use]
    pub fn to_u128(&self) -> u128 {
        self.bits.to_u128()
    }

    /// Returns the full value as an arbitrary-precision unsigned integer.
    #[must_use]
    pub fn value(&self) -> BigUint {
        self.bits.to_biguint()
    }

    /// Renders the raw bits MSB-first.
    #[must_use]
    pub fn to_bin_string(&self) -> String {
        self.bits.to_bin_string()
    }

    /// Returns the same bits under a different numeric tag.
    #[must_use]
    pub fn cast_to(&self, id: TypeId) -> Self {
        Self {
            ty: self.ty.cast_to(id),
            bits: self.bits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Data, TypeId, ValueType};
    use crate::bits::Bits;

    #[test]
    fn resize_keeps_the_tag_and_cast_keeps_the_width() {
        let ty = ValueType::card(32);
        assert_eq!(ty.resize(16), ValueType::card(16));
        assert_eq!(ty.cast_to(TypeId::Int), ValueType::int(32));
        assert_eq!(ValueType::bool_type().bit_size(), 1);
    }

    #[test]
    fn data_of_truncates_to_type_width() {
        let data = Data::of(ValueType::card(8), 0x1FF);
        assert_eq!(data.to_u128(), 0xFF);
        assert_eq!(data.bit_size(), 8);
    }

    #[test]
    fn cast_reinterprets_without_touching_bits() {
        let data = Data::of(ValueType::card(16), 0x8001);
        let cast = data.cast_to(TypeId::Int);
        assert_eq!(cast.value_type(), ValueType::int(16));
        assert_eq!(cast.bits(), data.bits());
    }

    #[test]
    #[should_panic(expected = "typed data construction: expected 16 bits, got 8 bits")]
    fn construction_rejects_width_mismatch() {
        let _ = Data::new(ValueType::card(16), Bits::zeros(8));
    }

    #[test]
    fn display_names_tag_and_width() {
        assert_eq!(ValueType::int(64).to_string(), "int(64)");
    }
}
