//! Named storage ("memory") variants and their access surface.
//!
//! A [`Memory`] is a typed, fixed-length collection of items reachable by
//! index through [`Memory::access`]. Four shapes share the contract: dense
//! physical memory over sparse storage, tracked register files, scratch
//! variable arrays, and aliases that reinterpret another location's or
//! memory's bits without owning any of their own.

mod alias;
mod physical;
mod registers;
mod variables;

use std::rc::Rc;

use crate::allocator::MemoryAllocator;
use crate::contract::{check_index, fail, Violation};
use crate::handler::HandlerSlot;
use crate::location::Location;
use crate::storage::SparseStorage;
use crate::trace::Tracer;
use crate::types::{Data, ValueType};

pub(crate) use alias::{LocationAliasBacking, RangeAliasBacking};
pub(crate) use physical::PhysicalBacking;
pub(crate) use registers::RegisterBacking;
pub(crate) use variables::VariableBacking;

/// Kind tag of a named storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryKind {
    /// Register file with per-bit initialization tracking.
    Register,
    /// Dense physical memory backed by sparse storage.
    Memory,
    /// Always-initialized scratch variables.
    Variable,
}

/// Index argument accepted by [`Memory::access`].
///
/// Converts from the native unsigned integers and from stored data values,
/// so an index loaded from simulated state can address storage directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessIndex(u128);

impl AccessIndex {
    /// Returns the index as an address value.
    #[must_use]
    pub const fn value(self) -> u128 {
        self.0
    }
}

impl From<u32> for AccessIndex {
    fn from(value: u32) -> Self {
        Self(u128::from(value))
    }
}

impl From<u64> for AccessIndex {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl From<u128> for AccessIndex {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<usize> for AccessIndex {
    fn from(value: usize) -> Self {
        Self(value as u128)
    }
}

impl From<&Data> for AccessIndex {
    fn from(value: &Data) -> Self {
        Self(value.to_u128())
    }
}

impl From<Data> for AccessIndex {
    fn from(value: Data) -> Self {
        Self(value.to_u128())
    }
}

pub(crate) enum Backing {
    Physical(PhysicalBacking),
    Registers(RegisterBacking),
    Variables(VariableBacking),
    AliasLocation(LocationAliasBacking),
    AliasRange(RangeAliasBacking),
}

/// A named, typed, fixed-length storage registered in a registry.
pub struct Memory {
    kind: MemoryKind,
    name: String,
    ty: ValueType,
    length: u128,
    is_alias: bool,
    address_bit_size: usize,
    backing: Backing,
}

impl Memory {
    pub(crate) fn new_dense(
        kind: MemoryKind,
        name: &str,
        ty: ValueType,
        length: u128,
        handler: HandlerSlot,
        tracer: Tracer,
    ) -> Self {
        let backing = match kind {
            MemoryKind::Memory => {
                Backing::Physical(PhysicalBacking::new(name, ty, length, handler, tracer))
            }
            MemoryKind::Register => {
                Backing::Registers(RegisterBacking::new(name, ty, length, tracer))
            }
            MemoryKind::Variable => Backing::Variables(VariableBacking::new(ty, length)),
        };
        Self::assemble(kind, name, ty, length, false, backing)
    }

    pub(crate) fn new_alias(
        kind: MemoryKind,
        name: &str,
        ty: ValueType,
        length: u128,
        source: Location,
    ) -> Self {
        let backing = Backing::AliasLocation(LocationAliasBacking::new(ty, length, source));
        Self::assemble(kind, name, ty, length, true, backing)
    }

    pub(crate) fn new_alias_range(
        kind: MemoryKind,
        name: &str,
        ty: ValueType,
        length: u128,
        source: Rc<Self>,
        min: u128,
        max: u128,
    ) -> Self {
        let backing = Backing::AliasRange(RangeAliasBacking::new(ty, length, source, min, max));
        Self::assemble(kind, name, ty, length, true, backing)
    }

    fn assemble(
        kind: MemoryKind,
        name: &str,
        ty: ValueType,
        length: u128,
        is_alias: bool,
        backing: Backing,
    ) -> Self {
        assert!(length > 0, "storage length must be non-zero");
        assert!(ty.bit_size() > 0, "item width must be non-zero");
        Self {
            kind,
            name: name.to_string(),
            ty,
            length,
            is_alias,
            address_bit_size: SparseStorage::calculate_address_size(length),
            backing,
        }
    }

    /// Returns the kind tag.
    #[must_use]
    pub const fn kind(&self) -> MemoryKind {
        self.kind
    }

    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the item type.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.ty
    }

    /// Returns the item count.
    #[must_use]
    pub const fn length(&self) -> u128 {
        self.length
    }

    /// Returns `true` when this storage reinterprets another one's bits.
    #[must_use]
    pub const fn is_alias(&self) -> bool {
        self.is_alias
    }

    /// Returns the number of address bits needed to index every item.
    #[must_use]
    pub const fn address_bit_size(&self) -> usize {
        self.address_bit_size
    }

    /// Returns a location for the item at `index`.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] when `index` is outside the
    /// item count.
    #[must_use]
    #[track_caller]
    pub fn access(&self, index: impl Into<AccessIndex>) -> Location {
        let index = index.into().value();
        check_index(index, self.length);
        match &self.backing {
            Backing::Physical(backing) => backing.access(self.ty, index),
            Backing::Registers(backing) => backing.access(index),
            Backing::Variables(backing) => backing.access(self.ty, index),
            Backing::AliasLocation(backing) => backing.access(self.ty, index),
            Backing::AliasRange(backing) => backing.access(self.ty, index),
        }
    }

    /// Zeroes all owned state, including initialization tracking.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::UnsupportedOperation`] on aliases, which own no
    /// state of their own.
    #[track_caller]
    pub fn reset(&self) {
        match &self.backing {
            Backing::Physical(backing) => backing.reset(),
            Backing::Registers(backing) => backing.reset(),
            Backing::Variables(backing) => backing.reset(),
            Backing::AliasLocation(_) | Backing::AliasRange(_) => {
                fail(Violation::UnsupportedOperation {
                    operation: "reset an alias",
                });
            }
        }
    }

    /// Switches the temp-copy mode on or off.
    ///
    /// Aliases have no state of their own and ignore the request, exactly
    /// like their underlying storage receives it directly.
    pub fn set_use_temp_copy(&self, value: bool) {
        match &self.backing {
            Backing::Physical(backing) => backing.set_use_temp_copy(value),
            Backing::Registers(backing) => backing.set_use_temp_copy(value),
            Backing::Variables(backing) => backing.set_use_temp_copy(value),
            Backing::AliasLocation(_) | Backing::AliasRange(_) => {}
        }
    }

    /// Returns the backing sparse storage of a dense memory.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::UnsupportedOperation`] for non-dense kinds.
    #[must_use]
    #[track_caller]
    pub fn storage(&self) -> Rc<SparseStorage> {
        match &self.backing {
            Backing::Physical(backing) => backing.storage(),
            _ => fail(Violation::UnsupportedOperation {
                operation: "take the backing storage of a non-dense memory",
            }),
        }
    }

    /// Creates an allocator placing bulk data into this dense memory.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::UnsupportedOperation`] for non-dense kinds
    /// (aliases included) and [`Violation::SizeMismatch`] when the unit size
    /// does not divide the item width.
    #[must_use]
    #[track_caller]
    pub fn new_allocator(
        &self,
        addressable_unit_bit_size: usize,
        base_address: u128,
    ) -> MemoryAllocator {
        MemoryAllocator::new(self.storage(), addressable_unit_bit_size, base_address)
    }
}

impl core::fmt::Debug for Memory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Memory")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("type", &self.ty)
            .field("length", &self.length)
            .field("alias", &self.is_alias)
            .finish()
    }
}
