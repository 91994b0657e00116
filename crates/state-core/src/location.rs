//! Location: the handle through which every bit-exact read and write goes.
//!
//! A location is an immutable composition of sources, each a contiguous
//! sub-range of one backing unit (a sparse-storage region or an atom).
//! Sources are ordered most-significant-first and their widths always sum
//! to the location width. Transformations never mutate in place; they
//! produce new locations sharing the backing units.

use std::rc::Rc;

use num_bigint::BigUint;

use crate::atom::Atom;
use crate::bits::Bits;
use crate::contract::{fail, Violation};
use crate::handler::{HandlerSlot, RegionAccess};
use crate::storage::SparseStorage;
use crate::trace::TraceEvent;
use crate::types::{Data, TypeId, ValueType};

/// One contiguous sub-range of a backing unit contributing to a location.
#[derive(Clone)]
pub(crate) enum Source {
    /// Bits `start_bit .. start_bit + bit_size` of a storage region.
    Storage {
        storage: Rc<SparseStorage>,
        address: u128,
        bit_size: usize,
        start_bit: usize,
    },
    /// An atom view; width and start live inside the atom.
    Atom(Atom),
}

impl Source {
    fn bit_size(&self) -> usize {
        match self {
            Self::Storage { bit_size, .. } => *bit_size,
            Self::Atom(atom) => atom.bit_size(),
        }
    }

    fn start_bit(&self) -> usize {
        match self {
            Self::Storage { start_bit, .. } => *start_bit,
            Self::Atom(atom) => atom.start_bit(),
        }
    }

    #[track_caller]
    fn resize(&self, new_bit_size: usize, new_start_bit: usize) -> Self {
        match self {
            Self::Storage {
                storage,
                address,
                bit_size,
                start_bit,
            } => {
                let inside = new_start_bit >= *start_bit
                    && new_start_bit + new_bit_size <= *start_bit + *bit_size;
                if !inside {
                    fail(Violation::UnsupportedOperation {
                        operation: "resize a storage source beyond its current range",
                    });
                }
                Self::Storage {
                    storage: Rc::clone(storage),
                    address: *address,
                    bit_size: new_bit_size,
                    start_bit: new_start_bit,
                }
            }
            Self::Atom(atom) => Self::Atom(atom.resize(new_bit_size, new_start_bit)),
        }
    }

    fn is_initialized(&self) -> bool {
        match self {
            Self::Storage {
                storage, address, ..
            } => storage.is_initialized(*address),
            Self::Atom(atom) => atom.is_initialized(),
        }
    }

    fn load(&self, trace: bool) -> Bits {
        match self {
            Self::Storage {
                storage,
                address,
                bit_size,
                start_bit,
            } => {
                let data = storage.read(*address).field(*start_bit, *bit_size);
                if trace && storage.tracer().is_enabled() {
                    storage.tracer().emit(TraceEvent::MemoryAccess {
                        storage: storage.id().to_string(),
                        address: *address,
                        value: data.clone(),
                        is_write: false,
                    });
                }
                data
            }
            Self::Atom(atom) => atom.load(),
        }
    }

    fn store(&self, data: &Bits, trace: bool) {
        match self {
            Self::Storage {
                storage,
                address,
                bit_size,
                start_bit,
            } => {
                if *bit_size == storage.region_bit_size() {
                    storage.write(*address, data);
                } else {
                    let mut region = storage.read(*address);
                    region.assign_field(*start_bit, data);
                    storage.write(*address, &region);
                }
                if trace && storage.tracer().is_enabled() {
                    storage.tracer().emit(TraceEvent::MemoryAccess {
                        storage: storage.id().to_string(),
                        address: *address,
                        value: data.clone(),
                        is_write: true,
                    });
                }
            }
            Self::Atom(atom) => atom.store(data),
        }
    }
}

/// Immutable handle for bit-exact reads and writes of simulated state.
#[derive(Clone)]
pub struct Location {
    ty: ValueType,
    sources: Vec<Source>,
}

impl Location {
    pub(crate) fn from_sources(ty: ValueType, sources: Vec<Source>) -> Self {
        debug_assert_eq!(
            sources.iter().map(Source::bit_size).sum::<usize>(),
            ty.bit_size(),
            "source widths must sum to the location width"
        );
        debug_assert!(!sources.is_empty(), "a location needs at least one source");
        Self { ty, sources }
    }

    /// Creates a location over one whole storage region.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::SizeMismatch`] when the type width does not match
    /// the region width.
    #[track_caller]
    pub(crate) fn for_region(ty: ValueType, storage: Rc<SparseStorage>, address: u128) -> Self {
        if ty.bit_size() != storage.region_bit_size() {
            fail(Violation::SizeMismatch {
                context: "location over a storage region",
                expected: storage.region_bit_size() as u128,
                actual: ty.bit_size() as u128,
            });
        }
        let bit_size = ty.bit_size();
        Self::from_sources(
            ty,
            vec![Source::Storage {
                storage,
                address,
                bit_size,
                start_bit: 0,
            }],
        )
    }

    /// Creates a location over one atom view.
    #[track_caller]
    pub(crate) fn for_atom(ty: ValueType, atom: Atom) -> Self {
        if ty.bit_size() != atom.bit_size() {
            fail(Violation::SizeMismatch {
                context: "location over an atom",
                expected: atom.bit_size() as u128,
                actual: ty.bit_size() as u128,
            });
        }
        Self::from_sources(ty, vec![Source::Atom(atom)])
    }

    /// Wraps a constant value into a read-only location.
    #[must_use]
    pub fn from_data(data: &Data) -> Self {
        Self::from_sources(
            data.value_type(),
            vec![Source::Atom(Atom::immediate(data.bits().clone()))],
        )
    }

    /// Returns the result type.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.ty
    }

    /// Returns the total width in bits.
    #[must_use]
    pub const fn bit_size(&self) -> usize {
        self.ty.bit_size()
    }

    /// Returns `true` when every backing bit has been written at least once.
    ///
    /// This is advisory: loads of uninitialized state are never refused,
    /// only reported here.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.sources.iter().all(Source::is_initialized)
    }

    /// Extracts the inclusive bit range `start..=end` (LSB-based) as a new
    /// location sharing the same backing units.
    ///
    /// Reversed bounds are swapped; requesting the whole range returns the
    /// location unchanged.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] when either bound is outside
    /// the location width.
    #[must_use]
    #[track_caller]
    pub fn bit_field(&self, start: usize, end: usize) -> Self {
        if start > end {
            return self.bit_field(end, start);
        }
        let width = self.bit_size();
        if end >= width {
            fail(Violation::BoundsViolation {
                index: end as u128,
                bound: width as u128,
            });
        }
        if start == 0 && end == width - 1 {
            return self.clone();
        }

        let new_width = end - start + 1;
        let mut picked = Vec::new();
        // Walk most-significant-first; `high` is the exclusive top of the
        // current source in LSB coordinates.
        let mut high = width;
        for source in &self.sources {
            let source_width = source.bit_size();
            let lo = high - source_width;
            let hi = high - 1;
            high = lo;

            if lo > end {
                continue;
            }
            if hi < start {
                break;
            }

            let keep_lo = start.max(lo);
            let keep_hi = end.min(hi);
            let keep_width = keep_hi - keep_lo + 1;
            if keep_width == source_width {
                picked.push(source.clone());
            } else {
                picked.push(source.resize(keep_width, source.start_bit() + (keep_lo - lo)));
            }
        }

        Self::from_sources(self.ty.resize(new_width), picked)
    }

    /// Extracts a single bit as a one-bit location.
    #[must_use]
    #[track_caller]
    pub fn bit(&self, index: usize) -> Self {
        self.bit_field(index, index)
    }

    /// Concatenates locations, first argument most significant.
    ///
    /// A single argument is returned unchanged; the result type is the first
    /// argument's type resized to the summed width.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::SizeMismatch`] when called with no arguments.
    #[must_use]
    #[track_caller]
    pub fn concat(parts: &[Self]) -> Self {
        let Some(first) = parts.first() else {
            fail(Violation::SizeMismatch {
                context: "location concatenation",
                expected: 1,
                actual: 0,
            });
        };
        if parts.len() == 1 {
            return first.clone();
        }

        let total: usize = parts.iter().map(Self::bit_size).sum();
        let mut sources = Vec::with_capacity(parts.iter().map(|part| part.sources.len()).sum());
        for part in parts {
            sources.extend(part.sources.iter().cloned());
        }
        Self::from_sources(first.ty.resize(total), sources)
    }

    /// Concatenates `count` copies of this location.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::SizeMismatch`] for a zero count.
    #[must_use]
    #[track_caller]
    pub fn repeat(&self, count: usize) -> Self {
        if count == 0 {
            fail(Violation::SizeMismatch {
                context: "location repetition",
                expected: 1,
                actual: 0,
            });
        }
        if count == 1 {
            return self.clone();
        }
        Self::concat(&vec![self.clone(); count])
    }

    /// Reinterprets the same bits under a different numeric tag.
    #[must_use]
    pub fn cast_to(&self, id: TypeId) -> Self {
        if self.ty.type_id() == id {
            return self.clone();
        }
        Self {
            ty: self.ty.cast_to(id),
            sources: self.sources.clone(),
        }
    }

    /// Loads the composed value, routing storage-backed sources through the
    /// registered access handler and the tracer.
    #[must_use]
    pub fn load(&self) -> Data {
        Data::new(self.ty, self.read_raw(true))
    }

    /// Stores a value of matching width, routing storage-backed sources
    /// through the registered access handler and the tracer.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::SizeMismatch`] when the value width differs from
    /// the location width.
    #[track_caller]
    pub fn store(&self, value: &Data) {
        if value.bit_size() != self.bit_size() {
            fail(Violation::SizeMismatch {
                context: "location store",
                expected: self.bit_size() as u128,
                actual: value.bit_size() as u128,
            });
        }
        self.write_raw(value.bits(), true);
    }

    /// Stores the value loaded from another location.
    pub fn assign(&self, source: &Self) {
        self.store(&source.load());
    }

    /// Returns the composed bits as an arbitrary-precision unsigned integer,
    /// bypassing handlers and tracing.
    #[must_use]
    pub fn value(&self) -> BigUint {
        self.read_raw(false).to_biguint()
    }

    /// Overwrites the composed bits from an unsigned integer, bypassing
    /// handlers and tracing.
    pub fn set_value(&self, value: &BigUint) {
        self.write_raw(&Bits::from_biguint(value, self.bit_size()), false);
    }

    /// Renders the composed bits MSB-first, bypassing handlers and tracing.
    #[must_use]
    pub fn to_bin_string(&self) -> String {
        self.read_raw(false).to_bin_string()
    }

    fn read_raw(&self, call_handlers: bool) -> Bits {
        if call_handlers {
            self.notify_handler(false, None);
        }
        let mut out = Bits::zeros(self.bit_size());
        let mut pos = 0;
        for source in self.sources.iter().rev() {
            let bits = source.load(call_handlers);
            out.assign_field(pos, &bits);
            pos += bits.width();
        }
        out
    }

    fn write_raw(&self, data: &Bits, call_handlers: bool) {
        if call_handlers {
            self.notify_handler(true, Some(data));
        }
        let mut pos = 0;
        for source in self.sources.iter().rev() {
            let width = source.bit_size();
            source.store(&data.field(pos, width), call_handlers);
            pos += width;
        }
    }

    /// Delivers the list of storage regions touched by one load or store to
    /// the registered handler. The contract is observe-only; without a
    /// registration this is the direct-access fast path.
    fn notify_handler(&self, is_store: bool, data: Option<&Bits>) {
        let mut slot: Option<HandlerSlot> = None;
        let mut regions = Vec::new();
        let mut pos = 0;
        for source in self.sources.iter().rev() {
            let width = source.bit_size();
            if let Source::Storage {
                storage,
                address,
                bit_size,
                start_bit,
            } = source
            {
                if storage.handler_slot().is_active() {
                    let access = data.map_or_else(
                        || storage.read(*address).field(*start_bit, *bit_size),
                        |stored| stored.field(pos, width),
                    );
                    regions.push(RegionAccess {
                        storage: storage.id().to_string(),
                        address: *address,
                        data: access,
                    });
                    if slot.is_none() {
                        slot = Some(storage.handler_slot().clone());
                    }
                }
            }
            pos += width;
        }

        if let Some(slot) = slot {
            regions.reverse();
            slot.with(|handler| {
                if is_store {
                    handler.on_store(&regions);
                } else {
                    handler.on_load(&regions);
                }
            });
        }
    }
}

impl core::fmt::Debug for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Location")
            .field("type", &self.ty)
            .field("sources", &self.sources.len())
            .finish()
    }
}
