//! Sparse, lazily allocated, bit-addressable storage.
//!
//! A storage holds `region_count` regions of `region_bit_size` bits each,
//! addressed by a derived address width. Nothing is allocated until the
//! first write: reads of never-written regions return the canonical zero
//! region and leave the index untouched, which keeps 2^64-region address
//! spaces practical.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::bits::Bits;
use crate::contract::{check_index, fail, Violation};
use crate::handler::HandlerSlot;
use crate::trace::Tracer;

/// Number of regions grouped into one lazily allocated block.
pub const REGIONS_PER_BLOCK: usize = 4096;

const REGION_INDEX_BITS: u32 = 12;
const BLOCK_INDEX_BITS: u32 = 32;

/// Address decomposition: low 12 bits select the region inside a block, the
/// next 32 bits select the block, and the remainder selects the area map.
struct RegionIndex {
    area: u128,
    block: u32,
    region: usize,
}

impl RegionIndex {
    #[allow(clippy::cast_possible_truncation)]
    fn split(address: u128) -> Self {
        Self {
            area: address >> (REGION_INDEX_BITS + BLOCK_INDEX_BITS),
            block: ((address >> REGION_INDEX_BITS) & u128::from(u32::MAX)) as u32,
            region: (address & ((1 << REGION_INDEX_BITS) - 1)) as usize,
        }
    }
}

struct Block {
    data: Bits,
    init: Bits,
}

impl Block {
    fn new(region_bit_size: usize) -> Self {
        Self {
            data: Bits::zeros(region_bit_size * REGIONS_PER_BLOCK),
            init: Bits::zeros(REGIONS_PER_BLOCK),
        }
    }

    fn read(&self, region: usize, region_bit_size: usize) -> Bits {
        self.data.field(region * region_bit_size, region_bit_size)
    }

    fn write(&mut self, region: usize, region_bit_size: usize, data: &Bits) {
        self.data.assign_field(region * region_bit_size, data);
        self.init.set_range(region, 1);
    }

    fn is_initialized(&self, region: usize) -> bool {
        self.init.all_set_in(region, 1)
    }

    fn reset(&mut self) {
        self.data.clear();
        self.init.clear();
    }
}

type AreaMap = HashMap<u128, BTreeMap<u32, Block>>;

/// Sparse storage of fixed-width regions with lazy block allocation.
///
/// Interior mutability lets shared [`std::rc::Rc`] handles serve both the
/// owning named storage and every location derived from it.
pub struct SparseStorage {
    id: String,
    read_only: bool,
    region_count: u128,
    region_bit_size: usize,
    address_bit_size: usize,
    areas: RefCell<AreaMap>,
    temp_areas: RefCell<Option<AreaMap>>,
    handler: HandlerSlot,
    tracer: Tracer,
}

impl SparseStorage {
    /// Creates an empty storage of `region_count` regions of
    /// `region_bit_size` bits each.
    ///
    /// # Panics
    ///
    /// Raises a violation when either parameter is zero.
    #[must_use]
    #[track_caller]
    pub fn new(region_count: u128, region_bit_size: usize) -> Self {
        if region_count == 0 {
            fail(Violation::BoundsViolation {
                index: 0,
                bound: 1,
            });
        }
        if region_bit_size == 0 {
            fail(Violation::SizeMismatch {
                context: "sparse storage region width",
                expected: 1,
                actual: 0,
            });
        }
        Self {
            id: String::new(),
            read_only: false,
            region_count,
            region_bit_size,
            address_bit_size: Self::calculate_address_size(region_count),
            areas: RefCell::new(HashMap::new()),
            temp_areas: RefCell::new(None),
            handler: HandlerSlot::new(),
            tracer: Tracer::new(),
        }
    }

    /// Sets the storage identifier used in traces and access reports.
    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Marks the storage read-only; writes are silently discarded.
    #[must_use]
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Attaches the shared access-handler registration slot.
    #[must_use]
    pub fn with_handler_slot(mut self, slot: HandlerSlot) -> Self {
        self.handler = slot;
        self
    }

    /// Attaches the shared tracer handle.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Number of address bits needed to name `region_count` regions.
    ///
    /// A one-region storage still uses one address bit.
    #[must_use]
    pub const fn calculate_address_size(region_count: u128) -> usize {
        let mut value = region_count - 1;
        let mut result = 0;
        while value != 0 {
            value >>= 1;
            result += 1;
        }
        if result == 0 {
            1
        } else {
            result
        }
    }

    /// Returns the storage identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` when writes are discarded.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns the number of regions.
    #[must_use]
    pub const fn region_count(&self) -> u128 {
        self.region_count
    }

    /// Returns the region width in bits.
    #[must_use]
    pub const fn region_bit_size(&self) -> usize {
        self.region_bit_size
    }

    /// Returns the derived address width in bits.
    #[must_use]
    pub const fn address_bit_size(&self) -> usize {
        self.address_bit_size
    }

    /// Returns the shared access-handler slot.
    #[must_use]
    pub const fn handler_slot(&self) -> &HandlerSlot {
        &self.handler
    }

    /// Returns the shared tracer handle.
    #[must_use]
    pub const fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Reads one region.
    ///
    /// A never-written region reads as the canonical zero value without
    /// allocating anything.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] when `address` is outside the
    /// region count.
    #[must_use]
    #[track_caller]
    pub fn read(&self, address: u128) -> Bits {
        check_index(address, self.region_count);
        let index = RegionIndex::split(address);
        self.with_active_map(|areas| {
            areas
                .get(&index.area)
                .and_then(|blocks| blocks.get(&index.block))
                .map_or_else(
                    || Bits::zeros(self.region_bit_size),
                    |block| block.read(index.region, self.region_bit_size),
                )
        })
    }

    /// Writes one region, allocating its block on first touch.
    ///
    /// Read-only storages discard the write entirely.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] for an out-of-range address and
    /// [`Violation::SizeMismatch`] when `data` is not region-sized.
    #[track_caller]
    pub fn write(&self, address: u128, data: &Bits) {
        check_index(address, self.region_count);
        if data.width() != self.region_bit_size {
            fail(Violation::SizeMismatch {
                context: "sparse storage write",
                expected: self.region_bit_size as u128,
                actual: data.width() as u128,
            });
        }
        if self.read_only {
            return;
        }
        let index = RegionIndex::split(address);
        self.with_active_map_mut(|areas| {
            let blocks = areas.entry(index.area).or_default();
            let block = blocks
                .entry(index.block)
                .or_insert_with(|| Block::new(self.region_bit_size));
            block.write(index.region, self.region_bit_size, data);
        });
    }

    /// Returns `true` when the region has been written since construction or
    /// the last reset.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::BoundsViolation`] for an out-of-range address.
    #[must_use]
    #[track_caller]
    pub fn is_initialized(&self, address: u128) -> bool {
        check_index(address, self.region_count);
        let index = RegionIndex::split(address);
        self.with_active_map(|areas| {
            areas
                .get(&index.area)
                .and_then(|blocks| blocks.get(&index.block))
                .is_some_and(|block| block.is_initialized(index.region))
        })
    }

    /// Zeroes every allocated block without deallocating it.
    ///
    /// Keeping the blocks amortizes repeated reset/run cycles; the regions
    /// read as uninitialized again afterwards.
    pub fn reset(&self) {
        self.with_active_map_mut(|areas| {
            for blocks in areas.values_mut() {
                for block in blocks.values_mut() {
                    block.reset();
                }
            }
        });
    }

    /// Switches the temp-copy overlay on or off.
    ///
    /// While active, all reads and writes go to a fresh overlay that starts
    /// empty (every region reads as zero until written); deactivation
    /// discards the overlay and restores the underlying contents untouched.
    /// Read-only storages ignore the request.
    pub fn set_use_temp_copy(&self, value: bool) {
        if self.read_only {
            return;
        }
        *self.temp_areas.borrow_mut() = if value { Some(HashMap::new()) } else { None };
    }

    fn with_active_map<R>(&self, operation: impl FnOnce(&AreaMap) -> R) -> R {
        let temp = self.temp_areas.borrow();
        if let Some(overlay) = temp.as_ref() {
            operation(overlay)
        } else {
            operation(&self.areas.borrow())
        }
    }

    fn with_active_map_mut<R>(&self, operation: impl FnOnce(&mut AreaMap) -> R) -> R {
        let mut temp = self.temp_areas.borrow_mut();
        if let Some(overlay) = temp.as_mut() {
            operation(overlay)
        } else {
            operation(&mut self.areas.borrow_mut())
        }
    }
}

impl core::fmt::Debug for SparseStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SparseStorage")
            .field("id", &self.id)
            .field("region_bit_size", &self.region_bit_size)
            .field("region_count", &self.region_count)
            .field("address_bit_size", &self.address_bit_size)
            .finish_non_exhaustive()
    }
}

/// Splits a region-spanning write into per-region stores.
///
/// `start_bit` addresses the first written bit inside the region at
/// `address`; partially covered regions are merged read-modify-write so
/// neighbouring bits survive.
pub(crate) fn write_spanning(storage: &SparseStorage, address: u128, start_bit: usize, data: &Bits) {
    let region_bits = storage.region_bit_size();
    let mut address = address;
    let mut offset = start_bit;
    let mut pos = 0;
    while pos < data.width() {
        let chunk = (data.width() - pos).min(region_bits - offset);
        let slice = data.field(pos, chunk);
        if chunk == region_bits {
            storage.write(address, &slice);
        } else {
            let mut region = storage.read(address);
            region.assign_field(offset, &slice);
            storage.write(address, &region);
        }
        pos += chunk;
        address += 1;
        offset = 0;
    }
}

const _: () = assert!(REGIONS_PER_BLOCK == 1 << REGION_INDEX_BITS);
