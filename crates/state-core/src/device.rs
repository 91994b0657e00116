//! Device view: address/data bit-vector access without the location model.
//!
//! Some collaborators only speak "give me the data at this address"; the
//! [`MemoryDevice`] trait bridges them to storages and named memories
//! without exposing locations.

use std::rc::Rc;

use crate::bits::Bits;
use crate::memory::Memory;
use crate::storage::SparseStorage;
use crate::types::Data;

/// Address/data contract over any region-addressed store.
pub trait MemoryDevice {
    /// Returns the address width in bits.
    fn address_bit_size(&self) -> usize;

    /// Returns the data width in bits.
    fn data_bit_size(&self) -> usize;

    /// Loads the data unit at `address`.
    fn load(&mut self, address: &Bits) -> Bits;

    /// Stores a data unit at `address`.
    fn store(&mut self, address: &Bits, data: &Bits);
}

impl MemoryDevice for SparseStorage {
    fn address_bit_size(&self) -> usize {
        Self::address_bit_size(self)
    }

    fn data_bit_size(&self) -> usize {
        self.region_bit_size()
    }

    fn load(&mut self, address: &Bits) -> Bits {
        self.read(address.to_u128())
    }

    fn store(&mut self, address: &Bits, data: &Bits) {
        self.write(address.to_u128(), data);
    }
}

/// Adapter exposing a named storage as a [`MemoryDevice`].
///
/// Loads and stores go through [`Memory::access`], so handler and tracing
/// semantics match ordinary location accesses.
pub struct MemoryDeviceAdapter {
    memory: Rc<Memory>,
}

impl MemoryDeviceAdapter {
    /// Wraps a named storage.
    #[must_use]
    pub const fn new(memory: Rc<Memory>) -> Self {
        Self { memory }
    }
}

impl MemoryDevice for MemoryDeviceAdapter {
    fn address_bit_size(&self) -> usize {
        self.memory.address_bit_size()
    }

    fn data_bit_size(&self) -> usize {
        self.memory.value_type().bit_size()
    }

    fn load(&mut self, address: &Bits) -> Bits {
        self.memory
            .access(address.to_u128())
            .load()
            .bits()
            .clone()
    }

    fn store(&mut self, address: &Bits, data: &Bits) {
        let value = Data::new(self.memory.value_type(), data.clone());
        self.memory.access(address.to_u128()).store(&value);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::bits::Bits;
    use crate::handler::HandlerSlot;
    use crate::memory::{Memory, MemoryKind};
    use crate::storage::SparseStorage;
    use crate::trace::Tracer;
    use crate::types::ValueType;

    use super::{MemoryDevice, MemoryDeviceAdapter};

    #[test]
    fn sparse_storage_is_a_device() {
        let mut storage = SparseStorage::new(256, 16);
        assert_eq!(MemoryDevice::address_bit_size(&storage), 8);
        assert_eq!(storage.data_bit_size(), 16);

        let address = Bits::from_u128(0x42, 8);
        storage.store(&address, &Bits::from_u128(0xBEEF, 16));
        assert_eq!(storage.load(&address).to_u128(), 0xBEEF);
    }

    #[test]
    fn adapter_bridges_a_named_storage() {
        let memory = Rc::new(Memory::new_dense(
            MemoryKind::Memory,
            "MEM",
            ValueType::card(8),
            1024,
            HandlerSlot::new(),
            Tracer::new(),
        ));
        let mut device = MemoryDeviceAdapter::new(Rc::clone(&memory));
        assert_eq!(device.address_bit_size(), 10);
        assert_eq!(device.data_bit_size(), 8);

        let address = Bits::from_u128(100, 10);
        device.store(&address, &Bits::from_u128(0x5A, 8));
        assert_eq!(device.load(&address).to_u128(), 0x5A);
        assert_eq!(memory.access(100_u32).load().to_u128(), 0x5A);
    }
}
