//! Dense physical memory over one sparse storage.

use std::rc::Rc;

use crate::handler::HandlerSlot;
use crate::location::Location;
use crate::storage::SparseStorage;
use crate::trace::Tracer;
use crate::types::ValueType;

/// Backing for memory-kind storage: one sparse storage whose region width
/// equals the item width.
pub(crate) struct PhysicalBacking {
    storage: Rc<SparseStorage>,
}

impl PhysicalBacking {
    pub(crate) fn new(
        name: &str,
        ty: ValueType,
        length: u128,
        handler: HandlerSlot,
        tracer: Tracer,
    ) -> Self {
        let storage = SparseStorage::new(length, ty.bit_size())
            .with_id(name)
            .with_handler_slot(handler)
            .with_tracer(tracer);
        Self {
            storage: Rc::new(storage),
        }
    }

    pub(crate) fn access(&self, ty: ValueType, index: u128) -> Location {
        Location::for_region(ty, Rc::clone(&self.storage), index)
    }

    pub(crate) fn reset(&self) {
        self.storage.reset();
    }

    pub(crate) fn set_use_temp_copy(&self, value: bool) {
        self.storage.set_use_temp_copy(value);
    }

    pub(crate) fn storage(&self) -> Rc<SparseStorage> {
        Rc::clone(&self.storage)
    }
}

#[cfg(test)]
mod tests {
    use crate::handler::HandlerSlot;
    use crate::memory::{Memory, MemoryKind};
    use crate::trace::Tracer;
    use crate::types::{Data, ValueType};

    fn physical(length: u128, width: usize) -> Memory {
        Memory::new_dense(
            MemoryKind::Memory,
            "MEM",
            ValueType::card(width),
            length,
            HandlerSlot::new(),
            Tracer::new(),
        )
    }

    #[test]
    fn items_round_trip_through_locations() {
        let memory = physical(1 << 64, 8);
        memory
            .access(0xFFFF_FFFF_FFFF_FFFE_u64)
            .store(&Data::of(ValueType::card(8), 0x7E));
        assert_eq!(
            memory.access(0xFFFF_FFFF_FFFF_FFFE_u64).load().to_u128(),
            0x7E
        );
    }

    #[test]
    fn unwritten_items_read_as_zero_and_uninitialized() {
        let memory = physical(1024, 32);
        let location = memory.access(512_u32);
        assert_eq!(location.load().to_u128(), 0);
        assert!(!location.is_initialized());
    }

    #[test]
    fn reset_clears_written_items() {
        let memory = physical(64, 16);
        memory
            .access(5_u32)
            .store(&Data::of(ValueType::card(16), 0xAAAA));
        memory.reset();
        assert_eq!(memory.access(5_u32).load().to_u128(), 0);
        assert!(!memory.access(5_u32).is_initialized());
    }

    #[test]
    fn temp_copies_shadow_and_restore_contents() {
        let memory = physical(64, 8);
        memory
            .access(1_u32)
            .store(&Data::of(ValueType::card(8), 0x11));

        memory.set_use_temp_copy(true);
        assert_eq!(memory.access(1_u32).load().to_u128(), 0);
        memory
            .access(1_u32)
            .store(&Data::of(ValueType::card(8), 0x99));
        assert_eq!(memory.access(1_u32).load().to_u128(), 0x99);

        memory.set_use_temp_copy(false);
        assert_eq!(memory.access(1_u32).load().to_u128(), 0x11);
    }
}
