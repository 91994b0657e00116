//! End-to-end coverage of the storage model through the registry surface.
//!
//! These tests exercise the scenarios the execution and test-generation
//! layers rely on: register tracking, alias coherence, temp copies, access
//! interception, and tracing, plus property coverage of the location
//! composition laws.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::similar_names
)]

use std::cell::RefCell;
use std::rc::Rc;

use bitvec as _;
use num_bigint as _;
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use state_core::{
    AccessHandler, Data, Location, MemoryDevice, MemoryDeviceAdapter, MemoryKind, MemoryRegistry,
    RegionAccess, TraceEvent, TraceSink, ValueType,
};

#[derive(Default)]
struct RecordingHandler {
    loads: Rc<RefCell<Vec<Vec<RegionAccess>>>>,
    stores: Rc<RefCell<Vec<Vec<RegionAccess>>>>,
}

impl AccessHandler for RecordingHandler {
    fn on_load(&mut self, regions: &[RegionAccess]) {
        self.loads.borrow_mut().push(regions.to_vec());
    }

    fn on_store(&mut self, regions: &[RegionAccess]) {
        self.stores.borrow_mut().push(regions.to_vec());
    }
}

struct RecordingSink {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl TraceSink for RecordingSink {
    fn on_event(&mut self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[test]
fn register_file_scenario_tracks_initialization_and_fields() {
    let registry = MemoryRegistry::new();
    let file = registry.define(MemoryKind::Register, "R", ValueType::card(32), 32);

    file.access(5_u32)
        .store(&Data::of(ValueType::card(32), 0xDEAD_BEEF));

    assert_eq!(
        file.access(5_u32).bit_field(0, 15).load().to_u128(),
        0xBEEF
    );
    assert!(file.access(5_u32).is_initialized());
    assert!(!file.access(6_u32).is_initialized());

    file.reset();
    assert!(!file.access(5_u32).is_initialized());
    assert_eq!(file.access(5_u32).load().to_u128(), 0);
}

#[test]
fn byte_memory_word_alias_scenario_is_coherent_and_stable() {
    let registry = MemoryRegistry::new();
    let memory = registry.define(MemoryKind::Memory, "M", ValueType::card(8), 1024);
    let alias = registry.define_alias_range(
        MemoryKind::Memory,
        "A",
        ValueType::card(16),
        512,
        &memory,
        0,
        1023,
    );

    alias
        .access(0_u32)
        .store(&Data::of(ValueType::card(16), 0x1234));
    assert_eq!(memory.access(0_u32).load().to_u128(), 0x34);
    assert_eq!(memory.access(1_u32).load().to_u128(), 0x12);

    // The mapping must survive re-derivation of the alias location.
    assert_eq!(alias.access(0_u32).load().to_u128(), 0x1234);

    memory
        .access(2_u32)
        .store(&Data::of(ValueType::card(8), 0xEF));
    memory
        .access(3_u32)
        .store(&Data::of(ValueType::card(8), 0xBE));
    assert_eq!(alias.access(1_u32).load().to_u128(), 0xBEEF);

    let looked_up = registry.get("A");
    assert_eq!(looked_up.access(511_u32).load().to_u128(), 0);
}

#[test]
fn location_alias_and_registry_lookup_share_backing_state() {
    let registry = MemoryRegistry::new();
    let file = registry.define(MemoryKind::Register, "PAIR", ValueType::card(64), 1);
    registry.define_alias(
        MemoryKind::Register,
        "HALF",
        ValueType::card(32),
        2,
        file.access(0_u32),
    );

    registry
        .get("HALF")
        .access(1_u32)
        .store(&Data::of(ValueType::card(32), 0xABCD_EF01));
    assert_eq!(
        file.access(0_u32).bit_field(32, 63).load().to_u128(),
        0xABCD_EF01
    );
}

#[test]
fn concat_across_registers_loads_and_stores_bit_exactly() {
    let registry = MemoryRegistry::new();
    let file = registry.define(MemoryKind::Register, "GPR", ValueType::card(16), 4);

    let pair = Location::concat(&[file.access(0_u32), file.access(1_u32)]);
    pair.store(&Data::of(ValueType::card(32), 0xCAFE_F00D));

    assert_eq!(file.access(0_u32).load().to_u128(), 0xCAFE);
    assert_eq!(file.access(1_u32).load().to_u128(), 0xF00D);
    assert_eq!(pair.bit_field(12, 19).load().to_u128(), 0xEF);
}

#[test]
fn uninitialized_reads_are_reported_not_refused() {
    let registry = MemoryRegistry::new();
    let file = registry.define(MemoryKind::Register, "F", ValueType::card(8), 2);

    let location = file.access(0_u32);
    assert!(!location.is_initialized());
    assert_eq!(location.load().to_u128(), 0, "the load itself succeeds");

    location.bit_field(0, 3).store(&Data::of(ValueType::card(4), 0xF));
    assert!(!location.is_initialized(), "half-written stays undefined");
    assert!(location.bit_field(0, 3).is_initialized());
}

#[test]
fn temp_copies_batch_over_every_registered_storage() {
    let registry = MemoryRegistry::new();
    let file = registry.define(MemoryKind::Register, "R", ValueType::card(32), 2);
    let memory = registry.define(MemoryKind::Memory, "M", ValueType::card(8), 64);
    let vars = registry.define(MemoryKind::Variable, "V", ValueType::card(8), 4);

    file.access(0_u32)
        .store(&Data::of(ValueType::card(32), 0x1111_2222));
    memory
        .access(9_u32)
        .store(&Data::of(ValueType::card(8), 0x33));
    vars.access(0_u32).store(&Data::of(ValueType::card(8), 0x44));

    registry.set_use_temp_copies(true);

    // Registers keep values but start undefined; memory and variables read
    // fresh zeroes.
    assert_eq!(file.access(0_u32).load().to_u128(), 0x1111_2222);
    assert!(!file.access(0_u32).is_initialized());
    assert_eq!(memory.access(9_u32).load().to_u128(), 0);
    assert_eq!(vars.access(0_u32).load().to_u128(), 0);

    file.access(0_u32)
        .store(&Data::of(ValueType::card(32), 0xFFFF_FFFF));
    memory
        .access(9_u32)
        .store(&Data::of(ValueType::card(8), 0x99));

    registry.set_use_temp_copies(false);
    assert_eq!(file.access(0_u32).load().to_u128(), 0x1111_2222);
    assert!(file.access(0_u32).is_initialized());
    assert_eq!(memory.access(9_u32).load().to_u128(), 0x33);
    assert_eq!(vars.access(0_u32).load().to_u128(), 0x44);
}

#[test]
fn access_handler_observes_loads_and_stores_of_physical_memory() {
    let registry = MemoryRegistry::new();
    let memory = registry.define(MemoryKind::Memory, "M", ValueType::card(8), 256);
    let alias = registry.define_alias_range(
        MemoryKind::Memory,
        "W",
        ValueType::card(16),
        128,
        &memory,
        0,
        255,
    );

    let loads = Rc::new(RefCell::new(Vec::new()));
    let stores = Rc::new(RefCell::new(Vec::new()));
    registry.set_access_handler(Box::new(RecordingHandler {
        loads: Rc::clone(&loads),
        stores: Rc::clone(&stores),
    }));

    alias
        .access(2_u32)
        .store(&Data::of(ValueType::card(16), 0xAABB));
    let _ = alias.access(2_u32).load();

    let stores = stores.borrow();
    assert_eq!(stores.len(), 1, "one store notification per operation");
    assert_eq!(stores[0].len(), 2, "both touched regions are reported");
    assert_eq!(stores[0][0].storage, "M");
    assert_eq!(stores[0][0].address, 5);
    assert_eq!(stores[0][0].data.to_u128(), 0xAA);
    assert_eq!(stores[0][1].address, 4);
    assert_eq!(stores[0][1].data.to_u128(), 0xBB);

    let loads = loads.borrow();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].len(), 2);

    // Registers never reach the handler.
    let file = registry.define(MemoryKind::Register, "R", ValueType::card(8), 1);
    file.access(0_u32).store(&Data::of(ValueType::card(8), 1));
    assert_eq!(stores.len(), 1);
}

#[test]
fn clearing_the_handler_restores_direct_access() {
    let registry = MemoryRegistry::new();
    let memory = registry.define(MemoryKind::Memory, "M", ValueType::card(8), 16);

    let loads = Rc::new(RefCell::new(Vec::new()));
    registry.set_access_handler(Box::new(RecordingHandler {
        loads: Rc::clone(&loads),
        stores: Rc::default(),
    }));
    let _ = memory.access(0_u32).load();
    assert_eq!(loads.borrow().len(), 1);

    registry.clear_access_handler();
    let _ = memory.access(0_u32).load();
    assert_eq!(loads.borrow().len(), 1);
}

#[test]
fn tracing_reports_register_writes_and_memory_accesses() {
    let registry = MemoryRegistry::new();
    let file = registry.define(MemoryKind::Register, "GPR", ValueType::card(32), 8);
    let memory = registry.define(MemoryKind::Memory, "MEM", ValueType::card(8), 64);

    let events = Rc::new(RefCell::new(Vec::new()));
    registry.set_trace_sink(Box::new(RecordingSink {
        events: Rc::clone(&events),
    }));

    // Disabled tracing keeps the fast path silent.
    file.access(1_u32)
        .store(&Data::of(ValueType::card(32), 0x1));
    assert!(events.borrow().is_empty());

    registry.set_tracing(true);
    file.access(3_u32)
        .store(&Data::of(ValueType::card(32), 0xDEAD_BEEF));
    file.access(3_u32)
        .bit_field(0, 7)
        .store(&Data::of(ValueType::card(8), 0x42));
    memory
        .access(7_u32)
        .store(&Data::of(ValueType::card(8), 0x55));
    let _ = memory.access(7_u32).load();

    let events = events.borrow();
    assert_eq!(events.len(), 4);
    assert!(
        matches!(&events[0], TraceEvent::RegisterWrite { target, .. } if target == "GPR[3]")
    );
    assert!(
        matches!(&events[1], TraceEvent::RegisterWrite { target, .. } if target == "GPR[3]<7..0>")
    );
    assert!(matches!(
        &events[2],
        TraceEvent::MemoryAccess {
            storage,
            address: 7,
            is_write: true,
            ..
        } if storage == "MEM"
    ));
    assert!(matches!(
        &events[3],
        TraceEvent::MemoryAccess {
            address: 7,
            is_write: false,
            ..
        }
    ));
}

#[test]
fn device_adapter_matches_location_access() {
    let registry = MemoryRegistry::new();
    let memory = registry.define(MemoryKind::Memory, "M", ValueType::card(16), 256);

    let mut device = MemoryDeviceAdapter::new(registry.get("M"));
    assert_eq!(device.address_bit_size(), 8);
    assert_eq!(device.data_bit_size(), 16);

    let address = state_core::Bits::from_u128(33, 8);
    device.store(&address, &state_core::Bits::from_u128(0x7777, 16));
    assert_eq!(memory.access(33_u32).load().to_u128(), 0x7777);
    assert_eq!(device.load(&address).to_u128(), 0x7777);
}

#[test]
fn constants_compose_with_mutable_state() {
    let registry = MemoryRegistry::new();
    let file = registry.define(MemoryKind::Register, "R", ValueType::card(8), 1);
    file.access(0_u32).store(&Data::of(ValueType::card(8), 0xCD));

    let constant = Location::from_data(&Data::of(ValueType::card(8), 0xAB));
    let joined = Location::concat(&[constant, file.access(0_u32)]);
    assert_eq!(joined.load().to_u128(), 0xABCD);
}

proptest! {
    #[test]
    fn property_store_load_round_trips(value in any::<u64>(), width in 1_usize..=64) {
        let registry = MemoryRegistry::new();
        let file = registry.define(MemoryKind::Register, "P", ValueType::card(width), 1);

        let masked = if width == 64 { value } else { value & ((1 << width) - 1) };
        let location = file.access(0_u32);
        location.store(&Data::of(ValueType::card(width), u128::from(masked)));
        prop_assert_eq!(location.load().to_u128(), u128::from(masked));
    }

    #[test]
    fn property_split_concat_identity(value in any::<u64>(), split in 1_usize..64) {
        let registry = MemoryRegistry::new();
        let file = registry.define(MemoryKind::Register, "P", ValueType::card(64), 1);
        let location = file.access(0_u32);
        location.store(&Data::of(ValueType::card(64), u128::from(value)));

        let recomposed = Location::concat(&[
            location.bit_field(split, 63),
            location.bit_field(0, split - 1),
        ]);
        prop_assert_eq!(recomposed.load().to_u128(), u128::from(value));
        prop_assert_eq!(recomposed.bit_size(), 64);
    }

    #[test]
    fn property_alias_round_trips_word_values(index in 0_u32..512, value in any::<u16>()) {
        let registry = MemoryRegistry::new();
        let memory = registry.define(MemoryKind::Memory, "M", ValueType::card(8), 1024);
        let alias = registry.define_alias_range(
            MemoryKind::Memory,
            "A",
            ValueType::card(16),
            512,
            &memory,
            0,
            1023,
        );

        alias
            .access(index)
            .store(&Data::of(ValueType::card(16), u128::from(value)));
        prop_assert_eq!(alias.access(index).load().to_u128(), u128::from(value));
        prop_assert_eq!(
            memory.access(2 * index).load().to_u128(),
            u128::from(value & 0xFF)
        );
        prop_assert_eq!(
            memory.access(2 * index + 1).load().to_u128(),
            u128::from(value >> 8)
        );
    }
}
