//! Storage and addressing model for the simulation core.
//!
//! Every piece of state a simulated processor can read or write lives here:
//! register files, physical memory, scratch variables, and aliases over any
//! of them. All of it is reached through one handle type, [`Location`],
//! which composes bit ranges from one or more backing units and performs
//! bit-exact loads and stores regardless of how the bits are physically
//! stored.

/// Width-carrying bit-string value type.
pub mod bits;
pub use bits::Bits;

/// Value types and typed data words.
pub mod types;
pub use types::{Data, TypeId, ValueType};

/// Contract-violation taxonomy.
pub mod contract;
pub use contract::{fail, Violation};

/// Sparse, lazily allocated storage of fixed-width regions.
pub mod storage;
pub use storage::{SparseStorage, REGIONS_PER_BLOCK};

/// Address/data device contract and named-storage adapter.
pub mod device;
pub use device::{MemoryDevice, MemoryDeviceAdapter};

/// Atom backends behind register- and variable-backed locations.
pub mod atom;
pub use atom::Atom;

/// Location composition engine.
pub mod location;
pub use location::Location;

/// Optional interception of physical accesses.
pub mod handler;
pub use handler::{AccessHandler, HandlerSlot, RegionAccess};

/// Deterministic trace hooks.
pub mod trace;
pub use trace::{TraceEvent, TraceSink, Tracer};

/// Named storage variants and the access surface.
pub mod memory;
pub use memory::{AccessIndex, Memory, MemoryKind};

/// Name-to-storage registry for one simulation session.
pub mod registry;
pub use registry::MemoryRegistry;

/// Bump-pointer placement of data into storage.
pub mod allocator;
pub use allocator::{align_address, MemoryAllocator};

/// Reservation tracking over address ranges.
pub mod tracker;
pub use tracker::{MemoryTracker, Region};

/// Affine virtual/physical address translation.
pub mod translator;
pub use translator::AddressTranslator;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
