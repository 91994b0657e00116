//! Explicit registry holding every named storage of one simulated model.
//!
//! The registry replaces process-wide static state: construction and lookup
//! are methods on a registry value that collaborating components receive by
//! reference. The "define once, look up by name" contract is unchanged, and
//! the access-handler registration and the tracer are registry-wide so one
//! installation covers every storage defined through it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::contract::{fail, Violation};
use crate::handler::{AccessHandler, HandlerSlot};
use crate::location::Location;
use crate::memory::{Memory, MemoryKind};
use crate::trace::{TraceSink, Tracer};
use crate::types::ValueType;

/// Name-to-storage registry for one simulation session.
#[derive(Default)]
pub struct MemoryRegistry {
    storages: RefCell<BTreeMap<String, Rc<Memory>>>,
    handler: HandlerSlot,
    tracer: Tracer,
}

impl MemoryRegistry {
    /// Creates an empty registry with no handler and tracing disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a dense storage of `length` items of type `ty`.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::DuplicateDefinition`] when `name` is taken.
    #[track_caller]
    pub fn define(
        &self,
        kind: MemoryKind,
        name: &str,
        ty: ValueType,
        length: u128,
    ) -> Rc<Memory> {
        self.check_undefined(name);
        let memory = Rc::new(Memory::new_dense(
            kind,
            name,
            ty,
            length,
            self.handler.clone(),
            self.tracer.clone(),
        ));
        self.register(name, &memory);
        memory
    }

    /// Defines an alias of `length` items of type `ty` over an existing
    /// location.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::DuplicateDefinition`] when `name` is taken and
    /// [`Violation::SizeMismatch`] when the alias does not cover the source
    /// location exactly.
    #[track_caller]
    pub fn define_alias(
        &self,
        kind: MemoryKind,
        name: &str,
        ty: ValueType,
        length: u128,
        source: Location,
    ) -> Rc<Memory> {
        self.check_undefined(name);
        let memory = Rc::new(Memory::new_alias(kind, name, ty, length, source));
        self.register(name, &memory);
        memory
    }

    /// Defines an alias of `length` items of type `ty` over the index range
    /// `[min, max]` of another registered memory.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::DuplicateDefinition`] when `name` is taken,
    /// [`Violation::BoundsViolation`] when the range leaves the source, and
    /// [`Violation::SizeMismatch`] when the total bit sizes differ.
    #[track_caller]
    pub fn define_alias_range(
        &self,
        kind: MemoryKind,
        name: &str,
        ty: ValueType,
        length: u128,
        source: &Rc<Memory>,
        min: u128,
        max: u128,
    ) -> Rc<Memory> {
        self.check_undefined(name);
        let memory = Rc::new(Memory::new_alias_range(
            kind,
            name,
            ty,
            length,
            Rc::clone(source),
            min,
            max,
        ));
        self.register(name, &memory);
        memory
    }

    /// Looks up a registered storage by name.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::UndefinedStorage`] when `name` was never defined.
    #[must_use]
    #[track_caller]
    pub fn get(&self, name: &str) -> Rc<Memory> {
        self.storages.borrow().get(name).map_or_else(
            || {
                fail(Violation::UndefinedStorage {
                    name: name.to_string(),
                })
            },
            Rc::clone,
        )
    }

    /// Returns `true` when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.storages.borrow().contains_key(name)
    }

    /// Switches temp-copy mode on every registered storage.
    ///
    /// Expected to run only between simulation steps, never concurrently
    /// with a load or store.
    pub fn set_use_temp_copies(&self, value: bool) {
        for memory in self.storages.borrow().values() {
            memory.set_use_temp_copy(value);
        }
    }

    /// Resets every registered non-alias storage.
    pub fn reset_all(&self) {
        for memory in self.storages.borrow().values() {
            if !memory.is_alias() {
                memory.reset();
            }
        }
    }

    /// Installs the access handler observing physical loads and stores.
    ///
    /// Registration is registry-wide and singular; the last installation
    /// wins.
    pub fn set_access_handler(&self, handler: Box<dyn AccessHandler>) {
        self.handler.install(handler);
    }

    /// Removes the access handler, restoring direct access.
    pub fn clear_access_handler(&self) {
        self.handler.clear();
    }

    /// Installs the sink receiving trace events.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) {
        self.tracer.set_sink(sink);
    }

    /// Enables or disables trace emission.
    pub fn set_tracing(&self, value: bool) {
        self.tracer.set_enabled(value);
    }

    /// Returns the registry-wide tracer handle.
    #[must_use]
    pub const fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    #[track_caller]
    fn check_undefined(&self, name: &str) {
        if self.contains(name) {
            fail(Violation::DuplicateDefinition {
                name: name.to_string(),
            });
        }
    }

    fn register(&self, name: &str, memory: &Rc<Memory>) {
        self.storages
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(memory));
    }
}

impl core::fmt::Debug for MemoryRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryRegistry")
            .field("storages", &self.storages.borrow().len())
            .finish_non_exhaustive()
    }
}
