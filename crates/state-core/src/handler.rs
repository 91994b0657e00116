//! Optional interception of physical storage accesses.
//!
//! A handler observes every load and store that reaches sparse-storage-backed
//! location sources, receiving the full list of regions touched by one
//! location operation. The contract is observe-only: callbacks cannot veto or
//! substitute data. Handlers must not load or store locations from inside a
//! callback; the execution model is single-threaded and non-reentrant.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bits::Bits;

/// One region touched by a location load or store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionAccess {
    /// Identifier of the backing sparse storage.
    pub storage: String,
    /// Region address inside the storage.
    pub address: u128,
    /// Bits being read from or written to the region's accessed sub-range.
    pub data: Bits,
}

/// Interceptor for physical loads and stores.
pub trait AccessHandler {
    /// Observes the regions about to be read by one location load.
    fn on_load(&mut self, regions: &[RegionAccess]);

    /// Observes the regions about to be written by one location store.
    fn on_store(&mut self, regions: &[RegionAccess]);
}

/// Shared registration slot for the access handler.
///
/// Every storage created through the same registry holds a clone of one
/// slot, so a single installation covers all of them and the last
/// installation wins.
#[derive(Clone, Default)]
pub struct HandlerSlot {
    inner: Rc<RefCell<Option<Box<dyn AccessHandler>>>>,
}

impl HandlerSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a handler, replacing any previous registration.
    pub fn install(&self, handler: Box<dyn AccessHandler>) {
        *self.inner.borrow_mut() = Some(handler);
    }

    /// Removes the registration, restoring the direct-access fast path.
    pub fn clear(&self) {
        *self.inner.borrow_mut() = None;
    }

    /// Returns `true` when a handler is installed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.borrow().is_some()
    }

    /// Runs `operation` against the installed handler, if any.
    pub fn with(&self, operation: impl FnOnce(&mut dyn AccessHandler)) {
        if let Some(handler) = self.inner.borrow_mut().as_mut() {
            operation(handler.as_mut());
        }
    }
}

impl core::fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerSlot")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{AccessHandler, HandlerSlot, RegionAccess};
    use crate::bits::Bits;

    struct CountingHandler {
        loads: Rc<RefCell<usize>>,
    }

    impl AccessHandler for CountingHandler {
        fn on_load(&mut self, _regions: &[RegionAccess]) {
            *self.loads.borrow_mut() += 1;
        }

        fn on_store(&mut self, _regions: &[RegionAccess]) {}
    }

    #[test]
    fn empty_slot_is_inactive_and_skips_the_callback() {
        let slot = HandlerSlot::new();
        assert!(!slot.is_active());

        let mut called = false;
        slot.with(|_| called = true);
        assert!(!called);
    }

    #[test]
    fn clones_share_one_registration_and_last_install_wins() {
        let slot = HandlerSlot::new();
        let clone = slot.clone();

        let first = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(0));
        slot.install(Box::new(CountingHandler {
            loads: Rc::clone(&first),
        }));
        clone.install(Box::new(CountingHandler {
            loads: Rc::clone(&second),
        }));
        assert!(slot.is_active());

        slot.with(|handler| {
            handler.on_load(&[RegionAccess {
                storage: "M".to_string(),
                address: 0,
                data: Bits::zeros(8),
            }]);
        });
        assert_eq!(*first.borrow(), 0);
        assert_eq!(*second.borrow(), 1);

        clone.clear();
        assert!(!slot.is_active());
    }
}
