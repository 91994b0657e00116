//! Deterministic trace hooks for register writes and physical accesses.
//!
//! There is no logging framework here on purpose: collaborating components
//! install a [`TraceSink`] and receive [`TraceEvent`]s in execution order.
//! While tracing is disabled no event is built at all.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::bits::Bits;

/// Trace events emitted by the storage model when tracing is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A store went through a named register or register field.
    RegisterWrite {
        /// Register name, with a `<end..start>` suffix for narrowed views.
        target: String,
        /// Bits written through the view.
        value: Bits,
    },
    /// A physical storage region was read or written.
    MemoryAccess {
        /// Identifier of the backing sparse storage.
        storage: String,
        /// Region address inside the storage.
        address: u128,
        /// Bits read or written.
        value: Bits,
        /// `true` for writes, `false` for reads.
        is_write: bool,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

#[derive(Default)]
struct TracerInner {
    enabled: Cell<bool>,
    sink: RefCell<Option<Box<dyn TraceSink>>>,
}

/// Shared handle to the trace configuration of one registry.
///
/// Cloning the handle shares the underlying flag and sink, so every storage
/// created through the same registry traces to the same place.
#[derive(Clone, Default)]
pub struct Tracer {
    inner: Rc<TracerInner>,
}

impl Tracer {
    /// Creates a disabled tracer with no sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when events should be built and emitted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get() && self.inner.sink.borrow().is_some()
    }

    /// Enables or disables event emission.
    pub fn set_enabled(&self, value: bool) {
        self.inner.enabled.set(value);
    }

    /// Installs the sink receiving trace events.
    pub fn set_sink(&self, sink: Box<dyn TraceSink>) {
        *self.inner.sink.borrow_mut() = Some(sink);
    }

    /// Removes the installed sink, silencing emission.
    pub fn clear_sink(&self) {
        *self.inner.sink.borrow_mut() = None;
    }

    /// Delivers an event to the sink if tracing is enabled.
    pub fn emit(&self, event: TraceEvent) {
        if self.inner.enabled.get() {
            if let Some(sink) = self.inner.sink.borrow_mut().as_mut() {
                sink.on_event(event);
            }
        }
    }
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.inner.enabled.get())
            .field("has_sink", &self.inner.sink.borrow().is_some())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::test_support::CollectingSink;
    use super::{TraceEvent, Tracer};
    use crate::bits::Bits;

    #[test]
    fn disabled_tracer_swallows_events() {
        let tracer = Tracer::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        tracer.set_sink(Box::new(CollectingSink {
            events: Rc::clone(&events),
        }));

        tracer.emit(TraceEvent::RegisterWrite {
            target: "R0".to_string(),
            value: Bits::zeros(8),
        });
        assert!(events.borrow().is_empty());
        assert!(!tracer.is_enabled());
    }

    #[test]
    fn enabled_tracer_delivers_in_order() {
        let tracer = Tracer::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        tracer.set_sink(Box::new(CollectingSink {
            events: Rc::clone(&events),
        }));
        tracer.set_enabled(true);
        assert!(tracer.is_enabled());

        tracer.emit(TraceEvent::RegisterWrite {
            target: "R0".to_string(),
            value: Bits::from_u128(1, 8),
        });
        tracer.emit(TraceEvent::MemoryAccess {
            storage: "MEM".to_string(),
            address: 4,
            value: Bits::from_u128(2, 8),
            is_write: true,
        });

        let seen = events.borrow();
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[0], TraceEvent::RegisterWrite { target, .. } if target == "R0"));
        assert!(matches!(&seen[1], TraceEvent::MemoryAccess { address: 4, .. }));
    }

    #[test]
    fn clones_share_flag_and_sink() {
        let tracer = Tracer::new();
        let clone = tracer.clone();
        let events = Rc::new(RefCell::new(Vec::new()));
        tracer.set_sink(Box::new(CollectingSink {
            events: Rc::clone(&events),
        }));
        clone.set_enabled(true);

        tracer.emit(TraceEvent::RegisterWrite {
            target: "A".to_string(),
            value: Bits::zeros(1),
        });
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn without_a_sink_the_tracer_reports_disabled() {
        let tracer = Tracer::new();
        tracer.set_enabled(true);
        assert!(!tracer.is_enabled());
    }
}
