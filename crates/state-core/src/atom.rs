//! Atom backends: the smallest independently loadable/storable cells.
//!
//! An [`Atom`] is a window onto a shared backing cell. Narrowing the window
//! with [`Atom::resize`] never copies the cell, so stores through a narrowed
//! view stay visible through every other view of the same cell. Three cell
//! flavours share one contract: immediates (read-only, always initialized),
//! variables (writable, always initialized) and registers (writable, with a
//! per-bit defined mask updated on every store).

use std::cell::RefCell;
use std::rc::Rc;

use crate::bits::Bits;
use crate::contract::{fail, Violation};
use crate::trace::{TraceEvent, Tracer};

struct AtomCell {
    value: RefCell<Bits>,
    defined: Option<RefCell<Bits>>,
    writable: bool,
}

#[derive(Clone)]
struct Label {
    name: Rc<str>,
    original_bit_size: usize,
    original_start_bit: usize,
    tracer: Tracer,
}

impl Label {
    fn render(&self, atom: &Atom) -> String {
        if atom.bit_size == self.original_bit_size && atom.start_bit == self.original_start_bit {
            self.name.to_string()
        } else {
            let start = atom.start_bit - self.original_start_bit;
            let end = start + atom.bit_size - 1;
            format!("{}<{end}..{start}>", self.name)
        }
    }
}

/// View over a shared backing cell.
#[derive(Clone)]
pub struct Atom {
    cell: Rc<AtomCell>,
    bit_size: usize,
    start_bit: usize,
    label: Option<Label>,
}

impl Atom {
    /// Creates a read-only cell holding `bits`.
    #[must_use]
    pub fn immediate(bits: Bits) -> Self {
        let bit_size = bits.width();
        Self {
            cell: Rc::new(AtomCell {
                value: RefCell::new(bits),
                defined: None,
                writable: false,
            }),
            bit_size,
            start_bit: 0,
            label: None,
        }
    }

    /// Creates a writable, always-initialized cell of `width` zero bits.
    #[must_use]
    pub fn variable(width: usize) -> Self {
        Self::variable_from(Bits::zeros(width))
    }

    /// Creates a writable, always-initialized cell holding `bits`.
    #[must_use]
    pub fn variable_from(bits: Bits) -> Self {
        let bit_size = bits.width();
        Self {
            cell: Rc::new(AtomCell {
                value: RefCell::new(bits),
                defined: None,
                writable: true,
            }),
            bit_size,
            start_bit: 0,
            label: None,
        }
    }

    /// Creates a tracked register cell of `width` bits, fully undefined.
    #[must_use]
    pub fn register(width: usize) -> Self {
        Self {
            cell: Rc::new(AtomCell {
                value: RefCell::new(Bits::zeros(width)),
                defined: Some(RefCell::new(Bits::zeros(width))),
                writable: true,
            }),
            bit_size: width,
            start_bit: 0,
            label: None,
        }
    }

    /// Attaches a trace label; stores through the view (and any view derived
    /// from it) report to `tracer` under `name`.
    #[must_use]
    pub fn labeled(mut self, name: &str, tracer: Tracer) -> Self {
        self.label = Some(Label {
            name: Rc::from(name),
            original_bit_size: self.bit_size,
            original_start_bit: self.start_bit,
            tracer,
        });
        self
    }

    /// Returns the view width in bits.
    #[must_use]
    pub const fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// Returns the first cell bit covered by this view.
    #[must_use]
    pub const fn start_bit(&self) -> usize {
        self.start_bit
    }

    /// Reads the bits covered by this view.
    #[must_use]
    pub fn load(&self) -> Bits {
        self.cell.value.borrow().field(self.start_bit, self.bit_size)
    }

    /// Writes the bits covered by this view.
    ///
    /// Register cells flag the stored sub-range as defined. A labeled view
    /// additionally reports the write to its tracer while tracing is enabled.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::UnsupportedOperation`] on an immediate cell and
    /// [`Violation::SizeMismatch`] when `data` does not match the view width.
    #[track_caller]
    pub fn store(&self, data: &Bits) {
        if data.width() != self.bit_size {
            fail(Violation::SizeMismatch {
                context: "atom store",
                expected: self.bit_size as u128,
                actual: data.width() as u128,
            });
        }
        if !self.cell.writable {
            fail(Violation::UnsupportedOperation {
                operation: "store into an immediate atom",
            });
        }

        self.cell.value.borrow_mut().assign_field(self.start_bit, data);
        if let Some(defined) = &self.cell.defined {
            defined.borrow_mut().set_range(self.start_bit, self.bit_size);
        }

        if let Some(label) = &self.label {
            if label.tracer.is_enabled() {
                label.tracer.emit(TraceEvent::RegisterWrite {
                    target: label.render(self),
                    value: data.clone(),
                });
            }
        }
    }

    /// Returns `true` when every bit covered by this view has been stored at
    /// least once. Untracked cells are always initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.defined.as_ref().is_none_or(|defined| {
            defined.borrow().all_set_in(self.start_bit, self.bit_size)
        })
    }

    /// Returns a narrowed view of the same cell.
    ///
    /// `new_start_bit` is absolute within the cell. The new view must lie
    /// inside the current one; widening a view is not supported.
    ///
    /// # Panics
    ///
    /// Raises [`Violation::UnsupportedOperation`] when the requested view is
    /// not contained in the current one.
    #[must_use]
    #[track_caller]
    pub fn resize(&self, new_bit_size: usize, new_start_bit: usize) -> Self {
        let inside = new_start_bit >= self.start_bit
            && new_start_bit + new_bit_size <= self.start_bit + self.bit_size;
        if !inside {
            fail(Violation::UnsupportedOperation {
                operation: "resize an atom view beyond its current range",
            });
        }
        Self {
            cell: Rc::clone(&self.cell),
            bit_size: new_bit_size,
            start_bit: new_start_bit,
            label: self.label.clone(),
        }
    }

    /// Zeroes the whole backing cell, including the defined mask.
    pub fn clear(&self) {
        self.cell.value.borrow_mut().clear();
        if let Some(defined) = &self.cell.defined {
            defined.borrow_mut().clear();
        }
    }

    /// Returns a full-width atom over a fresh cell that carries the same
    /// value but a freshly zeroed defined mask.
    ///
    /// This is the snapshot policy for temp copies: the copied state is
    /// architecturally present but reads as undefined for tracking purposes.
    #[must_use]
    pub fn snapshot_undefined(&self) -> Self {
        let value = self.cell.value.borrow().clone();
        let width = value.width();
        Self {
            cell: Rc::new(AtomCell {
                value: RefCell::new(value),
                defined: self
                    .cell
                    .defined
                    .as_ref()
                    .map(|_| RefCell::new(Bits::zeros(width))),
                writable: self.cell.writable,
            }),
            bit_size: width,
            start_bit: 0,
            label: self.label.clone(),
        }
    }
}

impl core::fmt::Debug for Atom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Atom")
            .field("bit_size", &self.bit_size)
            .field("start_bit", &self.start_bit)
            .field("writable", &self.cell.writable)
            .field("tracked", &self.cell.defined.is_some())
            .finish()
    }
}
