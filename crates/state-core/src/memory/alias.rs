//! Alias shapes: storages that reinterpret bits owned elsewhere.
//!
//! An alias is a partition, not a copy: every access resolves to locations
//! over the source's backing units, so writes through either side are
//! immediately visible through the other.

use std::rc::Rc;

use crate::contract::{check_index, fail, host_index, Violation};
use crate::location::Location;
use crate::memory::Memory;
use crate::types::ValueType;

/// Alias over an existing location: `length` items of the alias type laid
/// directly onto the location's bit range.
pub(crate) struct LocationAliasBacking {
    source: Location,
}

impl LocationAliasBacking {
    #[track_caller]
    pub(crate) fn new(ty: ValueType, length: u128, source: Location) -> Self {
        let total = length * ty.bit_size() as u128;
        if total != source.bit_size() as u128 {
            fail(Violation::SizeMismatch {
                context: "alias over a location",
                expected: source.bit_size() as u128,
                actual: total,
            });
        }
        Self { source }
    }

    pub(crate) fn access(&self, ty: ValueType, index: u128) -> Location {
        let width = ty.bit_size();
        let start = host_index(index) * width;
        self.source
            .bit_field(start, start + width - 1)
            .cast_to(ty.type_id())
    }
}

/// Alias over an index range of another memory, with a possibly different
/// item width.
///
/// The mapping treats the source range as one flat bit string in
/// little-endian packing: source item `base + k` holds bits
/// `[k*sw, (k+1)*sw)` of the string, and alias item `i` covers bits
/// `[i*w, (i+1)*w)`. Item widths may differ in either direction; an alias
/// item wider than a source item concatenates several source items.
pub(crate) struct RangeAliasBacking {
    source: Rc<Memory>,
    base: u128,
}

impl RangeAliasBacking {
    #[track_caller]
    pub(crate) fn new(ty: ValueType, length: u128, source: Rc<Memory>, min: u128, max: u128) -> Self {
        check_index(min, source.length());
        check_index(max, source.length());

        let total = length * ty.bit_size() as u128;
        let source_items = max.abs_diff(min) + 1;
        let source_total = source_items * source.value_type().bit_size() as u128;
        if total != source_total {
            fail(Violation::SizeMismatch {
                context: "alias over a memory range",
                expected: source_total,
                actual: total,
            });
        }

        Self {
            source,
            base: min.min(max),
        }
    }

    pub(crate) fn access(&self, ty: ValueType, index: u128) -> Location {
        let width = ty.bit_size() as u128;
        let source_width = self.source.value_type().bit_size() as u128;

        if width == source_width {
            return self.source.access(self.base + index).cast_to(ty.type_id());
        }

        let start = index * width;
        let end = start + width - 1;
        let first = start / source_width;
        let last = end / source_width;

        // Most significant part first: the highest source item holds the
        // top bits of the alias item.
        let mut parts = Vec::new();
        let mut item = last;
        loop {
            let item_lo = if item == first {
                host_index(start % source_width)
            } else {
                0
            };
            let item_hi = if item == last {
                host_index(end % source_width)
            } else {
                host_index(source_width - 1)
            };
            parts.push(
                self.source
                    .access(self.base + item)
                    .bit_field(item_lo, item_hi),
            );
            if item == first {
                break;
            }
            item -= 1;
        }

        Location::concat(&parts).cast_to(ty.type_id())
    }
}
