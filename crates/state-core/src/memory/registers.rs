//! Register file: individually tracked atoms with cached locations.

use std::cell::RefCell;

use crate::atom::Atom;
use crate::contract::host_index;
use crate::location::Location;
use crate::trace::Tracer;
use crate::types::ValueType;

/// Backing for register-kind storage: `length` tracked atoms, one cached
/// labeled location per item.
pub(crate) struct RegisterBacking {
    atoms: Vec<Atom>,
    cache: Vec<Location>,
    temp: RefCell<Option<TempRegisters>>,
}

struct TempRegisters {
    atoms: Vec<Atom>,
    cache: Vec<Location>,
}

fn build_cache(ty: ValueType, atoms: &[Atom]) -> Vec<Location> {
    atoms
        .iter()
        .map(|atom| Location::for_atom(ty, atom.clone()))
        .collect()
}

impl RegisterBacking {
    pub(crate) fn new(name: &str, ty: ValueType, length: u128, tracer: Tracer) -> Self {
        let count = host_index(length);
        let atoms: Vec<Atom> = (0..count)
            .map(|index| {
                let label = if count == 1 {
                    name.to_string()
                } else {
                    format!("{name}[{index}]")
                };
                Atom::register(ty.bit_size()).labeled(&label, tracer.clone())
            })
            .collect();
        let cache = build_cache(ty, &atoms);
        Self {
            atoms,
            cache,
            temp: RefCell::new(None),
        }
    }

    pub(crate) fn access(&self, index: u128) -> Location {
        let index = host_index(index);
        self.temp
            .borrow()
            .as_ref()
            .map_or_else(|| self.cache[index].clone(), |temp| temp.cache[index].clone())
    }

    /// Zeroes value and defined mask of every register in the active set.
    pub(crate) fn reset(&self) {
        let temp = self.temp.borrow();
        let active = temp.as_ref().map_or(&self.atoms, |temp| &temp.atoms);
        for atom in active {
            atom.clear();
        }
    }

    /// Activates or drops the temp-copy register set.
    ///
    /// The copy carries the architectural values but a freshly zeroed
    /// defined mask: a new copy starts undefined for tracking purposes.
    pub(crate) fn set_use_temp_copy(&self, value: bool) {
        *self.temp.borrow_mut() = if value {
            let atoms: Vec<Atom> = self.atoms.iter().map(Atom::snapshot_undefined).collect();
            let ty = self.cache[0].value_type();
            let cache = build_cache(ty, &atoms);
            Some(TempRegisters { atoms, cache })
        } else {
            None
        };
    }
}
