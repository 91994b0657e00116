//! Scratch variable array: always-initialized, unrestricted cells.

use std::cell::RefCell;

use crate::atom::Atom;
use crate::contract::host_index;
use crate::location::Location;
use crate::types::ValueType;

/// Backing for variable-kind storage: `length` plain cells without
/// initialization tracking or store restrictions.
pub(crate) struct VariableBacking {
    atoms: Vec<Atom>,
    temp: RefCell<Option<Vec<Atom>>>,
}

impl VariableBacking {
    pub(crate) fn new(ty: ValueType, length: u128) -> Self {
        let count = host_index(length);
        Self {
            atoms: (0..count).map(|_| Atom::variable(ty.bit_size())).collect(),
            temp: RefCell::new(None),
        }
    }

    pub(crate) fn access(&self, ty: ValueType, index: u128) -> Location {
        let index = host_index(index);
        let temp = self.temp.borrow();
        let active = temp.as_ref().map_or(&self.atoms, |atoms| atoms);
        Location::for_atom(ty, active[index].clone())
    }

    pub(crate) fn reset(&self) {
        let temp = self.temp.borrow();
        let active = temp.as_ref().map_or(&self.atoms, |atoms| atoms);
        for atom in active {
            atom.clear();
        }
    }

    /// Scratch state carries nothing across a snapshot: the temp set starts
    /// zeroed.
    pub(crate) fn set_use_temp_copy(&self, value: bool) {
        *self.temp.borrow_mut() = if value {
            let width = self.atoms[0].bit_size();
            Some((0..self.atoms.len()).map(|_| Atom::variable(width)).collect())
        } else {
            None
        };
    }
}
