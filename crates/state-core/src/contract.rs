//! Contract-violation taxonomy raised by the storage model.

use thiserror::Error;

/// Programming-contract violations detected eagerly at the offending call.
///
/// Every variant reports a defect in the calling code, not a recoverable
/// runtime condition, and is raised as a panic through [`fail`]. Reads of
/// never-written sparse regions and reservation conflicts reported by
/// [`crate::MemoryTracker::use_range`] are ordinary results, not violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Violation {
    /// A named storage was defined twice in the same registry.
    #[error("{name} is already defined")]
    DuplicateDefinition {
        /// Name under which a storage is already registered.
        name: String,
    },
    /// A name was looked up that was never registered.
    #[error("{name} is not defined")]
    UndefinedStorage {
        /// Name that failed to resolve.
        name: String,
    },
    /// An index or bit position fell outside the valid range of its target.
    #[error("index {index} is out of bounds [0, {bound})")]
    BoundsViolation {
        /// Offending index or bit position.
        index: u128,
        /// Exclusive upper bound of the valid range.
        bound: u128,
    },
    /// Two widths that are required to match did not.
    #[error("{context}: expected {expected} bits, got {actual} bits")]
    SizeMismatch {
        /// Operation that required the widths to match.
        context: &'static str,
        /// Width required by the target.
        expected: u128,
        /// Width actually supplied.
        actual: u128,
    },
    /// An operation the target does not support.
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation {
        /// Description of the rejected operation.
        operation: &'static str,
    },
    /// An allocation collided with an already-reserved address range.
    #[error(
        "allocation at [{start:#x}, {end:#x}) overlaps used range [{used_start:#x}, {used_end:#x})"
    )]
    AllocationOverlap {
        /// First addressable unit of the rejected allocation.
        start: u128,
        /// Exclusive end of the rejected allocation.
        end: u128,
        /// First addressable unit of the conflicting reservation.
        used_start: u128,
        /// Exclusive end of the conflicting reservation.
        used_end: u128,
    },
}

/// Raises a contract violation as an unrecoverable panic.
#[track_caller]
pub fn fail(violation: Violation) -> ! {
    panic!("{violation}")
}

/// Checks that `index` lies in `[0, bound)`.
#[track_caller]
pub(crate) fn check_index(index: u128, bound: u128) {
    if index >= bound {
        fail(Violation::BoundsViolation { index, bound });
    }
}

/// Converts an address-sized value into a host index.
#[track_caller]
pub(crate) fn host_index(value: u128) -> usize {
    usize::try_from(value).unwrap_or_else(|_| {
        fail(Violation::BoundsViolation {
            index: value,
            bound: u128::try_from(usize::MAX).map_or(u128::MAX, |bound| bound + 1),
        })
    })
}
