//! Reservation tracking over half-open address ranges.
//!
//! The tracker is independent of any storage: it only records which ranges
//! are taken, rejects overlapping reservations, and coalesces reservations
//! that touch exactly.

use std::collections::BTreeMap;
use std::ops::Bound;

use core::fmt;

/// A reserved half-open address range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Region {
    /// First reserved address.
    pub start: u128,
    /// First address past the reservation.
    pub end: u128,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// Interval tracker over two ordered maps, keyed by range start and end.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    by_start: BTreeMap<u128, Region>,
    by_end: BTreeMap<u128, Region>,
}

impl MemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to reserve `[start, end)`.
    ///
    /// On conflict the already-reserved overlapping region is returned and
    /// the tracker is left unchanged; the caller must treat this as a
    /// reservation failure. Otherwise the range is recorded, merging with a
    /// predecessor ending exactly at `start` and a successor starting
    /// exactly at `end`. Empty ranges reserve nothing.
    ///
    /// # Panics
    ///
    /// Panics when `end < start`.
    pub fn use_range(&mut self, start: u128, end: u128) -> Option<Region> {
        assert!(end >= start, "range end must not precede its start");
        if start == end {
            return None;
        }

        if let Some(overlap) = self.find_overlap(start, end) {
            return Some(overlap);
        }

        let mut merged = Region { start, end };
        if let Some(before) = self.by_end.get(&start).copied() {
            self.remove(before);
            merged.start = before.start;
        }
        if let Some(after) = self.by_start.get(&end).copied() {
            self.remove(after);
            merged.end = after.end;
        }
        self.insert(merged);
        None
    }

    /// Returns `true` when `address` lies inside a reserved range.
    #[must_use]
    pub fn is_used(&self, address: u128) -> bool {
        let below = self.by_start.range(..=address).next_back();
        let above = self
            .by_end
            .range((Bound::Excluded(address), Bound::Unbounded))
            .next();
        match (below, above) {
            (Some((_, before)), Some((_, after))) => before == after && address < before.end,
            _ => false,
        }
    }

    /// Returns the number of disjoint reserved regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.by_start.len()
    }

    /// Returns `true` when nothing is reserved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    /// Drops every reservation.
    pub fn reset(&mut self) {
        self.by_start.clear();
        self.by_end.clear();
    }

    fn find_overlap(&self, start: u128, end: u128) -> Option<Region> {
        // The candidate with the greatest start below `end` is the only
        // region that can intersect `[start, end)` in a disjoint set.
        let candidate = self.by_start.range(..end).next_back().map(|(_, r)| *r)?;
        (candidate.end > start).then_some(candidate)
    }

    fn insert(&mut self, region: Region) {
        self.by_start.insert(region.start, region);
        self.by_end.insert(region.end, region);
    }

    fn remove(&mut self, region: Region) {
        self.by_start.remove(&region.start);
        self.by_end.remove(&region.end);
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryTracker, Region};

    #[test]
    fn disjoint_reservations_succeed() {
        let mut tracker = MemoryTracker::new();
        assert_eq!(tracker.use_range(0, 8), None);
        assert_eq!(tracker.use_range(16, 24), None);
        assert_eq!(tracker.region_count(), 2);
    }

    #[test]
    fn overlapping_reservations_fail_without_mutation() {
        let mut tracker = MemoryTracker::new();
        assert_eq!(tracker.use_range(8, 16), None);

        let conflict = tracker.use_range(12, 20);
        assert_eq!(conflict, Some(Region { start: 8, end: 16 }));
        assert_eq!(tracker.region_count(), 1);
        assert!(!tracker.is_used(16), "the failed reservation left no trace");

        let contained = tracker.use_range(9, 10);
        assert_eq!(contained, Some(Region { start: 8, end: 16 }));
        let surrounding = tracker.use_range(0, 32);
        assert_eq!(surrounding, Some(Region { start: 8, end: 16 }));
    }

    #[test]
    fn touching_reservations_coalesce_into_one() {
        let mut tracker = MemoryTracker::new();
        assert_eq!(tracker.use_range(0, 8), None);
        assert_eq!(tracker.use_range(8, 16), None);
        assert_eq!(tracker.region_count(), 1);

        assert_eq!(tracker.use_range(24, 32), None);
        assert_eq!(tracker.use_range(16, 24), None);
        assert_eq!(tracker.region_count(), 1);
        assert!(tracker.is_used(0));
        assert!(tracker.is_used(31));
        assert!(!tracker.is_used(32));
    }

    #[test]
    fn is_used_respects_half_open_bounds() {
        let mut tracker = MemoryTracker::new();
        assert_eq!(tracker.use_range(10, 20), None);
        assert!(!tracker.is_used(9));
        assert!(tracker.is_used(10));
        assert!(tracker.is_used(19));
        assert!(!tracker.is_used(20));
    }

    #[test]
    fn empty_ranges_reserve_nothing() {
        let mut tracker = MemoryTracker::new();
        assert_eq!(tracker.use_range(5, 5), None);
        assert!(tracker.is_empty());
        assert!(!tracker.is_used(5));
    }

    #[test]
    fn reset_releases_everything() {
        let mut tracker = MemoryTracker::new();
        assert_eq!(tracker.use_range(0, 100), None);
        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(tracker.use_range(50, 60), None);
    }

    #[test]
    #[should_panic(expected = "range end must not precede its start")]
    fn reversed_ranges_are_rejected() {
        let mut tracker = MemoryTracker::new();
        let _ = tracker.use_range(10, 5);
    }

    #[test]
    fn region_renders_as_half_open_hex() {
        assert_eq!(
            Region {
                start: 0x10,
                end: 0x20
            }
            .to_string(),
            "[0x10, 0x20)"
        );
    }
}
