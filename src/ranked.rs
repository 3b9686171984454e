//! a fixed capacity ordered container keeping the best ranked items.
//!
//! Used as the terminal collector of the distance sink chain : as distances
//! stream out of the comparator in no particular order, the collector keeps
//! only the N closest matches seen so far.

use std::collections::BTreeSet;

use crate::error::HomError;

/// which end of the order is the worst, hence evicted first on overflow
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RankDirection {
    /// smallest is best, worst is the maximum. This is the distance case.
    Ascending,
    /// largest is best, worst is the minimum
    Descending,
} // end of RankDirection

//==================================================================================

/// keeps at most `capacity` items, the best ranked under `direction`.
///
/// Insertion is O(log capacity). At full capacity a new item is inserted only
/// if strictly better than the current worst, which is then evicted. An item
/// equal to an already stored one is never inserted, so the first inserted
/// wins among equals at the eviction boundary.
/// Not meant for concurrent mutation, one instance lives inside one query.
pub struct BoundedRankedSet<T: Ord + Clone> {
    capacity: usize,
    direction: RankDirection,
    items: BTreeSet<T>,
} // end of BoundedRankedSet

impl<T: Ord + Clone> BoundedRankedSet<T> {
    /// a set of given capacity. Fails if capacity < 1.
    pub fn new(capacity: usize, direction: RankDirection) -> Result<Self, HomError> {
        if capacity < 1 {
            return Err(HomError::IllegalParameter(String::from(
                "ranked set capacity must be at least 1",
            )));
        }
        Ok(BoundedRankedSet {
            capacity,
            direction,
            items: BTreeSet::new(),
        })
    } // end of new

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // the worst item currently stored, by configured direction
    fn worst(&self) -> Option<&T> {
        match self.direction {
            RankDirection::Ascending => self.items.last(),
            RankDirection::Descending => self.items.first(),
        }
    } // end of worst

    // true if candidate ranks strictly better than incumbent
    fn better(&self, candidate: &T, incumbent: &T) -> bool {
        match self.direction {
            RankDirection::Ascending => candidate < incumbent,
            RankDirection::Descending => candidate > incumbent,
        }
    } // end of better

    /// insert an item, possibly evicting the current worst.
    /// A no-op when the set is full and the item does not strictly beat the
    /// worst stored one, or when an equal item is already stored.
    pub fn insert(&mut self, item: T) {
        if self.items.len() < self.capacity {
            self.items.insert(item);
            return;
        }
        // full, capacity >= 1 so a worst element exists
        let evict = self.worst().map(|worst| self.better(&item, worst)).unwrap_or(false);
        if evict {
            if self.items.insert(item) {
                match self.direction {
                    RankDirection::Ascending => self.items.pop_last(),
                    RankDirection::Descending => self.items.pop_first(),
                };
            }
        }
    } // end of insert

    /// an independent copy of the current content, best item first.
    /// Later insertions into self do not affect a returned snapshot.
    pub fn snapshot(&self) -> Vec<T> {
        match self.direction {
            RankDirection::Ascending => self.items.iter().cloned().collect(),
            RankDirection::Descending => self.items.iter().rev().cloned().collect(),
        }
    } // end of snapshot
} // end of impl BoundedRankedSet

//==================================================================================

// end of mod tests
