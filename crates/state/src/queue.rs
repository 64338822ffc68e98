//! Min-priority queue used for pending messages and checkpoints.

use std::{cmp::Ordering, collections::BinaryHeap};

/// Ordering key of a queued item; the smallest key is dequeued first.
///
/// The second component is an insertion sequence number so equal primary keys
/// dequeue in insertion order.
pub trait Prioritized {
    fn priority(&self) -> (u64, u64);
}

/// Heap entry reversing the key order so [`BinaryHeap`] behaves as a min-heap.
#[derive(Debug, Clone)]
struct MinEntry<T>(T);

impl<T: Prioritized> PartialEq for MinEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority() == other.0.priority()
    }
}

impl<T: Prioritized> Eq for MinEntry<T> {}

impl<T: Prioritized> PartialOrd for MinEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Prioritized> Ord for MinEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.priority().cmp(&self.0.priority())
    }
}

#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<MinEntry<T>>,
}

impl<T: Prioritized> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Prioritized> PriorityQueue<T> {
    pub const fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, item: T) {
        self.heap.push(MinEntry(item));
    }

    /// Smallest item without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.heap.peek().map(|entry| &entry.0)
    }

    /// Remove and return the smallest item.
    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.0)
    }

    /// Remove the smallest item accepted by `take`, looking only at the
    /// prefix of items (in dequeue order) for which `within` holds.
    ///
    /// Skipped items go back with their original keys.
    pub fn pop_first(
        &mut self,
        within: impl Fn(&T) -> bool,
        take: impl Fn(&T) -> bool,
    ) -> Option<T> {
        let mut skipped = Vec::new();
        let mut found = None;
        while self.heap.peek().is_some_and(|entry| within(&entry.0)) {
            let Some(entry) = self.heap.pop() else {
                break;
            };
            if take(&entry.0) {
                found = Some(entry.0);
                break;
            }
            skipped.push(entry);
        }
        self.heap.extend(skipped);
        found
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Items in dequeue order.
    pub fn to_sorted_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        // `into_sorted_vec` is ascending by `Ord`, which is reversed here
        let mut items: Vec<T> = self
            .heap
            .clone()
            .into_sorted_vec()
            .into_iter()
            .map(|entry| entry.0)
            .collect();
        items.reverse();
        items
    }
}

impl<T: Prioritized> FromIterator<T> for PriorityQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            heap: iter.into_iter().map(MinEntry).collect(),
        }
    }
}
