//! Fixed-capacity container keeping the best `K` items seen so far.
//!
//! Items are ordered by an explicit comparator, so no `Ord` impl is needed on
//! the item type. The worst retained item sits at the top of the heap and is
//! the one evicted when a strictly better item arrives.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry ordered in reverse of `cmp`, turning `BinaryHeap` into a min-heap.
struct Ranked<T, C> {
    item: T,
    cmp: C,
}

impl<T, C: Fn(&T, &T) -> Ordering> Ord for Ranked<T, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.cmp)(&other.item, &self.item)
    }
}

impl<T, C: Fn(&T, &T) -> Ordering> PartialOrd for Ranked<T, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, C: Fn(&T, &T) -> Ordering> PartialEq for Ranked<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, C: Fn(&T, &T) -> Ordering> Eq for Ranked<T, C> {}

pub struct BoundedTopK<T, C>
where
    C: Fn(&T, &T) -> Ordering + Copy,
{
    capacity: usize,
    heap: BinaryHeap<Ranked<T, C>>,
    cmp: C,
}

impl<T, C> BoundedTopK<T, C>
where
    C: Fn(&T, &T) -> Ordering + Copy,
{
    pub fn new(capacity: usize, cmp: C) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
            cmp,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offers an item. Returns `true` when it was retained.
    ///
    /// Below capacity the item is always kept. At capacity it replaces the
    /// current minimum only if it compares strictly greater; ties keep the
    /// incumbent.
    pub fn push(&mut self, item: T) -> bool {
        if self.heap.len() < self.capacity {
            self.heap.push(Ranked { item, cmp: self.cmp });
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut min) if (self.cmp)(&item, &min.item) == Ordering::Greater => {
                min.item = item;
                true
            }
            _ => false,
        }
    }

    /// Empties the container, yielding items in ascending order.
    pub fn drain_ascending(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(ranked) = self.heap.pop() {
            out.push(ranked.item);
        }
        out
    }
}
