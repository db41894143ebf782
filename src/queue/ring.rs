//! Index-keyed FIFO ring used as the holding area for waiting items.
//!
//! Items are stored in a map keyed by a monotonically increasing sequence
//! number. `upper_limit` is the last key handed out and `lower_limit` the last
//! key consumed, so the live keys always lie in `lower_limit + 1..=upper_limit`
//! and the oldest item is found in O(1) without shifting storage.

use crate::error::{AnvilError, AnvilResult};
use std::collections::HashMap;

/// FIFO buffer keyed by monotonically increasing sequence numbers.
#[derive(Debug)]
pub struct IndexKeyedRing<T> {
    items: HashMap<u64, T>,
    upper_limit: u64,
    lower_limit: u64,
}

impl<T> IndexKeyedRing<T> {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            upper_limit: 0,
            lower_limit: 0,
        }
    }

    /// Store `item` at the back of the ring and return its key.
    pub fn enqueue(&mut self, item: T) -> u64 {
        self.upper_limit += 1;
        self.items.insert(self.upper_limit, item);
        self.upper_limit
    }

    /// Like [`enqueue`](Self::enqueue), for callers holding an optional value.
    ///
    /// Fails with [`AnvilError::InvalidArgument`] when `item` is `None`.
    pub fn try_enqueue(&mut self, item: Option<T>) -> AnvilResult<u64> {
        match item {
            Some(item) => Ok(self.enqueue(item)),
            None => Err(AnvilError::invalid_argument(
                "cannot enqueue a missing item",
            )),
        }
    }

    /// Remove and return the oldest item, or `None` when the ring is empty.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let key = self.lower_limit + 1;
        let item = self.items.remove(&key);
        self.lower_limit = key;
        item
    }

    /// Return the oldest item without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.items.get(&(self.lower_limit + 1))
    }

    /// Drop every stored item and reset both limits to zero.
    pub fn reset(&mut self) {
        self.items.clear();
        self.upper_limit = 0;
        self.lower_limit = 0;
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Key the next enqueued item will receive.
    pub fn next_key(&self) -> u64 {
        self.upper_limit + 1
    }

    /// Iterate over the stored items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (self.lower_limit + 1..=self.upper_limit).filter_map(|key| self.items.get(&key))
    }

    /// Remove every stored item in insertion order, keeping the limits.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.len());
        while let Some(item) = self.dequeue() {
            drained.push(item);
        }
        drained
    }
}

impl<T> Default for IndexKeyedRing<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a IndexKeyedRing<T> {
    type Item = &'a T;
    type IntoIter = Box<dyn Iterator<Item = &'a T> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut ring = IndexKeyedRing::new();
        for word in ["a", "b", "c", "d"] {
            ring.enqueue(word);
        }

        let drained: Vec<_> = std::iter::from_fn(|| ring.dequeue()).collect();
        assert_eq!(drained, vec!["a", "b", "c", "d"]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_empty_ring_returns_none() {
        let mut ring: IndexKeyedRing<u32> = IndexKeyedRing::new();
        assert!(ring.peek().is_none());
        assert!(ring.dequeue().is_none());
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut ring = IndexKeyedRing::new();
        ring.enqueue(10);
        ring.enqueue(20);

        assert_eq!(ring.peek(), Some(&10));
        assert_eq!(ring.peek(), Some(&10));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.dequeue(), Some(10));
        assert_eq!(ring.peek(), Some(&20));
    }

    #[test]
    fn test_keys_are_never_reused() {
        let mut ring = IndexKeyedRing::new();
        assert_eq!(ring.enqueue('x'), 1);
        assert_eq!(ring.enqueue('y'), 2);
        ring.dequeue();
        ring.dequeue();
        assert_eq!(ring.enqueue('z'), 3);
        assert_eq!(ring.next_key(), 4);
    }

    #[test]
    fn test_reset() {
        let mut ring = IndexKeyedRing::new();
        ring.enqueue(1);
        ring.enqueue(2);
        ring.dequeue();
        ring.reset();

        assert_eq!(ring.len(), 0);
        assert!(ring.is_empty());
        assert_eq!(ring.enqueue(42), 1);
        assert_eq!(ring.dequeue(), Some(42));
        assert!(ring.dequeue().is_none());
    }

    #[test]
    fn test_try_enqueue_rejects_none() {
        let mut ring = IndexKeyedRing::new();
        let result = ring.try_enqueue(None::<u8>);
        assert!(matches!(result, Err(AnvilError::InvalidArgument { .. })));
        assert!(ring.is_empty());

        assert_eq!(ring.try_enqueue(Some(5)).unwrap(), 1);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_iter_in_insertion_order() {
        let mut ring = IndexKeyedRing::new();
        for n in 1..=5 {
            ring.enqueue(n);
        }
        ring.dequeue();

        let seen: Vec<_> = ring.iter().copied().collect();
        assert_eq!(seen, vec![2, 3, 4, 5]);

        let mut via_ref = Vec::new();
        for n in &ring {
            via_ref.push(*n);
        }
        assert_eq!(via_ref, seen);
    }

    #[test]
    fn test_interleaved_enqueue_dequeue() {
        let mut ring = IndexKeyedRing::new();
        ring.enqueue("one");
        ring.enqueue("two");
        assert_eq!(ring.dequeue(), Some("one"));
        ring.enqueue("three");
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.dequeue(), Some("two"));
        assert_eq!(ring.dequeue(), Some("three"));
        assert_eq!(ring.dequeue(), None);
    }

    #[test]
    fn test_drain_keeps_limits() {
        let mut ring = IndexKeyedRing::new();
        ring.enqueue(1);
        ring.enqueue(2);
        assert_eq!(ring.drain(), vec![1, 2]);
        assert!(ring.is_empty());
        assert_eq!(ring.enqueue(3), 3);
    }
}
