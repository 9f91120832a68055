//! Bounded transition buffer.
use std::collections::{vec_deque::Iter, VecDeque};

/// Ordered buffer of transitions of one (slot, policy) pair.
///
/// With a maximum length, the buffer works as a sliding window: appending to a full
/// buffer evicts the oldest item. Without one, it grows until cleared.
#[derive(Debug, Clone)]
pub struct TrajBuffer<T> {
    items: VecDeque<T>,
    maxlen: Option<usize>,
}

impl<T> TrajBuffer<T> {
    /// Creates an empty buffer. `None` means unbounded.
    pub fn new(maxlen: Option<usize>) -> Self {
        Self {
            items: VecDeque::new(),
            maxlen,
        }
    }

    /// Appends an item at the tail, evicting from the head to keep `len() <= maxlen`.
    pub fn append(&mut self, item: T) {
        self.items.push_back(item);
        if let Some(maxlen) = self.maxlen {
            while self.items.len() > maxlen {
                self.items.pop_front();
            }
        }
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The maximum length.
    pub fn maxlen(&self) -> Option<usize> {
        self.maxlen
    }

    /// Iterates from the oldest to the newest item.
    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone> TrajBuffer<T> {
    /// Copies the items out, oldest first, leaving the buffer untouched.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
