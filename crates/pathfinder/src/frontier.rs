//! Min-priority open list over packed `(priority, position)` keys.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::codec::EncodedPosition;

/// Priority in the high 32 bits, encoded position in the low 32 bits.
pub type FrontierKey = u64;

#[inline]
pub fn pack(priority: u32, position: EncodedPosition) -> FrontierKey {
    (u64::from(priority) << 32) | u64::from(position)
}

#[inline]
pub fn unpack_position(key: FrontierKey) -> EncodedPosition {
    (key & 0xFFFF_FFFF) as EncodedPosition
}

/// Pops the smallest key first: lowest priority, then lowest encoded position.
/// Keys are plain integers, so the pop order does not depend on push order.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<Reverse<FrontierKey>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, priority: u32, position: EncodedPosition) {
        self.heap.push(Reverse(pack(priority, position)));
    }

    #[inline]
    pub fn pop(&mut self) -> Option<EncodedPosition> {
        self.heap.pop().map(|Reverse(key)| unpack_position(key))
    }

    /// Keeps the allocation.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.heap.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
