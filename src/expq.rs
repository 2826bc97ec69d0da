//! Expiration priority queue: a binary min-heap over arena indices, ordered
//! by `expires_at`, with a back-pointer stored on each entry
//! (`PendingEntry::expq_idx`) so an arbitrary entry can be removed in
//! O(log n) rather than only the minimum.

use crate::arena::{Arena, NIL};

#[derive(Debug, Default)]
pub struct ExpQueue {
    heap: Vec<u32>,
}

impl ExpQueue {
    pub fn new() -> Self {
        ExpQueue { heap: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn peek_min(&self) -> Option<u32> {
        self.heap.first().copied()
    }

    /// Walks the heap in storage order (not priority order), pairing each
    /// slot's position with the arena index it holds. Used by the invariant
    /// checker to confirm every back-pointer is reciprocal.
    pub fn iter_with_pos(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.heap.iter().copied().enumerate()
    }

    pub fn push(&mut self, arena: &mut Arena, idx: u32) {
        let i = self.heap.len();
        self.heap.push(idx);
        arena.get_mut(idx).expq_idx = i as u32;
        self.sift_up(arena, i);
    }

    /// Removes and returns the minimum-`expires_at` entry.
    pub fn pop_min(&mut self, arena: &mut Arena) -> Option<u32> {
        if self.heap.is_empty() {
            return None;
        }
        let min = self.heap[0];
        self.remove_at(arena, 0);
        arena.get_mut(min).expq_idx = NIL;
        Some(min)
    }

    /// Removes `idx` from wherever it currently sits in the heap.
    pub fn remove(&mut self, arena: &mut Arena, idx: u32) {
        let i = arena.get(idx).expq_idx as usize;
        self.remove_at(arena, i);
        arena.get_mut(idx).expq_idx = NIL;
    }

    fn remove_at(&mut self, arena: &mut Arena, i: usize) {
        let last = self.heap.len() - 1;
        if i != last {
            self.swap(arena, i, last);
        }
        self.heap.pop();
        if i < self.heap.len() {
            self.sift_up(arena, i);
            self.sift_down(arena, i);
        }
    }

    fn swap(&mut self, arena: &mut Arena, i: usize, j: usize) {
        self.heap.swap(i, j);
        arena.get_mut(self.heap[i]).expq_idx = i as u32;
        arena.get_mut(self.heap[j]).expq_idx = j as u32;
    }

    fn expires_at(&self, arena: &Arena, i: usize) -> u64 {
        arena.get(self.heap[i]).expires_at
    }

    fn sift_up(&mut self, arena: &mut Arena, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.expires_at(arena, i) < self.expires_at(arena, parent) {
                self.swap(arena, i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, arena: &mut Arena, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < self.heap.len() && self.expires_at(arena, left) < self.expires_at(arena, smallest) {
                smallest = left;
            }
            if right < self.heap.len() && self.expires_at(arena, right) < self.expires_at(arena, smallest) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap(arena, i, smallest);
            i = smallest;
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
