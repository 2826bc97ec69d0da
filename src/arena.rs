//! Arena-indexed storage for pending transaction entries.
//!
//! The original implementation links entries through an intrusive pool with
//! a pointer trick (payload as the struct's first field, so a payload
//! pointer can be turned back into an entry pointer). Rust's ownership model
//! makes that unnecessary: the arena owns every entry directly in a
//! `Vec<Option<PendingEntry>>`, and a free list of `u32` indices stands in
//! for the pool's free-slot stack.

use crate::bitset::Bitset;
use crate::txn::{AccountMeta, Signature};

/// Sentinel "no index" value, used for treap links and a not-yet-assigned
/// expiration-heap back-pointer.
pub const NIL: u32 = u32::MAX;

/// Which pool currently owns an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Pending,
    PendingVote,
}

/// An arena-allocated pending transaction.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub payload: Vec<u8>,
    pub signature0: Signature,
    pub accounts: Vec<AccountMeta>,
    pub rewards: u32,
    pub compute_est: u32,
    pub requested_cus: u32,
    pub is_simple_vote: bool,
    pub expires_at: u64,
    pub root: Root,

    pub rw_bitset: Bitset,
    pub w_bitset: Bitset,

    /// Back-pointer into the expiration heap's backing vector; `NIL` while
    /// not (yet) part of the heap, which never happens for an entry that is
    /// `Pending`/`PendingVote` (the admission path always inserts into the
    /// heap in the same step it inserts into a treap).
    pub expq_idx: u32,

    /// Treap links: arena indices, `NIL` when absent.
    pub left: u32,
    pub right: u32,
    pub parent: u32,
    /// Random balancing priority (max-heap property among treap links).
    /// Distinct from `rewards`/`compute_est`, which determine the treap's
    /// *ordering* key.
    pub priority: u64,
}

impl PendingEntry {
    /// The reward/compute ratio ordering key, compared via
    /// [`crate::treap::compare_worse`] rather than floating point division.
    pub fn ratio_key(&self) -> (u32, u32) {
        (self.rewards, self.compute_est)
    }
}

/// Slab of `PendingEntry` slots with O(1) allocate/free.
#[derive(Debug)]
pub struct Arena {
    slots: Vec<Option<PendingEntry>>,
    free: Vec<u32>,
}

impl Arena {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut free = Vec::with_capacity(capacity);
        for i in (0..capacity as u32).rev() {
            free.push(i);
        }
        Arena {
            slots: (0..capacity).map(|_| None).collect(),
            free,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_cnt(&self) -> usize {
        self.free.len()
    }

    pub fn used_cnt(&self) -> usize {
        self.capacity() - self.free_cnt()
    }

    /// Reserves a free slot without occupying it; the caller fills it in via
    /// [`Arena::put`]. Returns `None` if the arena is at capacity.
    pub fn reserve(&mut self) -> Option<u32> {
        self.free.pop()
    }

    /// Returns a reserved-but-unfilled slot to the free list, used when
    /// admission fails after a slot was reserved.
    pub fn unreserve(&mut self, idx: u32) {
        debug_assert!(self.slots[idx as usize].is_none());
        self.free.push(idx);
    }

    pub fn put(&mut self, idx: u32, entry: PendingEntry) {
        self.slots[idx as usize] = Some(entry);
    }

    /// Removes and returns the entry at `idx`, returning the slot to the
    /// free list.
    pub fn take(&mut self, idx: u32) -> PendingEntry {
        let entry = self.slots[idx as usize]
            .take()
            .expect("arena slot was empty on take");
        self.free.push(idx);
        entry
    }

    pub fn get(&self, idx: u32) -> &PendingEntry {
        self.slots[idx as usize]
            .as_ref()
            .expect("arena slot was empty on get")
    }

    pub fn get_mut(&mut self, idx: u32) -> &mut PendingEntry {
        self.slots[idx as usize]
            .as_mut()
            .expect("arena slot was empty on get_mut")
    }

    pub fn clear(&mut self) {
        let capacity = self.slots.len();
        self.slots.iter_mut().for_each(|s| *s = None);
        self.free.clear();
        for i in (0..capacity as u32).rev() {
            self.free.push(i);
        }
    }
}
