//! Account→bitset-slot map: reference-counted assignment of a scarce
//! conflict-check bit to each account currently referenced by at least one
//! pending transaction.
//!
//! Bits are a contended resource (far fewer than the number of distinct
//! accounts that can be in flight at once). A singleton-referenced account
//! (referenced by exactly one pending transaction) never needs a bit at
//! all — nothing else could conflict with it through the fast path, since
//! fast-path conflicts are by definition between *two* entries. Bit
//! assignment is therefore deferred until a second entry references the
//! same account (`FIRST_INSTANCE` sentinel), and when the available stack is
//! exhausted, all further accounts share one reserved catch-all bit
//! (`SLOWPATH`) that conservatively forces the slow, exact per-account
//! check rather than ever producing a false negative.

use std::collections::HashMap;

use crate::config::BITSET_MAX;
use crate::txn::AccountAddr;

/// The last allocatable index is reserved as the shared, never-recycled
/// catch-all bit; `BITSET_MAX - 1` ordinary bits are pooled.
pub const SLOWPATH_BIT: usize = BITSET_MAX - 1;

#[derive(Debug, Clone, Copy)]
enum Assignment {
    FirstInstance,
    Bit(usize),
}

#[derive(Debug)]
struct Slot {
    ref_cnt: u32,
    assignment: Assignment,
    /// Recorded only while `assignment == FirstInstance`: the arena index
    /// of the sole referencing entry and whether it holds the account
    /// writably, so a later second reference can retroactively OR the
    /// freshly allocated bit into that entry's bitsets.
    first_instance: Option<(u32, bool)>,
}

/// What the caller of [`BitsetSlots::reference`] must do with the result.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceOutcome {
    /// Bit to OR into the *current* entry's `rw_bitset` (and `w_bitset` if
    /// writable). `None` on a brand new singleton reference — no bit exists
    /// yet.
    pub own_bit: Option<usize>,
    /// Present only on the 0→1→2 transition: the first-referencing entry's
    /// arena index, whether it held the account writably, and the bit that
    /// must retroactively be OR'd into its bitsets too.
    pub retro: Option<(u32, bool, usize)>,
}

/// `account → bitset slot`.
#[derive(Debug)]
pub struct BitsetSlots {
    slots: HashMap<AccountAddr, Slot>,
    available: Vec<usize>,
}

impl BitsetSlots {
    pub fn new() -> Self {
        let mut available = Vec::with_capacity(SLOWPATH_BIT);
        for b in (0..SLOWPATH_BIT).rev() {
            available.push(b);
        }
        BitsetSlots { slots: HashMap::new(), available }
    }

    /// Registers a new reference to `addr` by the entry at `entry_idx`
    /// (`writable` is this entry's access mode for the account).
    pub fn reference(&mut self, addr: AccountAddr, entry_idx: u32, writable: bool) -> ReferenceOutcome {
        let slot = self.slots.entry(addr).or_insert(Slot {
            ref_cnt: 0,
            assignment: Assignment::FirstInstance,
            first_instance: None,
        });
        slot.ref_cnt += 1;

        match slot.ref_cnt {
            1 => {
                slot.first_instance = Some((entry_idx, writable));
                ReferenceOutcome { own_bit: None, retro: None }
            }
            2 => {
                let bit = self.available.pop().unwrap_or(SLOWPATH_BIT);
                slot.assignment = Assignment::Bit(bit);
                let (fi_idx, fi_writable) = slot
                    .first_instance
                    .take()
                    .expect("ref_cnt reached 2 without a recorded first instance");
                ReferenceOutcome {
                    own_bit: Some(bit),
                    retro: Some((fi_idx, fi_writable, bit)),
                }
            }
            _ => {
                let bit = match slot.assignment {
                    Assignment::Bit(b) => b,
                    Assignment::FirstInstance => unreachable!("ref_cnt > 2 implies a bit was assigned"),
                };
                ReferenceOutcome { own_bit: Some(bit), retro: None }
            }
        }
    }

    /// Releases one reference to `addr`. Returns `Some(bit)` only when a
    /// uniquely-owned pool bit (not the shared `SLOWPATH` bit, not a
    /// never-assigned singleton) is freed back to the available stack —
    /// that is the only case in which a caller's local bitset snapshot may
    /// safely clear the corresponding bit, since the shared/slowpath bit
    /// may still be legitimately set on behalf of other accounts.
    pub fn release(&mut self, addr: &AccountAddr) -> Option<usize> {
        let remove;
        let freed_bit;
        {
            let slot = self.slots.get_mut(addr).expect("release of unreferenced account");
            slot.ref_cnt -= 1;
            remove = slot.ref_cnt == 0;
            freed_bit = if remove {
                match slot.assignment {
                    Assignment::Bit(b) if b != SLOWPATH_BIT => Some(b),
                    _ => None,
                }
            } else {
                None
            };
        }
        if remove {
            self.slots.remove(addr);
            if let Some(bit) = freed_bit {
                self.available.push(bit);
            }
        }
        freed_bit
    }

    /// The bit currently mapped to `addr`, if any, excluding the shared
    /// `SLOWPATH` bit. Used by completion to tell whether the bit recorded
    /// when a transaction was dispatched is still the one this account
    /// owns, before clearing it from the global in-use snapshots.
    pub fn current_bit(&self, addr: &AccountAddr) -> Option<usize> {
        match self.slots.get(addr).map(|s| s.assignment) {
            Some(Assignment::Bit(b)) if b != SLOWPATH_BIT => Some(b),
            _ => None,
        }
    }

    pub fn ref_cnt(&self, addr: &AccountAddr) -> u32 {
        self.slots.get(addr).map(|s| s.ref_cnt).unwrap_or(0)
    }

    pub fn total_ref_cnt(&self) -> u64 {
        self.slots.values().map(|s| s.ref_cnt as u64).sum()
    }

    pub fn available_cnt(&self) -> usize {
        self.available.len()
    }

    pub fn assigned_bits(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.values().filter_map(|s| match s.assignment {
            Assignment::Bit(b) => Some(b),
            Assignment::FirstInstance => None,
        })
    }

    /// The pool bits currently sitting free on the available stack.
    pub fn available_bits(&self) -> impl Iterator<Item = usize> + '_ {
        self.available.iter().copied()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.available.clear();
        for b in (0..SLOWPATH_BIT).rev() {
            self.available.push(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_reference_gets_no_bit() {
        let mut slots = BitsetSlots::new();
        let outcome = slots.reference([1u8; 32], 7, true);
        assert!(outcome.own_bit.is_none());
        assert!(outcome.retro.is_none());
    }

    #[test]
    fn second_reference_allocates_and_reports_retro() {
        let mut slots = BitsetSlots::new();
        let a = [2u8; 32];
        slots.reference(a, 10, true);
        let second = slots.reference(a, 11, false);
        let bit = second.own_bit.expect("bit should be allocated on 2nd ref");
        let (fi_idx, fi_writable, retro_bit) = second.retro.expect("retro info expected");
        assert_eq!(fi_idx, 10);
        assert!(fi_writable);
        assert_eq!(retro_bit, bit);
    }

    #[test]
    fn release_to_zero_frees_the_bit() {
        let mut slots = BitsetSlots::new();
        let a = [3u8; 32];
        slots.reference(a, 1, true);
        slots.reference(a, 2, true);
        let before = slots.available_cnt();
        slots.release(&a);
        let freed = slots.release(&a);
        assert!(freed.is_some());
        assert_eq!(slots.available_cnt(), before + 1);
        assert_eq!(slots.ref_cnt(&a), 0);
    }

    #[test]
    fn exhausting_the_pool_falls_back_to_slowpath() {
        let mut slots = BitsetSlots::new();
        // Exhaust every pooled bit by giving SLOWPATH_BIT distinct accounts
        // two references each.
        for i in 0..SLOWPATH_BIT + 1 {
            let mut addr = [0u8; 32];
            addr[0..8].copy_from_slice(&(i as u64).to_le_bytes());
            slots.reference(addr, i as u32, true);
            let outcome = slots.reference(addr, (i + 1000) as u32, false);
            let _ = outcome.own_bit;
        }
        assert_eq!(slots.available_cnt(), 0);
        let mut overflow_addr = [9u8; 32];
        overflow_addr[0] = 200;
        slots.reference(overflow_addr, 5000, true);
        let outcome = slots.reference(overflow_addr, 5001, false);
        assert_eq!(outcome.own_bit, Some(SLOWPATH_BIT));
    }
}
