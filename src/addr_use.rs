//! Account→use map (`acct_in_use`): tracks, per account currently locked by
//! at least one in-flight microblock, which bank tiles hold it and whether
//! the hold is exclusive (writable).
//!
//! The top two bits of the 64-bit word are reserved flags; the remaining
//! bits are one-per-bank-tile (bounded by `MAX_BANK_TILES`, see
//! `config::MAX_BANK_TILES`).

use std::collections::HashMap;

use crate::txn::AccountAddr;

/// At most one bank tile may hold this bit: the holder has exclusive
/// (writable) access to the account.
pub const WRITABLE: u64 = 1 << 63;

/// The account's bitset-engine bit was recycled to a different account
/// while this account remained locked by a bank tile; completion must not
/// blindly clear the *current* bit mapping on this account's behalf. See
/// the scheduler's bit-release protocol.
pub const BIT_CLEARED: u64 = 1 << 62;

pub fn bank_bit(bank_tile: usize) -> u64 {
    debug_assert!(bank_tile < crate::config::MAX_BANK_TILES);
    1u64 << bank_tile
}

/// `account → in_use_by` map.
#[derive(Debug, Default)]
pub struct AddrUseMap {
    map: HashMap<AccountAddr, u64>,
}

impl AddrUseMap {
    pub fn new() -> Self {
        AddrUseMap { map: HashMap::new() }
    }

    pub fn in_use_by(&self, addr: &AccountAddr) -> u64 {
        self.map.get(addr).copied().unwrap_or(0)
    }

    pub fn contains(&self, addr: &AccountAddr) -> bool {
        self.map.contains_key(addr)
    }

    /// Records a writable hold for `bank_tile` on `addr`, creating the entry
    /// if absent.
    pub fn mark_writer(&mut self, addr: AccountAddr, bank_tile: usize) {
        let entry = self.map.entry(addr).or_insert(0);
        *entry |= WRITABLE | bank_bit(bank_tile);
    }

    /// Records a readonly hold for `bank_tile` on `addr`, creating the entry
    /// if absent, and clears `BIT_CLEARED` (the bit mapping is fresh again
    /// because this hold references the current mapping).
    ///
    /// Returns `true` if the bank bit was newly set (i.e. this bank did not
    /// already hold the account), which the scheduler uses to decide
    /// whether to append to `use_by_bank`.
    pub fn mark_reader(&mut self, addr: AccountAddr, bank_tile: usize) -> bool {
        let entry = self.map.entry(addr).or_insert(0);
        let bit = bank_bit(bank_tile);
        let newly_set = *entry & bit == 0;
        *entry = (*entry | bit) & !BIT_CLEARED;
        newly_set
    }

    pub fn set_bit_cleared(&mut self, addr: &AccountAddr) {
        if let Some(v) = self.map.get_mut(addr) {
            *v |= BIT_CLEARED;
        }
    }

    /// Releases `bank_tile`'s hold on `addr` (clearing `WRITABLE` too, since
    /// a bank only ever held one account either writably or not — the flag
    /// is harmless to clear unconditionally for readonly holds). Removes
    /// the entry entirely once no bank bit remains set, ignoring
    /// `BIT_CLEARED` (an entry lingering only to record staleness after
    /// every bank has released it would never be cleaned up otherwise).
    ///
    /// Returns `true` if the caller should also clear this account's bit
    /// from the global `bitset_rw_in_use`/`bitset_w_in_use` snapshots: that
    /// is only safe when no bank holds the account anymore *and* the bit
    /// mapping has not gone stale (`BIT_CLEARED` unset) since this hold
    /// began.
    pub fn release_bank(&mut self, addr: &AccountAddr, bank_tile: usize) -> bool {
        let bit = bank_bit(bank_tile);
        let v = match self.map.get_mut(addr) {
            Some(v) => v,
            None => return false,
        };
        *v &= !(bit | WRITABLE);
        let unlocked = *v & !BIT_CLEARED == 0;
        let clear_global_bitset = unlocked && *v & BIT_CLEARED == 0;
        if unlocked {
            self.map.remove(addr);
        }
        clear_global_bitset
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_then_release_removes_entry() {
        let mut m = AddrUseMap::new();
        let a = [1u8; 32];
        m.mark_writer(a, 0);
        assert_eq!(m.in_use_by(&a) & WRITABLE, WRITABLE);
        m.release_bank(&a, 0);
        assert!(!m.contains(&a));
    }

    #[test]
    fn multiple_readers_share_until_all_released() {
        let mut m = AddrUseMap::new();
        let a = [2u8; 32];
        assert!(m.mark_reader(a, 0));
        assert!(m.mark_reader(a, 1));
        assert!(!m.mark_reader(a, 0));
        m.release_bank(&a, 0);
        assert!(m.contains(&a));
        m.release_bank(&a, 1);
        assert!(!m.contains(&a));
    }

    #[test]
    fn bit_cleared_survives_release_until_fully_unlocked() {
        let mut m = AddrUseMap::new();
        let a = [3u8; 32];
        m.mark_writer(a, 0);
        m.set_bit_cleared(&a);
        assert_eq!(m.in_use_by(&a) & BIT_CLEARED, BIT_CLEARED);
        assert!(m.contains(&a));
    }

    #[test]
    fn release_signals_global_clear_only_when_not_stale() {
        let mut m = AddrUseMap::new();

        let fresh = [4u8; 32];
        m.mark_writer(fresh, 0);
        assert!(m.release_bank(&fresh, 0));
        assert!(!m.contains(&fresh));

        let stale = [5u8; 32];
        m.mark_writer(stale, 0);
        m.set_bit_cleared(&stale);
        assert!(!m.release_bank(&stale, 0));
        assert!(!m.contains(&stale));
    }
}
