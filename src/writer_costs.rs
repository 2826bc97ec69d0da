//! `account → cumulative committed compute` map, used to enforce the
//! per-account per-block write-cost ceiling.
//!
//! Entries are never deleted mid-block, even when a rebate drives a
//! writer's total to zero: `end_block`'s bulk-undo optimization removes
//! entries in reverse insertion order, which only produces a clean,
//! displacement-free open-addressing table if nothing was deleted since the
//! last reset. `std::collections::HashMap` does not expose (or need) probe
//! sequences directly, but the insertion-order discipline is kept anyway so
//! `end_block`'s two code paths — bulk walk-back vs. full clear — faithfully
//! mirror the original's reasoning and stay correct if this ever moves to an
//! open-addressed table.

use std::collections::HashMap;

use crate::txn::AccountAddr;

#[derive(Debug, Default)]
pub struct WriterCosts {
    totals: HashMap<AccountAddr, u64>,
    /// Insertion order of first-touch accounts this block, capped at
    /// `written_list_max`. Once the cap is hit, `end_block` falls back to a
    /// full clear instead of walking this list.
    written_list: Vec<AccountAddr>,
    written_list_max: usize,
}

impl WriterCosts {
    pub fn new(written_list_max: usize) -> Self {
        WriterCosts {
            totals: HashMap::new(),
            written_list: Vec::new(),
            written_list_max,
        }
    }

    pub fn total(&self, addr: &AccountAddr) -> u64 {
        self.totals.get(addr).copied().unwrap_or(0)
    }

    pub fn contains(&self, addr: &AccountAddr) -> bool {
        self.totals.contains_key(addr)
    }

    /// Adds `cost` to `addr`'s running total, inserting a zeroed entry (and
    /// recording it in `written_list`, if there's room) if this is the
    /// account's first touch this block.
    pub fn add(&mut self, addr: AccountAddr, cost: u64) {
        let first_touch = !self.totals.contains_key(&addr);
        let entry = self.totals.entry(addr).or_insert(0);
        *entry = entry.saturating_add(cost);
        if first_touch && self.written_list.len() < self.written_list_max.saturating_sub(1) {
            self.written_list.push(addr);
        }
    }

    /// Subtracts a rebate from `addr`'s running total. The entry is kept
    /// even if the result is zero (see module docs).
    pub fn rebate(&mut self, addr: &AccountAddr, amount: u64) {
        if let Some(total) = self.totals.get_mut(addr) {
            *total = total.saturating_sub(amount);
        }
    }

    /// `true` if the written_list is a complete, safe-to-reverse record of
    /// every account touched since the last reset.
    pub fn can_bulk_undo(&self) -> bool {
        self.written_list.len() < self.written_list_max.saturating_sub(1)
    }

    /// Reverse-insertion-order bulk delete, valid only when
    /// [`WriterCosts::can_bulk_undo`] holds.
    pub fn bulk_undo(&mut self) {
        debug_assert!(self.can_bulk_undo());
        for addr in self.written_list.drain(..).rev() {
            self.totals.remove(&addr);
        }
    }

    /// Full reset, used when `written_list` overflowed this block.
    pub fn clear(&mut self) {
        self.totals.clear();
        self.written_list.clear();
    }

    pub fn reset_for_new_block(&mut self) {
        if self.can_bulk_undo() {
            self.bulk_undo();
        } else {
            self.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_rebate_tracks_running_total() {
        let mut wc = WriterCosts::new(16);
        let a = [1u8; 32];
        wc.add(a, 700);
        assert_eq!(wc.total(&a), 700);
        wc.rebate(&a, 300);
        assert_eq!(wc.total(&a), 400);
    }

    #[test]
    fn rebate_to_zero_keeps_entry_present() {
        let mut wc = WriterCosts::new(16);
        let a = [2u8; 32];
        wc.add(a, 500);
        wc.rebate(&a, 500);
        assert_eq!(wc.total(&a), 0);
        assert!(wc.contains(&a));
    }

    #[test]
    fn reset_for_new_block_clears_everything() {
        let mut wc = WriterCosts::new(16);
        for i in 0u8..5 {
            wc.add([i; 32], 100);
        }
        wc.reset_for_new_block();
        for i in 0u8..5 {
            assert!(!wc.contains(&[i; 32]));
        }
    }

    #[test]
    fn overflowing_written_list_falls_back_to_full_clear() {
        let mut wc = WriterCosts::new(3);
        for i in 0u8..10 {
            wc.add([i; 32], 10);
        }
        assert!(!wc.can_bulk_undo());
        wc.reset_for_new_block();
        for i in 0u8..10 {
            assert!(!wc.contains(&[i; 32]));
        }
    }
}
