//! The top-level `Pack` scheduler: construction, completion, rebate,
//! expiration, end-of-block reset, and the invariant checker. Admission
//! (`insert_fini`) and scheduling (`schedule_impl`/`schedule_next_microblock`)
//! live in their own modules as `impl Pack` blocks, matching the component
//! breakdown this crate is organized around.

use std::cmp::Ordering;

use log::{info, warn};

use crate::addr_use::AddrUseMap;
use crate::arena::{Arena, Root};
use crate::bitset::Bitset;
use crate::bitset_slots::BitsetSlots;
use crate::config::{Limits, DEFAULT_WRITTEN_LIST_MAX};
use crate::cost::{CostEstimator, DefaultCostEstimator};
use crate::error::{ConfigError, PackError, VerifyError};
use crate::expq::ExpQueue;
use crate::metrics::Metrics;
use crate::sigmap::SigMap;
use crate::treap::{compare_worse, Treap};
use crate::txn::{AccountAddr, AccountMeta, Signature};
use crate::unwritable::UnwritableSet;
use crate::writer_costs::WriterCosts;

/// A transaction handed to a bank tile as part of a microblock.
#[derive(Debug, Clone)]
pub struct ScheduledTxn {
    pub signature0: Signature,
    pub payload: Vec<u8>,
    pub accounts: Vec<AccountMeta>,
    pub rewards: u32,
    pub compute_est: u32,
    pub requested_cus: u32,
    pub is_simple_vote: bool,
}

impl ScheduledTxn {
    /// Builds the execution-result record `rebate_cus` expects, once a bank
    /// tile has actually run the transaction.
    pub fn into_executed(self, executed_cus: u64, success: bool, in_block: bool) -> ExecutedTxn {
        ExecutedTxn {
            requested_cus: self.requested_cus as u64,
            executed_cus,
            success,
            is_simple_vote: self.is_simple_vote,
            in_block,
            payload_sz: self.payload.len() as u64,
            writable_accounts: self
                .accounts
                .into_iter()
                .filter(|a| a.is_writable())
                .map(|a| a.addr)
                .collect(),
        }
    }
}

/// The outcome of executing a previously scheduled transaction, as reported
/// back to [`Pack::rebate_cus`].
#[derive(Debug, Clone)]
pub struct ExecutedTxn {
    pub requested_cus: u64,
    pub executed_cus: u64,
    pub success: bool,
    pub is_simple_vote: bool,
    pub in_block: bool,
    pub payload_sz: u64,
    pub writable_accounts: Vec<AccountAddr>,
}

/// The priority-ordered, conflict-aware transaction packing scheduler.
///
/// A single `Pack` is driven from one thread: no method synchronizes
/// internally, matching the single-threaded cooperative model in the
/// concurrency section of the design this crate implements.
pub struct Pack<E: CostEstimator = DefaultCostEstimator> {
    pub(crate) arena: Arena,
    pub(crate) pending: Treap,
    pub(crate) pending_votes: Treap,
    pub(crate) expq: ExpQueue,
    pub(crate) sigmap: SigMap,
    pub(crate) bitset_slots: BitsetSlots,
    pub(crate) addr_use: AddrUseMap,
    pub(crate) writer_costs: WriterCosts,
    pub(crate) unwritable: UnwritableSet,
    pub(crate) cost_estimator: E,
    pub(crate) rng: rand::rngs::StdRng,

    pub(crate) limits: Limits,
    pub(crate) pack_depth: usize,
    pub(crate) bank_tile_cnt: usize,
    pub(crate) expire_before_floor: u64,

    pub(crate) cumulative_block_cost: u64,
    pub(crate) cumulative_vote_cost: u64,
    pub(crate) cumulative_rebated_cus: u64,
    pub(crate) data_bytes_consumed: u64,
    pub(crate) microblock_cnt: u64,
    pub(crate) outstanding_microblock_mask: u64,

    pub(crate) bitset_rw_in_use: Bitset,
    pub(crate) bitset_w_in_use: Bitset,

    pub(crate) use_by_bank: Vec<Vec<AccountAddr>>,

    pub(crate) metrics: Metrics,
}

impl Pack<DefaultCostEstimator> {
    /// Constructs a `Pack` using the reference [`DefaultCostEstimator`].
    pub fn new(
        pack_depth: usize,
        bank_tile_cnt: usize,
        limits: Limits,
        rng_seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::with_cost_estimator(pack_depth, bank_tile_cnt, limits, rng_seed, DefaultCostEstimator::default())
    }
}

impl<E: CostEstimator> Pack<E> {
    pub fn with_cost_estimator(
        pack_depth: usize,
        bank_tile_cnt: usize,
        limits: Limits,
        rng_seed: u64,
        cost_estimator: E,
    ) -> Result<Self, ConfigError> {
        if pack_depth < 4 {
            return Err(ConfigError::PackDepthTooSmall(pack_depth));
        }
        if bank_tile_cnt == 0 || bank_tile_cnt > crate::config::MAX_BANK_TILES {
            return Err(ConfigError::BankTileCntOutOfRange {
                got: bank_tile_cnt,
                max: crate::config::MAX_BANK_TILES,
            });
        }

        use rand::SeedableRng;
        let metrics = Metrics::new().expect("metrics facade construction is infallible");

        Ok(Pack {
            arena: Arena::with_capacity(pack_depth),
            pending: Treap::new(),
            pending_votes: Treap::new(),
            expq: ExpQueue::new(),
            sigmap: SigMap::new(),
            bitset_slots: BitsetSlots::new(),
            addr_use: AddrUseMap::new(),
            writer_costs: WriterCosts::new(DEFAULT_WRITTEN_LIST_MAX),
            unwritable: UnwritableSet::default(),
            cost_estimator,
            rng: rand::rngs::StdRng::seed_from_u64(rng_seed),
            limits,
            pack_depth,
            bank_tile_cnt,
            expire_before_floor: 0,
            cumulative_block_cost: 0,
            cumulative_vote_cost: 0,
            cumulative_rebated_cus: 0,
            data_bytes_consumed: 0,
            microblock_cnt: 0,
            outstanding_microblock_mask: 0,
            bitset_rw_in_use: Bitset::EMPTY,
            bitset_w_in_use: Bitset::EMPTY,
            use_by_bank: vec![Vec::new(); bank_tile_cnt],
            metrics,
        })
    }

    pub fn avail_txn_cnt(&self) -> usize {
        self.arena.free_cnt()
    }

    pub fn pending_txn_cnt(&self) -> usize {
        self.arena.used_cnt()
    }

    pub fn bank_tile_cnt(&self) -> usize {
        self.bank_tile_cnt
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Cumulative compute scheduled into this block so far, net of rebates.
    pub fn cumulative_block_cost(&self) -> u64 {
        self.cumulative_block_cost
    }

    /// Cumulative vote-pool compute scheduled into this block so far, net of
    /// rebates.
    pub fn cumulative_vote_cost(&self) -> u64 {
        self.cumulative_vote_cost
    }

    /// Total compute rebated since the last `end_block`.
    pub fn cumulative_rebated_cus(&self) -> u64 {
        self.cumulative_rebated_cus
    }

    /// Serialized bytes charged against `max_data_bytes_per_block` so far.
    pub fn data_bytes_consumed(&self) -> u64 {
        self.data_bytes_consumed
    }

    /// Microblocks emitted since the last `end_block`.
    pub fn microblock_cnt(&self) -> u64 {
        self.microblock_cnt
    }

    pub fn set_block_limits(&mut self, max_microblocks_per_block: u64, max_data_bytes_per_block: u64) {
        self.limits.max_microblocks_per_block = max_microblocks_per_block;
        self.limits.max_data_bytes_per_block = max_data_bytes_per_block;
    }

    /// Removes an entry's treap/expq/arena/sigmap linkage without touching
    /// the account→bitset-slot reference counts. Used by the scheduler,
    /// which releases bitset references itself (interleaved with the
    /// per-account scheduling decisions) before calling this.
    pub(crate) fn unlink_entry(&mut self, idx: u32) -> crate::arena::PendingEntry {
        let root = self.arena.get(idx).root;
        match root {
            Root::Pending => self.pending.remove(&mut self.arena, idx),
            Root::PendingVote => self.pending_votes.remove(&mut self.arena, idx),
        }
        self.expq.remove(&mut self.arena, idx);
        let entry = self.arena.take(idx);
        self.sigmap.remove(&entry.signature0);
        entry
    }

    /// Full removal of a still-pending (never scheduled) entry: unlinks it
    /// and releases its account→bitset-slot references.
    pub(crate) fn remove_pending_entry(&mut self, idx: u32) -> crate::arena::PendingEntry {
        let entry = self.unlink_entry(idx);
        for acc in &entry.accounts {
            if acc.is_writable() || !self.unwritable.contains(&acc.addr) {
                self.bitset_slots.release(&acc.addr);
            }
        }
        entry
    }

    /// Deletes a pending transaction by its first signature. Returns `true`
    /// if a matching transaction was found and removed.
    pub fn delete_transaction(&mut self, sig0: &Signature) -> bool {
        match self.sigmap.get(sig0) {
            Some(idx) => {
                self.remove_pending_entry(idx);
                true
            }
            None => false,
        }
    }

    /// Drains every pending transaction with `expires_at < limit`. Returns
    /// the number of transactions removed.
    pub fn expire_before(&mut self, limit: u64) -> usize {
        self.expire_before_floor = limit;
        let mut removed = 0usize;
        loop {
            match self.expq.peek_min() {
                Some(idx) if self.arena.get(idx).expires_at < limit => {
                    self.remove_pending_entry(idx);
                    removed += 1;
                }
                _ => break,
            }
        }
        removed
    }

    /// Releases a bank tile's hold on every account it touched while
    /// dispatching a microblock. An account whose hold count drops to zero
    /// and whose bitset mapping hasn't gone stale since dispatch (see
    /// `addr_use::AddrUseMap::release_bank`) has its fast-path bit cleared
    /// from the global in-use snapshots, unblocking conflicting candidates
    /// on other bank tiles.
    pub fn microblock_complete(&mut self, bank_tile: usize) {
        let accounts = std::mem::take(&mut self.use_by_bank[bank_tile]);
        for addr in accounts {
            let clear_global_bitset = self.addr_use.release_bank(&addr, bank_tile);
            if clear_global_bitset {
                if let Some(bit) = self.bitset_slots.current_bit(&addr) {
                    self.bitset_rw_in_use.clear(bit);
                    self.bitset_w_in_use.clear(bit);
                }
            }
        }
        self.outstanding_microblock_mask &= !(1u64 << bank_tile);
    }

    /// Applies post-execution rebates: unused compute is returned to the
    /// per-block, per-vote, and per-writer-account budgets.
    pub fn rebate_cus(&mut self, results: &[ExecutedTxn]) {
        for r in results {
            if r.executed_cus > r.requested_cus {
                panic!(
                    "{}",
                    PackError::ExecutedExceedsRequested {
                        executed: r.executed_cus,
                        requested: r.requested_cus,
                    }
                );
            }
            if !r.success && r.executed_cus > 0 {
                warn!("rebate_cus: failed transaction reported nonzero executed_cus");
                panic!("{}", PackError::FailedTxnWithNonzeroExecution);
            }

            let rebate = r.requested_cus - r.executed_cus;
            self.cumulative_block_cost = self.cumulative_block_cost.saturating_sub(rebate);
            if r.is_simple_vote {
                self.cumulative_vote_cost = self.cumulative_vote_cost.saturating_sub(rebate);
            }
            for addr in &r.writable_accounts {
                self.writer_costs.rebate(addr, rebate);
            }
            if !r.in_block {
                self.data_bytes_consumed = self.data_bytes_consumed.saturating_sub(r.payload_sz);
            }
            self.cumulative_rebated_cus = self.cumulative_rebated_cus.saturating_add(rebate);
        }
    }

    /// Resets all per-block accounting. Must be called once per slot
    /// boundary, after every bank tile's outstanding microblocks have
    /// completed.
    pub fn end_block(&mut self) {
        self.metrics.record_block_cus(self.cumulative_block_cost, self.cumulative_rebated_cus);

        self.microblock_cnt = 0;
        self.data_bytes_consumed = 0;
        self.cumulative_block_cost = 0;
        self.cumulative_vote_cost = 0;
        self.cumulative_rebated_cus = 0;

        self.addr_use.clear();
        self.writer_costs.reset_for_new_block();
        self.bitset_rw_in_use = Bitset::EMPTY;
        self.bitset_w_in_use = Bitset::EMPTY;
        for bank in self.use_by_bank.iter_mut() {
            bank.clear();
        }
        self.outstanding_microblock_mask = 0;
    }

    /// Drops every pending transaction and resets all state, including
    /// per-block accounting.
    pub fn clear_all(&mut self) {
        self.arena.clear();
        self.pending = Treap::new();
        self.pending_votes = Treap::new();
        self.expq.clear();
        self.sigmap.clear();
        self.bitset_slots.clear();
        self.end_block();
        info!("pack cleared: all pending transactions dropped");
    }

    /// Checks every global invariant named in the design's testable
    /// properties section. Intended for use in tests and debug assertions,
    /// not the steady-state hot path.
    pub fn verify(&self) -> Result<(), VerifyError> {
        let treap_total = self.pending.len() + self.pending_votes.len();
        if treap_total != self.sigmap.len() || treap_total != self.arena.used_cnt() {
            return Err(VerifyError::CountMismatch);
        }

        let mut referenced_accounts = 0u64;
        for (treap, expect_root) in [(&self.pending, Root::Pending), (&self.pending_votes, Root::PendingVote)] {
            let mut it = treap.iter_desc();
            let mut prev: Option<u32> = None;
            while let Some(idx) = it.next(&self.arena) {
                let entry = self.arena.get(idx);
                if entry.root != expect_root {
                    return Err(VerifyError::RootMismatch);
                }
                if entry.expq_idx == crate::arena::NIL {
                    return Err(VerifyError::MissingFromExpq);
                }
                if !entry.w_bitset.is_subset_of(&entry.rw_bitset) {
                    return Err(VerifyError::BitsetMismatch);
                }
                if let Some(p) = prev {
                    if compare_worse(self.arena.get(p), entry) == Ordering::Less {
                        return Err(VerifyError::OrderViolation);
                    }
                }
                referenced_accounts += entry
                    .accounts
                    .iter()
                    .filter(|acc| acc.is_writable() || !self.unwritable.contains(&acc.addr))
                    .count() as u64;
                prev = Some(idx);
            }
        }

        if !self.bitset_w_in_use.is_subset_of(&self.bitset_rw_in_use) {
            return Err(VerifyError::WNotSubsetOfRw);
        }

        if referenced_accounts != self.bitset_slots.total_ref_cnt() {
            return Err(VerifyError::RefCountMismatch);
        }

        let mut seen_assigned = std::collections::HashSet::new();
        let mut assigned_cnt = 0usize;
        for bit in self.bitset_slots.assigned_bits() {
            if bit == crate::bitset_slots::SLOWPATH_BIT {
                continue;
            }
            assigned_cnt += 1;
            if !seen_assigned.insert(bit) {
                return Err(VerifyError::BitsetPartitionBroken);
            }
        }
        let mut available_cnt = 0usize;
        for bit in self.bitset_slots.available_bits() {
            available_cnt += 1;
            if seen_assigned.contains(&bit) {
                return Err(VerifyError::BitsetPartitionBroken);
            }
        }
        if assigned_cnt + available_cnt != crate::bitset_slots::SLOWPATH_BIT {
            return Err(VerifyError::BitsetPartitionBroken);
        }

        if self.expq.len() != treap_total {
            return Err(VerifyError::DanglingExpqEntry);
        }
        for (pos, idx) in self.expq.iter_with_pos() {
            let entry = self.arena.get(idx);
            if entry.expq_idx as usize != pos || !matches!(entry.root, Root::Pending | Root::PendingVote) {
                return Err(VerifyError::DanglingExpqEntry);
            }
        }

        for (bank_tile, accounts) in self.use_by_bank.iter().enumerate() {
            for addr in accounts {
                if self.addr_use.in_use_by(addr) & crate::addr_use::bank_bit(bank_tile) == 0 {
                    return Err(VerifyError::UseByBankMismatch);
                }
            }
        }

        Ok(())
    }
}
