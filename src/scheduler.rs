//! The scheduler: `schedule_impl` walks one pool in descending priority
//! order and greedily fills a microblock; `schedule_next_microblock` wraps
//! it in the three-pass non-vote/vote/non-vote-remainder budget split.

use crate::addr_use;
use crate::config::MICROBLOCK_DATA_OVERHEAD;
use crate::cost::CostEstimator;
use crate::metrics::SkipReason;
use crate::pack::{Pack, ScheduledTxn};

impl<E: CostEstimator> Pack<E> {
    /// Schedules transactions from one pool (non-vote or vote) against the
    /// given budgets, appending emitted transactions to `out`.
    ///
    /// Returns `(txns_scheduled, cus_scheduled, bytes_scheduled)`.
    pub(crate) fn schedule_impl(
        &mut self,
        is_vote: bool,
        cu_limit: u64,
        txn_limit: u64,
        byte_limit: u64,
        bank_tile: usize,
        out: &mut Vec<ScheduledTxn>,
    ) -> (u64, u64, u64) {
        let mut cus_scheduled = 0u64;
        let mut bytes_scheduled = 0u64;
        let mut txns_scheduled = 0u64;

        if cu_limit == 0 || txn_limit == 0 || byte_limit == 0 {
            return (0, 0, 0);
        }

        let candidates: Vec<u32> = {
            let treap = if is_vote { &self.pending_votes } else { &self.pending };
            let mut it = treap.iter_desc();
            let mut v = Vec::with_capacity(treap.len());
            while let Some(idx) = it.next(&self.arena) {
                v.push(idx);
            }
            v
        };

        for idx in candidates {
            if txns_scheduled >= txn_limit || cus_scheduled >= cu_limit || bytes_scheduled >= byte_limit {
                break;
            }

            let entry = self.arena.get(idx);
            let compute_est = entry.compute_est as u64;
            let payload_sz = entry.payload.len() as u64;
            let rw_bitset = entry.rw_bitset;
            let w_bitset = entry.w_bitset;

            if compute_est > cu_limit - cus_scheduled {
                self.metrics.record_skip(SkipReason::CuLimit);
                continue;
            }

            let fast_conflict =
                self.bitset_rw_in_use.intersects(&w_bitset) || self.bitset_w_in_use.intersects(&rw_bitset);
            if fast_conflict {
                self.metrics.record_skip(SkipReason::FastPath);
                continue;
            }

            if payload_sz > byte_limit - bytes_scheduled {
                self.metrics.record_skip(SkipReason::ByteLimit);
                continue;
            }

            let accounts = self.arena.get(idx).accounts.clone();

            let write_blocked = accounts.iter().any(|acc| {
                acc.is_writable()
                    && self.writer_costs.total(&acc.addr) + compute_est > self.limits.max_write_cost_per_acct
            });
            if write_blocked {
                self.metrics.record_skip(SkipReason::WriteCost);
                continue;
            }

            let slow_conflict = accounts.iter().any(|acc| {
                if self.unwritable.contains(&acc.addr) {
                    return false;
                }
                if acc.is_writable() {
                    self.addr_use.in_use_by(&acc.addr) != 0
                } else {
                    self.addr_use.in_use_by(&acc.addr) & addr_use::WRITABLE != 0
                }
            });
            if slow_conflict {
                self.metrics.record_skip(SkipReason::SlowPath);
                continue;
            }

            // Include the transaction.
            self.bitset_rw_in_use.union_with(&rw_bitset);
            self.bitset_w_in_use.union_with(&w_bitset);

            for acc in &accounts {
                let fully_released = if acc.is_writable() {
                    self.writer_costs.add(acc.addr, compute_est);
                    self.addr_use.mark_writer(acc.addr, bank_tile);
                    self.use_by_bank[bank_tile].push(acc.addr);
                    self.bitset_slots.release(&acc.addr)
                } else if !self.unwritable.contains(&acc.addr) {
                    let newly_set = self.addr_use.mark_reader(acc.addr, bank_tile);
                    if newly_set {
                        self.use_by_bank[bank_tile].push(acc.addr);
                    }
                    self.bitset_slots.release(&acc.addr)
                } else {
                    None
                };

                // A bit just freed back to the pool may be reassigned to an
                // unrelated account's pending-conflict tracking before this
                // dispatched transaction's bank completes; mark it stale so
                // `microblock_complete` won't later clear a bit that no
                // longer means what it does here. The rw-bit is always safe
                // to drop from the local snapshot (no pending entry needs it
                // anymore); the w-bit only if this entry itself held the
                // account writably.
                if let Some(bit) = fully_released {
                    self.addr_use.set_bit_cleared(&acc.addr);
                    self.bitset_rw_in_use.clear(bit);
                    if acc.is_writable() {
                        self.bitset_w_in_use.clear(bit);
                    }
                }
            }

            let entry = self.arena.get(idx);
            out.push(ScheduledTxn {
                signature0: entry.signature0,
                payload: entry.payload.clone(),
                accounts: accounts.clone(),
                rewards: entry.rewards,
                compute_est: entry.compute_est,
                requested_cus: entry.requested_cus,
                is_simple_vote: entry.is_simple_vote,
            });

            cus_scheduled += compute_est;
            bytes_scheduled += payload_sz;
            txns_scheduled += 1;
            self.metrics.record_taken();

            self.unlink_entry(idx);
        }

        (txns_scheduled, cus_scheduled, bytes_scheduled)
    }

    /// Builds one microblock for `bank_tile`, splitting the non-vote and
    /// vote pools across three passes: non-votes, then votes, then any
    /// remaining non-vote budget the vote pass didn't use.
    ///
    /// Returns the number of transactions emitted into `out`.
    pub fn schedule_next_microblock(
        &mut self,
        total_cus: u64,
        vote_fraction: f32,
        bank_tile: usize,
        out: &mut Vec<ScheduledTxn>,
    ) -> usize {
        let remaining_block_cus = self.limits.max_cost_per_block.saturating_sub(self.cumulative_block_cost);
        let total_cus = total_cus.min(remaining_block_cus);

        let remaining_vote_cus = self.limits.max_vote_cost_per_block.saturating_sub(self.cumulative_vote_cost);
        let vote_cus = ((total_cus as f64 * vote_fraction as f64) as u64).min(remaining_vote_cus);

        let vote_reserved_txns = (vote_cus / crate::config::TYPICAL_VOTE_COST.max(1))
            .min((self.limits.max_txn_per_microblock as f64 * vote_fraction as f64) as u64);

        if self.microblock_cnt >= self.limits.max_microblocks_per_block {
            return 0;
        }
        let min_txn_sz = crate::config::MIN_SERIALIZED_SZ;
        if self.data_bytes_consumed + MICROBLOCK_DATA_OVERHEAD + min_txn_sz > self.limits.max_data_bytes_per_block {
            return 0;
        }
        let byte_budget = self.limits.max_data_bytes_per_block.saturating_sub(self.data_bytes_consumed + MICROBLOCK_DATA_OVERHEAD);

        let nonvote_cu_budget = total_cus.saturating_sub(vote_cus);
        let nonvote_txn_budget = self.limits.max_txn_per_microblock.saturating_sub(vote_reserved_txns);

        let (n1_txns, n1_cus, n1_bytes) =
            self.schedule_impl(false, nonvote_cu_budget, nonvote_txn_budget, byte_budget, bank_tile, out);

        let (v_txns, v_cus, v_bytes) = self.schedule_impl(
            true,
            vote_cus,
            vote_reserved_txns,
            byte_budget.saturating_sub(n1_bytes),
            bank_tile,
            out,
        );

        let remainder_cu_budget = vote_cus.saturating_sub(v_cus);
        let remainder_txn_budget = vote_reserved_txns.saturating_sub(v_txns);
        let (n2_txns, n2_cus, n2_bytes) = self.schedule_impl(
            false,
            remainder_cu_budget,
            remainder_txn_budget,
            byte_budget.saturating_sub(n1_bytes).saturating_sub(v_bytes),
            bank_tile,
            out,
        );

        let total_txns = n1_txns + v_txns + n2_txns;
        let total_cus_scheduled = n1_cus + v_cus + n2_cus;
        let total_bytes_scheduled = n1_bytes + v_bytes + n2_bytes;

        if total_txns > 0 {
            self.microblock_cnt += 1;
            self.outstanding_microblock_mask |= 1u64 << bank_tile;
            self.cumulative_block_cost = self.cumulative_block_cost.saturating_add(total_cus_scheduled);
            self.cumulative_vote_cost = self.cumulative_vote_cost.saturating_add(v_cus);
            self.data_bytes_consumed += total_bytes_scheduled + MICROBLOCK_DATA_OVERHEAD;
            self.metrics.record_microblock(total_txns, v_txns);
        }

        total_txns as usize
    }
}
