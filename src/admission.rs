//! Admission pipeline: validates a candidate transaction, applies the
//! capacity-eviction policy, allocates its account→bitset-slot references,
//! and inserts it into the appropriate pool.

use std::cmp::Ordering;
use std::collections::HashSet;

use rand::Rng;

use crate::arena::{PendingEntry, Root, NIL};
use crate::bitset::Bitset;
use crate::config::MAX_ACCOUNTS_PER_TXN;
use crate::cost::CostEstimator;
use crate::error::{AcceptKind, RejectReason};
use crate::pack::Pack;
use crate::treap::{compare_worse, compare_worse_raw};
use crate::txn::TxnView;

impl<E: CostEstimator> Pack<E> {
    /// Validates and admits `txn`, applying the capacity-eviction policy if
    /// the relevant pool is already at `pack_depth`. See the admission
    /// pipeline design notes for the exact step order; any failure leaves
    /// `self` unchanged and returns the first applicable reject reason.
    pub fn insert_fini(&mut self, txn: impl TxnView, expires_at: u64) -> Result<AcceptKind, RejectReason> {
        let reject = |reason: RejectReason| -> Result<AcceptKind, RejectReason> {
            self.metrics.record_reject(&reason);
            Err(reason)
        };

        let est = self.cost_estimator.estimate(&txn);
        if est.compute_est == 0 {
            return reject(RejectReason::EstimationFail);
        }

        for acc in txn.accounts() {
            if acc.is_writable() && self.unwritable.contains(&acc.addr) {
                return reject(RejectReason::WritesSysvar);
            }
        }

        // Affordability is an external collaborator's concern (see
        // DESIGN.md); this core never rejects for it.

        if est.compute_est as u64 >= self.limits.max_cost_per_block {
            return reject(RejectReason::TooLarge);
        }

        if txn.accounts().len() > MAX_ACCOUNTS_PER_TXN {
            return reject(RejectReason::AccountCnt);
        }

        {
            let mut seen = HashSet::with_capacity(txn.accounts().len());
            for acc in txn.accounts() {
                if !seen.insert(acc.addr) {
                    return reject(RejectReason::DuplicateAcct);
                }
            }
        }

        let sig0 = txn.signature0();
        if self.sigmap.contains(&sig0) {
            return reject(RejectReason::Duplicate);
        }

        if expires_at < self.expire_before_floor {
            return reject(RejectReason::Expired);
        }

        if txn.uses_address_lookup_table() {
            return reject(RejectReason::AddrLut);
        }

        let is_vote = txn.is_simple_vote();
        let pending_txn_cnt = self.pending.len() + self.pending_votes.len();

        let evict_idx = if pending_txn_cnt >= self.pack_depth {
            match self.capacity_decision(is_vote, est.rewards, est.compute_est) {
                Some(idx) => Some(idx),
                None => return reject(RejectReason::Priority),
            }
        } else {
            None
        };

        if let Some(idx) = evict_idx {
            self.remove_pending_entry(idx);
        }

        let idx = self
            .arena
            .reserve()
            .expect("arena has a free slot: pending_txn_cnt < pack_depth was just ensured");

        let mut rw_bitset = Bitset::EMPTY;
        let mut w_bitset = Bitset::EMPTY;
        for acc in txn.accounts() {
            let unwritable = !acc.is_writable() && self.unwritable.contains(&acc.addr);
            if unwritable {
                continue;
            }
            let outcome = self.bitset_slots.reference(acc.addr, idx, acc.is_writable());
            if let Some((fi_idx, fi_writable, bit)) = outcome.retro {
                let fi_entry = self.arena.get_mut(fi_idx);
                fi_entry.rw_bitset.set(bit);
                if fi_writable {
                    fi_entry.w_bitset.set(bit);
                }
            }
            if let Some(bit) = outcome.own_bit {
                rw_bitset.set(bit);
                if acc.is_writable() {
                    w_bitset.set(bit);
                }
            }
        }

        let priority: u64 = self.rng.gen();
        let entry = PendingEntry {
            payload: txn.payload().to_vec(),
            signature0: sig0,
            accounts: txn.accounts().to_vec(),
            rewards: est.rewards,
            compute_est: est.compute_est,
            requested_cus: est.requested_cus,
            is_simple_vote: is_vote,
            expires_at,
            root: if is_vote { Root::PendingVote } else { Root::Pending },
            rw_bitset,
            w_bitset,
            expq_idx: NIL,
            left: NIL,
            right: NIL,
            parent: NIL,
            priority,
        };
        self.arena.put(idx, entry);
        self.sigmap.insert(sig0, idx);
        self.expq.push(&mut self.arena, idx);
        if is_vote {
            self.pending_votes.insert(&mut self.arena, idx);
        } else {
            self.pending.insert(&mut self.arena, idx);
        }

        let accept = match (is_vote, evict_idx.is_some()) {
            (true, true) => AcceptKind::VoteReplace,
            (true, false) => AcceptKind::VoteAdd,
            (false, true) => AcceptKind::NonvoteReplace,
            (false, false) => AcceptKind::NonvoteAdd,
        };
        self.metrics.record_accept(accept);
        Ok(accept)
    }

    /// Implements the capacity table from the admission design: returns the
    /// arena index to evict, or `None` if the candidate should be rejected
    /// with `PRIORITY`. Only called when the relevant pool(s) are already
    /// at `pack_depth` capacity.
    fn capacity_decision(&self, is_vote: bool, rewards: u32, compute_est: u32) -> Option<u32> {
        let quarter = self.pack_depth / 4;
        let vote_cnt = self.pending_votes.len();
        let non_vote_cnt = self.pending.len();

        let worst_vote = self.pending_votes.worst(&self.arena);
        let worst_nonvote = self.pending.worst(&self.arena);

        let beats = |worst_idx: u32| {
            let w = self.arena.get(worst_idx);
            compare_worse_raw(rewards, compute_est, w.rewards, w.compute_est) == Ordering::Greater
        };

        if vote_cnt < quarter {
            if is_vote {
                worst_nonvote
            } else {
                worst_nonvote.filter(|&idx| beats(idx))
            }
        } else if non_vote_cnt < quarter {
            if !is_vote {
                worst_vote
            } else {
                worst_vote.filter(|&idx| beats(idx))
            }
        } else {
            let wv = worst_vote?;
            let wn = worst_nonvote?;
            let worse = if compare_worse(self.arena.get(wv), self.arena.get(wn)) == Ordering::Less {
                wv
            } else {
                wn
            };
            if beats(worse) {
                Some(worse)
            } else {
                None
            }
        }
    }
}
