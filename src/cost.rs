//! Cost/fee estimation is an external collaborator per the packing core's
//! scope: the core only needs a `(rewards, compute_est, requested_cus)`
//! triple for each candidate transaction. [`CostEstimator`] is the seam;
//! [`DefaultCostEstimator`] is a reference implementation in the spirit of
//! a simple per-byte/per-signature fee schedule, grounded on the shape of
//! the teacher's gas-accounting module.

use crate::txn::TxnView;

/// The output of estimating a transaction's reward and cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Estimate {
    /// Lamport-equivalent reward: signature fee times signature count plus
    /// any additional priority reward, clamped to `u32::MAX`.
    pub rewards: u32,
    /// Estimated compute units this transaction will consume.
    pub compute_est: u32,
    /// Compute units the transaction requests (may exceed `compute_est`;
    /// the difference is rebated after execution).
    pub requested_cus: u32,
}

/// Estimates reward and compute cost for a candidate transaction.
///
/// A `compute_est` of zero signals `ESTIMATION_FAIL` to the admission
/// pipeline; implementations MUST NOT return zero for a transaction they
/// intend to admit (see the `COMPARE_WORSE` non-total-order caveat).
pub trait CostEstimator {
    fn estimate(&self, txn: &dyn TxnView) -> Estimate;
}

/// A simple per-byte/per-signature/per-account fee schedule, used as the
/// default `CostEstimator` in tests and examples.
#[derive(Debug, Clone, Copy)]
pub struct DefaultCostEstimator {
    pub fee_per_signature: u32,
    pub base_compute: u32,
    pub compute_per_account: u32,
    pub compute_per_byte: u32,
    pub priority_reward_per_compute: u32,
}

impl Default for DefaultCostEstimator {
    fn default() -> Self {
        DefaultCostEstimator {
            fee_per_signature: 5_000,
            base_compute: 150,
            compute_per_account: 25,
            compute_per_byte: 1,
            priority_reward_per_compute: 0,
        }
    }
}

impl CostEstimator for DefaultCostEstimator {
    fn estimate(&self, txn: &dyn TxnView) -> Estimate {
        let sig_count = txn.signature_count();
        let account_cnt = txn.accounts().len() as u32;
        let payload_len = txn.payload().len() as u32;

        let compute_est = self
            .base_compute
            .saturating_add(self.compute_per_account.saturating_mul(account_cnt))
            .saturating_add(self.compute_per_byte.saturating_mul(payload_len));

        let fee = self.fee_per_signature.saturating_mul(sig_count.max(1));
        let priority = self
            .priority_reward_per_compute
            .saturating_mul(compute_est);
        let rewards = fee.saturating_add(priority);

        Estimate {
            rewards,
            compute_est,
            requested_cus: compute_est,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::{AccountMeta, RawTxn};

    #[test]
    fn estimate_is_nonzero_for_a_normal_transaction() {
        let est = DefaultCostEstimator::default();
        let txn = RawTxn::new([1u8; 64], vec![AccountMeta::writable([2u8; 32])]);
        let e = est.estimate(&txn);
        assert!(e.compute_est > 0);
        assert!(e.rewards > 0);
    }

    #[test]
    fn larger_payload_costs_more_compute() {
        let est = DefaultCostEstimator::default();
        let small = RawTxn::new([1u8; 64], vec![]).with_payload_len(10);
        let large = RawTxn::new([2u8; 64], vec![]).with_payload_len(1000);
        assert!(est.estimate(&large).compute_est > est.estimate(&small).compute_est);
    }
}
