//! Property-style coverage of the five testable invariants: conflict
//! freedom, priority monotonicity, round-trip deletion, rebate idempotence,
//! and exact expiration.

use std::collections::HashMap;

use fd_pack_core::cost::{CostEstimator, Estimate};
use fd_pack_core::{AccountMeta, Limits, Pack, RawTxn, ScheduledTxn, Signature, TxnView};

struct FixedEstimator {
    table: HashMap<Signature, (u32, u32)>,
}

impl FixedEstimator {
    fn new() -> Self {
        FixedEstimator { table: HashMap::new() }
    }

    fn with(mut self, sig0: Signature, rewards: u32, compute_est: u32) -> Self {
        self.table.insert(sig0, (rewards, compute_est));
        self
    }
}

impl CostEstimator for FixedEstimator {
    fn estimate(&self, txn: &dyn TxnView) -> Estimate {
        let (rewards, compute_est) = self.table.get(&txn.signature0()).copied().unwrap_or((100, 100));
        Estimate { rewards, compute_est, requested_cus: compute_est }
    }
}

fn addr(tag: u8) -> [u8; 32] {
    [tag; 32]
}

fn sig(tag: u8) -> Signature {
    [tag; 64]
}

fn conflicts(a: &ScheduledTxn, b: &ScheduledTxn) -> bool {
    a.accounts.iter().any(|x| {
        b.accounts.iter().any(|y| x.addr == y.addr && (x.is_writable() || y.is_writable()))
    })
}

#[test]
fn conflict_freedom_within_one_microblock() {
    let mut p: Pack = Pack::new(16, 1, Limits::default(), 11).unwrap();

    let a = addr(1);
    let b = addr(2);
    let c = addr(3);
    let d = addr(4);

    p.insert_fini(RawTxn::new(sig(1), vec![AccountMeta::writable(a)]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(2), vec![AccountMeta::writable(a)]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(3), vec![AccountMeta::readonly(a)]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(4), vec![AccountMeta::writable(b)]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(5), vec![AccountMeta::readonly(b), AccountMeta::readonly(c)]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(6), vec![AccountMeta::writable(c)]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(7), vec![AccountMeta::writable(d)]), u64::MAX).unwrap();

    let mut out = Vec::new();
    p.schedule_next_microblock(1_000_000, 0.0, 0, &mut out);
    assert!(!out.is_empty());

    for i in 0..out.len() {
        for j in (i + 1)..out.len() {
            assert!(
                !conflicts(&out[i], &out[j]),
                "scheduled {:?} and {:?} overlap on a writer account",
                out[i].signature0,
                out[j].signature0
            );
        }
    }
    p.verify().expect("invariants hold");
}

#[test]
fn priority_monotonicity_with_one_bank_and_no_binding_limits() {
    let ratios = [(1u8, 600u32), (2, 500), (3, 400), (4, 300), (5, 200), (6, 100)];
    let mut est = FixedEstimator::new();
    for (tag, rewards) in ratios {
        est = est.with(sig(tag), rewards, 100);
    }
    let mut p = Pack::with_cost_estimator(8, 1, Limits::default(), 5, est).unwrap();

    for (tag, _) in ratios {
        p.insert_fini(RawTxn::new(sig(tag), vec![AccountMeta::writable(addr(tag))]), u64::MAX).unwrap();
    }

    let mut out = Vec::new();
    let n = p.schedule_next_microblock(1_000_000, 0.0, 0, &mut out);
    assert_eq!(n, ratios.len());

    for pair in out.windows(2) {
        let ratio = |t: &ScheduledTxn| t.rewards as u64 * 100 / t.compute_est as u64;
        assert!(ratio(&pair[0]) >= ratio(&pair[1]), "emission order must be non-increasing in reward/compute ratio");
    }
}

#[test]
fn round_trip_insert_then_delete_every_entry() {
    let pack_depth = 6;
    let mut p: Pack = Pack::new(pack_depth, 1, Limits::default(), 0).unwrap();

    let sigs: Vec<Signature> = (1..=5u8).map(sig).collect();
    for (i, &s) in sigs.iter().enumerate() {
        p.insert_fini(RawTxn::new(s, vec![AccountMeta::writable(addr(i as u8 + 1))]), u64::MAX).unwrap();
    }
    p.verify().expect("invariants hold with entries pending");

    for s in &sigs {
        assert!(p.delete_transaction(s));
    }

    assert_eq!(p.avail_txn_cnt(), pack_depth);
    assert_eq!(p.pending_txn_cnt(), 0);
    p.verify().expect("invariants hold once fully drained");
}

#[test]
fn rebate_idempotence_with_zero_execution_restores_prior_cost() {
    let est = FixedEstimator::new().with(sig(1), 1000, 1000);
    let mut p = Pack::with_cost_estimator(8, 1, Limits::default(), 0, est).unwrap();
    let before = p.cumulative_block_cost();

    p.insert_fini(RawTxn::new(sig(1), vec![AccountMeta::writable(addr(1))]), u64::MAX).unwrap();
    let mut out = Vec::new();
    p.schedule_next_microblock(10_000, 0.0, 0, &mut out);
    assert_ne!(p.cumulative_block_cost(), before);

    let executed = out.remove(0).into_executed(0, false, false);
    p.rebate_cus(&[executed]);
    assert_eq!(p.cumulative_block_cost(), before);
}

#[test]
fn expire_before_removes_exactly_the_expired_set() {
    let mut p: Pack = Pack::new(8, 1, Limits::default(), 0).unwrap();
    let expiries = [(1u8, 50u64), (2, 99), (3, 100), (4, 150), (5, 200)];
    for (tag, expires_at) in expiries {
        p.insert_fini(RawTxn::new(sig(tag), vec![AccountMeta::writable(addr(tag))]), expires_at).unwrap();
    }

    let removed = p.expire_before(100);
    let expected = expiries.iter().filter(|&&(_, e)| e < 100).count();
    assert_eq!(removed, expected);
    assert_eq!(p.pending_txn_cnt(), expiries.len() - expected);
    p.verify().expect("invariants hold after a partial expiration sweep");
}
