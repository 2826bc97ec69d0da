//! Metrics facade for the packing core.
//!
//! This module provides optional observability functionality enabled via the
//! `metrics` feature. When disabled, every call is a no-op with zero
//! performance impact — the same contract the rest of this crate's ambient
//! stack holds itself to elsewhere.

#[cfg(feature = "metrics")]
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

/// Why a candidate was skipped during one `schedule_impl` pass. Mirrors the
/// metric buckets named in the external interface contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CuLimit,
    FastPath,
    ByteLimit,
    WriteCost,
    SlowPath,
}

impl SkipReason {
    fn label(self) -> &'static str {
        match self {
            SkipReason::CuLimit => "cu_limit",
            SkipReason::FastPath => "fast_path",
            SkipReason::ByteLimit => "byte_limit",
            SkipReason::WriteCost => "write_cost",
            SkipReason::SlowPath => "slow_path",
        }
    }
}

#[cfg(feature = "metrics")]
pub struct Metrics {
    registry: Registry,
    reject_total: IntCounterVec,
    accept_total: IntCounterVec,
    skip_total: IntCounterVec,
    taken_total: IntCounter,
    txns_per_microblock: Histogram,
    votes_per_microblock: Histogram,
    cus_scheduled_per_block: Histogram,
    cus_rebated_per_block: Histogram,
}

#[cfg(feature = "metrics")]
impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let reject_total = IntCounterVec::new(
            Opts::new("pack_reject_total", "Admission rejections by reason"),
            &["reason"],
        )?;
        let accept_total = IntCounterVec::new(
            Opts::new("pack_accept_total", "Admissions by accept kind"),
            &["kind"],
        )?;
        let skip_total = IntCounterVec::new(
            Opts::new("pack_schedule_skip_total", "Scheduler candidate skips by reason"),
            &["reason"],
        )?;
        let taken_total = IntCounter::with_opts(Opts::new(
            "pack_schedule_taken_total",
            "Transactions included in a microblock",
        ))?;
        let txns_per_microblock = Histogram::with_opts(HistogramOpts::new(
            "pack_txns_per_microblock",
            "Transaction count per emitted microblock",
        ))?;
        let votes_per_microblock = Histogram::with_opts(HistogramOpts::new(
            "pack_votes_per_microblock",
            "Vote transaction count per emitted microblock",
        ))?;
        let cus_scheduled_per_block = Histogram::with_opts(HistogramOpts::new(
            "pack_cus_scheduled_per_block",
            "Compute units scheduled per block",
        ))?;
        let cus_rebated_per_block = Histogram::with_opts(HistogramOpts::new(
            "pack_cus_rebated_per_block",
            "Compute units rebated per block",
        ))?;

        registry.register(Box::new(reject_total.clone()))?;
        registry.register(Box::new(accept_total.clone()))?;
        registry.register(Box::new(skip_total.clone()))?;
        registry.register(Box::new(taken_total.clone()))?;
        registry.register(Box::new(txns_per_microblock.clone()))?;
        registry.register(Box::new(votes_per_microblock.clone()))?;
        registry.register(Box::new(cus_scheduled_per_block.clone()))?;
        registry.register(Box::new(cus_rebated_per_block.clone()))?;

        Ok(Metrics {
            registry,
            reject_total,
            accept_total,
            skip_total,
            taken_total,
            txns_per_microblock,
            votes_per_microblock,
            cus_scheduled_per_block,
            cus_rebated_per_block,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_reject(&self, reason: &crate::error::RejectReason) {
        self.reject_total.with_label_values(&[reject_label(reason)]).inc();
    }

    pub fn record_accept(&self, kind: crate::error::AcceptKind) {
        self.accept_total.with_label_values(&[accept_label(kind)]).inc();
    }

    pub fn record_skip(&self, reason: SkipReason) {
        self.skip_total.with_label_values(&[reason.label()]).inc();
    }

    pub fn record_taken(&self) {
        self.taken_total.inc();
    }

    pub fn record_microblock(&self, txn_cnt: u64, vote_cnt: u64) {
        self.txns_per_microblock.observe(txn_cnt as f64);
        self.votes_per_microblock.observe(vote_cnt as f64);
    }

    pub fn record_block_cus(&self, scheduled: u64, rebated: u64) {
        self.cus_scheduled_per_block.observe(scheduled as f64);
        self.cus_rebated_per_block.observe(rebated as f64);
    }
}

#[cfg(feature = "metrics")]
fn reject_label(reason: &crate::error::RejectReason) -> &'static str {
    use crate::error::RejectReason::*;
    match reason {
        EstimationFail => "estimation_fail",
        Unaffordable => "unaffordable",
        TooLarge => "too_large",
        AccountCnt => "account_cnt",
        DuplicateAcct => "duplicate_acct",
        WritesSysvar => "writes_sysvar",
        Duplicate => "duplicate",
        Expired => "expired",
        AddrLut => "addr_lut",
        Priority => "priority",
    }
}

#[cfg(feature = "metrics")]
fn accept_label(kind: crate::error::AcceptKind) -> &'static str {
    use crate::error::AcceptKind::*;
    match kind {
        VoteAdd => "vote_add",
        VoteReplace => "vote_replace",
        NonvoteAdd => "nonvote_add",
        NonvoteReplace => "nonvote_replace",
    }
}

/// No-op metrics facade used when the `metrics` feature is disabled. Every
/// method is a zero-cost no-op so call sites never need to be conditionally
/// compiled.
#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Metrics;

#[cfg(not(feature = "metrics"))]
impl Metrics {
    pub fn new() -> Result<Self, std::convert::Infallible> {
        Ok(Metrics)
    }

    pub fn record_reject(&self, _reason: &crate::error::RejectReason) {}
    pub fn record_accept(&self, _kind: crate::error::AcceptKind) {}
    pub fn record_skip(&self, _reason: SkipReason) {}
    pub fn record_taken(&self) {}
    pub fn record_microblock(&self, _txn_cnt: u64, _vote_cnt: u64) {}
    pub fn record_block_cus(&self, _scheduled: u64, _rebated: u64) {}
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use crate::error::{AcceptKind, RejectReason};

    #[test]
    fn counters_start_at_zero_and_increment() {
        let m = Metrics::new().expect("metrics construction");
        m.record_reject(&RejectReason::Duplicate);
        m.record_accept(AcceptKind::NonvoteAdd);
        m.record_skip(SkipReason::FastPath);
        m.record_taken();
        m.record_microblock(3, 1);
        m.record_block_cus(1000, 200);
        // No panics and the registry gathers without error.
        assert!(!m.registry().gather().is_empty());
    }
}

#[cfg(test)]
mod disabled_tests {
    use super::*;

    #[cfg(not(feature = "metrics"))]
    #[test]
    fn disabled_metrics_are_no_ops() {
        let m = Metrics::new().unwrap();
        m.record_taken();
        m.record_skip(SkipReason::SlowPath);
    }
}
