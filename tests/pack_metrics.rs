//! Exercises the Prometheus-backed metrics facade end-to-end through
//! `Pack`'s public API, rather than the in-module unit tests in
//! `src/metrics.rs` which construct `Metrics` directly.
#![cfg(feature = "metrics")]

use fd_pack_core::{AccountMeta, Limits, Pack, RawTxn};

fn addr(tag: u8) -> [u8; 32] {
    [tag; 32]
}

fn sig(tag: u8) -> [u8; 64] {
    [tag; 64]
}

fn metric_value(families: &[prometheus::proto::MetricFamily], name: &str, label: Option<(&str, &str)>) -> f64 {
    let family = families.iter().find(|f| f.get_name() == name).unwrap_or_else(|| panic!("metric {name} not registered"));
    for m in family.get_metric() {
        let matches = match label {
            None => true,
            Some((k, v)) => m.get_label().iter().any(|l| l.get_name() == k && l.get_value() == v),
        };
        if matches {
            if m.has_counter() {
                return m.get_counter().get_value();
            }
            if m.has_histogram() {
                return m.get_histogram().get_sample_count() as f64;
            }
        }
    }
    0.0
}

#[test]
fn admission_rejections_and_acceptances_are_counted_by_label() {
    let mut p: Pack = Pack::new(8, 1, Limits::default(), 0).unwrap();

    p.insert_fini(RawTxn::new(sig(1), vec![AccountMeta::writable(addr(1))]), u64::MAX).unwrap();
    let dup = RawTxn::new(sig(1), vec![AccountMeta::writable(addr(2))]);
    assert!(p.insert_fini(dup, u64::MAX).is_err());

    let families = p.metrics().registry().gather();
    assert_eq!(metric_value(&families, "pack_accept_total", Some(("kind", "nonvote_add"))), 1.0);
    assert_eq!(metric_value(&families, "pack_reject_total", Some(("reason", "duplicate"))), 1.0);
}

#[test]
fn scheduling_records_taken_count_and_microblock_histogram() {
    let mut p: Pack = Pack::new(8, 1, Limits::default(), 0).unwrap();
    p.insert_fini(RawTxn::new(sig(1), vec![AccountMeta::writable(addr(1))]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(2), vec![AccountMeta::writable(addr(2))]), u64::MAX).unwrap();

    let mut out = Vec::new();
    let n = p.schedule_next_microblock(1_000_000, 0.0, 0, &mut out);
    assert_eq!(n, 2);

    let families = p.metrics().registry().gather();
    assert_eq!(metric_value(&families, "pack_schedule_taken_total", None), 2.0);
    assert_eq!(metric_value(&families, "pack_txns_per_microblock", None), 1.0, "one microblock observation");
}

#[test]
fn conflicting_second_writer_is_recorded_as_a_fast_path_skip() {
    let mut p: Pack = Pack::new(8, 1, Limits::default(), 0).unwrap();
    p.insert_fini(RawTxn::new(sig(1), vec![AccountMeta::writable(addr(1))]), u64::MAX).unwrap();
    p.insert_fini(RawTxn::new(sig(2), vec![AccountMeta::writable(addr(1))]), u64::MAX).unwrap();

    let mut out = Vec::new();
    let n = p.schedule_next_microblock(1_000_000, 0.0, 0, &mut out);
    assert_eq!(n, 1, "only one of the two same-account writers fits in one microblock");

    let families = p.metrics().registry().gather();
    assert!(metric_value(&families, "pack_schedule_skip_total", Some(("reason", "fast_path"))) >= 1.0);
}
