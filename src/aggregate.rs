//! # Series Assembly and Derived Metrics
//!
//! Turns a flat set of run records into chart-ready series. For each mode and
//! each value of the swept variable, exactly one record must match the
//! (mode, sweep value, baseline) triple. Zero matches and duplicates are
//! data-integrity errors, never silently dropped or averaged. Output
//! sequences are positionally aligned with the sweep list and always have the
//! same length as it.
//!
//! Aggregation is a pure, deterministic function of its inputs. There are no
//! retries: the inputs are static files, and re-deriving the same series from
//! unchanged records has no value. A failure aborts only the table being
//! built; the caller decides whether to proceed with partial output.

use crate::record::{RunRecord, TransferMode, MODES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::defaults;

/// The independent variable a chart sweeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepAxis {
    /// Sweep message size, thread count held at its baseline
    MessageSize,
    /// Sweep thread count, message size held at its baseline
    ThreadCount,
}

impl SweepAxis {
    /// The ordered sweep values for this axis
    pub fn sweep(&self) -> &'static [u64] {
        match self {
            SweepAxis::MessageSize => &defaults::MSG_SIZES,
            SweepAxis::ThreadCount => &defaults::THREAD_COUNTS,
        }
    }

    /// The fixed value of the variable not being swept
    pub fn baseline(&self) -> u64 {
        match self {
            SweepAxis::MessageSize => defaults::BASELINE_THREADS,
            SweepAxis::ThreadCount => defaults::BASELINE_MSG_SIZE,
        }
    }
}

impl std::fmt::Display for SweepAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepAxis::MessageSize => write!(f, "msg_size"),
            SweepAxis::ThreadCount => write!(f, "threads"),
        }
    }
}

/// The metric a series table reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Measured achieved throughput, Gbps
    ThroughputGbps,
    /// Measured average latency, microseconds
    LatencyUs,
    /// Cache misses that went to main memory
    CacheMisses,
    /// L1 data cache load misses
    L1Misses,
    /// Last-level cache load misses
    LlcMisses,
    /// Derived: bytes moved over the run, from throughput and duration
    BytesTransferred,
    /// Derived: CPU cycles per byte transferred
    CyclesPerByte,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetricKind::ThroughputGbps => "throughput_gbps",
            MetricKind::LatencyUs => "latency_us",
            MetricKind::CacheMisses => "cache_misses",
            MetricKind::L1Misses => "l1_misses",
            MetricKind::LlcMisses => "llc_misses",
            MetricKind::BytesTransferred => "bytes_transferred",
            MetricKind::CyclesPerByte => "cycles_per_byte",
        };
        f.write_str(name)
    }
}

/// One data point in a series
///
/// `Undefined` marks points whose value has no meaning, such as cycles per
/// byte when nothing was transferred. Serialized as JSON `null` so downstream
/// plotting can show a gap instead of a fabricated zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesValue {
    Value(f64),
    Undefined,
}

impl SeriesValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SeriesValue::Value(v) => Some(*v),
            SeriesValue::Undefined => None,
        }
    }
}

/// One metric's chart data: a per-mode sequence aligned with the sweep list
///
/// Invariant: `series[mode].len() == sweep.len()` for every mode present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesTable {
    pub metric: MetricKind,
    pub axis: SweepAxis,
    /// Fixed value of the non-swept variable
    pub baseline: u64,
    /// The sweep values, ascending
    pub sweep: Vec<u64>,
    pub series: BTreeMap<TransferMode, Vec<SeriesValue>>,
}

/// Data-integrity failures during series assembly
#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("no record for mode={mode}, {axis}={sweep_value} at baseline {baseline}")]
    MissingCombination {
        mode: TransferMode,
        axis: SweepAxis,
        sweep_value: u64,
        baseline: u64,
    },

    #[error(
        "{count} records for mode={mode}, {axis}={sweep_value} at baseline {baseline}; \
         expected exactly one"
    )]
    AmbiguousCombination {
        mode: TransferMode,
        axis: SweepAxis,
        sweep_value: u64,
        baseline: u64,
        count: usize,
    },
}

/// Bytes moved during one run, derived from its measured throughput
///
/// `throughput_gbps * duration_s * 1e9 / 8`: gigabits per second over the
/// run window, converted to bytes.
pub fn bytes_transferred(throughput_gbps: f64, duration_secs: f64) -> f64 {
    throughput_gbps * duration_secs * 1e9 / 8.0
}

/// Cycles per byte, undefined when nothing was transferred
///
/// A run can legitimately measure zero throughput (e.g. a failed transfer
/// path); that yields an explicit undefined point rather than a division
/// blow-up or a fake zero.
pub fn cycles_per_byte(cycles: u64, bytes: f64) -> SeriesValue {
    if bytes > 0.0 {
        SeriesValue::Value(cycles as f64 / bytes)
    } else {
        SeriesValue::Undefined
    }
}

/// Select the unique record matching (mode, sweep value, baseline)
///
/// Zero or multiple matches are integrity errors naming the offending
/// combination, so bad input data surfaces instead of skewing a chart.
pub fn select_unique<'a>(
    records: &'a [RunRecord],
    mode: TransferMode,
    axis: SweepAxis,
    sweep_value: u64,
    baseline: u64,
) -> Result<&'a RunRecord, AggregateError> {
    let mut matches = records.iter().filter(|r| {
        r.mode == mode
            && match axis {
                SweepAxis::MessageSize => r.msg_size == sweep_value && r.threads == baseline,
                SweepAxis::ThreadCount => r.threads == sweep_value && r.msg_size == baseline,
            }
    });

    let first = matches.next().ok_or(AggregateError::MissingCombination {
        mode,
        axis,
        sweep_value,
        baseline,
    })?;

    let extra = matches.count();
    if extra > 0 {
        return Err(AggregateError::AmbiguousCombination {
            mode,
            axis,
            sweep_value,
            baseline,
            count: extra + 1,
        });
    }

    Ok(first)
}

/// Build one metric's series table over the given sweep
///
/// Derived metrics follow their computation order: bytes transferred comes
/// straight from throughput, and cycles per byte divides by those bytes,
/// going undefined on zero.
pub fn build_table_over(
    records: &[RunRecord],
    metric: MetricKind,
    axis: SweepAxis,
    sweep: &[u64],
    baseline: u64,
    duration_secs: f64,
) -> Result<SeriesTable, AggregateError> {
    let mut series = BTreeMap::new();

    for mode in MODES {
        let mut values = Vec::with_capacity(sweep.len());
        for &sweep_value in sweep {
            let record = select_unique(records, mode, axis, sweep_value, baseline)?;
            values.push(metric_value(record, metric, duration_secs));
        }
        series.insert(mode, values);
    }

    Ok(SeriesTable {
        metric,
        axis,
        baseline,
        sweep: sweep.to_vec(),
        series,
    })
}

/// Build one metric's series table over the standard sweep for `axis`
pub fn build_table(
    records: &[RunRecord],
    metric: MetricKind,
    axis: SweepAxis,
    duration_secs: f64,
) -> Result<SeriesTable, AggregateError> {
    build_table_over(records, metric, axis, axis.sweep(), axis.baseline(), duration_secs)
}

fn metric_value(record: &RunRecord, metric: MetricKind, duration_secs: f64) -> SeriesValue {
    match metric {
        MetricKind::ThroughputGbps => SeriesValue::Value(record.throughput_gbps),
        MetricKind::LatencyUs => SeriesValue::Value(record.latency_us),
        MetricKind::CacheMisses => SeriesValue::Value(record.cache_misses as f64),
        MetricKind::L1Misses => SeriesValue::Value(record.l1_misses as f64),
        MetricKind::LlcMisses => SeriesValue::Value(record.llc_misses as f64),
        MetricKind::BytesTransferred => {
            SeriesValue::Value(bytes_transferred(record.throughput_gbps, duration_secs))
        }
        MetricKind::CyclesPerByte => {
            let bytes = bytes_transferred(record.throughput_gbps, duration_secs);
            cycles_per_byte(record.cycles, bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mode: TransferMode, msg_size: u64, threads: u64) -> RunRecord {
        RunRecord {
            mode,
            msg_size,
            threads,
            throughput_gbps: 1.0,
            latency_us: 0.0,
            cycles: 0,
            instructions: 0,
            cache_misses: 0,
            cache_references: 0,
            l1_misses: 0,
            llc_misses: 0,
            context_switches: 0,
        }
    }

    /// Records for every mode across the standard message-size sweep at the
    /// thread baseline.
    fn full_msgsize_grid() -> Vec<RunRecord> {
        let mut records = Vec::new();
        for mode in MODES {
            for &size in &defaults::MSG_SIZES {
                records.push(record(mode, size, defaults::BASELINE_THREADS));
            }
        }
        records
    }

    #[test]
    fn test_bytes_transferred_formula() {
        // 0.941 Gbps over 5 s: 0.941 * 5e9 / 8 bytes.
        let bytes = bytes_transferred(0.941, 5.0);
        assert!((bytes - 588_125_000.0).abs() < 1.0);
    }

    #[test]
    fn test_bytes_transferred_monotone_in_throughput() {
        let mut last = -1.0;
        for gbps in [0.0, 0.187, 0.941, 2.443, 30.998] {
            let bytes = bytes_transferred(gbps, 5.0);
            assert!(bytes > last);
            last = bytes;
        }
    }

    #[test]
    fn test_cycles_per_byte_undefined_on_zero_bytes() {
        assert_eq!(cycles_per_byte(1_000, 0.0), SeriesValue::Undefined);
        assert_eq!(
            cycles_per_byte(1_000, 500.0),
            SeriesValue::Value(2.0)
        );
    }

    #[test]
    fn test_select_unique_finds_single_match() {
        let records = full_msgsize_grid();
        let found = select_unique(
            &records,
            TransferMode::OneCopy,
            SweepAxis::MessageSize,
            1024,
            4,
        )
        .unwrap();
        assert_eq!(found.mode, TransferMode::OneCopy);
        assert_eq!(found.msg_size, 1024);
        assert_eq!(found.threads, 4);
    }

    #[test]
    fn test_missing_combination_is_error() {
        let mut records = full_msgsize_grid();
        records.retain(|r| !(r.mode == TransferMode::ZeroCopy && r.msg_size == 256));

        let err = build_table(
            &records,
            MetricKind::ThroughputGbps,
            SweepAxis::MessageSize,
            5.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AggregateError::MissingCombination {
                mode: TransferMode::ZeroCopy,
                axis: SweepAxis::MessageSize,
                sweep_value: 256,
                baseline: 4,
            }
        );
    }

    #[test]
    fn test_duplicate_combination_is_error_not_a_value() {
        let mut records = full_msgsize_grid();
        records.push(record(TransferMode::OneCopy, 1024, 4));

        let err = build_table(
            &records,
            MetricKind::ThroughputGbps,
            SweepAxis::MessageSize,
            5.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AggregateError::AmbiguousCombination {
                mode: TransferMode::OneCopy,
                axis: SweepAxis::MessageSize,
                sweep_value: 1024,
                baseline: 4,
                count: 2,
            }
        );
    }

    #[test]
    fn test_table_sequences_match_sweep_length() {
        let records = full_msgsize_grid();
        let table = build_table(
            &records,
            MetricKind::ThroughputGbps,
            SweepAxis::MessageSize,
            5.0,
        )
        .unwrap();

        assert_eq!(table.sweep, defaults::MSG_SIZES.to_vec());
        assert_eq!(table.series.len(), MODES.len());
        for values in table.series.values() {
            assert_eq!(values.len(), defaults::MSG_SIZES.len());
        }
    }

    #[test]
    fn test_thread_sweep_uses_msg_size_baseline() {
        let mut records = Vec::new();
        for mode in MODES {
            for &threads in &defaults::THREAD_COUNTS {
                let mut r = record(mode, defaults::BASELINE_MSG_SIZE, threads);
                r.latency_us = threads as f64;
                records.push(r);
            }
        }
        // A record off the baseline must not leak into the series.
        records.push(record(TransferMode::TwoCopy, 64, 1));

        let table =
            build_table(&records, MetricKind::LatencyUs, SweepAxis::ThreadCount, 5.0).unwrap();
        let two_copy = &table.series[&TransferMode::TwoCopy];
        assert_eq!(
            two_copy
                .iter()
                .map(|v| v.as_f64().unwrap())
                .collect::<Vec<_>>(),
            vec![1.0, 2.0, 4.0, 8.0]
        );
    }

    /// The zero-copy message-size sweep from a real experiment run, checked
    /// end to end through both derived metrics.
    #[test]
    fn test_zero_copy_derived_metrics_end_to_end() {
        let cycles = [
            40_543_575_711_u64,
            44_227_911_279,
            42_751_881_102,
            30_188_950_831,
        ];
        let throughput = [0.187, 0.941, 2.443, 30.998];

        let mut records = full_msgsize_grid();
        for (i, &size) in defaults::MSG_SIZES.iter().enumerate() {
            let r = records
                .iter_mut()
                .find(|r| r.mode == TransferMode::ZeroCopy && r.msg_size == size)
                .unwrap();
            r.cycles = cycles[i];
            r.throughput_gbps = throughput[i];
        }

        let bytes_table = build_table(
            &records,
            MetricKind::BytesTransferred,
            SweepAxis::MessageSize,
            5.0,
        )
        .unwrap();
        let cpb_table = build_table(
            &records,
            MetricKind::CyclesPerByte,
            SweepAxis::MessageSize,
            5.0,
        )
        .unwrap();

        let expected_bytes = [116_875_000.0, 588_125_000.0, 1_526_875_000.0, 19_373_750_000.0];
        let expected_cpb = [346.8, 75.2, 28.0, 1.56];

        let bytes = &bytes_table.series[&TransferMode::ZeroCopy];
        let cpb = &cpb_table.series[&TransferMode::ZeroCopy];
        for i in 0..4 {
            let b = bytes[i].as_f64().unwrap();
            let c = cpb[i].as_f64().unwrap();
            assert!(
                (b - expected_bytes[i]).abs() / expected_bytes[i] < 0.01,
                "bytes[{i}] = {b}"
            );
            assert!(
                (c - expected_cpb[i]).abs() / expected_cpb[i] < 0.01,
                "cycles_per_byte[{i}] = {c}"
            );
        }
    }

    #[test]
    fn test_zero_throughput_yields_undefined_point() {
        let mut records = full_msgsize_grid();
        records
            .iter_mut()
            .find(|r| r.mode == TransferMode::TwoCopy && r.msg_size == 64)
            .unwrap()
            .throughput_gbps = 0.0;

        let table = build_table(
            &records,
            MetricKind::CyclesPerByte,
            SweepAxis::MessageSize,
            5.0,
        )
        .unwrap();
        let two_copy = &table.series[&TransferMode::TwoCopy];
        assert_eq!(two_copy[0], SeriesValue::Undefined);
        assert!(two_copy[1].as_f64().is_some());
        // The undefined point never shortens the sequence.
        assert_eq!(two_copy.len(), defaults::MSG_SIZES.len());
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let records = full_msgsize_grid();
        let a = build_table(&records, MetricKind::ThroughputGbps, SweepAxis::MessageSize, 5.0)
            .unwrap();
        let b = build_table(&records, MetricKind::ThroughputGbps, SweepAxis::MessageSize, 5.0)
            .unwrap();
        assert_eq!(a.series, b.series);
        assert_eq!(a.sweep, b.sweep);
    }
}
