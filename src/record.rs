//! # Run Records and CSV Ingestion
//!
//! One `RunRecord` exists per benchmark run: the experiment CSV supplies the
//! run parameters (mode, message size, thread count) and the application-side
//! measurements (throughput, latency); the counter dump supplies the hardware
//! counters, merged in by run key. Records are built once and never mutated
//! after the merge step; aggregation only reads them.

use crate::perf::CounterMetrics;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Data-movement strategy under test
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Plain `send`/`recv` through userspace buffers
    TwoCopy,
    /// Scatter-gather I/O via `sendmsg`
    OneCopy,
    /// Kernel-assisted transmission with `MSG_ZEROCOPY`
    ZeroCopy,
}

/// All modes, in the order charts present them
pub const MODES: [TransferMode; 3] = [
    TransferMode::TwoCopy,
    TransferMode::OneCopy,
    TransferMode::ZeroCopy,
];

impl TransferMode {
    /// The identifier used in CSV cells and dump filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::TwoCopy => "two_copy",
            TransferMode::OneCopy => "one_copy",
            TransferMode::ZeroCopy => "zero_copy",
        }
    }
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "two_copy" => Ok(TransferMode::TwoCopy),
            "one_copy" => Ok(TransferMode::OneCopy),
            "zero_copy" => Ok(TransferMode::ZeroCopy),
            other => bail!("unknown transfer mode: {other:?}"),
        }
    }
}

/// Identity of one benchmark run within the parameter grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub mode: TransferMode,
    pub msg_size: u64,
    pub threads: u64,
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(mode={}, msg_size={}, threads={})",
            self.mode, self.msg_size, self.threads
        )
    }
}

/// Measurements for one benchmark run
///
/// The counter columns are optional in the CSV (they default to zero) because
/// the experiment runner may leave counter integration entirely to the dump
/// merge step. `latency_us` is likewise optional: throughput-focused runs do
/// not always record it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub mode: TransferMode,
    pub msg_size: u64,
    pub threads: u64,
    pub throughput_gbps: f64,
    #[serde(default)]
    pub latency_us: f64,
    #[serde(default)]
    pub cycles: u64,
    #[serde(default)]
    pub instructions: u64,
    #[serde(default)]
    pub cache_misses: u64,
    #[serde(default)]
    pub cache_references: u64,
    #[serde(default)]
    pub l1_misses: u64,
    #[serde(default)]
    pub llc_misses: u64,
    #[serde(default)]
    pub context_switches: u64,
}

impl RunRecord {
    /// The run's position in the parameter grid
    pub fn key(&self) -> RunKey {
        RunKey {
            mode: self.mode,
            msg_size: self.msg_size,
            threads: self.threads,
        }
    }

    /// Overlay counters extracted from a dump onto this record
    pub fn apply_counters(&mut self, counters: &CounterMetrics) {
        self.cycles = counters.cycles;
        self.instructions = counters.instructions;
        self.cache_misses = counters.cache_misses;
        self.cache_references = counters.cache_references;
        self.l1_misses = counters.l1_misses;
        self.llc_misses = counters.llc_misses;
        self.context_switches = counters.context_switches;
    }

    fn validate(&self) -> Result<()> {
        if self.msg_size == 0 {
            bail!("msg_size must be positive");
        }
        if self.threads == 0 {
            bail!("threads must be positive");
        }
        if self.throughput_gbps < 0.0 || !self.throughput_gbps.is_finite() {
            bail!("throughput_gbps must be finite and non-negative");
        }
        Ok(())
    }
}

/// Load all run records from the experiment CSV
///
/// Required columns: `mode`, `msg_size`, `threads`, `throughput_gbps`.
/// Optional columns (`latency_us` and the seven counters) default to zero.
/// An unreadable file or a malformed row is a hard error: without the CSV
/// there are no usable records at all.
pub fn load_records(path: &Path) -> Result<Vec<RunRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open experiment CSV {}", path.display()))?;

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<RunRecord>().enumerate() {
        // Header is line 1, first data row is line 2.
        let line = index + 2;
        let record = row.with_context(|| {
            format!("malformed row at {}:{line}", path.display())
        })?;
        record
            .validate()
            .with_context(|| format!("invalid row at {}:{line}", path.display()))?;
        records.push(record);
    }

    debug!("loaded {} run records from {}", records.len(), path.display());
    Ok(records)
}

/// Merge extracted counters into the record matching `key`
///
/// Returns `false` when no record matches, letting the caller report the
/// orphaned dump. A dump matching multiple records overlays all of them; the
/// duplicate itself is caught later by aggregation's exactly-one contract.
pub fn merge_counters(records: &mut [RunRecord], key: RunKey, counters: &CounterMetrics) -> bool {
    let mut matched = false;
    for record in records.iter_mut().filter(|r| r.key() == key) {
        record.apply_counters(counters);
        matched = true;
    }
    matched
}
