//! # Performance Counter Extraction
//!
//! Parses raw `perf stat` dump text into typed counter values. The profiler
//! interleaves many unrelated metrics, banner lines, and diagnostics in no
//! fixed order, and formats numbers with locale thousands separators, so the
//! extractor matches each known label by "number directly preceding the
//! label, anywhere in the document" rather than by line or column position.
//! This tolerates formatting drift across profiler versions.
//!
//! A counter label that never appears in a dump is not a parse failure: the
//! profiler legitimately omits counters it was not asked to collect (or that
//! the hardware does not expose), and the corresponding field stays zero.

use crate::record::{RunKey, TransferMode};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Hardware and OS counters extracted from one profiler dump
///
/// Every field defaults to zero when its label is absent from the raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterMetrics {
    pub cycles: u64,
    pub instructions: u64,
    pub cache_misses: u64,
    pub cache_references: u64,
    pub l1_misses: u64,
    pub llc_misses: u64,
    pub context_switches: u64,
}

/// The counters the extractor recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterKind {
    Cycles,
    Instructions,
    CacheMisses,
    CacheReferences,
    L1Misses,
    LlcMisses,
    ContextSwitches,
}

/// Declarative counter-to-label mapping
///
/// Labels are the event names as `perf stat` prints them. Adding a counter
/// means adding a row here and a field on `CounterMetrics`; the matching
/// logic itself never changes.
const COUNTER_LABELS: [(CounterKind, &str); 7] = [
    (CounterKind::Cycles, "cycles"),
    (CounterKind::Instructions, "instructions"),
    (CounterKind::CacheMisses, "cache-misses"),
    (CounterKind::CacheReferences, "cache-references"),
    (CounterKind::L1Misses, "L1-dcache-load-misses"),
    (CounterKind::LlcMisses, "LLC-load-misses"),
    (CounterKind::ContextSwitches, "context-switches"),
];

/// Compiled recognition patterns, built once on first use
fn counter_patterns() -> &'static Vec<(CounterKind, Regex)> {
    static PATTERNS: OnceLock<Vec<(CounterKind, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        COUNTER_LABELS
            .iter()
            .map(|&(kind, label)| {
                let pattern = format!(r"([\d,]+)\s+{}", regex::escape(label));
                // The pattern is assembled from compile-time constants, so
                // compilation cannot fail at runtime.
                (kind, Regex::new(&pattern).unwrap())
            })
            .collect()
    })
}

impl CounterMetrics {
    fn field_mut(&mut self, kind: CounterKind) -> &mut u64 {
        match kind {
            CounterKind::Cycles => &mut self.cycles,
            CounterKind::Instructions => &mut self.instructions,
            CounterKind::CacheMisses => &mut self.cache_misses,
            CounterKind::CacheReferences => &mut self.cache_references,
            CounterKind::L1Misses => &mut self.l1_misses,
            CounterKind::LlcMisses => &mut self.llc_misses,
            CounterKind::ContextSwitches => &mut self.context_switches,
        }
    }
}

/// Parse one raw counter-dump document into a `CounterMetrics` record
///
/// For each recognized label, the first occurrence of a number immediately
/// preceding that label (anywhere in the document) wins. Thousands
/// separators are stripped from the numeric token before conversion.
/// Absent labels leave the field at zero.
///
/// Pure and idempotent: the same text always yields the same record.
pub fn parse_counter_dump(text: &str) -> CounterMetrics {
    let mut metrics = CounterMetrics::default();

    for (kind, pattern) in counter_patterns() {
        if let Some(captures) = pattern.captures(text) {
            let digits: String = captures[1].chars().filter(|c| *c != ',').collect();
            // A digits-only token can still overflow u64; such a token is
            // treated the same as an absent counter.
            if let Ok(value) = digits.parse::<u64>() {
                *metrics.field_mut(*kind) = value;
            }
        }
    }

    metrics
}

/// Read and parse a counter-dump file
///
/// An unreadable file is an error carrying the failing path. Callers are
/// expected to log it and continue the batch; one bad dump must not stop
/// processing of the others.
pub fn read_counter_file(path: &Path) -> Result<CounterMetrics> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read counter dump {}", path.display()))?;
    Ok(parse_counter_dump(&text))
}

/// Recover the run key from a dump filename
///
/// The experiment runner names dumps `perf_<mode>_<msg_size>t<threads>.txt`,
/// e.g. `perf_zero_copy_1024t4.txt`. Returns `None` for filenames that do
/// not follow the convention, letting the caller report and skip them.
pub fn dump_run_key(path: &Path) -> Option<RunKey> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let name_re =
        NAME.get_or_init(|| Regex::new(r"^perf_([a-z_]+)_(\d+)t(\d+)\.txt$").unwrap());

    let file_name = path.file_name()?.to_str()?;
    let captures = name_re.captures(file_name)?;

    let mode: TransferMode = captures[1].parse().ok()?;
    let msg_size: u64 = captures[2].parse().ok()?;
    let threads: u64 = captures[3].parse().ok()?;

    Some(RunKey {
        mode,
        msg_size,
        threads,
    })
}

/// List the counter dumps under `dir`, sorted by filename
///
/// Only `perf_*.txt` entries are considered; everything else in the
/// directory (the CSV, runner logs) is ignored. Sorting keeps the batch
/// order, and therefore the skip list, deterministic across runs.
pub fn collect_dumps(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read dump directory {}", dir.display()))?;

    let mut dumps = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.starts_with("perf_") && name.ends_with(".txt") {
            dumps.push(path);
        }
    }

    dumps.sort();
    Ok(dumps)
}
