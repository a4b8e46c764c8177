//! # Socket Benchmark Analysis Library
//!
//! An analysis pipeline for socket-transfer benchmark results, implemented in Rust.
//! This library ingests raw `perf stat` counter dumps and per-run CSV measurements
//! produced by a network I/O experiment, and turns them into the ordered data
//! series behind a fixed set of comparison charts.
//!
//! ## The Experiment
//!
//! The upstream benchmarks exercise three data-movement strategies for pushing
//! bytes through a socket:
//!
//! - **Two-Copy**: plain `send`/`recv` through userspace buffers
//! - **One-Copy**: scatter-gather I/O via `sendmsg`
//! - **Zero-Copy**: kernel-assisted transmission with `MSG_ZEROCOPY`
//!
//! Each strategy is swept across message sizes (with thread count held at a
//! baseline) and across thread counts (with message size held at a baseline).
//! Every run leaves behind one CSV row of application metrics and one raw
//! counter dump from the profiler.
//!
//! ## Architecture Overview
//!
//! The library is organized into several key modules:
//!
//! - `perf`: Counter extraction from raw profiler dump text
//! - `record`: The per-run data model, CSV ingestion, and counter merging
//! - `aggregate`: Series assembly across (mode, sweep value) combinations and
//!   derived-metric computation
//! - `report`: Report assembly, JSON/CSV output, and skip-list bookkeeping
//! - `cli`: Command-line interface parsing and configuration management
//! - `utils`: Formatting helpers for human-readable log output
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sockbench_report::{
//!     aggregate::{build_table, MetricKind, SweepAxis},
//!     record::load_records,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let records = load_records("raw_csvs/combined_results.csv".as_ref())?;
//!     let table = build_table(
//!         &records,
//!         MetricKind::ThroughputGbps,
//!         SweepAxis::MessageSize,
//!         sockbench_report::defaults::RUN_DURATION_SECS,
//!     )?;
//!
//!     println!("throughput series: {:?}", table.series);
//!     Ok(())
//! }
//! ```
//!
//! ## Processing Model
//!
//! The pipeline is single-threaded and synchronous. Each dump is parsed to
//! completion before the next, and aggregation is a pure in-memory transform
//! over already-loaded records. Per-document failures are isolated: one
//! unreadable dump is logged and skipped, never aborting the batch.

/// Counter extraction from raw profiler output
///
/// Parses unstructured `perf stat` dump text into typed counter values by
/// matching each known metric label anywhere in the document. Handles:
/// - Locale thousands separators in numeric tokens
/// - Arbitrary line order and surrounding banner text
/// - Absent counters (reported as zero, by design)
/// - Run-key recovery from dump filenames for CSV merging
pub mod perf;

/// Per-run data model and CSV ingestion
///
/// Defines the `RunRecord` produced for every benchmark run and the
/// `TransferMode` under test. Loads records from the experiment CSV using
/// serde-backed deserialization and overlays extracted counters onto the
/// matching rows.
pub mod record;

/// Series assembly and derived metrics
///
/// Groups run records by (mode, sweep value, baseline), enforcing the
/// exactly-one-match contract, and produces `SeriesTable`s positionally
/// aligned with the sweep lists. Computes derived quantities:
/// - Bytes transferred from measured throughput over the run duration
/// - Cycles per byte, with explicit undefined points on zero transfer
pub mod aggregate;

/// Report assembly and output
///
/// Collects per-metric series tables into a single analysis report with
/// metadata (timestamp, system info, skipped inputs) and writes it as
/// pretty-printed JSON, optionally exporting the series as flat CSV for
/// external plotting tools.
pub mod report;

/// Command-line interface and configuration
///
/// Provides argument parsing using clap and converts user-friendly CLI
/// options into the pipeline configuration. Includes duration parsing with
/// human-readable formats (e.g., "5s", "2m").
pub mod cli;

pub mod utils;

// Re-export key types for convenient library usage
pub use aggregate::{AggregateError, MetricKind, SeriesTable, SeriesValue, SweepAxis};
pub use perf::CounterMetrics;
pub use record::{RunRecord, TransferMode};
pub use report::{AnalysisReport, ReportManager};

/// The current version of the analysis pipeline
///
/// This version string is automatically populated from Cargo.toml and used
/// in report output for reproducibility and debugging purposes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// The sweep lists and baselines mirror the parameter grid the experiment
/// runner actually executes; they can be overridden on the command line for
/// partial reruns.
pub mod defaults {
    /// Message sizes swept while thread count is held at the baseline
    ///
    /// Powers of four from 64 bytes to 8 KiB, spanning the range from
    /// syscall-dominated small messages to copy-dominated large ones.
    pub const MSG_SIZES: [u64; 4] = [64, 256, 1024, 8192];

    /// Thread counts swept while message size is held at the baseline
    pub const THREAD_COUNTS: [u64; 4] = [1, 2, 4, 8];

    /// Thread count held fixed while sweeping message size
    pub const BASELINE_THREADS: u64 = 4;

    /// Message size held fixed while sweeping thread count
    pub const BASELINE_MSG_SIZE: u64 = 1024;

    /// Duration of each benchmark run in seconds
    ///
    /// Bytes transferred is derived from measured throughput over this
    /// window, so it must match what the experiment runner used.
    pub const RUN_DURATION_SECS: f64 = 5.0;

    /// Default experiment CSV produced by the benchmark runner
    pub const RESULTS_CSV: &str = "raw_csvs/combined_results.csv";

    /// Default directory scanned for `perf_*.txt` counter dumps
    pub const PERF_DIR: &str = "raw_csvs";

    /// Default output file name
    ///
    /// The report is written in JSON format for easy consumption by the
    /// external chart-rendering step.
    pub const OUTPUT_FILE: &str = "analysis_report.json";
}
