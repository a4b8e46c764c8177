//! # Socket Benchmark Analysis - Main Entry Point
//!
//! Batch driver for the analysis pipeline. One invocation:
//!
//! 1. **Initialize logging**: structured logging with tracing, level
//!    controlled via `RUST_LOG` (or `-v` for debug output)
//! 2. **Load the experiment CSV**: one `RunRecord` per benchmark run; this is
//!    the one input the pipeline cannot proceed without
//! 3. **Merge counter dumps**: scan the dump directory, extract counters from
//!    each `perf_*.txt`, and overlay them onto the matching records; an
//!    unreadable or unmatched dump is logged and skipped, never fatal
//! 4. **Build series tables**: one per standard chart; an aggregation failure
//!    stops the run unless `--continue-on-error` records it and moves on
//! 5. **Write the report**: JSON, with the skip list and failed-table list,
//!    plus an optional flat CSV export of the series

use anyhow::Result;
use clap::Parser;
use sockbench_report::{
    aggregate::{build_table, MetricKind, SweepAxis},
    cli::Args,
    perf::{collect_dumps, dump_run_key, read_counter_file},
    record::{load_records, merge_counters},
    report::ReportManager,
    utils::format_count,
};
use tracing::{debug, error, info, warn};

/// The standard charts, in report order
///
/// Message-size sweeps run at the thread baseline; the latency chart sweeps
/// threads at the message-size baseline.
const CHARTS: [(MetricKind, SweepAxis); 6] = [
    (MetricKind::ThroughputGbps, SweepAxis::MessageSize),
    (MetricKind::LatencyUs, SweepAxis::ThreadCount),
    (MetricKind::CacheMisses, SweepAxis::MessageSize),
    (MetricKind::L1Misses, SweepAxis::MessageSize),
    (MetricKind::LlcMisses, SweepAxis::MessageSize),
    (MetricKind::CyclesPerByte, SweepAxis::MessageSize),
];

fn main() -> Result<()> {
    let args = Args::parse();

    // Log level comes from RUST_LOG when set; -v bumps the default to debug.
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    info!("starting socket benchmark analysis");
    debug!("configuration: {:?}", args);

    let mut manager = ReportManager::new(&args.output_file);

    // The CSV is the backbone of the data set: without it there are no
    // usable records at all, so failure here is fatal.
    let mut records = load_records(&args.results_csv)?;
    manager.set_total_records(records.len());
    info!(
        "loaded {} run records from {}",
        records.len(),
        args.results_csv.display()
    );

    if !args.no_perf_merge {
        merge_dump_directory(&args, &mut records, &mut manager);
    }

    // Build the standard chart tables. Each table either lands in the report
    // or, under --continue-on-error, in its failed-tables list.
    for (metric, axis) in CHARTS {
        match build_table(&records, metric, axis, args.duration) {
            Ok(table) => {
                info!("built {metric} series over {axis}");
                manager.add_table(table);
            }
            Err(e) => {
                error!("failed to build {metric} series over {axis}: {e}");
                if !args.continue_on_error {
                    return Err(e.into());
                }
                manager.record_table_failure(metric, axis, e.to_string());
            }
        }
    }

    let report = manager.finalize(args.duration)?;

    if let Some(ref csv_path) = args.csv_export {
        manager.export_csv(csv_path)?;
    }

    if let (Some(gbps), Some(mode)) = (
        report.summary.peak_throughput_gbps,
        report.summary.peak_throughput_mode,
    ) {
        info!("peak throughput: {gbps} Gbps ({mode})");
    }
    info!(
        "analysis complete: {} tables built, {} failed, {} inputs skipped",
        report.summary.tables_built,
        report.summary.tables_failed,
        report.summary.inputs_skipped,
    );

    Ok(())
}

/// Scan the dump directory and overlay extracted counters onto the records
///
/// Every failure mode here is isolated: a missing directory, an unreadable
/// dump, an unrecognized filename, or a dump with no matching CSV row is
/// logged, recorded in the report's skip list, and the batch continues.
fn merge_dump_directory(
    args: &Args,
    records: &mut [sockbench_report::RunRecord],
    manager: &mut ReportManager,
) {
    let dumps = match collect_dumps(&args.perf_dir) {
        Ok(dumps) => dumps,
        Err(e) => {
            warn!("{e:#}; continuing with counters from the CSV alone");
            manager.record_skip(&args.perf_dir, format!("{e:#}"));
            return;
        }
    };
    info!(
        "found {} counter dumps in {}",
        dumps.len(),
        args.perf_dir.display()
    );

    for dump in &dumps {
        let key = match dump_run_key(dump) {
            Some(key) => key,
            None => {
                warn!("skipping {}: filename does not name a run", dump.display());
                manager.record_skip(dump, "filename does not name a run".into());
                continue;
            }
        };

        let counters = match read_counter_file(dump) {
            Ok(counters) => counters,
            Err(e) => {
                warn!("skipping unreadable dump: {e:#}");
                manager.record_skip(dump, format!("{e:#}"));
                continue;
            }
        };

        if merge_counters(records, key, &counters) {
            debug!(
                "merged {}: cycles={}, cache_misses={}",
                key,
                format_count(counters.cycles),
                format_count(counters.cache_misses),
            );
            manager.count_merged_dump();
        } else {
            warn!("dump {} matches no CSV row {}", dump.display(), key);
            manager.record_skip(dump, format!("no CSV row matches {key}"));
        }
    }
}
