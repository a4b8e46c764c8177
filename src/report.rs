//! # Report Assembly and Output
//!
//! Collects the series tables built by aggregation into a single analysis
//! report, together with everything a reader needs to trust the numbers:
//! tool version, timestamp, system information, the run duration the derived
//! metrics assumed, and an explicit list of inputs that were skipped and
//! tables that failed. The report is written as pretty-printed JSON; the
//! series can additionally be exported as flat CSV for external plotting.
//!
//! The pipeline as a whole succeeds with a non-empty skip list; partial
//! failure is normal for a batch of files. It hard-fails only when no usable
//! records exist at all.

use crate::aggregate::{MetricKind, SeriesTable, SweepAxis};
use crate::record::TransferMode;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An input document that was skipped, and why
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedInput {
    pub path: String,
    pub reason: String,
}

/// A series table whose aggregation failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTable {
    pub metric: MetricKind,
    pub axis: SweepAxis,
    pub error: String,
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub analysis_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            analysis_version: crate::VERSION.to_string(),
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub run_duration_secs: f64,
    pub total_records: usize,
    pub system_info: SystemInfo,
}

/// Headline numbers across all tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub tables_built: usize,
    pub tables_failed: usize,
    pub inputs_skipped: usize,
    pub dumps_merged: usize,
    /// Highest throughput observed in any throughput series, and where
    pub peak_throughput_gbps: Option<f64>,
    pub peak_throughput_mode: Option<TransferMode>,
}

/// The complete analysis output handed to the rendering step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub tables: Vec<SeriesTable>,
    pub skipped_inputs: Vec<SkippedInput>,
    pub failed_tables: Vec<FailedTable>,
    pub summary: ReportSummary,
}

/// Accumulates pipeline output and writes the final report
pub struct ReportManager {
    output_file: PathBuf,
    tables: Vec<SeriesTable>,
    skipped: Vec<SkippedInput>,
    failed: Vec<FailedTable>,
    total_records: usize,
    dumps_merged: usize,
}

impl ReportManager {
    /// Create a new report manager writing to `output_file`
    pub fn new(output_file: &Path) -> Self {
        Self {
            output_file: output_file.to_path_buf(),
            tables: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            total_records: 0,
            dumps_merged: 0,
        }
    }

    /// Record how many run records the CSV supplied
    pub fn set_total_records(&mut self, count: usize) {
        self.total_records = count;
    }

    /// Count one counter dump successfully merged into a record
    pub fn count_merged_dump(&mut self) {
        self.dumps_merged += 1;
    }

    /// Add a completed series table
    pub fn add_table(&mut self, table: SeriesTable) {
        debug!("adding {} table over {}", table.metric, table.axis);
        self.tables.push(table);
    }

    /// Record a skipped input document
    pub fn record_skip(&mut self, path: &Path, reason: String) {
        self.skipped.push(SkippedInput {
            path: path.display().to_string(),
            reason,
        });
    }

    /// Record a table whose aggregation failed
    pub fn record_table_failure(&mut self, metric: MetricKind, axis: SweepAxis, error: String) {
        self.failed.push(FailedTable {
            metric,
            axis,
            error,
        });
    }

    /// Assemble the report and write it as pretty JSON
    ///
    /// Hard-fails when no usable records exist at all; a non-empty skip or
    /// failure list alone is still a successful run.
    pub fn finalize(&self, run_duration_secs: f64) -> Result<AnalysisReport> {
        if self.total_records == 0 {
            bail!("no usable run records; nothing to report");
        }

        let report = AnalysisReport {
            metadata: ReportMetadata {
                version: crate::VERSION.to_string(),
                timestamp: chrono::Utc::now(),
                run_duration_secs,
                total_records: self.total_records,
                system_info: SystemInfo::default(),
            },
            tables: self.tables.clone(),
            skipped_inputs: self.skipped.clone(),
            failed_tables: self.failed.clone(),
            summary: self.build_summary(),
        };

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&self.output_file, json)
            .with_context(|| format!("failed to write report to {}", self.output_file.display()))?;

        info!("report written to {}", self.output_file.display());
        Ok(report)
    }

    /// Export every series as flat CSV for external plotting tools
    ///
    /// One row per (table, mode, sweep value); undefined points become empty
    /// cells so spreadsheet tools show gaps rather than zeros.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create CSV export {}", path.display()))?;

        writer.write_record(["metric", "axis", "baseline", "mode", "sweep_value", "value"])?;
        for table in &self.tables {
            for (mode, values) in &table.series {
                for (i, value) in values.iter().enumerate() {
                    let cell = match value.as_f64() {
                        Some(v) => v.to_string(),
                        None => String::new(),
                    };
                    writer.write_record([
                        table.metric.to_string(),
                        table.axis.to_string(),
                        table.baseline.to_string(),
                        mode.to_string(),
                        table.sweep[i].to_string(),
                        cell,
                    ])?;
                }
            }
        }

        writer.flush()?;
        info!("series exported to {}", path.display());
        Ok(())
    }

    fn build_summary(&self) -> ReportSummary {
        let mut peak: Option<(f64, TransferMode)> = None;
        for table in &self.tables {
            if table.metric != MetricKind::ThroughputGbps {
                continue;
            }
            for (mode, values) in &table.series {
                for value in values.iter().filter_map(|v| v.as_f64()) {
                    if peak.map_or(true, |(best, _)| value > best) {
                        peak = Some((value, *mode));
                    }
                }
            }
        }

        ReportSummary {
            tables_built: self.tables.len(),
            tables_failed: self.failed.len(),
            inputs_skipped: self.skipped.len(),
            dumps_merged: self.dumps_merged,
            peak_throughput_gbps: peak.map(|(v, _)| v),
            peak_throughput_mode: peak.map(|(_, m)| m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SeriesValue;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn throughput_table() -> SeriesTable {
        let mut series = BTreeMap::new();
        series.insert(
            TransferMode::TwoCopy,
            vec![SeriesValue::Value(0.34), SeriesValue::Value(21.402)],
        );
        series.insert(
            TransferMode::OneCopy,
            vec![SeriesValue::Value(0.276), SeriesValue::Value(38.681)],
        );
        SeriesTable {
            metric: MetricKind::ThroughputGbps,
            axis: SweepAxis::MessageSize,
            baseline: 4,
            sweep: vec![64, 8192],
            series,
        }
    }

    #[test]
    fn test_finalize_writes_report_json() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report.json");

        let mut manager = ReportManager::new(&out);
        manager.set_total_records(8);
        manager.add_table(throughput_table());
        manager.record_skip(Path::new("raw_csvs/perf_bad.txt"), "unreadable".into());

        let report = manager.finalize(5.0).unwrap();
        assert_eq!(report.metadata.total_records, 8);
        assert_eq!(report.summary.tables_built, 1);
        assert_eq!(report.summary.inputs_skipped, 1);
        assert_eq!(report.summary.peak_throughput_gbps, Some(38.681));
        assert_eq!(report.summary.peak_throughput_mode, Some(TransferMode::OneCopy));

        let written: AnalysisReport =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written.tables.len(), 1);
        assert_eq!(written.tables[0].sweep, vec![64, 8192]);
    }

    #[test]
    fn test_finalize_fails_with_no_records() {
        let dir = tempdir().unwrap();
        let manager = ReportManager::new(&dir.path().join("report.json"));
        let err = manager.finalize(5.0).unwrap_err().to_string();
        assert!(err.contains("no usable run records"));
    }

    #[test]
    fn test_csv_export_blanks_undefined_points() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("series.csv");

        let mut series = BTreeMap::new();
        series.insert(
            TransferMode::ZeroCopy,
            vec![SeriesValue::Undefined, SeriesValue::Value(1.56)],
        );
        let table = SeriesTable {
            metric: MetricKind::CyclesPerByte,
            axis: SweepAxis::MessageSize,
            baseline: 4,
            sweep: vec![64, 8192],
            series,
        };

        let mut manager = ReportManager::new(&dir.path().join("report.json"));
        manager.add_table(table);
        manager.export_csv(&out).unwrap();

        let contents = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "metric,axis,baseline,mode,sweep_value,value");
        assert_eq!(lines[1], "cycles_per_byte,msg_size,4,zero_copy,64,");
        assert_eq!(lines[2], "cycles_per_byte,msg_size,4,zero_copy,8192,1.56");
    }
}
