//! # Command-Line Interface
//!
//! Argument parsing for the analysis pipeline. Defaults mirror the layout the
//! experiment runner leaves behind: a `raw_csvs/` directory holding the
//! combined results CSV and one `perf_*.txt` dump per run.

use clap::Parser;
use std::path::PathBuf;

/// Socket benchmark analysis - derive chart series from experiment output
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Experiment CSV with one row per benchmark run
    #[clap(short = 'r', long, default_value = crate::defaults::RESULTS_CSV)]
    pub results_csv: PathBuf,

    /// Directory scanned for perf counter dumps (perf_*.txt)
    #[clap(short = 'p', long, default_value = crate::defaults::PERF_DIR)]
    pub perf_dir: PathBuf,

    /// Output file for the analysis report (JSON format)
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// Also export the series tables as flat CSV to this path
    #[clap(long)]
    pub csv_export: Option<PathBuf>,

    /// Duration of each benchmark run, used to derive bytes transferred
    /// (e.g. "5s", "500ms", "2m")
    #[clap(short = 'd', long, value_parser = parse_duration_secs,
           default_value = "5s")]
    pub duration: f64,

    /// Skip the counter-dump merge and use counters from the CSV alone
    #[clap(long, default_value_t = false)]
    pub no_perf_merge: bool,

    /// Continue building remaining tables even if one fails to aggregate
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Parse a duration in seconds from a human-readable string
/// (e.g. "5s", "500ms", "2m"); a bare number means seconds
fn parse_duration_secs(s: &str) -> Result<f64, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let (num_str, scale) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, 0.001)
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1.0)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60.0)
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3600.0)
    } else {
        (s, 1.0) // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in duration: {num_str}"))?;

    if num <= 0.0 || !num.is_finite() {
        return Err(format!("duration must be positive: {s}"));
    }

    Ok(num * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("5s").unwrap(), 5.0);
        assert_eq!(parse_duration_secs("500ms").unwrap(), 0.5);
        assert_eq!(parse_duration_secs("2m").unwrap(), 120.0);
        assert_eq!(parse_duration_secs("1h").unwrap(), 3600.0);
        assert_eq!(parse_duration_secs("5").unwrap(), 5.0);

        assert!(parse_duration_secs("").is_err());
        assert!(parse_duration_secs("fast").is_err());
        assert!(parse_duration_secs("0s").is_err());
        assert!(parse_duration_secs("-5s").is_err());
    }
}
