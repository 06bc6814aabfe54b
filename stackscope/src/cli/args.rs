//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::config::ProfilerConfig;

#[derive(Parser)]
#[command(
    name = "stackscope",
    about = "Sampling profiler: hot spots, call trees and lock owners from thread dumps",
    after_help = "\
EXAMPLES:
    stackscope run.json --packages 'com.example.*'           Replay a recording
    stackscope run.json --packages com.example --top 10      Exact package, top 10 methods
    stackscope run.json --config profiler.json --period-ms 20"
)]
pub struct Args {
    /// Recorded thread dumps to replay (JSON)
    #[arg(value_name = "REPLAY")]
    pub replay: PathBuf,

    /// Profiler configuration file (JSON); flags override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sampling period in milliseconds
    #[arg(long, value_name = "MS")]
    pub period_ms: Option<u64>,

    /// Thread and dependency refresh period in milliseconds
    #[arg(long, value_name = "MS")]
    pub refresh_ms: Option<u64>,

    /// Profiled packages, comma-separated (`com.foo` or `com.foo.*`)
    #[arg(short, long, value_delimiter = ',')]
    pub packages: Vec<String>,

    /// Stop after N seconds (0 = until the recording ends)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Methods shown per thread in the hot-spot table (0 = all)
    #[arg(long, default_value = "20")]
    pub top: usize,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Apply command-line overrides on top of `base`.
    #[must_use]
    pub fn apply(&self, mut base: ProfilerConfig) -> ProfilerConfig {
        if let Some(period) = self.period_ms {
            base.sampling_period_ms = period;
        }
        if let Some(refresh) = self.refresh_ms {
            base.refresh_period_ms = refresh;
        }
        for spec in &self.packages {
            base.profiled_packages.insert(spec);
        }
        base
    }
}
