//! # stackscope - Main Entry Point
//!
//! Replays a recording through the profiler at its configured periods, then
//! prints hot spots, call trees and the thread view.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::TryRecvError;
use log::{info, warn};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stackscope::classification::diagnostics;
use stackscope::cli::Args;
use stackscope::config::ProfilerConfig;
use stackscope::profiling::{
    display_statistics, write_call_trees, write_hot_spots, write_threads, Profiler,
};
use stackscope::replay::ReplayIntrospector;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("must be positive") || msg.contains("invalid configuration") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn load_config(path: Option<&Path>) -> Result<ProfilerConfig> {
    let Some(path) = path else {
        return Ok(ProfilerConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let config = args.apply(load_config(args.config.as_deref())?);
    config.validate()?;
    if config.profiled_packages.is_empty() {
        warn!("No profiled packages selected, the profile will stay empty");
    }

    let introspector = ReplayIntrospector::from_file(&args.replay)
        .with_context(|| format!("Failed to load recording: {}", args.replay.display()))?;

    if !quiet {
        println!("stackscope v{}", env!("CARGO_PKG_VERSION"));
        println!("replay: {} ({} ticks)", args.replay.display(), introspector.len());
        println!("sampling: every {}ms", config.sampling_period_ms);
    }

    let profiler = Profiler::new(Arc::new(introspector), config);
    profiler.resume_sampling()?;
    profiler.start_refresh()?;

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let profiling_start = Instant::now();
    let duration_limit =
        if args.duration > 0 { Some(Duration::from_secs(args.duration)) } else { None };

    // Track why we exited the loop
    let mut exit_reason = "interrupted".to_string();

    loop {
        if let Some(limit) = duration_limit {
            if profiling_start.elapsed() >= limit {
                exit_reason = "duration limit reached".to_string();
                break;
            }
        }

        // A task that stopped itself means the recording ran out
        match profiler.faults().try_recv() {
            Ok(fault) => {
                info!("{} task stopped: {}", fault.task, fault.message);
                exit_reason = fault.message;
                break;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                exit_reason = "profiler shut down".to_string();
                break;
            }
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {}
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    profiler.suspend_sampling();
    profiler.stop_refresh();

    if !quiet {
        eprintln!(
            "\n{exit_reason}: {:.1}s, profile version {}",
            profiling_start.elapsed().as_secs_f64(),
            profiler.profile().version()
        );
        display_statistics(diagnostics());
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let profile = profiler.profile();
    write_hot_spots(&mut out, &profile, args.top).context("Failed to write hot spots")?;
    write_call_trees(&mut out, &profile).context("Failed to write call trees")?;
    write_threads(&mut out, &profiler.threads()).context("Failed to write thread view")?;
    out.flush().context("Failed to flush report")?;

    Ok(())
}
