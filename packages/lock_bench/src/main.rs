//! Lock-contention micro-benchmark.
//!
//! Worker threads hammer a table of reader-writer-locked pages with a
//! Zipf-skewed mix of reads and writes; the harness reports either aggregate
//! throughput or a per-operation-kind percentile latency table.
//!
//! ```text
//! lock_bench --thread-num 8 --skew-parameter 1.2 --timeout 30
//! lock_bench --thread-num 8 --throughput --csv
//! ```
//!
//! Diagnostics go to stderr and are controlled via `RUST_LOG`; results go to
//! stdout.

mod engine;
mod target;

use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use ops_bench::{BenchConfig, Benchmarker, DEFAULT_TARGET_PERCENTILES};
use tracing_subscriber::EnvFilter;

use crate::engine::ZipfEngine;
use crate::target::PageTable;

/// The size of the page table every run contends on.
const PAGE_NUM: usize = 4096;

#[derive(Debug, Parser)]
#[command(about = "Measures lock contention on a table of reader-writer pages")]
struct Cli {
    /// Number of worker threads.
    #[arg(long, default_value_t = 1)]
    thread_num: usize,

    /// Base random seed; leave empty to seed from OS entropy.
    #[arg(long, default_value = "")]
    random_seed: String,

    /// Print throughput instead of percentile latency.
    #[arg(long)]
    throughput: bool,

    /// Emit machine-parseable CSV instead of human-readable text.
    #[arg(long)]
    csv: bool,

    /// Seconds until running workers are cancelled.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Comma-separated quantiles for the latency table.
    #[arg(long, default_value = "")]
    target_latency: String,

    /// Zipf skew of the page-access distribution; 0 is uniform.
    #[arg(long, default_value_t = 1.0)]
    skew_parameter: f64,

    /// Operations issued per worker.
    #[arg(long, default_value_t = 1_000_000)]
    exec_num: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(&Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERROR: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = build_config(cli)?;

    let target = PageTable::new(PAGE_NUM);
    let engine = ZipfEngine::new(PAGE_NUM, cli.skew_parameter, cli.exec_num)?;

    let report = Benchmarker::new(&target, &engine, config)?.run()?;
    report.print()?;

    Ok(())
}

fn build_config(cli: &Cli) -> ops_bench::Result<BenchConfig> {
    let thread_num = ops_bench::parse_thread_num(cli.thread_num)?;
    let seed = ops_bench::parse_seed(&cli.random_seed)?;
    let target_percentiles = if cli.target_latency.is_empty() {
        DEFAULT_TARGET_PERCENTILES.to_vec()
    } else {
        ops_bench::parse_percentiles(&cli.target_latency)?
    };

    let mut config = BenchConfig::new()
        .with_thread_num(thread_num)
        .with_measure_throughput(cli.throughput)
        .with_output_as_csv(cli.csv)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_target_percentiles(target_percentiles);

    if let Some(seed) = seed {
        config = config.with_random_seed(seed);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("lock_bench").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_are_a_valid_configuration() {
        let config = build_config(&cli(&[])).unwrap();

        assert_eq!(config.thread_num().get(), 1);
        assert!(!config.measure_throughput());
        assert!(!config.output_as_csv());
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.random_seed(), None);
        assert_eq!(config.target_percentiles(), DEFAULT_TARGET_PERCENTILES);
    }

    #[test]
    fn flags_map_onto_the_configuration() {
        let config = build_config(&cli(&[
            "--thread-num",
            "8",
            "--random-seed",
            "42",
            "--throughput",
            "--csv",
            "--timeout",
            "3",
            "--target-latency",
            "0.5,0.99",
        ]))
        .unwrap();

        assert_eq!(config.thread_num().get(), 8);
        assert_eq!(config.random_seed(), Some(42));
        assert!(config.measure_throughput());
        assert!(config.output_as_csv());
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.target_percentiles(), [0.5, 0.99]);
    }

    #[test]
    fn invalid_flag_values_are_rejected() {
        assert!(build_config(&cli(&["--thread-num", "0"])).is_err());
        assert!(build_config(&cli(&["--random-seed", "not-a-seed"])).is_err());
        assert!(build_config(&cli(&["--target-latency", "0.99,0.5"])).is_err());
    }
}
