use std::num::NonZero;
use std::time::Duration;

use new_zealand::nz;

use crate::{Error, Result};

/// The largest worker thread count a run may be configured with.
pub const MAX_THREAD_COUNT: usize = 1024;

/// The quantiles reported when none are configured explicitly.
pub const DEFAULT_TARGET_PERCENTILES: [f64; 10] =
    [0.0, 0.25, 0.50, 0.75, 0.90, 0.95, 0.99, 0.999, 0.9999, 1.0];

/// Configuration of a benchmark run.
///
/// Values are set fluently and validated as a whole when the run is
/// constructed, so a rejected configuration never spawns a worker:
///
/// ```
/// use std::time::Duration;
///
/// use new_zealand::nz;
/// use ops_bench::BenchConfig;
///
/// let config = BenchConfig::new()
///     .with_thread_num(nz!(4))
///     .with_timeout(Duration::from_secs(30))
///     .with_random_seed(42)
///     .with_measure_throughput(true);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    thread_num: NonZero<usize>,
    measure_throughput: bool,
    output_as_csv: bool,
    timeout: Duration,
    random_seed: Option<u64>,
    target_percentiles: Vec<f64>,
}

impl BenchConfig {
    /// Creates the default configuration: one worker thread, percentile
    /// latency output in text form, a 10 second timeout, a seed from OS
    /// entropy, and the [`DEFAULT_TARGET_PERCENTILES`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            thread_num: nz!(1),
            measure_throughput: false,
            output_as_csv: false,
            timeout: Duration::from_secs(10),
            random_seed: None,
            target_percentiles: DEFAULT_TARGET_PERCENTILES.to_vec(),
        }
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_thread_num(mut self, thread_num: NonZero<usize>) -> Self {
        self.thread_num = thread_num;
        self
    }

    /// Selects throughput output (`true`) or percentile latency output
    /// (`false`). The measurement loop is identical either way.
    #[must_use]
    pub fn with_measure_throughput(mut self, measure_throughput: bool) -> Self {
        self.measure_throughput = measure_throughput;
        self
    }

    /// Selects machine-parseable CSV output (`true`) or human-readable text
    /// (`false`).
    #[must_use]
    pub fn with_output_as_csv(mut self, output_as_csv: bool) -> Self {
        self.output_as_csv = output_as_csv;
        self
    }

    /// Sets the wall-clock budget of the measured phase. When it elapses the
    /// workers are cancelled cooperatively and the partial results are still
    /// reported; a timeout is a normal completion, not a failure.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the base random seed. Per-worker seeds are drawn sequentially
    /// from it, so a fixed base seed makes every worker's operation stream
    /// reproducible. Without one the base seed comes from OS entropy.
    #[must_use]
    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = Some(random_seed);
        self
    }

    /// Sets the quantiles of the latency table, each in `[0, 1]`, ascending.
    #[must_use]
    pub fn with_target_percentiles(mut self, target_percentiles: Vec<f64>) -> Self {
        self.target_percentiles = target_percentiles;
        self
    }

    /// The number of worker threads.
    #[must_use]
    pub fn thread_num(&self) -> NonZero<usize> {
        self.thread_num
    }

    /// Whether the run reports throughput instead of percentile latency.
    #[must_use]
    pub fn measure_throughput(&self) -> bool {
        self.measure_throughput
    }

    /// Whether the run reports CSV instead of human-readable text.
    #[must_use]
    pub fn output_as_csv(&self) -> bool {
        self.output_as_csv
    }

    /// The wall-clock budget of the measured phase.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured base random seed, if any.
    #[must_use]
    pub fn random_seed(&self) -> Option<u64> {
        self.random_seed
    }

    /// The quantiles of the latency table.
    #[must_use]
    pub fn target_percentiles(&self) -> &[f64] {
        &self.target_percentiles
    }

    /// Checks the configuration as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the thread count exceeds
    /// [`MAX_THREAD_COUNT`] or the percentile list is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.thread_num.get() > MAX_THREAD_COUNT {
            return Err(Error::InvalidConfig {
                problem: format!(
                    "thread count {} exceeds the supported maximum of {MAX_THREAD_COUNT}",
                    self.thread_num
                ),
            });
        }

        validate_percentiles(&self.target_percentiles)
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks a worker thread count from an untyped source (e.g. a CLI flag).
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] unless `1 <= thread_num <=`
/// [`MAX_THREAD_COUNT`].
pub fn parse_thread_num(thread_num: usize) -> Result<NonZero<usize>> {
    if thread_num > MAX_THREAD_COUNT {
        return Err(Error::InvalidConfig {
            problem: format!(
                "thread count {thread_num} exceeds the supported maximum of {MAX_THREAD_COUNT}"
            ),
        });
    }

    NonZero::new(thread_num).ok_or_else(|| Error::InvalidConfig {
        problem: "thread count must be at least 1".to_string(),
    })
}

/// Parses a base-seed string: empty means "seed from OS entropy", anything
/// else must be an unsigned integer.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] when the string is neither empty nor an
/// unsigned integer.
pub fn parse_seed(seed: &str) -> Result<Option<u64>> {
    if seed.is_empty() {
        return Ok(None);
    }

    seed.parse::<u64>()
        .map(Some)
        .map_err(|_| Error::InvalidConfig {
            problem: format!("random seed '{seed}' is not an unsigned integer"),
        })
}

/// Parses a comma-separated quantile list (e.g. `"0.5,0.99"`).
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] when the list is empty, a value does not
/// parse, a value is outside `[0, 1]`, or the values are not ascending.
pub fn parse_percentiles(percentiles: &str) -> Result<Vec<f64>> {
    let values = percentiles
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>().map_err(|_| Error::InvalidConfig {
                problem: format!("percentile '{part}' is not a number"),
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    validate_percentiles(&values)?;
    Ok(values)
}

/// Checks a skew parameter handed through to an operation engine.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] when the skew is negative or not a
/// number.
pub fn validate_skew(skew: f64) -> Result<()> {
    if skew >= 0.0 {
        return Ok(());
    }

    Err(Error::InvalidConfig {
        problem: format!("skew parameter must be at least zero, got {skew}"),
    })
}

fn validate_percentiles(percentiles: &[f64]) -> Result<()> {
    if percentiles.is_empty() {
        return Err(Error::InvalidConfig {
            problem: "at least one target percentile is required".to_string(),
        });
    }

    for &q in percentiles {
        if !(0.0..=1.0).contains(&q) {
            return Err(Error::InvalidConfig {
                problem: format!("percentile {q} is outside [0, 1]"),
            });
        }
    }

    if percentiles.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(Error::InvalidConfig {
            problem: "target percentiles must be ascending".to_string(),
        });
    }

    Ok(())
}
