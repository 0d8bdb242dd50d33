use std::sync::LazyLock;

use crate::{Error, Result};

/// The number of latency buckets per operation kind.
const BIN_COUNT: usize = 2048;

/// The relative error the sketch guarantees for quantile queries.
const RELATIVE_ERROR: f64 = 0.01;

/// The base of the log-spaced bucket boundaries.
const GAMMA: f64 = (1.0 + RELATIVE_ERROR) / (1.0 - RELATIVE_ERROR);

/// The denominator for the logarithm change of base used in bucket mapping.
static LOG_GAMMA: LazyLock<f64> = LazyLock::new(|| GAMMA.ln());

/// A mergeable store of per-operation latencies with bounded relative error.
///
/// This is a simplified form of the DDSketch data structure: every operation
/// kind owns a fixed array of 2048 log-spaced buckets, so recording a
/// sample is one logarithm and one counter bump, and merging the results of
/// many worker threads is element-wise addition with no coordination during
/// measurement. Exact minimum and maximum latencies are tracked per kind so
/// the distribution's endpoints are not approximated.
///
/// Two scalar totals (`total_exec_count`, `total_exec_time_nano`) accumulate
/// the throughput inputs separately from the timing samples: an `execute` call
/// that reports several logical operations contributes all of them to the
/// totals but only one timing sample to the buckets.
///
/// # Examples
///
/// ```
/// use ops_bench::LatencySketch;
///
/// let mut sketch = LatencySketch::new(1);
/// for latency_ns in [80, 100, 120] {
///     sketch.add(0, 1, latency_ns);
/// }
///
/// assert_eq!(sketch.quantile(0, 0.0), 80);
/// assert_eq!(sketch.quantile(0, 1.0), 120);
///
/// // Mid-range quantiles are approximate, within 2% relative error.
/// let median = sketch.quantile(0, 0.5);
/// assert!((median as f64 - 100.0).abs() <= 2.0);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LatencySketch {
    /// Logical operations executed, as reported by the target.
    total_exec_count: u64,

    /// Total measured execution time across all samples [ns].
    total_exec_time_nano: u64,

    /// Smallest observed latency per kind; `u64::MAX` until a sample arrives.
    mins: Vec<u64>,

    /// Largest observed latency per kind.
    maxes: Vec<u64>,

    /// The number of timing samples recorded per kind.
    sample_counts: Vec<u64>,

    /// Latency buckets per kind; bucket `i` covers `(GAMMA^(i-1), GAMMA^i]`.
    bins: Vec<[u32; BIN_COUNT]>,
}

impl LatencySketch {
    /// Creates an empty sketch able to attribute samples to `kind_count`
    /// operation kinds.
    ///
    /// All storage is allocated up front; recording and merging never
    /// allocate.
    #[must_use]
    pub fn new(kind_count: usize) -> Self {
        Self {
            total_exec_count: 0,
            total_exec_time_nano: 0,
            mins: vec![u64::MAX; kind_count],
            maxes: vec![0; kind_count],
            sample_counts: vec![0; kind_count],
            bins: vec![[0; BIN_COUNT]; kind_count],
        }
    }

    /// The number of operation kinds this sketch can attribute samples to.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.mins.len()
    }

    /// Records one timing sample of `latency_ns` for operation kind `kind`.
    ///
    /// `count` is the number of logical operations the measured call reported;
    /// it feeds the throughput totals, while the bucket and sample count for
    /// the kind advance by exactly one.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not below [`kind_count()`](Self::kind_count); an
    /// out-of-range kind is an indexing bug in the caller, not a recoverable
    /// condition.
    pub fn add(&mut self, kind: usize, count: u64, latency_ns: u64) {
        assert!(
            kind < self.kind_count(),
            "operation kind {kind} is out of range for a sketch with {} kinds",
            self.kind_count()
        );

        self.total_exec_count += count;
        self.total_exec_time_nano += latency_ns;

        if latency_ns < self.mins[kind] {
            self.mins[kind] = latency_ns;
        }
        if latency_ns > self.maxes[kind] {
            self.maxes[kind] = latency_ns;
        }

        self.bins[kind][bin_index(latency_ns)] += 1;
        self.sample_counts[kind] += 1;
    }

    /// Whether at least one timing sample was recorded for `kind`.
    #[must_use]
    pub fn has_samples(&self, kind: usize) -> bool {
        self.sample_counts[kind] > 0
    }

    /// The number of timing samples recorded for `kind`.
    #[must_use]
    pub fn sample_count(&self, kind: usize) -> u64 {
        self.sample_counts[kind]
    }

    /// Logical operations executed across all kinds, as reported by the
    /// target's `execute` return values.
    #[must_use]
    pub fn total_exec_count(&self) -> u64 {
        self.total_exec_count
    }

    /// Total measured execution time across all samples, in nanoseconds.
    #[must_use]
    pub fn total_exec_time_nano(&self) -> u64 {
        self.total_exec_time_nano
    }

    /// The latency below which fraction `q` of the recorded samples lies,
    /// in nanoseconds.
    ///
    /// `q == 0` and `q >= 1` answer from the exact per-kind minimum and
    /// maximum. Intermediate quantiles walk the buckets and return the
    /// midpoint of the matched bucket's value range, clamped into
    /// `[min, max]`; the result is within `2 * RELATIVE_ERROR / (1 +
    /// RELATIVE_ERROR^2)` of the true sample. A kind without samples
    /// answers 0 for any `q`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not below [`kind_count()`](Self::kind_count).
    #[must_use]
    pub fn quantile(&self, kind: usize, q: f64) -> u64 {
        assert!(
            kind < self.kind_count(),
            "operation kind {kind} is out of range for a sketch with {} kinds",
            self.kind_count()
        );

        let samples = self.sample_counts[kind];
        if samples == 0 {
            return 0;
        }
        if q <= 0.0 {
            return self.mins[kind];
        }
        if q >= 1.0 {
            return self.maxes[kind];
        }

        // The rank of the addressed sample among all samples of this kind.
        #[expect(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "sample counts far below 2^52 in any realistic run"
        )]
        let bound = (q * (samples - 1) as f64) as u64;

        let mut running = u64::from(self.bins[kind][0]);
        let mut index = 0;
        while index < BIN_COUNT - 1 && running <= bound {
            index += 1;
            running += u64::from(self.bins[kind][index]);
        }

        // Midpoint of the matched bucket's value range in the log-linear
        // mapping, clamped so approximation never escapes the observed range.
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_possible_wrap,
            reason = "bucket index < 2048 and midpoints fit u64 by construction"
        )]
        let midpoint = (2.0 * GAMMA.powi(index as i32) / (GAMMA + 1.0)) as u64;
        midpoint.clamp(self.mins[kind], self.maxes[kind])
    }

    /// Merges `other` into this sketch, so that the result is equivalent to
    /// having recorded the union of both sample sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SketchShapeMismatch`] when the two sketches were
    /// created for different numbers of operation kinds.
    pub fn merge(&mut self, other: &LatencySketch) -> Result<()> {
        if self.kind_count() != other.kind_count() {
            return Err(Error::SketchShapeMismatch {
                left: self.kind_count(),
                right: other.kind_count(),
            });
        }

        self.total_exec_count += other.total_exec_count;
        self.total_exec_time_nano += other.total_exec_time_nano;

        for kind in 0..self.kind_count() {
            self.sample_counts[kind] += other.sample_counts[kind];
            self.mins[kind] = self.mins[kind].min(other.mins[kind]);
            self.maxes[kind] = self.maxes[kind].max(other.maxes[kind]);

            for (into, from) in self.bins[kind].iter_mut().zip(&other.bins[kind]) {
                *into += *from;
            }
        }

        Ok(())
    }
}

/// Maps a latency to its bucket: `ceil(ln(latency) / ln(GAMMA))`, with 0 ns in
/// the first bucket and anything beyond the covered range in the last.
fn bin_index(latency_ns: u64) -> usize {
    if latency_ns == 0 {
        return 0;
    }

    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "precision loss of huge latencies only shifts them within the clamped top bucket"
    )]
    let index = ((latency_ns as f64).ln() / *LOG_GAMMA).ceil() as usize;
    index.min(BIN_COUNT - 1)
}
