use std::time::Instant;

/// A source of monotonic nanosecond timestamps.
///
/// The measurement loop is generic over this trait so latency-dependent logic
/// can be driven by a scripted clock in tests. Production code uses
/// [`MonotonicClock`].
#[cfg_attr(test, mockall::automock)]
pub trait TimeSource {
    /// Nanoseconds elapsed since an arbitrary fixed origin.
    fn now_ns(&mut self) -> u64;
}

/// The real time source: a process-monotonic clock anchored at construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    #[cfg_attr(test, mutants::skip)] // Mutating real clock reads cannot be asserted on.
    fn now_ns(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos())
            .expect("a single process cannot run for the centuries needed to overflow u64 nanoseconds")
    }
}

/// Measures the duration between a `start` and a `stop` call, in nanoseconds.
///
/// The two timestamps are captured eagerly and the subtraction happens in
/// [`elapsed_ns()`](Self::elapsed_ns), keeping the overhead on the measured
/// path to exactly two clock reads.
#[derive(Debug)]
pub struct Stopwatch<S = MonotonicClock> {
    source: S,
    start_ns: u64,
    end_ns: u64,
}

impl Stopwatch {
    /// Creates a stopwatch backed by the real monotonic clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(MonotonicClock::new())
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TimeSource> Stopwatch<S> {
    /// Creates a stopwatch backed by an arbitrary time source.
    #[must_use]
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            start_ns: 0,
            end_ns: 0,
        }
    }

    /// Captures the starting timestamp.
    #[inline]
    pub fn start(&mut self) {
        self.start_ns = self.source.now_ns();
    }

    /// Captures the ending timestamp.
    #[inline]
    pub fn stop(&mut self) {
        self.end_ns = self.source.now_ns();
    }

    /// The duration between the most recent `start` and `stop` calls [ns].
    ///
    /// The value is unspecified (but never panics) when `start` and `stop`
    /// have not both been called.
    #[inline]
    #[must_use]
    pub fn elapsed_ns(&self) -> u64 {
        self.end_ns.saturating_sub(self.start_ns)
    }
}
