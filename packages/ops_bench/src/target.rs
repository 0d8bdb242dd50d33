/// A tag attributed to every operation, so latency tables can be reported per
/// operation kind (e.g. reads separately from writes).
///
/// Implementations are typically field-less enums:
///
/// ```
/// use ops_bench::OpKind;
///
/// #[derive(Clone, Copy)]
/// enum PageOp {
///     Read,
///     Write,
/// }
///
/// impl OpKind for PageOp {
///     const COUNT: usize = 2;
///
///     fn id(self) -> usize {
///         self as usize
///     }
/// }
/// ```
pub trait OpKind: Copy + Send + 'static {
    /// The number of distinct operation kinds; every [`id()`](Self::id) is
    /// below this.
    const COUNT: usize;

    /// The dense zero-based index of this kind, used to attribute samples.
    fn id(self) -> usize;
}

/// The system under measurement.
///
/// One instance is shared by every worker thread and `execute` is called on
/// all of them concurrently; any synchronization the target needs is its own
/// responsibility. The harness itself never blocks between operations, so the
/// measured latency is whatever `execute` spends, retries included.
pub trait BenchTarget<K: OpKind, Op>: Sync {
    /// Called once on each worker thread before that worker starts measuring.
    fn setup_for_worker(&self) {}

    /// Reserved hook for work preceding the measured phase. Not currently
    /// invoked by the runner.
    fn pre_process(&self) {}

    /// Performs one logical step of the benchmark and returns the number of
    /// logical operations it amounted to (at least 1; more when the target
    /// batches work internally).
    fn execute(&self, kind: K, op: Op) -> u64;

    /// Reserved hook for work following the measured phase. Not currently
    /// invoked by the runner.
    fn post_process(&self) {}

    /// Called once on each worker thread after that worker finished, whether
    /// it ran to exhaustion or was cancelled.
    fn teardown_for_worker(&self) {}
}
