use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    BenchTarget, LatencySketch, MonotonicClock, OpKind, OperationEngine, Stopwatch, TimeSource,
};

/// Drives one thread's share of a benchmark run.
///
/// A worker owns its operation iterator, its stopwatch, and its own
/// [`LatencySketch`]; during measurement nothing it touches is shared except
/// the target itself and the read-only stop flag, so recording a sample is
/// free of cross-thread coordination. Samples land in the sketch in exact
/// operation order.
///
/// The worker calls [`BenchTarget::setup_for_worker`] once on construction
/// and [`BenchTarget::teardown_for_worker`] once on drop.
pub struct Worker<'r, T, E, S = MonotonicClock>
where
    T: BenchTarget<E::Kind, E::Operation>,
    E: OperationEngine,
    S: TimeSource,
{
    target: &'r T,
    ops: E::Iter,
    is_running: &'r AtomicBool,
    sketch: Option<LatencySketch>,
    stopwatch: Stopwatch<S>,
}

impl<'r, T, E> Worker<'r, T, E>
where
    T: BenchTarget<E::Kind, E::Operation>,
    E: OperationEngine,
{
    /// Creates a worker with its own operation iterator and an empty sketch,
    /// and runs the target's per-worker setup.
    ///
    /// `thread_id` and `rand_seed` are forwarded to
    /// [`OperationEngine::op_iter`]; the stop flag is only ever read.
    pub fn new(
        target: &'r T,
        engine: &E,
        is_running: &'r AtomicBool,
        thread_id: usize,
        rand_seed: u64,
    ) -> Self {
        Self::with_stopwatch(
            target,
            engine,
            is_running,
            thread_id,
            rand_seed,
            Stopwatch::new(),
        )
    }
}

impl<'r, T, E, S> Worker<'r, T, E, S>
where
    T: BenchTarget<E::Kind, E::Operation>,
    E: OperationEngine,
    S: TimeSource,
{
    /// Creates a worker that times operations with the given stopwatch
    /// instead of the real monotonic clock.
    pub fn with_stopwatch(
        target: &'r T,
        engine: &E,
        is_running: &'r AtomicBool,
        thread_id: usize,
        rand_seed: u64,
        stopwatch: Stopwatch<S>,
    ) -> Self {
        let ops = engine.op_iter(thread_id, rand_seed);
        let sketch = LatencySketch::new(E::Kind::COUNT);
        target.setup_for_worker();

        Self {
            target,
            ops,
            is_running,
            sketch: Some(sketch),
            stopwatch,
        }
    }

    /// Runs the measurement loop until the operation stream is exhausted or
    /// the stop flag is cleared.
    ///
    /// Every operation is timed individually and recorded under its kind.
    /// The stop flag is polled (relaxed) before an operation starts, so a
    /// cancelled worker never records a partially timed sample; a stale read
    /// merely delays the exit by one operation.
    ///
    /// # Panics
    ///
    /// Panics if the sketch was already moved out via
    /// [`move_sketch()`](Self::move_sketch).
    pub fn measure(&mut self) {
        let sketch = self
            .sketch
            .as_mut()
            .expect("measurement results were already moved out of this worker");

        while self.is_running.load(Ordering::Relaxed) {
            let Some((kind, op)) = self.ops.next() else {
                break;
            };

            self.stopwatch.start();
            let count = self.target.execute(kind, op);
            self.stopwatch.stop();

            sketch.add(kind.id(), count, self.stopwatch.elapsed_ns());
        }
    }

    /// Surrenders the worker's sketch to the caller.
    ///
    /// # Panics
    ///
    /// Panics when called a second time; the sketch is handed over exactly
    /// once.
    #[must_use]
    pub fn move_sketch(&mut self) -> LatencySketch {
        self.sketch
            .take()
            .expect("measurement results were already moved out of this worker")
    }
}

impl<T, E, S> Drop for Worker<'_, T, E, S>
where
    T: BenchTarget<E::Kind, E::Operation>,
    E: OperationEngine,
    S: TimeSource,
{
    fn drop(&mut self) {
        self.target.teardown_for_worker();
    }
}
