use std::any::Any;
use std::hint;
use std::iter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::{BenchConfig, BenchTarget, Error, OperationEngine, Result, RunReport, Worker};

/// Coordinates one multi-threaded benchmark run.
///
/// The runner spawns one worker thread per configured thread, holds every
/// worker at a two-phase start barrier until all of them have finished their
/// setup, releases them simultaneously, enforces the wall-clock timeout
/// through a shared stop flag, and merges the per-worker sketches into one
/// [`RunReport`].
///
/// The target and engine are borrowed for the whole run and shared by all
/// workers; the runner's lifetime strictly contains every worker thread's.
/// Both are resolved by monomorphization, so the measured path contains no
/// virtual dispatch, at the cost of one compiled runner per target type.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// use new_zealand::nz;
/// use ops_bench::{BenchConfig, BenchTarget, Benchmarker, OpKind, OperationEngine};
///
/// #[derive(Clone, Copy)]
/// struct Bump;
///
/// impl OpKind for Bump {
///     const COUNT: usize = 1;
///
///     fn id(self) -> usize {
///         0
///     }
/// }
///
/// struct Counter(AtomicU64);
///
/// impl BenchTarget<Bump, u64> for Counter {
///     fn execute(&self, _kind: Bump, amount: u64) -> u64 {
///         self.0.fetch_add(amount, Ordering::Relaxed);
///         1
///     }
/// }
///
/// struct Engine;
///
/// impl OperationEngine for Engine {
///     type Kind = Bump;
///     type Operation = u64;
///     type Iter = std::iter::RepeatN<(Bump, u64)>;
///
///     fn op_iter(&self, _thread_id: usize, _rand_seed: u64) -> Self::Iter {
///         std::iter::repeat_n((Bump, 1), 1000)
///     }
/// }
///
/// let counter = Counter(AtomicU64::new(0));
/// let engine = Engine;
/// let config = BenchConfig::new().with_thread_num(nz!(2));
///
/// let benchmarker = Benchmarker::new(&counter, &engine, config).unwrap();
/// let report = benchmarker.run().unwrap();
///
/// assert_eq!(report.sketch().total_exec_count(), 2000);
/// assert_eq!(counter.0.load(Ordering::Relaxed), 2000);
/// ```
pub struct Benchmarker<'r, T, E> {
    config: BenchConfig,
    target: &'r T,
    engine: &'r E,

    /// Cleared to cancel every worker cooperatively.
    is_running: AtomicBool,

    /// Set once all workers are ready; releases them into measurement.
    release: AtomicBool,

    /// Counts workers that finished setup and are spinning on `release`.
    ready_count: AtomicUsize,
}

impl<'r, T, E> Benchmarker<'r, T, E>
where
    E: OperationEngine,
    T: BenchTarget<E::Kind, E::Operation>,
{
    /// Creates a runner for the given target and engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when the configuration fails
    /// validation; nothing is spawned in that case.
    pub fn new(target: &'r T, engine: &'r E, config: BenchConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            target,
            engine,
            is_running: AtomicBool::new(true),
            release: AtomicBool::new(false),
            ready_count: AtomicUsize::new(0),
        })
    }

    /// Executes the benchmark and returns the merged results.
    ///
    /// Worker threads that finish their operation streams early are collected
    /// as they complete. When the timeout elapses before all of them are
    /// done, the stop flag is cleared and the remaining workers are awaited
    /// without a further deadline; their partial results are still merged and
    /// reported, and the run counts as a normal completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerFault`] when a worker thread panics instead of
    /// delivering its sketch. The surviving workers are stopped and drained
    /// before the fault is surfaced.
    pub fn run(&self) -> Result<RunReport> {
        let thread_num = self.config.thread_num().get();
        debug!(thread_num, "preparing benchmark workers");

        self.is_running.store(true, Ordering::Relaxed);
        self.release.store(false, Ordering::Relaxed);
        self.ready_count.store(0, Ordering::Relaxed);

        // One root generator, worker seeds drawn in thread-id order: a fixed
        // base seed reproduces every worker's stream regardless of scheduling.
        let mut root_rng = match self.config.random_seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let seeds: Vec<u64> = iter::repeat_with(|| root_rng.next_u64())
            .take(thread_num)
            .collect();

        let (sketches, fault) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(thread_num);
            let mut receivers = Vec::with_capacity(thread_num);

            for (thread_id, seed) in seeds.into_iter().enumerate() {
                let (result_tx, result_rx) = oneshot::channel();

                handles.push(scope.spawn(move || {
                    let mut worker =
                        Worker::new(self.target, self.engine, &self.is_running, thread_id, seed);

                    self.ready_count.fetch_add(1, Ordering::Release);
                    while !self.release.load(Ordering::Acquire) {
                        hint::spin_loop();
                    }

                    worker.measure();

                    // The receiver only disappears while the runner is
                    // unwinding; nothing is left to deliver to then.
                    let _ = result_tx.send(worker.move_sketch());
                }));
                receivers.push(result_rx);
            }

            // Phase one of the barrier: wait for every worker's setup. A
            // worker that dies here would never check in, so the stop flag is
            // cleared for the rest and the fault is picked up while draining.
            while self.ready_count.load(Ordering::Acquire) < thread_num {
                if handles.iter().any(thread::ScopedJoinHandle::is_finished) {
                    self.is_running.store(false, Ordering::Relaxed);
                    break;
                }
                hint::spin_loop();
            }

            // Phase two: arm the timeout only now, so slow setup does not eat
            // measurement time, and release all workers at one instant.
            let deadline = Instant::now() + self.config.timeout();
            debug!("releasing benchmark workers");
            self.release.store(true, Ordering::Release);

            let mut sketches = Vec::with_capacity(thread_num);
            let mut draining = false;
            for (thread_id, rx) in receivers.into_iter().enumerate() {
                if draining {
                    if let Ok(sketch) = rx.recv() {
                        sketches.push(sketch);
                    }
                    continue;
                }

                match rx.recv_deadline(deadline) {
                    Ok(sketch) => sketches.push(sketch),
                    Err(oneshot::RecvTimeoutError::Timeout) => {
                        debug!(thread_id, "timeout reached, interrupting benchmark workers");
                        self.is_running.store(false, Ordering::Relaxed);
                        draining = true;
                        if let Ok(sketch) = rx.recv() {
                            sketches.push(sketch);
                        }
                    }
                    Err(oneshot::RecvTimeoutError::Disconnected) => {
                        debug!(thread_id, "worker died, interrupting benchmark workers");
                        self.is_running.store(false, Ordering::Relaxed);
                        draining = true;
                    }
                }
            }

            // Every worker has delivered or died by now; joining cannot block
            // long and yields the panic payload of the first faulted thread.
            let mut fault = None;
            for (thread_id, handle) in handles.into_iter().enumerate() {
                if let Err(payload) = handle.join()
                    && fault.is_none()
                {
                    fault = Some(Error::WorkerFault {
                        thread_id,
                        message: panic_message(payload.as_ref()),
                    });
                }
            }

            (sketches, fault)
        });

        if let Some(fault) = fault {
            return Err(fault);
        }

        debug!("collecting benchmark results");
        let mut results = sketches.into_iter();
        let mut merged = results
            .next()
            .expect("a fault-free run yields one sketch per worker and there is at least one worker");
        for sketch in results {
            merged.merge(&sketch)?;
        }

        debug!("benchmark run finished");
        Ok(RunReport::new(merged, &self.config))
    }
}

/// Renders a worker thread's panic payload for the fault report.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    use super::*;
    use crate::OpKind;

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum TestKind {
        Alpha,
        Beta,
    }

    impl OpKind for TestKind {
        const COUNT: usize = 2;

        fn id(self) -> usize {
            self as usize
        }
    }

    /// Counts executions; optionally panics to simulate a faulty target.
    #[derive(Debug, Default)]
    struct CountingTarget {
        executed: AtomicU64,
        panic_after: Option<u64>,
    }

    impl BenchTarget<TestKind, u64> for CountingTarget {
        fn execute(&self, _kind: TestKind, _op: u64) -> u64 {
            let done = self.executed.fetch_add(1, Ordering::Relaxed);
            if let Some(limit) = self.panic_after
                && done >= limit
            {
                panic!("synthetic target failure");
            }
            1
        }
    }

    /// Yields `ops_per_worker` operations alternating between the two kinds,
    /// and records the `(thread_id, rand_seed)` pairs it was asked for.
    struct AlternatingEngine {
        ops_per_worker: usize,
        seeds_seen: Mutex<Vec<(usize, u64)>>,
    }

    impl AlternatingEngine {
        fn new(ops_per_worker: usize) -> Self {
            Self {
                ops_per_worker,
                seeds_seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl OperationEngine for AlternatingEngine {
        type Kind = TestKind;
        type Operation = u64;
        type Iter = Box<dyn Iterator<Item = (TestKind, u64)>>;

        fn op_iter(&self, thread_id: usize, rand_seed: u64) -> Self::Iter {
            self.seeds_seen.lock().unwrap().push((thread_id, rand_seed));

            Box::new((0..self.ops_per_worker).map(|i| {
                let kind = if i % 2 == 0 {
                    TestKind::Alpha
                } else {
                    TestKind::Beta
                };
                (kind, i as u64)
            }))
        }
    }

    fn quick_config(threads: usize) -> BenchConfig {
        BenchConfig::new()
            .with_thread_num(NonZero::new(threads).unwrap())
            .with_timeout(Duration::from_secs(60))
            .with_random_seed(7)
    }

    #[test]
    fn single_threaded_run_counts_every_operation() {
        let target = CountingTarget::default();
        let engine = AlternatingEngine::new(1000);

        let report = Benchmarker::new(&target, &engine, quick_config(1))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.sketch().total_exec_count(), 1000);
        assert_eq!(report.sketch().sample_count(TestKind::Alpha.id()), 500);
        assert_eq!(report.sketch().sample_count(TestKind::Beta.id()), 500);
        assert_eq!(target.executed.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn merged_results_cover_every_worker() {
        let target = CountingTarget::default();
        let engine = AlternatingEngine::new(500);

        let report = Benchmarker::new(&target, &engine, quick_config(4))
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.sketch().total_exec_count(), 2000);
        assert_eq!(report.sketch().sample_count(TestKind::Alpha.id()), 1000);
        assert_eq!(report.sketch().sample_count(TestKind::Beta.id()), 1000);
        assert_eq!(target.executed.load(Ordering::Relaxed), 2000);
    }

    #[test]
    fn worker_seeds_derive_deterministically_from_the_base_seed() {
        let target = CountingTarget::default();

        let first_engine = AlternatingEngine::new(1);
        Benchmarker::new(&target, &first_engine, quick_config(4))
            .unwrap()
            .run()
            .unwrap();

        let second_engine = AlternatingEngine::new(1);
        Benchmarker::new(&target, &second_engine, quick_config(4))
            .unwrap()
            .run()
            .unwrap();

        let mut first = first_engine.seeds_seen.lock().unwrap().clone();
        let mut second = second_engine.seeds_seen.lock().unwrap().clone();
        first.sort_unstable();
        second.sort_unstable();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);

        // Distinct workers get distinct seeds.
        first.dedup_by_key(|(_, seed)| *seed);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn timeout_interrupts_an_effectively_endless_run() {
        let target = CountingTarget::default();
        // Far more operations than can complete within the timeout.
        let engine = AlternatingEngine::new(usize::MAX);
        let config = quick_config(2).with_timeout(Duration::from_millis(10));

        let started = Instant::now();
        let report = Benchmarker::new(&target, &engine, config)
            .unwrap()
            .run()
            .unwrap();

        // Generous bound: the run must end promptly once the flag clears.
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(report.sketch().total_exec_count() > 0);
    }

    #[test]
    fn worker_panic_surfaces_as_a_fault() {
        let target = CountingTarget {
            executed: AtomicU64::new(0),
            panic_after: Some(10),
        };
        let engine = AlternatingEngine::new(usize::MAX);

        let result = Benchmarker::new(&target, &engine, quick_config(2))
            .unwrap()
            .run();

        match result {
            Err(Error::WorkerFault { message, .. }) => {
                assert_eq!(message, "synthetic target failure");
            }
            other => panic!("expected a worker fault, got {other:?}"),
        }
    }

    #[test]
    fn rejected_configuration_never_spawns_workers() {
        let target = CountingTarget::default();
        let engine = AlternatingEngine::new(1);
        let config = quick_config(1).with_target_percentiles(vec![2.0]);

        let result = Benchmarker::new(&target, &engine, config);

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
        assert!(engine.seeds_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn thread_count_one_and_many_agree_on_per_worker_semantics() {
        let single_target = CountingTarget::default();
        let single_engine = AlternatingEngine::new(800);
        let single = Benchmarker::new(&single_target, &single_engine, quick_config(1))
            .unwrap()
            .run()
            .unwrap();

        let multi_target = CountingTarget::default();
        let multi_engine = AlternatingEngine::new(800);
        let multi = Benchmarker::new(&multi_target, &multi_engine, quick_config(3))
            .unwrap()
            .run()
            .unwrap();

        // Every worker contributes the same per-thread operation mix.
        assert_eq!(single.sketch().total_exec_count(), 800);
        assert_eq!(multi.sketch().total_exec_count(), 2400);
        assert_eq!(
            multi.sketch().sample_count(TestKind::Alpha.id()),
            3 * single.sketch().sample_count(TestKind::Alpha.id())
        );
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let boxed_str: Box<dyn Any + Send> = Box::new("str payload");
        let boxed_string: Box<dyn Any + Send> = Box::new("string payload".to_string());
        let boxed_other: Box<dyn Any + Send> = Box::new(42_u32);

        assert_eq!(panic_message(boxed_str.as_ref()), "str payload");
        assert_eq!(panic_message(boxed_string.as_ref()), "string payload");
        assert_eq!(panic_message(boxed_other.as_ref()), "unknown panic payload");
    }

    static_assertions::assert_impl_all!(
        Benchmarker<'static, CountingTarget, AlternatingEngine>: Sync
    );
}
