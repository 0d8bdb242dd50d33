//! Multi-threaded micro-benchmark harness for concurrent data structures,
//! locks and atomic primitives.
//!
//! Plug a [`BenchTarget`] (the system under measurement) and an
//! [`OperationEngine`] (the source of typed operations) into a
//! [`Benchmarker`], and the harness drives the configured number of worker
//! threads against the target, times every operation with a high-resolution
//! clock, and aggregates the samples into a mergeable [`LatencySketch`] with
//! bounded relative error. The result is printed either as a throughput
//! number or as a per-operation-kind percentile latency table, in
//! human-readable text or machine-parseable CSV.
//!
//! # Operating principles
//!
//! ## Coordinated start
//!
//! Workers are held at a two-phase barrier (a ready counter plus a release
//! flag) until every one of them has finished building its operation stream
//! and running per-worker setup. Only then are they released, at one instant,
//! so no thread measures against a target that other threads are still
//! warming up.
//!
//! ## Cooperative cancellation
//!
//! The wall-clock timeout is enforced through a single shared stop flag that
//! workers poll between operations. A worker is never interrupted mid-call,
//! so the last sample of a cancelled run is always fully recorded, and a
//! timeout is a normal completion with partial results rather than an error.
//!
//! ## Contention-free recording
//!
//! Every worker owns its own sketch during measurement and surrenders it
//! exactly once when done; the runner merges the sketches pairwise
//! afterwards. Nothing in the harness takes a lock or touches shared mutable
//! state on the measured path.
//!
//! # Basic example
//!
//! ```
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use new_zealand::nz;
//! use ops_bench::{BenchConfig, BenchTarget, Benchmarker, OpKind, OperationEngine};
//!
//! // The operations the benchmark distinguishes in its latency table.
//! #[derive(Clone, Copy)]
//! enum CounterOp {
//!     Increment,
//!     Load,
//! }
//!
//! impl OpKind for CounterOp {
//!     const COUNT: usize = 2;
//!
//!     fn id(self) -> usize {
//!         self as usize
//!     }
//! }
//!
//! // The system under measurement; shared by all worker threads.
//! struct SharedCounter(AtomicU64);
//!
//! impl BenchTarget<CounterOp, ()> for SharedCounter {
//!     fn execute(&self, kind: CounterOp, _op: ()) -> u64 {
//!         match kind {
//!             CounterOp::Increment => {
//!                 self.0.fetch_add(1, Ordering::Relaxed);
//!             }
//!             CounterOp::Load => {
//!                 std::hint::black_box(self.0.load(Ordering::Relaxed));
//!             }
//!         }
//!         1
//!     }
//! }
//!
//! // Produces each worker's operation stream.
//! struct AlternatingEngine;
//!
//! impl OperationEngine for AlternatingEngine {
//!     type Kind = CounterOp;
//!     type Operation = ();
//!     type Iter = Box<dyn Iterator<Item = (CounterOp, ())>>;
//!
//!     fn op_iter(&self, _thread_id: usize, _rand_seed: u64) -> Self::Iter {
//!         Box::new((0..10_000).map(|i| {
//!             if i % 2 == 0 {
//!                 (CounterOp::Increment, ())
//!             } else {
//!                 (CounterOp::Load, ())
//!             }
//!         }))
//!     }
//! }
//!
//! let counter = SharedCounter(AtomicU64::new(0));
//! let engine = AlternatingEngine;
//! let config = BenchConfig::new().with_thread_num(nz!(2)).with_random_seed(42);
//!
//! let report = Benchmarker::new(&counter, &engine, config).unwrap().run().unwrap();
//!
//! assert_eq!(report.sketch().total_exec_count(), 20_000);
//! assert!(report.sketch().has_samples(CounterOp::Increment.id()));
//! report.print().unwrap();
//! ```

mod benchmarker;
mod config;
mod engine;
mod error;
mod report;
mod sketch;
mod stopwatch;
mod target;
mod worker;

pub use benchmarker::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use report::*;
pub use sketch::*;
pub use stopwatch::*;
pub use target::*;
pub use worker::*;
