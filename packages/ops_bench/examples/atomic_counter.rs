//! Benchmarks an `AtomicU64` under mixed increments and loads and prints the
//! per-kind percentile latency table.
//!
//! Run with `cargo run --release --example atomic_counter`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use new_zealand::nz;
use ops_bench::{BenchConfig, BenchTarget, Benchmarker, OpKind, OperationEngine};

const OPS_PER_WORKER: u64 = 1_000_000;

#[derive(Clone, Copy)]
enum CounterOp {
    Increment,
    Load,
}

impl OpKind for CounterOp {
    const COUNT: usize = 2;

    fn id(self) -> usize {
        self as usize
    }
}

struct SharedCounter {
    value: AtomicU64,
}

impl BenchTarget<CounterOp, ()> for SharedCounter {
    fn execute(&self, kind: CounterOp, _op: ()) -> u64 {
        match kind {
            CounterOp::Increment => {
                self.value.fetch_add(1, Ordering::Relaxed);
            }
            CounterOp::Load => {
                std::hint::black_box(self.value.load(Ordering::Relaxed));
            }
        }
        1
    }
}

struct MixedEngine;

impl OperationEngine for MixedEngine {
    type Kind = CounterOp;
    type Operation = ();
    type Iter = Box<dyn Iterator<Item = (CounterOp, ())>>;

    fn op_iter(&self, _thread_id: usize, _rand_seed: u64) -> Self::Iter {
        Box::new((0..OPS_PER_WORKER).map(|i| {
            if i % 2 == 0 {
                (CounterOp::Increment, ())
            } else {
                (CounterOp::Load, ())
            }
        }))
    }
}

fn main() {
    let counter = SharedCounter {
        value: AtomicU64::new(0),
    };
    let engine = MixedEngine;

    let config = BenchConfig::new()
        .with_thread_num(nz!(4))
        .with_timeout(Duration::from_secs(30));

    let report = Benchmarker::new(&counter, &engine, config)
        .expect("the hard-coded configuration is valid")
        .run()
        .expect("no worker of this benchmark panics");

    report
        .print()
        .expect("failed to write benchmark results to stdout");
}
