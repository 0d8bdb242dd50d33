use crate::OpKind;

/// Produces the operation stream each worker thread consumes.
///
/// One engine instance is shared by all workers; each worker asks it for an
/// independent iterator via [`op_iter()`](Self::op_iter) and drives that
/// iterator on its own thread only. Exhaustion of the iterator is the normal
/// termination condition for a worker, so a finite iterator bounds the run
/// and an effectively endless one leaves termination to the timeout.
pub trait OperationEngine: Sync {
    /// The operation tag type; its [`OpKind::COUNT`] sizes every sketch.
    type Kind: OpKind;

    /// The opaque payload handed to the target together with the kind.
    type Operation;

    /// The per-thread operation sequence.
    type Iter: Iterator<Item = (Self::Kind, Self::Operation)>;

    /// Builds the operation sequence for one worker.
    ///
    /// `thread_id` is the worker's zero-based index and `rand_seed` is drawn
    /// for it by the runner from the configured base seed, so a fixed base
    /// seed reproduces every worker's operation stream regardless of
    /// scheduling.
    fn op_iter(&self, thread_id: usize, rand_seed: u64) -> Self::Iter;
}
