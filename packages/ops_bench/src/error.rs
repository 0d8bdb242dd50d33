use thiserror::Error;

/// Errors that can occur when configuring or executing a benchmark run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Two sketches with different operation-kind counts cannot be merged;
    /// their bucket arrays do not describe the same operations.
    #[error("cannot merge sketches of different shapes: {left} vs {right} operation kinds")]
    SketchShapeMismatch {
        /// Kind count of the sketch being merged into.
        left: usize,

        /// Kind count of the sketch being merged from.
        right: usize,
    },

    /// The benchmark configuration was rejected before any worker was spawned.
    #[error("invalid benchmark configuration: {problem}")]
    InvalidConfig {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// A worker thread terminated abnormally instead of delivering its results.
    #[error("worker thread {thread_id} terminated abnormally: {message}")]
    WorkerFault {
        /// Zero-based index of the faulted worker thread.
        thread_id: usize,

        /// The panic payload of the worker thread, if one could be extracted.
        message: String,
    },
}

/// A specialized `Result` type for benchmark operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
