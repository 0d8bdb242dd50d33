use ops_bench::{OpKind, OperationEngine};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Zipf};

/// The operations performed against the page table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageOp {
    /// Sum a page's payload under the shared lock.
    Read = 0,

    /// Bump every slot of a page's payload under the exclusive lock.
    Write,
}

impl OpKind for PageOp {
    const COUNT: usize = 2;

    fn id(self) -> usize {
        self as usize
    }
}

impl PageOp {
    fn toggled(self) -> Self {
        match self {
            Self::Read => Self::Write,
            Self::Write => Self::Read,
        }
    }
}

/// Generates page accesses alternating between reads and writes, with page
/// positions drawn from a Zipf distribution so a skew above zero concentrates
/// contention on a few hot pages.
#[derive(Debug)]
pub struct ZipfEngine {
    page_num: usize,
    skew: f64,
    ops_per_worker: usize,
}

impl ZipfEngine {
    /// Creates an engine over `page_num` pages issuing `ops_per_worker`
    /// operations to each worker.
    ///
    /// # Errors
    ///
    /// Returns [`ops_bench::Error::InvalidConfig`] when the skew parameter is
    /// negative.
    pub fn new(page_num: usize, skew: f64, ops_per_worker: usize) -> ops_bench::Result<Self> {
        ops_bench::validate_skew(skew)?;

        Ok(Self {
            page_num,
            skew,
            ops_per_worker,
        })
    }
}

impl OperationEngine for ZipfEngine {
    type Kind = PageOp;
    type Operation = u32;
    type Iter = ZipfOpIter;

    fn op_iter(&self, _thread_id: usize, rand_seed: u64) -> Self::Iter {
        #[expect(
            clippy::cast_precision_loss,
            reason = "page counts far below 2^52"
        )]
        let pages = Zipf::new(self.page_num as f64, self.skew)
            .expect("page count and skew are validated at engine construction");

        ZipfOpIter {
            rng: StdRng::seed_from_u64(rand_seed),
            pages,
            next_kind: PageOp::Read,
            remaining: self.ops_per_worker,
        }
    }
}

/// One worker's operation stream; single-threaded, finite, not restartable.
#[derive(Debug)]
pub struct ZipfOpIter {
    rng: StdRng,
    pages: Zipf<f64>,
    next_kind: PageOp,
    remaining: usize,
}

impl Iterator for ZipfOpIter {
    type Item = (PageOp, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let kind = self.next_kind;
        self.next_kind = kind.toggled();

        // Zipf samples lie in [1, page_num]; shift to zero-based positions.
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "samples are bounded by the page count, which fits u32"
        )]
        let pos = self.pages.sample(&mut self.rng) as u32 - 1;

        Some((kind, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(engine: &ZipfEngine, thread_id: usize, seed: u64) -> Vec<(PageOp, u32)> {
        engine.op_iter(thread_id, seed).collect()
    }

    #[test]
    fn yields_the_configured_number_of_operations() {
        let engine = ZipfEngine::new(64, 1.0, 100).unwrap();

        assert_eq!(collect(&engine, 0, 1).len(), 100);
    }

    #[test]
    fn kinds_alternate_starting_with_read() {
        let engine = ZipfEngine::new(64, 1.0, 6).unwrap();

        let kinds: Vec<PageOp> = collect(&engine, 0, 1).into_iter().map(|(kind, _)| kind).collect();

        assert_eq!(
            kinds,
            [
                PageOp::Read,
                PageOp::Write,
                PageOp::Read,
                PageOp::Write,
                PageOp::Read,
                PageOp::Write,
            ]
        );
    }

    #[test]
    fn equal_seeds_reproduce_the_stream() {
        let engine = ZipfEngine::new(1024, 1.0, 200).unwrap();

        assert_eq!(collect(&engine, 0, 42), collect(&engine, 1, 42));
    }

    #[test]
    fn different_seeds_produce_different_positions() {
        let engine = ZipfEngine::new(1024, 1.0, 200).unwrap();

        assert_ne!(collect(&engine, 0, 1), collect(&engine, 0, 2));
    }

    #[test]
    fn positions_stay_within_the_page_table() {
        let engine = ZipfEngine::new(16, 2.0, 1000).unwrap();

        assert!(collect(&engine, 0, 7).iter().all(|&(_, pos)| pos < 16));
    }

    #[test]
    fn negative_skew_is_rejected() {
        assert!(ZipfEngine::new(16, -1.0, 10).is_err());
    }
}
