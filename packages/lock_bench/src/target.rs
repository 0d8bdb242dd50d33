use ops_bench::BenchTarget;
use parking_lot::RwLock;

use crate::engine::PageOp;

/// `u64` slots per page; one cache line of payload.
const PAGE_PAYLOAD: usize = 8;

/// A data page guarded by its own reader-writer lock, aligned so adjacent
/// pages never share a cache line.
#[repr(align(64))]
#[derive(Debug)]
struct Page {
    values: RwLock<[u64; PAGE_PAYLOAD]>,
}

/// The benchmark target: a fixed table of lock-guarded pages.
///
/// Reads take the shared lock and fold the page's payload; writes take the
/// exclusive lock and bump every slot. Contention between workers is entirely
/// decided by which pages the operation stream steers them to.
#[derive(Debug)]
pub struct PageTable {
    pages: Box<[Page]>,
}

impl PageTable {
    #[must_use]
    pub fn new(page_num: usize) -> Self {
        let pages = (0..page_num)
            .map(|_| Page {
                values: RwLock::new([0; PAGE_PAYLOAD]),
            })
            .collect();

        Self { pages }
    }
}

impl BenchTarget<PageOp, u32> for PageTable {
    fn execute(&self, kind: PageOp, pos: u32) -> u64 {
        let page = &self.pages[pos as usize % self.pages.len()];

        match kind {
            PageOp::Read => {
                let values = page.values.read();
                std::hint::black_box(values.iter().sum::<u64>());
            }
            PageOp::Write => {
                let mut values = page.values.write();
                for slot in values.iter_mut() {
                    *slot = slot.wrapping_add(1);
                }
            }
        }

        1
    }
}
