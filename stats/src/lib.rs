pub mod cache;
pub mod scratchpad;

pub use cache::Cache;
pub use scratchpad::Scratchpad;

use serde::{Deserialize, Serialize};

/// Rolled-up counters for one cluster.
///
/// Field-wise sum of every cache and scratchpad sub-unit the cluster
/// owns. Merging is associative and commutative per field, so per-core
/// and per-cluster rollups commute.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub icache: Cache,
    pub dcache: Cache,
    pub sharedmem: Scratchpad,
    pub l2cache: Cache,
    pub tcache: Cache,
    pub ocache: Cache,
    pub rcache: Cache,
}

impl std::ops::AddAssign for Cluster {
    fn add_assign(&mut self, other: Self) {
        self.icache += other.icache;
        self.dcache += other.dcache;
        self.sharedmem += other.sharedmem;
        self.l2cache += other.l2cache;
        self.tcache += other.tcache;
        self.ocache += other.ocache;
        self.rcache += other.rcache;
    }
}
