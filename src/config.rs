use crate::barrier::MAX_CORES_PER_CLUSTER;
use crate::cache::CacheConfig;
use serde::{Deserialize, Serialize};

/// Architecture parameters fixed at construction time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arch {
    /// number of processing clusters
    pub num_clusters: usize,
    /// number of cores per cluster
    pub num_cores_per_cluster: usize,
    /// number of texture units per core
    pub num_tex_units_per_core: usize,
    /// number of named barriers per cluster
    pub num_barriers: usize,
    /// scratchpad size per core in bytes
    pub sharedmem_size: usize,
    /// number of scratchpad banks per core
    pub sharedmem_num_banks: usize,
    /// per-core instruction cache geometry
    pub inst_cache: CacheConfig,
    /// per-core data cache geometry
    pub data_cache: CacheConfig,
    /// per-core texture cache geometry
    pub tex_cache: CacheConfig,
    /// per-core output-merger cache geometry
    pub om_cache: CacheConfig,
    /// per-core rasterizer cache geometry
    pub raster_cache: CacheConfig,
    /// shared L2 geometry, one per cluster
    pub l2_cache: CacheConfig,
}

impl Default for Arch {
    fn default() -> Self {
        Self {
            num_clusters: 1,
            num_cores_per_cluster: 4,
            num_tex_units_per_core: 1,
            num_barriers: 16,
            sharedmem_size: 16 * 1024,
            sharedmem_num_banks: 16,
            inst_cache: CacheConfig::new(32, 64, 2),
            data_cache: CacheConfig::new(64, 64, 4),
            tex_cache: CacheConfig::new(32, 64, 2),
            om_cache: CacheConfig::new(16, 64, 2),
            raster_cache: CacheConfig::new(16, 64, 2),
            l2_cache: CacheConfig::new(256, 64, 8),
        }
    }
}

impl Arch {
    /// Panics when a parameter cannot be represented, e.g. more cores
    /// per cluster than a barrier mask can track.
    pub fn validate(&self) {
        assert!(self.num_clusters > 0, "at least one cluster");
        assert!(
            (1..=MAX_CORES_PER_CLUSTER).contains(&self.num_cores_per_cluster),
            "cores per cluster must fit the barrier mask"
        );
        assert!(self.num_tex_units_per_core > 0, "at least one texture unit");
    }

    #[must_use]
    pub fn total_cores(&self) -> usize {
        self.num_clusters * self.num_cores_per_cluster
    }

    #[must_use]
    pub fn global_core_id(&self, cluster_id: usize, core_id: usize) -> usize {
        cluster_id * self.num_cores_per_cluster + core_id
    }

    #[must_use]
    pub fn core_id_within_cluster(&self, global_core_id: usize) -> usize {
        global_core_id % self.num_cores_per_cluster
    }
}
