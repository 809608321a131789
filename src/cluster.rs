use crate::barrier::BarrierTable;
use crate::cache::CacheSim;
use crate::config::Arch;
use crate::core::Core;
use crate::mem::Ram;
use crate::sync::{Arc, RwLock};
use crate::ConfigError;
use console::style;

/// One processing cluster: a fixed set of cores sharing an L2 cache
/// and a barrier table.
///
/// Lifecycle: constructed once, then `reset()`/`tick()` until the
/// driver observes `check_exit()`. Sub-unit identity and count never
/// change after construction.
pub struct Cluster {
    pub cluster_id: usize,
    arch: Arc<Arch>,
    cores: Vec<Core>,
    barriers: BarrierTable,
    l2cache: CacheSim,
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cluster@{}", self.cluster_id)
    }
}

impl Cluster {
    #[must_use]
    pub fn new(cluster_id: usize, arch: &Arc<Arch>) -> Self {
        arch.validate();
        let cores = (0..arch.num_cores_per_cluster)
            .map(|core_id| Core::new(arch.global_core_id(cluster_id, core_id), cluster_id, arch))
            .collect();
        Self {
            cluster_id,
            arch: Arc::clone(arch),
            cores,
            barriers: BarrierTable::new(arch.num_barriers),
            l2cache: CacheSim::new(format!("cluster{cluster_id}-l2"), arch.l2_cache),
        }
    }

    #[must_use]
    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    pub fn cores_mut(&mut self) -> &mut [Core] {
        &mut self.cores
    }

    /// Bind the backing memory model to the L2 and every per-core
    /// front-end. Must happen before any `tick()` that touches memory.
    pub fn attach_ram(&mut self, ram: &Arc<RwLock<Ram>>) {
        self.l2cache.attach_ram(ram);
        for core in &mut self.cores {
            core.attach_ram(ram);
        }
    }

    /// Clear architectural and barrier state.
    ///
    /// Idempotent; never changes the identity or count of owned
    /// sub-units.
    pub fn reset(&mut self) {
        log::debug!("cluster {}: reset", self.cluster_id);
        self.barriers.reset();
        self.l2cache.reset();
        for core in &mut self.cores {
            core.reset();
        }
    }

    /// Advance the whole cluster by exactly one cycle.
    ///
    /// All cross-core interaction for the cycle resolves inside this
    /// call; callers never observe a partially advanced cycle.
    pub fn tick(&mut self, cycle: u64) {
        log::trace!(
            "{}",
            style(format!("cycle {:02} cluster {}: tick", cycle, self.cluster_id)).cyan()
        );
        self.l2cache.tick(cycle);
        for core in &mut self.cores {
            core.tick(cycle);
        }
    }

    /// Register `core_id` (cluster-local) as arrived at `bar_id` with
    /// release target `count`.
    ///
    /// The core stalls until the round releases; the release happens
    /// atomically inside the call that completes the round, within the
    /// cycle the driver is currently processing.
    pub fn barrier(&mut self, bar_id: u32, count: u32, core_id: usize) -> Result<(), ConfigError> {
        if core_id >= self.cores.len() {
            return Err(ConfigError::InvalidCoreId { core_id });
        }
        self.cores[core_id].wait_at_barrier();

        if let Some(released) = self.barriers.arrive(bar_id, count, core_id)? {
            log::debug!(
                "cluster {}: barrier {} released cores {:?}",
                self.cluster_id,
                bar_id,
                released.iter_ones().collect::<Vec<_>>()
            );
            for core_id in released.iter_ones() {
                self.cores[core_id].release_barrier();
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn running(&self) -> bool {
        self.cores.iter().any(Core::running)
    }

    /// Merged exit code once every owned core has terminated.
    ///
    /// Per-core codes merge by bitwise OR (after riscv-test mapping),
    /// so any failing core makes the merged code non-zero. This is the
    /// single channel through which a driver learns the outcome.
    #[must_use]
    pub fn check_exit(&self, riscv_test: bool) -> Option<u32> {
        let mut exitcode = 0;
        for core in &self.cores {
            exitcode |= core.check_exit(riscv_test)?;
        }
        Some(exitcode)
    }

    /// Field-wise sum of every owned sub-unit's counters.
    ///
    /// Read-only rollup; safe to call between ticks.
    #[must_use]
    pub fn perf_stats(&self) -> stats::Cluster {
        let mut rollup = stats::Cluster {
            l2cache: self.l2cache.stats(),
            ..stats::Cluster::default()
        };
        for core in &self.cores {
            rollup += core.perf_stats();
        }
        rollup
    }

    #[must_use]
    pub fn arch(&self) -> &Arch {
        &self.arch
    }
}
