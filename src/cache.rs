use crate::address;
use crate::mem::{MemError, MemoryPort, Ram};
use crate::sync::{Arc, RwLock};
use console::style;
use serde::{Deserialize, Serialize};

/// Geometry of one cache front-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// number of sets
    pub num_sets: usize,
    /// line size in bytes
    pub line_size: usize,
    /// number of ways per set
    pub associativity: usize,
}

impl CacheConfig {
    #[must_use]
    pub fn new(num_sets: usize, line_size: usize, associativity: usize) -> Self {
        assert!(num_sets.is_power_of_two(), "set count is a power of two");
        assert!(line_size.is_power_of_two(), "line size is a power of two");
        Self {
            num_sets,
            line_size,
            associativity,
        }
    }
}

/// Functional cache front-end.
///
/// Tracks line residency and counters only; data always lives in the
/// backing RAM (write-through), and timing is the concern of whoever
/// embeds this model.
pub struct CacheSim {
    name: String,
    config: CacheConfig,
    /// per-set tag lists, most recently used first
    sets: Vec<Vec<u64>>,
    ram: Option<Arc<RwLock<Ram>>>,
    stats: stats::Cache,
}

impl std::fmt::Debug for CacheSim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CacheSim({})", self.name)
    }
}

impl CacheSim {
    #[must_use]
    pub fn new(name: impl Into<String>, config: CacheConfig) -> Self {
        let sets = (0..config.num_sets).map(|_| Vec::new()).collect();
        Self {
            name: name.into(),
            config,
            sets,
            ram: None,
            stats: stats::Cache::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attach_ram(&mut self, ram: &Arc<RwLock<Ram>>) {
        self.ram = Some(Arc::clone(ram));
    }

    /// Probe the tag store and fill on miss. Returns true on hit.
    fn access(&mut self, addr: address) -> bool {
        let line = addr / self.config.line_size as u64;
        let set_index = (line % self.config.num_sets as u64) as usize;
        let tag = line / self.config.num_sets as u64;

        let set = &mut self.sets[set_index];
        if let Some(way) = set.iter().position(|&t| t == tag) {
            set.remove(way);
            set.insert(0, tag);
            return true;
        }

        if set.len() == self.config.associativity {
            set.pop();
            self.stats.evictions += 1;
        }
        set.insert(0, tag);
        false
    }

    pub fn read_u32(&mut self, addr: address, size: u32) -> Result<u32, MemError> {
        self.stats.reads += 1;
        if !self.access(addr) {
            self.stats.read_misses += 1;
            log::trace!(
                "{}",
                style(format!("{}: read miss at {addr:#x}", self.name)).red()
            );
        }
        let ram = self.ram.as_ref().ok_or(MemError::NoRamAttached)?;
        ram.read().read_u32(addr, size)
    }

    pub fn write_u32(&mut self, addr: address, value: u32, size: u32) -> Result<(), MemError> {
        self.stats.writes += 1;
        if !self.access(addr) {
            self.stats.write_misses += 1;
        }
        let ram = self.ram.as_ref().ok_or(MemError::NoRamAttached)?;
        ram.write().write_u32(addr, value, size)
    }

    pub fn tick(&mut self, _cycle: u64) {}

    /// Invalidate all lines and clear counters. Keeps the attached RAM.
    pub fn reset(&mut self) {
        for set in &mut self.sets {
            set.clear();
        }
        self.stats = stats::Cache::default();
    }

    #[must_use]
    pub fn stats(&self) -> stats::Cache {
        self.stats
    }
}

impl MemoryPort for CacheSim {
    fn read_u32(&mut self, addr: address, size: u32) -> Result<u32, MemError> {
        CacheSim::read_u32(self, addr, size)
    }
}
