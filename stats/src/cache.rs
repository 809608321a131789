use serde::{Deserialize, Serialize};

/// Access counters for a single cache front-end.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    pub reads: u64,
    pub writes: u64,
    pub read_misses: u64,
    pub write_misses: u64,
    pub evictions: u64,
}

impl Cache {
    #[must_use]
    pub fn accesses(&self) -> u64 {
        self.reads + self.writes
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.read_misses + self.write_misses
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.accesses() - self.misses()
    }
}

impl std::ops::AddAssign for Cache {
    fn add_assign(&mut self, other: Self) {
        self.reads += other.reads;
        self.writes += other.writes;
        self.read_misses += other.read_misses;
        self.write_misses += other.write_misses;
        self.evictions += other.evictions;
    }
}
