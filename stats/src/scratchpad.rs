use serde::{Deserialize, Serialize};

/// Access counters for a per-core scratchpad memory.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scratchpad {
    pub reads: u64,
    pub writes: u64,
    pub bank_conflicts: u64,
}

impl std::ops::AddAssign for Scratchpad {
    fn add_assign(&mut self, other: Self) {
        self.reads += other.reads;
        self.writes += other.writes;
        self.bank_conflicts += other.bank_conflicts;
    }
}
