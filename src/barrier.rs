use crate::ConfigError;
use bitvec::{array::BitArray, BitArr};

/// Upper bound on cores per cluster, sized like the arrival masks.
pub const MAX_CORES_PER_CLUSTER: usize = 32;

pub type CoreMask = BitArr!(for MAX_CORES_PER_CLUSTER);

/// Cluster-local barrier state: one arrival bitmask per barrier id.
///
/// A barrier round is pure state, not a suspended execution context: a
/// registered core simply does not advance until the round releases.
/// Masks are cleared on release, so reusing an id starts a fresh round.
#[derive(Debug, Clone)]
pub struct BarrierTable {
    barriers: Vec<CoreMask>,
}

impl BarrierTable {
    #[must_use]
    pub fn new(num_barriers: usize) -> Self {
        Self {
            barriers: vec![BitArray::ZERO; num_barriers],
        }
    }

    /// Register `core_id` as arrived at `bar_id`.
    ///
    /// Registration is idempotent within a round. When the number of
    /// distinct arrived cores reaches `count`, the whole round is
    /// released atomically: the cleared arrival mask is returned and
    /// the slate is wiped for the next round.
    pub fn arrive(
        &mut self,
        bar_id: u32,
        count: u32,
        core_id: usize,
    ) -> Result<Option<CoreMask>, ConfigError> {
        if core_id >= MAX_CORES_PER_CLUSTER {
            return Err(ConfigError::InvalidCoreId { core_id });
        }
        let mask = self
            .barriers
            .get_mut(bar_id as usize)
            .ok_or(ConfigError::InvalidBarrier { bar_id })?;

        mask.set(core_id, true);
        if mask.count_ones() as u32 >= count {
            let released = *mask;
            *mask = BitArray::ZERO;
            return Ok(Some(released));
        }
        Ok(None)
    }

    /// Number of distinct cores currently arrived at `bar_id`.
    #[must_use]
    pub fn arrived(&self, bar_id: u32) -> usize {
        self.barriers
            .get(bar_id as usize)
            .map_or(0, |mask| mask.count_ones())
    }

    /// Clear every round without releasing anyone.
    pub fn reset(&mut self) {
        for mask in &mut self.barriers {
            *mask = BitArray::ZERO;
        }
    }
}
