//! Address selection policies.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Load of one address at selection time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressLoad {
    /// Position in the pool's address list.
    pub index: usize,
    /// Idle connections.
    pub idle: usize,
    /// Leased connections, including ones still connecting.
    pub leased: usize,
    /// All entries for the address.
    pub total: usize,
    /// Whether a session can be served now: an idle entry exists or the pool
    /// may grow for this address.
    pub available: bool,
}

/// Chooses the address for the next session.
///
/// Called with the pool lock held; implementations must not block.
pub trait SelectionPolicy: Send + Sync + std::fmt::Debug {
    /// Pick an available address, or `None` if there is none.
    fn select(&self, loads: &[AddressLoad]) -> Option<usize>;
}

/// Rotate across addresses; the first available one at or after the cursor
/// wins.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    /// Create a policy starting at the first address.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionPolicy for RoundRobin {
    fn select(&self, loads: &[AddressLoad]) -> Option<usize> {
        if loads.is_empty() {
            return None;
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % loads.len();
        (0..loads.len())
            .map(|offset| (start + offset) % loads.len())
            .find(|&i| loads[i].available)
            .map(|i| loads[i].index)
    }
}

/// Pick the available address with the fewest leased connections; ties go to
/// the lower index.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastUsed;

impl SelectionPolicy for LeastUsed {
    fn select(&self, loads: &[AddressLoad]) -> Option<usize> {
        loads
            .iter()
            .filter(|load| load.available)
            .min_by_key(|load| (load.leased, load.index))
            .map(|load| load.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(index: usize, leased: usize, available: bool) -> AddressLoad {
        AddressLoad {
            index,
            leased,
            total: leased,
            available,
            ..AddressLoad::default()
        }
    }

    #[test]
    fn test_round_robin_rotates() {
        let policy = RoundRobin::new();
        let loads = [load(0, 0, true), load(1, 0, true), load(2, 0, true)];
        let picks: Vec<_> = (0..4).filter_map(|_| policy.select(&loads)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_round_robin_skips_full() {
        let policy = RoundRobin::new();
        let loads = [load(0, 2, false), load(1, 0, true)];
        assert_eq!(policy.select(&loads), Some(1));
        assert_eq!(policy.select(&loads), Some(1));
        assert_eq!(policy.select(&[load(0, 1, false)]), None);
        assert_eq!(policy.select(&[]), None);
    }

    #[test]
    fn test_least_used() {
        let loads = [load(0, 3, true), load(1, 1, true), load(2, 1, true), load(3, 0, false)];
        assert_eq!(LeastUsed.select(&loads), Some(1));
        assert_eq!(LeastUsed.select(&[load(0, 0, false)]), None);
    }
}
