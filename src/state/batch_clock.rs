use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Mints batch timestamps in epoch milliseconds.
///
/// Every call returns `max(now_ms, last + 1)`, so two ingests landing in the
/// same millisecond (or after a wall-clock step backwards) still get distinct,
/// increasing timestamps.
#[derive(Debug, Default)]
pub struct BatchClock {
    last: AtomicI64,
}

impl BatchClock {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after the largest timestamp already persisted.
    pub fn seeded(last: i64) -> Self {
        Self { last: AtomicI64::new(last) }
    }

    pub fn mint(&self) -> i64 {
        self.mint_at(now_ms())
    }

    fn mint_at(&self, now: i64) -> i64 {
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|v| v);
        now.max(prev.saturating_add(1))
    }

    #[cfg(test)]
    pub fn last(&self) -> i64 {
        self.last.load(Ordering::Acquire)
    }
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn same_millisecond_still_increases() {
        let clock = BatchClock::new();
        let a = clock.mint_at(1_000);
        let b = clock.mint_at(1_000);
        let c = clock.mint_at(999);
        assert_eq!(a, 1_000);
        assert_eq!(b, 1_001);
        assert_eq!(c, 1_002);
        assert_eq!(clock.last(), 1_002);
    }

    #[test]
    fn seeded_clock_continues_after_stored_max() {
        let clock = BatchClock::seeded(5_000);
        assert_eq!(clock.mint_at(10), 5_001);
        assert_eq!(clock.mint_at(9_000), 9_000);
    }

    #[test]
    fn concurrent_mints_are_unique() {
        let clock = Arc::new(BatchClock::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || (0..100).map(|_| clock.mint()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
