//! Shared scrape-cycle indicator.
//! Producers poll it to learn whether to pause; operators flip it through the API.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

use super::batch_clock::now_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleStatus {
    pub cycle: u64,
    pub paused: bool,
    /// Epoch ms of the last `start_cycle` (0 = never started).
    pub started_at_ms: i64,
}

#[derive(Debug, Default)]
pub struct CycleState {
    cycle: AtomicU64,
    paused: AtomicBool,
    started_at_ms: AtomicI64,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new cycle. Clears any pause left over from the previous one.
    pub fn start_cycle(&self) -> CycleStatus {
        self.paused.store(false, Ordering::Relaxed);
        self.started_at_ms.store(now_ms(), Ordering::Relaxed);
        self.cycle.fetch_add(1, Ordering::Relaxed);
        self.status()
    }

    pub fn pause(&self) -> CycleStatus {
        self.paused.store(true, Ordering::Relaxed);
        self.status()
    }

    pub fn resume(&self) -> CycleStatus {
        self.paused.store(false, Ordering::Relaxed);
        self.status()
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> CycleStatus {
        CycleStatus {
            cycle: self.cycle.load(Ordering::Relaxed),
            paused: self.paused.load(Ordering::Relaxed),
            started_at_ms: self.started_at_ms.load(Ordering::Relaxed),
        }
    }
}
