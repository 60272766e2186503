//! Time- and count-gated scheduling of memory reclamation.

/// Double-gated reclamation scheduler.
///
/// Reclamation fires only when a configured number of cycles has elapsed
/// **and** a minimum wall-clock interval has passed since the last
/// trigger. The cycle gate stops reclamation storms when cycles run
/// faster than expected; the time gate bounds memory growth when they
/// run slower.
#[derive(Debug)]
pub struct MaintenanceScheduler {
    cycle_interval: u64,
    min_elapsed_ms: u64,
    cycles_since_reclaim: u64,
    last_reclaim_ms: u64,
}

impl MaintenanceScheduler {
    pub fn new(cycle_interval: u64, min_elapsed_ms: u64, now_ms: u64) -> Self {
        MaintenanceScheduler {
            cycle_interval: cycle_interval.max(1),
            min_elapsed_ms,
            cycles_since_reclaim: 0,
            last_reclaim_ms: now_ms,
        }
    }

    /// Record one completed cycle. Returns `true` when both gates are
    /// open and reclamation should run now; the gates reset on `true`.
    pub fn on_cycle(&mut self, now_ms: u64) -> bool {
        self.cycles_since_reclaim += 1;
        if self.cycles_since_reclaim < self.cycle_interval {
            return false;
        }
        if now_ms.saturating_sub(self.last_reclaim_ms) < self.min_elapsed_ms {
            return false;
        }
        self.cycles_since_reclaim = 0;
        self.last_reclaim_ms = now_ms;
        true
    }
}
