//! Engine configuration.

/// Tunable knobs for the cycle controller.
///
/// Defaults match the device configuration; tests tighten them to keep
/// runtimes short.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sleep between cycles, bounding the loop rate.
    pub tick_ms: u64,
    /// Sleep after a failed cycle before resuming.
    pub error_backoff_ms: u64,
    /// Bounded command queue capacity.
    pub queue_capacity: usize,
    /// Cycle-count gate for memory reclamation.
    pub gc_cycle_interval: u64,
    /// Wall-clock floor between reclamations, in milliseconds.
    pub gc_min_elapsed_ms: u64,
    /// Maximum accepted inbound line length.
    pub max_line_len: usize,
    /// Cycle duration that triggers a watchdog alert. Zero disables the
    /// check.
    pub watchdog_timeout_ms: u64,
    /// Capability strings advertised in the startup event.
    pub capabilities: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tick_ms: 10,
            error_backoff_ms: 100,
            queue_capacity: crate::queue::DEFAULT_QUEUE_CAPACITY,
            gc_cycle_interval: 30,
            gc_min_elapsed_ms: 5000,
            max_line_len: visor_protocol::MAX_LINE_LENGTH,
            watchdog_timeout_ms: 10_000,
            capabilities: vec!["face_detection".to_string(), "image_analysis".to_string()],
        }
    }
}

impl EngineConfig {
    /// Set the inter-cycle tick.
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    /// Set the command queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set both reclamation gates.
    pub fn with_gc_gates(mut self, cycle_interval: u64, min_elapsed_ms: u64) -> Self {
        self.gc_cycle_interval = cycle_interval;
        self.gc_min_elapsed_ms = min_elapsed_ms;
        self
    }

    /// Set the watchdog alert budget. Zero disables it.
    pub fn with_watchdog_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.watchdog_timeout_ms = timeout_ms;
        self
    }
}
