//! Watchdog thread for spotting cycles that never finish.
//!
//! The sensing loop assumes every collaborator call is bounded; a
//! detector or camera that wedges would otherwise hang the loop
//! silently. The watchdog observes the cycle currently in flight from a
//! separate thread and logs an alert when one overruns its budget. It is
//! diagnostic only and never interrupts the loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::warn;

use visor_protocol::Mode;

/// Information about the cycle currently in flight.
#[derive(Debug, Clone)]
pub struct CurrentCycleInfo {
    /// Sequential cycle number.
    pub cycle_number: u64,
    /// Mode active when the cycle started.
    pub mode: Mode,
    /// When the cycle started.
    pub started_at: Instant,
}

/// Shared state between the sensing loop and the watchdog thread.
#[derive(Debug, Default)]
pub struct WatchdogState {
    current_cycle: Mutex<Option<CurrentCycleInfo>>,
    stop_flag: AtomicBool,
    alert_count: AtomicU64,
}

impl WatchdogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a cycle as started.
    pub fn cycle_started(&self, cycle_number: u64, mode: Mode) {
        if let Ok(mut current) = self.current_cycle.lock() {
            *current = Some(CurrentCycleInfo {
                cycle_number,
                mode,
                started_at: Instant::now(),
            });
        }
    }

    /// Mark the in-flight cycle as finished.
    pub fn cycle_finished(&self) {
        if let Ok(mut current) = self.current_cycle.lock() {
            *current = None;
        }
    }

    /// Get the in-flight cycle info, if any.
    pub fn current_cycle(&self) -> Option<CurrentCycleInfo> {
        self.current_cycle.lock().ok().and_then(|c| c.clone())
    }

    /// Signal the watchdog thread to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Check if the watchdog thread should stop.
    pub fn should_stop(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    /// Number of alerts fired so far.
    pub fn alert_count(&self) -> u64 {
        self.alert_count.load(Ordering::Relaxed)
    }
}

/// Watchdog thread handle.
pub struct Watchdog {
    state: Arc<WatchdogState>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Create and start a watchdog thread with the given cycle budget.
    pub fn new(timeout: Duration) -> Self {
        let state = Arc::new(WatchdogState::new());
        let watchdog_state = Arc::clone(&state);
        let check_interval = Duration::from_millis(250).min(timeout);

        let thread_handle = thread::spawn(move || {
            let mut last_alerted_cycle: Option<u64> = None;

            while !watchdog_state.should_stop() {
                thread::sleep(check_interval);

                if let Some(info) = watchdog_state.current_cycle() {
                    let elapsed = info.started_at.elapsed();

                    // One alert per stuck cycle, not one per check.
                    if elapsed >= timeout && last_alerted_cycle != Some(info.cycle_number) {
                        last_alerted_cycle = Some(info.cycle_number);
                        watchdog_state.alert_count.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "watchdog: cycle {} (mode {}) running for {:.1}s, budget {:.1}s",
                            info.cycle_number,
                            info.mode,
                            elapsed.as_secs_f64(),
                            timeout.as_secs_f64()
                        );
                    }
                }
            }
        });

        Watchdog {
            state,
            thread_handle: Some(thread_handle),
        }
    }

    /// Get the shared state for the sensing loop to update.
    pub fn state(&self) -> &Arc<WatchdogState> {
        &self.state
    }

    /// Stop the watchdog thread and wait for it to finish.
    pub fn stop(mut self) {
        self.state.stop();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.state.stop();
        // The thread wakes on its next check interval and exits.
    }
}
