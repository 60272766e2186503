//! Operating-mode register and per-cycle detection state.

use log::info;

use visor_protocol::Mode;

/// The mode state machine.
///
/// Starts in [`Mode::Idle`]. Every mode is reachable from every other
/// mode and a transition has no side effect beyond the stored value:
/// entering `AudioProcessing` does not enable the audio pipeline, and
/// leaving it does not disable it. That coupling is owned by the
/// `start_audio` / `stop_audio` commands.
#[derive(Debug, Default)]
pub struct ModeMachine {
    current: Mode,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active mode.
    pub fn current(&self) -> Mode {
        self.current
    }

    /// Apply a `set_mode` transition, returning the previous mode.
    pub fn apply(&mut self, target: Mode) -> Mode {
        let previous = self.current;
        self.current = target;
        if previous != target {
            info!("mode changed: {} -> {}", previous, target);
        }
        previous
    }
}

/// Mutable sensing state owned by the cycle controller.
///
/// Updated at most once per cycle from the current frame's detection
/// result; read-only to event emission.
#[derive(Debug, Default)]
pub struct DetectionState {
    /// Whether a face is currently considered present.
    pub face_detected: bool,
    /// Clock reading of the last face presence transition.
    pub last_face_time_ms: u64,
    /// Whether the audio pipeline flag is enabled.
    pub audio_active: bool,
}
