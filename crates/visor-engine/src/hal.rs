//! Collaborator interfaces consumed by the cycle controller.
//!
//! The core treats imaging, inference, display, audio, memory and time as
//! black boxes behind narrow traits. Real firmware builds wire these to
//! camera/KPU/LCD drivers; the runner and the tests supply host-side
//! stand-ins.

use std::time::Instant;

use log::debug;

use visor_protocol::Detection;

use crate::error::{AudioError, CameraError, DetectError, TransportError};

/// One captured frame: a luma plane plus dimensions.
///
/// The core never interprets pixel data beyond simple statistics; color
/// planes stay inside the imaging collaborator.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major luma samples, `width * height` bytes.
    pub luma: Vec<u8>,
}

impl Frame {
    /// Create a frame from a luma plane.
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Self {
        debug_assert_eq!(luma.len(), Self::pixel_count(width, height));
        Frame { width, height, luma }
    }

    /// Pixel count for a frame geometry, widened so that dimensions whose
    /// product exceeds `u32::MAX` stay well defined.
    pub fn pixel_count(width: u32, height: u32) -> usize {
        width as usize * height as usize
    }

    /// Mean luminance in [0, 255]; the brightness metric for image analysis.
    pub fn mean_luma(&self) -> f64 {
        if self.luma.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.luma.iter().map(|&p| p as u64).sum();
        sum as f64 / self.luma.len() as f64
    }
}

/// Overlay primitives forwarded to the display, fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Rectangle outline in frame coordinates.
    Rect { x: u32, y: u32, w: u32, h: u32 },
    /// Text label anchored at a frame coordinate.
    Label { x: u32, y: u32, text: String },
}

/// Imaging collaborator.
pub trait Camera {
    /// Capture one frame. Bounded by the sensor frame rate; never blocks
    /// indefinitely.
    fn capture_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Inference collaborator. Loaded at startup; absence degrades the engine
/// to running without face detection.
pub trait FaceDetector: std::fmt::Debug {
    /// Run detection on one frame, returning zero or more detections.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError>;
}

/// Pluggable audio pipeline hook.
///
/// Invoked once per cycle while the mode is `AudioProcessing` and the
/// audio flag is active. A returned payload is emitted as an
/// `audio_event` record.
pub trait AudioPipeline {
    fn process(&mut self) -> Result<Option<serde_json::Value>, AudioError>;
}

/// Display sink. Failures are the collaborator's problem; the core never
/// waits on it.
pub trait Display {
    fn render(&mut self, frame: &Frame, overlays: &[Overlay]);
}

/// Memory collaborator: free-memory metric plus reclamation hook.
pub trait MemoryMonitor {
    fn free_bytes(&self) -> u64;
    fn reclaim(&mut self);
}

/// Monotonic clock collaborator.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Serial link seam between the engine and the transport.
///
/// Both operations must be non-blocking or bounded-blocking so a stalled
/// peer cannot freeze the sensing cycle.
pub trait SerialLink {
    /// Pull whatever bytes are currently available. An empty vec means no
    /// data; it is not an error.
    fn try_read(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Write one outbound record within a bounded time.
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;
}

// ============================================================================
// Stock implementations
// ============================================================================

/// Monotonic millisecond clock over `Instant`.
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Host-side memory monitor backed by `memory-stats`.
///
/// Reports headroom against a fixed budget, which approximates the
/// device's fixed heap. `reclaim` is a logged no-op on hosts with a real
/// allocator; firmware builds substitute their own monitor.
#[derive(Debug)]
pub struct SystemMemory {
    budget_bytes: u64,
}

impl SystemMemory {
    /// Default budget stands in for the device heap size.
    pub const DEFAULT_BUDGET_BYTES: u64 = 512 * 1024 * 1024;

    pub fn new(budget_bytes: u64) -> Self {
        SystemMemory { budget_bytes }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET_BYTES)
    }
}

impl MemoryMonitor for SystemMemory {
    fn free_bytes(&self) -> u64 {
        let used = memory_stats::memory_stats()
            .map(|s| s.physical_mem as u64)
            .unwrap_or(0);
        self.budget_bytes.saturating_sub(used)
    }

    fn reclaim(&mut self) {
        debug!("memory reclaim requested");
    }
}

/// Audio pipeline that produces nothing. The default until a real
/// wake-word pipeline exists.
#[derive(Debug, Default)]
pub struct NoopAudio;

impl AudioPipeline for NoopAudio {
    fn process(&mut self) -> Result<Option<serde_json::Value>, AudioError> {
        Ok(None)
    }
}

/// Display that discards everything. Used when no panel is attached.
#[derive(Debug, Default)]
pub struct NoopDisplay;

impl Display for NoopDisplay {
    fn render(&mut self, _frame: &Frame, _overlays: &[Overlay]) {}
}
