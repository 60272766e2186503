//! The detection cycle controller.
//!
//! One cooperative loop drives everything: drain the serial link, parse
//! and queue commands, dispatch them, run the active mode's sensing
//! work, then hand off to the maintenance scheduler. All mutable state
//! lives in the [`Engine`] and is touched only from within a cycle, so
//! no locking is involved.
//!
//! Failure of a single cycle never terminates the loop: the error is
//! logged, reported to the host as an `error` event where the link still
//! works, and the loop resumes after a short backoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use visor_protocol::{Command, Event, LineCodec, Mode, StatusReport};

use crate::config::EngineConfig;
use crate::error::{CycleError, TransportError};
use crate::hal::{AudioPipeline, Camera, Clock, Display, FaceDetector, MemoryMonitor, Overlay, SerialLink};
use crate::maintenance::MaintenanceScheduler;
use crate::queue::CommandQueue;
use crate::state::{DetectionState, ModeMachine};
use crate::watchdog::WatchdogState;

/// The collaborators an engine drives.
///
/// An explicit context, not hidden globals: every step of the cycle
/// reaches its collaborators through this struct.
pub struct Collaborators {
    /// Serial link to the host.
    pub link: Box<dyn SerialLink>,
    /// Imaging collaborator.
    pub camera: Box<dyn Camera>,
    /// Inference collaborator. `None` runs the engine degraded, with
    /// face-detection cycles as no-ops.
    pub detector: Option<Box<dyn FaceDetector>>,
    /// Audio pipeline hook.
    pub audio: Box<dyn AudioPipeline>,
    /// Display sink.
    pub display: Box<dyn Display>,
    /// Memory metric and reclamation.
    pub memory: Box<dyn MemoryMonitor>,
    /// Monotonic clock.
    pub clock: Box<dyn Clock>,
}

/// The cycle controller.
pub struct Engine {
    config: EngineConfig,
    codec: LineCodec,
    queue: CommandQueue,
    mode: ModeMachine,
    state: DetectionState,
    maintenance: MaintenanceScheduler,
    start_ms: u64,
    cycle_count: u64,
    watchdog: Option<Arc<WatchdogState>>,

    link: Box<dyn SerialLink>,
    camera: Box<dyn Camera>,
    detector: Option<Box<dyn FaceDetector>>,
    audio: Box<dyn AudioPipeline>,
    display: Box<dyn Display>,
    memory: Box<dyn MemoryMonitor>,
    clock: Box<dyn Clock>,
}

impl Engine {
    /// Create an engine from its configuration and collaborators.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let Collaborators { link, camera, detector, audio, display, memory, clock } =
            collaborators;
        if detector.is_none() {
            warn!("no face detector loaded; running degraded");
        }
        let start_ms = clock.now_ms();
        Engine {
            codec: LineCodec::with_max_line_len(config.max_line_len),
            queue: CommandQueue::new(config.queue_capacity),
            mode: ModeMachine::new(),
            state: DetectionState::default(),
            maintenance: MaintenanceScheduler::new(
                config.gc_cycle_interval,
                config.gc_min_elapsed_ms,
                start_ms,
            ),
            start_ms,
            cycle_count: 0,
            watchdog: None,
            config,
            link,
            camera,
            detector,
            audio,
            display,
            memory,
            clock,
        }
    }

    /// Attach a watchdog to observe cycle durations.
    pub fn attach_watchdog(&mut self, state: Arc<WatchdogState>) {
        self.watchdog = Some(state);
    }

    /// The active operating mode.
    pub fn mode(&self) -> Mode {
        self.mode.current()
    }

    /// Whether a face is currently considered present.
    pub fn face_detected(&self) -> bool {
        self.state.face_detected
    }

    /// Whether the audio pipeline flag is enabled.
    pub fn audio_active(&self) -> bool {
        self.state.audio_active
    }

    /// Number of completed cycles.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Emit the startup event. Call once before the loop.
    pub fn send_startup(&mut self) -> Result<(), TransportError> {
        let event = Event::Startup { capabilities: self.config.capabilities.clone() };
        self.emit(&event)
    }

    /// Run cycles until the stop flag is set.
    ///
    /// The flag is checked at the top of each iteration; cycles are short
    /// and bounded, so no mid-cycle cancellation exists.
    pub fn run(&mut self, stop: &AtomicBool) {
        info!("engine starting, mode {}", self.mode.current());
        if let Err(e) = self.send_startup() {
            warn!("startup event not delivered: {}", e);
        }

        while !stop.load(Ordering::Relaxed) {
            if let Some(watchdog) = &self.watchdog {
                watchdog.cycle_started(self.cycle_count, self.mode.current());
            }
            let result = self.cycle();
            if let Some(watchdog) = &self.watchdog {
                watchdog.cycle_finished();
            }

            match result {
                Ok(()) => thread::sleep(Duration::from_millis(self.config.tick_ms)),
                Err(CycleError::Transport(e)) => {
                    // The link is the thing that failed; reporting over it
                    // would fail too. Skip the cycle and retry.
                    warn!("cycle {} transport error: {}", self.cycle_count, e);
                    thread::sleep(Duration::from_millis(self.config.tick_ms));
                }
                Err(e) => {
                    error!("cycle {} failed: {}", self.cycle_count, e);
                    let event = Event::Error { message: e.to_string() };
                    if let Err(send_err) = self.emit(&event) {
                        warn!("error event not delivered: {}", send_err);
                    }
                    thread::sleep(Duration::from_millis(self.config.error_backoff_ms));
                }
            }
        }
        info!("engine stopped after {} cycles", self.cycle_count);
    }

    /// Run one cycle: receive, drain, sense, maintain.
    ///
    /// The yield step (inter-cycle sleep) belongs to [`Engine::run`];
    /// tests call `cycle` directly without pacing.
    pub fn cycle(&mut self) -> Result<(), CycleError> {
        self.receive()?;
        self.drain_queue()?;
        self.sense()?;
        self.maintain();
        self.cycle_count += 1;
        Ok(())
    }

    /// Pull available bytes, frame them and enqueue every parseable
    /// command. Unparseable records are logged and dropped, never queued.
    fn receive(&mut self) -> Result<(), TransportError> {
        let data = self.link.try_read()?;
        if data.is_empty() && self.codec.buffered_len() == 0 {
            return Ok(());
        }
        self.codec.push(&data);

        while let Some(record) = self.codec.next_record() {
            match Command::parse(&record) {
                Ok(command) => {
                    debug!("command received: {}", command.kind());
                    if let Some(evicted) = self.queue.push(command) {
                        warn!("command queue full, dropping oldest: {}", evicted.kind());
                    }
                }
                Err(e) => {
                    warn!("dropping inbound record: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Pop and dispatch every queued command in FIFO order.
    fn drain_queue(&mut self) -> Result<(), CycleError> {
        while let Some(command) = self.queue.pop() {
            self.dispatch(command)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, command: Command) -> Result<(), CycleError> {
        match command {
            Command::SetMode { mode } => {
                self.mode.apply(mode);
            }
            Command::CaptureImage => {
                // One-off analysis, regardless of the active mode.
                self.image_analysis_cycle()?;
            }
            Command::StartAudio => {
                self.state.audio_active = true;
                info!("audio pipeline enabled");
            }
            Command::StopAudio => {
                self.state.audio_active = false;
                info!("audio pipeline disabled");
            }
            Command::SystemStatus => {
                let report = StatusReport {
                    mode: self.mode.current(),
                    face_detected: self.state.face_detected,
                    audio_active: self.state.audio_active,
                    memory_free: self.memory.free_bytes(),
                    uptime: self.clock.now_ms().saturating_sub(self.start_ms),
                };
                self.emit(&Event::StatusResponse(report))?;
            }
        }
        Ok(())
    }

    /// Run the active mode's sensing work.
    ///
    /// Idle deliberately performs the full face-detection cycle so the
    /// preview stays live. ImageAnalysis and Sleep sense nothing per
    /// tick; analysis runs on demand via `capture_image`.
    fn sense(&mut self) -> Result<(), CycleError> {
        match self.mode.current() {
            Mode::FaceDetection | Mode::Idle => self.face_cycle()?,
            Mode::AudioProcessing => {
                if self.state.audio_active {
                    self.audio_cycle()?;
                }
            }
            Mode::ImageAnalysis | Mode::Sleep => {}
        }
        Ok(())
    }

    /// Capture, detect and emit on face presence transitions.
    ///
    /// Emission is edge-triggered: repeated frames in the same boolean
    /// state emit nothing.
    fn face_cycle(&mut self) -> Result<(), CycleError> {
        let Some(detector) = self.detector.as_mut() else {
            // Degraded: no model was loaded at startup.
            return Ok(());
        };

        let frame = self.camera.capture_frame()?;
        let faces = detector.detect(&frame)?;
        let face_found = !faces.is_empty();

        let mut overlays: Vec<Overlay> = faces
            .iter()
            .map(|face| Overlay::Rect {
                x: face.rect.x,
                y: face.rect.y,
                w: face.rect.w,
                h: face.rect.h,
            })
            .collect();
        overlays.push(Overlay::Label {
            x: 2,
            y: 2,
            text: format!("Faces: {}", faces.len()),
        });
        overlays.push(Overlay::Label {
            x: 2,
            y: 20,
            text: format!("Mode: {}", self.mode.current()),
        });
        self.display.render(&frame, &overlays);

        if face_found != self.state.face_detected {
            self.state.face_detected = face_found;
            self.state.last_face_time_ms = self.clock.now_ms();
            let event = Event::FaceDetection {
                detected: face_found,
                count: faces.len(),
                faces,
            };
            self.emit(&event)?;
        }
        Ok(())
    }

    /// Analyze one frame and emit the result unconditionally.
    fn image_analysis_cycle(&mut self) -> Result<(), CycleError> {
        let frame = self.camera.capture_frame()?;
        let event = Event::ImageAnalysis { brightness: frame.mean_luma() };
        self.emit(&event)?;
        Ok(())
    }

    /// Invoke the audio hook; emit whatever it produced.
    fn audio_cycle(&mut self) -> Result<(), CycleError> {
        if let Some(data) = self.audio.process()? {
            self.emit(&Event::AudioEvent { data })?;
        }
        Ok(())
    }

    /// Reclaim memory when both maintenance gates are open.
    fn maintain(&mut self) {
        if self.maintenance.on_cycle(self.clock.now_ms()) {
            debug!("running memory reclamation, free={} bytes", self.memory.free_bytes());
            self.memory.reclaim();
        }
    }

    /// Serialize and transmit one event, stamping it with the current
    /// clock reading.
    fn emit(&mut self, event: &Event) -> Result<(), TransportError> {
        let record = event.serialize(self.clock.now_ms());
        self.link.write_all(&LineCodec::encode_line(&record))?;
        debug!("event sent: {}", event.kind());
        Ok(())
    }
}
