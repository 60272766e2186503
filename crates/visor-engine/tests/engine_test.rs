//! Integration tests for the cycle controller, driven through fake
//! collaborators over the real protocol.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use visor_engine::{
    AudioError, AudioPipeline, Camera, CameraError, Clock, Collaborators, CycleError,
    DetectError, Display, Engine, EngineConfig, FaceDetector, Frame, MemoryMonitor,
    NoopDisplay, Overlay, SerialLink, TransportError,
};
use visor_protocol::{BoundingBox, Detection, Mode};

// ============================================================================
// Fake collaborators
// ============================================================================

#[derive(Clone, Default)]
struct FakeLink {
    inner: Arc<Mutex<LinkInner>>,
}

#[derive(Default)]
struct LinkInner {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
}

impl FakeLink {
    /// Queue bytes to be returned by the next `try_read`.
    fn push_inbound(&self, bytes: &[u8]) {
        self.inner.lock().unwrap().inbound.push_back(bytes.to_vec());
    }

    /// All emitted event records, decoded.
    fn events(&self) -> Vec<Value> {
        let outbound = self.inner.lock().unwrap().outbound.clone();
        outbound
            .split(|&b| b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).expect("event records are valid JSON"))
            .collect()
    }

    /// Emitted events of one kind.
    fn events_of(&self, kind: &str) -> Vec<Value> {
        self.events().into_iter().filter(|e| e["type"] == kind).collect()
    }
}

impl SerialLink for FakeLink {
    fn try_read(&mut self) -> Result<Vec<u8>, TransportError> {
        Ok(self.inner.lock().unwrap().inbound.pop_front().unwrap_or_default())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.inner.lock().unwrap().outbound.extend_from_slice(data);
        Ok(())
    }
}

struct StaticCamera {
    level: u8,
}

impl Camera for StaticCamera {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        Ok(Frame::new(4, 4, vec![self.level; 16]))
    }
}

struct FailingCamera;

impl Camera for FailingCamera {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        Err(CameraError("sensor timeout".into()))
    }
}

/// Detector that replays a scripted sequence of per-frame detection
/// counts, then reports empty frames.
#[derive(Clone, Debug, Default)]
struct ScriptedDetector {
    counts: Arc<Mutex<VecDeque<usize>>>,
}

impl ScriptedDetector {
    fn script(counts: &[usize]) -> Self {
        ScriptedDetector {
            counts: Arc::new(Mutex::new(counts.iter().copied().collect())),
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let count = self.counts.lock().unwrap().pop_front().unwrap_or(0);
        Ok((0..count)
            .map(|i| Detection {
                id: i as u32,
                confidence: 0.9,
                rect: BoundingBox { x: 10 * i as u32, y: 0, w: 32, h: 32 },
            })
            .collect())
    }
}

#[derive(Clone, Default)]
struct CountingAudio {
    calls: Arc<AtomicUsize>,
    payload: Option<Value>,
}

impl AudioPipeline for CountingAudio {
    fn process(&mut self) -> Result<Option<Value>, AudioError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.payload.clone())
    }
}

#[derive(Clone, Default)]
struct CountingMemory {
    reclaims: Arc<AtomicUsize>,
}

impl MemoryMonitor for CountingMemory {
    fn free_bytes(&self) -> u64 {
        1_000_000
    }

    fn reclaim(&mut self) {
        self.reclaims.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Clone, Default)]
struct FakeClock {
    now: Arc<AtomicU64>,
}

impl FakeClock {
    fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Default)]
struct RecordingDisplay {
    frames: Arc<AtomicUsize>,
    last_overlays: Arc<Mutex<Vec<Overlay>>>,
}

impl Display for RecordingDisplay {
    fn render(&mut self, _frame: &Frame, overlays: &[Overlay]) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        *self.last_overlays.lock().unwrap() = overlays.to_vec();
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    engine: Engine,
    link: FakeLink,
    clock: FakeClock,
    audio: CountingAudio,
    memory: CountingMemory,
}

fn harness(config: EngineConfig, detector: Option<ScriptedDetector>) -> Harness {
    let link = FakeLink::default();
    let clock = FakeClock::default();
    let audio = CountingAudio::default();
    let memory = CountingMemory::default();

    let engine = Engine::new(
        config,
        Collaborators {
            link: Box::new(link.clone()),
            camera: Box::new(StaticCamera { level: 128 }),
            detector: detector.map(|d| Box::new(d) as Box<dyn FaceDetector>),
            audio: Box::new(audio.clone()),
            display: Box::new(NoopDisplay),
            memory: Box::new(memory.clone()),
            clock: Box::new(clock.clone()),
        },
    );

    Harness { engine, link, clock, audio, memory }
}

fn command_line(kind: &str, data: Value) -> Vec<u8> {
    let mut line = json!({ "type": kind, "data": data }).to_string().into_bytes();
    line.push(b'\n');
    line
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_startup_event_advertises_capabilities() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));
    h.engine.send_startup().unwrap();

    let startups = h.link.events_of("startup");
    assert_eq!(startups.len(), 1);
    assert_eq!(startups[0]["data"]["status"], "ready");
    assert_eq!(startups[0]["data"]["capabilities"][0], "face_detection");
    assert_eq!(startups[0]["data"]["capabilities"][1], "image_analysis");
}

#[test]
fn test_face_events_are_edge_triggered() {
    let script = [0, 0, 3, 3, 0, 0, 5];
    let mut h = harness(
        EngineConfig::default(),
        Some(ScriptedDetector::script(&script)),
    );

    for _ in 0..script.len() {
        h.engine.cycle().unwrap();
        h.clock.advance(10);
    }

    let events = h.link.events_of("face_detection");
    assert_eq!(events.len(), 3, "only transitions emit");
    assert_eq!(events[0]["data"]["detected"], true);
    assert_eq!(events[0]["data"]["count"], 3);
    assert_eq!(events[0]["data"]["faces"].as_array().unwrap().len(), 3);
    assert_eq!(events[1]["data"]["detected"], false);
    assert_eq!(events[1]["data"]["count"], 0);
    assert_eq!(events[2]["data"]["detected"], true);
    assert_eq!(events[2]["data"]["count"], 5);
}

#[test]
fn test_unparseable_records_are_dropped_not_fatal() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));

    h.link.push_inbound(b"this is not json\n");
    h.link.push_inbound(&command_line("reboot", json!({})));
    h.link.push_inbound(&command_line("set_mode", json!({ "mode": "warp" })));

    for _ in 0..3 {
        h.engine.cycle().unwrap();
    }

    // Nothing enqueued, nothing dispatched, mode untouched.
    assert_eq!(h.engine.mode(), Mode::Idle);
    assert!(h.link.events_of("status_response").is_empty());

    // The loop keeps working afterwards.
    h.link.push_inbound(&command_line("set_mode", json!({ "mode": "sleep" })));
    h.engine.cycle().unwrap();
    assert_eq!(h.engine.mode(), Mode::Sleep);
}

#[test]
fn test_last_valid_set_mode_wins() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));

    let mut bytes = Vec::new();
    bytes.extend(command_line("set_mode", json!({ "mode": "face_detection" })));
    bytes.extend(command_line("set_mode", json!({ "mode": "nonsense" })));
    bytes.extend(command_line("set_mode", json!({ "mode": "audio_processing" })));
    h.link.push_inbound(&bytes);

    h.engine.cycle().unwrap();
    assert_eq!(h.engine.mode(), Mode::AudioProcessing);
}

#[test]
fn test_status_response_reflects_state_after_drain() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));
    h.clock.advance(1234);

    let mut bytes = Vec::new();
    bytes.extend(command_line("set_mode", json!({ "mode": "face_detection" })));
    bytes.extend(command_line("start_audio", json!({})));
    bytes.extend(command_line("system_status", json!({})));
    h.link.push_inbound(&bytes);

    h.engine.cycle().unwrap();

    let statuses = h.link.events_of("status_response");
    assert_eq!(statuses.len(), 1, "exactly one status per command");
    let data = &statuses[0]["data"];
    assert_eq!(data["mode"], "face_detection");
    assert_eq!(data["audio_active"], true);
    assert_eq!(data["face_detected"], false);
    assert_eq!(data["memory_free"], 1_000_000);
    assert_eq!(data["uptime"], 1234);
}

#[test]
fn test_one_status_event_per_status_command() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));

    let mut bytes = Vec::new();
    bytes.extend(command_line("system_status", json!({})));
    bytes.extend(command_line("system_status", json!({})));
    h.link.push_inbound(&bytes);

    h.engine.cycle().unwrap();
    assert_eq!(h.link.events_of("status_response").len(), 2);
}

#[test]
fn test_maintenance_time_gate_limits_fast_cycles() {
    // 10ms cycles reach the 30-cycle gate long before the 5000ms floor.
    let config = EngineConfig::default().with_gc_gates(30, 5000);
    let mut h = harness(config, Some(ScriptedDetector::default()));

    for _ in 0..400 {
        h.engine.cycle().unwrap();
        h.clock.advance(10);
    }

    // 400 cycles x 10ms = 4000ms: floor never reached.
    assert_eq!(h.memory.reclaims.load(Ordering::Relaxed), 0);

    for _ in 0..200 {
        h.engine.cycle().unwrap();
        h.clock.advance(10);
    }

    // 6000ms total: exactly one reclamation.
    assert_eq!(h.memory.reclaims.load(Ordering::Relaxed), 1);
}

#[test]
fn test_maintenance_cycle_gate_limits_slow_cycles() {
    // 1s cycles keep the time gate open; the count gate paces reclaims.
    let config = EngineConfig::default().with_gc_gates(30, 5000);
    let mut h = harness(config, Some(ScriptedDetector::default()));

    for _ in 0..60 {
        h.engine.cycle().unwrap();
        h.clock.advance(1000);
    }

    assert_eq!(h.memory.reclaims.load(Ordering::Relaxed), 2);
}

#[test]
fn test_audio_cycle_requires_mode_and_flag() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));

    // Mode alone does not start audio work.
    h.link
        .push_inbound(&command_line("set_mode", json!({ "mode": "audio_processing" })));
    h.engine.cycle().unwrap();
    assert_eq!(h.audio.calls.load(Ordering::Relaxed), 0);

    // The flag alone (mode back to idle) does not either.
    let mut bytes = Vec::new();
    bytes.extend(command_line("set_mode", json!({ "mode": "idle" })));
    bytes.extend(command_line("start_audio", json!({})));
    h.link.push_inbound(&bytes);
    h.engine.cycle().unwrap();
    assert_eq!(h.audio.calls.load(Ordering::Relaxed), 0);

    // Both together: the audio hook runs on the tick that sees both.
    h.link
        .push_inbound(&command_line("set_mode", json!({ "mode": "audio_processing" })));
    h.engine.cycle().unwrap();
    assert_eq!(h.audio.calls.load(Ordering::Relaxed), 1);

    // stop_audio turns it back off without leaving the mode.
    h.link.push_inbound(&command_line("stop_audio", json!({})));
    h.engine.cycle().unwrap();
    assert_eq!(h.engine.mode(), Mode::AudioProcessing);
    assert_eq!(h.audio.calls.load(Ordering::Relaxed), 1);
}

#[test]
fn test_end_to_end_audio_enable_invoked_next_tick_not_before() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));

    let mut bytes = Vec::new();
    bytes.extend(command_line("set_mode", json!({ "mode": "audio_processing" })));
    bytes.extend(command_line("start_audio", json!({})));
    h.link.push_inbound(&bytes);

    assert_eq!(h.audio.calls.load(Ordering::Relaxed), 0, "not before the tick");
    h.engine.cycle().unwrap();
    assert_eq!(h.audio.calls.load(Ordering::Relaxed), 1, "on the next tick");
}

#[test]
fn test_audio_payload_becomes_audio_event() {
    let link = FakeLink::default();
    let audio = CountingAudio {
        calls: Arc::new(AtomicUsize::new(0)),
        payload: Some(json!({ "wake_word": "visor" })),
    };
    let mut engine = Engine::new(
        EngineConfig::default(),
        Collaborators {
            link: Box::new(link.clone()),
            camera: Box::new(StaticCamera { level: 128 }),
            detector: None,
            audio: Box::new(audio),
            display: Box::new(NoopDisplay),
            memory: Box::new(CountingMemory::default()),
            clock: Box::new(FakeClock::default()),
        },
    );

    let mut bytes = Vec::new();
    bytes.extend(command_line("set_mode", json!({ "mode": "audio_processing" })));
    bytes.extend(command_line("start_audio", json!({})));
    link.push_inbound(&bytes);
    engine.cycle().unwrap();

    let events = link.events_of("audio_event");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["data"]["wake_word"], "visor");
}

#[test]
fn test_queue_overflow_drops_oldest_deterministically() {
    let config = EngineConfig::default().with_queue_capacity(2);
    let mut h = harness(config, Some(ScriptedDetector::default()));

    // Four commands into a capacity-2 queue: the first two are evicted.
    let mut bytes = Vec::new();
    bytes.extend(command_line("set_mode", json!({ "mode": "face_detection" })));
    bytes.extend(command_line("set_mode", json!({ "mode": "sleep" })));
    bytes.extend(command_line("set_mode", json!({ "mode": "image_analysis" })));
    bytes.extend(command_line("system_status", json!({})));
    h.link.push_inbound(&bytes);

    h.engine.cycle().unwrap();

    assert_eq!(h.engine.mode(), Mode::ImageAnalysis);
    let statuses = h.link.events_of("status_response");
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0]["data"]["mode"], "image_analysis");
}

#[test]
fn test_degraded_mode_without_detector_keeps_running() {
    let mut h = harness(EngineConfig::default(), None);

    for _ in 0..5 {
        h.engine.cycle().unwrap();
    }
    assert!(h.link.events_of("face_detection").is_empty());

    // Image analysis does not depend on the detector.
    h.link.push_inbound(&command_line("capture_image", json!({})));
    h.engine.cycle().unwrap();
    let events = h.link.events_of("image_analysis");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["data"]["brightness"], 128.0);
}

#[test]
fn test_capture_image_runs_regardless_of_mode() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));

    let mut bytes = Vec::new();
    bytes.extend(command_line("set_mode", json!({ "mode": "sleep" })));
    bytes.extend(command_line("capture_image", json!({})));
    h.link.push_inbound(&bytes);
    h.engine.cycle().unwrap();

    assert_eq!(h.engine.mode(), Mode::Sleep);
    assert_eq!(h.link.events_of("image_analysis").len(), 1);

    // Unlike face events, analysis emits every time it runs.
    h.link.push_inbound(&command_line("capture_image", json!({})));
    h.engine.cycle().unwrap();
    assert_eq!(h.link.events_of("image_analysis").len(), 2);
}

#[test]
fn test_idle_mode_still_senses() {
    let mut h = harness(
        EngineConfig::default(),
        Some(ScriptedDetector::script(&[1])),
    );

    assert_eq!(h.engine.mode(), Mode::Idle);
    h.engine.cycle().unwrap();

    let events = h.link.events_of("face_detection");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["data"]["detected"], true);
}

#[test]
fn test_sleep_and_image_analysis_modes_do_not_sense() {
    let mut h = harness(
        EngineConfig::default(),
        Some(ScriptedDetector::script(&[1, 1, 1, 1])),
    );

    h.link.push_inbound(&command_line("set_mode", json!({ "mode": "sleep" })));
    h.engine.cycle().unwrap();
    h.link
        .push_inbound(&command_line("set_mode", json!({ "mode": "image_analysis" })));
    h.engine.cycle().unwrap();

    assert!(h.link.events_of("face_detection").is_empty());
}

#[test]
fn test_record_split_across_reads_is_reassembled() {
    let mut h = harness(EngineConfig::default(), Some(ScriptedDetector::default()));

    let line = command_line("set_mode", json!({ "mode": "sleep" }));
    let (head, tail) = line.split_at(line.len() / 2);

    h.link.push_inbound(head);
    h.engine.cycle().unwrap();
    assert_eq!(h.engine.mode(), Mode::Idle, "half a record is not a command");

    h.link.push_inbound(tail);
    h.engine.cycle().unwrap();
    assert_eq!(h.engine.mode(), Mode::Sleep);
}

#[test]
fn test_status_reports_face_presence() {
    let mut h = harness(
        EngineConfig::default(),
        Some(ScriptedDetector::script(&[2, 2])),
    );

    h.engine.cycle().unwrap();
    h.link.push_inbound(&command_line("system_status", json!({})));
    h.engine.cycle().unwrap();

    let statuses = h.link.events_of("status_response");
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0]["data"]["face_detected"], true);
}

#[test]
fn test_camera_failure_is_a_cycle_error() {
    let link = FakeLink::default();
    let mut engine = Engine::new(
        EngineConfig::default(),
        Collaborators {
            link: Box::new(link.clone()),
            camera: Box::new(FailingCamera),
            detector: Some(Box::new(ScriptedDetector::default())),
            audio: Box::new(CountingAudio::default()),
            display: Box::new(NoopDisplay),
            memory: Box::new(CountingMemory::default()),
            clock: Box::new(FakeClock::default()),
        },
    );

    let err = engine.cycle().unwrap_err();
    assert!(matches!(err, CycleError::Camera(_)));
}

#[test]
fn test_run_recovers_from_cycle_errors_and_reports_them() {
    let link = FakeLink::default();
    let config = EngineConfig::default().with_tick_ms(1);
    let mut engine = Engine::new(
        EngineConfig { error_backoff_ms: 1, ..config },
        Collaborators {
            link: Box::new(link.clone()),
            camera: Box::new(FailingCamera),
            detector: Some(Box::new(ScriptedDetector::default())),
            audio: Box::new(CountingAudio::default()),
            display: Box::new(NoopDisplay),
            memory: Box::new(CountingMemory::default()),
            clock: Box::new(FakeClock::default()),
        },
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stopper = Arc::clone(&stop);
    let handle = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(50));
        stopper.store(true, Ordering::Relaxed);
    });

    engine.run(&stop);
    handle.join().unwrap();

    assert_eq!(link.events_of("startup").len(), 1);
    let errors = link.events_of("error");
    assert!(!errors.is_empty(), "cycle failures surface as error events");
    assert!(errors[0]["data"]["message"]
        .as_str()
        .unwrap()
        .contains("sensor timeout"));
}

#[test]
fn test_overlays_follow_detections() {
    let link = FakeLink::default();
    let display = RecordingDisplay::default();
    let mut engine = Engine::new(
        EngineConfig::default(),
        Collaborators {
            link: Box::new(link.clone()),
            camera: Box::new(StaticCamera { level: 64 }),
            detector: Some(Box::new(ScriptedDetector::script(&[2]))),
            audio: Box::new(CountingAudio::default()),
            display: Box::new(display.clone()),
            memory: Box::new(CountingMemory::default()),
            clock: Box::new(FakeClock::default()),
        },
    );

    engine.cycle().unwrap();

    assert_eq!(display.frames.load(Ordering::Relaxed), 1);
    let overlays = display.last_overlays.lock().unwrap().clone();
    let rects = overlays
        .iter()
        .filter(|o| matches!(o, Overlay::Rect { .. }))
        .count();
    assert_eq!(rects, 2);
    assert!(overlays
        .iter()
        .any(|o| matches!(o, Overlay::Label { text, .. } if text == "Faces: 2")));
}
