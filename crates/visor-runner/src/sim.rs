//! Dev-host stand-ins for the on-device collaborators.
//!
//! Real builds wire the engine to camera and NPU drivers. On a
//! development host those do not exist, so the runner supplies a test
//! pattern camera and a trivially cheap detector. Both speak the real
//! collaborator traits; the engine cannot tell the difference.

use std::path::Path;

use visor_engine::{Camera, CameraError, DetectError, FaceDetector, Frame, ModelLoadError};
use visor_protocol::{BoundingBox, Detection};

/// Camera that produces a slowly pulsing flat-field pattern.
///
/// The pulse sweeps the full luma range over 512 frames, so brightness
/// metrics and the threshold detector both change state at a rate a
/// human watching the event stream can follow.
pub struct TestPatternCamera {
    width: u32,
    height: u32,
    frame_counter: u64,
}

impl TestPatternCamera {
    pub fn new(width: u32, height: u32) -> Self {
        TestPatternCamera { width, height, frame_counter: 0 }
    }
}

impl Camera for TestPatternCamera {
    fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        self.frame_counter += 1;
        let phase = (self.frame_counter % 512) as i64;
        let level = if phase < 256 { phase } else { 511 - phase } as u8;
        let luma = vec![level; Frame::pixel_count(self.width, self.height)];
        Ok(Frame::new(self.width, self.height, luma))
    }
}

/// Stand-in detector: reports one centered "face" whenever the frame is
/// brighter than a threshold.
///
/// Combined with [`TestPatternCamera`] this produces realistic
/// edge-triggered face events on a host with no inference hardware.
#[derive(Debug)]
pub struct BrightnessGateDetector {
    threshold: f64,
}

impl BrightnessGateDetector {
    pub fn new(threshold: f64) -> Self {
        BrightnessGateDetector { threshold }
    }
}

impl FaceDetector for BrightnessGateDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        if frame.mean_luma() <= self.threshold {
            return Ok(Vec::new());
        }
        let w = frame.width / 2;
        let h = frame.height / 2;
        Ok(vec![Detection {
            id: 0,
            confidence: 0.75,
            rect: BoundingBox { x: frame.width / 4, y: frame.height / 4, w, h },
        }])
    }
}

/// Load the inference collaborator for a model path.
///
/// The file's existence is what gets checked; its contents stand in for
/// a real model blob. A missing or unreadable file is the degraded-mode
/// path the engine handles at startup.
pub fn load_model(path: &Path) -> Result<Box<dyn FaceDetector>, ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::NotFound(path.display().to_string()));
    }
    std::fs::metadata(path).map_err(|e| ModelLoadError::Load(e.to_string()))?;
    Ok(Box::new(BrightnessGateDetector::new(160.0)))
}
