//! Shared protocol types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Operating modes of the coprocessor core.
///
/// Exactly one mode is active at a time. Every mode is reachable from
/// every other mode; switching has no side effect beyond the stored
/// value. Mode-specific resources (the audio pipeline flag) are toggled
/// by dedicated commands, not by entering a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No dedicated task. Face sensing still runs to keep the preview live.
    #[default]
    Idle,
    /// Continuous face detection.
    FaceDetection,
    /// Audio pipeline work (only while the audio flag is active).
    AudioProcessing,
    /// On-demand image analysis; no per-tick sensing.
    ImageAnalysis,
    /// Low-power state; no sensing.
    Sleep,
}

impl Mode {
    /// The wire string for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => MODE_IDLE,
            Mode::FaceDetection => MODE_FACE_DETECTION,
            Mode::AudioProcessing => MODE_AUDIO_PROCESSING,
            Mode::ImageAnalysis => MODE_IMAGE_ANALYSIS,
            Mode::Sleep => MODE_SLEEP,
        }
    }

    /// Parse a wire mode string. Returns `None` for unrecognized strings.
    pub fn from_wire(s: &str) -> Option<Mode> {
        match s {
            MODE_IDLE => Some(Mode::Idle),
            MODE_FACE_DETECTION => Some(Mode::FaceDetection),
            MODE_AUDIO_PROCESSING => Some(Mode::AudioProcessing),
            MODE_IMAGE_ANALYSIS => Some(Mode::ImageAnalysis),
            MODE_SLEEP => Some(Mode::Sleep),
            _ => None,
        }
    }

    /// All modes, for iteration in tests and diagnostics.
    pub fn all() -> [Mode; 5] {
        [
            Mode::Idle,
            Mode::FaceDetection,
            Mode::AudioProcessing,
            Mode::ImageAnalysis,
            Mode::Sleep,
        ]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned bounding box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One detection produced by the inference collaborator.
///
/// Detections are ephemeral: they are embedded in at most one outbound
/// event and never stored. Confidence and box pass through from the
/// detector unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index of the detection within its frame.
    pub id: u32,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    /// Bounding box of the detection.
    pub rect: BoundingBox,
}
