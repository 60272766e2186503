//! Events the coprocessor core sends to the host.

use serde::Serialize;
use serde_json::{json, Value};

use crate::constants::*;
use crate::types::{Detection, Mode};

/// Status report carried by a [`Event::StatusResponse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Active operating mode.
    pub mode: Mode,
    /// Whether a face is currently considered present.
    pub face_detected: bool,
    /// Whether the audio pipeline flag is enabled.
    pub audio_active: bool,
    /// Free memory metric from the memory collaborator, in bytes.
    pub memory_free: u64,
    /// Milliseconds since the core started.
    pub uptime: u64,
}

/// An outbound event record.
///
/// Events are constructed by the cycle controller, serialized immediately
/// and not retained after transmission. The timestamp is captured at
/// serialization time.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Sent once when the core finishes startup.
    Startup {
        /// Capability strings advertised to the host.
        capabilities: Vec<String>,
    },
    /// Edge-triggered face presence change.
    FaceDetection {
        /// Whether a face is now present.
        detected: bool,
        /// Number of detections in the triggering frame.
        count: usize,
        /// The detections themselves.
        faces: Vec<Detection>,
    },
    /// Result of one image analysis pass.
    ImageAnalysis {
        /// Mean luminance of the analyzed frame.
        brightness: f64,
    },
    /// Output produced by the audio pipeline hook.
    AudioEvent {
        /// Pipeline-defined payload.
        data: Value,
    },
    /// Reply to a `system_status` command.
    StatusResponse(StatusReport),
    /// A cycle-level failure the core recovered from.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl Event {
    /// The wire kind string for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Startup { .. } => EVT_STARTUP,
            Event::FaceDetection { .. } => EVT_FACE_DETECTION,
            Event::ImageAnalysis { .. } => EVT_IMAGE_ANALYSIS,
            Event::AudioEvent { .. } => EVT_AUDIO_EVENT,
            Event::StatusResponse(_) => EVT_STATUS_RESPONSE,
            Event::Error { .. } => EVT_ERROR,
        }
    }

    /// Serialize this event as one wire record, without framing.
    ///
    /// Total for well-formed events. `timestamp_ms` is the monotonic
    /// clock reading at serialization time.
    pub fn serialize(&self, timestamp_ms: u64) -> Vec<u8> {
        let data = match self {
            Event::Startup { capabilities } => {
                json!({ "status": "ready", "capabilities": capabilities })
            }
            Event::FaceDetection { detected, count, faces } => {
                json!({ "detected": detected, "count": count, "faces": faces })
            }
            Event::ImageAnalysis { brightness } => {
                json!({ "brightness": brightness })
            }
            Event::AudioEvent { data } => data.clone(),
            Event::StatusResponse(report) => json!(report),
            Event::Error { message } => json!({ "message": message }),
        };
        json!({ "type": self.kind(), "timestamp": timestamp_ms, "data": data })
            .to_string()
            .into_bytes()
    }
}
