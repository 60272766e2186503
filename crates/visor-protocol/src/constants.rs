//! Protocol constants.

/// Maximum accepted line length, matching the serial read buffer on the
/// device. Longer runs without a newline are treated as garbage.
pub const MAX_LINE_LENGTH: usize = 4096;

// ============================================================================
// Command kinds (host → core)
// ============================================================================

/// Switch the active operating mode.
pub const CMD_SET_MODE: &str = "set_mode";
/// Run a one-off image analysis on the next captured frame.
pub const CMD_CAPTURE_IMAGE: &str = "capture_image";
/// Enable the audio pipeline flag.
pub const CMD_START_AUDIO: &str = "start_audio";
/// Disable the audio pipeline flag.
pub const CMD_STOP_AUDIO: &str = "stop_audio";
/// Request an immediate status report.
pub const CMD_SYSTEM_STATUS: &str = "system_status";

// ============================================================================
// Event kinds (core → host)
// ============================================================================

/// Sent once when the core finishes startup.
pub const EVT_STARTUP: &str = "startup";
/// Edge-triggered face presence change.
pub const EVT_FACE_DETECTION: &str = "face_detection";
/// Result of an image analysis pass.
pub const EVT_IMAGE_ANALYSIS: &str = "image_analysis";
/// Output from the audio pipeline.
pub const EVT_AUDIO_EVENT: &str = "audio_event";
/// Reply to a `system_status` command.
pub const EVT_STATUS_RESPONSE: &str = "status_response";
/// A cycle-level failure the core recovered from.
pub const EVT_ERROR: &str = "error";

// ============================================================================
// Mode strings
// ============================================================================

pub const MODE_IDLE: &str = "idle";
pub const MODE_FACE_DETECTION: &str = "face_detection";
pub const MODE_AUDIO_PROCESSING: &str = "audio_processing";
pub const MODE_IMAGE_ANALYSIS: &str = "image_analysis";
pub const MODE_SLEEP: &str = "sleep";
