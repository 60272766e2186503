//! Commands the host can send to the coprocessor core.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::Mode;

/// A validated inbound command.
///
/// Commands are parsed once from wire bytes and are immutable thereafter.
/// Per-kind required fields are checked at parse time, so the dispatcher
/// never inspects raw payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the active operating mode.
    SetMode {
        /// The target mode.
        mode: Mode,
    },
    /// Run a one-off image analysis, regardless of the active mode.
    CaptureImage,
    /// Enable the audio pipeline flag.
    StartAudio,
    /// Disable the audio pipeline flag.
    StopAudio,
    /// Request an immediate status report.
    SystemStatus,
}

/// Raw wire shape of an inbound record.
#[derive(Debug, Deserialize)]
struct WireCommand {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

impl Command {
    /// The wire kind string for this command.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SetMode { .. } => CMD_SET_MODE,
            Command::CaptureImage => CMD_CAPTURE_IMAGE,
            Command::StartAudio => CMD_START_AUDIO,
            Command::StopAudio => CMD_STOP_AUDIO,
            Command::SystemStatus => CMD_SYSTEM_STATUS,
        }
    }

    /// Parse one framed record into a command.
    ///
    /// Fails with [`ProtocolError::MalformedJson`] when the record is not
    /// JSON, [`ProtocolError::UnknownCommand`] when the `type` field is
    /// absent or unrecognized, and [`ProtocolError::MissingField`] /
    /// [`ProtocolError::InvalidMode`] when a required payload field is bad.
    /// All failures are non-fatal; the caller logs and drops the record.
    pub fn parse(record: &[u8]) -> Result<Command, ProtocolError> {
        let wire: WireCommand = serde_json::from_slice(record)?;
        let kind = wire.kind.unwrap_or_default();

        match kind.as_str() {
            CMD_SET_MODE => {
                let mode_str = wire
                    .data
                    .get("mode")
                    .and_then(Value::as_str)
                    .ok_or(ProtocolError::MissingField {
                        kind: CMD_SET_MODE,
                        field: "mode",
                    })?;
                let mode = Mode::from_wire(mode_str)
                    .ok_or_else(|| ProtocolError::InvalidMode(mode_str.to_string()))?;
                Ok(Command::SetMode { mode })
            }
            CMD_CAPTURE_IMAGE => Ok(Command::CaptureImage),
            CMD_START_AUDIO => Ok(Command::StartAudio),
            CMD_STOP_AUDIO => Ok(Command::StopAudio),
            CMD_SYSTEM_STATUS => Ok(Command::SystemStatus),
            _ => Err(ProtocolError::UnknownCommand(kind)),
        }
    }

    /// Encode this command as one wire record, without framing.
    ///
    /// Used by the host side of the link and by round-trip tests.
    pub fn encode(&self) -> Vec<u8> {
        let data = match self {
            Command::SetMode { mode } => json!({ "mode": mode.as_str() }),
            _ => json!({}),
        };
        json!({ "type": self.kind(), "data": data })
            .to_string()
            .into_bytes()
    }
}
