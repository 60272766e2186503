//! Error taxonomy for the engine.
//!
//! Nothing here is fatal. Protocol errors are dropped with a log at the
//! receive step; transport errors skip the rest of the cycle; every other
//! cycle error is caught at the loop boundary and followed by a short
//! backoff. Model load failures at startup degrade the engine to running
//! without face detection.

use thiserror::Error;

/// The inference collaborator could not be loaded at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// The model file does not exist.
    #[error("model file not found: {0}")]
    NotFound(String),

    /// The model file exists but could not be loaded.
    #[error("failed to load model: {0}")]
    Load(String),
}

/// Read or write failure on the serial link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading from the link failed.
    #[error("serial read failed: {0}")]
    Read(String),

    /// Writing to the link failed.
    #[error("serial write failed: {0}")]
    Write(String),

    /// The link is gone and will not come back.
    #[error("serial link closed")]
    Closed,
}

/// Frame capture failure.
#[derive(Debug, Error)]
#[error("camera: {0}")]
pub struct CameraError(pub String);

/// Inference failure on a captured frame.
#[derive(Debug, Error)]
#[error("detector: {0}")]
pub struct DetectError(pub String);

/// Audio pipeline failure.
#[derive(Debug, Error)]
#[error("audio pipeline: {0}")]
pub struct AudioError(pub String);

/// Any failure inside a single cycle's processing.
///
/// Collected at the loop boundary; the loop logs, backs off and continues.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Serial link failure; the cycle is skipped without backoff.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Frame capture failed.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Inference failed.
    #[error(transparent)]
    Detector(#[from] DetectError),

    /// Audio pipeline failed.
    #[error(transparent)]
    Audio(#[from] AudioError),
}
