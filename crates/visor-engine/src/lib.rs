//! # visor-engine
//!
//! The control core of the visor coprocessor: a cooperative sensing loop
//! that exchanges line-delimited JSON records with a host over a serial
//! link while running mode-dependent detection work.
//!
//! Each cycle runs a fixed step order (receive, drain, sense, maintain,
//! yield) against an explicit set of collaborator traits (camera,
//! detector, display, audio, memory, clock, serial link). See
//! [`engine::Engine`] for the controller and [`hal`] for the seams.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::atomic::AtomicBool;
//! use visor_engine::{Collaborators, Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default(), collaborators);
//! let stop = AtomicBool::new(false);
//! engine.run(&stop);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hal;
pub mod maintenance;
pub mod queue;
pub mod state;
pub mod watchdog;

pub use config::EngineConfig;
pub use engine::{Collaborators, Engine};
pub use error::{
    AudioError, CameraError, CycleError, DetectError, ModelLoadError, TransportError,
};
pub use hal::{
    AudioPipeline, Camera, Clock, Display, FaceDetector, Frame, MemoryMonitor, MonotonicClock,
    NoopAudio, NoopDisplay, Overlay, SerialLink, SystemMemory,
};
pub use maintenance::MaintenanceScheduler;
pub use queue::CommandQueue;
pub use state::{DetectionState, ModeMachine};
pub use watchdog::{Watchdog, WatchdogState};
