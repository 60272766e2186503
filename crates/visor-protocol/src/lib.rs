//! Visor Serial Wire Protocol
//!
//! This crate provides types and utilities for the serial link between the
//! visor coprocessor core and its host controller. The link carries one
//! JSON record per line, UTF-8 encoded and newline-terminated, in both
//! directions.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → core): `{"type": <kind>, "data": {...}}`
//! - **Events** (core → host): `{"type": <kind>, "timestamp": <ms>, "data": {...}}`
//!
//! Recognized command kinds are `set_mode`, `capture_image`, `start_audio`,
//! `stop_audio` and `system_status`. Event kinds are `startup`,
//! `face_detection`, `image_analysis`, `audio_event`, `status_response`
//! and `error`.
//!
//! Malformed or unrecognized inbound records are reported as
//! [`ProtocolError`]s; the core drops them and keeps running. Framing is
//! handled by [`LineCodec`], which accumulates partial lines across reads.
//!
//! # Example
//!
//! ```rust,ignore
//! use visor_protocol::{Command, Event, LineCodec};
//!
//! let mut codec = LineCodec::new();
//! codec.push(b"{\"type\":\"system_status\",\"data\":{}}\n");
//! while let Some(record) = codec.next_record() {
//!     let command = Command::parse(&record)?;
//! }
//! ```

mod codec;
mod commands;
mod constants;
mod error;
mod events;
mod types;

pub use codec::*;
pub use commands::*;
pub use constants::*;
pub use error::*;
pub use events::*;
pub use types::*;
