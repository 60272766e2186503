//! Host-side runner for the visor engine.
//!
//! Wires the cycle controller to a TCP serial bridge and dev-host
//! collaborator stand-ins so the whole control core can run and be
//! exercised without coprocessor hardware.

pub mod sim;
pub mod transport;
