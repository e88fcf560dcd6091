//! RoomRelay is a signaling relay for multi-party video calls.
//!
//! Clients join named rooms over a framed TCP protocol; the relay tracks who
//! is in which room, forwards point-to-point negotiation payloads between
//! connections and broadcasts room-scoped messages. Media never passes
//! through it.
//!
//! It provides one binary:
//! - `relay_server`: the relay process.

/// Handles configuration loading and management.
pub mod config;
/// Logging utilities for the relay.
pub mod log;
/// Room registry, relay rules, wire protocol and TCP runtime.
pub mod relay;
/// Blocking client for talking to a relay.
pub mod relay_client;
