//! Call Bridge API Library Crate
//!
//! This library contains the service wiring for the call bridge: configuration,
//! shared state, the telephony webhook, the LLM WebSocket endpoint, and
//! routing. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
