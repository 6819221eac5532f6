//! WebSocket Session Management
//!
//! The voice-agent provider opens one WebSocket per registered call and pushes
//! transcript events over it. `session` upgrades the connection and wires it
//! to a `callbridge_core::session::Session`, which owns all turn logic.

pub mod session;

pub use session::ws_handler;
