//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the completion backend and the call registrar.

use crate::config::Config;
use callbridge_core::{
    completion::CompletionStreamAdapter, registrar::CallRegistrar, session::SessionSettings,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub completion: CompletionStreamAdapter,
    pub registrar: Arc<dyn CallRegistrar>,
    pub session_settings: SessionSettings,
    pub config: Arc<Config>,
}
