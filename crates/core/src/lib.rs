pub mod completion;
pub mod error;
pub mod llm_client;
pub mod prompt;
pub mod protocol;
pub mod registrar;
pub mod session;
pub mod voice_routing;
