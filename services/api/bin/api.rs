//! Main Entrypoint for the Call Bridge Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Initializing shared services (the completion backend and the call registrar).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use callbridge_api::{config::Config, router::create_router, state::AppState};
use callbridge_core::{
    completion::CompletionStreamAdapter,
    llm_client::{CompletionParams, OpenAICompatibleClient},
    prompt::DEFAULT_SYSTEM_DIRECTIVE,
    registrar::{AudioSettings, RetellRegistrar},
    session::SessionSettings,
};
use std::{fs, net::SocketAddr, path::Path, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C.");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Loads `system_prompt.md` from the prompts directory, if present.
fn load_system_directive(prompts_path: &Path) -> anyhow::Result<String> {
    let path = prompts_path.join("system_prompt.md");
    if !path.is_file() {
        info!(path = %path.display(), "No system prompt file found. Using built-in directive.");
        return Ok(DEFAULT_SYSTEM_DIRECTIVE.to_string());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let system_directive = Arc::new(load_system_directive(&config.prompts_path)?);

    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.openai_api_key)
        .with_api_base(&config.openai_api_base);
    let backend = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
        CompletionParams {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        },
    ));
    let registrar = Arc::new(RetellRegistrar::new(
        &config.retell_api_base,
        &config.retell_api_key,
        AudioSettings::default(),
    ));

    let app_state = Arc::new(AppState {
        completion: CompletionStreamAdapter::new(backend, config.generation_timeout),
        registrar,
        session_settings: SessionSettings {
            system_directive,
            max_history_turns: config.max_history_turns,
        },
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        model = %config.chat_model,
        bind_address = %config.bind_address,
        generation_timeout = ?config.generation_timeout,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
