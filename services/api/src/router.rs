//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the telephony webhook, the LLM WebSocket endpoint, and the
//! OpenAPI documentation.

use crate::{handlers, models::ErrorResponse, state::AppState, ws::ws_handler};

use axum::{
    Router,
    routing::{any, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::twilio_webhook),
    components(schemas(ErrorResponse)),
    tags(
        (name = "Call Bridge", description = "Telephony webhook for the voice-agent bridge")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/twilio-webhook/{agent_id}", post(handlers::twilio_webhook))
        .route("/llm-websocket/{call_id}", any(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
