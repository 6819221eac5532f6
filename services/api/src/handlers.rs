//! Axum Handlers for the REST API
//!
//! This module contains the telephony webhook that registers an inbound call
//! and answers with the voice-routing document. It uses `utoipa` doc comments
//! to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use callbridge_core::voice_routing;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::{models::ErrorResponse, state::AppState};

/// Message returned to the telephony provider when a call cannot be routed.
pub const CALL_UNAVAILABLE: &str = "cannot handle call atm";

pub enum ApiError {
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = CALL_UNAVAILABLE.to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Register an inbound call and route its audio to the voice-agent provider.
#[utoipa::path(
    post,
    path = "/twilio-webhook/{agent_id}",
    responses(
        (status = 200, description = "TwiML document streaming the call audio", body = String, content_type = "text/xml"),
        (status = 500, description = "The call could not be registered", body = ErrorResponse)
    ),
    params(
        ("agent_id" = String, Path, description = "The voice agent that should handle the call")
    )
)]
#[instrument(skip(state))]
pub async fn twilio_webhook(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Response, ApiError> {
    let call = state.registrar.register_call(&agent_id).await?;

    let stream_url = voice_routing::audio_stream_url(&state.config.audio_websocket_base, &call.call_id);
    info!(call_id = %call.call_id, %stream_url, "Routing call audio.");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        voice_routing::stream_document(&stream_url),
    )
        .into_response())
}
