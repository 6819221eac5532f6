//! Manages the LLM WebSocket connection lifecycle for a registered call.

use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use callbridge_core::{
    error::ConnectionError,
    protocol::{self, ResponseFragment},
    session::{FragmentSink, InboundFrame, Session},
};
use futures_util::{
    SinkExt, Stream, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(call_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, call_id, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Splits the socket, hands the outbound half to a new [`Session`] and runs
/// the session loop over the inbound half until the provider hangs up.
#[instrument(name = "ws_session", skip_all, fields(call_id = %call_id, conn_id))]
async fn handle_socket(socket: WebSocket, call_id: String, state: Arc<AppState>) {
    let conn_id: u32 = rand::random();
    tracing::Span::current().record("conn_id", conn_id);
    info!("New LLM WebSocket connection.");

    let (socket_tx, socket_rx) = socket.split();
    let session = Session::new(
        call_id,
        WsFragmentSink(socket_tx),
        state.completion.clone(),
        state.session_settings.clone(),
    );

    match session.run(inbound_frames(socket_rx)).await {
        Ok(()) => info!("LLM session finished."),
        Err(e) => error!(error = ?e, "LLM session terminated with error."),
    }
}

/// Adapts raw WebSocket messages to the frames the session understands.
fn inbound_frames(
    socket_rx: SplitStream<WebSocket>,
) -> impl Stream<Item = Result<InboundFrame, ConnectionError>> + Unpin + Send {
    Box::pin(socket_rx.filter_map(|msg_result| async move {
        match msg_result {
            Ok(Message::Text(text)) => Some(Ok(InboundFrame::Text(text.as_str().to_owned()))),
            Ok(Message::Close(_)) => Some(Ok(InboundFrame::Close)),
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary frame.");
                None
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
            Err(e) => Some(Err(ConnectionError::Transport(e.to_string()))),
        }
    }))
}

/// The outbound half of the socket, owned by exactly one session.
struct WsFragmentSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FragmentSink for WsFragmentSink {
    async fn send_fragment(&mut self, fragment: &ResponseFragment) -> Result<(), ConnectionError> {
        send_msg(&mut self.0, fragment).await
    }
}

/// A helper function to serialize and send a `ResponseFragment` to the provider.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    fragment: &ResponseFragment,
) -> Result<(), ConnectionError> {
    let serialized = protocol::encode_fragment(fragment)?;
    socket_tx
        .send(Message::Text(serialized.into()))
        .await
        .map_err(|e| ConnectionError::Transport(e.to_string()))
}
