//! Per-call turn orchestration.
//!
//! A [`Session`] owns one call's transcript, at most one live generation and
//! the outbound half of the connection. It is driven by a single sequential
//! loop ([`Session::run`]) so history and the sink are never touched
//! concurrently.

use crate::{
    completion::{CompletionStreamAdapter, GenerationStream},
    error::{ConnectionError, GenerationError},
    prompt::{self, DEFAULT_MAX_HISTORY_TURNS, DEFAULT_SYSTEM_DIRECTIVE},
    protocol::{self, ResponseFragment, TranscriptEvent, Turn},
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Opening line spoken as soon as the call connects.
pub const GREETING: &str = "Hello, I'm your AI buddy. How did your day go?";
/// Appended after a generation that produced content.
pub const END_MARKER: &str = "\n\n###### [END] ######";
/// Sent instead of content when a generation fails or produces nothing.
pub const FALLBACK_MARKER: &str = "[ERROR] NO RESPONSE, PLEASE RETRY";

/// The outbound half of the duplex connection.
#[async_trait]
pub trait FragmentSink: Send {
    async fn send_fragment(&mut self, fragment: &ResponseFragment) -> Result<(), ConnectionError>;
}

/// A frame read from the inbound half of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Generating,
    Closed,
}

/// Per-session knobs, built once from the service configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub system_directive: Arc<String>,
    pub max_history_turns: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            system_directive: Arc::new(DEFAULT_SYSTEM_DIRECTIVE.to_string()),
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
        }
    }
}

/// The live handle to one in-progress generation.
pub struct GenerationHandle {
    response_id: i64,
    cancel: CancellationToken,
    stream: GenerationStream,
    delivered: usize,
}

impl GenerationHandle {
    pub fn response_id(&self) -> i64 {
        self.response_id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn fragments_delivered(&self) -> usize {
        self.delivered
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

enum GenerationStep {
    Fragment(String),
    Failed(GenerationError),
    Finished,
}

pub struct Session<S> {
    call_id: String,
    history: Vec<Turn>,
    state: SessionState,
    active: Option<GenerationHandle>,
    sink: S,
    adapter: CompletionStreamAdapter,
    settings: SessionSettings,
}

impl<S: FragmentSink> Session<S> {
    pub fn new(
        call_id: impl Into<String>,
        sink: S,
        adapter: CompletionStreamAdapter,
        settings: SessionSettings,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            history: Vec::new(),
            state: SessionState::Idle,
            active: None,
            sink,
            adapter,
            settings,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn active_generation(&self) -> Option<&GenerationHandle> {
        self.active.as_ref()
    }

    /// Drives the session until the connection closes or fails.
    ///
    /// Sends the greeting, then interleaves inbound transcript frames with
    /// fragments of the active generation. The active generation is always
    /// cancelled before this returns.
    #[instrument(name = "llm_session", skip_all, fields(call_id = %self.call_id))]
    pub async fn run<I>(mut self, inbound: I) -> Result<(), ConnectionError>
    where
        I: Stream<Item = Result<InboundFrame, ConnectionError>> + Unpin + Send,
    {
        let result = self.drive(inbound).await;
        if let Err(e) = &result {
            warn!(error = %e, "Session ended with a connection error.");
        }
        self.on_disconnect();
        result
    }

    async fn drive<I>(&mut self, mut inbound: I) -> Result<(), ConnectionError>
    where
        I: Stream<Item = Result<InboundFrame, ConnectionError>> + Unpin + Send,
    {
        self.on_connect().await?;

        while self.state != SessionState::Closed {
            tokio::select! {
                frame = inbound.next() => match frame {
                    Some(Ok(InboundFrame::Text(text))) => match protocol::decode_event(&text) {
                        Ok(event) => self.on_transcript(event),
                        Err(e) => warn!(error = %e, "Ignoring undecodable frame."),
                    },
                    Some(Ok(InboundFrame::Close)) | None => {
                        info!("Connection closed by peer.");
                        break;
                    }
                    Some(Err(e)) => return Err(e),
                },
                step = next_step(&mut self.active), if self.active.is_some() => {
                    self.on_generation_step(step).await?;
                }
            }
        }
        Ok(())
    }

    /// Marks the session ready and greets the caller.
    pub async fn on_connect(&mut self) -> Result<(), ConnectionError> {
        self.state = SessionState::Idle;
        info!("Session connected. Sending greeting.");
        self.emit(ResponseFragment {
            response_id: 0,
            content: GREETING.to_string(),
            content_complete: true,
            end_call: false,
        })
        .await
    }

    /// Applies a transcript event, starting a new generation when one is required.
    pub fn on_transcript(&mut self, event: TranscriptEvent) {
        if self.state == SessionState::Closed {
            debug!(response_id = event.response_id, "Ignoring transcript on closed session.");
            return;
        }

        // The provider always sends the full transcript so far.
        self.history = event.transcript;

        if !event.interaction_type.requires_response() {
            debug!(
                response_id = event.response_id,
                turns = self.history.len(),
                "Transcript update; no response required."
            );
            return;
        }

        if let Some(previous) = self.active.take() {
            info!(
                superseded = previous.response_id,
                by = event.response_id,
                "Cancelling superseded generation."
            );
            previous.cancel();
        }

        let messages = prompt::build_prompt(
            &self.settings.system_directive,
            &self.history,
            self.settings.max_history_turns,
        );
        let cancel = CancellationToken::new();
        let stream = self.adapter.start(cancel.clone(), messages);
        self.active = Some(GenerationHandle {
            response_id: event.response_id,
            cancel,
            stream,
            delivered: 0,
        });
        self.state = SessionState::Generating;
        info!(
            response_id = event.response_id,
            interaction_type = ?event.interaction_type,
            "Generation started."
        );
    }

    async fn on_generation_step(&mut self, step: GenerationStep) -> Result<(), ConnectionError> {
        let Some(handle) = self.active.as_mut() else {
            return Ok(());
        };
        let response_id = handle.response_id;

        match step {
            GenerationStep::Fragment(text) => {
                handle.delivered += 1;
                self.emit(ResponseFragment::partial(response_id, text)).await
            }
            GenerationStep::Finished => {
                let delivered = handle.delivered;
                self.finish_generation();
                if delivered == 0 {
                    warn!(response_id, error = %GenerationError::Empty, "Sending fallback.");
                    self.emit(ResponseFragment::partial(response_id, FALLBACK_MARKER))
                        .await
                } else {
                    info!(response_id, fragments = delivered, "Generation finished.");
                    self.emit(ResponseFragment::partial(response_id, END_MARKER))
                        .await
                }
            }
            GenerationStep::Failed(e) => {
                self.finish_generation();
                warn!(response_id, error = %e, "Generation failed. Sending fallback.");
                self.emit(ResponseFragment::partial(response_id, FALLBACK_MARKER))
                    .await
            }
        }
    }

    fn finish_generation(&mut self) {
        self.active = None;
        if self.state == SessionState::Generating {
            self.state = SessionState::Idle;
        }
    }

    /// Cancels any live generation and closes the session for good.
    pub fn on_disconnect(&mut self) {
        if let Some(handle) = self.active.take() {
            debug!(response_id = handle.response_id, "Cancelling generation on disconnect.");
            handle.cancel();
        }
        if self.state != SessionState::Closed {
            info!("Session closed.");
        }
        self.state = SessionState::Closed;
    }

    async fn emit(&mut self, fragment: ResponseFragment) -> Result<(), ConnectionError> {
        if self.state == SessionState::Closed {
            return Err(ConnectionError::Closed);
        }
        self.sink.send_fragment(&fragment).await?;
        if fragment.end_call {
            info!(response_id = fragment.response_id, "End of call sent.");
            self.on_disconnect();
        }
        Ok(())
    }
}

async fn next_step(active: &mut Option<GenerationHandle>) -> GenerationStep {
    let Some(handle) = active.as_mut() else {
        return std::future::pending().await;
    };
    match handle.stream.next().await {
        Some(Ok(text)) => GenerationStep::Fragment(text),
        Some(Err(e)) => GenerationStep::Failed(e),
        None => GenerationStep::Finished,
    }
}
