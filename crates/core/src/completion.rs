//! Cancellable, time-bounded wrapper around a [`CompletionBackend`] stream.

use crate::{
    error::GenerationError,
    llm_client::CompletionBackend,
    prompt::PromptMessage,
};
use futures::{Stream, StreamExt};
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

const FRAGMENT_BUFFER: usize = 64;

/// Default upper bound on the lifetime of one generation.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens generations against a backend on behalf of sessions.
#[derive(Clone)]
pub struct CompletionStreamAdapter {
    backend: Arc<dyn CompletionBackend>,
    timeout: Duration,
}

impl CompletionStreamAdapter {
    pub fn new(backend: Arc<dyn CompletionBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Starts a generation and returns its fragment stream.
    ///
    /// A pump task reads the backend stream and forwards fragments until the
    /// backend finishes, fails, times out, or `cancel` fires. The returned
    /// stream ends as soon as `cancel` is signalled, discarding anything the
    /// pump had already buffered.
    pub fn start(&self, cancel: CancellationToken, messages: Vec<PromptMessage>) -> GenerationStream {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let backend = self.backend.clone();
        let timeout = self.timeout;
        let pump_cancel = cancel.clone();

        tokio::spawn(
            async move {
                tokio::select! {
                    biased;
                    _ = pump_cancel.cancelled() => {
                        debug!("Generation cancelled; releasing backend stream.");
                    }
                    result = tokio::time::timeout(timeout, pump(backend, messages, &tx)) => {
                        let failure = match result {
                            Ok(Ok(())) => None,
                            Ok(Err(e)) => Some(e),
                            Err(_) => {
                                warn!(?timeout, "Generation timed out.");
                                Some(GenerationError::Timeout(timeout))
                            }
                        };
                        if let Some(e) = failure {
                            let _ = tx.send(Err(e)).await;
                        }
                    }
                }
            }
            .in_current_span(),
        );

        GenerationStream {
            inner: ReceiverStream::new(rx),
            cancel,
        }
    }
}

async fn pump(
    backend: Arc<dyn CompletionBackend>,
    messages: Vec<PromptMessage>,
    tx: &mpsc::Sender<Result<String, GenerationError>>,
) -> Result<(), GenerationError> {
    let mut stream = backend.stream_completion(messages).await?;
    while let Some(item) = stream.next().await {
        let fragment = item?;
        if tx.send(Ok(fragment)).await.is_err() {
            // The session dropped the handle; nobody is listening any more.
            break;
        }
    }
    Ok(())
}

/// Fragments of a single generation. Ends with `None` on completion or cancellation.
pub struct GenerationStream {
    inner: ReceiverStream<Result<String, GenerationError>>,
    cancel: CancellationToken,
}

impl Stream for GenerationStream {
    type Item = Result<String, GenerationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{CompletionStream, MockCompletionBackend};
    use futures::stream;

    fn adapter_with(mock: MockCompletionBackend, timeout: Duration) -> CompletionStreamAdapter {
        CompletionStreamAdapter::new(Arc::new(mock), timeout)
    }

    fn fragments(items: &[&str]) -> CompletionStream {
        let items: Vec<Result<String, GenerationError>> =
            items.iter().map(|s| Ok(s.to_string())).collect();
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_forwards_fragments_then_ends() {
        let mut mock = MockCompletionBackend::new();
        mock.expect_stream_completion()
            .times(1)
            .returning(|_| Ok(fragments(&["Hel", "lo"])));
        let adapter = adapter_with(mock, DEFAULT_GENERATION_TIMEOUT);

        let items: Vec<_> = adapter.start(CancellationToken::new(), vec![]).collect().await;
        assert_eq!(items, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
    }

    #[tokio::test]
    async fn test_backend_open_failure_surfaces_as_error() {
        let mut mock = MockCompletionBackend::new();
        mock.expect_stream_completion()
            .returning(|_| Err(GenerationError::Backend("boom".into())));
        let adapter = adapter_with(mock, DEFAULT_GENERATION_TIMEOUT);

        let items: Vec<_> = adapter.start(CancellationToken::new(), vec![]).collect().await;
        assert_eq!(items, vec![Err(GenerationError::Backend("boom".into()))]);
    }

    #[tokio::test]
    async fn test_mid_stream_error_stops_the_stream() {
        let mut mock = MockCompletionBackend::new();
        mock.expect_stream_completion().returning(|_| {
            let items: Vec<Result<String, GenerationError>> = vec![
                Ok("a".into()),
                Err(GenerationError::Backend("reset".into())),
                Ok("never".into()),
            ];
            Ok(Box::pin(stream::iter(items)) as CompletionStream)
        });
        let adapter = adapter_with(mock, DEFAULT_GENERATION_TIMEOUT);

        let items: Vec<_> = adapter.start(CancellationToken::new(), vec![]).collect().await;
        assert_eq!(
            items,
            vec![Ok("a".to_string()), Err(GenerationError::Backend("reset".into()))]
        );
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out() {
        let mut mock = MockCompletionBackend::new();
        mock.expect_stream_completion()
            .returning(|_| Ok(Box::pin(stream::pending()) as CompletionStream));
        let timeout = Duration::from_millis(50);
        let adapter = adapter_with(mock, timeout);

        let items: Vec<_> = adapter.start(CancellationToken::new(), vec![]).collect().await;
        assert_eq!(items, vec![Err(GenerationError::Timeout(timeout))]);
    }

    #[tokio::test]
    async fn test_cancellation_discards_buffered_fragments() {
        let mut mock = MockCompletionBackend::new();
        mock.expect_stream_completion()
            .returning(|_| Ok(fragments(&["one", "two", "three"])));
        let adapter = adapter_with(mock, DEFAULT_GENERATION_TIMEOUT);
        let cancel = CancellationToken::new();
        let mut generation = adapter.start(cancel.clone(), vec![]);

        assert_eq!(generation.next().await, Some(Ok("one".to_string())));
        cancel.cancel();
        assert_eq!(generation.next().await, None);
    }

    #[tokio::test]
    async fn test_cancellation_releases_backend_stream() {
        let (feed_tx, feed_rx) = mpsc::channel::<Result<String, GenerationError>>(4);
        let mut feed = Some(feed_rx);
        let mut mock = MockCompletionBackend::new();
        mock.expect_stream_completion().returning(move |_| {
            let rx = feed.take().expect("started once");
            Ok(Box::pin(ReceiverStream::new(rx)) as CompletionStream)
        });
        let adapter = adapter_with(mock, DEFAULT_GENERATION_TIMEOUT);
        let cancel = CancellationToken::new();
        let mut generation = adapter.start(cancel.clone(), vec![]);

        feed_tx.send(Ok("first".into())).await.unwrap();
        assert_eq!(generation.next().await, Some(Ok("first".to_string())));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), feed_tx.closed())
            .await
            .expect("backend stream should be dropped after cancellation");
    }
}
