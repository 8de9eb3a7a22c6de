//! LlmClient trait definition

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{GenerateRequest, GenerateResponse, LlmError, StreamChunk};

/// Stateless model gateway - each call is independent
///
/// This is the core abstraction for interacting with language models. History
/// travels inside the request; nothing is retained between calls. Tool
/// bindings, the system instruction, and structured-output mode are all
/// per-request.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single generation request (blocking until complete)
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;

    /// Streaming generation
    ///
    /// Sends chunks to the provided channel as they arrive - a lazy, finite,
    /// non-restartable sequence. Returns the final complete response.
    async fn stream(
        &self,
        request: GenerateRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<GenerateResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Scripted outcome for one mock call
    #[derive(Debug, Clone)]
    pub enum MockOutcome {
        Respond(GenerateResponse),
        Fail(String),
    }

    /// Mock model gateway for unit tests
    ///
    /// Replays a fixed script of outcomes in call order; errors surface as
    /// `LlmError::ApiError` so callers exercise their failure paths.
    pub struct MockLlmClient {
        outcomes: Vec<MockOutcome>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<GenerateResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                outcomes: responses.into_iter().map(MockOutcome::Respond).collect(),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn with_outcomes(outcomes: Vec<MockOutcome>) -> Self {
            debug!(outcome_count = %outcomes.len(), "MockLlmClient::with_outcomes: called");
            Self {
                outcomes,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::generate: called");
            match self.outcomes.get(idx) {
                Some(MockOutcome::Respond(response)) => Ok(response.clone()),
                Some(MockOutcome::Fail(message)) => Err(LlmError::ApiError {
                    status: 500,
                    message: message.clone(),
                }),
                None => Err(LlmError::InvalidResponse("No more mock outcomes".to_string())),
            }
        }

        async fn stream(
            &self,
            request: GenerateRequest,
            chunk_tx: mpsc::Sender<StreamChunk>,
        ) -> Result<GenerateResponse, LlmError> {
            debug!("MockLlmClient::stream: called");
            let response = self.generate(request).await?;
            if let Some(text) = &response.content {
                let _ = chunk_tx.send(StreamChunk::TextDelta(text.clone())).await;
            }
            let _ = chunk_tx
                .send(StreamChunk::Done {
                    stop_reason: response.stop_reason.clone(),
                    usage: response.usage,
                })
                .await;
            Ok(response)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::new(vec![
                GenerateResponse::from_text("Response 1"),
                GenerateResponse::from_text("Response 2"),
            ]);

            let req = GenerateRequest::text("hi", 1000);

            let resp1 = client.generate(req.clone()).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.generate(req.clone()).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert_eq!(client.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_scripted_failure() {
            let client = MockLlmClient::with_outcomes(vec![
                MockOutcome::Respond(GenerateResponse::from_text("ok")),
                MockOutcome::Fail("boom".to_string()),
            ]);

            let req = GenerateRequest::text("hi", 1000);
            assert!(client.generate(req.clone()).await.is_ok());
            let err = client.generate(req).await.unwrap_err();
            assert!(err.to_string().contains("boom"));
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            let result = client.generate(GenerateRequest::text("hi", 1000)).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_stream_forwards_chunks() {
            let client = MockLlmClient::new(vec![GenerateResponse::from_text("chunked")]);
            let (tx, mut rx) = mpsc::channel(8);

            let response = client.stream(GenerateRequest::text("hi", 100), tx).await.unwrap();
            assert_eq!(response.content, Some("chunked".to_string()));

            match rx.recv().await.unwrap() {
                StreamChunk::TextDelta(text) => assert_eq!(text, "chunked"),
                other => panic!("Expected TextDelta, got {:?}", other),
            }
            assert!(matches!(rx.recv().await.unwrap(), StreamChunk::Done { .. }));
        }
    }
}
