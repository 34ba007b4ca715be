//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use omnichat_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: VecDeque<PresetEvent>,
    completed: bool,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.completed {
            // In case this method is called after completion.
            return Poll::Ready(Ok(None));
        }

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        match this.events.pop_front() {
            Some(PresetEvent::Chunk(chunk)) => {
                Poll::Ready(Ok(Some(ModelResponseEvent::Chunk(chunk))))
            }
            Some(PresetEvent::Error(message)) => {
                this.completed = true;
                Poll::Ready(Err(Error::new(message, ErrorKind::Other)))
            }
            None => {
                this.completed = true;
                Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))))
            }
        }
    }
}

#[derive(Clone)]
enum ScriptStep {
    Respond(PresetResponse),
    Reject(ErrorKind),
}

#[derive(Default)]
struct Script {
    steps: VecDeque<ScriptStep>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request, in order. Every request consumes
/// one step. If there are no enough steps in the script, an error will be
/// returned.
///
/// Clones share the same script, so a test can keep a clone around to
/// inspect the requests after handing the provider over.
///
/// # Note
///
/// This type is not optimized for production use. You should only use it
/// for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a step that streams the preset response.
    #[inline]
    pub fn add_response_step(&mut self, preset: PresetResponse) {
        self.lock().steps.push_back(ScriptStep::Respond(preset));
    }

    /// Appends a step that rejects the request before streaming anything.
    #[inline]
    pub fn add_rejection_step(&mut self, kind: ErrorKind) {
        self.lock().steps.push_back(ScriptStep::Reject(kind));
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        // A poisoned script means another test thread already panicked.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Debug for TestModelProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestModelProvider")
            .field("remaining_steps", &self.lock().steps.len())
            .field("delay", &self.delay)
            .finish()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut script = self.lock();
        script.requests.push(req.clone());
        let result = match script.steps.pop_front() {
            Some(ScriptStep::Respond(preset)) => Ok(TestModelResponse {
                events: preset.events.into(),
                completed: false,
                delay: self.delay.unwrap_or(Duration::from_millis(1)),
                sleep: None,
            }),
            Some(ScriptStep::Reject(kind)) => {
                Err(Error::new("request rejected", kind))
            }
            None => Err(Error::new("no enough steps", ErrorKind::Other)),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use omnichat_model::{ModelMessage, ModelTool};
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> Result<(String, usize), Error> {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut metadata_count = 0;
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?;
            match event {
                Some(ModelResponseEvent::Chunk(chunk)) => {
                    msg.push_str(&chunk.text);
                    if !chunk.raw_metadata.is_null() {
                        metadata_count += 1;
                    }
                }
                Some(ModelResponseEvent::Completed(_)) => {}
                None => break,
            }
        }
        Ok((msg, metadata_count))
    }

    fn request(text: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User(text.to_owned())],
            tools: vec![ModelTool::WebSearch],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response_step(PresetResponse::with_events([
            PresetEvent::text("Hello, "),
            PresetEvent::text("world!"),
        ]));
        provider.add_response_step(PresetResponse::with_events([
            PresetEvent::text("It is "),
            PresetEvent::with_metadata(
                "sunny.",
                json!({ "candidates": [] }),
            ),
        ]));

        let resp = provider.send_request(&request("Hi")).await.unwrap();
        let (msg, metadata_count) = collect_response(resp).await.unwrap();
        assert_eq!(msg, "Hello, world!");
        assert_eq!(metadata_count, 0);

        let resp = provider.send_request(&request("Weather?")).await.unwrap();
        let (msg, metadata_count) = collect_response(resp).await.unwrap();
        assert_eq!(msg, "It is sunny.");
        assert_eq!(metadata_count, 1);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], request("Weather?"));
    }

    #[tokio::test]
    async fn test_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_rejection_step(ErrorKind::RateLimitExceeded);
        provider.add_response_step(PresetResponse::with_events([
            PresetEvent::text("Partial"),
            PresetEvent::Error("connection reset".to_owned()),
        ]));

        let err = provider.send_request(&request("Hi")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);

        let resp = provider.send_request(&request("Hi")).await.unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);

        // The script is exhausted.
        let err = provider.send_request(&request("Hi")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
