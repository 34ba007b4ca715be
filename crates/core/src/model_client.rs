use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use omnichat_model::{
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tracing::Instrument;

type BoxedProviderError = Box<dyn ModelProviderError>;
type SendRequestResult = Result<ModelClientResponse, BoxedProviderError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn =
            Arc::new(move |req: ModelRequest| -> BoxedSendRequestFuture {
                let fut = provider.send_request(&req);
                Box::pin(
                    async move {
                        trace!("got a request: {:?}", req);
                        match fut.await {
                            Ok(resp) => Ok(ModelClientResponse {
                                inner: Box::pin(resp),
                            }),
                            Err(err) => {
                                error!("got an error: {err:?}");
                                Err(Box::new(err) as BoxedProviderError)
                            }
                        }
                    }
                    .instrument(trace_span!("model client req")),
                )
            });
        Self { handler_fn }
    }

    /// Sends a request and returns the response once the provider has
    /// accepted it.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

/// A response whose events are pulled one by one.
pub struct ModelClientResponse {
    inner: Pin<Box<dyn ErasedResponse>>,
}

impl ModelClientResponse {
    /// Waits for the next event. `None` means the response has completed.
    pub async fn next_event(
        &mut self,
    ) -> Result<Option<ModelResponseEvent>, BoxedProviderError> {
        let event = poll_fn(|cx| self.inner.as_mut().poll_next_event(cx)).await;
        if let Ok(Some(event)) = &event {
            trace!("got an event: {event:?}");
        }
        event
    }
}

trait ErasedResponse: Send {
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, BoxedProviderError>>;
}

impl<R: ModelResponse> ErasedResponse for R {
    #[inline]
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, BoxedProviderError>> {
        ModelResponse::poll_next_event(self, cx)
            .map_err(|err| Box::new(err) as BoxedProviderError)
    }
}
