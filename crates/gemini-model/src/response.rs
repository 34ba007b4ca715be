use std::pin::Pin;
use std::task::{Context, Poll, ready};

use omnichat_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ResponseChunk,
};
use pin_project_lite::pin_project;
use serde_json::Value;

use crate::Error;
use crate::io::Sse;
use crate::proto::{ErrorResponse, GenerateContentResponse};

struct PartialState {
    sse: Sse,
    // Set by the chunk that carries `finishReason`, and emitted as the
    // complete event right after that chunk.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct GeminiResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl GeminiResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            pending_finish_reason: None,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for GeminiResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    let sse_event = match partial_state.sse.next_event().await {
        Ok(Some(event)) => event,
        Ok(None) => return Ok((None, partial_state)),
        Err(err) => {
            return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
        }
    };
    trace!("got sse event: {sse_event}");

    let raw_metadata = serde_json::from_str::<Value>(&sse_event)
        .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

    // The server reports failures after the stream has started as an error
    // object in place of a response.
    if raw_metadata.get("error").is_some() {
        let message = serde_json::from_value::<ErrorResponse>(raw_metadata)
            .map(|resp| resp.error.message)
            .unwrap_or_else(|_| "unknown streaming error".to_owned());
        return Err(Error::new(message, ErrorKind::Other));
    }

    let resp =
        serde_json::from_value::<GenerateContentResponse>(raw_metadata.clone())
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

    if let Some(reason) = resp.block_reason() {
        return Err(Error::new(
            format!("prompt blocked: {reason}"),
            ErrorKind::Moderated,
        ));
    }

    partial_state.pending_finish_reason =
        resp.finish_reason().map(finish_reason_from_str);

    let chunk = ResponseChunk {
        text: resp.text(),
        raw_metadata,
    };
    Ok((Some(ModelResponseEvent::Chunk(chunk)), partial_state))
}

fn finish_reason_from_str(reason: &str) -> ModelFinishReason {
    match reason {
        "STOP" => ModelFinishReason::Stop,
        "MAX_TOKENS" => ModelFinishReason::MaxTokens,
        other => {
            debug!("unmodeled finish reason: {other}");
            ModelFinishReason::Other
        }
    }
}
