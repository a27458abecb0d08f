//! Server-sent events over a [`StreamEvent`] channel.

use std::{convert::Infallible, time::Duration};

use async_stream::stream;
use axum::{
    http::{HeaderName, HeaderValue},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use contextor::{ContextorError, EventSink, StreamEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Renders every event as `event: <name>` with the JSON-encoded event as
/// `data`. The response ends after the first terminal event; dropping it
/// drops the receiver, which stops the producer.
pub fn event_stream(mut rx: mpsc::Receiver<StreamEvent>, keep_alive: Duration) -> Response {
    let events = stream! {
        while let Some(ev) = rx.recv().await {
            let terminal = ev.is_terminal();
            yield Ok::<Event, Infallible>(to_sse(&ev));
            if terminal {
                break;
            }
        }
    };
    let sse = Sse::new(events).keep_alive(KeepAlive::new().interval(keep_alive));
    (
        [(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no"))],
        sse,
    )
        .into_response()
}

fn to_sse(ev: &StreamEvent) -> Event {
    match serde_json::to_string(ev) {
        Ok(data) => Event::default().event(ev.name()).data(data),
        Err(e) => {
            warn!(event = ev.name(), error = %e, "event encoding failed");
            let fallback = serde_json::json!({"type": "error", "message": "event encoding failed"});
            Event::default().event("error").data(fallback.to_string())
        }
    }
}

/// Turns a producer outcome into the stream's terminal event.
///
/// A gone client is only logged; any other failure becomes an `error`
/// event unless a terminal was already written.
pub async fn finish(outcome: Result<(), ContextorError>, sink: &mut EventSink, stream: &'static str) {
    match outcome {
        Ok(()) => {}
        Err(ContextorError::ClientGone) => {
            debug!(stream, "client disconnected; producer stopped");
        }
        Err(e) => {
            warn!(stream, error = %e, "stream failed");
            if !sink.is_finished() {
                let _ = sink.error(e.to_string()).await;
            }
        }
    }
}
