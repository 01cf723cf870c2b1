//! Server-sent events from the chat endpoint
//!
//! The service streams frames separated by a blank line:
//!
//! ```text
//! event: message
//! data: {"text":"Hi "}
//!
//! event: done
//! data: {}
//!
//! ```
//!
//! Framing is done by `eventsource-stream`; this module maps each frame
//! onto a [`ServerEvent`].

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{future, Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::client::ByteStream;
use crate::error::{ChatError, DecodeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Incremental text fragment to append to the reply
    Message { text: String },
    /// Normal end of the reply
    Done,
    /// Any kind this client does not know; consumers ignore it
    Unknown { kind: String, data: String },
}

#[derive(Deserialize)]
struct MessagePayload {
    text: String,
}

impl TryFrom<Event> for ServerEvent {
    type Error = DecodeError;

    fn try_from(event: Event) -> Result<Self, Self::Error> {
        debug!(kind = %event.event, bytes = event.data.len(), "decoded frame");
        match event.event.as_str() {
            "message" => {
                let payload: MessagePayload = serde_json::from_str(&event.data)
                    .map_err(|e| DecodeError::malformed("message", format!("invalid payload: {}", e)))?;
                Ok(ServerEvent::Message { text: payload.text })
            }
            "done" => Ok(ServerEvent::Done),
            _ => Ok(ServerEvent::Unknown {
                kind: event.event,
                data: event.data,
            }),
        }
    }
}

fn from_stream_error(err: EventStreamError<ChatError>) -> ChatError {
    match err {
        EventStreamError::Transport(err) => err,
        other => DecodeError::malformed("unknown", other.to_string()).into(),
    }
}

/// Adapt a response body into a stream of events.
///
/// A frame that fails to decode yields one `ChatError::Malformed` item and
/// decoding continues. The stream ends after a `done` event, after a
/// transport error, or when the body ends.
pub fn event_stream(body: ByteStream) -> impl Stream<Item = Result<ServerEvent, ChatError>> + Send {
    body.eventsource()
        .map(|item| match item {
            Ok(event) => ServerEvent::try_from(event).map_err(ChatError::from),
            Err(err) => Err(from_stream_error(err)),
        })
        .scan(false, |finished, item| {
            if *finished {
                return future::ready(None);
            }
            *finished = matches!(item, Ok(ServerEvent::Done) | Err(ChatError::Transport(_)));
            future::ready(Some(item))
        })
}
