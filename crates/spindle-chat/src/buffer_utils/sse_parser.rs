use std::fmt::Display;

use futures::{Stream, StreamExt};

use super::buffering::SseFrameBuffer;
use crate::error::ChatError;
use crate::streaming::ChatEvent;
use crate::traits::ChatStream;

/// Turn a raw SSE byte stream into backend events.
///
/// The stream ends right after the first terminal event (`message_end` or
/// `error`). Frames that are not event JSON are skipped. A body that closes
/// before a terminal event yields one trailing `Stream` error.
pub fn parse_event_stream<S, B, E>(bytes: S) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(bytes);
        let mut buffer = SseFrameBuffer::with_capacity(4096);
        let mut terminated = false;

        'read: while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(frame) = buffer.next_frame() {
                        match frame {
                            Ok(data) => {
                                if let Some(event) = decode(data) {
                                    terminated = event.is_terminal();
                                    yield Ok(event);
                                    if terminated {
                                        break 'read;
                                    }
                                }
                            }
                            Err(e) => {
                                yield Err(e);
                                terminated = true;
                                break 'read;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(ChatError::Stream(e.to_string()));
                    terminated = true;
                    break 'read;
                }
            }
        }

        if !terminated {
            if let Some(Ok(data)) = buffer.finish() {
                if let Some(event) = decode(data) {
                    terminated = event.is_terminal();
                    yield Ok(event);
                }
            }
        }

        if !terminated {
            yield Err(ChatError::Stream(
                "backend closed the stream before message_end".to_string(),
            ));
        }
    })
}

fn decode(data: String) -> Option<ChatEvent> {
    match ChatEvent::from_data(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "skipping undecodable chat frame");
            None
        }
    }
}
