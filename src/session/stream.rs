//! Decoding of the relay's event stream
//!
//! The relay forwards the upstream data stream verbatim: server-sent events
//! whose `data:` payload is one JSON stream part each.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;

/// One decoded stream part
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    Start {
        #[serde(rename = "messageId", default)]
        message_id: Option<String>,
    },
    TextStart {
        #[serde(default)]
        id: Option<String>,
    },
    TextDelta {
        #[serde(default)]
        id: Option<String>,
        delta: String,
    },
    TextEnd {
        #[serde(default)]
        id: Option<String>,
    },
    Finish {
        #[serde(rename = "finishReason", default)]
        finish_reason: Option<String>,
    },
    Error {
        #[serde(alias = "errorText")]
        error: String,
    },
    /// Parts this client does not render
    #[serde(other)]
    Unknown,
}

/// Incremental server-sent event decoder
///
/// Buffers raw bytes so events and UTF-8 sequences split across chunks are
/// reassembled before parsing. An event that outgrows the buffer is dropped
/// whole, up to its terminating blank line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Inside an oversized event whose terminator has not arrived yet
    discarding: bool,
}

impl SseDecoder {
    /// Upper bound on a single buffered event
    const MAX_BUFFER_SIZE: usize = 1024 * 1024;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every part completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamPart> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        if self.discarding {
            let Some(end) = find_event_end(&self.buffer) else {
                self.drop_buffered();
                return Vec::new();
            };
            self.buffer.drain(..end + 2);
            self.discarding = false;
        }

        let mut parts = Vec::new();
        while let Some(end) = find_event_end(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
            parts.extend(parse_event(&event));
        }

        if self.buffer.len() > Self::MAX_BUFFER_SIZE {
            tracing::warn!(
                buffered = self.buffer.len(),
                "Discarding oversized stream event"
            );
            self.discarding = true;
            self.drop_buffered();
        }
        parts
    }

    /// Flush a trailing event that was not terminated by a blank line
    pub fn finish(&mut self) -> Vec<StreamPart> {
        let rest = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.discarding) {
            return Vec::new();
        }
        parse_event(&rest).into_iter().collect()
    }

    /// Drop buffered bytes of a discarded event. A trailing newline may be
    /// the first half of its terminator, so it stays.
    fn drop_buffered(&mut self) {
        let keep = usize::from(self.buffer.last() == Some(&b'\n'));
        let cut = self.buffer.len() - keep;
        self.buffer.drain(..cut);
    }
}

fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_event(raw: &[u8]) -> Option<StreamPart> {
    let text = String::from_utf8_lossy(raw);
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|d| d.strip_prefix(' ').unwrap_or(d))
        .collect();
    if data.is_empty() {
        return None;
    }

    let payload = data.join("\n");
    if payload.trim() == "[DONE]" {
        return None;
    }
    serde_json::from_str(&payload)
        .inspect_err(|e| tracing::debug!(error = %e, "Skipping unparseable stream event"))
        .ok()
}

/// Decode a byte stream into stream parts. Transport errors pass through and
/// end the stream.
#[must_use]
pub fn decode_stream<S, B, E>(bytes: S) -> BoxStream<'static, Result<StreamPart, E>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let initial = (bytes.boxed(), SseDecoder::new(), VecDeque::new(), false);
    stream::unfold(
        initial,
        |(mut bytes, mut decoder, mut pending, mut ended)| async move {
            loop {
                if let Some(part) = pending.pop_front() {
                    return Some((Ok(part), (bytes, decoder, pending, ended)));
                }
                if ended {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => pending.extend(decoder.push(chunk.as_ref())),
                    Some(Err(e)) => return Some((Err(e), (bytes, decoder, pending, true))),
                    None => {
                        ended = true;
                        pending.extend(decoder.finish());
                    }
                }
            }
        },
    )
    .boxed()
}
