//! Scripted transport for controller tests

use super::stream::StreamPart;
use super::transport::{ChatTransport, OutboundChat, PartStream, TransportError};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted reply to `send`
pub enum MockResponse {
    /// Stream these parts, then end
    Parts(Vec<Result<StreamPart, TransportError>>),
    /// Never yield anything; counts a drop when the stream is abandoned
    Hang,
    /// Refuse the request
    Fail(TransportError),
}

/// Transport that replays queued responses and records requests
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<OutboundChat>>,
    dropped: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Queue a reply streaming `text` in the given chunks
    pub fn queue_text(&self, chunks: &[&str]) {
        let mut parts = vec![Ok(StreamPart::Start {
            message_id: Some("assistant-1".into()),
        })];
        parts.extend(chunks.iter().map(|c| {
            Ok(StreamPart::TextDelta {
                id: None,
                delta: (*c).to_string(),
            })
        }));
        parts.push(Ok(StreamPart::Finish {
            finish_reason: Some("stop".into()),
        }));
        self.queue(MockResponse::Parts(parts));
    }

    pub fn requests(&self) -> Vec<OutboundChat> {
        self.requests.lock().unwrap().clone()
    }

    /// Hanging streams that have been dropped
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicUsize>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, chat: &OutboundChat) -> Result<PartStream, TransportError> {
        self.requests.lock().unwrap().push(chat.clone());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockResponse::Parts(vec![]));

        match response {
            MockResponse::Parts(parts) => Ok(futures::stream::iter(parts).boxed()),
            MockResponse::Hang => {
                let flag = DropFlag(self.dropped.clone());
                Ok(futures::stream::pending()
                    .map(move |part: Result<StreamPart, TransportError>| {
                        let _keep = &flag;
                        part
                    })
                    .boxed())
            }
            MockResponse::Fail(e) => Err(e),
        }
    }
}
