//! Mock upstream for handler tests

use super::{ByteStream, Upstream, UpstreamChatRequest, UpstreamError, UserProfile};
use async_trait::async_trait;
use axum::body::Bytes;
use futures::StreamExt;
use std::sync::Mutex;

/// What the mock answers to `chat`
pub enum MockReply {
    /// Stream these chunks with a 200
    Chunks(Vec<&'static str>),
    /// Fail with this status and body
    Status(u16, &'static str),
    /// Connection refused
    Unreachable,
}

/// Upstream that records requests and replies from a script
pub struct MockUpstream {
    reply: MockReply,
    sync_fails: bool,
    pub chat_requests: Mutex<Vec<UpstreamChatRequest>>,
    pub synced: Mutex<Vec<UserProfile>>,
}

impl MockUpstream {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            sync_fails: false,
            chat_requests: Mutex::new(Vec::new()),
            synced: Mutex::new(Vec::new()),
        }
    }

    pub fn streaming(chunks: Vec<&'static str>) -> Self {
        Self::new(MockReply::Chunks(chunks))
    }

    /// Make `sync_user` fail after recording the profile
    pub fn with_failing_sync(mut self) -> Self {
        self.sync_fails = true;
        self
    }

    pub fn recorded_chats(&self) -> Vec<UpstreamChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub fn recorded_syncs(&self) -> Vec<UserProfile> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn chat(&self, request: &UpstreamChatRequest) -> Result<ByteStream, UpstreamError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        match &self.reply {
            MockReply::Chunks(chunks) => {
                let items: Vec<Result<Bytes, UpstreamError>> = chunks
                    .iter()
                    .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                    .collect();
                Ok(futures::stream::iter(items).boxed())
            }
            MockReply::Status(status, body) => Err(UpstreamError::Status {
                status: *status,
                body: (*body).to_string(),
            }),
            MockReply::Unreachable => Err(UpstreamError::Network("connection refused".into())),
        }
    }

    async fn sync_user(&self, profile: &UserProfile) -> Result<(), UpstreamError> {
        self.synced.lock().unwrap().push(profile.clone());
        if self.sync_fails {
            Err(UpstreamError::Status {
                status: 500,
                body: "db down".into(),
            })
        } else {
            Ok(())
        }
    }
}
