use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::{ChatId, ChatInfo, InboundMessage, MessageRef},
    transport::types::{OutgoingContent, RawMedia, SendOptions, SessionEvent},
    Result,
};

/// Messaging operations the dispatcher needs.
///
/// Injected into the dispatcher so it can be driven by a fake in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Download the media attached to a message. `Ok(None)` when the transport
    /// has nothing for it. May hang; callers impose their own timeout.
    async fn download_media(&self, msg: &MessageRef) -> Result<Option<RawMedia>>;

    /// The message `msg` replies to, if any.
    async fn quoted_message(&self, msg: &MessageRef) -> Result<Option<InboundMessage>>;

    async fn chat_info(&self, chat_id: &ChatId) -> Result<ChatInfo>;

    async fn send_message(
        &self,
        chat_id: &ChatId,
        content: OutgoingContent,
        options: SendOptions,
    ) -> Result<()>;

    async fn reply(&self, msg: &MessageRef, text: &str) -> Result<()>;
}

/// Connection lifecycle of a session-backed transport.
#[async_trait]
pub trait SessionClient: ChatTransport {
    /// Connect (re-using persisted auth) and start feeding `events`.
    ///
    /// Returns once the connection attempt has been started; progress and
    /// disconnects are reported through the channel.
    async fn initialize(&self, events: mpsc::Sender<SessionEvent>) -> Result<()>;

    /// Tear the session down.
    async fn destroy(&self) -> Result<()>;
}
