//! Per-message orchestration: recognize, act, reply.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    command::{recognize, Command},
    config::BotSettings,
    domain::{ChatId, InboundMessage},
    media::{MediaError, MediaFetcher, SizeCheck},
    mention, replies,
    sticker::{ImageCodec, STICKER_FILENAME, STICKER_MIME},
    transport::{
        port::ChatTransport,
        types::{MediaPayload, OutgoingContent, SendOptions},
    },
    Result,
};

/// What happened to one inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command (or a status broadcast): nothing was sent.
    Ignored,
    /// The command ran and its result was delivered.
    Completed,
    /// The invocation was malformed and a rejection reply was sent.
    Rejected,
    /// Processing failed and an error reply was attempted.
    Failed,
}

pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    codec: Arc<dyn ImageCodec>,
    settings: BotSettings,
    fetcher: MediaFetcher,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        codec: Arc<dyn ImageCodec>,
        settings: BotSettings,
    ) -> Self {
        let fetcher = MediaFetcher::from_settings(&settings);
        Self {
            transport,
            codec,
            settings,
            fetcher,
        }
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Handle one inbound message. Never fails: every error ends in a reply
    /// to the originating chat (best-effort) and a log line.
    pub async fn handle(&self, msg: &InboundMessage) -> Outcome {
        if msg.is_status_broadcast() {
            return Outcome::Ignored;
        }

        let command = recognize(
            &self.settings,
            &msg.body,
            msg.has_media,
            msg.media_kind,
            msg.has_quoted_message,
        );

        let result = match command {
            Command::None => return Outcome::Ignored,
            Command::CreateSticker { name } => self.create_sticker(msg, &name).await,
            Command::RenameSticker { name } => self.rename_sticker(msg, &name).await,
            Command::TagAll { custom_message } => {
                self.tag_all(msg, custom_message.as_deref()).await
            }
            Command::Help => self.help(msg).await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(chat = %msg.from, "error processing message: {e}");
                if let Err(e) = self.transport.reply(&msg.id, replies::REQUEST_FAILED).await {
                    error!(chat = %msg.from, "failed to deliver error reply: {e}");
                }
                Outcome::Failed
            }
        }
    }

    async fn create_sticker(&self, msg: &InboundMessage, name: &str) -> Result<Outcome> {
        info!(chat = %msg.from, "downloading media");

        let sent = async {
            let media = self
                .fetcher
                .fetch(self.transport.download_media(&msg.id), SizeCheck::Enforce)
                .await?;
            info!(chat = %msg.from, bytes = media.bytes.len(), "processing image");
            let sticker = self.normalize(media.bytes).await?;
            self.send_sticker(&msg.reply_chat(), sticker, name).await
        }
        .await;

        if let Err(e) = sent {
            return self.media_failed(msg, e, "sticker conversion failed").await;
        }

        let text = replies::sticker_created(name, &self.settings.default_sticker_name);
        self.transport.reply(&msg.id, &text).await?;
        info!(chat = %msg.from, name, "sticker sent");
        Ok(Outcome::Completed)
    }

    async fn rename_sticker(&self, msg: &InboundMessage, name: &str) -> Result<Outcome> {
        if name.is_empty() {
            return self.reject(msg, replies::WM_FORMAT).await;
        }
        if !msg.has_quoted_message {
            return self.reject(msg, replies::WM_NOT_A_REPLY).await;
        }

        let quoted = match self.transport.quoted_message(&msg.id).await? {
            Some(q) if q.is_sticker() => q,
            _ => return self.reject(msg, replies::WM_NOT_A_STICKER).await,
        };

        info!(chat = %msg.from, name, "downloading sticker from reply");
        let sent = async {
            let media = self
                .fetcher
                .fetch(self.transport.download_media(&quoted.id), SizeCheck::Skip)
                .await?;
            // Pixel data is re-sent untouched; only the name label changes.
            self.send_sticker(&msg.reply_chat(), media.bytes, name).await
        }
        .await;

        if let Err(e) = sent {
            return self.media_failed(msg, e, "sticker rename failed").await;
        }

        self.transport
            .reply(&msg.id, &replies::sticker_renamed(name))
            .await?;
        info!(chat = %msg.from, name, "sticker with new name sent");
        Ok(Outcome::Completed)
    }

    async fn tag_all(
        &self,
        msg: &InboundMessage,
        custom_message: Option<&str>,
    ) -> Result<Outcome> {
        let chat_id = msg.reply_chat();

        let chat = match self.transport.chat_info(&chat_id).await {
            Ok(c) => c,
            Err(e) => return self.tagall_failed(msg, &e.to_string()).await,
        };
        if !chat.is_group {
            return self.reject(msg, replies::TAGALL_GROUP_ONLY).await;
        }

        let mentions =
            mention::compose(&chat.participants, msg.author.as_deref(), custom_message);
        let count = mentions.mention_ids.len();
        if let Err(e) = self
            .transport
            .send_message(
                &chat_id,
                OutgoingContent::Text(mentions.text),
                SendOptions::mentions(mentions.mention_ids),
            )
            .await
        {
            return self.tagall_failed(msg, &e.to_string()).await;
        }

        info!(group = %chat.name, mentions = count, "tagall executed");
        Ok(Outcome::Completed)
    }

    async fn help(&self, msg: &InboundMessage) -> Result<Outcome> {
        self.transport.reply(&msg.id, replies::HELP).await?;
        info!(chat = %msg.from, "help requested");
        Ok(Outcome::Completed)
    }

    /// Wrap `bytes` as a PNG sticker carrying the fixed author and `name`.
    async fn send_sticker(
        &self,
        chat_id: &ChatId,
        bytes: Vec<u8>,
        name: &str,
    ) -> std::result::Result<(), MediaError> {
        let media = MediaPayload {
            mimetype: STICKER_MIME.to_string(),
            bytes,
            filename: STICKER_FILENAME.to_string(),
        };
        self.transport
            .send_message(
                chat_id,
                OutgoingContent::Media(media),
                SendOptions::sticker(&self.settings.sticker_author, name),
            )
            .await
            .map_err(|e| MediaError::Transport(e.to_string()))
    }

    async fn normalize(&self, bytes: Vec<u8>) -> std::result::Result<Vec<u8>, MediaError> {
        let codec = Arc::clone(&self.codec);
        let size = self.settings.sticker_size;
        tokio::task::spawn_blocking(move || codec.resize_contain(&bytes, size))
            .await
            .map_err(|e| MediaError::Encode(e.to_string()))?
    }

    async fn reject(&self, msg: &InboundMessage, text: &str) -> Result<Outcome> {
        self.transport.reply(&msg.id, text).await?;
        Ok(Outcome::Rejected)
    }

    async fn media_failed(
        &self,
        msg: &InboundMessage,
        err: MediaError,
        context: &str,
    ) -> Result<Outcome> {
        warn!(chat = %msg.from, "{context}: {err}");
        self.transport
            .reply(&msg.id, &replies::media_failure(&err))
            .await?;
        Ok(Outcome::Failed)
    }

    async fn tagall_failed(&self, msg: &InboundMessage, detail: &str) -> Result<Outcome> {
        warn!(chat = %msg.from, "tagall failed: {detail}");
        self.transport
            .reply(&msg.id, &replies::tagall_failed(detail))
            .await?;
        Ok(Outcome::Failed)
    }
}
