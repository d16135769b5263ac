use std::fmt;

/// Pseudo-chat that carries status updates. Never a command target.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// WhatsApp chat id (serialized JID, e.g. `628123@c.us` or `1203@g.us`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport message id (opaque string).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// A stable reference to a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A group member as reported by chat metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    /// Fully-qualified id (`628123@c.us`), used for mentions.
    pub id: String,
    /// Local part (`628123`), used for the visible `@` token.
    pub user: String,
}

impl Participant {
    /// Build from a serialized id, deriving the local part.
    pub fn from_serialized(id: impl Into<String>) -> Self {
        let id = id.into();
        let user = id.split_once('@').map_or(id.as_str(), |(u, _)| u).to_string();
        Self { id, user }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Sticker,
    Other,
    None,
}

impl MediaKind {
    /// Map a transport message type (`image`, `sticker`, `chat`, ...) to a kind.
    pub fn from_type_str(kind: &str, has_media: bool) -> Self {
        match kind {
            "image" => Self::Image,
            "sticker" => Self::Sticker,
            _ if has_media => Self::Other,
            _ => Self::None,
        }
    }
}

/// One inbound message event, constructed by the transport and consumed once.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub id: MessageRef,
    /// Origin as reported by the transport: the chat, or `status@broadcast`.
    pub from: String,
    /// Participant that wrote the message in a group; absent in direct chats.
    pub author: Option<String>,
    pub body: String,
    pub has_media: bool,
    pub media_kind: MediaKind,
    pub has_quoted_message: bool,
}

impl InboundMessage {
    pub fn is_status_broadcast(&self) -> bool {
        self.from == STATUS_BROADCAST
    }

    /// Chat that replies and stickers are delivered to.
    pub fn reply_chat(&self) -> ChatId {
        ChatId(self.from.clone())
    }

    pub fn is_sticker(&self) -> bool {
        self.has_media && self.media_kind == MediaKind::Sticker
    }
}

/// Chat metadata read fresh for every tag-all.
#[derive(Clone, Debug)]
pub struct ChatInfo {
    pub is_group: bool,
    pub name: String,
    pub participants: Vec<Participant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_local_part() {
        let p = Participant::from_serialized("628123@c.us");
        assert_eq!(p.user, "628123");
        assert_eq!(p.id, "628123@c.us");

        let bare = Participant::from_serialized("628123");
        assert_eq!(bare.user, "628123");
    }

    #[test]
    fn media_kind_mapping() {
        assert_eq!(MediaKind::from_type_str("image", true), MediaKind::Image);
        assert_eq!(MediaKind::from_type_str("sticker", true), MediaKind::Sticker);
        assert_eq!(MediaKind::from_type_str("video", true), MediaKind::Other);
        assert_eq!(MediaKind::from_type_str("chat", false), MediaKind::None);
    }
}
