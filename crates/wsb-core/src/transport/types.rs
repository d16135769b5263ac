use crate::domain::InboundMessage;

/// Media as handed over by the transport.
///
/// Depending on the source, the base64 payload arrives as `data` or as
/// `media_base64`. Use [`RawMedia::encoded`] instead of the fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMedia {
    pub mimetype: Option<String>,
    pub data: Option<String>,
    pub media_base64: Option<String>,
    pub filename: Option<String>,
}

impl RawMedia {
    /// The base64 payload, preferring `media_base64`. Empty strings count as absent.
    pub fn encoded(&self) -> Option<&str> {
        self.media_base64
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.data.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Decoded media ready to be sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaPayload {
    pub mimetype: String,
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutgoingContent {
    Text(String),
    Media(MediaPayload),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub send_as_sticker: bool,
    pub sticker_author: Option<String>,
    pub sticker_name: Option<String>,
    /// Fully-qualified participant ids to notify.
    pub mentions: Vec<String>,
}

impl SendOptions {
    pub fn sticker(author: &str, name: &str) -> Self {
        Self {
            send_as_sticker: true,
            sticker_author: Some(author.to_string()),
            sticker_name: Some(name.to_string()),
            mentions: Vec::new(),
        }
    }

    pub fn mentions(ids: Vec<String>) -> Self {
        Self {
            mentions: ids,
            ..Default::default()
        }
    }
}

/// Session events delivered by a [`SessionClient`](super::port::SessionClient).
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// Pairing payload to be scanned from the phone.
    Qr(String),
    Ready,
    AuthFailure(String),
    StateChanged(String),
    Message(InboundMessage),
    Disconnected(String),
}
