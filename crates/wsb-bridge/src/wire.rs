//! JSON shapes spoken by the WhatsApp bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use wsb_core::{
    domain::{ChatId, ChatInfo, InboundMessage, MediaKind, MessageId, MessageRef, Participant},
    transport::types::{OutgoingContent, RawMedia, SendOptions, SessionEvent},
};

#[derive(Debug, Deserialize, Clone)]
pub struct WireId {
    #[serde(rename = "_serialized")]
    pub serialized: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: WireId,
    pub from: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub has_media: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "hasQuotedMsg", default)]
    pub has_quoted_msg: bool,
}

impl WireMessage {
    pub fn into_inbound(self) -> InboundMessage {
        InboundMessage {
            id: MessageRef {
                chat_id: ChatId(self.from.clone()),
                message_id: MessageId(self.id.serialized),
            },
            media_kind: MediaKind::from_type_str(&self.kind, self.has_media),
            from: self.from,
            author: self.author.filter(|a| !a.is_empty()),
            body: self.body,
            has_media: self.has_media,
            has_quoted_message: self.has_quoted_msg,
        }
    }
}

/// Downloaded media. The bridge forwards whichever field the session library
/// filled in, so both names are accepted.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireMedia {
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub media_base64: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl From<WireMedia> for RawMedia {
    fn from(m: WireMedia) -> Self {
        Self {
            mimetype: m.mimetype,
            data: m.data,
            media_base64: m.media_base64,
            filename: m.filename,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WireParticipant {
    pub id: WireId,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireChat {
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub participants: Vec<WireParticipant>,
}

impl From<WireChat> for ChatInfo {
    fn from(c: WireChat) -> Self {
        Self {
            is_group: c.is_group,
            name: c.name,
            participants: c
                .participants
                .into_iter()
                .map(|p| match p.id.user {
                    Some(user) => Participant {
                        id: p.id.serialized,
                        user,
                    },
                    None => Participant::from_serialized(p.id.serialized),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireContent {
    Text {
        text: String,
    },
    Media {
        mimetype: String,
        data: String,
        filename: String,
    },
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WireSendOptions {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub send_media_as_sticker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
}

impl From<SendOptions> for WireSendOptions {
    fn from(o: SendOptions) -> Self {
        Self {
            send_media_as_sticker: o.send_as_sticker,
            sticker_author: o.sticker_author,
            sticker_name: o.sticker_name,
            mentions: o.mentions,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSendRequest {
    pub chat_id: String,
    pub content: WireContent,
    pub options: WireSendOptions,
}

impl WireSendRequest {
    pub fn new(chat_id: &ChatId, content: OutgoingContent, options: SendOptions) -> Self {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

        let content = match content {
            OutgoingContent::Text(text) => WireContent::Text { text },
            OutgoingContent::Media(m) => WireContent::Media {
                mimetype: m.mimetype,
                data: BASE64.encode(&m.bytes),
                filename: m.filename,
            },
        };
        Self {
            chat_id: chat_id.0.clone(),
            content,
            options: options.into(),
        }
    }
}

/// One entry of the `/events` long-poll response.
#[derive(Debug, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl WireEvent {
    /// Translate into a session event. `Ok(None)` for event types the bot
    /// does not care about.
    pub fn into_session_event(self) -> serde_json::Result<Option<SessionEvent>> {
        let event = match self.kind.as_str() {
            "qr" => SessionEvent::Qr(payload_str(&self.payload, "qr")),
            "ready" => SessionEvent::Ready,
            "auth_failure" => SessionEvent::AuthFailure(payload_str(&self.payload, "message")),
            "change_state" => SessionEvent::StateChanged(payload_str(&self.payload, "state")),
            "disconnected" => SessionEvent::Disconnected(payload_str(&self.payload, "reason")),
            "message" => {
                let msg: WireMessage = serde_json::from_value(self.payload)?;
                SessionEvent::Message(msg.into_inbound())
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn payload_str(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
