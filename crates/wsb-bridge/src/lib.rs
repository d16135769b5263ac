//! WhatsApp bridge adapter.
//!
//! Implements the `wsb-core` transport and session ports over the JSON API of
//! a whatsapp-web session bridge (one session per `client_id`, auth persisted
//! by the bridge under the configured auth directory).

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub mod wire;

use wsb_core::{
    config::Config,
    domain::{ChatId, ChatInfo, InboundMessage, MessageRef},
    errors::Error,
    transport::{
        port::{ChatTransport, SessionClient},
        types::{OutgoingContent, RawMedia, SendOptions, SessionEvent},
    },
    Result,
};

use crate::wire::{WireChat, WireEvent, WireMedia, WireMessage, WireSendRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_GRACE: Duration = Duration::from_secs(10);

/// HTTP handle scoped to one bridge session. Cheap to clone.
#[derive(Clone)]
struct Api {
    http: Client,
    base_url: String,
    client_id: String,
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}/sessions/{}{path}", self.base_url, self.client_id)
    }

    fn map_err(e: reqwest::Error) -> Error {
        Error::Transport(format!("bridge request failed: {e}"))
    }

    async fn execute(req: RequestBuilder) -> Result<Response> {
        let resp = req.send().await.map_err(Self::map_err)?;
        Self::check(resp).await
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Transport(format!(
            "bridge returned {status}: {}",
            body.chars().take(200).collect::<String>()
        )))
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let body = resp.bytes().await.map_err(Self::map_err)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn post_json(&self, path: &str, body: &impl serde::Serialize) -> Result<()> {
        Self::execute(
            self.http
                .post(self.url(path))
                .timeout(REQUEST_TIMEOUT)
                .json(body),
        )
        .await?;
        Ok(())
    }

    /// GET a JSON resource that may legitimately be missing (404 or `null`).
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self
            .http
            .get(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::map_err)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(Self::check(resp).await?).await
    }

    async fn poll_events(&self, timeout: Duration) -> Result<Vec<WireEvent>> {
        let secs = timeout.as_secs().to_string();
        let resp = Self::execute(
            self.http
                .get(self.url("/events"))
                .query(&[("timeout", secs.as_str())])
                .timeout(timeout + POLL_GRACE),
        )
        .await?;
        Self::decode(resp).await
    }
}

/// Long-poll the bridge and forward events until cancelled, disconnected,
/// or the receiver goes away.
async fn pump(
    api: Api,
    poll_timeout: Duration,
    events: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => return,
            batch = api.poll_events(poll_timeout) => batch,
        };

        let batch = match batch {
            Ok(b) => b,
            Err(e) => {
                let _ = events
                    .send(SessionEvent::Disconnected(format!("event poll failed: {e}")))
                    .await;
                return;
            }
        };

        for raw in batch {
            let kind = raw.kind.clone();
            let event = match raw.into_session_event() {
                Ok(Some(ev)) => ev,
                Ok(None) => {
                    debug!(kind, "ignoring bridge event");
                    continue;
                }
                Err(e) => {
                    warn!(kind, "malformed bridge event: {e}");
                    continue;
                }
            };
            let disconnected = matches!(event, SessionEvent::Disconnected(_));
            if events.send(event).await.is_err() || disconnected {
                return;
            }
        }
    }
}

pub struct BridgeClient {
    api: Api,
    auth_dir: String,
    poll_timeout: Duration,
    poller: Mutex<Option<CancellationToken>>,
}

impl BridgeClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(Api::map_err)?;

        Ok(Self {
            api: Api {
                http,
                base_url: cfg.bridge_url.clone(),
                client_id: cfg.client_id.clone(),
            },
            auth_dir: cfg.auth_dir.to_string_lossy().to_string(),
            poll_timeout: cfg.poll_timeout,
            poller: Mutex::new(None),
        })
    }

    /// Install `next` as the running poller, cancelling the previous one.
    fn replace_poller(&self, next: Option<CancellationToken>) {
        let previous = match self.poller.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        };
        if let Some(token) = previous {
            token.cancel();
        }
    }
}

#[async_trait]
impl ChatTransport for BridgeClient {
    async fn download_media(&self, msg: &MessageRef) -> Result<Option<RawMedia>> {
        let path = format!("/messages/{}/media", msg.message_id.0);
        Ok(self
            .api
            .get_optional::<WireMedia>(&path)
            .await?
            .map(RawMedia::from))
    }

    async fn quoted_message(&self, msg: &MessageRef) -> Result<Option<InboundMessage>> {
        let path = format!("/messages/{}/quoted", msg.message_id.0);
        Ok(self
            .api
            .get_optional::<WireMessage>(&path)
            .await?
            .map(WireMessage::into_inbound))
    }

    async fn chat_info(&self, chat_id: &ChatId) -> Result<ChatInfo> {
        let path = format!("/chats/{}", chat_id.0);
        self.api
            .get_optional::<WireChat>(&path)
            .await?
            .map(ChatInfo::from)
            .ok_or_else(|| Error::Transport(format!("chat {chat_id} not found")))
    }

    async fn send_message(
        &self,
        chat_id: &ChatId,
        content: OutgoingContent,
        options: SendOptions,
    ) -> Result<()> {
        let body = WireSendRequest::new(chat_id, content, options);
        self.api.post_json("/messages", &body).await
    }

    async fn reply(&self, msg: &MessageRef, text: &str) -> Result<()> {
        let path = format!("/messages/{}/reply", msg.message_id.0);
        self.api.post_json(&path, &json!({ "text": text })).await
    }
}

#[async_trait]
impl SessionClient for BridgeClient {
    async fn initialize(&self, events: mpsc::Sender<SessionEvent>) -> Result<()> {
        // A previous poller may still be running after a disconnect.
        self.replace_poller(None);

        self.api
            .post_json("/start", &json!({ "authDir": self.auth_dir }))
            .await?;

        let cancel = CancellationToken::new();
        self.replace_poller(Some(cancel.clone()));
        tokio::spawn(pump(self.api.clone(), self.poll_timeout, events, cancel));
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.replace_poller(None);
        self.api.post_json("/destroy", &json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::path::PathBuf;
    use wsb_core::{config::BotSettings, domain::MessageId};

    fn client_for(bridge_url: &str) -> BridgeClient {
        BridgeClient::new(&Config {
            bridge_url: bridge_url.to_string(),
            client_id: "sticker-bot".to_string(),
            auth_dir: PathBuf::from(".wwebjs_auth"),
            poll_timeout: Duration::from_secs(1),
            bot: BotSettings::default(),
        })
        .unwrap()
    }

    fn msg_ref(id: &str) -> MessageRef {
        MessageRef {
            chat_id: ChatId::new("1203@g.us"),
            message_id: MessageId(id.to_string()),
        }
    }

    #[test]
    fn urls_are_scoped_to_the_session() {
        let c = client_for("http://127.0.0.1:3000");
        assert_eq!(
            c.api.url("/events"),
            "http://127.0.0.1:3000/sessions/sticker-bot/events"
        );
        assert_eq!(
            c.api.url("/messages/ABC/media"),
            "http://127.0.0.1:3000/sessions/sticker-bot/messages/ABC/media"
        );
    }

    #[tokio::test]
    async fn replacing_the_poller_cancels_the_old_one() {
        let c = client_for("http://127.0.0.1:3000");
        let first = CancellationToken::new();
        c.replace_poller(Some(first.clone()));
        c.replace_poller(Some(CancellationToken::new()));
        assert!(first.is_cancelled());
    }

    #[tokio::test]
    async fn optional_gets_treat_404_and_null_as_missing() {
        let mut server = Server::new_async().await;
        let _gone = server
            .mock("GET", "/sessions/sticker-bot/messages/GONE/media")
            .with_status(404)
            .with_body("no such message")
            .create_async()
            .await;
        let _null = server
            .mock("GET", "/sessions/sticker-bot/messages/PLAIN/quoted")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("null")
            .create_async()
            .await;

        let c = client_for(&server.url());
        assert!(c.download_media(&msg_ref("GONE")).await.unwrap().is_none());
        assert!(c.quoted_message(&msg_ref("PLAIN")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn media_body_is_returned() {
        let mut server = Server::new_async().await;
        let _media = server
            .mock("GET", "/sessions/sticker-bot/messages/ABC/media")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "mimetype": "image/jpeg", "data": "aGk=" }).to_string())
            .create_async()
            .await;

        let c = client_for(&server.url());
        let media = c.download_media(&msg_ref("ABC")).await.unwrap().unwrap();
        assert_eq!(media.mimetype.as_deref(), Some("image/jpeg"));
        assert_eq!(media.encoded(), Some("aGk="));
    }

    #[tokio::test]
    async fn error_status_is_a_transport_error() {
        let mut server = Server::new_async().await;
        let _chat = server
            .mock("GET", "/sessions/sticker-bot/chats/1203@g.us")
            .with_status(500)
            .with_body("session crashed")
            .create_async()
            .await;

        let c = client_for(&server.url());
        match c.chat_info(&ChatId::new("1203@g.us")).await {
            Err(Error::Transport(msg)) => {
                assert!(msg.contains("500"), "{msg}");
                assert!(msg.contains("session crashed"), "{msg}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_error() {
        let mut server = Server::new_async().await;
        let _media = server
            .mock("GET", "/sessions/sticker-bot/messages/ABC/media")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let c = client_for(&server.url());
        let res = c.download_media(&msg_ref("ABC")).await;
        assert!(matches!(res, Err(Error::Json(_))), "{res:?}");
    }

    #[tokio::test]
    async fn reply_posts_the_text() {
        let mut server = Server::new_async().await;
        let reply = server
            .mock("POST", "/sessions/sticker-bot/messages/ABC/reply")
            .match_body(Matcher::Json(json!({ "text": "halo" })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let c = client_for(&server.url());
        c.reply(&msg_ref("ABC"), "halo").await.unwrap();
        reply.assert_async().await;
    }

    #[tokio::test]
    async fn initialize_starts_session_and_forwards_events() {
        let mut server = Server::new_async().await;
        let start = server
            .mock("POST", "/sessions/sticker-bot/start")
            .match_body(Matcher::Json(json!({ "authDir": ".wwebjs_auth" })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let events = server
            .mock("GET", "/sessions/sticker-bot/events")
            .match_query(Matcher::UrlEncoded("timeout".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    { "type": "ready" },
                    { "type": "loading_screen", "payload": {} },
                    { "type": "disconnected", "payload": { "reason": "LOGOUT" } }
                ])
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let c = client_for(&server.url());
        let (tx, mut rx) = mpsc::channel(8);
        c.initialize(tx).await.unwrap();

        assert!(matches!(rx.recv().await, Some(SessionEvent::Ready)));
        assert!(matches!(
            rx.recv().await,
            Some(SessionEvent::Disconnected(reason)) if reason == "LOGOUT"
        ));
        // The pump stops after a disconnect and drops its sender.
        assert!(rx.recv().await.is_none());

        start.assert_async().await;
        events.assert_async().await;
    }

    #[tokio::test]
    async fn failing_poll_reports_disconnect() {
        let mut server = Server::new_async().await;
        let _events = server
            .mock("GET", "/sessions/sticker-bot/events")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let c = client_for(&server.url());
        let (tx, mut rx) = mpsc::channel(8);
        pump(c.api.clone(), c.poll_timeout, tx, CancellationToken::new()).await;

        match rx.recv().await {
            Some(SessionEvent::Disconnected(reason)) => assert!(reason.contains("502"), "{reason}"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn destroy_stops_the_poller() {
        let mut server = Server::new_async().await;
        let destroy = server
            .mock("POST", "/sessions/sticker-bot/destroy")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let c = client_for(&server.url());
        let poller = CancellationToken::new();
        c.replace_poller(Some(poller.clone()));
        c.destroy().await.unwrap();

        assert!(poller.is_cancelled());
        destroy.assert_async().await;
    }
}
