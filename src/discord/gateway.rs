use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::{Instant, interval};
use tokio_tungstenite::tungstenite::Message;

use super::types::{DEFAULT_HEARTBEAT_INTERVAL_MS, GatewayOpcode};

/// Session state that survives reconnects so the bot can resume instead of
/// re-identifying.
#[derive(Debug)]
pub struct DiscordGatewayState {
    pub session_id: Mutex<Option<String>>,
    pub sequence: AtomicI64,
    pub resume_gateway_url: Mutex<Option<String>>,
}

impl Default for DiscordGatewayState {
    fn default() -> Self {
        Self {
            session_id: Mutex::new(None),
            sequence: AtomicI64::new(-1),
            resume_gateway_url: Mutex::new(None),
        }
    }
}

/// Gateway dispatches the bot routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    MessageCreate {
        channel_id: String,
        author_id: String,
        author_is_bot: bool,
        content: String,
        message_id: String,
    },
    InteractionCreate {
        interaction_id: String,
        interaction_token: String,
        interaction_type: u64,
        channel_id: String,
        user_id: String,
        data: serde_json::Value,
    },
    Ready {
        session_id: String,
        resume_gateway_url: String,
        user_id: String,
    },
}

pub struct DiscordGateway {
    bot_token: String,
    intents: u64,
    state: Arc<DiscordGatewayState>,
}

impl DiscordGateway {
    pub fn new(bot_token: String, intents: u64, state: Arc<DiscordGatewayState>) -> Self {
        Self {
            bot_token,
            intents,
            state,
        }
    }

    /// Run one gateway session: handshake, then pump events until the
    /// socket closes or the server asks for a reconnect. Returning `Ok`
    /// means the caller should reconnect.
    pub async fn connect_and_listen(
        &self,
        http: &super::http_client::DiscordHttpClient,
        tx: &tokio::sync::mpsc::Sender<GatewayEvent>,
    ) -> Result<()> {
        let gateway_url = self.resolve_gateway_url(http).await?;
        let ws_url = build_gateway_ws_url(&gateway_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .with_context(|| format!("connect Discord gateway websocket: {ws_url}"))?;
        let (mut write, mut read) = ws_stream.split();

        let heartbeat_interval_ms = read_hello_heartbeat_interval(&mut read).await?;
        self.send_identify_or_resume(&mut write).await?;

        let mut heartbeat = interval(Duration::from_millis(heartbeat_interval_ms));
        let heartbeat_acked = AtomicBool::new(true);
        let mut ack_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !self
                        .send_heartbeat_if_healthy(&mut write, &heartbeat_acked, &mut ack_deadline, heartbeat_interval_ms)
                        .await?
                    {
                        tracing::warn!("Discord gateway heartbeat ACK missing; reconnecting");
                        return Ok(());
                    }
                }
                () = wait_for_ack_timeout(ack_deadline) => {
                    if !heartbeat_acked.load(Ordering::SeqCst) {
                        tracing::warn!("Discord gateway heartbeat ACK timeout; reconnecting");
                        return Ok(());
                    }
                    ack_deadline = None;
                }
                message = read.next() => {
                    let Some(message) = message else {
                        tracing::warn!("Discord gateway socket closed; reconnecting");
                        return Ok(());
                    };

                    let message = message.context("read Discord gateway message")?;
                    if !self
                        .handle_gateway_message(message, tx, &mut write, &heartbeat_acked, &mut ack_deadline, heartbeat_interval_ms)
                        .await?
                    {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn resolve_gateway_url(
        &self,
        http: &super::http_client::DiscordHttpClient,
    ) -> Result<String> {
        if let Some(url) = self.state.resume_gateway_url.lock().await.clone()
            && !url.is_empty()
        {
            return Ok(url);
        }

        let gw_resp = http
            .get_gateway_bot()
            .await
            .context("fetch Discord gateway/bot URL")?;
        let url = gw_resp
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or("wss://gateway.discord.gg")
            .to_string();
        Ok(url)
    }

    async fn send_identify_or_resume<WsSink>(&self, write: &mut WsSink) -> Result<()>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        if let Some(session_id) = self.state.session_id.lock().await.clone() {
            let payload = json!({
                "op": GatewayOpcode::Resume as u8,
                "d": {
                    "token": self.bot_token,
                    "session_id": session_id,
                    "seq": self.current_sequence_value(),
                }
            });
            write
                .send(Message::Text(payload.to_string().into()))
                .await
                .context("send Discord gateway resume")?;
            return Ok(());
        }

        let payload = json!({
            "op": GatewayOpcode::Identify as u8,
            "d": {
                "token": self.bot_token,
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "paywall-sentry",
                    "device": "paywall-sentry"
                }
            },
        });

        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway identify")
    }

    async fn send_heartbeat_if_healthy<WsSink>(
        &self,
        write: &mut WsSink,
        heartbeat_acked: &AtomicBool,
        ack_deadline: &mut Option<Instant>,
        heartbeat_interval_ms: u64,
    ) -> Result<bool>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        if !heartbeat_acked.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let payload = json!({
            "op": GatewayOpcode::Heartbeat as u8,
            "d": self.current_sequence(),
        });

        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway heartbeat")?;

        heartbeat_acked.store(false, Ordering::SeqCst);
        *ack_deadline = Some(Instant::now() + Duration::from_millis(heartbeat_interval_ms));
        Ok(true)
    }

    async fn handle_gateway_message<WsSink>(
        &self,
        message: Message,
        tx: &tokio::sync::mpsc::Sender<GatewayEvent>,
        write: &mut WsSink,
        heartbeat_acked: &AtomicBool,
        ack_deadline: &mut Option<Instant>,
        heartbeat_interval_ms: u64,
    ) -> Result<bool>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let Some(raw) = websocket_message_to_text(message) else {
            return Ok(true);
        };

        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway payload")?;

        if let Some(sequence) = payload.get("s").and_then(serde_json::Value::as_i64) {
            self.state.sequence.store(sequence, Ordering::SeqCst);
        }

        let op = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        match op {
            Some(GatewayOpcode::Heartbeat) => {
                if !self
                    .send_heartbeat_if_healthy(
                        write,
                        heartbeat_acked,
                        ack_deadline,
                        heartbeat_interval_ms,
                    )
                    .await?
                {
                    return Ok(false);
                }
                Ok(true)
            }
            Some(GatewayOpcode::HeartbeatAck) => {
                heartbeat_acked.store(true, Ordering::SeqCst);
                *ack_deadline = None;
                Ok(true)
            }
            Some(GatewayOpcode::Reconnect) => {
                tracing::info!("Discord gateway requested reconnect");
                Ok(false)
            }
            Some(GatewayOpcode::InvalidSession) => {
                self.handle_invalid_session(&payload).await?;
                Ok(false)
            }
            Some(GatewayOpcode::Dispatch) => {
                self.handle_dispatch_payload(&payload, tx).await?;
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    async fn handle_dispatch_payload(
        &self,
        payload: &serde_json::Value,
        tx: &tokio::sync::mpsc::Sender<GatewayEvent>,
    ) -> Result<()> {
        let event_type = payload
            .get("t")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        let Some(data) = payload.get("d") else {
            return Ok(());
        };

        if let Some(event) = parse_dispatch_event(event_type, data) {
            if let GatewayEvent::Ready {
                session_id,
                resume_gateway_url,
                ..
            } = &event
            {
                self.persist_ready_state(session_id, resume_gateway_url)
                    .await;
            }
            tx.send(event)
                .await
                .context("dispatch parsed Discord gateway event")?;
        }

        Ok(())
    }

    async fn persist_ready_state(&self, session_id: &str, resume_gateway_url: &str) {
        *self.state.session_id.lock().await = Some(session_id.to_string());
        *self.state.resume_gateway_url.lock().await = Some(resume_gateway_url.to_string());
    }

    async fn handle_invalid_session(&self, payload: &serde_json::Value) -> Result<()> {
        let can_resume = payload
            .get("d")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        self.state.sequence.store(-1, Ordering::SeqCst);
        *self.state.session_id.lock().await = None;

        if can_resume {
            let wait_secs = invalid_session_backoff_secs();
            tracing::warn!(
                "Discord gateway invalid session (resume allowed), waiting {wait_secs}s before reconnect"
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
            return Ok(());
        }

        tracing::warn!("Discord gateway invalid session (resume denied), clearing resume URL");
        *self.state.resume_gateway_url.lock().await = None;
        Ok(())
    }

    fn current_sequence(&self) -> serde_json::Value {
        let sequence = self.current_sequence_value();
        if sequence < 0 {
            serde_json::Value::Null
        } else {
            json!(sequence)
        }
    }

    fn current_sequence_value(&self) -> i64 {
        self.state.sequence.load(Ordering::SeqCst)
    }
}

pub fn parse_dispatch_event(event_type: &str, d: &serde_json::Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => parse_ready_event(d),
        "MESSAGE_CREATE" => parse_message_create_event(d),
        "INTERACTION_CREATE" => parse_interaction_create_event(d),
        "RESUMED" => {
            tracing::info!("Discord gateway session resumed");
            None
        }
        _ => None,
    }
}

fn parse_ready_event(d: &serde_json::Value) -> Option<GatewayEvent> {
    let session_id = d.get("session_id")?.as_str()?.to_string();
    let resume_gateway_url = d.get("resume_gateway_url")?.as_str()?.to_string();
    let user_id = d.get("user")?.get("id")?.as_str()?.to_string();

    Some(GatewayEvent::Ready {
        session_id,
        resume_gateway_url,
        user_id,
    })
}

fn parse_message_create_event(d: &serde_json::Value) -> Option<GatewayEvent> {
    let channel_id = d.get("channel_id")?.as_str()?.to_string();
    let author = d.get("author")?;
    let author_id = author.get("id")?.as_str()?.to_string();
    let author_is_bot = author
        .get("bot")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let content = d
        .get("content")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("")
        .to_string();
    let message_id = d.get("id")?.as_str()?.to_string();

    Some(GatewayEvent::MessageCreate {
        channel_id,
        author_id,
        author_is_bot,
        content,
        message_id,
    })
}

fn parse_interaction_create_event(d: &serde_json::Value) -> Option<GatewayEvent> {
    let interaction_id = d.get("id")?.as_str()?.to_string();
    let interaction_token = d.get("token")?.as_str()?.to_string();
    let interaction_type = d.get("type")?.as_u64()?;
    let channel_id = d.get("channel_id")?.as_str()?.to_string();

    let user_id = d
        .get("member")
        .and_then(|member| member.get("user"))
        .and_then(|user| user.get("id"))
        .and_then(serde_json::Value::as_str)
        .or_else(|| {
            d.get("user")
                .and_then(|user| user.get("id"))
                .and_then(serde_json::Value::as_str)
        })?
        .to_string();

    Some(GatewayEvent::InteractionCreate {
        interaction_id,
        interaction_token,
        interaction_type,
        channel_id,
        user_id,
        data: d.get("data").cloned().unwrap_or(serde_json::Value::Null),
    })
}

async fn wait_for_ack_timeout(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    } else {
        futures_util::future::pending::<()>().await;
    }
}

async fn read_hello_heartbeat_interval<WsRead>(read: &mut WsRead) -> Result<u64>
where
    WsRead:
        Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let message = message.context("read Discord gateway hello payload")?;
        let Some(raw) = websocket_message_to_text(message) else {
            continue;
        };

        let payload: serde_json::Value =
            serde_json::from_str(&raw).context("parse Discord gateway hello JSON")?;

        let op = payload
            .get("op")
            .and_then(serde_json::Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        if op == Some(GatewayOpcode::Hello) {
            let interval_ms = payload
                .get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS);
            return Ok(interval_ms);
        }
    }

    Err(anyhow::anyhow!("Discord gateway closed before Hello"))
}

fn websocket_message_to_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

fn build_gateway_ws_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    format!("{trimmed}/?v=10&encoding=json")
}

fn invalid_session_backoff_secs() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.subsec_nanos())
        .unwrap_or(0);
    1 + u64::from(nanos % 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gateway_state_default_construction() {
        let state = DiscordGatewayState::default();
        assert_eq!(state.sequence.load(Ordering::SeqCst), -1);
        assert!(state.session_id.lock().await.is_none());
        assert!(state.resume_gateway_url.lock().await.is_none());
    }

    #[test]
    fn parse_message_create_event_payload() {
        let payload = json!({
            "id": "msg-1",
            "channel_id": "chan-42",
            "content": "check this out http://nytimes.com/foo",
            "author": {
                "id": "user-1",
                "bot": false
            }
        });

        let event = parse_dispatch_event("MESSAGE_CREATE", &payload);

        if let Some(GatewayEvent::MessageCreate {
            channel_id,
            author_id,
            author_is_bot,
            content,
            message_id,
        }) = event
        {
            assert_eq!(channel_id, "chan-42");
            assert_eq!(author_id, "user-1");
            assert!(!author_is_bot);
            assert_eq!(content, "check this out http://nytimes.com/foo");
            assert_eq!(message_id, "msg-1");
        } else {
            panic!("expected MessageCreate event");
        }
    }

    #[test]
    fn parse_interaction_create_event_payload() {
        let payload = json!({
            "id": "int-1",
            "token": "tok",
            "type": 2,
            "channel_id": "chan-1",
            "member": { "user": { "id": "user-9" } },
            "data": { "name": "bypass" }
        });

        let event = parse_dispatch_event("INTERACTION_CREATE", &payload);

        if let Some(GatewayEvent::InteractionCreate {
            interaction_id,
            interaction_token,
            interaction_type,
            channel_id,
            user_id,
            data,
        }) = event
        {
            assert_eq!(interaction_id, "int-1");
            assert_eq!(interaction_token, "tok");
            assert_eq!(interaction_type, 2);
            assert_eq!(channel_id, "chan-1");
            assert_eq!(user_id, "user-9");
            assert_eq!(data["name"], "bypass");
        } else {
            panic!("expected InteractionCreate event");
        }
    }

    #[test]
    fn parse_ready_event_payload() {
        let payload = json!({
            "session_id": "session-1",
            "resume_gateway_url": "wss://gateway.discord.gg",
            "user": {
                "id": "bot-user"
            }
        });

        let event = parse_dispatch_event("READY", &payload);

        if let Some(GatewayEvent::Ready {
            session_id,
            resume_gateway_url,
            user_id,
        }) = event
        {
            assert_eq!(session_id, "session-1");
            assert_eq!(resume_gateway_url, "wss://gateway.discord.gg");
            assert_eq!(user_id, "bot-user");
        } else {
            panic!("expected Ready event");
        }
    }

    #[test]
    fn unknown_event_returns_none() {
        let payload = json!({"foo": "bar"});
        assert!(parse_dispatch_event("SOMETHING_ELSE", &payload).is_none());
    }

    #[test]
    fn bot_author_flag_is_carried_through() {
        let payload = json!({
            "id": "msg-2",
            "channel_id": "chan-1",
            "content": "http://nytimes.com/x",
            "author": { "id": "other-bot", "bot": true }
        });

        let Some(GatewayEvent::MessageCreate { author_is_bot, .. }) =
            parse_dispatch_event("MESSAGE_CREATE", &payload)
        else {
            panic!("expected MessageCreate event");
        };
        assert!(author_is_bot);
    }
}
