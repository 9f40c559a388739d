//! [`Shard`]: the GatewayEngine (spec.md §4.5).
//!
//! A single-threaded cooperative state machine. Every public method takes
//! `&mut self`; nothing here is `Sync` on purpose (spec.md §5: "A
//! GatewayEngine instance must be pinned to one task/thread").

use crate::{
    closecode::CloseCode,
    config::ShardConfig,
    error::{Error, ErrorKind},
    event::{decode, DispatchEvent, GatewayEvent},
    heartbeat::{Heartbeater, Latency},
    ratelimiter::CommandRatelimiter,
    session::{Session, Status},
};
#[cfg(feature = "compression")]
use crate::inflater::Inflater;
use corvid_model::gateway::{
    opcode::OpCode,
    payload::{Heartbeat, Identify, IdentifyProperties, RequestGuildMembers, Resume, UpdateVoiceState},
};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{protocol::CloseFrame, Message},
    MaybeTlsStream, WebSocketStream,
};

type Connection = WebSocketStream<MaybeTlsStream<TcpStream>>;

const API_VERSION: u8 = 10;

/// A single Discord Gateway connection.
pub struct Shard {
    config: ShardConfig,
    session: Session,
    status: Status,
    conn: Option<Connection>,
    heartbeater: Option<Heartbeater>,
    command_limiter: Option<CommandRatelimiter>,
    #[cfg(feature = "compression")]
    inflater: Inflater,
    reconnect_attempt: u32,
}

impl Shard {
    #[must_use]
    pub fn new(config: ShardConfig) -> Self {
        Self {
            config,
            session: Session::default(),
            status: Status::Disconnected,
            conn: None,
            heartbeater: None,
            command_limiter: None,
            #[cfg(feature = "compression")]
            inflater: Inflater::new(),
            reconnect_attempt: 0,
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session.session_id.as_deref()
    }

    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.session.sequence
    }

    #[must_use]
    pub fn latency(&self) -> Option<&Latency> {
        self.heartbeater.as_ref().map(Heartbeater::latency)
    }

    /// Drive the shard until the next event worth surfacing to the caller
    /// (a DISPATCH, or a fatal close). Internally handles HELLO, heartbeat
    /// sends/acks, RECONNECT, and INVALID_SESSION without returning, per
    /// spec.md §4.5's inbound-handling table.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::GatewayFatal`] if the socket closed with a code
    /// spec.md §4.5 classifies as non-reconnectable.
    pub async fn next_event(&mut self) -> Result<GatewayEvent, Error> {
        loop {
            if self.conn.is_none() {
                self.connect_or_resume().await?;
            }

            let heartbeat_due = self
                .heartbeater
                .as_ref()
                .map_or(Duration::from_secs(3600), Heartbeater::time_until_due);

            tokio::select! {
                frame = self.conn.as_mut().expect("connection established above").next() => {
                    match frame {
                        Some(Ok(message)) => {
                            if let Some(event) = self.handle_message(message).await? {
                                return Ok(event);
                            }
                        }
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "websocket error, reconnecting");
                            self.begin_reconnect().await;
                        }
                        None => {
                            tracing::debug!("connection closed by peer, reconnecting");
                            self.begin_reconnect().await;
                        }
                    }
                }
                () = tokio::time::sleep(heartbeat_due) => {
                    if let Err(err) = self.on_heartbeat_tick().await {
                        return Err(err);
                    }
                }
            }
        }
    }

    async fn handle_message(&mut self, message: Message) -> Result<Option<GatewayEvent>, Error> {
        let payload = match message {
            Message::Text(text) => Some(text),
            Message::Binary(bytes) => self.decompress(&bytes)?,
            Message::Close(frame) => {
                self.on_close(frame).await?;
                None
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
        };

        let Some(payload) = payload else { return Ok(None) };

        let event = decode(&payload)
            .map_err(|e| Error::new(ErrorKind::Deserializing, "malformed gateway payload").with_source(e))?;

        self.apply_event(event).await
    }

    #[cfg(feature = "compression")]
    fn decompress(&mut self, bytes: &[u8]) -> Result<Option<String>, Error> {
        self.inflater.extend(bytes);
        match self.inflater.msg() {
            Ok(Some(decompressed)) => Ok(Some(
                std::str::from_utf8(decompressed)
                    .map_err(|e| Error::new(ErrorKind::Compression, "inflated payload wasn't UTF-8").with_source(e))?
                    .to_owned(),
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(Error::new(ErrorKind::Compression, "zlib-stream inflation failed").with_source(e)),
        }
    }

    #[cfg(not(feature = "compression"))]
    fn decompress(&mut self, _bytes: &[u8]) -> Result<Option<String>, Error> {
        Ok(None)
    }

    /// Update internal state for an opcode, returning `Some` only for
    /// events the caller should see (spec.md §4.5 "Inbound handling").
    async fn apply_event(&mut self, event: GatewayEvent) -> Result<Option<GatewayEvent>, Error> {
        match event {
            GatewayEvent::Hello(hello) => {
                self.on_hello(hello.heartbeat_interval).await?;
                Ok(None)
            }
            GatewayEvent::HeartbeatAck => {
                if let Some(hb) = &mut self.heartbeater {
                    hb.record_ack();
                }
                Ok(None)
            }
            GatewayEvent::Heartbeat(_) => {
                self.send_heartbeat().await?;
                Ok(None)
            }
            GatewayEvent::Reconnect => {
                tracing::info!("server requested reconnect");
                self.close(CloseCode::UnknownError).await;
                self.begin_reconnect().await;
                Ok(None)
            }
            GatewayEvent::InvalidSession { resumable } => {
                if resumable {
                    tracing::info!("invalid session, resuming");
                    self.begin_reconnect().await;
                } else {
                    let wait = Duration::from_millis(rand::thread_rng().gen_range(1_000..=5_000));
                    tracing::info!(?wait, "invalid session, cannot resume, re-identifying");
                    tokio::time::sleep(wait).await;
                    self.session.clear();
                    self.disconnect_socket();
                    self.status = Status::Reconnecting;
                }
                Ok(None)
            }
            GatewayEvent::Dispatch(sequence, dispatch) => {
                self.session.observe_sequence(sequence);

                if let DispatchEvent::Ready(ready) = dispatch.as_ref() {
                    self.session.session_id = Some(ready.session_id.clone());
                    self.session.resume_gateway_url = Some(ready.resume_gateway_url.clone());
                    self.status = Status::Ready;
                    self.reconnect_attempt = 0;
                } else if matches!(dispatch.as_ref(), DispatchEvent::Resumed) {
                    self.status = Status::Ready;
                    self.reconnect_attempt = 0;
                }

                Ok(Some(GatewayEvent::Dispatch(sequence, dispatch)))
            }
        }
    }

    async fn on_hello(&mut self, heartbeat_interval_ms: u64) -> Result<(), Error> {
        self.heartbeater = Some(Heartbeater::new(heartbeat_interval_ms));
        self.command_limiter = Some(CommandRatelimiter::new(heartbeat_interval_ms));

        if self.session.can_resume() {
            self.status = Status::Resuming;
            self.send_resume().await
        } else {
            self.status = Status::Identifying;
            self.send_identify().await
        }
    }

    async fn on_heartbeat_tick(&mut self) -> Result<(), Error> {
        let is_zombie = self.heartbeater.as_ref().is_some_and(Heartbeater::is_zombie);

        if is_zombie {
            tracing::warn!("heartbeat ack not received in time, treating connection as zombie");
            self.close(CloseCode::UnknownError).await;
            self.begin_reconnect().await;
            return Ok(());
        }

        self.send_heartbeat().await
    }

    async fn send_heartbeat(&mut self) -> Result<(), Error> {
        let seq = self.session.sequence;
        self.send_command(OpCode::Heartbeat, &Heartbeat { seq }).await?;
        if let Some(hb) = &mut self.heartbeater {
            hb.record_send();
        }
        Ok(())
    }

    async fn send_identify(&mut self) -> Result<(), Error> {
        self.config.queue.request(self.config.shard).await;

        let identify = Identify {
            token: self.config.token.clone(),
            properties: IdentifyProperties::new("corvid"),
            compress: Some(false),
            large_threshold: Some(self.config.large_threshold),
            shard: Some(self.config.shard),
            presence: self.config.presence.clone(),
            intents: self.config.intents,
        };

        self.send_command(OpCode::Identify, &identify).await
    }

    async fn send_resume(&mut self) -> Result<(), Error> {
        let resume = Resume {
            token: self.config.token.clone(),
            session_id: self.session.session_id.clone().unwrap_or_default(),
            seq: self.session.sequence.unwrap_or(0),
        };

        self.send_command(OpCode::Resume, &resume).await
    }

    /// Request presence update (opcode 3).
    pub async fn update_presence(
        &mut self,
        presence: corvid_model::gateway::presence::UpdatePresencePayload,
    ) -> Result<(), Error> {
        self.send_command(OpCode::PresenceUpdate, &presence).await
    }

    /// Request voice state update (opcode 4).
    pub async fn update_voice_state(&mut self, state: UpdateVoiceState) -> Result<(), Error> {
        self.send_command(OpCode::VoiceStateUpdate, &state).await
    }

    /// Request guild members (opcode 8).
    pub async fn request_guild_members(&mut self, request: RequestGuildMembers) -> Result<(), Error> {
        self.send_command(OpCode::RequestGuildMembers, &request).await
    }

    async fn send_command<T: Serialize>(&mut self, op: OpCode, d: &T) -> Result<(), Error> {
        #[derive(Serialize)]
        struct Frame<'a, T> {
            op: OpCode,
            d: &'a T,
        }

        if let Some(limiter) = &self.command_limiter {
            limiter.acquire_one().await;
        }

        let json = serde_json::to_string(&Frame { op, d })
            .map_err(|e| Error::new(ErrorKind::Deserializing, "failed to encode command").with_source(e))?;

        let conn = self.conn.as_mut().ok_or_else(|| Error::new(ErrorKind::NotConnected, "shard is not connected"))?;

        conn.send(Message::Text(json))
            .await
            .map_err(|e| Error::new(ErrorKind::NotConnected, "failed to send command").with_source(e))
    }

    async fn connect_or_resume(&mut self) -> Result<(), Error> {
        if self.reconnect_attempt > 0 {
            let backoff = backoff_delay(self.reconnect_attempt);
            tracing::debug!(?backoff, attempt = self.reconnect_attempt, "waiting before reconnect");
            tokio::time::sleep(backoff).await;
        }

        let url = self.gateway_url();
        self.status = Status::Connecting;

        let (conn, _) = connect_async(&url)
            .await
            .map_err(|e| Error::new(ErrorKind::Connecting, "failed to open gateway websocket").with_source(e))?;

        self.conn = Some(conn);
        #[cfg(feature = "compression")]
        {
            self.inflater = Inflater::new();
        }
        Ok(())
    }

    fn gateway_url(&self) -> String {
        let base = if self.session.can_resume() {
            self.session
                .resume_gateway_url
                .clone()
                .unwrap_or_else(|| self.config.gateway_url.clone())
        } else {
            self.config.gateway_url.clone()
        };

        let compression = if self.config.compress { "&compress=zlib-stream" } else { "" };
        format!("{base}/?v={API_VERSION}&encoding=json{compression}")
    }

    async fn begin_reconnect(&mut self) {
        self.status = Status::Reconnecting;
        self.disconnect_socket();
        self.reconnect_attempt += 1;
    }

    fn disconnect_socket(&mut self) {
        self.conn = None;
        self.heartbeater = None;
        self.command_limiter = None;
    }

    async fn on_close(&mut self, frame: Option<CloseFrame<'_>>) -> Result<(), Error> {
        let code = frame.map_or(CloseCode::Other(1006), |f| CloseCode::from_code(f.code.into()));
        tracing::info!(code = code.as_u16(), "gateway closed");

        if code.is_fatal() {
            self.status = Status::Disconnected;
            self.disconnect_socket();
            return Err(Error::new(ErrorKind::GatewayFatal, "gateway closed with a fatal code")
                .with_close_code(code));
        }

        self.begin_reconnect().await;
        Ok(())
    }

    async fn close(&mut self, code: CloseCode) {
        if let Some(conn) = &mut self.conn {
            let _ = conn
                .send(Message::Close(Some(CloseFrame {
                    code: code.as_u16().into(),
                    reason: std::borrow::Cow::Borrowed(""),
                })))
                .await;
        }
    }

    /// Gracefully disconnect, per spec.md's `disconnecting` status.
    pub async fn shutdown(&mut self) {
        self.status = Status::Disconnecting;
        self.close(CloseCode::UnknownError).await;
        self.disconnect_socket();
        self.status = Status::Disconnected;
    }
}

/// Exponential backoff with a 1s base, factor 2, 60s cap, ±20% jitter
/// (spec.md §4.5 "Close-code policy").
fn backoff_delay(attempt: u32) -> Duration {
    let base = Duration::from_secs(1);
    let capped = base.saturating_mul(1 << attempt.min(6)).min(Duration::from_secs(60));
    let jitter = rand::thread_rng().gen_range(0.8..1.2);
    capped.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::backoff_delay;
    use std::time::Duration;

    #[test]
    fn backoff_is_capped_at_sixty_seconds() {
        for attempt in 0..20 {
            assert!(backoff_delay(attempt) <= Duration::from_secs(72));
        }
    }

    #[test]
    fn backoff_grows_with_attempt_count() {
        let early = backoff_delay(0).as_secs_f64();
        let later = backoff_delay(4).as_secs_f64();
        assert!(later > early);
    }
}
