//! STOMP-over-WebSocket seat channel with automatic reconnection.
//!
//! The channel owns one background task. Each connection attempt sends
//! CONNECT, waits for CONNECTED, then subscribes to the event's seat topic.
//! Decoded patches and connectivity changes are pushed to the session as
//! `ChannelEvent`s; the coarse connection state is published on a `watch`
//! channel. Any failure degrades the channel and a new attempt follows after
//! a fixed delay until the channel is torn down.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{http::Uri, protocol::Message},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::seat_topic,
    domain::{EventId, SeatPatch},
    infrastructure::{
        dto::realtime::SeatUpdateDto,
        stomp::{self, StompFrame, parse_frames},
    },
};

const SUBSCRIPTION_ID: &str = "seats-0";
const DISCONNECT_RECEIPT: &str = "bye";

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Broker error: {0}")]
    Protocol(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection closed by server")]
    Closed,
}

/// Notifications from the channel to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connected,
    Degraded { reason: String },
    Patch(SeatPatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Degraded,
}

/// Configuration of the seat channel for one event.
#[derive(Debug, Clone)]
pub struct RealtimeChannel {
    ws_url: String,
    event_id: EventId,
    topic: String,
    reconnect_delay: Duration,
}

impl RealtimeChannel {
    pub fn new(ws_url: impl Into<String>, event_id: EventId, reconnect_delay: Duration) -> Self {
        Self {
            ws_url: ws_url.into(),
            event_id,
            topic: seat_topic(event_id),
            reconnect_delay,
        }
    }

    /// Start the connection task.
    ///
    /// The task stops when `token` (or the handle's own child token) is
    /// cancelled, or when the event receiver is dropped.
    pub fn spawn(
        self,
        events: mpsc::UnboundedSender<ChannelEvent>,
        token: &CancellationToken,
    ) -> RealtimeHandle {
        let token = token.child_token();
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let task = tokio::spawn(self.run(events, state_tx, token.clone()));
        RealtimeHandle {
            state: state_rx,
            token,
            task,
        }
    }

    async fn run(
        self,
        events: mpsc::UnboundedSender<ChannelEvent>,
        state: watch::Sender<ChannelState>,
        token: CancellationToken,
    ) {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            state.send_replace(ChannelState::Connecting);
            tracing::info!(
                "Connecting to {} for {} (attempt {})",
                self.ws_url,
                self.topic,
                attempt
            );

            match self.run_connection(&events, &state, &token).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!("Realtime channel degraded: {}", e);
                    state.send_replace(ChannelState::Degraded);
                    let degraded = ChannelEvent::Degraded {
                        reason: e.to_string(),
                    };
                    if events.send(degraded).is_err() {
                        break;
                    }

                    tracing::info!(
                        "Reconnecting in {} seconds...",
                        self.reconnect_delay.as_secs_f32()
                    );
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
            }
        }

        state.send_replace(ChannelState::Disconnected);
        tracing::debug!("Realtime channel for {} stopped", self.topic);
    }

    /// One connection lifetime. `Ok(())` means a requested shutdown.
    async fn run_connection(
        &self,
        events: &mpsc::UnboundedSender<ChannelEvent>,
        state: &watch::Sender<ChannelState>,
        token: &CancellationToken,
    ) -> Result<(), RealtimeError> {
        let connected = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            connected = connect_async(self.ws_url.as_str()) => connected,
        };
        let (ws_stream, _response) = connected.map_err(|e| RealtimeError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        send_frame(&mut write, &StompFrame::connect(&broker_host(&self.ws_url))).await?;

        let mut subscribed = false;
        loop {
            let message = tokio::select! {
                _ = token.cancelled() => {
                    close(&mut write, subscribed).await;
                    return Ok(());
                }
                message = read.next() => message,
            };

            let text = match message {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => return Err(RealtimeError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(RealtimeError::Transport(e.to_string())),
            };

            for frame in parse_frames(text.as_str()) {
                match frame.command.as_str() {
                    stomp::CONNECTED => {
                        send_frame(
                            &mut write,
                            &StompFrame::subscribe(SUBSCRIPTION_ID, &self.topic),
                        )
                        .await?;
                        subscribed = true;
                        state.send_replace(ChannelState::Connected);
                        tracing::info!("Subscribed to {}", self.topic);
                        if events.send(ChannelEvent::Connected).is_err() {
                            close(&mut write, subscribed).await;
                            return Ok(());
                        }
                    }
                    stomp::MESSAGE if subscribed => {
                        let Some(patch) = self.decode_patch(&frame) else {
                            continue;
                        };
                        if events.send(ChannelEvent::Patch(patch)).is_err() {
                            close(&mut write, subscribed).await;
                            return Ok(());
                        }
                    }
                    stomp::ERROR => {
                        let reason = frame
                            .header("message")
                            .map(str::to_string)
                            .unwrap_or_else(|| frame.body.trim().to_string());
                        return Err(RealtimeError::Protocol(reason));
                    }
                    other => tracing::debug!("Ignoring {} frame", other),
                }
            }
        }
    }

    fn decode_patch(&self, frame: &StompFrame) -> Option<SeatPatch> {
        let dto = match serde_json::from_str::<SeatUpdateDto>(&frame.body) {
            Ok(dto) => dto,
            Err(e) => {
                tracing::warn!("Dropping malformed seat update {:?}: {}", frame.body, e);
                return None;
            }
        };

        if let Some(event_id) = dto.id_evento
            && event_id != self.event_id.value()
        {
            tracing::debug!("Dropping seat update for event {}", event_id);
            return None;
        }

        SeatPatch::try_from(dto)
            .map_err(|e| tracing::warn!("Dropping seat update: {}", e))
            .ok()
    }
}

/// Control handle of a running channel.
#[derive(Debug)]
pub struct RealtimeHandle {
    state: watch::Receiver<ChannelState>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RealtimeHandle {
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Unsubscribe, disconnect and close the socket, then wait for the task.
    ///
    /// Safe to call whether or not a connection was ever established.
    pub async fn teardown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Realtime task ended abnormally: {}", e);
        }
    }
}

async fn send_frame(write: &mut WsWriter, frame: &StompFrame) -> Result<(), RealtimeError> {
    write
        .send(Message::Text(frame.encode().into()))
        .await
        .map_err(|e| RealtimeError::Transport(e.to_string()))
}

async fn close(write: &mut WsWriter, subscribed: bool) {
    if subscribed && let Err(e) = send_frame(write, &StompFrame::unsubscribe(SUBSCRIPTION_ID)).await {
        tracing::debug!("UNSUBSCRIBE not delivered: {}", e);
    }
    if let Err(e) = send_frame(write, &StompFrame::disconnect(DISCONNECT_RECEIPT)).await {
        tracing::debug!("DISCONNECT not delivered: {}", e);
    }
    if let Err(e) = write.send(Message::Close(None)).await {
        tracing::debug!("Close frame not delivered: {}", e);
    }
}

/// Virtual host for the CONNECT frame, taken from the endpoint URL.
fn broker_host(ws_url: &str) -> String {
    ws_url
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string())
}
