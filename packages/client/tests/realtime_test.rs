//! Integration tests for the realtime seat channel against an in-process
//! STOMP broker served by axum.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use encuentro_client::{
    domain::{EventId, SeatNumber, SeatState},
    infrastructure::{
        realtime::{ChannelEvent, ChannelState, RealtimeChannel},
        stomp::{self, StompFrame, parse_frames},
    },
};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

/// Broker behaviour for the first connection; later connections always accept.
#[derive(Clone, Copy)]
enum FirstConnect {
    Accept,
    Reject,
}

#[derive(Clone)]
struct BrokerState {
    first_connect: FirstConnect,
    connections: Arc<AtomicUsize>,
    /// Frames received from the client, as (command, first relevant header)
    received: mpsc::UnboundedSender<(String, String)>,
    /// Bodies to push to subscribed clients
    publish: broadcast::Sender<String>,
}

/// Helper struct to manage the broker lifecycle
struct TestBroker {
    addr: SocketAddr,
    received: mpsc::UnboundedReceiver<(String, String)>,
    publish: broadcast::Sender<String>,
}

impl TestBroker {
    async fn start(first_connect: FirstConnect) -> Self {
        let (received_tx, received) = mpsc::unbounded_channel();
        let (publish, _) = broadcast::channel(16);
        let state = BrokerState {
            first_connect,
            connections: Arc::new(AtomicUsize::new(0)),
            received: received_tx,
            publish: publish.clone(),
        };

        let app = Router::new()
            .route("/ws/websocket", get(upgrade))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestBroker {
            addr,
            received,
            publish,
        }
    }

    fn url(&self) -> String {
        format!("ws://{}/ws/websocket", self.addr)
    }

    /// Wait until the client sent a frame with the given command
    async fn expect_frame(&mut self, command: &str) -> String {
        loop {
            let (received, header) = tokio::time::timeout(WAIT, self.received.recv())
                .await
                .expect("broker timed out waiting for a frame")
                .expect("broker stopped");
            if received == command {
                return header;
            }
        }
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<BrokerState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: BrokerState) {
    let connection = state.connections.fetch_add(1, Ordering::SeqCst);
    let mut publish = state.publish.subscribe();
    let mut subscription: Option<(String, String)> = None;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };
                for frame in parse_frames(text.as_str()) {
                    let header = match frame.command.as_str() {
                        stomp::SUBSCRIBE => frame.header("destination").unwrap_or_default().to_string(),
                        stomp::UNSUBSCRIBE => frame.header("id").unwrap_or_default().to_string(),
                        stomp::DISCONNECT => frame.header("receipt").unwrap_or_default().to_string(),
                        _ => String::new(),
                    };
                    state.received.send((frame.command.clone(), header)).ok();

                    let reply = match frame.command.as_str() {
                        stomp::CONNECT => {
                            if connection == 0 && matches!(state.first_connect, FirstConnect::Reject) {
                                Some(StompFrame::new(stomp::ERROR).with_header("message", "bad credentials"))
                            } else {
                                Some(StompFrame::new(stomp::CONNECTED).with_header("version", "1.2"))
                            }
                        }
                        stomp::SUBSCRIBE => {
                            subscription = Some((
                                frame.header("id").unwrap_or_default().to_string(),
                                frame.header("destination").unwrap_or_default().to_string(),
                            ));
                            None
                        }
                        stomp::DISCONNECT => {
                            Some(StompFrame::new(stomp::RECEIPT).with_header("receipt-id", frame.header("receipt").unwrap_or_default()))
                        }
                        _ => None,
                    };
                    if let Some(reply) = reply
                        && socket.send(Message::Text(reply.encode().into())).await.is_err()
                    {
                        return;
                    }
                }
            }
            body = publish.recv() => {
                let Ok(body) = body else { break };
                let Some((id, destination)) = &subscription else { continue };
                let frame = StompFrame::new(stomp::MESSAGE)
                    .with_header("destination", destination.as_str())
                    .with_header("subscription", id.as_str())
                    .with_header("content-type", "application/json")
                    .with_body(body);
                if socket.send(Message::Text(frame.encode().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a channel event")
        .expect("channel stopped")
}

#[tokio::test]
async fn test_channel_subscribes_and_forwards_patches() {
    // テスト項目: 接続後にトピックを購読し、座席更新がパッチとして届く（不正なペイロードは破棄）
    // given (前提条件):
    let mut broker = TestBroker::start(FirstConnect::Accept).await;
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let handle = RealtimeChannel::new(broker.url(), EventId::new(3), Duration::from_millis(100))
        .spawn(events_tx, &CancellationToken::new());

    // when (操作):
    assert_eq!(next_event(&mut events).await, ChannelEvent::Connected);
    let destination = broker.expect_frame(stomp::SUBSCRIBE).await;
    broker.publish.send("{ not json".to_string()).unwrap();
    broker
        .publish
        .send(r#"{"idEvento":3,"asiento":7,"estado":"HOLD","holdUntil":"2025-01-01T10:00:00Z"}"#.to_string())
        .unwrap();

    // then (期待する結果):
    assert_eq!(destination, "/topic/eventos/3/asientos");
    assert_eq!(handle.state(), ChannelState::Connected);
    let ChannelEvent::Patch(patch) = next_event(&mut events).await else {
        panic!("expected a seat patch");
    };
    assert_eq!(patch.number, SeatNumber::new(7).unwrap());
    assert_eq!(patch.state, SeatState::Hold);
    assert!(patch.hold_expires_at.is_some());

    handle.teardown().await;
}

#[tokio::test]
async fn test_teardown_unsubscribes_and_disconnects() {
    // テスト項目: 終了時に UNSUBSCRIBE と DISCONNECT が送られ、状態が切断になる
    // given (前提条件):
    let mut broker = TestBroker::start(FirstConnect::Accept).await;
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let handle = RealtimeChannel::new(broker.url(), EventId::new(3), Duration::from_millis(100))
        .spawn(events_tx, &CancellationToken::new());
    assert_eq!(next_event(&mut events).await, ChannelEvent::Connected);
    broker.expect_frame(stomp::SUBSCRIBE).await;
    let state = handle.subscribe_state();

    // when (操作):
    handle.teardown().await;

    // then (期待する結果):
    let unsubscribed_id = broker.expect_frame(stomp::UNSUBSCRIBE).await;
    let receipt = broker.expect_frame(stomp::DISCONNECT).await;
    assert!(!unsubscribed_id.is_empty());
    assert!(!receipt.is_empty());
    assert_eq!(*state.borrow(), ChannelState::Disconnected);
}

#[tokio::test]
async fn test_error_frame_degrades_then_reconnects() {
    // テスト項目: ERROR フレームで劣化状態になり、一定時間後に再接続される
    // given (前提条件):
    let mut broker = TestBroker::start(FirstConnect::Reject).await;
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let handle = RealtimeChannel::new(broker.url(), EventId::new(3), Duration::from_millis(100))
        .spawn(events_tx, &CancellationToken::new());

    // when (操作):
    let first = next_event(&mut events).await;
    let second = next_event(&mut events).await;

    // then (期待する結果):
    let ChannelEvent::Degraded { reason } = first else {
        panic!("expected the channel to degrade first");
    };
    assert!(reason.contains("bad credentials"));
    assert_eq!(second, ChannelEvent::Connected);
    broker.expect_frame(stomp::SUBSCRIBE).await;

    handle.teardown().await;
}

#[tokio::test]
async fn test_unreachable_broker_degrades_and_teardown_is_safe() {
    // テスト項目: 接続できない場合は劣化状態になり、未接続のままでも安全に終了できる
    // given (前提条件):
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let handle = RealtimeChannel::new(
        format!("ws://{}/ws/websocket", addr),
        EventId::new(3),
        Duration::from_secs(60),
    )
    .spawn(events_tx, &CancellationToken::new());

    // when (操作):
    let event = next_event(&mut events).await;
    let state = handle.subscribe_state();
    handle.teardown().await;

    // then (期待する結果):
    assert!(matches!(event, ChannelEvent::Degraded { .. }));
    assert_eq!(*state.borrow(), ChannelState::Disconnected);
}
