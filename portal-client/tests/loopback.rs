//! End-to-end tests against an in-process host
//!
//! A minimal host serves the ticket endpoint and the WebSocket on one
//! listener, like a real portal host does, and hands accepted sockets to
//! the test body.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use portal_client::{
    ClientConfig, Connection, ConnectionEvent, ConnectionState, Portal, SessionState,
};
use portal_protocol::{
    decode_frame, defs, encode_frame, ApiArgument, ApiMessage, ApiValue, EventType, HeaderInfo,
};
use portal_utils::PortalError;

const TICKET: &str = "ticket";

/// Serve the ticket endpoint and WebSocket upgrades on one listener;
/// accepted sockets and their offered subprotocols go to the channels.
/// `upgrade_delay` stalls each upgrade before the handshake reply.
async fn run_host(
    listener: TcpListener,
    ws_tx: mpsc::UnboundedSender<WebSocketStream<TcpStream>>,
    proto_tx: mpsc::UnboundedSender<String>,
    upgrade_delay: Duration,
) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            break;
        };
        let mut probe = [0u8; 4];
        let Ok(n) = stream.peek(&mut probe).await else {
            continue;
        };
        if &probe[..n] == b"POST" {
            read_request(&mut stream).await;
            let body = TICKET.as_bytes();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.write_all(body).await;
            let _ = stream.shutdown().await;
        } else {
            tokio::time::sleep(upgrade_delay).await;
            let proto_tx = proto_tx.clone();
            // The client requires the selected subprotocol to be echoed
            let callback = move |req: &Request, mut resp: Response| {
                if let Some(proto) = req.headers().get("sec-websocket-protocol") {
                    if let Ok(value) = proto.to_str() {
                        let _ = proto_tx.send(value.to_string());
                    }
                    resp.headers_mut()
                        .insert("sec-websocket-protocol", proto.clone());
                }
                Ok(resp)
            };
            if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                let _ = ws_tx.send(ws);
            }
        }
    }
}

/// Read one HTTP request including its body
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = stream.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= pos + 4 + content_length {
                return;
            }
        }
    }
}

async fn start_host(reconnect_delay_ms: u64) -> (ClientConfig, HostChannels) {
    start_host_with(reconnect_delay_ms, Duration::ZERO).await
}

async fn start_host_with(
    reconnect_delay_ms: u64,
    upgrade_delay: Duration,
) -> (ClientConfig, HostChannels) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (ws_tx, ws_rx) = mpsc::unbounded_channel();
    let (proto_tx, proto_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_host(listener, ws_tx, proto_tx, upgrade_delay));

    let config = ClientConfig {
        host: "127.0.0.1".into(),
        port,
        user: "operator".into(),
        pass: "secret".into(),
        reconnect_delay_ms,
        ..ClientConfig::default()
    };
    (
        config,
        HostChannels {
            sockets: ws_rx,
            protocols: proto_rx,
        },
    )
}

struct HostChannels {
    sockets: mpsc::UnboundedReceiver<WebSocketStream<TcpStream>>,
    protocols: mpsc::UnboundedReceiver<String>,
}

impl HostChannels {
    async fn next_socket(&mut self) -> WebSocketStream<TcpStream> {
        timeout(Duration::from_secs(5), self.sockets.recv())
            .await
            .expect("no connection within timeout")
            .expect("host stopped")
    }
}

async fn recv_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame within timeout")
        {
            Some(Ok(Message::Text(text))) => return text.to_string(),
            Some(Ok(_)) => continue,
            other => panic!("connection ended: {other:?}"),
        }
    }
}

async fn wait_for_state(connection: &Connection, want: ConnectionState) {
    timeout(Duration::from_secs(5), async {
        while connection.state() != want {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("state not reached within timeout");
}

/// Drain a host-side socket so close handshakes complete
fn drain(ws: WebSocketStream<TcpStream>) {
    tokio::spawn(async move {
        let mut ws = ws;
        while let Some(Ok(_)) = ws.next().await {}
    });
}

fn toggle_message(id: &str, name: &str) -> ApiMessage {
    ApiMessage::new(
        id,
        name,
        vec![
            ApiArgument::new(
                defs::ITEM_TYPE_ARG,
                ApiValue::String(defs::ITEM_TOGGLE.into()),
            ),
            ApiArgument::new(defs::ITEM_VALUE_ARG, ApiValue::Bool(false)),
        ],
    )
}

#[tokio::test]
async fn test_connect_synchronize_and_close() {
    let (config, mut host) = start_host(100).await;
    let connection = Connection::new(config);
    let mut events = connection.subscribe();

    connection.open().await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Open);
    assert_eq!(host.protocols.recv().await.unwrap(), TICKET);
    let mut host_ws = host.next_socket().await;

    let mut portal = Portal::new("P1", connection.sender());
    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, ConnectionEvent::Opened));
    portal.handle_event(event);

    // The host sees the synchronization request
    let request = decode_frame(&recv_text(&mut host_ws).await).unwrap();
    assert_eq!(request.header.event_type, EventType::Request);
    assert_eq!(request.header.portal_id, "P1");
    assert_eq!(request.header.event_id, portal.session_id());

    // Answer it with one item and pump the session until it catches up
    let response = encode_frame(
        &HeaderInfo {
            event_id: request.header.event_id.clone(),
            portal_id: "P1".into(),
            event_type: EventType::Response,
        },
        &[toggle_message("t1", "Power")],
    )
    .unwrap();
    host_ws.send(Message::Text(response.into())).await.unwrap();

    while portal.state() != SessionState::Synchronized {
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        portal.handle_event(event);
    }
    assert_eq!(portal.item("t1").unwrap().name, "Power");

    drain(host_ws);
    connection.close().await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_reconnects_after_connection_drop() {
    let (config, mut host) = start_host(50).await;
    let connection = Connection::new(config);

    connection.open().await.unwrap();
    let host_ws = host.next_socket().await;

    // Kill the socket without a close handshake
    drop(host_ws);

    // A second connection arrives on its own, with a fresh ticket
    let second = host.next_socket().await;
    wait_for_state(&connection, ConnectionState::Open).await;
    assert_eq!(host.protocols.recv().await.unwrap(), TICKET);
    assert_eq!(host.protocols.recv().await.unwrap(), TICKET);

    drain(second);
    connection.close().await.unwrap();
}

#[tokio::test]
async fn test_close_cancels_reconnection() {
    let (config, mut host) = start_host(500).await;
    let connection = Connection::new(config);

    connection.open().await.unwrap();
    let host_ws = host.next_socket().await;
    drop(host_ws);
    wait_for_state(&connection, ConnectionState::Closed).await;

    // The connection is already down; close still cancels the retry
    let err = connection.close().await.unwrap_err();
    assert!(matches!(err, PortalError::AlreadyClosed { .. }));

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(host.sockets.try_recv().is_err());
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_close_during_handshake_discards_socket() {
    // Every WebSocket upgrade stalls long enough for close() to land in
    // the middle of it
    let (config, mut host) = start_host_with(10_000, Duration::from_millis(600)).await;
    let connection = Arc::new(Connection::new(config));

    // One full cycle first so close() applies to a known connection
    connection.open().await.unwrap();
    drain(host.next_socket().await);
    connection.close().await.unwrap();

    let opener = {
        let connection = connection.clone();
        tokio::spawn(async move { connection.open().await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(connection.state(), ConnectionState::Connecting);
    connection.close().await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Closed);

    // The handshake still completes on the host side, but the late socket
    // must be discarded rather than reopening the connection
    let result = timeout(Duration::from_secs(5), opener)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_err());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_reconnects_after_repeated_failures() {
    // Reserve a port, then leave it unbound so every attempt is refused
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig {
        host: "127.0.0.1".into(),
        port,
        user: "operator".into(),
        pass: "secret".into(),
        reconnect_delay_ms: 50,
        ..ClientConfig::default()
    };
    let connection = Connection::new(config);
    assert!(connection.open().await.is_err());

    // Several retry periods pass with the host still down
    tokio::time::sleep(Duration::from_millis(180)).await;
    assert_ne!(connection.state(), ConnectionState::Open);

    // Bring the host up; the retry cycle converges on its own
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let (ws_tx, mut ws_rx) = mpsc::unbounded_channel();
    let (proto_tx, _proto_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_host(listener, ws_tx, proto_tx, Duration::ZERO));

    let host_ws = timeout(Duration::from_secs(5), ws_rx.recv())
        .await
        .expect("no connection within timeout")
        .expect("host stopped");
    wait_for_state(&connection, ConnectionState::Open).await;

    // Exactly one socket for the one successful attempt
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(ws_rx.try_recv().is_err());

    drain(host_ws);
    connection.close().await.unwrap();
}

#[tokio::test]
async fn test_ticket_rejection_surfaces() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            read_request(&mut stream).await;
            let _ = stream
                .write_all(
                    b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await;
            let _ = stream.shutdown().await;
        }
    });

    let config = ClientConfig {
        host: "127.0.0.1".into(),
        port,
        reconnect_delay_ms: 10_000,
        ..ClientConfig::default()
    };
    let connection = Connection::new(config);
    let err = connection.open().await.unwrap_err();
    assert!(matches!(err, PortalError::TicketRejected { status: 403, .. }));
    assert_eq!(connection.state(), ConnectionState::Closed);
}
