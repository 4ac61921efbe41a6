//! Connection lifecycle management
//!
//! [`Connection`] owns the WebSocket to the portal host and a small state
//! machine around it: `closed -> connecting -> open -> closing -> closed`.
//! Every attempt fetches a fresh ticket, then performs the handshake with
//! the ticket offered as the WebSocket subprotocol. An unintentional drop
//! schedules a reconnection attempt after a fixed delay, and each failed
//! attempt schedules the next one; only an explicit [`Connection::close`]
//! (or dropping the `Connection`) stops the cycle.

use std::fmt;
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use portal_protocol::defs;
use portal_utils::{PortalError, Result};

use super::handler::FrameSender;
use super::ticket;
use crate::config::ClientConfig;

/// Lifecycle state of the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(s)
    }
}

/// Connection lifecycle notifications, broadcast to all subscribers
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The WebSocket is open; a session should (re)synchronize
    Opened,
    /// The WebSocket is gone, intentionally or not
    Closed,
    /// A raw text frame arrived from the host
    Message(String),
}

/// Commands consumed by the per-socket io task
pub(super) enum Outbound {
    Frame(String),
    Close(oneshot::Sender<Result<()>>),
}

/// State shared between the handle, the io task and the reconnect timer
pub(super) struct Shared {
    pub(super) state: ConnectionState,
    pub(super) outgoing: Option<mpsc::Sender<Outbound>>,
    /// Set by close(); suppresses reconnection and aborts in-flight attempts
    pub(super) intentional: bool,
    pub(super) ever_opened: bool,
    pub(super) reconnect: Option<JoinHandle<()>>,
    pub(super) io_task: Option<JoinHandle<()>>,
}

/// Everything a connection attempt needs, cheap to clone into tasks
#[derive(Clone)]
struct Ctx {
    config: ClientConfig,
    /// (user, pass); separate from the config so rotation reaches tasks
    /// already holding a `Ctx` clone
    credentials: Arc<Mutex<(String, String)>>,
    http: reqwest::Client,
    events: broadcast::Sender<ConnectionEvent>,
    shared: Arc<Mutex<Shared>>,
}

/// Managed WebSocket connection to a portal host
pub struct Connection {
    ctx: Ctx,
}

impl Connection {
    pub fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        let credentials = Arc::new(Mutex::new((config.user.clone(), config.pass.clone())));
        Self {
            ctx: Ctx {
                config,
                credentials,
                http: reqwest::Client::new(),
                events,
                shared: Arc::new(Mutex::new(Shared {
                    state: ConnectionState::Closed,
                    outgoing: None,
                    intentional: false,
                    ever_opened: false,
                    reconnect: None,
                    io_task: None,
                })),
            },
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.ctx.shared.lock().unwrap().state
    }

    /// Subscribe to lifecycle events and inbound frames
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.ctx.events.subscribe()
    }

    /// Replace the credentials used for ticket requests; takes effect on
    /// the next connection attempt
    pub fn set_credentials(&self, user: impl Into<String>, pass: impl Into<String>) {
        *self.ctx.credentials.lock().unwrap() = (user.into(), pass.into());
    }

    /// A clonable handle for submitting outbound frames
    pub fn sender(&self) -> FrameSender {
        FrameSender::live(self.ctx.shared.clone())
    }

    /// Queue a frame for transmission; dropped with an error log if the
    /// connection is not open
    pub fn send(&self, frame: String) {
        self.sender().send(frame);
    }

    /// Open the connection: fetch a ticket, perform the handshake, start
    /// the io task
    ///
    /// Rejects unless the state is `closed`. On failure the state returns
    /// to `closed` and a reconnection attempt is scheduled; the returned
    /// error describes the first failure.
    pub async fn open(&self) -> Result<()> {
        {
            let mut shared = self.ctx.shared.lock().unwrap();
            if shared.state != ConnectionState::Closed {
                return Err(PortalError::NotClosed {
                    state: shared.state.to_string(),
                });
            }
            // An explicit open supersedes any pending retry
            if let Some(handle) = shared.reconnect.take() {
                handle.abort();
            }
            shared.intentional = false;
            shared.state = ConnectionState::Connecting;
        }

        match start_connection(&self.ctx).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.ctx.shared.lock().unwrap().state = ConnectionState::Closed;
                schedule_reconnect(&self.ctx);
                Err(e)
            }
        }
    }

    /// Close the connection with a normal close frame and wait for the
    /// close handshake to finish
    ///
    /// Cancels pending reconnection attempts even when the close itself is
    /// rejected. Rejects if the connection was never opened or is already
    /// closing or closed.
    pub async fn close(&self) -> Result<()> {
        let outgoing = {
            let mut shared = self.ctx.shared.lock().unwrap();
            shared.intentional = true;
            if let Some(handle) = shared.reconnect.take() {
                handle.abort();
            }
            if !shared.ever_opened {
                return Err(PortalError::NeverOpened);
            }
            match shared.state {
                ConnectionState::Closed | ConnectionState::Closing => {
                    return Err(PortalError::AlreadyClosed {
                        state: shared.state.to_string(),
                    });
                }
                ConnectionState::Connecting => {
                    // No socket yet; the in-flight attempt sees the
                    // intentional flag and aborts after its ticket fetch
                    shared.state = ConnectionState::Closed;
                    return Ok(());
                }
                ConnectionState::Open => {
                    shared.state = ConnectionState::Closing;
                    shared.outgoing.clone()
                }
            }
        };

        let Some(outgoing) = outgoing else {
            self.ctx.shared.lock().unwrap().state = ConnectionState::Closed;
            return Err(PortalError::ConnectionClosed);
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        if outgoing.send(Outbound::Close(reply_tx)).await.is_err() {
            self.ctx.shared.lock().unwrap().state = ConnectionState::Closed;
            return Err(PortalError::ConnectionClosed);
        }
        reply_rx.await.map_err(|_| PortalError::ConnectionClosed)?
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let mut shared = self.ctx.shared.lock().unwrap();
        shared.intentional = true;
        if let Some(handle) = shared.reconnect.take() {
            handle.abort();
        }
        if let Some(handle) = shared.io_task.take() {
            handle.abort();
        }
    }
}

/// One full connection attempt: ticket, handshake, io task startup
async fn start_connection(ctx: &Ctx) -> Result<()> {
    let (user, pass) = ctx.credentials.lock().unwrap().clone();
    let ticket = ticket::fetch_ticket(&ctx.http, ctx.config.http_endpoint(), &user, &pass).await?;

    // close() may have run while the ticket fetch was in flight; the
    // ticket must not be used in that case
    {
        let shared = ctx.shared.lock().unwrap();
        if shared.intentional || shared.state != ConnectionState::Connecting {
            return Err(PortalError::connection("connection attempt superseded"));
        }
    }

    let endpoint = ctx.config.ws_endpoint();
    let mut request = endpoint
        .clone()
        .into_client_request()
        .map_err(|e| PortalError::connection(format!("invalid endpoint {endpoint}: {e}")))?;
    let protocol = HeaderValue::from_str(ticket.trim())
        .map_err(|_| PortalError::ticket("ticket is not a valid header value"))?;
    request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);

    let (ws, _response) = connect_async(request)
        .await
        .map_err(|e| PortalError::connection(format!("WebSocket handshake failed: {e}")))?;

    let (out_tx, out_rx) = mpsc::channel(64);
    {
        let mut shared = ctx.shared.lock().unwrap();
        // close() may equally have run during the handshake itself; a
        // socket from a superseded attempt must not be installed
        if shared.intentional || shared.state != ConnectionState::Connecting {
            debug!("discarding socket from superseded connection attempt");
            return Err(PortalError::connection("connection attempt superseded"));
        }
        shared.state = ConnectionState::Open;
        shared.outgoing = Some(out_tx);
        shared.io_task = Some(tokio::spawn(io_task(ctx.clone(), ws, out_rx)));
        shared.ever_opened = true;
    }
    info!(%endpoint, "connection open");
    let _ = ctx.events.send(ConnectionEvent::Opened);
    Ok(())
}

/// Per-socket io loop: pumps outbound commands into the sink and inbound
/// frames into the event channel, then runs teardown
async fn io_task(
    ctx: Ctx,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outgoing: mpsc::Receiver<Outbound>,
) {
    let (mut sink, mut stream) = ws.split();
    let mut close_reply: Option<oneshot::Sender<Result<()>>> = None;
    let mut close_result: Result<()> = Ok(());

    loop {
        tokio::select! {
            command = outgoing.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        error!(error = %e, "failed to send frame");
                        close_result = Err(PortalError::ConnectionClosed);
                        break;
                    }
                }
                Some(Outbound::Close(reply)) => {
                    close_reply = Some(reply);
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: Utf8Bytes::from_static(defs::CLOSE_REASON),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        error!(error = %e, "failed to send close frame");
                        close_result = Err(PortalError::ConnectionClosed);
                        break;
                    }
                    // Keep reading until the host acknowledges the close
                }
                None => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = ctx.events.send(ConnectionEvent::Message(text.to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.as_ref().map(|f| u16::from(f.code)).unwrap_or(1005);
                    let reason = frame
                        .as_ref()
                        .map(|f| f.reason.to_string())
                        .unwrap_or_default();
                    if close_reply.is_some() {
                        if code != 1000 {
                            close_result = Err(PortalError::UncleanClose { code, reason });
                        }
                    } else {
                        warn!(code, reason = %reason, "server closed connection");
                    }
                    break;
                }
                Some(Ok(Message::Binary(_))) => warn!("ignoring binary message"),
                Some(Ok(_)) => {} // ping/pong, handled by the protocol layer
                Some(Err(e)) => {
                    error!(error = %e, "connection error");
                    close_result = Err(PortalError::connection(e.to_string()));
                    break;
                }
                None => {
                    debug!("connection stream ended");
                    break;
                }
            },
        }
    }

    let intentional = {
        let mut shared = ctx.shared.lock().unwrap();
        shared.state = ConnectionState::Closed;
        shared.outgoing = None;
        shared.io_task = None;
        shared.intentional
    };
    let _ = ctx.events.send(ConnectionEvent::Closed);

    if let Some(reply) = close_reply {
        let _ = reply.send(close_result);
    } else if !intentional {
        schedule_reconnect(&ctx);
    }
}

/// Schedule a single reconnection attempt after the configured delay
///
/// At most one attempt is ever outstanding; scheduling replaces any timer
/// already running. The attempt re-checks the state after the delay so a
/// close() or explicit open() in the meantime wins.
fn schedule_reconnect(ctx: &Ctx) {
    let mut shared = ctx.shared.lock().unwrap();
    if shared.intentional {
        return;
    }
    if let Some(handle) = shared.reconnect.take() {
        handle.abort();
    }
    let delay = ctx.config.reconnect_delay();
    info!(delay_ms = delay.as_millis() as u64, "scheduling reconnection");
    let ctx = ctx.clone();
    shared.reconnect = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        {
            let mut shared = ctx.shared.lock().unwrap();
            if shared.intentional || shared.state != ConnectionState::Closed {
                debug!(state = %shared.state, "skipping reconnection");
                return;
            }
            shared.state = ConnectionState::Connecting;
        }
        match start_connection(&ctx).await {
            Ok(()) => info!("reconnected"),
            Err(e) => {
                warn!(error = %e, "reconnection attempt failed");
                ctx.shared.lock().unwrap().state = ConnectionState::Closed;
                schedule_reconnect(&ctx);
            }
        }
    }));
}
