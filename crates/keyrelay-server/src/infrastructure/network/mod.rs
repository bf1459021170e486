//! ButtonServer: the network listener and ingestion pipeline.
//!
//! This module is responsible for:
//!
//! 1. Binding the listening endpoint (UDP socket or TCP listener) on the
//!    configured port — 12345 on all interfaces by default.
//! 2. Receiving inbound payloads continuously: one shared recv loop for the
//!    datagram transport, or an accept loop plus one reader task per
//!    connection for the connection-oriented transport.
//! 3. Decoding and classifying each payload (heartbeat vs. button) and
//!    updating the client registry and rate meter.
//! 4. Publishing [`ServerEvent`]s to the application layer: every decoded
//!    label, active-count changes, and the once-per-second message rate.
//! 5. Driving the two periodic timers: the 1-second rate tick and — for the
//!    datagram transport only — the 5-second stale-client sweep.
//! 6. Tearing everything down deterministically on [`ButtonServer::stop`].
//!
//! # One listener, two transports
//!
//! UDP and TCP reception differ only at the socket layer; classification,
//! registry bookkeeping, and event publication are identical.  The server is
//! therefore one component polymorphic over [`TransportKind`] rather than
//! two parallel implementations.
//!
//! The transports do differ in how "active clients" is defined:
//!
//! - **UDP** has no disconnect signal, so activity is timeout-based: the
//!   registry tracks each sender's last message and the sweep timer evicts
//!   peers silent for longer than the client timeout.
//! - **TCP** has explicit teardown, so the connected count is simply the
//!   number of live reader tasks; no sweep runs.
//!
//! # Never block the receive path
//!
//! The receive loops suspend only on socket I/O.  Key injection happens on
//! its own serialized queue (see `application::inject_key`), and event
//! publication uses `try_send` — a stalled consumer drops events rather
//! than ever delaying message intake.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use keyrelay_core::{classify, ButtonEvent, ClientId, ClientRegistry, InboundMessage, RateMeter, CLIENT_TIMEOUT, HEARTBEAT, SWEEP_INTERVAL};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Reference deployment port.
pub const DEFAULT_PORT: u16 = 12345;

/// Largest payload accepted in one receive: one datagram, or one TCP read.
pub const MAX_PAYLOAD: usize = 1024;

/// Depth of the event channel to the application layer.
const EVENT_CHANNEL_DEPTH: usize = 128;

/// Error type for the network listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening endpoint could not be bound (port in use, permission
    /// denied at the socket level).  Fatal to `start()`.
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Which transport the listener speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Connectionless: one message per datagram, sender address as identity.
    Udp,
    /// Connection-oriented: long-lived peers, explicit teardown.
    Tcp,
}

/// Lifecycle state of the listener.
///
/// ```text
/// Stopped → Starting → Running → Stopping → Stopped
///               │          │
///               └──────────┴──► Failed ──► (next start/stop) ──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
    /// A transport error during start or while running; cleared by the next
    /// `start()` or `stop()`.
    Failed,
}

/// Configuration for the listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind.  `0.0.0.0` binds all interfaces.
    pub bind_address: IpAddr,
    /// Port to bind.  Tests use 0 to get an OS-assigned port.
    pub port: u16,
    pub transport: TransportKind,
    /// Silence threshold before a datagram peer is evicted.
    pub client_timeout: Duration,
    /// Period of the stale-client sweep (datagram transport only).
    pub sweep_interval: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            transport: TransportKind::Udp,
            client_timeout: CLIENT_TIMEOUT,
            sweep_interval: SWEEP_INTERVAL,
        }
    }
}

/// Events emitted by the listener to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The endpoint is bound and receiving.
    Started { local_addr: SocketAddr },
    /// Binding failed; `error` is the human-readable reason.
    StartFailed { error: String },
    /// The listener has fully shut down.
    Stopped,
    /// A decoded label was received.  Published for every decoded message
    /// including the heartbeat sentinel; the consumer filters the sentinel
    /// before triggering injection.
    ButtonReceived(ButtonEvent),
    /// The active/connected client count changed.
    ClientCountChanged { count: usize },
    /// The 1-second rate window closed.
    RateUpdated { messages_per_second: u32 },
}

/// State shared between the receive loops and the timers.
struct Shared {
    transport: TransportKind,
    registry: Mutex<ClientRegistry>,
    rate: RateMeter,
    event_tx: mpsc::Sender<ServerEvent>,
}

impl Shared {
    /// Publishes an event without ever blocking the calling loop.
    fn publish(&self, event: ServerEvent) {
        if self.event_tx.try_send(event).is_err() {
            debug!("event channel full or closed; dropping event");
        }
    }

    /// Processes one raw payload from `source`.
    ///
    /// Side effects per the ingestion contract: rate record for
    /// non-heartbeats only, and a `ButtonReceived` publication for every
    /// decoded label (heartbeats included).  On the datagram transport every
    /// decoded message also touches the registry; the connection-oriented
    /// transport tracks liveness through its live peer set instead, so its
    /// messages never reach the registry.  Non-UTF-8 payloads are dropped
    /// silently.
    ///
    /// Returns the new active count when `source` was not previously
    /// tracked, which the datagram path surfaces as a count change.
    fn ingest(&self, payload: &[u8], source: ClientId) -> Option<usize> {
        let Some(message) = classify(payload) else {
            debug!("dropping undecodable payload from {source}");
            return None;
        };

        let received_at = Instant::now();
        let (is_new, count) = match self.transport {
            TransportKind::Udp => {
                let mut registry = self.registry.lock().unwrap();
                let is_new = registry.touch(source, received_at);
                (is_new, registry.active_count())
            }
            TransportKind::Tcp => (false, 0),
        };

        let label = match message {
            InboundMessage::Heartbeat => HEARTBEAT.to_string(),
            InboundMessage::Button(label) => {
                self.rate.record();
                label
            }
        };
        self.publish(ServerEvent::ButtonReceived(ButtonEvent {
            label,
            source,
            received_at,
        }));

        is_new.then_some(count)
    }
}

/// The network listener.
///
/// `start()` and `stop()` take `&self`; all mutable state lives behind
/// locks so the server can be shared (`Arc`) between the control surface
/// and the event consumer.
pub struct ButtonServer {
    config: ListenerConfig,
    state: Mutex<LifecycleState>,
    shared: Arc<Shared>,
    /// Listener-scoped tasks: recv/accept loop, rate tick, sweep.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// One reader task per live TCP connection, keyed by peer address.
    peer_tasks: Arc<Mutex<HashMap<ClientId, JoinHandle<()>>>>,
}

impl ButtonServer {
    /// Creates a stopped server and returns it with the event receiver.
    pub fn new(config: ListenerConfig) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let transport = config.transport;
        let server = Self {
            config,
            state: Mutex::new(LifecycleState::Stopped),
            shared: Arc::new(Shared {
                transport,
                registry: Mutex::new(ClientRegistry::new()),
                rate: RateMeter::new(),
                event_tx: tx,
            }),
            tasks: Mutex::new(Vec::new()),
            peer_tasks: Arc::new(Mutex::new(HashMap::new())),
        };
        (server, rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: LifecycleState) {
        *self.state.lock().unwrap() = state;
    }

    /// Active (UDP) or connected (TCP) client count, for the status pull
    /// surface.
    pub fn active_count(&self) -> usize {
        match self.config.transport {
            TransportKind::Udp => self.shared.registry.lock().unwrap().active_count(),
            TransportKind::Tcp => self.peer_tasks.lock().unwrap().len(),
        }
    }

    /// The value of the last closed 1-second rate window.
    pub fn messages_per_second(&self) -> u32 {
        self.shared.rate.current()
    }

    /// Binds the endpoint and starts receiving.
    ///
    /// Returns the bound local address.  Already-running instances are
    /// stopped first.  On bind failure the state transitions to `Failed`,
    /// a [`ServerEvent::StartFailed`] is published, and the error is
    /// returned to the caller; nothing is retried.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        if matches!(
            self.state(),
            LifecycleState::Running | LifecycleState::Starting
        ) {
            self.stop().await;
        }
        self.set_state(LifecycleState::Starting);

        let addr = SocketAddr::new(self.config.bind_address, self.config.port);
        let local_addr = match self.config.transport {
            TransportKind::Udp => self.start_udp(addr).await,
            TransportKind::Tcp => self.start_tcp(addr).await,
        };

        let local_addr = match local_addr {
            Ok(local_addr) => local_addr,
            Err(e) => {
                error!("start failed: {e}");
                self.set_state(LifecycleState::Failed);
                self.shared.publish(ServerEvent::StartFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        // The rate tick runs for both transports.
        let shared = Arc::clone(&self.shared);
        self.tasks
            .lock()
            .unwrap()
            .push(tokio::spawn(rate_tick_loop(shared)));

        self.set_state(LifecycleState::Running);
        info!(
            "listening on {local_addr} ({:?})",
            self.config.transport
        );
        self.shared.publish(ServerEvent::Started { local_addr });
        Ok(local_addr)
    }

    async fn start_udp(&self, addr: SocketAddr) -> Result<SocketAddr, ServerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| ServerError::BindFailed { addr, source })?;

        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(tokio::spawn(udp_recv_loop(
            Arc::new(socket),
            Arc::clone(&self.shared),
        )));
        tasks.push(tokio::spawn(sweep_loop(
            Arc::clone(&self.shared),
            self.config.client_timeout,
            self.config.sweep_interval,
        )));
        Ok(local_addr)
    }

    async fn start_tcp(&self, addr: SocketAddr) -> Result<SocketAddr, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::BindFailed { addr, source })?;

        self.tasks.lock().unwrap().push(tokio::spawn(tcp_accept_loop(
            listener,
            Arc::clone(&self.shared),
            Arc::clone(&self.peer_tasks),
        )));
        Ok(local_addr)
    }

    /// Stops the listener: cancels the receive loops, the timers, and every
    /// per-peer connection task, clears the client registry, and resets the
    /// rate meter.
    ///
    /// Waits for the cancelled tasks to actually finish before returning.
    /// The receive task owns the bound socket, so the endpoint is released
    /// only once that task is done; without the wait, a restart on the same
    /// port races the old socket's drop and fails with `AddrInUse`.
    /// A no-op when already stopped.
    pub async fn stop(&self) {
        if self.state() == LifecycleState::Stopped {
            return;
        }
        self.set_state(LifecycleState::Stopping);

        for task in self.abort_tasks() {
            // Aborted tasks resolve to a cancellation error; all we need is
            // for them to be gone.
            let _ = task.await;
        }
        self.shared.registry.lock().unwrap().reset();
        self.shared.rate.reset();
        self.shared
            .publish(ServerEvent::ClientCountChanged { count: 0 });

        self.set_state(LifecycleState::Stopped);
        info!("listener stopped");
        self.shared.publish(ServerEvent::Stopped);
    }

    fn abort_tasks(&self) -> Vec<JoinHandle<()>> {
        let mut handles: Vec<JoinHandle<()>> = self.tasks.lock().unwrap().drain(..).collect();
        handles.extend(self.peer_tasks.lock().unwrap().drain().map(|(_, task)| task));
        for task in &handles {
            task.abort();
        }
        handles
    }
}

impl Drop for ButtonServer {
    /// Tears the loops and timers down with the owning object, regardless
    /// of running state.  Drop cannot wait for the tasks, so abort is the
    /// best it can do; deterministic release goes through [`Self::stop`].
    fn drop(&mut self) {
        let _ = self.abort_tasks();
    }
}

// ── Receive loops ─────────────────────────────────────────────────────────────

/// Continuous recv loop for the shared datagram socket.
///
/// Each datagram is one message; its sender address is the peer identity.
/// Receive errors on a shared socket affect a single datagram, so they are
/// logged and the loop resubmits the next receive immediately.
async fn udp_recv_loop(socket: Arc<UdpSocket>, shared: Arc<Shared>) {
    let mut buf = [0u8; MAX_PAYLOAD];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, source)) => {
                if let Some(count) = shared.ingest(&buf[..len], source) {
                    shared.publish(ServerEvent::ClientCountChanged { count });
                }
            }
            Err(e) => {
                warn!("udp recv error (ignored): {e}");
            }
        }
    }
}

/// Accept loop for the connection-oriented transport.
///
/// Each accepted connection gets its own reader task, tracked in `peers` so
/// `stop()` can cancel every one and so the connected count reflects live
/// connections rather than polled liveness.
async fn tcp_accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    peers: Arc<Mutex<HashMap<ClientId, JoinHandle<()>>>>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                info!("peer connected: {peer_addr}");
                let reader_shared = Arc::clone(&shared);
                let reader_peers = Arc::clone(&peers);
                // The peer must be registered before its reader can remove
                // itself: a connection that closes instantly would otherwise
                // run its removal before the insert and leave a dead entry
                // in the map.  Holding the map lock across spawn + insert
                // makes the reader's removal wait for registration.
                let count = {
                    let mut map = peers.lock().unwrap();
                    let handle = tokio::spawn(async move {
                        tcp_read_loop(stream, peer_addr, Arc::clone(&reader_shared)).await;
                        // Reader finished (EOF or error): this peer alone
                        // leaves the connected set.
                        let count = {
                            let mut map = reader_peers.lock().unwrap();
                            map.remove(&peer_addr);
                            map.len()
                        };
                        reader_shared.publish(ServerEvent::ClientCountChanged { count });
                    });
                    map.insert(peer_addr, handle);
                    map.len()
                };
                shared.publish(ServerEvent::ClientCountChanged { count });
            }
            Err(e) => {
                // Transient accept error (e.g. fd exhaustion); keep accepting.
                error!("accept error: {e}");
            }
        }
    }
}

/// Per-connection read loop.
///
/// Payload boundaries are whatever each read returns, up to
/// [`MAX_PAYLOAD`] bytes; a fatal read error or EOF ends only this peer's
/// loop.
async fn tcp_read_loop(mut stream: TcpStream, peer: ClientId, shared: Arc<Shared>) {
    let mut buf = [0u8; MAX_PAYLOAD];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => {
                info!("peer disconnected: {peer}");
                break;
            }
            Ok(len) => {
                // Connected count comes from the peer map, not the registry,
                // so the is-new result is not surfaced here.
                let _ = shared.ingest(&buf[..len], peer);
            }
            Err(e) => {
                warn!("read error from {peer}: {e}; closing connection");
                break;
            }
        }
    }
}

// ── Timers ────────────────────────────────────────────────────────────────────

/// Publishes the closed 1-second rate window, every second.
async fn rate_tick_loop(shared: Arc<Shared>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await; // the first tick fires immediately; skip it
    loop {
        ticker.tick().await;
        let messages_per_second = shared.rate.tick();
        shared.publish(ServerEvent::RateUpdated {
            messages_per_second,
        });
    }
}

/// Evicts stale datagram peers on a fixed period, independent of traffic.
async fn sweep_loop(shared: Arc<Shared>, timeout: Duration, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let (removed, count) = {
            let mut registry = shared.registry.lock().unwrap();
            let removed = registry.sweep(Instant::now(), timeout);
            (removed, registry.active_count())
        };
        if removed > 0 {
            shared.publish(ServerEvent::ClientCountChanged { count });
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
