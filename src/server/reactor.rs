//! Connection Reactor
//!
//! A single thread owns the multiplexer, the listener, every peer connection
//! and the read buffer. Nothing here is shared, so nothing here is locked.
//!
//! ## Run Loop
//!
//! ```text
//! INITIALIZING ── bind() ──> RUNNING ── is_running() == false ──> SHUTTING_DOWN ──> STOPPED
//!                              │
//!                              ▼
//!                 ┌──────────────────────────┐
//!                 │ poll (the only blocking  │
//!                 │ point of the thread)     │
//!                 └────────────┬─────────────┘
//!                              │ ready set
//!                              ▼
//!          listener ──> accept one peer, register READABLE
//!          peer     ──> clear buffer, read once
//!                         0 bytes  -> close + deregister
//!                         n bytes  -> handler.handle(peer, &buf[..n])
//! ```
//!
//! ## Level-Triggered Contract on an Edge-Triggered Poller
//!
//! mio only reports a channel again once new readiness arrives. The loop
//! accepts one peer and performs one read per channel per cycle, so channels
//! that may still have work are carried into the next cycle:
//!
//! - the listener, after every successful accept
//! - a peer whose read filled the whole buffer
//! - a peer whose event also reported the write half closed
//!
//! While anything is carried the next poll does not block.
//!
//! An accept that fails for any other reason (e.g. out of file descriptors)
//! is retried after a short backoff rather than immediately, so the
//! backlog is not left waiting for the next incoming connection.
//!
//! ## Shutdown
//!
//! The run state is checked once per cycle, so a stop request waits for the
//! current poll to return. Polls are bounded by `poll_timeout`, and a
//! [`Wakeup`] interrupts a poll immediately. With no timeout and no wakeup a
//! stop request is honored only at the next readiness event.

use crate::config::ServerSettings;
use crate::connection::{ConnectionStats, PeerConnection};
use crate::context::ApplicationContext;
use crate::handler::RoutingHandler;
use crate::server::buffer::ReadBuffer;
use crate::server::ready::{Readiness, ReadySet};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_PEER_TOKEN: usize = 2;

/// Wait before retrying an accept that failed for lack of resources.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Errors that stop the reactor.
///
/// Per-connection failures never show up here: they close the affected
/// connection and the loop carries on.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    /// The listening endpoint could not be bound. The loop never started.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A setting would leave the reactor unable to serve. Nothing was opened.
    #[error("invalid setting {setting}: must be greater than zero")]
    InvalidSettings { setting: &'static str },

    /// The multiplexer could not be opened or the listener registered.
    #[error("failed to set up the multiplexer: {0}")]
    Setup(#[source] io::Error),

    /// Polling failed for a reason other than an interrupt.
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),

    /// A channel could not be released during teardown. Remaining teardown
    /// steps were skipped.
    #[error("failed to close {channel} during teardown: {source}")]
    Teardown {
        channel: String,
        #[source]
        source: io::Error,
    },
}

/// Interrupts a blocked poll so a stop request is seen right away.
#[derive(Debug, Clone)]
pub struct Wakeup {
    waker: Arc<Waker>,
}

impl Wakeup {
    pub fn wake(&self) -> io::Result<()> {
        self.waker.wake()
    }
}

/// A configured, not yet bound reactor.
pub struct Reactor<C, H> {
    settings: ServerSettings,
    context: C,
    handler: H,
    stats: Arc<ConnectionStats>,
}

impl<C, H> Reactor<C, H>
where
    C: ApplicationContext,
    H: RoutingHandler,
{
    /// Creates a reactor. No socket is opened until [`Reactor::bind`].
    ///
    /// # Arguments
    ///
    /// * `settings` - Where to listen and how to size the loop
    /// * `context` - Queried once per poll cycle; `false` starts shutdown
    /// * `handler` - Receives every non-empty read
    pub fn new(settings: ServerSettings, context: C, handler: H) -> Self {
        Self {
            settings,
            context,
            handler,
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    /// Uses externally owned statistics.
    pub fn with_stats(mut self, stats: Arc<ConnectionStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Opens the multiplexer, binds the listener and registers it for
    /// incoming connections.
    pub fn bind(self) -> Result<BoundReactor<C, H>, ReactorError> {
        validate(&self.settings)?;
        let addr = resolve(&self.settings)?;

        let poll = Poll::new().map_err(ReactorError::Setup)?;
        let waker = Waker::new(poll.registry(), WAKER).map_err(ReactorError::Setup)?;

        // mio listeners are non-blocking from the start
        let mut listener = TcpListener::bind(addr).map_err(|source| ReactorError::Bind {
            addr: self.settings.bind_address(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(ReactorError::Setup)?;

        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(ReactorError::Setup)?;
        self.stats.registered();

        info!(addr = %local_addr, "Listening for connections");

        Ok(BoundReactor {
            events: Events::with_capacity(self.settings.events_capacity),
            listener: Some(listener),
            local_addr,
            waker: Arc::new(waker),
            connections: HashMap::new(),
            next_token: FIRST_PEER_TOKEN,
            buffer: ReadBuffer::with_capacity(self.settings.read_buffer_capacity),
            carried: ReadySet::new(),
            accept_retry: false,
            poll_timeout: self.settings.poll_timeout,
            context: self.context,
            handler: self.handler,
            stats: self.stats,
            poll,
        })
    }

    /// Binds, serves until the context stops, then tears everything down.
    pub fn start(self) -> Result<(), ReactorError> {
        self.bind()?.run()
    }
}

/// A zero-sized buffer reads as end-of-stream and a zero-sized event list
/// cannot be polled.
fn validate(settings: &ServerSettings) -> Result<(), ReactorError> {
    if settings.read_buffer_capacity == 0 {
        return Err(ReactorError::InvalidSettings {
            setting: "read_buffer_capacity",
        });
    }
    if settings.events_capacity == 0 {
        return Err(ReactorError::InvalidSettings {
            setting: "events_capacity",
        });
    }
    Ok(())
}

fn resolve(settings: &ServerSettings) -> Result<SocketAddr, ReactorError> {
    let bind_error = |source: io::Error| ReactorError::Bind {
        addr: settings.bind_address(),
        source,
    };

    settings
        .bind_address()
        .to_socket_addrs()
        .map_err(bind_error)?
        .next()
        .ok_or_else(|| {
            bind_error(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "address resolved to nothing",
            ))
        })
}

/// A reactor whose listener is bound and registered.
pub struct BoundReactor<C, H> {
    events: Events,
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    waker: Arc<Waker>,
    connections: HashMap<Token, PeerConnection>,
    next_token: usize,
    buffer: ReadBuffer,
    /// Channels that may still have work; serviced in the next cycle
    carried: ReadySet,
    /// Listener is retried once the backoff poll returns
    accept_retry: bool,
    poll_timeout: Option<Duration>,
    context: C,
    handler: H,
    stats: Arc<ConnectionStats>,
    // Declared last so it is dropped after every channel
    poll: Poll,
}

impl<C, H> BoundReactor<C, H>
where
    C: ApplicationContext,
    H: RoutingHandler,
{
    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn wakeup(&self) -> Wakeup {
        Wakeup {
            waker: Arc::clone(&self.waker),
        }
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the accept/read loop until the context stops, then closes every
    /// registered channel exactly once. The multiplexer is closed last.
    pub fn run(mut self) -> Result<(), ReactorError> {
        let outcome = self.event_loop();
        let teardown = self.teardown();

        match (outcome, teardown) {
            (Err(e), Err(teardown_err)) => {
                error!(error = %teardown_err, "Teardown failed after loop error");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), teardown) => teardown,
        }
    }

    fn event_loop(&mut self) -> Result<(), ReactorError> {
        let mut ready = ReadySet::new();

        while self.context.is_running() {
            let timeout = self.next_timeout();
            if let Err(e) = self.poll.poll(&mut self.events, timeout) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ReactorError::Poll(e));
            }

            ready.absorb(&mut self.carried);
            if std::mem::take(&mut self.accept_retry) {
                ready.push(LISTENER, false);
            }
            for event in self.events.iter() {
                if event.token() == WAKER {
                    trace!("Reactor woken");
                    continue;
                }
                ready.push_event(event);
            }

            while let Some(entry) = ready.pop() {
                self.service(entry);
            }
        }

        Ok(())
    }

    /// Zero while work is carried, at most `ACCEPT_BACKOFF` while an accept
    /// retry is pending, otherwise the configured timeout.
    fn next_timeout(&self) -> Option<Duration> {
        if !self.carried.is_empty() {
            return Some(Duration::ZERO);
        }
        if self.accept_retry {
            return Some(
                self.poll_timeout
                    .map_or(ACCEPT_BACKOFF, |timeout| timeout.min(ACCEPT_BACKOFF)),
            );
        }
        self.poll_timeout
    }

    fn service(&mut self, entry: Readiness) {
        match entry.token {
            LISTENER => self.accept_one(),
            token => self.read_from(token, entry.read_closed),
        }
    }

    /// Accepts a single pending connection. Any further backlog is picked up
    /// in the next cycle.
    fn accept_one(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        match listener.accept() {
            Ok((stream, peer_addr)) => {
                self.carried.push(LISTENER, false);
                self.register_peer(stream, peer_addr);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                ) =>
            {
                self.carried.push(LISTENER, false);
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                self.accept_retry = true;
            }
        }
    }

    fn register_peer(&mut self, stream: TcpStream, peer_addr: SocketAddr) {
        let token = Token(self.next_token);
        self.next_token += 1;

        let mut connection = PeerConnection::new(stream, token, peer_addr);
        if let Err(e) =
            self.poll
                .registry()
                .register(connection.stream_mut(), token, Interest::READABLE)
        {
            warn!(client = %peer_addr, error = %e, "Failed to register connection");
            return;
        }

        self.stats.registered();
        self.stats.connection_opened();
        info!(client = %peer_addr, id = token.0, "New connection from the client has been accepted");

        self.connections.insert(token, connection);
    }

    /// Performs one read for `token` and hands the bytes to the handler.
    fn read_from(&mut self, token: Token, read_closed: bool) {
        let Some(connection) = self.connections.get_mut(&token) else {
            trace!(id = token.0, "Ignoring readiness for a closed connection");
            return;
        };

        match self.buffer.fill_from(connection.stream_mut()) {
            Ok(0) => self.close_peer(token),
            Ok(n) => {
                self.stats.read_dispatched(n);
                trace!(client = %connection.peer_addr(), bytes = n, "Read data");

                self.handler.handle(connection, self.buffer.filled());

                if self.buffer.is_full() || read_closed {
                    self.carried.push(token, read_closed);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                trace!(id = token.0, "Spurious read readiness");
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                self.carried.push(token, read_closed);
            }
            Err(e) => {
                if e.kind() == io::ErrorKind::ConnectionReset {
                    debug!(client = %connection.peer_addr(), "Connection reset by client");
                } else {
                    warn!(client = %connection.peer_addr(), error = %e, "Connection error");
                }
                self.close_peer(token);
            }
        }
    }

    fn close_peer(&mut self, token: Token) {
        let Some(mut connection) = self.connections.remove(&token) else {
            return;
        };

        // Closing the socket drops the registration even if this fails
        if let Err(e) = self.poll.registry().deregister(connection.stream_mut()) {
            debug!(client = %connection.peer_addr(), error = %e, "Failed to deregister connection");
        }
        self.stats.deregistered();
        self.stats.connection_closed();

        debug!(client = %connection.peer_addr(), id = token.0, "Client disconnected");
    }

    /// Deregisters and closes the listener, then every peer. Stops at the
    /// first failure; whatever is left is closed when the reactor drops.
    fn teardown(&mut self) -> Result<(), ReactorError> {
        debug!(
            connections = self.connections.len(),
            "Shutting down reactor"
        );

        if let Some(mut listener) = self.listener.take() {
            self.poll
                .registry()
                .deregister(&mut listener)
                .map_err(|source| ReactorError::Teardown {
                    channel: format!("listener {}", self.local_addr),
                    source,
                })?;
            self.stats.deregistered();
            drop(listener);
            debug!(addr = %self.local_addr, "Closed listener");
        }

        for (token, mut connection) in self.connections.drain() {
            self.poll
                .registry()
                .deregister(connection.stream_mut())
                .map_err(|source| ReactorError::Teardown {
                    channel: format!("connection {}", connection.peer_addr()),
                    source,
                })?;
            self.stats.deregistered();
            self.stats.connection_closed();
            debug!(client = %connection.peer_addr(), id = token.0, "Closed connection");
        }

        info!("Reactor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunState;
    use std::io::{Read, Write};
    use std::net::TcpStream as ClientStream;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Instant;

    type Deliveries = Arc<Mutex<Vec<(usize, Vec<u8>)>>>;

    struct TestServer {
        addr: SocketAddr,
        state: RunState,
        wakeup: Wakeup,
        stats: Arc<ConnectionStats>,
        deliveries: Deliveries,
        handle: thread::JoinHandle<Result<(), ReactorError>>,
    }

    impl TestServer {
        fn start(settings: ServerSettings) -> Self {
            let state = RunState::new();
            let deliveries: Deliveries = Arc::default();
            let sink = Arc::clone(&deliveries);
            let handler = move |connection: &mut PeerConnection, data: &[u8]| {
                sink.lock().unwrap().push((connection.id(), data.to_vec()));
            };

            let reactor = Reactor::new(settings, state.clone(), handler)
                .bind()
                .unwrap();
            let addr = reactor.local_addr();
            let wakeup = reactor.wakeup();
            let stats = reactor.stats();
            let handle = thread::spawn(move || reactor.run());

            Self {
                addr,
                state,
                wakeup,
                stats,
                deliveries,
                handle,
            }
        }

        fn connect(&self) -> ClientStream {
            let client = ClientStream::connect(self.addr).unwrap();
            client
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            client
        }

        fn deliveries(&self) -> Vec<(usize, Vec<u8>)> {
            self.deliveries.lock().unwrap().clone()
        }

        fn stop(self) -> (Arc<ConnectionStats>, Result<(), ReactorError>) {
            self.state.stop();
            self.wakeup.wake().unwrap();
            let result = self.handle.join().unwrap();
            (self.stats, result)
        }
    }

    fn settings() -> ServerSettings {
        ServerSettings::ephemeral()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        condition()
    }

    #[test]
    fn test_ping_is_delivered_once() {
        let server = TestServer::start(settings());
        let mut client = server.connect();

        client.write_all(b"PING").unwrap();

        assert!(wait_until(|| !server.deliveries().is_empty()));
        thread::sleep(Duration::from_millis(50));

        let deliveries = server.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].1, b"PING");
        assert_eq!(server.stats.reads_dispatched.load(Ordering::Relaxed), 1);
        assert_eq!(server.stats.bytes_read.load(Ordering::Relaxed), 4);

        let (_, result) = server.stop();
        assert!(result.is_ok());
    }

    #[test]
    fn test_disconnect_closes_connection() {
        let server = TestServer::start(settings());
        let mut client = server.connect();

        client.write_all(b"PING").unwrap();
        assert!(wait_until(|| server.deliveries().len() == 1));

        drop(client);
        assert!(wait_until(|| server.stats.active() == 0));
        assert_eq!(
            server.stats.connections_closed.load(Ordering::Relaxed),
            1
        );
        // Only the listener is left
        assert_eq!(server.stats.live_registrations(), 1);
        assert_eq!(server.deliveries().len(), 1);

        let (_, result) = server.stop();
        assert!(result.is_ok());
    }

    #[test]
    fn test_write_then_close_delivers_data_and_closes() {
        let server = TestServer::start(settings());
        let mut client = server.connect();

        client.write_all(b"PING").unwrap();
        drop(client);

        assert!(wait_until(|| {
            server.stats.connections_closed.load(Ordering::Relaxed) == 1
        }));

        let deliveries = server.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].1, b"PING");

        let (_, result) = server.stop();
        assert!(result.is_ok());
    }

    #[test]
    fn test_clients_are_isolated() {
        let server = TestServer::start(settings());
        let mut alpha = server.connect();
        let mut beta = server.connect();

        alpha.write_all(b"alpha").unwrap();
        beta.write_all(b"beta").unwrap();
        assert!(wait_until(|| server.deliveries().len() == 2));

        alpha.write_all(b"again").unwrap();
        assert!(wait_until(|| server.deliveries().len() == 3));

        let deliveries = server.deliveries();
        let id_of = |data: &[u8]| {
            deliveries
                .iter()
                .find(|(_, d)| d == data)
                .map(|(id, _)| *id)
                .unwrap()
        };

        assert_ne!(id_of(b"alpha"), id_of(b"beta"));
        assert_eq!(id_of(b"alpha"), id_of(b"again"));

        let (_, result) = server.stop();
        assert!(result.is_ok());
    }

    #[test]
    fn test_each_connection_has_one_registration() {
        let server = TestServer::start(settings());
        let clients: Vec<_> = (0..5).map(|_| server.connect()).collect();

        assert!(wait_until(|| server.stats.active() == 5));
        assert_eq!(server.stats.live_registrations(), 6);
        assert_eq!(
            server.stats.connections_accepted.load(Ordering::Relaxed),
            5
        );

        drop(clients);
        let (_, result) = server.stop();
        assert!(result.is_ok());
    }

    #[test]
    fn test_reads_larger_than_buffer_span_cycles() {
        let server = TestServer::start(ServerSettings {
            read_buffer_capacity: 4,
            ..settings()
        });
        let mut client = server.connect();

        client.write_all(b"abcdefghij").unwrap();

        let joined = || -> Vec<u8> {
            server
                .deliveries()
                .into_iter()
                .flat_map(|(_, data)| data)
                .collect()
        };
        assert!(wait_until(|| joined() == b"abcdefghij"));

        let deliveries = server.deliveries();
        assert!(deliveries.len() >= 3);
        assert!(deliveries.iter().all(|(_, data)| data.len() <= 4));

        let (_, result) = server.stop();
        assert!(result.is_ok());
    }

    #[test]
    fn test_shutdown_closes_every_channel() {
        let server = TestServer::start(settings());
        let mut clients: Vec<_> = (0..3).map(|_| server.connect()).collect();
        assert!(wait_until(|| server.stats.active() == 3));

        let addr = server.addr;
        let (stats, result) = server.stop();

        assert!(result.is_ok());
        assert_eq!(stats.live_registrations(), 0);
        assert_eq!(stats.active(), 0);
        assert_eq!(stats.connections_closed.load(Ordering::Relaxed), 3);

        // Peers see end-of-stream, the listener is gone
        for client in &mut clients {
            let mut buf = [0u8; 8];
            assert_eq!(client.read(&mut buf).unwrap_or(0), 0);
        }
        assert!(ClientStream::connect(addr).is_err());
    }

    #[test]
    fn test_wakeup_stops_unbounded_poll() {
        let server = TestServer::start(ServerSettings {
            poll_timeout: None,
            ..settings()
        });

        let (stats, result) = server.stop();
        assert!(result.is_ok());
        assert_eq!(stats.live_registrations(), 0);
    }

    #[test]
    fn test_bounded_poll_notices_stop_without_traffic() {
        let server = TestServer::start(ServerSettings {
            poll_timeout: Some(Duration::from_millis(20)),
            ..settings()
        });

        server.state.stop();
        assert!(wait_until(|| server.handle.is_finished()));
        assert!(server.handle.join().unwrap().is_ok());
        assert_eq!(server.stats.live_registrations(), 0);
    }

    /// Without a poll timeout or a wakeup, a stop request is only seen once
    /// some channel becomes ready.
    #[test]
    fn test_unbounded_poll_waits_for_readiness_before_stopping() {
        let server = TestServer::start(ServerSettings {
            poll_timeout: None,
            ..settings()
        });

        server.state.stop();
        thread::sleep(Duration::from_millis(200));
        assert!(!server.handle.is_finished());

        let _client = ClientStream::connect(server.addr).unwrap();
        assert!(wait_until(|| server.handle.is_finished()));
        assert!(server.handle.join().unwrap().is_ok());
        assert_eq!(server.stats.live_registrations(), 0);
    }

    #[test]
    fn test_handler_can_reply() {
        let state = RunState::new();
        let echo = |connection: &mut PeerConnection, data: &[u8]| {
            connection.write_all(data).unwrap();
        };
        let reactor = Reactor::new(settings(), state.clone(), echo)
            .bind()
            .unwrap();
        let addr = reactor.local_addr();
        let wakeup = reactor.wakeup();
        let handle = thread::spawn(move || reactor.run());

        let mut client = ClientStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        client.write_all(b"hello").unwrap();

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        state.stop();
        wakeup.wake().unwrap();
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_stopped_context_tears_down_immediately() {
        let handler = |_: &mut PeerConnection, _: &[u8]| {};
        let reactor = Reactor::new(settings(), || false, handler);
        let stats = reactor.stats();

        assert!(reactor.start().is_ok());
        assert_eq!(stats.live_registrations(), 0);
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let handler = |_: &mut PeerConnection, _: &[u8]| {};
        let reactor = Reactor::new(
            ServerSettings {
                port,
                ..settings()
            },
            RunState::new(),
            handler,
        );
        let stats = reactor.stats();

        let err = reactor.start().unwrap_err();
        assert!(matches!(err, ReactorError::Bind { .. }));
        assert!(err.to_string().contains(&port.to_string()));
        assert_eq!(stats.live_registrations(), 0);
    }

    type Discard = fn(&mut PeerConnection, &[u8]);

    fn bound() -> BoundReactor<RunState, Discard> {
        let handler: Discard = |_, _| {};
        Reactor::new(settings(), RunState::new(), handler)
            .bind()
            .unwrap()
    }

    /// Binds a reactor and accepts one client without running the loop.
    fn bound_with_peer() -> (BoundReactor<RunState, Discard>, ClientStream) {
        let mut reactor = bound();
        let client = ClientStream::connect(reactor.local_addr()).unwrap();
        assert!(wait_until(|| {
            reactor.accept_one();
            !reactor.connections.is_empty()
        }));
        (reactor, client)
    }

    /// Drops the peer's registration without the reactor knowing.
    fn deregister_peer(reactor: &mut BoundReactor<RunState, Discard>) {
        let connection = reactor.connections.values_mut().next().unwrap();
        reactor
            .poll
            .registry()
            .deregister(connection.stream_mut())
            .unwrap();
    }

    #[test]
    fn test_zero_read_buffer_is_rejected() {
        let handler: Discard = |_, _| {};
        let reactor = Reactor::new(
            ServerSettings {
                read_buffer_capacity: 0,
                ..settings()
            },
            RunState::new(),
            handler,
        );
        let stats = reactor.stats();

        assert!(matches!(
            reactor.bind(),
            Err(ReactorError::InvalidSettings {
                setting: "read_buffer_capacity"
            })
        ));
        assert_eq!(stats.live_registrations(), 0);
    }

    #[test]
    fn test_zero_events_capacity_is_rejected() {
        let handler: Discard = |_, _| {};
        let reactor = Reactor::new(
            ServerSettings {
                events_capacity: 0,
                ..settings()
            },
            RunState::new(),
            handler,
        );
        let stats = reactor.stats();

        let err = reactor.start().unwrap_err();
        assert!(matches!(
            err,
            ReactorError::InvalidSettings {
                setting: "events_capacity"
            }
        ));
        assert_eq!(stats.live_registrations(), 0);
    }

    #[test]
    fn test_teardown_failure_is_fatal() {
        let (mut reactor, _client) = bound_with_peer();
        assert_eq!(reactor.stats.live_registrations(), 2);
        deregister_peer(&mut reactor);

        match reactor.teardown() {
            Err(ReactorError::Teardown { channel, source }) => {
                assert!(channel.starts_with("connection"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected teardown error, got {:?}", other),
        }

        // The listener went first; the failed peer is not counted as released
        assert!(reactor.listener.is_none());
        assert_eq!(reactor.stats.live_registrations(), 1);
        assert!(reactor.connections.is_empty());
    }

    #[test]
    fn test_loop_error_wins_over_teardown_error() {
        let (mut reactor, _client) = bound_with_peer();
        deregister_peer(&mut reactor);

        // An empty event list makes the next poll fail
        reactor.events = Events::with_capacity(0);

        assert!(matches!(reactor.run(), Err(ReactorError::Poll(_))));
    }

    #[test]
    fn test_next_timeout() {
        let mut reactor = bound();
        assert_eq!(reactor.next_timeout(), Some(Duration::from_millis(100)));

        reactor.accept_retry = true;
        assert_eq!(reactor.next_timeout(), Some(ACCEPT_BACKOFF));

        reactor.poll_timeout = None;
        assert_eq!(reactor.next_timeout(), Some(ACCEPT_BACKOFF));

        reactor.poll_timeout = Some(Duration::from_millis(10));
        assert_eq!(reactor.next_timeout(), Some(Duration::from_millis(10)));

        reactor.carried.push(LISTENER, false);
        assert_eq!(reactor.next_timeout(), Some(Duration::ZERO));
    }

    #[test]
    fn test_accept_retry_services_listener() {
        let mut reactor = bound();
        reactor.poll_timeout = None;
        let _client = ClientStream::connect(reactor.local_addr()).unwrap();

        // Consume the listener's readiness edge without accepting
        reactor
            .poll
            .poll(&mut reactor.events, Some(Duration::from_secs(5)))
            .unwrap();
        reactor.accept_retry = true;

        let state = reactor.context.clone();
        let wakeup = reactor.wakeup();
        let stats = reactor.stats();
        let handle = thread::spawn(move || reactor.run());

        assert!(wait_until(|| stats.active() == 1));

        state.stop();
        wakeup.wake().unwrap();
        assert!(handle.join().unwrap().is_ok());
    }
}
