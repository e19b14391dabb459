//! SSDP (Simple Service Discovery Protocol) search engine.
//!
//! One UDP socket is bound per local interface. A search sends a single
//! M-SEARCH from every socket and waits, per socket, for the first answer or
//! the search timeout. Every socket owns a reader task that fans received
//! datagrams out to whichever searches are currently listening on it, so
//! concurrent searches never steal each other's responses.

use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;

use crate::error::{DiscoveryError, Result, SearchError};
use crate::interfaces::{local_interfaces, InterfaceBinding};

/// Standard SSDP multicast group and port
pub const SSDP_MULTICAST_ADDR: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);

/// Default per-search response window
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Default time `search` waits for the first socket to bind
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

const RECV_BUFFER_SIZE: usize = 2048;
const LISTENER_CAPACITY: usize = 16;

/// Configuration for [`SsdpClient`].
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Destination of M-SEARCH datagrams
    pub multicast_addr: SocketAddrV4,
    /// Local source port; `0` picks an ephemeral port per socket
    pub source_port: u16,
    /// Per-search response window
    pub timeout: Duration,
    /// How long `search` waits for at least one socket to bind
    pub ready_timeout: Duration,
    /// Interfaces to bind; `None` enumerates the host's non-loopback IPv4 interfaces
    pub interfaces: Option<Vec<InterfaceBinding>>,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            multicast_addr: SSDP_MULTICAST_ADDR,
            source_port: 0,
            timeout: DEFAULT_SEARCH_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            interfaces: None,
        }
    }
}

impl SsdpConfig {
    pub fn with_multicast_addr(mut self, addr: SocketAddrV4) -> Self {
        self.multicast_addr = addr;
        self
    }

    pub fn with_source_port(mut self, port: u16) -> Self {
        self.source_port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Bind exactly these interfaces instead of enumerating the host's
    pub fn with_interfaces(mut self, interfaces: Vec<InterfaceBinding>) -> Self {
        self.interfaces = Some(interfaces);
        self
    }
}

/// A parsed SSDP response received on one discovery socket
#[derive(Debug, Clone, PartialEq)]
pub struct SsdpResponse {
    /// First token of the start line, lower-cased (`http/1.1` for search responses)
    pub method: String,
    /// Header map with lower-cased keys
    pub headers: HashMap<String, String>,
    /// Sender of the datagram
    pub remote: SocketAddr,
    /// Local address of the socket that received it
    pub local: SocketAddr,
    /// The raw message text
    pub message: String,
}

impl SsdpResponse {
    pub(crate) fn parse(message: &str, remote: SocketAddr, local: SocketAddr) -> Self {
        Self {
            method: parse_method(message),
            headers: parse_headers(message),
            remote,
            local,
            message: message.to_string(),
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The device description URL from the `LOCATION` header
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

/// Result of one search on one socket
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// Interface the socket is bound to
    pub interface: InterfaceBinding,
    /// Local address of the socket
    pub local_addr: SocketAddr,
    /// The first response on this socket, or why none arrived
    pub result: std::result::Result<SsdpResponse, SearchError>,
}

impl DiscoveryOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn response(&self) -> Option<&SsdpResponse> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&SearchError> {
        self.result.as_ref().err()
    }
}

/// Lower-cased first token of the start line
pub fn parse_method(message: &str) -> String {
    message
        .lines()
        .next()
        .and_then(|line| line.split(' ').next())
        .unwrap_or("")
        .to_lowercase()
}

/// Parse `key: value` header lines after the start line.
///
/// Keys are lower-cased; lines without a colon or with an empty key are skipped.
pub fn parse_headers(message: &str) -> HashMap<String, String> {
    message
        .lines()
        .skip(1)
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_lowercase(), value.trim().to_string()))
        })
        .collect()
}

/// Build the M-SEARCH datagram for `search_target`
pub fn search_query(multicast_addr: SocketAddrV4, search_target: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: 1\r\n\
         ST: {}\r\n\
         \r\n",
        multicast_addr, search_target
    )
}

#[derive(Debug, Clone)]
struct Datagram {
    payload: Arc<str>,
    from: SocketAddr,
}

/// One bound socket and its fan-out channel
struct DiscoverySocket {
    id: u64,
    binding: InterfaceBinding,
    socket: UdpSocket,
    local_addr: SocketAddr,
    datagrams: broadcast::Sender<Datagram>,
    closed: watch::Sender<bool>,
}

impl DiscoverySocket {
    /// Mark the socket closed. Returns `false` if it already was.
    fn close(&self) -> bool {
        !self.closed.send_replace(true)
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[derive(Debug, Clone, Copy)]
struct Readiness {
    bound: bool,
    pending: usize,
}

struct Shared {
    config: SsdpConfig,
    sockets: Mutex<BTreeMap<u64, Arc<DiscoverySocket>>>,
    destroyed: AtomicBool,
    readiness: watch::Sender<Readiness>,
}

impl Shared {
    fn remove(&self, id: u64) {
        if self.sockets.lock().remove(&id).is_some() {
            tracing::debug!(socket = id, "Discovery socket removed");
        }
    }

    fn bind_settled(&self, bound: bool) {
        self.readiness.send_modify(|state| {
            state.bound |= bound;
            state.pending = state.pending.saturating_sub(1);
        });
    }
}

/// SSDP client with one socket per local interface.
///
/// # Examples
///
/// ```no_run
/// use igd_discovery::{SsdpClient, SsdpConfig};
///
/// # async fn run() -> igd_discovery::Result<()> {
/// let client = SsdpClient::new(SsdpConfig::default());
/// for outcome in client.search("urn:schemas-upnp-org:device:InternetGatewayDevice:1").await? {
///     match outcome.response() {
///         Some(response) => println!("{}: {:?}", outcome.interface, response.location()),
///         None => println!("{}: no answer", outcome.interface),
///     }
/// }
/// client.destroy();
/// # Ok(())
/// # }
/// ```
pub struct SsdpClient {
    shared: Arc<Shared>,
}

impl SsdpClient {
    /// Create the client and start binding one socket per interface.
    ///
    /// Binding happens in the background; [`search`](Self::search) waits for it.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: SsdpConfig) -> Self {
        let interfaces = config.interfaces.clone().unwrap_or_else(local_interfaces);
        let (readiness, _) = watch::channel(Readiness {
            bound: false,
            pending: interfaces.len(),
        });

        let shared = Arc::new(Shared {
            config,
            sockets: Mutex::new(BTreeMap::new()),
            destroyed: AtomicBool::new(false),
            readiness,
        });

        for (id, binding) in interfaces.into_iter().enumerate() {
            tokio::spawn(open_socket(shared.clone(), id as u64, binding));
        }

        Self { shared }
    }

    /// Search for `device_type` on every bound socket.
    ///
    /// Returns one outcome per socket active when the search started, in
    /// socket creation order, once every socket has answered or timed out.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::ClientDestroyed`] after [`destroy`](Self::destroy)
    /// - [`DiscoveryError::NotReady`] if no socket bound within the readiness window
    pub async fn search(&self, device_type: &str) -> Result<Vec<DiscoveryOutcome>> {
        self.ready().await?;

        let config = &self.shared.config;
        let query = search_query(config.multicast_addr, device_type);
        let target = SocketAddr::V4(config.multicast_addr);
        let window = config.timeout;

        let sockets: Vec<Arc<DiscoverySocket>> = self.shared.sockets.lock().values().cloned().collect();
        tracing::debug!(device_type, sockets = sockets.len(), "Sending M-SEARCH");

        let query = query.as_bytes();
        let listeners = sockets.into_iter().map(|socket| async move {
            let interface = socket.binding.clone();
            let local_addr = socket.local_addr;
            let result = listen(socket, query, target, window).await;
            DiscoveryOutcome {
                interface,
                local_addr,
                result,
            }
        });
        let outcomes = join_all(listeners).await;

        tracing::debug!(
            device_type,
            answered = outcomes.iter().filter(|o| o.is_success()).count(),
            total = outcomes.len(),
            "Search settled"
        );
        Ok(outcomes)
    }

    /// Wait until at least one socket is bound.
    pub async fn ready(&self) -> Result<()> {
        self.ensure_alive()?;

        let window = self.shared.config.ready_timeout;
        let mut readiness = self.shared.readiness.subscribe();
        let settled = async {
            loop {
                let state = *readiness.borrow_and_update();
                if state.bound || state.pending == 0 {
                    return state.bound;
                }
                if readiness.changed().await.is_err() {
                    return false;
                }
            }
        };
        let bound = tokio::time::timeout(window, settled).await.unwrap_or(false);

        self.ensure_alive()?;
        if bound {
            Ok(())
        } else {
            Err(DiscoveryError::NotReady(window))
        }
    }

    /// Close every socket and reject all further searches. Idempotent.
    pub fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let sockets = std::mem::take(&mut *self.shared.sockets.lock());
        for socket in sockets.into_values() {
            socket.close();
        }
        // Wake anyone blocked in `ready()`
        self.shared.readiness.send_modify(|state| state.pending = 0);
        tracing::debug!("SSDP client destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    /// Local addresses of the active sockets, in creation order
    pub fn bound_addresses(&self) -> Vec<SocketAddr> {
        self.shared.sockets.lock().values().map(|s| s.local_addr).collect()
    }

    pub fn config(&self) -> &SsdpConfig {
        &self.shared.config
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(DiscoveryError::ClientDestroyed)
        } else {
            Ok(())
        }
    }
}

impl Drop for SsdpClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn open_socket(shared: Arc<Shared>, id: u64, binding: InterfaceBinding) {
    let bind_addr = SocketAddrV4::new(binding.address, shared.config.source_port);
    let bound = match UdpSocket::bind(bind_addr).await {
        Ok(socket) => socket.local_addr().map(|local| (socket, local)),
        Err(e) => Err(e),
    };

    let (socket, local_addr) = match bound {
        Ok(bound) => bound,
        Err(e) => {
            tracing::warn!(interface = %binding, error = %e, "Failed to bind discovery socket");
            shared.bind_settled(false);
            return;
        }
    };

    let (datagrams, _) = broadcast::channel(LISTENER_CAPACITY);
    let (closed, _) = watch::channel(false);
    let socket = Arc::new(DiscoverySocket {
        id,
        binding,
        socket,
        local_addr,
        datagrams,
        closed,
    });

    {
        let mut sockets = shared.sockets.lock();
        if shared.destroyed.load(Ordering::SeqCst) {
            drop(sockets);
            shared.bind_settled(false);
            return;
        }
        sockets.insert(id, socket.clone());
    }

    tracing::debug!(socket = id, interface = %socket.binding, %local_addr, "Discovery socket bound");
    tokio::spawn(read_loop(shared.clone(), socket));
    shared.bind_settled(true);
}

/// Receive datagrams until the socket errors or is closed, then drop it from the active set.
async fn read_loop(shared: Arc<Shared>, socket: Arc<DiscoverySocket>) {
    let mut closed = socket.closed.subscribe();
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        tokio::select! {
            received = socket.socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => {
                    let payload: Arc<str> = String::from_utf8_lossy(&buf[..len]).into();
                    // Err only means no search is listening right now
                    let _ = socket.datagrams.send(Datagram { payload, from });
                }
                Err(e) => {
                    tracing::warn!(socket = socket.id, error = %e, "Discovery socket error, closing");
                    break;
                }
            },
            _ = wait_closed(&mut closed) => break,
        }
    }

    socket.close();
    shared.remove(socket.id);
}

/// Send the query on `socket` and wait for its first answer.
async fn listen(
    socket: Arc<DiscoverySocket>,
    query: &[u8],
    target: SocketAddr,
    window: Duration,
) -> std::result::Result<SsdpResponse, SearchError> {
    // Subscribe before sending so an immediate answer is not missed
    let mut datagrams = socket.datagrams.subscribe();
    let mut closed = socket.closed.subscribe();
    if socket.is_closed() {
        return Err(SearchError::SocketClosed);
    }

    socket.socket.send_to(query, target).await?;

    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            received = datagrams.recv() => match received {
                Ok(datagram) => {
                    return Ok(SsdpResponse::parse(&datagram.payload, datagram.from, socket.local_addr));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(socket = socket.id, skipped, "Search listener lagged");
                }
                Err(RecvError::Closed) => return Err(SearchError::SocketClosed),
            },
            _ = wait_closed(&mut closed) => return Err(SearchError::SocketClosed),
            _ = &mut deadline => return Err(SearchError::Timeout(window)),
        }
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}
