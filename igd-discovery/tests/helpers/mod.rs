//! Test helpers for fixture-based and loopback SSDP integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use igd_discovery::{InterfaceBinding, SsdpClient, SsdpConfig};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// A device description fixture
#[derive(Debug, Clone)]
pub struct DescriptionFixture {
    pub name: String,
    pub xml_content: String,
}

impl DescriptionFixture {
    /// Load a fixture from the fixtures directory
    pub fn load(filename: &str) -> Self {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("tests/fixtures");
        path.push(filename);

        let xml_content = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", filename, e));

        Self {
            name: filename.to_string(),
            xml_content,
        }
    }
}

/// A search response as an Internet Gateway Device would send it
pub fn gateway_response(location: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         CACHE-CONTROL: max-age=120\r\n\
         EXT:\r\n\
         LOCATION: {}\r\n\
         SERVER: Linux/4.14 UPnP/1.0 MiniUPnPd/2.2\r\n\
         ST: urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\n\
         USN: uuid:11111111-0000-0000-0000-000000000001::urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\n\r\n",
        location
    )
}

/// Loopback stand-in for the multicast group.
///
/// Records every query and answers it with a fixed response unless the
/// sender has been silenced.
pub struct MockResponder {
    addr: SocketAddrV4,
    queries: Arc<Mutex<Vec<(SocketAddr, String)>>>,
    silenced: Arc<Mutex<HashSet<SocketAddr>>>,
    task: JoinHandle<()>,
}

impl MockResponder {
    /// Answer every query with `response`; `None` never answers.
    pub async fn start(response: Option<String>) -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind responder");
        let addr = match socket.local_addr().expect("responder address") {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => unreachable!("bound to an IPv4 address"),
        };

        let queries = Arc::new(Mutex::new(Vec::new()));
        let silenced = Arc::new(Mutex::new(HashSet::new()));

        let task = {
            let queries = queries.clone();
            let silenced = silenced.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 2048];
                while let Ok((len, from)) = socket.recv_from(&mut buf).await {
                    let query = String::from_utf8_lossy(&buf[..len]).to_string();
                    queries.lock().unwrap().push((from, query));

                    let muted = silenced.lock().unwrap().contains(&from);
                    if let (Some(response), false) = (&response, muted) {
                        let _ = socket.send_to(response.as_bytes(), from).await;
                    }
                }
            })
        };

        Self {
            addr,
            queries,
            silenced,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }

    /// Stop answering queries sent from `addr`
    pub fn silence(&self, addr: SocketAddr) {
        self.silenced.lock().unwrap().insert(addr);
    }

    /// Every query received so far
    pub fn queries(&self) -> Vec<(SocketAddr, String)> {
        self.queries.lock().unwrap().clone()
    }
}

impl Drop for MockResponder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// `count` loopback interface bindings
pub fn loopback_interfaces(count: usize) -> Vec<InterfaceBinding> {
    (0..count)
        .map(|i| InterfaceBinding::new(format!("lo{}", i), Ipv4Addr::LOCALHOST))
        .collect()
}

/// Client config that sends every search to `responder`
pub fn loopback_config(responder: &MockResponder, sockets: usize, timeout: Duration) -> SsdpConfig {
    SsdpConfig::default()
        .with_multicast_addr(responder.addr())
        .with_timeout(timeout)
        .with_ready_timeout(Duration::from_secs(2))
        .with_interfaces(loopback_interfaces(sockets))
}

/// Route library logs through the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wait until `count` sockets are bound and return their addresses
pub async fn wait_for_sockets(client: &SsdpClient, count: usize) -> Vec<SocketAddr> {
    for _ in 0..200 {
        let addrs = client.bound_addresses();
        if addrs.len() >= count {
            return addrs;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} bound sockets, got {:?}", count, client.bound_addresses());
}
