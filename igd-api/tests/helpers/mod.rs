//! A loopback gateway: SSDP responder plus canned SOAP documents

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use igd_api::{ClientOptions, InterfaceBinding, SsdpConfig};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const WAN_IP: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";

pub const DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <friendlyName>Test Gateway</friendlyName>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <deviceList>
          <device>
            <deviceType>urn:schemas-upnp-org:device:WANConnectionDevice:1</deviceType>
            <serviceList>
              <service>
                <serviceType>urn:schemas-upnp-org:service:WANIPConnection:1</serviceType>
                <serviceId>urn:upnp-org:serviceId:WANIPConn1</serviceId>
                <controlURL>/ctl/IPConn</controlURL>
                <eventSubURL>/evt/IPConn</eventSubURL>
                <SCPDURL>/WANIPCn.xml</SCPDURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
    </deviceList>
  </device>
</root>"#;

/// Answers every M-SEARCH with a fixed `LOCATION`
pub struct SsdpResponder {
    addr: SocketAddrV4,
    task: JoinHandle<()>,
}

impl SsdpResponder {
    /// `None` never answers
    pub async fn start(location: Option<String>) -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind responder");
        let addr = match socket.local_addr().expect("responder address") {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => unreachable!("bound to an IPv4 address"),
        };

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            while let Ok((_, from)) = socket.recv_from(&mut buf).await {
                if let Some(location) = &location {
                    let response = format!(
                        "HTTP/1.1 200 OK\r\n\
                         CACHE-CONTROL: max-age=120\r\n\
                         LOCATION: {}\r\n\
                         ST: urn:schemas-upnp-org:device:InternetGatewayDevice:1\r\n\r\n",
                        location
                    );
                    let _ = socket.send_to(response.as_bytes(), from).await;
                }
            }
        });

        Self { addr, task }
    }

    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }
}

impl Drop for SsdpResponder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Client options that search only on loopback and ask `responder`
pub fn loopback_options(responder: &SsdpResponder) -> ClientOptions {
    ClientOptions::default().with_ssdp(
        SsdpConfig::default()
            .with_multicast_addr(responder.addr())
            .with_timeout(Duration::from_millis(500))
            .with_ready_timeout(Duration::from_secs(2))
            .with_interfaces(vec![InterfaceBinding::new("lo", Ipv4Addr::LOCALHOST)]),
    )
}

pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>{}</s:Body>
</s:Envelope>"#,
        body
    )
}

pub fn fault(code: &str, description: &str) -> String {
    envelope(&format!(
        r#"<s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
          <errorCode>{}</errorCode>
          <errorDescription>{}</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>"#,
        code, description
    ))
}

pub fn external_ip(address: &str) -> String {
    envelope(&format!(
        r#"<u:GetExternalIPAddressResponse xmlns:u="{}"><NewExternalIPAddress>{}</NewExternalIPAddress></u:GetExternalIPAddressResponse>"#,
        WAN_IP, address
    ))
}

pub fn empty_response(action: &str) -> String {
    envelope(&format!(r#"<u:{}Response xmlns:u="{}"></u:{}Response>"#, action, WAN_IP, action))
}

pub fn mapping_entry(port: u16, protocol: &str, client: &str, description: &str) -> String {
    envelope(&format!(
        r#"<u:GetGenericPortMappingEntryResponse xmlns:u="{}">
      <NewRemoteHost></NewRemoteHost>
      <NewExternalPort>{port}</NewExternalPort>
      <NewProtocol>{protocol}</NewProtocol>
      <NewInternalPort>{port}</NewInternalPort>
      <NewInternalClient>{client}</NewInternalClient>
      <NewEnabled>1</NewEnabled>
      <NewPortMappingDescription>{description}</NewPortMappingDescription>
      <NewLeaseDuration>0</NewLeaseDuration>
    </u:GetGenericPortMappingEntryResponse>"#,
        WAN_IP,
        port = port,
        protocol = protocol,
        client = client,
        description = description
    ))
}

/// Body matcher for one `GetGenericPortMappingEntry` index
pub fn index_matcher(index: u32) -> mockito::Matcher {
    mockito::Matcher::Regex(format!("<NewPortMappingIndex>{}</NewPortMappingIndex>", index))
}

pub fn soap_action(action: &str) -> String {
    format!("\"{}#{}\"", WAN_IP, action)
}
