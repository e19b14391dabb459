//! Fixture-based tests for description fetching and service resolution
//!
//! Descriptions are served from a mock HTTP server so the whole
//! location-to-control-URL path runs without a real gateway.

mod helpers;

use std::time::Duration;

use helpers::DescriptionFixture;
use igd_discovery::{resolve_service, DescriptionFetcher, DeviceDescription, DiscoveryError, WAN_CONNECTION_SERVICES};
use mockito::Server;
use rstest::rstest;
use url::Url;

fn fetcher() -> DescriptionFetcher {
    DescriptionFetcher::new(Duration::from_secs(5)).unwrap()
}

#[rstest]
#[case("igd_nested.xml", "Home Router", 3)]
#[case("igd_ppp.xml", "DSL Modem", 3)]
#[case("igd_url_base.xml", "Office Gateway", 3)]
#[case("media_renderer.xml", "Living Room TV", 1)]
#[case("igd_vendor_elements.xml", "Vendor Gateway", 3)]
fn test_parse_fixture(#[case] fixture_file: &str, #[case] friendly_name: &str, #[case] device_count: usize) {
    let fixture = DescriptionFixture::load(fixture_file);
    let description = DeviceDescription::from_xml(&fixture.xml_content).expect("Failed to parse fixture");

    assert_eq!(description.device.friendly_name.as_deref(), Some(friendly_name));
    assert_eq!(description.devices().len(), device_count);
}

#[tokio::test]
async fn test_resolve_nested_service_against_location() {
    let mut server = Server::new_async().await;
    let fixture = DescriptionFixture::load("igd_nested.xml");
    let mock = server
        .mock("GET", "/rootDesc.xml")
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(&fixture.xml_content)
        .create_async()
        .await;

    let location = Url::parse(&format!("{}/rootDesc.xml", server.url())).unwrap();
    let description = fetcher().fetch(&location).await.unwrap();
    let service = resolve_service(&description, &location, &WAN_CONNECTION_SERVICES).unwrap();

    mock.assert_async().await;
    assert_eq!(service.service_type, "urn:schemas-upnp-org:service:WANIPConnection:1");
    assert_eq!(service.control_url, location.join("/ctl/IPConn").unwrap());
    assert_eq!(service.description_url, location.join("/WANIPCn.xml").unwrap());
}

#[tokio::test]
async fn test_resolve_service_listed_after_vendor_element() {
    let mut server = Server::new_async().await;
    let fixture = DescriptionFixture::load("igd_vendor_elements.xml");
    server
        .mock("GET", "/rootDesc.xml")
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(&fixture.xml_content)
        .create_async()
        .await;

    let location = Url::parse(&format!("{}/rootDesc.xml", server.url())).unwrap();
    let description = fetcher().fetch(&location).await.unwrap();
    let service = resolve_service(&description, &location, &WAN_CONNECTION_SERVICES).unwrap();

    assert_eq!(service.control_url, location.join("/ctl/IPConn").unwrap());
}

#[tokio::test]
async fn test_resolve_ppp_service_keeps_absolute_control_url() {
    let mut server = Server::new_async().await;
    let fixture = DescriptionFixture::load("igd_ppp.xml");
    server
        .mock("GET", "/igddesc.xml")
        .with_status(200)
        .with_body(&fixture.xml_content)
        .create_async()
        .await;

    let location = Url::parse(&format!("{}/igddesc.xml", server.url())).unwrap();
    let description = fetcher().fetch(&location).await.unwrap();
    let service = resolve_service(&description, &location, &WAN_CONNECTION_SERVICES).unwrap();

    assert_eq!(service.service_type, "urn:schemas-upnp-org:service:WANPPPConnection:1");
    assert_eq!(
        service.control_url.as_str(),
        "http://192.168.178.1:49000/igdupnp/control/WANPPPConn1"
    );
    assert_eq!(service.description_url, location.join("/igdconnSCPD.xml").unwrap());
}

#[tokio::test]
async fn test_resolve_against_url_base() {
    let mut server = Server::new_async().await;
    let fixture = DescriptionFixture::load("igd_url_base.xml");
    server
        .mock("GET", "/gatedesc.xml")
        .with_status(200)
        .with_body(&fixture.xml_content)
        .create_async()
        .await;

    let location = Url::parse(&format!("{}/gatedesc.xml", server.url())).unwrap();
    let description = fetcher().fetch(&location).await.unwrap();
    let service = resolve_service(&description, &location, &WAN_CONNECTION_SERVICES).unwrap();

    assert_eq!(service.control_url.as_str(), "http://10.0.0.1:2869/upnp/control/WANIPConn1");
    assert_eq!(service.description_url.as_str(), "http://10.0.0.1:2869/WANIPConn1.xml");
}

#[tokio::test]
async fn test_device_without_wan_service() {
    let mut server = Server::new_async().await;
    let fixture = DescriptionFixture::load("media_renderer.xml");
    server
        .mock("GET", "/desc.xml")
        .with_status(200)
        .with_body(&fixture.xml_content)
        .create_async()
        .await;

    let location = Url::parse(&format!("{}/desc.xml", server.url())).unwrap();
    let description = fetcher().fetch(&location).await.unwrap();

    assert!(matches!(
        resolve_service(&description, &location, &WAN_CONNECTION_SERVICES),
        Err(DiscoveryError::ServiceNotFound)
    ));
}

#[tokio::test]
async fn test_fetch_http_error() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/missing.xml").with_status(404).create_async().await;

    let location = Url::parse(&format!("{}/missing.xml", server.url())).unwrap();
    assert!(matches!(
        fetcher().fetch(&location).await,
        Err(DiscoveryError::NetworkError(_))
    ));
}

#[tokio::test]
async fn test_fetch_malformed_description() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/broken.xml")
        .with_status(200)
        .with_body("<root><device><deviceType>")
        .create_async()
        .await;

    let location = Url::parse(&format!("{}/broken.xml", server.url())).unwrap();
    assert!(matches!(
        fetcher().fetch(&location).await,
        Err(DiscoveryError::ParseError(_))
    ));
}
