//! Gateway discovery that outputs JSON for scripting
//!
//! Usage: cargo run -p igd-discovery --example discover_json [timeout_secs]

use serde::Serialize;
use std::time::Duration;

use igd_discovery::{
    resolve_service, search_once, DescriptionFetcher, DiscoveryOutcome, INTERNET_GATEWAY_DEVICE,
    WAN_CONNECTION_SERVICES,
};
use url::Url;

#[derive(Serialize)]
struct InterfaceReport {
    interface: String,
    local_addr: String,
    location: Option<String>,
    control_url: Option<String>,
    service_type: Option<String>,
    error: Option<String>,
}

async fn report(fetcher: &DescriptionFetcher, outcome: DiscoveryOutcome) -> InterfaceReport {
    let mut report = InterfaceReport {
        interface: outcome.interface.to_string(),
        local_addr: outcome.local_addr.to_string(),
        location: None,
        control_url: None,
        service_type: None,
        error: None,
    };

    let location = match &outcome.result {
        Ok(response) => response.location().map(str::to_string),
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.location = location.clone();

    let Some(location) = location.and_then(|l| Url::parse(&l).ok()) else {
        report.error = Some("response carried no usable LOCATION".to_string());
        return report;
    };

    let resolved = match fetcher.fetch(&location).await {
        Ok(description) => resolve_service(&description, &location, &WAN_CONNECTION_SERVICES),
        Err(e) => Err(e),
    };
    match resolved {
        Ok(service) => {
            report.control_url = Some(service.control_url.to_string());
            report.service_type = Some(service.service_type);
        }
        Err(e) => report.error = Some(e.to_string()),
    }
    report
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let timeout = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(3);

    let outcomes = search_once(INTERNET_GATEWAY_DEVICE, Duration::from_secs(timeout)).await?;
    let fetcher = DescriptionFetcher::new(Duration::from_secs(5))?;

    let mut reports = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        reports.push(report(&fetcher, outcome).await);
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
