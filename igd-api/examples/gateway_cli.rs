//! Command line gateway control
//!
//! Usage:
//!   cargo run -p igd-api --example gateway_cli -- external-ip
//!   cargo run -p igd-api --example gateway_cli -- map 8080 --internal-port 80 --protocol tcp
//!   cargo run -p igd-api --example gateway_cli -- list --all-clients
//!   cargo run -p igd-api --example gateway_cli -- unmap 8080
//!
//! Set `IGD_LOG_MODE=development` (or `debug`) to see what happens on the wire.

use std::net::IpAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use igd_api::logging::init_logging_from_env;
use igd_api::{
    parse_protocols, ClientOptions, GetMappingOptions, Mapping, Protocol, SsdpConfig, Unmapping, UpnpClient,
};

#[derive(Parser, Debug)]
#[command(name = "gateway-cli")]
#[command(about = "Inspect and change port mappings on the local Internet Gateway Device")]
struct Args {
    /// Discovery timeout in seconds
    #[arg(short = 'd', long, default_value = "3")]
    discovery_timeout: u64,

    /// Protocols used when a command names none (comma separated)
    #[arg(long, default_value = "tcp")]
    protocols: String,

    /// Description written on new mappings and used to filter `list`
    #[arg(long, default_value = igd_api::DEFAULT_DESCRIPTION)]
    description: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the gateway's public address
    ExternalIp,
    /// List port mappings
    List {
        /// Include mappings made by other programs
        #[arg(long)]
        all_clients: bool,
        /// Include mappings pointing at other hosts
        #[arg(long)]
        all_devices: bool,
    },
    /// Add a port mapping
    Map {
        /// Public port
        port: u16,
        #[arg(long)]
        internal_port: Option<u16>,
        #[arg(long)]
        internal_host: Option<IpAddr>,
        #[arg(long)]
        protocol: Option<Protocol>,
        /// Lease duration in seconds, 0 for permanent
        #[arg(long)]
        ttl: Option<u32>,
        /// Create the mapping disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a port mapping
    Unmap {
        /// Public port
        port: u16,
        #[arg(long)]
        protocol: Option<Protocol>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;
    let args = Args::parse();

    let options = ClientOptions::default()
        .with_protocols(parse_protocols(&args.protocols)?)
        .with_description(args.description)
        .with_ssdp(SsdpConfig::default().with_timeout(Duration::from_secs(args.discovery_timeout)));
    let client = UpnpClient::new(options)?;

    match args.command {
        Command::ExternalIp => {
            println!("{}", client.external_address().await?);
        }
        Command::List {
            all_clients,
            all_devices,
        } => {
            let mappings = client
                .get_mapping(GetMappingOptions {
                    all_clients,
                    all_devices,
                })
                .await?;
            for m in mappings {
                println!(
                    "{:<4} {:>5} -> {}:{:<5} {:<8} ttl={:<6} {}",
                    m.protocol,
                    m.remote_port,
                    m.internal_host,
                    m.internal_port,
                    if m.enabled { "enabled" } else { "disabled" },
                    m.ttl,
                    m.description
                );
            }
        }
        Command::Map {
            port,
            internal_port,
            internal_host,
            protocol,
            ttl,
            disabled,
        } => {
            let mut mapping = Mapping::new(port).with_enabled(!disabled);
            mapping.internal_port = internal_port;
            mapping.internal_host = internal_host;
            mapping.protocol = protocol;
            mapping.ttl = ttl;
            client.mapping(mapping).await?;
            println!("mapped {}", port);
        }
        Command::Unmap { port, protocol } => {
            let mut unmapping = Unmapping::new(port);
            unmapping.protocol = protocol;
            client.unmapping(unmapping).await?;
            println!("unmapped {}", port);
        }
    }

    client.destroy();
    Ok(())
}
