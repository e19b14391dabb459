//! Local network interface enumeration.

use std::fmt;
use std::net::Ipv4Addr;

use if_addrs::IfAddr;

/// A local IPv4 address that a discovery socket binds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceBinding {
    /// OS interface name (e.g. `eth0`), informational only
    pub name: String,
    /// Address the discovery socket binds to
    pub address: Ipv4Addr,
}

impl InterfaceBinding {
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

impl fmt::Display for InterfaceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// List the non-loopback IPv4 interfaces of this host.
///
/// Enumeration failure is logged and yields an empty list.
pub fn local_interfaces() -> Vec<InterfaceBinding> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .filter(|iface| !iface.is_loopback())
            .filter_map(|iface| match iface.addr {
                IfAddr::V4(v4) => Some(InterfaceBinding::new(iface.name, v4.ip)),
                IfAddr::V6(_) => None,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to enumerate network interfaces");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_interfaces_excludes_loopback() {
        for binding in local_interfaces() {
            assert!(!binding.address.is_loopback(), "{} should not be listed", binding);
        }
    }

    #[test]
    fn test_display() {
        let binding = InterfaceBinding::new("eth0", Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(binding.to_string(), "eth0 (192.168.1.20)");
    }
}
