//! Host identity lookup.
//!
//! The display shows which machine it is attached to, so the agent needs
//! the short hostname and one routable IPv4 address. Both are resolved
//! through native OS APIs rather than by shelling out to `hostname` and
//! `ifconfig`.

use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;
use tracing::debug;

/// Errors from host identity lookups
#[derive(Debug, Error)]
pub enum HostInfoError {
    #[error("hostname lookup failed: {0}")]
    Lookup(#[from] std::io::Error),

    #[error("hostname is not valid UTF-8")]
    NotUtf8,
}

/// Capability interface for gathering host identity.
///
/// The publisher is generic over this trait so tests can substitute a
/// fixed identity without touching the OS.
pub trait HostInfo {
    /// The machine's short hostname (no domain suffix).
    fn hostname(&self) -> Result<String, HostInfoError>;

    /// The first non-loopback IPv4 address, if any interface has one.
    fn primary_ipv4(&self) -> Option<Ipv4Addr>;
}

/// Strip surrounding whitespace and any domain suffix from a raw hostname.
pub fn short_hostname(raw: &str) -> &str {
    let name = raw.trim();
    name.split('.').next().unwrap_or(name)
}

/// `HostInfo` backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHostInfo;

impl HostInfo for SystemHostInfo {
    fn hostname(&self) -> Result<String, HostInfoError> {
        let raw = hostname::get()?;
        let name = raw.into_string().map_err(|_| HostInfoError::NotUtf8)?;
        Ok(short_hostname(&name).to_string())
    }

    fn primary_ipv4(&self) -> Option<Ipv4Addr> {
        let interfaces = match local_ip_address::list_afinet_netifas() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                debug!(error = %e, "Failed to enumerate network interfaces");
                return None;
            }
        };

        // First match in enumeration order wins. Loopback and link-local
        // addresses are never useful on the display.
        for (name, ip) in interfaces {
            if let IpAddr::V4(ipv4) = ip {
                if ipv4.is_loopback() || ipv4.is_link_local() {
                    continue;
                }
                debug!(interface = %name, address = %ipv4, "Selected primary IPv4 address");
                return Some(ipv4);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hostname_trims_trailing_newline() {
        assert_eq!(short_hostname("raspi\n"), "raspi");
    }

    #[test]
    fn test_short_hostname_strips_domain() {
        assert_eq!(short_hostname("raspi.local"), "raspi");
        assert_eq!(short_hostname("node1.example.com"), "node1");
    }

    #[test]
    fn test_short_hostname_passthrough() {
        assert_eq!(short_hostname("raspi"), "raspi");
    }

    #[test]
    fn test_system_hostname_is_short() {
        let info = SystemHostInfo;
        let name = info.hostname().unwrap();
        assert!(!name.is_empty());
        assert!(!name.contains('.'));
        assert_eq!(name, name.trim());
    }

    #[test]
    fn test_primary_ipv4_never_loopback() {
        // The result depends on the test host's interfaces; whatever comes
        // back must not be a loopback or link-local address.
        if let Some(ip) = SystemHostInfo.primary_ipv4() {
            assert!(!ip.is_loopback());
            assert!(!ip.is_link_local());
        }
    }
}
