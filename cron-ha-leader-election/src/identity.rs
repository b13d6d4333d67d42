//! Host identity used as the lease value

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::str::FromStr;
use tracing::trace;

/// Public address used only to let the OS pick the outbound IPv4 source
const IPV4_PROBE: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53);

/// Public address used only to let the OS pick the outbound IPv6 source
const IPV6_PROBE: SocketAddr = SocketAddr::new(
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888)),
    53,
);

/// Who this host is, as written into the store
///
/// Equality is field-wise. The canonical serialization is
/// `hostname/ipv4/ipv6`, e.g. `db-1/10.0.0.5/fd00::5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SystemIdentity {
    pub hostname: String,
    pub ipv4: Ipv4Addr,
    pub ipv6: Ipv6Addr,
}

/// Error parsing a stored identity string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a hostname/ipv4/ipv6 identity")]
pub struct IdentityParseError(pub String);

impl SystemIdentity {
    pub fn new(hostname: impl Into<String>, ipv4: Ipv4Addr, ipv6: Ipv6Addr) -> Self {
        Self {
            hostname: hostname.into(),
            ipv4,
            ipv6,
        }
    }

    /// Best-effort identity of the current host
    ///
    /// Never fails: an unknown hostname becomes `localhost` and an address
    /// family with no route falls back to its loopback address.
    pub fn resolve() -> Self {
        let hostname = nix::unistd::gethostname()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string());

        let ipv4 = match outbound_address(IPV4_PROBE) {
            Some(IpAddr::V4(addr)) => addr,
            _ => Ipv4Addr::LOCALHOST,
        };
        let ipv6 = match outbound_address(IPV6_PROBE) {
            Some(IpAddr::V6(addr)) => addr,
            _ => Ipv6Addr::LOCALHOST,
        };

        let identity = Self::new(hostname, ipv4, ipv6);
        trace!(%identity, "Resolved system identity");
        identity
    }

    /// Whether a value read from the store names this identity
    ///
    /// Values that do not parse never match.
    pub fn matches(&self, stored: &str) -> bool {
        stored
            .parse::<SystemIdentity>()
            .is_ok_and(|other| &other == self)
    }
}

/// Source address the OS would use to reach `probe`
///
/// Connecting a UDP socket only selects a route; no packet is sent.
fn outbound_address(probe: SocketAddr) -> Option<IpAddr> {
    let bind: SocketAddr = if probe.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind).ok()?;
    socket.connect(probe).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

impl fmt::Display for SystemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.hostname, self.ipv4, self.ipv6)
    }
}

impl FromStr for SystemIdentity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdentityParseError(s.to_string());

        // Hostnames never contain '/', addresses never do either
        let mut parts = s.rsplitn(3, '/');
        let ipv6 = parts.next().ok_or_else(invalid)?;
        let ipv4 = parts.next().ok_or_else(invalid)?;
        let hostname = parts.next().filter(|h| !h.is_empty()).ok_or_else(invalid)?;

        Ok(Self {
            hostname: hostname.to_string(),
            ipv4: ipv4.parse().map_err(|_| invalid())?,
            ipv6: ipv6.parse().map_err(|_| invalid())?,
        })
    }
}

/// Produces the identity to bid with
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self) -> SystemIdentity;
}

/// Resolves the real host identity on every call
#[derive(Debug, Default, Clone, Copy)]
pub struct HostIdentity;

impl IdentityResolver for HostIdentity {
    fn resolve(&self) -> SystemIdentity {
        SystemIdentity::resolve()
    }
}

/// Always returns the same identity
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub SystemIdentity);

impl IdentityResolver for FixedIdentity {
    fn resolve(&self) -> SystemIdentity {
        self.0.clone()
    }
}
