use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};

use crate::ErrorKind;

/// Address family of a [`ResolvedAddress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

/// One address a host resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    /// The IP address
    pub ip: IpAddr,
    /// Family of [`ResolvedAddress::ip`]
    pub family: AddressFamily,
}

impl ResolvedAddress {
    /// The socket address to dial for the given port
    #[must_use]
    pub const fn with_port(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.ip, port)
    }

    /// Returns `true` for IPv6 addresses
    #[must_use]
    pub const fn is_ipv6(&self) -> bool {
        matches!(self.family, AddressFamily::V6)
    }
}

impl From<IpAddr> for ResolvedAddress {
    fn from(ip: IpAddr) -> Self {
        let family = match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        };
        Self { ip, family }
    }
}

impl Display for ResolvedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.ip.fmt(f)
    }
}

/// The dial target of a connection: a host name or literal address plus a port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create a new endpoint.
    ///
    /// Brackets around IPv6 literals (as they appear in URLs) are removed.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            Some(inner) => inner.to_string(),
            None => host,
        };
        Self { host, port }
    }

    /// The host name or literal address
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port to connect to
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl TryFrom<&http::Uri> for Endpoint {
    type Error = ErrorKind;

    fn try_from(uri: &http::Uri) -> Result<Self, Self::Error> {
        let host = uri
            .host()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ErrorKind::MissingHost(uri.clone()))?;

        let port = match uri.port_u16() {
            Some(port) => port,
            None => match uri.scheme_str() {
                Some("https") => 443,
                Some("http") | None => 80,
                Some(_) => return Err(ErrorKind::InvalidUri(uri.to_string())),
            },
        };

        Ok(Self::new(host, port))
    }
}
