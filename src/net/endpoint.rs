//! Network endpoint type.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// A data-plane endpoint (IP address + port).
///
/// Wrapper around [`SocketAddr`] that also knows how to come from the two
/// colon-delimited wire fields of the control protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(SocketAddr);

/// Why a pair of wire fields did not form an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// The IP field is not a valid IP address.
    Ip,
    /// The port field is not a valid UDP port.
    Port,
}

impl Endpoint {
    /// Creates a new endpoint from an IP address and port.
    #[must_use]
    pub const fn new(addr: IpAddr, port: u16) -> Self {
        Self(SocketAddr::new(addr, port))
    }

    /// Creates an endpoint bound to all IPv4 interfaces on the given port.
    #[must_use]
    pub const fn any(port: u16) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
    }

    /// Creates a localhost endpoint on the given port.
    #[must_use]
    pub const fn localhost(port: u16) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    /// Builds an endpoint from the `<ip>` and `<port>` fields of a control
    /// message. Fields are trimmed; the port must be numeric and fit a u16.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] naming the first field that failed to parse.
    pub fn from_fields(ip: &str, port: &str) -> Result<Self, FieldError> {
        let ip: IpAddr = ip.trim().parse().map_err(|_| FieldError::Ip)?;
        let port: u16 = port.trim().parse().map_err(|_| FieldError::Port)?;
        Ok(Self::new(ip, port))
    }

    /// Returns the IP address.
    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.0.port()
    }

    /// Returns the underlying [`SocketAddr`].
    #[must_use]
    pub const fn as_socket_addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(ep: Endpoint) -> Self {
        ep.0
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
