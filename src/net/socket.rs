//! UDP socket wrapper for mio-based I/O.
//!
//! Thin wrapper around [`mio::net::UdpSocket`]. Sockets are non-blocking;
//! the control thread pairs one with a [`Poll`] for timed readiness waits,
//! the TX thread fires best-effort sends and treats `WouldBlock` as a
//! dropped datagram.
//!
//! [`Poll`]: mio::Poll

use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use mio::event::Source;
use mio::net::UdpSocket as MioUdpSocket;
use mio::{Interest, Registry, Token};

use super::Endpoint;

/// A non-blocking UDP socket.
pub struct UdpSocket {
    inner: MioUdpSocket,
}

impl UdpSocket {
    /// Creates a new UDP socket bound to the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound (e.g., address in use).
    pub fn bind(endpoint: Endpoint) -> io::Result<Self> {
        let inner = MioUdpSocket::bind(endpoint.into())?;
        Ok(Self { inner })
    }

    /// Returns the local address this socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the local address cannot be retrieved.
    pub fn local_addr(&self) -> io::Result<Endpoint> {
        self.inner.local_addr().map(Endpoint::from)
    }

    /// Attempts to send a datagram, returning `Ok(None)` instead of
    /// `WouldBlock` when the socket is not ready.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `WouldBlock`.
    pub fn try_send_to(&self, buf: &[u8], dest: Endpoint) -> io::Result<Option<usize>> {
        match self.inner.send_to(buf, dest.into()) {
            Ok(n) => Ok(Some(n)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Attempts to receive a datagram, returning `Ok(None)` instead of
    /// `WouldBlock` when no data is available.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than `WouldBlock`.
    pub fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, Endpoint)>> {
        match self.inner.recv_from(buf) {
            Ok((n, addr)) => Ok(Some((n, Endpoint::from(addr)))),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Source for UdpSocket {
    fn register(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        self.inner.register(registry, token, interests)
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        self.inner.reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        self.inner.deregister(registry)
    }
}

/// UDP discard port, used as the connect target for route discovery.
const DISCARD_PORT: u16 = 9;

/// Returns the local IP address the OS would use to reach `to`.
///
/// Connects a throwaway UDP socket toward the destination (no packet is
/// sent) and reads back the local address the kernel picked. Falls back to
/// the loopback address of the matching family if anything fails.
#[must_use]
pub fn outbound_ip(to: IpAddr) -> IpAddr {
    fn probe(to: IpAddr) -> io::Result<IpAddr> {
        let bind_any = if to.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = std::net::UdpSocket::bind(bind_any)?;
        socket.connect((to, DISCARD_PORT))?;
        Ok(socket.local_addr()?.ip())
    }

    probe(to).unwrap_or(match to {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_bind_and_local_addr() {
        let socket = UdpSocket::bind(Endpoint::localhost(0)).unwrap();
        let addr = socket.local_addr().unwrap();
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_ne!(addr.port(), 0); // OS assigned a port
    }

    #[test]
    fn socket_send_recv_loopback() {
        let sender = UdpSocket::bind(Endpoint::localhost(0)).unwrap();
        let receiver = UdpSocket::bind(Endpoint::localhost(0)).unwrap();
        let receiver_addr = receiver.local_addr().unwrap();

        let msg = b"CONNECT:127.0.0.1:9999";
        let sent = sender.try_send_to(msg, receiver_addr).unwrap();
        assert_eq!(sent, Some(msg.len()));

        // Non-blocking: give the loopback delivery a moment.
        let mut buf = [0u8; 64];
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(1);
        loop {
            match receiver.try_recv_from(&mut buf).unwrap() {
                Some((n, from)) => {
                    assert_eq!(&buf[..n], msg);
                    assert_eq!(from, sender.local_addr().unwrap());
                    break;
                }
                None if std::time::Instant::now() < deadline => {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
                None => panic!("datagram never arrived"),
            }
        }
    }

    #[test]
    fn socket_try_recv_empty() {
        let socket = UdpSocket::bind(Endpoint::localhost(0)).unwrap();
        let mut buf = [0u8; 64];
        assert!(socket.try_recv_from(&mut buf).unwrap().is_none());
    }

    #[test]
    fn outbound_ip_for_loopback_is_loopback() {
        assert_eq!(
            outbound_ip(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }
}
