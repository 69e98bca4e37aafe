use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::RspStream;

/// TCP transport serving a single debugger connection.
///
/// The listening socket lives only until the first peer is accepted.
/// [`TcpTransport::accept_one`] consumes the transport, so the listener is
/// closed as soon as a connection is established and further connection
/// attempts are refused.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on `host:port`.
    ///
    /// Port `0` asks the OS for an ephemeral port; use
    /// [`TcpTransport::local_addr`] to discover it.
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let addr = resolve(host, port)?;
        Self::bind_addr(addr)
    }

    /// Bind and listen on an already resolved address.
    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(
            transport = "tcp",
            %local_addr,
            "listening for debugger connection"
        );

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept exactly one incoming connection (blocking) and close the listener.
    pub fn accept_one(self) -> Result<RspStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        drop(self.listener);
        debug!(%peer, "accepted connection; listener closed");
        RspStream::from_tcp(stream)
    }

    /// Connect to a listening stub (blocking).
    pub fn connect(addr: SocketAddr) -> Result<RspStream> {
        let stream =
            TcpStream::connect(addr).map_err(|source| TransportError::Connect { addr, source })?;
        debug!(%addr, "connected to stub");
        RspStream::from_tcp(stream)
    }

    /// The address this transport is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Address {
            addr: format!("{host}:{port}"),
            source,
        })?;
    addrs.next().ok_or_else(|| TransportError::Address {
        addr: format!("{host}:{port}"),
        source: std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "address resolved to nothing",
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_accept_connect() {
        let transport = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let addr = transport.local_addr();
        assert_ne!(addr.port(), 0);

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect(addr).unwrap();
            client.write_all(b"+$g#67").unwrap();
        });

        let mut server = transport.accept_one().unwrap();
        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"+$g#67");

        handle.join().unwrap();
    }

    #[test]
    fn test_listener_closed_after_accept() {
        let transport = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let addr = transport.local_addr();

        let first = std::thread::spawn(move || TcpTransport::connect(addr).unwrap());
        let _server = transport.accept_one().unwrap();
        let _client = first.join().unwrap();

        let second = TcpTransport::connect(addr);
        assert!(matches!(second, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_bind_rejects_address_in_use() {
        let transport = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let addr = transport.local_addr();

        let result = TcpTransport::bind_addr(addr);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_bind_rejects_unresolvable_host() {
        let result = TcpTransport::bind("not a host name", 0);
        assert!(matches!(result, Err(TransportError::Address { .. })));
    }

    #[test]
    fn test_stream_reports_peer_addr() {
        let transport = TcpTransport::bind("127.0.0.1", 0).unwrap();
        let addr = transport.local_addr();

        let client = std::thread::spawn(move || TcpTransport::connect(addr).unwrap());
        let server = transport.accept_one().unwrap();
        let client = client.join().unwrap();

        assert_eq!(server.peer_addr(), client.local_addr().unwrap());
        assert_eq!(client.peer_addr(), addr);
        assert!(format!("{server:?}").contains("tcp"));
    }
}
