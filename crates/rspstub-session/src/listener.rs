use std::net::SocketAddr;

use rspstub_target::Target;
use rspstub_transport::{RspStream, TcpTransport};
use tracing::info;

use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::error::Result;

/// Waits for a single debugger to connect.
pub struct StubListener {
    transport: TcpTransport,
    config: SessionConfig,
}

impl StubListener {
    /// Bind to `host:port`. Port `0` picks an ephemeral port.
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        Ok(Self {
            transport: TcpTransport::bind(host, port)?,
            config: SessionConfig::default(),
        })
    }

    /// Override session config.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Accept one debugger and close the listening socket.
    pub fn accept<T: Target>(self, target: T) -> Result<Connection<RspStream, RspStream, T>> {
        let stream = self.transport.accept_one()?;
        info!(peer = %stream.peer_addr(), "debugger connected");
        Connection::from_stream(stream, target, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;

    use rspstub_target::SimTarget;

    use super::*;
    use crate::connection::SessionEnd;

    fn read_exact_len(stream: &mut TcpStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).unwrap();
        buf
    }

    #[test]
    fn serves_one_debugger_over_tcp() {
        let listener = StubListener::bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr();

        let server = thread::spawn(move || {
            let mut conn = listener.accept(SimTarget::default()).unwrap();
            let end = conn.serve().unwrap();
            (end, conn.stats())
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"$qSupported#37").unwrap();
        assert_eq!(read_exact_len(&mut client, 19), b"+$PacketSize=255#CC");

        client.write_all(b"+$qAttached#8F").unwrap();
        assert_eq!(read_exact_len(&mut client, 6), b"+$0#30");

        client.write_all(b"+$qSupported#00").unwrap();
        assert_eq!(read_exact_len(&mut client, 1), b"-");

        client.write_all(b"$D#44").unwrap();
        assert_eq!(read_exact_len(&mut client, 7), b"+$OK#9A");

        let (end, stats) = server.join().unwrap();
        assert_eq!(end, SessionEnd::Detached);
        assert_eq!(stats.checksum_failures, 1);
        assert_eq!(stats.peer_acks, 2);
    }

    #[test]
    fn listener_is_closed_after_accept() {
        let listener = StubListener::bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr();

        let server = thread::spawn(move || {
            let conn = listener.accept(SimTarget::default()).unwrap();
            assert!(conn.peer_addr().is_some());
            conn
        });

        let _first = TcpStream::connect(addr).unwrap();
        let conn = server.join().unwrap();
        assert!(TcpStream::connect(addr).is_err());
        drop(conn);
    }

    #[test]
    fn peer_close_ends_session() {
        let listener = StubListener::bind("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr();

        let server = thread::spawn(move || {
            let mut conn = listener.accept(SimTarget::default()).unwrap();
            conn.serve().unwrap()
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"$z#7A").unwrap();
        assert_eq!(read_exact_len(&mut client, 5), b"+$#00");
        drop(client);

        assert_eq!(server.join().unwrap(), SessionEnd::PeerClosed);
    }
}
