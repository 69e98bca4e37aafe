use std::io::{Read, Write};
use std::net::SocketAddr;

use rspstub_packet::{Event, Packet, PacketError, PacketReader, PacketWriter};
use rspstub_target::Target;
use rspstub_transport::RspStream;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ack::{acknowledge, Acknowledgment};
use crate::config::SessionConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::reply::Reply;

/// Why a session finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The debugger closed the stream.
    PeerClosed,
    /// The debugger sent `D`.
    Detached,
    /// The debugger sent `k`.
    Killed,
}

/// Counters collected over one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Packets received, valid or not.
    pub packets: u64,
    /// Packets answered with `-`.
    pub checksum_failures: u64,
    /// Packets discarded by the framer.
    pub framing_errors: u64,
    /// Bare `+` from the debugger.
    pub peer_acks: u64,
    /// Bare `-` from the debugger.
    pub peer_naks: u64,
    /// Reply packets written, retransmissions included.
    pub replies: u64,
    /// Notifications received.
    pub notifications: u64,
}

/// One debugger session over a stream pair.
///
/// Owns all protocol state for the session: framer buffers, the last reply
/// for retransmission, the attachment flag and the target. Processing is
/// strictly sequential; a packet is fully handled before the next read.
pub struct Connection<R, W, T> {
    reader: PacketReader<R>,
    writer: PacketWriter<W>,
    dispatcher: Dispatcher<T>,
    stats: SessionStats,
    peer: Option<SocketAddr>,
}

impl<R: Read, W: Write, T: Target> Connection<R, W, T> {
    /// Build a session from a reader/writer pair.
    pub fn new(
        reader: PacketReader<R>,
        writer: PacketWriter<W>,
        target: T,
        config: &SessionConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            dispatcher: Dispatcher::new(target, config),
            stats: SessionStats::default(),
            peer: None,
        }
    }

    /// Run until the debugger closes, detaches or kills the session.
    pub fn serve(&mut self) -> Result<SessionEnd> {
        loop {
            if let Some(end) = self.process_next()? {
                info!(
                    end = ?end,
                    packets = self.stats.packets,
                    replies = self.stats.replies,
                    "session finished"
                );
                return Ok(end);
            }
        }
    }

    /// Read and handle a single event.
    ///
    /// Returns `Ok(Some(_))` once the session is over.
    pub fn process_next(&mut self) -> Result<Option<SessionEnd>> {
        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(PacketError::ConnectionClosed) => {
                info!(peer = ?self.peer, "debugger closed connection");
                return Ok(Some(SessionEnd::PeerClosed));
            }
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "discarding packet");
                self.stats.framing_errors += 1;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        match event {
            Event::Packet(packet) => self.handle_packet(&packet),
            Event::Notification(packet) => {
                self.stats.notifications += 1;
                self.writer.send_ack()?;
                on_notification(&packet);
                Ok(None)
            }
            Event::PeerAck => {
                self.stats.peer_acks += 1;
                debug!("debugger accepted reply");
                Ok(None)
            }
            Event::PeerNak => {
                self.stats.peer_naks += 1;
                if self.writer.resend_last()? {
                    self.stats.replies += 1;
                } else {
                    debug!("retransmission requested before any reply");
                }
                Ok(None)
            }
        }
    }

    fn handle_packet(&mut self, packet: &Packet) -> Result<Option<SessionEnd>> {
        self.stats.packets += 1;
        if acknowledge(&mut self.writer, packet)? == Acknowledgment::Rejected {
            self.stats.checksum_failures += 1;
            return Ok(None);
        }

        match self.dispatcher.dispatch(&packet.body) {
            Reply::Packet(body) => {
                self.send(&body)?;
                Ok(None)
            }
            Reply::Silent => Ok(None),
            Reply::Final(body) => {
                self.send(&body)?;
                info!("debugger detached");
                Ok(Some(SessionEnd::Detached))
            }
            Reply::Close => {
                info!("debugger killed session");
                Ok(Some(SessionEnd::Killed))
            }
        }
    }

    fn send(&mut self, body: &[u8]) -> Result<()> {
        self.writer.send_packet(body)?;
        self.stats.replies += 1;
        Ok(())
    }

    /// Counters collected so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Address of the connected debugger, when served over TCP.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// The dispatcher, for inspecting target and attachment state.
    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Tear the session apart and return the target.
    pub fn into_target(self) -> T {
        self.dispatcher.into_target()
    }

    /// Borrow the underlying writer stream.
    pub fn writer_ref(&self) -> &W {
        self.writer.get_ref()
    }
}

impl<T: Target> Connection<RspStream, RspStream, T> {
    /// Build a session over an accepted stream, applying the configured
    /// timeouts to both halves.
    pub fn from_stream(stream: RspStream, target: T, config: &SessionConfig) -> Result<Self> {
        let peer = stream.peer_addr();
        let reader_stream = stream.try_clone()?;

        let reader = PacketReader::with_config_stream(reader_stream, config.packet.clone())?;
        let writer = PacketWriter::with_config_stream(stream, config.packet.clone())?;

        let mut connection = Self::new(reader, writer, target, config);
        connection.peer = Some(peer);
        Ok(connection)
    }
}

fn on_notification(packet: &Packet) {
    debug!(
        body = %String::from_utf8_lossy(&packet.body),
        valid = packet.is_valid(),
        "notification"
    );
}
