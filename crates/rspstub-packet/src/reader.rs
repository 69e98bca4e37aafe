use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use rspstub_transport::RspStream;
use tracing::debug;

use crate::codec::{Event, PacketConfig, PacketDecoder};
use crate::error::{PacketError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads protocol events from any `Read` stream.
///
/// Handles partial reads internally. Callers always get complete packets or
/// single acknowledgment bytes, never fragments.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: PacketDecoder,
    config: PacketConfig,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: PacketDecoder::new(config.max_body_len),
            config,
        }
    }

    /// Read the next protocol event (blocking).
    ///
    /// Framing errors (`FrameTooLarge`, `InvalidHex`) discard the offending
    /// packet and are returned so the caller can log them; the next call
    /// resumes with the bytes that followed. Returns
    /// `Err(PacketError::ConnectionClosed)` when EOF is reached.
    pub fn read_event(&mut self) -> Result<Event> {
        loop {
            if let Some(event) = self.decoder.decode(&mut self.buf)? {
                return Ok(event);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(PacketError::Io(err)),
            };

            if read == 0 {
                if !self.decoder.is_idle() {
                    debug!("connection closed mid-packet");
                    self.decoder.reset();
                }
                return Err(PacketError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum body length for subsequent packets.
    pub fn set_max_body_len(&mut self, max_body_len: usize) {
        self.config.max_body_len = max_body_len;
        self.decoder.set_max_body_len(max_body_len);
    }

    /// Current packet reader configuration.
    pub fn config(&self) -> &PacketConfig {
        &self.config
    }
}

impl PacketReader<RspStream> {
    /// Create a packet reader for `RspStream` and apply read timeout from config.
    pub fn with_config_stream(inner: RspStream, config: PacketConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_packet_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_packet_error(err: rspstub_transport::TransportError) -> PacketError {
    match err {
        rspstub_transport::TransportError::Io(io)
        | rspstub_transport::TransportError::Accept(io) => PacketError::Io(io),
        rspstub_transport::TransportError::Bind { source, .. }
        | rspstub_transport::TransportError::Connect { source, .. }
        | rspstub_transport::TransportError::Address { source, .. } => PacketError::Io(source),
    }
}
