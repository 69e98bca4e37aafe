use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use rspstub_transport::RspStream;
use tracing::debug;

use crate::codec::{encode_packet, PacketConfig, ACK, NAK};
use crate::error::{PacketError, Result};
use crate::reader::transport_to_packet_error;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes acknowledgments and reply packets to any `Write` stream.
///
/// The most recently sent packet is retained so it can be retransmitted when
/// the peer answers it with `-`.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    config: PacketConfig,
}

impl<T: Write> PacketWriter<T> {
    /// Create a new packet writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, PacketConfig::default())
    }

    /// Create a new packet writer with explicit configuration.
    pub fn with_config(inner: T, config: PacketConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Acknowledge a received packet with `+`.
    pub fn send_ack(&mut self) -> Result<()> {
        write_all(&mut self.inner, &[ACK])?;
        self.flush()
    }

    /// Reject a received packet with `-`, asking the peer to retransmit.
    pub fn send_nak(&mut self) -> Result<()> {
        write_all(&mut self.inner, &[NAK])?;
        self.flush()
    }

    /// Frame `body` as `$body#hh` and send it in a single write.
    pub fn send_packet(&mut self, body: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_packet(body, &mut self.buf);

        debug!(
            packet = %String::from_utf8_lossy(&self.buf),
            "sending packet"
        );

        write_all(&mut self.inner, &self.buf)?;
        self.flush()
    }

    /// Retransmit the last packet sent.
    ///
    /// Returns `Ok(false)` when nothing has been sent yet.
    pub fn resend_last(&mut self) -> Result<bool> {
        if self.buf.is_empty() {
            return Ok(false);
        }

        debug!(
            packet = %String::from_utf8_lossy(&self.buf),
            "resending packet"
        );

        write_all(&mut self.inner, &self.buf)?;
        self.flush()?;
        Ok(true)
    }

    /// The framed bytes of the last packet sent, if any.
    pub fn last_packet(&self) -> Option<&[u8]> {
        if self.buf.is_empty() {
            None
        } else {
            Some(&self.buf)
        }
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(PacketError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current packet writer configuration.
    pub fn config(&self) -> &PacketConfig {
        &self.config
    }
}

fn write_all<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(PacketError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(PacketError::Io(err)),
        }
    }
    Ok(())
}

impl PacketWriter<RspStream> {
    /// Create a packet writer for `RspStream` and apply write timeout from config.
    pub fn with_config_stream(inner: RspStream, config: PacketConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_packet_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn written(writer: PacketWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_packet() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_packet(b"PacketSize=255").unwrap();
        assert_eq!(written(writer), b"$PacketSize=255#CC");
    }

    #[test]
    fn write_empty_packet() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_packet(b"").unwrap();
        assert_eq!(written(writer), b"$#00");
    }

    #[test]
    fn write_acks() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send_ack().unwrap();
        writer.send_nak().unwrap();
        assert_eq!(written(writer), b"+-");
    }

    #[test]
    fn acks_do_not_replace_last_packet() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        assert!(writer.last_packet().is_none());

        writer.send_packet(b"OK").unwrap();
        writer.send_ack().unwrap();
        assert_eq!(writer.last_packet(), Some(&b"$OK#9A"[..]));
    }

    #[test]
    fn resend_last_repeats_packet() {
        let mut writer = PacketWriter::new(Cursor::new(Vec::<u8>::new()));
        assert!(!writer.resend_last().unwrap());

        writer.send_packet(b"OK").unwrap();
        assert!(writer.resend_last().unwrap());
        assert_eq!(written(writer), b"$OK#9A$OK#9A");
    }

    #[test]
    fn write_zero_is_connection_closed() {
        let mut writer = PacketWriter::new(ZeroWriter);
        let err = writer.send_packet(b"OK").unwrap_err();
        assert!(matches!(err, PacketError::ConnectionClosed));
    }

    #[test]
    fn write_error_propagates() {
        let mut writer = PacketWriter::new(BrokenPipe);
        let err = writer.send_ack().unwrap_err();
        assert!(matches!(err, PacketError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn partial_writes_are_completed() {
        let mut writer = PacketWriter::new(OneByteWriter { out: Vec::new() });
        writer.send_packet(b"m1").unwrap();
        assert_eq!(writer.into_inner().out, b"$m1#9E");
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct OneByteWriter {
        out: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            match buf.first() {
                Some(&byte) => {
                    self.out.push(byte);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
