use std::io::Write;

use rspstub_packet::{Packet, PacketError, PacketWriter};
use tracing::{debug, warn};

/// Outcome of checking a received packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgment {
    /// Checksum matched; `+` was sent and the body may be dispatched.
    Accepted,
    /// Checksum did not match; `-` was sent and the body must be dropped.
    Rejected,
}

impl Acknowledgment {
    pub fn is_accepted(self) -> bool {
        matches!(self, Acknowledgment::Accepted)
    }
}

/// Verify `packet` and answer it with `+` or `-`.
///
/// Retransmission after `-` is up to the peer. Only write failures are
/// returned as errors.
pub fn acknowledge<W: Write>(
    writer: &mut PacketWriter<W>,
    packet: &Packet,
) -> rspstub_packet::Result<Acknowledgment> {
    match packet.verify() {
        Ok(()) => {
            debug!(
                body = %String::from_utf8_lossy(&packet.body),
                checksum = packet.checksum,
                "received packet"
            );
            writer.send_ack()?;
            Ok(Acknowledgment::Accepted)
        }
        Err(PacketError::ChecksumMismatch { expected, received }) => {
            warn!(
                body = %String::from_utf8_lossy(&packet.body),
                expected,
                received,
                "checksum mismatch, requesting retransmission"
            );
            writer.send_nak()?;
            Ok(Acknowledgment::Rejected)
        }
        Err(err) => Err(err),
    }
}
