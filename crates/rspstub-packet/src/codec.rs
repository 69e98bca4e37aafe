use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::checksum::{checksum, render};
use crate::error::{PacketError, Result};
use crate::hex::hex_value;

/// Default maximum body length: 0x255 bytes.
///
/// The protocol advertises packet sizes in hex, so this renders as
/// `PacketSize=255` in the `qSupported` reply. Debuggers read that value as
/// hex (597 bytes), so the bound is deliberately larger than a 254-byte body
/// buffer: it matches what is advertised, not a decimal reading of it.
pub const DEFAULT_MAX_BODY_LEN: usize = 0x255;

/// Framing bytes around a body: `$` + `#` + two checksum digits.
pub const FRAMING_OVERHEAD: usize = 4;

/// Packet start marker.
pub const PACKET_START: u8 = b'$';
/// Notification start marker.
pub const NOTIFICATION_START: u8 = b'%';
/// Body terminator, followed by two checksum digits.
pub const CHECKSUM_MARKER: u8 = b'#';
/// Positive acknowledgment.
pub const ACK: u8 = b'+';
/// Negative acknowledgment (request retransmission).
pub const NAK: u8 = b'-';

/// A framed body together with the checksum transmitted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The packet body, without framing.
    pub body: Bytes,
    /// The checksum as transmitted by the sender.
    pub checksum: u8,
}

impl Packet {
    /// Create a packet whose checksum matches its body.
    pub fn new(body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let checksum = checksum(&body);
        Self { body, checksum }
    }

    /// The checksum the body actually sums to.
    pub fn expected_checksum(&self) -> u8 {
        checksum(&self.body)
    }

    /// Check the transmitted checksum against the body.
    pub fn verify(&self) -> Result<()> {
        let expected = self.expected_checksum();
        if expected == self.checksum {
            Ok(())
        } else {
            Err(PacketError::ChecksumMismatch {
                expected,
                received: self.checksum,
            })
        }
    }

    /// Whether the transmitted checksum matches the body.
    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }

    /// The leading command byte, if the body is not empty.
    pub fn command(&self) -> Option<u8> {
        self.body.first().copied()
    }
}

/// A protocol event recognized on the inbound byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A complete `$…#hh` packet. The checksum has not been verified yet.
    Packet(Packet),
    /// A complete `%…#hh` notification.
    Notification(Packet),
    /// A bare `+`: the peer accepted our last reply.
    PeerAck,
    /// A bare `-`: the peer rejected our last reply.
    PeerNak,
}

/// Encode a body into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────┬──────────────┬─────┬───────────────────┐
/// │ '$' │ body         │ '#' │ checksum (2 hex)  │
/// │     │ (no $ or #)  │     │ sum(body) mod 256 │
/// └─────┴──────────────┴─────┴───────────────────┘
/// ```
pub fn encode_packet(body: &[u8], dst: &mut BytesMut) {
    dst.reserve(FRAMING_OVERHEAD + body.len());
    dst.put_u8(PACKET_START);
    dst.put_slice(body);
    dst.put_u8(CHECKSUM_MARKER);
    dst.put_slice(&render(checksum(body)));
}

/// Configuration for the packet codec.
#[derive(Debug, Clone)]
pub struct PacketConfig {
    /// Maximum body length in bytes. Default: [`DEFAULT_MAX_BODY_LEN`].
    pub max_body_len: usize,
    /// Read timeout for blocking operations. `None` blocks indefinitely.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            max_body_len: DEFAULT_MAX_BODY_LEN,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Packet,
    Notification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Body(Kind),
    ChecksumHi(Kind),
    ChecksumLo(Kind, u8),
    /// Dropping the rest of an oversized body up to its `#`.
    Discard,
    /// Dropping the checksum digits of an oversized packet; holds how many remain.
    DiscardChecksum(u8),
}

/// Byte-driven framing state machine.
///
/// Bytes outside a packet that are not `$`, `%`, `+` or `-` are protocol
/// garbage and are dropped. A bad checksum digit discards the partial packet
/// and returns to the idle state. An oversized body is reported once; the
/// rest of it, through its `#hh`, is swallowed so none of its bytes are read
/// as acknowledgments or notifications. A `$` in the swallowed tail starts a
/// new packet.
#[derive(Debug)]
pub struct PacketDecoder {
    state: State,
    body: BytesMut,
    max_body_len: usize,
}

impl PacketDecoder {
    /// Create a decoder bounding bodies to `max_body_len` bytes.
    pub fn new(max_body_len: usize) -> Self {
        Self {
            state: State::Idle,
            body: BytesMut::with_capacity(max_body_len),
            max_body_len,
        }
    }

    /// Decode the next event from `src`, consuming the bytes it used.
    ///
    /// Returns `Ok(None)` once `src` is drained without completing an event;
    /// partial packet state is kept for the next call. Bytes after a framing
    /// error stay in `src`.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Event>> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(event) = self.push(byte)? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    /// Feed a single byte through the state machine.
    pub fn push(&mut self, byte: u8) -> Result<Option<Event>> {
        match self.state {
            State::Idle => Ok(self.idle(byte)),
            State::Body(kind) => {
                if byte == CHECKSUM_MARKER {
                    self.state = State::ChecksumHi(kind);
                } else if self.body.len() >= self.max_body_len {
                    self.body.clear();
                    self.state = State::Discard;
                    return Err(PacketError::FrameTooLarge {
                        max: self.max_body_len,
                    });
                } else {
                    self.body.put_u8(byte);
                }
                Ok(None)
            }
            State::ChecksumHi(kind) => {
                let hi = self.checksum_digit(byte)?;
                self.state = State::ChecksumLo(kind, hi);
                Ok(None)
            }
            State::ChecksumLo(kind, hi) => {
                let lo = self.checksum_digit(byte)?;
                let packet = Packet {
                    body: self.body.split().freeze(),
                    checksum: (hi << 4) | lo,
                };
                self.state = State::Idle;
                Ok(Some(match kind {
                    Kind::Packet => Event::Packet(packet),
                    Kind::Notification => Event::Notification(packet),
                }))
            }
            State::Discard | State::DiscardChecksum(_) if byte == PACKET_START => {
                trace!("new packet while discarding oversized body");
                Ok(self.idle(byte))
            }
            State::Discard => {
                if byte == CHECKSUM_MARKER {
                    self.state = State::DiscardChecksum(2);
                }
                Ok(None)
            }
            State::DiscardChecksum(remaining) => {
                self.state = if remaining > 1 {
                    State::DiscardChecksum(remaining - 1)
                } else {
                    State::Idle
                };
                Ok(None)
            }
        }
    }

    /// Whether the decoder is between packets.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Drop any partial packet and return to the idle state.
    pub fn reset(&mut self) {
        self.body.clear();
        self.state = State::Idle;
    }

    /// Update the maximum body length for subsequent packets.
    pub fn set_max_body_len(&mut self, max_body_len: usize) {
        self.max_body_len = max_body_len;
    }

    /// Current maximum body length.
    pub fn max_body_len(&self) -> usize {
        self.max_body_len
    }

    fn idle(&mut self, byte: u8) -> Option<Event> {
        match byte {
            PACKET_START => {
                self.body.clear();
                self.state = State::Body(Kind::Packet);
                None
            }
            NOTIFICATION_START => {
                self.body.clear();
                self.state = State::Body(Kind::Notification);
                None
            }
            ACK => Some(Event::PeerAck),
            NAK => Some(Event::PeerNak),
            0 => None,
            other => {
                trace!(byte = other, "ignoring byte outside packet");
                None
            }
        }
    }

    fn checksum_digit(&mut self, byte: u8) -> Result<u8> {
        match hex_value(byte) {
            Some(value) => Ok(value),
            None => {
                self.reset();
                Err(PacketError::InvalidHex { byte })
            }
        }
    }
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_LEN)
    }
}
