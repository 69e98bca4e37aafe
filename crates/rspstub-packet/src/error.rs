/// Errors that can occur during packet framing and encoding.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// The packet body grew past the configured maximum before `#` was seen.
    #[error("packet body too large (max {max} bytes)")]
    FrameTooLarge { max: usize },

    /// A byte that should have been a hex digit was not.
    #[error("invalid hex digit 0x{byte:02X}")]
    InvalidHex { byte: u8 },

    /// A hex string had an odd number of digits.
    #[error("odd-length hex string ({len} digits)")]
    OddHexLength { len: usize },

    /// The transmitted checksum does not match the body.
    #[error("checksum mismatch (expected 0x{expected:02X}, received 0x{received:02X})")]
    ChecksumMismatch { expected: u8, received: u8 },

    /// An I/O error occurred while reading or writing packets.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,
}

impl PacketError {
    /// Whether the connection can keep going after this error.
    ///
    /// Framing and checksum errors discard one packet; I/O errors and a
    /// closed connection end the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PacketError::FrameTooLarge { .. }
                | PacketError::InvalidHex { .. }
                | PacketError::OddHexLength { .. }
                | PacketError::ChecksumMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PacketError>;
