use rspstub_packet::PacketError;

/// Errors that end a debugger session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error (bind, accept, stream setup).
    #[error("transport error: {0}")]
    Transport(#[from] rspstub_transport::TransportError),

    /// Packet-level I/O error.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Why a command's arguments could not be decoded.
///
/// These never end the session; the dispatcher answers them with an error
/// reply.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// A required separator or field is missing.
    #[error("malformed '{command}' packet: {reason}")]
    Malformed { command: char, reason: &'static str },

    /// A hex field could not be decoded.
    #[error("bad hex in '{command}' packet: {source}")]
    Hex {
        command: char,
        #[source]
        source: PacketError,
    },

    /// The requested reply would not fit in one packet.
    #[error("'{command}' reply of {len} bytes exceeds packet limit {max}")]
    TooLarge { command: char, len: usize, max: usize },
}

impl CommandError {
    pub(crate) fn hex(command: u8) -> impl FnOnce(PacketError) -> CommandError {
        move |source| CommandError::Hex {
            command: char::from(command),
            source,
        }
    }
}
