use rspstub_packet::hex::encode_hex;

/// What a handler wants written back after a packet has been acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send one packet with this body. An empty body means "not supported".
    Packet(Vec<u8>),
    /// Send nothing. Used while the target runs after `c`.
    Silent,
    /// Send one packet, then end the session.
    Final(Vec<u8>),
    /// End the session without replying.
    Close,
}

impl Reply {
    /// Empty body: the protocol's "command not supported".
    pub fn empty() -> Self {
        Reply::Packet(Vec::new())
    }

    /// `OK`.
    pub fn ok() -> Self {
        Reply::Packet(b"OK".to_vec())
    }

    /// `E NN` with `NN` as two uppercase hex digits.
    pub fn error(code: u8) -> Self {
        Reply::Packet(format!("E{code:02X}").into_bytes())
    }

    /// Stop reply carrying a signal number, e.g. `S05` for SIGTRAP.
    pub fn stopped(signal: u8) -> Self {
        Reply::Packet(format!("S{signal:02X}").into_bytes())
    }

    /// A text body.
    pub fn text(body: impl Into<String>) -> Self {
        Reply::Packet(body.into().into_bytes())
    }

    /// Raw bytes rendered as hex pairs.
    pub fn hex(bytes: &[u8]) -> Self {
        let mut body = Vec::with_capacity(bytes.len() * 2);
        encode_hex(bytes, &mut body);
        Reply::Packet(body)
    }

    /// The packet body this reply sends, if any.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Reply::Packet(body) | Reply::Final(body) => Some(body),
            Reply::Silent | Reply::Close => None,
        }
    }

    /// Whether the session ends after this reply.
    pub fn ends_session(&self) -> bool {
        matches!(self, Reply::Final(_) | Reply::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_two_hex_digits() {
        assert_eq!(Reply::error(0x0E).body(), Some(&b"E0E"[..]));
        assert_eq!(Reply::error(1).body(), Some(&b"E01"[..]));
    }

    #[test]
    fn stop_reply() {
        assert_eq!(Reply::stopped(5).body(), Some(&b"S05"[..]));
    }

    #[test]
    fn hex_reply() {
        assert_eq!(Reply::hex(&[0xDE, 0xAD]).body(), Some(&b"DEAD"[..]));
        assert_eq!(Reply::hex(&[]), Reply::empty());
    }

    #[test]
    fn session_ending_replies() {
        assert!(Reply::Final(b"OK".to_vec()).ends_session());
        assert!(Reply::Close.ends_session());
        assert!(!Reply::ok().ends_session());
        assert!(!Reply::Silent.ends_session());
        assert_eq!(Reply::Close.body(), None);
    }
}
