//! Checksummed packet framing for the debugger's remote serial protocol.
//!
//! Every exchange on the wire is one of:
//! - A packet `$<body>#<hh>` where `<hh>` is the two-digit uppercase hex of
//!   the body's byte sum modulo 256
//! - A notification `%<body>#<hh>`, framed the same way
//! - A single acknowledgment byte, `+` (accept) or `-` (retransmit)
//!
//! [`PacketReader`] turns a byte stream into [`Event`]s, [`PacketWriter`]
//! emits acknowledgments and reply packets.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod hex;
pub mod reader;
pub mod writer;

pub use checksum::{checksum, parse_hex_pair, render};
pub use codec::{
    encode_packet, Event, Packet, PacketConfig, PacketDecoder, DEFAULT_MAX_BODY_LEN,
    FRAMING_OVERHEAD,
};
pub use error::{PacketError, Result};
pub use reader::PacketReader;
pub use writer::PacketWriter;
