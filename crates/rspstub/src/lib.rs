//! Debug stub for the debugger remote serial protocol.
//!
//! rspstub lets a source-level debugger drive a simulated or emulated target
//! over TCP: it frames and checksums packets, acknowledges them, routes
//! commands to a target adapter and answers the debugger's capability
//! queries.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP listener that accepts a single debugger
//! - [`packet`]: `$body#hh` framing, checksums and acknowledgments
//! - [`target`]: the adapter trait a debug session drives, plus an in-memory machine
//! - [`session`]: command dispatch, queries and the serve loop (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use rspstub_transport::*;
}

/// Re-export packet types.
pub mod packet {
    pub use rspstub_packet::*;
}

/// Re-export target adapter types.
pub mod target {
    pub use rspstub_target::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use rspstub_session::*;
}
