//! Single-connection TCP transport.
//!
//! A debugger talks to the stub over exactly one TCP connection. The
//! [`TcpTransport`] binds a listening socket, accepts one peer and closes the
//! listener again, handing back an [`RspStream`] that everything above this
//! layer reads from and writes to.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::RspStream;
pub use tcp::TcpTransport;
