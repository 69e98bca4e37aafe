//! Debugger session engine.
//!
//! This is the layer that speaks the protocol. A [`Connection`] reads
//! events through the packet framer, acknowledges each packet according to
//! its checksum, hands verified bodies to the [`Dispatcher`] and writes the
//! replies. One connection, one target, no shared state.

pub mod ack;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod features;
pub mod listener;
pub mod query;
pub mod reply;

pub use ack::{acknowledge, Acknowledgment};
pub use config::SessionConfig;
pub use connection::{Connection, SessionEnd, SessionStats};
pub use dispatch::{Command, Dispatcher};
pub use error::{CommandError, Result, SessionError};
pub use features::{supported_reply, Feature, FEATURE_TABLE};
pub use listener::StubListener;
pub use query::{Attachment, QueryKind};
pub use reply::Reply;
