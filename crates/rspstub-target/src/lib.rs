//! Target adapter: the surface a debug session drives.
//!
//! The protocol engine never touches a simulator directly. It goes through
//! the [`Target`] trait, which exposes register and memory access plus
//! execution control. [`SimTarget`] is a small in-memory machine that
//! implements it for the CLI and for tests.

pub mod error;
pub mod sim;
pub mod traits;

pub use error::{Result, TargetError};
pub use sim::{SimConfig, SimTarget};
pub use traits::Target;
