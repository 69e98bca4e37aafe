/// errno-style code for a bad address.
pub const EFAULT: u8 = 0x0E;
/// errno-style code for an invalid argument.
pub const EINVAL: u8 = 0x16;
/// errno-style code for an unimplemented operation.
pub const ENOSYS: u8 = 0x26;

/// Errors a target adapter reports back to the session.
///
/// None of these end the session. Each one becomes an `E NN` reply carrying
/// [`TargetError::code`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// A memory access fell outside the target's address space.
    #[error("memory fault at 0x{addr:x} ({len} bytes)")]
    Fault { addr: u64, len: usize },

    /// A register image had the wrong size.
    #[error("register image is {len} bytes, expected {expected}")]
    RegisterImage { len: usize, expected: usize },

    /// The target does not implement this operation.
    #[error("{0} not supported by target")]
    Unsupported(&'static str),

    /// Target-specific failure with an explicit error code.
    #[error("target error 0x{0:02X}")]
    Code(u8),
}

impl TargetError {
    /// The errno-style code sent to the debugger as `E NN`.
    pub fn code(&self) -> u8 {
        match self {
            TargetError::Fault { .. } => EFAULT,
            TargetError::RegisterImage { .. } => EINVAL,
            TargetError::Unsupported(_) => ENOSYS,
            TargetError::Code(code) => *code,
        }
    }
}

pub type Result<T> = std::result::Result<T, TargetError>;
