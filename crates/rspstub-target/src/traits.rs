use crate::error::{Result, TargetError};

/// Register, memory and execution-control access to a debug target.
///
/// Register images are raw bytes in target byte order; the session hex
/// encodes them for the wire. Methods take `&mut self` because every session
/// owns its target exclusively.
pub trait Target {
    /// Read the general register file as one image.
    fn read_registers(&mut self) -> Result<Vec<u8>>;

    /// Replace the general register file from an image.
    fn write_registers(&mut self, image: &[u8]) -> Result<()>;

    /// Read `len` bytes starting at `addr`.
    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>>;

    /// Write `data` starting at `addr`.
    fn write_memory(&mut self, addr: u64, data: &[u8]) -> Result<()>;

    /// Resume execution, optionally at `addr`.
    ///
    /// Execution proceeds independently of the protocol engine; no stop
    /// reply is produced by this call.
    fn resume(&mut self, addr: Option<u64>) -> Result<()>;

    /// Execute a single instruction, optionally starting at `addr`.
    fn step(&mut self, _addr: Option<u64>) -> Result<()> {
        Err(TargetError::Unsupported("single-step"))
    }
}

impl<T: Target + ?Sized> Target for &mut T {
    fn read_registers(&mut self) -> Result<Vec<u8>> {
        (**self).read_registers()
    }

    fn write_registers(&mut self, image: &[u8]) -> Result<()> {
        (**self).write_registers(image)
    }

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>> {
        (**self).read_memory(addr, len)
    }

    fn write_memory(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        (**self).write_memory(addr, data)
    }

    fn resume(&mut self, addr: Option<u64>) -> Result<()> {
        (**self).resume(addr)
    }

    fn step(&mut self, addr: Option<u64>) -> Result<()> {
        (**self).step(addr)
    }
}

impl<T: Target + ?Sized> Target for Box<T> {
    fn read_registers(&mut self) -> Result<Vec<u8>> {
        (**self).read_registers()
    }

    fn write_registers(&mut self, image: &[u8]) -> Result<()> {
        (**self).write_registers(image)
    }

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>> {
        (**self).read_memory(addr, len)
    }

    fn write_memory(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        (**self).write_memory(addr, data)
    }

    fn resume(&mut self, addr: Option<u64>) -> Result<()> {
        (**self).resume(addr)
    }

    fn step(&mut self, addr: Option<u64>) -> Result<()> {
        (**self).step(addr)
    }
}
