use tracing::debug;

use crate::error::{Result, TargetError};
use crate::traits::Target;

const REGISTER_WIDTH: usize = 4;
const INSTRUCTION_WIDTH: u32 = 4;

/// Shape of a [`SimTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Number of general registers. The program counter follows them.
    pub register_count: usize,
    /// First address of the memory image.
    pub memory_base: u64,
    /// Size of the memory image in bytes.
    pub memory_size: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            register_count: 32,
            memory_base: 0,
            memory_size: 64 * 1024,
        }
    }
}

/// An in-memory 32-bit machine with a flat memory image.
///
/// The register image is `register_count` general registers followed by the
/// program counter, each 4 bytes little-endian. Execution control only moves
/// the program counter; there is no instruction decoder behind it.
#[derive(Debug, Clone)]
pub struct SimTarget {
    registers: Vec<u32>,
    memory: Vec<u8>,
    memory_base: u64,
    resumes: u64,
    steps: u64,
}

impl SimTarget {
    /// Create a zeroed machine.
    pub fn new(config: SimConfig) -> Self {
        Self {
            registers: vec![0; config.register_count + 1],
            memory: vec![0; config.memory_size],
            memory_base: config.memory_base,
            resumes: 0,
            steps: 0,
        }
    }

    /// Current program counter.
    pub fn pc(&self) -> u32 {
        self.registers[self.pc_index()]
    }

    /// Set the program counter.
    pub fn set_pc(&mut self, pc: u32) {
        let idx = self.pc_index();
        self.registers[idx] = pc;
    }

    /// Value of general register `index`, if it exists.
    pub fn register(&self, index: usize) -> Option<u32> {
        self.registers.get(index).copied()
    }

    /// Set general register `index`. Returns false if it does not exist.
    pub fn set_register(&mut self, index: usize, value: u32) -> bool {
        match self.registers.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Size of the register image in bytes.
    pub fn register_image_len(&self) -> usize {
        self.registers.len() * REGISTER_WIDTH
    }

    /// Address range covered by the memory image.
    ///
    /// The end saturates at `u64::MAX` for an image ending at the top of the
    /// address space.
    pub fn memory_range(&self) -> std::ops::Range<u64> {
        self.memory_base..self.memory_base.saturating_add(self.memory.len() as u64)
    }

    /// How many times execution was resumed.
    pub fn resume_count(&self) -> u64 {
        self.resumes
    }

    /// How many single steps were executed.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    fn pc_index(&self) -> usize {
        self.registers.len() - 1
    }

    fn span(&self, addr: u64, len: usize) -> Result<std::ops::Range<usize>> {
        let fault = TargetError::Fault { addr, len };
        let offset = addr.checked_sub(self.memory_base).ok_or(fault.clone())?;
        let start = usize::try_from(offset).map_err(|_| fault.clone())?;
        let end = start.checked_add(len).ok_or(fault.clone())?;
        if end > self.memory.len() {
            return Err(fault);
        }
        Ok(start..end)
    }

    fn jump(&mut self, addr: Option<u64>) -> Result<()> {
        if let Some(addr) = addr {
            let pc = u32::try_from(addr).map_err(|_| TargetError::Fault { addr, len: 0 })?;
            self.set_pc(pc);
        }
        Ok(())
    }
}

impl Default for SimTarget {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Target for SimTarget {
    fn read_registers(&mut self) -> Result<Vec<u8>> {
        Ok(self
            .registers
            .iter()
            .flat_map(|reg| reg.to_le_bytes())
            .collect())
    }

    fn write_registers(&mut self, image: &[u8]) -> Result<()> {
        let expected = self.register_image_len();
        if image.len() != expected {
            return Err(TargetError::RegisterImage {
                len: image.len(),
                expected,
            });
        }
        for (slot, chunk) in self
            .registers
            .iter_mut()
            .zip(image.chunks_exact(REGISTER_WIDTH))
        {
            *slot = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>> {
        let span = self.span(addr, len)?;
        Ok(self.memory[span].to_vec())
    }

    fn write_memory(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let span = self.span(addr, data.len())?;
        self.memory[span].copy_from_slice(data);
        Ok(())
    }

    fn resume(&mut self, addr: Option<u64>) -> Result<()> {
        self.jump(addr)?;
        self.resumes += 1;
        debug!(pc = self.pc(), "resuming target");
        Ok(())
    }

    fn step(&mut self, addr: Option<u64>) -> Result<()> {
        self.jump(addr)?;
        let next = self.pc().wrapping_add(INSTRUCTION_WIDTH);
        self.set_pc(next);
        self.steps += 1;
        debug!(pc = next, "stepped target");
        Ok(())
    }
}
