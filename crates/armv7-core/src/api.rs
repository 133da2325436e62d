//! Host-facing machine aggregate, configuration and step/run result types.

use crate::shifter;
use crate::{
    DecodedInstruction, Fault, Flags, InstructionKind, MappingPolicy, MemoryMap, Register,
    RegisterFile, RotateZeroPolicy, GENERAL_REGISTER_COUNT,
};

/// Initial stack pointer; the stack window ends exactly here.
pub const DEFAULT_STACK_BASE: u32 = 0xb00b_0000;

/// Configuration applied when a [`Machine`] is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Initial SP; the stack buffer is mapped immediately below it.
    pub stack_base: u32,
    /// Validation applied by [`Machine::add_mapping`].
    pub mapping_policy: MappingPolicy,
    /// Interpretation of an instruction-embedded `ROR #0`.
    pub rotate_zero: RotateZeroPolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_base: DEFAULT_STACK_BASE,
            mapping_policy: MappingPolicy::Lenient,
            rotate_zero: RotateZeroPolicy::PassThrough,
        }
    }
}

/// Register and flag state captured from a [`Machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuSnapshot {
    /// R0..R15 in index order.
    pub registers: [u32; GENERAL_REGISTER_COUNT],
    /// Packed N/Z/C/V word (CPSR layout).
    pub cpsr: u32,
}

/// Result of one successful [`crate::step_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Condition passed and the handler ran.
    Executed {
        /// Address the instruction was fetched from.
        pc: u32,
        /// Kind of the executed instruction.
        kind: InstructionKind,
    },
    /// Condition failed; only PC advanced.
    Skipped {
        /// Address the instruction was fetched from.
        pc: u32,
        /// Kind of the skipped instruction.
        kind: InstructionKind,
    },
}

impl StepOutcome {
    /// Fetch address of the stepped instruction.
    #[must_use]
    pub const fn pc(self) -> u32 {
        match self {
            Self::Executed { pc, .. } | Self::Skipped { pc, .. } => pc,
        }
    }

    /// Returns `true` when the handler ran.
    #[must_use]
    pub const fn is_executed(self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

/// Why [`crate::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of steps completed.
    StepLimit,
    /// A step failed; the machine is left as that step left it.
    Fault(Fault),
}

/// Aggregated result of a bounded [`crate::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Steps whose handler ran.
    pub executed: u64,
    /// Steps skipped by a failed condition.
    pub skipped: u64,
    /// Reason the run stopped.
    pub stop: StopReason,
}

impl RunOutcome {
    /// Total successful steps.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.executed + self.skipped
    }

    /// Fault that stopped the run, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        match &self.stop {
            StopReason::Fault(fault) => Some(fault),
            StopReason::StepLimit => None,
        }
    }
}

/// Machine state: registers, flags and the memory map for one session.
///
/// Backing buffers are borrowed for `'a`, so every registered window
/// outlives the machine by construction.
#[derive(Debug)]
pub struct Machine<'a> {
    registers: RegisterFile,
    flags: Flags,
    memory: MemoryMap<'a>,
    rotate_zero: RotateZeroPolicy,
}

impl<'a> Machine<'a> {
    /// Creates a machine with [`MachineConfig::default`] and `stack` mapped
    /// below [`DEFAULT_STACK_BASE`].
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] raised while mapping the stack.
    pub fn new(stack: &'a mut [u8]) -> Result<Self, Fault> {
        Self::with_config(stack, &MachineConfig::default())
    }

    /// Creates a machine with SP at `config.stack_base` and `stack` mapped at
    /// `stack_base - stack.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressSpaceOverflow`] when the stack is larger than
    /// the address space, or any fault from [`Machine::add_mapping`].
    pub fn with_config(stack: &'a mut [u8], config: &MachineConfig) -> Result<Self, Fault> {
        let base = config.stack_base;
        let len = u32::try_from(stack.len()).map_err(|_| Fault::AddressSpaceOverflow {
            address: base,
            len: stack.len() as u64,
        })?;

        let mut machine = Self {
            registers: RegisterFile::default(),
            flags: Flags::default(),
            memory: MemoryMap::new(config.mapping_policy),
            rotate_zero: config.rotate_zero,
        };
        machine.memory.add_mapping(stack, base.wrapping_sub(len))?;
        machine.set_reg(Register::SP, base);
        Ok(machine)
    }

    /// Registers another memory window.
    ///
    /// # Errors
    ///
    /// See [`MemoryMap::add_mapping`].
    pub fn add_mapping(&mut self, backing: &'a mut [u8], address: u32) -> Result<(), Fault> {
        self.memory.add_mapping(backing, address)
    }

    /// Memory map in lookup order.
    #[must_use]
    pub const fn memory(&self) -> &MemoryMap<'a> {
        &self.memory
    }

    /// `ROR #0` policy used by [`Machine::resolve_operand`].
    #[must_use]
    pub const fn rotate_zero(&self) -> RotateZeroPolicy {
        self.rotate_zero
    }

    /// Reads register `index`.
    ///
    /// Out-of-range indices read as `0`; use [`Machine::try_register`] to
    /// tell them apart.
    #[must_use]
    pub fn register(&self, index: usize) -> u32 {
        self.try_register(index).unwrap_or_else(|| {
            tracing::warn!("Read of invalid register index {index}, returning 0");
            0
        })
    }

    /// Reads register `index`, or `None` when `index >= 16`.
    #[must_use]
    pub const fn try_register(&self, index: usize) -> Option<u32> {
        self.registers.try_get(index)
    }

    /// Writes register `index`. Out-of-range indices are ignored.
    pub fn set_register(&mut self, index: usize, value: u32) {
        if !self.registers.set(index, value) {
            tracing::warn!("Write of {value:#010x} to invalid register index {index} ignored");
        }
    }

    /// Reads `reg`.
    #[must_use]
    pub const fn reg(&self, reg: Register) -> u32 {
        self.registers.reg(reg)
    }

    /// Writes `reg`.
    pub const fn set_reg(&mut self, reg: Register, value: u32) {
        self.registers.set_reg(reg, value);
    }

    /// Program counter (R15).
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.reg(Register::PC)
    }

    /// Sets the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.set_reg(Register::PC, value);
    }

    /// Current condition flags.
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Replaces the condition flags.
    pub const fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Mutable access to the condition flags.
    pub const fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    /// Flags packed in the CPSR layout; all other bits are zero.
    #[must_use]
    pub const fn flags_packed(&self) -> u32 {
        self.flags.to_cpsr()
    }

    /// Unpacks N/Z/C/V from `word`, ignoring every other bit.
    pub const fn set_flags_packed(&mut self, word: u32) {
        self.flags = Flags::from_cpsr(word);
    }

    /// Reads a byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when `address` is not mapped.
    pub fn read8(&self, address: u32) -> Result<u8, Fault> {
        self.memory.read_u8(address)
    }

    /// Reads a little-endian halfword.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the range is not mapped.
    pub fn read16(&self, address: u32) -> Result<u16, Fault> {
        self.memory.read_u16(address)
    }

    /// Reads a little-endian word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the range is not mapped.
    pub fn read32(&self, address: u32) -> Result<u32, Fault> {
        self.memory.read_u32(address)
    }

    /// Writes a byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when `address` is not mapped.
    pub fn write8(&mut self, address: u32, value: u8) -> Result<(), Fault> {
        self.memory.write_u8(address, value)
    }

    /// Writes a little-endian halfword.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the range is not mapped.
    pub fn write16(&mut self, address: u32, value: u16) -> Result<(), Fault> {
        self.memory.write_u16(address, value)
    }

    /// Writes a little-endian word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when the range is not mapped.
    pub fn write32(&mut self, address: u32, value: u32) -> Result<(), Fault> {
        self.memory.write_u32(address, value)
    }

    /// Mutable view of `[address, address + width)`.
    ///
    /// # Errors
    ///
    /// See [`MemoryMap::resolve`].
    pub fn resolve(&mut self, address: u32, width: u32) -> Result<&mut [u8], Fault> {
        self.memory.resolve(address, width)
    }

    /// Shared view of `[address, address + width)`.
    ///
    /// # Errors
    ///
    /// See [`MemoryMap::view`].
    pub fn view(&self, address: u32, width: u32) -> Result<&[u8], Fault> {
        self.memory.view(address, width)
    }

    /// Virtual address of a host location inside a mapped buffer.
    #[must_use]
    pub fn translate_to_virtual(&self, location: *const u8) -> Option<u32> {
        self.memory.translate_to_virtual(location)
    }

    /// Resolves Operand2 of `decoded` against current registers and carry.
    ///
    /// `rm` supplies the shifted value (0 when absent) and `rs`, when
    /// present, supplies the shift amount.
    #[must_use]
    pub fn resolve_operand(&self, decoded: &DecodedInstruction) -> (u32, bool) {
        let value = decoded.rm.map_or(0, |rm| self.reg(rm));
        let shift_register = decoded.rs.map(|rs| self.reg(rs));
        shifter::resolve_operand(
            decoded,
            value,
            shift_register,
            self.flags.c,
            self.rotate_zero,
        )
    }

    /// Captures registers and flags.
    #[must_use]
    pub const fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            registers: *self.registers.as_array(),
            cpsr: self.flags.to_cpsr(),
        }
    }

    /// Restores registers and flags captured by [`Machine::snapshot`].
    /// Memory and mappings are left as they are.
    pub const fn restore(&mut self, snapshot: &CpuSnapshot) {
        self.registers = RegisterFile::from_array(snapshot.registers);
        self.flags = Flags::from_cpsr(snapshot.cpsr);
    }
}
