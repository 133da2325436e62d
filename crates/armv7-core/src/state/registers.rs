/// Number of general-purpose registers (`R0..R15`).
pub const GENERAL_REGISTER_COUNT: usize = 16;

/// General-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Register {
    /// Stack pointer alias.
    pub const SP: Self = Self::R13;
    /// Link register alias.
    pub const LR: Self = Self::R14;
    /// Program counter alias.
    pub const PC: Self = Self::R15;

    /// Ordered list of all general-purpose registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
        Self::R15,
    ];

    /// Returns the array index for this register (`0..=15`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a 4-bit register field.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Option<Self> {
        if (bits as usize) < GENERAL_REGISTER_COUNT {
            Some(Self::ALL[bits as usize])
        } else {
            None
        }
    }
}

/// Sixteen 32-bit general-purpose registers.
///
/// Index-based access is lenient: reads outside `0..16` return `0` and writes
/// outside `0..16` are ignored. Use [`RegisterFile::try_get`] when the caller
/// needs to observe an out-of-range index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    regs: [u32; GENERAL_REGISTER_COUNT],
}

impl RegisterFile {
    /// Builds a register file from raw values.
    #[must_use]
    pub const fn from_array(regs: [u32; GENERAL_REGISTER_COUNT]) -> Self {
        Self { regs }
    }

    /// Returns all registers in index order.
    #[must_use]
    pub const fn as_array(&self) -> &[u32; GENERAL_REGISTER_COUNT] {
        &self.regs
    }

    /// Reads a register by typed identifier.
    #[must_use]
    pub const fn reg(&self, reg: Register) -> u32 {
        self.regs[reg.index()]
    }

    /// Writes a register by typed identifier.
    pub const fn set_reg(&mut self, reg: Register, value: u32) {
        self.regs[reg.index()] = value;
    }

    /// Reads a register by index, or `None` when `index >= 16`.
    #[must_use]
    pub const fn try_get(&self, index: usize) -> Option<u32> {
        if index < GENERAL_REGISTER_COUNT {
            Some(self.regs[index])
        } else {
            None
        }
    }

    /// Reads a register by index; out-of-range indices read as `0`.
    #[must_use]
    pub const fn get(&self, index: usize) -> u32 {
        match self.try_get(index) {
            Some(value) => value,
            None => 0,
        }
    }

    /// Writes a register by index; out-of-range indices are a no-op.
    ///
    /// Returns `true` when the write landed.
    pub const fn set(&mut self, index: usize, value: u32) -> bool {
        if index < GENERAL_REGISTER_COUNT {
            self.regs[index] = value;
            true
        } else {
            false
        }
    }
}
