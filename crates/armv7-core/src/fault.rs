use thiserror::Error;

use crate::decoder::{DecodeError, InstructionKind};

/// Stable, payload-free fault taxonomy for hosts that store or transmit faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Mapping table already holds [`crate::MAPPING_CAPACITY`] entries.
    CapacityExceeded = 0x01,
    /// Virtual address range is not covered by any mapping.
    UnmappedAddress = 0x02,
    /// Opcode word is not a valid ARMv7 encoding.
    DecodeError = 0x03,
    /// Decoded instruction carries the reserved condition code.
    InvalidCondition = 0x04,
    /// No handler is registered for the decoded instruction kind.
    UnhandledInstruction = 0x05,
    /// Strict mapping policy rejected an overlapping window.
    MappingOverlap = 0x06,
    /// Strict mapping policy rejected a window that wraps the address space.
    AddressSpaceOverflow = 0x07,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::CapacityExceeded),
            0x02 => Some(Self::UnmappedAddress),
            0x03 => Some(Self::DecodeError),
            0x04 => Some(Self::InvalidCondition),
            0x05 => Some(Self::UnhandledInstruction),
            0x06 => Some(Self::MappingOverlap),
            0x07 => Some(Self::AddressSpaceOverflow),
            _ => None,
        }
    }

    /// Faults raised before any machine state was touched.
    ///
    /// A step that fails with one of these leaves the machine bit-for-bit
    /// unchanged.
    #[must_use]
    pub const fn is_precise(self) -> bool {
        matches!(
            self,
            Self::UnmappedAddress
                | Self::DecodeError
                | Self::InvalidCondition
                | Self::UnhandledInstruction
        )
    }
}

/// Errors surfaced by the execution core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The mapping table is full.
    #[error("mapping table is full ({capacity} entries)")]
    CapacityExceeded {
        /// Fixed table capacity.
        capacity: usize,
    },
    /// No mapping covers `[address, address + width)`.
    #[error("unmapped virtual address {address:#010x} ({width}-byte access)")]
    UnmappedAddress {
        /// First byte of the rejected access.
        address: u32,
        /// Access width in bytes.
        width: u32,
    },
    /// The decoder rejected the opcode fetched at `pc`.
    #[error("decode failed at {pc:#010x}")]
    Decode {
        /// Program counter of the rejected fetch.
        pc: u32,
        /// Decoder-reported cause.
        #[source]
        source: DecodeError,
    },
    /// The instruction at `pc` carries the reserved condition code.
    #[error("invalid condition code at {pc:#010x}")]
    InvalidCondition {
        /// Program counter of the offending instruction.
        pc: u32,
    },
    /// No handler is registered for the instruction at `pc`.
    #[error("instruction '{kind}' unhandled at {pc:#010x}")]
    UnhandledInstruction {
        /// Program counter of the offending instruction.
        pc: u32,
        /// Decoded instruction kind without a handler.
        kind: InstructionKind,
    },
    /// A new window overlaps an existing one under the strict policy.
    #[error("mapping at {address:#010x} (+{len:#x}) overlaps an existing window")]
    MappingOverlap {
        /// Requested base address.
        address: u32,
        /// Requested window length in bytes.
        len: u64,
    },
    /// A new window runs past the end of the 32-bit address space.
    #[error("mapping at {address:#010x} (+{len:#x}) exceeds the 32-bit address space")]
    AddressSpaceOverflow {
        /// Requested base address.
        address: u32,
        /// Requested window length in bytes.
        len: u64,
    },
}

impl Fault {
    /// Returns the payload-free code for this fault.
    #[must_use]
    pub const fn code(&self) -> FaultCode {
        match self {
            Self::CapacityExceeded { .. } => FaultCode::CapacityExceeded,
            Self::UnmappedAddress { .. } => FaultCode::UnmappedAddress,
            Self::Decode { .. } => FaultCode::DecodeError,
            Self::InvalidCondition { .. } => FaultCode::InvalidCondition,
            Self::UnhandledInstruction { .. } => FaultCode::UnhandledInstruction,
            Self::MappingOverlap { .. } => FaultCode::MappingOverlap,
            Self::AddressSpaceOverflow { .. } => FaultCode::AddressSpaceOverflow,
        }
    }
}
