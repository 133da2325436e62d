//! Architectural CPU state model primitives.

/// Condition flags and CPSR packing.
pub mod flags;
/// General-purpose register file.
pub mod registers;

pub use flags::{Flags, CPSR_C, CPSR_FLAGS_MASK, CPSR_N, CPSR_V, CPSR_Z};
pub use registers::{Register, RegisterFile, GENERAL_REGISTER_COUNT};
