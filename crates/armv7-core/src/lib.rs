//! User-mode ARMv7 execution core.
//!
//! The crate models the register and flag file, a segmented memory map over
//! caller-owned buffers, the barrel shifter and condition evaluator, and the
//! fetch-decode-dispatch loop. Instruction decoding and per-instruction
//! semantics are supplied by the host through [`Decode`] and
//! [`HandlerTable`].

/// Segmented virtual memory over borrowed buffers.
pub mod memory;
pub use memory::{Mapping, MappingPolicy, MemoryMap, BYTE, HALFWORD, MAPPING_CAPACITY, WORD};

/// Register file and condition flags.
pub mod state;
pub use state::{
    Flags, Register, RegisterFile, CPSR_C, CPSR_FLAGS_MASK, CPSR_N, CPSR_V, CPSR_Z,
    GENERAL_REGISTER_COUNT,
};

/// Condition codes and their evaluation.
pub mod condition;
pub use condition::Condition;

/// Barrel shifter and Operand2 resolution.
pub mod shifter;
pub use shifter::{
    apply_shift, expand_modified_immediate, resolve_operand, rotate_right_extended,
    RotateZeroPolicy, ShiftKind,
};

/// Decoded-instruction record and decoder seam.
pub mod decoder;
pub use decoder::{Decode, DecodeError, DecodedInstruction, InstructionKind};

/// Per-kind handler table.
pub mod dispatch;
pub use dispatch::{Handler, HandlerTable};

/// Fault taxonomy.
pub mod fault;
pub use fault::{Fault, FaultCode};

/// Machine aggregate and host-facing result types.
pub mod api;
pub use api::{
    CpuSnapshot, Machine, MachineConfig, RunOutcome, StepOutcome, StopReason, DEFAULT_STACK_BASE,
};

/// Fetch-decode-dispatch loop.
pub mod execute;
pub use execute::{run, step_one};

#[cfg(test)]
use tracing_subscriber as _;
