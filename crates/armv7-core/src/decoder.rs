//! Decoder seam: the structured instruction record consumed by the core.
//!
//! Turning a 32-bit opcode word into a [`DecodedInstruction`] is the job of
//! an external decoder plugged in through the [`Decode`] trait. The core
//! only reads the record: its condition, its kind (used to pick a handler)
//! and its operand fields (used by handlers and [`crate::resolve_operand`]).

use std::fmt;

use thiserror::Error;

use crate::{Condition, Register, ShiftKind};

macro_rules! instruction_kinds {
    ($($variant:ident => $mnemonic:literal,)+) => {
        /// ARMv7 (ARM state) instruction kinds used to key the handler table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
        #[allow(missing_docs)]
        pub enum InstructionKind {
            $($variant,)+
        }

        impl InstructionKind {
            /// Every kind in declaration order; `ALL[k.index()] == k`.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Number of instruction kinds.
            pub const COUNT: usize = Self::ALL.len();

            /// Lowercase assembler mnemonic.
            #[must_use]
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$variant => $mnemonic,)+
                }
            }
        }
    };
}

instruction_kinds! {
    Adc => "adc",
    Add => "add",
    Adr => "adr",
    And => "and",
    Asr => "asr",
    B => "b",
    Bfc => "bfc",
    Bfi => "bfi",
    Bic => "bic",
    Bkpt => "bkpt",
    Bl => "bl",
    Blx => "blx",
    Bx => "bx",
    Clz => "clz",
    Cmn => "cmn",
    Cmp => "cmp",
    Dmb => "dmb",
    Dsb => "dsb",
    Eor => "eor",
    Isb => "isb",
    Ldm => "ldm",
    Ldmda => "ldmda",
    Ldmdb => "ldmdb",
    Ldmib => "ldmib",
    Ldr => "ldr",
    Ldrb => "ldrb",
    Ldrd => "ldrd",
    Ldrex => "ldrex",
    Ldrh => "ldrh",
    Ldrsb => "ldrsb",
    Ldrsh => "ldrsh",
    Lsl => "lsl",
    Lsr => "lsr",
    Mla => "mla",
    Mls => "mls",
    Mov => "mov",
    Movt => "movt",
    Movw => "movw",
    Mul => "mul",
    Mvn => "mvn",
    Nop => "nop",
    Orr => "orr",
    Pld => "pld",
    Pop => "pop",
    Push => "push",
    Rbit => "rbit",
    Rev => "rev",
    Rev16 => "rev16",
    Revsh => "revsh",
    Ror => "ror",
    Rrx => "rrx",
    Rsb => "rsb",
    Rsc => "rsc",
    Sbc => "sbc",
    Sbfx => "sbfx",
    Sdiv => "sdiv",
    Smlal => "smlal",
    Smull => "smull",
    Stm => "stm",
    Stmda => "stmda",
    Stmdb => "stmdb",
    Stmib => "stmib",
    Str => "str",
    Strb => "strb",
    Strd => "strd",
    Strex => "strex",
    Strh => "strh",
    Sub => "sub",
    Svc => "svc",
    Swp => "swp",
    Swpb => "swpb",
    Sxtb => "sxtb",
    Sxth => "sxth",
    Teq => "teq",
    Tst => "tst",
    Ubfx => "ubfx",
    Udiv => "udiv",
    Umlal => "umlal",
    Umull => "umull",
    Uxtb => "uxtb",
    Uxth => "uxth",
}

impl InstructionKind {
    /// Dense index into per-kind tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Structured instruction produced by a decoder.
///
/// Register fields are `None` when the encoding has no such operand. The
/// shifter fields describe Operand2: when `has_immediate` is set the operand
/// is `immediate`, otherwise it is `rm` shifted by `shift_kind` and either
/// `rs` (register-specified amount) or `shift_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct DecodedInstruction {
    /// Instruction kind used for handler lookup.
    pub kind: InstructionKind,
    /// Condition field.
    pub condition: Condition,
    /// `S` bit: the handler should update flags.
    pub set_flags: bool,
    /// Destination register.
    pub rd: Option<Register>,
    /// First operand / base register.
    pub rn: Option<Register>,
    /// Second operand register.
    pub rm: Option<Register>,
    /// Shift-amount register.
    pub rs: Option<Register>,
    /// Operand2 is an immediate.
    pub has_immediate: bool,
    /// Immediate value (already expanded by the decoder).
    pub immediate: u32,
    /// Shift applied to `rm`.
    pub shift_kind: ShiftKind,
    /// Instruction-embedded shift amount.
    pub shift_amount: u32,
}

impl DecodedInstruction {
    /// Creates a record with no operands, no shift and flags untouched.
    #[must_use]
    pub const fn new(kind: InstructionKind, condition: Condition) -> Self {
        Self {
            kind,
            condition,
            set_flags: false,
            rd: None,
            rn: None,
            rm: None,
            rs: None,
            has_immediate: false,
            immediate: 0,
            shift_kind: ShiftKind::None,
            shift_amount: 0,
        }
    }
}

/// Raised by a decoder for words that are not valid ARMv7 encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("invalid ARMv7 encoding {opcode:#010x}")]
pub struct DecodeError {
    /// Rejected opcode word.
    pub opcode: u32,
}

impl DecodeError {
    /// Creates a decode error for `opcode`.
    #[must_use]
    pub const fn new(opcode: u32) -> Self {
        Self { opcode }
    }
}

/// Opcode-word decoder plugged into [`crate::step_one`].
pub trait Decode {
    /// Decodes one 32-bit ARM opcode word.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when `opcode` is not a valid encoding.
    fn decode(&self, opcode: u32) -> Result<DecodedInstruction, DecodeError>;
}

impl<F> Decode for F
where
    F: Fn(u32) -> Result<DecodedInstruction, DecodeError>,
{
    fn decode(&self, opcode: u32) -> Result<DecodedInstruction, DecodeError> {
        self(opcode)
    }
}
