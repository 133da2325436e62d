//! ARM condition codes and their evaluation against the N/Z/C/V flags.

use std::fmt;

use crate::Flags;

/// Condition field of a decoded instruction.
///
/// Codes `0x0..=0xE` follow the ARM condition table. `0xF` selects the
/// unconditional instruction space in ARMv7 and always executes. `Invalid`
/// is produced by decoders for encodings whose condition cannot be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Condition {
    /// Equal (`Z`).
    Eq,
    /// Not equal (`!Z`).
    Ne,
    /// Carry set / unsigned higher or same (`C`).
    Cs,
    /// Carry clear / unsigned lower (`!C`).
    Cc,
    /// Negative (`N`).
    Mi,
    /// Positive or zero (`!N`).
    Pl,
    /// Overflow (`V`).
    Vs,
    /// No overflow (`!V`).
    Vc,
    /// Unsigned higher (`C && !Z`).
    Hi,
    /// Unsigned lower or same (`!C || Z`).
    Ls,
    /// Signed greater or equal (`N == V`).
    Ge,
    /// Signed less than (`N != V`).
    Lt,
    /// Signed greater than (`!Z && N == V`).
    Gt,
    /// Signed less or equal (`Z || N != V`).
    Le,
    /// Always.
    Al,
    /// Unconditional instruction space (`0b1111`).
    Unconditional,
    /// Reserved or undecodable condition.
    Invalid,
}

impl Condition {
    /// Ordered list of the sixteen encodable conditions.
    pub const ENCODABLE: [Self; 16] = [
        Self::Eq,
        Self::Ne,
        Self::Cs,
        Self::Cc,
        Self::Mi,
        Self::Pl,
        Self::Vs,
        Self::Vc,
        Self::Hi,
        Self::Ls,
        Self::Ge,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Al,
        Self::Unconditional,
    ];

    /// Decodes a 4-bit condition field; values above `0xF` map to `Invalid`.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        if bits < 16 {
            Self::ENCODABLE[bits as usize]
        } else {
            Self::Invalid
        }
    }

    /// Extracts the condition from bits 31..28 of an ARM opcode word.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_opcode(opcode: u32) -> Self {
        Self::from_bits((opcode >> 28) as u8)
    }

    /// Returns whether an instruction with this condition executes.
    ///
    /// Returns `None` for [`Condition::Invalid`]. Pure: no ordering
    /// constraints and no state is touched.
    #[must_use]
    pub const fn evaluate(self, flags: Flags) -> Option<bool> {
        let Flags { n, z, c, v } = flags;
        let taken = match self {
            Self::Eq => z,
            Self::Ne => !z,
            Self::Cs => c,
            Self::Cc => !c,
            Self::Mi => n,
            Self::Pl => !n,
            Self::Vs => v,
            Self::Vc => !v,
            Self::Hi => c && !z,
            Self::Ls => !c || z,
            Self::Ge => n == v,
            Self::Lt => n != v,
            Self::Gt => !z && n == v,
            Self::Le => z || n != v,
            Self::Al | Self::Unconditional => true,
            Self::Invalid => return None,
        };
        Some(taken)
    }

    /// Assembly suffix for this condition (empty for `AL` and unconditional).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Cs => "cs",
            Self::Cc => "cc",
            Self::Mi => "mi",
            Self::Pl => "pl",
            Self::Vs => "vs",
            Self::Vc => "vc",
            Self::Hi => "hi",
            Self::Ls => "ls",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Al | Self::Unconditional => "",
            Self::Invalid => "<invalid>",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
