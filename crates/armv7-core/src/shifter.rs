//! Barrel shifter and Operand2 resolution.
//!
//! Every shift returns `(result, carry_out)`. A zero amount is never computed
//! as `amount - 1`: for LSL/LSR/ASR/ROR it is a no-shift alias that hands the
//! caller's carry back unchanged. Amounts of 32 and above are defined here
//! even where hardware only reaches them through register-specified shifts.

use crate::DecodedInstruction;

/// Shift applied to a register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ShiftKind {
    /// No shift; the carry output is always clear.
    #[default]
    None,
    /// `LSL`
    LogicalLeft,
    /// `LSR`
    LogicalRight,
    /// `ASR`
    ArithmeticRight,
    /// `ROR`
    RotateRight,
}

impl ShiftKind {
    /// Decodes the 2-bit `type` field of an ARM shifted-register operand.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::LogicalLeft,
            0b01 => Self::LogicalRight,
            0b10 => Self::ArithmeticRight,
            _ => Self::RotateRight,
        }
    }
}

/// How an instruction-embedded `ROR #0` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RotateZeroPolicy {
    /// Treat it like every other zero-amount shift: value and carry unchanged.
    #[default]
    PassThrough,
    /// Architectural `RRX`: rotate right by one bit through the carry flag.
    Extend,
}

/// Shifts `value` by `amount` and returns `(result, carry_out)`.
///
/// | kind | `amount == 0` | `1..=31` | `32` | `> 32` |
/// |---|---|---|---|---|
/// | `None` | `(value, false)` | same | same | same |
/// | `LSL` | `(value, carry_in)` | bit `32 - amount` out | `(0, bit 0)` | `(0, false)` |
/// | `LSR` | `(value, carry_in)` | bit `amount - 1` out | `(0, bit 31)` | `(0, false)` |
/// | `ASR` | `(value, carry_in)` | bit `amount - 1` out | sign fill, bit 31 | sign fill, bit 31 |
/// | `ROR` | `(value, carry_in)` | rotate by `amount % 32` | same | same |
///
/// `ROR` carry out is bit 31 of the rotated result.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub const fn apply_shift(kind: ShiftKind, value: u32, amount: u32, carry_in: bool) -> (u32, bool) {
    match kind {
        ShiftKind::None => (value, false),
        ShiftKind::LogicalLeft => match amount {
            0 => (value, carry_in),
            1..=31 => (value << amount, (value >> (32 - amount)) & 1 != 0),
            32 => (0, value & 1 != 0),
            _ => (0, false),
        },
        ShiftKind::LogicalRight => match amount {
            0 => (value, carry_in),
            1..=31 => (value >> amount, (value >> (amount - 1)) & 1 != 0),
            32 => (0, value >> 31 != 0),
            _ => (0, false),
        },
        ShiftKind::ArithmeticRight => match amount {
            0 => (value, carry_in),
            1..=31 => (
                ((value as i32) >> amount) as u32,
                (value >> (amount - 1)) & 1 != 0,
            ),
            _ => (((value as i32) >> 31) as u32, value >> 31 != 0),
        },
        ShiftKind::RotateRight => {
            if amount == 0 {
                (value, carry_in)
            } else {
                let result = value.rotate_right(amount % 32);
                (result, result >> 31 != 0)
            }
        }
    }
}

/// Rotate right by one bit through carry (`RRX`).
#[must_use]
pub const fn rotate_right_extended(value: u32, carry_in: bool) -> (u32, bool) {
    let top = if carry_in { 1 << 31 } else { 0 };
    (top | (value >> 1), value & 1 != 0)
}

/// Expands an ARM modified-immediate field (`imm8` rotated right by `2 * rot`).
#[must_use]
pub const fn expand_modified_immediate(imm12: u32) -> u32 {
    let imm8 = imm12 & 0xFF;
    let rotation = ((imm12 >> 8) & 0xF) * 2;
    imm8.rotate_right(rotation)
}

/// Resolves Operand2 of `decoded` to `(value, carry_out)`.
///
/// - Immediate operands return `decoded.immediate` with `carry_in` unchanged.
/// - With `shift_register = Some(rs)`, the amount is the low byte of `rs`. A
///   zero low byte is a plain zero-amount shift and never becomes `RRX`.
/// - Otherwise `decoded.shift_amount` is used, and an embedded `ROR #0` is
///   interpreted per `rotate_zero`.
#[must_use]
pub const fn resolve_operand(
    decoded: &DecodedInstruction,
    value: u32,
    shift_register: Option<u32>,
    carry_in: bool,
    rotate_zero: RotateZeroPolicy,
) -> (u32, bool) {
    if decoded.has_immediate {
        return (decoded.immediate, carry_in);
    }

    match shift_register {
        Some(rs) => apply_shift(decoded.shift_kind, value, rs & 0xFF, carry_in),
        None => {
            let amount = decoded.shift_amount;
            if amount == 0
                && matches!(decoded.shift_kind, ShiftKind::RotateRight)
                && matches!(rotate_zero, RotateZeroPolicy::Extend)
            {
                rotate_right_extended(value, carry_in)
            } else {
                apply_shift(decoded.shift_kind, value, amount, carry_in)
            }
        }
    }
}
