//! Sums 10 + 9 + ... + 1 with a six-instruction ARM loop.
//!
//! The host supplies a decoder for the handful of encodings the program uses
//! and one handler per instruction kind. `SVC` has no handler, so the run
//! stops on it with an unhandled-instruction fault, which is how the program
//! signals completion.
//!
//! Set `RUST_LOG=armv7_core=trace` to see every fetch.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use armv7_core::{
    expand_modified_immediate, run, Condition, DecodeError, DecodedInstruction, Fault,
    HandlerTable, InstructionKind, Machine, Register, ShiftKind, StopReason,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing_subscriber::EnvFilter;

const CODE_BASE: u32 = 0x0000_8000;
const STACK_BYTES: usize = 4096;

const PROGRAM: [u32; 6] = [
    0xE3A0_000A, // mov   r0, #10
    0xE3A0_1000, // mov   r1, #0
    0xE081_1000, // add   r1, r1, r0
    0xE250_0001, // subs  r0, r0, #1
    0x1AFF_FFFC, // bne   (back to add)
    0xEF00_0000, // svc   #0
];

fn decode(word: u32) -> Result<DecodedInstruction, DecodeError> {
    let condition = Condition::from_opcode(word);
    let reg = |lsb: u32| Register::from_u4(((word >> lsb) & 0xF) as u8);

    let decoded = match (word >> 20) & 0xFF {
        0x3A => DecodedInstruction {
            rd: reg(12),
            has_immediate: true,
            immediate: expand_modified_immediate(word & 0xFFF),
            ..DecodedInstruction::new(InstructionKind::Mov, condition)
        },
        0x08 if word & 0x10 == 0 => DecodedInstruction {
            rd: reg(12),
            rn: reg(16),
            rm: reg(0),
            shift_kind: ShiftKind::from_bits(word >> 5),
            shift_amount: (word >> 7) & 0x1F,
            ..DecodedInstruction::new(InstructionKind::Add, condition)
        },
        0x25 => DecodedInstruction {
            set_flags: true,
            rd: reg(12),
            rn: reg(16),
            has_immediate: true,
            immediate: expand_modified_immediate(word & 0xFFF),
            ..DecodedInstruction::new(InstructionKind::Sub, condition)
        },
        0xA0..=0xAF => DecodedInstruction {
            has_immediate: true,
            immediate: (((word & 0x00FF_FFFF) << 8) as i32 >> 6) as u32,
            ..DecodedInstruction::new(InstructionKind::B, condition)
        },
        0xF0..=0xFF => DecodedInstruction {
            has_immediate: true,
            immediate: word & 0x00FF_FFFF,
            ..DecodedInstruction::new(InstructionKind::Svc, condition)
        },
        _ => return Err(DecodeError::new(word)),
    };
    Ok(decoded)
}

fn operands(machine: &Machine<'_>, decoded: &DecodedInstruction) -> (u32, u32, Register) {
    let (operand, _) = machine.resolve_operand(decoded);
    let rn = decoded.rn.map_or(0, |reg| machine.reg(reg));
    (rn, operand, decoded.rd.unwrap_or(Register::R0))
}

#[allow(clippy::unnecessary_wraps)]
fn mov(machine: &mut Machine<'_>, decoded: &DecodedInstruction) -> Result<(), Fault> {
    let (_, operand, rd) = operands(machine, decoded);
    machine.set_reg(rd, operand);
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn add(machine: &mut Machine<'_>, decoded: &DecodedInstruction) -> Result<(), Fault> {
    let (rn, operand, rd) = operands(machine, decoded);
    machine.set_reg(rd, rn.wrapping_add(operand));
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn sub(machine: &mut Machine<'_>, decoded: &DecodedInstruction) -> Result<(), Fault> {
    let (rn, operand, rd) = operands(machine, decoded);
    let (result, borrow) = rn.overflowing_sub(operand);
    machine.set_reg(rd, result);

    if decoded.set_flags {
        let flags = machine.flags_mut();
        flags.set_nz(result);
        flags.c = !borrow;
        flags.v = ((rn ^ operand) & (rn ^ result)) >> 31 != 0;
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn branch(machine: &mut Machine<'_>, decoded: &DecodedInstruction) -> Result<(), Fault> {
    let target = machine.pc().wrapping_add(8).wrapping_add(decoded.immediate);
    machine.set_pc(target);
    Ok(())
}

fn main() -> Result<(), Fault> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut stack = vec![0_u8; STACK_BYTES];
    let mut code: Vec<u8> = PROGRAM.iter().flat_map(|word| word.to_le_bytes()).collect();

    let mut machine = Machine::new(&mut stack)?;
    machine.add_mapping(&mut code, CODE_BASE)?;
    machine.set_pc(CODE_BASE);

    let handlers = HandlerTable::new()
        .with(InstructionKind::Mov, mov)
        .with(InstructionKind::Add, add)
        .with(InstructionKind::Sub, sub)
        .with(InstructionKind::B, branch);

    let outcome = run(&mut machine, &decode, &handlers, 1_000);
    match outcome.stop {
        StopReason::Fault(Fault::UnhandledInstruction {
            kind: InstructionKind::Svc,
            pc,
        }) => tracing::info!("Program reached svc at {pc:#010x}"),
        StopReason::Fault(fault) => return Err(fault),
        StopReason::StepLimit => tracing::warn!("Step limit reached before svc"),
    }

    println!(
        "r1 = {} ({} executed, {} skipped)",
        machine.reg(Register::R1),
        outcome.executed,
        outcome.skipped
    );
    Ok(())
}
