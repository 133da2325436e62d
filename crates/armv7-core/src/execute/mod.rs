//! Fetch-decode-dispatch loop.
//!
//! One call to [`step_one`] moves the machine by exactly one instruction:
//! 1. Fetch the word at PC
//! 2. Decode it through the host decoder
//! 3. Evaluate the condition against N/Z/C/V
//! 4. Look up the handler for the instruction kind
//! 5. Run the handler when the condition passed
//! 6. Advance PC by four unless the handler wrote it
//!
//! Failures in steps 1-4 leave the machine untouched. A failing handler
//! keeps whatever it already wrote and PC is not advanced.

use crate::{Decode, Fault, HandlerTable, Machine, RunOutcome, StepOutcome, StopReason, WORD};

/// Executes one instruction.
///
/// # Errors
///
/// - [`Fault::UnmappedAddress`] when PC does not point into mapped memory.
/// - [`Fault::Decode`] when the decoder rejects the fetched word.
/// - [`Fault::InvalidCondition`] for a decoded `Condition::Invalid`.
/// - [`Fault::UnhandledInstruction`] when `handlers` has no entry for the
///   decoded kind, whether or not its condition passed.
/// - Any fault returned by the handler itself.
pub fn step_one<D>(
    machine: &mut Machine<'_>,
    decoder: &D,
    handlers: &HandlerTable,
) -> Result<StepOutcome, Fault>
where
    D: Decode + ?Sized,
{
    let pc = machine.pc();
    let opcode = machine.read32(pc)?;
    tracing::trace!("Fetched {opcode:#010x} at {pc:#010x}");

    let decoded = decoder.decode(opcode).map_err(|source| {
        tracing::warn!("Invalid instruction {opcode:#010x} at {pc:#010x}");
        Fault::Decode { pc, source }
    })?;
    let kind = decoded.kind;

    let Some(taken) = decoded.condition.evaluate(machine.flags()) else {
        tracing::warn!("Invalid condition on '{kind}' at {pc:#010x}");
        return Err(Fault::InvalidCondition { pc });
    };

    let Some(handler) = handlers.lookup(kind) else {
        tracing::warn!("Instruction '{kind}' not handled at {pc:#010x}");
        return Err(Fault::UnhandledInstruction { pc, kind });
    };

    if !taken {
        tracing::debug!(
            "Skipping '{kind}{}' at {pc:#010x}",
            decoded.condition.suffix()
        );
        machine.set_pc(pc.wrapping_add(WORD));
        return Ok(StepOutcome::Skipped { pc, kind });
    }

    handler(machine, &decoded)?;

    if machine.pc() == pc {
        machine.set_pc(pc.wrapping_add(WORD));
    }
    Ok(StepOutcome::Executed { pc, kind })
}

/// Steps until `max_steps` instructions have completed or a step fails.
///
/// The failing step's fault is reported in [`RunOutcome::stop`]; the counts
/// only include steps that completed.
pub fn run<D>(
    machine: &mut Machine<'_>,
    decoder: &D,
    handlers: &HandlerTable,
    max_steps: u64,
) -> RunOutcome
where
    D: Decode + ?Sized,
{
    let mut executed = 0;
    let mut skipped = 0;

    for _ in 0..max_steps {
        match step_one(machine, decoder, handlers) {
            Ok(StepOutcome::Executed { .. }) => executed += 1,
            Ok(StepOutcome::Skipped { .. }) => skipped += 1,
            Err(fault) => {
                return RunOutcome {
                    executed,
                    skipped,
                    stop: StopReason::Fault(fault),
                };
            }
        }
    }

    RunOutcome {
        executed,
        skipped,
        stop: StopReason::StepLimit,
    }
}

#[cfg(test)]
mod tests {
    use super::{run, step_one};
    use crate::{
        Condition, DecodeError, DecodedInstruction, Fault, Flags, HandlerTable, InstructionKind,
        Machine, Register, StepOutcome, StopReason,
    };
    use proptest::prelude::*;

    const CODE_BASE: u32 = 0x1000;

    // Word layout: cond[31:28] imm[23:8] op[7:0].
    fn decode(opcode: u32) -> Result<DecodedInstruction, DecodeError> {
        let kind = match opcode & 0xFF {
            0x00 => InstructionKind::Nop,
            0x01 => InstructionKind::B,
            0x02 => InstructionKind::Mov,
            0x03 => InstructionKind::Svc,
            0x04 => InstructionKind::Ldr,
            _ => return Err(DecodeError::new(opcode)),
        };
        Ok(DecodedInstruction {
            rd: Some(Register::R0),
            has_immediate: true,
            immediate: (opcode >> 8) & 0xFFFF,
            ..DecodedInstruction::new(kind, Condition::from_opcode(opcode))
        })
    }

    #[allow(clippy::unnecessary_wraps)]
    fn nop(_machine: &mut Machine<'_>, _decoded: &DecodedInstruction) -> Result<(), Fault> {
        Ok(())
    }

    #[allow(clippy::unnecessary_wraps)]
    fn branch(machine: &mut Machine<'_>, decoded: &DecodedInstruction) -> Result<(), Fault> {
        machine.set_pc(decoded.immediate);
        Ok(())
    }

    #[allow(clippy::unnecessary_wraps)]
    fn mov(machine: &mut Machine<'_>, decoded: &DecodedInstruction) -> Result<(), Fault> {
        let (value, _) = machine.resolve_operand(decoded);
        if let Some(rd) = decoded.rd {
            machine.set_reg(rd, value);
        }
        Ok(())
    }

    fn load_then_fault(
        machine: &mut Machine<'_>,
        decoded: &DecodedInstruction,
    ) -> Result<(), Fault> {
        machine.set_reg(Register::R1, 0xDEAD);
        let value = machine.read32(decoded.immediate)?;
        machine.set_reg(Register::R0, value);
        Ok(())
    }

    fn handlers() -> HandlerTable {
        HandlerTable::new()
            .with(InstructionKind::Nop, nop)
            .with(InstructionKind::B, branch)
            .with(InstructionKind::Mov, mov)
            .with(InstructionKind::Ldr, load_then_fault)
    }

    fn encode(cond: u32, imm: u32, op: u32) -> u32 {
        (cond << 28) | ((imm & 0xFFFF) << 8) | op
    }

    fn load_program(code: &mut [u8], words: &[u32]) {
        for (slot, word) in code.chunks_exact_mut(4).zip(words) {
            slot.copy_from_slice(&word.to_le_bytes());
        }
    }

    fn machine_at<'a>(stack: &'a mut [u8], code: &'a mut [u8]) -> Machine<'a> {
        let mut machine = Machine::new(stack).expect("stack maps");
        machine.add_mapping(code, CODE_BASE).expect("code maps");
        machine.set_pc(CODE_BASE);
        machine
    }

    #[test]
    fn executed_instruction_advances_pc_by_four() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 16];
        load_program(&mut code, &[encode(0xE, 0x2A, 0x02)]);
        let mut machine = machine_at(&mut stack, &mut code);

        let outcome = step_one(&mut machine, &decode, &handlers()).expect("mov runs");

        assert_eq!(
            outcome,
            StepOutcome::Executed {
                pc: CODE_BASE,
                kind: InstructionKind::Mov,
            }
        );
        assert_eq!(machine.reg(Register::R0), 0x2A);
        assert_eq!(machine.pc(), CODE_BASE + 4);
    }

    #[test]
    fn handler_written_pc_is_not_incremented() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 16];
        load_program(&mut code, &[encode(0xE, 0x1008, 0x01)]);
        let mut machine = machine_at(&mut stack, &mut code);

        step_one(&mut machine, &decode, &handlers()).expect("branch runs");
        assert_eq!(machine.pc(), 0x1008);
    }

    #[test]
    fn failed_condition_skips_handler_but_advances_pc() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 16];
        // MOVEQ r0, #0x2A with Z clear.
        load_program(&mut code, &[encode(0x0, 0x2A, 0x02)]);
        let mut machine = machine_at(&mut stack, &mut code);
        let before = machine.snapshot();

        let outcome = step_one(&mut machine, &decode, &handlers()).expect("skip is not a fault");

        assert!(!outcome.is_executed());
        assert_eq!(machine.reg(Register::R0), 0);
        assert_eq!(machine.pc(), CODE_BASE + 4);
        assert_eq!(machine.flags_packed(), before.cpsr);
    }

    #[test]
    fn unmapped_pc_faults_without_moving() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 16];
        let mut machine = machine_at(&mut stack, &mut code);
        machine.set_pc(0x0);

        assert_eq!(
            step_one(&mut machine, &decode, &handlers()),
            Err(Fault::UnmappedAddress {
                address: 0x0,
                width: 4,
            })
        );
        assert_eq!(machine.pc(), 0x0);
    }

    #[test]
    fn decode_failure_leaves_state_untouched() {
        let mut stack = [0x5A_u8; 64];
        let mut code = [0_u8; 16];
        load_program(&mut code, &[0xE000_00EE]);
        let code_copy = code;
        {
            let mut machine = machine_at(&mut stack, &mut code);
            let before = machine.snapshot();

            let fault = step_one(&mut machine, &decode, &handlers()).expect_err("undecodable");

            assert_eq!(
                fault,
                Fault::Decode {
                    pc: CODE_BASE,
                    source: DecodeError::new(0xE000_00EE),
                }
            );
            assert_eq!(machine.snapshot(), before);
        }
        assert_eq!(stack, [0x5A_u8; 64]);
        assert_eq!(code, code_copy);
    }

    #[test]
    fn invalid_condition_is_reported() {
        let mut stack = [0x5A_u8; 64];
        let mut code = [0_u8; 16];
        load_program(&mut code, &[0x0000_0005]);
        let code_copy = code;
        let table = handlers();
        let decoder = |opcode: u32| {
            decode(opcode & !0xFF).map(|decoded| DecodedInstruction {
                condition: Condition::Invalid,
                ..decoded
            })
        };
        {
            let mut machine = machine_at(&mut stack, &mut code);
            machine.set_flags_packed(0xA000_0000);
            let before = machine.snapshot();

            assert_eq!(
                step_one(&mut machine, &decoder, &table),
                Err(Fault::InvalidCondition { pc: CODE_BASE })
            );
            assert_eq!(machine.snapshot(), before);
        }
        assert_eq!(stack, [0x5A_u8; 64]);
        assert_eq!(code, code_copy);
    }

    #[test]
    fn unhandled_instruction_is_reported_even_when_not_taken() {
        let mut stack = [0x5A_u8; 64];
        let mut code = [0_u8; 16];
        load_program(&mut code, &[encode(0x0, 0, 0x03)]);
        let code_copy = code;
        {
            let mut machine = machine_at(&mut stack, &mut code);
            let before = machine.snapshot();

            let fault = step_one(&mut machine, &decode, &handlers()).expect_err("no svc handler");

            assert_eq!(
                fault,
                Fault::UnhandledInstruction {
                    pc: CODE_BASE,
                    kind: InstructionKind::Svc,
                }
            );
            assert_eq!(fault.to_string(), "instruction 'svc' unhandled at 0x00001000");
            assert_eq!(machine.snapshot(), before);
        }
        assert_eq!(stack, [0x5A_u8; 64]);
        assert_eq!(code, code_copy);
    }

    #[test]
    fn handler_fault_propagates_without_advancing_pc() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 16];
        load_program(&mut code, &[encode(0xE, 0x0010, 0x04)]);
        let mut machine = machine_at(&mut stack, &mut code);

        let fault = step_one(&mut machine, &decode, &handlers()).expect_err("load faults");

        assert_eq!(
            fault,
            Fault::UnmappedAddress {
                address: 0x10,
                width: 4,
            }
        );
        assert_eq!(machine.pc(), CODE_BASE);
        assert_eq!(machine.reg(Register::R1), 0xDEAD);
    }

    #[test]
    fn run_counts_steps_and_stops_on_fault() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 32];
        load_program(
            &mut code,
            &[
                encode(0xE, 7, 0x02),
                encode(0x1, 0, 0x00),
                encode(0xE, 0, 0x00),
                0xE000_00EE,
            ],
        );
        let mut machine = machine_at(&mut stack, &mut code);
        machine.set_flags(Flags::new(false, true, false, false));

        let outcome = run(&mut machine, &decode, &handlers(), 10);

        assert_eq!(outcome.executed, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(
            outcome.stop,
            StopReason::Fault(Fault::Decode {
                pc: CODE_BASE + 12,
                source: DecodeError::new(0xE000_00EE),
            })
        );
        assert_eq!(machine.reg(Register::R0), 7);
    }

    #[test]
    fn run_honors_step_limit() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 16];
        load_program(
            &mut code,
            &[encode(0xE, 0, 0x00), encode(0xE, CODE_BASE, 0x01)],
        );
        let mut machine = machine_at(&mut stack, &mut code);

        let outcome = run(&mut machine, &decode, &handlers(), 100);

        assert_eq!(outcome.executed, 100);
        assert_eq!(outcome.stop, StopReason::StepLimit);
        assert_eq!(machine.pc(), CODE_BASE);
    }

    #[test]
    fn branch_to_own_address_falls_through() {
        let mut stack = [0_u8; 64];
        let mut code = [0_u8; 16];
        load_program(&mut code, &[encode(0xE, CODE_BASE, 0x01)]);
        let mut machine = machine_at(&mut stack, &mut code);

        step_one(&mut machine, &decode, &handlers()).expect("branch runs");
        assert_eq!(machine.pc(), CODE_BASE + 4);
    }

    proptest! {
        #[test]
        fn not_taken_step_only_moves_pc(
            cond in 0_u8..15,
            cpsr in any::<u32>(),
            regs in proptest::array::uniform16(any::<u32>()),
        ) {
            let flags = Flags::from_cpsr(cpsr);
            prop_assume!(Condition::from_bits(cond).evaluate(flags) == Some(false));

            let mut stack = [0x5A_u8; 64];
            let mut code = [0_u8; 16];
            load_program(&mut code, &[encode(u32::from(cond), 0x1234, 0x02)]);
            let code_copy = code;
            {
                let mut machine = machine_at(&mut stack, &mut code);
                for (index, value) in regs.iter().enumerate().take(15) {
                    machine.set_register(index, *value);
                }
                machine.set_flags(flags);
                let before = machine.snapshot();

                let outcome = step_one(&mut machine, &decode, &handlers());
                let skipped = matches!(outcome, Ok(StepOutcome::Skipped { .. }));
                prop_assert!(skipped);

                let after = machine.snapshot();
                prop_assert_eq!(after.cpsr, before.cpsr);
                prop_assert_eq!(&after.registers[..15], &before.registers[..15]);
                prop_assert_eq!(after.registers[15], CODE_BASE + 4);
            }
            prop_assert!(stack.iter().all(|byte| *byte == 0x5A));
            prop_assert_eq!(code, code_copy);
        }
    }
}
