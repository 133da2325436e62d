#![no_main]

use armv7_core::{
    apply_shift, resolve_operand, step_one, Condition, DecodeError, DecodedInstruction, Fault,
    HandlerTable, InstructionKind, Machine, Register, RotateZeroPolicy, ShiftKind,
};
use libfuzzer_sys::fuzz_target;

const CODE_BASE: u32 = 0x0001_0000;

fn decode(opcode: u32) -> Result<DecodedInstruction, DecodeError> {
    let kind = *InstructionKind::ALL
        .get((opcode & 0xFF) as usize)
        .ok_or(DecodeError::new(opcode))?;
    let condition = if opcode & 0x0800_0000 != 0 {
        Condition::Invalid
    } else {
        Condition::from_opcode(opcode)
    };
    Ok(DecodedInstruction {
        rd: Register::from_u4(((opcode >> 8) & 0xF) as u8),
        rm: Register::from_u4(((opcode >> 12) & 0xF) as u8),
        shift_kind: ShiftKind::from_bits(opcode >> 16),
        shift_amount: (opcode >> 18) & 0x3F,
        ..DecodedInstruction::new(kind, condition)
    })
}

fn write_shifted(machine: &mut Machine<'_>, decoded: &DecodedInstruction) -> Result<(), Fault> {
    let (value, carry) = machine.resolve_operand(decoded);
    let sp = machine.reg(Register::SP);
    machine.write32(sp.wrapping_sub(4), value)?;
    if let Some(rd) = decoded.rd {
        machine.set_reg(rd, value);
    }
    machine.flags_mut().c = carry;
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 13 {
        return;
    }

    let value = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let amount = u32::from(data[4]);
    let carry = data[5] & 1 != 0;
    let kind = ShiftKind::from_bits(u32::from(data[5] >> 1));
    let (result, _) = apply_shift(kind, value, amount, carry);
    if amount == 0 {
        assert_eq!(result, value);
    }

    let decoded = DecodedInstruction {
        shift_kind: kind,
        shift_amount: amount,
        ..DecodedInstruction::new(InstructionKind::Mov, Condition::Al)
    };
    let shift_register = Some(u32::from(data[6]));
    let _ = resolve_operand(&decoded, value, shift_register, carry, RotateZeroPolicy::Extend);

    let mut stack = [0_u8; 64];
    let mut code = data[7..].to_vec();
    let Ok(mut machine) = Machine::new(&mut stack) else {
        return;
    };
    if machine.add_mapping(&mut code, CODE_BASE).is_err() {
        return;
    }
    machine.set_pc(CODE_BASE);
    machine.set_flags_packed(u32::from(data[6]) << 24);

    let mut handlers = HandlerTable::new();
    for kind in InstructionKind::ALL.iter().step_by(2) {
        handlers.register(*kind, write_shifted);
    }

    for _ in 0..64 {
        let before = machine.snapshot();
        if step_one(&mut machine, &decode, &handlers).is_err() {
            // Handlers here fault before writing any register.
            assert_eq!(machine.snapshot(), before);
            break;
        }
    }
});
