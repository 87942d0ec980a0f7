#![no_main]

use libfuzzer_sys::fuzz_target;
use cilsplice::{
    assembly::{Instruction, Label, Opcode, Operand, OperandType},
    injector::Cursor,
    metadata::{MethodContext, MethodSig, TypeSig},
    pattern::Matcher,
};

fn operand_for(opcode: Opcode, arg: u8) -> Operand {
    match opcode.operand_type() {
        OperandType::Local => Operand::Local(u16::from(arg % 8)),
        OperandType::Argument => Operand::Argument(u16::from(arg % 4)),
        OperandType::Target => Operand::Target(Label(u32::from(arg % 4))),
        OperandType::Switch => Operand::Switch(vec![Label(u32::from(arg % 4))]),
        OperandType::Type => Operand::Type(TypeSig::I32),
        // Leave call-shaped and other descriptor operands empty to exercise the error paths
        _ => Operand::None,
    }
}

fuzz_target!(|data: &[u8]| {
    let instructions = data
        .chunks_exact(2)
        .filter_map(|pair| {
            Opcode::from_repr(u16::from(pair[0])).map(|opcode| {
                Instruction::with_operand(opcode, operand_for(opcode, pair[1]))
            })
        })
        .collect::<Vec<_>>();

    let ctx = MethodContext::new(
        TypeSig::class("Fuzz"),
        "Target",
        MethodSig::new_instance(vec![TypeSig::I32, TypeSig::Object], TypeSig::Void),
    );

    let mut cursor = Cursor::new(instructions);
    for (step, &byte) in data.iter().enumerate().take(64) {
        let position = usize::from(byte % 4);
        let _ = match step % 6 {
            0 => cursor.seek_forward(&[Matcher::opcode(Opcode::Ret)]).map(|_| ()),
            1 => cursor.seek_by_stack_position(position).map(|_| ()),
            2 => cursor.infer_stack_type(&ctx, position).map(|_| ()),
            3 => cursor
                .insert_before_cursor(vec![Instruction::load_int(i32::from(byte))])
                .map(|_| ()),
            4 => cursor.remove(position).map(|_| ()),
            _ => cursor.seek_to(isize::from(byte) - 128).map(|_| ()),
        };
    }
    let _ = cursor.release();
});
