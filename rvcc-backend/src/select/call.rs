//! Calling-convention lowering
//!
//! Arguments 0-7 travel in a0-a7. Argument 8 onward is stored into the
//! caller's outgoing area at the bottom of its frame, `4*(k-8)(sp)`, which
//! the callee reads back as `4*(i-8)(fp)`.

use super::reg;
use crate::function::{Frame, Function};
use crate::naming::NameGenerator;
use log::debug;
use rvcc_codegen::abi::{load_word, store_word};
use rvcc_codegen::{AsmInst, CallingConvention};
use rvcc_common::CompilerError;
use rvcc_ir::IrNode;

/// Reserve the outgoing argument slots before anything else lands in the
/// temp region, so argument `k` sits at exactly `4*(k-8)(sp)`
pub(super) fn reserve_outgoing_args(func: &mut Function) -> Result<(), CompilerError> {
    let max_index = func
        .blocks
        .iter()
        .flat_map(|b| b.ir.iter())
        .filter_map(|node| match node {
            IrNode::Arg { index, .. } => Some(*index),
            _ => None,
        })
        .max();

    if let Some(max_index) = max_index {
        for index in CallingConvention::ARG_REGS.len()..=max_index {
            let offset = func
                .frame
                .alloc_temp(CallingConvention::WORD_SIZE, &NameGenerator::outgoing_arg_key(index))?;
            debug_assert_eq!(offset, CallingConvention::stack_arg_offset(index));
        }
        if max_index >= CallingConvention::ARG_REGS.len() {
            debug!(
                "'{}' passes up to {} arguments, {} on the stack",
                func.name,
                max_index + 1,
                max_index + 1 - CallingConvention::ARG_REGS.len()
            );
        }
    }
    Ok(())
}

pub(super) fn lower_arg(
    src: &str,
    index: usize,
    frame: &mut Frame,
) -> Result<Vec<AsmInst>, CompilerError> {
    if let Some(arg_reg) = CallingConvention::arg_reg(index) {
        return Ok(vec![AsmInst::Mv(arg_reg.into(), reg(src))]);
    }

    let offset = frame.alloc_temp(CallingConvention::WORD_SIZE, &NameGenerator::outgoing_arg_key(index))?;
    Ok(store_word(
        reg(src),
        CallingConvention::STACK_PTR.into(),
        offset,
        CallingConvention::ADDRESS_SCRATCH,
    ))
}

pub(super) fn lower_param(dest: &str, index: usize) -> Vec<AsmInst> {
    match CallingConvention::arg_reg(index) {
        Some(arg_reg) => vec![AsmInst::Mv(reg(dest), arg_reg.into())],
        None => load_word(
            reg(dest),
            CallingConvention::FRAME_PTR.into(),
            CallingConvention::stack_arg_offset(index),
            CallingConvention::ADDRESS_SCRATCH,
        ),
    }
}

/// Registers live across the call are kept safe by the allocator, which
/// never leaves such a value in a caller-saved register
pub(super) fn lower_call(dest: Option<&str>, func: &str) -> Vec<AsmInst> {
    let mut insts = vec![AsmInst::Call(func.to_string())];
    if let Some(dest) = dest {
        insts.push(AsmInst::Mv(reg(dest), CallingConvention::RETURN_REG.into()));
    }
    insts
}
