//! Memory access lowering
//!
//! Offsets outside the 12-bit window go through t6: `li t6, off`,
//! `add t6, base, t6`, then the access at `0(t6)`.

use super::reg;
use crate::function::Frame;
use rvcc_codegen::abi::{add_imm, load_word, store_word};
use rvcc_codegen::{AsmInst, CallingConvention};
use rvcc_common::CompilerError;

pub(super) fn lower_load(dest: &str, addr: &str, offset: i32) -> Vec<AsmInst> {
    load_word(reg(dest), reg(addr), offset, CallingConvention::ADDRESS_SCRATCH)
}

pub(super) fn lower_store(addr: &str, src: &str, offset: i32) -> Vec<AsmInst> {
    store_word(reg(src), reg(addr), offset, CallingConvention::ADDRESS_SCRATCH)
}

/// `dest` receives the address of a fresh buffer in the temp region
pub(super) fn lower_dec(dest: &str, size: i32, frame: &mut Frame) -> Result<Vec<AsmInst>, CompilerError> {
    let offset = frame.alloc_dec(size, dest)?;
    Ok(add_imm(
        reg(dest),
        CallingConvention::STACK_PTR.into(),
        offset,
        CallingConvention::ADDRESS_SCRATCH,
    ))
}

pub(super) fn lower_load_addr(dest: &str, global: &str) -> Vec<AsmInst> {
    vec![AsmInst::La(reg(dest), global.to_string())]
}
