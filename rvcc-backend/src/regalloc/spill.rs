//! Reload and store code for spilled virtual registers

use crate::function::Function;
use log::trace;
use rvcc_codegen::abi::{load_word, store_word};
use rvcc_codegen::{AsmInst, CallingConvention, Reg};
use std::collections::HashMap;

/// Where a spilled value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// sp-relative, temp region
    Temp(i32),
    /// fp-relative, saved region
    Saved(i32),
}

impl Slot {
    fn base(&self) -> Reg {
        match self {
            Slot::Temp(_) => CallingConvention::STACK_PTR,
            Slot::Saved(_) => CallingConvention::FRAME_PTR,
        }
    }

    fn offset(&self) -> i32 {
        match self {
            Slot::Temp(offset) | Slot::Saved(offset) => *offset,
        }
    }
}

pub type SpillSlots = HashMap<String, Slot>;

pub(super) fn rewrite_function(func: &mut Function, slots: &SpillSlots) {
    if slots.is_empty() {
        return;
    }
    for block in &mut func.blocks {
        let insts = std::mem::take(&mut block.insts);
        block.insts = insts.into_iter().flat_map(|inst| rewrite_inst(inst, slots)).collect();
    }
}

/// Route spilled operands through the scratch registers: source operand `i`
/// is reloaded into `SPILL_SRC[i]`, the destination is written to
/// `SPILL_DEST` and stored back
pub(super) fn rewrite_inst(mut inst: AsmInst, slots: &SpillSlots) -> Vec<AsmInst> {
    let scratch = CallingConvention::FRAME_SCRATCH;
    let mut code = Vec::new();
    let mut store = Vec::new();

    for (position, operand) in inst.uses_mut().into_iter().enumerate() {
        let slot = operand.as_virtual().and_then(|name| slots.get(name)).copied();
        if let Some(slot) = slot {
            let reload = CallingConvention::SPILL_SRC[position];
            code.extend(load_word(reload.into(), slot.base().into(), slot.offset(), scratch));
            *operand = reload.into();
        }
    }

    if let Some(rd) = inst.def_mut() {
        let slot = rd.as_virtual().and_then(|name| slots.get(name)).copied();
        if let Some(slot) = slot {
            let dest = CallingConvention::SPILL_DEST;
            store = store_word(dest.into(), slot.base().into(), slot.offset(), scratch);
            *rd = dest.into();
        }
    }

    if !code.is_empty() || !store.is_empty() {
        trace!("spill rewrite: {}", inst);
    }
    code.push(inst);
    code.extend(store);
    code
}
