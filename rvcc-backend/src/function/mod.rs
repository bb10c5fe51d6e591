//! Functions and their basic blocks
//!
//! A `Function` owns its blocks, its frame and the register map filled in by
//! the allocator. Blocks refer to each other by index only.

mod frame;

pub use frame::Frame;

use crate::naming::NameGenerator;
use rvcc_codegen::{AsmInst, FrameLayout, Reg};
use rvcc_ir::IrNode;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: String,

    /// IR nodes in program order
    pub ir: Vec<IrNode>,

    /// Target instructions, filled in by the selector and rewritten by the
    /// allocator
    pub insts: Vec<AsmInst>,

    /// Successor block indices
    pub succs: Vec<usize>,

    /// Predecessor block indices
    pub preds: Vec<usize>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ir: Vec::new(),
            insts: Vec::new(),
            succs: Vec::new(),
            preds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,

    /// Body blocks in program order; the last one is always the exit block
    pub blocks: Vec<BasicBlock>,

    pub frame: Frame,

    /// Virtual register -> machine register, written by the allocator
    pub reg_map: HashMap<String, Reg>,

    /// Callee-saved registers in use and their saved-region slots
    pub saved_regs: Vec<(Reg, i32)>,

    /// Whether the function returns a value in a0
    pub returns_value: bool,
}

impl Function {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            blocks: Vec::new(),
            frame: Frame::new(name),
            reg_map: HashMap::new(),
            saved_regs: Vec::new(),
            returns_value: false,
        }
    }

    pub fn exit_label(&self) -> String {
        NameGenerator::exit_label(&self.name)
    }

    pub fn exit_index(&self) -> usize {
        self.blocks.len().saturating_sub(1)
    }

    pub fn exit_block(&self) -> Option<&BasicBlock> {
        self.blocks.last()
    }

    /// Every block except the exit block
    pub fn body_blocks(&self) -> &[BasicBlock] {
        match self.blocks.split_last() {
            Some((_, body)) => body,
            None => &[],
        }
    }

    /// Frame shape for prologue and epilogue generation
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self.frame.size(), self.saved_regs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_block_is_last() {
        let mut func = Function::new("f");
        func.blocks.push(BasicBlock::new("f.entry"));
        func.blocks.push(BasicBlock::new("f.ret"));
        assert_eq!(func.exit_index(), 1);
        assert_eq!(func.exit_block().map(|b| b.label.as_str()), Some("f.ret"));
        assert_eq!(func.body_blocks().len(), 1);
        assert_eq!(func.exit_label(), "f.ret");
    }

    #[test]
    fn test_layout_tracks_frame() {
        let mut func = Function::new("f");
        func.frame.alloc_temp(4, "x").unwrap();
        func.saved_regs.push((Reg::S1, func.frame.alloc_reg(4, "s1").unwrap()));
        let layout = func.layout();
        assert_eq!(layout.size, 16);
        assert_eq!(layout.saved_regs, vec![(Reg::S1, -12)]);
    }
}
