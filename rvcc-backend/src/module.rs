//! The compilation unit: globals plus functions, in declaration order

use crate::function::Function;
use rvcc_codegen::AsmInst;
use rvcc_ir::IrNode;

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    /// Size in bytes
    pub size: i32,
    pub init: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,

    /// Data section contents, filled in by the selector
    pub data: Vec<AsmInst>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Flatten back into an IR stream: globals first, then every function's
    /// blocks in order with the exit block's label made explicit
    pub fn ir(&self) -> Vec<IrNode> {
        let mut nodes: Vec<IrNode> = self
            .globals
            .iter()
            .map(|g| IrNode::Global {
                name: g.name.clone(),
                size: g.size,
                init: g.init.clone(),
            })
            .collect();

        for func in &self.functions {
            for block in func.body_blocks() {
                nodes.extend(block.ir.iter().cloned());
            }
            if let Some(exit) = func.exit_block() {
                nodes.push(IrNode::Label { name: exit.label.clone() });
                nodes.extend(exit.ir.iter().cloned());
            }
        }
        nodes
    }
}
