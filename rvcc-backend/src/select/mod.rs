//! Instruction Selection
//!
//! Rewrites each block's IR into RISC-V instructions on virtual registers.
//! Every IR node maps to a fixed template and program order is preserved.
//!
//! ## Architecture
//!
//! - `call.rs` - arguments, parameters and calls
//! - `memory.rs` - loads, stores, local buffers, global addresses
//! - `data.rs` - data section for globals
//!
//! The exit block's RETURN produces nothing here; the emitter builds the
//! epilogue from it.

mod call;
mod data;
mod memory;

#[cfg(test)]
mod tests;

pub use data::lower_globals;

use crate::function::{Frame, Function};
use crate::module::Module;
use log::{debug, info, trace};
use rvcc_codegen::{ArithOp, AsmInst, BranchOp, Reg, Register};
use rvcc_common::{CompilerError, Pass};
use rvcc_ir::{BinaryOp, IrNode, RelOp, UnaryOp};

/// Select instructions for every function and lay out the data section
pub fn select_module(module: &mut Module) -> Result<(), CompilerError> {
    info!("Selecting instructions for {} functions", module.functions.len());
    module.data = lower_globals(&module.globals)?;
    for func in &mut module.functions {
        select_function(func)?;
    }
    Ok(())
}

pub fn select_function(func: &mut Function) -> Result<(), CompilerError> {
    call::reserve_outgoing_args(func).map_err(|e| e.in_pass(Pass::Select))?;

    let exit = func.exit_index();
    let Function { name, blocks, frame, .. } = func;
    let name: &str = name;

    for (index, block) in blocks.iter_mut().enumerate() {
        let mut insts = Vec::new();
        for node in &block.ir {
            if index == exit {
                if let IrNode::Return { .. } = node {
                    continue;
                }
                return Err(CompilerError::malformed(
                    Pass::Select,
                    format!("'{}' in exit block of '{}'", node, name),
                ));
            }
            let selected = select_node(node, frame, name).map_err(|e| e.in_pass(Pass::Select))?;
            trace!("{} => {:?}", node, selected);
            insts.extend(selected);
        }
        block.insts = insts;
    }

    debug!(
        "Selected {} instructions for '{}'",
        blocks.iter().map(|b| b.insts.len()).sum::<usize>(),
        name
    );
    Ok(())
}

/// IR names are virtual registers unless they spell a machine register
pub(crate) fn reg(name: &str) -> Register {
    Register::from_name(name)
}

fn arith_op(op: BinaryOp) -> ArithOp {
    match op {
        BinaryOp::Add => ArithOp::Add,
        BinaryOp::Sub => ArithOp::Sub,
        BinaryOp::Mul => ArithOp::Mul,
        BinaryOp::Div => ArithOp::Div,
        BinaryOp::Mod => ArithOp::Rem,
        BinaryOp::And => ArithOp::And,
        BinaryOp::Or => ArithOp::Or,
        BinaryOp::Xor => ArithOp::Xor,
        BinaryOp::Shl => ArithOp::Sll,
        BinaryOp::Shr => ArithOp::Sra,
        BinaryOp::Lt => ArithOp::Slt,
    }
}

fn branch_op(op: RelOp) -> BranchOp {
    match op {
        RelOp::Eq => BranchOp::Beq,
        RelOp::Ne => BranchOp::Bne,
        RelOp::Lt => BranchOp::Blt,
        RelOp::Le => BranchOp::Ble,
        RelOp::Gt => BranchOp::Bgt,
        RelOp::Ge => BranchOp::Bge,
    }
}

fn select_node(node: &IrNode, frame: &mut Frame, function: &str) -> Result<Vec<AsmInst>, CompilerError> {
    let insts = match node {
        IrNode::LoadImm { dest, value } => vec![AsmInst::Li(reg(dest), *value)],
        IrNode::Assign { dest, src } => vec![AsmInst::Mv(reg(dest), reg(src))],
        IrNode::Binary { dest, lhs, op, rhs } => {
            vec![AsmInst::Arith(arith_op(*op), reg(dest), reg(lhs), reg(rhs))]
        }
        IrNode::Unary { dest, op: UnaryOp::Neg, src } => {
            vec![AsmInst::Arith(ArithOp::Sub, reg(dest), Reg::Zero.into(), reg(src))]
        }
        IrNode::Label { name } => vec![AsmInst::Label(name.clone())],
        IrNode::Goto { label } => vec![AsmInst::J(label.clone())],
        IrNode::CondBranch { lhs, op, rhs, label } => {
            vec![AsmInst::Branch(branch_op(*op), reg(lhs), reg(rhs), label.clone())]
        }
        IrNode::Function { name } => vec![AsmInst::Function(name.clone())],
        IrNode::Call { dest, func } => call::lower_call(dest.as_deref(), func),
        IrNode::Arg { src, index } => call::lower_arg(src, *index, frame)?,
        IrNode::Param { dest, index } => call::lower_param(dest, *index),
        IrNode::Dec { dest, size } => memory::lower_dec(dest, *size, frame)?,
        IrNode::LoadAddr { dest, global } => memory::lower_load_addr(dest, global),
        IrNode::Load { dest, addr, offset } => memory::lower_load(dest, addr, *offset),
        IrNode::Store { addr, src, offset } => memory::lower_store(addr, src, *offset),
        IrNode::Return { .. } => {
            return Err(CompilerError::malformed(
                Pass::Select,
                format!("'{}' outside the exit block of '{}'", node, function),
            ))
        }
        IrNode::Global { .. } => {
            return Err(CompilerError::malformed(
                Pass::Select,
                format!("'{}' inside function '{}'", node, function),
            ))
        }
    };
    Ok(insts)
}
