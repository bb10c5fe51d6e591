//! Assembly emission
//!
//! Runs last, once every frame is final. Per function the output is
//! strictly linear: entry marker, prologue, body blocks in order, exit
//! label, epilogue. Virtual registers are substituted through the
//! function's register map right before printing.

use crate::function::Function;
use crate::module::Module;
use log::{debug, info};
use rvcc_codegen::{emit_instructions, venus_preamble, AsmInst, Reg};
use rvcc_common::{CompilerError, Pass};
use rvcc_ir::IrNode;

/// Render the whole module as assembly text
pub fn emit_module(module: &Module, venus: bool) -> Result<String, CompilerError> {
    let insts = module_insts(module, venus)?;
    info!("Emitting {} instructions", insts.len());
    emit_instructions(&insts)
}

/// The final instruction list, before text formatting
pub fn module_insts(module: &Module, venus: bool) -> Result<Vec<AsmInst>, CompilerError> {
    let mut insts = Vec::new();

    if !module.data.is_empty() {
        insts.push(AsmInst::Section("data".to_string()));
        insts.extend(module.data.iter().cloned());
    }

    insts.push(AsmInst::Section("text".to_string()));
    if venus {
        insts.extend(venus_preamble());
    }

    for func in &module.functions {
        insts.extend(function_insts(func)?);
    }
    Ok(insts)
}

pub fn function_insts(func: &Function) -> Result<Vec<AsmInst>, CompilerError> {
    let layout = func.layout();
    let mut insts = Vec::new();

    let starts_with_marker = func
        .blocks
        .first()
        .and_then(|b| b.insts.first())
        .is_some_and(|i| matches!(i, AsmInst::Function(name) if *name == func.name));
    if !starts_with_marker {
        return Err(CompilerError::malformed(
            Pass::Emit,
            format!("function '{}' does not start with its entry marker", func.name),
        ));
    }

    for block in func.body_blocks() {
        for inst in &block.insts {
            let mut inst = inst.clone();
            inst.replace_all(&func.reg_map);
            let is_marker = matches!(inst, AsmInst::Function(_));
            insts.push(inst);
            if is_marker {
                insts.extend(layout.gen_prologue());
            }
        }
    }

    insts.push(AsmInst::Label(func.exit_label()));
    insts.extend(layout.gen_epilogue(return_value(func)?));

    debug!("'{}': frame {} bytes, {} instructions", func.name, layout.size, insts.len());
    Ok(insts)
}

/// Register named by the exit block's RETURN, resolved through the
/// register map
fn return_value(func: &Function) -> Result<Option<Reg>, CompilerError> {
    let node = func.exit_block().and_then(|b| b.ir.first());
    match node {
        Some(IrNode::Return { value: None }) => Ok(None),
        Some(IrNode::Return { value: Some(name) }) => Reg::from_name(name)
            .or_else(|| func.reg_map.get(name).copied())
            .map(Some)
            .ok_or_else(|| {
                CompilerError::malformed(
                    Pass::Emit,
                    format!("return value '{}' of '{}' has no register", name, func.name),
                )
            }),
        other => Err(CompilerError::malformed(
            Pass::Emit,
            format!(
                "exit block of '{}' holds {} instead of a RETURN",
                func.name,
                other.map_or_else(|| "nothing".to_string(), |n| n.to_string())
            ),
        )),
    }
}
