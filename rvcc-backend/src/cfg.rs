//! Control-flow graph construction
//!
//! Splits the flat IR stream into functions and basic blocks. A block starts
//! at every LABEL and right after every GOTO or IF. All returns are routed
//! through one exit block per function:
//!
//! ```text
//! RETURN x   =>   a0 = x
//!                 GOTO f.ret
//! ```
//!
//! The exit block holds a single `RETURN a0` (or a bare `RETURN`), which the
//! emitter turns into the epilogue.

use crate::function::{BasicBlock, Function};
use crate::module::{Global, Module};
use crate::naming::NameGenerator;
use log::{debug, info, trace};
use rvcc_codegen::{CallingConvention, Reg};
use rvcc_common::{CompilerError, Pass};
use rvcc_ir::IrNode;
use std::collections::{HashMap, HashSet};

/// Build a module from an IR stream
pub fn build(nodes: Vec<IrNode>, names: &mut NameGenerator) -> Result<Module, CompilerError> {
    let mut module = Module::new();
    let mut streams: Vec<(String, Vec<IrNode>)> = Vec::new();

    for node in nodes {
        match node {
            IrNode::Global { name, size, init } => module.globals.push(Global { name, size, init }),
            IrNode::Function { name } => streams.push((name.clone(), vec![IrNode::Function { name }])),
            other => match streams.last_mut() {
                Some((_, body)) => body.push(other),
                None => {
                    return Err(CompilerError::malformed(
                        Pass::Cfg,
                        format!("'{}' appears outside of any function", other),
                    ))
                }
            },
        }
    }

    for (name, body) in streams {
        if module.function(&name).is_some() {
            return Err(CompilerError::malformed(
                Pass::Cfg,
                format!("function '{}' defined twice", name),
            ));
        }
        let func = build_function(&name, body, names)?;
        module.functions.push(func);
    }

    info!(
        "Built CFG: {} functions, {} globals",
        module.functions.len(),
        module.globals.len()
    );
    Ok(module)
}

/// Every name must be written before it is read, in stream order. Names that
/// spell machine registers are always available.
fn check_defined_before_use(function: &str, body: &[IrNode]) -> Result<(), CompilerError> {
    let mut defined: HashSet<&str> = HashSet::new();
    for node in body {
        for name in node.uses() {
            if Reg::from_name(name).is_none() && !defined.contains(name) {
                return Err(CompilerError::malformed(
                    Pass::Cfg,
                    format!("'{}' in function '{}' reads '{}' before it is defined", node, function, name),
                ));
            }
        }
        if let Some(name) = node.def() {
            defined.insert(name);
        }
    }
    Ok(())
}

fn build_function(
    name: &str,
    body: Vec<IrNode>,
    names: &mut NameGenerator,
) -> Result<Function, CompilerError> {
    check_defined_before_use(name, &body)?;

    let mut func = Function::new(name);
    let exit_label = func.exit_label();
    let mut returns_value = false;
    let mut returns_void = false;

    let mut blocks: Vec<BasicBlock> = Vec::new();
    let mut current: Option<BasicBlock> = Some(BasicBlock::new(NameGenerator::entry_label(name)));

    for node in body {
        match node {
            IrNode::Label { name: label } => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
                let mut block = BasicBlock::new(label.clone());
                block.ir.push(IrNode::Label { name: label });
                current = Some(block);
            }
            IrNode::Return { value } => {
                let block = current.get_or_insert_with(|| BasicBlock::new(names.fresh_block_label(name)));
                match value {
                    Some(value) => {
                        returns_value = true;
                        block.ir.push(IrNode::Assign {
                            dest: CallingConvention::RETURN_REG.name().to_string(),
                            src: value,
                        });
                    }
                    None => returns_void = true,
                }
                block.ir.push(IrNode::Goto { label: exit_label.clone() });
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            node => {
                let ends_block = node.branch_target().is_some();
                let block = current.get_or_insert_with(|| BasicBlock::new(names.fresh_block_label(name)));
                block.ir.push(node);
                if ends_block {
                    if let Some(block) = current.take() {
                        blocks.push(block);
                    }
                }
            }
        }
    }
    if let Some(block) = current.take() {
        blocks.push(block);
    }

    if returns_value && returns_void {
        return Err(CompilerError::malformed(
            Pass::Cfg,
            format!("function '{}' mixes RETURN with and without a value", name),
        ));
    }

    let mut exit = BasicBlock::new(exit_label);
    exit.ir.push(IrNode::Return {
        value: returns_value.then(|| CallingConvention::RETURN_REG.name().to_string()),
    });
    blocks.push(exit);

    link_blocks(name, &mut blocks)?;

    debug!(
        "Function '{}': {} blocks, returns {}",
        name,
        blocks.len(),
        if returns_value { "a value" } else { "void" }
    );
    for block in &blocks {
        trace!("  {} -> {:?}", block.label, block.succs);
    }

    func.blocks = blocks;
    func.returns_value = returns_value;
    Ok(func)
}

/// Fill in successor and predecessor indices
fn link_blocks(function: &str, blocks: &mut [BasicBlock]) -> Result<(), CompilerError> {
    let mut index_of: HashMap<String, usize> = HashMap::new();
    for (i, block) in blocks.iter().enumerate() {
        if index_of.insert(block.label.clone(), i).is_some() {
            return Err(CompilerError::malformed(
                Pass::Cfg,
                format!("label '{}' defined twice in function '{}'", block.label, function),
            ));
        }
    }

    let exit = blocks.len() - 1;
    for (i, block) in blocks.iter_mut().take(exit).enumerate() {
        let mut succs = Vec::new();
        let last = block.ir.last();
        if let Some(target) = last.and_then(IrNode::branch_target) {
            let target_index = *index_of.get(target).ok_or_else(|| {
                CompilerError::malformed(
                    Pass::Cfg,
                    format!("jump to unknown label '{}' in function '{}'", target, function),
                )
            })?;
            succs.push(target_index);
        }
        if last.is_none_or(IrNode::falls_through) && !succs.contains(&(i + 1)) {
            succs.push(i + 1);
        }
        block.succs = succs;
    }

    let edges: Vec<(usize, usize)> = blocks
        .iter()
        .enumerate()
        .flat_map(|(i, block)| block.succs.iter().map(move |&s| (i, s)))
        .collect();
    for (from, to) in edges {
        blocks[to].preds.push(from);
    }
    Ok(())
}
