//! Register Allocation
//!
//! Two policies are available:
//!
//! - `SpillEverywhere` keeps every virtual register in a temp-region slot.
//!   Each use is reloaded into t1/t2 right before the instruction and each
//!   definition goes through t0 and is stored right after. No analysis,
//!   always correct.
//! - `Liveness` colours an interference graph built from whole-function
//!   liveness. Only what does not fit is spilled, with the same reload and
//!   store code.
//!
//! A value live across a `call` only ever gets a callee-saved register or a
//! saved-region slot: the call clobbers every caller-saved register.
//!
//! ## Architecture
//!
//! - `liveness.rs` - dataflow and interference graph
//! - `coloring.rs` - greedy colouring
//! - `spill.rs` - reload/store rewriting

mod coloring;
mod liveness;
mod spill;


pub use coloring::{color, color_with, Coloring};
pub use liveness::{analyze, build_interference, InterferenceGraph, Liveness};
pub use spill::{Slot, SpillSlots};

use crate::function::Function;
use crate::module::Module;
use log::{debug, info};
use rvcc_codegen::{CallingConvention, Reg};
use rvcc_common::CompilerError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which allocator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocPolicy {
    SpillEverywhere,
    #[default]
    Liveness,
}

pub fn allocate_module(module: &mut Module, policy: AllocPolicy) -> Result<(), CompilerError> {
    info!("Allocating registers ({:?}) for {} functions", policy, module.functions.len());
    for func in &mut module.functions {
        allocate_function(func, policy)?;
    }
    Ok(())
}

pub fn allocate_function(func: &mut Function, policy: AllocPolicy) -> Result<(), CompilerError> {
    match policy {
        AllocPolicy::SpillEverywhere => spill_everywhere(func)?,
        AllocPolicy::Liveness => allocate_with_liveness(func)?,
    }
    debug!(
        "'{}': {} registers assigned, frame {} bytes (temp {}, saved {})",
        func.name,
        func.reg_map.len(),
        func.frame.size(),
        func.frame.temp_size(),
        func.frame.saved_size()
    );
    Ok(())
}

/// Virtual registers of a function in order of first appearance
pub fn virtual_regs_in_order(func: &Function) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for inst in func.blocks.iter().flat_map(|b| b.insts.iter()) {
        for name in inst.virtual_regs() {
            if seen.insert(name) {
                order.push(name.to_string());
            }
        }
    }
    order
}

fn spill_everywhere(func: &mut Function) -> Result<(), CompilerError> {
    let mut slots = SpillSlots::new();
    for name in virtual_regs_in_order(func) {
        let offset = func.frame.alloc_temp(CallingConvention::WORD_SIZE, &name)?;
        slots.insert(name, Slot::Temp(offset));
    }
    spill::rewrite_function(func, &slots);
    Ok(())
}

fn allocate_with_liveness(func: &mut Function) -> Result<(), CompilerError> {
    let liveness = analyze(func);
    let graph = build_interference(func, &liveness);
    let coloring = color(&graph);

    let mut slots = SpillSlots::new();
    for name in &coloring.spilled {
        let slot = if graph.across_call.contains(name) {
            Slot::Saved(func.frame.alloc_reg(CallingConvention::WORD_SIZE, name)?)
        } else {
            Slot::Temp(func.frame.alloc_temp(CallingConvention::WORD_SIZE, name)?)
        };
        debug!("'{}': spilling {} to {:?}", func.name, name, slot);
        slots.insert(name.clone(), slot);
    }

    let mut callee_saved: Vec<Reg> = coloring
        .assigned
        .values()
        .copied()
        .filter(|r| CallingConvention::is_callee_saved(*r))
        .collect();
    callee_saved.sort();
    callee_saved.dedup();
    for reg in callee_saved {
        let offset = func.frame.alloc_reg(CallingConvention::WORD_SIZE, reg.name())?;
        func.saved_regs.push((reg, offset));
    }

    func.reg_map = coloring.assigned;
    spill::rewrite_function(func, &slots);
    Ok(())
}
