//! RISC-V TAC Compiler - Backend
//!
//! Turns an IR stream into RV32IM assembly text:
//!
//! ```text
//! IR -> cfg::build -> select -> regalloc -> emit -> text
//! ```
//!
//! Each pass works on the `Module` in place. The first failure stops the
//! pipeline and no text is produced.

pub mod cfg;
pub mod emit;
pub mod function;
pub mod module;
pub mod naming;
pub mod regalloc;
pub mod select;

#[cfg(test)]
mod tests;

pub use emit::emit_module;
pub use function::{BasicBlock, Frame, Function};
pub use module::{Global, Module};
pub use naming::NameGenerator;
pub use regalloc::AllocPolicy;

use log::info;
use rvcc_codegen::CallingConvention;
use rvcc_common::CompilerError;
use rvcc_ir::IrNode;
use serde::{Deserialize, Serialize};

/// Options for the backend pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOptions {
    pub policy: AllocPolicy,
    /// Emit the `read`/`write` support routines for the Venus simulator
    pub venus: bool,
    /// Pad every frame to the stack alignment
    pub align_frames: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            policy: AllocPolicy::default(),
            venus: false,
            align_frames: true,
        }
    }
}

/// Run every pass up to, but not including, emission
pub fn lower(nodes: Vec<IrNode>, options: &BackendOptions) -> Result<Module, CompilerError> {
    let mut names = NameGenerator::new();
    let mut module = cfg::build(nodes, &mut names)?;
    select::select_module(&mut module)?;
    regalloc::allocate_module(&mut module, options.policy)?;

    if options.align_frames {
        for func in &mut module.functions {
            func.frame.align(CallingConvention::STACK_ALIGN)?;
        }
    }
    Ok(module)
}

/// Compile an IR stream to assembly text
pub fn compile(nodes: Vec<IrNode>, options: &BackendOptions) -> Result<String, CompilerError> {
    info!("Compiling {} IR nodes with {:?}", nodes.len(), options);
    let module = lower(nodes, options)?;
    emit_module(&module, options.venus)
}
