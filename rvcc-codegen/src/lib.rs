//! RISC-V TAC Compiler - Instruction Set Model
//!
//! This crate holds everything that is specific to the RISC-V target:
//!
//! - Register and instruction definitions
//! - ABI implementation (register roles, immediate window, frame setup)
//! - Text emission of instruction lists

pub mod abi;
pub mod asm;
pub mod emit;

pub use abi::{fits_imm12, CallingConvention, FrameLayout};
pub use asm::{ArithOp, AsmInst, BranchOp, Reg, Register};
pub use emit::{emit_instructions, format_inst, venus_preamble};
