//! RISC-V TAC Compiler - Intermediate Representation
//!
//! The three-address IR consumed by the backend, its text form and a reader
//! for it.

pub mod ir;
pub mod parse;

pub use ir::{display_program, BinaryOp, IrNode, RelOp, UnaryOp};
pub use parse::Parser;
