//! RISC-V TAC Compiler - Common Types and Utilities
//!
//! This crate contains the error type and source locations shared by
//! every stage of the compiler.

pub mod error;
pub mod source_loc;

pub use error::{CompilerError, Pass};
pub use source_loc::SourceLocation;
