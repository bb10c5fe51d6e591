//! Error handling for the RISC-V TAC compiler
//!
//! Every stage of the pipeline reports failures through [`CompilerError`].
//! All of them are contract violations: the pipeline stops at the first one
//! and no assembly is produced.

use crate::source_loc::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pass {
    /// IR text reader
    Parse,
    /// Basic-block construction and exit unification
    Cfg,
    /// IR -> target instruction selection
    Select,
    /// Register allocation
    Alloc,
    /// Final assembly emission
    Emit,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Parse => write!(f, "parse"),
            Pass::Cfg => write!(f, "cfg-builder"),
            Pass::Select => write!(f, "instruction-selector"),
            Pass::Alloc => write!(f, "register-allocator"),
            Pass::Emit => write!(f, "assembly-emitter"),
        }
    }
}

/// Main compiler error type that encompasses all phases of compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("Parse error at {location}: {message}")]
    ParseError {
        location: SourceLocation,
        message: String,
    },

    /// A node reached a pass that cannot handle it
    #[error("Malformed input in {pass}: {message}")]
    MalformedInput {
        pass: Pass,
        message: String,
    },

    /// Frame allocation with a non-positive size, or one the frame cannot
    /// hold without overflowing
    #[error("Invalid frame allocation in {pass}: {size} bytes for '{key}' in function '{function}'")]
    InvalidAllocation {
        pass: Pass,
        function: String,
        key: String,
        size: i32,
    },

    #[error("IO error: {message}")]
    IoError { message: String },
}

impl CompilerError {
    /// Create a parse error
    pub fn parse_error(message: impl Into<String>, location: SourceLocation) -> Self {
        CompilerError::ParseError {
            location,
            message: message.into(),
        }
    }

    /// Create a malformed-input error attributed to `pass`
    pub fn malformed(pass: Pass, message: impl Into<String>) -> Self {
        CompilerError::MalformedInput {
            pass,
            message: message.into(),
        }
    }

    /// Attribute a frame allocation failure to the pass that requested it
    pub fn in_pass(self, pass: Pass) -> Self {
        match self {
            CompilerError::InvalidAllocation { function, key, size, .. } => {
                CompilerError::InvalidAllocation { pass, function, key, size }
            }
            other => other,
        }
    }

    /// The pass a diagnostic belongs to, when it has one
    pub fn pass(&self) -> Option<Pass> {
        match self {
            CompilerError::ParseError { .. } => Some(Pass::Parse),
            CompilerError::MalformedInput { pass, .. } | CompilerError::InvalidAllocation { pass, .. } => {
                Some(*pass)
            }
            CompilerError::IoError { .. } => None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IoError {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_malformed_names_pass() {
        let err = CompilerError::malformed(Pass::Select, "RETURN outside exit block");
        assert_eq!(err.pass(), Some(Pass::Select));
        assert_eq!(
            err.to_string(),
            "Malformed input in instruction-selector: RETURN outside exit block"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = CompilerError::parse_error("unknown node", SourceLocation::new("prog.ir", 3));
        assert_eq!(err.to_string(), "Parse error at prog.ir:3: unknown node");
    }

    #[test]
    fn test_invalid_allocation_names_pass_and_key() {
        let err = CompilerError::InvalidAllocation {
            pass: Pass::Alloc,
            function: "main".to_string(),
            key: "buf".to_string(),
            size: 0,
        };
        assert_eq!(err.pass(), Some(Pass::Alloc));

        let err = err.in_pass(Pass::Select);
        assert_eq!(err.pass(), Some(Pass::Select));
        assert_eq!(
            err.to_string(),
            "Invalid frame allocation in instruction-selector: 0 bytes for 'buf' in function 'main'"
        );
    }

    #[test]
    fn test_in_pass_keeps_other_errors() {
        let err = CompilerError::malformed(Pass::Cfg, "unknown label").in_pass(Pass::Select);
        assert_eq!(err.pass(), Some(Pass::Cfg));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.ir");
        let err: CompilerError = io.into();
        assert!(matches!(err, CompilerError::IoError { .. }));
        assert_eq!(err.pass(), None);
    }
}
