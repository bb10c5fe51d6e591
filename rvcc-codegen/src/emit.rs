//! Text output for instruction lists
//!
//! Labels sit flush left, everything else is indented four spaces.

use crate::asm::{AsmInst, Reg};
use rvcc_common::{CompilerError, Pass};

const INDENT: &str = "    ";

/// Venus environment call numbers
const ECALL_PRINT_INT: i32 = 1;
const ECALL_READ_INT: i32 = 6;

/// Render one instruction as one or more output lines
pub fn format_inst(inst: &AsmInst) -> String {
    match inst {
        AsmInst::Label(_) => inst.to_string(),
        AsmInst::Function(name) => format!("{}{}\n{}", INDENT, AsmInst::Global(name.clone()), inst),
        _ => format!("{}{}", INDENT, inst),
    }
}

/// Render a fully allocated instruction list
///
/// Fails if any virtual register is still present: every operand must have
/// been resolved to a machine register before text is produced.
pub fn emit_instructions(insts: &[AsmInst]) -> Result<String, CompilerError> {
    let mut out = String::new();
    for inst in insts {
        if let Some(name) = inst.virtual_regs().first() {
            return Err(CompilerError::malformed(
                Pass::Emit,
                format!("unallocated virtual register '{}' in '{}'", name, inst),
            ));
        }
        out.push_str(&format_inst(inst));
        out.push('\n');
    }
    Ok(out)
}

/// Support routines for the Venus simulator: `read` returns an integer from
/// the console in a0, `write` prints the integer passed in a0
pub fn venus_preamble() -> Vec<AsmInst> {
    vec![
        AsmInst::Function("read".to_string()),
        AsmInst::Li(Reg::A0.into(), ECALL_READ_INT),
        AsmInst::Ecall,
        AsmInst::Ret,
        AsmInst::Function("write".to_string()),
        AsmInst::Mv(Reg::A1.into(), Reg::A0.into()),
        AsmInst::Li(Reg::A0.into(), ECALL_PRINT_INT),
        AsmInst::Ecall,
        AsmInst::Ret,
    ]
}
