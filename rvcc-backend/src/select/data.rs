//! Data section layout for globals
//!
//! An absent or all-zero initializer becomes one `.zero size`. Otherwise
//! the global gets exactly `size / 4` `.word` directives, the initializer
//! padded with zeros.

use crate::module::Global;
use log::debug;
use rvcc_codegen::{AsmInst, CallingConvention};
use rvcc_common::{CompilerError, Pass};

pub fn lower_globals(globals: &[Global]) -> Result<Vec<AsmInst>, CompilerError> {
    let mut data = Vec::new();
    for global in globals {
        data.extend(lower_global(global)?);
    }
    Ok(data)
}

fn lower_global(global: &Global) -> Result<Vec<AsmInst>, CompilerError> {
    if global.size <= 0 {
        return Err(CompilerError::malformed(
            Pass::Select,
            format!("global '{}' has size {}", global.name, global.size),
        ));
    }

    let mut insts = vec![AsmInst::Label(global.name.clone())];
    let words = match &global.init {
        Some(words) if words.iter().any(|&w| w != 0) => words,
        _ => {
            debug!("Global '{}': {} zero bytes", global.name, global.size);
            insts.push(AsmInst::Zero(global.size));
            return Ok(insts);
        }
    };

    let word_size = CallingConvention::WORD_SIZE;
    let count = (global.size / word_size) as usize;
    if global.size % word_size != 0 || words.len() > count {
        return Err(CompilerError::malformed(
            Pass::Select,
            format!(
                "global '{}' of {} bytes cannot hold {} initializer words",
                global.name,
                global.size,
                words.len()
            ),
        ));
    }

    debug!("Global '{}': {} words", global.name, count);
    insts.extend(words.iter().map(|&w| AsmInst::Word(w)));
    insts.extend(std::iter::repeat_n(AsmInst::Word(0), count - words.len()));
    Ok(insts)
}
