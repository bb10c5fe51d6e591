//! RISC-V ABI Implementation
//!
//! Register roles, the immediate encoding window, and the frame setup and
//! teardown sequences the emitter wraps around every function body.

use crate::asm::{ArithOp, AsmInst, Reg, Register};

/// Smallest offset encodable in a 12-bit signed immediate
pub const IMM12_MIN: i32 = -2048;
/// Largest offset encodable in a 12-bit signed immediate
pub const IMM12_MAX: i32 = 2047;

pub fn fits_imm12(value: i32) -> bool {
    (IMM12_MIN..=IMM12_MAX).contains(&value)
}

/// RISC-V calling convention as used by this backend
///
/// Register usage:
/// - a0-a7: arguments, a0 return value (never allocated)
/// - t0, t1, t2: spill scratch for destination, first and second source
/// - t5: frame scratch for out-of-window frame offsets
/// - t6: address scratch for out-of-window memory offsets
/// - t3, t4: allocatable, caller-saved
/// - s1-s11: allocatable, callee-saved
/// - zero, ra, sp, gp, tp, fp: reserved
pub struct CallingConvention;

impl CallingConvention {
    pub const WORD_SIZE: i32 = 4;

    /// Frames are padded to this many bytes
    pub const STACK_ALIGN: i32 = 16;

    pub const ARG_REGS: [Reg; 8] = [Reg::A0, Reg::A1, Reg::A2, Reg::A3, Reg::A4, Reg::A5, Reg::A6, Reg::A7];
    pub const RETURN_REG: Reg = Reg::A0;

    pub const CALLEE_SAVED: [Reg; 11] = [
        Reg::S1, Reg::S2, Reg::S3, Reg::S4, Reg::S5, Reg::S6,
        Reg::S7, Reg::S8, Reg::S9, Reg::S10, Reg::S11,
    ];

    /// Caller-saved registers handed out by the allocator
    pub const CALLER_SAVED_POOL: [Reg; 2] = [Reg::T3, Reg::T4];

    pub const SPILL_DEST: Reg = Reg::T0;
    pub const SPILL_SRC: [Reg; 2] = [Reg::T1, Reg::T2];
    pub const FRAME_SCRATCH: Reg = Reg::T5;
    pub const ADDRESS_SCRATCH: Reg = Reg::T6;

    pub const ZERO: Reg = Reg::Zero;
    pub const RETURN_ADDR: Reg = Reg::Ra;
    pub const STACK_PTR: Reg = Reg::Sp;
    pub const FRAME_PTR: Reg = Reg::Fp;

    /// Saved-region offsets of the fixed slots, relative to fp
    pub const RA_SLOT: i32 = -4;
    pub const FP_SLOT: i32 = -8;

    /// Argument register for a 0-based position, `None` past the eighth
    pub fn arg_reg(index: usize) -> Option<Reg> {
        Self::ARG_REGS.get(index).copied()
    }

    /// Offset of stack-passed argument `index` from the caller's sp, which
    /// is also its offset from the callee's fp
    pub fn stack_arg_offset(index: usize) -> i32 {
        debug_assert!(index >= Self::ARG_REGS.len());
        (index - Self::ARG_REGS.len()) as i32 * Self::WORD_SIZE
    }

    pub fn is_callee_saved(reg: Reg) -> bool {
        Self::CALLEE_SAVED.contains(&reg)
    }

    /// Every register the allocator may assign, caller-saved first
    pub fn allocatable() -> Vec<Reg> {
        Self::CALLER_SAVED_POOL
            .iter()
            .chain(Self::CALLEE_SAVED.iter())
            .copied()
            .collect()
    }
}

/// `rd = rs + imm`, going through `scratch` when `imm` does not fit
pub fn add_imm(rd: Register, rs: Register, imm: i32, scratch: Reg) -> Vec<AsmInst> {
    if fits_imm12(imm) {
        vec![AsmInst::Addi(rd, rs, imm)]
    } else {
        vec![
            AsmInst::Li(scratch.into(), imm),
            AsmInst::Arith(ArithOp::Add, rd, rs, scratch.into()),
        ]
    }
}

/// `rd = mem[base + offset]`
pub fn load_word(rd: Register, base: Register, offset: i32, scratch: Reg) -> Vec<AsmInst> {
    if fits_imm12(offset) {
        vec![AsmInst::Lw(rd, offset, base)]
    } else {
        let mut code = materialize_address(base, offset, scratch);
        code.push(AsmInst::Lw(rd, 0, scratch.into()));
        code
    }
}

/// `mem[base + offset] = rs`
pub fn store_word(rs: Register, base: Register, offset: i32, scratch: Reg) -> Vec<AsmInst> {
    if fits_imm12(offset) {
        vec![AsmInst::Sw(rs, offset, base)]
    } else {
        let mut code = materialize_address(base, offset, scratch);
        code.push(AsmInst::Sw(rs, 0, scratch.into()));
        code
    }
}

fn materialize_address(base: Register, offset: i32, scratch: Reg) -> Vec<AsmInst> {
    vec![
        AsmInst::Li(scratch.into(), offset),
        AsmInst::Arith(ArithOp::Add, scratch.into(), base, scratch.into()),
    ]
}

/// Final shape of a function's stack frame, known once allocation is done
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    /// temp region + saved region, in bytes
    pub size: i32,

    /// Callee-saved registers and their fp-relative slots
    pub saved_regs: Vec<(Reg, i32)>,
}

impl FrameLayout {
    pub fn new(size: i32, saved_regs: Vec<(Reg, i32)>) -> Self {
        Self { size, saved_regs }
    }

    /// Generate function prologue
    ///
    /// 1. Drops sp by the frame size
    /// 2. Saves ra and the caller's fp in their fixed slots
    /// 3. Points fp at the caller's sp
    /// 4. Saves every callee-saved register in use
    pub fn gen_prologue(&self) -> Vec<AsmInst> {
        let scratch = CallingConvention::FRAME_SCRATCH;
        let sp = Register::from(CallingConvention::STACK_PTR);
        let fp = Register::from(CallingConvention::FRAME_PTR);
        let mut code = Vec::new();

        code.extend(add_imm(sp.clone(), sp.clone(), -self.size, scratch));
        code.extend(store_word(
            CallingConvention::RETURN_ADDR.into(),
            sp.clone(),
            self.size + CallingConvention::RA_SLOT,
            scratch,
        ));
        code.extend(store_word(fp.clone(), sp.clone(), self.size + CallingConvention::FP_SLOT, scratch));
        code.extend(add_imm(fp.clone(), sp, self.size, scratch));

        for &(reg, offset) in &self.saved_regs {
            code.extend(store_word(reg.into(), fp.clone(), offset, scratch));
        }

        code
    }

    /// Generate function epilogue
    ///
    /// `value` is the register named by the exit block's return; it is
    /// copied into a0 unless it is already there.
    pub fn gen_epilogue(&self, value: Option<Reg>) -> Vec<AsmInst> {
        let scratch = CallingConvention::FRAME_SCRATCH;
        let sp = Register::from(CallingConvention::STACK_PTR);
        let fp = Register::from(CallingConvention::FRAME_PTR);
        let mut code = Vec::new();

        if let Some(reg) = value {
            if reg != CallingConvention::RETURN_REG {
                code.push(AsmInst::Mv(CallingConvention::RETURN_REG.into(), reg.into()));
            }
        }

        for &(reg, offset) in &self.saved_regs {
            code.extend(load_word(reg.into(), fp.clone(), offset, scratch));
        }

        code.push(AsmInst::Lw(
            CallingConvention::RETURN_ADDR.into(),
            CallingConvention::RA_SLOT,
            fp.clone(),
        ));
        code.extend(add_imm(sp.clone(), sp, self.size, scratch));
        code.push(AsmInst::Lw(fp.clone(), CallingConvention::FP_SLOT, fp));
        code.push(AsmInst::Ret);

        code
    }
}
