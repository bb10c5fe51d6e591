//! RISC-V Assembly Instruction Definitions
//!
//! This module defines the RV32IM instruction subset the backend emits and
//! the register model shared by selection, allocation and emission.

use std::collections::HashMap;
use std::fmt;

/// RV32 integer register file
///
/// - zero: hardwired zero
/// - ra, sp, gp, tp: return address, stack, global and thread pointers
/// - t0-t6: caller-saved temporaries
/// - fp (s0): frame pointer
/// - s1-s11: callee-saved registers
/// - a0-a7: arguments, a0 also carries the return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reg {
    Zero, Ra, Sp, Gp, Tp,
    T0, T1, T2, T3, T4, T5, T6,
    Fp,
    S1, S2, S3, S4, S5, S6, S7, S8, S9, S10, S11,
    A0, A1, A2, A3, A4, A5, A6, A7,
}

impl Reg {
    pub const ALL: [Reg; 32] = [
        Reg::Zero, Reg::Ra, Reg::Sp, Reg::Gp, Reg::Tp,
        Reg::T0, Reg::T1, Reg::T2, Reg::T3, Reg::T4, Reg::T5, Reg::T6,
        Reg::Fp,
        Reg::S1, Reg::S2, Reg::S3, Reg::S4, Reg::S5, Reg::S6, Reg::S7, Reg::S8, Reg::S9, Reg::S10, Reg::S11,
        Reg::A0, Reg::A1, Reg::A2, Reg::A3, Reg::A4, Reg::A5, Reg::A6, Reg::A7,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Reg::Zero => "zero",
            Reg::Ra => "ra",
            Reg::Sp => "sp",
            Reg::Gp => "gp",
            Reg::Tp => "tp",
            Reg::T0 => "t0", Reg::T1 => "t1", Reg::T2 => "t2", Reg::T3 => "t3",
            Reg::T4 => "t4", Reg::T5 => "t5", Reg::T6 => "t6",
            Reg::Fp => "fp",
            Reg::S1 => "s1", Reg::S2 => "s2", Reg::S3 => "s3", Reg::S4 => "s4",
            Reg::S5 => "s5", Reg::S6 => "s6", Reg::S7 => "s7", Reg::S8 => "s8",
            Reg::S9 => "s9", Reg::S10 => "s10", Reg::S11 => "s11",
            Reg::A0 => "a0", Reg::A1 => "a1", Reg::A2 => "a2", Reg::A3 => "a3",
            Reg::A4 => "a4", Reg::A5 => "a5", Reg::A6 => "a6", Reg::A7 => "a7",
        }
    }

    /// Look up an ABI register name; `s0` is accepted for the frame pointer
    pub fn from_name(name: &str) -> Option<Reg> {
        if name == "s0" {
            return Some(Reg::Fp);
        }
        Reg::ALL.iter().copied().find(|r| r.name() == name)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An instruction operand: a fixed machine register or a named placeholder
/// waiting for the register allocator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Register {
    Physical(Reg),
    Virtual(String),
}

impl Register {
    /// IR names that spell a machine register (`a0`, `sp`, ...) denote that
    /// register; anything else is virtual
    pub fn from_name(name: &str) -> Self {
        match Reg::from_name(name) {
            Some(reg) => Register::Physical(reg),
            None => Register::Virtual(name.to_string()),
        }
    }

    pub fn virt(name: impl Into<String>) -> Self {
        Register::Virtual(name.into())
    }

    pub fn as_virtual(&self) -> Option<&str> {
        match self {
            Register::Virtual(name) => Some(name.as_str()),
            Register::Physical(_) => None,
        }
    }
}

impl From<Reg> for Register {
    fn from(reg: Reg) -> Self {
        Register::Physical(reg)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Physical(reg) => write!(f, "{}", reg),
            Register::Virtual(name) => write!(f, "{}", name),
        }
    }
}

/// Register-register arithmetic and logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Sll,
    Sra,
    Slt,
}

impl ArithOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Rem => "rem",
            ArithOp::And => "and",
            ArithOp::Or => "or",
            ArithOp::Xor => "xor",
            ArithOp::Sll => "sll",
            ArithOp::Sra => "sra",
            ArithOp::Slt => "slt",
        }
    }
}

/// Compare-and-branch opcodes (`ble`/`bgt` are assembler pseudo-ops)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOp {
    Beq,
    Bne,
    Blt,
    Ble,
    Bgt,
    Bge,
}

impl BranchOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BranchOp::Beq => "beq",
            BranchOp::Bne => "bne",
            BranchOp::Blt => "blt",
            BranchOp::Ble => "ble",
            BranchOp::Bgt => "bgt",
            BranchOp::Bge => "bge",
        }
    }
}

/// RISC-V assembly instructions and directives
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    Arith(ArithOp, Register, Register, Register), // rd = rs1 op rs2
    Addi(Register, Register, i32),                // rd = rs + imm12
    Li(Register, i32),                            // rd = imm
    La(Register, String),                         // rd = &label
    Mv(Register, Register),                       // rd = rs
    Lw(Register, i32, Register),                  // rd = mem[base + imm12]
    Sw(Register, i32, Register),                  // mem[base + imm12] = rs

    Branch(BranchOp, Register, Register, String),
    J(String),
    Call(String),
    Ret,
    Ecall,

    Label(String),
    /// Entry point of a function, printed with its `.globl`
    Function(String),
    Global(String),
    Section(String),
    Zero(i32),
    Word(i32),
}

impl AsmInst {
    /// Register written by this instruction
    pub fn def(&self) -> Option<&Register> {
        match self {
            AsmInst::Arith(_, rd, _, _)
            | AsmInst::Addi(rd, _, _)
            | AsmInst::Li(rd, _)
            | AsmInst::La(rd, _)
            | AsmInst::Mv(rd, _)
            | AsmInst::Lw(rd, _, _) => Some(rd),
            _ => None,
        }
    }

    /// Registers read by this instruction, in operand order
    pub fn uses(&self) -> Vec<&Register> {
        match self {
            AsmInst::Arith(_, _, rs1, rs2) | AsmInst::Branch(_, rs1, rs2, _) => vec![rs1, rs2],
            AsmInst::Addi(_, rs, _) | AsmInst::Mv(_, rs) | AsmInst::Lw(_, _, rs) => vec![rs],
            AsmInst::Sw(rs, _, base) => vec![rs, base],
            _ => Vec::new(),
        }
    }

    pub fn def_mut(&mut self) -> Option<&mut Register> {
        match self {
            AsmInst::Arith(_, rd, _, _)
            | AsmInst::Addi(rd, _, _)
            | AsmInst::Li(rd, _)
            | AsmInst::La(rd, _)
            | AsmInst::Mv(rd, _)
            | AsmInst::Lw(rd, _, _) => Some(rd),
            _ => None,
        }
    }

    pub fn uses_mut(&mut self) -> Vec<&mut Register> {
        match self {
            AsmInst::Arith(_, _, rs1, rs2) | AsmInst::Branch(_, rs1, rs2, _) => vec![rs1, rs2],
            AsmInst::Addi(_, rs, _) | AsmInst::Mv(_, rs) | AsmInst::Lw(_, _, rs) => vec![rs],
            AsmInst::Sw(rs, _, base) => vec![rs, base],
            _ => Vec::new(),
        }
    }

    /// Names of every virtual register this instruction mentions
    pub fn virtual_regs(&self) -> Vec<&str> {
        self.def()
            .into_iter()
            .chain(self.uses())
            .filter_map(Register::as_virtual)
            .collect()
    }

    /// Rewrite virtual operands through `map`; names not in the map are kept
    pub fn replace_all(&mut self, map: &HashMap<String, Reg>) {
        if let Some(rd) = self.def_mut() {
            substitute(rd, map);
        }
        for operand in self.uses_mut() {
            substitute(operand, map);
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, AsmInst::Call(_))
    }
}

fn substitute(operand: &mut Register, map: &HashMap<String, Reg>) {
    if let Register::Virtual(name) = operand {
        if let Some(&reg) = map.get(name.as_str()) {
            *operand = Register::Physical(reg);
        }
    }
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::Arith(op, rd, rs1, rs2) => write!(f, "{} {}, {}, {}", op.mnemonic(), rd, rs1, rs2),
            AsmInst::Addi(rd, rs, imm) => write!(f, "addi {}, {}, {}", rd, rs, imm),
            AsmInst::Li(rd, imm) => write!(f, "li {}, {}", rd, imm),
            AsmInst::La(rd, label) => write!(f, "la {}, {}", rd, label),
            AsmInst::Mv(rd, rs) => write!(f, "mv {}, {}", rd, rs),
            AsmInst::Lw(rd, imm, base) => write!(f, "lw {}, {}({})", rd, imm, base),
            AsmInst::Sw(rs, imm, base) => write!(f, "sw {}, {}({})", rs, imm, base),

            AsmInst::Branch(op, rs1, rs2, label) => write!(f, "{} {}, {}, {}", op.mnemonic(), rs1, rs2, label),
            AsmInst::J(label) => write!(f, "j {}", label),
            AsmInst::Call(label) => write!(f, "call {}", label),
            AsmInst::Ret => write!(f, "ret"),
            AsmInst::Ecall => write!(f, "ecall"),

            AsmInst::Label(label) | AsmInst::Function(label) => write!(f, "{}:", label),
            AsmInst::Global(name) => write!(f, ".globl {}", name),
            AsmInst::Section(name) => write!(f, ".{}", name),
            AsmInst::Zero(size) => write!(f, ".zero {}", size),
            AsmInst::Word(value) => write!(f, ".word {}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_register_names() {
        assert_eq!(Reg::Zero.to_string(), "zero");
        assert_eq!(Reg::S11.to_string(), "s11");
        assert_eq!(Reg::from_name("s0"), Some(Reg::Fp));
        assert_eq!(Reg::from_name("a7"), Some(Reg::A7));
        assert_eq!(Reg::from_name("T0"), None);
    }

    #[test]
    fn test_operand_from_ir_name() {
        assert_eq!(Register::from_name("a0"), Register::Physical(Reg::A0));
        assert_eq!(Register::from_name("T3"), Register::virt("T3"));
    }

    #[test]
    fn test_instruction_display() {
        let add = AsmInst::Arith(ArithOp::Add, Reg::A0.into(), Reg::T1.into(), Reg::T2.into());
        assert_eq!(add.to_string(), "add a0, t1, t2");
        assert_eq!(AsmInst::Lw(Reg::Ra.into(), -4, Reg::Fp.into()).to_string(), "lw ra, -4(fp)");
        assert_eq!(AsmInst::Sw(Register::virt("x"), 8, Reg::Sp.into()).to_string(), "sw x, 8(sp)");
        assert_eq!(
            AsmInst::Branch(BranchOp::Ble, Register::virt("a"), Register::virt("b"), "L1".to_string()).to_string(),
            "ble a, b, L1"
        );
        assert_eq!(AsmInst::Section("data".to_string()).to_string(), ".data");
        assert_eq!(AsmInst::Zero(16).to_string(), ".zero 16");
    }

    #[test]
    fn test_defs_and_uses() {
        let store = AsmInst::Sw(Register::virt("v"), 0, Register::virt("p"));
        assert_eq!(store.def(), None);
        assert_eq!(store.virtual_regs(), vec!["v", "p"]);

        let add = AsmInst::Arith(ArithOp::Sub, Register::virt("d"), Reg::Zero.into(), Register::virt("s"));
        assert_eq!(add.virtual_regs(), vec!["d", "s"]);
    }

    #[test]
    fn test_replace_all_keeps_unmapped_names() {
        let mut inst = AsmInst::Arith(
            ArithOp::Mul,
            Register::virt("x"),
            Register::virt("y"),
            Register::virt("z"),
        );
        let map = HashMap::from([("x".to_string(), Reg::S1), ("z".to_string(), Reg::T3)]);
        inst.replace_all(&map);
        assert_eq!(
            inst,
            AsmInst::Arith(ArithOp::Mul, Reg::S1.into(), Register::virt("y"), Reg::T3.into())
        );
    }
}
