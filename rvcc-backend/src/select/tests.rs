//! Instruction selection tests

use super::*;
use crate::cfg;
use crate::function::BasicBlock;
use crate::naming::NameGenerator;
use pretty_assertions::assert_eq;
use rvcc_codegen::CallingConvention;
use rvcc_ir::Parser;

fn select_text(source: &str) -> Module {
    let nodes = Parser::new("test.ir").parse_source(source).unwrap();
    let mut module = cfg::build(nodes, &mut NameGenerator::new()).unwrap();
    select_module(&mut module).unwrap();
    module
}

fn v(name: &str) -> Register {
    Register::virt(name)
}

#[test]
fn test_straight_line_function() {
    let module = select_text("FUNCTION main:\nT0 = #2\nT1 = #3\nT2 = T0 + T1\nRETURN T2\n");
    let main = &module.functions[0];
    assert_eq!(
        main.blocks[0].insts,
        vec![
            AsmInst::Function("main".to_string()),
            AsmInst::Li(v("T0"), 2),
            AsmInst::Li(v("T1"), 3),
            AsmInst::Arith(ArithOp::Add, v("T2"), v("T0"), v("T1")),
            AsmInst::Mv(Reg::A0.into(), v("T2")),
            AsmInst::J("main.ret".to_string()),
        ]
    );
    assert!(main.blocks[1].insts.is_empty());
}

#[test]
fn test_operator_mapping() {
    let module = select_text(
        "FUNCTION f:\nPARAM a\nPARAM b\n\
         c = a % b\nd = a >> b\ne = a < b\nn = - a\n\
         IF a <= b GOTO out\nLABEL out:\nRETURN\n",
    );
    let insts = &module.functions[0].blocks[0].insts;
    assert_eq!(insts[3], AsmInst::Arith(ArithOp::Rem, v("c"), v("a"), v("b")));
    assert_eq!(insts[4], AsmInst::Arith(ArithOp::Sra, v("d"), v("a"), v("b")));
    assert_eq!(insts[5], AsmInst::Arith(ArithOp::Slt, v("e"), v("a"), v("b")));
    assert_eq!(insts[6], AsmInst::Arith(ArithOp::Sub, v("n"), Reg::Zero.into(), v("a")));
    assert_eq!(insts[7], AsmInst::Branch(BranchOp::Ble, v("a"), v("b"), "out".to_string()));

    let out = &module.functions[0].blocks[1];
    assert_eq!(out.insts, vec![AsmInst::Label("out".to_string()), AsmInst::J("f.ret".to_string())]);
}

#[test]
fn test_every_relop_has_its_own_branch() {
    let ops = [
        ("==", BranchOp::Beq),
        ("!=", BranchOp::Bne),
        ("<", BranchOp::Blt),
        ("<=", BranchOp::Ble),
        (">", BranchOp::Bgt),
        (">=", BranchOp::Bge),
    ];
    for (symbol, expected) in ops {
        let module = select_text(&format!("FUNCTION f:\nPARAM a\nIF a {} a GOTO l\nLABEL l:\nRETURN\n", symbol));
        let last = module.functions[0].blocks[0].insts.last().cloned();
        assert_eq!(last, Some(AsmInst::Branch(expected, v("a"), v("a"), "l".to_string())));
    }
}

#[test]
fn test_memory_offsets_in_window() {
    let module = select_text(
        "FUNCTION f:\nPARAM p\nx = *(p + #2047)\n*(p + #-2048) = x\ny = *p\nRETURN\n",
    );
    let insts = &module.functions[0].blocks[0].insts;
    assert_eq!(insts[2], AsmInst::Lw(v("x"), 2047, v("p")));
    assert_eq!(insts[3], AsmInst::Sw(v("x"), -2048, v("p")));
    assert_eq!(insts[4], AsmInst::Lw(v("y"), 0, v("p")));
}

#[test]
fn test_memory_offsets_out_of_window() {
    let module = select_text(
        "FUNCTION f:\nPARAM p\nx = *(p + #4096)\n*(p + #-2049) = x\nRETURN\n",
    );
    let insts = &module.functions[0].blocks[0].insts;
    assert_eq!(
        insts[2..8].to_vec(),
        vec![
            AsmInst::Li(Reg::T6.into(), 4096),
            AsmInst::Arith(ArithOp::Add, Reg::T6.into(), v("p"), Reg::T6.into()),
            AsmInst::Lw(v("x"), 0, Reg::T6.into()),
            AsmInst::Li(Reg::T6.into(), -2049),
            AsmInst::Arith(ArithOp::Add, Reg::T6.into(), v("p"), Reg::T6.into()),
            AsmInst::Sw(v("x"), 0, Reg::T6.into()),
        ]
    );
    for inst in insts {
        if let AsmInst::Lw(_, off, _) | AsmInst::Sw(_, off, _) = inst {
            assert!(rvcc_codegen::fits_imm12(*off), "{} carries an unencodable offset", inst);
        }
    }
}

#[test]
fn test_nine_argument_call() {
    let mut source = String::from("FUNCTION main:\n");
    for i in 0..9 {
        source.push_str(&format!("x{} = #{}\n", i, i));
    }
    for i in 0..9 {
        source.push_str(&format!("ARG x{}\n", i));
    }
    source.push_str("r = CALL f\nRETURN r\n");

    let module = select_text(&source);
    let main = &module.functions[0];
    let insts = &main.blocks[0].insts;

    let moves: Vec<AsmInst> = insts[10..18].to_vec();
    let expected: Vec<AsmInst> = CallingConvention::ARG_REGS
        .iter()
        .enumerate()
        .map(|(i, r)| AsmInst::Mv((*r).into(), v(&format!("x{}", i))))
        .collect();
    assert_eq!(moves, expected);
    assert_eq!(insts[18], AsmInst::Sw(v("x8"), 0, Reg::Sp.into()));
    assert_eq!(insts[19], AsmInst::Call("f".to_string()));
    assert_eq!(insts[20], AsmInst::Mv(v("r"), Reg::A0.into()));
    assert_eq!(main.frame.temp_offset("%arg8"), Some(0));
}

#[test]
fn test_outgoing_slots_precede_buffers() {
    let mut source = String::from("FUNCTION main:\nDEC buf 8\nz = #0\n");
    for _ in 0..10 {
        source.push_str("ARG z\n");
    }
    source.push_str("CALL f\nRETURN\n");

    let module = select_text(&source);
    let main = &module.functions[0];
    assert_eq!(main.frame.temp_offset("%arg8"), Some(0));
    assert_eq!(main.frame.temp_offset("%arg9"), Some(4));
    assert_eq!(main.blocks[0].insts[1], AsmInst::Addi(v("buf"), Reg::Sp.into(), 8));
}

#[test]
fn test_parameters() {
    let mut source = String::from("FUNCTION f:\n");
    for i in 0..10 {
        source.push_str(&format!("PARAM p{}\n", i));
    }
    source.push_str("RETURN\n");

    let module = select_text(&source);
    let insts = &module.functions[0].blocks[0].insts;
    assert_eq!(insts[1], AsmInst::Mv(v("p0"), Reg::A0.into()));
    assert_eq!(insts[8], AsmInst::Mv(v("p7"), Reg::A7.into()));
    assert_eq!(insts[9], AsmInst::Lw(v("p8"), 0, Reg::Fp.into()));
    assert_eq!(insts[10], AsmInst::Lw(v("p9"), 4, Reg::Fp.into()));
}

#[test]
fn test_local_buffers_never_alias() {
    let module = select_text("FUNCTION f:\nDEC a 40\nDEC b 40\nRETURN\n");
    let insts = &module.functions[0].blocks[0].insts;
    assert_eq!(insts[1], AsmInst::Addi(v("a"), Reg::Sp.into(), 0));
    assert_eq!(insts[2], AsmInst::Addi(v("b"), Reg::Sp.into(), 40));
}

#[test]
fn test_global_address() {
    let module = select_text("GLOBAL g 4\nFUNCTION f:\np = &g\nRETURN\n");
    assert_eq!(module.functions[0].blocks[0].insts[1], AsmInst::La(v("p"), "g".to_string()));
}

#[test]
fn test_global_encoding() {
    let module = select_text(
        "GLOBAL zeros 16 = 0, 0, 0, 0\n\
         GLOBAL first 16 = 1, 0, 0, 0\n\
         GLOBAL padded 12 = 5\n\
         GLOBAL plain 8\n",
    );
    assert_eq!(
        module.data,
        vec![
            AsmInst::Label("zeros".to_string()),
            AsmInst::Zero(16),
            AsmInst::Label("first".to_string()),
            AsmInst::Word(1),
            AsmInst::Word(0),
            AsmInst::Word(0),
            AsmInst::Word(0),
            AsmInst::Label("padded".to_string()),
            AsmInst::Word(5),
            AsmInst::Word(0),
            AsmInst::Word(0),
            AsmInst::Label("plain".to_string()),
            AsmInst::Zero(8),
        ]
    );
}

#[test]
fn test_oversized_initializer_rejected() {
    let globals = vec![crate::module::Global {
        name: "g".to_string(),
        size: 4,
        init: Some(vec![1, 2]),
    }];
    let err = lower_globals(&globals).unwrap_err();
    assert_eq!(err.pass(), Some(Pass::Select));
}

#[test]
fn test_return_outside_exit_block_rejected() {
    let mut func = Function::new("f");
    let mut body = BasicBlock::new("f.entry");
    body.ir.push(IrNode::Function { name: "f".to_string() });
    body.ir.push(IrNode::Return { value: None });
    let mut exit = BasicBlock::new("f.ret");
    exit.ir.push(IrNode::Return { value: None });
    func.blocks = vec![body, exit];

    let err = select_function(&mut func).unwrap_err();
    assert_eq!(err.pass(), Some(Pass::Select));
    assert!(err.to_string().contains("outside the exit block"));
}

#[test]
fn test_zero_sized_buffer_rejected() {
    let nodes = Parser::new("test.ir").parse_source("FUNCTION f:\nDEC a 0\nRETURN\n").unwrap();
    let mut module = cfg::build(nodes, &mut NameGenerator::new()).unwrap();
    let err = select_module(&mut module).unwrap_err();
    assert_eq!(
        err,
        CompilerError::InvalidAllocation {
            pass: Pass::Select,
            function: "f".to_string(),
            key: "a".to_string(),
            size: 0,
        }
    );
}

#[test]
fn test_oversized_buffer_rejected() {
    let nodes = Parser::new("test.ir").parse_source("FUNCTION f:\nDEC a 2147483647\nRETURN\n").unwrap();
    let mut module = cfg::build(nodes, &mut NameGenerator::new()).unwrap();
    let err = select_module(&mut module).unwrap_err();
    assert_eq!(err.pass(), Some(Pass::Select));
    assert!(err.to_string().contains("2147483647 bytes for 'a'"));
}
