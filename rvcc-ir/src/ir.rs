//! Three-Address Intermediate Representation
//!
//! The IR handed to the backend by the front end: a flat, ordered list of
//! nodes. Operands are names; every name stands for a virtual register.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operations, each with a single matching target instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Lt,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "&" => BinaryOp::And,
            "|" => BinaryOp::Or,
            "^" => BinaryOp::Xor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "<" => BinaryOp::Lt,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}

/// Relational operators of conditional branches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "==" => RelOp::Eq,
            "!=" => RelOp::Ne,
            "<" => RelOp::Lt,
            "<=" => RelOp::Le,
            ">" => RelOp::Gt,
            ">=" => RelOp::Ge,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One IR instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IrNode {
    /// dest = #value
    LoadImm { dest: String, value: i32 },

    /// dest = src
    Assign { dest: String, src: String },

    /// dest = lhs op rhs
    Binary {
        dest: String,
        lhs: String,
        op: BinaryOp,
        rhs: String,
    },

    /// dest = op src
    Unary {
        dest: String,
        op: UnaryOp,
        src: String,
    },

    Label { name: String },

    Goto { label: String },

    /// IF lhs op rhs GOTO label
    CondBranch {
        lhs: String,
        op: RelOp,
        rhs: String,
        label: String,
    },

    /// Start of a function body
    Function { name: String },

    /// [dest =] CALL func
    Call {
        dest: Option<String>,
        func: String,
    },

    /// Pass `src` as argument number `index` (0-based) of the next call
    Arg { src: String, index: usize },

    /// Bind parameter number `index` (0-based) of the current function
    Param { dest: String, index: usize },

    Return { value: Option<String> },

    /// Global variable of `size` bytes, optionally initialized word by word
    Global {
        name: String,
        size: i32,
        init: Option<Vec<i32>>,
    },

    /// Stack buffer of `size` bytes; `dest` receives its address
    Dec { dest: String, size: i32 },

    /// dest = &global
    LoadAddr { dest: String, global: String },

    /// dest = *(addr + offset)
    Load {
        dest: String,
        addr: String,
        offset: i32,
    },

    /// *(addr + offset) = src
    Store {
        addr: String,
        src: String,
        offset: i32,
    },
}

impl IrNode {
    /// Name written by this node, if any
    pub fn def(&self) -> Option<&str> {
        match self {
            IrNode::LoadImm { dest, .. }
            | IrNode::Assign { dest, .. }
            | IrNode::Binary { dest, .. }
            | IrNode::Unary { dest, .. }
            | IrNode::Param { dest, .. }
            | IrNode::Dec { dest, .. }
            | IrNode::LoadAddr { dest, .. }
            | IrNode::Load { dest, .. } => Some(dest.as_str()),
            IrNode::Call { dest, .. } => dest.as_deref(),
            _ => None,
        }
    }

    /// Names read by this node, in operand order
    pub fn uses(&self) -> Vec<&str> {
        match self {
            IrNode::Assign { src, .. } | IrNode::Unary { src, .. } | IrNode::Arg { src, .. } => {
                vec![src.as_str()]
            }
            IrNode::Binary { lhs, rhs, .. } | IrNode::CondBranch { lhs, rhs, .. } => {
                vec![lhs.as_str(), rhs.as_str()]
            }
            IrNode::Return { value: Some(value) } => vec![value.as_str()],
            IrNode::Load { addr, .. } => vec![addr.as_str()],
            IrNode::Store { addr, src, .. } => vec![addr.as_str(), src.as_str()],
            _ => Vec::new(),
        }
    }

    /// Label this node may transfer control to
    pub fn branch_target(&self) -> Option<&str> {
        match self {
            IrNode::Goto { label } | IrNode::CondBranch { label, .. } => Some(label.as_str()),
            _ => None,
        }
    }

    /// Whether control can continue with the next node in the stream
    pub fn falls_through(&self) -> bool {
        !matches!(self, IrNode::Goto { .. } | IrNode::Return { .. })
    }
}

impl fmt::Display for IrNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrNode::LoadImm { dest, value } => write!(f, "{} = #{}", dest, value),
            IrNode::Assign { dest, src } => write!(f, "{} = {}", dest, src),
            IrNode::Binary { dest, lhs, op, rhs } => write!(f, "{} = {} {} {}", dest, lhs, op, rhs),
            IrNode::Unary { dest, op, src } => write!(f, "{} = {} {}", dest, op, src),
            IrNode::Label { name } => write!(f, "LABEL {} :", name),
            IrNode::Goto { label } => write!(f, "GOTO {}", label),
            IrNode::CondBranch { lhs, op, rhs, label } => {
                write!(f, "IF {} {} {} GOTO {}", lhs, op, rhs, label)
            }
            IrNode::Function { name } => write!(f, "FUNCTION {} :", name),
            IrNode::Call { dest: Some(dest), func } => write!(f, "{} = CALL {}", dest, func),
            IrNode::Call { dest: None, func } => write!(f, "CALL {}", func),
            IrNode::Arg { src, .. } => write!(f, "ARG {}", src),
            IrNode::Param { dest, .. } => write!(f, "PARAM {}", dest),
            IrNode::Return { value: Some(value) } => write!(f, "RETURN {}", value),
            IrNode::Return { value: None } => write!(f, "RETURN"),
            IrNode::Global { name, size, init } => {
                write!(f, "GLOBAL {} {}", name, size)?;
                if let Some(words) = init {
                    let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
                    write!(f, " = {}", words.join(", "))?;
                }
                Ok(())
            }
            IrNode::Dec { dest, size } => write!(f, "DEC {} {}", dest, size),
            IrNode::LoadAddr { dest, global } => write!(f, "{} = &{}", dest, global),
            IrNode::Load { dest, addr, offset: 0 } => write!(f, "{} = *{}", dest, addr),
            IrNode::Load { dest, addr, offset } => write!(f, "{} = *({} + #{})", dest, addr, offset),
            IrNode::Store { addr, src, offset: 0 } => write!(f, "*{} = {}", addr, src),
            IrNode::Store { addr, src, offset } => write!(f, "*({} + #{}) = {}", addr, offset, src),
        }
    }
}

/// Render a node list one node per line, indented by nesting level
pub fn display_program(nodes: &[IrNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        let indent = match node {
            IrNode::Function { .. } | IrNode::Global { .. } => "",
            IrNode::Label { .. } => "  ",
            _ => "    ",
        };
        out.push_str(indent);
        out.push_str(&node.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_display() {
        let nodes = vec![
            IrNode::LoadImm { dest: "T0".to_string(), value: -7 },
            IrNode::Binary {
                dest: "T2".to_string(),
                lhs: "T0".to_string(),
                op: BinaryOp::Add,
                rhs: "T1".to_string(),
            },
            IrNode::CondBranch {
                lhs: "a".to_string(),
                op: RelOp::Le,
                rhs: "b".to_string(),
                label: "L1".to_string(),
            },
            IrNode::Load { dest: "x".to_string(), addr: "p".to_string(), offset: 8 },
            IrNode::Store { addr: "p".to_string(), src: "x".to_string(), offset: 0 },
            IrNode::Global { name: "g".to_string(), size: 8, init: Some(vec![1, 2]) },
        ];
        let text: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "T0 = #-7",
                "T2 = T0 + T1",
                "IF a <= b GOTO L1",
                "x = *(p + #8)",
                "*p = x",
                "GLOBAL g 8 = 1, 2",
            ]
        );
    }

    #[test]
    fn test_def_and_uses() {
        let call = IrNode::Call { dest: Some("r".to_string()), func: "f".to_string() };
        assert_eq!(call.def(), Some("r"));
        assert!(call.uses().is_empty());

        let store = IrNode::Store { addr: "p".to_string(), src: "v".to_string(), offset: 4 };
        assert_eq!(store.def(), None);
        assert_eq!(store.uses(), vec!["p", "v"]);
    }

    #[test]
    fn test_control_flow_queries() {
        let goto = IrNode::Goto { label: "L".to_string() };
        assert_eq!(goto.branch_target(), Some("L"));
        assert!(!goto.falls_through());

        let branch = IrNode::CondBranch {
            lhs: "a".to_string(),
            op: RelOp::Eq,
            rhs: "b".to_string(),
            label: "L".to_string(),
        };
        assert!(branch.falls_through());
    }

    #[test]
    fn test_json_shape() {
        let node = IrNode::LoadImm { dest: "T0".to_string(), value: 2 };
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"kind":"load_imm","dest":"T0","value":2}"#);
        let back: IrNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
