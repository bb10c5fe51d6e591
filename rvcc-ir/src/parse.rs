//! Line-oriented reader for the textual IR form
//!
//! One node per line. Argument and parameter positions are implicit in the
//! text and are recovered here by counting.

use crate::ir::{BinaryOp, IrNode, RelOp, UnaryOp};
use log::{debug, trace};
use rvcc_common::{CompilerError, SourceLocation};

pub struct Parser {
    filename: String,
}

/// Positional counters that carry across lines
#[derive(Default)]
struct Counters {
    next_arg: usize,
    next_param: usize,
}

impl Parser {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
        }
    }

    pub fn parse_source(&self, source: &str) -> Result<Vec<IrNode>, CompilerError> {
        let mut nodes = Vec::new();
        let mut counters = Counters::default();

        for (i, line) in source.lines().enumerate() {
            if let Some(node) = self.parse_line(line, i + 1, &mut counters)? {
                trace!("{}:{}: {}", self.filename, i + 1, node);
                nodes.push(node);
            }
        }

        debug!("Parsed {} IR nodes from {}", nodes.len(), self.filename);
        Ok(nodes)
    }

    /// Read a JSON array of serialized nodes
    pub fn parse_json(&self, source: &str) -> Result<Vec<IrNode>, CompilerError> {
        let nodes: Vec<IrNode> = serde_json::from_str(source).map_err(|e| {
            CompilerError::parse_error(
                e.to_string(),
                SourceLocation::new(&self.filename, e.line() as u32),
            )
        })?;
        debug!("Read {} IR nodes from JSON {}", nodes.len(), self.filename);
        Ok(nodes)
    }

    fn parse_line(
        &self,
        line: &str,
        line_number: usize,
        counters: &mut Counters,
    ) -> Result<Option<IrNode>, CompilerError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with("//") {
            return Ok(None);
        }

        let err = |message: String| {
            CompilerError::parse_error(
                message,
                SourceLocation::new(&self.filename, line_number as u32),
            )
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let node = match tokens[0] {
            "FUNCTION" => {
                counters.next_param = 0;
                let name = strip_colon(&tokens[1..]).ok_or_else(|| err(format!("bad function marker '{}'", line)))?;
                IrNode::Function { name }
            }
            "LABEL" => {
                let name = strip_colon(&tokens[1..]).ok_or_else(|| err(format!("bad label '{}'", line)))?;
                IrNode::Label { name }
            }
            "GOTO" => match tokens[1..] {
                [label] if is_name(label) => IrNode::Goto { label: label.to_string() },
                _ => return Err(err(format!("bad GOTO '{}'", line))),
            },
            "IF" => match tokens[1..] {
                [lhs, op, rhs, "GOTO", label] if is_name(lhs) && is_name(rhs) && is_name(label) => {
                    let op = RelOp::from_symbol(op)
                        .ok_or_else(|| err(format!("unknown relational operator '{}'", op)))?;
                    IrNode::CondBranch {
                        lhs: lhs.to_string(),
                        op,
                        rhs: rhs.to_string(),
                        label: label.to_string(),
                    }
                }
                _ => return Err(err(format!("bad IF '{}'", line))),
            },
            "CALL" => match tokens[1..] {
                [func] if is_name(func) => {
                    counters.next_arg = 0;
                    IrNode::Call { dest: None, func: func.to_string() }
                }
                _ => return Err(err(format!("bad CALL '{}'", line))),
            },
            "ARG" => match tokens[1..] {
                [src] if is_name(src) => {
                    let index = counters.next_arg;
                    counters.next_arg += 1;
                    IrNode::Arg { src: src.to_string(), index }
                }
                _ => return Err(err(format!("bad ARG '{}'", line))),
            },
            "PARAM" => match tokens[1..] {
                [dest] if is_name(dest) => {
                    let index = counters.next_param;
                    counters.next_param += 1;
                    IrNode::Param { dest: dest.to_string(), index }
                }
                _ => return Err(err(format!("bad PARAM '{}'", line))),
            },
            "RETURN" => match tokens[1..] {
                [] => IrNode::Return { value: None },
                [value] if is_name(value) => IrNode::Return { value: Some(value.to_string()) },
                _ => return Err(err(format!("bad RETURN '{}'", line))),
            },
            "DEC" => match tokens[1..] {
                [dest, size] if is_name(dest) => IrNode::Dec {
                    dest: dest.to_string(),
                    size: parse_int(size).ok_or_else(|| err(format!("bad size '{}'", size)))?,
                },
                _ => return Err(err(format!("bad DEC '{}'", line))),
            },
            "GLOBAL" => self.parse_global(line).map_err(err)?,
            _ => {
                let node = self.parse_assignment(line).map_err(err)?;
                if let IrNode::Call { .. } = node {
                    counters.next_arg = 0;
                }
                node
            }
        };

        Ok(Some(node))
    }

    fn parse_global(&self, line: &str) -> Result<IrNode, String> {
        let rest = line["GLOBAL".len()..].trim();
        let (head, init) = match rest.split_once('=') {
            Some((head, words)) => {
                let words = words
                    .split(',')
                    .map(|w| parse_int(w.trim()).ok_or_else(|| format!("bad initializer word '{}'", w.trim())))
                    .collect::<Result<Vec<i32>, String>>()?;
                (head, Some(words))
            }
            None => (rest, None),
        };

        let tokens: Vec<&str> = head.split_whitespace().collect();
        match tokens[..] {
            [name, size] if is_name(name) => Ok(IrNode::Global {
                name: name.to_string(),
                size: parse_int(size).ok_or_else(|| format!("bad size '{}'", size))?,
                init,
            }),
            _ => Err(format!("bad GLOBAL '{}'", line)),
        }
    }

    fn parse_assignment(&self, line: &str) -> Result<IrNode, String> {
        let (lhs, rhs) = line
            .split_once('=')
            .ok_or_else(|| format!("unrecognized IR node '{}'", line))?;
        let lhs = lhs.trim();
        let rhs = rhs.trim();

        if let Some(target) = lhs.strip_prefix('*') {
            let (addr, offset) = parse_memory(target)?;
            if !is_name(rhs) {
                return Err(format!("bad stored value '{}'", rhs));
            }
            return Ok(IrNode::Store { addr, src: rhs.to_string(), offset });
        }

        if !is_name(lhs) {
            return Err(format!("bad destination '{}'", lhs));
        }
        let dest = lhs.to_string();

        if let Some(imm) = rhs.strip_prefix('#') {
            let value = parse_int(imm).ok_or_else(|| format!("bad immediate '{}'", rhs))?;
            return Ok(IrNode::LoadImm { dest, value });
        }
        if let Some(global) = rhs.strip_prefix('&') {
            let global = global.trim();
            if !is_name(global) {
                return Err(format!("bad global '{}'", global));
            }
            return Ok(IrNode::LoadAddr { dest, global: global.to_string() });
        }
        if let Some(source) = rhs.strip_prefix('*') {
            let (addr, offset) = parse_memory(source)?;
            return Ok(IrNode::Load { dest, addr, offset });
        }

        let tokens: Vec<&str> = rhs.split_whitespace().collect();
        match tokens[..] {
            [src] if is_name(src) => Ok(IrNode::Assign { dest, src: src.to_string() }),
            [neg] if neg.starts_with('-') && is_name(&neg[1..]) => Ok(IrNode::Unary {
                dest,
                op: UnaryOp::Neg,
                src: neg[1..].to_string(),
            }),
            ["-", src] if is_name(src) => Ok(IrNode::Unary {
                dest,
                op: UnaryOp::Neg,
                src: src.to_string(),
            }),
            ["CALL", func] if is_name(func) => Ok(IrNode::Call {
                dest: Some(dest),
                func: func.to_string(),
            }),
            [lhs, op, rhs] if is_name(lhs) && is_name(rhs) => {
                let op = BinaryOp::from_symbol(op).ok_or_else(|| format!("unknown operator '{}'", op))?;
                Ok(IrNode::Binary {
                    dest,
                    lhs: lhs.to_string(),
                    op,
                    rhs: rhs.to_string(),
                })
            }
            _ => Err(format!("unrecognized IR node '{}'", line)),
        }
    }
}

/// `name :` or `name:` following a keyword
fn strip_colon(tokens: &[&str]) -> Option<String> {
    let name = match tokens {
        [name, ":"] => *name,
        [name] => name.strip_suffix(':')?,
        _ => return None,
    };
    is_name(name).then(|| name.to_string())
}

/// `y` or `(y + #k)`
fn parse_memory(text: &str) -> Result<(String, i32), String> {
    let text = text.trim();
    if is_name(text) {
        return Ok((text.to_string(), 0));
    }
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| format!("bad memory operand '{}'", text))?;
    let (base, offset) = inner
        .split_once('+')
        .ok_or_else(|| format!("bad memory operand '{}'", text))?;
    let base = base.trim();
    let offset = offset
        .trim()
        .strip_prefix('#')
        .and_then(parse_int)
        .ok_or_else(|| format!("bad memory offset in '{}'", text))?;
    if !is_name(base) {
        return Err(format!("bad base register '{}'", base));
    }
    Ok((base.to_string(), offset))
}

fn parse_int(text: &str) -> Option<i32> {
    text.parse::<i32>().ok()
}

pub(crate) fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$') => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::display_program;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Vec<IrNode> {
        Parser::new("test.ir").parse_source(source).unwrap()
    }

    #[test]
    fn test_parse_simple_function() {
        let nodes = parse(
            "FUNCTION main :\n\
             T0 = #2\n\
             T1 = #3\n\
             T2 = T0 + T1\n\
             RETURN T2\n",
        );
        assert_eq!(
            nodes,
            vec![
                IrNode::Function { name: "main".to_string() },
                IrNode::LoadImm { dest: "T0".to_string(), value: 2 },
                IrNode::LoadImm { dest: "T1".to_string(), value: 3 },
                IrNode::Binary {
                    dest: "T2".to_string(),
                    lhs: "T0".to_string(),
                    op: BinaryOp::Add,
                    rhs: "T1".to_string(),
                },
                IrNode::Return { value: Some("T2".to_string()) },
            ]
        );
    }

    #[test]
    fn test_positional_arguments_and_parameters() {
        let nodes = parse(
            "FUNCTION f:\nPARAM a\nPARAM b\n\
             ARG a\nARG b\nr = CALL g\nARG r\nCALL h\n\
             FUNCTION g:\nPARAM c\n",
        );
        let positions: Vec<(String, usize)> = nodes
            .iter()
            .filter_map(|n| match n {
                IrNode::Arg { src, index } => Some((format!("ARG {}", src), *index)),
                IrNode::Param { dest, index } => Some((format!("PARAM {}", dest), *index)),
                _ => None,
            })
            .collect();
        assert_eq!(
            positions,
            vec![
                ("PARAM a".to_string(), 0),
                ("PARAM b".to_string(), 1),
                ("ARG a".to_string(), 0),
                ("ARG b".to_string(), 1),
                ("ARG r".to_string(), 0),
                ("PARAM c".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_memory_and_globals() {
        let nodes = parse(
            "GLOBAL g 16 = 1, 0, 0, 0\n\
             GLOBAL h 8\n\
             FUNCTION main:\n\
             p = &g\n\
             x = *(p + #4096)\n\
             *p = x\n\
             DEC buf 40\n\
             y = -x\n\
             RETURN\n",
        );
        assert_eq!(nodes[0], IrNode::Global { name: "g".to_string(), size: 16, init: Some(vec![1, 0, 0, 0]) });
        assert_eq!(nodes[1], IrNode::Global { name: "h".to_string(), size: 8, init: None });
        assert_eq!(nodes[4], IrNode::Load { dest: "x".to_string(), addr: "p".to_string(), offset: 4096 });
        assert_eq!(nodes[5], IrNode::Store { addr: "p".to_string(), src: "x".to_string(), offset: 0 });
        assert_eq!(nodes[6], IrNode::Dec { dest: "buf".to_string(), size: 40 });
        assert_eq!(nodes[7], IrNode::Unary { dest: "y".to_string(), op: UnaryOp::Neg, src: "x".to_string() });
        assert_eq!(nodes[8], IrNode::Return { value: None });
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let nodes = parse("; header\n\n// note\nFUNCTION main:\n  RETURN\n");
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_display_reparses_to_same_nodes() {
        let source = "GLOBAL arr 12 = 3, -1, 7\n\
                      FUNCTION f :\n\
                      PARAM a\n\
                      LABEL top :\n\
                      t = a % a\n\
                      u = - t\n\
                      IF t >= u GOTO top\n\
                      v = &arr\n\
                      w = *(v + #-8)\n\
                      *(v + #4) = w\n\
                      ARG w\n\
                      CALL g\n\
                      GOTO top\n";
        let nodes = parse(source);
        let reparsed = parse(&display_program(&nodes));
        assert_eq!(reparsed, nodes);
    }

    #[test]
    fn test_unknown_line_reports_location() {
        let err = Parser::new("bad.ir")
            .parse_source("FUNCTION main:\nSWITCH x\n")
            .unwrap_err();
        assert_eq!(err.to_string(), "Parse error at bad.ir:2: unrecognized IR node 'SWITCH x'");
    }

    #[test]
    fn test_unknown_relop_rejected() {
        let err = Parser::new("bad.ir")
            .parse_source("IF a <> b GOTO l\n")
            .unwrap_err();
        assert!(err.to_string().contains("unknown relational operator '<>'"));
    }

    #[test]
    fn test_json_input() {
        let json = r#"[
            {"kind": "function", "name": "main"},
            {"kind": "load_imm", "dest": "T0", "value": 5},
            {"kind": "return", "value": "T0"}
        ]"#;
        let nodes = Parser::new("prog.json").parse_json(json).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2], IrNode::Return { value: Some("T0".to_string()) });
    }
}
