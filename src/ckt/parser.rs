//! BENCH-style netlist parsing.
//!
//! The grammar is line based:
//!
//! ```text
//! # a comment
//! INPUT(a)
//! OUTPUT(y)
//! y = AND(a, keyinput0)
//! ```
//!
//! Function symbols are case-insensitive. Key inputs are not a separate
//! declaration kind: any input whose name starts with [`KEY_PREFIX`] is one.
//!
//! [`KEY_PREFIX`]: crate::ckt::KEY_PREFIX

use std::collections::HashMap;
use std::path::Path;

use super::{Circuit, GateFn, KEY_PREFIX, NodeId, ParserError, Result};

/// One parsed netlist statement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    Input(String),
    Output(String),
    Gate {
        output: String,
        func: GateFn,
        inputs: Vec<String>,
    },
}

/// Parse `NAME(arg)` where `NAME` matches `keyword` case-insensitively.
fn parse_decl<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line
        .get(..keyword.len())
        .filter(|head| head.eq_ignore_ascii_case(keyword))
        .map(|_| line[keyword.len()..].trim_start())?;
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    let name = inner.trim();
    if name.is_empty() { None } else { Some(name) }
}

fn parse_line(line: &str, lineno: usize) -> std::result::Result<Option<Statement>, ParserError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if let Some(name) = parse_decl(line, "INPUT") {
        return Ok(Some(Statement::Input(name.to_string())));
    }
    if let Some(name) = parse_decl(line, "OUTPUT") {
        return Ok(Some(Statement::Output(name.to_string())));
    }

    // name = FUNC(a, b, ...)
    let (output, rhs) = line.split_once('=').ok_or_else(|| ParserError::Syntax {
        line: lineno,
        msg: "expected INPUT(..), OUTPUT(..) or a gate assignment".to_string(),
    })?;
    let output = output.trim();
    let rhs = rhs.trim();
    let (symbol, args) = rhs.split_once('(').ok_or_else(|| ParserError::Syntax {
        line: lineno,
        msg: "expected a function application on the right-hand side".to_string(),
    })?;
    let args = args.strip_suffix(')').ok_or_else(|| ParserError::Syntax {
        line: lineno,
        msg: "missing closing parenthesis".to_string(),
    })?;
    let symbol = symbol.trim();
    let func = GateFn::from_symbol(symbol).ok_or_else(|| ParserError::UnknownFunction {
        line: lineno,
        symbol: symbol.to_string(),
    })?;
    let inputs: Vec<String> = args
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if output.is_empty() || inputs.is_empty() {
        return Err(ParserError::Syntax {
            line: lineno,
            msg: "empty signal name".to_string(),
        });
    }
    Ok(Some(Statement::Gate {
        output: output.to_string(),
        func,
        inputs,
    }))
}

fn from_statements(statements: Vec<(usize, Statement)>) -> Result<Circuit> {
    let mut ckt = Circuit::new();
    let mut by_name: HashMap<String, NodeId> = HashMap::new();
    let mut gate_wiring: Vec<(NodeId, Vec<String>)> = Vec::new();
    let mut output_names: Vec<String> = Vec::new();

    for (lineno, stmt) in statements {
        match stmt {
            Statement::Input(name) => {
                if by_name.contains_key(&name) {
                    return Err(ParserError::DuplicateSignal { line: lineno, name }.into());
                }
                let id = if name.starts_with(KEY_PREFIX) {
                    ckt.add_key_input(name.clone())
                } else {
                    ckt.add_primary_input(name.clone())
                };
                by_name.insert(name, id);
            }
            Statement::Output(name) => output_names.push(name),
            Statement::Gate {
                output,
                func,
                inputs,
            } => {
                if by_name.contains_key(&output) {
                    return Err(ParserError::DuplicateSignal {
                        line: lineno,
                        name: output,
                    }
                    .into());
                }
                let id = ckt.add_gate_unwired(output.clone(), func);
                by_name.insert(output, id);
                gate_wiring.push((id, inputs));
            }
        }
    }

    // Gates may reference signals declared further down, so wire afterwards.
    for (id, input_names) in gate_wiring {
        let inputs = input_names
            .into_iter()
            .map(|name| {
                by_name
                    .get(&name)
                    .copied()
                    .ok_or(ParserError::UndeclaredSignal(name))
            })
            .collect::<std::result::Result<Vec<NodeId>, ParserError>>()?;
        ckt.wire_gate(id, inputs)?;
    }

    for name in output_names {
        let id = *by_name
            .get(&name)
            .ok_or(ParserError::UndeclaredSignal(name))?;
        ckt.set_output(id)?;
    }

    ckt.topo_sort()?;
    ckt.check_sanity()?;
    Ok(ckt)
}

impl Circuit {
    /// Parse a circuit from BENCH-format text.
    pub fn from_bench_str(text: &str) -> Result<Self> {
        let mut statements = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if let Some(stmt) = parse_line(line, i + 1)? {
                statements.push((i + 1, stmt));
            }
        }
        from_statements(statements)
    }

    /// Parse a circuit from a BENCH-format file.
    pub fn from_bench_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ParserError::IoError(e.to_string()))?;
        Self::from_bench_str(&text)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ckt::CktError;

    const LOCKED: &str = "\
# a tiny locked netlist
INPUT(a)
INPUT(b)
INPUT(keyinput0)
OUTPUT(y)
g = AND(a, b)
y = XOR(g, keyinput0)
";

    #[test]
    fn parse_locked_netlist() {
        let c = Circuit::from_bench_str(LOCKED).unwrap();
        assert_eq!(c.num_ckt_inputs(), 2);
        assert_eq!(c.num_key_inputs(), 1);
        assert_eq!(c.num_gates(), 2);
        assert_eq!(c.num_outputs(), 1);
        assert_eq!(c.node(c.outputs[0]).unwrap().name, "y");
    }

    #[test]
    fn forward_references_are_fine() {
        let c = Circuit::from_bench_str(
            "INPUT(a)\nOUTPUT(y)\ny = NOT(g)\ng = BUF(a)\n",
        )
        .unwrap();
        assert_eq!(c.num_gates(), 2);
    }

    #[test]
    fn case_insensitive_symbols() {
        let c =
            Circuit::from_bench_str("INPUT(a)\nOUTPUT(y)\ny = nAnD(a, a)\n").unwrap();
        assert_eq!(
            c.node(c.outputs[0]).unwrap().gate_fn(),
            Some(crate::ckt::GateFn::Nand)
        );
    }

    #[test]
    fn syntax_errors_carry_the_line() {
        let err = Circuit::from_bench_str("INPUT(a)\nwhat is this\n").unwrap_err();
        match err {
            CktError::ParserError(ParserError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_function() {
        let err =
            Circuit::from_bench_str("INPUT(a)\nOUTPUT(y)\ny = LATCH(a)\n").unwrap_err();
        assert!(matches!(
            err,
            CktError::ParserError(ParserError::UnknownFunction { line: 3, .. })
        ));
    }

    #[test]
    fn duplicate_and_undeclared_signals() {
        assert!(matches!(
            Circuit::from_bench_str("INPUT(a)\nINPUT(a)\n").unwrap_err(),
            CktError::ParserError(ParserError::DuplicateSignal { .. })
        ));
        assert!(matches!(
            Circuit::from_bench_str("INPUT(a)\nOUTPUT(y)\ny = NOT(zz)\n").unwrap_err(),
            CktError::ParserError(ParserError::UndeclaredSignal(_))
        ));
    }

    #[test]
    fn bad_arity_is_reported() {
        assert!(matches!(
            Circuit::from_bench_str("INPUT(a)\nOUTPUT(y)\ny = XOR(a)\n").unwrap_err(),
            CktError::BadArity { .. }
        ));
    }

    #[test]
    fn cyclic_netlist_is_rejected() {
        let err = Circuit::from_bench_str(
            "INPUT(a)\nOUTPUT(y)\ny = AND(a, z)\nz = BUF(y)\n",
        )
        .unwrap_err();
        assert!(matches!(err, CktError::Cycle(_)));
    }
}
