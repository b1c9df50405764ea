use thiserror::Error;

use super::NodeId;

/// The result of a circuit operation.
pub type Result<T> = std::result::Result<T, CktError>;

/// Error returned when a circuit operation failed.
#[derive(Debug, Error)]
pub enum CktError {
    /// A node with the given name already exists.
    #[error("a node named {0:?} already exists")]
    DuplicateName(String),

    /// The node with the given id does not exist.
    #[error("node with id={0} does not exist")]
    NodeDoesNotExist(NodeId),

    /// A gate was declared with a fan-in count its function does not accept.
    #[error("gate {name:?}: function {func:?} does not accept {arity} input(s)")]
    BadArity {
        name: String,
        func: &'static str,
        arity: usize,
    },

    /// The gate graph is not acyclic.
    #[error("combinational cycle involving {0:?}")]
    Cycle(String),

    /// Constant propagation reached a declared output, which would pin it to a
    /// fixed value. The netlist (or the supplied key bits) is degenerate.
    #[error("output {0:?} would become constant")]
    ConstantOutput(String),

    /// A known-key string does not match the circuit's key inputs.
    #[error("bad key string: {0}")]
    KeyFormat(String),

    /// The locked circuit and the oracle circuit disagree on their interface.
    #[error("circuit interfaces differ: {0}")]
    CompareIo(String),

    /// An oracle evaluator was requested for a circuit that still has key
    /// inputs.
    #[error("cannot evaluate a circuit with unresolved key inputs")]
    OracleHasKeyInputs,

    /// The backing SAT solver reported an error.
    #[error("solver error: {0}")]
    Solver(String),

    /// The circuit (or the attack state built on top of it) reached an
    /// invalid state. This should never happen on well-formed input: if this
    /// error is raised there is a logic error in this crate.
    #[error("invalid internal state - this should not happen - error: {0}")]
    InvalidState(String),

    /// Just forwarding a [`ParserError`].
    #[error("{0}")]
    ParserError(#[from] ParserError),
}

/// Error returned when parsing a netlist failed.
///
/// It is defined here because the `parser` module is private.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Line did not match any known statement form.
    #[error("line {line}: syntax error: {msg}")]
    Syntax { line: usize, msg: String },

    /// Unknown gate function symbol.
    #[error("line {line}: unknown function {symbol:?}")]
    UnknownFunction { line: usize, symbol: String },

    /// A signal name was declared twice.
    #[error("line {line}: duplicate signal {name:?}")]
    DuplicateSignal { line: usize, name: String },

    /// A referenced signal was never declared.
    #[error("undeclared signal {0:?}")]
    UndeclaredSignal(String),

    /// An IO error occured (file doesn't exist, ...).
    #[error("io error: {0}")]
    IoError(String),
}
