//! Nodes of a [`Circuit`] and the boolean functions gates can compute.
//!
//! [`Circuit`]: crate::ckt::Circuit

/// Index of a node inside the arena of its owning circuit.
///
/// A node id is only meaningful together with the circuit that owns the node.
/// Ids are dense: they always equal the node's position in the arena, and they
/// are remapped when the circuit is compacted after dead-node removal.
pub type NodeId = usize;

/// Reserved name prefix identifying key inputs in a netlist.
pub const KEY_PREFIX: &str = "keyinput";

/// The boolean function computed by a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFn {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
    Not,
    Buf,
    Mux,
}

impl GateFn {
    /// Parse a function symbol (case-insensitive).
    pub fn from_symbol(s: &str) -> Option<GateFn> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Some(GateFn::And),
            "or" => Some(GateFn::Or),
            "nand" => Some(GateFn::Nand),
            "nor" => Some(GateFn::Nor),
            "xor" => Some(GateFn::Xor),
            "xnor" => Some(GateFn::Xnor),
            "not" => Some(GateFn::Not),
            "buf" => Some(GateFn::Buf),
            "mux" => Some(GateFn::Mux),
            _ => None,
        }
    }

    /// The canonical (lowercase) symbol of the function.
    pub fn symbol(self) -> &'static str {
        match self {
            GateFn::And => "and",
            GateFn::Or => "or",
            GateFn::Nand => "nand",
            GateFn::Nor => "nor",
            GateFn::Xor => "xor",
            GateFn::Xnor => "xnor",
            GateFn::Not => "not",
            GateFn::Buf => "buf",
            GateFn::Mux => "mux",
        }
    }

    /// Is `n` a valid fan-in count for this function?
    ///
    /// `or` accepts a single input (the comparator of a doubled circuit with a
    /// single output is a 1-input or gate), `and`/`nand`/`nor` need at least
    /// two, `xor`/`xnor` exactly two, `not`/`buf` exactly one and `mux`
    /// exactly three (select first, then the two data inputs).
    pub fn arity_ok(self, n: usize) -> bool {
        match self {
            GateFn::And | GateFn::Nand | GateFn::Nor => n >= 2,
            GateFn::Or => n >= 1,
            GateFn::Xor | GateFn::Xnor => n == 2,
            GateFn::Not | GateFn::Buf => n == 1,
            GateFn::Mux => n == 3,
        }
    }

    /// Evaluate the function on concrete input bits.
    ///
    /// The slice must satisfy [`arity_ok`]; this is the reference semantics the
    /// clause encoders are tested against.
    ///
    /// [`arity_ok`]: GateFn::arity_ok
    pub fn eval(self, xs: &[bool]) -> bool {
        debug_assert!(self.arity_ok(xs.len()));
        match self {
            GateFn::And => xs.iter().all(|&x| x),
            GateFn::Or => xs.iter().any(|&x| x),
            GateFn::Nand => !xs.iter().all(|&x| x),
            GateFn::Nor => !xs.iter().any(|&x| x),
            GateFn::Xor => xs[0] ^ xs[1],
            GateFn::Xnor => !(xs[0] ^ xs[1]),
            GateFn::Not => !xs[0],
            GateFn::Buf => xs[0],
            GateFn::Mux => {
                if xs[0] {
                    xs[2]
                } else {
                    xs[1]
                }
            }
        }
    }
}

/// What a node is: a primary input, a key input, or a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    PrimaryInput,
    KeyInput,
    Gate(GateFn),
}

/// A node of the circuit arena.
///
/// Fan-in is ordered (it matters for `mux` and for matching declaration
/// order); fan-out is the exact inverse relation, with multiplicity: a gate
/// using the same node twice appears twice in that node's fan-out list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// Ordered fan-in (always empty for inputs).
    pub inputs: Vec<NodeId>,
    /// Ids of the nodes using this node as a fan-in.
    pub fanouts: Vec<NodeId>,
    /// Is this node a declared circuit output?
    pub is_output: bool,
    pub(crate) index: NodeId,
}

impl Node {
    pub(crate) fn new(name: String, kind: NodeKind, index: NodeId) -> Self {
        Node {
            name,
            kind,
            inputs: Vec::new(),
            fanouts: Vec::new(),
            is_output: false,
            index,
        }
    }

    /// The node's position in the owning circuit's arena.
    pub fn index(&self) -> NodeId {
        self.index
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, NodeKind::PrimaryInput | NodeKind::KeyInput)
    }

    pub fn is_keyinput(&self) -> bool {
        self.kind == NodeKind::KeyInput
    }

    pub fn is_gate(&self) -> bool {
        matches!(self.kind, NodeKind::Gate(_))
    }

    /// The gate function, or `None` for inputs.
    pub fn gate_fn(&self) -> Option<GateFn> {
        match self.kind {
            NodeKind::Gate(f) => Some(f),
            _ => None,
        }
    }

    /// Number of fan-in edges.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Remove one occurrence of `id` from the fan-in list.
    /// Returns true if an occurrence was found.
    pub(crate) fn remove_input_once(&mut self, id: NodeId) -> bool {
        if let Some(pos) = self.inputs.iter().position(|&x| x == id) {
            self.inputs.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove one occurrence of `id` from the fan-out list.
    pub(crate) fn remove_fanout_once(&mut self, id: NodeId) {
        if let Some(pos) = self.fanouts.iter().position(|&x| x == id) {
            self.fanouts.remove(pos);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gate_fn_symbols_roundtrip() {
        for f in [
            GateFn::And,
            GateFn::Or,
            GateFn::Nand,
            GateFn::Nor,
            GateFn::Xor,
            GateFn::Xnor,
            GateFn::Not,
            GateFn::Buf,
            GateFn::Mux,
        ] {
            assert_eq!(GateFn::from_symbol(f.symbol()), Some(f));
        }
        assert_eq!(GateFn::from_symbol("NAND"), Some(GateFn::Nand));
        assert_eq!(GateFn::from_symbol("latch"), None);
    }

    #[test]
    fn gate_fn_eval() {
        assert!(GateFn::And.eval(&[true, true, true]));
        assert!(!GateFn::And.eval(&[true, false, true]));
        assert!(GateFn::Nand.eval(&[true, false]));
        assert!(GateFn::Or.eval(&[false, true]));
        assert!(GateFn::Or.eval(&[true]));
        assert!(GateFn::Nor.eval(&[false, false]));
        assert!(GateFn::Xor.eval(&[true, false]));
        assert!(!GateFn::Xor.eval(&[true, true]));
        assert!(GateFn::Xnor.eval(&[true, true]));
        assert!(GateFn::Not.eval(&[false]));
        assert!(GateFn::Buf.eval(&[true]));
        // mux: select, a, b -> select ? b : a
        assert!(GateFn::Mux.eval(&[false, true, false]));
        assert!(!GateFn::Mux.eval(&[true, true, false]));
    }

    #[test]
    fn arity_checks() {
        assert!(GateFn::Or.arity_ok(1));
        assert!(!GateFn::And.arity_ok(1));
        assert!(GateFn::And.arity_ok(5));
        assert!(!GateFn::Xor.arity_ok(3));
        assert!(GateFn::Mux.arity_ok(3));
    }

    #[test]
    fn remove_input_once_keeps_duplicates() {
        let mut n = Node::new("g".to_string(), NodeKind::Gate(GateFn::Xor), 2);
        n.inputs = vec![0, 0];
        assert!(n.remove_input_once(0));
        assert_eq!(n.inputs, vec![0]);
        assert!(n.remove_input_once(0));
        assert!(!n.remove_input_once(0));
    }
}
