//! Gate-to-clause encoders and the circuit-to-CNF builders.
//!
//! Every encoder is a stateless function over `&mut impl ExtendFormula`, so
//! the same encoding targets the live [`varisat::Solver`], a plain
//! [`varisat::CnfFormula`], or the frozen [`ClauseList`] template used by the
//! attack loop.
//!
//! [`ClauseList`]: crate::clauselist::ClauseList

use varisat::{ExtendFormula, Lit};

use crate::ckt::{Circuit, CktError, GateFn, NodeId, Result};
use crate::clauselist::ClauseList;

/// Dense map from node id to the solver literal of that node's variable.
pub type LitMap = Vec<Lit>;

/// `y = and(xs)`: each input pulls the output down, all inputs push it up.
pub fn add_and(sink: &mut impl ExtendFormula, xs: &[Lit], y: Lit) {
    let mut long = Vec::with_capacity(xs.len() + 1);
    for &x in xs {
        sink.add_clause(&[x, !y]);
        long.push(!x);
    }
    long.push(y);
    sink.add_clause(&long);
}

/// `y = or(xs)`.
pub fn add_or(sink: &mut impl ExtendFormula, xs: &[Lit], y: Lit) {
    let mut long = Vec::with_capacity(xs.len() + 1);
    for &x in xs {
        sink.add_clause(&[!x, y]);
        long.push(x);
    }
    long.push(!y);
    sink.add_clause(&long);
}

/// `y = nand(xs)`.
pub fn add_nand(sink: &mut impl ExtendFormula, xs: &[Lit], y: Lit) {
    let mut long = Vec::with_capacity(xs.len() + 1);
    for &x in xs {
        sink.add_clause(&[x, y]);
        long.push(!x);
    }
    long.push(!y);
    sink.add_clause(&long);
}

/// `y = nor(xs)`.
pub fn add_nor(sink: &mut impl ExtendFormula, xs: &[Lit], y: Lit) {
    let mut long = Vec::with_capacity(xs.len() + 1);
    for &x in xs {
        sink.add_clause(&[!x, !y]);
        long.push(x);
    }
    long.push(y);
    sink.add_clause(&long);
}

/// `y = xor(a, b)`: the four minterm implications.
pub fn add_xor(sink: &mut impl ExtendFormula, a: Lit, b: Lit, y: Lit) {
    sink.add_clause(&[a, b, !y]);
    sink.add_clause(&[!a, !b, !y]);
    sink.add_clause(&[a, !b, y]);
    sink.add_clause(&[!a, b, y]);
}

/// `y = xnor(a, b)`.
pub fn add_xnor(sink: &mut impl ExtendFormula, a: Lit, b: Lit, y: Lit) {
    sink.add_clause(&[a, b, y]);
    sink.add_clause(&[!a, !b, y]);
    sink.add_clause(&[a, !b, !y]);
    sink.add_clause(&[!a, b, !y]);
}

/// `y = if s { b } else { a }`.
pub fn add_mux(sink: &mut impl ExtendFormula, s: Lit, a: Lit, b: Lit, y: Lit) {
    sink.add_clause(&[s, !a, y]);
    sink.add_clause(&[!s, !b, y]);
    sink.add_clause(&[s, a, !y]);
    sink.add_clause(&[!s, b, !y]);
}

/// Emit the clauses of one gate. `not` is a 1-input `nand`, `buf` a 1-input
/// `and`.
pub fn encode_gate(sink: &mut impl ExtendFormula, func: GateFn, xs: &[Lit], y: Lit) {
    debug_assert!(func.arity_ok(xs.len()));
    match func {
        GateFn::And | GateFn::Buf => add_and(sink, xs, y),
        GateFn::Nand | GateFn::Not => add_nand(sink, xs, y),
        GateFn::Or => add_or(sink, xs, y),
        GateFn::Nor => add_nor(sink, xs, y),
        GateFn::Xor => add_xor(sink, xs[0], xs[1], y),
        GateFn::Xnor => add_xnor(sink, xs[0], xs[1], y),
        GateFn::Mux => add_mux(sink, xs[0], xs[1], xs[2], y),
    }
}

/// Allocate one variable per node and encode every gate.
///
/// Gate order does not matter here: every node already has its variable
/// before any gate is encoded.
pub fn build_cnf(ckt: &Circuit, sink: &mut impl ExtendFormula) -> LitMap {
    let lmap: LitMap = (0..ckt.num_nodes()).map(|_| sink.new_lit()).collect();
    for &g in &ckt.gates {
        encode_node(ckt, g, &lmap, sink);
    }
    lmap
}

/// Like [`build_cnf`], but additionally mirrors the clauses of gates selected
/// by `mirror` into the [`ClauseList`] template. The template's variable
/// space is kept in lockstep with the solver's.
pub fn build_cnf_mirrored(
    ckt: &Circuit,
    solver: &mut impl ExtendFormula,
    template: &mut ClauseList,
    mirror: impl Fn(NodeId) -> bool,
) -> LitMap {
    let lmap: LitMap = (0..ckt.num_nodes())
        .map(|_| {
            template.new_var();
            solver.new_lit()
        })
        .collect();
    for &g in &ckt.gates {
        encode_node(ckt, g, &lmap, solver);
        if mirror(g) {
            encode_node(ckt, g, &lmap, template);
        }
    }
    lmap
}

fn encode_node(ckt: &Circuit, g: NodeId, lmap: &LitMap, sink: &mut impl ExtendFormula) {
    let node = &ckt.nodes()[g];
    let func = match node.gate_fn() {
        Some(f) => f,
        None => return,
    };
    let xs: Vec<Lit> = node.inputs.iter().map(|&i| lmap[i]).collect();
    encode_gate(sink, func, &xs, lmap[g]);
}

/// Literal pair of the ternary encoding: the is-unknown bit and the value
/// bit of one node.
pub type TernaryLits = (Lit, Lit);

/// Dense map from node id to its ternary literal pair.
pub type TernaryLitMap = Vec<TernaryLits>;

/// Three-valued circuit encoding with two adjacent variables per node: an
/// is-unknown bit `x` and a value bit `v`.
///
/// The value bits carry the ordinary binary encoding of every gate; the
/// unknown bits propagate don't-care: a gate output is unknown exactly when
/// no known controlling input determines it and at least one input is
/// unknown. Inputs may then be asserted to the don't-care state with
/// [`assert_ternary`]. Only 1-, 2- and 3-input (`mux`) gates are supported,
/// matching the auxiliary analyses this feeds.
pub fn build_ternary_cnf(ckt: &Circuit, sink: &mut impl ExtendFormula) -> Result<TernaryLitMap> {
    let tmap: TernaryLitMap = (0..ckt.num_nodes())
        .map(|_| (sink.new_lit(), sink.new_lit()))
        .collect();
    for &g in &ckt.gates {
        let node = &ckt.nodes()[g];
        let func = match node.gate_fn() {
            Some(f) => f,
            None => continue,
        };
        if node.inputs.len() > 2 && func != GateFn::Mux {
            return Err(CktError::BadArity {
                name: node.name.clone(),
                func: func.symbol(),
                arity: node.inputs.len(),
            });
        }
        let xs: Vec<TernaryLits> = node.inputs.iter().map(|&i| tmap[i]).collect();
        encode_ternary_gate(sink, func, &xs, tmap[g]);
    }
    Ok(tmap)
}

/// Pin a ternary input: `None` asserts the don't-care state, `Some(v)` a
/// known value.
pub fn assert_ternary(sink: &mut impl ExtendFormula, lits: TernaryLits, value: Option<bool>) {
    let (x, v) = lits;
    match value {
        None => sink.add_clause(&[x]),
        Some(true) => {
            sink.add_clause(&[!x]);
            sink.add_clause(&[v]);
        }
        Some(false) => {
            sink.add_clause(&[!x]);
            sink.add_clause(&[!v]);
        }
    }
}

fn encode_ternary_gate(
    sink: &mut impl ExtendFormula,
    func: GateFn,
    xs: &[TernaryLits],
    y: TernaryLits,
) {
    let (yx, yv) = y;
    let vals: Vec<Lit> = xs.iter().map(|&(_, v)| v).collect();
    // Value bits follow the plain binary encoding.
    encode_gate(sink, func, &vals, yv);

    match func {
        GateFn::Buf | GateFn::Not => {
            let (ax, _) = xs[0];
            sink.add_clause(&[!ax, yx]);
            sink.add_clause(&[ax, !yx]);
        }
        GateFn::Xor | GateFn::Xnor => {
            // Any unknown input makes the output unknown.
            let (ax, _) = xs[0];
            let (bx, _) = xs[1];
            sink.add_clause(&[!ax, yx]);
            sink.add_clause(&[!bx, yx]);
            sink.add_clause(&[ax, bx, !yx]);
        }
        GateFn::And | GateFn::Nand | GateFn::Or | GateFn::Nor => {
            // With a single fan-in there is no second side to control the
            // output; the unknown bit passes straight through.
            if let [(ax, _)] = *xs {
                sink.add_clause(&[!ax, yx]);
                sink.add_clause(&[ax, !yx]);
                return;
            }
            let (ax, av) = xs[0];
            let (bx, bv) = xs[1];
            // ctl is the polarity of the controlling value (0 for and-like,
            // 1 for or-like): a known controlling input forces the output.
            let and_like = matches!(func, GateFn::And | GateFn::Nand);
            let (actl, bctl) = if and_like { (!av, !bv) } else { (av, bv) };
            // Unknown when one side is unknown and the other cannot control.
            sink.add_clause(&[!ax, !bx, yx]);
            sink.add_clause(&[!ax, bctl, yx]);
            sink.add_clause(&[actl, !bx, yx]);
            // Known when a controlling input is known, or both are known.
            sink.add_clause(&[ax, !actl, !yx]);
            sink.add_clause(&[bx, !bctl, !yx]);
            sink.add_clause(&[ax, bx, !yx]);
        }
        GateFn::Mux => {
            let (sx, sv) = xs[0];
            let (ax, av) = xs[1];
            let (bx, bv) = xs[2];
            // Select known: the chosen branch decides.
            sink.add_clause(&[sx, sv, !ax, yx]);
            sink.add_clause(&[sx, !sv, !bx, yx]);
            sink.add_clause(&[sx, sv, ax, !yx]);
            sink.add_clause(&[sx, !sv, bx, !yx]);
            // Select unknown: unknown unless both branches are known equal.
            sink.add_clause(&[!sx, !ax, yx]);
            sink.add_clause(&[!sx, !bx, yx]);
            sink.add_clause(&[!sx, !av, bv, yx]);
            sink.add_clause(&[!sx, av, !bv, yx]);
            sink.add_clause(&[ax, bx, !av, !bv, !yx]);
            sink.add_clause(&[ax, bx, av, bv, !yx]);
        }
    }
}
