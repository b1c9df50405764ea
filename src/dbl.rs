//! Doubling a locked circuit into a miter.
//!
//! Two copies of the circuit share the primary inputs but carry independent
//! key inputs; each output pair feeds an XOR comparator and the comparators
//! are ORed into the single miter output. The miter is satisfiable exactly
//! when some shared input distinguishes the two keys.

use varisat::{ExtendFormula, Lit};

use crate::ckt::{Circuit, CktError, GateFn, Node, NodeId, Result};
use crate::clauselist::ClauseList;
use crate::cnf::{LitMap, build_cnf_mirrored};

/// Decides which inputs get an independent copy on each side of the miter.
/// Gates are always duplicated; inputs left unduplicated are shared.
pub trait DupPolicy {
    fn duplicate(&self, ckt: &Circuit, n: NodeId) -> bool;
}

/// The standard attack policy: duplicate every key input, share the rest.
pub struct DupAllKeys;

impl DupPolicy for DupAllKeys {
    fn duplicate(&self, ckt: &Circuit, n: NodeId) -> bool {
        ckt.nodes()[n].is_keyinput()
    }
}

/// A circuit doubled against itself, with the node maps into both copies.
#[derive(Debug, Clone)]
pub struct DoubledCircuit {
    pub dbl: Circuit,
    /// Original node id -> (copy A id, copy B id). Shared inputs map to the
    /// same id on both sides.
    pair: Vec<(NodeId, NodeId)>,
    /// Doubled ids below this bound belong to the circuit copies, ids at or
    /// above it to the comparator network.
    pub comparator_start: usize,
}

impl DoubledCircuit {
    /// Double `ckt` under the given duplication policy.
    pub fn build(ckt: &Circuit, policy: &impl DupPolicy) -> Result<Self> {
        if ckt.outputs.is_empty() {
            return Err(CktError::InvalidState(
                "cannot double a circuit without outputs".to_string(),
            ));
        }

        let mut dbl = Circuit::new();
        let mut pair: Vec<Option<(NodeId, NodeId)>> = vec![None; ckt.num_nodes()];

        let add_input = |dbl: &mut Circuit, node: &Node, name: String| {
            if node.is_keyinput() {
                dbl.add_key_input(name)
            } else {
                dbl.add_primary_input(name)
            }
        };
        for &i in &ckt.inputs {
            let node = &ckt.nodes()[i];
            pair[i] = Some(if policy.duplicate(ckt, i) {
                let a = add_input(&mut dbl, node, format!("{}_A", node.name));
                let b = add_input(&mut dbl, node, format!("{}_B", node.name));
                (a, b)
            } else {
                let s = add_input(&mut dbl, node, node.name.clone());
                (s, s)
            });
        }

        // Unwired first so fan-in order inside the copies does not matter.
        for (id, node) in ckt.nodes().iter().enumerate() {
            if let Some(func) = node.gate_fn() {
                let a = dbl.add_gate_unwired(format!("{}_A", node.name), func);
                let b = dbl.add_gate_unwired(format!("{}_B", node.name), func);
                pair[id] = Some((a, b));
            }
        }
        let map = |pair: &[Option<(NodeId, NodeId)>], i: NodeId| {
            pair[i].ok_or_else(|| CktError::InvalidState(format!("unmapped node {i}")))
        };
        for (id, node) in ckt.nodes().iter().enumerate() {
            if node.is_gate() {
                let (a, b) = map(&pair, id)?;
                let ins_a = node
                    .inputs
                    .iter()
                    .map(|&i| Ok(map(&pair, i)?.0))
                    .collect::<Result<Vec<NodeId>>>()?;
                let ins_b = node
                    .inputs
                    .iter()
                    .map(|&i| Ok(map(&pair, i)?.1))
                    .collect::<Result<Vec<NodeId>>>()?;
                dbl.wire_gate(a, ins_a)?;
                dbl.wire_gate(b, ins_b)?;
            }
        }

        let comparator_start = dbl.num_nodes();
        let mut comparators = Vec::with_capacity(ckt.outputs.len());
        for &o in &ckt.outputs {
            let (a, b) = map(&pair, o)?;
            let name = format!("cmp_{}", ckt.nodes()[o].name);
            comparators.push(dbl.add_gate(name, GateFn::Xor, vec![a, b])?);
        }
        let miter = dbl.add_gate("miter", GateFn::Or, comparators)?;
        dbl.set_output(miter)?;
        dbl.topo_sort()?;
        dbl.check_sanity()?;

        let pair = pair
            .into_iter()
            .collect::<Option<Vec<(NodeId, NodeId)>>>()
            .ok_or_else(|| CktError::InvalidState("unmapped node after doubling".to_string()))?;
        Ok(Self {
            dbl,
            pair,
            comparator_start,
        })
    }

    /// Copy-A id of an original node.
    pub fn node_a(&self, n: NodeId) -> NodeId {
        self.pair[n].0
    }

    /// Copy-B id of an original node.
    pub fn node_b(&self, n: NodeId) -> NodeId {
        self.pair[n].1
    }

    /// Copy-A literal of an original node.
    pub fn lit_a(&self, lmap: &LitMap, n: NodeId) -> Lit {
        lmap[self.pair[n].0]
    }

    /// Copy-B literal of an original node.
    pub fn lit_b(&self, lmap: &LitMap, n: NodeId) -> Lit {
        lmap[self.pair[n].1]
    }

    pub fn pair(&self) -> &[(NodeId, NodeId)] {
        &self.pair
    }

    /// Encode the doubled circuit into `solver` and mirror the clauses of
    /// the circuit copies (not the comparators) into a fresh template.
    /// Returns the literal map, the template and the miter output literal.
    pub fn encode(&self, solver: &mut impl ExtendFormula) -> (LitMap, ClauseList, Lit) {
        let mut template = ClauseList::new();
        let start = self.comparator_start;
        let lmap = build_cnf_mirrored(&self.dbl, solver, &mut template, |g| g < start);
        let miter = lmap[self.dbl.outputs[0]];
        (lmap, template, miter)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;
    use varisat::Solver;

    fn locked_and_xor() -> Circuit {
        Circuit::from_bench_str(
            "INPUT(a)\nINPUT(b)\nINPUT(keyinput0)\nOUTPUT(y)\n\
             g = AND(a, b)\ny = XOR(g, keyinput0)\n",
        )
        .unwrap()
    }

    #[test]
    fn doubling_shares_inputs_and_splits_keys() {
        let c = locked_and_xor();
        let d = DoubledCircuit::build(&c, &DupAllKeys).unwrap();
        assert_eq!(d.dbl.num_ckt_inputs(), 2);
        assert_eq!(d.dbl.num_key_inputs(), 2);
        // Two copies of two gates, one comparator, one miter or.
        assert_eq!(d.dbl.num_gates(), 6);
        assert_eq!(d.dbl.num_outputs(), 1);
        let a = c.ckt_inputs[0];
        assert_eq!(d.node_a(a), d.node_b(a));
        let k = c.key_inputs[0];
        assert_ne!(d.node_a(k), d.node_b(k));
        assert!(d.node_a(c.outputs[0]) < d.comparator_start);
    }

    #[test]
    fn miter_sat_iff_keys_distinguishable() {
        // y = and(a, b) xor key: any two distinct keys differ on every input.
        let c = locked_and_xor();
        let d = DoubledCircuit::build(&c, &DupAllKeys).unwrap();
        let mut solver = Solver::new();
        let (lmap, _, miter) = d.encode(&mut solver);

        let k = c.key_inputs[0];
        for k1 in [false, true] {
            for k2 in [false, true] {
                let ka = lmap[d.node_a(k)];
                let kb = lmap[d.node_b(k)];
                solver.assume(&[
                    miter,
                    if k1 { ka } else { !ka },
                    if k2 { kb } else { !kb },
                ]);
                assert_eq!(solver.solve().unwrap(), k1 != k2, "k1={k1} k2={k2}");
            }
        }
    }

    #[test]
    fn template_covers_copies_but_not_comparators() {
        let c = locked_and_xor();
        let d = DoubledCircuit::build(&c, &DupAllKeys).unwrap();
        let mut solver = Solver::new();
        let (lmap, template, _) = d.encode(&mut solver);
        assert_eq!(template.num_vars(), d.dbl.num_nodes());
        // and: 3 clauses, xor: 4, per copy.
        assert_eq!(template.num_clauses(), 14);
        let miter = lmap[d.dbl.outputs[0]];
        assert_eq!(template.clauses_with_lit(miter).count(), 0);
    }

    #[test]
    fn counterexample_inputs_transfer_to_the_original() {
        // y = and(a, key): keys are distinguishable only where a is true.
        let c = Circuit::from_bench_str(
            "INPUT(a)\nINPUT(keyinput0)\nOUTPUT(y)\ny = AND(a, keyinput0)\n",
        )
        .unwrap();
        let d = DoubledCircuit::build(&c, &DupAllKeys).unwrap();
        let mut solver = Solver::new();
        let (lmap, _, miter) = d.encode(&mut solver);
        solver.assume(&[miter]);
        assert!(solver.solve().unwrap());
        let model: HashSet<Lit> = solver.model().unwrap().into_iter().collect();
        assert!(model.contains(&lmap[d.node_a(c.ckt_inputs[0])]));
    }
}
