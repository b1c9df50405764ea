//! Structural sanity checking of a [`Circuit`].
//!
//! A failing check means a logic error inside this crate, never bad user
//! input; everything reports [`CktError::InvalidState`].
//!
//! [`Circuit`]: crate::ckt::Circuit
//! [`CktError::InvalidState`]: crate::ckt::CktError::InvalidState

use super::{Circuit, CktError, Result};

fn invalid(msg: String) -> CktError {
    CktError::InvalidState(msg)
}

impl Circuit {
    /// Check every structural invariant of the arena:
    /// - input count + gate count equals node count
    /// - every node's stored index equals its arena position
    /// - every view entry refers to a node of the matching kind
    /// - `inputs` is the interleaving of `ckt_inputs` and `key_inputs`
    /// - every gate's fan-in count is valid for its function
    /// - fan-out is the exact inverse of fan-in, with multiplicity
    /// - the `is_output` flag agrees with the `outputs` view.
    pub fn check_sanity(&self) -> Result<()> {
        let nodes = self.nodes();

        if self.inputs.len() + self.gates.len() != nodes.len() {
            return Err(invalid(format!(
                "{} inputs + {} gates != {} nodes",
                self.inputs.len(),
                self.gates.len(),
                nodes.len()
            )));
        }

        for (pos, node) in nodes.iter().enumerate() {
            if node.index() != pos {
                return Err(invalid(format!(
                    "node {:?} stored index {} at position {}",
                    node.name,
                    node.index(),
                    pos
                )));
            }
        }

        if self.inputs.len() != self.ckt_inputs.len() + self.key_inputs.len() {
            return Err(invalid("input views out of sync".to_string()));
        }
        for &i in &self.inputs {
            let node = nodes.get(i).ok_or_else(|| {
                invalid(format!("input view refers to missing node {i}"))
            })?;
            if !node.is_input() {
                return Err(invalid(format!("{:?} in input view is a gate", node.name)));
            }
            if !node.inputs.is_empty() {
                return Err(invalid(format!("input {:?} has fan-in", node.name)));
            }
            let in_keys = self.key_inputs.contains(&i);
            if node.is_keyinput() != in_keys {
                return Err(invalid(format!(
                    "key flag of {:?} disagrees with the key view",
                    node.name
                )));
            }
        }

        for &g in &self.gates {
            let node = nodes.get(g).ok_or_else(|| {
                invalid(format!("gate view refers to missing node {g}"))
            })?;
            let func = node
                .gate_fn()
                .ok_or_else(|| invalid(format!("{:?} in gate view is an input", node.name)))?;
            if !func.arity_ok(node.inputs.len()) {
                return Err(invalid(format!(
                    "gate {:?}: {} fan-in(s) for {}",
                    node.name,
                    node.inputs.len(),
                    func.symbol()
                )));
            }
            for &i in &node.inputs {
                if i >= nodes.len() {
                    return Err(invalid(format!(
                        "gate {:?} fan-in {i} out of range",
                        node.name
                    )));
                }
            }
        }

        // Fan-out must be the inverse of fan-in, with multiplicity.
        let count = |edges: &[usize], id: usize| edges.iter().filter(|&&x| x == id).count();
        for (id, node) in nodes.iter().enumerate() {
            for &i in &node.inputs {
                if count(&nodes[i].fanouts, id) != count(&node.inputs, i) {
                    return Err(invalid(format!(
                        "fan-out of {:?} is not the inverse of fan-in of {:?}",
                        nodes[i].name, node.name
                    )));
                }
            }
            for &f in &node.fanouts {
                if f >= nodes.len() || !nodes[f].inputs.contains(&id) {
                    return Err(invalid(format!(
                        "stale fan-out edge {:?} -> {f}",
                        node.name
                    )));
                }
            }
        }

        for (id, node) in nodes.iter().enumerate() {
            if node.is_output != self.outputs.contains(&id) {
                return Err(invalid(format!(
                    "output flag of {:?} disagrees with the output view",
                    node.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::ckt::{Circuit, CktError, GateFn};

    #[test]
    fn sane_circuit_passes() {
        let mut c = Circuit::new();
        let a = c.add_primary_input("a");
        let k = c.add_key_input("keyinput0");
        let g = c.add_gate("g", GateFn::Xor, vec![a, k]).unwrap();
        c.set_output(g).unwrap();
        c.check_sanity().unwrap();
    }

    #[test]
    fn broken_fanout_is_caught() {
        let mut c = Circuit::new();
        let a = c.add_primary_input("a");
        let g = c.add_gate("g", GateFn::Not, vec![a]).unwrap();
        c.set_output(g).unwrap();
        // Sever the back edge behind the circuit's back.
        c.node_mut(a).unwrap().fanouts.clear();
        assert!(matches!(
            c.check_sanity(),
            Err(CktError::InvalidState(_))
        ));
    }
}
