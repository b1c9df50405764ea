//! Direct circuit evaluation, used as the attack's I/O oracle.

use crate::ckt::{Circuit, CktError, Result};

/// Anything that maps a primary input vector to the output vector of the
/// activated design. The attack only ever observes the circuit through this.
pub trait Oracle {
    /// Outputs for one input vector, in declared output order.
    fn query(&mut self, inputs: &[bool]) -> Vec<bool>;
}

/// An oracle backed by direct evaluation of an unlocked circuit.
#[derive(Debug, Clone)]
pub struct CktEval {
    ckt: Circuit,
    values: Vec<bool>,
}

impl CktEval {
    /// Takes ownership of an unlocked circuit. Circuits with key inputs are
    /// rejected: an oracle models activated hardware.
    pub fn new(mut ckt: Circuit) -> Result<Self> {
        if ckt.num_key_inputs() != 0 {
            return Err(CktError::OracleHasKeyInputs);
        }
        if ckt.gates_sorted.len() != ckt.gates.len() {
            ckt.topo_sort()?;
        }
        let values = vec![false; ckt.num_nodes()];
        Ok(Self { ckt, values })
    }

    pub fn ckt(&self) -> &Circuit {
        &self.ckt
    }

    /// Evaluate the circuit; `inputs` follows the declared input order.
    pub fn eval(&mut self, inputs: &[bool]) -> Result<Vec<bool>> {
        if inputs.len() != self.ckt.num_ckt_inputs() {
            return Err(CktError::InvalidState(format!(
                "{} input values for {} inputs",
                inputs.len(),
                self.ckt.num_ckt_inputs()
            )));
        }
        for (&i, &v) in self.ckt.ckt_inputs.iter().zip(inputs) {
            self.values[i] = v;
        }
        for &g in &self.ckt.gates_sorted {
            let node = &self.ckt.nodes()[g];
            let func = node
                .gate_fn()
                .ok_or_else(|| CktError::InvalidState(format!("input {g} in gate order")))?;
            let xs: Vec<bool> = node.inputs.iter().map(|&i| self.values[i]).collect();
            self.values[g] = func.eval(&xs);
        }
        Ok(self.ckt.outputs.iter().map(|&o| self.values[o]).collect())
    }
}

impl Oracle for CktEval {
    fn query(&mut self, inputs: &[bool]) -> Vec<bool> {
        // The input width is fixed at construction; a mismatch here is a
        // caller bug, which an oracle cannot report.
        self.eval(inputs).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ckt::GateFn;

    #[test]
    fn evaluates_a_full_adder_sum() {
        // s = a xor b xor cin
        let mut c = Circuit::new();
        let a = c.add_primary_input("a");
        let b = c.add_primary_input("b");
        let cin = c.add_primary_input("cin");
        let t = c.add_gate("t", GateFn::Xor, vec![a, b]).unwrap();
        let s = c.add_gate("s", GateFn::Xor, vec![t, cin]).unwrap();
        c.set_output(s).unwrap();

        let mut eval = CktEval::new(c).unwrap();
        for bits in 0..8u32 {
            let ins: Vec<bool> = (0..3).map(|i| bits & (1 << i) != 0).collect();
            let expect = ins[0] ^ ins[1] ^ ins[2];
            assert_eq!(eval.eval(&ins).unwrap(), vec![expect]);
        }
    }

    #[test]
    fn output_order_follows_declaration() {
        let c = Circuit::from_bench_str(
            "INPUT(a)\nINPUT(b)\nOUTPUT(y2)\nOUTPUT(y1)\n\
             y1 = AND(a, b)\ny2 = OR(a, b)\n",
        )
        .unwrap();
        let mut eval = CktEval::new(c).unwrap();
        assert_eq!(eval.eval(&[true, false]).unwrap(), vec![true, false]);
    }

    #[test]
    fn locked_circuits_are_rejected() {
        let c = Circuit::from_bench_str(
            "INPUT(a)\nINPUT(keyinput0)\nOUTPUT(y)\ny = XOR(a, keyinput0)\n",
        )
        .unwrap();
        assert!(matches!(
            CktEval::new(c),
            Err(CktError::OracleHasKeyInputs)
        ));
    }

    #[test]
    fn activating_a_key_matches_the_locked_truth_table() {
        let locked = Circuit::from_bench_str(
            "INPUT(a)\nINPUT(b)\nINPUT(keyinput0)\nOUTPUT(y)\n\
             g = AND(a, b)\ny = XOR(g, keyinput0)\n",
        )
        .unwrap();
        let mut activated = locked.clone();
        activated.apply_known_keys("1").unwrap();
        let mut eval = CktEval::new(activated).unwrap();
        for bits in 0..4u32 {
            let ins: Vec<bool> = (0..2).map(|i| bits & (1 << i) != 0).collect();
            assert_eq!(eval.eval(&ins).unwrap(), vec![!(ins[0] && ins[1])]);
        }
    }
}
