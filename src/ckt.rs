//! Module defining the [`Circuit`] arena, as well as [`Node`], [`GateFn`] and
//! related structs.
//!
//! A [`Circuit`] owns all of its nodes in a dense arena indexed by [`NodeId`];
//! edges are stored as id lists, so no node ever holds a reference into
//! another. Key inputs are ordinary inputs flagged with
//! [`NodeKind::KeyInput`]; the netlist parser recognizes them by the reserved
//! [`KEY_PREFIX`] name prefix.
//!
//! To attack a locked circuit, check [`crate::attack::SatAttack`].

mod integrity;
mod parser;
mod slice;

pub mod error;
pub mod node;

pub use error::{CktError, ParserError, Result};
pub use node::{GateFn, KEY_PREFIX, Node, NodeId, NodeKind};
pub use slice::Slice;

/// A combinational circuit.
///
/// The arena `nodes` is the single owner of every node; `inputs`,
/// `ckt_inputs`, `key_inputs`, `outputs` and `gates` are views over it,
/// preserving declaration order. `nodes_sorted` and `gates_sorted` are
/// topological views refreshed by [`topo_sort`].
///
/// `Clone` performs a structural copy: the clone shares nothing with the
/// original (there are no shared nodes to begin with, ids are plain indices).
///
/// [`topo_sort`]: Circuit::topo_sort
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    nodes: Vec<Node>,
    /// All inputs (primary and key) in declaration order.
    pub inputs: Vec<NodeId>,
    /// Primary (non-key) inputs in declaration order.
    pub ckt_inputs: Vec<NodeId>,
    /// Key inputs in declaration order.
    pub key_inputs: Vec<NodeId>,
    /// Declared outputs in declaration order.
    pub outputs: Vec<NodeId>,
    /// Gates in creation order.
    pub gates: Vec<NodeId>,
    /// All nodes sorted by topological level (inputs first).
    pub nodes_sorted: Vec<NodeId>,
    /// Gates sorted by topological level.
    pub gates_sorted: Vec<NodeId>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Circuit::default()
    }

    /// Retrieves a node from its id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// All nodes in arena order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_ckt_inputs(&self) -> usize {
        self.ckt_inputs.len()
    }

    pub fn num_key_inputs(&self) -> usize {
        self.key_inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    fn add_node(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(name, kind, id));
        id
    }

    /// Add a primary input.
    pub fn add_primary_input(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.add_node(name.into(), NodeKind::PrimaryInput);
        self.inputs.push(id);
        self.ckt_inputs.push(id);
        id
    }

    /// Add a key input.
    pub fn add_key_input(&mut self, name: impl Into<String>) -> NodeId {
        let id = self.add_node(name.into(), NodeKind::KeyInput);
        self.inputs.push(id);
        self.key_inputs.push(id);
        id
    }

    /// Add a gate node without fan-in, to be wired later with [`wire_gate`].
    ///
    /// Needed because netlists (and pair-map doubling) may reference gates
    /// declared further down.
    ///
    /// [`wire_gate`]: Circuit::wire_gate
    pub fn add_gate_unwired(&mut self, name: impl Into<String>, func: GateFn) -> NodeId {
        let id = self.add_node(name.into(), NodeKind::Gate(func));
        self.gates.push(id);
        id
    }

    /// Wire the fan-in of a gate created with [`add_gate_unwired`], updating
    /// the fan-out lists of the input nodes.
    ///
    /// [`add_gate_unwired`]: Circuit::add_gate_unwired
    pub fn wire_gate(&mut self, id: NodeId, inputs: Vec<NodeId>) -> Result<()> {
        let node = self.nodes.get(id).ok_or(CktError::NodeDoesNotExist(id))?;
        let func = match node.kind {
            NodeKind::Gate(f) => f,
            _ => {
                return Err(CktError::InvalidState(format!(
                    "wire_gate called on non-gate node {id}"
                )));
            }
        };
        if !func.arity_ok(inputs.len()) {
            return Err(CktError::BadArity {
                name: node.name.clone(),
                func: func.symbol(),
                arity: inputs.len(),
            });
        }
        for &i in &inputs {
            if i >= self.nodes.len() {
                return Err(CktError::NodeDoesNotExist(i));
            }
        }
        for &i in &inputs {
            self.nodes[i].fanouts.push(id);
        }
        self.nodes[id].inputs = inputs;
        Ok(())
    }

    /// Add a gate with its fan-in in one go.
    pub fn add_gate(
        &mut self,
        name: impl Into<String>,
        func: GateFn,
        inputs: Vec<NodeId>,
    ) -> Result<NodeId> {
        let id = self.add_gate_unwired(name, func);
        match self.wire_gate(id, inputs) {
            Ok(()) => Ok(id),
            Err(e) => {
                // Undo the unwired node so the arena stays consistent.
                self.nodes.pop();
                self.gates.pop();
                Err(e)
            }
        }
    }

    /// Declare a node as a circuit output.
    pub fn set_output(&mut self, id: NodeId) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(CktError::NodeDoesNotExist(id))?;
        if !node.is_output {
            node.is_output = true;
            self.outputs.push(id);
        }
        Ok(())
    }

    /// Rebuild every fan-out list from the fan-in lists.
    pub(crate) fn init_fanouts(&mut self) {
        for n in &mut self.nodes {
            n.fanouts.clear();
        }
        for id in 0..self.nodes.len() {
            for pos in 0..self.nodes[id].inputs.len() {
                let src = self.nodes[id].inputs[pos];
                self.nodes[src].fanouts.push(id);
            }
        }
    }

    /// Compute topological levels by fixed-point relaxation
    /// (`level(gate) = 1 + max(level(inputs))`) and refresh the sorted views.
    ///
    /// Fails with [`CktError::Cycle`] if the gate graph is cyclic.
    pub fn topo_sort(&mut self) -> Result<()> {
        let n = self.nodes.len();
        let mut level = vec![0u32; n];
        let mut passes = 0usize;
        loop {
            let mut changed = false;
            for &g in &self.gates {
                let l = 1 + self.nodes[g]
                    .inputs
                    .iter()
                    .map(|&i| level[i])
                    .max()
                    .unwrap_or(0);
                if level[g] != l {
                    level[g] = l;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            passes += 1;
            if passes > n + 1 {
                let witness = self
                    .gates
                    .iter()
                    .map(|&g| self.nodes[g].name.clone())
                    .next_back()
                    .unwrap_or_default();
                return Err(CktError::Cycle(witness));
            }
        }

        self.nodes_sorted = (0..n).collect();
        self.nodes_sorted.sort_by_key(|&id| level[id]);
        self.gates_sorted = self.gates.clone();
        self.gates_sorted.sort_by_key(|&id| level[id]);
        Ok(())
    }

    /// Redirect every fan-out of `old` to use `new` instead.
    pub(crate) fn rewrite_fanouts_with(&mut self, old: NodeId, new: NodeId) {
        let fanouts = std::mem::take(&mut self.nodes[old].fanouts);
        for &g in &fanouts {
            for inp in &mut self.nodes[g].inputs {
                if *inp == old {
                    *inp = new;
                }
            }
        }
        self.nodes[new].fanouts.extend(fanouts);
    }

    /// Propagate the constant `value` out of node `id`, simplifying or
    /// eliminating downstream gates whose function becomes determined.
    ///
    /// On return `id` (and any gate that collapsed to a constant) has an empty
    /// fan-out list; [`cleanup`] then prunes the dead nodes. Fails with
    /// [`CktError::ConstantOutput`] if the constant reaches a declared output.
    ///
    /// [`cleanup`]: Circuit::cleanup
    pub fn const_propagate(&mut self, id: NodeId, value: bool) -> Result<()> {
        if id >= self.nodes.len() {
            return Err(CktError::NodeDoesNotExist(id));
        }
        let mut stack = vec![(id, value)];
        while let Some((n, v)) = stack.pop() {
            if self.nodes[n].is_output {
                return Err(CktError::ConstantOutput(self.nodes[n].name.clone()));
            }
            let fanouts = std::mem::take(&mut self.nodes[n].fanouts);
            for g in fanouts {
                // A gate with the constant twice in its fan-in shows up twice
                // in the fan-out list; later occurrences may already be gone.
                if !self.nodes[g].inputs.contains(&n) {
                    continue;
                }
                self.propagate_into(g, n, v, &mut stack)?;
            }
        }
        Ok(())
    }

    /// Apply one constant fan-in to gate `g`. Pushes onto `stack` when `g`
    /// itself collapses to a constant.
    fn propagate_into(
        &mut self,
        g: NodeId,
        n: NodeId,
        v: bool,
        stack: &mut Vec<(NodeId, bool)>,
    ) -> Result<()> {
        let func = self.nodes[g].gate_fn().ok_or_else(|| {
            CktError::InvalidState(format!("input node {g} in a fan-out list"))
        })?;
        match (func, v) {
            // Short-circuits: the gate output is determined.
            (GateFn::And, false) | (GateFn::Nand, false) => {
                self.collapse_to_const(g, func == GateFn::Nand, stack);
            }
            (GateFn::Or, true) | (GateFn::Nor, true) => {
                self.collapse_to_const(g, func == GateFn::Or, stack);
            }
            (GateFn::Not, _) => {
                self.nodes[g].remove_input_once(n);
                self.collapse_to_const(g, !v, stack);
            }
            (GateFn::Buf, _) => {
                self.nodes[g].remove_input_once(n);
                self.collapse_to_const(g, v, stack);
            }
            // Neutral element: drop the fan-in, maybe degrade the function.
            (GateFn::And, true)
            | (GateFn::Nand, true)
            | (GateFn::Or, false)
            | (GateFn::Nor, false) => {
                self.nodes[g].remove_input_once(n);
                match self.nodes[g].inputs.len() {
                    0 => {
                        // Only reachable for a 1-input or gate.
                        let cv = match func {
                            GateFn::Or => false,
                            GateFn::Nor => true,
                            GateFn::And => true,
                            _ => false, // nand
                        };
                        self.collapse_to_const(g, cv, stack);
                    }
                    1 => {
                        self.nodes[g].kind = match func {
                            GateFn::And | GateFn::Or => NodeKind::Gate(GateFn::Buf),
                            _ => NodeKind::Gate(GateFn::Not),
                        };
                    }
                    _ => (),
                }
            }
            (GateFn::Xor, _) => {
                self.nodes[g].remove_input_once(n);
                self.nodes[g].kind =
                    NodeKind::Gate(if v { GateFn::Not } else { GateFn::Buf });
            }
            (GateFn::Xnor, _) => {
                self.nodes[g].remove_input_once(n);
                self.nodes[g].kind =
                    NodeKind::Gate(if v { GateFn::Buf } else { GateFn::Not });
            }
            (GateFn::Mux, _) => self.propagate_into_mux(g, n, v)?,
        }
        Ok(())
    }

    /// Constant fan-in of a mux. Select constants pick a branch; data
    /// constants rewrite the mux into and/or gates (inserting a `not` of the
    /// select where one is needed).
    fn propagate_into_mux(&mut self, g: NodeId, n: NodeId, v: bool) -> Result<()> {
        let inputs = self.nodes[g].inputs.clone();
        if inputs.len() != 3 {
            return Err(CktError::InvalidState(format!(
                "mux {} with {} inputs during propagation",
                self.nodes[g].name,
                inputs.len()
            )));
        }
        let (s, a, b) = (inputs[0], inputs[1], inputs[2]);
        if s == n {
            // Select fixed: keep the chosen branch, drop the other.
            let (keep, drop) = if v { (b, a) } else { (a, b) };
            self.nodes[drop].remove_fanout_once(g);
            self.nodes[g].inputs = vec![keep];
            self.nodes[g].kind = NodeKind::Gate(GateFn::Buf);
            return Ok(());
        }
        if a == n {
            if v {
                // y = s ? b : 1  ==  not(s) or b
                let ns = self.add_not_of(s, g);
                self.nodes[s].remove_fanout_once(g);
                self.nodes[g].inputs = vec![ns, b];
                self.nodes[ns].fanouts.push(g);
                self.nodes[g].kind = NodeKind::Gate(GateFn::Or);
            } else {
                // y = s ? b : 0  ==  s and b
                self.nodes[g].inputs = vec![s, b];
                self.nodes[g].kind = NodeKind::Gate(GateFn::And);
            }
        } else {
            if v {
                // y = s ? 1 : a  ==  s or a
                self.nodes[g].inputs = vec![s, a];
                self.nodes[g].kind = NodeKind::Gate(GateFn::Or);
            } else {
                // y = s ? 0 : a  ==  not(s) and a
                let ns = self.add_not_of(s, g);
                self.nodes[s].remove_fanout_once(g);
                self.nodes[g].inputs = vec![ns, a];
                self.nodes[ns].fanouts.push(g);
                self.nodes[g].kind = NodeKind::Gate(GateFn::And);
            }
        }
        Ok(())
    }

    /// Insert a fresh `not` gate over `src`, named after the gate that needed
    /// it.
    fn add_not_of(&mut self, src: NodeId, for_gate: NodeId) -> NodeId {
        let name = format!("{}_n{}", self.nodes[for_gate].name, self.nodes.len());
        let id = self.add_gate_unwired(name, GateFn::Not);
        self.nodes[id].inputs = vec![src];
        self.nodes[src].fanouts.push(id);
        id
    }

    /// Detach `g` from its remaining fan-in and schedule its constant value.
    fn collapse_to_const(&mut self, g: NodeId, cv: bool, stack: &mut Vec<(NodeId, bool)>) {
        let inputs = std::mem::take(&mut self.nodes[g].inputs);
        for i in inputs {
            self.nodes[i].remove_fanout_once(g);
        }
        stack.push((g, cv));
    }

    /// Prune dead keys and gates, flatten buffers, compact the arena,
    /// re-sort, and re-check structural sanity.
    pub fn cleanup(&mut self) -> Result<()> {
        loop {
            let mut changed = self.remove_dead_keys();
            changed |= self.remove_dead_gates();
            changed |= self.rewrite_buffers();
            if !changed {
                break;
            }
        }
        self.compact()?;
        self.init_fanouts();
        self.topo_sort()?;
        self.check_sanity()
    }

    /// Drop key inputs nothing depends on. Returns true if anything changed.
    fn remove_dead_keys(&mut self) -> bool {
        let nodes = &self.nodes;
        let before = self.key_inputs.len();
        self.key_inputs
            .retain(|&k| !(nodes[k].fanouts.is_empty() && !nodes[k].is_output));
        let keys: std::collections::HashSet<NodeId> =
            self.key_inputs.iter().copied().collect();
        self.inputs
            .retain(|&i| !nodes[i].is_keyinput() || keys.contains(&i));
        before != self.key_inputs.len()
    }

    /// Drop gates nothing depends on, detaching them from their fan-in.
    fn remove_dead_gates(&mut self) -> bool {
        let mut changed = false;
        let mut i = 0;
        while i < self.gates.len() {
            let g = self.gates[i];
            if self.nodes[g].fanouts.is_empty() && !self.nodes[g].is_output {
                let inputs = std::mem::take(&mut self.nodes[g].inputs);
                for src in inputs {
                    self.nodes[src].remove_fanout_once(g);
                }
                self.gates.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
        changed
    }

    /// Bypass non-output buffers, leaving them dead.
    fn rewrite_buffers(&mut self) -> bool {
        let mut changed = false;
        for i in 0..self.gates.len() {
            let g = self.gates[i];
            if self.nodes[g].gate_fn() == Some(GateFn::Buf)
                && !self.nodes[g].is_output
                && !self.nodes[g].fanouts.is_empty()
            {
                let src = self.nodes[g].inputs[0];
                self.rewrite_fanouts_with(g, src);
                changed = true;
            }
        }
        changed
    }

    /// Rebuild the arena keeping only nodes still referenced by the input and
    /// gate views, remapping every id.
    fn compact(&mut self) -> Result<()> {
        let mut keep = vec![false; self.nodes.len()];
        for &i in self.inputs.iter().chain(self.gates.iter()) {
            keep[i] = true;
        }

        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut new_nodes = Vec::with_capacity(self.nodes.len());
        for (old, node) in self.nodes.drain(..).enumerate() {
            if keep[old] {
                remap[old] = Some(new_nodes.len());
                new_nodes.push(node);
            }
        }
        self.nodes = new_nodes;

        for (new_id, node) in self.nodes.iter_mut().enumerate() {
            node.index = new_id;
            for inp in &mut node.inputs {
                *inp = remap[*inp].ok_or_else(|| {
                    CktError::InvalidState(format!(
                        "live node {:?} depends on a pruned node",
                        node.name
                    ))
                })?;
            }
            // Fan-outs are rebuilt afterwards by init_fanouts.
            node.fanouts.clear();
        }

        let apply = |ids: &mut Vec<NodeId>| {
            ids.retain(|&i| remap[i].is_some());
            for i in ids.iter_mut() {
                *i = remap[*i].unwrap_or(0);
            }
        };
        apply(&mut self.inputs);
        apply(&mut self.ckt_inputs);
        apply(&mut self.key_inputs);
        apply(&mut self.outputs);
        apply(&mut self.gates);
        self.nodes_sorted.clear();
        self.gates_sorted.clear();
        Ok(())
    }

    /// Fold the given key bits to constants and simplify.
    ///
    /// Each pair is (key-input id, known value). Note that pruning dead nodes
    /// compacts the arena: ids held by the caller are invalidated.
    pub fn rewrite_keys(&mut self, known: &[(NodeId, bool)]) -> Result<()> {
        for &(id, _) in known {
            let node = self.nodes.get(id).ok_or(CktError::NodeDoesNotExist(id))?;
            if !node.is_keyinput() {
                return Err(CktError::KeyFormat(format!(
                    "node {:?} is not a key input",
                    node.name
                )));
            }
        }
        for &(id, v) in known {
            self.const_propagate(id, v)?;
        }
        self.cleanup()
    }

    /// Fold externally known key bits given as a string of `0`, `1` and `x`
    /// (one character per key input, in declaration order; `x` leaves the bit
    /// unknown).
    pub fn apply_known_keys(&mut self, keys: &str) -> Result<()> {
        if keys.chars().count() != self.key_inputs.len() {
            return Err(CktError::KeyFormat(format!(
                "expected {} characters, got {}",
                self.key_inputs.len(),
                keys.chars().count()
            )));
        }
        let mut known = Vec::new();
        for (i, c) in keys.chars().enumerate() {
            match c {
                '0' => known.push((self.key_inputs[i], false)),
                '1' => known.push((self.key_inputs[i], true)),
                'x' | 'X' => (),
                other => {
                    return Err(CktError::KeyFormat(format!(
                        "invalid character {other:?}"
                    )));
                }
            }
        }
        self.rewrite_keys(&known)
    }

    /// Check that `self` (a locked circuit) and `other` (its oracle) agree on
    /// primary-input and output names and counts. Key inputs of `self` are
    /// ignored; `other` must not have any.
    pub fn compare_io(&self, other: &Circuit) -> Result<()> {
        if !other.key_inputs.is_empty() {
            return Err(CktError::CompareIo(format!(
                "oracle circuit has {} key input(s)",
                other.key_inputs.len()
            )));
        }
        if self.ckt_inputs.len() != other.ckt_inputs.len() {
            return Err(CktError::CompareIo(format!(
                "{} primary inputs vs {}",
                self.ckt_inputs.len(),
                other.ckt_inputs.len()
            )));
        }
        for (&a, &b) in self.ckt_inputs.iter().zip(&other.ckt_inputs) {
            if self.nodes[a].name != other.nodes[b].name {
                return Err(CktError::CompareIo(format!(
                    "input {:?} vs {:?}",
                    self.nodes[a].name, other.nodes[b].name
                )));
            }
        }
        if self.outputs.len() != other.outputs.len() {
            return Err(CktError::CompareIo(format!(
                "{} outputs vs {}",
                self.outputs.len(),
                other.outputs.len()
            )));
        }
        for (&a, &b) in self.outputs.iter().zip(&other.outputs) {
            if self.nodes[a].name != other.nodes[b].name {
                return Err(CktError::CompareIo(format!(
                    "output {:?} vs {:?}",
                    self.nodes[a].name, other.nodes[b].name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn locked_and_xor() -> Circuit {
        // y = xor(and(a, b), keyinput0) -- correct key bit is 0.
        let mut c = Circuit::new();
        let a = c.add_primary_input("a");
        let b = c.add_primary_input("b");
        let k = c.add_key_input("keyinput0");
        let g = c.add_gate("g", GateFn::And, vec![a, b]).unwrap();
        let y = c.add_gate("y", GateFn::Xor, vec![g, k]).unwrap();
        c.set_output(y).unwrap();
        c.topo_sort().unwrap();
        c
    }

    #[test]
    fn build_and_views() {
        let c = locked_and_xor();
        assert_eq!(c.num_nodes(), 5);
        assert_eq!(c.num_ckt_inputs(), 2);
        assert_eq!(c.num_key_inputs(), 1);
        assert_eq!(c.num_gates(), 2);
        assert_eq!(c.num_outputs(), 1);
        c.check_sanity().unwrap();
    }

    #[test]
    fn arity_is_validated() {
        let mut c = Circuit::new();
        let a = c.add_primary_input("a");
        assert!(matches!(
            c.add_gate("g", GateFn::And, vec![a]),
            Err(CktError::BadArity { .. })
        ));
        // The failed gate must not linger in the arena.
        assert_eq!(c.num_nodes(), 1);
        assert_eq!(c.num_gates(), 0);
    }

    #[test]
    fn topo_sort_levels() {
        let c = locked_and_xor();
        // Output gate must come after the and gate it depends on.
        let pos = |name: &str| {
            c.gates_sorted
                .iter()
                .position(|&g| c.node(g).unwrap().name == name)
                .unwrap()
        };
        assert!(pos("g") < pos("y"));
    }

    #[test]
    fn cycle_is_detected() {
        let mut c = Circuit::new();
        let a = c.add_primary_input("a");
        let g1 = c.add_gate_unwired("g1", GateFn::And);
        let g2 = c.add_gate_unwired("g2", GateFn::And);
        c.wire_gate(g1, vec![a, g2]).unwrap();
        c.wire_gate(g2, vec![a, g1]).unwrap();
        assert!(matches!(c.topo_sort(), Err(CktError::Cycle(_))));
    }

    #[test]
    fn apply_known_keys_folds_the_key() {
        let mut c = locked_and_xor();
        c.apply_known_keys("0").unwrap();
        // xor with constant 0 degrades to a buffer over the and gate, and the
        // buffer is the output so it survives cleanup.
        assert_eq!(c.num_key_inputs(), 0);
        assert_eq!(c.outputs.len(), 1);
        let y = c.node(c.outputs[0]).unwrap();
        assert_eq!(y.gate_fn(), Some(GateFn::Buf));
        c.check_sanity().unwrap();
    }

    #[test]
    fn apply_known_keys_rejects_bad_strings() {
        let mut c = locked_and_xor();
        assert!(matches!(
            c.apply_known_keys("01"),
            Err(CktError::KeyFormat(_))
        ));
        assert!(matches!(
            c.apply_known_keys("2"),
            Err(CktError::KeyFormat(_))
        ));
    }

    #[test]
    fn const_propagate_short_circuits() {
        // y = and(a, or(b, c)); b := 1 makes the or vanish entirely.
        let mut c = Circuit::new();
        let a = c.add_primary_input("a");
        let b = c.add_primary_input("b");
        let cc = c.add_primary_input("c");
        let o = c.add_gate("o", GateFn::Or, vec![b, cc]).unwrap();
        let y = c.add_gate("y", GateFn::And, vec![a, o]).unwrap();
        c.set_output(y).unwrap();

        c.const_propagate(b, true).unwrap();
        // or collapsed to constant true, which then dropped out of the and.
        let y = c.node(y).unwrap();
        assert_eq!(y.gate_fn(), Some(GateFn::Buf));
        assert_eq!(y.inputs, vec![a]);
    }

    #[test]
    fn const_propagate_mux_select() {
        let mut c = Circuit::new();
        let s = c.add_key_input("keyinput0");
        let a = c.add_primary_input("a");
        let b = c.add_primary_input("b");
        let m = c.add_gate("m", GateFn::Mux, vec![s, a, b]).unwrap();
        c.set_output(m).unwrap();

        c.const_propagate(s, true).unwrap();
        let m = c.node(m).unwrap();
        assert_eq!(m.gate_fn(), Some(GateFn::Buf));
        assert_eq!(m.inputs, vec![b]);
    }

    #[test]
    fn const_propagate_mux_data() {
        // m = mux(s, a, b) with a := 1 becomes or(not(s), b).
        let mut c = Circuit::new();
        let s = c.add_primary_input("s");
        let a = c.add_key_input("keyinput0");
        let b = c.add_primary_input("b");
        let m = c.add_gate("m", GateFn::Mux, vec![s, a, b]).unwrap();
        c.set_output(m).unwrap();

        c.const_propagate(a, true).unwrap();
        let m_node = c.node(m).unwrap();
        assert_eq!(m_node.gate_fn(), Some(GateFn::Or));
        let ns = m_node.inputs[0];
        assert_eq!(c.node(ns).unwrap().gate_fn(), Some(GateFn::Not));
        assert_eq!(c.node(ns).unwrap().inputs, vec![s]);
    }

    #[test]
    fn constant_output_is_an_error() {
        let mut c = Circuit::new();
        let k = c.add_key_input("keyinput0");
        let g = c.add_gate("g", GateFn::Not, vec![k]).unwrap();
        c.set_output(g).unwrap();
        assert!(matches!(
            c.const_propagate(k, false),
            Err(CktError::ConstantOutput(_))
        ));
    }

    #[test]
    fn compare_io_matches_names() {
        let locked = locked_and_xor();
        let mut oracle = Circuit::new();
        let a = oracle.add_primary_input("a");
        let b = oracle.add_primary_input("b");
        let y = oracle.add_gate("y", GateFn::And, vec![a, b]).unwrap();
        oracle.set_output(y).unwrap();
        locked.compare_io(&oracle).unwrap();

        let mut bad = Circuit::new();
        let a = bad.add_primary_input("a");
        let z = bad.add_gate("z", GateFn::Not, vec![a]).unwrap();
        bad.set_output(z).unwrap();
        assert!(matches!(
            locked.compare_io(&bad),
            Err(CktError::CompareIo(_))
        ));
    }
}
