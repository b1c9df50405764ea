//! Slicing constructors: rebuild a disjoint sub-circuit from a transitive
//! fan-in cone, keeping the original input/output declaration order.

use super::{Circuit, CktError, NodeId, NodeKind, Result};

/// A sliced circuit together with the node maps relating it to its parent.
#[derive(Debug, Clone)]
pub struct Slice {
    pub ckt: Circuit,
    /// Parent id -> slice id, `None` for nodes outside the cone.
    pub fwd: Vec<Option<NodeId>>,
    /// Slice id -> parent id.
    pub rev: Vec<NodeId>,
}

impl Circuit {
    /// Mark the transitive fan-in of `starts` in `flags` (reused across
    /// calls: only `true` entries are ever written). `barrier` nodes are
    /// treated as leaves.
    pub(crate) fn mark_fanin_cone(
        &self,
        starts: &[NodeId],
        barrier: Option<NodeId>,
        flags: &mut [bool],
    ) {
        let mut stack: Vec<NodeId> = Vec::new();
        for &s in starts {
            if !flags[s] {
                flags[s] = true;
                stack.push(s);
            }
        }
        while let Some(n) = stack.pop() {
            if barrier == Some(n) {
                continue;
            }
            for &i in &self.nodes()[n].inputs {
                if !flags[i] {
                    flags[i] = true;
                    stack.push(i);
                }
            }
        }
    }

    /// Slice out the cone driving the requested outputs.
    ///
    /// The slice keeps the parent's input and output declaration order,
    /// restricted to what the cone touches.
    pub fn slice_outputs(&self, outputs: &[NodeId]) -> Result<Slice> {
        for &o in outputs {
            if o >= self.num_nodes() {
                return Err(CktError::NodeDoesNotExist(o));
            }
        }
        let mut flags = vec![false; self.num_nodes()];
        self.mark_fanin_cone(outputs, None, &mut flags);
        let mut slice = self.rebuild_from_flags(&flags, None)?;

        let requested: std::collections::HashSet<NodeId> = outputs.iter().copied().collect();
        for &o in &self.outputs {
            if requested.contains(&o) {
                let new = slice.fwd[o].ok_or_else(|| {
                    CktError::InvalidState(format!("output {o} missing from its own cone"))
                })?;
                slice.ckt.set_output(new)?;
            }
        }
        // Outputs requested beyond the declared ones (internal cut points).
        for &o in outputs {
            if !self.nodes()[o].is_output {
                let new = slice.fwd[o].ok_or_else(|| {
                    CktError::InvalidState(format!("output {o} missing from its own cone"))
                })?;
                slice.ckt.set_output(new)?;
            }
        }

        slice.ckt.topo_sort()?;
        slice.ckt.check_sanity()?;
        Ok(slice)
    }

    /// Slice out the fan-in cone of `root`, treating `cut` as a fresh primary
    /// input: everything behind `cut` is left out of the slice.
    pub fn slice_cone(&self, root: NodeId, cut: NodeId) -> Result<Slice> {
        if root >= self.num_nodes() {
            return Err(CktError::NodeDoesNotExist(root));
        }
        if cut >= self.num_nodes() {
            return Err(CktError::NodeDoesNotExist(cut));
        }
        let mut flags = vec![false; self.num_nodes()];
        self.mark_fanin_cone(&[root], Some(cut), &mut flags);
        let mut slice = self.rebuild_from_flags(&flags, Some(cut))?;

        let new_root = slice.fwd[root].ok_or_else(|| {
            CktError::InvalidState(format!("root {root} missing from its own cone"))
        })?;
        slice.ckt.set_output(new_root)?;
        slice.ckt.topo_sort()?;
        slice.ckt.check_sanity()?;
        Ok(slice)
    }

    /// Copy the flagged nodes into a fresh circuit. If `cut` is set, that
    /// node is recreated as a primary input regardless of its kind.
    fn rebuild_from_flags(&self, flags: &[bool], cut: Option<NodeId>) -> Result<Slice> {
        let mut ckt = Circuit::new();
        let mut fwd: Vec<Option<NodeId>> = vec![None; self.num_nodes()];
        let mut rev: Vec<NodeId> = Vec::new();

        // Inputs first, in declaration order.
        for &i in &self.inputs {
            if flags[i] && cut != Some(i) {
                let name = self.nodes()[i].name.clone();
                let new = match self.nodes()[i].kind {
                    NodeKind::KeyInput => ckt.add_key_input(name),
                    _ => ckt.add_primary_input(name),
                };
                fwd[i] = Some(new);
                rev.push(i);
            }
        }
        if let Some(c) = cut {
            if flags[c] {
                let new = ckt.add_primary_input(self.nodes()[c].name.clone());
                fwd[c] = Some(new);
                rev.push(c);
            }
        }

        // Then gates, in arena order.
        for (id, node) in self.nodes().iter().enumerate() {
            if flags[id] && fwd[id].is_none() {
                let func = node.gate_fn().ok_or_else(|| {
                    CktError::InvalidState(format!("unplaced input {:?} in cone", node.name))
                })?;
                let new = ckt.add_gate_unwired(node.name.clone(), func);
                fwd[id] = Some(new);
                rev.push(id);
            }
        }
        for (id, node) in self.nodes().iter().enumerate() {
            if flags[id] && cut != Some(id) && node.is_gate() {
                let inputs = node
                    .inputs
                    .iter()
                    .map(|&i| {
                        fwd[i].ok_or_else(|| {
                            CktError::InvalidState(format!(
                                "fan-in {i} of {:?} missing from cone",
                                node.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<NodeId>>>()?;
                let new = fwd[id].ok_or_else(|| {
                    CktError::InvalidState(format!("cone node {:?} unmapped", node.name))
                })?;
                ckt.wire_gate(new, inputs)?;
            }
        }

        Ok(Slice { ckt, fwd, rev })
    }
}
