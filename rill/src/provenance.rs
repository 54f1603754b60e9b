// provenance.rs — Leaf provenance lattice
//
// `NodeSource` names where a leaf value was first produced: an origin node
// and a structural path into that origin's own output. A leaf whose source
// cannot be pinned to a single predecessor describes itself. Two leaves with
// equal sources provably carry the same runtime value; the converse is not
// attempted (no constant folding, no algebraic reasoning).
//
// Example sources after analysis:
//
//   x: bits[32] = param(...)               -> x
//   z: (bits[32], bits[32]) = param(...)   -> (z{0}, z{1})
//   a: bits[32] = identity(x)              -> x
//   b: bits[32] = tuple_index(z, 1)        -> z{1}
//   c: bits[32] = sel(..., {x, y})         -> c
//   d: bits[32] = sel(..., {x, x})         -> x

use crate::dataflow::DataflowSemantics;
use crate::ir::{Function, NodeId};
use crate::ty::Type;

/// The earliest node/path pair known to produce a leaf's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeSource {
    origin: NodeId,
    path: Vec<usize>,
}

impl NodeSource {
    pub fn new(origin: NodeId, path: Vec<usize>) -> NodeSource {
        NodeSource { origin, path }
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Human-readable rendering for logs: the origin's name, with the path
    /// in braces when non-empty, e.g. `z{1,0}`. Never machine-parsed.
    pub fn render(&self, func: &Function) -> String {
        let name = &func.node(self.origin).name;
        if self.path.is_empty() {
            name.clone()
        } else {
            let indices: Vec<String> = self.path.iter().map(usize::to_string).collect();
            format!("{}{{{}}}", name, indices.join(","))
        }
    }
}

/// Engine instantiation computing `NodeSource` per leaf.
pub struct ProvenanceAnalysis;

impl DataflowSemantics for ProvenanceAnalysis {
    type Value = NodeSource;

    fn fresh_leaf(
        &self,
        _func: &Function,
        node: NodeId,
        path: &[usize],
        _leaf_ty: &Type,
    ) -> NodeSource {
        NodeSource::new(node, path.to_vec())
    }

    fn join(
        &self,
        _leaf_ty: &Type,
        candidates: &[&NodeSource],
        _func: &Function,
        node: NodeId,
        path: &[usize],
    ) -> NodeSource {
        // Agreement propagates; any disagreement collapses this leaf back
        // to "freshly produced here".
        if candidates.iter().all(|c| *c == candidates[0]) {
            candidates[0].clone()
        } else {
            NodeSource::new(node, path.to_vec())
        }
    }
}
