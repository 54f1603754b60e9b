// dataflow.rs — Generic forward dataflow over structured values
//
// Walks a function's nodes once, in dependency order, and computes one
// `LeafTree` of analysis values per node. The propagation rules for tuples,
// arrays, and selects are fixed here; what a "fresh" leaf means and how
// competing values merge is supplied by a `DataflowSemantics` implementation.
// The graph is acyclic, so a single sweep suffices — there is no fixed-point
// iteration.
//
// Preconditions: `func` is well-formed (builder-validated); operands of every
//                node precede it in `topo_order`.
// Postconditions: the returned memo holds a tree for every live node.
// Failure modes: shape/arity disagreement between a node's declared type and
//                its operands' trees — `OptError::InvariantViolation`, fatal,
//                graph untouched.
// Side effects: none.

use std::collections::HashMap;

use tracing::trace;

use crate::error::OptError;
use crate::ir::{Function, NodeId, NodeKind};
use crate::leaf_tree::LeafTree;
use crate::ty::Type;

// ── Extension points ────────────────────────────────────────────────────────

/// The two hooks a leaf-level analysis plugs into the engine.
pub trait DataflowSemantics {
    type Value: Clone;

    /// Value of a leaf produced fresh by `node` itself (parameters,
    /// literals, and every opaque node kind). `path` addresses the leaf
    /// within the node's own output shape.
    fn fresh_leaf(
        &self,
        func: &Function,
        node: NodeId,
        path: &[usize],
        leaf_ty: &Type,
    ) -> Self::Value;

    /// Reconcile candidate values arriving at one leaf position of `node`
    /// from multiple possible sources. `candidates` is never empty.
    fn join(
        &self,
        leaf_ty: &Type,
        candidates: &[&Self::Value],
        func: &Function,
        node: NodeId,
        path: &[usize],
    ) -> Self::Value;
}

// ── Result memo ─────────────────────────────────────────────────────────────

/// Per-node analysis trees for one engine run. Append-only while the sweep
/// runs, read-only afterwards, discarded with the invocation.
#[derive(Debug)]
pub struct DataflowResult<V> {
    trees: HashMap<NodeId, LeafTree<V>>,
}

impl<V> DataflowResult<V> {
    /// The tree computed for `node`. Panics for ids the sweep never saw
    /// (including nodes inserted after the run).
    pub fn value(&self, node: NodeId) -> &LeafTree<V> {
        self.trees
            .get(&node)
            .unwrap_or_else(|| panic!("no analysis value for {node:?}"))
    }

    pub fn try_value(&self, node: NodeId) -> Option<&LeafTree<V>> {
        self.trees.get(&node)
    }
}

// ── Engine ──────────────────────────────────────────────────────────────────

/// Run a leaf-level analysis over every node of `func`.
pub fn analyze<S: DataflowSemantics>(
    func: &Function,
    sem: &S,
) -> Result<DataflowResult<S::Value>, OptError> {
    let mut memo: HashMap<NodeId, LeafTree<S::Value>> = HashMap::new();
    for id in func.topo_order() {
        let tree = compute_node(func, sem, &memo, id)?;
        trace!(node = %func.node(id).name, leaves = tree.leaf_count(), "dataflow");
        memo.insert(id, tree);
    }
    Ok(DataflowResult { trees: memo })
}

fn compute_node<S: DataflowSemantics>(
    func: &Function,
    sem: &S,
    memo: &HashMap<NodeId, LeafTree<S::Value>>,
    id: NodeId,
) -> Result<LeafTree<S::Value>, OptError> {
    let node = func.node(id);
    let operand = |i: usize| &memo[&node.operands[i]];

    match &node.kind {
        NodeKind::Identity => {
            let tree = operand(0);
            if *tree.ty() != node.ty {
                return Err(shape_err(func, id, tree.ty()));
            }
            Ok(tree.clone())
        }

        NodeKind::Tuple => {
            let fields = node.ty.tuple_fields().ok_or_else(|| {
                OptError::invariant(id, format!("tuple node declared as {}", node.ty))
            })?;
            if fields.len() != node.operands.len() {
                return Err(OptError::invariant(
                    id,
                    format!(
                        "tuple has {} operands but type {} has {} fields",
                        node.operands.len(),
                        node.ty,
                        fields.len()
                    ),
                ));
            }
            let parts: Vec<LeafTree<S::Value>> =
                (0..node.operands.len()).map(|i| operand(i).clone()).collect();
            for (i, part) in parts.iter().enumerate() {
                if *part.ty() != fields[i] {
                    return Err(shape_err(func, id, part.ty()));
                }
            }
            Ok(LeafTree::from_subtrees(node.ty.clone(), &parts))
        }

        NodeKind::TupleIndex(i) => {
            let tree = operand(0);
            if tree.ty().tuple_fields().map_or(true, |fields| *i >= fields.len()) {
                return Err(OptError::invariant(
                    id,
                    format!("tuple_index {i} into operand of type {}", tree.ty()),
                ));
            }
            let sub = tree.subtree(&[*i]);
            if *sub.ty() != node.ty {
                return Err(shape_err(func, id, sub.ty()));
            }
            Ok(sub)
        }

        NodeKind::Array => {
            let (elem_ty, size) = node.ty.array_parts().ok_or_else(|| {
                OptError::invariant(id, format!("array node declared as {}", node.ty))
            })?;
            if size != node.operands.len() {
                return Err(OptError::invariant(
                    id,
                    format!(
                        "array has {} operands but type {} has {size} elements",
                        node.operands.len(),
                        node.ty
                    ),
                ));
            }
            let parts: Vec<LeafTree<S::Value>> =
                (0..node.operands.len()).map(|i| operand(i).clone()).collect();
            for part in &parts {
                if part.ty() != elem_ty {
                    return Err(shape_err(func, id, part.ty()));
                }
            }
            Ok(LeafTree::from_subtrees(node.ty.clone(), &parts))
        }

        NodeKind::ArrayIndex => {
            let base = operand(0);
            let Some((elem_ty, size)) = base.ty().array_parts() else {
                return Err(OptError::invariant(
                    id,
                    format!("array_index base of type {}", base.ty()),
                ));
            };
            if *elem_ty != node.ty {
                return Err(shape_err(func, id, elem_ty));
            }
            match known_index(func, node.operands[1], size) {
                StaticIndex::Known(i) => Ok(base.subtree(&[i])),
                // An unknown index could select any element, and an
                // out-of-range literal clamps to one at runtime; merge them
                // all. An empty array has nothing to merge, so the result
                // is fresh.
                _ if size > 0 => {
                    let subs: Vec<LeafTree<S::Value>> =
                        (0..size).map(|i| base.subtree(&[i])).collect();
                    let refs: Vec<&LeafTree<S::Value>> = subs.iter().collect();
                    Ok(join_trees(sem, func, id, &[], &refs))
                }
                _ => Ok(default_tree(func, sem, id)),
            }
        }

        NodeKind::ArrayUpdate => {
            let base = operand(0);
            let value = operand(1);
            if *base.ty() != node.ty {
                return Err(shape_err(func, id, base.ty()));
            }
            let Some((elem_ty, size)) = node.ty.array_parts() else {
                return Err(OptError::invariant(
                    id,
                    format!("array_update declared as {}", node.ty),
                ));
            };
            if value.ty() != elem_ty {
                return Err(shape_err(func, id, value.ty()));
            }
            match known_index(func, node.operands[2], size) {
                StaticIndex::Known(i) => {
                    let mut tree = base.clone();
                    tree.replace_subtree(&[i], value);
                    Ok(tree)
                }
                // A literal beyond the array is a runtime no-op.
                StaticIndex::KnownOutOfRange => Ok(base.clone()),
                // An unknown index may hit any slot, or none in particular:
                // every element keeps its own value joined with the update.
                StaticIndex::Unknown => {
                    let mut parts = Vec::with_capacity(size);
                    for i in 0..size {
                        let slot = base.subtree(&[i]);
                        parts.push(join_trees(sem, func, id, &[i], &[&slot, value]));
                    }
                    Ok(LeafTree::from_subtrees(node.ty.clone(), &parts))
                }
            }
        }

        NodeKind::Select | NodeKind::PrioritySelect => {
            // Operand 0 is the selector; everything after it (cases, and the
            // default for priority_sel) contributes data. The selector's
            // value is never consulted.
            let cases: Vec<&LeafTree<S::Value>> =
                (1..node.operands.len()).map(|i| operand(i)).collect();
            for case in &cases {
                if *case.ty() != node.ty {
                    return Err(shape_err(func, id, case.ty()));
                }
            }
            Ok(join_trees(sem, func, id, &[], &cases))
        }

        // Parameters, literals, and every opaque kind produce fresh leaves.
        NodeKind::Param | NodeKind::Literal(_) | NodeKind::Add | NodeKind::Not => {
            Ok(default_tree(func, sem, id))
        }
    }
}

fn default_tree<S: DataflowSemantics>(
    func: &Function,
    sem: &S,
    id: NodeId,
) -> LeafTree<S::Value> {
    LeafTree::build(func.node(id).ty.clone(), |path, leaf_ty| {
        sem.fresh_leaf(func, id, path, leaf_ty)
    })
}

/// Join same-shaped trees leaf by leaf. `base_path` locates the result's
/// root within `node`'s output shape, so the semantics sees absolute paths.
fn join_trees<S: DataflowSemantics>(
    sem: &S,
    func: &Function,
    node: NodeId,
    base_path: &[usize],
    trees: &[&LeafTree<S::Value>],
) -> LeafTree<S::Value> {
    debug_assert!(!trees.is_empty());
    for t in &trees[1..] {
        assert_eq!(t.ty(), trees[0].ty(), "join over differently shaped trees");
    }
    LeafTree::build(trees[0].ty().clone(), |path, leaf_ty| {
        let candidates: Vec<&S::Value> = trees.iter().map(|t| t.get(path)).collect();
        let mut full_path = base_path.to_vec();
        full_path.extend_from_slice(path);
        sem.join(leaf_ty, &candidates, func, node, &full_path)
    })
}

fn shape_err(func: &Function, id: NodeId, got: &Type) -> OptError {
    OptError::invariant(
        id,
        format!(
            "operand tree of type {got} disagrees with `{}`: {}",
            func.node(id).name,
            func.node(id).ty
        ),
    )
}

/// Classification of an array operation's index operand.
enum StaticIndex {
    Known(usize),
    KnownOutOfRange,
    Unknown,
}

fn known_index(func: &Function, index: NodeId, size: usize) -> StaticIndex {
    match func.static_index(index).map(usize::try_from) {
        Some(Ok(i)) if i < size => StaticIndex::Known(i),
        Some(_) => StaticIndex::KnownOutOfRange,
        None => StaticIndex::Unknown,
    }
}
