// simplify.rs — Provenance-based dataflow simplification
//
// Finds nodes whose entire output is a fixed subtree of an earlier node and
// rewires their uses to that subtree, e.g.
//
//    tuple_index(tuple(x, y), index=1)                       =>  y
//    sel(selector, {z, z})                                   =>  z
//    array_index(array_update(A, x, index=42), index=42)     =>  x
//
// Two phases per function. Phase 1 runs the provenance analysis and is
// read-only; any failure there surfaces with the graph untouched. Phase 2
// walks a topological snapshot and performs the rewrites; every structural
// decision is made by the detection step, so realization cannot fail.

use tracing::{debug, trace};

use crate::dataflow::analyze;
use crate::error::OptError;
use crate::ir::{Function, NodeId, NodeKind};
use crate::leaf_tree::LeafTree;
use crate::pass::{Pass, PassOptions};
use crate::provenance::{NodeSource, ProvenanceAnalysis};

pub struct DataflowSimplification;

impl Pass for DataflowSimplification {
    fn name(&self) -> &'static str {
        "dataflow"
    }

    fn run(&self, func: &mut Function, options: &PassOptions) -> Result<bool, OptError> {
        if !options.dataflow_enabled() {
            return Ok(false);
        }
        run_on_function(func)
    }
}

fn run_on_function(func: &mut Function) -> Result<bool, OptError> {
    // Phase 1: analysis. No mutation happens until this has fully succeeded.
    let analysis = analyze(func, &ProvenanceAnalysis)?;

    // Phase 2: rewrite, over a snapshot of the pre-rewrite node set. Nodes
    // inserted below (index chains) are not revisited; origins referenced by
    // the memo always carry a self-describing leaf of their own, so they are
    // never detached and the memo stays safe to read.
    let mut changed = false;
    for id in func.topo_order() {
        let tree = analysis.value(id);
        trace!(
            node = %func.node(id).name,
            source = %render_tree(func, tree),
            "considering"
        );
        let Some((origin, prefix)) = fixed_subtree_of(func, id, tree) else {
            continue;
        };
        if is_trivial_chain(func, id, origin, &prefix) {
            // Already the cheapest expression of this provenance; rewriting
            // would re-materialize an identical chain forever.
            continue;
        }

        let replacement = func.index_chain(origin, &prefix);
        debug!(
            from = %func.node(id).name,
            to = %func.node(replacement).name,
            "replacing with equivalent"
        );
        func.replace_uses_with(id, replacement);
        if func.is_unused(id) {
            func.remove_node(id);
        }
        changed = true;
    }
    Ok(changed)
}

/// If `node`'s output is exactly the subtree of one other node `M` at some
/// `prefix`, return `(M, prefix)`: every leaf must come from `M` at
/// `prefix ++ p` (with `p` the leaf's own position) and the output type must
/// equal `M`'s subtree type at `prefix`. Zero-leaf outputs have no derivable
/// ancestor and are never rewritten.
fn fixed_subtree_of(
    func: &Function,
    node: NodeId,
    tree: &LeafTree<NodeSource>,
) -> Option<(NodeId, Vec<usize>)> {
    let mut leaves = tree.leaves();
    let (first_path, first) = leaves.next()?;
    let origin = first.origin();
    if origin == node {
        return None;
    }
    let prefix = first
        .path()
        .strip_suffix(first_path.as_slice())?
        .to_vec();
    for (p, source) in leaves {
        if source.origin() != origin {
            return None;
        }
        let (head, tail) = source.path().split_at(source.path().len().checked_sub(p.len())?);
        if head != prefix || tail != p {
            return None;
        }
    }
    // The leaf mapping alone admits strict slices of the subtree at `prefix`
    // (a tuple collecting two elements of a wider array maps every leaf into
    // the array, yet denotes a different value). The shapes must match too.
    let sub_ty = func.node(origin).ty.try_subtype(&prefix)?;
    if *sub_ty != func.node(node).ty {
        return None;
    }
    Some((origin, prefix))
}

/// True if `node` already is the tuple_index/array_index chain extracting
/// `prefix` from `origin` — the rewrite would reproduce it verbatim.
fn is_trivial_chain(func: &Function, node: NodeId, origin: NodeId, prefix: &[usize]) -> bool {
    let mut cur = node;
    for &step in prefix.iter().rev() {
        let n = func.node(cur);
        match n.kind {
            NodeKind::TupleIndex(i) if i == step => cur = n.operands[0],
            NodeKind::ArrayIndex
                if func.static_index(n.operands[1]) == Some(step as u64) =>
            {
                cur = n.operands[0];
            }
            _ => return false,
        }
    }
    cur == origin
}

fn render_tree(func: &Function, tree: &LeafTree<NodeSource>) -> String {
    let parts: Vec<String> = tree.leaves().map(|(_, s)| s.render(func)).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Type;
    use crate::value::Value;

    fn run(func: &mut Function) -> bool {
        DataflowSimplification
            .run(func, &PassOptions::default())
            .unwrap()
    }

    #[test]
    fn identity_chains_collapse_to_the_source() {
        let mut f = Function::new("t");
        let x = f.param("x", Type::bits(8));
        let a = f.identity(x);
        let b = f.identity(a);
        let c = f.not(b);
        f.set_return(c);

        assert!(run(&mut f));
        assert_eq!(f.node(c).operands, vec![x]);
        assert!(!f.is_live(a));
        assert!(!f.is_live(b));
    }

    #[test]
    fn disabled_pass_touches_nothing() {
        let mut f = Function::new("t");
        let x = f.param("x", Type::bits(8));
        let a = f.identity(x);
        f.set_return(a);

        let options = PassOptions {
            opt_level: 0,
            dataflow: None,
        };
        assert!(!DataflowSimplification.run(&mut f, &options).unwrap());
        assert!(f.is_live(a));
        assert_eq!(f.return_node(), Some(a));
    }

    #[test]
    fn fresh_producers_are_left_alone() {
        let mut f = Function::new("t");
        let x = f.param("x", Type::bits(8));
        let y = f.param("y", Type::bits(8));
        let sum = f.add(x, y);
        f.set_return(sum);

        assert!(!run(&mut f));
        assert_eq!(f.return_node(), Some(sum));
    }

    #[test]
    fn existing_index_chains_reach_a_fixed_point() {
        let mut f = Function::new("t");
        let a = f.param("a", Type::array(Type::bits(8), 4));
        let one = f.literal(Value::bits(8, 1));
        let r = f.array_index(a, one);
        f.set_return(r);

        // r's provenance is a{1}, but r already is that chain.
        assert!(!run(&mut f));
        assert_eq!(f.return_node(), Some(r));
    }

    #[test]
    fn nested_extraction_rewrites_to_a_chain() {
        let mut f = Function::new("t");
        let p = f.param(
            "p",
            Type::tuple(vec![Type::bits(8), Type::array(Type::bits(4), 3)]),
        );
        let c = f.param("c", Type::bits(1));
        // sel(c, {p, p}) agrees everywhere; indexing its field traces back
        // to p's own subtree.
        let s = f.select(c, vec![p, p]);
        let field = f.tuple_index(s, 1);
        let two = f.literal(Value::bits(8, 2));
        let leaf = f.array_index(field, two);
        f.set_return(leaf);

        assert!(run(&mut f));
        // The select and its extraction chain all collapse onto p.
        let ret = f.return_node().unwrap();
        let ret_node = f.node(ret);
        assert_eq!(ret_node.kind, NodeKind::ArrayIndex);
        let base = ret_node.operands[0];
        assert_eq!(f.node(base).kind, NodeKind::TupleIndex(1));
        assert_eq!(f.node(base).operands, vec![p]);

        // And a second run has nothing left to do.
        assert!(!run(&mut f));
    }

    #[test]
    fn slice_of_a_wider_subtree_is_not_rewritten() {
        let mut f = Function::new("t");
        let a = f.param("a", Type::array(Type::bits(8), 3));
        let zero = f.literal(Value::bits(8, 0));
        let e0 = f.array_index(a, zero);
        let one = f.literal(Value::bits(8, 1));
        let e1 = f.array_index(a, one);
        let t = f.tuple(vec![e0, e1]);
        f.set_return(t);

        // Every leaf of t maps into `a` with an empty prefix, but t covers
        // only two of a's three elements: no subtree of `a` denotes t's
        // value, and the graph must come through untouched.
        assert!(!run(&mut f));
        assert_eq!(f.return_node(), Some(t));
        assert_eq!(f.node(t).operands, vec![e0, e1]);
    }

    #[test]
    fn reconstructed_whole_array_collapses_onto_its_origin() {
        let mut f = Function::new("t");
        let a = f.param("a", Type::array(Type::bits(8), 2));
        let zero = f.literal(Value::bits(8, 0));
        let e0 = f.array_index(a, zero);
        let one = f.literal(Value::bits(8, 1));
        let e1 = f.array_index(a, one);
        let t = f.array(vec![e0, e1]);
        f.set_return(t);

        // Unlike a strict slice, re-packing all of `a` in order is `a`.
        assert!(run(&mut f));
        assert_eq!(f.return_node(), Some(a));
        assert!(!f.is_live(t));
    }

    #[test]
    fn rewrite_reuses_an_existing_extraction_node() {
        let mut f = Function::new("t");
        let z = f.param("z", Type::tuple(vec![Type::bits(8), Type::bits(8)]));
        let b = f.tuple_index(z, 1);
        let i = f.identity(b);
        let n = f.not(i);
        f.set_return(n);

        let before = f.nodes().count();
        assert!(run(&mut f));
        // identity(b) collapses onto the tuple_index already in the graph,
        // not onto a freshly inserted duplicate of it.
        assert_eq!(f.node(n).operands, vec![b]);
        assert!(!f.is_live(i));
        assert_eq!(f.nodes().count(), before - 1);
    }

    #[test]
    fn heterogeneous_origins_block_the_rewrite() {
        let mut f = Function::new("t");
        let x = f.param("x", Type::bits(8));
        let y = f.param("y", Type::bits(8));
        let t = f.tuple(vec![x, y]);
        f.set_return(t);

        // t's leaves come from two different origins; no single-ancestor
        // rewrite applies and no composite is reconstructed.
        assert!(!run(&mut f));
        assert_eq!(f.return_node(), Some(t));
    }
}
