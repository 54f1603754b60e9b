// dot.rs — Graphviz DOT output for function graphs
//
// Renders a `Function` in DOT format suitable for `dot`, `neato`, or other
// Graphviz layout engines, optionally annotated with the provenance each
// node's leaves resolved to. Debugging aid only.
//
// Preconditions: `func` is a constructed function; `provenance`, if given,
//                comes from an analysis run over the same function.
// Postconditions: returns a valid DOT string.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::dataflow::DataflowResult;
use crate::ir::{Function, NodeKind};
use crate::provenance::NodeSource;

/// Emit the function graph as a Graphviz DOT string.
pub fn emit_dot(func: &Function, provenance: Option<&DataflowResult<NodeSource>>) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph {} {{", sanitize(func.name())).unwrap();
    writeln!(buf, "    rankdir=LR;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();
    writeln!(buf).unwrap();

    // Nodes in id order for deterministic output.
    for node in func.nodes() {
        let mut label = format!("{}\\n{}", node.name, node.ty);
        if let Some(result) = provenance {
            if let Some(tree) = result.try_value(node.id) {
                let sources: Vec<String> =
                    tree.leaves().map(|(_, s)| s.render(func)).collect();
                write!(label, "\\n[{}]", sources.join(", ")).unwrap();
            }
        }
        let shape = match node.kind {
            NodeKind::Param => "ellipse",
            NodeKind::Literal(_) => "diamond",
            _ => "box",
        };
        writeln!(buf, "    n{} [label=\"{}\", shape={}];", node.id.0, label, shape).unwrap();
    }

    writeln!(buf).unwrap();
    for node in func.nodes() {
        for (slot, op) in node.operands.iter().enumerate() {
            writeln!(buf, "    n{} -> n{} [label=\"{}\"];", op.0, node.id.0, slot).unwrap();
        }
    }
    if let Some(ret) = func.return_node() {
        writeln!(buf, "    ret [shape=plaintext];").unwrap();
        writeln!(buf, "    n{} -> ret;", ret.0).unwrap();
    }

    writeln!(buf, "}}").unwrap();
    buf
}

/// Sanitize a name to valid DOT identifier characters.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
