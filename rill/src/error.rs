// error.rs — Internal error type for analysis and rewrite
//
// The optimizer has exactly one error class: invariant violations, meaning
// the graph handed to it was malformed upstream (arity or shape disagreeing
// with a node's declared output type). These are fatal to the invocation and
// never recoverable; there is no I/O and no transient failure mode here.

use thiserror::Error;

use crate::ir::NodeId;

#[derive(Debug, Error)]
pub enum OptError {
    /// A node's operands do not structurally agree with its declared output
    /// type. Detected during the read-only analysis sweep, so the graph is
    /// guaranteed untouched when this surfaces.
    #[error("invariant violation at node {node:?}: {detail}")]
    InvariantViolation { node: NodeId, detail: String },
}

impl OptError {
    pub(crate) fn invariant(node: NodeId, detail: impl Into<String>) -> OptError {
        OptError::InvariantViolation {
            node,
            detail: detail.into(),
        }
    }
}
