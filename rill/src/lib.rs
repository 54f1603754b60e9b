// rill — provenance-based dataflow simplification for structured-value IR
//
// Library root. The optimizer lives in `simplify`, built on the generic
// leaf-level dataflow engine in `dataflow`.

pub mod dataflow;
pub mod dot;
pub mod error;
pub mod interp;
pub mod ir;
pub mod leaf_tree;
pub mod pass;
pub mod provenance;
pub mod simplify;
pub mod ty;
pub mod value;
