// pass.rs — Pass seam and options bundle
//
// The hosting pipeline drives optimizations through the `Pass` trait and
// hands each invocation a `PassOptions`. Options only gate whether a pass
// runs; they never change what a pass computes.

use crate::error::OptError;
use crate::ir::Function;

/// Options recognized by the optimization passes.
#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Overall optimization level. Level 0 disables rewrites.
    pub opt_level: u8,
    /// Explicit override for the dataflow simplification pass; `None`
    /// defers to `opt_level`.
    pub dataflow: Option<bool>,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            opt_level: 2,
            dataflow: None,
        }
    }
}

impl PassOptions {
    pub fn dataflow_enabled(&self) -> bool {
        self.dataflow.unwrap_or(self.opt_level >= 1)
    }
}

/// An optimization over one function body. Returns whether the graph was
/// modified; invariant violations abort the invocation with the graph in
/// whatever state the failing phase guarantees (analysis failures leave it
/// untouched).
pub trait Pass {
    /// Short stable name for logs and pipeline wiring.
    fn name(&self) -> &'static str;

    fn run(&self, func: &mut Function, options: &PassOptions) -> Result<bool, OptError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataflow_gating() {
        let mut options = PassOptions::default();
        assert!(options.dataflow_enabled());

        options.opt_level = 0;
        assert!(!options.dataflow_enabled());

        options.dataflow = Some(true);
        assert!(options.dataflow_enabled());

        options.opt_level = 3;
        options.dataflow = Some(false);
        assert!(!options.dataflow_enabled());
    }
}
