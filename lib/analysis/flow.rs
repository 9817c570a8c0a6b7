//! The contracts between solvers and the analyses they drive.

use crate::analysis::DataflowObject;
use crate::error::*;
use crate::ir;

/// A dataflow problem with one In and one Out value per quad.
///
/// Every getter returns an independent copy of the stored value, and every
/// accessor fails with `ErrorKind::Uninitialized` until `preprocess` has run.
pub trait Analysis {
    type Value: DataflowObject;

    /// Size and initialize all storage for this function, and compute any
    /// universe of facts `top` and `bottom` are built from.
    fn preprocess(&mut self, function: &ir::Function) -> Result<()>;

    /// Read the final values once the solver has converged.
    ///
    /// Returns the quads this analysis judged redundant. The caller removes
    /// them, never the analysis.
    fn postprocess(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>>;

    /// Whether information flows from entry to exit.
    fn is_forward(&self) -> bool;

    /// The value flowing out of the synthetic entry.
    fn entry(&self) -> Result<Self::Value>;

    /// The value flowing into the synthetic exit.
    fn exit(&self) -> Result<Self::Value>;

    fn set_entry(&mut self, value: &Self::Value) -> Result<()>;

    fn set_exit(&mut self, value: &Self::Value) -> Result<()>;

    fn in_value(&self, quad: ir::QuadId) -> Result<Self::Value>;

    fn out_value(&self, quad: ir::QuadId) -> Result<Self::Value>;

    fn set_in(&mut self, quad: ir::QuadId, value: &Self::Value) -> Result<()>;

    fn set_out(&mut self, quad: ir::QuadId, value: &Self::Value) -> Result<()>;

    /// A fresh scratch value. Callers must not assume it is top or bottom.
    fn new_temp_var(&self) -> Result<Self::Value>;

    /// The transfer function. Computes and stores the Out of this quad from
    /// its In when forward, its In from its Out when backward.
    fn process_quad(&mut self, quad: &ir::Quad) -> Result<()>;
}

/// A dataflow problem with a distinct value for every edge of a quad.
///
/// Analyses which unify In across predecessor edges reject `in_value` and
/// `set_in` with `ErrorKind::Unsupported`: their In is always the meet of
/// every predecessor's Out, and only `set_all_in` may overwrite it.
pub trait EdgeAnalysis {
    type Value: DataflowObject;

    fn preprocess(&mut self, function: &ir::Function) -> Result<()>;

    fn postprocess(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>>;

    fn is_forward(&self) -> bool;

    fn entry(&self) -> Result<Self::Value>;

    fn exit(&self) -> Result<Self::Value>;

    fn set_entry(&mut self, value: &Self::Value) -> Result<()>;

    fn set_exit(&mut self, value: &Self::Value) -> Result<()>;

    /// The In of `quad` along the edge from `predecessor`.
    fn in_value(&self, quad: ir::QuadId, predecessor: ir::Neighbor) -> Result<Self::Value>;

    /// The Out of `quad` along the edge to `successor`.
    fn out_value(&self, quad: ir::QuadId, successor: ir::Neighbor) -> Result<Self::Value>;

    /// The In of `quad` over all of its predecessor edges.
    fn all_in(&self, quad: ir::QuadId) -> Result<Self::Value>;

    /// The meet of the Out of `quad` over all of its successor edges.
    fn all_out(&self, quad: ir::QuadId) -> Result<Self::Value>;

    fn set_in(
        &mut self,
        quad: ir::QuadId,
        predecessor: ir::Neighbor,
        value: &Self::Value,
    ) -> Result<()>;

    fn set_out(
        &mut self,
        quad: ir::QuadId,
        successor: ir::Neighbor,
        value: &Self::Value,
    ) -> Result<()>;

    fn set_all_in(&mut self, quad: ir::QuadId, value: &Self::Value) -> Result<()>;

    fn set_all_out(&mut self, quad: ir::QuadId, value: &Self::Value) -> Result<()>;

    fn new_temp_var(&self) -> Result<Self::Value>;

    /// The transfer function. Recomputes every solved-direction edge value
    /// of this quad.
    fn process_quad(&mut self, location: &ir::QuadLocation) -> Result<()>;
}

/// Runs its registered analysis over a function to a fixed point.
pub trait Solver {
    /// Preprocess, iterate to a fixed point, synthesize the boundary value,
    /// and postprocess. Returns the quads the analysis asks to remove.
    fn visit_function(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>>;
}
