//! Runs a named pass over every function of a program.
//!
//! A pass pairs one analysis with one solver. Quads the analysis judges
//! redundant are removed here, after the solver has returned.

use crate::analysis::{
    EdgeNullChecker, EdgeReachingDefinitions, EdgeSolver, LiveVariables, NullCheckTransfer,
    NullChecker, ReachingDefinitions, ReferenceSolver, Solver,
};
use crate::error::*;
use crate::ir;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Builds a fresh solver with its analysis registered.
pub type PassConstructor = fn() -> Box<dyn Solver>;

lazy_static! {
    /// Every pass the driver can run, by name.
    pub static ref PASSES: BTreeMap<&'static str, PassConstructor> = {
        let mut passes: BTreeMap<&'static str, PassConstructor> = BTreeMap::new();
        passes.insert("reaching-definitions", reaching_definitions);
        passes.insert("edge-reaching-definitions", edge_reaching_definitions);
        passes.insert("null-checks", null_checks);
        passes.insert("move-null-checks", move_null_checks);
        passes.insert("edge-null-checks", edge_null_checks);
        passes.insert("live-variables", live_variables);
        passes
    };
}

fn reaching_definitions() -> Box<dyn Solver> {
    Box::new(ReferenceSolver::new(ReachingDefinitions::new()))
}

fn edge_reaching_definitions() -> Box<dyn Solver> {
    Box::new(EdgeSolver::new(EdgeReachingDefinitions::new()))
}

fn null_checks() -> Box<dyn Solver> {
    Box::new(ReferenceSolver::new(NullChecker::new(
        NullCheckTransfer::Basic,
    )))
}

fn move_null_checks() -> Box<dyn Solver> {
    Box::new(ReferenceSolver::new(NullChecker::new(
        NullCheckTransfer::MoveAware,
    )))
}

fn edge_null_checks() -> Box<dyn Solver> {
    Box::new(EdgeSolver::new(EdgeNullChecker::new(
        NullCheckTransfer::MoveAware,
    )))
}

fn live_variables() -> Box<dyn Solver> {
    Box::new(ReferenceSolver::new(LiveVariables::new()))
}

/// Build the pass registered under `name`.
pub fn pass(name: &str) -> Result<Box<dyn Solver>> {
    match PASSES.get(name) {
        Some(constructor) => Ok(constructor()),
        None => Err(ErrorKind::UnknownPass(name.to_string()).into()),
    }
}

/// The outcome of one pass over one function.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PassReport {
    function: String,
    removed: Vec<ir::QuadId>,
}

impl PassReport {
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Quads removed from the function, in ascending order.
    pub fn removed(&self) -> &[ir::QuadId] {
        &self.removed
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.function)?;
        for id in &self.removed {
            write!(f, " {}", id)?;
        }
        Ok(())
    }
}

/// Solve one function, then remove the quads the analysis returned.
pub fn run_pass(solver: &mut dyn Solver, function: &mut ir::Function) -> Result<PassReport> {
    let mut removed = solver
        .visit_function(function)
        .chain_err(|| format!("Failed to analyze {}", function.name()))?;
    removed.sort();
    removed.dedup();

    for id in &removed {
        let quad = function.control_flow_graph_mut().remove_quad(*id)?;
        info!("{}: removed {}", function.name(), quad);
    }

    Ok(PassReport {
        function: function.name().to_string(),
        removed,
    })
}

/// Run the pass named `name` over every function of a program.
pub fn optimize(program: &mut ir::Program, name: &str) -> Result<Vec<PassReport>> {
    let mut solver = pass(name)?;
    let mut reports = Vec::new();
    for function in program.functions_mut() {
        debug!("running {} over {}", name, function.name());
        reports.push(run_pass(solver.as_mut(), function)?);
    }
    Ok(reports)
}
