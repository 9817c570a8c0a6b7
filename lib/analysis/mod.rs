//! Dataflow analyses implemented over quads, and the solvers driving them

pub mod fixed_point;

mod flow;
mod lattice;
mod live_variables;
mod null_checks;
mod reaching_definitions;
mod storage;

pub use self::fixed_point::{EdgeSolver, ReferenceSolver};
pub use self::flow::{Analysis, EdgeAnalysis, Solver};
pub use self::lattice::{Confluence, DataflowObject, FactSet};
pub use self::live_variables::{live_variables, LiveSet, LiveVariables};
pub use self::null_checks::{
    redundant_null_checks, EdgeNullChecker, NullCheckTransfer, NullChecker, VarSet,
};
pub use self::reaching_definitions::{
    reaching_definitions, DefinitionSet, EdgeReachingDefinitions, ReachingDefinitions,
};
pub use self::storage::{EdgeValues, NodeStorage, QuadValues, UnifiedInStorage};
