use crate::error::*;
use crate::ir::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A routine: its name, parameter registers, and control flow graph.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Function {
    name: String,
    #[serde(default)]
    parameters: Vec<Register>,
    control_flow_graph: ControlFlowGraph,
}

impl Function {
    pub fn new<S: Into<String>>(
        name: S,
        parameters: Vec<Register>,
        control_flow_graph: ControlFlowGraph,
    ) -> Function {
        Function {
            name: name.into(),
            parameters,
            control_flow_graph,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Register] {
        &self.parameters
    }

    pub fn control_flow_graph(&self) -> &ControlFlowGraph {
        &self.control_flow_graph
    }
    pub fn control_flow_graph_mut(&mut self) -> &mut ControlFlowGraph {
        &mut self.control_flow_graph
    }

    pub fn quad(&self, id: QuadId) -> Result<&Quad> {
        self.control_flow_graph.quad(id)
    }
    pub fn quads(&self) -> impl Iterator<Item = &Quad> {
        self.control_flow_graph.quads()
    }

    pub fn locations(&self) -> Result<Vec<QuadLocation>> {
        self.control_flow_graph.locations()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", parameter)?;
        }
        writeln!(f, ")")?;
        write!(f, "{}", self.control_flow_graph)
    }
}
