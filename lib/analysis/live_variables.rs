//! Live variables, a backward analysis.

use crate::analysis::{Analysis, Confluence, FactSet, NodeStorage, ReferenceSolver, Solver};
use crate::error::*;
use crate::ir;
use std::collections::BTreeSet;
use std::rc::Rc;

/// The registers live at a point.
pub type LiveSet = FactSet<ir::Register>;

/// Compute the live registers at every quad of a function.
pub fn live_variables(function: &ir::Function) -> Result<LiveVariables> {
    let mut solver = ReferenceSolver::new(LiveVariables::new());
    solver.visit_function(function)?;
    Ok(solver.into_analysis())
}

/// A register is live at a point if some path from there reads it before
/// writing it.
#[derive(Clone, Debug, Default)]
pub struct LiveVariables {
    universe: Rc<BTreeSet<ir::Register>>,
    storage: Option<NodeStorage<LiveSet>>,
}

impl LiveVariables {
    pub fn new() -> LiveVariables {
        LiveVariables::default()
    }

    fn storage(&self) -> Result<&NodeStorage<LiveSet>> {
        self.storage
            .as_ref()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }

    fn storage_mut(&mut self) -> Result<&mut NodeStorage<LiveSet>> {
        self.storage
            .as_mut()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }
}

impl Analysis for LiveVariables {
    type Value = LiveSet;

    fn preprocess(&mut self, function: &ir::Function) -> Result<()> {
        let mut universe = BTreeSet::new();
        for quad in function.quads() {
            universe.extend(quad.used_registers().into_iter().cloned());
        }
        self.universe = Rc::new(universe);
        let top = FactSet::top(self.universe.clone(), Confluence::May);
        self.storage = Some(NodeStorage::new(function, &top, &top));
        Ok(())
    }

    fn postprocess(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>> {
        info!("live variables for {}", function.name());
        for quad in function.quads() {
            debug!("{} live out {}", quad, self.out_value(quad.id())?);
        }
        info!("live at entry {}", self.entry()?);
        Ok(Vec::new())
    }

    fn is_forward(&self) -> bool {
        false
    }

    fn entry(&self) -> Result<LiveSet> {
        Ok(self.storage()?.entry())
    }

    fn exit(&self) -> Result<LiveSet> {
        Ok(self.storage()?.exit())
    }

    fn set_entry(&mut self, value: &LiveSet) -> Result<()> {
        self.storage_mut()?.set_entry(value);
        Ok(())
    }

    fn set_exit(&mut self, value: &LiveSet) -> Result<()> {
        self.storage_mut()?.set_exit(value);
        Ok(())
    }

    fn in_value(&self, quad: ir::QuadId) -> Result<LiveSet> {
        self.storage()?.in_value(quad)
    }

    fn out_value(&self, quad: ir::QuadId) -> Result<LiveSet> {
        self.storage()?.out_value(quad)
    }

    fn set_in(&mut self, quad: ir::QuadId, value: &LiveSet) -> Result<()> {
        self.storage_mut()?.set_in(quad, value)
    }

    fn set_out(&mut self, quad: ir::QuadId, value: &LiveSet) -> Result<()> {
        self.storage_mut()?.set_out(quad, value)
    }

    fn new_temp_var(&self) -> Result<LiveSet> {
        self.storage()?;
        Ok(FactSet::new(self.universe.clone(), Confluence::May))
    }

    fn process_quad(&mut self, quad: &ir::Quad) -> Result<()> {
        let mut value = self.out_value(quad.id())?;
        for register in quad.defined_registers() {
            value.remove(register);
        }
        for register in quad.used_registers() {
            value.insert(register.clone());
        }
        self.set_in(quad.id(), &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;

    fn names(set: &LiveSet) -> Vec<&str> {
        set.iter().map(|register| register.name()).collect()
    }

    #[test]
    fn loop_keeps_its_counter_live() {
        // 0: R0 = new; 1: R1 = R1 + 1; branch R1 -> 1 | 2; 2: return R0
        let mut cfg = ControlFlowGraph::new();
        cfg.insert_block(Block::with_quads(0, vec![Quad::new(0, new_object("R0", "A"))]))
            .unwrap();
        cfg.insert_block(Block::with_quads(
            1,
            vec![
                Quad::new(
                    1,
                    binary(BinaryOperator::Add, "R1", reg("R1").into(), Operand::Constant(1)),
                ),
                Quad::new(2, branch("R1")),
            ],
        ))
        .unwrap();
        cfg.insert_block(Block::with_quads(
            2,
            vec![Quad::new(3, Operation::Return(Some(reg("R0").into())))],
        ))
        .unwrap();
        cfg.insert_edge(0, 1).unwrap();
        cfg.insert_edge(1, 1).unwrap();
        cfg.insert_edge(1, 2).unwrap();
        cfg.set_entry(0).unwrap();
        let function = Function::new("f", Vec::new(), cfg);

        let analysis = live_variables(&function).unwrap();
        assert_eq!(names(&analysis.in_value(3).unwrap()), vec!["R0"]);
        assert_eq!(names(&analysis.out_value(2).unwrap()), vec!["R0", "R1"]);
        assert_eq!(names(&analysis.in_value(1).unwrap()), vec!["R0", "R1"]);
        assert_eq!(names(&analysis.in_value(0).unwrap()), vec!["R1"]);
        assert_eq!(names(&analysis.entry().unwrap()), vec!["R1"]);
        assert!(analysis.exit().unwrap().is_empty());
    }
}
