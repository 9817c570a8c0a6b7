//! Fixed-point engines for data-flow analysis.
//!
//! Both solvers walk every quad of a function in traversal order, reversed
//! for backward analyses, until a full pass changes no solved value. The
//! synthetic entry and exit never take part in the walk. Once converged, the
//! boundary at the far end of the analysis direction is synthesized from its
//! neighboring quads.

use crate::analysis::{Analysis, DataflowObject, Solver};
use crate::error::*;
use crate::ir;
use std::mem;

mod edge;

pub use self::edge::EdgeSolver;

/// Solves an [`Analysis`] holding one In and one Out value per quad.
pub struct ReferenceSolver<A: Analysis> {
    analysis: A,
}

impl<A: Analysis> ReferenceSolver<A> {
    pub fn new(analysis: A) -> ReferenceSolver<A> {
        ReferenceSolver { analysis }
    }

    /// Register a new analysis, returning the previous one.
    pub fn register_analysis(&mut self, analysis: A) -> A {
        mem::replace(&mut self.analysis, analysis)
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    pub fn analysis_mut(&mut self) -> &mut A {
        &mut self.analysis
    }

    pub fn into_analysis(self) -> A {
        self.analysis
    }

    /// Set the solved value of every quad, Out when forward and In when
    /// backward, to top.
    pub fn initialize(&mut self, locations: &[ir::QuadLocation]) -> Result<()> {
        let forward = self.analysis.is_forward();
        for location in locations {
            let mut top = self.analysis.new_temp_var()?;
            top.set_to_top();
            if forward {
                self.analysis.set_out(location.id(), &top)?;
            } else {
                self.analysis.set_in(location.id(), &top)?;
            }
        }
        Ok(())
    }

    /// Run the transfer function over every quad once. Returns true if the
    /// solved value of any quad changed.
    pub fn pass(&mut self, locations: &[ir::QuadLocation]) -> Result<bool> {
        let mut changed = false;
        if self.analysis.is_forward() {
            for location in locations {
                changed |= self.process_quad(location)?;
            }
        } else {
            for location in locations.iter().rev() {
                changed |= self.process_quad(location)?;
            }
        }
        Ok(changed)
    }

    fn process_quad(&mut self, location: &ir::QuadLocation) -> Result<bool> {
        let id = location.id();
        let mut meet = self.analysis.new_temp_var()?;
        meet.set_to_top();

        if self.analysis.is_forward() {
            let out = self.analysis.out_value(id)?;
            self.meet_predecessors(&mut meet, location)?;
            self.analysis.set_in(id, &meet)?;
            self.analysis.process_quad(location.quad())?;
            trace!("{} in: {:?} out: {:?}", location, meet, self.analysis.out_value(id)?);
            Ok(self.analysis.out_value(id)? != out)
        } else {
            let in_ = self.analysis.in_value(id)?;
            self.meet_successors(&mut meet, location)?;
            self.analysis.set_out(id, &meet)?;
            self.analysis.process_quad(location.quad())?;
            trace!("{} in: {:?} out: {:?}", location, self.analysis.in_value(id)?, meet);
            Ok(self.analysis.in_value(id)? != in_)
        }
    }

    fn meet_predecessors(&self, value: &mut A::Value, location: &ir::QuadLocation) -> Result<()> {
        for predecessor in location.predecessors() {
            match predecessor {
                ir::Neighbor::Quad(id) => value.meet_with(&self.analysis.out_value(*id)?),
                ir::Neighbor::Entry => value.meet_with(&self.analysis.entry()?),
                ir::Neighbor::Exit => bail!(ErrorKind::Graph(format!(
                    "exit precedes quad {}",
                    location.id()
                ))),
            }
        }
        Ok(())
    }

    fn meet_successors(&self, value: &mut A::Value, location: &ir::QuadLocation) -> Result<()> {
        for successor in location.successors() {
            match successor {
                ir::Neighbor::Quad(id) => value.meet_with(&self.analysis.in_value(*id)?),
                ir::Neighbor::Exit => value.meet_with(&self.analysis.exit()?),
                ir::Neighbor::Entry => bail!(ErrorKind::Graph(format!(
                    "entry succeeds quad {}",
                    location.id()
                ))),
            }
        }
        Ok(())
    }

    /// The exit value is the meet of the Out of every quad preceding it.
    fn calculate_exit(&mut self, locations: &[ir::QuadLocation]) -> Result<()> {
        let mut exit = self.analysis.new_temp_var()?;
        exit.set_to_top();
        for location in locations.iter().filter(|l| l.is_exit_predecessor()) {
            exit.meet_with(&self.analysis.out_value(location.id())?);
        }
        debug!("exit: {:?}", exit);
        self.analysis.set_exit(&exit)
    }

    /// The entry value is the meet of the In of every quad following it.
    fn calculate_entry(&mut self, locations: &[ir::QuadLocation]) -> Result<()> {
        let mut entry = self.analysis.new_temp_var()?;
        entry.set_to_top();
        for location in locations.iter().filter(|l| l.is_entry_successor()) {
            entry.meet_with(&self.analysis.in_value(location.id())?);
        }
        debug!("entry: {:?}", entry);
        self.analysis.set_entry(&entry)
    }
}

impl<A: Analysis> Solver for ReferenceSolver<A> {
    fn visit_function(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>> {
        self.analysis.preprocess(function)?;

        let locations = function.locations()?;
        self.initialize(&locations)?;

        let mut passes = 0;
        loop {
            passes += 1;
            let changed = self.pass(&locations)?;
            debug!("{}: pass {} changed: {}", function.name(), passes, changed);
            if !changed {
                break;
            }
        }

        if self.analysis.is_forward() {
            self.calculate_exit(&locations)?;
        } else {
            self.calculate_entry(&locations)?;
        }

        self.analysis.postprocess(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confluence, FactSet, NodeStorage};
    use crate::ir::*;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    /// Counts which quads every path to a point must pass through. Top is
    /// every quad, meet is intersection.
    #[derive(Default)]
    struct Dominators {
        storage: Option<NodeStorage<FactSet<QuadId>>>,
        universe: Rc<BTreeSet<QuadId>>,
    }

    impl Dominators {
        fn storage(&self) -> Result<&NodeStorage<FactSet<QuadId>>> {
            self.storage.as_ref().ok_or_else(|| ErrorKind::Uninitialized.into())
        }

        fn storage_mut(&mut self) -> Result<&mut NodeStorage<FactSet<QuadId>>> {
            self.storage.as_mut().ok_or_else(|| ErrorKind::Uninitialized.into())
        }
    }

    impl Analysis for Dominators {
        type Value = FactSet<QuadId>;

        fn preprocess(&mut self, function: &Function) -> Result<()> {
            self.universe = Rc::new(function.quads().map(|quad| quad.id()).collect());
            let top = FactSet::top(self.universe.clone(), Confluence::Must);
            let bottom = FactSet::bottom(self.universe.clone(), Confluence::Must);
            self.storage = Some(NodeStorage::new(function, &top, &bottom));
            Ok(())
        }
        fn postprocess(&mut self, _: &Function) -> Result<Vec<QuadId>> {
            Ok(Vec::new())
        }
        fn is_forward(&self) -> bool {
            true
        }
        fn entry(&self) -> Result<Self::Value> {
            Ok(self.storage()?.entry())
        }
        fn exit(&self) -> Result<Self::Value> {
            Ok(self.storage()?.exit())
        }
        fn set_entry(&mut self, value: &Self::Value) -> Result<()> {
            self.storage_mut()?.set_entry(value);
            Ok(())
        }
        fn set_exit(&mut self, value: &Self::Value) -> Result<()> {
            self.storage_mut()?.set_exit(value);
            Ok(())
        }
        fn in_value(&self, quad: QuadId) -> Result<Self::Value> {
            self.storage()?.in_value(quad)
        }
        fn out_value(&self, quad: QuadId) -> Result<Self::Value> {
            self.storage()?.out_value(quad)
        }
        fn set_in(&mut self, quad: QuadId, value: &Self::Value) -> Result<()> {
            self.storage_mut()?.set_in(quad, value)
        }
        fn set_out(&mut self, quad: QuadId, value: &Self::Value) -> Result<()> {
            self.storage_mut()?.set_out(quad, value)
        }
        fn new_temp_var(&self) -> Result<Self::Value> {
            Ok(FactSet::new(self.universe.clone(), Confluence::Must))
        }
        fn process_quad(&mut self, quad: &Quad) -> Result<()> {
            let mut value = self.in_value(quad.id())?;
            value.insert(quad.id());
            self.set_out(quad.id(), &value)
        }
    }

    fn looping() -> Function {
        // 0 -> 1 -> 1, 1 -> 2
        let mut cfg = ControlFlowGraph::new();
        cfg.insert_block(Block::with_quads(0, vec![Quad::new(1, Operation::Nop)]))
            .unwrap();
        cfg.insert_block(Block::with_quads(
            1,
            vec![Quad::new(2, Operation::Nop), Quad::new(3, branch("R0"))],
        ))
        .unwrap();
        cfg.insert_block(Block::with_quads(2, vec![Quad::new(4, Operation::Return(None))]))
            .unwrap();
        cfg.insert_edge(0, 1).unwrap();
        cfg.insert_edge(1, 1).unwrap();
        cfg.insert_edge(1, 2).unwrap();
        cfg.set_entry(0).unwrap();
        Function::new("looping", Vec::new(), cfg)
    }

    fn ids(set: &FactSet<QuadId>) -> Vec<QuadId> {
        set.iter().cloned().collect()
    }

    #[test]
    fn loop_converges_to_dominators() {
        let function = looping();
        let mut solver = ReferenceSolver::new(Dominators::default());
        assert!(solver.visit_function(&function).unwrap().is_empty());

        let analysis = solver.analysis();
        assert_eq!(ids(&analysis.in_value(2).unwrap()), vec![1]);
        assert_eq!(ids(&analysis.out_value(3).unwrap()), vec![1, 2, 3]);
        assert_eq!(ids(&analysis.out_value(4).unwrap()), vec![1, 2, 3, 4]);
        assert_eq!(ids(&analysis.exit().unwrap()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn one_more_pass_changes_nothing() {
        let function = looping();
        let mut solver = ReferenceSolver::new(Dominators::default());
        solver.visit_function(&function).unwrap();

        let locations = function.locations().unwrap();
        let before = locations
            .iter()
            .map(|l| (solver.analysis().in_value(l.id()).unwrap(), solver.analysis().out_value(l.id()).unwrap()))
            .collect::<Vec<_>>();
        assert!(!solver.pass(&locations).unwrap());
        let after = locations
            .iter()
            .map(|l| (solver.analysis().in_value(l.id()).unwrap(), solver.analysis().out_value(l.id()).unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn unpreprocessed_analysis_fails_fast() {
        let analysis = Dominators::default();
        assert!(analysis.in_value(1).is_err());
        assert!(analysis.entry().is_err());
    }

    #[test]
    fn empty_function_still_synthesizes_exit() {
        let function = Function::new("empty", Vec::new(), ControlFlowGraph::new());
        let mut solver = ReferenceSolver::new(Dominators::default());
        assert!(solver.visit_function(&function).unwrap().is_empty());
        assert!(solver.analysis().exit().unwrap().is_empty());
    }
}
