use crate::analysis::{DataflowObject, EdgeAnalysis, Solver};
use crate::error::*;
use crate::ir;
use std::collections::BTreeMap;
use std::mem;

/// Solves an [`EdgeAnalysis`], where a quad carries one Out value per
/// successor edge (forward) or one In value per predecessor edge
/// (backward).
pub struct EdgeSolver<A: EdgeAnalysis> {
    analysis: A,
}

impl<A: EdgeAnalysis> EdgeSolver<A> {
    pub fn new(analysis: A) -> EdgeSolver<A> {
        EdgeSolver { analysis }
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

    /// Set every solved-direction edge value to top.
    pub fn initialize(&mut self, locations: &[ir::QuadLocation]) -> Result<()> {
        let forward = self.analysis.is_forward();
        for location in locations {
            let mut top = self.analysis.new_temp_var()?;
            top.set_to_top();
            if forward {
                for successor in location.successors() {
                    self.analysis.set_out(location.id(), *successor, &top)?;
                }
            } else {
                for predecessor in location.predecessors() {
                    self.analysis.set_in(location.id(), *predecessor, &top)?;
                }
            }
        }
        Ok(())
    }

    /// Run the transfer function over every quad once. Returns true if any
    /// solved-direction edge value changed.
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

    /// The solved-direction values of every edge of this quad.
    fn snapshot(
        &self,
        location: &ir::QuadLocation,
    ) -> Result<BTreeMap<ir::Neighbor, A::Value>> {
        let mut snapshot = BTreeMap::new();
        if self.analysis.is_forward() {
            for successor in location.successors() {
                let value = self.analysis.out_value(location.id(), *successor)?;
                snapshot.insert(*successor, value);
            }
        } else {
            for predecessor in location.predecessors() {
                let value = self.analysis.in_value(location.id(), *predecessor)?;
                snapshot.insert(*predecessor, value);
            }
        }
        Ok(snapshot)
    }

    fn process_quad(&mut self, location: &ir::QuadLocation) -> Result<bool> {
        let id = location.id();
        let before = self.snapshot(location)?;

        let mut meet = self.analysis.new_temp_var()?;
        meet.set_to_top();
        if self.analysis.is_forward() {
            for predecessor in location.predecessors() {
                match predecessor {
                    ir::Neighbor::Quad(p) => {
                        meet.meet_with(&self.analysis.out_value(*p, ir::Neighbor::Quad(id))?)
                    }
                    ir::Neighbor::Entry => meet.meet_with(&self.analysis.entry()?),
                    ir::Neighbor::Exit => {
                        bail!(ErrorKind::Graph(format!("exit precedes quad {}", id)))
                    }
                }
            }
            self.analysis.set_all_in(id, &meet)?;
        } else {
            for successor in location.successors() {
                match successor {
                    ir::Neighbor::Quad(s) => {
                        meet.meet_with(&self.analysis.in_value(*s, ir::Neighbor::Quad(id))?)
                    }
                    ir::Neighbor::Exit => meet.meet_with(&self.analysis.exit()?),
                    ir::Neighbor::Entry => {
                        bail!(ErrorKind::Graph(format!("entry succeeds quad {}", id)))
                    }
                }
            }
            self.analysis.set_all_out(id, &meet)?;
        }

        self.analysis.process_quad(location)?;

        let after = self.snapshot(location)?;
        trace!("{} meet: {:?} edges: {:?}", location, meet, after);
        Ok(after != before)
    }

    /// The exit value is the meet of every Out along an edge into the exit.
    fn calculate_exit(&mut self, locations: &[ir::QuadLocation]) -> Result<()> {
        let mut exit = self.analysis.new_temp_var()?;
        exit.set_to_top();
        for location in locations.iter().filter(|l| l.is_exit_predecessor()) {
            exit.meet_with(&self.analysis.out_value(location.id(), ir::Neighbor::Exit)?);
        }
        debug!("exit: {:?}", exit);
        self.analysis.set_exit(&exit)
    }

    /// The entry value is the meet of every In along an edge out of the
    /// entry.
    fn calculate_entry(&mut self, locations: &[ir::QuadLocation]) -> Result<()> {
        let mut entry = self.analysis.new_temp_var()?;
        entry.set_to_top();
        for location in locations.iter().filter(|l| l.is_entry_successor()) {
            entry.meet_with(&self.analysis.in_value(location.id(), ir::Neighbor::Entry)?);
        }
        debug!("entry: {:?}", entry);
        self.analysis.set_entry(&entry)
    }
}

impl<A: EdgeAnalysis> Solver for EdgeSolver<A> {
    fn visit_function(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>> {
        self.analysis.preprocess(function)?;

        let locations = function.locations()?;
        self.initialize(&locations)?;

        let mut passes = 0;
        loop {
            passes += 1;
            let changed = self.pass(&locations)?;
            debug!("{}: edge pass {} changed: {}", function.name(), passes, changed);
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
