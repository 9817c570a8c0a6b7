//! Reaching definitions over quads.
//!
//! A definition is the quad writing a register. It reaches a point if some
//! path from it to that point does not redefine the register.

use crate::analysis::{
    Analysis, Confluence, EdgeAnalysis, FactSet, NodeStorage, ReferenceSolver,
    Solver, UnifiedInStorage,
};
use crate::error::*;
use crate::ir;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// The quads whose definitions reach a point.
pub type DefinitionSet = FactSet<ir::QuadId>;

/// Compute reaching definitions for the given function.
pub fn reaching_definitions(function: &ir::Function) -> Result<ReachingDefinitions> {
    let mut solver = ReferenceSolver::new(ReachingDefinitions::new());
    solver.visit_function(function)?;
    Ok(solver.into_analysis())
}

/// Definition sites of a function, grouped by the register they define.
#[derive(Clone, Debug, Default)]
struct Definitions {
    universe: Rc<BTreeSet<ir::QuadId>>,
    by_register: HashMap<ir::Register, BTreeSet<ir::QuadId>>,
}

impl Definitions {
    fn new(function: &ir::Function) -> Definitions {
        let mut universe = BTreeSet::new();
        let mut by_register: HashMap<ir::Register, BTreeSet<ir::QuadId>> = HashMap::new();
        for quad in function.quads() {
            for register in quad.defined_registers() {
                universe.insert(quad.id());
                by_register
                    .entry(register.clone())
                    .or_insert_with(BTreeSet::new)
                    .insert(quad.id());
            }
        }
        Definitions {
            universe: Rc::new(universe),
            by_register,
        }
    }

    fn top(&self) -> DefinitionSet {
        FactSet::top(self.universe.clone(), Confluence::May)
    }

    /// Kill every definition of a register this quad defines, then add the
    /// quad itself.
    fn transfer(&self, quad: &ir::Quad, definitions: &mut DefinitionSet) {
        let defined = quad.defined_registers();
        for register in &defined {
            if let Some(sites) = self.by_register.get(*register) {
                for site in sites {
                    definitions.remove(site);
                }
            }
        }
        if !defined.is_empty() {
            definitions.insert(quad.id());
        }
    }
}

fn log_definitions<F>(function: &ir::Function, in_value: F) -> Result<()>
where
    F: Fn(ir::QuadId) -> Result<DefinitionSet>,
{
    info!("reaching definitions for {}", function.name());
    for quad in function.quads() {
        info!("{} reached by {}", quad, in_value(quad.id())?);
    }
    Ok(())
}

/// Reaching definitions with one In and one Out value per quad.
#[derive(Clone, Debug, Default)]
pub struct ReachingDefinitions {
    definitions: Definitions,
    storage: Option<NodeStorage<DefinitionSet>>,
}

impl ReachingDefinitions {
    pub fn new() -> ReachingDefinitions {
        ReachingDefinitions::default()
    }

    fn storage(&self) -> Result<&NodeStorage<DefinitionSet>> {
        self.storage
            .as_ref()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }

    fn storage_mut(&mut self) -> Result<&mut NodeStorage<DefinitionSet>> {
        self.storage
            .as_mut()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }
}

impl Analysis for ReachingDefinitions {
    type Value = DefinitionSet;

    fn preprocess(&mut self, function: &ir::Function) -> Result<()> {
        self.definitions = Definitions::new(function);
        let top = self.definitions.top();
        self.storage = Some(NodeStorage::new(function, &top, &top));
        Ok(())
    }

    fn postprocess(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>> {
        log_definitions(function, |quad| self.in_value(quad))?;
        Ok(Vec::new())
    }

    fn is_forward(&self) -> bool {
        true
    }

    fn entry(&self) -> Result<DefinitionSet> {
        Ok(self.storage()?.entry())
    }

    fn exit(&self) -> Result<DefinitionSet> {
        Ok(self.storage()?.exit())
    }

    fn set_entry(&mut self, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_entry(value);
        Ok(())
    }

    fn set_exit(&mut self, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_exit(value);
        Ok(())
    }

    fn in_value(&self, quad: ir::QuadId) -> Result<DefinitionSet> {
        self.storage()?.in_value(quad)
    }

    fn out_value(&self, quad: ir::QuadId) -> Result<DefinitionSet> {
        self.storage()?.out_value(quad)
    }

    fn set_in(&mut self, quad: ir::QuadId, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_in(quad, value)
    }

    fn set_out(&mut self, quad: ir::QuadId, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_out(quad, value)
    }

    fn new_temp_var(&self) -> Result<DefinitionSet> {
        self.storage()?;
        Ok(FactSet::new(self.definitions.universe.clone(), Confluence::May))
    }

    fn process_quad(&mut self, quad: &ir::Quad) -> Result<()> {
        let mut value = self.in_value(quad.id())?;
        self.definitions.transfer(quad, &mut value);
        self.set_out(quad.id(), &value)
    }
}

/// Reaching definitions with one Out value per successor edge.
///
/// Every edge of a quad carries the same definitions. Solving this and
/// [`ReachingDefinitions`] over the same function yields the same In for
/// every quad.
#[derive(Clone, Debug, Default)]
pub struct EdgeReachingDefinitions {
    definitions: Definitions,
    storage: Option<UnifiedInStorage<DefinitionSet>>,
}

impl EdgeReachingDefinitions {
    pub fn new() -> EdgeReachingDefinitions {
        EdgeReachingDefinitions::default()
    }

    fn storage(&self) -> Result<&UnifiedInStorage<DefinitionSet>> {
        self.storage
            .as_ref()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }

    fn storage_mut(&mut self) -> Result<&mut UnifiedInStorage<DefinitionSet>> {
        self.storage
            .as_mut()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }
}

impl EdgeAnalysis for EdgeReachingDefinitions {
    type Value = DefinitionSet;

    fn preprocess(&mut self, function: &ir::Function) -> Result<()> {
        self.definitions = Definitions::new(function);
        let top = self.definitions.top();
        let locations = function.locations()?;
        self.storage = Some(UnifiedInStorage::new(function, &locations, &top, &top));
        Ok(())
    }

    fn postprocess(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>> {
        log_definitions(function, |quad| self.all_in(quad))?;
        Ok(Vec::new())
    }

    fn is_forward(&self) -> bool {
        true
    }

    fn entry(&self) -> Result<DefinitionSet> {
        Ok(self.storage()?.entry())
    }

    fn exit(&self) -> Result<DefinitionSet> {
        Ok(self.storage()?.exit())
    }

    fn set_entry(&mut self, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_entry(value);
        Ok(())
    }

    fn set_exit(&mut self, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_exit(value);
        Ok(())
    }

    fn in_value(&self, quad: ir::QuadId, predecessor: ir::Neighbor) -> Result<DefinitionSet> {
        self.storage()?.in_value(quad, predecessor)
    }

    fn out_value(&self, quad: ir::QuadId, successor: ir::Neighbor) -> Result<DefinitionSet> {
        self.storage()?.out_value(quad, successor)
    }

    fn all_in(&self, quad: ir::QuadId) -> Result<DefinitionSet> {
        self.storage()?.all_in(quad)
    }

    fn all_out(&self, quad: ir::QuadId) -> Result<DefinitionSet> {
        self.storage()?.all_out(quad)
    }

    fn set_in(
        &mut self,
        quad: ir::QuadId,
        predecessor: ir::Neighbor,
        value: &DefinitionSet,
    ) -> Result<()> {
        self.storage_mut()?.set_in(quad, predecessor, value)
    }

    fn set_out(
        &mut self,
        quad: ir::QuadId,
        successor: ir::Neighbor,
        value: &DefinitionSet,
    ) -> Result<()> {
        self.storage_mut()?.set_out(quad, successor, value)
    }

    fn set_all_in(&mut self, quad: ir::QuadId, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_all_in(quad, value)
    }

    fn set_all_out(&mut self, quad: ir::QuadId, value: &DefinitionSet) -> Result<()> {
        self.storage_mut()?.set_all_out(quad, value)
    }

    fn new_temp_var(&self) -> Result<DefinitionSet> {
        self.storage()?;
        Ok(FactSet::new(self.definitions.universe.clone(), Confluence::May))
    }

    fn process_quad(&mut self, location: &ir::QuadLocation) -> Result<()> {
        let mut value = self.all_in(location.id())?;
        self.definitions.transfer(location.quad(), &mut value);
        self.set_all_out(location.id(), &value)
    }
}
