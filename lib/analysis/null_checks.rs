//! Redundant null check elimination.
//!
//! Forward, over the registers proven non-null. A fact holds where paths
//! merge only if every path proves it. A null check whose In equals its Out
//! proved nothing new and is redundant.

use crate::analysis::{
    Analysis, Confluence, EdgeAnalysis, FactSet, NodeStorage, ReferenceSolver,
    Solver, UnifiedInStorage,
};
use crate::error::*;
use crate::ir;
use std::collections::BTreeSet;
use std::rc::Rc;

/// The registers proven non-null at a point.
pub type VarSet = FactSet<ir::Register>;

/// How a quad changes the set of registers proven non-null.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NullCheckTransfer {
    /// A definition forgets its register, a null check proves its register.
    Basic,
    /// As `Basic`, and a register move from proven registers proves its
    /// destination.
    MoveAware,
}

impl NullCheckTransfer {
    pub fn apply(&self, quad: &ir::Quad, value: &mut VarSet) {
        let used = quad.used_registers();
        let proven_move = *self == NullCheckTransfer::MoveAware
            && quad.is_move()
            && !used.is_empty()
            && used.iter().all(|register| value.contains(register));

        let defined = quad.defined_registers();
        for register in &defined {
            value.remove(register);
        }
        if quad.is_null_check() {
            for register in used {
                value.insert(register.clone());
            }
        }
        if proven_move {
            for register in defined {
                value.insert(register.clone());
            }
        }
    }
}

/// Find the redundant null checks of a function.
pub fn redundant_null_checks(
    function: &ir::Function,
    transfer: NullCheckTransfer,
) -> Result<Vec<ir::QuadId>> {
    ReferenceSolver::new(NullChecker::new(transfer)).visit_function(function)
}

/// Parameters and every register a quad reads or writes.
fn registers(function: &ir::Function) -> Rc<BTreeSet<ir::Register>> {
    let mut universe = function
        .parameters()
        .iter()
        .cloned()
        .collect::<BTreeSet<ir::Register>>();
    for quad in function.quads() {
        universe.extend(quad.defined_registers().into_iter().cloned());
        universe.extend(quad.used_registers().into_iter().cloned());
    }
    Rc::new(universe)
}

fn report(function: &ir::Function, redundant: &[ir::QuadId]) {
    info!("null checks of {}", function.name());
    for quad in function.quads().filter(|quad| quad.is_null_check()) {
        if redundant.contains(&quad.id()) {
            info!("{} redundant", quad);
        } else {
            info!("{} needed", quad);
        }
    }
}

/// Null check elimination with one In and one Out value per quad.
#[derive(Clone, Debug)]
pub struct NullChecker {
    transfer: NullCheckTransfer,
    universe: Rc<BTreeSet<ir::Register>>,
    storage: Option<NodeStorage<VarSet>>,
}

impl NullChecker {
    pub fn new(transfer: NullCheckTransfer) -> NullChecker {
        NullChecker {
            transfer,
            universe: Rc::new(BTreeSet::new()),
            storage: None,
        }
    }

    pub fn transfer(&self) -> NullCheckTransfer {
        self.transfer
    }

    fn storage(&self) -> Result<&NodeStorage<VarSet>> {
        self.storage
            .as_ref()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }

    fn storage_mut(&mut self) -> Result<&mut NodeStorage<VarSet>> {
        self.storage
            .as_mut()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }
}

impl Analysis for NullChecker {
    type Value = VarSet;

    fn preprocess(&mut self, function: &ir::Function) -> Result<()> {
        self.universe = registers(function);
        let top = FactSet::top(self.universe.clone(), Confluence::Must);
        let bottom = FactSet::bottom(self.universe.clone(), Confluence::Must);
        self.storage = Some(NodeStorage::new(function, &top, &bottom));
        Ok(())
    }

    fn postprocess(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>> {
        let storage = self.storage()?;
        let mut redundant = Vec::new();
        for quad in function.quads().filter(|quad| quad.is_null_check()) {
            if storage.in_ref(quad.id())? == storage.out_ref(quad.id())? {
                redundant.push(quad.id());
            }
        }
        redundant.sort();
        report(function, &redundant);
        Ok(redundant)
    }

    fn is_forward(&self) -> bool {
        true
    }

    fn entry(&self) -> Result<VarSet> {
        Ok(self.storage()?.entry())
    }

    fn exit(&self) -> Result<VarSet> {
        Ok(self.storage()?.exit())
    }

    fn set_entry(&mut self, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_entry(value);
        Ok(())
    }

    fn set_exit(&mut self, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_exit(value);
        Ok(())
    }

    fn in_value(&self, quad: ir::QuadId) -> Result<VarSet> {
        self.storage()?.in_value(quad)
    }

    fn out_value(&self, quad: ir::QuadId) -> Result<VarSet> {
        self.storage()?.out_value(quad)
    }

    fn set_in(&mut self, quad: ir::QuadId, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_in(quad, value)
    }

    fn set_out(&mut self, quad: ir::QuadId, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_out(quad, value)
    }

    fn new_temp_var(&self) -> Result<VarSet> {
        self.storage()?;
        Ok(FactSet::new(self.universe.clone(), Confluence::Must))
    }

    fn process_quad(&mut self, quad: &ir::Quad) -> Result<()> {
        let mut value = self.in_value(quad.id())?;
        self.transfer.apply(quad, &mut value);
        self.set_out(quad.id(), &value)
    }
}

/// Null check elimination with one Out value per successor edge.
#[derive(Clone, Debug)]
pub struct EdgeNullChecker {
    transfer: NullCheckTransfer,
    universe: Rc<BTreeSet<ir::Register>>,
    storage: Option<UnifiedInStorage<VarSet>>,
}

impl EdgeNullChecker {
    pub fn new(transfer: NullCheckTransfer) -> EdgeNullChecker {
        EdgeNullChecker {
            transfer,
            universe: Rc::new(BTreeSet::new()),
            storage: None,
        }
    }

    pub fn transfer(&self) -> NullCheckTransfer {
        self.transfer
    }

    fn storage(&self) -> Result<&UnifiedInStorage<VarSet>> {
        self.storage
            .as_ref()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }

    fn storage_mut(&mut self) -> Result<&mut UnifiedInStorage<VarSet>> {
        self.storage
            .as_mut()
            .ok_or_else(|| ErrorKind::Uninitialized.into())
    }
}

impl EdgeAnalysis for EdgeNullChecker {
    type Value = VarSet;

    fn preprocess(&mut self, function: &ir::Function) -> Result<()> {
        self.universe = registers(function);
        let top = FactSet::top(self.universe.clone(), Confluence::Must);
        let bottom = FactSet::bottom(self.universe.clone(), Confluence::Must);
        let locations = function.locations()?;
        self.storage = Some(UnifiedInStorage::new(function, &locations, &top, &bottom));
        Ok(())
    }

    fn postprocess(&mut self, function: &ir::Function) -> Result<Vec<ir::QuadId>> {
        let mut redundant = Vec::new();
        for quad in function.quads().filter(|quad| quad.is_null_check()) {
            if self.all_in(quad.id())? == self.all_out(quad.id())? {
                redundant.push(quad.id());
            }
        }
        redundant.sort();
        report(function, &redundant);
        Ok(redundant)
    }

    fn is_forward(&self) -> bool {
        true
    }

    fn entry(&self) -> Result<VarSet> {
        Ok(self.storage()?.entry())
    }

    fn exit(&self) -> Result<VarSet> {
        Ok(self.storage()?.exit())
    }

    fn set_entry(&mut self, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_entry(value);
        Ok(())
    }

    fn set_exit(&mut self, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_exit(value);
        Ok(())
    }

    fn in_value(&self, quad: ir::QuadId, predecessor: ir::Neighbor) -> Result<VarSet> {
        self.storage()?.in_value(quad, predecessor)
    }

    fn out_value(&self, quad: ir::QuadId, successor: ir::Neighbor) -> Result<VarSet> {
        self.storage()?.out_value(quad, successor)
    }

    fn all_in(&self, quad: ir::QuadId) -> Result<VarSet> {
        self.storage()?.all_in(quad)
    }

    fn all_out(&self, quad: ir::QuadId) -> Result<VarSet> {
        self.storage()?.all_out(quad)
    }

    fn set_in(&mut self, quad: ir::QuadId, predecessor: ir::Neighbor, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_in(quad, predecessor, value)
    }

    fn set_out(&mut self, quad: ir::QuadId, successor: ir::Neighbor, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_out(quad, successor, value)
    }

    fn set_all_in(&mut self, quad: ir::QuadId, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_all_in(quad, value)
    }

    fn set_all_out(&mut self, quad: ir::QuadId, value: &VarSet) -> Result<()> {
        self.storage_mut()?.set_all_out(quad, value)
    }

    fn new_temp_var(&self) -> Result<VarSet> {
        self.storage()?;
        Ok(FactSet::new(self.universe.clone(), Confluence::Must))
    }

    fn process_quad(&mut self, location: &ir::QuadLocation) -> Result<()> {
        let mut value = self.all_in(location.id())?;
        self.transfer.apply(location.quad(), &mut value);
        self.set_all_out(location.id(), &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;

    fn set(universe: &Rc<BTreeSet<Register>>, registers: &[&str]) -> VarSet {
        FactSet::with_facts(
            universe.clone(),
            Confluence::Must,
            registers.iter().map(|name| reg(*name)),
        )
    }

    fn universe() -> Rc<BTreeSet<Register>> {
        Rc::new(vec![reg("R0"), reg("R1"), reg("R2")].into_iter().collect())
    }

    #[test]
    fn check_proves_its_register() {
        let universe = universe();
        let mut value = set(&universe, &[]);
        NullCheckTransfer::Basic.apply(&Quad::new(0, null_check("R1")), &mut value);
        assert_eq!(value, set(&universe, &["R1"]));
    }

    #[test]
    fn definition_forgets_its_register() {
        let universe = universe();
        let mut value = set(&universe, &["R0", "R1"]);
        NullCheckTransfer::MoveAware.apply(&Quad::new(0, new_object("R0", "A")), &mut value);
        assert_eq!(value, set(&universe, &["R1"]));
    }

    #[test]
    fn move_from_proven_register() {
        let universe = universe();
        let quad = Quad::new(0, mov("R1", "R0"));

        let mut basic = set(&universe, &["R0", "R1"]);
        NullCheckTransfer::Basic.apply(&quad, &mut basic);
        assert_eq!(basic, set(&universe, &["R0"]));

        let mut aware = set(&universe, &["R0"]);
        NullCheckTransfer::MoveAware.apply(&quad, &mut aware);
        assert_eq!(aware, set(&universe, &["R0", "R1"]));
    }

    #[test]
    fn move_from_unproven_register() {
        let universe = universe();
        let mut value = set(&universe, &["R1"]);
        NullCheckTransfer::MoveAware.apply(&Quad::new(0, mov("R1", "R2")), &mut value);
        assert!(value.is_empty());
    }

    #[test]
    fn self_move_keeps_proof() {
        let universe = universe();
        let mut value = set(&universe, &["R0"]);
        NullCheckTransfer::MoveAware.apply(&Quad::new(0, mov("R0", "R0")), &mut value);
        assert_eq!(value, set(&universe, &["R0"]));
    }

    #[test]
    fn parameters_join_the_universe() {
        let cfg = ControlFlowGraph::from_quads(vec![Quad::new(0, null_check("R0"))]).unwrap();
        let function = Function::new("f", vec![reg("P0")], cfg);
        let mut checker = NullChecker::new(NullCheckTransfer::Basic);
        checker.preprocess(&function).unwrap();
        let names = checker
            .in_value(0)
            .unwrap()
            .iter()
            .map(|register| register.name().to_string())
            .collect::<Vec<String>>();
        assert_eq!(names, vec!["P0", "R0"]);
        assert!(checker.entry().unwrap().is_empty());
    }
}
