//! Storage for per-quad and per-edge dataflow values.
//!
//! Getters on [`NodeStorage`] and [`UnifiedInStorage`] hand out copies, so
//! the analyses built on them satisfy the copy-out contract of
//! [`Analysis`](crate::analysis::Analysis) and
//! [`EdgeAnalysis`](crate::analysis::EdgeAnalysis).

use crate::analysis::DataflowObject;
use crate::error::*;
use crate::ir;
use std::collections::{BTreeMap, HashMap};

/// Ids may exceed the number of quads by this factor, plus
/// `DENSE_SLACK`, before values move to a map.
const DENSE_FACTOR: usize = 4;
const DENSE_SLACK: usize = 64;

#[derive(Clone, Debug)]
enum Slots<L> {
    Dense(Vec<Option<L>>),
    Sparse(BTreeMap<ir::QuadId, L>),
}

/// Values indexed by quad id.
///
/// Ids are expected to be dense, and are then used directly as vector
/// indices. A function with sparse ids falls back to an ordered map.
#[derive(Clone, Debug)]
pub struct QuadValues<L> {
    slots: Slots<L>,
}

impl<L: DataflowObject> QuadValues<L> {
    /// One value for every quad of the function, each a copy of `initial`.
    pub fn new(function: &ir::Function, initial: &L) -> QuadValues<L> {
        let count = function.quads().count();
        let size = function
            .control_flow_graph()
            .max_quad_id()
            .map_or(Some(0), |id| id.checked_add(1));
        let bound = count.saturating_mul(DENSE_FACTOR).saturating_add(DENSE_SLACK);

        let slots = match size {
            Some(size) if size <= bound => {
                let mut values = vec![None; size];
                for quad in function.quads() {
                    values[quad.id()] = Some(initial.clone());
                }
                Slots::Dense(values)
            }
            _ => Slots::Sparse(
                function
                    .quads()
                    .map(|quad| (quad.id(), initial.clone()))
                    .collect(),
            ),
        };
        QuadValues { slots }
    }

    pub fn is_dense(&self) -> bool {
        match self.slots {
            Slots::Dense(_) => true,
            Slots::Sparse(_) => false,
        }
    }

    pub fn get(&self, quad: ir::QuadId) -> Result<&L> {
        let value = match &self.slots {
            Slots::Dense(values) => values.get(quad).and_then(|value| value.as_ref()),
            Slots::Sparse(values) => values.get(&quad),
        };
        value.ok_or_else(|| ErrorKind::UnknownQuad(quad).into())
    }

    pub fn set(&mut self, quad: ir::QuadId, value: &L) -> Result<()> {
        let slot = match &mut self.slots {
            Slots::Dense(values) => values.get_mut(quad).and_then(|value| value.as_mut()),
            Slots::Sparse(values) => values.get_mut(&quad),
        };
        slot.ok_or(ErrorKind::UnknownQuad(quad))?.copy_from(value);
        Ok(())
    }
}

/// A value for each edge of each quad, keyed by the neighbor at the other
/// end of the edge.
#[derive(Clone, Debug)]
pub struct EdgeValues<L> {
    edges: HashMap<ir::QuadId, BTreeMap<ir::Neighbor, L>>,
}

impl<L: DataflowObject> EdgeValues<L> {
    /// One value per successor edge.
    pub fn successors(locations: &[ir::QuadLocation], initial: &L) -> EdgeValues<L> {
        EdgeValues::build(locations, initial, true)
    }

    /// One value per predecessor edge.
    pub fn predecessors(locations: &[ir::QuadLocation], initial: &L) -> EdgeValues<L> {
        EdgeValues::build(locations, initial, false)
    }

    /// A quad with no neighbor in this direction, such as one only leading
    /// into a loop of empty blocks, keeps a single value keyed by the
    /// boundary so its unified value is never lost.
    fn build(locations: &[ir::QuadLocation], initial: &L, successors: bool) -> EdgeValues<L> {
        let edges = locations
            .iter()
            .map(|location| {
                let (neighbors, boundary) = if successors {
                    (location.successors(), ir::Neighbor::Exit)
                } else {
                    (location.predecessors(), ir::Neighbor::Entry)
                };
                let mut values = neighbors
                    .iter()
                    .map(|neighbor| (*neighbor, initial.clone()))
                    .collect::<BTreeMap<ir::Neighbor, L>>();
                if values.is_empty() {
                    values.insert(boundary, initial.clone());
                }
                (location.id(), values)
            })
            .collect();
        EdgeValues { edges }
    }

    pub fn edges(&self, quad: ir::QuadId) -> Result<&BTreeMap<ir::Neighbor, L>> {
        self.edges
            .get(&quad)
            .ok_or_else(|| ErrorKind::UnknownQuad(quad).into())
    }

    pub fn get(&self, quad: ir::QuadId, neighbor: ir::Neighbor) -> Result<&L> {
        self.edges(quad)?
            .get(&neighbor)
            .ok_or_else(|| ErrorKind::UnknownEdge(quad, neighbor.to_string()).into())
    }

    /// Sets the value of one edge, adding the edge if it is new.
    pub fn set(&mut self, quad: ir::QuadId, neighbor: ir::Neighbor, value: &L) -> Result<()> {
        let edges = self
            .edges
            .get_mut(&quad)
            .ok_or(ErrorKind::UnknownQuad(quad))?;
        match edges.get_mut(&neighbor) {
            Some(edge) => edge.copy_from(value),
            None => {
                edges.insert(neighbor, value.clone());
            }
        }
        Ok(())
    }

    /// Sets every edge of this quad to `value`.
    pub fn set_all(&mut self, quad: ir::QuadId, value: &L) -> Result<()> {
        self.edges
            .get_mut(&quad)
            .ok_or(ErrorKind::UnknownQuad(quad))?
            .values_mut()
            .for_each(|edge| edge.copy_from(value));
        Ok(())
    }

    /// Meets every edge of this quad into `value`.
    pub fn meet_all(&self, quad: ir::QuadId, value: &mut L) -> Result<()> {
        self.edges(quad)?
            .values()
            .for_each(|edge| value.meet_with(edge));
        Ok(())
    }
}

/// One In and one Out value per quad, and the boundary values.
#[derive(Clone, Debug)]
pub struct NodeStorage<L> {
    in_values: QuadValues<L>,
    out_values: QuadValues<L>,
    entry: L,
    exit: L,
}

impl<L: DataflowObject> NodeStorage<L> {
    pub fn new(function: &ir::Function, initial: &L, boundary: &L) -> NodeStorage<L> {
        NodeStorage {
            in_values: QuadValues::new(function, initial),
            out_values: QuadValues::new(function, initial),
            entry: boundary.clone(),
            exit: boundary.clone(),
        }
    }

    pub fn in_ref(&self, quad: ir::QuadId) -> Result<&L> {
        self.in_values.get(quad)
    }

    pub fn out_ref(&self, quad: ir::QuadId) -> Result<&L> {
        self.out_values.get(quad)
    }

    pub fn in_value(&self, quad: ir::QuadId) -> Result<L> {
        self.in_values.get(quad).map(L::clone)
    }

    pub fn out_value(&self, quad: ir::QuadId) -> Result<L> {
        self.out_values.get(quad).map(L::clone)
    }

    pub fn set_in(&mut self, quad: ir::QuadId, value: &L) -> Result<()> {
        self.in_values.set(quad, value)
    }

    pub fn set_out(&mut self, quad: ir::QuadId, value: &L) -> Result<()> {
        self.out_values.set(quad, value)
    }

    pub fn entry(&self) -> L {
        self.entry.clone()
    }

    pub fn exit(&self) -> L {
        self.exit.clone()
    }

    pub fn set_entry(&mut self, value: &L) {
        self.entry.copy_from(value);
    }

    pub fn set_exit(&mut self, value: &L) {
        self.exit.copy_from(value);
    }
}

/// One In value per quad, unified across its predecessor edges, and one Out
/// value per successor edge.
#[derive(Clone, Debug)]
pub struct UnifiedInStorage<L> {
    in_values: QuadValues<L>,
    out_values: EdgeValues<L>,
    entry: L,
    exit: L,
    top: L,
}

impl<L: DataflowObject> UnifiedInStorage<L> {
    pub fn new(
        function: &ir::Function,
        locations: &[ir::QuadLocation],
        initial: &L,
        boundary: &L,
    ) -> UnifiedInStorage<L> {
        let mut top = initial.clone();
        top.set_to_top();
        UnifiedInStorage {
            in_values: QuadValues::new(function, initial),
            out_values: EdgeValues::successors(locations, initial),
            entry: boundary.clone(),
            exit: boundary.clone(),
            top,
        }
    }

    pub fn in_ref(&self, quad: ir::QuadId) -> Result<&L> {
        self.in_values.get(quad)
    }

    /// Always fails: In is only ever read across all predecessor edges.
    pub fn in_value(&self, _quad: ir::QuadId, _predecessor: ir::Neighbor) -> Result<L> {
        Err(ErrorKind::Unsupported("reading In along a single predecessor edge".to_string()).into())
    }

    /// Always fails: In is the meet of every predecessor Out.
    pub fn set_in(&mut self, _quad: ir::QuadId, _predecessor: ir::Neighbor, _value: &L) -> Result<()> {
        Err(ErrorKind::Unsupported("setting In along a single predecessor edge".to_string()).into())
    }

    pub fn all_in(&self, quad: ir::QuadId) -> Result<L> {
        self.in_values.get(quad).map(L::clone)
    }

    pub fn set_all_in(&mut self, quad: ir::QuadId, value: &L) -> Result<()> {
        self.in_values.set(quad, value)
    }

    pub fn out_value(&self, quad: ir::QuadId, successor: ir::Neighbor) -> Result<L> {
        self.out_values.get(quad, successor).map(L::clone)
    }

    pub fn all_out(&self, quad: ir::QuadId) -> Result<L> {
        let mut value = self.top.clone();
        self.out_values.meet_all(quad, &mut value)?;
        Ok(value)
    }

    pub fn set_out(&mut self, quad: ir::QuadId, successor: ir::Neighbor, value: &L) -> Result<()> {
        self.out_values.set(quad, successor, value)
    }

    pub fn set_all_out(&mut self, quad: ir::QuadId, value: &L) -> Result<()> {
        self.out_values.set_all(quad, value)
    }

    pub fn entry(&self) -> L {
        self.entry.clone()
    }

    pub fn exit(&self) -> L {
        self.exit.clone()
    }

    pub fn set_entry(&mut self, value: &L) {
        self.entry.copy_from(value);
    }

    pub fn set_exit(&mut self, value: &L) {
        self.exit.copy_from(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Confluence, FactSet};
    use crate::ir::*;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    fn function() -> Function {
        let cfg = ControlFlowGraph::from_quads(vec![
            Quad::new(2, new_object("R0", "Foo")),
            Quad::new(5, null_check("R0")),
        ])
        .unwrap();
        Function::new("f", Vec::new(), cfg)
    }

    fn top() -> FactSet<QuadId> {
        let universe: Rc<BTreeSet<QuadId>> = Rc::new(vec![2, 5].into_iter().collect());
        FactSet::top(universe, Confluence::Must)
    }

    #[test]
    fn quad_values_are_sized_by_the_largest_id() {
        let values = QuadValues::new(&function(), &top());
        assert!(values.is_dense());
        assert!(values.get(2).is_ok());
        assert!(values.get(5).is_ok());
        assert!(values.get(3).is_err());
        assert!(values.get(6).is_err());
    }

    #[test]
    fn sparse_ids_fall_back_to_a_map() {
        let cfg = ControlFlowGraph::from_quads(vec![
            Quad::new(3, new_object("R0", "Foo")),
            Quad::new(usize::MAX, null_check("R0")),
        ])
        .unwrap();
        let function = Function::new("f", Vec::new(), cfg);
        let mut values = QuadValues::new(&function, &top());
        assert!(!values.is_dense());

        let mut partial = top();
        partial.remove(&2);
        values.set(usize::MAX, &partial).unwrap();
        assert_eq!(values.get(usize::MAX).unwrap(), &partial);
        assert_eq!(values.get(3).unwrap(), &top());
        assert!(values.get(4).is_err());
        assert!(values.set(4, &partial).is_err());
    }

    #[test]
    fn quad_without_successors_keeps_its_out() {
        // 0: [2, 5] -> empty 1 -> 1
        let mut cfg = ControlFlowGraph::new();
        cfg.insert_block(Block::with_quads(
            0,
            vec![Quad::new(2, new_object("R0", "Foo")), Quad::new(5, null_check("R0"))],
        ))
        .unwrap();
        cfg.insert_block(Block::new(1)).unwrap();
        cfg.insert_edge(0, 1).unwrap();
        cfg.insert_edge(1, 1).unwrap();
        cfg.set_entry(0).unwrap();
        let function = Function::new("f", Vec::new(), cfg);
        let locations = function.locations().unwrap();
        assert!(locations[1].successors().is_empty());

        let mut storage = UnifiedInStorage::new(&function, &locations, &top(), &top());
        let mut partial = top();
        partial.remove(&5);
        storage.set_all_out(5, &partial).unwrap();
        assert_eq!(storage.all_out(5).unwrap(), partial);
    }

    #[test]
    fn getters_return_copies() {
        let function = function();
        let storage = NodeStorage::new(&function, &top(), &top());
        let mut value = storage.in_value(2).unwrap();
        value.remove(&2);
        assert_eq!(storage.in_ref(2).unwrap().len(), 2);
    }

    #[test]
    fn unified_in_rejects_single_edge_access() {
        let function = function();
        let locations = function.locations().unwrap();
        let mut storage = UnifiedInStorage::new(&function, &locations, &top(), &top());
        for neighbor in vec![Neighbor::Entry, Neighbor::Quad(2), Neighbor::Exit] {
            assert!(storage.in_value(5, neighbor).is_err());
            assert!(storage.set_in(5, neighbor, &top()).is_err());
        }
    }

    #[test]
    fn all_out_meets_every_successor_edge() {
        let function = function();
        let locations = function.locations().unwrap();
        let mut storage = UnifiedInStorage::new(&function, &locations, &top(), &top());
        let mut partial = top();
        partial.remove(&5);
        storage.set_out(2, Neighbor::Quad(7), &partial).unwrap();
        assert_eq!(storage.out_value(2, Neighbor::Quad(5)).unwrap(), top());
        assert_eq!(storage.all_out(2).unwrap(), partial);
        assert!(storage.out_value(2, Neighbor::Exit).is_err());
    }
}
