use crate::ir::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A neighbor of a quad in the control flow graph.
///
/// The entry and exit of a function are not quads. They carry their own
/// dataflow values, and appear here so "no predecessor" and "the predecessor
/// is the function entry" can never be confused.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Neighbor {
    Entry,
    Quad(QuadId),
    Exit,
}

impl fmt::Display for Neighbor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Neighbor::Entry => write!(f, "entry"),
            Neighbor::Quad(id) => write!(f, "{}", id),
            Neighbor::Exit => write!(f, "exit"),
        }
    }
}

/// A quad together with its quad-level predecessors and successors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuadLocation<'c> {
    quad: &'c Quad,
    predecessors: Vec<Neighbor>,
    successors: Vec<Neighbor>,
}

impl<'c> QuadLocation<'c> {
    pub fn new(
        quad: &'c Quad,
        predecessors: Vec<Neighbor>,
        successors: Vec<Neighbor>,
    ) -> QuadLocation<'c> {
        QuadLocation {
            quad,
            predecessors,
            successors,
        }
    }

    pub fn quad(&self) -> &'c Quad {
        self.quad
    }

    pub fn id(&self) -> QuadId {
        self.quad.id()
    }

    pub fn predecessors(&self) -> &[Neighbor] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[Neighbor] {
        &self.successors
    }

    pub fn is_entry_successor(&self) -> bool {
        self.predecessors.contains(&Neighbor::Entry)
    }

    pub fn is_exit_predecessor(&self) -> bool {
        self.successors.contains(&Neighbor::Exit)
    }
}

impl<'c> fmt::Display for QuadLocation<'c> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.quad)
    }
}
