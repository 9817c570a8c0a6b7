use crate::ir::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Block {
    index: usize,
    quads: Vec<Quad>,
}

impl Block {
    pub fn new(index: usize) -> Block {
        Block {
            index,
            quads: Vec::new(),
        }
    }

    pub fn with_quads(index: usize, quads: Vec<Quad>) -> Block {
        Block { index, quads }
    }

    pub fn index(&self) -> usize {
        self.index
    }
    pub fn quad(&self, id: QuadId) -> Option<&Quad> {
        self.quads().iter().find(|quad| quad.id() == id)
    }
    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }
    pub fn first(&self) -> Option<&Quad> {
        self.quads.first()
    }
    pub fn last(&self) -> Option<&Quad> {
        self.quads.last()
    }
    /// Removes the quad with the given id, keeping the order of the rest.
    pub fn remove_quad(&mut self, id: QuadId) -> Option<Quad> {
        let position = self.quads.iter().position(|quad| quad.id() == id)?;
        Some(self.quads.remove(position))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[ Block 0x{:02x} ]", self.index())?;
        for quad in self.quads() {
            writeln!(f, "{}", quad)?;
        }
        Ok(())
    }
}
