use crate::ir::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single instruction, identified by an id that is stable for the lifetime
/// of its control flow graph.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Quad {
    id: QuadId,
    operation: Operation,
}

impl Quad {
    pub fn new(id: QuadId, operation: Operation) -> Quad {
        Quad { id, operation }
    }

    pub fn id(&self) -> QuadId {
        self.id
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn defined_registers(&self) -> Vec<&Register> {
        self.operation.defined_registers()
    }

    pub fn used_registers(&self) -> Vec<&Register> {
        self.operation.used_registers()
    }

    pub fn is_null_check(&self) -> bool {
        self.operation.is_null_check()
    }

    pub fn is_move(&self) -> bool {
        self.operation.is_move()
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:>3}: {}", self.id, self.operation)
    }
}
