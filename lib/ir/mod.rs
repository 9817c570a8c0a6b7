//! The quad program representation analyses run over.

mod block;
mod control_flow_graph;
mod edge;
mod function;
mod location;
mod operation;
mod program;
mod quad;
mod register;

pub use self::block::Block;
pub use self::control_flow_graph::ControlFlowGraph;
pub use self::edge::Edge;
pub use self::function::Function;
pub use self::location::{Neighbor, QuadLocation};
pub use self::operation::{BinaryOperator, Operation};
pub use self::program::Program;
pub use self::quad::Quad;
pub use self::register::{Operand, Register};

/// Quads are identified by small, dense, non-negative integers.
pub type QuadId = usize;

pub fn reg<S: Into<String>>(name: S) -> Register {
    Register::new(name)
}

/// A register to register move.
pub fn mov<S: Into<String>, T: Into<String>>(dst: S, src: T) -> Operation {
    Operation::Move {
        dst: reg(dst),
        src: Operand::Register(reg(src)),
    }
}

pub fn new_object<S: Into<String>, T: Into<String>>(dst: S, class: T) -> Operation {
    Operation::New {
        dst: reg(dst),
        class: class.into(),
    }
}

pub fn null_check<S: Into<String>>(src: S) -> Operation {
    Operation::NullCheck { src: reg(src) }
}

pub fn binary<S: Into<String>>(
    op: BinaryOperator,
    dst: S,
    lhs: Operand,
    rhs: Operand,
) -> Operation {
    Operation::Binary {
        op,
        dst: reg(dst),
        lhs,
        rhs,
    }
}

pub fn load<S: Into<String>, T: Into<String>, U: Into<String>>(
    dst: S,
    base: T,
    field: U,
) -> Operation {
    Operation::Load {
        dst: reg(dst),
        base: reg(base),
        field: field.into(),
    }
}

/// A conditional branch on a register.
pub fn branch<S: Into<String>>(condition: S) -> Operation {
    Operation::Branch {
        condition: Some(Operand::Register(reg(condition))),
    }
}
