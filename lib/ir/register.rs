use serde::{Deserialize, Serialize};
use std::fmt;

/// A named virtual register, such as `R0` or `T3`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Register {
    name: String,
}

impl Register {
    pub fn new<S: Into<String>>(name: S) -> Register {
        Register { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Register {
    fn from(name: &str) -> Register {
        Register::new(name)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The source of a value read by an operation.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operand {
    Register(Register),
    Constant(i64),
}

impl Operand {
    pub fn register(&self) -> Option<&Register> {
        match self {
            Operand::Register(register) => Some(register),
            Operand::Constant(_) => None,
        }
    }
}

impl From<Register> for Operand {
    fn from(register: Register) -> Operand {
        Operand::Register(register)
    }
}

impl From<i64> for Operand {
    fn from(constant: i64) -> Operand {
        Operand::Constant(constant)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Register(register) => write!(f, "{}", register),
            Operand::Constant(constant) => write!(f, "IConst: {}", constant),
        }
    }
}
