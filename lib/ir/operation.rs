use crate::ir::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Cmp,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BinaryOperator::Add => "ADD",
            BinaryOperator::Sub => "SUB",
            BinaryOperator::Mul => "MUL",
            BinaryOperator::Div => "DIV",
            BinaryOperator::Rem => "REM",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Xor => "XOR",
            BinaryOperator::Cmp => "CMP",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Operation {
    Move {
        dst: Register,
        src: Operand,
    },
    New {
        dst: Register,
        class: String,
    },
    NullCheck {
        src: Register,
    },
    Binary {
        op: BinaryOperator,
        dst: Register,
        lhs: Operand,
        rhs: Operand,
    },
    Load {
        dst: Register,
        base: Register,
        field: String,
    },
    Store {
        base: Register,
        field: String,
        src: Operand,
    },
    Call {
        dst: Option<Register>,
        target: String,
        arguments: Vec<Operand>,
    },
    Branch {
        condition: Option<Operand>,
    },
    Return(Option<Operand>),
    Nop,
}

impl Operation {
    pub fn is_null_check(&self) -> bool {
        match self {
            Operation::NullCheck { .. } => true,
            _ => false,
        }
    }

    /// A move whose source is a register, copying one register into another.
    pub fn is_move(&self) -> bool {
        match self {
            Operation::Move {
                src: Operand::Register(_),
                ..
            } => true,
            _ => false,
        }
    }

    pub fn dst(&self) -> Option<&Register> {
        match self {
            Operation::Move { dst, .. }
            | Operation::New { dst, .. }
            | Operation::Binary { dst, .. }
            | Operation::Load { dst, .. } => Some(dst),
            Operation::Call { dst, .. } => dst.as_ref(),
            _ => None,
        }
    }

    pub fn defined_registers(&self) -> Vec<&Register> {
        self.dst().into_iter().collect()
    }

    pub fn used_registers(&self) -> Vec<&Register> {
        match self {
            Operation::Move { src, .. } => src.register().into_iter().collect(),
            Operation::NullCheck { src } => vec![src],
            Operation::Binary { lhs, rhs, .. } => lhs
                .register()
                .into_iter()
                .chain(rhs.register())
                .collect(),
            Operation::Load { base, .. } => vec![base],
            Operation::Store { base, src, .. } => {
                let mut used = vec![base];
                used.extend(src.register());
                used
            }
            Operation::Call { arguments, .. } => arguments
                .iter()
                .filter_map(|argument| argument.register())
                .collect(),
            Operation::Branch { condition } => condition
                .as_ref()
                .and_then(|condition| condition.register())
                .into_iter()
                .collect(),
            Operation::Return(result) => result
                .as_ref()
                .and_then(|result| result.register())
                .into_iter()
                .collect(),
            Operation::New { .. } | Operation::Nop => Vec::new(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Move { dst, src } => write!(f, "MOVE {}, {}", dst, src),
            Operation::New { dst, class } => write!(f, "NEW {}, {}", dst, class),
            Operation::NullCheck { src } => write!(f, "NULL_CHECK {}", src),
            Operation::Binary { op, dst, lhs, rhs } => {
                write!(f, "{} {}, {}, {}", op, dst, lhs, rhs)
            }
            Operation::Load { dst, base, field } => {
                write!(f, "GETFIELD {}, {}.{}", dst, base, field)
            }
            Operation::Store { base, field, src } => {
                write!(f, "PUTFIELD {}.{}, {}", base, field, src)
            }
            Operation::Call {
                dst,
                target,
                arguments,
            } => {
                write!(f, "INVOKE ")?;
                if let Some(dst) = dst {
                    write!(f, "{}, ", dst)?;
                }
                write!(f, "{}(", target)?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ")")
            }
            Operation::Branch { condition } => match condition {
                Some(condition) => write!(f, "IFCMP {}", condition),
                None => write!(f, "GOTO"),
            },
            Operation::Return(result) => match result {
                Some(result) => write!(f, "RETURN {}", result),
                None => write!(f, "RETURN"),
            },
            Operation::Nop => write!(f, "NOP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::*;

    #[test]
    fn store_uses_base_and_register_source() {
        let operation = Operation::Store {
            base: reg("R0"),
            field: "next".to_string(),
            src: reg("R1").into(),
        };
        assert_eq!(operation.used_registers(), vec![&reg("R0"), &reg("R1")]);
        assert!(operation.defined_registers().is_empty());
    }

    #[test]
    fn only_register_moves_are_moves() {
        assert!(mov("R1", "R0").is_move());
        let constant = Operation::Move {
            dst: reg("R1"),
            src: Operand::Constant(4),
        };
        assert!(!constant.is_move());
        assert!(constant.used_registers().is_empty());
        assert_eq!(constant.defined_registers(), vec![&reg("R1")]);
    }

    #[test]
    fn void_call_defines_nothing() {
        let call = Operation::Call {
            dst: None,
            target: "print".to_string(),
            arguments: vec![reg("R2").into(), Operand::Constant(1)],
        };
        assert!(call.defined_registers().is_empty());
        assert_eq!(call.used_registers(), vec![&reg("R2")]);
    }
}
