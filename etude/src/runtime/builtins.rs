// Builtin operations - the closed set of single-argument primitives

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::runtime::error::{EvalError, Outcome};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::frame::Frame;
use crate::runtime::values::Value;
use crate::types::Type;

/// The builtins the evaluator knows. All take a single argument and only
/// run saturated; the upstream checker guarantees the argument's type, so a
/// wrong concrete shape here is a fault, never a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
    /// render the argument to stdout; `Object -> IO Unit`
    Print,
    /// successor; `Nat -> Nat`
    Succ,
    /// predecessor, floored at zero; `Nat -> Nat`
    Pred,
    /// zero test; `Nat -> Bool`
    IsZero,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Succ => "succ",
            Builtin::Pred => "pred",
            Builtin::IsZero => "is-zero",
        }
    }

    pub fn argument_type(&self) -> Type {
        match self {
            Builtin::Print => Type::Object,
            Builtin::Succ | Builtin::Pred | Builtin::IsZero => Type::Nat,
        }
    }

    pub fn result_type(&self) -> Type {
        match self {
            Builtin::Print => Type::action(),
            Builtin::Succ | Builtin::Pred => Type::Nat,
            Builtin::IsZero => Type::Bool,
        }
    }

    pub fn ty(&self) -> Type {
        Type::arrow(self.argument_type(), self.result_type())
    }

    /// Runs the builtin on its argument expression. Stuck-ness of the
    /// argument propagates out; the enclosing call node wraps it. The
    /// builtin itself either fully reduces or faults.
    pub(crate) fn execute(&self, evaluator: &Evaluator, frame: &Frame, arg: &Expr) -> Outcome {
        match self {
            Builtin::Print => {
                let value = evaluator.execute(arg, frame)?;
                println!("{value}");
                Ok(Value::Unit)
            }
            Builtin::Succ => {
                let n = evaluator.nat_argument(arg, frame)?;
                let next = n
                    .checked_add(1)
                    .ok_or_else(|| EvalError::Internal("natural overflow in succ".to_string()))?;
                Ok(Value::Nat(next))
            }
            Builtin::Pred => {
                let n = evaluator.nat_argument(arg, frame)?;
                Ok(Value::Nat((n - 1).max(0)))
            }
            Builtin::IsZero => {
                let n = evaluator.nat_argument(arg, frame)?;
                Ok(Value::Bool(n == 0))
            }
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
