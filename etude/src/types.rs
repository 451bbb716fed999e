// Type model - function, IO-action and base types with storage hints

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::Value;

/// Storage classification a frame slot speculates on. `Unset` is the state
/// before the first write; the other three mirror `Type::rep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    Unset,
    Int,
    Bool,
    Object,
}

/// A type as the upstream checker declares it. Immutable, compared
/// structurally; `Arrow` nests right-associatively in its result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Arrow { argument: Box<Type>, result: Box<Type> },
    /// an action producing a value of the inner type when run
    Io(Box<Type>),
    Bool,
    /// natural numbers; negative machine integers never validate
    Nat,
    Unit,
    /// opaque host value, accepts anything
    Object,
}

impl Type {
    pub fn arrow(argument: Type, result: Type) -> Type {
        Type::Arrow {
            argument: Box::new(argument),
            result: Box::new(result),
        }
    }

    pub fn io(result: Type) -> Type {
        Type::Io(Box::new(result))
    }

    /// `IO Unit`, the type of a completed action.
    pub fn action() -> Type {
        Type::io(Type::Unit)
    }

    /// How many arguments a value of this type accepts: the nesting depth
    /// of `Arrow` layers.
    pub fn arity(&self) -> usize {
        let mut n = 0;
        let mut ty = self;
        while let Type::Arrow { result, .. } = ty {
            n += 1;
            ty = result;
        }
        n
    }

    /// Preferred unboxed storage for values of this type; seeds slot-kind
    /// speculation.
    pub fn rep(&self) -> SlotKind {
        match self {
            Type::Nat => SlotKind::Int,
            Type::Bool => SlotKind::Bool,
            _ => SlotKind::Object,
        }
    }

    /// The type left after applying `n` arguments, one `Arrow` layer per
    /// argument. Fails with an arity error past the arrow nesting.
    pub fn result_after(&self, n: usize) -> EvalResult<&Type> {
        let mut ty = self;
        for _ in 0..n {
            match ty {
                Type::Arrow { result, .. } => ty = result,
                _ => {
                    return Err(EvalError::ArityMismatch {
                        expected: self.arity(),
                        actual: n,
                    })
                }
            }
        }
        Ok(ty)
    }

    /// Shape-checks a runtime value against this type at the foreign
    /// boundary. An `Arrow` position accepts only a closure whose own
    /// argument type matches; `IO` values cannot be passed in from outside.
    pub fn validate(&self, value: &Value) -> EvalResult<()> {
        let ok = match self {
            Type::Bool => matches!(value, Value::Bool(_)),
            Type::Nat => matches!(value, Value::Nat(n) if *n >= 0),
            Type::Unit => matches!(value, Value::Unit),
            Type::Object => true,
            Type::Arrow { argument, .. } => match value {
                Value::Closure(closure) => match closure.ty() {
                    Type::Arrow { argument: own, .. } => own == argument,
                    _ => false,
                },
                _ => false,
            },
            Type::Io(_) => false,
        };
        if ok {
            Ok(())
        } else {
            Err(EvalError::TypeMismatch {
                expected: self.clone(),
                actual: value.clone(),
            })
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Arrow { argument, result } => {
                // arrow arguments get parentheses so the rendering stays
                // unambiguous under right association
                if matches!(**argument, Type::Arrow { .. }) {
                    write!(f, "({argument}) -> {result}")
                } else {
                    write!(f, "{argument} -> {result}")
                }
            }
            Type::Io(result) => {
                if matches!(**result, Type::Arrow { .. } | Type::Io(_)) {
                    write!(f, "IO ({result})")
                } else {
                    write!(f, "IO {result}")
                }
            }
            Type::Bool => write!(f, "Bool"),
            Type::Nat => write!(f, "Nat"),
            Type::Unit => write!(f, "Unit"),
            Type::Object => write!(f, "Object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nat2() -> Type {
        Type::arrow(Type::Nat, Type::arrow(Type::Nat, Type::Nat))
    }

    #[test]
    fn arity_counts_arrow_nesting() {
        assert_eq!(Type::Nat.arity(), 0);
        assert_eq!(Type::arrow(Type::Nat, Type::Nat).arity(), 1);
        assert_eq!(nat2().arity(), 2);
        // only result-side nesting counts
        let higher = Type::arrow(Type::arrow(Type::Nat, Type::Nat), Type::Nat);
        assert_eq!(higher.arity(), 1);
        assert_eq!(Type::io(Type::Nat).arity(), 0);
    }

    #[test]
    fn result_after_walks_arrows() {
        let ty = nat2();
        assert_eq!(ty.result_after(0), Ok(&ty));
        assert_eq!(ty.result_after(1), Ok(&Type::arrow(Type::Nat, Type::Nat)));
        assert_eq!(ty.result_after(2), Ok(&Type::Nat));
        assert_eq!(
            ty.result_after(3),
            Err(EvalError::ArityMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn rep_matches_storage() {
        assert_eq!(Type::Nat.rep(), SlotKind::Int);
        assert_eq!(Type::Bool.rep(), SlotKind::Bool);
        assert_eq!(Type::Unit.rep(), SlotKind::Object);
        assert_eq!(nat2().rep(), SlotKind::Object);
        assert_eq!(Type::action().rep(), SlotKind::Object);
    }

    #[test]
    fn validate_base_types() {
        assert!(Type::Nat.validate(&Value::Nat(3)).is_ok());
        assert!(Type::Nat.validate(&Value::Nat(-1)).is_err());
        assert!(Type::Nat.validate(&Value::Bool(true)).is_err());
        assert!(Type::Bool.validate(&Value::Bool(false)).is_ok());
        assert!(Type::Unit.validate(&Value::Unit).is_ok());
        assert!(Type::Object.validate(&Value::Nat(0)).is_ok());
        assert!(Type::Object.validate(&Value::Unit).is_ok());
        assert!(Type::io(Type::Unit).validate(&Value::Unit).is_err());
    }

    #[test]
    fn display_parenthesizes_arrow_arguments() {
        assert_eq!(nat2().to_string(), "Nat -> Nat -> Nat");
        let higher = Type::arrow(Type::arrow(Type::Nat, Type::Nat), Type::Nat);
        assert_eq!(higher.to_string(), "(Nat -> Nat) -> Nat");
        assert_eq!(Type::action().to_string(), "IO Unit");
        let io_fn = Type::io(Type::arrow(Type::Nat, Type::Nat));
        assert_eq!(io_fn.to_string(), "IO (Nat -> Nat)");
    }

    #[test]
    fn serde_round_trip() {
        let ty = Type::arrow(Type::arrow(Type::Bool, Type::Nat), Type::action());
        let json = serde_json::to_string(&ty).expect("serialize");
        let back: Type = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ty);
    }
}
