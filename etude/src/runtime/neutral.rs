// Neutral terms - computations carried symbolically when they cannot reduce

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::runtime::builtins::Builtin;
use crate::runtime::error::EvalResult;
use crate::runtime::values::Value;
use crate::types::Type;

/// An unresolved atom: the seed a stuck computation grows around. Atoms
/// come from outside the evaluator (free variables, foreign placeholders)
/// and are compared by name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom(pub String);

impl Atom {
    pub fn new(name: impl Into<String>) -> Atom {
        Atom(name.into())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stuck computation as a persistent term tree. Every evaluation layer
/// that could not reduce adds one node; existing nodes are never mutated,
/// so terms share structure freely.
#[derive(Debug, Clone, PartialEq)]
pub enum Neutral {
    /// an opaque unresolved atom
    Stuck(Atom),
    /// a stuck operator applied to already-evaluated operands
    Apply {
        rator: Arc<Neutral>,
        rands: Vec<Value>,
    },
    /// a conditional over a stuck condition, both branches evaluated
    If {
        condition: Arc<Neutral>,
        then_value: Value,
        else_value: Value,
    },
    /// a builtin whose argument evaluation was stuck
    CallBuiltin { builtin: Builtin, arg: Arc<Neutral> },
}

impl Neutral {
    pub fn atom(name: impl Into<String>) -> Neutral {
        Neutral::Stuck(Atom::new(name))
    }

    /// Applies further operands, flattening nested applications so one
    /// operator keeps a single `Apply` node.
    pub fn apply(self: &Arc<Neutral>, rands: &[Value]) -> Neutral {
        match self.as_ref() {
            Neutral::Apply {
                rator,
                rands: existing,
            } => Neutral::Apply {
                rator: rator.clone(),
                rands: existing.iter().chain(rands).cloned().collect(),
            },
            _ => Neutral::Apply {
                rator: self.clone(),
                rands: rands.to_vec(),
            },
        }
    }
}

impl fmt::Display for Neutral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Neutral::Stuck(atom) => write!(f, "{atom}"),
            Neutral::Apply { rator, rands } => {
                write!(f, "({rator} {})", rands.iter().join(" "))
            }
            Neutral::If {
                condition,
                then_value,
                else_value,
            } => write!(f, "(if {condition} {then_value} {else_value})"),
            Neutral::CallBuiltin { builtin, arg } => write!(f, "({builtin} {arg})"),
        }
    }
}

/// A stuck result in value position: the term plus the type it would have
/// had if reduced. Keeping the type lets further application stay
/// well-typed.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicValue {
    pub ty: Type,
    pub term: Arc<Neutral>,
}

impl SymbolicValue {
    pub fn new(ty: Type, term: Arc<Neutral>) -> SymbolicValue {
        SymbolicValue { ty, term }
    }

    /// A fresh atom of the given type, wrapped as a value.
    pub fn atom(ty: Type, name: impl Into<String>) -> SymbolicValue {
        SymbolicValue::new(ty, Arc::new(Neutral::atom(name)))
    }

    /// Applies operands, walking one `Arrow` layer of the type per operand
    /// and deepening the term. Over-application past the type's arrow
    /// nesting is an arity fault.
    pub fn apply(&self, rands: &[Value]) -> EvalResult<SymbolicValue> {
        if rands.is_empty() {
            return Ok(self.clone());
        }
        let remaining = self.ty.result_after(rands.len())?.clone();
        Ok(SymbolicValue::new(remaining, Arc::new(self.term.apply(rands))))
    }
}

impl fmt::Display for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

/// The in-flight stuck signal: the same payload as `SymbolicValue`, carried
/// on the error channel while propagation is still unwinding.
#[derive(Debug, Clone, PartialEq)]
pub struct Stuck {
    pub ty: Type,
    pub term: Arc<Neutral>,
}

impl Stuck {
    pub fn new(ty: Type, term: Neutral) -> Stuck {
        Stuck {
            ty,
            term: Arc::new(term),
        }
    }

    /// Folds the signal into a first-class symbolic value.
    pub fn into_value(self) -> Value {
        Value::Symbolic(SymbolicValue::new(self.ty, self.term))
    }

    /// The signal for a stuck operator applied to evaluated operands.
    pub fn apply(self, rands: &[Value]) -> EvalResult<Stuck> {
        if rands.is_empty() {
            return Ok(self);
        }
        let remaining = self.ty.result_after(rands.len())?.clone();
        Ok(Stuck {
            ty: remaining,
            term: Arc::new(self.term.apply(rands)),
        })
    }
}

impl From<SymbolicValue> for Stuck {
    fn from(value: SymbolicValue) -> Stuck {
        Stuck {
            ty: value.ty,
            term: value.term,
        }
    }
}

impl From<Stuck> for SymbolicValue {
    fn from(stuck: Stuck) -> SymbolicValue {
        SymbolicValue::new(stuck.ty, stuck.term)
    }
}
