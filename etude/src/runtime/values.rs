// Runtime values - literals, closures, symbolic results

use std::fmt;
use std::sync::Arc;

use crate::expr::Code;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::evaluator::Evaluator;
use crate::runtime::frame::MaterializedFrame;
use crate::runtime::neutral::SymbolicValue;
use crate::runtime::thunk::Thunk;
use crate::types::{SlotKind, Type};

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    /// natural number; negatives never cross the foreign boundary
    Nat(i64),
    Closure(Arc<Closure>),
    Symbolic(SymbolicValue),
}

impl Value {
    /// Dynamic tag used to seed slot-kind speculation.
    pub fn slot_kind(&self) -> SlotKind {
        match self {
            Value::Nat(_) => SlotKind::Int,
            Value::Bool(_) => SlotKind::Bool,
            _ => SlotKind::Object,
        }
    }

    /// Conservative equality, as used by the stuck-conditional escape:
    /// symbolic values are never concretely equal, closures only when they
    /// are the same closure.
    pub fn concretely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nat(a), Value::Nat(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nat(n) => write!(f, "{n}"),
            Value::Closure(closure) => write!(f, "{closure}"),
            Value::Symbolic(symbolic) => write!(f, "{symbolic}"),
        }
    }
}

/// Executable body of a closure: plain code, or code paired with the
/// captured environment it needs at call time.
#[derive(Debug, Clone)]
pub enum CallableBody {
    Combinator(Arc<Code>),
    SuperCombinator {
        env: MaterializedFrame,
        code: Arc<Code>,
    },
}

impl CallableBody {
    pub fn code(&self) -> &Arc<Code> {
        match self {
            CallableBody::Combinator(code) => code,
            CallableBody::SuperCombinator { code, .. } => code,
        }
    }

    pub fn env(&self) -> Option<&MaterializedFrame> {
        match self {
            CallableBody::Combinator(_) => None,
            CallableBody::SuperCombinator { env, .. } => Some(env),
        }
    }
}

/// A function value: the declared type, the arguments already applied, and
/// the body to run at saturation. Immutable once built; partial application
/// builds a new closure sharing the same body.
#[derive(Debug)]
pub struct Closure {
    /// arguments still missing
    arity: usize,
    declared: Type,
    applied: Vec<Value>,
    body: CallableBody,
    /// declared type with the applied layers walked off; computed at most
    /// once, consulted on every foreign call
    effective: Thunk<Type>,
}

impl Closure {
    /// Builds a closure, checking its arity bookkeeping: the applied prefix
    /// plus the remaining arity must cover the code exactly, and the
    /// declared type must be at least as wide as the code.
    pub fn new(
        body: CallableBody,
        applied: Vec<Value>,
        arity: usize,
        declared: Type,
    ) -> EvalResult<Closure> {
        let code_arity = body.code().arity();
        if arity == 0 || applied.len() + arity != code_arity {
            return Err(EvalError::Internal(format!(
                "closure arity {arity} with {} applied does not cover code arity {code_arity}",
                applied.len()
            )));
        }
        if declared.arity() < code_arity {
            return Err(EvalError::Internal(format!(
                "declared type `{declared}` is thinner than the code arity {code_arity}"
            )));
        }
        if body.code().is_super_combinator() != body.env().is_some() {
            return Err(EvalError::Internal(
                "captured environment and calling convention disagree".to_string(),
            ));
        }
        let effective = {
            let declared = declared.clone();
            let applied_len = applied.len();
            Thunk::new(move || {
                let mut ty = &declared;
                let mut remaining = applied_len;
                while remaining > 0 {
                    match ty {
                        Type::Arrow { result, .. } => ty = result,
                        // the arity check above proved enough layers exist
                        _ => break,
                    }
                    remaining -= 1;
                }
                ty.clone()
            })
        };
        Ok(Closure {
            arity,
            declared,
            applied,
            body,
            effective,
        })
    }

    /// Closure over code with no captured environment.
    pub fn combinator(code: Arc<Code>, ty: Type) -> EvalResult<Closure> {
        let arity = code.arity();
        Closure::new(CallableBody::Combinator(code), Vec::new(), arity, ty)
    }

    /// Closure over code that reads a captured environment.
    pub fn super_combinator(
        env: MaterializedFrame,
        code: Arc<Code>,
        ty: Type,
    ) -> EvalResult<Closure> {
        let arity = code.arity();
        Closure::new(
            CallableBody::SuperCombinator { env, code },
            Vec::new(),
            arity,
            ty,
        )
    }

    /// Arguments still missing before the body runs.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The type of this closure as it stands, with already-applied argument
    /// layers walked off.
    pub fn ty(&self) -> &Type {
        self.effective.force()
    }

    pub fn body(&self) -> &CallableBody {
        &self.body
    }

    pub(crate) fn applied(&self) -> &[Value] {
        &self.applied
    }

    /// The closure produced by under-application: same body, the new
    /// arguments appended to the applied prefix. The caller guarantees
    /// `args.len() < self.arity()`.
    pub(crate) fn partial(&self, args: Vec<Value>) -> EvalResult<Closure> {
        let arity = self.arity - args.len();
        let applied = self.applied.iter().cloned().chain(args).collect();
        Closure::new(self.body.clone(), applied, arity, self.declared.clone())
    }

    /// Dispatches `arguments` against this closure: saturation runs the
    /// body, under-application builds a partial application, and
    /// over-application chains calls through the result.
    pub fn call(&self, arguments: Vec<Value>) -> EvalResult<Value> {
        Evaluator::new().call_closure(self, arguments)
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Closure) -> bool {
        // same code, same captured environment, same applied prefix
        Arc::ptr_eq(self.body.code(), other.body.code())
            && match (self.body.env(), other.body.env()) {
                (None, None) => true,
                (Some(a), Some(b)) => MaterializedFrame::ptr_eq(a, b),
                _ => false,
            }
            && self.arity == other.arity
            && self.applied == other.applied
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<closure/{}>", self.arity)
    }
}
